fn is_delimiter(c: char) -> bool {
	match c {
		' ' | '\t' | '\r' | '\n' | '\x07' => true,
		_ => false,
	}
}

/// Splits a raw line into words on runs of blanks. No quoting, no escaping.
pub fn tokenize(line: &str) -> Vec<&str> {
	line.split(is_delimiter).filter(|t| !t.is_empty()).collect()
}

#[cfg(test)]
mod tests {
	use super::tokenize;
	use rstest::rstest;

	#[rstest]
	#[case("")]
	#[case("   ")]
	#[case("\t\r\n")]
	#[case(" \x07 \n")]
	fn blank_lines_yield_nothing(#[case] line: &str) {
		assert!(tokenize(line).is_empty());
	}

	#[test]
	fn splits_on_mixed_blanks_in_order() {
		assert_eq!(tokenize("ls  -l\t/tmp\r\n"), vec!["ls", "-l", "/tmp"]);
	}

	#[test]
	fn operators_need_surrounding_blanks() {
		assert_eq!(tokenize("a|b | c"), vec!["a|b", "|", "c"]);
	}
}
