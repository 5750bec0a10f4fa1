use std::path::PathBuf;

/// One program invocation. `argv[0]` is always the program name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
	argv: Vec<String>,
}

impl Stage {
	/// Builds a stage from its words; returns `None` for an empty word list.
	pub fn new(argv: Vec<String>) -> Option<Stage> {
		if argv.is_empty() {
			None
		} else {
			Some(Stage { argv: argv })
		}
	}

	pub fn program(&self) -> &str {
		&self.argv[0]
	}

	pub fn argv(&self) -> &[String] {
		&self.argv
	}

	/// Arguments after the program name.
	pub fn arguments(&self) -> &[String] {
		&self.argv[1..]
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirection {
	None,
	Input(PathBuf),
	Output(PathBuf),
	InputThenOutput(PathBuf, PathBuf),
}

impl Redirection {
	pub fn input(&self) -> Option<&PathBuf> {
		match *self {
			Redirection::Input(ref p) | Redirection::InputThenOutput(ref p, _) => Some(p),
			_ => None,
		}
	}

	pub fn output(&self) -> Option<&PathBuf> {
		match *self {
			Redirection::Output(ref p) | Redirection::InputThenOutput(_, ref p) => Some(p),
			_ => None,
		}
	}

	pub fn is_none(&self) -> bool {
		*self == Redirection::None
	}

	pub(crate) fn from_parts(input: Option<PathBuf>, output: Option<PathBuf>) -> Redirection {
		match (input, output) {
			(None, None) => Redirection::None,
			(Some(i), None) => Redirection::Input(i),
			(None, Some(o)) => Redirection::Output(o),
			(Some(i), Some(o)) => Redirection::InputThenOutput(i, o),
		}
	}
}

/// A parsed command line. Input redirection applies to the first stage,
/// output redirection to the last one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
	pub stages: Vec<Stage>,
	pub redirection: Redirection,
	pub is_background: bool,
}

impl Pipeline {
	pub fn is_single(&self) -> bool {
		self.stages.len() == 1
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_stage_is_rejected() {
		assert!(Stage::new(vec![]).is_none());
	}

	#[test]
	fn stage_splits_program_and_arguments() {
		let stage = Stage::new(vec!["ls".to_string(), "-l".to_string()]).unwrap();
		assert_eq!(stage.program(), "ls");
		assert_eq!(stage.arguments(), &["-l".to_string()]);
		assert_eq!(stage.argv().len(), 2);
	}

	#[test]
	fn redirection_accessors() {
		let r = Redirection::from_parts(Some("in".into()), Some("out".into()));
		assert_eq!(r, Redirection::InputThenOutput("in".into(), "out".into()));
		assert_eq!(r.input(), Some(&PathBuf::from("in")));
		assert_eq!(r.output(), Some(&PathBuf::from("out")));
		assert!(Redirection::from_parts(None, None).is_none());
		assert_eq!(Redirection::Output("o".into()).input(), None);
	}
}
