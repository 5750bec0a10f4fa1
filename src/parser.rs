use std::path::PathBuf;

use crate::error::ParseError;
use crate::types::*;

type ParseResult<T> = Result<T, ParseError>;

const PIPE: &str = "|";
const INPUT: &str = "<";
const OUTPUT: &str = ">";
const BACKGROUND: &str = "&";

fn is_operator(token: &str) -> bool {
	match token {
		PIPE | INPUT | OUTPUT | BACKGROUND => true,
		_ => false,
	}
}

struct Parser<'a, 't> {
	tokens: &'t [&'a str],
	i: usize,
}

/// Words and redirections of one `|`-separated segment.
struct Segment {
	words: Vec<String>,
	input: Option<PathBuf>,
	output: Option<PathBuf>,
}

impl<'a, 't> Parser<'a, 't> {
	fn peek(&self) -> Option<&'a str> {
		self.tokens.get(self.i).cloned()
	}

	fn at_end(&self) -> bool {
		self.i >= self.tokens.len()
	}

	fn read_words(&mut self) -> Vec<String> {
		let mut words = vec![];
		while let Some(t) = self.peek() {
			if is_operator(t) { break; }
			words.push(t.to_string());
			self.i += 1;
		}
		words
	}

	fn read_target(&mut self, op: &str) -> ParseResult<PathBuf> {
		match self.peek() {
			Some(t) if !is_operator(t) => {
				self.i += 1;
				Ok(PathBuf::from(t))
			},
			_ => Err(ParseError::MissingRedirectTarget(op.to_string())),
		}
	}

	// words ['<' path] ['>' path]
	fn parse_segment(&mut self) -> ParseResult<Segment> {
		let words = self.read_words();
		let mut input = None;
		let mut output = None;
		if self.peek() == Some(INPUT) {
			self.i += 1;
			input = Some(self.read_target(INPUT)?);
		}
		if self.peek() == Some(OUTPUT) {
			self.i += 1;
			output = Some(self.read_target(OUTPUT)?);
		}
		match self.peek() {
			None | Some(PIPE) | Some(BACKGROUND) => Ok(Segment { words: words, input: input, output: output }),
			Some(t) => Err(ParseError::UnexpectedToken(t.to_string())),
		}
	}

	fn parse_pipeline(&mut self) -> ParseResult<Pipeline> {
		if self.at_end() {
			return Err(ParseError::EmptyPipeline);
		}

		let mut stages: Vec<Stage> = vec![];
		let mut input = None;
		let mut output = None;
		let mut is_background = false;

		loop {
			let segment = self.parse_segment()?;
			let is_first = stages.is_empty();
			let continues = self.peek() == Some(PIPE);

			let stage = match Stage::new(segment.words) {
				Some(stage) => stage,
				None if is_first && !continues => return Err(ParseError::EmptyPipeline),
				None => return Err(ParseError::EmptyStage),
			};
			if segment.input.is_some() {
				if !is_first {
					return Err(ParseError::UnexpectedToken(INPUT.to_string()));
				}
				input = segment.input;
			}
			if segment.output.is_some() {
				if continues {
					return Err(ParseError::UnexpectedToken(OUTPUT.to_string()));
				}
				output = segment.output;
			}
			stages.push(stage);

			match self.peek() {
				Some(PIPE) => { self.i += 1; },
				Some(BACKGROUND) => {
					self.i += 1;
					if !self.at_end() {
						return Err(ParseError::MisplacedBackground);
					}
					is_background = true;
					break;
				},
				_ => { break; },
			}
		}

		Ok(Pipeline {
			stages: stages,
			redirection: Redirection::from_parts(input, output),
			is_background: is_background,
		})
	}
}

/// Builds a pipeline from a token sequence. An empty sequence is
/// `EmptyPipeline`; callers treat blank lines as a no-op before parsing.
pub fn parse(tokens: &[&str]) -> ParseResult<Pipeline> {
	let mut parser = Parser { tokens: tokens, i: 0 };
	parser.parse_pipeline()
}
