use std::io::{self, Write};

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, trace};

use crate::config::Config;
use crate::error::ShellError;
use crate::eval::{self, EvalResult};
use crate::global;
use crate::parser;
use crate::signal::{Decision, SignalController};
use crate::tokenizer::tokenize;

pub const BANNER: &str = "Welcome to shell";
pub const FAREWELL: &str = "Exited shell...";

const PARSE_FAILURE: i32 = 2;
const EXEC_FAILURE: i32 = 1;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Flow {
	Continue(i32),
	Exit(i32),
}

pub struct Shell {
	state: global::State,
	signals: SignalController,
	last_status: i32,
}

impl Shell {
	pub fn new(config: Config) -> io::Result<Shell> {
		Ok(Shell {
			state: global::State::new(config)?,
			signals: SignalController::install()?,
			last_status: 0,
		})
	}

	pub fn state(&self) -> &global::State {
		&self.state
	}

	pub fn prompt(&self) -> String {
		format!("[{}@{}]$ >>> ", self.state.config.logname, self.state.session.current_dir.display())
	}

	fn execute_tokens(&mut self, tokens: &[&str]) -> Result<EvalResult, ShellError> {
		let pipeline = parser::parse(tokens)?;
		trace!(?pipeline, "parsed");
		let _ = io::stdout().flush();
		Ok(eval::eval(&mut self.state, &pipeline)?)
	}

	/// Runs one line of input. Errors are reported here and never end the loop.
	pub fn execute_line(&mut self, line: &str) -> Flow {
		let tokens = tokenize(line);
		if tokens.is_empty() {
			return Flow::Continue(self.last_status);
		}
		self.last_status = match self.execute_tokens(&tokens) {
			Ok(EvalResult::Done(code)) => code,
			Ok(EvalResult::Running { job, pids }) => {
				for pid in pids {
					println!("[{}] Created background process with PID: {}", job, pid);
				}
				0
			},
			Ok(EvalResult::Exit(code)) => {
				println!("{}", FAREWELL);
				return Flow::Exit(code);
			},
			Err(e) => {
				eprintln!("ish: {}", e);
				match e {
					ShellError::Parse(_) => PARSE_FAILURE,
					ShellError::Exec(_) => EXEC_FAILURE,
				}
			},
		};
		Flow::Continue(self.last_status)
	}

	/// Collects finished background jobs and announces them.
	pub fn reap_background(&mut self) {
		for job in self.state.jobs.reap() {
			println!("[{}] Done", job.id);
		}
	}

	/// Runs the confirmation if an interrupt is pending. `None` means none was.
	fn confirm_interrupt(&mut self, editor: &mut DefaultEditor) -> Option<Flow> {
		if !self.signals.take_pending() {
			return None;
		}
		match self.signals.confirm(|prompt| editor.readline(prompt).ok()) {
			Decision::Quit => Some(Flow::Exit(0)),
			Decision::Resume => Some(Flow::Continue(self.last_status)),
		}
	}

	/// The read-eval loop. Returns the interpreter's exit status.
	pub fn run(&mut self) -> Result<i32, ReadlineError> {
		let mut editor = DefaultEditor::new()?;
		if self.state.config.show_banner {
			println!("{}", BANNER);
		}
		loop {
			self.reap_background();
			if let Some(Flow::Exit(code)) = self.confirm_interrupt(&mut editor) {
				return Ok(code);
			}
			match editor.readline(&self.prompt()) {
				Ok(line) => {
					// A line read after an interrupt is dropped in favour of the confirmation.
					match self.confirm_interrupt(&mut editor) {
						Some(Flow::Exit(code)) => return Ok(code),
						Some(Flow::Continue(_)) => {
							debug!("line dropped after interrupt");
							continue;
						},
						None => {},
					}
					if !line.trim().is_empty() {
						let _ = editor.add_history_entry(line.as_str());
					}
					if let Flow::Exit(code) = self.execute_line(&line) {
						return Ok(code);
					}
				},
				Err(ReadlineError::Interrupted) => {
					debug!("interrupted at prompt");
					self.signals.interrupt();
				},
				Err(ReadlineError::Io(ref e)) if e.kind() == io::ErrorKind::Interrupted => {
					debug!("read interrupted by signal");
					self.signals.interrupt();
				},
				Err(ReadlineError::Io(ref e)) if e.kind() == io::ErrorKind::InvalidData => {
					eprintln!("ish: {}", e);
					self.last_status = EXEC_FAILURE;
				},
				Err(ReadlineError::Eof) => {
					println!("{}", FAREWELL);
					return Ok(0);
				},
				Err(e) => return Err(e),
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn shell() -> Shell {
		let config = Config { logname: "tester".to_string(), home: None, show_banner: false };
		Shell::new(config).unwrap()
	}

	#[test]
	fn blank_lines_are_no_ops() {
		let mut sh = shell();
		let jobs = sh.state().jobs.len();
		assert_eq!(sh.execute_line(" \t \n"), Flow::Continue(0));
		assert_eq!(sh.state().jobs.len(), jobs);
	}

	#[test]
	fn parse_errors_keep_the_loop_going() {
		let mut sh = shell();
		assert_eq!(sh.execute_line("ls |"), Flow::Continue(PARSE_FAILURE));
	}

	#[test]
	fn exit_stops_the_loop() {
		let mut sh = shell();
		assert_eq!(sh.execute_line("exit 3"), Flow::Exit(3));
		assert_eq!(sh.execute_line("exit nope"), Flow::Continue(EXEC_FAILURE));
	}

	#[test]
	fn unknown_program_leaves_session_unchanged() {
		let mut sh = shell();
		let before = sh.state().session.clone();
		assert_eq!(sh.execute_line("no-such-program-for-ish-tests --flag"), Flow::Continue(127));
		assert_eq!(sh.state().session, before);
	}

	#[test]
	fn background_jobs_are_tracked_then_reaped() {
		let mut sh = shell();
		assert_eq!(sh.execute_line("true | true &"), Flow::Continue(0));
		assert_eq!(sh.state().jobs.len(), 1);
		for _ in 0..200 {
			sh.reap_background();
			if sh.state().jobs.is_empty() { break; }
			std::thread::sleep(std::time::Duration::from_millis(10));
		}
		assert!(sh.state().jobs.is_empty());
	}

	#[test]
	fn prompt_shows_user_and_directory() {
		let sh = shell();
		let prompt = sh.prompt();
		assert!(prompt.starts_with("[tester@"));
		assert!(prompt.ends_with("]$ >>> "));
	}
}
