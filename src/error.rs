use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
	#[error("syntax error: empty command in pipeline")]
	EmptyStage,
	#[error("syntax error: missing file name after '{0}'")]
	MissingRedirectTarget(String),
	#[error("syntax error: empty pipeline")]
	EmptyPipeline,
	#[error("syntax error: '&' is only allowed at the end of the line")]
	MisplacedBackground,
	#[error("syntax error: unexpected '{0}'")]
	UnexpectedToken(String),
}

#[derive(Debug, Error)]
pub enum ExecError {
	#[error("child process creation failed: {0}")]
	ForkFailed(#[source] nix::Error),
	#[error("{program}: command not found")]
	ExecFailed { program: String },
	#[error("error in piping: {0}")]
	PipeCreationFailed(#[source] nix::Error),
	#[error("directory '{}' not found", .0.display())]
	DirectoryNotFound(PathBuf),
	#[error("no previous directory found")]
	NoPreviousDirectory,
	#[error("cd: HOME is not set")]
	HomeNotSet,
	#[error("{}: {source}", .path.display())]
	RedirectFailed {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
	#[error("exit: {0}: numeric argument required")]
	InvalidExitCode(String),
	#[error("argument contains a nul byte: {0:?}")]
	NulByte(String),
	#[error(transparent)]
	Io(#[from] io::Error),
	#[error(transparent)]
	Sys(#[from] nix::Error),
}

/// Everything the read-eval loop reports and recovers from.
#[derive(Debug, Error)]
pub enum ShellError {
	#[error(transparent)]
	Parse(#[from] ParseError),
	#[error(transparent)]
	Exec(#[from] ExecError),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn messages_are_single_line() {
		let errors: Vec<ShellError> = vec![
			ParseError::EmptyStage.into(),
			ParseError::MissingRedirectTarget(">".to_string()).into(),
			ExecError::DirectoryNotFound("/nowhere".into()).into(),
			ExecError::ForkFailed(nix::Error::EAGAIN).into(),
			ExecError::ExecFailed { program: "nope".to_string() }.into(),
		];
		for e in errors {
			assert!(!e.to_string().contains('\n'), "{}", e);
		}
	}

	#[test]
	fn directory_not_found_names_the_path() {
		let e = ExecError::DirectoryNotFound("/no/such".into());
		assert_eq!(e.to_string(), "directory '/no/such' not found");
	}
}
