use std::fs::OpenOptions;
use std::io::{self, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use nix::unistd;
use tracing::debug;

use crate::error::ExecError;
use crate::global;
use crate::types::Redirection;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Outcome {
	Continue,
	Exit(i32),
}

pub type Builtin = fn(&mut global::State, &[String], &Redirection) -> Result<Outcome, ExecError>;

/// Points fd 1 at a file until dropped, then puts the original stdout back.
struct StdoutRedirect {
	saved: RawFd,
}

impl StdoutRedirect {
	fn to_file(path: &Path) -> Result<StdoutRedirect, ExecError> {
		let file = OpenOptions::new()
			.write(true)
			.create(true)
			.truncate(true)
			.mode(0o600)
			.open(path)
			.map_err(|e| ExecError::RedirectFailed { path: path.to_path_buf(), source: e })?;
		io::stdout().flush()?;
		let saved = unistd::dup(libc::STDOUT_FILENO)?;
		if let Err(e) = unistd::dup2(file.as_raw_fd(), libc::STDOUT_FILENO) {
			let _ = unistd::close(saved);
			return Err(e.into());
		}
		Ok(StdoutRedirect { saved: saved })
	}
}

impl Drop for StdoutRedirect {
	fn drop(&mut self) {
		let _ = io::stdout().flush();
		let _ = unistd::dup2(self.saved, libc::STDOUT_FILENO);
		let _ = unistd::close(self.saved);
	}
}

fn write_line(path: &Path) -> io::Result<()> {
	let stdout = io::stdout();
	let mut out = stdout.lock();
	out.write_all(path.as_os_str().as_bytes())?;
	out.write_all(b"\n")?;
	out.flush()
}

pub fn builtin_exit(_: &mut global::State, args: &[String], _: &Redirection) -> Result<Outcome, ExecError> {
	match args.first() {
		None => Ok(Outcome::Exit(0)),
		Some(arg) => arg.parse::<i32>()
			.map(Outcome::Exit)
			.map_err(|_| ExecError::InvalidExitCode(arg.clone())),
	}
}

pub fn builtin_cd(state: &mut global::State, args: &[String], _: &Redirection) -> Result<Outcome, ExecError> {
	let to_previous = args.first().map(String::as_str) == Some("-");
	let target: PathBuf = match args.first() {
		None => state.config.home.clone().ok_or(ExecError::HomeNotSet)?,
		Some(_) if to_previous => state.session.previous_dir.clone().ok_or(ExecError::NoPreviousDirectory)?,
		Some(dir) => PathBuf::from(dir),
	};
	state.session.change_dir(&target)?;
	if to_previous {
		write_line(&state.session.current_dir)?;
	}
	Ok(Outcome::Continue)
}

pub fn builtin_pwd(state: &mut global::State, _: &[String], redirection: &Redirection) -> Result<Outcome, ExecError> {
	match redirection.output() {
		None => write_line(&state.session.current_dir)?,
		Some(path) => {
			debug!(path = %path.display(), "pwd redirected");
			let _redirect = StdoutRedirect::to_file(path)?;
			write_line(&state.session.current_dir)?;
		},
	}
	Ok(Outcome::Continue)
}

pub fn match_builtin(name: &str) -> Option<Builtin> {
	match name {
		"exit" => Some(builtin_exit),
		"cd" => Some(builtin_cd),
		"pwd" => Some(builtin_pwd),
		_ => None,
	}
}
