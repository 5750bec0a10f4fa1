use std::mem;
use std::path::{Path, PathBuf};

use nix::unistd;
use tracing::debug;

use crate::config::Config;
use crate::error::ExecError;
use crate::job::JobTable;

/// Directory state of the interpreter. Only `cd` mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
	pub current_dir: PathBuf,
	pub previous_dir: Option<PathBuf>,
}

impl Session {
	pub fn new() -> nix::Result<Session> {
		Ok(Session { current_dir: unistd::getcwd()?, previous_dir: None })
	}

	/// Changes the process working directory and remembers where it was.
	/// On failure nothing changes.
	pub fn change_dir(&mut self, target: &Path) -> Result<(), ExecError> {
		unistd::chdir(target).map_err(|_| ExecError::DirectoryNotFound(target.to_path_buf()))?;
		let now = unistd::getcwd()?;
		debug!(from = %self.current_dir.display(), to = %now.display(), "changed directory");
		self.previous_dir = Some(mem::replace(&mut self.current_dir, now));
		Ok(())
	}
}

pub struct State {
	pub session: Session,
	pub jobs: JobTable,
	pub config: Config,
}

impl State {
	pub fn new(config: Config) -> nix::Result<State> {
		Ok(State { session: Session::new()?, jobs: JobTable::new(), config: config })
	}
}
