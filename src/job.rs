use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};
use tracing::{debug, trace, warn};

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum State { Active, Terminated }

pub trait WaitStatusExt {
	fn state(self) -> State;
	fn code(self) -> i32;
}

impl WaitStatusExt for WaitStatus {
	fn state(self) -> State {
		match self {
			WaitStatus::Exited(..) | WaitStatus::Signaled(..) => State::Terminated,
			_ => State::Active,
		}
	}

	/// Shell-style status: exit code, or 128 + signal number.
	fn code(self) -> i32 {
		match self {
			WaitStatus::Exited(_, code) => code,
			WaitStatus::Signaled(_, sig, _) => 128 + sig as i32,
			_ => 0,
		}
	}
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Process {
	pub pid: Pid,
	pub status: WaitStatus,
}

fn wait_pid(pid: Pid, flags: Option<WaitPidFlag>) -> nix::Result<WaitStatus> {
	loop {
		match waitpid(pid, flags) {
			Err(Errno::EINTR) => continue,
			r => return r,
		}
	}
}

/// The processes forked for one pipeline, in stage order.
#[derive(Debug)]
pub struct Job {
	pub id: usize,
	pub processes: Vec<Process>,
	pub is_background: bool,
}

impl Job {
	pub fn state(&self) -> State {
		self.processes.iter().map(|pr| pr.status.state()).min().unwrap_or(State::Terminated)
	}

	pub fn pids(&self) -> Vec<Pid> {
		self.processes.iter().map(|pr| pr.pid).collect()
	}

	/// Status of the last stage.
	pub fn code(&self) -> i32 {
		self.processes.last().map_or(0, |pr| pr.status.code())
	}

	/// Blocks until every process of the job has terminated. A failed wait
	/// does not stop the others; the first error is returned at the end.
	pub fn wait(&mut self) -> nix::Result<i32> {
		let mut first_err = None;
		for pr in self.processes.iter_mut().filter(|pr| pr.status.state() == State::Active) {
			match wait_pid(pr.pid, None) {
				Ok(status) => {
					trace!(pid = pr.pid.as_raw(), status = ?status, "waited");
					pr.status = status;
				},
				Err(e) => {
					warn!(pid = pr.pid.as_raw(), error = %e, "wait failed");
					first_err = first_err.or(Some(e));
				},
			}
		}
		match first_err {
			Some(e) => Err(e),
			None => Ok(self.code()),
		}
	}

	/// Collects whichever processes have already terminated without blocking.
	pub fn poll(&mut self) -> nix::Result<State> {
		let mut first_err = None;
		for pr in self.processes.iter_mut().filter(|pr| pr.status.state() == State::Active) {
			match wait_pid(pr.pid, Some(WaitPidFlag::WNOHANG)) {
				Ok(WaitStatus::StillAlive) => {},
				Ok(status) => {
					trace!(pid = pr.pid.as_raw(), status = ?status, "reaped");
					pr.status = status;
				},
				Err(e) => {
					first_err = first_err.or(Some(e));
				},
			}
		}
		match first_err {
			Some(e) => Err(e),
			None => Ok(self.state()),
		}
	}
}

#[derive(Debug)]
pub struct JobBuilder {
	imp: Job,
}

impl JobBuilder {
	pub fn new(size_hint: usize, is_background: bool) -> JobBuilder {
		JobBuilder {
			imp: Job { id: 0, processes: Vec::with_capacity(size_hint), is_background: is_background }
		}
	}

	/// Forks and, in the parent, records the child.
	pub fn push_fork(&mut self) -> nix::Result<ForkResult> {
		// The child only rewires descriptors and execs before any other code runs.
		let r = unsafe { unistd::fork() }?;
		if let ForkResult::Parent { child } = r {
			debug!(pid = child.as_raw(), "forked");
			self.imp.processes.push(Process { pid: child, status: WaitStatus::StillAlive });
		}
		Ok(r)
	}

	pub fn is_empty(&self) -> bool {
		self.imp.processes.is_empty()
	}

	pub fn build(self) -> Job {
		self.imp
	}

	/// Waits for whatever was already forked when construction is aborted.
	pub fn abandon(self) {
		let mut job = self.imp;
		if let Err(e) = job.wait() {
			warn!(error = %e, "waiting for abandoned children failed");
		}
	}
}

/// Background jobs that have not been reaped yet.
#[derive(Debug, Default)]
pub struct JobTable {
	jobs: Vec<Option<Job>>,
}

impl JobTable {
	pub fn new() -> JobTable {
		JobTable { jobs: vec![] }
	}

	/// Stores a job in the lowest free slot and returns its 1-based id.
	pub fn push(&mut self, mut job: Job) -> usize {
		let idx = match self.jobs.iter().position(|o| o.is_none()) {
			Some(i) => i,
			None => {
				self.jobs.push(None);
				self.jobs.len() - 1
			},
		};
		job.id = idx + 1;
		self.jobs[idx] = Some(job);
		idx + 1
	}

	pub fn get(&self, id: usize) -> Option<&Job> {
		id.checked_sub(1).and_then(|i| self.jobs.get(i)).and_then(|o| o.as_ref())
	}

	pub fn len(&self) -> usize {
		self.jobs.iter().filter(|o| o.is_some()).count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Non-blocking pass over tracked pids; returns the jobs that finished.
	pub fn reap(&mut self) -> Vec<Job> {
		let mut done = vec![];
		for slot in self.jobs.iter_mut() {
			let finished = match *slot {
				Some(ref mut job) => match job.poll() {
					Ok(state) => state == State::Terminated,
					// Nothing left to wait for; the status is lost.
					Err(Errno::ECHILD) => {
						warn!(job = job.id, "background job no longer a child");
						true
					},
					Err(e) => {
						warn!(job = job.id, error = %e, "polling background job failed");
						false
					},
				},
				None => false,
			};
			if finished {
				if let Some(job) = slot.take() {
					debug!(job = job.id, "background job done");
					done.push(job);
				}
			}
		}
		let len = self.jobs.iter().rposition(|o| o.is_some()).map_or(0, |i| i + 1);
		self.jobs.truncate(len);
		done
	}
}
