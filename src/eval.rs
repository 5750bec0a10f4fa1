use std::env;
use std::ffi::{CString, OsString};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

use nix::fcntl::{self, OFlag};
use nix::sys::signal::{signal, SigHandler, Signal};
use nix::sys::stat::Mode;
use nix::unistd::{self, ForkResult, Pid};
use tracing::debug;

use crate::builtin;
use crate::error::ExecError;
use crate::global;
use crate::job::{Job, JobBuilder};
use crate::search;
use crate::types::{Pipeline, Redirection, Stage};

/// Name of the variable every exec'd child receives, holding the
/// interpreter's working directory.
pub const PARENT_DIR_KEY: &str = "parent";

const NEWLINE: &[u8] = b"\n";

/// Writes straight to fd 2 without going through the std stderr lock.
/// Used between fork and exec.
fn report(parts: &[&[u8]]) {
	for part in parts {
		let mut rest: &[u8] = part;
		while !rest.is_empty() {
			let n = unsafe { libc::write(libc::STDERR_FILENO, rest.as_ptr() as *const libc::c_void, rest.len()) };
			if n <= 0 { return; }
			rest = &rest[n as usize..];
		}
	}
}

fn cstring(bytes: Vec<u8>) -> Result<CString, ExecError> {
	CString::new(bytes).map_err(|e| ExecError::NulByte(String::from_utf8_lossy(&e.into_vec()).into_owned()))
}

/// Everything one child needs to exec its stage, built before forking.
struct ExecPlan {
	path: Option<CString>,
	argv: Vec<CString>,
	not_found: Vec<u8>,
	prefix: Vec<u8>,
}

impl ExecPlan {
	fn new(stage: &Stage) -> Result<ExecPlan, ExecError> {
		let argv = stage.argv().iter()
			.map(|a| cstring(a.clone().into_bytes()))
			.collect::<Result<Vec<CString>, ExecError>>()?;
		let not_found = ExecError::ExecFailed { program: stage.program().to_string() };
		Ok(ExecPlan {
			path: search::lookup(stage.program()),
			argv: argv,
			not_found: format!("ish: {}\n", not_found).into_bytes(),
			prefix: format!("ish: {}: ", stage.program()).into_bytes(),
		})
	}
}

/// Redirection targets as raw paths, plus their diagnostic prefixes.
struct RedirectPlan {
	input: Option<(CString, Vec<u8>)>,
	output: Option<(CString, Vec<u8>)>,
}

impl RedirectPlan {
	fn new(redirection: &Redirection) -> Result<RedirectPlan, ExecError> {
		fn target(path: Option<&PathBuf>) -> Result<Option<(CString, Vec<u8>)>, ExecError> {
			match path {
				None => Ok(None),
				Some(p) => {
					let prefix = format!("ish: {}: ", p.display()).into_bytes();
					Ok(Some((cstring(p.as_os_str().as_bytes().to_vec())?, prefix)))
				},
			}
		}
		Ok(RedirectPlan { input: target(redirection.input())?, output: target(redirection.output())? })
	}
}

/// The N-1 pipes of an N-stage pipeline. Dropping it closes every end.
struct Pipes {
	ends: Vec<(OwnedFd, OwnedFd)>,
}

impl Pipes {
	fn new(count: usize) -> Result<Pipes, ExecError> {
		let mut ends = Vec::with_capacity(count);
		for _ in 0..count {
			ends.push(unistd::pipe2(OFlag::O_CLOEXEC).map_err(ExecError::PipeCreationFailed)?);
		}
		Ok(Pipes { ends: ends })
	}

	fn read_end(&self, i: usize) -> RawFd {
		self.ends[i].0.as_raw_fd()
	}

	fn write_end(&self, i: usize) -> RawFd {
		self.ends[i].1.as_raw_fd()
	}

	fn raw_fds(&self) -> Vec<RawFd> {
		self.ends.iter().flat_map(|&(ref r, ref w)| vec![r.as_raw_fd(), w.as_raw_fd()]).collect()
	}

	/// Closes every end without dropping; only for a child about to exec.
	fn close_in_child(&self) {
		for &(ref r, ref w) in &self.ends {
			let _ = unistd::close(r.as_raw_fd());
			let _ = unistd::close(w.as_raw_fd());
		}
	}
}

fn redirect_fd(target: &(CString, Vec<u8>), oflag: OFlag, mode: Mode, onto: RawFd) {
	let (ref path, ref prefix) = *target;
	let fd = match fcntl::open(path.as_c_str(), oflag, mode) {
		Ok(fd) => fd,
		Err(e) => {
			report(&[&prefix[..], e.desc().as_bytes(), NEWLINE]);
			unsafe { libc::_exit(1) }
		},
	};
	if let Err(e) = unistd::dup2(fd, onto) {
		report(&[&prefix[..], e.desc().as_bytes(), NEWLINE]);
		unsafe { libc::_exit(1) }
	}
	let _ = unistd::close(fd);
}

/// Runs in the child of stage `i`: wires descriptors, then execs. Never returns.
fn exec_stage(i: usize, count: usize, pipes: &Pipes, plan: &ExecPlan, redirect: &RedirectPlan, envp: &[CString]) -> ! {
	unsafe {
		let _ = signal(Signal::SIGINT, SigHandler::SigDfl);
		let _ = signal(Signal::SIGPIPE, SigHandler::SigDfl);
	}

	let is_first = i == 0;
	let is_last = i + 1 == count;
	if !is_last {
		if let Err(e) = unistd::dup2(pipes.write_end(i), libc::STDOUT_FILENO) {
			report(&[&plan.prefix[..], e.desc().as_bytes(), NEWLINE]);
			unsafe { libc::_exit(1) }
		}
	}
	if !is_first {
		if let Err(e) = unistd::dup2(pipes.read_end(i - 1), libc::STDIN_FILENO) {
			report(&[&plan.prefix[..], e.desc().as_bytes(), NEWLINE]);
			unsafe { libc::_exit(1) }
		}
	}
	pipes.close_in_child();

	if is_first {
		if let Some(ref input) = redirect.input {
			redirect_fd(input, OFlag::O_RDONLY, Mode::empty(), libc::STDIN_FILENO);
		}
	}
	if is_last {
		if let Some(ref output) = redirect.output {
			let oflag = OFlag::O_CREAT | OFlag::O_TRUNC | OFlag::O_WRONLY;
			redirect_fd(output, oflag, Mode::S_IRUSR | Mode::S_IWUSR, libc::STDOUT_FILENO);
		}
	}

	let path = match plan.path {
		Some(ref path) => path,
		None => {
			report(&[&plan.not_found[..]]);
			unsafe { libc::_exit(127) }
		},
	};
	let Err(e) = unistd::execve(path, &plan.argv, envp);
	report(&[&plan.prefix[..], e.desc().as_bytes(), NEWLINE]);
	unsafe { libc::_exit(126) }
}

/// The child environment: the interpreter's own plus the working-directory marker.
fn child_env(cwd: &Path) -> Vec<CString> {
	let mut envp: Vec<CString> = env::vars_os()
		.filter(|&(ref k, _)| k.as_os_str() != PARENT_DIR_KEY)
		.filter_map(|(mut k, v)| CString::new({ k.push("="); k.push(v); k.into_vec() }).ok())
		.collect();
	let mut marker = OsString::from(PARENT_DIR_KEY);
	marker.push("=");
	marker.push(cwd.as_os_str());
	if let Ok(marker) = CString::new(marker.into_vec()) {
		envp.push(marker);
	}
	envp
}

fn spawn_stages(pipes: &Pipes, plans: &[ExecPlan], redirect: &RedirectPlan, envp: &[CString],
                job_builder: &mut JobBuilder) -> Result<(), ExecError> {
	for (i, plan) in plans.iter().enumerate() {
		match job_builder.push_fork().map_err(ExecError::ForkFailed)? {
			ForkResult::Parent { .. } => {},
			ForkResult::Child => exec_stage(i, plans.len(), pipes, plan, redirect, envp),
		}
	}
	Ok(())
}

/// Forks one process per stage, wired through pipes, and returns the job
/// without waiting. On failure nothing is left running or unreaped.
pub fn spawn_job(pipeline: &Pipeline, cwd: &Path) -> Result<Job, ExecError> {
	let count = pipeline.stages.len();
	let plans = pipeline.stages.iter().map(ExecPlan::new).collect::<Result<Vec<ExecPlan>, ExecError>>()?;
	let redirect = RedirectPlan::new(&pipeline.redirection)?;
	let envp = child_env(cwd);

	let pipes = Pipes::new(count.saturating_sub(1))?;
	debug!(stages = count, background = pipeline.is_background, fds = ?pipes.raw_fds(), "spawning pipeline");

	let mut job_builder = JobBuilder::new(count, pipeline.is_background);
	let spawned = spawn_stages(&pipes, &plans, &redirect, &envp, &mut job_builder);
	drop(pipes);

	match spawned {
		Ok(()) => Ok(job_builder.build()),
		Err(e) => {
			job_builder.abandon();
			Err(e)
		},
	}
}

#[derive(Debug, PartialEq, Eq)]
pub enum EvalResult {
	Done(i32),
	Running { job: usize, pids: Vec<Pid> },
	Exit(i32),
}

/// Runs a parsed line: builtins in-process, everything else as a job.
pub fn eval(state: &mut global::State, pipeline: &Pipeline) -> Result<EvalResult, ExecError> {
	if pipeline.is_single() {
		let stage = &pipeline.stages[0];
		if let Some(func) = builtin::match_builtin(stage.program()) {
			return match func(state, stage.arguments(), &pipeline.redirection)? {
				builtin::Outcome::Continue => Ok(EvalResult::Done(0)),
				builtin::Outcome::Exit(code) => Ok(EvalResult::Exit(code)),
			};
		}
	}

	let mut job = spawn_job(pipeline, &state.session.current_dir)?;
	if pipeline.is_background {
		let pids = job.pids();
		let id = state.jobs.push(job);
		debug!(job = id, "running in background");
		Ok(EvalResult::Running { job: id, pids: pids })
	} else {
		Ok(EvalResult::Done(job.wait()?))
	}
}
