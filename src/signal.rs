use std::io;
use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nix::sys::signal::{SigSet, Signal};
use signal_hook::consts::SIGINT;
use tracing::debug;

pub const CONFIRM_PROMPT: &str = "\nYou tried to interrupt shell\nDo you really want to interrupt shell? (Y/N): ";

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum State { Armed, ConfirmingExit }

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Decision { Quit, Resume }

fn is_affirmative(answer: &str) -> bool {
	match answer.trim_start().chars().next() {
		Some('y') | Some('Y') => true,
		_ => false,
	}
}

fn interrupt_mask() -> SigSet {
	let mut mask = SigSet::empty();
	mask.add(Signal::SIGINT);
	mask
}

/// Drops `SA_RESTART` from the installed SIGINT action so a blocked read
/// returns `EINTR` instead of resuming.
fn interrupt_blocking_reads() -> io::Result<()> {
	unsafe {
		let mut action: libc::sigaction = mem::zeroed();
		if libc::sigaction(libc::SIGINT, ptr::null(), &mut action) != 0 {
			return Err(io::Error::last_os_error());
		}
		action.sa_flags &= !libc::SA_RESTART;
		if libc::sigaction(libc::SIGINT, &action, ptr::null_mut()) != 0 {
			return Err(io::Error::last_os_error());
		}
	}
	Ok(())
}

/// SIGINT only raises a flag; the read-eval loop asks for confirmation
/// synchronously when it sees the flag.
pub struct SignalController {
	pending: Arc<AtomicBool>,
	state: State,
}

impl SignalController {
	pub fn install() -> io::Result<SignalController> {
		let pending = Arc::new(AtomicBool::new(false));
		signal_hook::flag::register(SIGINT, Arc::clone(&pending))?;
		interrupt_blocking_reads()?;
		Ok(SignalController { pending: pending, state: State::Armed })
	}

	pub fn state(&self) -> State {
		self.state
	}

	/// Records an interrupt that did not arrive as a signal, such as Ctrl-C
	/// read by the line editor.
	pub fn interrupt(&self) {
		self.pending.store(true, Ordering::SeqCst);
	}

	pub fn take_pending(&self) -> bool {
		self.pending.swap(false, Ordering::SeqCst)
	}

	/// Asks whether to quit. `ask` shows the prompt and returns one line of
	/// input, or `None` if nothing could be read. Further interrupts are held
	/// off while asking and discarded when the controller re-arms.
	pub fn confirm<F>(&mut self, ask: F) -> Decision where F: FnOnce(&str) -> Option<String> {
		self.state = State::ConfirmingExit;
		let mask = interrupt_mask();
		let blocked = mask.thread_block().is_ok();

		let decision = match ask(CONFIRM_PROMPT) {
			Some(ref answer) if is_affirmative(answer) => Decision::Quit,
			_ => Decision::Resume,
		};
		debug!(?decision, "interrupt confirmation");

		if decision == Decision::Resume {
			if blocked {
				let _ = mask.thread_unblock();
			}
			self.pending.store(false, Ordering::SeqCst);
			self.state = State::Armed;
		}
		decision
	}
}
