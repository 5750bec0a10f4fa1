use std::io;
use std::process;

use argh::FromArgs;
use tracing_subscriber::EnvFilter;

use ish::config::{Config, DEFAULT_LOG_FILTER, LOG_ENV};
use ish::shell::{Flow, Shell};

#[derive(FromArgs)]
/// A small interactive command interpreter.
struct Args {
	/// run one command line and exit with its status
	#[argh(option, short = 'c')]
	command: Option<String>,

	/// do not print the welcome banner
	#[argh(switch, short = 'q')]
	quiet: bool,
}

fn init_logging() {
	let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(io::stderr)
		.with_target(false)
		.init();
}

fn main() {
	let args: Args = argh::from_env();
	init_logging();

	let mut config = Config::from_env();
	config.show_banner = !args.quiet && args.command.is_none();

	let mut shell = match Shell::new(config) {
		Ok(shell) => shell,
		Err(e) => {
			eprintln!("ish: cannot start: {}", e);
			process::exit(1);
		},
	};

	let code = match args.command {
		Some(line) => match shell.execute_line(&line) {
			Flow::Continue(code) | Flow::Exit(code) => code,
		},
		None => match shell.run() {
			Ok(code) => code,
			Err(e) => {
				eprintln!("ish: {}", e);
				1
			},
		},
	};
	process::exit(code);
}
