//! Kept in its own test binary: it inspects the process-wide descriptor table.
#![cfg(target_os = "linux")]

use std::fs;
use std::path::Path;

use ish::eval::spawn_job;
use ish::parser::parse;
use ish::tokenizer::tokenize;

fn open_descriptors() -> usize {
	fs::read_dir("/proc/self/fd").unwrap().count()
}

#[test]
fn pipeline_leaves_no_descriptor_open() {
	let line = "false | true | cat /dev/null";
	let pipeline = parse(&tokenize(line)).unwrap();
	let before = open_descriptors();

	let mut job = spawn_job(&pipeline, Path::new("/")).unwrap();
	assert_eq!(open_descriptors(), before);
	assert_eq!(job.wait().unwrap(), 0);
	assert_eq!(job.pids().len(), 3);
	assert_eq!(open_descriptors(), before);
}
