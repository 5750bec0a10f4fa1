use std::env;
use std::ffi::{CString, OsStr};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const PATH_KEY: &str = "PATH";

fn is_executable(path: &Path) -> bool {
	match path.metadata() {
		Ok(m) => m.is_file() && m.permissions().mode() & 0o111 != 0,
		Err(_) => false,
	}
}

/// Resolves a program name against `search_path` (a `PATH`-style list).
/// Names containing a slash are taken as paths and returned unchanged when
/// something exists there.
pub fn lookup_in(name: &str, search_path: &OsStr) -> Option<PathBuf> {
	if name.is_empty() {
		return None;
	}
	if name.contains('/') {
		let path = PathBuf::from(name);
		return if path.exists() { Some(path) } else { None };
	}
	env::split_paths(search_path)
		.map(|dir| dir.join(name))
		.find(|candidate| is_executable(candidate))
}

/// Resolves a program name against the interpreter's `PATH`, as a string
/// ready to hand to `execve`.
pub fn lookup(name: &str) -> Option<CString> {
	let search_path = env::var_os(PATH_KEY).unwrap_or_default();
	let path = lookup_in(name, &search_path)?;
	CString::new(path.as_os_str().as_bytes()).ok()
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;

	#[test]
	fn finds_first_executable_match() {
		let first = tempfile::tempdir().unwrap();
		let second = tempfile::tempdir().unwrap();
		for dir in &[&first, &second] {
			let tool = dir.path().join("tool");
			fs::write(&tool, "#!/bin/sh\n").unwrap();
			fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
		}
		let search = env::join_paths(&[first.path(), second.path()]).unwrap();
		assert_eq!(lookup_in("tool", &search), Some(first.path().join("tool")));
	}

	#[test]
	fn skips_non_executable_files() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("data"), "x").unwrap();
		assert_eq!(lookup_in("data", dir.path().as_os_str()), None);
	}

	#[test]
	fn names_with_slash_are_paths() {
		let dir = tempfile::tempdir().unwrap();
		let script = dir.path().join("run.sh");
		fs::write(&script, "#!/bin/sh\n").unwrap();
		let name = script.to_str().unwrap();
		assert_eq!(lookup_in(name, OsStr::new("")), Some(script.clone()));
		let missing = dir.path().join("nope");
		assert_eq!(lookup_in(missing.to_str().unwrap(), OsStr::new("")), None);
	}

	#[test]
	fn unknown_program() {
		assert_eq!(lookup("definitely-not-a-real-program-ish"), None);
		assert!(lookup("sh").is_some());
	}
}
