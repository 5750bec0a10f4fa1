use std::env;
use std::path::PathBuf;

pub const LOG_ENV: &str = "ISH_LOG";
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	/// Shown in the prompt.
	pub logname: String,
	/// Target of a bare `cd`.
	pub home: Option<PathBuf>,
	pub show_banner: bool,
}

impl Config {
	pub fn from_env() -> Config {
		Config::from_lookup(|key| env::var(key).ok())
	}

	/// Builds a config from an arbitrary variable source. Empty values count
	/// as unset.
	pub fn from_lookup<F>(lookup: F) -> Config where F: Fn(&str) -> Option<String> {
		let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
		Config {
			logname: get("LOGNAME").or_else(|| get("USER")).unwrap_or_else(|| "user".to_string()),
			home: get("HOME").map(PathBuf::from),
			show_banner: true,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn config(vars: &[(&str, &str)]) -> Config {
		let map: HashMap<String, String> = vars.iter().map(|&(k, v)| (k.to_string(), v.to_string())).collect();
		Config::from_lookup(|k| map.get(k).cloned())
	}

	#[test]
	fn logname_falls_back_to_user() {
		assert_eq!(config(&[("LOGNAME", "alice"), ("USER", "bob")]).logname, "alice");
		assert_eq!(config(&[("USER", "bob")]).logname, "bob");
		assert_eq!(config(&[("LOGNAME", "")]).logname, "user");
	}

	#[test]
	fn missing_home_is_none() {
		assert_eq!(config(&[]).home, None);
		assert_eq!(config(&[("HOME", "/home/alice")]).home, Some(PathBuf::from("/home/alice")));
	}
}
