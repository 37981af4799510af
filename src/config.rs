use std::collections::HashMap;
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

const ENV_FILE: &str = ".envrc";
const EXPORT_PREFIX: &str = "export ";
const DEFAULT_INSTANCE: &str = "https://login.microsoftonline.com/";

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("failed to parse {path}: {source}")]
	Parse {
		path: PathBuf,
		#[source]
		source: dotenvy::Error,
	},
	#[error("missing setting {0}: add `export {0}=...` to .envrc or set it in the environment")]
	Missing(&'static str),
}

/// Variables exported by a direnv-style `.envrc` file.
///
/// Only `export Key=Value` lines are read; other direnv directives are ignored.
#[derive(Debug, Clone, Default)]
pub struct EnvRc {
	vars: HashMap<String, String>,
}

impl EnvRc {
	/// Reads `<dir>/.envrc`, falling back to `./.envrc`. No file at all gives an empty set.
	pub fn load(dir: &Path) -> Result<Self, ConfigError> {
		let candidates = [dir.join(ENV_FILE), PathBuf::from(ENV_FILE)];
		for path in &candidates {
			if let Some(env_rc) = Self::from_path(path)? {
				debug!(path = %path.display(), vars = env_rc.vars.len(), "loaded env file");
				return Ok(env_rc);
			}
		}

		debug!(dir = %dir.display(), "no env file found");
		Ok(Self::default())
	}

	pub fn from_path(path: &Path) -> Result<Option<Self>, ConfigError> {
		let raw = match fs::read_to_string(path) {
			Ok(raw) => raw,
			Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
			Err(source) => {
				return Err(ConfigError::Io {
					path: path.to_path_buf(),
					source,
				});
			}
		};

		Self::parse(&raw)
			.map(Some)
			.map_err(|source| ConfigError::Parse {
				path: path.to_path_buf(),
				source,
			})
	}

	fn parse(raw: &str) -> Result<Self, dotenvy::Error> {
		let exports = raw
			.lines()
			.filter(|line| line.trim_start().starts_with(EXPORT_PREFIX))
			.collect::<Vec<_>>()
			.join("\n");

		let mut vars = HashMap::new();
		for item in dotenvy::from_read_iter(exports.as_bytes()) {
			let (key, value) = item?;
			vars.insert(key, value);
		}

		Ok(Self { vars })
	}

	/// The file's value, or the process environment variable of the same name.
	pub fn get(&self, key: &str) -> Option<String> {
		self.vars
			.get(key)
			.cloned()
			.or_else(|| env::var(key).ok())
			.filter(|value| !value.is_empty())
	}

	fn require(&self, key: &'static str) -> Result<String, ConfigError> {
		self.get(key).ok_or(ConfigError::Missing(key))
	}
}

/// Client-credentials material for the calendar service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Auth {
	pub instance: String,
	pub tenant_id: String,
	pub client_id: String,
	pub client_secret: String,
}

impl Auth {
	pub fn from_env(env_rc: &EnvRc) -> Result<Self, ConfigError> {
		Ok(Self {
			instance: env_rc
				.get("Instance")
				.unwrap_or_else(|| DEFAULT_INSTANCE.to_string()),
			tenant_id: env_rc.require("TenantId")?,
			client_id: env_rc.require("ClientId")?,
			client_secret: env_rc.require("ClientSecret")?,
		})
	}
}

pub fn user_name(cli_user: Option<String>, env_rc: &EnvRc) -> Result<String, ConfigError> {
	cli_user
		.filter(|user| !user.is_empty())
		.or_else(|| env_rc.get("UserName"))
		.ok_or(ConfigError::Missing("UserName"))
}
