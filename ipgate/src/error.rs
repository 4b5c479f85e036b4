use std::path::PathBuf;

use thiserror::Error;

use crate::range::ParseError;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("invalid range \"{range}\": {source}")]
	InvalidRange {
		range: String,
		#[source]
		source: ParseError,
	},

	#[error("unknown rule \"{0}\", expected allow, deny or none")]
	UnknownRule(String),

	#[error("line {line}: {reason}")]
	Syntax { line: usize, reason: String },

	#[error("invalid value for {key}: \"{value}\"")]
	InvalidValue { key: String, value: String },

	#[error("missing required key: {0}")]
	Missing(&'static str),

	#[error("failed to read {}: {source}", .path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

pub type Result<T> = std::result::Result<T, ConfigError>;
