use std::{
	fs::File,
	io::{BufRead, BufReader},
	path::Path,
};

use log::*;

use crate::error::{ConfigError, Result};

pub fn read_lines(f: impl AsRef<Path>) -> Result<Vec<String>> {
	let f = f.as_ref();
	let io_err = |source: std::io::Error| ConfigError::Io {
		path: f.to_path_buf(),
		source,
	};
	let file = File::open(f).map_err(io_err)?;
	BufReader::new(file)
		.lines()
		.collect::<std::io::Result<_>>()
		.map_err(io_err)
}

/// Non-empty, non-comment lines, trimmed.
pub fn list_entries(lst: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<String> {
	lst.into_iter()
		.filter_map(|l| {
			let l = l.as_ref().trim_ascii();
			if l.is_empty() || l.starts_with('#') {
				None
			} else {
				Some(l.to_string())
			}
		})
		.collect()
}

pub fn read_list(f: impl AsRef<Path>) -> Result<Vec<String>> {
	let f = f.as_ref();
	let entries = list_entries(read_lines(f)?);
	info!("loaded {} entries from {}", entries.len(), f.display());
	Ok(entries)
}
