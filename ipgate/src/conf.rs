// a small ini-like reader:
//	warn on unknown keys and sections
//	keep section order
//	fail on lines that can't be a key = value

use std::path::Path;

use log::warn;

use crate::{
	error::{ConfigError, Result},
	utils::read_lines,
};

// this is the part that's generic

pub trait Section {
	fn set(&mut self, k: &str, v: &str) -> Result<()>;
}

pub trait Conf: Sized {
	fn new() -> Self;
	/// `None` for sections this conf doesn't know about.
	fn sec_mut(&mut self, name: &str) -> Option<&mut dyn Section>;

	fn from_lines(conf: impl IntoIterator<Item = impl AsRef<str>>) -> Result<Self> {
		let mut ret = Self::new();
		// outer None: before any section, inner None: unknown section
		let mut sec: Option<Option<String>> = None;
		for (i, l) in conf.into_iter().enumerate() {
			let l = l.as_ref().trim_ascii();
			if l.is_empty() || l.starts_with('#') {
				// empty line or comment
			} else if l.starts_with('[') && l.ends_with(']') {
				let name = l[1..l.len() - 1].trim_ascii().to_ascii_lowercase();
				if ret.sec_mut(&name).is_some() {
					sec = Some(Some(name));
				} else {
					warn!("unknown section: [{}]", name);
					sec = Some(None);
				}
			} else if let Some(name) = sec.as_ref() {
				let Some((k, v)) = l.split_once('=') else {
					return Err(ConfigError::Syntax {
						line: i + 1,
						reason: format!("expected key = value, got \"{}\"", l),
					});
				};
				if let Some(s) = name.as_deref().and_then(|n| ret.sec_mut(n)) {
					s.set(&k.trim_ascii_end().to_ascii_lowercase(), v.trim_ascii_start())?;
				}
			} else {
				warn!("invalid line, not in a section: {}", l);
			}
		}
		Ok(ret)
	}

	fn from_file(conf: impl AsRef<Path>) -> Result<Self> {
		Self::from_lines(read_lines(conf)?)
	}
}

// the following is specific to ipgate's conf

use std::{net::SocketAddr, str::FromStr, time::Duration};

use crate::{
	filter::{AccessFilter, RuleType},
	utils::read_list,
};

fn parse_value<T: FromStr>(k: &str, v: &str) -> Result<T> {
	v.parse().map_err(|_| ConfigError::InvalidValue {
		key: k.to_string(),
		value: v.to_string(),
	})
}

#[derive(Debug)]
pub struct GateConf {
	pub global: GlobalSec,
	pub filter: FilterSec,
}

impl Conf for GateConf {
	fn new() -> Self {
		Self {
			global: GlobalSec::new(),
			filter: FilterSec::default(),
		}
	}

	fn sec_mut(&mut self, name: &str) -> Option<&mut dyn Section> {
		match name {
			"global" => Some(&mut self.global),
			"filter" => Some(&mut self.filter),
			_ => None,
		}
	}
}

impl GateConf {
	/// Inline ranges first, then every range file in order.
	pub fn build_filter(&self) -> Result<AccessFilter> {
		let mut ranges = self.filter.ranges.clone();
		for f in self.filter.range_files.iter() {
			ranges.extend(read_list(f)?);
		}
		AccessFilter::build(ranges, self.filter.rule)
	}

	pub fn origin(&self) -> Result<SocketAddr> {
		self.global.origin.ok_or(ConfigError::Missing("origin"))
	}
}

#[derive(Debug)]
pub struct GlobalSec {
	pub listen: SocketAddr,
	pub origin: Option<SocketAddr>,
	pub connect_timeout: Duration,
}

impl GlobalSec {
	fn new() -> Self {
		Self {
			listen: SocketAddr::from(([127, 0, 0, 1], 1080)),
			origin: None,
			connect_timeout: Duration::from_secs(5),
		}
	}
}

impl Section for GlobalSec {
	fn set(&mut self, k: &str, v: &str) -> Result<()> {
		match k {
			"listen" => self.listen = parse_value(k, v)?,
			"origin" => self.origin = Some(parse_value(k, v)?),
			"connect_timeout" => self.connect_timeout = Duration::from_secs(parse_value(k, v)?),
			_ => warn!("unknown key: \"{}\"", k),
		}
		Ok(())
	}
}

#[derive(Debug, Default)]
pub struct FilterSec {
	pub rule: RuleType,
	pub ranges: Vec<String>,
	pub range_files: Vec<String>,
}

impl Section for FilterSec {
	fn set(&mut self, k: &str, v: &str) -> Result<()> {
		match k {
			"rule" => self.rule = v.parse()?,
			"ranges" => self
				.ranges
				.extend(v.split_ascii_whitespace().map(|s| s.to_string())),
			"range_files" => self
				.range_files
				.extend(v.split_ascii_whitespace().map(|s| s.to_string())),
			_ => warn!("unknown key: \"{}\"", k),
		}
		Ok(())
	}
}
