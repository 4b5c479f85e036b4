use std::{
	fmt,
	net::{IpAddr, Ipv4Addr, Ipv6Addr},
	str::FromStr,
};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
	V4,
	V6,
}

impl AddressFamily {
	pub fn of(addr: IpAddr) -> Self {
		match addr {
			IpAddr::V4(_) => AddressFamily::V4,
			IpAddr::V6(_) => AddressFamily::V6,
		}
	}

	/// Address width in bits, also the largest valid prefix length.
	pub const fn bits(self) -> u32 {
		match self {
			AddressFamily::V4 => 32,
			AddressFamily::V6 => 128,
		}
	}
}

impl fmt::Display for AddressFamily {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AddressFamily::V4 => f.write_str("IPv4"),
			AddressFamily::V6 => f.write_str("IPv6"),
		}
	}
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
	#[error("missing prefix length in \"{0}\"")]
	MissingPrefix(String),
	#[error("invalid address in \"{0}\"")]
	InvalidAddress(String),
	#[error("invalid prefix length in \"{0}\"")]
	InvalidPrefix(String),
}

// bounds are kept at the native width of the family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Bounds {
	V4 { low: u32, high: u32 },
	V6 { low: u128, high: u128 },
}

/// One CIDR block, stored as its inclusive `low..=high` bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RangeMatcher {
	prefix_len: u8,
	bounds: Bounds,
}

// the bottom `32 - prefix_len` bits
fn host_mask4(prefix_len: u32) -> u32 {
	u32::MAX.checked_shr(prefix_len).unwrap_or(0)
}

fn host_mask6(prefix_len: u32) -> u128 {
	u128::MAX.checked_shr(prefix_len).unwrap_or(0)
}

impl RangeMatcher {
	/// Parses `address/prefix`. Only literal addresses are accepted, nothing is resolved.
	pub fn parse(s: &str) -> Result<Self, ParseError> {
		let (addr, len) = s
			.split_once('/')
			.ok_or_else(|| ParseError::MissingPrefix(s.to_string()))?;
		let addr: IpAddr = addr
			.parse()
			.map_err(|_| ParseError::InvalidAddress(s.to_string()))?;
		let family = AddressFamily::of(addr);
		let prefix_len: u32 = len
			.parse()
			.ok()
			.filter(|l| *l <= family.bits())
			.ok_or_else(|| ParseError::InvalidPrefix(s.to_string()))?;
		Ok(Self::new(addr, prefix_len as u8))
	}

	// prefix_len must already be checked against the family
	fn new(addr: IpAddr, prefix_len: u8) -> Self {
		let bounds = match addr {
			IpAddr::V4(a) => {
				let host = host_mask4(prefix_len as u32);
				let low = u32::from(a) & !host;
				Bounds::V4 {
					low,
					high: low | host,
				}
			}
			IpAddr::V6(a) => {
				let host = host_mask6(prefix_len as u32);
				let low = u128::from(a) & !host;
				Bounds::V6 {
					low,
					high: low | host,
				}
			}
		};
		Self { prefix_len, bounds }
	}

	pub fn family(&self) -> AddressFamily {
		match self.bounds {
			Bounds::V4 { .. } => AddressFamily::V4,
			Bounds::V6 { .. } => AddressFamily::V6,
		}
	}

	pub fn prefix_len(&self) -> u8 {
		self.prefix_len
	}

	/// Number of bits free to vary inside the range.
	pub fn host_bits(&self) -> u32 {
		self.family().bits() - self.prefix_len as u32
	}

	/// Network address, host bits cleared.
	pub fn low(&self) -> IpAddr {
		match self.bounds {
			Bounds::V4 { low, .. } => IpAddr::V4(Ipv4Addr::from(low)),
			Bounds::V6 { low, .. } => IpAddr::V6(Ipv6Addr::from(low)),
		}
	}

	/// Last address of the range, host bits set.
	pub fn high(&self) -> IpAddr {
		match self.bounds {
			Bounds::V4 { high, .. } => IpAddr::V4(Ipv4Addr::from(high)),
			Bounds::V6 { high, .. } => IpAddr::V6(Ipv6Addr::from(high)),
		}
	}

	/// Addresses of the other family are never contained.
	pub fn contains(&self, addr: IpAddr) -> bool {
		match (self.bounds, addr) {
			(Bounds::V4 { low, high }, IpAddr::V4(a)) => (low..=high).contains(&u32::from(a)),
			(Bounds::V6 { low, high }, IpAddr::V6(a)) => (low..=high).contains(&u128::from(a)),
			_ => false,
		}
	}
}

impl FromStr for RangeMatcher {
	type Err = ParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl fmt::Display for RangeMatcher {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.low(), self.prefix_len)
	}
}
