use std::{fmt, net::IpAddr, str::FromStr};

use crate::{
	error::{ConfigError, Result},
	range::RangeMatcher,
};

pub const NOT_IN_ALLOW_LIST: &str = "address not in allow-list";
pub const IN_DENY_LIST: &str = "address in deny-list";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleType {
	Allow,
	Deny,
	/// no filtering, everything passes
	#[default]
	None,
}

impl FromStr for RuleType {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self> {
		match s.to_ascii_lowercase().as_str() {
			"allow" => Ok(RuleType::Allow),
			"deny" => Ok(RuleType::Deny),
			"none" => Ok(RuleType::None),
			_ => Err(ConfigError::UnknownRule(s.to_string())),
		}
	}
}

impl fmt::Display for RuleType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			RuleType::Allow => "allow",
			RuleType::Deny => "deny",
			RuleType::None => "none",
		})
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
	pub addr: IpAddr,
	pub reason: &'static str,
}

impl fmt::Display for Rejection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} rejected: {}", self.addr, self.reason)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
	Allowed,
	Rejected(Rejection),
}

impl Verdict {
	pub fn is_allowed(&self) -> bool {
		matches!(self, Verdict::Allowed)
	}

	/// Label for per-outcome counters.
	pub fn outcome(&self) -> &'static str {
		match self {
			Verdict::Allowed => "allowed",
			Verdict::Rejected(_) => "rejected",
		}
	}
}

/// An immutable rule set. Reconfiguration builds a new one instead of editing this.
#[derive(Debug, Clone, Default)]
pub struct AccessFilter {
	rule: RuleType,
	ranges: Vec<RangeMatcher>,
}

impl AccessFilter {
	/// Parses every range in order; the first bad one fails the whole build.
	pub fn build(ranges: impl IntoIterator<Item = impl AsRef<str>>, rule: RuleType) -> Result<Self> {
		let ranges = ranges
			.into_iter()
			.map(|r| {
				let r = r.as_ref();
				RangeMatcher::parse(r).map_err(|source| ConfigError::InvalidRange {
					range: r.to_string(),
					source,
				})
			})
			.collect::<Result<Vec<_>>>()?;
		Ok(Self { rule, ranges })
	}

	pub fn rule(&self) -> RuleType {
		self.rule
	}

	pub fn ranges(&self) -> &[RangeMatcher] {
		&self.ranges
	}

	pub fn matches(&self, addr: IpAddr) -> bool {
		self.ranges.iter().any(|r| r.contains(addr))
	}

	pub fn check(&self, addr: IpAddr) -> Verdict {
		self.verdict(addr, self.matches(addr))
	}

	/// Like `check`, but an IPv4-mapped IPv6 address also matches ranges
	/// written for its IPv4 form, as a dual-stack listener reports v4 peers.
	pub fn check_peer(&self, addr: IpAddr) -> Verdict {
		let v4 = addr.to_canonical();
		self.verdict(addr, self.matches(addr) || (v4 != addr && self.matches(v4)))
	}

	fn verdict(&self, addr: IpAddr, matched: bool) -> Verdict {
		match self.rule {
			RuleType::None => Verdict::Allowed,
			RuleType::Allow if matched => Verdict::Allowed,
			RuleType::Allow => Verdict::Rejected(Rejection {
				addr,
				reason: NOT_IN_ALLOW_LIST,
			}),
			RuleType::Deny if matched => Verdict::Rejected(Rejection {
				addr,
				reason: IN_DENY_LIST,
			}),
			RuleType::Deny => Verdict::Allowed,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use crate::range::ParseError;

	fn ip(s: &str) -> IpAddr {
		s.parse().unwrap()
	}

	const PROBES: [&str; 6] = [
		"0.0.0.0",
		"192.168.2.1",
		"255.255.255.255",
		"::",
		"fe80::1",
		"ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff",
	];

	#[test]
	fn test_rule_type() {
		let tests = [
			("allow", RuleType::Allow),
			("Deny", RuleType::Deny),
			("NONE", RuleType::None),
		];
		for (s, expected) in tests.iter() {
			let r: RuleType = s.parse().unwrap();
			assert_eq!(r, *expected);
			assert_eq!(r.to_string(), s.to_ascii_lowercase());
		}
		assert!(matches!(
			"block".parse::<RuleType>(),
			Err(ConfigError::UnknownRule(s)) if s == "block"
		));
	}

	#[test]
	fn test_none_allows_everything() {
		let f = AccessFilter::build(["192.168.2.0/24", "::/0"], RuleType::None).unwrap();
		for a in PROBES.iter() {
			assert_eq!(f.check(ip(a)), Verdict::Allowed);
		}
		let f = AccessFilter::build(Vec::<String>::new(), RuleType::None).unwrap();
		for a in PROBES.iter() {
			assert!(f.check(ip(a)).is_allowed());
		}
	}

	#[test]
	fn test_empty_lists() {
		let allow = AccessFilter::build(Vec::<&str>::new(), RuleType::Allow).unwrap();
		let deny = AccessFilter::build(Vec::<&str>::new(), RuleType::Deny).unwrap();
		for a in PROBES.iter() {
			assert_eq!(
				allow.check(ip(a)),
				Verdict::Rejected(Rejection {
					addr: ip(a),
					reason: NOT_IN_ALLOW_LIST
				})
			);
			assert_eq!(deny.check(ip(a)), Verdict::Allowed);
		}
	}

	#[test]
	fn test_deny() {
		let f = AccessFilter::build(["192.168.2.0/28", "192.168.2.25/28"], RuleType::Deny).unwrap();
		let tests = [
			("192.168.2.3", false),
			("192.168.2.26", false),
			("192.168.2.15", false),
			("192.168.2.16", false),
			("192.168.2.32", true),
			("192.162.1.1", true),
			("::c0a8:203", true),
		];
		for (a, allowed) in tests.iter() {
			let v = f.check(ip(a));
			assert_eq!(v.is_allowed(), *allowed, "{}", a);
			if let Verdict::Rejected(r) = v {
				assert_eq!(r.addr, ip(a));
				assert_eq!(r.reason, IN_DENY_LIST);
				assert_eq!(v.outcome(), "rejected");
			}
		}
	}

	#[test]
	fn test_allow() {
		let f = AccessFilter::build(
			["192.168.2.0/25", "fe80::202:b3ff:fe1e:8320/124"],
			RuleType::Allow,
		)
		.unwrap();
		let tests = [
			("192.168.2.1", true),
			("192.168.2.127", true),
			("192.168.2.128", false),
			("fe80::202:b3ff:fe1e:8320", true),
			("fe80::202:b3ff:fe1e:833f", false),
			("10.0.0.1", false),
		];
		for (a, allowed) in tests.iter() {
			let v = f.check(ip(a));
			assert_eq!(v.is_allowed(), *allowed, "{}", a);
			assert_eq!(v.outcome(), if *allowed { "allowed" } else { "rejected" });
		}
	}

	#[test]
	fn test_build_errors() {
		let tests = [
			("192.168.2.1/-1", ParseError::InvalidPrefix("192.168.2.1/-1".into())),
			("192.168.2.1/64", ParseError::InvalidPrefix("192.168.2.1/64".into())),
			("192.168.2.1", ParseError::MissingPrefix("192.168.2.1".into())),
			("localhost/8", ParseError::InvalidAddress("localhost/8".into())),
		];
		for (bad, expected) in tests.iter() {
			let err = AccessFilter::build(["10.0.0.0/8", *bad, "fe80::/64"], RuleType::Deny).unwrap_err();
			match err {
				ConfigError::InvalidRange { range, source } => {
					assert_eq!(&range, bad);
					assert_eq!(&source, expected);
				}
				e => panic!("unexpected error: {}", e),
			}
		}
	}

	#[test]
	fn test_ranges_kept_in_order() {
		let f = AccessFilter::build(["fe80::/64", "10.0.0.0/8"], RuleType::Allow).unwrap();
		let ranges: Vec<_> = f.ranges().iter().map(|r| r.to_string()).collect();
		assert_eq!(ranges, ["fe80::/64", "10.0.0.0/8"]);
		assert_eq!(f.rule(), RuleType::Allow);
	}

	#[test]
	fn test_check_peer_mapped() {
		let tests = [
			// (range, peer, matched)
			("192.168.2.0/28", "::ffff:192.168.2.3", true),
			("::ffff:192.168.2.0/120", "::ffff:192.168.2.3", true),
			("::ffff:192.168.2.0/120", "192.168.2.3", false),
			("192.168.2.0/28", "::ffff:192.168.2.99", false),
			("192.168.2.0/28", "::c0a8:203", false),
		];
		for (range, peer, matched) in tests.iter() {
			let deny = AccessFilter::build([*range], RuleType::Deny).unwrap();
			let allow = AccessFilter::build([*range], RuleType::Allow).unwrap();
			assert_eq!(!deny.check_peer(ip(peer)).is_allowed(), *matched, "{} {}", range, peer);
			assert_eq!(allow.check_peer(ip(peer)).is_allowed(), *matched, "{} {}", range, peer);
		}
		// check itself stays strict
		let deny = AccessFilter::build(["192.168.2.0/28"], RuleType::Deny).unwrap();
		assert!(deny.check(ip("::ffff:192.168.2.3")).is_allowed());
		match deny.check_peer(ip("::ffff:192.168.2.3")) {
			Verdict::Rejected(r) => assert_eq!(r.addr, ip("::ffff:192.168.2.3")),
			v => panic!("unexpected verdict: {:?}", v),
		}
	}

	#[test]
	fn test_none_still_parses_ranges() {
		// ranges are parsed eagerly whatever the rule
		let err = AccessFilter::build(["192.168.2.1/-1"], RuleType::None).unwrap_err();
		assert!(matches!(
			err,
			ConfigError::InvalidRange {
				source: ParseError::InvalidPrefix(_),
				..
			}
		));
		let f = AccessFilter::build(["192.168.2.0/24"], RuleType::None).unwrap();
		assert!(f.check_peer(ip("::ffff:192.168.2.1")).is_allowed());
	}
}
