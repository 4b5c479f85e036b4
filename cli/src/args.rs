use std::net::IpAddr;

use clap::{Args, Parser, Subcommand};

use ipgate::filter::RuleType;

#[derive(Parser)]
pub struct CliArgs {
	#[command(subcommand)]
	pub cmd: Cmd,
}

#[derive(Args)]
pub struct CheckArgs {
	/// read rule and ranges from an ipgate conf file
	#[arg(short, long, conflicts_with_all = ["rule", "range"])]
	pub conf: Option<String>,

	#[arg(long, default_value = "deny")]
	pub rule: RuleType,

	/// CIDR, may be repeated
	#[arg(short, long)]
	pub range: Vec<String>,

	#[arg(required = true)]
	pub addrs: Vec<IpAddr>,
}

#[derive(Subcommand)]
pub enum Cmd {
	/// print the bounds of CIDR ranges
	Range { cidrs: Vec<String> },
	/// evaluate addresses against a filter
	Check(CheckArgs),
}
