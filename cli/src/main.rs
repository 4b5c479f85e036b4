use std::process::ExitCode;

use clap::Parser;
use log::*;

use ipgate::{
	conf::{Conf, GateConf},
	error::Result,
	filter::{AccessFilter, Verdict},
	range::RangeMatcher,
};

mod args;
use args::*;

fn main() -> ExitCode {
	let args = CliArgs::parse();

	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

	match args.cmd {
		Cmd::Range { cidrs } => {
			range(&cidrs);
			ExitCode::SUCCESS
		}
		Cmd::Check(args) => match check(&args) {
			Ok(()) => ExitCode::SUCCESS,
			Err(e) => {
				error!("{}", e);
				ExitCode::FAILURE
			}
		},
	}
}

fn range(cidrs: &[String]) {
	for c in cidrs {
		match RangeMatcher::parse(c) {
			Ok(r) => println!(
				"{}\t{} /{}\t{} - {}\t{} host bits",
				c,
				r.family(),
				r.prefix_len(),
				r.low(),
				r.high(),
				r.host_bits()
			),
			Err(e) => println!("{}\terror: {}", c, e),
		}
	}
}

fn check(args: &CheckArgs) -> Result<()> {
	let filter = match &args.conf {
		Some(conf) => GateConf::from_file(conf)?.build_filter()?,
		None => AccessFilter::build(&args.range, args.rule)?,
	};
	info!(
		"rule {}, {} ranges",
		filter.rule(),
		filter.ranges().len()
	);
	for a in args.addrs.iter() {
		match filter.check(*a) {
			Verdict::Allowed => println!("{}\tallowed", a),
			Verdict::Rejected(r) => println!("{}\trejected ({})", a, r.reason),
		}
	}
	Ok(())
}
