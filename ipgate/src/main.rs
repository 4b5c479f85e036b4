use std::process::exit;

use log::*;
use tokio::{signal::ctrl_c, task};

use ipgate::{
	conf::{Conf, GateConf},
	gate::{bind, gated},
	shared::SharedFilter,
};

#[tokio::main(flavor = "current_thread")]
async fn main() {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let conf_fn = std::env::args()
		.nth(1)
		.unwrap_or_else(|| "ipgate.conf".to_string());

	info!("read config from {}", &conf_fn);
	let (conf, filter, origin) = match GateConf::from_file(&conf_fn).and_then(|conf| {
		let filter = conf.build_filter()?;
		let origin = conf.origin()?;
		Ok((conf, filter, origin))
	}) {
		Ok(r) => r,
		Err(e) => {
			error!("{}: {}", &conf_fn, e);
			exit(1);
		}
	};
	info!(
		"rule {}, {} ranges",
		filter.rule(),
		filter.ranges().len()
	);
	let shared = SharedFilter::new(filter);

	let listener = match bind(conf.global.listen) {
		Ok(l) => l,
		Err(e) => {
			error!("failed to listen on {}: {}", conf.global.listen, e);
			exit(1);
		}
	};

	let local = task::LocalSet::new();
	#[cfg(unix)]
	local.spawn_local(reload_on_hangup(conf_fn.clone(), shared.clone()));
	local
		.run_until(gated(
			listener,
			origin,
			conf.global.connect_timeout,
			shared,
			async {
				match ctrl_c().await {
					Ok(()) => info!("ctrl-c received, exiting"),
					Err(e) => {
						error!("failed to listen for ctrl-c: {}", e);
						std::future::pending::<()>().await;
					}
				}
			},
		))
		.await;
}

// listen/origin changes still need a restart
#[cfg(unix)]
async fn reload_on_hangup(conf_fn: String, shared: SharedFilter) {
	use ipgate::shared::reload;
	use tokio::signal::unix::{signal, SignalKind};

	let mut hup = match signal(SignalKind::hangup()) {
		Ok(s) => s,
		Err(e) => {
			warn!("failed to install SIGHUP handler, reload disabled: {}", e);
			return;
		}
	};
	while hup.recv().await.is_some() {
		info!("SIGHUP received, reloading {}", &conf_fn);
		if let Err(e) = reload(&conf_fn, &shared) {
			error!("reload failed, keeping the current filter: {}", e);
		}
	}
}
