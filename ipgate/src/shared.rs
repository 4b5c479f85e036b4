use std::{path::Path, sync::Arc};

use log::*;
use tokio::sync::watch;

use crate::{
	conf::{Conf, GateConf},
	error::Result,
	filter::AccessFilter,
};

/// The currently published filter. Publishing swaps the whole snapshot,
/// readers holding an older `Arc` keep using it until they drop it.
#[derive(Clone)]
pub struct SharedFilter {
	tx: Arc<watch::Sender<Arc<AccessFilter>>>,
}

impl SharedFilter {
	pub fn new(filter: AccessFilter) -> Self {
		let (tx, _) = watch::channel(Arc::new(filter));
		Self { tx: Arc::new(tx) }
	}

	pub fn current(&self) -> Arc<AccessFilter> {
		self.tx.borrow().clone()
	}

	pub fn publish(&self, filter: AccessFilter) {
		self.tx.send_replace(Arc::new(filter));
	}
}

/// Rebuilds the filter from the conf file and publishes it.
/// On error the published filter stays as it was.
pub fn reload(conf: impl AsRef<Path>, shared: &SharedFilter) -> Result<()> {
	let conf = conf.as_ref();
	let filter = GateConf::from_file(conf)?.build_filter()?;
	info!(
		"reloaded {}: rule {}, {} ranges",
		conf.display(),
		filter.rule(),
		filter.ranges().len()
	);
	shared.publish(filter);
	Ok(())
}
