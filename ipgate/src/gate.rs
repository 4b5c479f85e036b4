use std::{
	cell::RefCell,
	collections::BTreeMap,
	future::Future,
	io,
	net::SocketAddr,
	time::Duration,
};

use log::*;
use tokio::{
	io::copy_bidirectional,
	net::{TcpListener, TcpSocket, TcpStream},
	select, task,
	time::timeout,
};

use crate::{filter::Verdict, shared::SharedFilter};

/// Per-outcome totals, keyed by `Verdict::outcome`.
#[derive(Debug, Default)]
pub struct Counters {
	counts: RefCell<BTreeMap<&'static str, u64>>,
}

impl Counters {
	pub fn record(&self, v: &Verdict) {
		*self.counts.borrow_mut().entry(v.outcome()).or_default() += 1;
	}

	pub fn get(&self, outcome: &str) -> u64 {
		self.counts.borrow().get(outcome).copied().unwrap_or(0)
	}

	pub fn allowed(&self) -> u64 {
		self.get("allowed")
	}

	pub fn rejected(&self) -> u64 {
		self.get("rejected")
	}
}

pub fn bind(listen: SocketAddr) -> io::Result<TcpListener> {
	let s = match listen {
		SocketAddr::V4(_) => TcpSocket::new_v4()?,
		SocketAddr::V6(_) => TcpSocket::new_v6()?,
	};
	s.set_reuseaddr(true)?;
	s.bind(listen)?;
	s.listen(1024)
}

/// Runs the current filter against `peer` and records the outcome.
pub fn admit(filter: &SharedFilter, counters: &Counters, peer: SocketAddr) -> Verdict {
	let v = filter.current().check_peer(peer.ip());
	counters.record(&v);
	match &v {
		Verdict::Allowed => debug!("admit {}", peer),
		Verdict::Rejected(r) => info!("{} (port {})", r, peer.port()),
	}
	v
}

pub async fn gated(
	listener: TcpListener,
	origin: SocketAddr,
	connect_timeout: Duration,
	filter: SharedFilter,
	shutdown: impl Future<Output = ()>,
) -> Counters {
	let counters = Counters::default();
	tokio::pin!(shutdown);

	if let Ok(addr) = listener.local_addr() {
		info!("listening on TCP {}, forwarding to {}", addr, origin);
	}

	loop {
		select! {
			r = listener.accept() => {
				match r {
					Ok((socket, peer)) => {
						if admit(&filter, &counters, peer).is_allowed() {
							task::spawn_local(forward(socket, peer, origin, connect_timeout));
						} else {
							drop(socket);
						}
					}
					// usually fd exhaustion, keep serving
					Err(e) => error!("tcp accept error: {}", e),
				}
			}
			_ = &mut shutdown => {
				info!("shutting down");
				break;
			}
		}
	}
	for (outcome, n) in counters.counts.borrow().iter() {
		info!("{} connections {}", n, outcome);
	}
	counters
}

async fn forward(mut client: TcpStream, peer: SocketAddr, origin: SocketAddr, connect_timeout: Duration) {
	let _ = client.set_nodelay(true);
	let mut upstream = match timeout(connect_timeout, TcpStream::connect(origin)).await {
		Ok(Ok(s)) => s,
		Ok(Err(e)) => {
			warn!("failed to connect to origin {} for {}: {}", origin, peer, e);
			return;
		}
		Err(_) => {
			warn!("timeout while connecting to origin {} for {}", origin, peer);
			return;
		}
	};
	let _ = upstream.set_nodelay(true);
	match copy_bidirectional(&mut client, &mut upstream).await {
		Ok((up, down)) => debug!("{} closed, {} bytes up, {} bytes down", peer, up, down),
		Err(e) => debug!("{} closed with error: {}", peer, e),
	}
}
