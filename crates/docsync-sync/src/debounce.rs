//! §4.6 "Upstream observer (debounced): 2 s trailing, 10 s max-wait" as a
//! standalone task: it only turns a stream of "dirty" pings into `fire`
//! signals on `out`, decoupled from whatever the coordinator does when it
//! fires (§5 "the debounced upstream writer must fire at least once every
//! 10 s of continuous activity and within 2 s of quiescence").

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, sleep_until, Instant};

const TRAILING: Duration = Duration::from_secs(2);
const MAX_WAIT: Duration = Duration::from_secs(10);

/// Runs until `dirty` is closed. Each `fire` corresponds to one round of
/// pings that quiesced for `TRAILING` or hit `MAX_WAIT`, whichever first.
pub async fn run(mut dirty: mpsc::UnboundedReceiver<()>, fire: mpsc::UnboundedSender<()>) {
	loop {
		if dirty.recv().await.is_none() {
			return;
		}
		let deadline = Instant::now() + MAX_WAIT;
		loop {
			tokio::select! {
				_ = sleep(TRAILING) => break,
				_ = sleep_until(deadline) => break,
				received = dirty.recv() => {
					match received {
						Some(()) => continue,
						None => return,
					}
				}
			}
		}
		if fire.send(()).is_err() {
			return;
		}
	}
}

// vim: ts=4
