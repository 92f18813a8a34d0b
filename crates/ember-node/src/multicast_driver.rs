//! Executes `MulticastEngine`'s action list the same way `overlay_driver`
//! executes `HyParView`'s: `Send` goes straight to the peer's outbound
//! queue, `ScheduleGraftTimer` becomes a delayed re-injection of the grafted
//! timeout back into the main loop's event channel.

use ember_multicast::MulticastAction;
use ember_net::PeerTable;
use tokio::sync::mpsc;
use tracing::debug;

/// Fired back into the main loop once a scheduled graft timer elapses,
/// mirroring `spec.md` §4.8's "if no duplicate arrives before the timer
/// expires, graft back to that peer."
#[derive(Debug, Clone)]
pub struct GraftTimerFired {
    pub topic: String,
    pub msg_id: String,
    pub peer: String,
}

pub async fn execute(table: &PeerTable, timer_tx: &mpsc::Sender<GraftTimerFired>, actions: Vec<MulticastAction>) {
    for action in actions {
        match action {
            MulticastAction::Send { to, message } => {
                if let Err(err) = table.send_to(&to, message).await {
                    debug!(peer = %to, %err, "multicast message send failed, peer likely gone");
                }
            }
            MulticastAction::ScheduleGraftTimer { topic, msg_id, peer, after } => {
                let timer_tx = timer_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = timer_tx.send(GraftTimerFired { topic, msg_id, peer }).await;
                });
            }
        }
    }
}
