//! Turns the `HyParView` "decide, don't execute" action list into real
//! transport operations: `spec.md` §5's network driver owns every peer
//! connection, membership only describes what should happen to it.

use ember_net::PeerTable;
use ember_overlay::OverlayAction;
use tracing::{debug, warn};

pub async fn execute(table: &PeerTable, actions: Vec<OverlayAction>) {
    for action in actions {
        match action {
            OverlayAction::Connect { peer } => {
                if let Err(err) = table.dial(&peer).await {
                    warn!(%peer, %err, "overlay-driven dial failed");
                }
            }
            OverlayAction::Disconnect { peer } => {
                table.disconnect(&peer);
            }
            OverlayAction::Send { to, message } => {
                if let Err(err) = table.send_to(&to, message).await {
                    debug!(peer = %to, %err, "overlay message send failed, peer likely gone");
                }
            }
        }
    }
}
