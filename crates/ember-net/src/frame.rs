//! The two message families multiplexed over one connection: `spec.md` §6's
//! `WireMessage` catalog, and `ember_overlay`'s HyParView control messages
//! (`JOIN`/`FORWARD_JOIN`/...), which `spec.md` §6 never enumerates since
//! the distilled spec treats overlay membership as internal plumbing. Both
//! ride the same length-delimited JSON-lines socket, tagged by which
//! variant of `Frame` carries them.

use ember_overlay::OverlayMessage;
use ember_types::wire::WireMessage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Frame {
    Wire(WireMessage),
    Overlay(OverlayMessage),
}

impl From<WireMessage> for Frame {
    fn from(message: WireMessage) -> Self {
        Frame::Wire(message)
    }
}

impl From<OverlayMessage> for Frame {
    fn from(message: OverlayMessage) -> Self {
        Frame::Overlay(message)
    }
}
