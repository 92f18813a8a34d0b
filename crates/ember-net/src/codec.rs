//! Length-prefixed JSON-lines wire framing: `spec.md` §6 "Transport: a
//! bespoke length-prefixed JSON-lines protocol over `tokio::net::TcpStream`".
//!
//! The teacher crate builds its sync layer directly on `libp2p`'s own
//! framed substreams; this substrate's wire shapes (`PING`, `SUBSCRIBE`,
//! `e2e_dm`, ...) are plain tagged JSON objects, so framing here is a
//! length-delimited byte stream carrying one `serde_json`-encoded
//! [`Frame`] per socket frame, built directly on `tokio_util`'s codec
//! rather than a libp2p substream. `Frame` multiplexes the application
//! `WireMessage` catalog with `ember_overlay`'s separate HyParView control
//! messages over that same byte stream.

use crate::error::NetError;
use crate::frame::Frame;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

pub type MessageFramed = Framed<TcpStream, LengthDelimitedCodec>;

/// Wraps a connected socket in the length-delimited framing used for every
/// peer connection.
pub fn frame_stream(stream: TcpStream) -> MessageFramed {
    Framed::new(stream, LengthDelimitedCodec::new())
}

pub fn encode(frame: &Frame) -> Result<Vec<u8>, NetError> {
    Ok(serde_json::to_vec(frame)?)
}

/// Decodes one socket frame's bytes into a [`Frame`]. Unknown or malformed
/// payloads fail to deserialize here and are dropped by the caller with a
/// debug log (`spec.md` §9 "Polymorphism over wire messages").
pub fn decode(bytes: &[u8]) -> Result<Frame, NetError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_types::wire::WireMessage;

    #[test]
    fn encode_then_decode_round_trips() {
        let frame = Frame::Wire(WireMessage::Ping { rpc_id: "abc".into() });
        let bytes = encode(&frame).unwrap();
        let back = decode(&bytes).unwrap();
        match back {
            Frame::Wire(WireMessage::Ping { rpc_id }) => assert_eq!(rpc_id, "abc"),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_fails_to_decode() {
        let raw = br#"{"NotARealVariant":{}}"#;
        assert!(decode(raw).is_err());
    }
}
