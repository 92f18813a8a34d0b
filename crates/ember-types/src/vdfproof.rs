//! Data shape of a Wesolowski-style VDF proof. The compute/verify logic lives
//! in `ember-vdf`; this crate only owns the serializable shape so that
//! `Identity` and `Post` can embed it without a dependency cycle.

use crate::b64;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VdfProof {
    #[serde(with = "b64::bytes")]
    pub y: Vec<u8>,
    #[serde(with = "b64::bytes")]
    pub pi: Vec<u8>,
    #[serde(with = "b64::bytes")]
    pub l: Vec<u8>,
    #[serde(with = "b64::bytes")]
    pub r: Vec<u8>,
    pub iterations: u64,
}
