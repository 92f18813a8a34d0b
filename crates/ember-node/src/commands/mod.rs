pub mod dm;
pub mod identity;
pub mod post;
pub mod run;

use ember_node::CoreConfig;
use std::path::PathBuf;

/// Loads the node's persisted config (or its defaults, if none has been
/// saved yet) for a one-shot command. Binds to an OS-assigned loopback
/// port rather than the config's own `listen_addr`, since one-shot
/// commands run alongside a possibly-already-running `ember-node run`
/// that owns that address.
pub fn load_oneshot_config(path: &PathBuf) -> anyhow::Result<CoreConfig> {
    let mut config = CoreConfig::load_or_default(path)?;
    config.listen_addr = "127.0.0.1:0".to_string();
    Ok(config)
}

/// Time given to a one-shot command's outbound broadcasts to drain through
/// peer write queues before the process exits.
pub const DISSEMINATION_GRACE: std::time::Duration = std::time::Duration::from_millis(500);
