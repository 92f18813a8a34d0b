use anyhow::Result;
use clap::Parser;
use ember_node::{Core, CoreConfig};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the node's TOML configuration. Created with its defaults on
    /// first run if it does not already exist.
    #[clap(long, default_value = "ember.toml")]
    pub config: PathBuf,

    /// Overrides the configured listen address.
    #[clap(long)]
    pub listen: Option<String>,

    /// Additional bootstrap peers, `host:port` form, appended to any
    /// configured in `--config`.
    #[clap(long = "bootstrap")]
    pub bootstrap_peers: Vec<String>,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let path = args.config;
    let mut config = CoreConfig::load_or_default(&path)?;
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    config.bootstrap_peers.extend(args.bootstrap_peers);
    config.save(&path)?;

    info!(listen_addr = %config.listen_addr, handle = %config.handle, "bootstrapping ember node");
    let core = Core::bootstrap(config).await?;
    core.run().await
}
