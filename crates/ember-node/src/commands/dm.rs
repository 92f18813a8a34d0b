use super::{load_oneshot_config, DISSEMINATION_GRACE};
use anyhow::Result;
use clap::Parser;
use ember_node::Core;
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub struct DmArgs {
    /// Handle of the recipient.
    pub recipient: String,

    /// Message text.
    pub text: String,

    #[clap(long, default_value = "ember.toml")]
    pub config: PathBuf,

    #[clap(long = "bootstrap")]
    pub bootstrap_peers: Vec<String>,
}

pub async fn run(args: DmArgs) -> Result<()> {
    let mut core_config = load_oneshot_config(&args.config)?;
    core_config.bootstrap_peers.extend(args.bootstrap_peers);

    let mut core = Core::bootstrap(core_config).await?;
    core.join_bootstrap_peers().await;
    core.send_dm(args.recipient, args.text).await?;
    tokio::time::sleep(DISSEMINATION_GRACE).await;
    println!("dm sent (or queued for store-and-forward retry)");
    Ok(())
}
