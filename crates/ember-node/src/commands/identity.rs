use super::{load_oneshot_config, DISSEMINATION_GRACE};
use anyhow::Result;
use clap::{Parser, Subcommand};
use ember_node::{Core, CoreConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub struct IdentityArgs {
    #[clap(subcommand)]
    pub command: IdentityCommands,
}

#[derive(Subcommand, Debug)]
pub enum IdentityCommands {
    /// Broadcast a provisional claim for `handle` and persist it as this
    /// node's own identity once confirmation quorum is reached.
    Claim {
        handle: String,

        #[clap(long, default_value = "ember.toml")]
        config: PathBuf,

        /// Bootstrap peers to dial before broadcasting the claim.
        #[clap(long = "bootstrap")]
        bootstrap_peers: Vec<String>,
    },
}

pub async fn run(args: IdentityArgs) -> Result<()> {
    match args.command {
        IdentityCommands::Claim { handle, config, bootstrap_peers } => {
            let path = config;
            let mut core_config = load_oneshot_config(&path)?;
            core_config.bootstrap_peers.extend(bootstrap_peers);

            let mut core = Core::bootstrap(core_config).await?;
            core.join_bootstrap_peers().await;
            let claim = core.claim_identity(handle.clone()).await?;
            tokio::time::sleep(DISSEMINATION_GRACE).await;

            let mut persisted = CoreConfig::load_or_default(&path)?;
            persisted.handle = claim.handle;
            persisted.save(&path)?;

            println!("broadcast provisional claim for '{handle}'; awaiting confirmation quorum");
            Ok(())
        }
    }
}
