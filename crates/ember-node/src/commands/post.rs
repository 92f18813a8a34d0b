use super::{load_oneshot_config, DISSEMINATION_GRACE};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ember_node::Core;
use ember_types::post::Vote;
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub struct PostArgs {
    #[clap(subcommand)]
    pub command: PostCommands,
}

#[derive(Subcommand, Debug)]
pub enum PostCommands {
    /// Compose and broadcast a new post, optionally as a reply.
    Compose {
        content: String,

        /// Hex-encoded id of the post this replies to.
        #[clap(long)]
        parent: Option<String>,

        #[clap(long, default_value = "ember.toml")]
        config: PathBuf,

        #[clap(long = "bootstrap")]
        bootstrap_peers: Vec<String>,
    },

    /// Flip this node's own carrier membership on a post.
    Carry {
        post_id: String,

        #[clap(long, default_value = "ember.toml")]
        config: PathBuf,

        #[clap(long = "bootstrap")]
        bootstrap_peers: Vec<String>,
    },

    /// Cast this node's vote on a post.
    Vote {
        post_id: String,

        #[clap(value_enum)]
        direction: VoteDirection,

        #[clap(long, default_value = "ember.toml")]
        config: PathBuf,

        #[clap(long = "bootstrap")]
        bootstrap_peers: Vec<String>,
    },
}

#[derive(Clone, Debug, ValueEnum)]
pub enum VoteDirection {
    Up,
    Down,
}

fn parse_post_id(hex_id: &str) -> Result<[u8; 16]> {
    let bytes = hex::decode(hex_id).context("post id must be hex-encoded")?;
    bytes.try_into().map_err(|b: Vec<u8>| anyhow::anyhow!("expected a 16-byte post id, got {} bytes", b.len()))
}

pub async fn run(args: PostArgs) -> Result<()> {
    match args.command {
        PostCommands::Compose { content, parent, config, bootstrap_peers } => {
            let parent_id = parent.map(|p| parse_post_id(&p)).transpose()?;
            let mut core_config = load_oneshot_config(&config)?;
            core_config.bootstrap_peers.extend(bootstrap_peers);

            let mut core = Core::bootstrap(core_config).await?;
            core.join_bootstrap_peers().await;
            core.compose_post(content, parent_id, None).await?;
            tokio::time::sleep(DISSEMINATION_GRACE).await;
            println!("post broadcast");
            Ok(())
        }

        PostCommands::Carry { post_id, config, bootstrap_peers } => {
            let id = parse_post_id(&post_id)?;
            let mut core_config = load_oneshot_config(&config)?;
            core_config.bootstrap_peers.extend(bootstrap_peers);

            let mut core = Core::bootstrap(core_config).await?;
            core.join_bootstrap_peers().await;
            core.toggle_carry(id).await?;
            tokio::time::sleep(DISSEMINATION_GRACE).await;
            println!("carrier update broadcast");
            Ok(())
        }

        PostCommands::Vote { post_id, direction, config, bootstrap_peers } => {
            let id = parse_post_id(&post_id)?;
            let vote = match direction {
                VoteDirection::Up => Vote::Up,
                VoteDirection::Down => Vote::Down,
            };
            let mut core_config = load_oneshot_config(&config)?;
            core_config.bootstrap_peers.extend(bootstrap_peers);

            let mut core = Core::bootstrap(core_config).await?;
            core.join_bootstrap_peers().await;
            core.cast_vote(id, vote).await?;
            tokio::time::sleep(DISSEMINATION_GRACE).await;
            println!("rating broadcast");
            Ok(())
        }
    }
}
