use clap::{Parser, Subcommand};
use shorturl_store::StoreConfig;

pub const TOKEN_ENV: &str = "SHORTURL_TOKEN";

#[derive(Debug, Parser)]
#[command(name = "shorturl", about = "Inspect and edit a short URL store")]
pub struct CLI {
    #[command(flatten)]
    pub store: StoreConfig,

    /// Owner token to act as. Defaults to the single-user token.
    #[arg(long, short = 't', env = TOKEN_ENV, global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Shorten a URL.
    Put { url: String },
    /// Resolve a short code.
    Get { code: String },
    /// Soft-delete one or more short codes and wait for the deletes to apply.
    Delete {
        #[arg(required = true)]
        codes: Vec<String>,
    },
    /// List the URLs shortened under the token.
    List,
    /// Print record and user counts.
    Stats,
    /// Check the relational backend.
    Ping,
}
