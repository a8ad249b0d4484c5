//! Signed connection URL command.

use clap::Args;

use super::{create_client, print_verbose};
use crate::Cli;

/// Prints a signed bidirectional connection URL without connecting.
///
/// Useful for inspecting the signature a given credential set produces.
#[derive(Args)]
pub struct SignUrlCommand {}

impl SignUrlCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let client = create_client()?;
        let (url, connection_id) = client.signed_stream_url();

        print_verbose(cli, &format!("Connection ID: {}", connection_id));
        println!("{}", url);
        Ok(())
    }
}
