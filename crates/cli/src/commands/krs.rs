use std::str::FromStr;

use bytes::Bytes;
use domain::base::Name;

use crate::client::SignpostApiClient;
use crate::commands::print_result;
use signpost_api::krs::{KrsKeysCommand, KrsKeysResult};

#[derive(Clone, Debug, clap::Args)]
pub struct Krs {
    #[command(subcommand)]
    command: KrsSubcommand,
}

#[derive(Clone, Debug, clap::Subcommand)]
enum KrsSubcommand {
    /// List every key installed on this node.
    List,
    /// Show a single installed key.
    Get { zone: String, keytag: u16 },
    /// List the installed keys for one zone.
    GetByZone { zone: String },
    /// Compute a digest over the full installed key set, for drift comparison.
    Hash,
    /// Remove retired keys past their removal grace period.
    Purge,
    /// Delete a single installed key outright.
    Delete { zone: String, keytag: u16 },
}

fn fqdn(name: &str) -> Result<Name<Bytes>, String> {
    Name::from_str(name).map_err(|_| format!("'{name}' is not a valid FQDN"))
}

impl Krs {
    pub async fn execute(self, client: SignpostApiClient) -> Result<(), String> {
        let command = match self.command {
            KrsSubcommand::List => KrsKeysCommand::List,
            KrsSubcommand::Get { zone, keytag } => KrsKeysCommand::Get { zone: fqdn(&zone)?, keytag },
            KrsSubcommand::GetByZone { zone } => KrsKeysCommand::GetByZone { zone: fqdn(&zone)? },
            KrsSubcommand::Hash => KrsKeysCommand::Hash,
            KrsSubcommand::Purge => KrsKeysCommand::Purge,
            KrsSubcommand::Delete { zone, keytag } => KrsKeysCommand::Delete { zone: fqdn(&zone)?, keytag },
        };
        let result: KrsKeysResult = client.call("krs/keys", &command).await?;
        print_result(&result);
        Ok(())
    }
}
