use std::str::FromStr;

use bytes::Bytes;
use domain::base::Name;

use crate::client::SignpostApiClient;
use crate::commands::print_result;
use signpost_api::zone::{ZoneCommand, ZoneResult};
use signpost_api::{Algorithm, KeyState, KeyType};

#[derive(Clone, Debug, clap::Args)]
pub struct Zone {
    #[command(subcommand)]
    command: ZoneSubcommand,
}

#[derive(Clone, Debug, clap::Subcommand)]
enum ZoneSubcommand {
    /// Register a new zone.
    Add { name: String, service_id: Option<i64> },
    /// List every zone.
    List,
    /// Show a zone.
    Get { name: String },
    /// List a zone's keys.
    Keys { name: String },
    /// Generate a new key for a zone.
    GenerateKey { name: String, key_type: CliKeyType, algorithm: CliAlgorithm },
    /// Encrypt a key for a specific node without creating a distribution record.
    EncryptKey { name: String, key_id: i64, node_id: String },
    /// Change a zone's active flag.
    Update {
        name: String,
        #[arg(long)]
        active: Option<bool>,
    },
    /// Delete a zone.
    Delete { name: String },
    /// Distribute a key to one node.
    DistribSingle { name: String, key_id: i64, node_id: String },
    /// Distribute a key to every node serving the zone.
    DistribMulti { name: String, key_id: i64 },
    /// Drive a key through its next lifecycle transition.
    Transition { key_id: i64, to: CliKeyState },
    /// Force a key directly into a lifecycle state, bypassing validation.
    Setstate { key_id: i64, to: CliKeyState },
    /// Delete a key outright.
    DeleteKey { key_id: i64 },
    /// Delete every retired/removed key of a zone.
    PurgeKeys { name: String },
    /// Reassign a zone to a different service.
    SetService { name: String, service_id: Option<i64> },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum CliKeyType {
    Ksk,
    Zsk,
    Csk,
}

impl From<CliKeyType> for KeyType {
    fn from(value: CliKeyType) -> Self {
        match value {
            CliKeyType::Ksk => KeyType::Ksk,
            CliKeyType::Zsk => KeyType::Zsk,
            CliKeyType::Csk => KeyType::Csk,
        }
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum CliAlgorithm {
    Ed25519,
    EcdsaP256,
    EcdsaP384,
    RsaSha256,
    RsaSha512,
}

impl From<CliAlgorithm> for Algorithm {
    fn from(value: CliAlgorithm) -> Self {
        match value {
            CliAlgorithm::Ed25519 => Algorithm::Ed25519,
            CliAlgorithm::EcdsaP256 => Algorithm::EcdsaP256,
            CliAlgorithm::EcdsaP384 => Algorithm::EcdsaP384,
            CliAlgorithm::RsaSha256 => Algorithm::RsaSha256,
            CliAlgorithm::RsaSha512 => Algorithm::RsaSha512,
        }
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum CliKeyState {
    Published,
    Standby,
    Active,
    ActiveDist,
    ActiveCe,
    Distributed,
    Edgesigner,
    Retired,
    Removed,
    Revoked,
}

impl From<CliKeyState> for KeyState {
    fn from(value: CliKeyState) -> Self {
        match value {
            CliKeyState::Published => KeyState::Published,
            CliKeyState::Standby => KeyState::Standby,
            CliKeyState::Active => KeyState::Active,
            CliKeyState::ActiveDist => KeyState::ActiveDist,
            CliKeyState::ActiveCe => KeyState::ActiveCe,
            CliKeyState::Distributed => KeyState::Distributed,
            CliKeyState::Edgesigner => KeyState::Edgesigner,
            CliKeyState::Retired => KeyState::Retired,
            CliKeyState::Removed => KeyState::Removed,
            CliKeyState::Revoked => KeyState::Revoked,
        }
    }
}

fn fqdn(name: &str) -> Result<Name<Bytes>, String> {
    Name::from_str(name).map_err(|_| format!("'{name}' is not a valid FQDN"))
}

impl Zone {
    pub async fn execute(self, client: SignpostApiClient) -> Result<(), String> {
        let command = match self.command {
            ZoneSubcommand::Add { name, service_id } => ZoneCommand::Add { name: fqdn(&name)?, service_id },
            ZoneSubcommand::List => ZoneCommand::List,
            ZoneSubcommand::Get { name } => ZoneCommand::Get { name: fqdn(&name)? },
            ZoneSubcommand::Keys { name } => ZoneCommand::GetKeys { name: fqdn(&name)? },
            ZoneSubcommand::GenerateKey { name, key_type, algorithm } => {
                ZoneCommand::GenerateKey { name: fqdn(&name)?, key_type: key_type.into(), algorithm: algorithm.into() }
            }
            ZoneSubcommand::EncryptKey { name, key_id, node_id } => {
                ZoneCommand::EncryptKey { name: fqdn(&name)?, key_id, node_id: fqdn(&node_id)? }
            }
            ZoneSubcommand::Update { name, active } => ZoneCommand::Update { name: fqdn(&name)?, active },
            ZoneSubcommand::Delete { name } => ZoneCommand::Delete { name: fqdn(&name)? },
            ZoneSubcommand::DistribSingle { name, key_id, node_id } => {
                ZoneCommand::DistribSingle { name: fqdn(&name)?, key_id, node_id: fqdn(&node_id)? }
            }
            ZoneSubcommand::DistribMulti { name, key_id } => ZoneCommand::DistribMulti { name: fqdn(&name)?, key_id },
            ZoneSubcommand::Transition { key_id, to } => ZoneCommand::Transition { key_id, to: to.into() },
            ZoneSubcommand::Setstate { key_id, to } => ZoneCommand::Setstate { key_id, to: to.into() },
            ZoneSubcommand::DeleteKey { key_id } => ZoneCommand::DeleteKey { key_id },
            ZoneSubcommand::PurgeKeys { name } => ZoneCommand::PurgeKeys { name: fqdn(&name)? },
            ZoneSubcommand::SetService { name, service_id } => ZoneCommand::SetService { name: fqdn(&name)?, service_id },
        };
        let result: ZoneResult = client.call("kdc/zone", &command).await?;
        print_result(&result);
        Ok(())
    }
}
