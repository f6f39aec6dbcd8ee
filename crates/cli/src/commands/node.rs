use std::str::FromStr;

use bytes::Bytes;
use domain::base::Name;

use crate::client::SignpostApiClient;
use crate::commands::print_result;
use signpost_api::node::{NodeCommand, NodeResult};
use signpost_api::NodeState;

#[derive(Clone, Debug, clap::Args)]
pub struct Node {
    #[command(subcommand)]
    command: NodeSubcommand,
}

#[derive(Clone, Debug, clap::Subcommand)]
enum NodeSubcommand {
    /// Register a node, giving its base64-encoded static X25519 public key.
    Add { id: String, public_key: String, notify_addr: Option<String> },
    /// List every node.
    List,
    /// Show a node.
    Get { id: String },
    /// Change a node's NOTIFY address.
    Update { id: String, notify_addr: Option<String> },
    /// Change a node's health state.
    SetState { id: String, state: CliNodeState },
    /// Delete a node.
    Delete { id: String },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum CliNodeState {
    Online,
    Offline,
    Compromised,
    Suspended,
}

impl From<CliNodeState> for NodeState {
    fn from(value: CliNodeState) -> Self {
        match value {
            CliNodeState::Online => NodeState::Online,
            CliNodeState::Offline => NodeState::Offline,
            CliNodeState::Compromised => NodeState::Compromised,
            CliNodeState::Suspended => NodeState::Suspended,
        }
    }
}

fn fqdn(name: &str) -> Result<Name<Bytes>, String> {
    Name::from_str(name).map_err(|_| format!("'{name}' is not a valid FQDN"))
}

impl Node {
    pub async fn execute(self, client: SignpostApiClient) -> Result<(), String> {
        let command = match self.command {
            NodeSubcommand::Add { id, public_key, notify_addr } => NodeCommand::Add { id: fqdn(&id)?, public_key, notify_addr },
            NodeSubcommand::List => NodeCommand::List,
            NodeSubcommand::Get { id } => NodeCommand::Get { id: fqdn(&id)? },
            NodeSubcommand::Update { id, notify_addr } => NodeCommand::Update { id: fqdn(&id)?, notify_addr },
            NodeSubcommand::SetState { id, state } => NodeCommand::SetState { id: fqdn(&id)?, state: state.into() },
            NodeSubcommand::Delete { id } => NodeCommand::Delete { id: fqdn(&id)? },
        };
        let result: NodeResult = client.call("kdc/node", &command).await?;
        print_result(&result);
        Ok(())
    }
}
