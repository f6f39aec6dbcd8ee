use std::str::FromStr;

use bytes::Bytes;
use domain::base::Name;

use crate::client::SignpostApiClient;
use crate::commands::print_result;
use signpost_api::component::{NodeComponentCommand, NodeComponentResult};

#[derive(Clone, Debug, clap::Args)]
pub struct NodeComponent {
    #[command(subcommand)]
    command: NodeComponentSubcommand,
}

#[derive(Clone, Debug, clap::Subcommand)]
enum NodeComponentSubcommand {
    /// Assign a component to a node.
    Add { node_id: String, component_id: String },
    /// Unassign a component from a node.
    Delete { node_id: String, component_id: String },
    /// List a node's assigned components.
    List { node_id: String },
}

fn fqdn(name: &str) -> Result<Name<Bytes>, String> {
    Name::from_str(name).map_err(|_| format!("'{name}' is not a valid FQDN"))
}

impl NodeComponent {
    pub async fn execute(self, client: SignpostApiClient) -> Result<(), String> {
        let command = match self.command {
            NodeComponentSubcommand::Add { node_id, component_id } => {
                NodeComponentCommand::Add { node_id: fqdn(&node_id)?, component_id }
            }
            NodeComponentSubcommand::Delete { node_id, component_id } => {
                NodeComponentCommand::Delete { node_id: fqdn(&node_id)?, component_id }
            }
            NodeComponentSubcommand::List { node_id } => NodeComponentCommand::List { node_id: fqdn(&node_id)? },
        };
        let result: NodeComponentResult = client.call("kdc/node-component", &command).await?;
        print_result(&result);
        Ok(())
    }
}
