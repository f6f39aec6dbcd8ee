use crate::client::SignpostApiClient;

mod component;
mod distrib;
mod krs;
mod node;
mod node_component;
mod service;
mod service_component;
mod transaction;
mod zone;

#[derive(Clone, Debug, clap::Subcommand)]
pub enum Command {
    /// Manage zones and their DNSSEC keys.
    Zone(zone::Zone),
    /// Manage nodes.
    Node(node::Node),
    /// Manage services.
    Service(service::Service),
    /// Manage components.
    Component(component::Component),
    /// Manage a service's assigned components.
    ServiceComponent(service_component::ServiceComponent),
    /// Manage a node's assigned components.
    NodeComponent(node_component::NodeComponent),
    /// Manage service-component change transactions.
    Transaction(transaction::Transaction),
    /// Inspect and purge distribution records.
    Distrib(distrib::Distrib),
    /// Inspect installed keys on a KRS node.
    Krs(krs::Krs),
}

impl Command {
    pub async fn execute(self, client: SignpostApiClient) -> Result<(), String> {
        match self {
            Command::Zone(cmd) => cmd.execute(client).await,
            Command::Node(cmd) => cmd.execute(client).await,
            Command::Service(cmd) => cmd.execute(client).await,
            Command::Component(cmd) => cmd.execute(client).await,
            Command::ServiceComponent(cmd) => cmd.execute(client).await,
            Command::NodeComponent(cmd) => cmd.execute(client).await,
            Command::Transaction(cmd) => cmd.execute(client).await,
            Command::Distrib(cmd) => cmd.execute(client).await,
            Command::Krs(cmd) => cmd.execute(client).await,
        }
    }
}

/// Pretty-print a JSON-serializable result to stdout.
pub(crate) fn print_result<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(err) => println!("<could not render result: {err}>"),
    }
}
