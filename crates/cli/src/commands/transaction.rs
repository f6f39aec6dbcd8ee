use crate::client::SignpostApiClient;
use crate::commands::print_result;
use signpost_api::transaction::{ServiceTransactionCommand, ServiceTransactionResult};

#[derive(Clone, Debug, clap::Args)]
pub struct Transaction {
    #[command(subcommand)]
    command: TransactionSubcommand,
}

#[derive(Clone, Debug, clap::Subcommand)]
enum TransactionSubcommand {
    /// Open a new service-component change transaction.
    Start {
        service_id: i64,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Stage a component addition.
    AddComponent { tx_id: String, component_id: String },
    /// Stage a component removal.
    RemoveComponent { tx_id: String, component_id: String },
    /// Preview the membership delta a transaction would produce.
    View { tx_id: String },
    /// Commit a transaction's staged changes.
    Commit {
        tx_id: String,
        #[arg(long)]
        dry_run: bool,
    },
    /// Discard a transaction without applying its staged changes.
    Rollback { tx_id: String },
    /// List every open transaction.
    List,
    /// Show a transaction.
    Get { tx_id: String },
    /// Roll back every transaction past its expiry.
    Cleanup,
}

impl Transaction {
    pub async fn execute(self, client: SignpostApiClient) -> Result<(), String> {
        let command = match self.command {
            TransactionSubcommand::Start { service_id, author, comment } => {
                ServiceTransactionCommand::Start { service_id, author, comment }
            }
            TransactionSubcommand::AddComponent { tx_id, component_id } => {
                ServiceTransactionCommand::AddComponent { tx_id, component_id }
            }
            TransactionSubcommand::RemoveComponent { tx_id, component_id } => {
                ServiceTransactionCommand::RemoveComponent { tx_id, component_id }
            }
            TransactionSubcommand::View { tx_id } => ServiceTransactionCommand::View { tx_id },
            TransactionSubcommand::Commit { tx_id, dry_run } => ServiceTransactionCommand::Commit { tx_id, dry_run },
            TransactionSubcommand::Rollback { tx_id } => ServiceTransactionCommand::Rollback { tx_id },
            TransactionSubcommand::List => ServiceTransactionCommand::List,
            TransactionSubcommand::Get { tx_id } => ServiceTransactionCommand::Get { tx_id },
            TransactionSubcommand::Cleanup => ServiceTransactionCommand::Cleanup,
        };
        let result: ServiceTransactionResult = client.call("kdc/service-transaction", &command).await?;
        print_result(&result);
        Ok(())
    }
}
