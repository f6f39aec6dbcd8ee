use crate::client::SignpostApiClient;
use crate::commands::print_result;
use signpost_api::service::{ServiceCommand, ServiceResult};

#[derive(Clone, Debug, clap::Args)]
pub struct Service {
    #[command(subcommand)]
    command: ServiceSubcommand,
}

#[derive(Clone, Debug, clap::Subcommand)]
enum ServiceSubcommand {
    /// Register a new service.
    Add { name: String },
    /// List every service.
    List,
    /// Show a service.
    Get { id: i64 },
    /// Change a service's active flag.
    Update {
        id: i64,
        #[arg(long)]
        active: Option<bool>,
    },
    /// Delete a service.
    Delete { id: i64 },
}

impl Service {
    pub async fn execute(self, client: SignpostApiClient) -> Result<(), String> {
        let command = match self.command {
            ServiceSubcommand::Add { name } => ServiceCommand::Add { name },
            ServiceSubcommand::List => ServiceCommand::List,
            ServiceSubcommand::Get { id } => ServiceCommand::Get { id },
            ServiceSubcommand::Update { id, active } => ServiceCommand::Update { id, active },
            ServiceSubcommand::Delete { id } => ServiceCommand::Delete { id },
        };
        let result: ServiceResult = client.call("kdc/service", &command).await?;
        print_result(&result);
        Ok(())
    }
}
