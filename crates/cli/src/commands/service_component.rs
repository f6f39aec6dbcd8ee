use crate::client::SignpostApiClient;
use crate::commands::print_result;
use signpost_api::component::{ServiceComponentCommand, ServiceComponentResult};

#[derive(Clone, Debug, clap::Args)]
pub struct ServiceComponent {
    #[command(subcommand)]
    command: ServiceComponentSubcommand,
}

#[derive(Clone, Debug, clap::Subcommand)]
enum ServiceComponentSubcommand {
    /// Assign a component to a service.
    Add { service_id: i64, component_id: String },
    /// Unassign a component from a service.
    Delete { service_id: i64, component_id: String },
    /// List a service's assigned components.
    List { service_id: i64 },
    /// Atomically replace the full active component set of a service.
    Replace {
        service_id: i64,
        #[arg(required = true, num_args = 1..)]
        component_ids: Vec<String>,
    },
}

impl ServiceComponent {
    pub async fn execute(self, client: SignpostApiClient) -> Result<(), String> {
        let command = match self.command {
            ServiceComponentSubcommand::Add { service_id, component_id } => {
                ServiceComponentCommand::Add { service_id, component_id }
            }
            ServiceComponentSubcommand::Delete { service_id, component_id } => {
                ServiceComponentCommand::Delete { service_id, component_id }
            }
            ServiceComponentSubcommand::List { service_id } => ServiceComponentCommand::List { service_id },
            ServiceComponentSubcommand::Replace { service_id, component_ids } => {
                ServiceComponentCommand::Replace { service_id, component_ids }
            }
        };
        let result: ServiceComponentResult = client.call("kdc/service-component", &command).await?;
        print_result(&result);
        Ok(())
    }
}
