use crate::client::SignpostApiClient;
use crate::commands::print_result;
use signpost_api::component::{ComponentCommand, ComponentResult};

#[derive(Clone, Debug, clap::Args)]
pub struct Component {
    #[command(subcommand)]
    command: ComponentSubcommand,
}

#[derive(Clone, Debug, clap::Subcommand)]
enum ComponentSubcommand {
    /// Register a new component. Ids starting with "sign_" are treated as system components.
    Add { id: String, name: String },
    /// List every component.
    List,
    /// Show a component.
    Get { id: String },
    /// Change a component's active flag.
    Update {
        id: String,
        #[arg(long)]
        active: Option<bool>,
    },
    /// Delete a component. System components cannot be deleted.
    Delete { id: String },
}

impl Component {
    pub async fn execute(self, client: SignpostApiClient) -> Result<(), String> {
        let command = match self.command {
            ComponentSubcommand::Add { id, name } => ComponentCommand::Add { id, name },
            ComponentSubcommand::List => ComponentCommand::List,
            ComponentSubcommand::Get { id } => ComponentCommand::Get { id },
            ComponentSubcommand::Update { id, active } => ComponentCommand::Update { id, active },
            ComponentSubcommand::Delete { id } => ComponentCommand::Delete { id },
        };
        let result: ComponentResult = client.call("kdc/component", &command).await?;
        print_result(&result);
        Ok(())
    }
}
