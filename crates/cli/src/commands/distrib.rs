use crate::client::SignpostApiClient;
use crate::commands::print_result;
use signpost_api::distrib::{DistribCommand, DistribResult};

#[derive(Clone, Debug, clap::Args)]
pub struct Distrib {
    #[command(subcommand)]
    command: DistribSubcommand,
}

#[derive(Clone, Debug, clap::Subcommand)]
enum DistribSubcommand {
    /// List every distribution.
    List,
    /// Show a distribution's recipients and confirmation state.
    State { distribution_id: String },
    /// List completed distributions.
    Completed,
    /// Remove completed distributions past their grace period.
    Purge {
        #[arg(long)]
        force: bool,
    },
}

impl Distrib {
    pub async fn execute(self, client: SignpostApiClient) -> Result<(), String> {
        let command = match self.command {
            DistribSubcommand::List => DistribCommand::List,
            DistribSubcommand::State { distribution_id } => DistribCommand::State { distribution_id },
            DistribSubcommand::Completed => DistribCommand::Completed,
            DistribSubcommand::Purge { force } => DistribCommand::Purge { force },
        };
        let result: DistribResult = client.call("kdc/distrib", &command).await?;
        print_result(&result);
        Ok(())
    }
}
