use super::*;

mod midstate;
mod mine;
mod settings_cmd;
mod template;

#[derive(Debug, Parser)]
pub(crate) enum Subcommand {
    #[command(about = "Mine blocks against a node with the configured devices")]
    Mine(mine::Mine),
    #[command(about = "Print the midstate of a block header")]
    Midstate(midstate::Midstate),
    #[command(about = "Print resolved settings")]
    Settings(settings_cmd::SettingsCmd),
    #[command(about = "Fetch and assemble one block template")]
    Template(template::Template),
}

impl Subcommand {
    pub(crate) async fn run(self, settings: Settings, cancel_token: CancellationToken) -> Result {
        match self {
            Self::Mine(mine) => mine.run(settings, cancel_token).await,
            Self::Midstate(midstate) => midstate.run(),
            Self::Settings(settings_cmd) => settings_cmd.run(settings).await,
            Self::Template(template) => template.run(settings, cancel_token).await,
        }
    }
}
