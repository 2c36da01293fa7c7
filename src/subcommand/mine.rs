use super::*;

#[derive(Debug, Parser)]
pub struct Mine {
    #[arg(long, help = "Exit after the first accepted block.")]
    once: bool,
}

impl Mine {
    pub async fn run(self, settings: Settings, cancel_token: CancellationToken) -> Result {
        let configs = settings.devices();

        ensure!(!configs.is_empty(), "No mining devices configured");

        let devices = configs
            .iter()
            .enumerate()
            .map(|(index, config)| config.build(index))
            .collect::<Result<Vec<_>>>()?;

        for device in &devices {
            info!("Using {device}");
        }

        let coinbase = settings.coinbase_config()?;
        let client = settings.node_client()?;
        let orchestrator = Orchestrator::new(devices, settings.timeout());

        Miner::new(client, orchestrator, coinbase)
            .once(self.once)
            .run(cancel_token)
            .await?;

        Ok(())
    }
}
