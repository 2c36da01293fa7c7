use super::*;

/// Control loop: fetch a template, race the devices on it, submit the winner.
pub struct Miner {
    client: NodeClient,
    orchestrator: Orchestrator,
    coinbase: CoinbaseConfig,
    once: bool,
}

impl Miner {
    pub fn new(client: NodeClient, orchestrator: Orchestrator, coinbase: CoinbaseConfig) -> Self {
        Self {
            client,
            orchestrator,
            coinbase,
            once: false,
        }
    }

    /// Stop after the first accepted block.
    pub fn once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    /// Runs until cancelled, or after the first accepted block when `once`
    /// is set. Only fatal configuration and transport errors are returned.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), MinerError> {
        info!(
            "Mining against {} with {} device(s)",
            self.client.server(),
            self.orchestrator.devices().len()
        );

        loop {
            let raw = tokio::select! {
                raw = self.client.fetch_template() => raw?,
                _ = cancel.cancelled() => break,
            };

            let template = Arc::new(BlockTemplate::new(raw, &self.coinbase)?);

            info!("New template for {}", template.block_info(None));
            debug!("Coinbase txid {}", template.coinbase_txid());

            let outcome = self.orchestrator.race(template.clone(), None, &cancel).await;

            if cancel.is_cancelled() {
                break;
            }

            let Outcome::Won { device, nonce } = outcome else {
                info!("No block found for height {}", template.height());
                continue;
            };

            info!("{device} solved {}", template.block_info(Some(nonce)));

            let block = template.serialize_block(nonce)?;

            debug!("Block {block}");

            let accepted = tokio::select! {
                accepted = self.client.submit_block(&block) => accepted,
                _ = cancel.cancelled() => break,
            };

            if accepted {
                info!("Block accepted: {}", template.reward_info());

                if self.once {
                    break;
                }
            } else {
                warn!("Lost block {}", template.block_info(Some(nonce)));
            }
        }

        info!("Miner stopped");

        Ok(())
    }
}
