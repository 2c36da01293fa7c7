use super::*;

#[derive(Debug, Parser)]
pub struct Template {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    pub height: u64,
    pub previous_block_hash: BlockHash,
    pub merkle_root: TxMerkleNode,
    pub coinbase_txid: Txid,
    pub transactions: usize,
    pub header: String,
    pub midstate: String,
    pub target: TargetHash,
    pub bits: Nbits,
}

impl Output {
    fn new(template: &BlockTemplate) -> Self {
        Self {
            height: template.height(),
            previous_block_hash: template.raw().previous_block_hash,
            merkle_root: template.merkle_root(),
            coinbase_txid: template.coinbase_txid(),
            transactions: template.transactions().len(),
            header: hex::encode(template.header(None)),
            midstate: hex::encode(template.midstate()),
            target: template.raw().target,
            bits: template.raw().bits,
        }
    }
}

impl Template {
    pub async fn run(self, settings: Settings, cancel_token: CancellationToken) -> Result {
        let coinbase = settings.coinbase_config()?;
        let client = settings.node_client()?;

        let raw = tokio::select! {
            raw = client.fetch_template() => raw?,
            _ = cancel_token.cancelled() => return Ok(()),
        };

        let template = BlockTemplate::new(raw, &coinbase)?;

        println!("{}", serde_json::to_string_pretty(&Output::new(&template))?);

        Ok(())
    }
}
