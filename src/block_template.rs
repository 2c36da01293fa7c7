use super::*;

/// A raw template with its coinbase attached. Read-only after construction;
/// a new round always builds a new one.
#[derive(Clone, Debug)]
pub struct BlockTemplate {
    raw: RawTemplate,
    transactions: Vec<TemplateTransaction>,
    merkle_root: TxMerkleNode,
    coinbase_address: Option<Address>,
}

impl BlockTemplate {
    pub fn new(raw: RawTemplate, coinbase: &CoinbaseConfig) -> Result<Self, MinerError> {
        let (coinbase_tx, coinbase_address) = match &raw.coinbase_txn {
            Some(coinbase_txn) => {
                debug!("Using node supplied coinbase {}", coinbase_txn.txid);
                (coinbase_txn.clone(), None)
            }
            None => {
                let address = coinbase.address()?;

                let tx = CoinbaseBuilder::new(address.clone(), raw.height, raw.coinbase_value)
                    .with_message(coinbase.message.clone())
                    .with_witness_commitment(raw.default_witness_commitment.clone())
                    .build()?;

                debug!(
                    "Built coinbase {} paying {} to {address}",
                    tx.compute_txid(),
                    raw.coinbase_value
                );

                (TemplateTransaction::from_transaction(&tx), Some(address))
            }
        };

        let transactions = std::iter::once(coinbase_tx)
            .chain(raw.transactions.iter().cloned())
            .collect::<Vec<TemplateTransaction>>();

        let merkle_root = merkle::merkle_root(
            &transactions
                .iter()
                .map(|tx| tx.txid)
                .collect::<Vec<Txid>>(),
        );

        Ok(Self {
            raw,
            transactions,
            merkle_root,
            coinbase_address,
        })
    }

    pub fn raw(&self) -> &RawTemplate {
        &self.raw
    }

    pub fn height(&self) -> u64 {
        self.raw.height
    }

    pub fn merkle_root(&self) -> TxMerkleNode {
        self.merkle_root
    }

    /// Every transaction in block order, coinbase first.
    pub fn transactions(&self) -> &[TemplateTransaction] {
        &self.transactions
    }

    pub fn coinbase_txid(&self) -> Txid {
        self.transactions[0].txid
    }

    /// The 80-byte header. A missing nonce packs as zero.
    pub fn header(&self, nonce: Option<Nonce>) -> [u8; 80] {
        let mut header = [0u8; 80];

        LittleEndian::write_i32(&mut header[0..4], self.raw.version.to_consensus());
        header[4..36].copy_from_slice(self.raw.previous_block_hash.as_byte_array());
        header[36..68].copy_from_slice(self.merkle_root.as_byte_array());
        LittleEndian::write_u32(&mut header[68..72], self.raw.current_time);
        LittleEndian::write_u32(&mut header[72..76], self.raw.bits.to_consensus());
        header[76..80].copy_from_slice(&nonce.unwrap_or_default().to_le_bytes());

        header
    }

    pub fn midstate(&self) -> [u8; 32] {
        hash::midstate(&self.header(None))
    }

    /// Header hash, big-endian, comparable with [`Self::target_hash`].
    pub fn header_hash(&self, nonce: Nonce) -> [u8; 32] {
        let mut hash = hash::sha256d(&self.header(Some(nonce)));
        hash.reverse();
        hash
    }

    pub fn block_hash(&self, nonce: Nonce) -> BlockHash {
        BlockHash::from_byte_array(hash::sha256d(&self.header(Some(nonce))))
    }

    pub fn target_hash(&self) -> [u8; 32] {
        self.raw.target.to_be_bytes()
    }

    pub fn meets_target(&self, nonce: Nonce) -> bool {
        self.header_hash(nonce) <= self.target_hash()
    }

    /// Hex encoded block, ready for `submitblock`.
    pub fn serialize_block(&self, nonce: Nonce) -> Result<String, MinerError> {
        let mut block = self.header(Some(nonce)).to_vec();

        block.extend(consensus::serialize(&VarInt(self.transactions.len() as u64)));

        for tx in &self.transactions {
            let data = tx
                .data
                .as_ref()
                .ok_or(MinerError::MissingTransactionData { txid: tx.txid })?;

            block.extend_from_slice(data);
        }

        Ok(hex::encode(block))
    }

    pub fn block_info(&self, nonce: Option<Nonce>) -> String {
        match nonce {
            Some(nonce) => format!(
                "<Block [height={}, header_hash={}]>",
                self.raw.height,
                hex::encode(self.header_hash(nonce))
            ),
            None => format!("<Block [height={}]>", self.raw.height),
        }
    }

    pub fn reward_info(&self) -> String {
        format!(
            "<Reward 'Block#{}' [reward={} sat, coinbase_address={}, txid={}]>",
            self.raw.height,
            self.raw.coinbase_value.to_sat(),
            self.coinbase_address
                .as_ref()
                .map(|address| address.to_string())
                .unwrap_or_else(|| "node supplied".into()),
            self.coinbase_txid()
        )
    }
}
