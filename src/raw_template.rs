use super::*;

/// `getblocktemplate` result, as returned by the node.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
pub struct RawTemplate {
    pub height: u64,
    #[serde(rename = "previousblockhash")]
    pub previous_block_hash: BlockHash,
    pub target: TargetHash,
    pub bits: Nbits,
    #[serde(rename = "curtime")]
    pub current_time: u32,
    #[serde(deserialize_with = "version_from_i32")]
    pub version: block::Version,
    #[serde(rename = "coinbasevalue", with = "bitcoin::amount::serde::as_sat")]
    pub coinbase_value: Amount,
    #[serde(default)]
    pub transactions: Vec<TemplateTransaction>,
    #[serde(default)]
    pub default_witness_commitment: Option<ScriptBuf>,
    #[serde(rename = "coinbasetxn", default)]
    pub coinbase_txn: Option<TemplateTransaction>,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
pub struct TemplateTransaction {
    #[serde(default, deserialize_with = "hex_data")]
    pub data: Option<Vec<u8>>,
    pub txid: Txid,
    #[serde(rename = "hash", default)]
    pub wtxid: Option<Wtxid>,
}

impl TemplateTransaction {
    pub fn from_transaction(tx: &Transaction) -> Self {
        Self {
            data: Some(consensus::serialize(tx)),
            txid: tx.compute_txid(),
            wtxid: Some(Wtxid::all_zeros()),
        }
    }
}

/// Full 256-bit target, big-endian, as the `target` field of a template.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, DeserializeFromStr, SerializeDisplay)]
pub struct TargetHash([u8; 32]);

impl TargetHash {
    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_be_bytes(self) -> [u8; 32] {
        self.0
    }
}

impl FromStr for TargetHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).with_context(|| format!("invalid target `{s}`"))?;

        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|bytes: Vec<u8>| anyhow!("target must be 32 bytes, got {}", bytes.len()))?;

        Ok(Self(bytes))
    }
}

impl Display for TargetHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

fn version_from_i32<'de, D>(d: D) -> Result<block::Version, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(block::Version::from_consensus(i32::deserialize(d)?))
}

fn hex_data<'de, D>(d: D) -> Result<Option<Vec<u8>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(d)?
        .map(|data| hex::decode(data).map_err(de::Error::custom))
        .transpose()
}
