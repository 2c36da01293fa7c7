use super::*;

/// Bytes appended to the coinbase script sig after the height push.
///
/// Parsed from `hex:<hex>` for raw bytes, or `str:<text>` / `<text>` for UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, DeserializeFromStr, SerializeDisplay)]
pub enum CoinbaseMessage {
    Bytes(Vec<u8>),
    Text(String),
}

impl CoinbaseMessage {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Bytes(bytes) => bytes,
            Self::Text(text) => text.as_bytes(),
        }
    }
}

impl Default for CoinbaseMessage {
    fn default() -> Self {
        Self::Text("solo".into())
    }
}

impl FromStr for CoinbaseMessage {
    type Err = MinerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(digits) = s.strip_prefix("hex:") {
            return hex::decode(digits)
                .map(Self::Bytes)
                .map_err(|source| MinerError::InvalidCoinbaseMessage {
                    message: s.into(),
                    source,
                });
        }

        Ok(Self::Text(s.strip_prefix("str:").unwrap_or(s).into()))
    }
}

impl Display for CoinbaseMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => write!(f, "hex:{}", hex::encode(bytes)),
            Self::Text(text) => write!(f, "str:{text}"),
        }
    }
}

/// User supplied payout data for the coinbase transaction.
#[derive(Debug, Clone)]
pub struct CoinbaseConfig {
    pub address: String,
    pub message: CoinbaseMessage,
    pub network: Network,
}

impl CoinbaseConfig {
    pub fn address(&self) -> Result<Address, MinerError> {
        self.address
            .parse::<Address<NetworkUnchecked>>()
            .map_err(|err| err.to_string())
            .and_then(|address| {
                address
                    .require_network(self.network)
                    .map_err(|err| err.to_string())
            })
            .map_err(|detail| MinerError::InvalidCoinbaseAddress {
                address: self.address.clone(),
                detail,
            })
    }
}

#[derive(Clone)]
pub struct CoinbaseBuilder {
    address: Address,
    height: u64,
    message: CoinbaseMessage,
    value: Amount,
    witness_commitment: Option<ScriptBuf>,
}

impl CoinbaseBuilder {
    const MAX_COINBASE_SCRIPT_SIG_SIZE: usize = 100;

    pub fn new(address: Address, height: u64, value: Amount) -> Self {
        Self {
            address,
            height,
            message: CoinbaseMessage::Bytes(Vec::new()),
            value,
            witness_commitment: None,
        }
    }

    pub fn with_message(mut self, message: CoinbaseMessage) -> Self {
        self.message = message;
        self
    }

    pub fn with_witness_commitment(mut self, witness_commitment: Option<ScriptBuf>) -> Self {
        self.witness_commitment = witness_commitment;
        self
    }

    pub fn build(self) -> Result<Transaction, MinerError> {
        let mut buf: Vec<u8> = Vec::with_capacity(Self::MAX_COINBASE_SCRIPT_SIG_SIZE);

        // BIP34 height push: length byte followed by the minimal script number.
        // Heights with the top bit set carry a 0x00 sign byte.
        let mut height = [0u8; 8];
        let len = write_scriptint(
            &mut height,
            i64::try_from(self.height).unwrap_or(i64::MAX),
        );
        buf.push(len as u8);
        buf.extend_from_slice(&height[..len]);

        buf.extend_from_slice(self.message.as_bytes());

        snafu::ensure!(
            buf.len() <= Self::MAX_COINBASE_SCRIPT_SIG_SIZE,
            error::CoinbaseScriptTooLargeSnafu {
                size: buf.len(),
                max: Self::MAX_COINBASE_SCRIPT_SIG_SIZE,
            }
        );

        let mut output = vec![TxOut {
            value: self.value,
            script_pubkey: self.address.script_pubkey(),
        }];

        if let Some(witness_commitment) = self.witness_commitment {
            output.push(TxOut {
                value: Amount::ZERO,
                script_pubkey: witness_commitment,
            });
        }

        Ok(Transaction {
            version: bitcoin::transaction::Version::ONE,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::null(),
                script_sig: ScriptBuf::from_bytes(buf),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output,
        })
    }
}

#[cfg(test)]
mod tests {
    use {super::*, pretty_assertions::assert_eq as pretty_assert_eq};

    const REGTEST_ADDRESS: &str = "bcrt1qw508d6qejxtdg4y5r3zarvary0c5xw7kygt080";

    fn config(message: &str) -> CoinbaseConfig {
        CoinbaseConfig {
            address: REGTEST_ADDRESS.into(),
            message: message.parse().unwrap(),
            network: Network::Regtest,
        }
    }

    fn witness_commitment() -> ScriptBuf {
        ScriptBuf::from_hex(
            "6a24aa21a9ede2f61c3f71d1defd3fa999dfa36953755c690689799962b48bebd836974e8cf9",
        )
        .unwrap()
    }

    #[test]
    fn message_prefixes() {
        assert_eq!(
            "hex:deadbeef".parse::<CoinbaseMessage>().unwrap(),
            CoinbaseMessage::Bytes(vec![0xde, 0xad, 0xbe, 0xef])
        );
        assert_eq!(
            "str:hello".parse::<CoinbaseMessage>().unwrap(),
            CoinbaseMessage::Text("hello".into())
        );
        assert_eq!(
            "hello".parse::<CoinbaseMessage>().unwrap(),
            CoinbaseMessage::Text("hello".into())
        );
        assert_eq!(
            "str:hex:abc".parse::<CoinbaseMessage>().unwrap().as_bytes(),
            b"hex:abc"
        );
    }

    #[test]
    fn invalid_hex_message() {
        let err = "hex:zz".parse::<CoinbaseMessage>().unwrap_err();
        assert!(matches!(err, MinerError::InvalidCoinbaseMessage { .. }));
    }

    #[test]
    fn address_must_match_network() {
        let mut config = config("solo");
        assert!(config.address().is_ok());

        config.network = Network::Bitcoin;
        assert!(matches!(
            config.address(),
            Err(MinerError::InvalidCoinbaseAddress { .. })
        ));

        config.address = "not an address".into();
        assert!(matches!(
            config.address(),
            Err(MinerError::InvalidCoinbaseAddress { .. })
        ));
    }

    #[test]
    fn reproduces_reference_coinbase() {
        let config = config("str:solo mined");
        let tx = CoinbaseBuilder::new(
            config.address().unwrap(),
            300,
            Amount::from_sat(2_500_011_000),
        )
        .with_message(config.message)
        .with_witness_commitment(Some(witness_commitment()))
        .build()
        .unwrap();

        pretty_assert_eq!(
            hex::encode(consensus::serialize(&tx)),
            "01000000010000000000000000000000000000000000000000000000000000000000000000ffffffff0d\
             022c01736f6c6f206d696e6564ffffffff02f823039500000000160014751e76e8199196d454941c45d1\
             b3a323f1433bd60000000000000000266a24aa21a9ede2f61c3f71d1defd3fa999dfa36953755c690689\
             799962b48bebd836974e8cf900000000"
        );
        assert_eq!(
            tx.compute_txid().to_string(),
            "54867fd973ed7a2d6718b2621f46cd8dff743d5ba21a8300ddde8ff33335f5c0"
        );
    }

    #[test]
    fn witness_commitment_is_last_and_zero_valued() {
        let config = config("solo");
        let tx = CoinbaseBuilder::new(config.address().unwrap(), 1, Amount::from_sat(50))
            .with_witness_commitment(Some(witness_commitment()))
            .build()
            .unwrap();

        assert_eq!(tx.output.len(), 2);
        assert_eq!(tx.output[0].value, Amount::from_sat(50));
        assert_eq!(tx.output[1].value, Amount::ZERO);
        assert_eq!(tx.output[1].script_pubkey, witness_commitment());
    }

    #[test]
    fn no_witness_commitment_means_single_output() {
        let config = config("solo");
        let tx = CoinbaseBuilder::new(config.address().unwrap(), 1, Amount::from_sat(50))
            .build()
            .unwrap();

        assert_eq!(tx.output.len(), 1);
        assert!(tx.is_coinbase());
    }

    #[test]
    fn height_push_is_minimal() {
        let address = config("solo").address().unwrap();

        for (height, expected) in [
            (0, "00"),
            (1, "0101"),
            (127, "017f"),
            (128, "028000"),
            (200, "02c800"),
            (300, "022c01"),
            (32_767, "02ff7f"),
            (32_768, "03008000"),
            (100_000, "03a08601"),
            (840_000, "03400d0d"),
        ] {
            let tx = CoinbaseBuilder::new(address.clone(), height, Amount::ZERO)
                .build()
                .unwrap();
            assert_eq!(
                hex::encode(tx.input[0].script_sig.as_bytes()),
                expected,
                "height {height}"
            );
        }
    }

    #[test]
    fn exceed_script_size_limit() {
        let result = CoinbaseBuilder::new(config("solo").address().unwrap(), 0, Amount::ZERO)
            .with_message(CoinbaseMessage::Text("a".repeat(100)))
            .build();

        assert!(matches!(
            result,
            Err(MinerError::CoinbaseScriptTooLarge { size: 101, .. })
        ));
    }
}
