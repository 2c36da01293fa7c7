use super::*;

/// Errors that end the mining loop. Everything else is retried or logged.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum MinerError {
    #[snafu(display("Invalid coinbase address `{address}`: {detail}"))]
    InvalidCoinbaseAddress { address: String, detail: String },

    #[snafu(display("Invalid coinbase message `{message}`: {source}"))]
    InvalidCoinbaseMessage {
        message: String,
        source: hex::FromHexError,
    },

    #[snafu(display("Coinbase script sig is {size} bytes (max {max})"))]
    CoinbaseScriptTooLarge { size: usize, max: usize },

    #[snafu(display("Invalid RPC endpoint `{endpoint}`: {detail}"))]
    InvalidEndpoint { endpoint: String, detail: String },

    #[snafu(display("RPC transport setup failed: {source}"))]
    Transport { source: reqwest::Error },

    #[snafu(display("Transaction {txid} has no raw data to include in the block"))]
    MissingTransactionData { txid: Txid },
}
