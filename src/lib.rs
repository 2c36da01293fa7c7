use {
    anyhow::{Context, Error, anyhow, bail, ensure},
    arguments::Arguments,
    async_trait::async_trait,
    bitcoin::{
        Address, Amount, BlockHash, CompactTarget, Network, OutPoint, ScriptBuf, Sequence,
        Transaction, TxIn, TxMerkleNode, TxOut, Txid, VarInt, Witness, Wtxid,
        address::NetworkUnchecked, block, consensus, hashes::Hash,
        locktime::absolute::LockTime, script::write_scriptint,
    },
    block_template::BlockTemplate,
    byteorder::{BigEndian, ByteOrder, LittleEndian},
    chain::Chain,
    clap::{Parser, ValueEnum},
    coinbase::{CoinbaseBuilder, CoinbaseConfig, CoinbaseMessage},
    device::{Device, DeviceConfig, DeviceConnectionError, NONCE_SIZE, Read, Work},
    error::MinerError,
    miner::Miner,
    nbits::Nbits,
    node_client::NodeClient,
    nonce::Nonce,
    orchestrator::{Orchestrator, Outcome},
    raw_template::{RawTemplate, TargetHash, TemplateTransaction},
    reqwest::{StatusCode, Url},
    serde::{
        Deserialize, Serialize,
        de::{self, Deserializer},
    },
    serde_json::json,
    serde_with::{DeserializeFromStr, SerializeDisplay},
    settings::Settings,
    snafu::Snafu,
    std::{
        collections::BTreeMap,
        env,
        fmt::{self, Display, Formatter},
        fs, io,
        path::PathBuf,
        process,
        str::FromStr,
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
        time::Duration,
    },
    tokio::{
        runtime::Runtime,
        task::{self, JoinSet},
        time::{sleep, timeout},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
    tracing_appender::non_blocking,
    tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt},
};

mod arguments;
pub mod block_template;
pub mod chain;
pub mod coinbase;
pub mod device;
pub mod error;
pub mod hash;
mod logs;
pub mod merkle;
pub mod miner;
pub mod nbits;
pub mod node_client;
pub mod nonce;
mod options;
pub mod orchestrator;
pub mod raw_template;
mod settings;
mod signal;
mod subcommand;

pub const USER_AGENT: &str = concat!("solo/", env!("CARGO_PKG_VERSION"));
/// Pause between `getblocktemplate` attempts while the node is unreachable.
pub const TEMPLATE_RETRY_INTERVAL: Duration = Duration::from_secs(5);
pub const SUBMIT_RETRY_INTERVAL: Duration = Duration::from_secs(5);
/// Total `submitblock` attempts on connection failure.
pub const SUBMIT_ATTEMPTS: usize = 10;
/// Pause after a device error before its task gives up for the round.
pub const DEVICE_COOLDOWN: Duration = Duration::from_secs(3);

type Result<T = (), E = Error> = std::result::Result<T, E>;

pub fn main() {
    let args = Arguments::parse();

    Runtime::new()
        .expect("Failed to create tokio runtime")
        .block_on(async {
            let cancel_token = signal::setup_signal_handler();

            match args.run(cancel_token).await {
                Err(err) => {
                    eprintln!("error: {err}");

                    for (i, cause) in err.chain().skip(1).enumerate() {
                        if i == 0 {
                            eprintln!();
                            eprintln!("because:");
                        }
                        eprintln!("- {cause}");
                    }

                    if env::var_os("RUST_BACKTRACE")
                        .map(|val| val == "1")
                        .unwrap_or_default()
                    {
                        eprintln!();
                        eprintln!("{}", err.backtrace());
                    }
                    process::exit(1);
                }
                Ok(_) => {
                    process::exit(0);
                }
            }
        });
}
