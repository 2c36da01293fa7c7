use super::*;

#[derive(Clone, Default, Debug, Parser)]
#[command(group(
    clap::ArgGroup::new("chains")
        .required(false)
        .args(&["chain", "signet", "regtest", "testnet", "testnet4"]),
))]
pub struct Options {
    #[arg(long, help = "Load configuration from <CONFIG>.")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Load configuration from <CONFIG_DIR>/solo.toml.")]
    pub config_dir: Option<PathBuf>,

    #[arg(long = "chain", value_enum, help = "Use <CHAIN>. [default: mainnet]")]
    pub chain: Option<Chain>,

    #[arg(
        long,
        short = 's',
        help = "Use signet. Equivalent to `--chain signet`."
    )]
    pub signet: bool,

    #[arg(
        long,
        short = 'r',
        help = "Use regtest. Equivalent to `--chain regtest`."
    )]
    pub regtest: bool,

    #[arg(
        long,
        short = 't',
        help = "Use testnet. Equivalent to `--chain testnet`."
    )]
    pub testnet: bool,

    #[arg(long, help = "Use testnet4. Equivalent to `--chain testnet4`.")]
    pub testnet4: bool,

    #[arg(
        long,
        short = 'o',
        help = "Connect to node RPC at <RPC_SERVER>. [default: 127.0.0.1:<chain RPC port>]"
    )]
    pub rpc_server: Option<String>,

    #[arg(long, short = 'u', help = "Authenticate to node RPC as <RPC_USERNAME>.")]
    pub rpc_username: Option<String>,

    #[arg(long, short = 'p', help = "Authenticate to node RPC with <RPC_PASSWORD>.")]
    pub rpc_password: Option<String>,

    #[arg(long, help = "Load node RPC cookie file from <RPC_COOKIE_FILE>.")]
    pub rpc_cookie_file: Option<PathBuf>,

    #[arg(long, help = "Pay block rewards to <COINBASE_ADDRESS>.")]
    pub coinbase_address: Option<String>,

    #[arg(
        long,
        help = "Append <[(hex|str):]COINBASE_MESSAGE> to the coinbase script. [default: str:solo]"
    )]
    pub coinbase_message: Option<CoinbaseMessage>,

    #[arg(
        long,
        help = "Give up on a template after <TIMEOUT> seconds without a block. [default: 60]"
    )]
    pub timeout: Option<f64>,

    #[arg(long, short = 'D', help = "Log debug output.")]
    pub debug: bool,

    #[arg(long, short = 'q', conflicts_with = "debug", help = "Disable logging.")]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let opts = Options::default();
        assert!(opts.chain.is_none());
        assert!(!opts.signet);
        assert!(!opts.regtest);
        assert!(!opts.testnet);
        assert!(!opts.testnet4);
        assert!(!opts.debug);
        assert!(!opts.quiet);
    }

    #[test]
    fn chain_flags_are_mutually_exclusive() {
        assert!(Options::try_parse_from(["solo", "--signet", "--regtest"]).is_err());
    }

    #[test]
    fn chain_argument_and_flag_are_mutually_exclusive() {
        assert!(Options::try_parse_from(["solo", "--chain", "signet", "--regtest"]).is_err());
    }

    #[test]
    fn parse_regtest_flag() {
        let opts = Options::try_parse_from(["solo", "-r"]).unwrap();
        assert!(opts.regtest);
    }

    #[test]
    fn parse_chain_argument() {
        let opts = Options::try_parse_from(["solo", "--chain", "testnet4"]).unwrap();
        assert_eq!(opts.chain, Some(Chain::Testnet4));
    }

    #[test]
    fn parse_rpc_options() {
        let opts = Options::try_parse_from([
            "solo",
            "-o",
            "10.0.0.2:8332",
            "-u",
            "user",
            "-p",
            "pass",
            "--rpc-cookie-file",
            "/tmp/.cookie",
        ])
        .unwrap();
        assert_eq!(opts.rpc_server, Some("10.0.0.2:8332".into()));
        assert_eq!(opts.rpc_username, Some("user".into()));
        assert_eq!(opts.rpc_password, Some("pass".into()));
        assert_eq!(opts.rpc_cookie_file, Some("/tmp/.cookie".into()));
    }

    #[test]
    fn parse_coinbase_options() {
        let opts = Options::try_parse_from([
            "solo",
            "--coinbase-address",
            "bcrt1qw508d6qejxtdg4y5r3zarvary0c5xw7kygt080",
            "--coinbase-message",
            "hex:cafe",
            "--timeout",
            "2.5",
        ])
        .unwrap();
        assert_eq!(
            opts.coinbase_message,
            Some(CoinbaseMessage::Bytes(vec![0xca, 0xfe]))
        );
        assert_eq!(opts.timeout, Some(2.5));

        assert!(Options::try_parse_from(["solo", "--coinbase-message", "hex:zz"]).is_err());
    }

    #[test]
    fn debug_and_quiet_conflict() {
        assert!(Options::try_parse_from(["solo", "-D", "-q"]).is_err());
    }
}
