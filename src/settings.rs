use {super::*, options::Options, tracing_subscriber::filter::LevelFilter};

const CONFIG_FILE_NAME: &str = "solo.toml";

/// TOML config file structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub chain: Option<Chain>,
    pub timeout: Option<f64>,
    pub rpc: Option<RpcSection>,
    pub coinbase: Option<CoinbaseSection>,
    pub logging: Option<LoggingSection>,
    pub devices: Option<Vec<DeviceConfig>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RpcSection {
    pub server: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub cookie_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoinbaseSection {
    pub address: Option<String>,
    pub message: Option<CoinbaseMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    pub level: Option<String>,
    pub enabled: Option<bool>,
}

/// Unified settings struct with all resolved configuration
#[derive(Debug, Clone, Default, Serialize)]
pub struct Settings {
    pub chain: Option<Chain>,
    pub config: Option<PathBuf>,
    pub config_dir: Option<PathBuf>,
    pub timeout: Option<f64>,

    pub rpc_server: Option<String>,
    pub rpc_username: Option<String>,
    #[serde(skip_serializing)]
    pub rpc_password: Option<String>,
    pub rpc_cookie_file: Option<PathBuf>,

    pub coinbase_address: Option<String>,
    pub coinbase_message: Option<CoinbaseMessage>,

    pub log_level: Option<String>,
    pub logging_enabled: Option<bool>,

    pub devices: Option<Vec<DeviceConfig>>,
}

impl Settings {
    /// Load settings from all sources with proper priority
    pub fn load(options: Options) -> Result<Self> {
        let mut env = BTreeMap::<String, String>::new();

        for (var, value) in env::vars_os() {
            let Some(var) = var.to_str() else {
                continue;
            };

            let Some(key) = var.strip_prefix("SOLO_") else {
                continue;
            };

            env.insert(
                key.into(),
                value.into_string().map_err(|value| {
                    anyhow!(
                        "environment variable `{var}` not valid unicode: `{}`",
                        value.to_string_lossy()
                    )
                })?,
            );
        }

        Self::merge(options, env)
    }

    /// Merge all configuration sources
    pub fn merge(options: Options, env: BTreeMap<String, String>) -> Result<Self> {
        let settings = Self::from_options(&options);

        let settings = settings.or(Self::from_env(&env)?);

        let config = if let Some(config_path) = Self::find_config_path(&settings) {
            toml::from_str(&fs::read_to_string(&config_path).context(anyhow!(
                "failed to open config file `{}`",
                config_path.display()
            ))?)
            .context(anyhow!(
                "failed to deserialize config file `{}`",
                config_path.display()
            ))?
        } else {
            Config::default()
        };

        let settings = settings.or(Self::from_config(&config));

        let settings = settings.or_defaults();

        Self::validate(&settings)?;

        Ok(settings)
    }

    fn find_config_path(settings: &Self) -> Option<PathBuf> {
        if let Some(path) = &settings.config {
            return Some(path.clone());
        }

        if let Some(dir) = &settings.config_dir {
            let path = dir.join(CONFIG_FILE_NAME);
            if path.exists() {
                return Some(path);
            }
        }

        let path = PathBuf::from(CONFIG_FILE_NAME);
        path.exists().then_some(path)
    }

    pub fn from_options(options: &Options) -> Self {
        Self {
            chain: options
                .signet
                .then_some(Chain::Signet)
                .or(options.regtest.then_some(Chain::Regtest))
                .or(options.testnet.then_some(Chain::Testnet))
                .or(options.testnet4.then_some(Chain::Testnet4))
                .or(options.chain),
            config: options.config.clone(),
            config_dir: options.config_dir.clone(),
            timeout: options.timeout,
            rpc_server: options.rpc_server.clone(),
            rpc_username: options.rpc_username.clone(),
            rpc_password: options.rpc_password.clone(),
            rpc_cookie_file: options.rpc_cookie_file.clone(),
            coinbase_address: options.coinbase_address.clone(),
            coinbase_message: options.coinbase_message.clone(),
            log_level: options.debug.then(|| "debug".into()),
            logging_enabled: options.quiet.then_some(false),
            devices: None,
        }
    }

    pub fn from_env(env: &BTreeMap<String, String>) -> Result<Self> {
        let get_bool = |key: &str| {
            env.get(key)
                .map(|value| !value.is_empty() && value != "0" && value.to_lowercase() != "false")
                .unwrap_or_default()
        };

        let get_string = |key: &str| env.get(key).cloned();

        let get_path = |key: &str| env.get(key).map(PathBuf::from);

        let get_chain = |key: &str| -> Result<Option<Chain>> {
            env.get(key)
                .map(|chain| chain.parse::<Chain>())
                .transpose()
                .with_context(|| {
                    format!("failed to parse environment variable SOLO_{key} as chain")
                })
        };

        let get_f64 = |key: &str| -> Result<Option<f64>> {
            env.get(key)
                .map(|f| f.parse::<f64>())
                .transpose()
                .with_context(|| format!("failed to parse environment variable SOLO_{key} as f64"))
        };

        let get_message = |key: &str| -> Result<Option<CoinbaseMessage>> {
            env.get(key)
                .map(|message| message.parse::<CoinbaseMessage>())
                .transpose()
                .with_context(|| {
                    format!("failed to parse environment variable SOLO_{key} as coinbase message")
                })
        };

        Ok(Self {
            chain: get_chain("CHAIN")?,
            config: get_path("CONFIG"),
            config_dir: get_path("CONFIG_DIR"),
            timeout: get_f64("TIMEOUT")?,
            rpc_server: get_string("RPC_SERVER"),
            rpc_username: get_string("RPC_USERNAME"),
            rpc_password: get_string("RPC_PASSWORD"),
            rpc_cookie_file: get_path("RPC_COOKIE_FILE"),
            coinbase_address: get_string("COINBASE_ADDRESS"),
            coinbase_message: get_message("COINBASE_MESSAGE")?,
            log_level: get_string("LOG_LEVEL"),
            logging_enabled: get_bool("QUIET").then_some(false),
            devices: None,
        })
    }

    pub fn from_config(config: &Config) -> Self {
        let rpc = config.rpc.as_ref();
        let coinbase = config.coinbase.as_ref();
        let logging = config.logging.as_ref();

        Self {
            chain: config.chain,
            config: None,
            config_dir: None,
            timeout: config.timeout,
            rpc_server: rpc.and_then(|r| r.server.clone()),
            rpc_username: rpc.and_then(|r| r.username.clone()),
            rpc_password: rpc.and_then(|r| r.password.clone()),
            rpc_cookie_file: rpc.and_then(|r| r.cookie_file.clone()),
            coinbase_address: coinbase.and_then(|c| c.address.clone()),
            coinbase_message: coinbase.and_then(|c| c.message.clone()),
            log_level: logging.and_then(|l| l.level.clone()),
            logging_enabled: logging.and_then(|l| l.enabled),
            devices: config.devices.clone(),
        }
    }

    /// Merge self with another Settings, self takes priority
    pub fn or(self, other: Self) -> Self {
        Self {
            chain: self.chain.or(other.chain),
            config: self.config.or(other.config),
            config_dir: self.config_dir.or(other.config_dir),
            timeout: self.timeout.or(other.timeout),
            rpc_server: self.rpc_server.or(other.rpc_server),
            rpc_username: self.rpc_username.or(other.rpc_username),
            rpc_password: self.rpc_password.or(other.rpc_password),
            rpc_cookie_file: self.rpc_cookie_file.or(other.rpc_cookie_file),
            coinbase_address: self.coinbase_address.or(other.coinbase_address),
            coinbase_message: self.coinbase_message.or(other.coinbase_message),
            log_level: self.log_level.or(other.log_level),
            logging_enabled: self.logging_enabled.or(other.logging_enabled),
            devices: self.devices.or(other.devices),
        }
    }

    fn or_defaults(self) -> Self {
        let chain = self.chain.unwrap_or_default();

        Self {
            chain: Some(chain),
            timeout: Some(self.timeout.unwrap_or(60.0)),
            rpc_server: Some(
                self.rpc_server
                    .unwrap_or_else(|| format!("127.0.0.1:{}", chain.default_rpc_port())),
            ),
            coinbase_message: Some(self.coinbase_message.unwrap_or_default()),
            log_level: Some(self.log_level.unwrap_or_else(|| "info".into())),
            logging_enabled: Some(self.logging_enabled.unwrap_or(true)),
            devices: Some(self.devices.unwrap_or_default()),
            ..self
        }
    }

    fn validate(settings: &Self) -> Result<()> {
        match (&settings.rpc_username, &settings.rpc_password) {
            (Some(_), None) => bail!("RPC username specified without password"),
            (None, Some(_)) => bail!("RPC password specified without username"),
            _ => {}
        }

        if let Some(timeout) = settings.timeout {
            ensure!(
                timeout.is_finite() && timeout >= 0.0,
                "timeout must be a non-negative number of seconds, got {timeout}"
            );
        }

        if let Some(level) = &settings.log_level {
            level
                .parse::<LevelFilter>()
                .map_err(|_| anyhow!("invalid log level `{level}`"))?;
        }

        for (i, device) in settings.devices.iter().flatten().enumerate() {
            device
                .validate()
                .with_context(|| format!("invalid configuration for device {i}"))?;
        }

        Ok(())
    }

    pub fn chain(&self) -> Chain {
        self.chain.unwrap_or_default()
    }

    pub fn rpc_server(&self) -> String {
        self.rpc_server
            .clone()
            .unwrap_or_else(|| format!("127.0.0.1:{}", self.chain().default_rpc_port()))
    }

    /// Username and password, falling back to a `user:password` cookie file.
    pub fn rpc_auth(&self) -> Result<Option<(String, String)>> {
        if let Some((user, pass)) = self.rpc_username.as_ref().zip(self.rpc_password.as_ref()) {
            return Ok(Some((user.clone(), pass.clone())));
        }

        let Some(cookie_file) = &self.rpc_cookie_file else {
            return Ok(None);
        };

        let cookie = fs::read_to_string(cookie_file).with_context(|| {
            format!("failed to read cookie file `{}`", cookie_file.display())
        })?;

        let (user, pass) = cookie.trim().split_once(':').with_context(|| {
            format!(
                "cookie file `{}` is not in `user:password` format",
                cookie_file.display()
            )
        })?;

        Ok(Some((user.into(), pass.into())))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout.unwrap_or(60.0))
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn logging_enabled(&self) -> bool {
        self.logging_enabled.unwrap_or(true)
    }

    pub fn coinbase_config(&self) -> Result<CoinbaseConfig> {
        let address = self
            .coinbase_address
            .clone()
            .context("no coinbase address configured, pass `--coinbase-address`")?;

        let config = CoinbaseConfig {
            address,
            message: self.coinbase_message.clone().unwrap_or_default(),
            network: self.chain().network(),
        };

        config.address()?;

        Ok(config)
    }

    pub fn devices(&self) -> &[DeviceConfig] {
        self.devices.as_deref().unwrap_or_default()
    }

    pub fn node_client(&self) -> Result<NodeClient> {
        Ok(NodeClient::new(&self.rpc_server(), self.rpc_auth()?)?)
    }
}
