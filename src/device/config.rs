use super::*;

/// One `[[devices]]` entry. Durations are in seconds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DeviceConfig {
    Serial {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        port: String,
        #[serde(default = "default_baudrate")]
        baudrate: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        read_timeout: Option<f64>,
        #[serde(default = "default_write_timeout")]
        write_timeout: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        midstate: Option<bool>,
    },
    Simulator {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default = "default_avg_delay")]
        avg_delay: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        midstate: Option<bool>,
    },
}

fn default_baudrate() -> u32 {
    115200
}

fn default_write_timeout() -> f64 {
    3.0
}

fn default_avg_delay() -> f64 {
    5.0
}

fn seconds(key: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .with_context(|| format!("device `{key}` must be a non-negative number of seconds"))
}

impl DeviceConfig {
    pub fn simulator(avg_delay: f64) -> Self {
        Self::Simulator {
            name: None,
            avg_delay,
            timeout: None,
            midstate: None,
        }
    }

    pub fn validate(&self) -> Result {
        match self {
            Self::Serial {
                port,
                read_timeout,
                write_timeout,
                ..
            } => {
                ensure!(!port.is_empty(), "serial device `port` must not be empty");
                if let Some(read_timeout) = read_timeout {
                    seconds("read_timeout", *read_timeout)?;
                }
                seconds("write_timeout", *write_timeout)?;
            }
            Self::Simulator {
                avg_delay,
                timeout,
                midstate,
                ..
            } => {
                ensure!(
                    *midstate != Some(true),
                    "simulator devices do not support midstate work"
                );
                seconds("avg_delay", *avg_delay)?;
                if let Some(timeout) = timeout {
                    seconds("timeout", *timeout)?;
                }
            }
        }

        Ok(())
    }

    pub fn build(&self, index: usize) -> Result<Box<dyn Device>> {
        self.validate()?;

        Ok(match self {
            Self::Serial {
                name,
                port,
                baudrate,
                read_timeout,
                write_timeout,
                midstate,
            } => Box::new(SerialDevice::new(
                name.clone().unwrap_or_else(|| format!("Serial_{index}")),
                port.clone(),
                *baudrate,
                read_timeout
                    .map(|read_timeout| seconds("read_timeout", read_timeout))
                    .transpose()?,
                seconds("write_timeout", *write_timeout)?,
                midstate.unwrap_or(true),
            )),
            Self::Simulator {
                name,
                avg_delay,
                timeout,
                ..
            } => Box::new(SimulatedDevice::new(
                name.clone().unwrap_or_else(|| format!("Simulator_{index}")),
                seconds("avg_delay", *avg_delay)?,
                timeout
                    .map(|timeout| seconds("timeout", timeout))
                    .transpose()?,
            )),
        })
    }
}
