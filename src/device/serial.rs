use {
    super::*,
    tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    tokio_serial::{SerialPortBuilderExt, SerialStream},
};

/// A mining board attached to a serial port.
pub struct SerialDevice {
    name: String,
    port: String,
    baudrate: u32,
    read_timeout: Option<Duration>,
    write_timeout: Duration,
    midstate: bool,
    stream: Option<SerialStream>,
    /// Bytes received but not yet returned. Survives read timeouts.
    pending: Vec<u8>,
}

impl SerialDevice {
    pub fn new(
        name: String,
        port: String,
        baudrate: u32,
        read_timeout: Option<Duration>,
        write_timeout: Duration,
        midstate: bool,
    ) -> Self {
        Self {
            name,
            port,
            baudrate,
            read_timeout,
            write_timeout,
            midstate,
            stream: None,
            pending: Vec::new(),
        }
    }

    fn stream(&mut self) -> Result<&mut SerialStream, DeviceConnectionError> {
        let device = &self.name;
        self.stream
            .as_mut()
            .ok_or_else(|| DeviceConnectionError::NotConnected {
                device: device.clone(),
            })
    }

    fn io_error(&self, source: io::Error) -> DeviceConnectionError {
        DeviceConnectionError::Io {
            device: self.name.clone(),
            source,
        }
    }
}

impl Display for SerialDevice {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Device '{}' [type=serial, port={}, baudrate={}, read_timeout=",
            self.name, self.port, self.baudrate
        )?;

        match self.read_timeout {
            Some(read_timeout) => write!(f, "{}s", read_timeout.as_secs_f64())?,
            None => write!(f, "none")?,
        }

        write!(f, ", write_timeout={}s]>", self.write_timeout.as_secs_f64())
    }
}

#[async_trait]
impl Device for SerialDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "serial"
    }

    fn supports_midstate(&self) -> bool {
        self.midstate
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn connect(&mut self) -> Result<(), DeviceConnectionError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let stream = tokio_serial::new(&self.port, self.baudrate)
            .open_native_async()
            .map_err(|source| DeviceConnectionError::Open {
                device: self.name.clone(),
                source,
            })?;

        debug!("Opened {} at {} baud", self.port, self.baudrate);

        self.stream = Some(stream);

        Ok(())
    }

    async fn disconnect(&mut self) {
        self.pending.clear();

        if self.stream.take().is_some() {
            debug!("Closed {}", self.port);
        }
    }

    async fn write(&mut self, work: &[u8]) -> Result<(), DeviceConnectionError> {
        let write_timeout = self.write_timeout;

        self.pending.clear();

        let stream = self.stream()?;

        let result = timeout(write_timeout, async {
            stream.write_all(work).await?;
            stream.flush().await
        })
        .await;

        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(self.io_error(err)),
            Err(_) => Err(DeviceConnectionError::WriteTimeout {
                device: self.name.clone(),
                timeout: write_timeout,
            }),
        }
    }

    async fn read(&mut self, size: usize) -> Result<Read, DeviceConnectionError> {
        let Self {
            name,
            read_timeout,
            stream,
            pending,
            ..
        } = &mut *self;

        let stream = stream
            .as_mut()
            .ok_or_else(|| DeviceConnectionError::NotConnected {
                device: name.clone(),
            })?;

        let result = match read_timeout {
            Some(read_timeout) => {
                match timeout(*read_timeout, fill(stream, pending, size)).await {
                    Ok(result) => result,
                    Err(_) => return Ok(Read::TimedOut),
                }
            }
            None => fill(stream, pending, size).await,
        };

        match result {
            Ok(()) => Ok(Read::Bytes(pending.drain(..size).collect())),
            Err(source) => Err(DeviceConnectionError::Io {
                device: name.clone(),
                source,
            }),
        }
    }
}

/// Reads from `stream` until `pending` holds at least `size` bytes. Bytes
/// already received stay in `pending` if the future is dropped.
async fn fill<R: AsyncRead + Unpin>(
    stream: &mut R,
    pending: &mut Vec<u8>,
    size: usize,
) -> io::Result<()> {
    while pending.len() < size {
        pending.reserve(size - pending.len());

        if stream.read_buf(pending).await? == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
    }

    Ok(())
}
