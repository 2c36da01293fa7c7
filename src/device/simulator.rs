use {super::*, rand::Rng};

/// Fixed share target the simulator searches against, independent of the
/// template's target.
const SIMULATOR_TARGET: [u8; 32] = {
    let mut target = [0xff; 32];
    target[0] = 0;
    target[1] = 0;
    target
};

const JITTER_THRESHOLD: Duration = Duration::from_secs(2);

/// Software stand-in for a mining board. Sleeps roughly `avg_delay` per read,
/// then scans the header it was given for the next nonce below
/// [`SIMULATOR_TARGET`].
pub struct SimulatedDevice {
    name: String,
    avg_delay: Duration,
    timeout: Option<Duration>,
    header: Option<[u8; 80]>,
    connected: bool,
    stop: Arc<AtomicBool>,
}

impl SimulatedDevice {
    pub fn new(name: String, avg_delay: Duration, timeout: Option<Duration>) -> Self {
        Self {
            name,
            avg_delay,
            timeout,
            header: None,
            connected: false,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    fn delay(&self) -> Duration {
        if self.avg_delay <= JITTER_THRESHOLD {
            return self.avg_delay;
        }

        let jitter = rand::rng().random_range(-2.0..=2.0);

        Duration::from_secs_f64((self.avg_delay.as_secs_f64() + jitter).max(0.0))
    }

    fn not_connected(&self) -> DeviceConnectionError {
        DeviceConnectionError::NotConnected {
            device: self.name.clone(),
        }
    }
}

/// First nonce at or above the header's own nonce whose hash meets the
/// simulator target. `None` once the nonce space is exhausted or `stop` is set.
fn scan(mut header: [u8; 80], stop: &AtomicBool) -> Option<u32> {
    let start = LittleEndian::read_u32(&header[76..80]);

    for nonce in start..=u32::MAX {
        if nonce % 0x1000 == 0 && stop.load(Ordering::Relaxed) {
            return None;
        }

        LittleEndian::write_u32(&mut header[76..80], nonce);

        let mut hash = hash::sha256d(&header);
        hash.reverse();

        if hash <= SIMULATOR_TARGET {
            return Some(nonce);
        }
    }

    None
}

impl Display for SimulatedDevice {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Device '{}' [type=simulator, avg_delay={}s, timeout=",
            self.name,
            self.avg_delay.as_secs_f64()
        )?;

        match self.timeout {
            Some(timeout) => write!(f, "{}s]>", timeout.as_secs_f64()),
            None => write!(f, "none]>"),
        }
    }
}

#[async_trait]
impl Device for SimulatedDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "simulator"
    }

    fn supports_midstate(&self) -> bool {
        false
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self) -> Result<(), DeviceConnectionError> {
        if !self.connected {
            self.stop = Arc::new(AtomicBool::new(false));
            self.connected = true;
        }

        Ok(())
    }

    async fn disconnect(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.connected = false;
        self.header = None;
    }

    async fn write(&mut self, work: &[u8]) -> Result<(), DeviceConnectionError> {
        if !self.connected {
            return Err(self.not_connected());
        }

        let header: [u8; 80] =
            work.try_into()
                .map_err(|_| DeviceConnectionError::UnsupportedWork {
                    device: self.name.clone(),
                    size: work.len(),
                })?;

        self.header = Some(header);

        Ok(())
    }

    async fn read(&mut self, _size: usize) -> Result<Read, DeviceConnectionError> {
        if !self.connected {
            return Err(self.not_connected());
        }

        let delay = self.delay();

        if let Some(timeout) = self.timeout
            && timeout < delay
        {
            sleep(timeout).await;
            return Ok(Read::TimedOut);
        }

        sleep(delay).await;

        let Some(header) = self.header else {
            return Ok(Read::TimedOut);
        };

        let stop = self.stop.clone();

        let found = task::spawn_blocking(move || scan(header, &stop))
            .await
            .map_err(|err| DeviceConnectionError::Io {
                device: self.name.clone(),
                source: io::Error::other(err),
            })?;

        match found {
            Some(nonce) => {
                debug!("{} found nonce {}", self.name, Nonce::from(nonce));

                self.header = nonce.checked_add(1).map(|next| {
                    let mut next_header = header;
                    LittleEndian::write_u32(&mut next_header[76..80], next);
                    next_header
                });

                Ok(Read::Bytes(nonce.to_be_bytes().to_vec()))
            }
            None => {
                self.header = None;
                Ok(Read::TimedOut)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "00000020f5e4d3c2b1a0f9e8d7c6b5a4e3d2c1f7a3e8e4b5401f5b4c6c1b0a9d1e0a3a3d\
                          d2f3384241007491d002d0d201ff1c4a116435321f0efe15f0811be4496924c700f15365\
                          ffff001f00000000";

    const WINNER: u32 = 31883;

    fn header(nonce: u32) -> [u8; 80] {
        let mut header: [u8; 80] = hex::decode(HEADER).unwrap().try_into().unwrap();
        LittleEndian::write_u32(&mut header[76..80], nonce);
        header
    }

    fn device(timeout: Option<Duration>) -> SimulatedDevice {
        SimulatedDevice::new("sim".into(), Duration::from_millis(1), timeout)
    }

    #[test]
    fn simulator_target() {
        assert_eq!(
            hex::encode(SIMULATOR_TARGET),
            "0000ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"
        );
    }

    #[test]
    fn scan_finds_first_share_from_start() {
        let stop = AtomicBool::new(false);
        assert_eq!(scan(header(WINNER - 100), &stop), Some(WINNER));
        assert_eq!(scan(header(WINNER), &stop), Some(WINNER));
    }

    #[test]
    fn scan_stops_when_asked() {
        let stop = AtomicBool::new(true);
        assert_eq!(scan(header(0), &stop), None);
    }

    #[test]
    fn no_jitter_for_short_delays() {
        let device = SimulatedDevice::new("sim".into(), Duration::from_secs(2), None);
        assert_eq!(device.delay(), Duration::from_secs(2));
    }

    #[test]
    fn jitter_stays_within_two_seconds() {
        let device = SimulatedDevice::new("sim".into(), Duration::from_secs(5), None);
        for _ in 0..100 {
            let delay = device.delay();
            assert!(delay >= Duration::from_secs(3), "{delay:?}");
            assert!(delay <= Duration::from_secs(7), "{delay:?}");
        }
    }

    #[tokio::test]
    async fn reports_big_endian_nonce_and_resumes() {
        let mut device = device(None);
        device.connect().await.unwrap();
        device.write(&header(WINNER - 100)).await.unwrap();

        assert_eq!(
            device.read(NONCE_SIZE).await.unwrap(),
            Read::Bytes(WINNER.to_be_bytes().to_vec())
        );

        let Read::Bytes(next) = device.read(NONCE_SIZE).await.unwrap() else {
            panic!("expected a second share");
        };
        assert!(u32::from_be_bytes(next.try_into().unwrap()) > WINNER);
    }

    #[tokio::test]
    async fn read_timeout_shorter_than_delay_yields_nothing() {
        let mut device =
            SimulatedDevice::new("sim".into(), Duration::from_millis(500), Some(Duration::ZERO));
        device.connect().await.unwrap();
        device.write(&header(WINNER - 100)).await.unwrap();

        assert_eq!(device.read(NONCE_SIZE).await.unwrap(), Read::TimedOut);
    }

    #[tokio::test]
    async fn rejects_midstate_work() {
        let mut device = device(None);
        device.connect().await.unwrap();

        assert!(matches!(
            device.write(&[0; 48]).await,
            Err(DeviceConnectionError::UnsupportedWork { size: 48, .. })
        ));
    }

    #[tokio::test]
    async fn requires_connection() {
        let mut device = device(None);

        assert!(matches!(
            device.write(&header(0)).await,
            Err(DeviceConnectionError::NotConnected { .. })
        ));

        device.connect().await.unwrap();
        device.connect().await.unwrap();
        assert!(device.is_connected());

        device.disconnect().await;
        assert!(!device.is_connected());

        assert!(matches!(
            device.read(NONCE_SIZE).await,
            Err(DeviceConnectionError::NotConnected { .. })
        ));
    }

    #[test]
    fn display() {
        assert_eq!(
            SimulatedDevice::new("sim".into(), Duration::from_secs(5), None).to_string(),
            "<Device 'sim' [type=simulator, avg_delay=5s, timeout=none]>"
        );
    }
}
