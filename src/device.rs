use super::*;

pub use {config::DeviceConfig, serial::SerialDevice, simulator::SimulatedDevice};

mod config;
mod serial;
mod simulator;

/// Size of a candidate nonce as reported by a device.
pub const NONCE_SIZE: usize = 4;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DeviceConnectionError {
    #[snafu(display("Cannot connect to {device}: {source}"))]
    Open {
        device: String,
        source: tokio_serial::Error,
    },
    #[snafu(display("Cannot connect to {device}: {source}"))]
    Io { device: String, source: io::Error },
    #[snafu(display("Cannot connect to {device}: write timed out after {}s", timeout.as_secs_f64()))]
    WriteTimeout { device: String, timeout: Duration },
    #[snafu(display("Cannot connect to {device}: device is not connected, call connect() first"))]
    NotConnected { device: String },
    #[snafu(display("Cannot connect to {device}: cannot process {size} bytes of work"))]
    UnsupportedWork { device: String, size: usize },
}

impl DeviceConnectionError {
    pub fn device(&self) -> &str {
        match self {
            Self::Open { device, .. }
            | Self::Io { device, .. }
            | Self::WriteTimeout { device, .. }
            | Self::NotConnected { device }
            | Self::UnsupportedWork { device, .. } => device,
        }
    }
}

/// Outcome of a single device read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Read {
    Bytes(Vec<u8>),
    /// The device's read window closed without a share.
    TimedOut,
}

/// A hashing unit that searches for nonces on its own.
#[async_trait]
pub trait Device: Display + Send {
    fn name(&self) -> &str;

    fn kind(&self) -> &'static str;

    /// Whether the device accepts `midstate || tail` work instead of a full header.
    fn supports_midstate(&self) -> bool;

    fn is_connected(&self) -> bool;

    /// Opens the transport. Calling it on a connected device does nothing.
    async fn connect(&mut self) -> Result<(), DeviceConnectionError>;

    /// Releases the transport and aborts any search in progress.
    async fn disconnect(&mut self);

    async fn write(&mut self, work: &[u8]) -> Result<(), DeviceConnectionError>;

    async fn read(&mut self, size: usize) -> Result<Read, DeviceConnectionError>;
}

/// Search work as sent over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Work {
    Header([u8; 80]),
    Midstate { midstate: [u8; 32], tail: [u8; 16] },
}

impl Work {
    /// Midstate work for `header`. The last 16 header bytes are sent with every
    /// 4-byte group byte-swapped.
    pub fn midstate(midstate: [u8; 32], header: &[u8; 80]) -> Self {
        let mut tail = [0u8; 16];
        for (out, word) in tail.chunks_exact_mut(4).zip(header[64..].chunks_exact(4)) {
            BigEndian::write_u32(out, LittleEndian::read_u32(word));
        }
        Self::Midstate { midstate, tail }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Header(header) => header.to_vec(),
            Self::Midstate { midstate, tail } => {
                let mut bytes = Vec::with_capacity(48);
                bytes.extend_from_slice(midstate);
                bytes.extend_from_slice(tail);
                bytes
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midstate_work_swaps_tail_words() {
        let mut header = [0u8; 80];
        header[64..].copy_from_slice(&[
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
            0x0f, 0x10,
        ]);

        let work = Work::midstate([0xaa; 32], &header);
        let bytes = work.to_bytes();

        assert_eq!(bytes.len(), 48);
        assert_eq!(&bytes[..32], &[0xaa; 32]);
        assert_eq!(
            &bytes[32..],
            &[
                0x04, 0x03, 0x02, 0x01, 0x08, 0x07, 0x06, 0x05, 0x0c, 0x0b, 0x0a, 0x09, 0x10, 0x0f,
                0x0e, 0x0d,
            ]
        );
    }

    #[test]
    fn header_work_is_verbatim() {
        let header = [7u8; 80];
        assert_eq!(Work::Header(header).to_bytes(), header.to_vec());
    }

    #[test]
    fn errors_name_the_device() {
        let err = DeviceConnectionError::NotConnected {
            device: "usb0".into(),
        };
        assert_eq!(err.device(), "usb0");
        assert_eq!(
            err.to_string(),
            "Cannot connect to usb0: device is not connected, call connect() first"
        );
    }
}
