use super::*;

/// Nonces `start..end` handed to a single device. `end` is exclusive and may
/// be `2^32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonceRange {
    pub start: u32,
    pub end: u64,
}

impl NonceRange {
    pub fn len(&self) -> u64 {
        self.end - u64::from(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Display for NonceRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}..{:08x}", self.start, self.end)
    }
}

/// Splits `start..2^32` into `count` contiguous ranges of equal width. The
/// last range absorbs the remainder.
pub fn partition(start: u32, count: usize) -> Vec<NonceRange> {
    if count == 0 {
        return Vec::new();
    }

    let start = u64::from(start);
    let end = 1u64 << 32;
    let count = count as u64;
    let width = (end - start) / count;

    (0..count)
        .map(|i| NonceRange {
            start: (start + i * width) as u32,
            end: if i == count - 1 {
                end
            } else {
                start + (i + 1) * width
            },
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Won { device: String, nonce: Nonce },
    TimedOut,
}

impl Outcome {
    pub fn nonce(&self) -> Option<Nonce> {
        match self {
            Self::Won { nonce, .. } => Some(*nonce),
            Self::TimedOut => None,
        }
    }
}

struct Finished {
    index: usize,
    device: Box<dyn Device>,
    nonce: Option<Nonce>,
}

/// Runs one nonce race per template across every configured device.
pub struct Orchestrator {
    devices: Vec<Box<dyn Device>>,
    timeout: Duration,
    cooldown: Duration,
}

impl Orchestrator {
    pub fn new(devices: Vec<Box<dyn Device>>, timeout: Duration) -> Self {
        Self {
            devices,
            timeout,
            cooldown: DEVICE_COOLDOWN,
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn devices(&self) -> &[Box<dyn Device>] {
        &self.devices
    }

    /// Races all devices on `template`. The first device to report a nonce
    /// meeting the template target wins. Every device task has ended and
    /// every device has been disconnected by the time this returns.
    pub async fn race(
        &mut self,
        template: Arc<BlockTemplate>,
        start: Option<Nonce>,
        cancel: &CancellationToken,
    ) -> Outcome {
        let midstate = template.midstate();

        info!(
            "Racing {} device(s) on {}",
            self.devices.len(),
            template.block_info(None)
        );
        debug!("Midstate {}", hex::encode(midstate));

        let count = self.devices.len();
        let ranges = partition(start.map(u32::from).unwrap_or_default(), count);

        let round = cancel.child_token();
        let mut tasks = JoinSet::new();

        for (index, (device, range)) in std::mem::take(&mut self.devices)
            .into_iter()
            .zip(ranges)
            .enumerate()
        {
            info!("Assigning nonces {range} to {device}");

            tasks.spawn(search(
                index,
                device,
                template.clone(),
                range,
                midstate,
                round.clone(),
                self.cooldown,
            ));
        }

        let mut devices = (0..count).map(|_| None).collect::<Vec<Option<Box<dyn Device>>>>();

        let deadline = sleep(self.timeout);
        tokio::pin!(deadline);

        let mut outcome = loop {
            tokio::select! {
                biased;
                joined = tasks.join_next() => match joined {
                    Some(Ok(finished)) => {
                        let index = finished.index;
                        let nonce = finished.nonce;
                        let name = finished.device.name().to_string();
                        devices[index] = Some(finished.device);

                        if let Some(nonce) = nonce {
                            break Outcome::Won { device: name, nonce };
                        }
                    }
                    Some(Err(err)) => error!("Device task failed: {err}"),
                    None => {
                        warn!("All devices stopped without a valid share");
                        break Outcome::TimedOut;
                    }
                },
                _ = &mut deadline => {
                    info!("No valid share within {}s", self.timeout.as_secs_f64());
                    break Outcome::TimedOut;
                }
                _ = round.cancelled() => {
                    info!("Mining round cancelled");
                    break Outcome::TimedOut;
                }
            }
        };

        round.cancel();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(finished) => {
                    // A share found as the round closed is still a valid block.
                    if let Some(nonce) = finished.nonce {
                        if outcome == Outcome::TimedOut {
                            info!(
                                "Accepting nonce {nonce} from {} found at deadline",
                                finished.device.name()
                            );
                            outcome = Outcome::Won {
                                device: finished.device.name().to_string(),
                                nonce,
                            };
                        } else {
                            debug!(
                                "Ignoring late nonce {nonce} from {}",
                                finished.device.name()
                            );
                        }
                    }
                    devices[finished.index] = Some(finished.device);
                }
                Err(err) => error!("Device task failed: {err}"),
            }
        }

        self.devices = devices.into_iter().flatten().collect();

        outcome
    }
}

async fn search(
    index: usize,
    mut device: Box<dyn Device>,
    template: Arc<BlockTemplate>,
    range: NonceRange,
    midstate: [u8; 32],
    cancel: CancellationToken,
    cooldown: Duration,
) -> Finished {
    let result = tokio::select! {
        biased;
        result = find_share(device.as_mut(), &template, range, midstate) => result.map(Some),
        _ = cancel.cancelled() => Ok(None),
    };

    let nonce = match result {
        Ok(nonce) => nonce,
        Err(err) => {
            error!("{err}");

            tokio::select! {
                _ = sleep(cooldown) => {}
                _ = cancel.cancelled() => {}
            }

            None
        }
    };

    device.disconnect().await;

    Finished {
        index,
        device,
        nonce,
    }
}

async fn find_share(
    device: &mut dyn Device,
    template: &BlockTemplate,
    range: NonceRange,
    midstate: [u8; 32],
) -> Result<Nonce, DeviceConnectionError> {
    if !device.is_connected() {
        info!("Connecting to {device}");
        device.connect().await?;
    }

    let header = template.header(Some(Nonce::from(range.start)));

    let work = if device.supports_midstate() {
        Work::midstate(midstate, &header)
    } else {
        Work::Header(header)
    };

    let work = work.to_bytes();

    info!(
        "Sending work for {} to {}",
        template.block_info(None),
        device.name()
    );
    debug!("Work {}", hex::encode(&work));

    device.write(&work).await?;

    let target = template.target_hash();

    loop {
        let bytes = match device.read(NONCE_SIZE).await? {
            Read::Bytes(bytes) => bytes,
            Read::TimedOut => {
                debug!("No share from {} yet", device.name());
                continue;
            }
        };

        let Ok(bytes) = <[u8; NONCE_SIZE]>::try_from(bytes.as_slice()) else {
            warn!(
                "Discarding {}-byte response from {}",
                bytes.len(),
                device.name()
            );
            continue;
        };

        let nonce = Nonce::from_be_bytes(bytes);
        let header_hash = template.header_hash(nonce);

        info!("Received share (nonce = 0x{nonce}) from {}", device.name());
        debug!("Header hash {}", hex::encode(header_hash));
        debug!("Target      {}", hex::encode(target));

        if header_hash <= target {
            info!("Found a valid hash for {}", template.block_info(Some(nonce)));
            return Ok(nonce);
        }

        debug!("Share invalid (header hash above target)");
    }
}
