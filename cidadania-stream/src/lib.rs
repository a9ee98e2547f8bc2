//! HTTP live-stream audio output.
//!
//! The output does not decode anything: it forwards the encoded stream as
//! [`StreamFrame`]s tagged with the gain in effect when each chunk arrived.
//! A consumer (an external decoder, a file sink) turns them into sound.

use async_trait::async_trait;
use bytes::Bytes;
use cidadania_core::{AudioBackend, AudioOutput, CoreError};
use futures::StreamExt;
use reqwest::Client;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Frames buffered between the pump and a slow consumer
pub const DEFAULT_FRAME_BUFFER: usize = 64;

/// One chunk of the encoded stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFrame {
    pub chunk: Bytes,
    /// Effective gain 0..=100; zero means muted
    pub gain: u8,
}

/// Hands out [`HttpStreamOutput`]s that all feed the same frame channel
pub struct HttpStreamBackend {
    client: Client,
    frames: mpsc::Sender<StreamFrame>,
}

impl HttpStreamBackend {
    /// Create a backend writing frames to `frames`.
    ///
    /// The client has no overall timeout since the stream never ends on its
    /// own.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(frames: mpsc::Sender<StreamFrame>) -> Result<Self, CoreError> {
        let client = Client::builder()
            .user_agent(concat!("cidadania/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, frames))
    }

    #[must_use]
    pub const fn with_client(client: Client, frames: mpsc::Sender<StreamFrame>) -> Self {
        Self { client, frames }
    }
}

impl AudioBackend for HttpStreamBackend {
    fn open(&self, url: &Url) -> Result<Box<dyn AudioOutput>, CoreError> {
        debug!("Creating stream output for {}", url);
        Ok(Box::new(HttpStreamOutput::new(
            self.client.clone(),
            url.clone(),
            self.frames.clone(),
        )))
    }
}

struct Pump {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Output bound to one stream URL. Connects on `play`, disconnects on `pause`.
pub struct HttpStreamOutput {
    client: Client,
    url: Url,
    frames: mpsc::Sender<StreamFrame>,
    level: u8,
    muted: bool,
    gain_tx: watch::Sender<u8>,
    pump: Option<Pump>,
}

impl HttpStreamOutput {
    #[must_use]
    pub fn new(client: Client, url: Url, frames: mpsc::Sender<StreamFrame>) -> Self {
        let level = cidadania_core::DEFAULT_VOLUME;
        let (gain_tx, _) = watch::channel(level);
        Self {
            client,
            url,
            frames,
            level,
            muted: false,
            gain_tx,
            pump: None,
        }
    }

    /// Whether a connection is currently pumping frames
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.pump.as_ref().is_some_and(|p| !p.handle.is_finished())
    }

    const fn gain(&self) -> u8 {
        if self.muted {
            0
        } else {
            self.level
        }
    }

    fn publish_gain(&self) {
        self.gain_tx.send_replace(self.gain());
    }
}

async fn pump_frames(
    response: reqwest::Response,
    frames: mpsc::Sender<StreamFrame>,
    gain_rx: watch::Receiver<u8>,
    cancel: CancellationToken,
) {
    let mut stream = response.bytes_stream();
    let mut forwarded = 0usize;

    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => break,
            next = stream.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                let frame = StreamFrame {
                    chunk,
                    gain: *gain_rx.borrow(),
                };
                tokio::select! {
                    () = cancel.cancelled() => break,
                    sent = frames.send(frame) => {
                        if sent.is_err() {
                            debug!("Frame consumer dropped, stopping stream");
                            break;
                        }
                    }
                }
                forwarded += 1;
            }
            Some(Err(e)) => {
                warn!("Live stream interrupted: {}", e);
                break;
            }
            None => {
                info!("Live stream ended by server");
                break;
            }
        }
    }

    debug!("Stream pump finished after {} frames", forwarded);
}

#[async_trait]
impl AudioOutput for HttpStreamOutput {
    async fn play(&mut self) -> Result<(), CoreError> {
        if self.is_connected() {
            debug!("Stream already connected");
            return Ok(());
        }

        info!("Connecting to live stream {}", self.url);
        let response = self.client.get(self.url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("Live stream returned status: {}", status);
            return Err(CoreError::StreamUnavailable {
                status: status.as_u16(),
            });
        }

        self.publish_gain();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(pump_frames(
            response,
            self.frames.clone(),
            self.gain_tx.subscribe(),
            cancel.clone(),
        ));
        self.pump = Some(Pump { cancel, handle });
        Ok(())
    }

    async fn pause(&mut self) -> Result<(), CoreError> {
        if let Some(pump) = self.pump.take() {
            pump.cancel.cancel();
            pump.handle.await.map_err(|e| CoreError::AudioTransport {
                reason: format!("stream task failed: {e}"),
            })?;
            info!("Disconnected from live stream");
        }
        Ok(())
    }

    fn set_volume(&mut self, level: u8) {
        self.level = level;
        self.publish_gain();
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.publish_gain();
    }
}

impl Drop for HttpStreamOutput {
    fn drop(&mut self) {
        if let Some(pump) = &self.pump {
            pump.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output() -> HttpStreamOutput {
        let (tx, _rx) = mpsc::channel(1);
        HttpStreamOutput::new(
            Client::new(),
            Url::parse("http://127.0.0.1:9/stream").unwrap(),
            tx,
        )
    }

    #[test]
    fn test_gain_follows_volume_and_mute() {
        let mut output = output();
        assert_eq!(*output.gain_tx.borrow(), 70);

        output.set_volume(30);
        assert_eq!(*output.gain_tx.borrow(), 30);

        output.set_muted(true);
        assert_eq!(*output.gain_tx.borrow(), 0);

        output.set_volume(50);
        assert_eq!(*output.gain_tx.borrow(), 0);

        output.set_muted(false);
        assert_eq!(*output.gain_tx.borrow(), 50);
    }

    #[tokio::test]
    async fn test_pause_without_connection_is_noop() {
        let mut output = output();
        assert!(!output.is_connected());
        output.pause().await.unwrap();
    }
}
