//! Live-stream playback controller.
//!
//! The controller owns one [`PlaybackSession`] and at most one audio output
//! handle. The handle is opened on the first play, never before.

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_VOLUME: u8 = 70;
pub const MAX_VOLUME: u8 = 100;

/// Transport state of the docked player.
///
/// `is_playing` is the last requested transport action, not a delivery
/// guarantee. Mute is orthogonal to the stored level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackSession {
    pub is_playing: bool,
    pub volume_level: u8,
    pub is_muted: bool,
}

impl PlaybackSession {
    #[must_use]
    pub fn new(initial_volume: u8) -> Self {
        Self {
            is_playing: false,
            volume_level: initial_volume.min(MAX_VOLUME),
            is_muted: false,
        }
    }

    /// Audible output level
    #[must_use]
    pub const fn effective_gain(&self) -> u8 {
        if self.is_muted {
            0
        } else {
            self.volume_level
        }
    }
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new(DEFAULT_VOLUME)
    }
}

/// Clamp arbitrary slider input into `0..=100`
#[must_use]
pub fn clamp_volume(level: i32) -> u8 {
    u8::try_from(level.clamp(0, i32::from(MAX_VOLUME))).unwrap_or(MAX_VOLUME)
}

/// Source of audio output handles
pub trait AudioBackend: Send + Sync {
    /// Acquire a handle for `url`. Must not start any transport.
    ///
    /// # Errors
    ///
    /// Returns an error if no output can be created.
    fn open(&self, url: &Url) -> Result<Box<dyn AudioOutput>>;
}

/// A single audio output bound to one stream
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Start or resume the stream
    async fn play(&mut self) -> Result<()>;

    /// Halt the stream
    async fn pause(&mut self) -> Result<()>;

    fn set_volume(&mut self, level: u8);

    fn set_muted(&mut self, muted: bool);
}

/// Events emitted by the playback controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Started,
    Stopped,
    VolumeChanged { level: u8, effective: u8 },
    MuteChanged { muted: bool },
    /// The transport reported a failure; `is_playing` is unchanged by it
    TransportError { message: String },
}

struct PlayerInner {
    session: PlaybackSession,
    output: Option<Box<dyn AudioOutput>>,
    released: bool,
}

/// Mediates user intent against the single audio output handle
pub struct PlaybackController {
    backend: Arc<dyn AudioBackend>,
    stream_url: Url,
    inner: RwLock<PlayerInner>,
    event_tx: broadcast::Sender<PlaybackEvent>,
}

impl PlaybackController {
    pub fn new(backend: Arc<dyn AudioBackend>, stream_url: Url, initial_volume: u8) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(64);

        Arc::new(Self {
            backend,
            stream_url,
            inner: RwLock::new(PlayerInner {
                session: PlaybackSession::new(initial_volume),
                output: None,
                released: false,
            }),
            event_tx,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.event_tx.subscribe()
    }

    pub async fn session(&self) -> PlaybackSession {
        self.inner.read().await.session
    }

    /// Start the stream if stopped, stop it if playing.
    ///
    /// # Errors
    ///
    /// Returns an error only when the output handle cannot be opened; the
    /// session is left untouched in that case. Transport failures after the
    /// handle exists are reported as [`PlaybackEvent::TransportError`].
    pub async fn toggle_playback(&self) -> Result<PlaybackSession> {
        let mut inner = self.inner.write().await;
        if inner.released {
            debug!("Ignoring toggle on released player");
            return Ok(inner.session);
        }

        if inner.session.is_playing {
            if let Some(output) = inner.output.as_mut() {
                if let Err(e) = output.pause().await {
                    self.report_transport_error(&e.to_string());
                }
            }
            inner.session.is_playing = false;
            info!("Playback stopped");
            let _ = self.event_tx.send(PlaybackEvent::Stopped);
        } else {
            let session = inner.session;
            let output = match inner.output.take() {
                Some(output) => output,
                None => self.open_output(session)?,
            };
            let output = inner.output.insert(output);

            if let Err(e) = output.play().await {
                self.report_transport_error(&e.to_string());
            }
            inner.session.is_playing = true;
            info!("Playback started: {}", self.stream_url);
            let _ = self.event_tx.send(PlaybackEvent::Started);
        }

        Ok(inner.session)
    }

    /// Set the stored level, clamped to `0..=100`.
    ///
    /// A level above zero clears mute so the change is audible.
    pub async fn set_volume(&self, level: i32) -> PlaybackSession {
        let level = clamp_volume(level);
        let mut inner = self.inner.write().await;

        inner.session.volume_level = level;
        let unmuted = level > 0 && inner.session.is_muted;
        if unmuted {
            inner.session.is_muted = false;
        }

        if let Some(output) = inner.output.as_mut() {
            output.set_volume(level);
            if unmuted {
                output.set_muted(false);
            }
        }

        debug!("Volume set to {}", level);
        if unmuted {
            let _ = self
                .event_tx
                .send(PlaybackEvent::MuteChanged { muted: false });
        }
        let _ = self.event_tx.send(PlaybackEvent::VolumeChanged {
            level,
            effective: inner.session.effective_gain(),
        });

        inner.session
    }

    /// Flip mute without touching the stored level
    pub async fn toggle_mute(&self) -> PlaybackSession {
        let mut inner = self.inner.write().await;
        let muted = !inner.session.is_muted;
        inner.session.is_muted = muted;

        if let Some(output) = inner.output.as_mut() {
            output.set_muted(muted);
        }

        debug!("Mute {}", if muted { "on" } else { "off" });
        let _ = self.event_tx.send(PlaybackEvent::MuteChanged { muted });

        inner.session
    }

    /// Stop the stream and drop the output handle. The controller ignores
    /// transport requests afterwards.
    pub async fn release(&self) {
        let mut inner = self.inner.write().await;
        if inner.released {
            return;
        }
        inner.released = true;

        let was_playing = inner.session.is_playing;
        if let Some(mut output) = inner.output.take() {
            if was_playing {
                if let Err(e) = output.pause().await {
                    warn!("Failed to stop stream on release: {}", e);
                }
            }
        }
        inner.session.is_playing = false;

        if was_playing {
            let _ = self.event_tx.send(PlaybackEvent::Stopped);
        }
        info!("Player released");
    }

    fn open_output(&self, session: PlaybackSession) -> Result<Box<dyn AudioOutput>> {
        info!("Opening audio output for {}", self.stream_url);
        let mut output = self.backend.open(&self.stream_url)?;
        output.set_volume(session.volume_level);
        output.set_muted(session.is_muted);
        Ok(output)
    }

    fn report_transport_error(&self, message: &str) {
        warn!("Stream transport error: {}", message);
        let _ = self.event_tx.send(PlaybackEvent::TransportError {
            message: message.to_string(),
        });
    }
}
