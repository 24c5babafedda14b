//! Seams to the real-time media stack.
//!
//! The peer connection and the device layer belong to the host (a WebRTC
//! binding, a browser bridge, a test fake). The session only drives them
//! through these traits.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::TransportError;

mod negotiate;

pub use negotiate::{HttpNegotiator, Negotiator};
#[cfg(test)]
pub use negotiate::MockNegotiator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpKind {
    Offer,
    Answer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Preferred microphone settings. Every field is a hint the device may not honour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioConstraints {
    pub channel_count: u16,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
    pub sample_rate: u32,
    pub sample_size: u16,
}

impl Default for AudioConstraints {
    fn default() -> Self {
        Self {
            channel_count: 1,
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
            sample_rate: 16_000,
            sample_size: 16,
        }
    }
}

/// Lifecycle of the control channel as seen by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Open,
    Message(String),
    Error(String),
    Closed,
}

pub type ChannelEvents = BoxStream<'static, ChannelEvent>;

/// A captured microphone track attached to the peer connection.
pub trait LocalAudioTrack: Send + Sync {
    fn set_enabled(&self, enabled: bool);
    fn is_enabled(&self) -> bool;
    fn stop(&self);
}

/// Sink for the remote agent's voice.
pub trait AudioOutput: Send + Sync {
    fn play(&self, samples: &[f32]);
    fn release(&self);
}

#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn open_microphone(&self, constraints: &AudioConstraints) -> Result<Vec<Arc<dyn LocalAudioTrack>>, TransportError>;

    async fn open_speaker(&self) -> Result<Arc<dyn AudioOutput>, TransportError>;
}

/// Ordered, reliable message channel next to the audio.
#[async_trait]
pub trait ControlChannel: Send + Sync {
    fn label(&self) -> &str;

    fn is_open(&self) -> bool;

    async fn send(&self, text: String) -> Result<(), TransportError>;

    async fn close(&self);
}

#[async_trait]
pub trait PeerConnection: Send + Sync {
    fn add_track(&self, track: Arc<dyn LocalAudioTrack>) -> Result<(), TransportError>;

    /// Remote audio tracks are played on `output` once they arrive.
    fn route_remote_audio(&self, output: Arc<dyn AudioOutput>);

    async fn create_data_channel(&self, label: &str) -> Result<(Arc<dyn ControlChannel>, ChannelEvents), TransportError>;

    async fn create_offer(&self) -> Result<SessionDescription, TransportError>;

    async fn set_local_description(&self, description: SessionDescription) -> Result<(), TransportError>;

    async fn set_remote_description(&self, description: SessionDescription) -> Result<(), TransportError>;

    async fn close(&self);
}

/// Everything a session needs from the host's media stack.
#[derive(Clone)]
pub struct Backend {
    pub peer: Arc<dyn PeerConnection>,
    pub media: Arc<dyn MediaDevices>,
    pub negotiator: Arc<dyn Negotiator>,
}

impl Backend {
    pub fn new(peer: Arc<dyn PeerConnection>, media: Arc<dyn MediaDevices>, negotiator: Arc<dyn Negotiator>) -> Self {
        Self { peer, media, negotiator }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferred_constraints() {
        let constraints = AudioConstraints::default();
        assert_eq!(constraints.channel_count, 1);
        assert_eq!(constraints.sample_rate, 16_000);
        assert_eq!(constraints.sample_size, 16);
        assert!(constraints.echo_cancellation && constraints.noise_suppression && constraints.auto_gain_control);
    }

    #[test]
    fn test_description_kinds() {
        assert_eq!(SessionDescription::offer("v=0").kind, SdpKind::Offer);
        assert_eq!(SessionDescription::answer("v=0").kind, SdpKind::Answer);
    }
}
