//! Local devices through cpal.
//!
//! Captured microphone audio is delivered as 16-bit PCM frames on the channel
//! given to [`CpalMedia::new`]; the host feeds those frames into its peer
//! connection's outgoing track.

use std::sync::Arc;

use async_trait::async_trait;
use script_rehearsal_utils::capture::{CaptureConfig, InputCapture};
use script_rehearsal_utils::playback::OutputPlayback;
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::transport::{AudioConstraints, AudioOutput, LocalAudioTrack, MediaDevices};

const PLAYBACK_LATENCY_MS: usize = 200;

pub struct CpalMedia {
    input_device: Option<String>,
    output_device: Option<String>,
    frames: mpsc::Sender<Vec<i16>>,
}

impl CpalMedia {
    pub fn new(frames: mpsc::Sender<Vec<i16>>) -> Self {
        Self {
            input_device: None,
            output_device: None,
            frames,
        }
    }

    pub fn with_input_device(mut self, name: &str) -> Self {
        self.input_device = Some(name.to_string());
        self
    }

    pub fn with_output_device(mut self, name: &str) -> Self {
        self.output_device = Some(name.to_string());
        self
    }
}

struct CpalTrack {
    capture: InputCapture,
}

impl LocalAudioTrack for CpalTrack {
    fn set_enabled(&self, enabled: bool) {
        self.capture.set_enabled(enabled);
    }

    fn is_enabled(&self) -> bool {
        self.capture.is_enabled()
    }

    fn stop(&self) {
        self.capture.stop();
    }
}

/// Speaker playback. Samples must be mono at [`OutputPlayback::sample_rate`].
struct CpalOutput {
    playback: OutputPlayback,
}

impl AudioOutput for CpalOutput {
    fn play(&self, samples: &[f32]) {
        let queued = self.playback.push(samples);
        if queued < samples.len() {
            tracing::warn!("playback buffer full, dropped {} samples", samples.len() - queued);
        }
    }

    fn release(&self) {
        self.playback.stop();
    }
}

#[async_trait]
impl MediaDevices for CpalMedia {
    async fn open_microphone(&self, constraints: &AudioConstraints) -> Result<Vec<Arc<dyn LocalAudioTrack>>, TransportError> {
        let config = CaptureConfig {
            device_name: self.input_device.clone(),
            sample_rate: constraints.sample_rate,
            channels: constraints.channel_count,
            ..CaptureConfig::default()
        };
        let frames = self.frames.clone();
        let capture = tokio::task::spawn_blocking(move || InputCapture::start(config, frames))
            .await
            .map_err(|e| TransportError::MediaAcquisition(e.to_string()))?
            .map_err(|e| TransportError::MediaAcquisition(e.to_string()))?;
        tracing::info!("capturing from {} at {} Hz", capture.device_name(), capture.sample_rate());
        Ok(vec![Arc::new(CpalTrack { capture })])
    }

    async fn open_speaker(&self) -> Result<Arc<dyn AudioOutput>, TransportError> {
        let device = self.output_device.clone();
        let playback = tokio::task::spawn_blocking(move || OutputPlayback::start(device, PLAYBACK_LATENCY_MS))
            .await
            .map_err(|e| TransportError::MediaAcquisition(e.to_string()))?
            .map_err(|e| TransportError::MediaAcquisition(e.to_string()))?;
        tracing::info!("playing remote audio at {} Hz", playback.sample_rate());
        Ok(Arc::new(CpalOutput { playback }))
    }
}
