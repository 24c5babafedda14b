use std::sync::{Arc, Mutex};

use crate::transport::LocalAudioTrack;

/// Switches transmission of every local audio track at once.
///
/// The gate does not look at connection or turn state. Before a session has
/// attached tracks it holds none and toggling it does nothing.
#[derive(Default)]
pub struct MicrophoneGate {
    tracks: Mutex<Vec<Arc<dyn LocalAudioTrack>>>,
}

impl MicrophoneGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn attach(&self, tracks: Vec<Arc<dyn LocalAudioTrack>>) {
        let mut guard = self.tracks.lock().unwrap_or_else(|e| e.into_inner());
        guard.extend(tracks);
    }

    /// Idempotent.
    pub fn set_enabled(&self, on: bool) {
        let guard = self.tracks.lock().unwrap_or_else(|e| e.into_inner());
        for track in guard.iter() {
            track.set_enabled(on);
        }
        tracing::debug!("microphone {} ({} tracks)", if on { "enabled" } else { "disabled" }, guard.len());
    }

    /// True when at least one track transmits.
    pub fn is_enabled(&self) -> bool {
        let guard = self.tracks.lock().unwrap_or_else(|e| e.into_inner());
        guard.iter().any(|t| t.is_enabled())
    }

    pub fn track_count(&self) -> usize {
        self.tracks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Stops and forgets every track.
    pub(crate) fn stop_all(&self) {
        let tracks = std::mem::take(&mut *self.tracks.lock().unwrap_or_else(|e| e.into_inner()));
        for track in tracks {
            track.stop();
        }
    }
}
