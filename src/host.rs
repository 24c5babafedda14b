//! A reference host: the UI state a rehearsal screen renders, kept current by
//! session callbacks and the host's own button handlers.

use std::sync::Mutex;

use crate::callbacks::SessionCallbacks;
use crate::error::TransportError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RehearsalState {
    pub connected: bool,
    pub reading: bool,
    /// Index of the highlighted script line.
    pub current_line: usize,
    pub user_character: Option<String>,
    pub error: Option<String>,
    pub speaking: bool,
    pub waiting_for_user: bool,
}

#[derive(Debug, Default)]
pub struct RehearsalHost {
    state: Mutex<RehearsalState>,
}

impl RehearsalHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> RehearsalState {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RehearsalState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn update<F: FnOnce(&mut RehearsalState)>(&self, f: F) {
        f(&mut self.lock());
    }

    pub fn connected(&self) {
        self.update(|s| {
            s.connected = true;
            s.error = None;
        });
    }

    /// The user pressed the microphone; the agent's question follows.
    pub fn start_reading(&self) {
        self.update(|s| {
            s.reading = true;
            s.error = None;
            s.waiting_for_user = true;
        });
    }

    pub fn stop_reading(&self) {
        self.update(|s| {
            s.reading = false;
            s.speaking = false;
            s.waiting_for_user = false;
            s.current_line = 0;
            s.user_character = None;
        });
    }

    pub fn start_over(&self) {
        self.update(|s| {
            s.speaking = false;
            s.current_line = 0;
            s.user_character = None;
            s.waiting_for_user = true;
        });
    }
}

impl SessionCallbacks for RehearsalHost {
    fn on_character_assigned(&self, name: &str) {
        self.update(|s| {
            s.user_character = Some(name.to_string());
            s.current_line = 0;
        });
    }

    fn on_line_complete(&self) {
        self.update(|s| s.current_line += 1);
    }

    fn on_error(&self, error: &TransportError) {
        self.update(|s| {
            s.error = Some(error.to_string());
            s.connected = false;
        });
    }

    fn on_turn_start(&self) {
        self.update(|s| {
            s.speaking = true;
            s.waiting_for_user = false;
        });
    }

    fn on_turn_end(&self) {
        self.update(|s| s.speaking = false);
    }

    fn on_waiting_for_user(&self) {
        self.update(|s| s.waiting_for_user = true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_follows_callbacks() {
        let host = RehearsalHost::new();
        host.connected();
        host.start_reading();
        host.on_character_assigned("JOHN");
        host.on_turn_start();
        host.on_turn_end();
        host.on_line_complete();
        host.on_line_complete();

        let state = host.snapshot();
        assert_eq!(state.user_character.as_deref(), Some("JOHN"));
        assert_eq!(state.current_line, 2);
        assert!(!state.speaking);

        host.on_character_assigned("OFFICER");
        assert_eq!(host.snapshot().current_line, 0);
    }

    #[test]
    fn test_turns_and_waiting() {
        let host = RehearsalHost::new();
        host.on_waiting_for_user();
        assert!(host.snapshot().waiting_for_user);
        host.on_turn_start();
        let state = host.snapshot();
        assert!(state.speaking && !state.waiting_for_user);
    }

    #[test]
    fn test_stop_and_start_over_reset_the_cursor() {
        let host = RehearsalHost::new();
        host.start_reading();
        host.on_character_assigned("JOHN");
        host.on_line_complete();

        host.stop_reading();
        let state = host.snapshot();
        assert!(!state.reading);
        assert_eq!(state.current_line, 0);
        assert_eq!(state.user_character, None);

        host.on_line_complete();
        host.start_over();
        let state = host.snapshot();
        assert_eq!(state.current_line, 0);
        assert!(state.waiting_for_user);
    }

    #[test]
    fn test_error_disconnects() {
        let host = RehearsalHost::new();
        host.connected();
        host.on_error(&TransportError::Negotiation("remote endpoint answered 500".to_string()));
        let state = host.snapshot();
        assert!(!state.connected);
        assert_eq!(state.error.as_deref(), Some("session negotiation failed: remote endpoint answered 500"));
    }
}
