//! Turns inbound control-channel events into rehearsal signals.
//!
//! The remote agent exposes no structured turn index, so whose turn it is and
//! which character was picked are read from the fixed phrases the agent is
//! instructed to say (see [`crate::instructions`]). A paraphrase by the agent
//! yields no signal and leaves the controller where it was. Every phrase rule
//! lives in [`PhraseClassifier`]; the controller only sees [`Signal`]s.

use std::sync::LazyLock;

use regex::Regex;
use script_rehearsal_types::events::server::ResponseTextDeltaEvent;
use script_rehearsal_types::ServerEvent;

pub const WHO_ARE_YOU_READING_AS: &str = "who are you reading as";
pub const ILL_BE_READING_AS: &str = "i'll be reading as";
pub const I_WILL_BE_READING_AS: &str = "i will be reading as";
pub const I_HAVE_THE_FIRST_LINE: &str = "i have the first line";
pub const YOU_HAVE_THE_FIRST_LINE: &str = "you have the first line";
pub const START_WHENEVER_READY: &str = "please start whenever you're ready";
pub const READING_STOPPED: &str = "reading stopped";

static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:i'll|i will) be reading as (\w+)").expect("assignment pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Agent,
    User,
}

/// Application-level signal derived from one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// `opening` marks the agent announcing that it reads the first line.
    TurnStarted { by: Speaker, opening: bool },
    TurnEnded { by: Speaker },
    WaitingForUser,
    CharacterAssigned { name: String },
    ReadingStopped,
}

pub trait EventClassifier: Send + Sync {
    fn classify(&self, event: &ServerEvent) -> Vec<Signal>;
}

/// Classifier matching the agent's mandated phrasing, case-insensitively.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhraseClassifier;

impl PhraseClassifier {
    pub fn new() -> Self {
        Self
    }

    fn classify_text(&self, event: &ResponseTextDeltaEvent) -> Vec<Signal> {
        let Some(text) = event.text().filter(|t| !t.trim().is_empty()) else {
            return Vec::new();
        };
        tracing::debug!("text delta: {:?}", text);

        let text = text.replace('\u{2019}', "'");
        let lowered = text.to_lowercase();
        let mut signals = Vec::new();

        if lowered.contains(WHO_ARE_YOU_READING_AS) {
            signals.push(Signal::WaitingForUser);
        } else if lowered.contains(ILL_BE_READING_AS) || lowered.contains(I_WILL_BE_READING_AS) {
            match ASSIGNMENT.captures(&text).and_then(|c| c.get(1)) {
                Some(name) => {
                    tracing::info!("character assigned: {}", name.as_str());
                    signals.push(Signal::CharacterAssigned {
                        name: name.as_str().to_string(),
                    });
                }
                None => tracing::debug!("assignment phrase without a character name: {:?}", text),
            }
            if lowered.contains(I_HAVE_THE_FIRST_LINE) {
                tracing::info!("agent has the first line");
                signals.push(Signal::TurnStarted {
                    by: Speaker::Agent,
                    opening: true,
                });
            }
        }

        if lowered.contains(YOU_HAVE_THE_FIRST_LINE) || lowered.contains(START_WHENEVER_READY) {
            if signals.iter().any(|s| matches!(s, Signal::TurnStarted { .. })) {
                tracing::debug!("both speakers claimed the first line: {:?}", text);
            }
            if !signals.contains(&Signal::WaitingForUser) {
                signals.push(Signal::WaitingForUser);
            }
        }

        if lowered.contains(READING_STOPPED) {
            tracing::info!("reading stopped");
            signals.push(Signal::ReadingStopped);
        }

        signals
    }
}

impl EventClassifier for PhraseClassifier {
    fn classify(&self, event: &ServerEvent) -> Vec<Signal> {
        match event {
            ServerEvent::SessionCreated(e) => {
                tracing::info!("session created: {}", e.session_id().unwrap_or("unknown"));
                Vec::new()
            }
            ServerEvent::ResponseTextDelta(e) => self.classify_text(e),
            ServerEvent::ResponseAudioStarted(_) => {
                tracing::debug!("agent started speaking");
                vec![Signal::TurnStarted {
                    by: Speaker::Agent,
                    opening: false,
                }]
            }
            ServerEvent::ResponseAudioDone(_) => {
                tracing::debug!("agent finished speaking");
                vec![Signal::TurnEnded { by: Speaker::Agent }]
            }
            ServerEvent::InputAudioBufferSpeechStarted(_) => {
                tracing::debug!("user started speaking");
                vec![Signal::TurnStarted {
                    by: Speaker::User,
                    opening: false,
                }]
            }
            ServerEvent::InputAudioBufferSpeechStopped(_) => {
                tracing::debug!("user stopped speaking");
                vec![Signal::TurnEnded { by: Speaker::User }]
            }
            ServerEvent::ResponseDone(e) => {
                tracing::debug!("response complete: status={}", e.status().unwrap_or("unknown"));
                Vec::new()
            }
            ServerEvent::Error(e) => {
                tracing::warn!("server error: {} ({})", e.error().message(), e.error().error_type());
                Vec::new()
            }
            ServerEvent::Unknown => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(fragment: &str) -> ServerEvent {
        ServerEvent::ResponseTextDelta(ResponseTextDeltaEvent::new(fragment))
    }

    fn event(json: &str) -> ServerEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_agent_takes_first_line() {
        let signals = PhraseClassifier::new().classify(&text("I'll be reading as JOHN. I have the first line, I'll begin now."));
        assert_eq!(
            signals,
            vec![
                Signal::CharacterAssigned { name: "JOHN".to_string() },
                Signal::TurnStarted { by: Speaker::Agent, opening: true },
            ]
        );
    }

    #[test]
    fn test_who_are_you_reading_as() {
        let signals = PhraseClassifier::new().classify(&text("Who are you reading as?"));
        assert_eq!(signals, vec![Signal::WaitingForUser]);
    }

    #[test]
    fn test_assignment_without_first_line() {
        let signals = PhraseClassifier::new().classify(&text("Okay, I will be reading as Hudson."));
        assert_eq!(signals, vec![Signal::CharacterAssigned { name: "Hudson".to_string() }]);
    }

    #[test]
    fn test_typographic_apostrophe() {
        let signals = PhraseClassifier::new().classify(&text("I\u{2019}ll be reading as JOHN."));
        assert_eq!(signals, vec![Signal::CharacterAssigned { name: "JOHN".to_string() }]);
    }

    #[test]
    fn test_user_has_first_line() {
        let classifier = PhraseClassifier::new();
        assert_eq!(
            classifier.classify(&text("Great, you have the first line.")),
            vec![Signal::WaitingForUser]
        );
        assert_eq!(
            classifier.classify(&text("PLEASE START WHENEVER YOU'RE READY.")),
            vec![Signal::WaitingForUser]
        );
        assert_eq!(
            classifier.classify(&text("Great, you have the first line. Please start whenever you're ready.")),
            vec![Signal::WaitingForUser]
        );
    }

    #[test]
    fn test_reading_stopped() {
        let signals = PhraseClassifier::new().classify(&text("Reading stopped. Press the microphone when you're ready to start over."));
        assert_eq!(signals, vec![Signal::ReadingStopped]);
    }

    #[test]
    fn test_unmatched_or_empty_text_yields_nothing() {
        let classifier = PhraseClassifier::new();
        assert!(classifier.classify(&text("License and registration, please.")).is_empty());
        assert!(classifier.classify(&text("   ")).is_empty());
        assert!(classifier.classify(&event(r#"{"type":"response.text.delta"}"#)).is_empty());
        assert!(classifier.classify(&text("I'll be reading as")).is_empty());
    }

    #[test]
    fn test_structured_events() {
        let classifier = PhraseClassifier::new();
        assert_eq!(
            classifier.classify(&event(r#"{"type":"response.audio.started"}"#)),
            vec![Signal::TurnStarted { by: Speaker::Agent, opening: false }]
        );
        assert_eq!(
            classifier.classify(&event(r#"{"type":"response.audio.done"}"#)),
            vec![Signal::TurnEnded { by: Speaker::Agent }]
        );
        assert_eq!(
            classifier.classify(&event(r#"{"type":"input_audio_buffer.speech_started","audio_start_ms":1200}"#)),
            vec![Signal::TurnStarted { by: Speaker::User, opening: false }]
        );
        assert_eq!(
            classifier.classify(&event(r#"{"type":"input_audio_buffer.speech_stopped","audio_end_ms":2400}"#)),
            vec![Signal::TurnEnded { by: Speaker::User }]
        );
    }

    #[test]
    fn test_logged_only_events() {
        let classifier = PhraseClassifier::new();
        assert!(classifier.classify(&event(r#"{"type":"session.created","session":{"id":"sess_1"}}"#)).is_empty());
        assert!(classifier.classify(&event(r#"{"type":"response.done","response":{"status":"completed"}}"#)).is_empty());
        assert!(classifier
            .classify(&event(r#"{"type":"error","error":{"type":"invalid_request_error","message":"bad"}}"#))
            .is_empty());
        assert!(classifier.classify(&event(r#"{"type":"conversation.item.created"}"#)).is_empty());
    }
}
