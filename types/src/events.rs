pub mod client;
pub mod server;

use client::*;
use server::*;

/// Events written to the control channel.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate(ConversationItemCreateEvent),
    #[serde(rename = "response.create")]
    ResponseCreate(ResponseCreateEvent),
}

/// Events read from the control channel.
///
/// Kinds the rehearsal does not care about deserialize to [`ServerEvent::Unknown`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "error")]
    Error(ErrorEvent),
    #[serde(rename = "session.created")]
    SessionCreated(SessionCreatedEvent),
    #[serde(rename = "input_audio_buffer.speech_started")]
    InputAudioBufferSpeechStarted(InputAudioBufferSpeechStartedEvent),
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    InputAudioBufferSpeechStopped(InputAudioBufferSpeechStoppedEvent),
    #[serde(rename = "response.done")]
    ResponseDone(ResponseDoneEvent),
    #[serde(rename = "response.text.delta")]
    ResponseTextDelta(ResponseTextDeltaEvent),
    #[serde(rename = "response.audio.started")]
    ResponseAudioStarted(ResponseAudioStartedEvent),
    #[serde(rename = "response.audio.done")]
    ResponseAudioDone(ResponseAudioDoneEvent),
    #[serde(other)]
    Unknown,
}

impl ServerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Error(_) => "error",
            ServerEvent::SessionCreated(_) => "session.created",
            ServerEvent::InputAudioBufferSpeechStarted(_) => "input_audio_buffer.speech_started",
            ServerEvent::InputAudioBufferSpeechStopped(_) => "input_audio_buffer.speech_stopped",
            ServerEvent::ResponseDone(_) => "response.done",
            ServerEvent::ResponseTextDelta(_) => "response.text.delta",
            ServerEvent::ResponseAudioStarted(_) => "response.audio.started",
            ServerEvent::ResponseAudioDone(_) => "response.audio.done",
            ServerEvent::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Item, MessageItem};

    #[test]
    fn test_conversation_item_create_wire_shape() {
        let item = MessageItem::builder().with_input_text("Stop Reading").build();
        let event = ClientEvent::ConversationItemCreate(ConversationItemCreateEvent::new(Item::Message(item)));
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        let expected = serde_json::json!({
            "type": "conversation.item.create",
            "item": {
                "type": "message",
                "role": "user",
                "content": [{"type": "input_text", "text": "Stop Reading"}]
            }
        });
        assert_eq!(json, expected);
    }

    #[test]
    fn test_text_delta_accepts_object_and_plain_delta() {
        let json = r#"{"type":"response.text.delta","delta":{"text":"Who are you reading as?"}}"#;
        let ServerEvent::ResponseTextDelta(event) = serde_json::from_str::<ServerEvent>(json).unwrap() else {
            panic!("expected a text delta");
        };
        assert_eq!(event.text(), Some("Who are you reading as?"));

        let json = r#"{"type":"response.text.delta","event_id":"ev_1","delta":"You have the first line."}"#;
        let ServerEvent::ResponseTextDelta(event) = serde_json::from_str::<ServerEvent>(json).unwrap() else {
            panic!("expected a text delta");
        };
        assert_eq!(event.event_id(), Some("ev_1"));
        assert_eq!(event.text(), Some("You have the first line."));

        let json = r#"{"type":"response.text.delta"}"#;
        let ServerEvent::ResponseTextDelta(event) = serde_json::from_str::<ServerEvent>(json).unwrap() else {
            panic!("expected a text delta");
        };
        assert_eq!(event.text(), None);
    }

    #[test]
    fn test_unrecognized_kind_is_unknown() {
        let json = r#"{"type":"rate_limits.updated","rate_limits":[]}"#;
        let event = serde_json::from_str::<ServerEvent>(json).unwrap();
        assert!(matches!(event, ServerEvent::Unknown));
    }

    #[test]
    fn test_audio_turn_events() {
        let started = serde_json::from_str::<ServerEvent>(r#"{"type":"response.audio.started","response_id":"resp_1"}"#).unwrap();
        assert_eq!(started.kind(), "response.audio.started");
        let done = serde_json::from_str::<ServerEvent>(r#"{"type":"response.audio.done","response_id":"resp_1","item_id":"item_1"}"#).unwrap();
        assert_eq!(done.kind(), "response.audio.done");
    }
}
