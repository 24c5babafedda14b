mod error;

pub use error::ErrorDetails;

/// `error` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorEvent {
    #[serde(default)]
    event_id: Option<String>,

    /// Details about the error
    error: ErrorDetails,
}

impl ErrorEvent {
    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref()
    }

    pub fn error(&self) -> &ErrorDetails {
        &self.error
    }
}

/// `session.created` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionCreatedEvent {
    #[serde(default)]
    event_id: Option<String>,

    /// The session resource, kept opaque
    #[serde(default)]
    session: serde_json::Value,
}

impl SessionCreatedEvent {
    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref()
    }

    pub fn session(&self) -> &serde_json::Value {
        &self.session
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.get("id").and_then(|v| v.as_str())
    }
}

/// `input_audio_buffer.speech_started` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct InputAudioBufferSpeechStartedEvent {
    #[serde(default)]
    event_id: Option<String>,

    /// Milliseconds since the session started when speech was detected
    #[serde(default)]
    audio_start_ms: Option<i64>,
    /// The ID of the user message item that will be created when speech stops
    #[serde(default)]
    item_id: Option<String>,
}

impl InputAudioBufferSpeechStartedEvent {
    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref()
    }

    pub fn audio_start_ms(&self) -> Option<i64> {
        self.audio_start_ms
    }

    pub fn item_id(&self) -> Option<&str> {
        self.item_id.as_deref()
    }
}

/// `input_audio_buffer.speech_stopped` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct InputAudioBufferSpeechStoppedEvent {
    #[serde(default)]
    event_id: Option<String>,

    /// Milliseconds since the session started when speech stopped
    #[serde(default)]
    audio_end_ms: Option<i64>,
    /// The ID of the user message item that will be created
    #[serde(default)]
    item_id: Option<String>,
}

impl InputAudioBufferSpeechStoppedEvent {
    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref()
    }

    pub fn audio_end_ms(&self) -> Option<i64> {
        self.audio_end_ms
    }

    pub fn item_id(&self) -> Option<&str> {
        self.item_id.as_deref()
    }
}

/// `response.done` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ResponseDoneEvent {
    #[serde(default)]
    event_id: Option<String>,

    /// The response resource, kept opaque
    #[serde(default)]
    response: serde_json::Value,
}

impl ResponseDoneEvent {
    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref()
    }

    pub fn response(&self) -> &serde_json::Value {
        &self.response
    }

    pub fn status(&self) -> Option<&str> {
        self.response.get("status").and_then(|v| v.as_str())
    }
}

/// Payload of a text delta. Arrives either as a bare string or as `{"text": ...}`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum TextDelta {
    Plain(String),
    Structured {
        #[serde(default)]
        text: Option<String>,
    },
}

/// `response.text.delta` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ResponseTextDeltaEvent {
    #[serde(default)]
    event_id: Option<String>,

    /// The ID of the response
    #[serde(default)]
    response_id: Option<String>,
    /// The ID of the item
    #[serde(default)]
    item_id: Option<String>,
    /// The delta in the text content
    #[serde(default)]
    delta: Option<TextDelta>,
}

impl ResponseTextDeltaEvent {
    pub fn new(text: &str) -> Self {
        Self {
            event_id: None,
            response_id: None,
            item_id: None,
            delta: Some(TextDelta::Structured {
                text: Some(text.to_string()),
            }),
        }
    }

    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref()
    }

    pub fn response_id(&self) -> Option<&str> {
        self.response_id.as_deref()
    }

    pub fn item_id(&self) -> Option<&str> {
        self.item_id.as_deref()
    }

    /// The streamed text fragment, if any.
    pub fn text(&self) -> Option<&str> {
        match self.delta.as_ref()? {
            TextDelta::Plain(text) => Some(text.as_str()),
            TextDelta::Structured { text } => text.as_deref(),
        }
    }
}

/// `response.audio.started` event
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ResponseAudioStartedEvent {
    #[serde(default)]
    event_id: Option<String>,

    /// The ID of the response
    #[serde(default)]
    response_id: Option<String>,
}

impl ResponseAudioStartedEvent {
    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref()
    }

    pub fn response_id(&self) -> Option<&str> {
        self.response_id.as_deref()
    }
}

/// `response.audio.done` event
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ResponseAudioDoneEvent {
    #[serde(default)]
    event_id: Option<String>,

    /// The ID of the response
    #[serde(default)]
    response_id: Option<String>,
    /// The ID of the item
    #[serde(default)]
    item_id: Option<String>,
}

impl ResponseAudioDoneEvent {
    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref()
    }

    pub fn response_id(&self) -> Option<&str> {
        self.response_id.as_deref()
    }

    pub fn item_id(&self) -> Option<&str> {
        self.item_id.as_deref()
    }
}
