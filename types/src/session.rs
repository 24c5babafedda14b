use crate::audio::Voice;

/// Body of the request that mints a short-lived realtime credential.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EphemeralSessionRequest {
    /// The realtime model the credential is scoped to.
    model: String,

    /// The voice the model uses to respond.
    #[serde(skip_serializing_if = "Option::is_none")]
    voice: Option<Voice>,

    /// The default system instructions prepended to model calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,
}

impl EphemeralSessionRequest {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            voice: None,
            instructions: None,
        }
    }

    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.voice = Some(voice);
        self
    }

    pub fn with_instructions(mut self, instructions: &str) -> Self {
        self.instructions = Some(instructions.to_string());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn voice(&self) -> Option<&Voice> {
        self.voice.as_ref()
    }

    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }
}

/// The short-lived secret handed to the client.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClientSecret {
    value: String,

    /// Unix timestamp (seconds) after which the secret is rejected
    #[serde(default)]
    expires_at: Option<i64>,
}

impl ClientSecret {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<i64> {
        self.expires_at
    }
}

/// Response of the credential minting endpoint, relayed as-is by the token backend.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EphemeralSession {
    #[serde(default)]
    id: Option<String>,

    #[serde(default)]
    model: Option<String>,

    client_secret: ClientSecret,
}

impl EphemeralSession {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn client_secret(&self) -> &ClientSecret {
        &self.client_secret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_skips_unset_fields() {
        let request = EphemeralSessionRequest::new("gpt-4o-mini-realtime-preview-2024-12-17");
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"model":"gpt-4o-mini-realtime-preview-2024-12-17"}"#);

        let request = request.with_voice(Voice::Verse).with_instructions("Read lines.");
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(
            json,
            r#"{"model":"gpt-4o-mini-realtime-preview-2024-12-17","voice":"verse","instructions":"Read lines."}"#
        );
    }

    #[test]
    fn test_session_reads_client_secret() {
        let json = r#"{
            "id": "sess_001",
            "object": "realtime.session",
            "model": "gpt-4o-mini-realtime-preview-2024-12-17",
            "client_secret": {"value": "ek_abc123", "expires_at": 1734626843}
        }"#;
        let session: EphemeralSession = serde_json::from_str(json).unwrap();
        assert_eq!(session.id(), Some("sess_001"));
        assert_eq!(session.client_secret().value(), "ek_abc123");
        assert_eq!(session.client_secret().expires_at(), Some(1734626843));
    }
}
