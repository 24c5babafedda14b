use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use script_rehearsal_types::audio::Voice;

use crate::client::consts::*;
use crate::error::ConfigError;

/// Settings for one rehearsal session.
#[derive(Debug)]
pub struct Config {
    base_url: String,
    api_key: SecretString,
    model: String,
    voice: Voice,
    characters: [String; 2],
    script_title: String,
    opening_delay: Duration,
    continue_delay: Duration,
    auto_response: bool,
}

pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.config.api_key = SecretString::from(api_key.to_string());
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.config.model = model.to_string();
        self
    }

    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.config.voice = voice;
        self
    }

    pub fn with_characters(mut self, first: &str, second: &str) -> Self {
        self.config.characters = [first.to_string(), second.to_string()];
        self
    }

    pub fn with_script_title(mut self, title: &str) -> Self {
        self.config.script_title = title.to_string();
        self
    }

    pub fn with_opening_delay(mut self, delay: Duration) -> Self {
        self.config.opening_delay = delay;
        self
    }

    pub fn with_continue_delay(mut self, delay: Duration) -> Self {
        self.config.continue_delay = delay;
        self
    }

    /// Follow every directive with a `response.create` event.
    pub fn with_auto_response(mut self, enabled: bool) -> Self {
        self.config.auto_response = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    // Defaults only; no environment lookups here.
    pub fn new() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            api_key: SecretString::from(String::new()),
            model: DEFAULT_MODEL.to_string(),
            voice: Voice::default(),
            characters: DEFAULT_CHARACTERS.map(|c| c.to_string()),
            script_title: DEFAULT_SCRIPT_TITLE.to_string(),
            opening_delay: Duration::from_millis(OPENING_DELAY_MS),
            continue_delay: Duration::from_millis(CONTINUE_DELAY_MS),
            auto_response: false,
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Loads settings from the process environment, after reading a `.env` file if present.
    ///
    /// `OPENAI_API_KEY` is optional here because a browser-style client only ever
    /// holds the ephemeral credential; minting one requires it.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Config::builder();
        if let Some(api_key) = lookup(OPENAI_API_KEY) {
            builder = builder.with_api_key(&api_key);
        }
        if let Some(base_url) = lookup(BASE_URL_VAR) {
            builder = builder.with_base_url(&base_url);
        }
        if let Some(model) = lookup(MODEL_VAR) {
            builder = builder.with_model(&model);
        }
        if let Some(voice) = lookup(VOICE_VAR) {
            builder = builder.with_voice(voice.to_lowercase().parse::<Voice>().unwrap_or_default());
        }
        if let Some(title) = lookup(SCRIPT_TITLE_VAR) {
            builder = builder.with_script_title(&title);
        }
        if let Some(characters) = lookup(CHARACTERS_VAR) {
            let [first, second] = parse_characters(&characters)?;
            builder = builder.with_characters(&first, &second);
        }
        Ok(builder.build())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    /// The long-lived API key, needed only to mint credentials.
    pub fn require_api_key(&self) -> Result<&SecretString, ConfigError> {
        if self.api_key.expose_secret().is_empty() {
            return Err(ConfigError::MissingVar(OPENAI_API_KEY.to_string()));
        }
        Ok(&self.api_key)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn voice(&self) -> &Voice {
        &self.voice
    }

    pub fn characters(&self) -> &[String; 2] {
        &self.characters
    }

    pub fn script_title(&self) -> &str {
        &self.script_title
    }

    pub fn opening_delay(&self) -> Duration {
        self.opening_delay
    }

    pub fn continue_delay(&self) -> Duration {
        self.continue_delay
    }

    pub fn auto_response(&self) -> bool {
        self.auto_response
    }

    /// Endpoint receiving the SDP offer.
    pub fn realtime_url(&self) -> String {
        format!("{}/realtime?model={}", self.base_url, self.model)
    }

    /// Endpoint minting ephemeral credentials.
    pub fn sessions_url(&self) -> String {
        format!("{}/realtime/sessions", self.base_url)
    }
}

fn parse_characters(value: &str) -> Result<[String; 2], ConfigError> {
    let names: Vec<String> = value
        .split(',')
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    match <[String; 2]>::try_from(names) {
        Ok(pair) => Ok(pair),
        Err(_) => Err(ConfigError::InvalidValue {
            name: CHARACTERS_VAR.to_string(),
            value: value.to_string(),
        }),
    }
}
