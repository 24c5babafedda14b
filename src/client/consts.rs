pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const BASE_URL_VAR: &str = "REHEARSAL_BASE_URL";
pub const MODEL_VAR: &str = "REHEARSAL_MODEL";
pub const VOICE_VAR: &str = "REHEARSAL_VOICE";
pub const CHARACTERS_VAR: &str = "REHEARSAL_CHARACTERS";
pub const SCRIPT_TITLE_VAR: &str = "REHEARSAL_SCRIPT_TITLE";

pub const BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini-realtime-preview-2024-12-17";
pub const DEFAULT_SCRIPT_TITLE: &str = "traffic stop";
pub const DEFAULT_CHARACTERS: [&str; 2] = ["JOHN", "OFFICER HUDSON"];

pub const SDP_CONTENT_TYPE: &str = "application/sdp";
pub const CONTROL_CHANNEL_LABEL: &str = "oai-events";

pub const OPENING_DELAY_MS: u64 = 1000;
pub const CONTINUE_DELAY_MS: u64 = 500;
