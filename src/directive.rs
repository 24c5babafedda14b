use script_rehearsal_types::events::client::ConversationItemCreateEvent;
use script_rehearsal_types::{ClientEvent, Item, MessageItem};

pub const CONTINUE_TEXT: &str = "Continue with your next line exactly as shown in the script.";
pub const FIRST_LINE_TEXT: &str = "Please start with your first line exactly as shown in the script.";
pub const STOP_READING_TEXT: &str = "Stop Reading";
pub const START_OVER_TEXT: &str = "Start Over";

/// An instruction written to the control channel to steer the agent's next utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// The session's single opening prompt asking which character the user reads.
    Opening { script_title: String, characters: [String; 2] },
    Continue,
    FirstLine,
    StopReading,
    StartOver,
    Custom(String),
}

impl Directive {
    pub fn opening(script_title: &str, characters: &[String; 2]) -> Self {
        Directive::Opening {
            script_title: script_title.to_string(),
            characters: characters.clone(),
        }
    }

    pub fn text(&self) -> String {
        match self {
            Directive::Opening { script_title, characters } => format!(
                "We will be reading the {} script shown on screen. The script has two characters: {} and {}. Who would you like to read as?",
                script_title, characters[0], characters[1]
            ),
            Directive::Continue => CONTINUE_TEXT.to_string(),
            Directive::FirstLine => FIRST_LINE_TEXT.to_string(),
            Directive::StopReading => STOP_READING_TEXT.to_string(),
            Directive::StartOver => START_OVER_TEXT.to_string(),
            Directive::Custom(text) => text.clone(),
        }
    }

    pub fn to_client_event(&self) -> ClientEvent {
        let message = MessageItem::builder().with_input_text(&self.text()).build();
        ClientEvent::ConversationItemCreate(ConversationItemCreateEvent::new(Item::Message(message)))
    }
}
