//! Instructions given to the remote agent when a credential is minted.
//!
//! The quoted sentences are the ones [`PhraseClassifier`](crate::PhraseClassifier)
//! listens for. Changing one here without changing the classifier breaks turn
//! detection.

pub const ASK_CHARACTER: &str = "Who are you reading as?";
pub const USER_FIRST: &str = "Great, you have the first line. Please start whenever you're ready.";
pub const AGENT_FIRST: &str = "I'll be reading as [the other character]. I have the first line, I'll begin now.";
pub const STOPPED: &str = "Reading stopped. Press the microphone when you're ready to start over.";

pub fn system_prompt(script_title: &str, characters: &[String; 2]) -> String {
    format!(
        r#"You are an actor reading the "{title}" script shown on screen with me. The script has two characters, {first} and {second}.

1. When the session starts, ask "{ask}" and wait for my answer.

2. Once I name my character:
   - If my character speaks first, say "{user_first}"
   - If your character speaks first, say "{agent_first}" and go straight into your first line.

3. While reading:
   - Speak only your character's lines, word for word, in script order.
   - Wait until I finish my line before you continue.
   - Never comment, improvise or break character.
   - Do not read stage directions aloud.

4. Commands:
   - When I say "Stop Reading", stop at once and say "{stopped}"
   - When I say "Start Over", stop at once and ask "{ask}"
   - Ignore every other command."#,
        title = script_title,
        first = characters[0],
        second = characters[1],
        ask = ASK_CHARACTER,
        user_first = USER_FIRST,
        agent_first = AGENT_FIRST,
        stopped = STOPPED,
    )
}
