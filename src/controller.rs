//! Turn-taking state machine.
//!
//! [`TurnController`] never performs side effects. Each input returns the
//! [`Action`]s the session must carry out: host notifications, deferred
//! directives and cancellation of pending directives.
//!
//! Audio-turn events and text deltas describing the same agent turn may arrive
//! in either order. A waiting cue is stamped with the number of agent turns
//! completed so far; an agent turn that starts while that stamp is current
//! belongs to the same logical turn and inherits the hand-off instead of
//! announcing a new turn.

use std::time::Duration;

use crate::classifier::{Signal, Speaker};
use crate::directive::Directive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// No turn in progress; the agent is expected to speak next.
    Idle,
    AwaitingUser,
    /// `hand_off`: the user speaks once this turn ends.
    /// `opening`: the turn announces that the agent reads the first line.
    AgentSpeaking { hand_off: bool, opening: bool },
    UserSpeaking { hand_off: bool },
    /// Reading was stopped; no line advances until the agent starts over.
    Stopped,
    Closed,
}

impl TurnState {
    fn is_speaking(&self) -> bool {
        matches!(self, TurnState::AgentSpeaking { .. } | TurnState::UserSpeaking { .. })
    }
}

/// Notification delivered to the host application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    CharacterAssigned(String),
    LineComplete,
    TurnStart,
    TurnEnd,
    WaitingForUser,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Notify(HostEvent),
    Schedule { directive: Directive, delay: Duration },
    CancelPending,
}

#[derive(Debug)]
pub struct TurnController {
    state: TurnState,
    character: Option<String>,
    turn: u64,
    cue_turn: Option<u64>,
    continue_delay: Duration,
}

impl TurnController {
    pub fn new(continue_delay: Duration) -> Self {
        Self {
            state: TurnState::Idle,
            character: None,
            turn: 0,
            cue_turn: None,
            continue_delay,
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn character(&self) -> Option<&str> {
        self.character.as_deref()
    }

    /// Number of completed agent turns.
    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn is_closed(&self) -> bool {
        self.state == TurnState::Closed
    }

    pub fn handle(&mut self, signal: Signal) -> Vec<Action> {
        if self.is_closed() {
            tracing::debug!("ignoring {:?} after close", signal);
            return Vec::new();
        }
        let actions = match signal {
            Signal::WaitingForUser => self.waiting_cue(true),
            Signal::TurnStarted { by: Speaker::Agent, opening } => self.agent_started(opening),
            Signal::TurnStarted { by: Speaker::User, .. } => self.user_started(),
            Signal::TurnEnded { by: Speaker::Agent } => self.agent_ended(),
            Signal::TurnEnded { by: Speaker::User } => self.user_ended(),
            Signal::CharacterAssigned { name } => self.assign(name),
            Signal::ReadingStopped => self.stop(),
        };
        tracing::debug!("turn state: {:?}", self.state);
        actions
    }

    /// The opening directive went out; the user is asked to pick a character.
    pub fn opening_sent(&mut self) -> Vec<Action> {
        if self.is_closed() {
            return Vec::new();
        }
        self.waiting_cue(false)
    }

    /// The host sent "Stop Reading".
    pub fn stop_reading(&mut self) -> Vec<Action> {
        if self.is_closed() {
            return Vec::new();
        }
        self.stop()
    }

    /// The host sent "Start Over": a new character may be assigned.
    pub fn start_over(&mut self) -> Vec<Action> {
        if self.is_closed() {
            return Vec::new();
        }
        let mut actions = vec![Action::CancelPending];
        if self.state.is_speaking() {
            actions.push(Action::Notify(HostEvent::TurnEnd));
        }
        self.character = None;
        self.cue_turn = None;
        if self.state != TurnState::AwaitingUser {
            actions.push(Action::Notify(HostEvent::WaitingForUser));
        }
        self.state = TurnState::AwaitingUser;
        actions
    }

    pub fn close(&mut self) -> Vec<Action> {
        if self.is_closed() {
            return Vec::new();
        }
        self.state = TurnState::Closed;
        vec![Action::CancelPending]
    }

    fn waiting_cue(&mut self, from_text: bool) -> Vec<Action> {
        if from_text {
            self.cue_turn = Some(self.turn);
        }
        match self.state {
            TurnState::AgentSpeaking { opening, .. } => {
                self.state = TurnState::AgentSpeaking { hand_off: true, opening };
                Vec::new()
            }
            TurnState::UserSpeaking { .. } => {
                self.state = TurnState::UserSpeaking { hand_off: true };
                Vec::new()
            }
            TurnState::AwaitingUser | TurnState::Closed => Vec::new(),
            TurnState::Idle | TurnState::Stopped => {
                self.state = TurnState::AwaitingUser;
                vec![Action::Notify(HostEvent::WaitingForUser)]
            }
        }
    }

    fn agent_started(&mut self, opening: bool) -> Vec<Action> {
        let mut actions = Vec::new();
        match self.state {
            TurnState::AgentSpeaking { hand_off, opening: announced } => {
                if opening && !announced {
                    actions.push(self.schedule(Directive::FirstLine));
                }
                self.state = TurnState::AgentSpeaking { hand_off, opening: announced || opening };
            }
            _ => {
                let same_turn_cue = self.state == TurnState::AwaitingUser && self.cue_turn == Some(self.turn);
                if opening {
                    actions.push(self.schedule(Directive::FirstLine));
                }
                if same_turn_cue {
                    tracing::debug!("agent turn {} started after its waiting cue", self.turn);
                } else {
                    actions.push(Action::Notify(HostEvent::TurnStart));
                }
                self.state = TurnState::AgentSpeaking { hand_off: same_turn_cue, opening };
            }
        }
        actions
    }

    fn user_started(&mut self) -> Vec<Action> {
        match self.state {
            TurnState::AgentSpeaking { .. } => {
                tracing::debug!("ignoring user speech while the agent speaks");
                Vec::new()
            }
            TurnState::UserSpeaking { .. } => Vec::new(),
            _ => {
                self.state = TurnState::UserSpeaking { hand_off: false };
                vec![Action::Notify(HostEvent::TurnStart)]
            }
        }
    }

    fn agent_ended(&mut self) -> Vec<Action> {
        let cue_this_turn = self.cue_turn == Some(self.turn);
        self.turn += 1;
        let mut actions = vec![Action::Notify(HostEvent::TurnEnd)];
        match self.state {
            TurnState::AgentSpeaking { hand_off: true, .. }
            | TurnState::UserSpeaking { hand_off: true }
            | TurnState::AwaitingUser => {
                self.state = TurnState::AwaitingUser;
                actions.push(Action::Notify(HostEvent::WaitingForUser));
            }
            TurnState::Stopped | TurnState::Closed => {}
            TurnState::Idle if cue_this_turn => {
                self.state = TurnState::AwaitingUser;
                actions.push(Action::Notify(HostEvent::WaitingForUser));
            }
            TurnState::Idle | TurnState::AgentSpeaking { .. } | TurnState::UserSpeaking { .. } => {
                self.state = TurnState::Idle;
                actions.push(Action::Notify(HostEvent::LineComplete));
                actions.push(self.schedule(Directive::Continue));
            }
        }
        actions
    }

    fn user_ended(&mut self) -> Vec<Action> {
        match self.state {
            TurnState::UserSpeaking { hand_off: true } => {
                self.state = TurnState::AwaitingUser;
                vec![
                    Action::Notify(HostEvent::TurnEnd),
                    Action::Notify(HostEvent::WaitingForUser),
                ]
            }
            TurnState::UserSpeaking { hand_off: false } => {
                self.state = TurnState::Idle;
                vec![Action::Notify(HostEvent::TurnEnd)]
            }
            // The agent's own voice picked up by the microphone. Its turn is still open.
            TurnState::AgentSpeaking { .. } => Vec::new(),
            _ => vec![Action::Notify(HostEvent::TurnEnd)],
        }
    }

    fn assign(&mut self, name: String) -> Vec<Action> {
        if let Some(current) = &self.character {
            tracing::debug!("ignoring assignment of {} while reading as {}", name, current);
            return Vec::new();
        }
        self.character = Some(name.clone());
        vec![Action::Notify(HostEvent::CharacterAssigned(name))]
    }

    fn stop(&mut self) -> Vec<Action> {
        let mut actions = vec![Action::CancelPending];
        if self.state.is_speaking() {
            actions.push(Action::Notify(HostEvent::TurnEnd));
        }
        self.state = TurnState::Stopped;
        self.character = None;
        self.cue_turn = None;
        actions
    }

    fn schedule(&self, directive: Directive) -> Action {
        Action::Schedule {
            directive,
            delay: self.continue_delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(500);

    fn agent_started() -> Signal {
        Signal::TurnStarted { by: Speaker::Agent, opening: false }
    }

    fn agent_ended() -> Signal {
        Signal::TurnEnded { by: Speaker::Agent }
    }

    fn user_started() -> Signal {
        Signal::TurnStarted { by: Speaker::User, opening: false }
    }

    fn user_ended() -> Signal {
        Signal::TurnEnded { by: Speaker::User }
    }

    fn notify(event: HostEvent) -> Action {
        Action::Notify(event)
    }

    fn scheduled(actions: &[Action]) -> Vec<Directive> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Schedule { directive, .. } => Some(directive.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_opening_then_character_prompt() {
        let mut controller = TurnController::new(DELAY);
        assert_eq!(controller.opening_sent(), vec![notify(HostEvent::WaitingForUser)]);
        assert_eq!(controller.state(), TurnState::AwaitingUser);

        // "Who are you reading as?" spoken by the agent.
        assert_eq!(controller.handle(agent_started()), vec![notify(HostEvent::TurnStart)]);
        assert!(controller.handle(Signal::WaitingForUser).is_empty());
        assert_eq!(
            controller.handle(agent_ended()),
            vec![notify(HostEvent::TurnEnd), notify(HostEvent::WaitingForUser)]
        );
        assert_eq!(controller.state(), TurnState::AwaitingUser);
    }

    #[test]
    fn test_agent_line_schedules_one_continuation() {
        let mut controller = TurnController::new(DELAY);
        controller.handle(agent_started());
        let actions = controller.handle(agent_ended());
        assert_eq!(
            actions,
            vec![
                notify(HostEvent::TurnEnd),
                notify(HostEvent::LineComplete),
                Action::Schedule { directive: Directive::Continue, delay: DELAY },
            ]
        );
        assert_eq!(controller.state(), TurnState::Idle);
        assert_eq!(controller.turn(), 1);
    }

    #[test]
    fn test_agent_takes_first_line() {
        let mut controller = TurnController::new(DELAY);
        controller.opening_sent();
        controller.handle(agent_started());

        let mut actions = controller.handle(Signal::CharacterAssigned { name: "JOHN".to_string() });
        actions.extend(controller.handle(Signal::TurnStarted { by: Speaker::Agent, opening: true }));
        assert_eq!(actions[0], notify(HostEvent::CharacterAssigned("JOHN".to_string())));
        assert_eq!(scheduled(&actions), vec![Directive::FirstLine]);

        // A repeated announcement in the same turn does not schedule again.
        let repeated = controller.handle(Signal::TurnStarted { by: Speaker::Agent, opening: true });
        assert!(scheduled(&repeated).is_empty());

        // The agent reads its first line inside the acknowledgement turn.
        let ended = controller.handle(agent_ended());
        assert_eq!(
            ended,
            vec![
                notify(HostEvent::TurnEnd),
                notify(HostEvent::LineComplete),
                Action::Schedule { directive: Directive::Continue, delay: DELAY },
            ]
        );
        assert_eq!(controller.state(), TurnState::Idle);
        assert_eq!(controller.character(), Some("JOHN"));
    }

    #[test]
    fn test_opening_from_text_before_audio() {
        let mut controller = TurnController::new(DELAY);
        let actions = controller.handle(Signal::TurnStarted { by: Speaker::Agent, opening: true });
        assert_eq!(
            actions,
            vec![
                Action::Schedule { directive: Directive::FirstLine, delay: DELAY },
                notify(HostEvent::TurnStart),
            ]
        );
        // The audio turn of the same utterance starts afterwards.
        assert!(controller.handle(agent_started()).is_empty());
        assert_eq!(controller.state(), TurnState::AgentSpeaking { hand_off: false, opening: true });
    }

    #[test]
    fn test_character_assigned_once_until_start_over() {
        let mut controller = TurnController::new(DELAY);
        assert_eq!(
            controller.handle(Signal::CharacterAssigned { name: "JOHN".to_string() }),
            vec![notify(HostEvent::CharacterAssigned("JOHN".to_string()))]
        );
        assert!(controller.handle(Signal::CharacterAssigned { name: "HUDSON".to_string() }).is_empty());

        let actions = controller.start_over();
        assert_eq!(actions, vec![Action::CancelPending, notify(HostEvent::WaitingForUser)]);
        assert_eq!(controller.character(), None);
        assert_eq!(
            controller.handle(Signal::CharacterAssigned { name: "HUDSON".to_string() }),
            vec![notify(HostEvent::CharacterAssigned("HUDSON".to_string()))]
        );
    }

    #[test]
    fn test_user_turn_and_echo() {
        let mut controller = TurnController::new(DELAY);
        controller.opening_sent();
        assert_eq!(controller.handle(user_started()), vec![notify(HostEvent::TurnStart)]);
        assert_eq!(controller.state(), TurnState::UserSpeaking { hand_off: false });
        assert_eq!(controller.handle(user_ended()), vec![notify(HostEvent::TurnEnd)]);
        assert_eq!(controller.state(), TurnState::Idle);

        controller.handle(agent_started());
        assert!(controller.handle(user_started()).is_empty());
        assert!(controller.handle(user_ended()).is_empty());
        assert_eq!(controller.state(), TurnState::AgentSpeaking { hand_off: false, opening: false });
    }

    #[test]
    fn test_user_speech_stop_during_agent_turn_is_ignored() {
        let mut controller = TurnController::new(DELAY);
        controller.handle(agent_started());
        controller.handle(Signal::WaitingForUser);
        let state = controller.state();

        // No turn end reaches the host and the pending hand-off survives.
        assert!(controller.handle(user_ended()).is_empty());
        assert_eq!(controller.state(), state);
        assert_eq!(controller.turn(), 0);
        assert_eq!(
            controller.handle(agent_ended()),
            vec![notify(HostEvent::TurnEnd), notify(HostEvent::WaitingForUser)]
        );
    }

    #[test]
    fn test_cue_during_user_turn_is_deferred() {
        let mut controller = TurnController::new(DELAY);
        controller.handle(user_started());
        assert!(controller.handle(Signal::WaitingForUser).is_empty());
        assert_eq!(
            controller.handle(user_ended()),
            vec![notify(HostEvent::TurnEnd), notify(HostEvent::WaitingForUser)]
        );
    }

    #[test]
    fn test_waiting_cue_before_audio_start_is_same_turn() {
        let mut controller = TurnController::new(DELAY);
        // Text "you have the first line" arrives before the audio turn starts.
        assert_eq!(controller.handle(Signal::WaitingForUser), vec![notify(HostEvent::WaitingForUser)]);
        assert!(controller.handle(agent_started()).is_empty());
        assert_eq!(controller.state(), TurnState::AgentSpeaking { hand_off: true, opening: false });
        let actions = controller.handle(agent_ended());
        assert_eq!(actions, vec![notify(HostEvent::TurnEnd), notify(HostEvent::WaitingForUser)]);
        assert!(scheduled(&actions).is_empty());

        // The next agent turn is a new turn again.
        controller.handle(user_started());
        controller.handle(user_ended());
        assert_eq!(controller.handle(agent_started()), vec![notify(HostEvent::TurnStart)]);
    }

    #[test]
    fn test_reading_stopped_suppresses_continuation() {
        let mut controller = TurnController::new(DELAY);
        controller.handle(agent_started());
        let actions = controller.handle(Signal::ReadingStopped);
        assert_eq!(actions, vec![Action::CancelPending, notify(HostEvent::TurnEnd)]);
        assert_eq!(controller.state(), TurnState::Stopped);

        let actions = controller.handle(agent_ended());
        assert_eq!(actions, vec![notify(HostEvent::TurnEnd)]);
        assert_eq!(controller.state(), TurnState::Stopped);

        // The agent asking again resumes the rehearsal.
        assert_eq!(controller.handle(Signal::WaitingForUser), vec![notify(HostEvent::WaitingForUser)]);
    }

    #[test]
    fn test_stop_reading_from_host() {
        let mut controller = TurnController::new(DELAY);
        controller.handle(Signal::CharacterAssigned { name: "JOHN".to_string() });
        assert_eq!(controller.stop_reading(), vec![Action::CancelPending]);
        assert_eq!(controller.state(), TurnState::Stopped);
        assert_eq!(controller.character(), None);
    }

    #[test]
    fn test_closed_ignores_everything() {
        let mut controller = TurnController::new(DELAY);
        assert_eq!(controller.close(), vec![Action::CancelPending]);
        assert!(controller.close().is_empty());
        assert!(controller.handle(agent_started()).is_empty());
        assert!(controller.handle(agent_ended()).is_empty());
        assert!(controller.opening_sent().is_empty());
        assert!(controller.start_over().is_empty());
        assert_eq!(controller.state(), TurnState::Closed);
    }

    #[test]
    fn test_no_waiting_notice_inside_a_turn() {
        let signals = [
            Signal::WaitingForUser,
            agent_started(),
            agent_ended(),
            user_started(),
            user_ended(),
            Signal::ReadingStopped,
            Signal::TurnStarted { by: Speaker::Agent, opening: true },
        ];
        // Every sequence of length 5 over the alphabet, with and without the opening prompt.
        let len = signals.len();
        for with_opening in [false, true] {
            for n in 0..len.pow(5) {
                let mut controller = TurnController::new(DELAY);
                let mut in_turn = false;
                let mut sequence = Vec::new();
                let mut actions = if with_opening { controller.opening_sent() } else { Vec::new() };
                let mut code = n;
                for _ in 0..5 {
                    let signal = signals[code % len].clone();
                    code /= len;
                    sequence.push(signal.clone());
                    actions.extend(controller.handle(signal));
                }
                for action in actions {
                    match action {
                        Action::Notify(HostEvent::TurnStart) => in_turn = true,
                        Action::Notify(HostEvent::TurnEnd) => in_turn = false,
                        Action::Notify(HostEvent::WaitingForUser) => {
                            assert!(!in_turn, "waiting notice inside a turn for {:?}", sequence)
                        }
                        _ => {}
                    }
                }
            }
        }
    }
}
