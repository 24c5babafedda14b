use std::sync::Arc;

use crate::error::TransportError;

/// The host application's view of the rehearsal.
///
/// Every method has an empty default so hosts implement only what they render.
pub trait SessionCallbacks: Send + Sync {
    fn on_character_assigned(&self, _name: &str) {}
    fn on_line_complete(&self) {}
    fn on_error(&self, _error: &TransportError) {}
    fn on_turn_start(&self) {}
    fn on_turn_end(&self) {}
    fn on_waiting_for_user(&self) {}
}

/// Callbacks that ignore everything.
pub struct NoopCallbacks;

impl SessionCallbacks for NoopCallbacks {}

impl<T: SessionCallbacks + ?Sized> SessionCallbacks for Arc<T> {
    fn on_character_assigned(&self, name: &str) {
        (**self).on_character_assigned(name)
    }

    fn on_line_complete(&self) {
        (**self).on_line_complete()
    }

    fn on_error(&self, error: &TransportError) {
        (**self).on_error(error)
    }

    fn on_turn_start(&self) {
        (**self).on_turn_start()
    }

    fn on_turn_end(&self) {
        (**self).on_turn_end()
    }

    fn on_waiting_for_user(&self) {
        (**self).on_waiting_for_user()
    }
}
