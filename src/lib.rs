mod callbacks;
mod classifier;
mod client;
mod controller;
mod directive;
mod error;
mod microphone;

pub mod credential;
pub mod host;
pub mod instructions;
pub mod transport;
#[cfg(feature = "utils")]
pub mod media;

pub use script_rehearsal_types as types;
pub use callbacks::{NoopCallbacks, SessionCallbacks};
pub use classifier::{EventClassifier, PhraseClassifier, Signal, Speaker};
pub use client::config::{Config, ConfigBuilder};
pub use client::consts;
pub use client::{connect, connect_with_config, connect_with_provider, Session, Status};
pub use controller::{Action, HostEvent, TurnController, TurnState};
pub use directive::Directive;
pub use error::{ConfigError, TransportError};
pub use microphone::MicrophoneGate;

#[cfg(feature = "utils")]
pub use script_rehearsal_utils as utils;
