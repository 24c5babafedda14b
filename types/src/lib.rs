pub mod session;
pub mod audio;
pub mod events;
mod content;

pub use content::items::Item;
pub use content::message::*;
pub use events::{ClientEvent, ServerEvent};
