pub mod session;
pub mod tools;
pub mod audio;
pub mod events;
mod content;

pub use audio::Blob;
pub use content::parts::{Content, Part};
pub use events::{ClientMessage, ServerMessage};
pub use session::Setup;
