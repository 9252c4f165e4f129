pub mod command;
pub mod events;
pub mod owner;

pub use command::{Completed, SessionCommand};
pub use events::{SessionEvent, SessionSnapshot};
pub use owner::Session;
