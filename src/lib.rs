pub mod client;
pub mod config;
pub mod console;
pub mod editor;
pub mod format;
pub mod logging;
pub mod message;
pub mod session;

// Re-export main types for convenience
pub use client::{Backend, ClientError, RunReport, RunStatus, TutorClient, TutorReply};
pub use config::Config;
pub use console::{Console, ConsoleEntry, LineKind};
pub use editor::Editor;
pub use format::{escape_html, format_message};
pub use message::{Message, Sender};
pub use session::Session;
