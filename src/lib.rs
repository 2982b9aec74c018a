// Public modules
pub mod chat;
pub mod chat_log;
pub mod client;
pub mod contacts;
pub mod error;
pub mod format;
pub mod guides;
pub mod navigation;
pub mod observability;
pub mod prompt;
pub mod render;
pub mod storage;
pub mod types;
pub mod utils;

// Re-exports
pub use chat_log::{ChatLog, ChatLogEntry};
pub use client::{Gemini, Provider};
pub use contacts::{ContactRepository, EmergencyContact, normalize_phone, tel_uri};
pub use error::{Error, Result};
pub use format::format_response;
pub use guides::{Guide, SavedGuide, SavedGuides};
pub use navigation::Page;
pub use observability::register_biometrics;
pub use prompt::compose;
pub use render::{Block, PlainTextRenderer, Renderer, parse_markdown};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
pub use types::*;
