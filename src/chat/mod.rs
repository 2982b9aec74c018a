//! Chat application module for first-aid conversations.
//!
//! This module provides the conversation controller and the pieces of the
//! interactive REPL built on top of it:
//!
//! - Single-flight sends with an optional image attachment
//! - Slash commands for contacts, guides, the chat log and navigation
//! - Configurable model and generation parameters
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing, YAML configuration and defaults
//! - [`session`]: Conversation state and provider interaction
//! - [`commands`]: Slash command parsing

mod commands;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, DEFAULT_STORE_PATH, parse_temperature};
pub use session::{ChatSession, ERROR_REPLY, RejectReason, SendOutcome, SessionStats};
