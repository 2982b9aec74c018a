//! Slash command parsing for the chat application.
//!
//! Input starting with `/` controls the session or browses the rest of the
//! app (contacts, guides, the chat log) instead of being sent to the
//! provider.

use crate::chat::config::parse_temperature;
use crate::navigation::Page;
use crate::prompt::QUICK_PROMPTS;

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Clear the conversation history.
    Clear,

    /// Change the model.
    Model(String),

    /// Set the sampling temperature.
    Temperature(f32),

    /// Leave the temperature to the provider.
    ClearTemperature,

    /// Set the maximum output tokens.
    MaxTokens(u32),

    /// Attach an image file to the next message.
    Image(String),

    /// Drop the pending image attachment.
    ClearImage,

    /// List quick prompts, or send the numbered one (1-based).
    QuickPrompt(Option<usize>),

    /// List the emergency contacts.
    Contacts,

    /// Show the dial link for a contact id.
    Call(String),

    /// Search the guide library.
    Guides { query: String, saved_only: bool },

    /// Show one guide.
    Guide(String),

    /// Save or unsave a guide for offline reading.
    Bookmark(String),

    /// Record the conversation in the chat log, with an optional title.
    Download(Option<String>),

    /// List the chat log, or show one logged conversation.
    Log(Option<String>),

    /// Show a page.
    Open(Page),

    /// Save the transcript to a specific file immediately.
    SaveTranscript(String),

    /// Load conversation history from a file.
    LoadTranscript(String),

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Display session statistics.
    Stats,

    /// Show the current configuration.
    ShowConfig,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent as a message.
///
/// # Examples
///
/// ```
/// # use aidsnap::chat::{parse_command, ChatCommand};
/// assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
/// assert!(parse_command("/guide Burns").is_some());
/// assert!(parse_command("How do I treat a burn?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" => ChatCommand::Clear,
        "model" => match argument {
            Some(model) => ChatCommand::Model(model.to_string()),
            None => ChatCommand::Invalid("/model requires a model name".to_string()),
        },
        "temperature" => match argument {
            Some(arg) if arg.eq_ignore_ascii_case("clear") => ChatCommand::ClearTemperature,
            Some(arg) => match parse_temperature(arg) {
                Ok(value) => ChatCommand::Temperature(value),
                Err(_) => {
                    ChatCommand::Invalid("/temperature expects a value between 0 and 2".to_string())
                }
            },
            None => ChatCommand::Invalid("/temperature requires a value".to_string()),
        },
        "max_tokens" => match argument.map(str::parse::<u32>) {
            Some(Ok(value)) if value > 0 => ChatCommand::MaxTokens(value),
            Some(_) => ChatCommand::Invalid("/max_tokens expects a positive integer".to_string()),
            None => ChatCommand::Invalid("/max_tokens requires a value".to_string()),
        },
        "image" | "attach" => match argument {
            Some(arg) if arg.eq_ignore_ascii_case("clear") => ChatCommand::ClearImage,
            Some(path) => ChatCommand::Image(path.to_string()),
            None => ChatCommand::Invalid("/image requires a file path".to_string()),
        },
        "prompt" | "prompts" => match argument {
            None => ChatCommand::QuickPrompt(None),
            Some(arg) => match arg.parse::<usize>() {
                Ok(n) if (1..=QUICK_PROMPTS.len()).contains(&n) => ChatCommand::QuickPrompt(Some(n)),
                _ => ChatCommand::Invalid(format!(
                    "/prompt expects a number from 1 to {}",
                    QUICK_PROMPTS.len()
                )),
            },
        },
        "contacts" => ChatCommand::Contacts,
        "call" => match argument {
            Some(id) => ChatCommand::Call(id.to_string()),
            None => ChatCommand::Invalid("/call requires a contact id (see /contacts)".to_string()),
        },
        "guides" => ChatCommand::Guides {
            query: argument.unwrap_or_default().to_string(),
            saved_only: false,
        },
        "saved" => ChatCommand::Guides {
            query: argument.unwrap_or_default().to_string(),
            saved_only: true,
        },
        "guide" => match argument {
            Some(title) => ChatCommand::Guide(title.to_string()),
            None => ChatCommand::Invalid("/guide requires a guide title".to_string()),
        },
        "bookmark" => match argument {
            Some(title) => ChatCommand::Bookmark(title.to_string()),
            None => ChatCommand::Invalid("/bookmark requires a guide title".to_string()),
        },
        "download" => ChatCommand::Download(argument.map(|s| s.to_string())),
        "log" => ChatCommand::Log(argument.map(|s| s.to_string())),
        "open" | "go" => match argument {
            Some(page) => match page.parse::<Page>() {
                Ok(page) => ChatCommand::Open(page),
                Err(err) => ChatCommand::Invalid(err.to_string()),
            },
            None => ChatCommand::Invalid("/open requires a page name".to_string()),
        },
        "save" => match argument {
            Some(arg) => ChatCommand::SaveTranscript(arg.to_string()),
            None => ChatCommand::Invalid("/save requires a file path".to_string()),
        },
        "load" => match argument {
            Some(arg) => ChatCommand::LoadTranscript(arg.to_string()),
            None => ChatCommand::Invalid("/load requires a file path".to_string()),
        },
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "stats" | "status" => ChatCommand::Stats,
        "config" => ChatCommand::ShowConfig,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /image <file>          Attach an image to your next message (or 'clear')
  /prompt [n]            List quick prompts, or send prompt n
  /contacts              List emergency contacts
  /call <id>             Show the dial link for a contact
  /guides [query]        Search first-aid guides
  /saved [query]         Search guides saved for offline use
  /guide <title>         Show a guide
  /bookmark <title>      Save or unsave a guide for offline use
  /download [title]      Add this conversation to the chat log
  /log [id]              List downloaded chats, or show one
  /open <page>           Show a page (home, call_list, guide, ...)
  /clear                 Clear conversation history
  /model <name>          Change the model (e.g., /model gemini-2.5-pro)
  /temperature <v>       Set temperature 0.0-2.0 (use 'clear' to reset)
  /max_tokens <n>        Set maximum output tokens
  /save <file>           Save the current transcript
  /load <file>           Load a transcript from disk
  /stats                 Show session statistics
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_clear() {
        assert_eq!(parse_command("/clear"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/CLEAR"), Some(ChatCommand::Clear));
    }

    #[test]
    fn parse_model() {
        assert_eq!(
            parse_command("/model   gemini-2.5-pro  "),
            Some(ChatCommand::Model("gemini-2.5-pro".to_string()))
        );
        assert_eq!(
            parse_command("/model"),
            Some(ChatCommand::Invalid("/model requires a model name".to_string()))
        );
    }

    #[test]
    fn parse_generation_settings() {
        assert_eq!(
            parse_command("/temperature 0.5"),
            Some(ChatCommand::Temperature(0.5))
        );
        assert_eq!(
            parse_command("/temperature clear"),
            Some(ChatCommand::ClearTemperature)
        );
        assert!(matches!(
            parse_command("/temperature 9"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("between")
        ));
        assert_eq!(
            parse_command("/max_tokens 2048"),
            Some(ChatCommand::MaxTokens(2048))
        );
        assert!(matches!(
            parse_command("/max_tokens 0"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn parse_image() {
        assert_eq!(
            parse_command("/image photos/cut on arm.jpg"),
            Some(ChatCommand::Image("photos/cut on arm.jpg".to_string()))
        );
        assert_eq!(parse_command("/image clear"), Some(ChatCommand::ClearImage));
        assert!(matches!(
            parse_command("/image"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn parse_quick_prompts() {
        assert_eq!(parse_command("/prompt"), Some(ChatCommand::QuickPrompt(None)));
        assert_eq!(
            parse_command("/prompt 2"),
            Some(ChatCommand::QuickPrompt(Some(2)))
        );
        assert!(matches!(
            parse_command("/prompt 5"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn parse_contacts_and_guides() {
        assert_eq!(parse_command("/contacts"), Some(ChatCommand::Contacts));
        assert_eq!(
            parse_command("/call 911"),
            Some(ChatCommand::Call("911".to_string()))
        );
        assert_eq!(
            parse_command("/guides cold water"),
            Some(ChatCommand::Guides {
                query: "cold water".to_string(),
                saved_only: false,
            })
        );
        assert_eq!(
            parse_command("/saved"),
            Some(ChatCommand::Guides {
                query: String::new(),
                saved_only: true,
            })
        );
        assert_eq!(
            parse_command("/guide Insect Bites & Stings"),
            Some(ChatCommand::Guide("Insect Bites & Stings".to_string()))
        );
        assert_eq!(
            parse_command("/bookmark Burns"),
            Some(ChatCommand::Bookmark("Burns".to_string()))
        );
    }

    #[test]
    fn parse_chat_log() {
        assert_eq!(parse_command("/download"), Some(ChatCommand::Download(None)));
        assert_eq!(
            parse_command("/download Sprained ankle"),
            Some(ChatCommand::Download(Some("Sprained ankle".to_string())))
        );
        assert_eq!(parse_command("/log"), Some(ChatCommand::Log(None)));
        assert_eq!(
            parse_command("/log 3"),
            Some(ChatCommand::Log(Some("3".to_string())))
        );
    }

    #[test]
    fn parse_open() {
        assert_eq!(
            parse_command("/open call_list"),
            Some(ChatCommand::Open(Page::CallList))
        );
        assert_eq!(
            parse_command("/go /settings"),
            Some(ChatCommand::Open(Page::Settings))
        );
        assert!(matches!(
            parse_command("/open profile"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("unknown page")
        ));
    }

    #[test]
    fn parse_transcript_commands() {
        assert_eq!(
            parse_command("/save session.json"),
            Some(ChatCommand::SaveTranscript("session.json".to_string()))
        );
        assert_eq!(
            parse_command("/load session.json"),
            Some(ChatCommand::LoadTranscript("session.json".to_string()))
        );
    }

    #[test]
    fn parse_stats_and_config() {
        assert_eq!(parse_command("/stats"), Some(ChatCommand::Stats));
        assert_eq!(parse_command("/config"), Some(ChatCommand::ShowConfig));
        assert_eq!(
            parse_command("/frobnicate"),
            Some(ChatCommand::Invalid("Unknown command: /frobnicate".to_string()))
        );
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Help, my friend is choking!"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
    }

    #[test]
    fn help_text_lists_commands() {
        let help = help_text();
        for command in ["/quit", "/clear", "/image", "/contacts", "/guides", "/download", "/open"] {
            assert!(help.contains(command), "missing {command}");
        }
    }
}
