//! Interactive first-aid chat.
//!
//! A REPL over the AidSnap chat session. Plain lines go to the model;
//! slash commands browse the rest of the app.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage, reading the key from AIDSNAP_API_KEY
//! aidsnap-chat
//!
//! # Specify a model and a store file
//! aidsnap-chat --model gemini-2.5-pro --store ~/.aidsnap.json
//!
//! # Disable colors (useful for piping output)
//! aidsnap-chat --no-color
//! ```
//!
//! Set `AIDSNAP_LOG=debug` to see request logs on stderr.

use std::path::PathBuf;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use aidsnap::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, SendOutcome,
    help_text, parse_command,
};
use aidsnap::contacts::ContactRepository;
use aidsnap::guides::{self, SavedGuides};
use aidsnap::prompt::QUICK_PROMPTS;
use aidsnap::types::GenerationConfig;
use aidsnap::{ChatLog, Gemini, ImageAttachment, JsonFileStore, Model, Page, utils};

type Session = ChatSession<Gemini>;

fn setup_logging() {
    let filter = EnvFilter::try_from_env("AIDSNAP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Everything the REPL browses besides the conversation.
struct App {
    contacts: ContactRepository,
    saved: SavedGuides<JsonFileStore>,
    log: ChatLog<JsonFileStore>,
    pending_image: Option<ImageAttachment>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_logging();

    let (args, _) = ChatArgs::from_command_line_relaxed("aidsnap-chat [OPTIONS]");
    let config = ChatConfig::try_from(args)?;
    let use_color = config.use_color;

    let client = Gemini::with_options(
        config.api_key.clone(),
        config.model.clone(),
        config.base_url.clone(),
        config.timeout(),
    )?;
    let mut session = ChatSession::with_generation(client, config.generation);
    session.set_transcript_path(config.transcript_path.clone());

    let store = JsonFileStore::new(&config.store_path);
    let mut app = App {
        contacts: ContactRepository::new(),
        saved: SavedGuides::load(store.clone())?,
        log: ChatLog::load(store)?,
        pending_image: None,
    };

    let mut renderer = PlainTextRenderer::with_color(use_color);
    let mut rl = DefaultEditor::new()?;

    println!("AidSnap (model: {})", session.provider().model());
    println!("Describe the injury, or type /help for commands, /quit to exit\n");

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() && app.pending_image.is_none() {
                    continue;
                }
                if !line.is_empty() {
                    let _ = rl.add_history_entry(line);
                }

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::QuickPrompt(Some(n)) => {
                            let prompt = QUICK_PROMPTS[n - 1];
                            renderer.print_info(&format!("Asking: {prompt}"));
                            send(&session, &mut app, &mut renderer, prompt).await;
                        }
                        cmd => run_command(cmd, &mut session, &config, &mut app, &mut renderer),
                    }
                    continue;
                }

                send(&session, &mut app, &mut renderer, line).await;
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at the prompt drops the pending image, if any.
                if app.pending_image.take().is_some() {
                    renderer.print_info("Image attachment dropped.");
                }
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

async fn send(session: &Session, app: &mut App, renderer: &mut PlainTextRenderer, text: &str) {
    let image = app.pending_image.take();
    renderer.print_pending();
    match session.send(text, image).await {
        SendOutcome::Answered => {
            if let Some(reply) = session.messages().last() {
                renderer.print_assistant(&reply.text);
            }
        }
        SendOutcome::Failed(err) => {
            renderer.print_error(&err.to_string());
            renderer.print_assistant(aidsnap::chat::ERROR_REPLY);
        }
        SendOutcome::Rejected(reason) => {
            renderer.print_error(&format!("Message not sent: {reason}"));
        }
    }
}

fn run_command(
    cmd: ChatCommand,
    session: &mut Session,
    config: &ChatConfig,
    app: &mut App,
    renderer: &mut PlainTextRenderer,
) {
    match cmd {
        ChatCommand::Clear => {
            if session.clear() {
                renderer.print_info("Conversation cleared.");
            } else {
                renderer.print_error("Cannot clear while waiting for a reply.");
            }
        }
        ChatCommand::Model(model_name) => {
            session.provider_mut().set_model(Model::from(model_name.clone()));
            renderer.print_info(&format!("Model changed to: {}", model_name));
        }
        ChatCommand::Temperature(value) => {
            session.set_temperature(Some(value));
            renderer.print_info(&format!("temperature set to {:.2}", value));
        }
        ChatCommand::ClearTemperature => {
            session.set_temperature(None);
            renderer.print_info("temperature reset to model default");
        }
        ChatCommand::MaxTokens(value) => {
            session.set_max_tokens(value);
            renderer.print_info(&format!("max_tokens set to {value}"));
        }
        ChatCommand::Image(path) => match ImageAttachment::from_path(&path) {
            Ok(image) => {
                renderer.print_info(&format!(
                    "Attached {} ({}); it goes with your next message.",
                    image.name, image.media_type
                ));
                app.pending_image = Some(image);
            }
            Err(err) => renderer.print_error(&format!("Failed to attach image: {}", err)),
        },
        ChatCommand::ClearImage => {
            if app.pending_image.take().is_some() {
                renderer.print_info("Image attachment dropped.");
            } else {
                renderer.print_info("No image attached.");
            }
        }
        ChatCommand::QuickPrompt(_) => print_quick_prompts(),
        ChatCommand::Contacts => print_contacts(&app.contacts),
        ChatCommand::Call(id) => match app.contacts.get(&id) {
            Some(contact) => match contact.tel_uri() {
                Ok(uri) => renderer.print_info(&format!("{}: {}", contact.name, uri)),
                Err(err) => renderer.print_error(&err.to_string()),
            },
            None => renderer.print_error(&format!("No contact with id {id}")),
        },
        ChatCommand::Guides { query, saved_only } => {
            print_guides(&app.saved, &query, saved_only);
        }
        ChatCommand::Guide(title) => match guides::find(&title) {
            Some(guide) => {
                renderer.print_markdown(&guide.to_markdown());
                if app.saved.is_saved(guide.title) {
                    renderer.print_info("Saved for offline use.");
                }
            }
            None => match app.saved.get(title.trim()) {
                Some(saved) => renderer.print_markdown(&format!("## {}\n\n{}", saved.title, saved.content)),
                None => renderer.print_error(&format!("No guide titled {title}")),
            },
        },
        ChatCommand::Bookmark(title) => match guides::find(&title) {
            Some(guide) => match app.saved.toggle(guide) {
                Ok(true) => renderer.print_info(&format!("Saved {} for offline use.", guide.title)),
                Ok(false) => renderer.print_info(&format!("Removed {} from saved guides.", guide.title)),
                Err(err) => renderer.print_error(&format!("Failed to update saved guides: {}", err)),
            },
            None => renderer.print_error(&format!("No guide titled {title}")),
        },
        ChatCommand::Download(title) => {
            if session.is_empty() {
                renderer.print_error("Nothing to download yet.");
                return;
            }
            let title = title
                .or_else(|| session.title())
                .unwrap_or_default();
            match app.log.record(title, session.transcript()) {
                Ok(entry) => renderer.print_info(&format!(
                    "Downloaded \"{}\" as chat {}.",
                    entry.title, entry.id
                )),
                Err(err) => renderer.print_error(&format!("Failed to download chat: {}", err)),
            }
        }
        ChatCommand::Log(None) => print_chat_log(&app.log),
        ChatCommand::Log(Some(id)) => match app.log.transcript(&id) {
            Some(messages) => {
                for message in messages {
                    renderer.print_message(message);
                }
            }
            None => renderer.print_error(&format!("No downloaded chat with id {id}")),
        },
        ChatCommand::Open(page) => open_page(page, session, config, app, renderer),
        ChatCommand::SaveTranscript(path) => match session.save_transcript_to(&path) {
            Ok(_) => renderer.print_info(&format!("Transcript saved to {}", path)),
            Err(err) => renderer.print_error(&format!("Failed to save transcript: {}", err)),
        },
        ChatCommand::LoadTranscript(path) => match session.load_transcript_from(&path) {
            Ok(_) => renderer.print_info(&format!("Transcript loaded from {}", path)),
            Err(err) => renderer.print_error(&format!("Failed to load transcript: {}", err)),
        },
        ChatCommand::Help => {
            for line in help_text().lines() {
                println!("    {}", line);
            }
        }
        ChatCommand::Stats => print_stats(session),
        ChatCommand::ShowConfig => print_config(session, config),
        ChatCommand::Invalid(message) => renderer.print_error(&message),
        ChatCommand::Quit => {}
    }
}

fn open_page(
    page: Page,
    session: &Session,
    config: &ChatConfig,
    app: &App,
    renderer: &mut PlainTextRenderer,
) {
    println!("    == {} ({}) ==", page.title(), page.path());
    match page {
        Page::Chat => {
            renderer.print_info("Type a question, or attach a photo with /image <file>.");
        }
        Page::Home => print_quick_prompts(),
        Page::CallList => print_contacts(&app.contacts),
        Page::CallLog => print_guides(&app.saved, "", true),
        Page::ChatLog => print_chat_log(&app.log),
        Page::Guide => print_guides(&app.saved, "", false),
        Page::Settings => print_config(session, config),
    }
}

fn print_quick_prompts() {
    println!("    Quick prompts (send one with /prompt <n>):");
    for (i, prompt) in QUICK_PROMPTS.iter().enumerate() {
        println!("      {}. {}", i + 1, prompt);
    }
}

fn print_contacts(contacts: &ContactRepository) {
    println!("    Emergency contacts (dial with /call <id>):");
    for contact in contacts.list() {
        println!("      [{}] {} {}", contact.id, contact.name, contact.number);
        if !contact.description.is_empty() {
            println!("          {}", contact.description);
        }
    }
}

fn print_guides(saved: &SavedGuides<JsonFileStore>, query: &str, saved_only: bool) {
    let found = guides::search(guides::library(), query, saved_only, |title| {
        saved.is_saved(title)
    });
    if found.is_empty() {
        if saved_only && query.is_empty() {
            println!("    No saved guides. Save one with /bookmark <title>.");
        } else {
            println!("    No guides match \"{}\".", query);
        }
        return;
    }
    for guide in found {
        let mark = if saved.is_saved(guide.title) { "*" } else { " " };
        println!("    {} {}", mark, guide.title);
    }
}

fn print_chat_log(log: &ChatLog<JsonFileStore>) {
    let entries = log.entries();
    if entries.is_empty() {
        println!("    No downloaded chats. Save this one with /download.");
        return;
    }
    println!("    Downloaded chats (show one with /log <id>):");
    for entry in entries {
        println!(
            "      [{}] {} ({})",
            entry.id,
            entry.title,
            utils::time::display(&entry.date)
        );
    }
}

fn print_stats(session: &Session) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Model: {}", session.provider().model());
    println!("      Messages: {}", stats.message_count);
    println!(
        "      Sends: {} ({} answered, {} failed, {} rejected)",
        stats.sends, stats.answered, stats.failed, stats.rejected
    );
    print_generation(&stats.generation);
    print_transcript_path(stats.transcript_path);
}

fn print_config(session: &Session, config: &ChatConfig) {
    let stats = session.stats();
    println!("    Current Configuration:");
    println!("      Model: {}", session.provider().model());
    print_generation(&stats.generation);
    println!("      Store file: {}", config.store_path.display());
    println!(
        "      Colors: {}",
        if config.use_color { "on" } else { "off" }
    );
    print_transcript_path(stats.transcript_path);
}

fn print_generation(generation: &GenerationConfig) {
    println!("      Temperature: {}", describe_float(generation.temperature));
    println!("      Top-p: {}", describe_float(generation.top_p));
    println!("      Top-k: {}", describe_u32(generation.top_k));
    println!("      Max tokens: {}", describe_u32(generation.max_output_tokens));
}

fn print_transcript_path(path: Option<PathBuf>) {
    match path {
        Some(ref path) => println!("      Transcript file: {}", path.display()),
        None => println!("      Transcript file: (disabled)"),
    }
}

fn describe_float(value: Option<f32>) -> String {
    value
        .map(|v| format!("{v:.2}"))
        .unwrap_or_else(|| "default".to_string())
}

fn describe_u32(value: Option<u32>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "default".to_string())
}
