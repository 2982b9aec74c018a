//! Core chat session management.
//!
//! [`ChatSession`] owns the conversation and drives one provider round trip
//! per send. At most one send is in flight; a second send while the first is
//! pending is rejected rather than queued.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_writer_pretty};

use crate::client::Provider;
use crate::error::{Error, Result};
use crate::format::format_response;
use crate::observability::{CHAT_SEND_FAILURES, CHAT_SENDS, CHAT_SENDS_REJECTED, CHAT_TURN_DURATION};
use crate::prompt;
use crate::types::{GenerationConfig, ImageAttachment, Message, Role};

/// Assistant text appended when the provider call fails.
pub const ERROR_REPLY: &str = "Sorry, I encountered an error. Please try again.";

/// Why a send did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No text and no image.
    Empty,
    /// Another send is still waiting for its reply.
    Busy,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::Empty => f.write_str("nothing to send"),
            RejectReason::Busy => f.write_str("still waiting for the previous reply"),
        }
    }
}

/// The result of [`ChatSession::send`].
#[derive(Debug)]
pub enum SendOutcome {
    /// Nothing was appended.
    Rejected(RejectReason),
    /// The user message and the formatted reply were appended.
    Answered,
    /// The user message and [`ERROR_REPLY`] were appended.
    Failed(Error),
}

impl SendOutcome {
    pub fn is_answered(&self) -> bool {
        matches!(self, SendOutcome::Answered)
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, SendOutcome::Rejected(_))
    }
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    /// The number of messages in the conversation.
    pub message_count: usize,
    /// Sends that reached the provider.
    pub sends: u64,
    /// Sends answered by the provider.
    pub answered: u64,
    /// Sends that ended with the error reply.
    pub failed: u64,
    /// Sends rejected as empty or while busy.
    pub rejected: u64,
    /// Whether a send is in flight.
    pub busy: bool,
    /// Generation parameters for the next send.
    pub generation: GenerationConfig,
    /// The auto-save transcript path, if set.
    pub transcript_path: Option<PathBuf>,
}

struct SessionState {
    messages: Vec<Message>,
    busy: bool,
    generation: GenerationConfig,
    transcript_path: Option<PathBuf>,
    sends: u64,
    answered: u64,
    failed: u64,
    rejected: u64,
}

/// A chat session that manages conversation state and provider calls.
///
/// All methods take `&self`. The state lock is never held across the
/// provider call, so the conversation can be read while a reply is pending.
pub struct ChatSession<P: Provider> {
    provider: P,
    state: Mutex<SessionState>,
}

/// Clears the busy flag if a send is abandoned before its reply arrives.
struct BusyGuard<'a> {
    state: &'a Mutex<SessionState>,
    armed: bool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
            state.busy = false;
            tracing::debug!("send abandoned before the reply arrived");
        }
    }
}

impl<P: Provider> ChatSession<P> {
    /// Creates a new chat session with default generation parameters.
    pub fn new(provider: P) -> Self {
        Self::with_generation(provider, GenerationConfig::default())
    }

    /// Creates a new chat session with the given generation parameters.
    pub fn with_generation(provider: P, generation: GenerationConfig) -> Self {
        Self {
            provider,
            state: Mutex::new(SessionState {
                messages: Vec::new(),
                busy: false,
                generation,
                transcript_path: None,
                sends: 0,
                answered: 0,
                failed: 0,
                rejected: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Sends a user message and waits for the reply.
    ///
    /// The user message is appended before the provider is called. The reply,
    /// or [`ERROR_REPLY`] if the call fails, is appended after. Blank text
    /// with no image, or any send while another is pending, is rejected and
    /// leaves the conversation unchanged.
    pub async fn send(&self, text: &str, image: Option<ImageAttachment>) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() && image.is_none() {
            return self.reject(RejectReason::Empty);
        }

        let (request, mut guard) = {
            let mut state = self.lock();
            if state.busy {
                drop(state);
                return self.reject(RejectReason::Busy);
            }
            state.busy = true;
            state.sends += 1;
            let ordinal = state.messages.len();
            let reference = image.as_ref().map(ImageAttachment::reference);
            state.messages.push(Message::user(text, reference, ordinal));
            let request = prompt::compose(text, image.as_ref(), &state.generation);
            let guard = BusyGuard {
                state: &self.state,
                armed: true,
            };
            (request, guard)
        };
        CHAT_SENDS.click();
        tracing::debug!(has_image = image.is_some(), "sending chat message");

        let start = Instant::now();
        let result = self.provider.generate(&request).await;
        CHAT_TURN_DURATION.add(start.elapsed().as_secs_f64());

        let (outcome, transcript_path, snapshot) = {
            let mut state = self.lock();
            let ordinal = state.messages.len();
            let outcome = match result {
                Ok(raw) => {
                    state.messages.push(Message::assistant(format_response(&raw), ordinal));
                    state.answered += 1;
                    SendOutcome::Answered
                }
                Err(err) => {
                    CHAT_SEND_FAILURES.click();
                    tracing::warn!(error = %err, "chat send failed");
                    state.messages.push(Message::assistant(ERROR_REPLY, ordinal));
                    state.failed += 1;
                    SendOutcome::Failed(err)
                }
            };
            state.busy = false;
            guard.armed = false;
            let snapshot = state
                .transcript_path
                .is_some()
                .then(|| state.messages.clone());
            (outcome, state.transcript_path.clone(), snapshot)
        };

        if let (Some(path), Some(messages)) = (transcript_path, snapshot)
            && let Err(err) = write_transcript(&path, &messages)
        {
            tracing::warn!(error = %err, path = %path.display(), "transcript auto-save failed");
        }
        outcome
    }

    fn reject(&self, reason: RejectReason) -> SendOutcome {
        CHAT_SENDS_REJECTED.click();
        self.lock().rejected += 1;
        tracing::debug!(?reason, "send rejected");
        SendOutcome::Rejected(reason)
    }

    /// A snapshot of the conversation.
    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    /// The conversation as it would be downloaded to the chat log.
    pub fn transcript(&self) -> Vec<Message> {
        self.messages()
    }

    /// A title for the conversation: its first user message, shortened.
    pub fn title(&self) -> Option<String> {
        let state = self.lock();
        let first = state
            .messages
            .iter()
            .find(|m| m.role == Role::User && !m.text.is_empty())?;
        let mut title: String = first.text.chars().take(60).collect();
        if first.text.chars().count() > 60 {
            title.push_str("...");
        }
        Some(title)
    }

    /// Returns the number of messages in the conversation.
    pub fn len(&self) -> usize {
        self.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a send is waiting for its reply.
    pub fn is_busy(&self) -> bool {
        self.lock().busy
    }

    /// Clears the conversation history. Refused, returning false, while a
    /// send is in flight.
    pub fn clear(&self) -> bool {
        let mut state = self.lock();
        if state.busy {
            return false;
        }
        state.messages.clear();
        true
    }

    pub fn generation(&self) -> GenerationConfig {
        self.lock().generation
    }

    /// Sets the generation parameters for later sends.
    pub fn set_generation(&self, generation: GenerationConfig) {
        self.lock().generation = generation;
    }

    /// Sets the sampling temperature for later sends.
    pub fn set_temperature(&self, temperature: Option<f32>) {
        self.lock().generation.temperature = temperature;
    }

    /// Sets the maximum output tokens for later sends.
    pub fn set_max_tokens(&self, max_tokens: u32) {
        self.lock().generation.max_output_tokens = Some(max_tokens);
    }

    /// Sets the auto-save transcript path.
    pub fn set_transcript_path(&self, path: Option<PathBuf>) {
        self.lock().transcript_path = path;
    }

    /// Returns the configured transcript path, if any.
    pub fn transcript_path(&self) -> Option<PathBuf> {
        self.lock().transcript_path.clone()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// Saves the transcript to the specified path.
    pub fn save_transcript_to<Q: AsRef<Path>>(&self, path: Q) -> Result<()> {
        let messages = self.messages();
        write_transcript(path.as_ref(), &messages)
    }

    /// Loads a transcript from disk, replacing the conversation. Refused
    /// while a send is in flight.
    pub fn load_transcript_from<Q: AsRef<Path>>(&self, path: Q) -> Result<()> {
        let file = File::open(path.as_ref())
            .map_err(|err| Error::io("failed to open transcript file", err))?;
        let reader = BufReader::new(file);
        let transcript: TranscriptFile = from_reader(reader).map_err(|err| {
            Error::serialization("failed to parse transcript", Some(Box::new(err)))
        })?;
        if transcript.version != TRANSCRIPT_VERSION {
            return Err(Error::validation(
                format!("unsupported transcript version {}", transcript.version),
                Some("version".to_string()),
            ));
        }

        let mut state = self.lock();
        if state.busy {
            return Err(Error::validation(
                "cannot load a transcript while a reply is pending",
                None,
            ));
        }
        state.messages = transcript
            .messages
            .into_iter()
            .enumerate()
            .map(|(ordinal, message)| Message { ordinal, ..message })
            .collect();
        Ok(())
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        let state = self.lock();
        SessionStats {
            message_count: state.messages.len(),
            sends: state.sends,
            answered: state.answered,
            failed: state.failed,
            rejected: state.rejected,
            busy: state.busy,
            generation: state.generation,
            transcript_path: state.transcript_path.clone(),
        }
    }
}

const TRANSCRIPT_VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct TranscriptFile {
    version: u8,
    messages: Vec<Message>,
}

fn write_transcript(path: &Path, messages: &[Message]) -> Result<()> {
    let transcript = TranscriptFile {
        version: TRANSCRIPT_VERSION,
        messages: messages.to_vec(),
    };
    let file =
        File::create(path).map_err(|err| Error::io("failed to create transcript file", err))?;
    let writer = BufWriter::new(file);
    to_writer_pretty(writer, &transcript)
        .map_err(|err| Error::serialization("failed to serialize transcript", Some(Box::new(err))))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use super::*;
    use crate::types::{GenerateContentRequest, ImageMediaType};

    /// Replies from a script, recording every request.
    struct Scripted {
        replies: StdMutex<Vec<Result<String>>>,
        requests: StdMutex<Vec<GenerateContentRequest>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: StdMutex::new(replies),
                requests: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl Provider for Scripted {
        async fn generate(&self, request: &GenerateContentRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                return Err(Error::empty_response("script exhausted"));
            }
            replies.remove(0)
        }
    }

    #[tokio::test]
    async fn empty_send_is_a_no_op() {
        let session = ChatSession::new(Scripted::new(vec![]));
        let outcome = session.send("   ", None).await;
        assert!(matches!(outcome, SendOutcome::Rejected(RejectReason::Empty)));
        assert!(session.is_empty());
        assert!(session.provider().requests.lock().unwrap().is_empty());
        assert_eq!(session.stats().rejected, 1);
    }

    #[tokio::test]
    async fn answered_send_appends_formatted_reply() {
        let session = ChatSession::new(Scripted::new(vec![Ok("Warning: stop".to_string())]));
        let outcome = session.send("  How do I treat a burn? ", None).await;
        assert!(outcome.is_answered());

        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], Message::user("How do I treat a burn?", None, 0));
        assert_eq!(messages[1], Message::assistant("### Warning: stop", 1));
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn failure_appends_error_reply() {
        let session = ChatSession::new(Scripted::new(vec![Err(Error::rate_limit("slow", None))]));
        let outcome = session.send("Help", None).await;
        match outcome {
            SendOutcome::Failed(err) => assert!(err.is_rate_limit()),
            other => panic!("expected failure, got {other:?}"),
        }

        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].text, ERROR_REPLY);
        assert!(!session.is_busy());
        assert_eq!(session.stats().failed, 1);
    }

    #[tokio::test]
    async fn image_only_send_is_accepted() {
        let session = ChatSession::new(Scripted::new(vec![Ok("Looks like a minor cut.".to_string())]));
        let image = ImageAttachment::new("cut.png", ImageMediaType::Png, vec![1, 2, 3]);
        assert!(session.send("", Some(image)).await.is_answered());

        let messages = session.messages();
        assert_eq!(messages[0].text, "");
        assert_eq!(messages[0].image.as_ref().unwrap().name, "cut.png");

        let requests = session.provider().requests.lock().unwrap();
        assert!(requests[0].text().ends_with(prompt::IMAGE_ONLY_REQUEST));
        assert_eq!(requests[0].inline_data().unwrap().mime_type, "image/png");
    }

    #[tokio::test]
    async fn generation_settings_reach_the_request() {
        let session = ChatSession::new(Scripted::new(vec![Ok("ok".to_string())]));
        session.set_temperature(Some(0.25));
        session.set_max_tokens(64);
        session.send("Burns", None).await;

        let requests = session.provider().requests.lock().unwrap();
        let generation = requests[0].generation_config.unwrap();
        assert_eq!(generation.temperature, Some(0.25));
        assert_eq!(generation.max_output_tokens, Some(64));
    }

    #[tokio::test]
    async fn clear_and_title() {
        let session = ChatSession::new(Scripted::new(vec![Ok("Rest it.".to_string())]));
        assert!(session.title().is_none());
        session.send("My ankle is swollen", None).await;
        assert_eq!(session.title().as_deref(), Some("My ankle is swollen"));
        assert!(session.clear());
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn transcript_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.json");

        let session = ChatSession::new(Scripted::new(vec![Ok("Cool the burn.".to_string())]));
        session.send("Burn", None).await;
        session.save_transcript_to(&path).unwrap();

        let restored = ChatSession::new(Scripted::new(vec![]));
        restored.load_transcript_from(&path).unwrap();
        assert_eq!(restored.messages(), session.messages());

        std::fs::write(&path, r#"{"version": 9, "messages": []}"#).unwrap();
        assert!(restored.load_transcript_from(&path).unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn transcript_auto_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auto.json");

        let session = ChatSession::new(Scripted::new(vec![Ok("Elevate it.".to_string())]));
        session.set_transcript_path(Some(path.clone()));
        session.send("Sprain", None).await;

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["version"], 1);
        assert_eq!(saved["messages"].as_array().unwrap().len(), 2);
        assert_eq!(saved["messages"][1]["text"], "Elevate it.");
    }
}
