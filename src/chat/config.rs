//! Configuration types for the chat application.
//!
//! Command-line arguments are parsed with `arrrg`. They are layered over an
//! optional YAML configuration file and the built-in defaults to produce a
//! [`ChatConfig`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{GenerationConfig, Model};

/// Default location of the local key-value store.
pub const DEFAULT_STORE_PATH: &str = "aidsnap-store.json";

/// Command-line arguments for the aidsnap-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: gemini-2.5-flash)", "MODEL")]
    pub model: Option<String>,

    /// API key; falls back to AIDSNAP_API_KEY.
    #[arrrg(optional, "Gemini API key (default: $AIDSNAP_API_KEY)", "KEY")]
    pub api_key: Option<String>,

    /// YAML file with configuration defaults.
    #[arrrg(optional, "YAML configuration file", "FILE")]
    pub config: Option<String>,

    /// Path of the JSON file holding saved guides and the chat log.
    #[arrrg(optional, "Local storage file (default: aidsnap-store.json)", "FILE")]
    pub store: Option<String>,

    /// Sampling temperature, parsed as a float.
    #[arrrg(optional, "Sampling temperature 0.0-2.0 (default: 0.7)", "TEMP")]
    pub temperature: Option<String>,

    /// Maximum output tokens per response.
    #[arrrg(optional, "Max output tokens per response (default: 1024)", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Save the transcript here after every reply.
    #[arrrg(optional, "Auto-save the transcript to this file", "FILE")]
    pub transcript: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// Deserializes from YAML with every field optional.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// The model to use for generating responses.
    pub model: Model,

    /// API key. `None` defers to the environment.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Override for the provider's base URL.
    pub base_url: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,

    /// Generation parameters sent with every request.
    pub generation: GenerationConfig,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Local key-value store file.
    pub store_path: PathBuf,

    /// Path to persist transcripts automatically after each assistant turn.
    pub transcript_path: Option<PathBuf>,
}

impl std::fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatConfig")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("generation", &self.generation)
            .field("use_color", &self.use_color)
            .field("store_path", &self.store_path)
            .field("transcript_path", &self.transcript_path)
            .finish()
    }
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: gemini-2.5-flash
    /// - Generation: temperature 0.7, top-k 40, top-p 0.95, 1024 tokens
    /// - Color: enabled
    /// - Store: `aidsnap-store.json` in the working directory
    pub fn new() -> Self {
        Self {
            model: Model::default(),
            api_key: None,
            base_url: None,
            timeout_secs: None,
            generation: GenerationConfig::default(),
            use_color: true,
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            transcript_path: None,
        }
    }

    /// Parse a YAML configuration document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: ChatConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML configuration file.
    pub fn load_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path)
            .map_err(|err| Error::io(format!("failed to read {}", path.display()), err))?;
        Self::from_yaml_str(&yaml)
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the generation parameters.
    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.generation.temperature = temperature;
        self
    }

    /// Sets the maximum output tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.generation.max_output_tokens = Some(max_tokens);
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Sets the local store path.
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    /// Sets the transcript auto-save path.
    pub fn with_transcript_path(mut self, path: Option<PathBuf>) -> Self {
        self.transcript_path = path;
        self
    }

    /// The request timeout, if configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Check the generation parameters are in range.
    pub fn validate(&self) -> Result<()> {
        if let Some(temperature) = self.generation.temperature {
            check_temperature(temperature)?;
        }
        if let Some(top_p) = self.generation.top_p
            && !(0.0..=1.0).contains(&top_p)
        {
            return Err(Error::validation(
                format!("top_p must be between 0 and 1, got {top_p}"),
                Some("top_p".to_string()),
            ));
        }
        if self.generation.max_output_tokens == Some(0) {
            return Err(Error::validation(
                "max output tokens must be positive",
                Some("max_output_tokens".to_string()),
            ));
        }
        Ok(())
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = Error;

    /// Layer the arguments over the YAML file named by `--config`, if any,
    /// and the defaults.
    fn try_from(args: ChatArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => ChatConfig::load_yaml(path)?,
            None => ChatConfig::new(),
        };

        if let Some(model) = args.model {
            config.model = Model::from(model);
        }
        if let Some(api_key) = args.api_key {
            config.api_key = Some(api_key);
        }
        if let Some(store) = args.store {
            config.store_path = PathBuf::from(store);
        }
        if let Some(temperature) = args.temperature {
            config.generation.temperature = Some(parse_temperature(&temperature)?);
        }
        if let Some(max_tokens) = args.max_tokens {
            config.generation.max_output_tokens = Some(max_tokens);
        }
        if let Some(transcript) = args.transcript {
            config.transcript_path = Some(PathBuf::from(transcript));
        }
        if args.no_color {
            config.use_color = false;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Parse and range-check a temperature value.
pub fn parse_temperature(value: &str) -> Result<f32> {
    let parsed: f32 = value.trim().parse().map_err(|_| {
        Error::validation(
            format!("temperature must be a number, got {value:?}"),
            Some("temperature".to_string()),
        )
    })?;
    check_temperature(parsed)?;
    Ok(parsed)
}

fn check_temperature(temperature: f32) -> Result<()> {
    if temperature.is_finite() && (0.0..=2.0).contains(&temperature) {
        Ok(())
    } else {
        Err(Error::validation(
            format!("temperature must be between 0 and 2, got {temperature}"),
            Some("temperature".to_string()),
        ))
    }
}
