use serde::{Deserialize, Serialize};

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default top-k sampling limit.
pub const DEFAULT_TOP_K: u32 = 40;

/// Default top-p nucleus sampling value.
pub const DEFAULT_TOP_P: f32 = 0.95;

/// Default maximum output tokens per response.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1024;

/// Generation parameters sent with every request.
///
/// Fields missing when deserializing take their default values; an explicit
/// `null` leaves the parameter to the provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Top-k sampling limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    /// Top-p nucleus sampling value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Maximum output tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl GenerationConfig {
    /// Generation config with every parameter left to the provider.
    pub fn unset() -> Self {
        Self {
            temperature: None,
            top_k: None,
            top_p: None,
            max_output_tokens: None,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: Some(DEFAULT_TEMPERATURE),
            top_k: Some(DEFAULT_TOP_K),
            top_p: Some(DEFAULT_TOP_P),
            max_output_tokens: Some(DEFAULT_MAX_OUTPUT_TOKENS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn default_serializes_camel_case() {
        let value = to_value(GenerationConfig::default()).unwrap();
        assert_eq!(value["topK"], json!(40));
        assert_eq!(value["maxOutputTokens"], json!(1024));
        let temperature = value["temperature"].as_f64().unwrap();
        assert!((temperature - 0.7).abs() < 1e-6);
        let top_p = value["topP"].as_f64().unwrap();
        assert!((top_p - 0.95).abs() < 1e-6);
    }

    #[test]
    fn partial_input_keeps_defaults() {
        let config: GenerationConfig =
            serde_json::from_value(json!({"topK": 10, "topP": null})).unwrap();
        assert_eq!(config.top_k, Some(10));
        assert_eq!(config.top_p, None);
        assert_eq!(config.max_output_tokens, Some(DEFAULT_MAX_OUTPUT_TOKENS));
    }

    #[test]
    fn unset_serializes_empty() {
        assert_eq!(to_value(GenerationConfig::unset()).unwrap(), json!({}));
    }
}
