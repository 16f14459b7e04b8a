//! Static provider metadata registry.
//!
//! Each provider carries an immutable profile: declared capabilities,
//! cost, latency, context window, specialties, feature flags, and
//! per-response-type strengths. Profiles are loaded once at process start,
//! either from the builtin table or from a TOML file.

use crate::routing::types::ResponseType;
use quorum_models::ProviderId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// A provider feature the analyzer can mark as required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Agentic tool use.
    ToolUse,
    /// Sandboxed code execution.
    CodeInterpreter,
    /// Schema-constrained output.
    StructuredOutput,
    /// Document retrieval.
    Retrieval,
    /// Function calling.
    FunctionCalling,
}

impl Feature {
    /// All feature flags, in declaration order.
    pub const ALL: [Feature; 5] = [
        Feature::ToolUse,
        Feature::CodeInterpreter,
        Feature::StructuredOutput,
        Feature::Retrieval,
        Feature::FunctionCalling,
    ];
}

/// Per-provider feature flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    /// Agentic tool use.
    #[serde(default)]
    pub tool_use: bool,
    /// Sandboxed code execution.
    #[serde(default)]
    pub code_interpreter: bool,
    /// Schema-constrained output.
    #[serde(default)]
    pub structured_output: bool,
    /// Document retrieval.
    #[serde(default)]
    pub retrieval: bool,
    /// Function calling.
    #[serde(default)]
    pub function_calling: bool,
}

impl FeatureSet {
    /// Whether this set supports the given feature.
    #[must_use]
    pub fn supports(&self, feature: Feature) -> bool {
        match feature {
            Feature::ToolUse => self.tool_use,
            Feature::CodeInterpreter => self.code_interpreter,
            Feature::StructuredOutput => self.structured_output,
            Feature::Retrieval => self.retrieval,
            Feature::FunctionCalling => self.function_calling,
        }
    }

    /// Fraction of all feature flags this set enables, in [0, 1].
    #[must_use]
    pub fn available_ratio(&self) -> f64 {
        let supported = Feature::ALL.iter().filter(|f| self.supports(**f)).count();
        supported as f64 / Feature::ALL.len() as f64
    }
}

/// Immutable static metadata for one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderProfile {
    /// Provider identifier (unique key).
    pub id: ProviderId,
    /// Response types this provider declares it can serve.
    pub capabilities: HashSet<ResponseType>,
    /// Cost per token in USD.
    pub cost_per_token: f64,
    /// Historical average latency in milliseconds.
    pub average_latency_ms: u64,
    /// Context window in tokens.
    pub context_window: u32,
    /// Free-text specialty tags, matched as substrings of the prompt.
    pub specialties: Vec<String>,
    /// Feature flags.
    pub features: FeatureSet,
    /// Declared strength per response type, 0-10.
    pub strengths: HashMap<ResponseType, f64>,
}

impl ProviderProfile {
    /// Declared strength for a response type (0 when undeclared).
    #[must_use]
    pub fn strength(&self, response_type: ResponseType) -> f64 {
        self.strengths.get(&response_type).copied().unwrap_or(0.0)
    }

    /// Whether any declared specialty appears in the lowercased prompt.
    #[must_use]
    pub fn specialty_matches(&self, prompt: &str) -> bool {
        let lower = prompt.to_lowercase();
        self.specialties.iter().any(|s| lower.contains(&s.to_lowercase()))
    }
}

/// Registry of provider profiles, immutable after construction.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    profiles: HashMap<ProviderId, ProviderProfile>,
}

impl ProviderRegistry {
    /// Creates a registry from a list of profiles.
    #[must_use]
    pub fn new(profiles: Vec<ProviderProfile>) -> Self {
        Self { profiles: profiles.into_iter().map(|p| (p.id, p)).collect() }
    }

    /// Builtin registry with hardcoded metadata for the known providers.
    #[must_use]
    pub fn builtin() -> Self {
        let all_types = [
            ResponseType::General,
            ResponseType::Coding,
            ResponseType::Creative,
            ResponseType::Data,
            ResponseType::Technical,
        ];

        let profiles = vec![
            ProviderProfile {
                id: ProviderId::OpenAi,
                capabilities: all_types.into_iter().collect(),
                cost_per_token: 0.000_010,
                average_latency_ms: 1200,
                context_window: 128_000,
                specialties: vec![
                    "code".to_string(),
                    "function calling".to_string(),
                    "data analysis".to_string(),
                ],
                features: FeatureSet {
                    tool_use: true,
                    code_interpreter: true,
                    structured_output: true,
                    retrieval: true,
                    function_calling: true,
                },
                strengths: HashMap::from([
                    (ResponseType::General, 8.0),
                    (ResponseType::Coding, 9.0),
                    (ResponseType::Creative, 7.0),
                    (ResponseType::Data, 8.0),
                    (ResponseType::Technical, 8.0),
                ]),
            },
            ProviderProfile {
                id: ProviderId::Claude,
                capabilities: all_types.into_iter().collect(),
                cost_per_token: 0.000_015,
                average_latency_ms: 2000,
                context_window: 200_000,
                specialties: vec![
                    "writing".to_string(),
                    "analysis".to_string(),
                    "long document".to_string(),
                ],
                features: FeatureSet {
                    tool_use: true,
                    code_interpreter: false,
                    structured_output: true,
                    retrieval: false,
                    function_calling: true,
                },
                strengths: HashMap::from([
                    (ResponseType::General, 9.0),
                    (ResponseType::Coding, 8.0),
                    (ResponseType::Creative, 9.0),
                    (ResponseType::Data, 7.0),
                    (ResponseType::Technical, 9.0),
                ]),
            },
            ProviderProfile {
                id: ProviderId::Gemini,
                capabilities: all_types.into_iter().collect(),
                cost_per_token: 0.000_005,
                average_latency_ms: 900,
                context_window: 1_000_000,
                specialties: vec![
                    "summarization".to_string(),
                    "research".to_string(),
                    "multimodal".to_string(),
                ],
                features: FeatureSet {
                    tool_use: true,
                    code_interpreter: true,
                    structured_output: true,
                    retrieval: true,
                    function_calling: true,
                },
                strengths: HashMap::from([
                    (ResponseType::General, 8.0),
                    (ResponseType::Coding, 7.0),
                    (ResponseType::Creative, 7.0),
                    (ResponseType::Data, 9.0),
                    (ResponseType::Technical, 8.0),
                ]),
            },
            ProviderProfile {
                id: ProviderId::OpenRouter,
                capabilities: all_types.into_iter().collect(),
                cost_per_token: 0.000_008,
                average_latency_ms: 2600,
                context_window: 128_000,
                specialties: vec!["model variety".to_string(), "fallback".to_string()],
                features: FeatureSet {
                    tool_use: false,
                    code_interpreter: false,
                    structured_output: true,
                    retrieval: false,
                    function_calling: false,
                },
                strengths: HashMap::from([
                    (ResponseType::General, 7.0),
                    (ResponseType::Coding, 7.0),
                    (ResponseType::Creative, 7.0),
                    (ResponseType::Data, 7.0),
                    (ResponseType::Technical, 7.0),
                ]),
            },
        ];

        Self::new(profiles)
    }

    /// Looks up a profile by provider id.
    #[must_use]
    pub fn get(&self, id: ProviderId) -> Option<&ProviderProfile> {
        self.profiles.get(&id)
    }

    /// Iterates over all profiles.
    pub fn profiles(&self) -> impl Iterator<Item = &ProviderProfile> {
        self.profiles.values()
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Errors that can occur during registry configuration loading.
#[derive(Debug, Error)]
pub enum RegistryConfigError {
    /// I/O error reading the file.
    #[error("Failed to read registry file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("Failed to parse registry TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error.
    #[error("Invalid registry configuration: {0}")]
    Validation(String),
}

/// Registry file layout.
#[derive(Debug, Deserialize)]
struct RegistryConfig {
    providers: Vec<ProviderProfileConfig>,
}

#[derive(Debug, Deserialize)]
struct ProviderProfileConfig {
    id: String,
    capabilities: Vec<String>,
    cost_per_token: f64,
    average_latency_ms: u64,
    context_window: u32,
    #[serde(default)]
    specialties: Vec<String>,
    #[serde(default)]
    features: FeatureSet,
    #[serde(default)]
    strengths: HashMap<String, f64>,
}

/// Loader for TOML registry files.
pub struct RegistryConfigLoader;

impl RegistryConfigLoader {
    /// Loads and validates a provider registry from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or fails
    /// validation (unknown provider/response-type names, out-of-range
    /// strengths, empty capability sets).
    pub fn load(path: &Path) -> Result<ProviderRegistry, RegistryConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: RegistryConfig = toml::from_str(&content)?;

        let mut profiles = Vec::with_capacity(config.providers.len());
        for entry in config.providers {
            profiles.push(Self::validate(entry)?);
        }

        debug!(providers = profiles.len(), path = %path.display(), "Loaded provider registry");
        Ok(ProviderRegistry::new(profiles))
    }

    fn validate(entry: ProviderProfileConfig) -> Result<ProviderProfile, RegistryConfigError> {
        let id = ProviderId::from_str(&entry.id).map_err(|_| {
            RegistryConfigError::Validation(format!("Unknown provider id: {}", entry.id))
        })?;

        if entry.capabilities.is_empty() {
            return Err(RegistryConfigError::Validation(format!(
                "Provider {} declares no capabilities",
                entry.id
            )));
        }

        let mut capabilities = HashSet::new();
        for name in &entry.capabilities {
            let rt = ResponseType::from_str_opt(name).ok_or_else(|| {
                RegistryConfigError::Validation(format!("Unknown response type: {name}"))
            })?;
            capabilities.insert(rt);
        }

        let mut strengths = HashMap::new();
        for (name, value) in &entry.strengths {
            let rt = ResponseType::from_str_opt(name).ok_or_else(|| {
                RegistryConfigError::Validation(format!("Unknown response type: {name}"))
            })?;
            if !(0.0..=10.0).contains(value) {
                return Err(RegistryConfigError::Validation(format!(
                    "Strength {value} for {name} out of range 0-10"
                )));
            }
            strengths.insert(rt, *value);
        }

        if entry.context_window == 0 {
            return Err(RegistryConfigError::Validation(format!(
                "Provider {} has a zero context window",
                entry.id
            )));
        }

        Ok(ProviderProfile {
            id,
            capabilities,
            cost_per_token: entry.cost_per_token,
            average_latency_ms: entry.average_latency_ms,
            context_window: entry.context_window,
            specialties: entry.specialties,
            features: entry.features,
            strengths,
        })
    }
}
