//! Provider orchestration: registry, routing, performance tracking, and
//! multi-agent fusion over the model adapters in `quorum-models`.
//!
//! The two entry points are [`IntelligentRouter`] for single-provider
//! routed requests and [`FusionEngine`] for multi-agent fusion. Both are
//! constructed at the application composition root and share one
//! [`PerformanceTracker`] and one [`SettingsStore`].

pub mod fusion;
pub mod registry;
pub mod routing;
pub mod settings;
pub mod source;

pub use fusion::{
    AgentResponse, AgentRole, FusionConfig, FusionEngine, FusionError, FusionProviderConfig,
    FusionResponse, PromptAnalysis, PromptCategory,
};
pub use registry::{
    Feature, FeatureSet, ProviderProfile, ProviderRegistry, RegistryConfigError,
    RegistryConfigLoader,
};
pub use routing::{
    IntelligentRouter, Observation, PerformanceMetrics, PerformanceTracker, ResponseType,
    RouteOutcome, RoutePriority, RouteRequest, RoutingError, TaskAnalysis, TaskAnalyzer,
    TaskComplexity,
};
pub use settings::{MemorySettings, SettingsStore, FUSION_MODE_KEY};
pub use source::{FactorySource, ModelSource};
