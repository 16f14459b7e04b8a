//! Integration tests for multi-agent fusion
//!
//! Tests the precondition gate, concurrent dispatch with partial-failure
//! tolerance, and end-to-end synthesis against mock adapters.

use quorum_models::{MockModel, ModelConfig, ProviderId};
use quorum_orchestrator::{
    FusionConfig, FusionEngine, FusionError, FusionProviderConfig, ModelSource, PromptCategory,
};
use quorum_abstraction::Model;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Hands out pre-registered mock adapters and counts total acquisitions.
struct CountingSource {
    models: Mutex<HashMap<ProviderId, Arc<MockModel>>>,
}

impl CountingSource {
    fn new() -> Self {
        Self { models: Mutex::new(HashMap::new()) }
    }

    fn register(&self, provider: ProviderId, model: MockModel) -> Arc<MockModel> {
        let model = Arc::new(model);
        self.models.lock().unwrap().insert(provider, Arc::clone(&model));
        model
    }

    fn total_calls(&self) -> usize {
        self.models.lock().unwrap().values().map(|m| m.calls()).sum()
    }
}

impl ModelSource for CountingSource {
    fn model(&self, config: &ModelConfig) -> Arc<dyn Model> {
        let models = self.models.lock().unwrap();
        Arc::clone(models.get(&config.provider).expect("mock registered")) as Arc<dyn Model>
    }
}

fn configured(provider: ProviderId) -> FusionProviderConfig {
    FusionProviderConfig {
        provider,
        api_key: "test-key".to_string(),
        model: "test-model".to_string(),
        enabled: true,
    }
}

/// Exactly two configured providers must fail the precondition without a
/// single network call.
#[tokio::test]
async fn test_two_providers_fail_before_any_network_call() {
    let source = Arc::new(CountingSource::new());
    source.register(ProviderId::OpenAi, MockModel::new("m".to_string()).with_response("a"));
    source.register(ProviderId::Claude, MockModel::new("m".to_string()).with_response("b"));

    let engine = FusionEngine::new(Arc::clone(&source) as Arc<dyn ModelSource>);
    let config =
        FusionConfig::new(vec![configured(ProviderId::OpenAi), configured(ProviderId::Claude)]);

    let result = engine.fuse("Test message", &config).await;
    assert!(matches!(result, Err(FusionError::InsufficientProviders(_))));
    assert_eq!(source.total_calls(), 0);
}

/// Four agents with exactly one failing upstream still fuse, and the
/// surviving responses keep their original dispatch order.
#[tokio::test]
async fn test_partial_failure_preserves_dispatch_order() {
    let source = Arc::new(CountingSource::new());
    source.register(ProviderId::OpenAi, MockModel::new("m".to_string()).with_response("openai answer"));
    source.register(ProviderId::Claude, MockModel::new("m".to_string()).failing());
    source.register(ProviderId::Gemini, MockModel::new("m".to_string()).with_response("gemini answer"));
    source.register(ProviderId::OpenRouter, MockModel::new("m".to_string()).with_response("openrouter answer"));

    let engine = FusionEngine::new(Arc::clone(&source) as Arc<dyn ModelSource>);
    let config = FusionConfig::new(vec![
        configured(ProviderId::OpenAi),
        configured(ProviderId::Claude),
        configured(ProviderId::Gemini),
        configured(ProviderId::OpenRouter),
    ]);

    let response = engine.fuse("Test message", &config).await.unwrap();
    assert_eq!(response.providers.len(), 3);
    let order: Vec<ProviderId> = response.providers.iter().map(|r| r.provider).collect();
    assert_eq!(order, vec![ProviderId::OpenAi, ProviderId::Gemini, ProviderId::OpenRouter]);
}

/// End-to-end: three canned mocks produce a final answer and the set of
/// agent responses matches the canned texts.
#[tokio::test]
async fn test_end_to_end_three_canned_providers() {
    let source = Arc::new(CountingSource::new());
    source.register(ProviderId::OpenAi, MockModel::new("m".to_string()).with_response("first canned"));
    source.register(ProviderId::Claude, MockModel::new("m".to_string()).with_response("second canned"));
    source.register(ProviderId::Gemini, MockModel::new("m".to_string()).with_response("third canned"));

    let engine = FusionEngine::new(Arc::clone(&source) as Arc<dyn ModelSource>);
    let config = FusionConfig::new(vec![
        configured(ProviderId::OpenAi),
        configured(ProviderId::Claude),
        configured(ProviderId::Gemini),
    ]);

    let response = engine.fuse("Test message", &config).await.unwrap();
    assert!(!response.final_answer.is_empty());
    assert_eq!(response.providers.len(), 3);

    let mut texts: Vec<&str> =
        response.providers.iter().map(|r| r.response.as_str()).collect();
    texts.sort_unstable();
    assert_eq!(texts, vec!["first canned", "second canned", "third canned"]);
}

/// Every agent failing surfaces `AllAgentsFailed`.
#[tokio::test]
async fn test_all_agents_failed() {
    let source = Arc::new(CountingSource::new());
    source.register(ProviderId::OpenAi, MockModel::new("m".to_string()).failing());
    source.register(ProviderId::Claude, MockModel::new("m".to_string()).failing());
    source.register(ProviderId::Gemini, MockModel::new("m".to_string()).failing());

    let engine = FusionEngine::new(Arc::clone(&source) as Arc<dyn ModelSource>);
    let config = FusionConfig::new(vec![
        configured(ProviderId::OpenAi),
        configured(ProviderId::Claude),
        configured(ProviderId::Gemini),
    ]);

    let result = engine.fuse("Test message", &config).await;
    assert!(matches!(result, Err(FusionError::AllAgentsFailed)));
}

/// The classifier output rides along on the fusion response.
#[tokio::test]
async fn test_fusion_carries_prompt_analysis() {
    let source = Arc::new(CountingSource::new());
    source.register(ProviderId::OpenAi, MockModel::new("m".to_string()).with_response("a"));
    source.register(ProviderId::Claude, MockModel::new("m".to_string()).with_response("b"));
    source.register(ProviderId::Gemini, MockModel::new("m".to_string()).with_response("c"));

    let engine = FusionEngine::new(Arc::clone(&source) as Arc<dyn ModelSource>);
    let config = FusionConfig::new(vec![
        configured(ProviderId::OpenAi),
        configured(ProviderId::Claude),
        configured(ProviderId::Gemini),
    ]);

    let response =
        engine.fuse("Write a creative story about a dragon", &config).await.unwrap();
    assert_eq!(response.analysis.category, PromptCategory::Creative);
    assert!(response.analysis.confidence > 0.0);
    assert!(response.analysis.topics.iter().any(|t| t == "dragon"));
}
