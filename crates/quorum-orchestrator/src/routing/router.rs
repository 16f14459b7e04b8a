//! Provider selection and dispatch.
//!
//! The router filters the registry down to providers that can serve the
//! request, ranks the survivors with a multiplicative score, dispatches to
//! the winner, and on failure retries the whole decision exactly once with
//! the runner-up pinned to the front.

use crate::registry::{ProviderProfile, ProviderRegistry};
use crate::routing::analyzer::TaskAnalyzer;
use crate::routing::tracker::{Observation, PerformanceMetrics, PerformanceTracker};
use crate::routing::types::{RouteOutcome, RouteRequest, RoutingError, TaskAnalysis, TaskComplexity};
use crate::settings::{api_key_setting, enabled_setting, model_setting, SettingsStore};
use crate::source::ModelSource;
use quorum_abstraction::ProviderError;
use quorum_models::{ModelConfig, ProviderId};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Historical latency bucket used by the complexity alignment table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LatencyBucket {
    Fast,
    Balanced,
    Slow,
}

impl LatencyBucket {
    fn from_average_ms(average_latency_ms: u64) -> Self {
        if average_latency_ms < 1500 {
            Self::Fast
        } else if average_latency_ms > 2500 {
            Self::Slow
        } else {
            Self::Balanced
        }
    }
}

/// Router over a provider registry, shared tracker, and model source.
pub struct IntelligentRouter {
    registry: ProviderRegistry,
    tracker: Arc<PerformanceTracker>,
    source: Arc<dyn ModelSource>,
    settings: Arc<dyn SettingsStore>,
    analyzer: TaskAnalyzer,
}

impl IntelligentRouter {
    /// Creates a router. The tracker is shared with the composition root
    /// so other call sites observe the same history.
    #[must_use]
    pub fn new(
        registry: ProviderRegistry,
        tracker: Arc<PerformanceTracker>,
        source: Arc<dyn ModelSource>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self { registry, tracker, source, settings, analyzer: TaskAnalyzer::new() }
    }

    /// Routes a request to the best available provider, with one failover
    /// attempt on dispatch failure.
    ///
    /// # Errors
    /// Returns [`RoutingError::NoSuitableProvider`] when filtering leaves
    /// no candidates, or the last dispatch error when both the primary
    /// attempt and the single failover attempt fail.
    pub async fn route(&self, request: RouteRequest) -> Result<RouteOutcome, RoutingError> {
        let mut request = request;
        let mut last_error: Option<ProviderError> = None;

        for attempt in 0..2 {
            let analysis = self.analyzer.analyze(&request.message, request.response_type);
            let ranked = self.rank_candidates(&request, &analysis)?;

            let (profile, score) = ranked[0];
            debug!(
                provider = %profile.id,
                score,
                attempt,
                candidates = ranked.len(),
                "Dispatching routed request"
            );

            match self.dispatch(profile, &request, &analysis).await {
                Ok(outcome) => return Ok(outcome),
                Err(err) => {
                    warn!(provider = %profile.id, error = %err, attempt, "Routed dispatch failed");
                    if let Err(tracker_err) = self.tracker.update(profile.id, Observation::failed())
                    {
                        warn!(error = %tracker_err, "Failed to record failure observation");
                    }

                    let fallback = ranked.get(1).map(|(p, _)| p.id);
                    last_error = Some(err);

                    match (attempt, fallback) {
                        // Re-run the whole decision with the runner-up
                        // pinned to the front of the ranked list.
                        (0, Some(next)) => request.preferred_provider = Some(next),
                        _ => break,
                    }
                }
            }
        }

        Err(RoutingError::Provider(last_error.unwrap_or_else(|| {
            ProviderError::Request("Routing failed without a dispatch error".to_string())
        })))
    }

    /// Filters and ranks candidates, honoring the preferred-provider pin.
    fn rank_candidates<'a>(
        &'a self,
        request: &RouteRequest,
        analysis: &TaskAnalysis,
    ) -> Result<Vec<(&'a ProviderProfile, f64)>, RoutingError> {
        let mut ranked: Vec<(&ProviderProfile, f64)> = self
            .registry
            .profiles()
            .filter(|profile| self.is_suitable(profile, request, analysis))
            .map(|profile| {
                let score = self.score(profile, request, analysis);
                (profile, score)
            })
            .collect();

        if ranked.is_empty() {
            return Err(RoutingError::NoSuitableProvider(format!(
                "no configured provider can serve a {} request of {} complexity",
                request.response_type, analysis.complexity
            )));
        }

        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        if let Some(preferred) = request.preferred_provider {
            if let Some(pos) = ranked.iter().position(|(p, _)| p.id == preferred) {
                let pinned = ranked.remove(pos);
                ranked.insert(0, pinned);
            }
        }

        Ok(ranked)
    }

    /// The suitability gate. Every condition must hold.
    fn is_suitable(
        &self,
        profile: &ProviderProfile,
        request: &RouteRequest,
        analysis: &TaskAnalysis,
    ) -> bool {
        if !self.is_configured(profile.id) {
            return false;
        }
        if !profile.capabilities.contains(&request.response_type) {
            return false;
        }
        if !analysis.required_features.iter().all(|f| profile.features.supports(*f)) {
            return false;
        }
        if profile.context_window < analysis.estimated_tokens {
            return false;
        }
        if let Some(max_cost) = request.max_cost_per_token {
            if profile.cost_per_token > max_cost {
                return false;
            }
        }
        if let Some(max_latency) = request.max_latency_ms {
            if profile.average_latency_ms > max_latency {
                return false;
            }
        }
        if let Some(min_reliability) = request.min_reliability {
            let success_rate = self
                .tracked_metrics(profile.id)
                .map_or(1.0, |m| m.success_rate);
            if success_rate < min_reliability {
                return false;
            }
        }
        true
    }

    /// A provider is configured when the settings store holds a key and a
    /// model for it and its enabled flag is not "false".
    fn is_configured(&self, provider: ProviderId) -> bool {
        let has_key =
            self.settings.get(&api_key_setting(provider)).is_some_and(|v| !v.is_empty());
        let has_model =
            self.settings.get(&model_setting(provider)).is_some_and(|v| !v.is_empty());
        let enabled =
            self.settings.get(&enabled_setting(provider)).map_or(true, |v| v != "false");
        has_key && has_model && enabled
    }

    /// Full multiplicative score for one candidate.
    fn score(
        &self,
        profile: &ProviderProfile,
        request: &RouteRequest,
        analysis: &TaskAnalysis,
    ) -> f64 {
        let mut score = profile.strength(request.response_type);

        if let Some(metrics) = self.tracked_metrics(profile.id) {
            score *= tracked_composite(&metrics);
        }

        score *= alignment_factor(
            analysis.complexity,
            LatencyBucket::from_average_ms(profile.average_latency_ms),
        );

        // Feature availability scaled into [0.5, 1.0].
        score *= 0.5 + 0.5 * profile.features.available_ratio();

        if profile.specialty_matches(&analysis.prompt) {
            score *= 1.2;
        }

        let recent = self.tracker.recent_performance(profile.id, 60).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read recent performance, assuming 1.0");
            1.0
        });
        score *= 0.7 + 0.3 * recent;

        // Cost factor scaled into [0.8, 1.0], only when the caller is
        // cost-constrained: cheaper providers relative to the cap score
        // higher.
        if let Some(max_cost) = request.max_cost_per_token {
            if max_cost > 0.0 {
                let relative = (profile.cost_per_token / max_cost).min(1.0);
                score *= 0.8 + 0.2 * (1.0 - relative);
            }
        }

        score
    }

    /// Router confidence in a chosen provider, clamped to [0, 1].
    fn confidence(&self, profile: &ProviderProfile, analysis: &TaskAnalysis) -> f64 {
        let mut confidence = 0.5;
        confidence += profile.strength(analysis.response_type) / 10.0 * 0.2;

        if let Some(metrics) = self.tracked_metrics(profile.id) {
            confidence += metrics.success_rate * 0.2;
            confidence -= metrics.error_rate * 0.1;
        }

        confidence += analysis.complexity.confidence_penalty();

        if profile.specialty_matches(&analysis.prompt) {
            confidence += 0.1;
        }

        confidence.clamp(0.0, 1.0)
    }

    fn tracked_metrics(&self, provider: ProviderId) -> Option<PerformanceMetrics> {
        match self.tracker.metrics(provider) {
            Ok(metrics) => metrics,
            Err(e) => {
                warn!(error = %e, "Failed to read tracked metrics, treating as untracked");
                None
            }
        }
    }

    /// Dispatches to one provider, enforcing the caller's latency ceiling
    /// as a hard deadline when present, and records the observation.
    async fn dispatch(
        &self,
        profile: &ProviderProfile,
        request: &RouteRequest,
        analysis: &TaskAnalysis,
    ) -> Result<RouteOutcome, ProviderError> {
        let api_key = self.settings.get(&api_key_setting(profile.id)).unwrap_or_default();
        let model_id = self.settings.get(&model_setting(profile.id)).unwrap_or_default();
        let model = self.source.model(&ModelConfig::new(profile.id, model_id, api_key));

        let started = Instant::now();
        let call = model.generate_text(&request.message, None);

        let response = match request.max_latency_ms {
            Some(deadline_ms) => {
                match tokio::time::timeout(std::time::Duration::from_millis(deadline_ms), call)
                    .await
                {
                    Ok(result) => result?,
                    Err(_) => {
                        return Err(ProviderError::Request(format!(
                            "provider {} exceeded the {deadline_ms}ms deadline",
                            profile.id
                        )));
                    }
                }
            }
            None => call.await?,
        };

        let latency_ms = started.elapsed().as_millis() as u64;
        let tokens = response
            .usage
            .as_ref()
            .map_or(analysis.estimated_tokens, |u| u.total_tokens);
        let cost = f64::from(tokens) * profile.cost_per_token;

        if let Err(e) = self.tracker.update(
            profile.id,
            Observation { success: true, latency_ms, cost, satisfaction: 1.0 },
        ) {
            warn!(error = %e, "Failed to record success observation");
        }

        let confidence = self.confidence(profile, analysis);
        let explanation = format!(
            "Selected {} for a {} {} request (strength {:.1}, confidence {:.2})",
            profile.id,
            analysis.complexity,
            analysis.response_type,
            profile.strength(analysis.response_type),
            confidence
        );

        info!(
            provider = %profile.id,
            latency_ms,
            confidence,
            "Routed request completed"
        );

        Ok(RouteOutcome {
            provider: profile.id,
            response: response.content,
            explanation,
            confidence,
        })
    }
}

/// Composite of tracked metrics used to scale the declared strength:
/// `successRate*0.3 + (1/latency_seconds)*0.2 + satisfaction*0.3 +
/// costEfficiency*0.2`. A zero latency average (a failure-only history)
/// contributes nothing to the latency term rather than dividing by zero.
#[must_use]
pub fn tracked_composite(metrics: &PerformanceMetrics) -> f64 {
    let latency_term = if metrics.average_latency_ms > 0.0 {
        1000.0 / metrics.average_latency_ms
    } else {
        0.0
    };
    metrics.success_rate * 0.3
        + latency_term * 0.2
        + metrics.satisfaction * 0.3
        + metrics.cost_efficiency * 0.2
}

/// Alignment between task complexity and a provider's latency bucket:
/// fast providers are favored for simple tasks, slower thorough providers
/// for expert tasks.
fn alignment_factor(complexity: TaskComplexity, bucket: LatencyBucket) -> f64 {
    match (complexity, bucket) {
        (TaskComplexity::Simple, LatencyBucket::Fast) => 1.2,
        (TaskComplexity::Simple, LatencyBucket::Balanced) => 1.0,
        (TaskComplexity::Simple, LatencyBucket::Slow) => 0.7,
        (TaskComplexity::Moderate, LatencyBucket::Fast | LatencyBucket::Balanced) => 1.1,
        (TaskComplexity::Moderate, LatencyBucket::Slow) => 0.9,
        (TaskComplexity::Complex, LatencyBucket::Fast) => 0.9,
        (TaskComplexity::Complex, LatencyBucket::Balanced | LatencyBucket::Slow) => 1.1,
        (TaskComplexity::Expert, LatencyBucket::Fast) => 0.7,
        (TaskComplexity::Expert, LatencyBucket::Balanced) => 1.0,
        (TaskComplexity::Expert, LatencyBucket::Slow) => 1.2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemorySettings;
    use quorum_abstraction::Model;
    use quorum_models::MockModel;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Source that hands out pre-registered mocks per provider.
    struct MockSource {
        models: Mutex<HashMap<ProviderId, Arc<MockModel>>>,
    }

    impl MockSource {
        fn new() -> Self {
            Self { models: Mutex::new(HashMap::new()) }
        }

        fn register(&self, provider: ProviderId, model: MockModel) -> Arc<MockModel> {
            let model = Arc::new(model);
            self.models.lock().unwrap().insert(provider, Arc::clone(&model));
            model
        }
    }

    impl ModelSource for MockSource {
        fn model(&self, config: &ModelConfig) -> Arc<dyn Model> {
            let models = self.models.lock().unwrap();
            let model = models.get(&config.provider).expect("mock registered for provider");
            Arc::clone(model) as Arc<dyn Model>
        }
    }

    fn configured_settings(providers: &[ProviderId]) -> Arc<MemorySettings> {
        let mut settings = MemorySettings::new();
        for provider in providers {
            settings = settings.with_provider(*provider, "test-key", "test-model");
        }
        Arc::new(settings)
    }

    fn router_with(
        providers: &[ProviderId],
        source: Arc<MockSource>,
    ) -> (IntelligentRouter, Arc<PerformanceTracker>) {
        let tracker = Arc::new(PerformanceTracker::new());
        let router = IntelligentRouter::new(
            ProviderRegistry::builtin(),
            Arc::clone(&tracker),
            source,
            configured_settings(providers),
        );
        (router, tracker)
    }

    #[test]
    fn test_tracked_composite_exact_formula() {
        // 0.9*0.3 + (1/1.0)*0.2 + 0.8*0.3 + 0.9*0.2 = 0.89
        let metrics = PerformanceMetrics {
            success_rate: 0.9,
            error_rate: 0.1,
            average_latency_ms: 1000.0,
            satisfaction: 0.8,
            cost_efficiency: 0.9,
        };
        let composite = tracked_composite(&metrics);
        assert!((composite - 0.89).abs() < 1e-9);
        assert!((8.0 * composite - 7.12).abs() < 1e-9);
    }

    #[test]
    fn test_tracked_composite_sub_second_latency_exceeds_one() {
        // The latency term is 1/latency_seconds with no cap, so a 500ms
        // average contributes 0.4 and the composite can exceed 1.0.
        let metrics = PerformanceMetrics {
            success_rate: 0.9,
            error_rate: 0.1,
            average_latency_ms: 500.0,
            satisfaction: 0.8,
            cost_efficiency: 0.9,
        };
        assert!((tracked_composite(&metrics) - 1.09).abs() < 1e-9);
    }

    #[test]
    fn test_tracked_composite_failure_only_history() {
        // Failed observations record zero latency; the latency term must
        // not blow up the score of a provider that has only ever failed.
        let metrics = PerformanceMetrics {
            success_rate: 0.0,
            error_rate: 1.0,
            average_latency_ms: 0.0,
            satisfaction: 0.0,
            cost_efficiency: 0.0,
        };
        assert!(tracked_composite(&metrics).abs() < 1e-9);
    }

    #[test]
    fn test_alignment_favors_fast_for_simple_and_slow_for_expert() {
        assert!(
            alignment_factor(TaskComplexity::Simple, LatencyBucket::Fast)
                > alignment_factor(TaskComplexity::Simple, LatencyBucket::Slow)
        );
        assert!(
            alignment_factor(TaskComplexity::Expert, LatencyBucket::Slow)
                > alignment_factor(TaskComplexity::Expert, LatencyBucket::Fast)
        );
    }

    #[test]
    fn test_latency_buckets() {
        assert_eq!(LatencyBucket::from_average_ms(900), LatencyBucket::Fast);
        assert_eq!(LatencyBucket::from_average_ms(2000), LatencyBucket::Balanced);
        assert_eq!(LatencyBucket::from_average_ms(2600), LatencyBucket::Slow);
    }

    #[tokio::test]
    async fn test_route_no_configured_providers() {
        let source = Arc::new(MockSource::new());
        let (router, _) = router_with(&[], source);
        let result =
            router.route(RouteRequest::new("hello", crate::routing::ResponseType::General)).await;
        assert!(matches!(result, Err(RoutingError::NoSuitableProvider(_))));
    }

    #[tokio::test]
    async fn test_route_success_records_observation() {
        let source = Arc::new(MockSource::new());
        source.register(
            ProviderId::OpenAi,
            MockModel::new("mock-openai".to_string()).with_response("routed answer"),
        );
        let (router, tracker) = router_with(&[ProviderId::OpenAi], source);

        let outcome = router
            .route(RouteRequest::new("hello there", crate::routing::ResponseType::General))
            .await
            .unwrap();
        assert_eq!(outcome.provider, ProviderId::OpenAi);
        assert_eq!(outcome.response, "routed answer");
        assert!(outcome.confidence > 0.0 && outcome.confidence <= 1.0);
        assert!(tracker.metrics(ProviderId::OpenAi).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failover_to_second_candidate() {
        let source = Arc::new(MockSource::new());
        let failing = source.register(ProviderId::Claude, MockModel::new("mock-claude".to_string()).failing());
        let healthy = source.register(
            ProviderId::OpenAi,
            MockModel::new("mock-openai".to_string()).with_response("fallback answer"),
        );
        let (router, tracker) =
            router_with(&[ProviderId::Claude, ProviderId::OpenAi], source);

        // Pin the failing provider so it is attempted first.
        let mut request =
            RouteRequest::new("write me a poem", crate::routing::ResponseType::Creative);
        request.preferred_provider = Some(ProviderId::Claude);

        let outcome = router.route(request).await.unwrap();
        assert_eq!(outcome.provider, ProviderId::OpenAi);
        assert_eq!(outcome.response, "fallback answer");
        assert_eq!(failing.calls(), 1);
        assert_eq!(healthy.calls(), 1);

        // The failed attempt was recorded against the failing provider.
        let failed_metrics = tracker.metrics(ProviderId::Claude).unwrap().unwrap();
        assert!(failed_metrics.success_rate < 1.0);
    }

    #[tokio::test]
    async fn test_both_attempts_fail_propagates_error() {
        let source = Arc::new(MockSource::new());
        source.register(ProviderId::Claude, MockModel::new("mock-claude".to_string()).failing());
        source.register(ProviderId::OpenAi, MockModel::new("mock-openai".to_string()).failing());
        let (router, _) = router_with(&[ProviderId::Claude, ProviderId::OpenAi], source);

        let result = router
            .route(RouteRequest::new("hello", crate::routing::ResponseType::General))
            .await;
        assert!(matches!(result, Err(RoutingError::Provider(_))));
    }

    #[tokio::test]
    async fn test_min_reliability_filters_tracked_provider() {
        let source = Arc::new(MockSource::new());
        source.register(
            ProviderId::OpenAi,
            MockModel::new("mock-openai".to_string()).with_response("answer"),
        );
        let (router, tracker) = router_with(&[ProviderId::OpenAi], source);

        // Drag success rate well below the requested floor.
        for _ in 0..30 {
            tracker.update(ProviderId::OpenAi, Observation::failed()).unwrap();
        }

        let mut request = RouteRequest::new("hello", crate::routing::ResponseType::General);
        request.min_reliability = Some(0.9);
        let result = router.route(request).await;
        assert!(matches!(result, Err(RoutingError::NoSuitableProvider(_))));
    }

    #[tokio::test]
    async fn test_max_latency_prefilters_slow_provider() {
        let source = Arc::new(MockSource::new());
        source.register(
            ProviderId::Gemini,
            MockModel::new("mock-gemini".to_string()).with_response("fast answer"),
        );
        source.register(
            ProviderId::OpenRouter,
            MockModel::new("mock-openrouter".to_string()).with_response("slow answer"),
        );
        let (router, _) = router_with(&[ProviderId::Gemini, ProviderId::OpenRouter], source);

        // OpenRouter's historical average (2600ms) exceeds the ceiling.
        let mut request = RouteRequest::new("hello", crate::routing::ResponseType::General);
        request.max_latency_ms = Some(1500);
        let outcome = router.route(request).await.unwrap();
        assert_eq!(outcome.provider, ProviderId::Gemini);
    }
}
