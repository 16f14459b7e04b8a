//! Single-provider routing: prompt analysis, performance tracking, and
//! scored provider selection with one-step failover.

pub mod analyzer;
pub mod router;
pub mod tracker;
pub mod types;

pub use analyzer::{estimate_token_count, TaskAnalyzer};
pub use router::{tracked_composite, IntelligentRouter};
pub use tracker::{Observation, PerformanceMetrics, PerformanceTracker};
pub use types::{
    ResponseType, RouteOutcome, RoutePriority, RouteRequest, RoutingError, TaskAnalysis,
    TaskComplexity,
};
