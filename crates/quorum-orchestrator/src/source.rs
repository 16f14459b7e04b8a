//! Model acquisition seam.
//!
//! The router and fusion engine obtain adapters through this trait instead
//! of calling the factory directly, so tests can hand out pre-built mocks
//! and count how many adapters were actually dispatched.

use quorum_abstraction::Model;
use quorum_models::{ModelConfig, ModelFactory};
use std::sync::Arc;

/// Provides a model adapter for a configuration.
pub trait ModelSource: Send + Sync {
    /// Returns an adapter for the given configuration.
    fn model(&self, config: &ModelConfig) -> Arc<dyn Model>;
}

/// Production source backed by [`ModelFactory`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FactorySource;

impl ModelSource for FactorySource {
    fn model(&self, config: &ModelConfig) -> Arc<dyn Model> {
        ModelFactory::create(config.clone())
    }
}
