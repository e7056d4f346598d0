//! Model routing
//!
//! A logical model identifier is a `"<provider> <variant>"` pair, e.g.
//! `"openai gpt-4.1-mini"`. Resolution happens at this single lookup point
//! with an explicit not-found outcome; there is no fallback provider.

use super::provider::Provider;
use crate::{KibitzError, Result};
use std::fmt;
use std::sync::Arc;

/// A parsed logical model identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelId {
    pub provider: String,
    pub variant: String,
}

impl ModelId {
    /// Parse a `"<provider> <variant>"` identifier. Anything else is a
    /// `ModelNotFound` client error.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        match raw.split_once(' ') {
            Some((provider, variant)) if !provider.is_empty() && !variant.trim().is_empty() => {
                Ok(Self {
                    provider: provider.to_string(),
                    variant: variant.trim().to_string(),
                })
            }
            _ => Err(KibitzError::ModelNotFound(raw.to_string())),
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.provider, self.variant)
    }
}

/// The closed set of registered providers
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.push(provider);
    }

    pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.register(provider);
        self
    }

    /// Resolve a logical model name to its provider and variant
    pub fn resolve(&self, model: &str) -> Result<(Arc<dyn Provider>, ModelId)> {
        let id = ModelId::parse(model)?;
        self.providers
            .iter()
            .find(|p| p.name() == id.provider)
            .cloned()
            .map(|p| (p, id.clone()))
            .ok_or_else(|| KibitzError::ModelNotFound(model.trim().to_string()))
    }

    /// Names of every registered provider, for the model-list endpoint
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
