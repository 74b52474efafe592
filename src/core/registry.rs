//! Process-scoped registry of capability handles.
//!
//! Model initialization is expensive, so every detector, OCR engine and language
//! model is constructed once by the host application, wrapped in an `Arc`, and
//! registered here. Pipelines clone the handles they need; nothing in this crate
//! initializes a model or keeps global state.

use crate::core::errors::{PipelineError, PipelineResult};
use crate::core::traits::{
    DetectionSource, LanguageModelScorer, PrimaryRecognizer, SecondaryRecognizer,
};
use std::sync::Arc;

/// Ready-to-use capability handles shared read-only by all pipelines.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    detectors: Vec<Arc<dyn DetectionSource>>,
    primary: Option<Arc<dyn PrimaryRecognizer>>,
    secondary: Option<Arc<dyn SecondaryRecognizer>>,
    language_model: Option<Arc<dyn LanguageModelScorer>>,
}

impl CapabilityRegistry {
    /// Starts building a registry.
    pub fn builder() -> CapabilityRegistryBuilder {
        CapabilityRegistryBuilder::default()
    }

    /// Registered detection sources, in registration order.
    pub fn detectors(&self) -> &[Arc<dyn DetectionSource>] {
        &self.detectors
    }

    /// Names of the registered detection sources.
    pub fn detector_names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// The primary OCR engine, if registered.
    pub fn primary(&self) -> Option<&Arc<dyn PrimaryRecognizer>> {
        self.primary.as_ref()
    }

    /// The secondary OCR engine, if registered.
    pub fn secondary(&self) -> Option<&Arc<dyn SecondaryRecognizer>> {
        self.secondary.as_ref()
    }

    /// The language model, if registered.
    pub fn language_model(&self) -> Option<&Arc<dyn LanguageModelScorer>> {
        self.language_model.as_ref()
    }
}

/// Builder for [`CapabilityRegistry`].
#[derive(Debug, Default)]
pub struct CapabilityRegistryBuilder {
    detectors: Vec<Arc<dyn DetectionSource>>,
    primary: Option<Arc<dyn PrimaryRecognizer>>,
    secondary: Option<Arc<dyn SecondaryRecognizer>>,
    language_model: Option<Arc<dyn LanguageModelScorer>>,
}

impl CapabilityRegistryBuilder {
    /// Registers a detection source.
    pub fn detector(mut self, source: Arc<dyn DetectionSource>) -> Self {
        self.detectors.push(source);
        self
    }

    /// Registers the primary OCR engine.
    pub fn primary_recognizer(mut self, recognizer: Arc<dyn PrimaryRecognizer>) -> Self {
        self.primary = Some(recognizer);
        self
    }

    /// Registers the secondary OCR engine.
    pub fn secondary_recognizer(mut self, recognizer: Arc<dyn SecondaryRecognizer>) -> Self {
        self.secondary = Some(recognizer);
        self
    }

    /// Registers the language model used to score secondary transcriptions.
    pub fn language_model(mut self, model: Arc<dyn LanguageModelScorer>) -> Self {
        self.language_model = Some(model);
        self
    }

    /// Builds the registry.
    ///
    /// Fails if two detection sources share a name, since toggles address sources
    /// by name.
    pub fn build(self) -> PipelineResult<CapabilityRegistry> {
        for (i, source) in self.detectors.iter().enumerate() {
            if self.detectors[..i].iter().any(|d| d.name() == source.name()) {
                return Err(PipelineError::config_error_detailed(
                    "capability registry",
                    format!("detection source '{}' registered twice", source.name()),
                ));
            }
        }

        tracing::info!(
            target: "registry",
            detectors = ?self.detectors.iter().map(|d| d.name()).collect::<Vec<_>>(),
            primary = self.primary.as_ref().map(|p| p.name()),
            secondary = self.secondary.as_ref().map(|s| s.name()),
            language_model = self.language_model.as_ref().map(|m| m.name()),
            "Capability registry ready"
        );

        Ok(CapabilityRegistry {
            detectors: self.detectors,
            primary: self.primary,
            secondary: self.secondary,
            language_model: self.language_model,
        })
    }
}
