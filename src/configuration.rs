//! Registry of pipeline definitions and target names for one ETL
//! configuration, plus the configuration errors found while building it.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::pipeline::Pipeline;
use crate::types::EtlError;

#[derive(Default)]
pub struct Configuration {
    pipelines: RwLock<HashMap<String, Arc<dyn Pipeline>>>,
    targets: RwLock<Vec<String>>,
    errors: RwLock<Vec<Arc<EtlError>>>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_pipeline(&self, pipeline: Arc<dyn Pipeline>) -> Result<(), EtlError> {
        let name = pipeline.name().to_string();
        let mut pipelines = self.pipelines.write().unwrap_or_else(PoisonError::into_inner);
        if pipelines.contains_key(&name) {
            self.record(EtlError::DuplicatePipeline(name.clone()));
            return Err(EtlError::DuplicatePipeline(name));
        }
        tracing::debug!(pipeline = %name, "pipeline registered");
        pipelines.insert(name, pipeline);
        Ok(())
    }

    pub fn pipeline(&self, name: &str) -> Option<Arc<dyn Pipeline>> {
        self.pipelines
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn pipeline_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .pipelines
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Claims `name` for a target. A duplicate is recorded as a
    /// configuration error and returned.
    pub fn register_target(&self, name: &str) -> Result<(), EtlError> {
        let mut targets = self.targets.write().unwrap_or_else(PoisonError::into_inner);
        if targets.iter().any(|existing| existing == name) {
            self.record(EtlError::DuplicateTarget(name.to_string()));
            return Err(EtlError::DuplicateTarget(name.to_string()));
        }
        targets.push(name.to_string());
        Ok(())
    }

    /// Target names in registration order.
    pub fn targets(&self) -> Vec<String> {
        self.targets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn errors(&self) -> Vec<Arc<EtlError>> {
        self.errors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, error: EtlError) {
        tracing::warn!(%error, "configuration error");
        self.errors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pipeline_fn;
    use crate::types::PipelineError;

    fn noop(name: &str) -> Arc<dyn Pipeline> {
        Arc::new(pipeline_fn(name, |_context| async { Ok::<(), PipelineError>(()) }))
    }

    #[test]
    fn test_pipeline_lookup() {
        let configuration = Configuration::new();
        configuration.register_pipeline(noop("Orders")).unwrap();
        configuration.register_pipeline(noop("Customers")).unwrap();

        assert!(configuration.pipeline("Orders").is_some());
        assert!(configuration.pipeline("Invoices").is_none());
        assert_eq!(configuration.pipeline_names(), vec!["Customers", "Orders"]);
    }

    #[test]
    fn test_duplicates_are_recorded() {
        let configuration = Configuration::new();
        configuration.register_pipeline(noop("Orders")).unwrap();
        configuration.register_target("Load").unwrap();

        assert!(matches!(
            configuration.register_pipeline(noop("Orders")),
            Err(EtlError::DuplicatePipeline(_))
        ));
        assert!(matches!(
            configuration.register_target("Load"),
            Err(EtlError::DuplicateTarget(_))
        ));

        assert_eq!(configuration.errors().len(), 2);
        assert_eq!(configuration.targets(), vec!["Load"]);
    }
}
