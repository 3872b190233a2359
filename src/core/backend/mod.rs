//! Deployment backends.
//!
//! A backend owns `deployment.value` and turns it into script fragments for
//! each stage and fragment category. Backends are registered under the tag
//! stored in `deployment.type`; adding one is a registration call and never
//! touches the stage drivers.

pub mod docker_compose;

use std::collections::BTreeMap;

use crate::error::Result;
use crate::instance::InstanceDefinition;
use crate::stage::Stage;

pub use docker_compose::DockerCompose;

/// Fragments a backend contributes to one stage.
///
/// Every operation may return an empty string, meaning the backend needs
/// nothing for that category; callers treat it as a no-op.
pub trait StageScripts: Send + Sync {
    fn deployment_script(&self, _instance: &InstanceDefinition) -> Result<String> {
        Ok(String::new())
    }

    fn data_script(&self, _instance: &InstanceDefinition) -> Result<String> {
        Ok(String::new())
    }

    fn artifacts_script(&self, _instance: &InstanceDefinition) -> Result<String> {
        Ok(String::new())
    }
}

/// A stage for which the backend contributes nothing.
pub struct NoFragments;

impl StageScripts for NoFragments {}

pub trait DeploymentBackend: Send + Sync {
    /// Tag matched against `deployment.type`.
    fn backend_type(&self) -> &'static str;

    fn pre_host_preparation(&self) -> &dyn StageScripts;

    fn host_preparation(&self) -> &dyn StageScripts;

    fn start_instance(&self) -> &dyn StageScripts;

    fn scripts_for(&self, stage: Stage) -> &dyn StageScripts {
        match stage {
            Stage::PreHostPreparation => self.pre_host_preparation(),
            Stage::HostPreparation => self.host_preparation(),
            Stage::StartInstance => self.start_instance(),
        }
    }
}

pub struct BackendRegistry {
    backends: BTreeMap<&'static str, Box<dyn DeploymentBackend>>,
}

impl BackendRegistry {
    pub fn empty() -> Self {
        Self {
            backends: BTreeMap::new(),
        }
    }

    /// Registry with every backend shipped in this crate.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(DockerCompose::new());
        registry
    }

    pub fn register(&mut self, backend: impl DeploymentBackend + 'static) -> &mut Self {
        self.backends.insert(backend.backend_type(), Box::new(backend));
        self
    }

    pub fn resolve(&self, backend_type: &str) -> Option<&dyn DeploymentBackend> {
        self.backends.get(backend_type).map(|b| b.as_ref())
    }

    pub fn types(&self) -> Vec<String> {
        self.backends.keys().map(|k| k.to_string()).collect()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Static;

    impl DeploymentBackend for Static {
        fn backend_type(&self) -> &'static str {
            "static"
        }
        fn pre_host_preparation(&self) -> &dyn StageScripts {
            &NoFragments
        }
        fn host_preparation(&self) -> &dyn StageScripts {
            &NoFragments
        }
        fn start_instance(&self) -> &dyn StageScripts {
            &NoFragments
        }
    }

    #[test]
    fn builtin_registry_contains_docker_compose() {
        let registry = BackendRegistry::builtin();
        assert_eq!(registry.types(), vec!["dockerCompose".to_string()]);
        assert!(registry.resolve("dockerCompose").is_some());
        assert!(registry.resolve("kubernetes").is_none());
    }

    #[test]
    fn registering_adds_a_backend() {
        let mut registry = BackendRegistry::builtin();
        registry.register(Static);
        assert_eq!(registry.types(), vec!["dockerCompose".to_string(), "static".to_string()]);
        assert_eq!(registry.resolve("static").unwrap().backend_type(), "static");
    }

    #[test]
    fn scripts_for_maps_each_stage() {
        let instance = crate::instance::fixtures::cambodia1();
        for stage in Stage::ALL {
            let scripts = Static.scripts_for(stage);
            assert_eq!(scripts.deployment_script(&instance).unwrap(), "");
            assert_eq!(scripts.data_script(&instance).unwrap(), "");
            assert_eq!(scripts.artifacts_script(&instance).unwrap(), "");
        }
    }
}
