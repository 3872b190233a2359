use super::{Stage, StageContext, StageDriver};
use crate::additional::compute_additional_scripts;
use crate::error::Result;
use crate::script::Script;

/// Runs on the CI node before anything touches the host. Only the backend
/// contributes here.
pub struct PreHostPreparation;

impl StageDriver for PreHostPreparation {
    fn stage(&self) -> Stage {
        Stage::PreHostPreparation
    }

    fn compose(&self, ctx: &StageContext<'_>) -> Result<Script> {
        let stage = self.stage();
        let (instance, backend) = ctx.resolve(stage)?;
        let scripts = backend.pre_host_preparation();

        let mut script = Script::strict(stage.head_comment());

        if ctx.flags.deployment {
            script.push(scripts.deployment_script(&instance)?);
        }
        if ctx.flags.artifacts {
            script.push(scripts.artifacts_script(&instance)?);
        }
        if ctx.flags.data {
            script.push(scripts.data_script(&instance)?);
        }

        compute_additional_scripts(script, &instance, stage, ctx.additional_scripts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::additional::NoAdditionalScripts;
    use crate::backend::{BackendRegistry, DeploymentBackend, NoFragments, StageScripts};
    use crate::instance::fixtures::{cambodia1, CAMBODIA_UUID};
    use crate::instance::InstanceDefinition;
    use crate::proxy::ProxyRegistry;
    use crate::script::STRICT_MODE;
    use crate::stage::ChangeFlags;
    use crate::store::MemoryStore;
    use std::path::Path;

    struct Prebuild;

    impl StageScripts for Prebuild {
        fn deployment_script(&self, instance: &InstanceDefinition) -> Result<String> {
            Ok(format!("echo deploy {}\n", instance.name))
        }

        fn artifacts_script(&self, instance: &InstanceDefinition) -> Result<String> {
            Ok(format!("echo artifacts {}\n", instance.name))
        }
    }

    struct PrebuildBackend;

    impl DeploymentBackend for PrebuildBackend {
        fn backend_type(&self) -> &'static str {
            "prebuild"
        }
        fn pre_host_preparation(&self) -> &dyn StageScripts {
            &Prebuild
        }
        fn host_preparation(&self) -> &dyn StageScripts {
            &NoFragments
        }
        fn start_instance(&self) -> &dyn StageScripts {
            &NoFragments
        }
    }

    fn compose(backend_type: &str, flags: ChangeFlags) -> Result<Script> {
        let mut instance = cambodia1();
        instance.deployment.deployment_type = backend_type.to_string();
        let store = MemoryStore::new().with(instance);

        let mut backends = BackendRegistry::builtin();
        backends.register(PrebuildBackend);
        let proxies = ProxyRegistry::builtin();

        let ctx = StageContext {
            uuid: CAMBODIA_UUID,
            flags,
            store: &store,
            backends: &backends,
            proxies: &proxies,
            additional_scripts: &NoAdditionalScripts,
            artifacts_root: Path::new("/var/lib/ci/artifacts"),
        };
        PreHostPreparation.compose(&ctx)
    }

    #[test]
    fn docker_compose_contributes_nothing() {
        let script = compose("dockerCompose", ChangeFlags::all()).unwrap();
        assert_eq!(script.body(), &[STRICT_MODE.to_string()]);
    }

    #[test]
    fn backend_fragments_follow_deployment_artifacts_data_order() {
        let script = compose("prebuild", ChangeFlags::all()).unwrap();
        assert_eq!(
            script.body(),
            &[
                STRICT_MODE.to_string(),
                "echo deploy cambodia1\n".to_string(),
                "echo artifacts cambodia1\n".to_string(),
            ]
        );
    }

    #[test]
    fn flags_gate_backend_fragments() {
        let flags = ChangeFlags {
            artifacts: true,
            ..ChangeFlags::default()
        };
        let script = compose("prebuild", flags).unwrap();
        assert_eq!(script.body().len(), 2);
        assert_eq!(script.body()[1], "echo artifacts cambodia1\n");
    }

    #[test]
    fn unknown_backend_names_this_stage() {
        let err = compose("nomad", ChangeFlags::default()).unwrap_err();
        assert_eq!(err.code.as_str(), "backend.unknown");
        assert_eq!(err.details["stage"], "pre-host-preparation");
    }
}
