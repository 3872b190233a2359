use super::{Stage, StageContext, StageDriver};
use crate::additional::compute_additional_scripts;
use crate::error::Result;
use crate::script::Script;

/// Brings the instance up on its host. The backend's start fragment is always
/// emitted, whatever changed.
pub struct StartInstance;

impl StageDriver for StartInstance {
    fn stage(&self) -> Stage {
        Stage::StartInstance
    }

    fn compose(&self, ctx: &StageContext<'_>) -> Result<Script> {
        let stage = self.stage();
        let (instance, backend) = ctx.resolve(stage)?;
        let scripts = backend.start_instance();

        let mut script = Script::strict(stage.head_comment());

        if ctx.flags.artifacts {
            script.push(scripts.artifacts_script(&instance)?);
        }
        if ctx.flags.data {
            script.push(scripts.data_script(&instance)?);
        }
        script.push(scripts.deployment_script(&instance)?);

        compute_additional_scripts(script, &instance, stage, ctx.additional_scripts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::additional::NoAdditionalScripts;
    use crate::backend::BackendRegistry;
    use crate::fragments;
    use crate::instance::fixtures::{cambodia1, CAMBODIA_UUID};
    use crate::proxy::ProxyRegistry;
    use crate::script::STRICT_MODE;
    use crate::stage::ChangeFlags;
    use crate::store::MemoryStore;
    use std::path::Path;

    fn compose(flags: ChangeFlags) -> Script {
        let store = MemoryStore::new().with(cambodia1());
        let backends = BackendRegistry::builtin();
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
        StartInstance.compose(&ctx).unwrap()
    }

    #[test]
    fn services_come_up_even_when_nothing_changed() {
        let instance = cambodia1();
        let script = compose(ChangeFlags::default());

        assert_eq!(
            script.body(),
            &[
                STRICT_MODE.to_string(),
                fragments::remote(
                    instance.ssh(),
                    "cd /var/docker-volumes/cambodia1/bahmni_docker && docker-compose -p cambodia1 \
                     --env-file=/var/docker-volumes/cambodia1/cambodia1.env up -d proxy openmrs mysql",
                    true
                ),
            ]
        );
    }

    #[test]
    fn compose_backend_adds_nothing_for_data_or_artifacts() {
        assert_eq!(compose(ChangeFlags::all()), compose(ChangeFlags::default()));
    }
}
