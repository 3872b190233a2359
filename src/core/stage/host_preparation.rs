use super::{Stage, StageContext, StageDriver};
use crate::additional::compute_additional_scripts;
use crate::error::{Error, Result};
use crate::fragments::{self, RsyncFlags};
use crate::instance::{DataSource, InstanceDefinition};
use crate::proxy;
use crate::script::Script;

/// Prepares the remote host: directories, artifacts, the backend's
/// deployment, proxies and instance data.
///
/// Fragment order is fixed: strict mode, base directory, artifacts directory,
/// artifacts sync, backend deployment, proxies, data syncs, additional scripts.
pub struct HostPreparation;

impl StageDriver for HostPreparation {
    fn stage(&self) -> Stage {
        Stage::HostPreparation
    }

    fn compose(&self, ctx: &StageContext<'_>) -> Result<Script> {
        let stage = self.stage();
        let (instance, backend) = ctx.resolve(stage)?;
        let ssh = instance.ssh();
        let host_dir = instance.host_dir();

        let mut script = Script::strict(stage.head_comment());

        script.push(fragments::remote(
            ssh,
            &fragments::init_folder(&host_dir, &ssh.user, ssh.group(), false),
            false,
        ));

        if ctx.flags.artifacts {
            let host_artifacts_dir = instance.host_subdir("artifacts");
            script.push(fragments::remote(
                ssh,
                &fragments::init_folder(&host_artifacts_dir, &ssh.user, ssh.group(), false),
                true,
            ));
            let source = format!("{}/", ctx.artifacts_dir(&instance.uuid).display());
            script.push(fragments::rsync(
                Some(ssh),
                &source,
                &host_artifacts_dir,
                RsyncFlags::sudo(),
            ));
        }

        if ctx.flags.deployment {
            script.push(backend.host_preparation().deployment_script(&instance)?);

            for proxy in &instance.deployment.proxies {
                let fragment = proxy::create_proxy(
                    ctx.proxies,
                    proxy,
                    instance.deployment.maintenance_url.as_deref(),
                    instance.deployment.selinux,
                )?;
                script.push(fragments::remote(ssh, &fragment, false));
            }
        }

        if ctx.flags.data {
            let instance_data_dir = instance.host_subdir("data");
            for source in instance.data.iter().filter(|d| d.is_instance()) {
                let source_dir = resolve_source_data_dir(ctx, &instance, source, stage)?;
                script.push(fragments::remote(
                    ssh,
                    &fragments::rsync(None, &source_dir, &instance_data_dir, RsyncFlags::sudo()),
                    false,
                ));
            }
        }

        compute_additional_scripts(script, &instance, stage, ctx.additional_scripts)
    }
}

/// Directory to copy instance data from: an explicit `dataDir`, else the
/// data directory of the referenced instance.
fn resolve_source_data_dir(
    ctx: &StageContext<'_>,
    instance: &InstanceDefinition,
    source: &DataSource,
    stage: Stage,
) -> Result<String> {
    let value = source.instance_value()?;

    if let Some(data_dir) = value.data_dir() {
        return Ok(data_dir.to_string());
    }

    let Some(source_uuid) = value.uuid() else {
        return Err(Error::source_instance_not_found(&instance.uuid, None, stage.slug()));
    };

    match ctx.store.get_instance_definition(source_uuid)? {
        Some(source_instance) => Ok(format!("{}/", source_instance.host_subdir("data"))),
        None => Err(Error::source_instance_not_found(
            &instance.uuid,
            Some(source_uuid.to_string()),
            stage.slug(),
        )),
    }
}
