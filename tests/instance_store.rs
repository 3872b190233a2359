use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

use stagecraft::additional::NoAdditionalScripts;
use stagecraft::backend::BackendRegistry;
use stagecraft::proxy::ProxyRegistry;
use stagecraft::stage::{ChangeFlags, Stage, StageContext};
use stagecraft::store::{self, InstanceStore, JsonDirStore};

fn definition(uuid: &str, name: &str, data: serde_json::Value) -> serde_json::Value {
    json!({
        "uuid": uuid,
        "name": name,
        "type": "prod",
        "group": "tlc",
        "deployment": {
            "hostDir": "/var/docker-volumes",
            "type": "dockerCompose",
            "value": {
                "image": "mekomsolutions/bahmni",
                "services": ["openmrs"],
                "gitUrl": "https://github.com/mekomsolutions/bahmni-docker"
            },
            "host": {
                "type": "ssh",
                "value": { "ip": "10.0.0.12", "user": "deploy" }
            }
        },
        "data": data
    })
}

fn write(dir: &Path, value: &serde_json::Value) {
    let uuid = value["uuid"].as_str().unwrap();
    fs::write(
        dir.join(format!("{}.json", uuid)),
        serde_json::to_string_pretty(value).unwrap(),
    )
    .unwrap();
}

const PROD: &str = "6f1f6a8e-2c4b-4d8e-9a57-3e0f1d7c2b10";
const STAGING: &str = "0c3a9e52-7b1d-4f0a-8c2e-5d4b6a1f9e33";

#[test]
fn data_is_copied_from_the_referenced_instance_on_disk() {
    let dir = tempdir().unwrap();
    write(dir.path(), &definition(PROD, "cambodia-prod", json!([])));
    write(
        dir.path(),
        &definition(STAGING, "cambodia-staging", json!([{ "type": "instance", "value": { "uuid": PROD } }])),
    );

    let store = JsonDirStore::new(dir.path()).with_default_ssh_port(2222);
    let backends = BackendRegistry::builtin();
    let proxies = ProxyRegistry::builtin();
    let ctx = StageContext {
        uuid: STAGING,
        flags: ChangeFlags {
            data: true,
            ..ChangeFlags::default()
        },
        store: &store,
        backends: &backends,
        proxies: &proxies,
        additional_scripts: &NoAdditionalScripts,
        artifacts_root: Path::new("/srv/artifacts"),
    };

    let script = Stage::HostPreparation.driver().compose(&ctx).unwrap();
    let body = script.body();

    assert_eq!(body.len(), 3);
    assert!(body[1].starts_with("ssh -T -p 2222 deploy@10.0.0.12 bash -s <<'STAGECRAFT_"));
    assert!(body[2].starts_with("ssh -T -p 2222 deploy@10.0.0.12 bash -s <<'STAGECRAFT_"));
    assert!(body[2].contains(
        "sudo rsync -avz /var/docker-volumes/cambodia-prod/data/ /var/docker-volumes/cambodia-staging/data\n"
    ));
}

#[test]
fn list_is_sorted_by_name_and_skips_other_files() {
    let dir = tempdir().unwrap();
    write(dir.path(), &definition(STAGING, "zeta", json!([])));
    write(dir.path(), &definition(PROD, "alpha", json!([])));
    fs::write(dir.path().join("README.md"), "not an instance").unwrap();

    let store = JsonDirStore::new(dir.path());
    let names: Vec<String> = store.list().unwrap().into_iter().map(|i| i.name).collect();
    assert_eq!(names, vec!["alpha", "zeta"]);
}

#[test]
fn fleet_validation_reports_every_problem() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        &definition(
            PROD,
            "cambodia",
            json!([{ "type": "instance", "value": { "uuid": STAGING, "dataDir": "/mnt/x" } }]),
        ),
    );
    write(dir.path(), &definition("not-a-uuid", "cambodia", json!([])));

    let err = store::validate_fleet(&JsonDirStore::new(dir.path())).unwrap_err();
    let problems = err.details["problems"].as_array().unwrap();

    assert_eq!(err.code.as_str(), "validation.multiple_errors");
    assert_eq!(problems.len(), 3);
}

#[test]
fn valid_fleet_counts_instances() {
    let dir = tempdir().unwrap();
    write(dir.path(), &definition(PROD, "cambodia-prod", json!([])));
    write(
        dir.path(),
        &definition(STAGING, "cambodia-staging", json!([{ "type": "instance", "value": { "dataDir": "/mnt/seed/" } }])),
    );

    assert_eq!(store::validate_fleet(&JsonDirStore::new(dir.path())).unwrap(), 2);
}

#[test]
fn empty_definition_on_disk_is_a_missing_instance() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(format!("{}.json", STAGING)), "{}").unwrap();

    let store = JsonDirStore::new(dir.path());
    let backends = BackendRegistry::builtin();
    let proxies = ProxyRegistry::builtin();
    let ctx = StageContext {
        uuid: STAGING,
        flags: ChangeFlags::all(),
        store: &store,
        backends: &backends,
        proxies: &proxies,
        additional_scripts: &NoAdditionalScripts,
        artifacts_root: Path::new("/srv/artifacts"),
    };

    let err = Stage::HostPreparation.driver().compose(&ctx).unwrap_err();
    assert_eq!(err.code.as_str(), "instance.not_found");
    assert_eq!(err.details["uuid"], STAGING);
    assert_eq!(err.details["stage"], "host-preparation");
}
