//! Instance store: read-only lookup of instance definitions by UUID.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::instance::{Host, InstanceDefinition};
use crate::local_files::{self, FileSystem};

pub trait InstanceStore {
    /// `Ok(None)` when no definition exists for `uuid`.
    fn get_instance_definition(&self, uuid: &str) -> Result<Option<InstanceDefinition>>;

    fn list(&self) -> Result<Vec<InstanceDefinition>>;
}

/// One `<uuid>.json` file per instance.
pub struct JsonDirStore {
    dir: PathBuf,
    default_ssh_port: Option<u16>,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            default_ssh_port: None,
        }
    }

    /// Port given to SSH hosts whose definition names none.
    pub fn with_default_ssh_port(mut self, port: u16) -> Self {
        self.default_ssh_port = Some(port);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, uuid: &str) -> Result<PathBuf> {
        if uuid.is_empty() || uuid.contains(['/', '\\']) || uuid.starts_with('.') {
            return Err(Error::validation_invalid_argument(
                "uuid",
                format!("'{}' is not a usable instance identifier", uuid),
                Some(uuid.to_string()),
                None,
            ));
        }
        Ok(self.dir.join(format!("{}.json", uuid)))
    }

    /// `Ok(None)` for a blank file or one holding an empty JSON object.
    fn read(&self, path: &Path) -> Result<Option<InstanceDefinition>> {
        let content = local_files::local().read(path)?;
        let value: serde_json::Value = match content.trim() {
            "" => return Ok(None),
            trimmed => serde_json::from_str(trimmed)
                .map_err(|e| Error::config_invalid_json(path.display().to_string(), e))?,
        };
        if value.as_object().is_some_and(|map| map.is_empty()) || value.is_null() {
            return Ok(None);
        }

        let mut instance: InstanceDefinition = serde_json::from_value(value)
            .map_err(|e| Error::config_invalid_json(path.display().to_string(), e))?;

        if let (Some(port), Host::Ssh(ssh)) = (self.default_ssh_port, &mut instance.deployment.host) {
            ssh.port.get_or_insert(port);
        }
        Ok(Some(instance))
    }
}

impl InstanceStore for JsonDirStore {
    fn get_instance_definition(&self, uuid: &str) -> Result<Option<InstanceDefinition>> {
        let path = self.path_for(uuid)?;
        if !path.exists() {
            return Ok(None);
        }
        self.read(&path)
    }

    fn list(&self) -> Result<Vec<InstanceDefinition>> {
        let entries = local_files::local().list(&self.dir)?;

        let mut items = Vec::new();
        for entry in entries.into_iter().filter(|e| e.is_json() && !e.is_dir) {
            items.extend(self.read(&entry.path)?);
        }
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }
}

/// In-memory store for tests and embedding callers.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    instances: HashMap<String, InstanceDefinition>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, instance: InstanceDefinition) -> Self {
        self.insert(instance);
        self
    }

    pub fn insert(&mut self, instance: InstanceDefinition) {
        self.instances.insert(instance.uuid.clone(), instance);
    }
}

impl InstanceStore for MemoryStore {
    fn get_instance_definition(&self, uuid: &str) -> Result<Option<InstanceDefinition>> {
        Ok(self.instances.get(uuid).cloned())
    }

    fn list(&self) -> Result<Vec<InstanceDefinition>> {
        let mut items: Vec<_> = self.instances.values().cloned().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }
}

/// Validate every definition and the uniqueness of names among active instances.
pub fn validate_fleet(store: &dyn InstanceStore) -> Result<usize> {
    let instances = store.list()?;
    let mut problems: Vec<String> = instances.iter().flat_map(|i| i.validate()).collect();

    let mut names: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for instance in instances.iter().filter(|i| i.active) {
        names
            .entry(instance.name.as_str())
            .or_default()
            .push(instance.uuid.as_str());
    }
    for (name, uuids) in names {
        if uuids.len() > 1 {
            problems.push(format!(
                "name '{}' is used by {} active instances: {}",
                name,
                uuids.len(),
                uuids.join(", ")
            ));
        }
    }

    if problems.is_empty() {
        Ok(instances.len())
    } else {
        Err(Error::validation_multiple_errors(problems))
    }
}
