//! Instance definitions: the declarative description of one deployable
//! application instance, as stored in the instance store.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::defaults::default_ssh_port;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDefinition {
    pub uuid: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub instance_type: String,
    #[serde(default)]
    pub group: String,
    #[serde(default = "default_active")]
    pub active: bool,
    pub deployment: Deployment,
    #[serde(default)]
    pub data: Vec<DataSource>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub host_dir: String,
    /// Backend tag, resolved through the backend registry.
    #[serde(rename = "type")]
    pub deployment_type: String,
    /// Backend-owned configuration, parsed by the backend itself.
    #[serde(default)]
    pub value: Value,
    pub host: Host,
    #[serde(default)]
    pub proxies: Vec<Proxy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_url: Option<String>,
    #[serde(default)]
    pub selinux: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Host {
    Ssh(SshHost),
}

impl Host {
    pub fn ssh(&self) -> &SshHost {
        match self {
            Host::Ssh(ssh) => ssh,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SshHost {
    pub ip: String,
    pub user: String,
    #[serde(
        default,
        deserialize_with = "deserialize_port",
        skip_serializing_if = "Option::is_none"
    )]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl SshHost {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(default_ssh_port)
    }

    /// Owning group for directories created on the host; falls back to the user.
    pub fn group(&self) -> &str {
        match self.group.as_deref() {
            Some(group) if !group.is_empty() => group,
            _ => &self.user,
        }
    }

    /// `user@ip`
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.ip)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PortRepr {
    Number(u16),
    Text(String),
}

/// Ports appear both as numbers and as strings ("22") in stored definitions.
fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<PortRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(PortRepr::Number(port)) => Ok(Some(port)),
        Some(PortRepr::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(PortRepr::Text(text)) => text
            .trim()
            .parse::<u16>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Proxy {
    #[serde(rename = "type")]
    pub proxy_type: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataSource {
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default)]
    pub value: Value,
}

/// Value of a data source of type `instance`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDataValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
}

impl InstanceDataValue {
    pub fn uuid(&self) -> Option<&str> {
        self.uuid.as_deref().filter(|s| !s.is_empty())
    }

    pub fn data_dir(&self) -> Option<&str> {
        self.data_dir.as_deref().filter(|s| !s.is_empty())
    }
}

impl DataSource {
    pub const INSTANCE: &'static str = "instance";

    pub fn is_instance(&self) -> bool {
        self.source_type == Self::INSTANCE
    }

    pub fn instance_value(&self) -> Result<InstanceDataValue> {
        if self.value.is_null() {
            return Ok(InstanceDataValue::default());
        }
        serde_json::from_value(self.value.clone()).map_err(|e| {
            Error::config_invalid_value("data.value", Some(self.value.to_string()), e.to_string())
        })
    }
}

impl InstanceDefinition {
    /// Parse a definition from JSON text.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::validation_invalid_json(e, Some("parse instance definition".to_string())))
    }

    /// `<hostDir>/<name>`: the remote directory holding all instance state.
    pub fn host_dir(&self) -> String {
        Path::new(&self.deployment.host_dir)
            .join(&self.name)
            .display()
            .to_string()
    }

    pub fn host_subdir(&self, child: &str) -> String {
        Path::new(&self.host_dir()).join(child).display().to_string()
    }

    pub fn ssh(&self) -> &SshHost {
        self.deployment.host.ssh()
    }

    /// Structural problems with this definition; empty when valid.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if uuid::Uuid::parse_str(&self.uuid).is_err() {
            problems.push(format!("'{}' is not a valid UUID", self.uuid));
        }
        if self.name.trim().is_empty() {
            problems.push(format!("instance {} has an empty name", self.uuid));
        } else if self.name.contains('/') {
            problems.push(format!("instance name '{}' must not contain '/'", self.name));
        }
        if !self.deployment.host_dir.starts_with('/') {
            problems.push(format!(
                "instance '{}': hostDir '{}' must be an absolute path",
                self.name, self.deployment.host_dir
            ));
        }
        let ssh = self.ssh();
        if ssh.ip.is_empty() || ssh.user.is_empty() {
            problems.push(format!("instance '{}': ssh host needs ip and user", self.name));
        }

        for (index, source) in self.data.iter().enumerate() {
            if !source.is_instance() {
                continue;
            }
            match source.instance_value() {
                Ok(value) if value.uuid().is_some() == value.data_dir().is_some() => {
                    problems.push(format!(
                        "instance '{}': data[{}] must set exactly one of 'uuid' or 'dataDir'",
                        self.name, index
                    ));
                }
                Ok(_) => {}
                Err(err) => problems.push(format!(
                    "instance '{}': data[{}] is malformed: {}",
                    self.name, index, err.details
                )),
            }
        }

        problems
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub const CAMBODIA_UUID: &str = "cacb5448-46b0-4808-980d-5521775671c0";

    pub fn cambodia1() -> InstanceDefinition {
        InstanceDefinition::from_json(
            r#"{
                "uuid": "cacb5448-46b0-4808-980d-5521775671c0",
                "name": "cambodia1",
                "type": "dev",
                "group": "tlc",
                "deployment": {
                    "hostDir": "/var/docker-volumes/",
                    "type": "dockerCompose",
                    "value": {
                        "image": "mekomsolutions/bahmni",
                        "tag": "cambodia-release-0.90",
                        "ports": { "443": "8733", "80": "8180" },
                        "networks": ["network1", "network2"],
                        "services": ["proxy", "openmrs", "mysql"],
                        "gitUrl": "https://github.com/mekomsolutions/bahmni-docker",
                        "commitId": "4d2c1a9"
                    },
                    "host": {
                        "type": "ssh",
                        "value": { "ip": "hsc-dev.mekomsolutions.net", "user": "mekom", "port": "22" }
                    }
                },
                "data": []
            }"#,
        )
        .unwrap()
    }
}
