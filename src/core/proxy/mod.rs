//! Reverse-proxy flavors, selected by `proxy.type`.

pub mod apache2;

use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::instance::Proxy;

pub use apache2::Apache2;

/// Produces the fragment that configures one proxy entry on the host.
pub trait ProxyFlavor: Send + Sync {
    fn proxy_type(&self) -> &'static str;

    fn create_proxy(&self, value: &Value, maintenance_url: Option<&str>, selinux: bool)
        -> Result<String>;
}

pub struct ProxyRegistry {
    flavors: BTreeMap<&'static str, Box<dyn ProxyFlavor>>,
}

impl ProxyRegistry {
    pub fn empty() -> Self {
        Self {
            flavors: BTreeMap::new(),
        }
    }

    /// Registry with every flavor shipped in this crate.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(Apache2);
        registry
    }

    pub fn register(&mut self, flavor: impl ProxyFlavor + 'static) -> &mut Self {
        self.flavors.insert(flavor.proxy_type(), Box::new(flavor));
        self
    }

    pub fn types(&self) -> Vec<String> {
        self.flavors.keys().map(|k| k.to_string()).collect()
    }

    pub fn resolve(&self, proxy_type: &str) -> Result<&dyn ProxyFlavor> {
        self.flavors
            .get(proxy_type)
            .map(|flavor| flavor.as_ref())
            .ok_or_else(|| Error::proxy_unknown(proxy_type, self.types()))
    }
}

impl Default for ProxyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Fragment configuring `proxy`, dispatched on its type.
pub fn create_proxy(
    registry: &ProxyRegistry,
    proxy: &Proxy,
    maintenance_url: Option<&str>,
    selinux: bool,
) -> Result<String> {
    registry
        .resolve(&proxy.proxy_type)?
        .create_proxy(&proxy.value, maintenance_url, selinux)
}
