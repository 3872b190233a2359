use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

use super::ProxyFlavor;
use crate::error::{Error, Result};
use crate::shell::quote_arg;

/// Apache httpd virtual host in front of the instance.
pub struct Apache2;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Apache2Value {
    server_name: String,
    target: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_conf_dir")]
    conf_dir: String,
}

fn default_port() -> u16 {
    80
}

fn default_conf_dir() -> String {
    "/etc/httpd/conf.d".to_string()
}

impl Apache2Value {
    fn parse(value: &Value) -> Result<Self> {
        let parsed: Self = serde_json::from_value(value.clone()).map_err(|e| {
            Error::config_invalid_value("proxies.value", Some(value.to_string()), e.to_string())
        })?;

        if parsed.server_name.is_empty()
            || parsed
                .server_name
                .contains(|c: char| c.is_whitespace() || c == '/')
        {
            return Err(Error::config_invalid_value(
                "proxies.value.serverName",
                Some(parsed.server_name),
                "must be a bare host name",
            ));
        }
        if !(parsed.target.starts_with("http://") || parsed.target.starts_with("https://")) {
            return Err(Error::config_invalid_value(
                "proxies.value.target",
                Some(parsed.target),
                "must be an http:// or https:// URL",
            ));
        }
        check_url_token("proxies.value.target", &parsed.target)?;
        Ok(parsed)
    }
}

/// URLs land verbatim inside the vhost heredoc, so they must be one token.
fn check_url_token(field: &str, url: &str) -> Result<()> {
    if url.contains(|c: char| c.is_whitespace() || c.is_control()) {
        return Err(Error::config_invalid_value(
            field,
            Some(url.to_string()),
            "must not contain whitespace or control characters",
        ));
    }
    Ok(())
}

impl ProxyFlavor for Apache2 {
    fn proxy_type(&self) -> &'static str {
        "apache2"
    }

    fn create_proxy(
        &self,
        value: &Value,
        maintenance_url: Option<&str>,
        selinux: bool,
    ) -> Result<String> {
        let config = Apache2Value::parse(value)?;
        let maintenance_url = maintenance_url.filter(|u| !u.is_empty());
        if let Some(url) = maintenance_url {
            check_url_token("deployment.maintenanceUrl", url)?;
        }
        let target = format!("{}/", config.target.trim_end_matches('/'));
        let conf_file = Path::new(&config.conf_dir)
            .join(format!("{}.conf", config.server_name))
            .display()
            .to_string();

        let mut vhost = format!(
            "<VirtualHost *:{}>\n    ServerName {}\n    ProxyPreserveHost On\n    ProxyPass / {}\n    ProxyPassReverse / {}\n",
            config.port, config.server_name, target, target
        );
        if let Some(url) = maintenance_url {
            vhost.push_str(&format!("    ErrorDocument 503 {}\n", url));
        }
        vhost.push_str("</VirtualHost>\n");

        let mut fragment = format!("sudo mkdir -p {}\n", quote_arg(&config.conf_dir));
        fragment.push_str(&format!(
            "cat <<'PROXY_CONF' | sudo tee {} > /dev/null\n{}PROXY_CONF\n",
            quote_arg(&conf_file),
            vhost
        ));
        if selinux {
            fragment.push_str("sudo setsebool -P httpd_can_network_connect 1\n");
        }
        fragment.push_str("sudo apachectl graceful\n");

        Ok(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn value() -> Value {
        json!({ "serverName": "cambodia1.mekomsolutions.net", "target": "http://localhost:8180/" })
    }

    #[test]
    fn writes_vhost_and_reloads() {
        let fragment = Apache2.create_proxy(&value(), None, false).unwrap();
        assert_eq!(
            fragment,
            "sudo mkdir -p /etc/httpd/conf.d\n\
             cat <<'PROXY_CONF' | sudo tee /etc/httpd/conf.d/cambodia1.mekomsolutions.net.conf > /dev/null\n\
             <VirtualHost *:80>\n    ServerName cambodia1.mekomsolutions.net\n    ProxyPreserveHost On\n    \
             ProxyPass / http://localhost:8180/\n    ProxyPassReverse / http://localhost:8180/\n\
             </VirtualHost>\nPROXY_CONF\nsudo apachectl graceful\n"
        );
    }

    #[test]
    fn maintenance_url_and_selinux_are_optional_extras() {
        let fragment = Apache2
            .create_proxy(&value(), Some("https://status.example.org/maintenance"), true)
            .unwrap();
        assert!(fragment.contains("    ErrorDocument 503 https://status.example.org/maintenance\n"));
        assert!(fragment.contains("sudo setsebool -P httpd_can_network_connect 1\n"));
    }

    #[test]
    fn rejects_non_http_target() {
        let err = Apache2
            .create_proxy(&json!({ "serverName": "a.b", "target": "localhost:80" }), None, false)
            .unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
    }

    #[test]
    fn multi_line_target_cannot_escape_the_vhost_heredoc() {
        let value = json!({
            "serverName": "a.b",
            "target": "http://x\nPROXY_CONF\ntouch /tmp/owned\n"
        });
        let err = Apache2.create_proxy(&value, None, false).unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
        assert_eq!(err.details["key"], "proxies.value.target");
    }

    #[test]
    fn multi_line_maintenance_url_is_rejected() {
        let err = Apache2
            .create_proxy(&value(), Some("https://m\nPROXY_CONF\nrm -rf /srv\n"), false)
            .unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
        assert_eq!(err.details["key"], "deployment.maintenanceUrl");
    }

    #[test]
    fn rejects_missing_server_name() {
        assert!(Apache2
            .create_proxy(&json!({ "target": "http://x" }), None, false)
            .is_err());
    }
}
