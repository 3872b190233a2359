//! Fragment primitives: pure generators of script text.
//!
//! Every function here is deterministic. The same inputs always produce the
//! same bytes, so composed scripts can be diffed across builds.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::instance::SshHost;
use crate::shell::{cd_and, quote_arg};

/// Run `fragment` on `host` instead of locally.
///
/// The fragment is fed to a remote `bash -s` through a quoted heredoc, so it is
/// not expanded locally. `strict` starts the remote shell with `-e`.
pub fn remote(host: &SshHost, fragment: &str, strict: bool) -> String {
    let delimiter = heredoc_delimiter(fragment);
    let shell = if strict { "bash -se" } else { "bash -s" };

    format!(
        "ssh -T -p {} {} {} <<'{}'\n{}\n{}\n",
        host.port(),
        quote_arg(&host.destination()),
        shell,
        delimiter,
        fragment.trim_end_matches('\n'),
        delimiter
    )
}

/// Content-derived heredoc delimiter, distinct for nested wraps.
fn heredoc_delimiter(fragment: &str) -> String {
    let digest = Sha256::digest(fragment.as_bytes());
    let hex: String = digest.iter().take(6).map(|b| format!("{:02x}", b)).collect();
    format!("STAGECRAFT_{}", hex)
}

/// Ensure `path` exists and is owned by `owner:group`. Safe to re-run.
pub fn init_folder(path: &str, owner: &str, group: &str, recursive: bool) -> String {
    let path = quote_arg(path);
    let chown = if recursive { "sudo chown -R" } else { "sudo chown" };
    format!(
        "sudo mkdir -p {}\n{} {} {}\n",
        path,
        chown,
        quote_arg(&format!("{}:{}", owner, group)),
        path
    )
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RsyncFlags {
    /// Run the rsync process with root privileges on the side that writes.
    pub sudo: bool,
    /// Remove destination files absent from the source.
    pub delete: bool,
    /// With a host, pull from it instead of pushing to it.
    pub remote_src: bool,
}

impl RsyncFlags {
    pub fn sudo() -> Self {
        Self {
            sudo: true,
            ..Self::default()
        }
    }
}

/// Synchronize `source` into `destination`.
///
/// Without a host both paths are local to wherever the fragment runs (usually
/// inside a [`remote`] wrap). With a host the destination lives on it, or the
/// source when `remote_src` is set.
pub fn rsync(host: Option<&SshHost>, source: &str, destination: &str, flags: RsyncFlags) -> String {
    let mut words: Vec<String> = Vec::new();

    let Some(host) = host else {
        if flags.sudo {
            words.push("sudo".to_string());
        }
        words.push("rsync -avz".to_string());
        if flags.delete {
            words.push("--delete".to_string());
        }
        words.push(quote_arg(source));
        words.push(quote_arg(destination));
        return format!("{}\n", words.join(" "));
    };

    words.push("rsync -avz".to_string());
    if flags.delete {
        words.push("--delete".to_string());
    }
    words.push(format!("-e {}", quote_arg(&format!("ssh -p {}", host.port()))));
    if flags.sudo {
        words.push(format!("--rsync-path={}", quote_arg("sudo rsync")));
    }

    let on_host = |path: &str| quote_arg(&format!("{}:{}", host.destination(), path));
    if flags.remote_src {
        words.push(on_host(source));
        words.push(quote_arg(destination));
    } else {
        words.push(quote_arg(source));
        words.push(on_host(destination));
    }

    format!("{}\n", words.join(" "))
}

/// Clone `url` into `dir` if needed, then pin it to `commit` (or the remote head).
pub fn git_checkout(url: &str, dir: &str, commit: Option<&str>) -> String {
    let git_dir = quote_arg(&format!("{}/.git", dir.trim_end_matches('/')));
    let clone = format!(
        "if [ ! -d {} ]; then sudo git clone {} {}; fi\n",
        git_dir,
        quote_arg(url),
        quote_arg(dir)
    );

    let update = match commit.filter(|c| !c.is_empty()) {
        Some(commit) => cd_and(
            dir,
            &format!(
                "sudo git fetch --all --tags && sudo git checkout --force {}",
                quote_arg(commit)
            ),
        ),
        None => cd_and(dir, "sudo git fetch origin && sudo git reset --hard origin/HEAD"),
    };

    format!("{}{}\n", clone, update)
}

static ENV_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Write an env file at `path` with one `KEY=value` line per entry, in order.
pub fn env_file(path: &str, entries: &[(String, String)]) -> Result<String> {
    let mut lines = String::new();
    for (key, value) in entries {
        if !ENV_KEY_PATTERN.is_match(key) {
            return Err(Error::config_invalid_value(
                "envVars",
                Some(key.clone()),
                "environment variable names must match [A-Za-z_][A-Za-z0-9_]*",
            ));
        }
        if value.contains('\n') {
            return Err(Error::config_invalid_value(
                "envVars",
                Some(key.clone()),
                "environment variable values must be single-line",
            ));
        }
        lines.push_str(&format!("{}={}\n", key, value));
    }

    Ok(format!(
        "cat <<'ENV_FILE' | sudo tee {} > /dev/null\n{}ENV_FILE\n",
        quote_arg(path),
        lines
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> SshHost {
        SshHost {
            ip: "hsc-dev.mekomsolutions.net".to_string(),
            user: "mekom".to_string(),
            port: None,
            group: Some("mekom".to_string()),
        }
    }

    #[test]
    fn remote_wraps_in_heredoc() {
        let wrapped = remote(&host(), "echo hi\n", false);
        let delimiter = heredoc_delimiter("echo hi\n");
        assert_eq!(
            wrapped,
            format!(
                "ssh -T -p 22 mekom@hsc-dev.mekomsolutions.net bash -s <<'{0}'\necho hi\n{0}\n",
                delimiter
            )
        );
    }

    #[test]
    fn remote_strict_uses_errexit_shell() {
        let wrapped = remote(&host(), "true", true);
        assert!(wrapped.contains(" bash -se <<'STAGECRAFT_"));
    }

    #[test]
    fn remote_is_textually_idempotent() {
        assert_eq!(remote(&host(), "ls", false), remote(&host(), "ls", false));
    }

    #[test]
    fn nested_remote_uses_distinct_delimiters() {
        let inner = remote(&host(), "ls", false);
        let outer = remote(&host(), &inner, false);
        assert_ne!(heredoc_delimiter("ls"), heredoc_delimiter(&inner));
        assert!(outer.contains(&heredoc_delimiter("ls")));
        assert!(outer.contains(&heredoc_delimiter(&inner)));
    }

    #[test]
    fn remote_uses_custom_port() {
        let mut h = host();
        h.port = Some(2222);
        assert!(remote(&h, "ls", false).starts_with("ssh -T -p 2222 "));
    }

    #[test]
    fn init_folder_non_recursive() {
        assert_eq!(
            init_folder("/var/docker-volumes/cambodia1", "mekom", "mekom", false),
            "sudo mkdir -p /var/docker-volumes/cambodia1\nsudo chown mekom:mekom /var/docker-volumes/cambodia1\n"
        );
    }

    #[test]
    fn init_folder_recursive() {
        assert!(init_folder("/srv/a", "u", "g", true).contains("sudo chown -R u:g /srv/a"));
    }

    #[test]
    fn rsync_local() {
        assert_eq!(
            rsync(None, "/srv/source/data/", "/srv/target/data", RsyncFlags::sudo()),
            "sudo rsync -avz /srv/source/data/ /srv/target/data\n"
        );
    }

    #[test]
    fn rsync_push_to_host() {
        assert_eq!(
            rsync(Some(&host()), "/ci/artifacts/", "/srv/app/artifacts", RsyncFlags::sudo()),
            "rsync -avz -e 'ssh -p 22' --rsync-path='sudo rsync' /ci/artifacts/ mekom@hsc-dev.mekomsolutions.net:/srv/app/artifacts\n"
        );
    }

    #[test]
    fn rsync_pull_from_host_with_delete() {
        let flags = RsyncFlags {
            delete: true,
            remote_src: true,
            ..RsyncFlags::default()
        };
        assert_eq!(
            rsync(Some(&host()), "/srv/app/data/", "/backup/data", flags),
            "rsync -avz --delete -e 'ssh -p 22' mekom@hsc-dev.mekomsolutions.net:/srv/app/data/ /backup/data\n"
        );
    }

    #[test]
    fn git_checkout_pins_commit() {
        assert_eq!(
            git_checkout("https://github.com/org/repo", "/srv/app/repo", Some("abc123")),
            "if [ ! -d /srv/app/repo/.git ]; then sudo git clone https://github.com/org/repo /srv/app/repo; fi\n\
             cd /srv/app/repo && sudo git fetch --all --tags && sudo git checkout --force abc123\n"
        );
    }

    #[test]
    fn git_checkout_without_commit_tracks_head() {
        assert!(git_checkout("u", "/d", None).contains("git reset --hard origin/HEAD"));
    }

    #[test]
    fn env_file_writes_lines_in_order() {
        let entries = vec![
            ("B".to_string(), "2".to_string()),
            ("A".to_string(), "1".to_string()),
        ];
        assert_eq!(
            env_file("/srv/app/app.env", &entries).unwrap(),
            "cat <<'ENV_FILE' | sudo tee /srv/app/app.env > /dev/null\nB=2\nA=1\nENV_FILE\n"
        );
    }

    #[test]
    fn env_file_rejects_bad_keys_and_multiline_values() {
        let bad_key = vec![("1X".to_string(), "v".to_string())];
        assert!(env_file("/e", &bad_key).is_err());

        let multiline = vec![("X".to_string(), "a\nb".to_string())];
        assert!(env_file("/e", &multiline).is_err());
    }
}
