use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

/// Base stagecraft config directory (~/.config/stagecraft/ on all platforms)
pub fn stagecraft() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected(
                "APPDATA environment variable not set on Windows".to_string(),
            )
        })?;
        Ok(PathBuf::from(appdata).join("stagecraft"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected(
                "HOME environment variable not set on Unix-like system".to_string(),
            )
        })?;
        Ok(PathBuf::from(home).join(".config").join("stagecraft"))
    }
}

/// Global stagecraft.json config file path
pub fn stagecraft_json() -> Result<PathBuf> {
    Ok(stagecraft()?.join("stagecraft.json"))
}

/// Expand `~` and `$VAR` in a configured path.
pub fn expand(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path).map_err(|e| {
        Error::config_invalid_value("path", Some(path.to_string()), e.to_string())
    })?;
    Ok(PathBuf::from(expanded.as_ref()))
}
