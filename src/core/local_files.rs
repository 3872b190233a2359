use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Entry returned from directory listing
#[derive(Debug, Clone)]
pub struct Entry {
    pub path: PathBuf,
    pub is_dir: bool,
}

impl Entry {
    pub fn is_json(&self) -> bool {
        self.path.extension().is_some_and(|ext| ext == "json")
    }
}

/// A file staged next to its final location, not yet visible under its real name.
#[derive(Debug)]
pub struct StagedFile {
    tmp_path: PathBuf,
    path: PathBuf,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Trait for file system operations
pub trait FileSystem {
    fn read(&self, path: &Path) -> Result<String>;
    fn write(&self, path: &Path, content: &str) -> Result<()>;
    fn list(&self, dir: &Path) -> Result<Vec<Entry>>;
    fn ensure_dir(&self, dir: &Path) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn remove(&self, path: &Path) -> Result<()>;

    /// Write `content` to a temp file beside `path`; nothing appears at `path`
    /// until [`FileSystem::commit`].
    fn stage(&self, path: &Path, content: &str, mode: Option<u32>) -> Result<StagedFile>;
    fn commit(&self, staged: StagedFile) -> Result<()>;
    fn discard(&self, staged: StagedFile);
}

/// Local filesystem implementation
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalFs {
    fn default() -> Self {
        Self::new()
    }
}

fn tmp_path_for(path: &Path, context: &str) -> Result<PathBuf> {
    let parent = path.parent().ok_or_else(|| {
        Error::internal_io(
            format!("Invalid path: {}", path.display()),
            Some(context.to_string()),
        )
    })?;

    let filename = path.file_name().ok_or_else(|| {
        Error::internal_io(
            format!("Invalid path: {}", path.display()),
            Some(context.to_string()),
        )
    })?;

    Ok(parent.join(format!(".{}.tmp", filename.to_string_lossy())))
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| Error::internal_io(e.to_string(), Some("set permissions".to_string())))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

impl FileSystem for LocalFs {
    fn read(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::internal_io(
                    format!("File not found: {}", path.display()),
                    Some("read file".to_string()),
                )
            } else {
                Error::internal_io(e.to_string(), Some("read file".to_string()))
            }
        })
    }

    fn write(&self, path: &Path, content: &str) -> Result<()> {
        let staged = self.stage(path, content, None)?;
        self.commit(staged)
    }

    fn list(&self, dir: &Path) -> Result<Vec<Entry>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(dir)
            .map_err(|e| Error::internal_io(e.to_string(), Some("list directory".to_string())))?;

        let mut result = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let is_dir = path.is_dir();
            result.push(Entry { path, is_dir });
        }
        result.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(result)
    }

    fn ensure_dir(&self, dir: &Path) -> Result<()> {
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| {
                Error::internal_io(e.to_string(), Some("create directory".to_string()))
            })?;
        }
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn remove(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(Error::internal_io(
                e.to_string(),
                Some("remove file".to_string()),
            )),
            _ => Ok(()),
        }
    }

    fn stage(&self, path: &Path, content: &str, mode: Option<u32>) -> Result<StagedFile> {
        let tmp_path = tmp_path_for(path, "write file")?;

        fs::write(&tmp_path, content)
            .map_err(|e| Error::internal_io(e.to_string(), Some("write temp file".to_string())))?;

        if let Some(mode) = mode {
            if let Err(err) = set_mode(&tmp_path, mode) {
                let _ = fs::remove_file(&tmp_path);
                return Err(err);
            }
        }

        Ok(StagedFile {
            tmp_path,
            path: path.to_path_buf(),
        })
    }

    fn commit(&self, staged: StagedFile) -> Result<()> {
        fs::rename(&staged.tmp_path, &staged.path).map_err(|e| {
            let _ = fs::remove_file(&staged.tmp_path);
            Error::internal_io(e.to_string(), Some("rename temp file".to_string()))
        })
    }

    fn discard(&self, staged: StagedFile) {
        let _ = fs::remove_file(&staged.tmp_path);
    }
}

/// Convenience function to get local filesystem
pub fn local() -> LocalFs {
    LocalFs::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_local_fs_write_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.txt");
        let fs = local();

        fs.write(&path, "hello world").unwrap();
        let content = fs.read(&path).unwrap();
        assert_eq!(content, "hello world");
    }

    #[test]
    fn test_local_fs_list_is_sorted() {
        let dir = tempdir().unwrap();
        let fs = local();

        fs.write(&dir.path().join("b.json"), "{}").unwrap();
        fs.write(&dir.path().join("a.txt"), "text").unwrap();

        let entries = fs.list(dir.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].path.ends_with("a.txt"));

        let json_entries: Vec<_> = entries.iter().filter(|e| e.is_json()).collect();
        assert_eq!(json_entries.len(), 1);
    }

    #[test]
    fn test_staged_file_invisible_until_commit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("script.sh");
        let fs = local();

        let staged = fs.stage(&path, "echo hi", Some(0o755)).unwrap();
        assert!(!path.exists());

        fs.commit(staged).unwrap();
        assert_eq!(fs.read(&path).unwrap(), "echo hi");
    }

    #[test]
    fn test_discard_removes_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("status.json");
        let fs = local();

        let staged = fs.stage(&path, "{}", None).unwrap();
        fs.discard(staged);

        assert!(!path.exists());
        assert!(fs.list(dir.path()).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_stage_applies_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("run.sh");
        let fs = local();

        let staged = fs.stage(&path, "true", Some(0o755)).unwrap();
        fs.commit(staged).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
