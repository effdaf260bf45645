use crate::error::{MenderError, MenderResult};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Replaces the contents of the existing file at `path`. The new content is written to a
/// temporary file in the same directory, given the original's permissions, and renamed over the
/// original, so readers see either the old or the new file and never a partial one.
pub fn write_atomically(path: &Path, content: &str) -> MenderResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let io_err = |e| MenderError::io(path, e);
    let permissions = fs::metadata(path).map_err(io_err)?.permissions();
    let mut temp = NamedTempFile::new_in(dir).map_err(io_err)?;
    temp.write_all(content.as_bytes()).map_err(io_err)?;
    temp.as_file().set_permissions(permissions).map_err(io_err)?;
    temp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[cfg(all(test, not(miri)))]
mod tests {
    use super::*;
    use crate::test_util::tempdir;

    #[test]
    fn replaces_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.ts");
        fs::write(&path, "old\n").unwrap();
        write_atomically(&path, "new\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
        // Only the target remains; the temporary file was renamed over it.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.sh");
        fs::write(&path, "echo old\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        write_atomically(&path, "echo new\n").unwrap();
        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o755);
    }

    #[test]
    fn missing_target_is_an_error() {
        let dir = tempdir().unwrap();
        let error = write_atomically(&dir.path().join("gone.ts"), "x").unwrap_err();
        assert!(matches!(error, MenderError::Io { .. }));
    }
}
