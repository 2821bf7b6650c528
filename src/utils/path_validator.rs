use crate::error::{FleetError, Result};
use std::path::{Path, PathBuf};

const FORBIDDEN: &[&str] = &["/etc", "/sys", "/proc", "/dev", "/boot"];

/// Guards the directories the fleet tools read from and write into.
pub struct PathValidator;

impl PathValidator {
    /// Validates and canonicalises an existing user-supplied directory
    /// (`--target-dir`, `--reports-dir`, the backups being pruned).
    pub fn validate_base_dir(path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();

        let canonical = path.canonicalize().map_err(|e| {
            FleetError::Precondition(format!("Invalid directory '{}': {e}", path.display()))
        })?;

        if !canonical.is_dir() {
            return Err(FleetError::Precondition(format!(
                "Path '{}' is not a directory",
                canonical.display()
            )));
        }

        reject_system_dir(path, &canonical)?;
        Ok(canonical)
    }

    /// Checks a directory the tools will create and write into
    /// (`--backup-dir`, `--report-dir`). It may not exist yet, so the
    /// nearest existing ancestor is what gets resolved.
    pub fn validate_output_dir(path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();

        let resolved = path
            .ancestors()
            .map(|a| if a.as_os_str().is_empty() { Path::new(".") } else { a })
            .find_map(|a| a.canonicalize().ok())
            .ok_or_else(|| {
                FleetError::Precondition(format!("Invalid directory '{}'", path.display()))
            })?;

        reject_system_dir(path, &resolved)?;
        Ok(path.to_path_buf())
    }

    /// Resolves `subdir` relative to `base` and ensures it stays inside it.
    pub fn validate_subdir(base: impl AsRef<Path>, subdir: impl AsRef<Path>) -> Result<PathBuf> {
        let base = base.as_ref();
        let subdir = subdir.as_ref();

        if subdir.is_absolute() {
            return Err(FleetError::Precondition(format!(
                "Subdirectory '{}' must be relative",
                subdir.display()
            )));
        }

        let canonical_base = base.canonicalize().map_err(|e| {
            FleetError::Precondition(format!("Invalid base directory '{}': {e}", base.display()))
        })?;

        let joined = canonical_base.join(subdir);
        let canonical = joined.canonicalize().map_err(|e| {
            FleetError::Precondition(format!(
                "Invalid subdirectory '{}': {e}",
                joined.display()
            ))
        })?;

        if !canonical.starts_with(&canonical_base) {
            return Err(FleetError::Precondition(
                "Subdirectory is outside the target directory".to_string(),
            ));
        }

        Ok(canonical)
    }
}

fn reject_system_dir(path: &Path, canonical: &Path) -> Result<()> {
    for forbidden in FORBIDDEN {
        let forbidden_path = Path::new(forbidden);

        let hit = path.starts_with(forbidden_path)
            || canonical.starts_with(forbidden_path)
            || forbidden_path
                .canonicalize()
                .map(|c| canonical.starts_with(c))
                .unwrap_or(false);

        if hit {
            return Err(FleetError::Precondition(format!(
                "Access to system directory '{}' is not allowed",
                forbidden
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn validate_base_dir_accepts_directory() {
        let dir = tempdir().unwrap();
        assert!(PathValidator::validate_base_dir(dir.path()).is_ok());
    }

    #[test]
    fn validate_base_dir_rejects_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("wp-config.php");
        fs::write(&file_path, "<?php").unwrap();
        let err = PathValidator::validate_base_dir(&file_path).unwrap_err();
        assert!(matches!(err, FleetError::Precondition(_)));
    }

    #[test]
    fn validate_base_dir_rejects_system_directory() {
        assert!(PathValidator::validate_base_dir("/etc").is_err());
    }

    #[test]
    fn output_dir_may_not_exist_yet() {
        let dir = tempdir().unwrap();
        let wanted = dir.path().join("reports/nested");
        let resolved = PathValidator::validate_output_dir(&wanted).unwrap();
        assert_eq!(resolved, wanted);
        assert!(!wanted.exists());
        assert!(PathValidator::validate_output_dir("wpfleet-reports").is_ok());
    }

    #[test]
    fn output_dir_rejects_system_directories() {
        for path in ["/etc/wpfleet", "/proc/self/backups", "/etc"] {
            let err = PathValidator::validate_output_dir(path).unwrap_err();
            assert!(matches!(err, FleetError::Precondition(_)), "{path}");
        }
    }

    #[test]
    fn validate_subdir_resolves_inside_base() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("www")).unwrap();
        let resolved = PathValidator::validate_subdir(dir.path(), "www").unwrap();
        assert!(resolved.ends_with("www"));
    }

    #[test]
    fn validate_subdir_rejects_traversal() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("site");
        fs::create_dir_all(&base).unwrap();
        assert!(PathValidator::validate_subdir(&base, "..").is_err());
        assert!(PathValidator::validate_subdir(&base, "/tmp").is_err());
    }
}
