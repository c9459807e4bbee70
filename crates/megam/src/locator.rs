//! Locating the megam binary.
//!
//! # Search Order
//!
//! 1. The explicit path from [`MegamConfig::binary`], if set. A missing
//!    explicit path is an error; nothing else is searched.
//! 2. Each environment variable in [`MegamConfig::env_vars`]. The value may
//!    name the binary itself or a directory containing one of the
//!    acceptable binary names.
//! 3. Each directory on `PATH`, trying every acceptable binary name.
//!
//! The first match wins.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::MegamConfig;
use crate::error::{MegamError, Result};

/// Resolve the binary described by `config` using the process environment.
///
/// # Errors
///
/// Returns [`MegamError::ExplicitPathMissing`] if an explicit path is set but
/// is not an executable file, and [`MegamError::BinaryNotFound`] if no
/// candidate was found anywhere else.
pub fn locate(config: &MegamConfig) -> Result<PathBuf> {
    locate_with(config, |var| env::var_os(var))
}

/// Resolve the binary using `lookup` in place of the process environment.
///
/// `lookup` is consulted for every configured variable and for `PATH`.
pub fn locate_with<F>(config: &MegamConfig, lookup: F) -> Result<PathBuf>
where
    F: Fn(&str) -> Option<OsString>,
{
    let path = search(config, lookup)?;
    info!("Found {}: {}", config.name, path.display());
    Ok(path)
}

fn search<F>(config: &MegamConfig, lookup: F) -> Result<PathBuf>
where
    F: Fn(&str) -> Option<OsString>,
{
    if let Some(explicit) = &config.binary {
        if is_executable_file(explicit) {
            return Ok(explicit.clone());
        }
        return Err(MegamError::ExplicitPathMissing {
            path: explicit.clone(),
            url: config.url.clone(),
        });
    }

    let mut searched = Vec::new();

    for var in &config.env_vars {
        let Some(value) = lookup(var) else {
            searched.push(format!("${var} (unset)"));
            continue;
        };
        let value = PathBuf::from(value);
        searched.push(format!("${var} ({})", value.display()));

        if is_executable_file(&value) {
            return Ok(value);
        }
        if value.is_dir() {
            if let Some(found) = find_in_dir(&value, &config.binary_names) {
                return Ok(found);
            }
        }
        debug!("${} does not point at a usable {} binary", var, config.name);
    }

    if let Some(path_var) = lookup("PATH") {
        for dir in env::split_paths(&path_var) {
            if let Some(found) = find_in_dir(&dir, &config.binary_names) {
                return Ok(found);
            }
        }
    }
    searched.push(format!("PATH for {}", config.binary_names.join(", ")));

    Err(MegamError::BinaryNotFound {
        name: config.name.clone(),
        searched,
        url: config.url.clone(),
    })
}

fn find_in_dir(dir: &Path, names: &[String]) -> Option<PathBuf> {
    names
        .iter()
        .flat_map(|name| candidates(dir, name))
        .find(|candidate| is_executable_file(candidate))
}

fn candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    let mut out = vec![dir.join(name)];
    let suffix = env::consts::EXE_SUFFIX;
    if !suffix.is_empty() && !name.ends_with(suffix) {
        out.push(dir.join(format!("{name}{suffix}")));
    }
    out
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    #[cfg(unix)]
    fn make_executable(dir: &Path, name: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn env_of(pairs: &[(&str, OsString)]) -> impl Fn(&str) -> Option<OsString> + use<> {
        let map: HashMap<String, OsString> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_explicit_missing_path_does_not_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = MegamConfig::builder()
            .binary(dir.path().join("does-not-exist"))
            .build()
            .unwrap();

        // PATH points at a directory that would otherwise match.
        let lookup = env_of(&[("PATH", dir.path().as_os_str().to_owned())]);
        let err = locate_with(&config, lookup).unwrap_err();
        assert!(matches!(err, MegamError::ExplicitPathMissing { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = make_executable(dir.path(), "custom-megam");
        let config = MegamConfig::builder().binary(&explicit).build().unwrap();

        let found = locate_with(&config, env_of(&[])).unwrap();
        assert_eq!(found, explicit);
    }

    #[cfg(unix)]
    #[test]
    fn test_env_var_pointing_at_file() {
        let dir = tempfile::tempdir().unwrap();
        let bin = make_executable(dir.path(), "whatever");
        let config = MegamConfig::default();

        let found = locate_with(&config, env_of(&[("MEGAM", bin.clone().into())])).unwrap();
        assert_eq!(found, bin);
    }

    #[cfg(unix)]
    #[test]
    fn test_env_var_pointing_at_directory() {
        let dir = tempfile::tempdir().unwrap();
        let bin = make_executable(dir.path(), "megam_686");
        let config = MegamConfig::default();

        let lookup = env_of(&[("MEGAMHOME", dir.path().as_os_str().to_owned())]);
        assert_eq!(locate_with(&config, lookup).unwrap(), bin);
    }

    #[cfg(unix)]
    #[test]
    fn test_binary_name_order_within_directory() {
        let dir = tempfile::tempdir().unwrap();
        make_executable(dir.path(), "megam");
        let preferred = make_executable(dir.path(), "megam.opt");
        let config = MegamConfig::default();

        let lookup = env_of(&[("PATH", dir.path().as_os_str().to_owned())]);
        assert_eq!(locate_with(&config, lookup).unwrap(), preferred);
    }

    #[cfg(unix)]
    #[test]
    fn test_env_var_takes_precedence_over_path() {
        let env_dir = tempfile::tempdir().unwrap();
        let path_dir = tempfile::tempdir().unwrap();
        let from_env = make_executable(env_dir.path(), "megam");
        make_executable(path_dir.path(), "megam");

        let lookup = env_of(&[
            ("MEGAM", from_env.clone().into()),
            ("PATH", path_dir.path().as_os_str().to_owned()),
        ]);
        assert_eq!(
            locate_with(&MegamConfig::default(), lookup).unwrap(),
            from_env
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("megam"), "not a program").unwrap();

        let lookup = env_of(&[("PATH", dir.path().as_os_str().to_owned())]);
        let err = locate_with(&MegamConfig::default(), lookup).unwrap_err();
        assert!(matches!(err, MegamError::BinaryNotFound { .. }));
    }

    #[test]
    fn test_not_found_reports_search_locations() {
        let dir = tempfile::tempdir().unwrap();
        let lookup = env_of(&[
            ("MEGAM", dir.path().join("missing").into()),
            ("PATH", dir.path().as_os_str().to_owned()),
        ]);

        let err = locate_with(&MegamConfig::default(), lookup).unwrap_err();
        match err {
            MegamError::BinaryNotFound { searched, url, .. } => {
                assert!(searched[0].starts_with("$MEGAM ("));
                assert_eq!(searched[1], "$MEGAMHOME (unset)");
                assert!(searched[2].starts_with("PATH for megam.opt"));
                assert_eq!(url, crate::config::MEGAM_URL);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
