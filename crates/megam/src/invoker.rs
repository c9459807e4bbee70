//! Running the megam binary.
//!
//! [`Megam`] owns a [`MegamConfig`] and the path it resolves to. The path is
//! resolved lazily on the first [`call`](Megam::call) or eagerly with
//! [`configure`](Megam::configure); after that it stays fixed until the next
//! `configure`.
//!
//! # Thread Safety
//!
//! `Megam` is `Send + Sync`. Concurrent calls each spawn their own child
//! process; nothing is queued or serialized beyond the brief lock taken to
//! read the resolved path.

use parking_lot::RwLock;
use std::ffi::OsStr;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, error};

use crate::config::MegamConfig;
use crate::error::{MegamError, Result};
use crate::locator;

/// Handle to an external megam binary.
#[derive(Debug, Default)]
pub struct Megam {
    state: RwLock<State>,
}

#[derive(Debug, Default)]
struct State {
    config: MegamConfig,
    binary: Option<PathBuf>,
}

static_assertions::assert_impl_all!(Megam: Send, Sync);

impl Megam {
    /// Create a handle that will resolve the binary from `config` on first use.
    pub fn new(config: MegamConfig) -> Self {
        Self {
            state: RwLock::new(State {
                config,
                binary: None,
            }),
        }
    }

    /// Create a handle for the binary at `path`, resolving it immediately.
    pub fn with_binary(path: impl Into<PathBuf>) -> Result<Self> {
        let megam = Self::new(MegamConfig::builder().binary(path).build()?);
        megam.resolve()?;
        Ok(megam)
    }

    /// Set the explicit binary path (or clear it with `None`) and resolve.
    ///
    /// The new setting is kept even if resolution fails, so a later
    /// [`call`](Self::call) fails the same way instead of searching elsewhere.
    /// The last call wins.
    pub fn configure(&self, binary: Option<&Path>) -> Result<PathBuf> {
        let mut state = self.state.write();
        state.config.binary = binary.map(Path::to_path_buf);
        state.binary = None;

        let path = locator::locate(&state.config)?;
        state.binary = Some(path.clone());
        Ok(path)
    }

    /// The resolved binary path, if resolution has happened.
    pub fn binary(&self) -> Option<PathBuf> {
        self.state.read().binary.clone()
    }

    /// A copy of the current configuration.
    pub fn config(&self) -> MegamConfig {
        self.state.read().config.clone()
    }

    /// Return the resolved binary path, resolving it with the current
    /// configuration if needed.
    pub fn resolve(&self) -> Result<PathBuf> {
        if let Some(path) = &self.state.read().binary {
            return Ok(path.clone());
        }

        let mut state = self.state.write();
        if let Some(path) = &state.binary {
            return Ok(path.clone());
        }
        let path = locator::locate(&state.config)?;
        state.binary = Some(path.clone());
        Ok(path)
    }

    /// Run megam with `args` and return its captured stdout.
    ///
    /// Each element of `args` is passed to the process as one argument; no
    /// shell is involved. The call blocks until megam exits.
    ///
    /// # Errors
    ///
    /// - [`MegamError::InvalidArguments`] if `args` is empty or an argument
    ///   contains a NUL byte (checked before the binary is resolved)
    /// - a lookup error if the binary cannot be resolved
    /// - [`MegamError::Io`] if the process cannot be spawned
    /// - [`MegamError::ExecutionFailed`] if megam exits unsuccessfully; its
    ///   stderr is echoed to our stderr, logged and kept in the error
    pub fn call<S>(&self, args: &[S]) -> Result<Vec<u8>>
    where
        S: AsRef<OsStr>,
    {
        check_args(args)?;
        let binary = self.resolve()?;

        debug!(
            "Running {} {}",
            binary.display(),
            args.iter()
                .map(|a| a.as_ref().to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let output = Command::new(&binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        if !output.status.success() {
            echo_stderr(&output.stderr);
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            error!("{} failed ({}):\n{}", binary.display(), output.status, stderr);
            return Err(MegamError::ExecutionFailed {
                code: output.status.code(),
                stderr,
            });
        }

        debug!("megam wrote {} bytes to stdout", output.stdout.len());
        Ok(output.stdout)
    }
}

/// Forward megam's diagnostics to the caller's error stream.
fn echo_stderr(bytes: &[u8]) {
    let mut err = io::stderr().lock();
    if let Err(e) = err.write_all(bytes).and_then(|()| err.flush()) {
        debug!("Could not echo megam stderr: {}", e);
    }
}

fn check_args<S: AsRef<OsStr>>(args: &[S]) -> Result<()> {
    if args.is_empty() {
        return Err(MegamError::InvalidArguments(
            "args should be a non-empty list of argument tokens".to_string(),
        ));
    }
    for arg in args {
        let arg: &OsStr = arg.as_ref();
        if arg.as_encoded_bytes().contains(&0) {
            return Err(MegamError::InvalidArguments(format!(
                "argument {arg:?} contains a NUL byte"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_binary_config() -> MegamConfig {
        MegamConfig::builder()
            .binary("/definitely/not/a/real/megam")
            .build()
            .unwrap()
    }

    #[test]
    fn test_empty_args_rejected_before_resolution() {
        let megam = Megam::new(missing_binary_config());
        let err = megam.call::<&str>(&[]).unwrap_err();
        assert!(matches!(err, MegamError::InvalidArguments(_)));
        assert!(megam.binary().is_none());
    }

    #[test]
    fn test_nul_byte_rejected() {
        let megam = Megam::new(missing_binary_config());
        let err = megam.call(&["-repeat", "1\0"]).unwrap_err();
        assert!(matches!(err, MegamError::InvalidArguments(_)));
    }

    #[test]
    fn test_explicit_missing_path_fails_lookup_on_call() {
        let megam = Megam::new(missing_binary_config());
        let err = megam.call(&["-help"]).unwrap_err();
        assert!(matches!(err, MegamError::ExplicitPathMissing { .. }));
    }

    #[test]
    fn test_failed_configure_is_sticky() {
        let megam = Megam::default();
        let missing = Path::new("/definitely/not/a/real/megam");
        assert!(megam.configure(Some(missing)).unwrap_err().is_lookup());
        assert_eq!(megam.config().binary.as_deref(), Some(missing));

        let err = megam.call(&["-help"]).unwrap_err();
        assert!(matches!(err, MegamError::ExplicitPathMissing { .. }));
    }

    #[test]
    fn test_with_binary_missing() {
        let err = Megam::with_binary("/definitely/not/a/real/megam").unwrap_err();
        assert!(err.is_lookup());
    }
}
