//! Program launching for `QuiverCore`.
//!
//! The session decides *what* to run; this module owns *how*. The
//! default launcher detaches the child completely so the launcher
//! window can hide (or exit) without taking the program with it.

use crate::{Error, Result};
use std::process::{Command, Stdio};
use tracing::info;

/// Collaborator that runs a resolved program.
pub trait ProgramLauncher {
    /// Run `path` with the given whitespace-joined argument string.
    ///
    /// # Errors
    ///
    /// Returns an error when the program cannot be spawned.
    fn run(&self, path: &str, args: &str) -> Result<()>;
}

/// Launcher that spawns the program detached and forgets it.
pub struct DetachedLauncher;

impl ProgramLauncher for DetachedLauncher {
    fn run(&self, path: &str, args: &str) -> Result<()> {
        info!("Launching {} {}", path, args);
        let mut command = Command::new(path);
        if !args.is_empty() {
            command.args(args.split_whitespace());
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Launch(format!("{path}: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_a_launch_error() {
        let launcher = DetachedLauncher;
        let err = launcher.run("/no/such/program", "").unwrap_err();
        assert!(matches!(err, Error::Launch(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_spawns_existing_program() {
        let launcher = DetachedLauncher;
        launcher.run("/bin/true", "").unwrap();
        launcher.run("/bin/true", "one two").unwrap();
    }
}
