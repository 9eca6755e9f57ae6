use std::process::Command;

use crate::contract::{CommandError, CommandRunner, CommandSpec};

/// Runs commands on the host with `std::process::Command`, inheriting stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<(), CommandError> {
        let shown = spec.display();
        let mut command = Command::new(&spec.program);
        command.args(&spec.args);
        if let Some(dir) = &spec.cwd {
            command.current_dir(dir);
        }

        tracing::info!(command = %shown, cwd = ?spec.cwd, "Running command");
        match command.status() {
            Ok(s) if s.success() => {
                tracing::debug!(command = %shown, status = ?s, "Command succeeded");
                Ok(())
            }
            Ok(s) => {
                tracing::error!(command = %shown, "Command exited with non-zero code: {}", s);
                Err(CommandError::Failed {
                    command: shown,
                    status: s.to_string(),
                })
            }
            Err(e) => {
                tracing::error!(error = ?e, command = %shown, "Failed to launch command");
                Err(CommandError::Launch {
                    command: shown,
                    source: e,
                })
            }
        }
    }
}
