use crate::error::{FleetError, Result};
use crate::utils::console;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;

/// A fully-specified external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Shell-like rendering for logs and dry-run output.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|part| {
                if part.is_empty() || part.contains(char::is_whitespace) {
                    format!("'{}'", part)
                } else {
                    part.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[cfg(test)]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    #[cfg(test)]
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Best available explanation for a failed command.
    pub fn failure_message(&self) -> String {
        let detail = if !self.stderr.trim().is_empty() {
            self.stderr.trim()
        } else {
            self.stdout.trim()
        };
        match self.status {
            Some(code) if detail.is_empty() => format!("exit code {code}"),
            Some(code) => format!("exit code {code}: {detail}"),
            None => format!("terminated by signal: {detail}"),
        }
    }

    /// Converts a nonzero exit into a `RemoteCommand` error.
    pub fn into_success(self, spec: &CommandSpec) -> Result<CommandOutput> {
        if self.success() {
            Ok(self)
        } else {
            Err(FleetError::RemoteCommand(format!(
                "'{}' failed with {}",
                spec.display(),
                self.failure_message()
            )))
        }
    }
}

/// Seam between the fleet logic and the processes it launches.
///
/// A nonzero exit status is reported through `CommandOutput`, not as an error;
/// only failing to launch the program is an `Err`.
pub trait CommandRunner: Send + Sync {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// Runs commands as child processes, capturing stdout and stderr separately.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        console::verbose(format!("exec: {}", spec.display()));

        let mut command = Command::new(&spec.program);
        command.args(&spec.args);
        if let Some(dir) = &spec.current_dir {
            command.current_dir(dir);
        }

        let output = command.output().map_err(|e| FleetError::CommandSpawn {
            program: spec.program.clone(),
            message: e.to_string(),
        })?;

        let result = CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.success() {
            console::verbose(format!(
                "'{}' returned {}",
                spec.program,
                result.failure_message()
            ));
        }

        Ok(result)
    }
}

/// Fails with a precondition error unless `program` resolves on `PATH`.
pub fn ensure_tool(program: &str) -> Result<()> {
    if find_on_path(program).is_some() {
        return Ok(());
    }
    Err(FleetError::Precondition(format!(
        "required tool '{}' was not found on PATH",
        program
    )))
}

fn find_on_path(program: &str) -> Option<PathBuf> {
    let candidate = PathBuf::from(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then_some(candidate);
    }

    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|path| path.is_file())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_arguments_with_spaces() {
        let spec = CommandSpec::new("docker")
            .args(["ps", "--format"])
            .arg("{{.Names}}\t{{.Label \"x\"}}");
        assert_eq!(
            spec.display(),
            "docker ps --format '{{.Names}}\t{{.Label \"x\"}}'"
        );
    }

    #[test]
    fn failure_message_prefers_stderr() {
        let out = CommandOutput {
            status: Some(2),
            stdout: "noise".into(),
            stderr: "Error: no such container\n".into(),
        };
        assert_eq!(out.failure_message(), "exit code 2: Error: no such container");
        assert!(!out.success());
    }

    #[test]
    fn into_success_rejects_nonzero_exit() {
        let spec = CommandSpec::new("wp").arg("plugin");
        let err = CommandOutput::failed(1, "boom").into_success(&spec).unwrap_err();
        assert!(matches!(err, FleetError::RemoteCommand(_)));
    }

    #[test]
    fn ensure_tool_rejects_missing_program() {
        let err = ensure_tool("definitely-not-a-real-tool-wpfleet").unwrap_err();
        assert!(matches!(err, FleetError::Precondition(_)));
    }

    #[test]
    fn system_runner_reports_spawn_failure() {
        let spec = CommandSpec::new("definitely-not-a-real-tool-wpfleet");
        let err = SystemCommandRunner.run(&spec).unwrap_err();
        assert!(matches!(err, FleetError::CommandSpawn { .. }));
    }
}
