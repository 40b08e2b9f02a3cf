//! services/api/src/adapters/script.rs
//!
//! Implementation of the `GenerationService` port that shells out to the
//! external generation script. The script itself is a black box; this
//! adapter only owns its invocation: working directory, child environment,
//! timeout, and exit-status capture.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use copilot_core::domain::ScriptOutcome;
use copilot_core::ports::{GenerationService, PortError, PortResult};
use tokio::process::Command;
use tracing::info;

pub struct ScriptRunner {
    script: PathBuf,
    workdir: PathBuf,
    timeout: Duration,
    /// Variables layered onto the child before the contract overrides are
    /// applied, standing in for an inherited environment in tests.
    inherited_env: Vec<(String, String)>,
}

impl ScriptRunner {
    /// The child runs with the script's parent directory as its working
    /// directory, so relative output paths inside the script resolve next
    /// to it.
    pub fn new(script: PathBuf, timeout: Duration) -> Self {
        let workdir = script
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            script,
            workdir,
            timeout,
            inherited_env: Vec::new(),
        }
    }

    #[cfg(test)]
    fn with_inherited_env(mut self, key: &str, value: &str) -> Self {
        self.inherited_env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn script_exists(&self) -> bool {
        self.script.is_file()
    }

    fn command(&self) -> Command {
        let mut cmd = if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(&self.script);
            cmd
        } else {
            let mut cmd = Command::new("bash");
            cmd.arg(&self.script);
            cmd
        };
        cmd.current_dir(&self.workdir);
        for (key, value) in &self.inherited_env {
            cmd.env(key, value);
        }
        // The child must not inherit the web service's port, and gets
        // explicit markers that no server or side services should start.
        cmd.env_remove("PORT")
            .env("NO_SERVER", "1")
            .env("DISABLE_SERVICES", "1");
        cmd
    }
}

#[async_trait]
impl GenerationService for ScriptRunner {
    async fn run(&self) -> PortResult<ScriptOutcome> {
        info!("Executing generation script: {}", self.script.display());
        let status = tokio::time::timeout(self.timeout, self.command().status())
            .await
            .map_err(|_| {
                PortError::Unexpected(format!(
                    "Generation script timed out after {} seconds",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| PortError::Unexpected(format!("Script execution failed: {e}")))?;

        info!("Script execution completed with status: {}", status);
        Ok(ScriptOutcome {
            exit_code: status.code(),
        })
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;

    async fn script_with(body: &str) -> (tempfile::TempDir, ScriptRunner) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generate.sh");
        tokio::fs::write(&path, body).await.unwrap();
        let runner = ScriptRunner::new(path, Duration::from_secs(5));
        (dir, runner)
    }

    #[tokio::test]
    async fn captures_a_zero_exit() {
        let (_dir, runner) = script_with("exit 0\n").await;
        let outcome = runner.run().await.unwrap();
        assert_eq!(outcome.exit_code, Some(0));
    }

    #[tokio::test]
    async fn captures_a_nonzero_exit_without_erroring() {
        let (_dir, runner) = script_with("exit 2\n").await;
        let outcome = runner.run().await.unwrap();
        assert_eq!(outcome.exit_code, Some(2));
    }

    #[tokio::test]
    async fn child_runs_in_the_script_directory_without_port() {
        let (dir, runner) = script_with(
            "if [ -n \"$PORT\" ]; then exit 3; fi\n\
             if [ \"$NO_SERVER\" != \"1\" ]; then exit 4; fi\n\
             if [ \"$DISABLE_SERVICES\" != \"1\" ]; then exit 5; fi\n\
             echo out > produced.txt\n",
        )
        .await;
        // An inherited PORT must be stripped from the child environment.
        let runner = runner.with_inherited_env("PORT", "5000");
        let outcome = runner.run().await.unwrap();
        assert_eq!(outcome.exit_code, Some(0));
        assert!(dir.path().join("produced.txt").is_file());
    }

    #[tokio::test]
    async fn timeout_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generate.sh");
        tokio::fs::write(&path, "sleep 5\n").await.unwrap();
        let runner = ScriptRunner::new(path, Duration::from_millis(100));
        let err = runner.run().await.unwrap_err();
        assert!(matches!(err, PortError::Unexpected(_)));
    }
}
