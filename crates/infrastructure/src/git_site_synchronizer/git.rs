use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

/// Runs non-interactive git processes with the configured transport identity.
#[derive(Debug, Clone)]
pub(super) struct GitRunner {
    ssh_command: Option<String>,
    timeout: Duration,
}

impl GitRunner {
    pub(super) fn new(ssh_private_key_path: Option<&Path>, timeout: Duration) -> Self {
        Self {
            ssh_command: ssh_private_key_path.map(ssh_command),
            timeout,
        }
    }

    /// Returns the URL handed to git, in SSH form when a deploy key is configured.
    pub(super) fn remote_url(&self, repository_url: &str) -> String {
        match (
            &self.ssh_command,
            repository_url.strip_prefix("https://github.com/"),
        ) {
            (Some(_), Some(path)) => format!("git@github.com:{path}"),
            _ => repository_url.to_owned(),
        }
    }

    /// Runs one git command and returns its captured stderr on failure.
    pub(super) async fn run(&self, work_dir: Option<&Path>, args: &[&str]) -> Result<(), String> {
        let mut command = Command::new("git");
        if let Some(work_dir) = work_dir {
            command.arg("-C").arg(work_dir);
        }
        command
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ssh_command) = &self.ssh_command {
            command.env("GIT_SSH_COMMAND", ssh_command);
        }

        let summary = args.first().copied().unwrap_or("git");
        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                format!(
                    "git {summary} timed out after {}s",
                    self.timeout.as_secs()
                )
            })?
            .map_err(|error| format!("failed to run git {summary}: {error}"))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(format!(
            "git {summary} failed ({}): {}",
            output.status,
            stderr.trim()
        ))
    }
}

fn ssh_command(key_path: &Path) -> String {
    format!(
        "ssh -i {} -o IdentitiesOnly=yes -o StrictHostKeyChecking=no -o UserKnownHostsFile=/dev/null -o BatchMode=yes",
        shell_quote(key_path)
    )
}

/// GIT_SSH_COMMAND goes through a shell.
fn shell_quote(path: &Path) -> String {
    let value = path.display().to_string();
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use super::GitRunner;

    #[test]
    fn github_https_urls_switch_to_ssh_with_deploy_key() {
        let runner = GitRunner::new(Some(Path::new("/keys/deploy")), Duration::from_secs(5));
        assert_eq!(
            runner.remote_url("https://github.com/org/demo.git"),
            "git@github.com:org/demo.git"
        );
        assert_eq!(
            runner.remote_url("https://gitlab.com/org/demo.git"),
            "https://gitlab.com/org/demo.git"
        );
    }

    #[test]
    fn urls_are_untouched_without_deploy_key() {
        let runner = GitRunner::new(None, Duration::from_secs(5));
        assert_eq!(
            runner.remote_url("https://github.com/org/demo.git"),
            "https://github.com/org/demo.git"
        );
    }

    #[test]
    fn ssh_command_quotes_key_and_disables_prompts() {
        let runner = GitRunner::new(
            Some(Path::new("/keys/it's here")),
            Duration::from_secs(5),
        );
        let command = runner.ssh_command.unwrap_or_default();
        assert!(command.starts_with(r"ssh -i '/keys/it'\''s here'"));
        assert!(command.contains("StrictHostKeyChecking=no"));
        assert!(command.contains("BatchMode=yes"));
    }
}
