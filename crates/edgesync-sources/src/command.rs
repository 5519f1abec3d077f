// # Command probe
//
// Runs a user-supplied shell command and extracts the first address of the
// requested family from its combined stdout and stderr. Unix prefers bash
// over sh so user commands with bashisms keep working; Windows goes
// through powershell. A non-zero exit is a failure regardless of output.

use async_trait::async_trait;
use edgesync_core::traits::AddressProbe;
use edgesync_core::{AddressFamily, Error};
use tokio::process::Command;

#[derive(Debug, Default)]
pub struct CommandProbe;

impl CommandProbe {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(windows))]
fn shell_command(script: &str) -> Command {
    let shell = if bash_available() { "bash" } else { "sh" };
    let mut cmd = Command::new(shell);
    cmd.arg("-c").arg(script);
    cmd
}

#[cfg(not(windows))]
fn bash_available() -> bool {
    std::env::var_os("PATH")
        .map(|path| std::env::split_paths(&path).any(|dir| dir.join("bash").is_file()))
        .unwrap_or(false)
}

#[cfg(windows)]
fn shell_command(script: &str) -> Command {
    let mut cmd = Command::new("powershell");
    cmd.arg("-Command").arg(script);
    cmd
}

#[async_trait]
impl AddressProbe for CommandProbe {
    async fn probe(
        &self,
        family: AddressFamily,
        value: &str,
        _pattern: Option<&str>,
    ) -> Result<String, Error> {
        if value.trim().is_empty() {
            return Err(Error::validation("Command is empty"));
        }

        let output = shell_command(value).output().await?;
        if !output.status.success() {
            return Err(Error::resolution(format!(
                "Command {:?} exited with {}: {}",
                value,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        family.find_in(&combined).ok_or_else(|| {
            Error::resolution(format!(
                "No {} address in output of command {:?}",
                family, value
            ))
        })
    }

    fn strategy_name(&self) -> &'static str {
        "command"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn extracts_address_from_command_output() {
        let probe = CommandProbe::new();
        let address = probe
            .probe(AddressFamily::V4, "echo addr=198.51.100.7", None)
            .await
            .unwrap();
        assert_eq!(address, "198.51.100.7");
    }

    #[tokio::test]
    async fn stderr_participates_in_extraction() {
        let probe = CommandProbe::new();
        let address = probe
            .probe(AddressFamily::V6, "echo 2001:db8::5 1>&2", None)
            .await
            .unwrap();
        assert_eq!(address, "2001:db8::5");
    }

    #[tokio::test]
    async fn nonzero_exit_is_a_resolution_error() {
        let probe = CommandProbe::new();
        let err = probe
            .probe(AddressFamily::V4, "echo 1.2.3.4; exit 3", None)
            .await
            .unwrap_err();
        assert!(err.is_resolution());
    }

    #[tokio::test]
    async fn empty_command_is_a_validation_error() {
        let probe = CommandProbe::new();
        let err = probe
            .probe(AddressFamily::V4, "   ", None)
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn output_without_address_is_a_resolution_error() {
        let probe = CommandProbe::new();
        let err = probe
            .probe(AddressFamily::V4, "echo nothing here", None)
            .await
            .unwrap_err();
        assert!(err.is_resolution());
    }
}
