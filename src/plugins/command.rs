//! External program plugins
//!
//! Runs `program` directly (no shell) with the manifest's argument list.
//! `{root}` in an argument is replaced with the first dispatch argument;
//! remaining dispatch arguments are appended.

use super::record::PluginExecute;
use super::PluginError;

const ROOT_PLACEHOLDER: &str = "{root}";

#[derive(Debug, Clone)]
pub struct CommandPlugin {
    name: String,
    program: String,
    args: Vec<String>,
}

impl CommandPlugin {
    pub fn new(name: impl Into<String>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
        }
    }

    /// Final argument vector for one invocation
    fn build_args(&self, dispatch_args: &[String]) -> Vec<String> {
        let uses_root = self.args.iter().any(|a| a.contains(ROOT_PLACEHOLDER));
        let (root, rest) = match (uses_root, dispatch_args.split_first()) {
            (true, Some((root, rest))) => (root.as_str(), rest),
            _ => ("", dispatch_args),
        };

        self.args
            .iter()
            .map(|arg| arg.replace(ROOT_PLACEHOLDER, root))
            .chain(rest.iter().cloned())
            .collect()
    }

    fn failed(&self, reason: impl Into<String>) -> PluginError {
        PluginError::ExecutionFailed {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }
}

impl PluginExecute for CommandPlugin {
    fn execute(&self, args: &[String]) -> Result<Option<String>, PluginError> {
        let argv = self.build_args(args);
        tracing::info!(plugin = %self.name, program = %self.program, "Running plugin program");

        let output = duct::cmd(&self.program, &argv)
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .map_err(|e| self.failed(format!("failed to start '{}': {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failed(format!(
                "exit {:?}: {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!stdout.is_empty()).then_some(stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_root_placeholder_consumes_first_arg() {
        let plugin = CommandPlugin::new("p", "echo", strings(&["--dir={root}"]));
        assert_eq!(
            plugin.build_args(&strings(&["/data", "extra"])),
            strings(&["--dir=/data", "extra"])
        );
    }

    #[test]
    fn test_args_appended_without_placeholder() {
        let plugin = CommandPlugin::new("p", "echo", strings(&["done"]));
        assert_eq!(
            plugin.build_args(&strings(&["/data"])),
            strings(&["done", "/data"])
        );
    }

    #[test]
    fn test_placeholder_without_dispatch_args() {
        let plugin = CommandPlugin::new("p", "echo", strings(&["{root}"]));
        assert_eq!(plugin.build_args(&[]), strings(&[""]));
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_program_and_trims_stdout() {
        let plugin = CommandPlugin::new("p", "echo", strings(&["organized", "{root}"]));
        let result = plugin.execute(&strings(&["/data"])).unwrap();
        assert_eq!(result, Some("organized /data".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_empty_output_is_none() {
        let plugin = CommandPlugin::new("p", "true", Vec::new());
        assert_eq!(plugin.execute(&[]).unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_carries_stderr() {
        let plugin = CommandPlugin::new("p", "sh", strings(&["-c", "echo boom >&2; exit 3"]));
        let err = plugin.execute(&[]).unwrap_err();
        match err {
            PluginError::ExecutionFailed { name, reason } => {
                assert_eq!(name, "p");
                assert!(reason.contains("boom"));
                assert!(reason.contains("3"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_program_is_execution_failure() {
        let plugin = CommandPlugin::new("p", "definitely-not-a-real-program-4821", Vec::new());
        assert!(matches!(
            plugin.execute(&[]),
            Err(PluginError::ExecutionFailed { .. })
        ));
    }
}
