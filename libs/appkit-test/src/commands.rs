//! Console command execution with captured output.
//!
//! Commands write to the `out` handle they are given; the registry runs
//! them against an in-memory buffer and returns the captured text, so
//! tests can assert on command output without touching stdout.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(
        &self,
        args: &[String],
        out: &mut (dyn std::io::Write + Send),
    ) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct CommandRegistry {
    commands: RwLock<HashMap<String, Arc<dyn Command>>>,
}

impl CommandRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, command: Arc<dyn Command>) {
        self.commands
            .write()
            .insert(command.name().to_owned(), command);
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Run a command with output redirected to an in-memory buffer; returns
    /// the captured text.
    ///
    /// # Errors
    /// Fails for unknown commands or when the command itself fails.
    pub async fn run_captured(&self, name: &str, args: &[&str]) -> anyhow::Result<String> {
        let command = {
            self.commands.read().get(name).cloned()
        }
        .ok_or_else(|| anyhow::anyhow!("unknown command '{name}'"))?;

        let args: Vec<String> = args.iter().map(|a| (*a).to_owned()).collect();
        let mut buffer: Vec<u8> = Vec::new();
        command.run(&args, &mut buffer).await?;

        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct Greet;

    #[async_trait]
    impl Command for Greet {
        fn name(&self) -> &'static str {
            "app:greet"
        }

        async fn run(
            &self,
            args: &[String],
            out: &mut (dyn std::io::Write + Send),
        ) -> anyhow::Result<()> {
            let who = args.first().map_or("world", String::as_str);
            writeln!(out, "hello {who}")?;
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Command for Failing {
        fn name(&self) -> &'static str {
            "app:fail"
        }

        async fn run(
            &self,
            _args: &[String],
            out: &mut (dyn std::io::Write + Send),
        ) -> anyhow::Result<()> {
            writeln!(out, "about to fail")?;
            anyhow::bail!("boom")
        }
    }

    #[tokio::test]
    async fn output_is_captured_and_returned() {
        let registry = CommandRegistry::new();
        registry.register(Arc::new(Greet));

        let output = registry.run_captured("app:greet", &[]).await.unwrap();
        assert_eq!(output, "hello world\n");

        let output = registry.run_captured("app:greet", &["ada"]).await.unwrap();
        assert_eq!(output, "hello ada\n");
    }

    #[tokio::test]
    async fn unknown_commands_and_failures_surface_as_errors() {
        let registry = CommandRegistry::new();
        registry.register(Arc::new(Failing));

        let err = registry.run_captured("app:ghost", &[]).await.unwrap_err();
        assert!(err.to_string().contains("unknown command"));

        let err = registry.run_captured("app:fail", &[]).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn names_are_sorted() {
        let registry = CommandRegistry::new();
        registry.register(Arc::new(Failing));
        registry.register(Arc::new(Greet));
        assert_eq!(registry.names(), vec!["app:fail", "app:greet"]);
    }
}
