//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::Result,
    models::Config,
    types::TestMode,
};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        // .env never overrides variables already set in the environment
        self.load_env_file()?;
        config.merge_from_env()?;

        self.apply_cli_overrides(&mut config)?;
        config.validate()?;

        Ok(config)
    }

    fn load_env_file(&self) -> Result<()> {
        EnvManager::load_env_file(self.cli.debug)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) -> Result<()> {
        if let Some(connections) = self.cli.connections {
            config.connection_count = connections;
        }

        if let Some(ref url) = self.cli.url {
            config.target_url = url.trim().to_string();
        }

        if let Some(test_type) = self.cli.test_type {
            config.test_mode = TestMode::from_code(test_type)?;
        }

        if let Some(repeat) = self.cli.repeat {
            config.repeat_count = repeat;
        }

        if let Some(ref value) = self.cli.value {
            config.trigger_value = value.clone();
        }

        if let Some(delay) = self.cli.retry_delay_ms {
            config.retry_delay_ms = delay;
        }

        if let Some(delay) = self.cli.read_retry_delay_ms {
            config.read_retry_delay_ms = delay;
        }

        if let Some(timeout) = self.cli.timeout {
            config.timeout_seconds = Some(timeout);
        }

        if let Some(every) = self.cli.report_every {
            config.report_every = every;
        }

        if self.cli.no_progress {
            config.progress = false;
        }

        if self.cli.no_color || self.cli.json {
            config.enable_color = false;
        }

        // CLI-only flags
        config.json = self.cli.json;
        config.verbose = self.cli.verbose;
        config.debug = self.cli.debug;

        if config.debug {
            eprintln!("Applied CLI overrides to configuration");
            eprintln!(
                "Final config: connections={}, mode={}, repeat={}, enable_color={}",
                config.connection_count, config.test_mode, config.repeat_count, config.enable_color
            );
        }

        Ok(())
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Target URL: {}", config.target_url));
    summary.push(format!("Test Mode: {}", config.test_mode));
    summary.push(format!("Connections: {}", config.connection_count));
    summary.push(format!("Repeat: {}", config.repeat_count));
    summary.push(format!("Trigger Value: {}", config.trigger_value));
    summary.push(format!(
        "Retry Delay: {}ms (read: {}ms)",
        config.retry_delay_ms, config.read_retry_delay_ms
    ));
    summary.push(match config.timeout_seconds {
        Some(secs) => format!("Timeout: {}s", secs),
        None => "Timeout: none".to_string(),
    });
    summary.push(format!(
        "Progress: {} (every {})",
        config.progress, config.report_every
    ));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}
