// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use pattern_memory_cortex::domain::config::{PatternMemoryConfig, CONFIG_PATH_ENV};

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,

        /// Print the effective configuration as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./pattern-memory.yaml")]
        output: PathBuf,

        /// Include every section with comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths, yaml } => show(config_override, paths, yaml).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool, as_yaml: bool) -> Result<()> {
    let config = PatternMemoryConfig::load_or_default(config_override.clone()).context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  --config flag: {}", path.display()),
            None => println!("  --config flag: {}", "(not set)".dimmed()),
        }
        if std::env::var(CONFIG_PATH_ENV).is_err() {
            println!("  {}: {}", CONFIG_PATH_ENV, "(not set)".dimmed());
        }
        for path in PatternMemoryConfig::search_paths() {
            let marker = if path.exists() { "✓".green() } else { "·".dimmed() };
            println!("  {} {}", marker, path.display());
        }
        println!();
    }

    if as_yaml {
        print!("{}", serde_yaml::to_string(&config)?);
        return Ok(());
    }

    let spec = &config.spec;
    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    println!("{}", "Store:".bold());
    println!("  Backend: {:?}", spec.store.backend);
    if let Some(url) = &spec.store.database_url {
        println!("  Database: {}", redact_url(url));
    }
    println!();

    println!("{}", "Classifier:".bold());
    println!("  Strategy: {:?}", spec.classifier.strategy);
    println!("  Threshold: {:.2}", spec.classifier.threshold);
    println!("  Timeout: {}", humantime_serde::re::humantime::format_duration(spec.classifier.timeout));
    if let Some(llm) = &spec.classifier.llm {
        println!("  LLM: {:?} {} @ {}", llm.provider, llm.model, llm.endpoint);
    }
    println!();

    println!("{}", "Learning:".bold());
    println!("  Confidence merge: {:?}", spec.learning.confidence);
    println!("  Auto-link: {}", spec.learning.auto_link);
    println!("  Min confidence to store: {:.2}", spec.learning.min_confidence_to_store);
    println!();

    println!("{}", "Decay:".bold());
    println!("  After: {}", humantime_serde::re::humantime::format_duration(spec.decay.decay_after));
    println!("  Link decay fraction: {:.2}", spec.decay.link_decay_fraction);
    if spec.decay.schedule.enabled {
        println!(
            "  Scheduled every {}",
            humantime_serde::re::humantime::format_duration(spec.decay.schedule.interval)
        );
    } else {
        println!("  Schedule: {}", "disabled".dimmed());
    }
    println!();

    println!("{}", "Server:".bold());
    println!("  Listen: {}:{}", spec.server.bind_address, spec.server.port);
    println!();

    Ok(())
}

/// Hide the password part of a connection URL
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            let credentials = &url[scheme_end + 3..at];
            match credentials.split_once(':') {
                Some((user, _)) => format!("{}{}:****{}", &url[..scheme_end + 3], user, &url[at..]),
                None => url.to_string(),
            }
        }
        _ => url.to_string(),
    }
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = PatternMemoryConfig::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = sample_config(with_examples);

    std::fs::write(&output, sample).with_context(|| format!("Failed to write config to {:?}", output))?;

    println!("{}", format!("✓ Configuration generated: {}", output.display()).green());

    Ok(())
}

pub fn sample_config(with_examples: bool) -> &'static str {
    if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_parse_and_validate() {
        for with_examples in [false, true] {
            let config = PatternMemoryConfig::from_yaml_str(sample_config(with_examples)).unwrap();
            config.validate().unwrap();
        }
    }

    #[test]
    fn test_redact_url() {
        assert_eq!(
            redact_url("postgres://pmem:secret@db:5432/pmem"),
            "postgres://pmem:****@db:5432/pmem"
        );
        assert_eq!(redact_url("postgres://db/pmem"), "postgres://db/pmem");
    }

    #[tokio::test]
    async fn test_generate_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pattern-memory.yaml");
        generate(path.clone(), false).await.unwrap();
        assert!(PatternMemoryConfig::from_yaml_file(&path).is_ok());
    }
}
