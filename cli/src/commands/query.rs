// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Read-only queries
//!
//! Commands: best-practices, stats, get, remedies

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use pattern_memory_cortex::application::query_service::DEFAULT_QUERY_LIMIT;
use pattern_memory_cortex::{Outcome, Pattern};

use super::{print_json, MemoryTarget};

#[derive(Subcommand, Debug)]
pub enum QueryCommand {
    /// Top patterns by occurrences and confidence
    BestPractices {
        /// Restrict to one domain
        #[arg(short, long)]
        domain: Option<String>,

        /// SUCCESS or FAILURE
        #[arg(short, long, default_value = "SUCCESS", value_parser = parse_outcome)]
        classification: Outcome,

        #[arg(short, long, default_value_t = DEFAULT_QUERY_LIMIT)]
        limit: usize,

        #[arg(long)]
        json: bool,
    },

    /// Store-wide counters
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Show one pattern
    Get {
        #[arg(value_name = "NAME")]
        name: String,

        #[arg(long)]
        json: bool,
    },

    /// SUCCESS patterns linked to a FAILURE pattern
    Remedies {
        /// FAILURE pattern name
        #[arg(value_name = "FAILURE")]
        failure: String,

        #[arg(short, long, default_value_t = DEFAULT_QUERY_LIMIT)]
        limit: usize,

        #[arg(long)]
        json: bool,
    },
}

fn parse_outcome(raw: &str) -> std::result::Result<Outcome, String> {
    raw.parse::<Outcome>().map_err(|e| e.to_string())
}

pub async fn handle_command(
    command: QueryCommand,
    config_path: Option<PathBuf>,
    host: &str,
    port: u16,
) -> Result<()> {
    let target = MemoryTarget::connect(config_path, host, port).await?;

    match command {
        QueryCommand::BestPractices {
            domain,
            classification,
            limit,
            json,
        } => {
            let patterns = target.best_practices(domain.as_deref(), classification, limit).await?;
            if json {
                return print_json(&patterns);
            }
            if patterns.is_empty() {
                println!("{}", "No matching patterns".yellow());
            }
            for (rank, pattern) in patterns.iter().enumerate() {
                println!("{:>3}. {}", rank + 1, summary_line(pattern));
            }
        }
        QueryCommand::Stats { json } => {
            let stats = target.stats().await?;
            if json {
                return print_json(&stats);
            }
            println!("{}", "Pattern memory:".bold());
            println!("  Patterns: {}", stats.total);
            println!("    SUCCESS: {}", stats.success_count);
            println!("    FAILURE: {}", stats.failure_count);
            println!("    Dormant: {}", stats.dormant_count);
            println!("  Links: {}", stats.link_count);
            println!("  Avg link strength: {:.2}", stats.avg_link_strength);
        }
        QueryCommand::Get { name, json } => {
            let pattern = target.get_pattern(&name).await?;
            if json {
                return print_json(&pattern);
            }
            println!("{}", pattern.name.bold());
            println!("  Classification: {}", pattern.classification);
            println!("  Reason: {}", pattern.reason);
            println!("  Confidence: {:.2}", pattern.confidence);
            println!("  Occurrences: {}", pattern.occurrences);
            if let Some(domain) = &pattern.domain {
                println!("  Domain: {}", domain);
            }
            println!("  First seen: {}", pattern.created_at.to_rfc3339());
            println!("  Last seen: {}", pattern.last_seen.to_rfc3339());
        }
        QueryCommand::Remedies { failure, limit, json } => {
            let remedies = target.remedies(&failure, limit).await?;
            if json {
                return print_json(&remedies);
            }
            if remedies.is_empty() {
                println!("{}", format!("No known remedies for {}", failure).yellow());
            }
            for remedy in &remedies {
                println!("  [{:.2}] {}", remedy.strength, summary_line(&remedy.pattern));
            }
        }
    }

    Ok(())
}

fn summary_line(pattern: &Pattern) -> String {
    let dormant = if pattern.is_dormant() { " (dormant)".dimmed().to_string() } else { String::new() };
    format!(
        "{} ×{} conf {:.2}{}",
        pattern.name.bold(),
        pattern.occurrences,
        pattern.confidence,
        dormant
    )
}
