// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `pmem learn` - classify a task result and record it

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use pattern_memory_cortex::application::LearnOutcome;
use pattern_memory_cortex::{TaskResult, DOMAIN_METADATA_KEY, LINK_WITH_METADATA_KEY};

use super::{print_json, MemoryTarget};

#[derive(Args, Debug)]
pub struct LearnArgs {
    /// Task description (ignored with --file)
    #[arg(value_name = "TASK", required_unless_present = "file")]
    pub task: Option<String>,

    /// Quality score in [0, 1]
    #[arg(short, long, value_name = "SCORE", required_unless_present = "file")]
    pub score: Option<f64>,

    /// Task output text, or @path to read it from a file
    #[arg(short, long, default_value = "")]
    pub output: String,

    /// Domain tag stored with the pattern
    #[arg(short, long)]
    pub domain: Option<String>,

    /// Pattern to link the new observation with
    #[arg(long, value_name = "PATTERN")]
    pub link_with: Option<String>,

    /// Read a full TaskResult JSON document instead
    #[arg(short, long, value_name = "FILE", conflicts_with_all = ["task", "score"])]
    pub file: Option<PathBuf>,

    /// Print the raw JSON outcome
    #[arg(long)]
    pub json: bool,
}

impl LearnArgs {
    pub fn to_task_result(&self) -> Result<TaskResult> {
        if let Some(path) = &self.file {
            let content =
                std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
            return serde_json::from_str(&content).with_context(|| format!("Invalid task result in {:?}", path));
        }

        let task = self.task.clone().context("TASK is required")?;
        let score = self.score.context("--score is required")?;
        let output = match self.output.strip_prefix('@') {
            Some(path) => std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?,
            None => self.output.clone(),
        };

        let mut result = TaskResult::new(task, output, score);
        if let Some(domain) = &self.domain {
            result = result.with_metadata(DOMAIN_METADATA_KEY, domain.as_str());
        }
        if let Some(partner) = &self.link_with {
            result = result.with_metadata(LINK_WITH_METADATA_KEY, partner.as_str());
        }
        Ok(result)
    }
}

pub async fn handle_command(args: LearnArgs, config_path: Option<PathBuf>, host: &str, port: u16) -> Result<()> {
    let result = args.to_task_result()?;
    let target = MemoryTarget::connect(config_path, host, port).await?;
    let outcome = target.learn(&result).await?;

    if args.json {
        return print_json(&outcome);
    }
    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &LearnOutcome) {
    let label = outcome.classification.classification.as_str();
    let label = match outcome.classification.classification {
        pattern_memory_cortex::Outcome::Success => label.green().bold(),
        pattern_memory_cortex::Outcome::Failure => label.red().bold(),
    };

    println!("{} {}", label, outcome.pattern_name.bold());
    println!("  Reason: {}", outcome.classification.reason);
    println!("  Confidence: {:.2}", outcome.classification.confidence);

    if !outcome.stored {
        println!("  {}", "Below storage threshold, not recorded".yellow());
        return;
    }
    if let Some(occurrences) = outcome.occurrences {
        println!("  Occurrences: {}", occurrences);
    }
    if let Some(partner) = &outcome.linked_to {
        println!("  Linked to: {}", partner);
    }
}
