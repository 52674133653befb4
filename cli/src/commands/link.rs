// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `pmem link` - create or reinforce a SUCCESS → FAILURE link

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::{print_json, MemoryTarget};

#[derive(Args, Debug)]
pub struct LinkArgs {
    /// SUCCESS pattern name
    #[arg(value_name = "SUCCESS")]
    pub success: String,

    /// FAILURE pattern name
    #[arg(value_name = "FAILURE")]
    pub failure: String,

    /// Strength added to the link (default: configured reinforcement)
    #[arg(short, long)]
    pub reinforcement: Option<f64>,

    #[arg(long)]
    pub json: bool,
}

pub async fn handle_command(args: LinkArgs, config_path: Option<PathBuf>, host: &str, port: u16) -> Result<()> {
    let target = MemoryTarget::connect(config_path, host, port).await?;
    let link = target.link(&args.success, &args.failure, args.reinforcement).await?;

    if args.json {
        return print_json(&link);
    }

    println!(
        "{}",
        format!("✓ {} → {} (strength {:.2})", link.source, link.target, link.strength).green()
    );
    Ok(())
}
