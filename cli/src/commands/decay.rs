// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `pmem decay` - run one decay pass

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;

use crate::daemon::server::DecayRequest;

use super::{print_json, MemoryTarget};

#[derive(Args, Debug)]
pub struct DecayArgs {
    /// Staleness window, e.g. "7d" or "36h" (default: configured decay_after)
    #[arg(long, value_parser = humantime_serde::re::humantime::parse_duration)]
    pub decay_after: Option<Duration>,

    /// Reference time in RFC 3339 (default: now)
    #[arg(long)]
    pub now: Option<DateTime<Utc>>,

    #[arg(long)]
    pub json: bool,
}

pub async fn handle_command(args: DecayArgs, config_path: Option<PathBuf>, host: &str, port: u16) -> Result<()> {
    let target = MemoryTarget::connect(config_path, host, port).await?;
    let report = target
        .decay(&DecayRequest {
            now: args.now,
            decay_after: args.decay_after,
        })
        .await?;

    if args.json {
        return print_json(&report);
    }

    println!("{}", "✓ Decay pass complete".green());
    println!("  Cutoff: {}", report.cutoff.to_rfc3339());
    println!("  Stale patterns: {}", report.patterns_scanned);
    println!("  Decayed: {}", report.patterns_decayed);
    println!("  Newly dormant: {}", report.newly_dormant);
    println!("  Links weakened: {}", report.links_weakened);
    if report.refreshed > 0 {
        println!("  Refreshed during run: {}", report.refreshed);
    }
    if report.skipped > 0 {
        println!("  {}", format!("Skipped: {}", report.skipped).yellow());
    }
    println!("  Took: {}ms", report.duration_ms);
    Ok(())
}
