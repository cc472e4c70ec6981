/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::Result;
use clap::Parser;
use pimjoin::host::{sort_merge_join, verify_image_dir, DriverOpts};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "pimjoin",
    about = "Runs a parallel sort-merge equijoin over a set of emulated PIM worker units.",
    version,
    long_about = None
)]
struct CliArgs {
    /// The directory holding the partition/MRAM images.
    #[arg(short = 'p', long, default_value = ".")]
    path: PathBuf,
    /// The number of worker units to use.
    #[arg(short = 'm', long, default_value_t = 1)]
    units: usize,
    /// The number of compute loops to run.
    #[arg(short = 'l', long, default_value_t = 1)]
    loops: usize,
    /// Avoid loading the slow memory (to be used with caution).
    #[arg(short = 'n', long)]
    no_load: bool,
}

pub fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();
    verify_image_dir(&args.path)?;

    sort_merge_join(&DriverOpts {
        num_units: args.units,
        loops: args.loops,
        preload: !args.no_load,
        ..DriverOpts::default()
    })?;

    Ok(())
}
