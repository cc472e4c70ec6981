/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::host::{dense_shuffled, partition_tuples};
use crate::pim::{Geometry, Region};
use crate::runtime::{Fabric, Request, UnitStats};
use crate::tuple::Tuple;
use anyhow::{ensure, Context, Result};
use dsi_progress_logger::prelude::*;
use log::{debug, info};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::path::Path;
use std::time::Instant;

/// Configuration of a full host-side join run.
#[derive(Debug, Clone)]
pub struct DriverOpts {
    /// How many worker units to allocate.
    pub num_units: usize,
    /// How many times to repeat the compute loop.
    pub loops: usize,
    /// Whether to load the generated partitions into slow memory; skipping
    /// the preload reuses whatever the units already hold.
    pub preload: bool,
    /// Whether to read the partitions back after the run and check that
    /// every tasklet slice is sorted.
    pub verify: bool,
    /// Seed for the dataset shuffle; a random one if `None`.
    pub seed: Option<u64>,
    /// The worker-unit memory layout.
    pub geometry: Geometry,
}

impl Default for DriverOpts {
    fn default() -> Self {
        Self {
            num_units: 1,
            loops: 1,
            preload: true,
            verify: false,
            seed: None,
            geometry: Geometry::default(),
        }
    }
}

/// Checks that the partition/image directory exists and is readable,
/// failing fast before anything is allocated.
pub fn verify_image_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    ensure!(
        path.is_dir(),
        "path '{}' does not exist or is not a directory",
        path.display()
    );
    std::fs::read_dir(path)
        .with_context(|| format!("path '{}' is not readable", path.display()))?;
    Ok(())
}

/// Aggregate results of a run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Total matches over all units and tasklets of the last launch.
    pub total_matches: u64,
    /// Slowest unit time across all launches, in unit-clock nanoseconds.
    pub slowest_exec_time: u64,
    /// Average unit time per launch, in unit-clock nanoseconds.
    pub average_exec_time: f64,
    /// Per-unit statistics of the last launch.
    pub stats: Vec<UnitStats>,
}

/// Builds two relations, hash-partitions them across the fabric, and runs
/// the sort-merge join, returning the aggregated statistics.
///
/// The two relations hold `num_units * tuples_per_unit` tuples each, so the
/// worker count always divides the relation size and the key-dense datasets
/// fill every partition exactly; skew can only arise with other data
/// sources, and then aborts the run before anything is loaded.
pub fn sort_merge_join(opts: &DriverOpts) -> Result<RunSummary> {
    ensure!(opts.loops > 0, "at least one compute loop is needed");

    info!("Allocating {} worker units", opts.num_units);
    let mut fabric = Fabric::allocate(opts.num_units, opts.geometry)?;

    let tuples_per_unit = opts.geometry.tuples_per_unit();
    let total = opts.num_units * tuples_per_unit;
    info!(
        "Two relations of {} tuples each ({:.3} MiB per worker region)",
        total,
        opts.geometry.region_bytes as f64 / (1024.0 * 1024.0)
    );

    let mut rng = match opts.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    };
    let mut s_rng = SmallRng::from_rng(&mut rng);
    let (r, s) = rayon::join(
        move || dense_shuffled(total, &mut rng),
        move || dense_shuffled(total, &mut s_rng),
    );

    let mut pl = progress_logger![
        item_name = "tuple",
        expected_updates = Some(2 * total),
        display_memory = true
    ];
    pl.start("Partitioning relations...");
    // All R buckets in the first half, all S buckets in the second, so the
    // two scatters write disjoint halves and can run concurrently.
    let mut par = vec![Tuple::default(); 2 * total];
    let (par_r, par_s) = par.split_at_mut(total);
    let (partitioned_r, partitioned_s) = rayon::join(
        || partition_tuples(&r, par_r, opts.num_units, 0, tuples_per_unit, tuples_per_unit),
        || partition_tuples(&s, par_s, opts.num_units, 0, tuples_per_unit, tuples_per_unit),
    );
    partitioned_r.context("Could not partition R")?;
    pl.update_with_count(total);
    partitioned_s.context("Could not partition S")?;
    pl.update_with_count(total);
    pl.done();

    if opts.preload {
        info!("Loading partitions into {} units", opts.num_units);
        let (par_r, par_s) = par.split_at(total);
        for unit in 0..opts.num_units {
            let slot = unit * tuples_per_unit..(unit + 1) * tuples_per_unit;
            fabric.load(unit, &par_r[slot.clone()], &par_s[slot])?;
        }
    } else {
        info!("Skipping the slow-memory preload");
    }

    let request = Request {
        r_num: tuples_per_unit as u32,
        s_num: tuples_per_unit as u32,
    };

    info!("Computing {} loops", opts.loops);
    let start = Instant::now();
    let mut slowest = 0;
    let mut exec_time_sum = 0u128;
    for each_loop in 0..opts.loops {
        fabric.broadcast(request);
        fabric
            .launch()
            .with_context(|| format!("Launch {each_loop} failed"))?;
        for stats in fabric.stats() {
            slowest = Ord::max(slowest, stats.exec_time);
            exec_time_sum += stats.exec_time as u128;
        }
    }
    let elapsed = start.elapsed();
    info!(
        "{} loops in {:.3} s ({:.1} loops/s)",
        opts.loops,
        elapsed.as_secs_f64(),
        opts.loops as f64 / elapsed.as_secs_f64()
    );

    let mut total_matches = 0;
    for (unit, stats) in fabric.stats().iter().enumerate() {
        for (tasklet, matches) in stats.nb_results.iter().enumerate() {
            debug!("unit {unit} tasklet {tasklet} matches {matches}");
        }
        info!(
            "unit {} matches {} in {} ns",
            unit,
            stats.total_matches(),
            stats.exec_time
        );
        total_matches += stats.total_matches();
    }

    if opts.verify {
        verify_sorted(&fabric)?;
    }

    let average_exec_time = exec_time_sum as f64 / (opts.num_units * opts.loops) as f64;
    info!(
        "total matches: {}, slowest unit: {} ns, average unit: {:.0} ns",
        total_matches, slowest, average_exec_time
    );

    Ok(RunSummary {
        total_matches,
        slowest_exec_time: slowest,
        average_exec_time,
        stats: fabric.stats().to_vec(),
    })
}

/// Reads every unit's partitions back and checks that each tasklet slice is
/// non-decreasing by key.
fn verify_sorted(fabric: &Fabric) -> Result<()> {
    let geometry = fabric.geometry();
    let per_tasklet = geometry.tuples_per_tasklet();
    for unit in 0..fabric.num_units() {
        for region in [Region::R, Region::S] {
            let tuples = fabric.read_region(unit, region);
            for (tasklet, slice) in tuples.chunks(per_tasklet).enumerate() {
                ensure!(
                    slice.windows(2).all(|w| w[0].key <= w[1].key),
                    "tasklet {} slice of unit {} region {:?} is not sorted",
                    tasklet,
                    unit,
                    region
                );
            }
        }
    }
    debug!("All tasklet slices verified sorted");
    Ok(())
}
