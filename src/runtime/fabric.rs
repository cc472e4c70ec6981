/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::pim::{Geometry, Region, Unit};
use crate::runtime::{Request, UnitStats};
use crate::tuple::Tuple;
use anyhow::{ensure, Context, Result};
use log::debug;

/// A set of allocated worker units and the operations the host drives them
/// with: load, broadcast, launch, gather.
///
/// The reference runtime launches asynchronously and synchronizes later; on
/// the thread substrate the pair collapses and [`launch`](Fabric::launch)
/// runs the whole batch to completion, gathering every unit's statistics
/// through a channel as it finishes. Statistics of the last launch stay
/// available from [`stats`](Fabric::stats) until the next one.
///
/// ```
/// use pimjoin::pim::{Geometry, Region};
/// use pimjoin::runtime::{Fabric, Request};
/// use pimjoin::tuple::Tuple;
///
/// // One unit, one tasklet, eight-tuple regions of four-tuple blocks.
/// let geometry = Geometry {
///     block_bytes: 32,
///     region_bytes: 64,
///     tasklets: 1,
/// };
/// let mut fabric = Fabric::allocate(1, geometry)?;
///
/// // R and S are the same shuffle of 1..=8.
/// let partition: Vec<Tuple> = [5u32, 1, 4, 2, 8, 3, 7, 6]
///     .iter()
///     .map(|&k| Tuple::new(k, k))
///     .collect();
/// fabric.load(0, &partition, &partition)?;
///
/// fabric.broadcast(Request { r_num: 8, s_num: 8 });
/// fabric.launch()?;
///
/// assert_eq!(fabric.stats()[0].total_matches(), 8);
/// assert_eq!(fabric.read_region(0, Region::R)[0], Tuple::new(1, 1));
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug)]
pub struct Fabric {
    geometry: Geometry,
    units: Vec<Unit>,
    request: Option<Request>,
    stats: Vec<UnitStats>,
}

impl Fabric {
    /// Allocates `num_units` worker units with the given geometry,
    /// reserving their slow memory.
    ///
    /// Fails fast on an invalid geometry; oversubscribing the machine is
    /// allowed (the tasklets of a real unit are interleaved on one pipeline
    /// anyway) but reported.
    pub fn allocate(num_units: usize, geometry: Geometry) -> Result<Self> {
        ensure!(num_units > 0, "at least one worker unit is needed");
        geometry.validate()?;
        let contexts = num_units * geometry.tasklets;
        let cpus = num_cpus::get();
        if contexts > cpus {
            debug!("Running {contexts} worker contexts on {cpus} CPUs");
        }
        Ok(Self {
            geometry,
            units: (0..num_units).map(|_| Unit::new(geometry)).collect(),
            request: None,
            stats: vec![UnitStats::new(geometry.tasklets); num_units],
        })
    }

    pub fn num_units(&self) -> usize {
        self.units.len()
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Loads a unit's R and S partitions into its slow memory.
    pub fn load(&mut self, unit: usize, r: &[Tuple], s: &[Tuple]) -> Result<()> {
        ensure!(
            unit < self.units.len(),
            "unit {} out of range (allocated {})",
            unit,
            self.units.len()
        );
        self.units[unit]
            .load(r, s)
            .with_context(|| format!("Could not load unit {unit}"))
    }

    /// Broadcasts the request every unit will execute on the next launch.
    pub fn broadcast(&mut self, request: Request) {
        self.request = Some(request);
    }

    /// Launches every unit on the broadcast request and gathers their
    /// statistics, blocking until the whole batch is done.
    pub fn launch(&mut self) -> Result<()> {
        let request = self
            .request
            .context("No request was broadcast before launch")?;
        let (tx, rx) = crossbeam_channel::unbounded();

        std::thread::scope(|scope| {
            for (unit_id, unit) in self.units.iter_mut().enumerate() {
                let tx = tx.clone();
                scope.spawn(move || {
                    let stats = unit.run(request);
                    tx.send((unit_id, stats)).unwrap();
                });
            }
        });
        drop(tx);

        for (unit_id, stats) in rx {
            self.stats[unit_id] = stats;
        }
        Ok(())
    }

    /// The per-unit statistics gathered by the last launch.
    pub fn stats(&self) -> &[UnitStats] {
        &self.stats
    }

    /// Reads a region of a unit back from its slow memory.
    pub fn read_region(&self, unit: usize, region: Region) -> Vec<Tuple> {
        self.units[unit].read_region(region)
    }
}
