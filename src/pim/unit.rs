/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::pim::{merge_join, merge_sort, Direction, Geometry, MramRegion, SortCaches};
use crate::runtime::{Request, UnitStats};
use crate::tuple::{Tuple, TUPLE_BYTES};
use anyhow::{ensure, Result};
use std::sync::{Barrier, Mutex, OnceLock};
use std::time::Instant;
use sync_cell_slice::{SyncCell, SyncSlice};

/// One of the three backing-store regions of a worker unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    R,
    S,
    /// The sort double-buffer scratch area.
    Tmp,
}

/// A worker unit: one independent processing element of the fabric.
///
/// A unit owns its slow memory, laid out as three consecutive equal regions
/// `R || S || TMP`, and runs `T` cooperative tasklets, each sorting and
/// joining its own block-aligned slice of the three regions. Units share
/// nothing with each other; inside a unit, tasklets share only the
/// statistics being published, a barrier, and the broadcast request.
pub struct Unit {
    geometry: Geometry,
    mram: Box<[u8]>,
}

impl core::fmt::Debug for Unit {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Unit")
            .field("geometry", &self.geometry)
            .field("mram", &self.mram.as_ptr())
            .finish()
    }
}

/// Everything the tasklets of one unit share during a run.
struct SharedState {
    barrier: Barrier,
    /// The unit clock, reset by tasklet 0 before the startup barrier; the
    /// commodity stand-in for the cycle counter of the reference fabric.
    clock: OnceLock<Instant>,
    /// Slowest tasklet time so far; the shared counter all tasklets fold
    /// into under a mutex.
    exec_time: Mutex<u64>,
}

impl Unit {
    /// Reserves the unit's slow memory, zero-filled, for a validated
    /// geometry.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            mram: vec![0; 3 * geometry.region_bytes].into_boxed_slice(),
        }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Loads the unit's two partitions into the consecutive R and S regions
    /// of slow memory; the host-side DMA write of the reference system.
    pub fn load(&mut self, r: &[Tuple], s: &[Tuple]) -> Result<()> {
        let expected = self.geometry.tuples_per_unit();
        ensure!(
            r.len() == expected && s.len() == expected,
            "unit load expects two partitions of exactly {} tuples, got {} and {}",
            expected,
            r.len(),
            s.len()
        );
        for (tuple, chunk) in r
            .iter()
            .chain(s)
            .zip(self.mram.chunks_exact_mut(TUPLE_BYTES))
        {
            chunk.copy_from_slice(&tuple.to_le_bytes());
        }
        Ok(())
    }

    /// Reads a whole region back from slow memory; the host-side DMA read
    /// used for verification and tests.
    pub fn read_region(&self, region: Region) -> Vec<Tuple> {
        let offset = match region {
            Region::R => 0,
            Region::S => self.geometry.region_bytes,
            Region::Tmp => 2 * self.geometry.region_bytes,
        };
        self.mram[offset..offset + self.geometry.region_bytes]
            .chunks_exact(TUPLE_BYTES)
            .map(|chunk| Tuple::from_le_bytes(chunk.try_into().unwrap()))
            .collect()
    }

    /// Runs the unit to completion on a broadcast request: every tasklet
    /// sorts its R and S slices and merge-joins them.
    ///
    /// Tasklet 0 zeroes the statistics and resets the unit clock; all
    /// tasklets then rendezvous at the startup barrier, work on disjoint
    /// slices with no further suspension point, and publish their match
    /// count in their own statistics slot.
    pub fn run(&mut self, request: Request) -> UnitStats {
        let geometry = self.geometry;
        let tasklet_bytes = geometry.tasklet_bytes();
        let (r_bytes, rest) = self.mram.split_at_mut(geometry.region_bytes);
        let (s_bytes, tmp_bytes) = rest.split_at_mut(geometry.region_bytes);

        let mut stats = UnitStats::new(geometry.tasklets);
        let shared = SharedState {
            barrier: Barrier::new(geometry.tasklets),
            clock: OnceLock::new(),
            exec_time: Mutex::new(0),
        };
        let results = stats.nb_results.as_sync_slice();

        std::thread::scope(|scope| {
            for (tasklet, ((r, s), tmp)) in r_bytes
                .chunks_mut(tasklet_bytes)
                .zip(s_bytes.chunks_mut(tasklet_bytes))
                .zip(tmp_bytes.chunks_mut(tasklet_bytes))
                .enumerate()
            {
                let shared = &shared;
                scope.spawn(move || {
                    tasklet_main(tasklet, geometry, request, r, s, tmp, shared, results)
                });
            }
        });

        stats.exec_time = *shared.exec_time.lock().unwrap();
        stats
    }
}

/// The entrypoint every tasklet of a unit executes.
#[allow(clippy::too_many_arguments)]
fn tasklet_main(
    tasklet: usize,
    geometry: Geometry,
    request: Request,
    r_bytes: &mut [u8],
    s_bytes: &mut [u8],
    tmp_bytes: &mut [u8],
    shared: &SharedState,
    results: &[SyncCell<u32>],
) {
    if tasklet == 0 {
        for slot in results {
            // Safety: nobody else touches the slots before the barrier.
            unsafe { slot.set(0) };
        }
        let _ = shared.clock.set(Instant::now());
    }
    shared.barrier.wait();
    let start = *shared.clock.get_or_init(Instant::now);

    let tuples_per_block = geometry.tuples_per_block();
    let mut r = MramRegion::new(r_bytes, tuples_per_block);
    let mut s = MramRegion::new(s_bytes, tuples_per_block);
    let mut tmp = MramRegion::new(tmp_bytes, tuples_per_block);
    let mut caches = SortCaches::new(tuples_per_block);

    merge_sort(&mut r, &mut tmp, &mut caches);
    merge_sort(&mut s, &mut tmp, &mut caches);

    // The sorts are done with the caches; reuse the two read caches for the
    // join over the now-sorted regions.
    caches.a.rebind(Direction::ReadThrough);
    caches.b.rebind(Direction::ReadThrough);
    let num_r = tasklet_share(request.r_num, geometry.tasklets, tasklet).min(r.num_tuples());
    let num_s = tasklet_share(request.s_num, geometry.tasklets, tasklet).min(s.num_tuples());
    let matches = merge_join(&r, &s, &mut caches.a, &mut caches.b, num_r, num_s);

    // Safety: each tasklet writes only its own slot.
    unsafe { results[tasklet].set(matches) };
    let mut slowest = shared.exec_time.lock().unwrap();
    *slowest = (*slowest).max(start.elapsed().as_nanos() as u64);
}

/// This tasklet's share of a broadcast tuple count: the first tasklets get
/// a ceil-divided slice each, the last one whatever remains.
fn tasklet_share(total: u32, tasklets: usize, tasklet: usize) -> usize {
    let per_tasklet = (total as usize).div_ceil(tasklets);
    (total as usize)
        .saturating_sub(tasklet * per_tasklet)
        .min(per_tasklet)
}
