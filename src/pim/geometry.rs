/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::tuple::TUPLE_BYTES;
use anyhow::{ensure, Result};

/// The default DMA block size in bytes (128 tuples).
pub const DEFAULT_BLOCK_BYTES: usize = 1024;

/// The default per-worker partition budget in bytes (20 MiB).
pub const DEFAULT_REGION_BYTES: usize = 20 << 20;

/// The default number of cooperative tasklets per worker unit.
pub const DEFAULT_TASKLETS: usize = 8;

/// The memory layout of a worker unit.
///
/// A unit owns three equal backing-store regions of `region_bytes` each
/// (R, S, and the sort scratch area), addressed only at `block_bytes`
/// granularity, and runs `tasklets` cooperative tasklets, each working on
/// its own block-aligned slice of the three regions.
///
/// A geometry must be [validated](Geometry::validate) before any unit is
/// allocated with it; past that point the layout constraints are relied
/// upon by the core without further checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// The DMA block size in bytes. Must be a power of two and a multiple
    /// of the tuple size.
    pub block_bytes: usize,
    /// The per-region byte budget of a worker unit. Must be a multiple of
    /// `block_bytes * tasklets` so that per-tasklet slices stay
    /// block-aligned.
    pub region_bytes: usize,
    /// The number of cooperative tasklets per worker unit.
    pub tasklets: usize,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            block_bytes: DEFAULT_BLOCK_BYTES,
            region_bytes: DEFAULT_REGION_BYTES,
            tasklets: DEFAULT_TASKLETS,
        }
    }
}

impl Geometry {
    /// Checks the layout constraints, failing fast with a descriptive error.
    ///
    /// This is the single place where configuration errors are caught;
    /// the accelerator core asserts, but never re-validates, these
    /// invariants.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.block_bytes >= TUPLE_BYTES && self.block_bytes.is_power_of_two(),
            "block size must be a power of two of at least {} bytes, got {}",
            TUPLE_BYTES,
            self.block_bytes
        );
        ensure!(self.tasklets > 0, "at least one tasklet per unit is needed");
        ensure!(
            self.region_bytes > 0 && self.region_bytes % (self.block_bytes * self.tasklets) == 0,
            "region size {} is not a positive multiple of {} blocks of {} bytes",
            self.region_bytes,
            self.tasklets,
            self.block_bytes
        );
        // Request tuple counts travel as u32.
        ensure!(
            self.tuples_per_unit() <= u32::MAX as usize,
            "region size {} exceeds the 32-bit tuple index space",
            self.region_bytes
        );
        Ok(())
    }

    /// The number of tuples a DMA block holds. Always a power of two.
    #[inline(always)]
    pub fn tuples_per_block(&self) -> usize {
        self.block_bytes / TUPLE_BYTES
    }

    /// The number of tuples each of the three unit regions holds.
    #[inline(always)]
    pub fn tuples_per_unit(&self) -> usize {
        self.region_bytes / TUPLE_BYTES
    }

    /// The byte length of a tasklet's slice of a region.
    #[inline(always)]
    pub fn tasklet_bytes(&self) -> usize {
        self.region_bytes / self.tasklets
    }

    /// The number of tuples in a tasklet's slice of a region.
    #[inline(always)]
    pub fn tuples_per_tasklet(&self) -> usize {
        self.tuples_per_unit() / self.tasklets
    }
}
