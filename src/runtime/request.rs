/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The two structures crossing the host/fabric boundary.

/// A join request, broadcast read-only by the host to every unit before a
/// launch: how many tuples of each loaded partition take part in the join.
///
/// In the reference configuration both counts equal the partition capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub r_num: u32,
    pub s_num: u32,
}

/// Per-unit statistics gathered by the host after a launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitStats {
    /// Execution time of the slowest tasklet of the unit, in nanoseconds of
    /// the unit clock (the cycle counter of the reference fabric).
    pub exec_time: u64,
    /// Matches found by each tasklet, one slot per tasklet.
    pub nb_results: Box<[u32]>,
}

impl UnitStats {
    /// Zeroed statistics for a unit running `tasklets` tasklets.
    pub fn new(tasklets: usize) -> Self {
        Self {
            exec_time: 0,
            nb_results: vec![0; tasklets].into_boxed_slice(),
        }
    }

    /// The total number of matches found by the unit.
    pub fn total_matches(&self) -> u64 {
        self.nb_results.iter().copied().map(u64::from).sum()
    }
}
