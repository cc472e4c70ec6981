/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::pim::{BlockCache, MramRegion};
use std::cmp::Ordering;

/// Counts the equijoin matches between the first `num_r` tuples of `r` and
/// the first `num_s` tuples of `s`, both sorted by key.
///
/// A two-pointer scan: on distinct keys the smaller side advances; on equal
/// keys the match counter and *only* the s-side cursor advance. Each
/// r-tuple therefore collects one match per s-tuple sharing its key, but
/// duplicate r-tuples with the same key do not re-scan s: the second
/// duplicate resumes where the first left off. This asymmetric counting is
/// part of the contract, not an optimization to be "fixed" into a cross
/// product.
///
/// `rc` and `sc` must be read-through caches bound to `r` and `s`.
pub fn merge_join(
    r: &MramRegion<'_>,
    s: &MramRegion<'_>,
    rc: &mut BlockCache,
    sc: &mut BlockCache,
    num_r: usize,
    num_s: usize,
) -> u32 {
    let mut i = 0;
    let mut j = 0;
    let mut matches = 0;

    while i < num_r && j < num_s {
        let ri = rc.read(r, i);
        let sj = sc.read(s, j);
        match ri.key.cmp(&sj.key) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                matches += 1;
                j += 1;
            }
        }
    }

    matches
}
