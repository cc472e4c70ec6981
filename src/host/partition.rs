/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::tuple::Tuple;
use thiserror::Error;

/// A partition bucket filled up beyond its capacity during the scatter
/// pre-pass: the key distribution is too skewed for the configured
/// per-worker budget. The run must be aborted; no partial output is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("partition {bucket} overflowed its {capacity}-tuple budget while scattering key {key}")]
pub struct SkewOverflow {
    pub bucket: usize,
    pub capacity: usize,
    pub key: u32,
}

/// Scatters `tuples` into `num_partitions` buckets of `out` by `key mod
/// num_partitions`, preserving the input order within each bucket.
///
/// Bucket `b` is the slot `out[par_off + b * par_stride..][..capacity]`;
/// the offset and stride support both contiguous-halves and interleaved
/// per-worker layouts, and two scatters into disjoint buffers can run
/// concurrently. A bucket receiving more than `capacity` tuples aborts the
/// scatter with [`SkewOverflow`].
pub fn partition_tuples(
    tuples: &[Tuple],
    out: &mut [Tuple],
    num_partitions: usize,
    par_off: usize,
    par_stride: usize,
    capacity: usize,
) -> Result<(), SkewOverflow> {
    let mut offsets: Vec<usize> = (0..num_partitions)
        .map(|bucket| par_off + bucket * par_stride)
        .collect();
    let mut fills = vec![0; num_partitions];

    for tuple in tuples {
        let bucket = tuple.key as usize % num_partitions;
        if fills[bucket] == capacity {
            return Err(SkewOverflow {
                bucket,
                capacity,
                key: tuple.key,
            });
        }
        out[offsets[bucket]] = *tuple;
        offsets[bucket] += 1;
        fills[bucket] += 1;
    }

    Ok(())
}
