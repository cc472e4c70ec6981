/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! End-to-end tests of worker units and the fabric substrate on tiny
//! geometries.

use anyhow::Result;
use pimjoin::host::{dense_shuffled, partition_tuples};
use pimjoin::pim::{Geometry, Region};
use pimjoin::runtime::{Fabric, Request};
use pimjoin::tuple::Tuple;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::collections::HashSet;

/// One unit, one tasklet, eight-tuple regions, four tuples per block.
fn tiny_geometry() -> Geometry {
    Geometry {
        block_bytes: 32,
        region_bytes: 64,
        tasklets: 1,
    }
}

fn keyed(keys: &[u32]) -> Vec<Tuple> {
    keys.iter().map(|&key| Tuple::new(key, key)).collect()
}

fn keys(tuples: &[Tuple]) -> Vec<u32> {
    tuples.iter().map(|t| t.key).collect()
}

#[test]
fn test_single_unit_sorts_and_joins() -> Result<()> {
    let mut fabric = Fabric::allocate(1, tiny_geometry())?;

    // R and S are the same shuffle of 1..=8; the self-join counts 8.
    let relation = keyed(&[5, 1, 4, 2, 8, 3, 7, 6]);
    fabric.load(0, &relation, &relation)?;

    fabric.broadcast(Request { r_num: 8, s_num: 8 });
    fabric.launch()?;

    assert_eq!(keys(&fabric.read_region(0, Region::R)), (1..=8).collect::<Vec<u32>>());
    assert_eq!(keys(&fabric.read_region(0, Region::S)), (1..=8).collect::<Vec<u32>>());

    let stats = &fabric.stats()[0];
    assert_eq!(stats.total_matches(), 8);
    assert!(stats.exec_time > 0);
    Ok(())
}

#[test]
fn test_cross_worker_partitioned_join() -> Result<()> {
    // Two workers over four-tuple partitions: worker 0 gets {0, 2, 4, 6},
    // worker 1 gets {1, 3, 5, 7}; joining R with an identical S totals 8.
    let geometry = Geometry {
        block_bytes: 32,
        region_bytes: 32,
        tasklets: 1,
    };
    let r = keyed(&[0, 1, 2, 3, 4, 5, 6, 7]);
    let s = r.clone();

    let mut par = vec![Tuple::default(); 16];
    let (par_r, par_s) = par.split_at_mut(8);
    partition_tuples(&r, par_r, 2, 0, 4, 4)?;
    partition_tuples(&s, par_s, 2, 0, 4, 4)?;
    assert_eq!(keys(&par_r[0..4]), vec![0, 2, 4, 6]);
    assert_eq!(keys(&par_r[4..8]), vec![1, 3, 5, 7]);

    let mut fabric = Fabric::allocate(2, geometry)?;
    fabric.load(0, &par_r[0..4], &par_s[0..4])?;
    fabric.load(1, &par_r[4..8], &par_s[4..8])?;
    fabric.broadcast(Request { r_num: 4, s_num: 4 });
    fabric.launch()?;

    let total: u64 = fabric.stats().iter().map(|s| s.total_matches()).sum();
    assert_eq!(total, 8);
    Ok(())
}

#[test]
fn test_tasklets_split_the_unit() -> Result<()> {
    // Two tasklets over a 16-tuple unit; R and S are loaded identically, so
    // each tasklet joins its slice against an equal slice and every tuple
    // matches.
    let geometry = Geometry {
        block_bytes: 32,
        region_bytes: 128,
        tasklets: 2,
    };
    let relation = keyed(&[9, 3, 12, 0, 6, 15, 1, 10, 4, 13, 7, 2, 11, 5, 14, 8]);

    let mut fabric = Fabric::allocate(1, geometry)?;
    fabric.load(0, &relation, &relation)?;
    fabric.broadcast(Request { r_num: 16, s_num: 16 });
    fabric.launch()?;

    let stats = &fabric.stats()[0];
    assert_eq!(stats.nb_results.len(), 2);
    assert_eq!(stats.nb_results[0], 8);
    assert_eq!(stats.nb_results[1], 8);

    // Each tasklet slice is sorted on its own; the region as a whole is the
    // concatenation of the slices.
    let sorted_r = fabric.read_region(0, Region::R);
    assert!(sorted_r[0..8].windows(2).all(|w| w[0].key <= w[1].key));
    assert!(sorted_r[8..16].windows(2).all(|w| w[0].key <= w[1].key));
    Ok(())
}

#[test]
fn test_random_end_to_end_matches_reference_model() -> Result<()> {
    // Two units, two tasklets each, over shuffled dense relations. Keys are
    // unique on both sides, so each tasklet's match count is the size of
    // the key intersection of its R and S slices; the fabric must agree
    // with that model exactly.
    let geometry = Geometry {
        block_bytes: 32,
        region_bytes: 256,
        tasklets: 2,
    };
    let (units, capacity) = (2, 32);
    let per_tasklet = 16;
    let mut rng = SmallRng::seed_from_u64(0xfeed);
    let r = dense_shuffled(units * capacity, &mut rng);
    let s = dense_shuffled(units * capacity, &mut rng);

    let mut par = vec![Tuple::default(); 2 * units * capacity];
    let (par_r, par_s) = par.split_at_mut(units * capacity);
    partition_tuples(&r, par_r, units, 0, capacity, capacity)?;
    partition_tuples(&s, par_s, units, 0, capacity, capacity)?;

    let mut expected = 0;
    for unit in 0..units {
        let r_part = &par_r[unit * capacity..(unit + 1) * capacity];
        let s_part = &par_s[unit * capacity..(unit + 1) * capacity];
        for tasklet in 0..geometry.tasklets {
            let slice = tasklet * per_tasklet..(tasklet + 1) * per_tasklet;
            let r_keys: HashSet<u32> = r_part[slice.clone()].iter().map(|t| t.key).collect();
            let s_keys: HashSet<u32> = s_part[slice].iter().map(|t| t.key).collect();
            expected += r_keys.intersection(&s_keys).count() as u64;
        }
    }

    let mut fabric = Fabric::allocate(units, geometry)?;
    for unit in 0..units {
        let slot = unit * capacity..(unit + 1) * capacity;
        fabric.load(unit, &par_r[slot.clone()], &par_s[slot])?;
    }
    fabric.broadcast(Request {
        r_num: capacity as u32,
        s_num: capacity as u32,
    });
    fabric.launch()?;

    let total: u64 = fabric.stats().iter().map(|s| s.total_matches()).sum();
    assert_eq!(total, expected);
    Ok(())
}

#[test]
fn test_geometry_validation() {
    // Not a power of two.
    assert!(Geometry {
        block_bytes: 24,
        region_bytes: 240,
        tasklets: 1,
    }
    .validate()
    .is_err());
    // Region not a whole number of blocks.
    assert!(Geometry {
        block_bytes: 32,
        region_bytes: 100,
        tasklets: 1,
    }
    .validate()
    .is_err());
    // Per-tasklet slices would not be block-aligned.
    assert!(Geometry {
        block_bytes: 32,
        region_bytes: 96,
        tasklets: 2,
    }
    .validate()
    .is_err());
    // No tasklets.
    assert!(Geometry {
        block_bytes: 32,
        region_bytes: 64,
        tasklets: 0,
    }
    .validate()
    .is_err());
    assert!(Geometry::default().validate().is_ok());
}

#[test]
fn test_allocate_rejects_zero_units() {
    assert!(Fabric::allocate(0, tiny_geometry()).is_err());
}

#[test]
fn test_launch_requires_broadcast() -> Result<()> {
    let mut fabric = Fabric::allocate(1, tiny_geometry())?;
    assert!(fabric.launch().is_err());
    Ok(())
}

#[test]
fn test_load_rejects_wrong_sizes() -> Result<()> {
    let mut fabric = Fabric::allocate(1, tiny_geometry())?;
    let partition = keyed(&[1, 2, 3, 4, 5, 6, 7, 8]);
    // A short S partition is rejected.
    assert!(fabric.load(0, &partition, &partition[0..4]).is_err());
    // Out-of-range unit.
    assert!(fabric.load(1, &partition, &partition).is_err());
    Ok(())
}
