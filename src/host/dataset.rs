/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::tuple::Tuple;
use rand::seq::SliceRandom;
use rand::Rng;

/// Builds a relation of `len` tuples whose keys are a uniform shuffle of the
/// dense range `0..len`, with `value = key`.
///
/// Key density is what makes the reference workload balanced: hashing by
/// `key mod W` sends exactly `len / W` tuples to each of `W` workers
/// whenever `W` divides `len`.
///
/// # Panics
///
/// If `len` does not fit the 32-bit key space.
pub fn dense_shuffled(len: usize, rng: &mut impl Rng) -> Vec<Tuple> {
    assert!(len <= u32::MAX as usize);
    let mut tuples: Vec<Tuple> = (0..len as u32).map(|key| Tuple::new(key, key)).collect();
    tuples.shuffle(rng);
    tuples
}
