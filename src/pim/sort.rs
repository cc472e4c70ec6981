/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::pim::{BlockCache, Direction, MramRegion};

/// The three cache managers a tasklet sorts (and joins) through: two
/// read-through caches over the current source region and one write-back
/// cache over the current destination.
///
/// The managers are distinct even though `a` and `b` read the same region
/// during a merge: each owns its own scratchpad line, so the three resident
/// blocks never alias. They are allocated once per tasklet and rebound
/// between passes.
#[derive(Debug)]
pub struct SortCaches {
    pub a: BlockCache,
    pub b: BlockCache,
    pub out: BlockCache,
}

impl SortCaches {
    /// Allocates the three scratchpad lines of `tuples_per_block` tuples each.
    pub fn new(tuples_per_block: usize) -> Self {
        Self {
            a: BlockCache::new(tuples_per_block, Direction::ReadThrough),
            b: BlockCache::new(tuples_per_block, Direction::ReadThrough),
            out: BlockCache::new(tuples_per_block, Direction::WriteBack),
        }
    }
}

/// Stable two-way merge of `src[left..mid)` and `src[mid..right)` into
/// `dst[left..right)`.
///
/// `a` and `b` must be read-through caches bound to `src`, `out` a
/// write-back cache bound to `dst`. Comparisons are on keys only, as
/// unsigned 32-bit values; on equal keys the element of the left run is
/// emitted first, which is what makes the sort stable.
#[allow(clippy::too_many_arguments)]
pub fn merge(
    src: &MramRegion<'_>,
    dst: &mut MramRegion<'_>,
    a: &mut BlockCache,
    b: &mut BlockCache,
    out: &mut BlockCache,
    left: usize,
    mid: usize,
    right: usize,
) {
    debug_assert!(left <= mid && mid <= right);
    let mut i = left;
    let mut j = mid;
    let mut k = left;

    while i < mid && j < right {
        let ai = a.read(src, i);
        let aj = b.read(src, j);
        if ai.key < aj.key {
            out.write(dst, k, ai);
            i += 1;
        } else {
            out.write(dst, k, aj);
            j += 1;
        }
        k += 1;
    }

    while i < mid {
        let ai = a.read(src, i);
        out.write(dst, k, ai);
        i += 1;
        k += 1;
    }

    while j < right {
        let aj = b.read(src, j);
        out.write(dst, k, aj);
        j += 1;
        k += 1;
    }
}

/// Sorts `a` by key with a non-recursive, bottom-up mergesort, using `tmp`
/// as the second half of a double buffer.
///
/// Passes of doubling run width ping-pong between `a` and `tmp`; within a
/// pass the three caches are rebound once and then serve every merge, so the
/// whole pass costs one DMA transfer per block per cache regardless of the
/// region size. After an odd number of passes the sorted data sits in `tmp`
/// and is copied back, so the result is always in `a`. Sorting at most one
/// tuple is a no-op.
///
/// The bottom-up form needs no recursion stack, which matters on targets
/// with call budgets measured in a few dozen bytes.
///
/// ```
/// use pimjoin::pim::{merge_sort, MramRegion, SortCaches};
/// use pimjoin::tuple::Tuple;
///
/// let mut a_bytes: Vec<u8> = [5u32, 1, 4, 2, 8, 3, 7, 6]
///     .iter()
///     .flat_map(|&k| Tuple::new(k, k).to_le_bytes())
///     .collect();
/// let mut tmp_bytes = vec![0; a_bytes.len()];
/// let mut a = MramRegion::new(&mut a_bytes, 4);
/// let mut tmp = MramRegion::new(&mut tmp_bytes, 4);
/// let mut caches = SortCaches::new(4);
/// merge_sort(&mut a, &mut tmp, &mut caches);
/// drop(a);
///
/// let keys: Vec<u32> = a_bytes
///     .chunks_exact(8)
///     .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
///     .collect();
/// assert_eq!(keys, vec![1, 2, 3, 4, 5, 6, 7, 8]);
/// ```
pub fn merge_sort<'a>(a: &mut MramRegion<'a>, tmp: &mut MramRegion<'a>, caches: &mut SortCaches) {
    let len = a.num_tuples();
    debug_assert_eq!(tmp.num_tuples(), len);
    if len <= 1 {
        return;
    }

    let mut toggle = 0;
    let mut width = 1;
    while width < len {
        caches.a.rebind(Direction::ReadThrough);
        caches.b.rebind(Direction::ReadThrough);
        caches.out.rebind(Direction::WriteBack);
        let (src, dst) = if toggle & 1 == 0 {
            (&*a, &mut *tmp)
        } else {
            (&*tmp, &mut *a)
        };

        let mut i = 0;
        while i < len {
            let mid = Ord::min(i + width, len);
            let right = Ord::min(i + 2 * width, len);
            merge(src, dst, &mut caches.a, &mut caches.b, &mut caches.out, i, mid, right);
            i += 2 * width;
        }
        caches.out.flush(dst);

        toggle += 1;
        width <<= 1;
    }

    if toggle & 1 == 1 {
        a.copy_from(tmp);
    }
}
