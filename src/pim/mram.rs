/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::tuple::{Tuple, TUPLE_BYTES};

/// A region of the slow, DMA-only backing store of a worker unit.
///
/// On the reference fabric this memory (MRAM) can be moved to and from the
/// scratchpad only in aligned blocks; there is no element-granular access
/// and no hardware cache. This wrapper preserves that discipline on
/// commodity hardware: the only reads and writes it offers are
/// [`dma_read`](MramRegion::dma_read) and [`dma_write`](MramRegion::dma_write)
/// of one whole block, plus a region-to-region [copy](MramRegion::copy_from).
/// Element access must go through a [`BlockCache`](crate::pim::BlockCache).
///
/// The backing bytes are little-endian tuples in wire format. A region must
/// be a whole number of blocks long; this is checked once, at construction.
pub struct MramRegion<'a> {
    bytes: &'a mut [u8],
    tuples_per_block: usize,
}

impl core::fmt::Debug for MramRegion<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MramRegion")
            .field("base", &self.bytes.as_ptr())
            .field("num_tuples", &self.num_tuples())
            .field("tuples_per_block", &self.tuples_per_block)
            .finish()
    }
}

impl<'a> MramRegion<'a> {
    /// Wraps a byte slice as a DMA-only region of `tuples_per_block`-tuple
    /// blocks.
    ///
    /// # Panics
    ///
    /// If `tuples_per_block` is not a power of two or the slice is not a
    /// whole number of blocks. These are programming errors of the caller
    /// laying out unit memory, not runtime conditions.
    pub fn new(bytes: &'a mut [u8], tuples_per_block: usize) -> Self {
        assert!(tuples_per_block.is_power_of_two());
        assert_eq!(bytes.len() % (tuples_per_block * TUPLE_BYTES), 0);
        Self {
            bytes,
            tuples_per_block,
        }
    }

    /// The number of tuples this region holds.
    #[inline(always)]
    pub fn num_tuples(&self) -> usize {
        self.bytes.len() / TUPLE_BYTES
    }

    /// The number of tuples per DMA block.
    #[inline(always)]
    pub fn tuples_per_block(&self) -> usize {
        self.tuples_per_block
    }

    /// DMA-reads the block starting at tuple index `block_start` into `line`.
    ///
    /// `block_start` must be block-aligned and `line` exactly one block long.
    #[inline]
    pub fn dma_read(&self, block_start: usize, line: &mut [Tuple]) {
        debug_assert_eq!(block_start % self.tuples_per_block, 0);
        debug_assert_eq!(line.len(), self.tuples_per_block);
        let bytes = &self.bytes[block_start * TUPLE_BYTES..];
        for (slot, chunk) in line.iter_mut().zip(bytes.chunks_exact(TUPLE_BYTES)) {
            *slot = Tuple::from_le_bytes(chunk.try_into().unwrap());
        }
    }

    /// DMA-writes `line` to the block starting at tuple index `block_start`.
    ///
    /// `block_start` must be block-aligned and `line` exactly one block long.
    #[inline]
    pub fn dma_write(&mut self, block_start: usize, line: &[Tuple]) {
        debug_assert_eq!(block_start % self.tuples_per_block, 0);
        debug_assert_eq!(line.len(), self.tuples_per_block);
        let bytes = &mut self.bytes[block_start * TUPLE_BYTES..];
        for (tuple, chunk) in line.iter().zip(bytes.chunks_exact_mut(TUPLE_BYTES)) {
            chunk.copy_from_slice(&tuple.to_le_bytes());
        }
    }

    /// Copies the whole of `src` over this region, block by block.
    ///
    /// Used by the sort to move the result back into the named output
    /// region after an odd number of passes. Both regions must have the
    /// same length.
    pub fn copy_from(&mut self, src: &MramRegion<'_>) {
        debug_assert_eq!(self.bytes.len(), src.bytes.len());
        self.bytes.copy_from_slice(src.bytes);
    }
}
