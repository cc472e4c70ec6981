/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The accelerator substrate: unit allocation, partition load, request
//! broadcast, launch, and statistics gathering.
//!
//! On the reference hardware these operations are system calls into the
//! fabric runtime; here they are backed by a pool of OS threads over the
//! pre-reserved unit memories, which leaves the host-facing interface and
//! the per-unit memory discipline unchanged.

mod fabric;
pub use fabric::*;

mod request;
pub use request::*;
