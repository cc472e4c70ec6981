/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The host side: dataset generation, the hash-partition pre-pass that
//! makes each worker's share fit its partition budget, and the driver
//! orchestrating load, launch, and statistics aggregation.

mod dataset;
pub use dataset::*;

mod driver;
pub use driver::*;

mod partition;
pub use partition::*;
