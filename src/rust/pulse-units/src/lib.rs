// SPDX-License-Identifier: Apache-2.0

pub mod clock;
pub mod phase;

pub use clock::{Cycles, ClockSpec, ceil_to_grid, floor_to_grid};
pub use phase::PhaseReg;
