//! The device module contains the register protocols of the chips on the board.
//!
//! In most cases you will not need anything from here explicitly, [`Shield`][crate::Shield]
//! drives both chips.  They are exposed for boards that use the chips on their own.

pub mod ads7128;
pub mod pca9685;
