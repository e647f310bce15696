//! Driver for universal I/O expansion boards built from a PCA9685 PWM controller and one or two
//! ADS7128 ADCs on a shared I2C bus.
//!
//! Every port on the board is wired to both a PWM channel and an ADC input.  Ports can be driven
//! as digital outputs, PWM outputs or servos, and read as analog or thresholded digital inputs.
//! The routing from port numbers to chip channels is described by a [`BoardProfile`].
#![cfg_attr(not(test), no_std)]

#[cfg(feature = "std")]
extern crate std;

#[macro_use]
mod fmt;

mod board;
mod bus;
pub mod codec;
pub mod dev;
mod error;
mod mutex;
mod port;
mod shield;

pub use board::{connector_port, AdcInput, BoardProfile, ServoCalibration};
pub use codec::PulseWindow;
pub use error::Error;
pub use mutex::ShieldMutex;
pub use port::{Port, Servo};
pub use shield::{level_from_raw, Driver, Shield, DEFAULT_THRESHOLD};

pub(crate) use bus::I2cExt;
