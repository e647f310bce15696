//! Support for the `ADS7128` "12-bit, 8-channel analog-to-digital converter with I2C interface"
//!
//! Registers are not addressed directly, every access is prefixed with an opcode.  A conversion
//! is triggered by reading from the chip after selecting a channel in manual mode.
use embedded_hal::i2c::I2c;

use crate::codec;
use crate::I2cExt;

/// Number of analog inputs on the chip.
pub const CHANNELS: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Opcode {
    SingleRead = 0x10,
    SingleWrite = 0x08,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Regs {
    SystemStatus = 0x00,
    GeneralCfg = 0x01,
    DataCfg = 0x02,
    /// OSR_CFG: averaging filter oversampling ratio
    OsrCfg = 0x03,
    /// OPMODE_CFG: conversion mode and clock divider
    OpmodeCfg = 0x04,
    /// PIN_CFG: 0=analog input, 1=GPIO
    PinCfg = 0x05,
    GpioCfg = 0x07,
    GpoValue = 0x0B,
    GpiValue = 0x0D,
    /// SEQUENCE_CFG: manual or auto channel sequencing
    SequenceCfg = 0x10,
    /// CHANNEL_SEL: input used for the next conversion in manual mode
    ChannelSel = 0x11,
}

impl From<Regs> for u8 {
    fn from(r: Regs) -> u8 {
        r as u8
    }
}

/// All pins analog.
const PIN_CFG_ANALOG: u8 = 0x00;
/// 128 samples averaged per conversion.
const OSR_128: u8 = 0x07;
/// Manual channel selection.
const SEQUENCE_MANUAL: u8 = 0x00;
/// Conversions on demand, high-speed oscillator.
const OPMODE_MANUAL: u8 = 0x00;

/// Register protocol for one ADS7128 on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ads7128 {
    address: u8,
    big_endian: bool,
}

impl Ads7128 {
    pub const fn new(address: u8, big_endian: bool) -> Self {
        Self {
            address,
            big_endian,
        }
    }

    pub const fn address(&self) -> u8 {
        self.address
    }

    /// Configure all inputs as analog with averaging, in manual-select mode.
    pub fn init<I2C: I2c>(&self, i2c: &mut I2C) -> Result<(), I2C::Error> {
        self.write_reg(i2c, Regs::PinCfg, PIN_CFG_ANALOG)?;
        self.write_reg(i2c, Regs::OsrCfg, OSR_128)?;
        self.write_reg(i2c, Regs::SequenceCfg, SEQUENCE_MANUAL)?;
        self.write_reg(i2c, Regs::OpmodeCfg, OPMODE_MANUAL)
    }

    /// Select `channel` and return one 12-bit conversion result.
    pub fn read_channel<I2C: I2c>(&self, i2c: &mut I2C, channel: u8) -> Result<u16, I2C::Error> {
        self.write_reg(i2c, Regs::ChannelSel, channel & 0x0F)?;
        let frame = i2c.read_bytes::<2>(self.address)?;
        let sample = codec::adc_sample(frame, self.big_endian);
        trace!("ads7128@{=u8:#x}: ch{} = {}", self.address, channel, sample);
        Ok(sample)
    }

    pub fn write_reg<I2C: I2c, R: Into<u8>>(
        &self,
        i2c: &mut I2C,
        reg: R,
        value: u8,
    ) -> Result<(), I2C::Error> {
        i2c.write(
            self.address,
            &[Opcode::SingleWrite as u8, reg.into(), value],
        )
    }

    pub fn read_reg<I2C: I2c, R: Into<u8>>(&self, i2c: &mut I2C, reg: R) -> Result<u8, I2C::Error> {
        let mut buf = [0x00];
        i2c.write_read(
            self.address,
            &[Opcode::SingleRead as u8, reg.into()],
            &mut buf,
        )?;
        Ok(buf[0])
    }
}
