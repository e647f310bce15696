//! Support for the `PCA9685` "16-channel, 12-bit PWM Fm+ I2C-bus LED controller"
//!
//! Each channel has a 4-register window (`ON_L`, `ON_H`, `OFF_L`, `OFF_H`) starting at
//! `LED0_ON_L + 4 * channel`.  The driver always writes the window in one auto-increment transfer.
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::codec::PulseWindow;
use crate::I2cExt;

/// Number of PWM outputs on the chip.
pub const CHANNELS: u8 = 16;
/// Frequency programmed by [`Pca9685::init`].
pub const DEFAULT_FREQUENCY_HZ: u32 = 60;

/// Delay after restarting the oscillator during [`Pca9685::init`].
const RESET_SETTLE_MS: u32 = 10;
/// Delay between leaving sleep and setting `RESTART` when reprogramming the prescaler.
const PRESCALE_SETTLE_MS: u32 = 5;

const PRESCALE_MIN: u8 = 0x03;
const PRESCALE_MAX: u8 = 0xFF;

const MODE1_ALLCALL: u8 = 0x01;
const MODE1_SLEEP: u8 = 0x10;
const MODE1_AI: u8 = 0x20;
const MODE1_RESTART: u8 = 0x80;

const MODE2_OUTDRV: u8 = 0x04;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Regs {
    /// MODE1: restart, auto-increment, sleep, sub-address and all-call enables
    Mode1 = 0x00,
    /// MODE2: output inversion, change-on-ack/stop, totem-pole vs open-drain outputs
    Mode2 = 0x01,
    Led0OnL = 0x06,
    AllLedOnL = 0xFA,
    /// PRE_SCALE: only writable while MODE1.SLEEP is set
    PreScale = 0xFE,
}

impl From<Regs> for u8 {
    fn from(r: Regs) -> u8 {
        r as u8
    }
}

/// Prescaler value giving the output frequency closest to `hz` with a `clock_hz` oscillator.
///
/// `round(clock_hz / 4096 / hz) - 1`, saturated to the range the chip accepts.
pub const fn prescale_for(clock_hz: u32, hz: u32) -> u8 {
    let hz = if hz == 0 { 1 } else { hz as u64 };
    let divisor = 4096 * hz;
    let rounded = (clock_hz as u64 + divisor / 2) / divisor;
    let prescale = rounded.saturating_sub(1);
    if prescale < PRESCALE_MIN as u64 {
        PRESCALE_MIN
    } else if prescale > PRESCALE_MAX as u64 {
        PRESCALE_MAX
    } else {
        prescale as u8
    }
}

/// Register protocol for one PCA9685 on the bus.
///
/// This type holds no bus handle; every method takes the bus it should talk over so that the
/// PWM chip and the ADCs can share a single `I2c` instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pca9685 {
    address: u8,
    clock_hz: u32,
}

impl Pca9685 {
    pub const fn new(address: u8, clock_hz: u32) -> Self {
        Self { address, clock_hz }
    }

    pub const fn address(&self) -> u8 {
        self.address
    }

    /// Restart the chip with totem-pole outputs at [`DEFAULT_FREQUENCY_HZ`] and all channels off.
    pub fn init<I2C: I2c, D: DelayNs>(
        &self,
        i2c: &mut I2C,
        delay: &mut D,
    ) -> Result<(), I2C::Error> {
        i2c.write_reg(self.address, Regs::Mode2, MODE2_OUTDRV)?;
        i2c.write_reg(self.address, Regs::Mode1, MODE1_RESTART)?;
        delay.delay_ms(RESET_SETTLE_MS);

        self.set_frequency(i2c, delay, DEFAULT_FREQUENCY_HZ)?;
        self.set_all(i2c, PulseWindow::OFF)
    }

    /// Reprogram the output frequency.  Returns the prescaler value that was written.
    ///
    /// The prescaler only accepts writes while the oscillator is stopped, so the chip is put to
    /// sleep, programmed, woken with its previous mode, and finally restarted with
    /// auto-increment enabled.
    pub fn set_frequency<I2C: I2c, D: DelayNs>(
        &self,
        i2c: &mut I2C,
        delay: &mut D,
        hz: u32,
    ) -> Result<u8, I2C::Error> {
        let prescale = prescale_for(self.clock_hz, hz);
        debug!("pca9685: {} Hz -> prescale {}", hz, prescale);

        let old_mode = self.read_mode(i2c, Regs::Mode1)?;
        let sleep_mode = (old_mode & !MODE1_RESTART) | MODE1_SLEEP;

        i2c.write_reg(self.address, Regs::Mode1, sleep_mode)?;
        i2c.write_reg(self.address, Regs::PreScale, prescale)?;
        i2c.write_reg(self.address, Regs::Mode1, old_mode)?;
        delay.delay_ms(PRESCALE_SETTLE_MS);
        i2c.write_reg(
            self.address,
            Regs::Mode1,
            old_mode | MODE1_RESTART | MODE1_AI,
        )?;
        Ok(prescale)
    }

    /// Program the pulse window of a single physical channel.
    pub fn set_channel<I2C: I2c>(
        &self,
        i2c: &mut I2C,
        channel: u8,
        window: PulseWindow,
    ) -> Result<(), I2C::Error> {
        assert!(channel < CHANNELS);
        trace!(
            "pca9685: ch{} on={} off={}",
            channel,
            window.start(),
            window.length()
        );
        i2c.write(self.address, &window.frame(channel_register(channel)))
    }

    /// Program the same pulse window on every channel with one broadcast write.
    pub fn set_all<I2C: I2c>(&self, i2c: &mut I2C, window: PulseWindow) -> Result<(), I2C::Error> {
        i2c.write(self.address, &window.frame(Regs::AllLedOnL.into()))
    }

    /// Read back the pulse window currently programmed on a physical channel.
    pub fn read_channel<I2C: I2c>(
        &self,
        i2c: &mut I2C,
        channel: u8,
    ) -> Result<PulseWindow, I2C::Error> {
        assert!(channel < CHANNELS);
        let regs = i2c.read_regs::<u8, 4>(self.address, channel_register(channel))?;
        Ok(PulseWindow::from_registers(regs))
    }

    pub fn read_mode<I2C: I2c>(&self, i2c: &mut I2C, reg: Regs) -> Result<u8, I2C::Error> {
        i2c.read_reg(self.address, reg)
    }

    pub fn write_mode<I2C: I2c>(
        &self,
        i2c: &mut I2C,
        reg: Regs,
        value: u8,
    ) -> Result<(), I2C::Error> {
        i2c.write_reg(self.address, reg, value)
    }

    /// Enable or disable the all-call address (0x70) in MODE1.
    pub fn set_all_call<I2C: I2c>(&self, i2c: &mut I2C, enable: bool) -> Result<(), I2C::Error> {
        let mode = self.read_mode(i2c, Regs::Mode1)?;
        let mode = if enable {
            mode | MODE1_ALLCALL
        } else {
            mode & !MODE1_ALLCALL
        };
        // writing a 1 to RESTART would restart the PWM cycle, keep it clear
        self.write_mode(i2c, Regs::Mode1, mode & !MODE1_RESTART)
    }
}

const fn channel_register(channel: u8) -> u8 {
    Regs::Led0OnL as u8 + 4 * channel
}
