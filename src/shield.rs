//! The logical port layer.
//!
//! Translates port numbers as printed on the board into PCA9685 channels and ADS7128 inputs,
//! and implements the digital read/write policy on top of the analog hardware.
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::PinState;
use embedded_hal::i2c::I2c;

use crate::codec::{self, PulseWindow};
use crate::dev::ads7128::Ads7128;
use crate::dev::pca9685::Pca9685;
use crate::{BoardProfile, Error, ShieldMutex};

/// Threshold used by [`Driver::read_digital`] until changed.  Half of the ADC's range.
pub const DEFAULT_THRESHOLD: u16 = 2047;

/// Interpret an integer level the way the block API does: exactly `1` is HIGH, anything else
/// (including other non-zero values) is LOW.
pub const fn level_from_raw(level: i32) -> PinState {
    if level == 1 {
        PinState::High
    } else {
        PinState::Low
    }
}

/// The shield's bus, delay, and per-instance settings.
///
/// Usually not used directly; [`Shield`] wraps it in a mutex so handles can share it.
pub struct Driver<I2C, D> {
    i2c: I2C,
    delay: D,
    profile: BoardProfile,
    pwm: Pca9685,
    threshold: u16,
}

impl<I2C, D> Driver<I2C, D> {
    pub fn new(i2c: I2C, delay: D, profile: BoardProfile) -> Self {
        Self {
            i2c,
            delay,
            pwm: Pca9685::new(profile.pwm_address, profile.pwm_clock_hz),
            profile,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn profile(&self) -> &BoardProfile {
        &self.profile
    }

    pub fn digital_threshold(&self) -> u16 {
        self.threshold
    }

    /// Set the level above which [`Driver::read_digital`] reports HIGH.  Clamped to `0..=4095`.
    /// Returns the stored value.
    pub fn set_digital_threshold(&mut self, value: i32) -> u16 {
        self.threshold = codec::clamp12(value);
        debug!("digital threshold = {}", self.threshold);
        self.threshold
    }

    /// Give back the bus and delay.
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }
}

impl<I2C: I2c, D: DelayNs> Driver<I2C, D> {
    /// Configure every ADC on the board, then reset the PWM chip to 60 Hz with all outputs off.
    pub fn init(&mut self) -> Result<(), Error<I2C::Error>> {
        for &address in self.profile.adc_addresses {
            Ads7128::new(address, self.profile.adc_big_endian).init(&mut self.i2c)?;
        }
        self.pwm.init(&mut self.i2c, &mut self.delay)?;
        debug!("shield ready, {} ports", self.profile.port_count());
        Ok(())
    }

    /// Sample the analog input behind `port`.  Returns a 12-bit value.
    pub fn read_analog(&mut self, port: u8) -> Result<u16, Error<I2C::Error>> {
        let (address, channel) = self.profile.adc_input(port).ok_or_else(|| {
            warn!("port {} is not an analog input on this board", port);
            Error::OutOfRange
        })?;
        let adc = Ads7128::new(address, self.profile.adc_big_endian);
        Ok(adc.read_channel(&mut self.i2c, channel)?)
    }

    /// Sample `port` and compare against the digital threshold.  HIGH iff strictly above.
    pub fn read_digital(&mut self, port: u8) -> Result<PinState, Error<I2C::Error>> {
        let sample = self.read_analog(port)?;
        Ok(PinState::from(sample > self.threshold))
    }

    /// Drive `port` fully on or fully off.
    pub fn write_digital(&mut self, port: u8, level: PinState) -> Result<(), Error<I2C::Error>> {
        let window = match level {
            PinState::High => PulseWindow::FULL,
            PinState::Low => PulseWindow::OFF,
        };
        self.set_pulse(port, window)
    }

    /// Change the PWM frequency of all outputs.  Returns the prescaler that was programmed.
    pub fn set_pwm_frequency(&mut self, hz: u32) -> Result<u8, Error<I2C::Error>> {
        Ok(self.pwm.set_frequency(&mut self.i2c, &mut self.delay, hz)?)
    }

    /// Program the pulse of `port`.  Both values are clamped to `0..=4095` ticks.
    pub fn set_channel_pulse(
        &mut self,
        port: u8,
        start: i32,
        length: i32,
    ) -> Result<(), Error<I2C::Error>> {
        self.set_pulse(port, PulseWindow::new(start, length))
    }

    /// Program the same pulse on every PWM channel, whether or not it is routed to a port.
    pub fn set_all_channels_pulse(
        &mut self,
        start: i32,
        length: i32,
    ) -> Result<(), Error<I2C::Error>> {
        Ok(self
            .pwm
            .set_all(&mut self.i2c, PulseWindow::new(start, length))?)
    }

    pub fn set_pulse(&mut self, port: u8, window: PulseWindow) -> Result<(), Error<I2C::Error>> {
        let channel = self.pwm_channel(port)?;
        Ok(self.pwm.set_channel(&mut self.i2c, channel, window)?)
    }

    /// Read back the pulse currently programmed for `port`.
    pub fn pulse(&mut self, port: u8) -> Result<PulseWindow, Error<I2C::Error>> {
        let channel = self.pwm_channel(port)?;
        Ok(self.pwm.read_channel(&mut self.i2c, channel)?)
    }

    fn pwm_channel(&self, port: u8) -> Result<u8, Error<I2C::Error>> {
        self.profile.pwm_channel(port).ok_or_else(|| {
            warn!("port {} is not a PWM output on this board", port);
            Error::OutOfRange
        })
    }

    /// Move the servo on `port` to `angle` degrees (clamped to `0..=180`).
    pub fn set_servo_angle(&mut self, port: u8, angle: i32) -> Result<(), Error<I2C::Error>> {
        let length = self.profile.servo.pulse_length(angle);
        self.set_pulse(port, PulseWindow::new(0, length as i32))
    }
}

/// An expansion board with its PWM chip and ADCs.
///
/// ## Example
/// ```no_run
/// # let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
/// # let delay = embedded_hal_mock::eh1::delay::NoopDelay::new();
/// use uio_shield::{BoardProfile, Shield};
///
/// let shield = Shield::new(i2c, delay, BoardProfile::SIXTEEN_PORT);
/// shield.init().unwrap();
///
/// let arm = shield.servo(3).unwrap();
/// arm.set_position(90).unwrap();
///
/// if shield.read_digital(0).unwrap().into() {
///     shield.write_digital(1, embedded_hal::digital::PinState::High).unwrap();
/// }
/// ```
pub struct Shield<M>(M);

impl<I2C, D> Shield<core::cell::RefCell<Driver<I2C, D>>>
where
    I2C: I2c,
    D: DelayNs,
{
    pub fn new(i2c: I2C, delay: D, profile: BoardProfile) -> Self {
        Self::with_mutex(i2c, delay, profile)
    }
}

impl<I2C, D, M> Shield<M>
where
    I2C: I2c,
    D: DelayNs,
    M: ShieldMutex<Driver = Driver<I2C, D>>,
{
    pub fn with_mutex(i2c: I2C, delay: D, profile: BoardProfile) -> Self {
        Self(ShieldMutex::create(Driver::new(i2c, delay, profile)))
    }

    pub fn profile(&self) -> BoardProfile {
        self.0.lock(|drv| *drv.profile())
    }

    pub fn init(&self) -> Result<(), Error<I2C::Error>> {
        self.0.lock(|drv| drv.init())
    }

    pub fn read_analog(&self, port: u8) -> Result<u16, Error<I2C::Error>> {
        self.0.lock(|drv| drv.read_analog(port))
    }

    pub fn read_digital(&self, port: u8) -> Result<PinState, Error<I2C::Error>> {
        self.0.lock(|drv| drv.read_digital(port))
    }

    pub fn write_digital(&self, port: u8, level: PinState) -> Result<(), Error<I2C::Error>> {
        self.0.lock(|drv| drv.write_digital(port, level))
    }

    pub fn digital_threshold(&self) -> u16 {
        self.0.lock(|drv| drv.digital_threshold())
    }

    pub fn set_digital_threshold(&self, value: i32) -> u16 {
        self.0.lock(|drv| drv.set_digital_threshold(value))
    }

    pub fn set_pwm_frequency(&self, hz: u32) -> Result<u8, Error<I2C::Error>> {
        self.0.lock(|drv| drv.set_pwm_frequency(hz))
    }

    pub fn set_channel_pulse(
        &self,
        port: u8,
        start: i32,
        length: i32,
    ) -> Result<(), Error<I2C::Error>> {
        self.0.lock(|drv| drv.set_channel_pulse(port, start, length))
    }

    pub fn set_all_channels_pulse(&self, start: i32, length: i32) -> Result<(), Error<I2C::Error>> {
        self.0.lock(|drv| drv.set_all_channels_pulse(start, length))
    }

    /// Handle for a servo plugged into `port`.
    pub fn servo(&self, port: u8) -> Result<crate::Servo<'_, M>, Error<I2C::Error>> {
        self.check_port(port)?;
        Ok(crate::Servo::new(port, &self.0))
    }

    /// Handle for `port` implementing the `embedded-hal` digital and PWM traits.
    pub fn port(&self, port: u8) -> Result<crate::Port<'_, M>, Error<I2C::Error>> {
        self.check_port(port)?;
        Ok(crate::Port::new(port, &self.0))
    }

    /// Consume the shield and give back the bus and delay.
    pub fn release(self) -> (I2C, D) {
        self.0.into_inner().release()
    }

    fn check_port(&self, port: u8) -> Result<(), Error<I2C::Error>> {
        if port < self.0.lock(|drv| drv.profile().port_count()) {
            Ok(())
        } else {
            Err(Error::OutOfRange)
        }
    }
}

#[cfg(test)]
mod tests {
    use core::convert::Infallible;

    use embedded_hal::i2c::{ErrorType, Operation};
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::i2c as mock_i2c;

    use super::*;

    #[test]
    fn init_sixteen_port() {
        let mut expectations = Vec::new();
        for adc in [0x17, 0x10] {
            expectations.extend([
                mock_i2c::Transaction::write(adc, vec![0x08, 0x05, 0x00]),
                mock_i2c::Transaction::write(adc, vec![0x08, 0x03, 0x07]),
                mock_i2c::Transaction::write(adc, vec![0x08, 0x10, 0x00]),
                mock_i2c::Transaction::write(adc, vec![0x08, 0x04, 0x00]),
            ]);
        }
        expectations.extend([
            mock_i2c::Transaction::write(0x40, vec![0x01, 0x04]),
            mock_i2c::Transaction::write(0x40, vec![0x00, 0x80]),
            mock_i2c::Transaction::write_read(0x40, vec![0x00], vec![0x80]),
            mock_i2c::Transaction::write(0x40, vec![0x00, 0x10]),
            mock_i2c::Transaction::write(0x40, vec![0xfe, 109]),
            mock_i2c::Transaction::write(0x40, vec![0x00, 0x80]),
            mock_i2c::Transaction::write(0x40, vec![0x00, 0xa0]),
            mock_i2c::Transaction::write(0x40, vec![0xfa, 0x00, 0x00, 0x00, 0x00]),
        ]);
        let mut bus = mock_i2c::Mock::new(&expectations);

        let shield = Shield::new(bus.clone(), NoopDelay::new(), BoardProfile::SIXTEEN_PORT);
        shield.init().unwrap();

        bus.done();
    }

    #[test]
    fn init_eight_port_skips_missing_adc() {
        let expectations = [
            mock_i2c::Transaction::write(0x17, vec![0x08, 0x05, 0x00]),
            mock_i2c::Transaction::write(0x17, vec![0x08, 0x03, 0x07]),
            mock_i2c::Transaction::write(0x17, vec![0x08, 0x10, 0x00]),
            mock_i2c::Transaction::write(0x17, vec![0x08, 0x04, 0x00]),
            mock_i2c::Transaction::write(0x40, vec![0x01, 0x04]),
            mock_i2c::Transaction::write(0x40, vec![0x00, 0x80]),
            mock_i2c::Transaction::write_read(0x40, vec![0x00], vec![0x00]),
            mock_i2c::Transaction::write(0x40, vec![0x00, 0x10]),
            mock_i2c::Transaction::write(0x40, vec![0xfe, 109]),
            mock_i2c::Transaction::write(0x40, vec![0x00, 0x00]),
            mock_i2c::Transaction::write(0x40, vec![0x00, 0xa0]),
            mock_i2c::Transaction::write(0x40, vec![0xfa, 0x00, 0x00, 0x00, 0x00]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let shield = Shield::new(bus.clone(), NoopDelay::new(), BoardProfile::EIGHT_PORT);
        shield.init().unwrap();

        bus.done();
    }

    #[test]
    fn analog_routing() {
        let expectations = [
            // port 0 -> 0x17 ch1
            mock_i2c::Transaction::write(0x17, vec![0x08, 0x11, 0x01]),
            mock_i2c::Transaction::read(0x17, vec![0x12, 0x31]),
            // port 5 -> 0x10 ch3
            mock_i2c::Transaction::write(0x10, vec![0x08, 0x11, 0x03]),
            mock_i2c::Transaction::read(0x10, vec![0x00, 0x03]),
            // port 11 -> 0x17 ch6
            mock_i2c::Transaction::write(0x17, vec![0x08, 0x11, 0x06]),
            mock_i2c::Transaction::read(0x17, vec![0xff, 0xf6]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let shield = Shield::new(bus.clone(), NoopDelay::new(), BoardProfile::SIXTEEN_PORT);
        assert_eq!(shield.read_analog(0), Ok(0x123));
        assert_eq!(shield.read_analog(5), Ok(0x000));
        assert_eq!(shield.read_analog(11), Ok(0xfff));

        bus.done();
    }

    #[test]
    fn out_of_range_ports_do_not_touch_the_bus() {
        let mut bus = mock_i2c::Mock::new(&[]);

        let sixteen = Shield::new(bus.clone(), NoopDelay::new(), BoardProfile::SIXTEEN_PORT);
        assert_eq!(sixteen.read_analog(16), Err(Error::OutOfRange));
        assert_eq!(sixteen.read_digital(200), Err(Error::OutOfRange));
        assert_eq!(sixteen.set_channel_pulse(16, 0, 100), Err(Error::OutOfRange));
        assert_eq!(
            sixteen.write_digital(16, PinState::High),
            Err(Error::OutOfRange)
        );
        assert!(matches!(sixteen.servo(16), Err(Error::OutOfRange)));

        let eight = Shield::new(bus.clone(), NoopDelay::new(), BoardProfile::EIGHT_PORT);
        assert_eq!(eight.read_analog(8), Err(Error::OutOfRange));
        assert_eq!(eight.set_channel_pulse(8, 0, 100), Err(Error::OutOfRange));
        assert!(matches!(eight.port(8), Err(Error::OutOfRange)));

        bus.done();
    }

    #[test]
    fn digital_threshold() {
        let mut bus = mock_i2c::Mock::new(&[]);
        let shield = Shield::new(bus.clone(), NoopDelay::new(), BoardProfile::SIXTEEN_PORT);

        assert_eq!(shield.digital_threshold(), DEFAULT_THRESHOLD);
        assert_eq!(shield.set_digital_threshold(5000), 4095);
        assert_eq!(shield.digital_threshold(), 4095);
        assert_eq!(shield.set_digital_threshold(-10), 0);
        assert_eq!(shield.set_digital_threshold(1000), 1000);

        // a second instance keeps its own threshold
        let other = Shield::new(bus.clone(), NoopDelay::new(), BoardProfile::SIXTEEN_PORT);
        assert_eq!(other.digital_threshold(), DEFAULT_THRESHOLD);

        bus.done();
    }

    #[test]
    fn read_digital_is_strictly_above_threshold() {
        let expectations = [
            mock_i2c::Transaction::write(0x17, vec![0x08, 0x11, 0x01]),
            mock_i2c::Transaction::read(0x17, vec![0x7f, 0xf1]),
            mock_i2c::Transaction::write(0x17, vec![0x08, 0x11, 0x01]),
            mock_i2c::Transaction::read(0x17, vec![0x80, 0x01]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let shield = Shield::new(bus.clone(), NoopDelay::new(), BoardProfile::SIXTEEN_PORT);
        assert_eq!(shield.read_digital(0), Ok(PinState::Low));
        assert_eq!(shield.read_digital(0), Ok(PinState::High));

        bus.done();
    }

    #[test]
    fn write_digital_and_pulses() {
        let expectations = [
            // port 0 -> channel 7
            mock_i2c::Transaction::write(0x40, vec![0x22, 0x00, 0x00, 0xff, 0x0f]),
            mock_i2c::Transaction::write(0x40, vec![0x22, 0x00, 0x00, 0x00, 0x00]),
            // port 7 -> channel 14
            mock_i2c::Transaction::write(0x40, vec![0x3e, 0x00, 0x00, 0xff, 0x0f]),
            // port 11 -> channel 0, clamped both ways
            mock_i2c::Transaction::write(0x40, vec![0x06, 0x00, 0x00, 0xff, 0x0f]),
            mock_i2c::Transaction::write(0x40, vec![0xfa, 0x64, 0x00, 0xc8, 0x00]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let shield = Shield::new(bus.clone(), NoopDelay::new(), BoardProfile::SIXTEEN_PORT);
        shield.write_digital(0, PinState::High).unwrap();
        shield.write_digital(0, level_from_raw(0)).unwrap();
        shield.write_digital(7, level_from_raw(1)).unwrap();
        shield.set_channel_pulse(11, -20, 65535).unwrap();
        shield.set_all_channels_pulse(100, 200).unwrap();

        bus.done();
    }

    #[test]
    fn raw_levels() {
        assert_eq!(level_from_raw(1), PinState::High);
        assert_eq!(level_from_raw(0), PinState::Low);
        assert_eq!(level_from_raw(2), PinState::Low);
        assert_eq!(level_from_raw(-1), PinState::Low);
    }

    #[test]
    fn release_returns_bus() {
        let shield = Shield::new(
            mock_i2c::Mock::new(&[]),
            NoopDelay::new(),
            BoardProfile::EIGHT_PORT,
        );
        let (mut bus, _delay) = shield.release();
        bus.done();
    }

    #[test]
    fn std_mutex() {
        let expectations = [mock_i2c::Transaction::write(
            0x40,
            vec![0x26, 0x00, 0x00, 0x5e, 0x01],
        )];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let shield: Shield<std::sync::Mutex<_>> =
            Shield::with_mutex(bus.clone(), NoopDelay::new(), BoardProfile::EIGHT_PORT);
        // port 4 -> channel 8
        shield.servo(4).unwrap().set_position(90).unwrap();

        bus.done();
    }

    /// Feeds the pulse length programmed on a port's PWM channel back into that port's ADC input.
    struct Loopback {
        profile: BoardProfile,
        lengths: [u16; 16],
        selected: Option<u8>,
    }

    impl Loopback {
        fn new(profile: BoardProfile) -> Self {
            Self {
                profile,
                lengths: [0; 16],
                selected: None,
            }
        }

        fn port_for_pwm(&self, channel: u8) -> Option<u8> {
            (0..self.profile.port_count()).find(|&p| self.profile.pwm_channel(p) == Some(channel))
        }

        fn port_for_adc(&self, address: u8, channel: u8) -> Option<u8> {
            (0..self.profile.port_count())
                .find(|&p| self.profile.adc_input(p) == Some((address, channel)))
        }
    }

    impl Loopback {
        fn on_write(&mut self, address: u8, bytes: &[u8]) {
            match *bytes {
                [reg, _, _, off_l, off_h] if address == 0x40 && (0x06..0x46).contains(&reg) => {
                    if let Some(port) = self.port_for_pwm((reg - 0x06) / 4) {
                        self.lengths[port as usize] = codec::decode16(off_l, off_h);
                    }
                }
                [0x08, 0x11, channel] => {
                    self.selected = self.port_for_adc(address, channel);
                }
                _ => {}
            }
        }

        fn on_read(&mut self, buf: &mut [u8]) {
            let length = self.selected.map_or(0, |p| self.lengths[p as usize]);
            let (low, high) = codec::encode16(length << 4);
            buf[0] = high;
            buf[1] = low;
        }
    }

    impl ErrorType for Loopback {
        type Error = Infallible;
    }

    impl I2c for Loopback {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            for op in operations {
                match op {
                    Operation::Write(bytes) => self.on_write(address, bytes),
                    Operation::Read(buf) => self.on_read(buf),
                }
            }
            Ok(())
        }
    }

    #[test]
    fn digital_loopback() {
        for profile in [BoardProfile::EIGHT_PORT, BoardProfile::SIXTEEN_PORT] {
            let shield = Shield::new(Loopback::new(profile), NoopDelay::new(), profile);
            for port in 0..profile.port_count() {
                shield.write_digital(port, PinState::High).unwrap();
                assert_eq!(shield.read_digital(port), Ok(PinState::High));
                assert_eq!(shield.read_analog(port), Ok(4095));

                shield.write_digital(port, PinState::Low).unwrap();
                assert_eq!(shield.read_digital(port), Ok(PinState::Low));
            }
        }
    }
}
