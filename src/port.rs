use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self as hal_digital, PinState};
use embedded_hal::i2c::I2c;
use embedded_hal::pwm as hal_pwm;

use crate::codec::{PulseWindow, MAX_12BIT};
use crate::shield::Driver;
use crate::{Error, ShieldMutex};

/// A servo plugged into one of the shield's ports.
///
/// `Servo` is not constructed directly, it is obtained from [`Shield::servo()`][crate::Shield::servo].
/// It holds no state of its own: it can be copied freely and every call talks to the chip.
pub struct Servo<'a, MUTEX> {
    port: u8,
    driver: &'a MUTEX,
}

impl<MUTEX> Clone for Servo<'_, MUTEX> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<MUTEX> Copy for Servo<'_, MUTEX> {}

impl<'a, MUTEX> Servo<'a, MUTEX> {
    pub(crate) fn new(port: u8, driver: &'a MUTEX) -> Self {
        Self { port, driver }
    }

    pub fn port(&self) -> u8 {
        self.port
    }
}

impl<MUTEX, I2C, D> Servo<'_, MUTEX>
where
    I2C: I2c,
    D: DelayNs,
    MUTEX: ShieldMutex<Driver = Driver<I2C, D>>,
{
    /// Move to `angle` degrees.  Angles outside `0..=180` are clamped.
    pub fn set_position(&self, angle: i32) -> Result<(), Error<I2C::Error>> {
        self.driver
            .lock(|drv| drv.set_servo_angle(self.port, angle))
    }

    /// Pulse length currently programmed for this servo, in PWM ticks.
    ///
    /// This is the raw register value, not an angle.
    pub fn position(&self) -> Result<u16, Error<I2C::Error>> {
        self.driver
            .lock(|drv| drv.pulse(self.port))
            .map(|window| window.length())
    }
}

/// A universal I/O port of the shield.
///
/// Obtained from [`Shield::port()`][crate::Shield::port].  Implements the `embedded-hal` digital
/// input/output traits (reading through the ADC and threshold, writing through the PWM chip) and
/// [`SetDutyCycle`][hal_pwm::SetDutyCycle] with a 12-bit duty range.
pub struct Port<'a, MUTEX> {
    port: u8,
    driver: &'a MUTEX,
}

impl<MUTEX> Clone for Port<'_, MUTEX> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<MUTEX> Copy for Port<'_, MUTEX> {}

impl<'a, MUTEX> Port<'a, MUTEX> {
    pub(crate) fn new(port: u8, driver: &'a MUTEX) -> Self {
        Self { port, driver }
    }

    pub fn port(&self) -> u8 {
        self.port
    }
}

impl<MUTEX, I2C, D> Port<'_, MUTEX>
where
    I2C: I2c,
    D: DelayNs,
    MUTEX: ShieldMutex<Driver = Driver<I2C, D>>,
{
    pub fn read_analog(&self) -> Result<u16, Error<I2C::Error>> {
        self.driver.lock(|drv| drv.read_analog(self.port))
    }

    pub fn read_digital(&self) -> Result<PinState, Error<I2C::Error>> {
        self.driver.lock(|drv| drv.read_digital(self.port))
    }

    pub fn write_digital(&self, level: PinState) -> Result<(), Error<I2C::Error>> {
        self.driver.lock(|drv| drv.write_digital(self.port, level))
    }

    pub fn set_pulse(&self, start: i32, length: i32) -> Result<(), Error<I2C::Error>> {
        self.driver
            .lock(|drv| drv.set_channel_pulse(self.port, start, length))
    }

    pub fn pulse(&self) -> Result<PulseWindow, Error<I2C::Error>> {
        self.driver.lock(|drv| drv.pulse(self.port))
    }
}

impl<MUTEX, I2C, D> hal_digital::ErrorType for Port<'_, MUTEX>
where
    I2C: I2c,
    D: DelayNs,
    MUTEX: ShieldMutex<Driver = Driver<I2C, D>>,
{
    type Error = Error<I2C::Error>;
}

impl<MUTEX, I2C, D> hal_digital::InputPin for Port<'_, MUTEX>
where
    I2C: I2c,
    D: DelayNs,
    MUTEX: ShieldMutex<Driver = Driver<I2C, D>>,
{
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.read_digital()? == PinState::High)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.read_digital()? == PinState::Low)
    }
}

impl<MUTEX, I2C, D> hal_digital::OutputPin for Port<'_, MUTEX>
where
    I2C: I2c,
    D: DelayNs,
    MUTEX: ShieldMutex<Driver = Driver<I2C, D>>,
{
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write_digital(PinState::Low)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write_digital(PinState::High)
    }
}

impl<MUTEX, I2C, D> hal_pwm::ErrorType for Port<'_, MUTEX>
where
    I2C: I2c,
    D: DelayNs,
    MUTEX: ShieldMutex<Driver = Driver<I2C, D>>,
{
    type Error = Error<I2C::Error>;
}

impl<MUTEX, I2C, D> hal_pwm::SetDutyCycle for Port<'_, MUTEX>
where
    I2C: I2c,
    D: DelayNs,
    MUTEX: ShieldMutex<Driver = Driver<I2C, D>>,
{
    fn max_duty_cycle(&self) -> u16 {
        MAX_12BIT
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.set_pulse(0, duty as i32)
    }
}
