//! Board descriptions.
//!
//! The expansion boards differ only in how many ports are populated, which chip addresses are
//! fitted, and how the connectors are routed to chip channels.  All of that lives in a
//! [`BoardProfile`] so the drivers stay the same for every revision.

/// One analog input: which ADC chip (index into [`BoardProfile::adc_addresses`]) and which
/// channel on that chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcInput {
    pub chip: u8,
    pub channel: u8,
}

const fn adc(chip: u8, channel: u8) -> AdcInput {
    AdcInput { chip, channel }
}

/// Linear angle to pulse mapping for hobby servos.
///
/// `pulse = angle * span / 180 + min`, in ticks out of the 4096-tick PWM period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServoCalibration {
    pub span: u16,
    pub min: u16,
}

impl ServoCalibration {
    pub const MAX_ANGLE: i32 = 180;

    /// Pulse length for `angle` degrees.  The angle is clamped to `0..=180`.
    pub const fn pulse_length(&self, angle: i32) -> u16 {
        let angle = if angle < 0 {
            0
        } else if angle > Self::MAX_ANGLE {
            Self::MAX_ANGLE
        } else {
            angle
        };
        (angle * self.span as i32 / Self::MAX_ANGLE) as u16 + self.min
    }
}

/// Static description of an expansion board revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoardProfile {
    /// Bus address of the PCA9685.
    pub pwm_address: u8,
    /// Bus addresses of the fitted ADS7128 chips.
    pub adc_addresses: &'static [u8],
    /// PWM channel driven by each logical port.  The length of this table is the port count.
    pub pwm_channels: &'static [u8],
    /// Analog input sampled for each logical port.  Same length as `pwm_channels`.
    pub adc_inputs: &'static [AdcInput],
    pub servo: ServoCalibration,
    /// Frequency of the clock feeding the PWM prescaler.
    pub pwm_clock_hz: u32,
    /// Byte order of the ADC conversion frame.
    pub adc_big_endian: bool,
}

// Logical ports 0..8 are the first pin of each connector and are wired to the even channels of
// the low bank, counting down; ports 8..16 are the second pins and take the odd channels.  The
// high bank is then filled upwards in the same interleave.
const SIXTEEN_PORT_PWM: [u8; 16] = [7, 5, 3, 1, 8, 10, 12, 14, 6, 4, 2, 0, 9, 11, 13, 15];

// Connectors 1-4 go to the ADC at 0x17, connectors 5-8 to the one at 0x10.  First pins sit on the
// odd inputs, second pins on the even ones.
const SIXTEEN_PORT_ADC: [AdcInput; 16] = [
    adc(0, 1),
    adc(0, 3),
    adc(0, 5),
    adc(0, 7),
    adc(1, 1),
    adc(1, 3),
    adc(1, 5),
    adc(1, 7),
    adc(0, 0),
    adc(0, 2),
    adc(0, 4),
    adc(0, 6),
    adc(1, 0),
    adc(1, 2),
    adc(1, 4),
    adc(1, 6),
];

const EIGHT_PORT_PWM: [u8; 8] = [7, 5, 3, 1, 8, 10, 12, 14];

const EIGHT_PORT_ADC: [AdcInput; 8] = [
    adc(0, 0),
    adc(0, 1),
    adc(0, 2),
    adc(0, 3),
    adc(0, 4),
    adc(0, 5),
    adc(0, 6),
    adc(0, 7),
];

pub const PCA9685_ADDRESS: u8 = 0x40;
pub const ADS7128_ADDRESS_LOW: u8 = 0x17;
pub const ADS7128_ADDRESS_HIGH: u8 = 0x10;

impl BoardProfile {
    /// Eight single-pin connectors, one ADC.
    pub const EIGHT_PORT: Self = Self {
        pwm_address: PCA9685_ADDRESS,
        adc_addresses: &[ADS7128_ADDRESS_LOW],
        pwm_channels: &EIGHT_PORT_PWM,
        adc_inputs: &EIGHT_PORT_ADC,
        servo: ServoCalibration { span: 450, min: 125 },
        pwm_clock_hz: 27_000_000,
        adc_big_endian: true,
    };

    /// Eight two-pin connectors, two ADCs.
    pub const SIXTEEN_PORT: Self = Self {
        pwm_address: PCA9685_ADDRESS,
        adc_addresses: &[ADS7128_ADDRESS_LOW, ADS7128_ADDRESS_HIGH],
        pwm_channels: &SIXTEEN_PORT_PWM,
        adc_inputs: &SIXTEEN_PORT_ADC,
        servo: ServoCalibration { span: 450, min: 125 },
        pwm_clock_hz: 27_000_000,
        adc_big_endian: true,
    };

    pub const fn port_count(&self) -> u8 {
        self.pwm_channels.len() as u8
    }

    /// PWM channel for `port`, or `None` if the board has no such port.
    pub fn pwm_channel(&self, port: u8) -> Option<u8> {
        self.pwm_channels.get(port as usize).copied()
    }

    /// ADC address and channel for `port`, or `None` if the board has no such port.
    pub fn adc_input(&self, port: u8) -> Option<(u8, u8)> {
        let input = self.adc_inputs.get(port as usize)?;
        let address = self.adc_addresses.get(input.chip as usize)?;
        Some((*address, input.channel))
    }
}

/// Logical port number of pin `pin` (1 or 2) on connector `connector` (1 to 8) of the
/// sixteen-port board, as printed on the silkscreen ("UI/O 3.2" is `connector_port(3, 2)`).
pub const fn connector_port(connector: u8, pin: u8) -> Option<u8> {
    match (connector, pin) {
        (1..=8, 1) => Some(connector - 1),
        (1..=8, 2) => Some(connector + 7),
        _ => None,
    }
}
