//! Byte packing for the register layouts of both chips.
//!
//! Nothing in here fails: out-of-range numbers are saturated the same way the hardware would
//! saturate them, so the bytes on the wire are always a valid encoding.

/// Largest value representable in a 12-bit PWM counter or ADC result.
pub const MAX_12BIT: u16 = 0x0FFF;

/// Split a 16-bit value into `(low, high)` bytes.
pub const fn encode16(value: u16) -> (u8, u8) {
    ((value & 0xFF) as u8, (value >> 8) as u8)
}

/// Inverse of [`encode16`].
pub const fn decode16(low: u8, high: u8) -> u16 {
    (high as u16) << 8 | low as u16
}

/// Saturate any integer into `0..=4095`.
pub const fn clamp12(value: i32) -> u16 {
    if value < 0 {
        0
    } else if value > MAX_12BIT as i32 {
        MAX_12BIT
    } else {
        value as u16
    }
}

/// A PWM on/off pair, in ticks of the 4096-step PWM period.
///
/// Both values are always within `0..=4095`; [`PulseWindow::new`] clamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PulseWindow {
    start: u16,
    length: u16,
}

impl PulseWindow {
    /// Output permanently low.
    pub const OFF: Self = Self { start: 0, length: 0 };
    /// Output high for the whole period.
    pub const FULL: Self = Self {
        start: 0,
        length: MAX_12BIT,
    };

    pub const fn new(start: i32, length: i32) -> Self {
        Self {
            start: clamp12(start),
            length: clamp12(length),
        }
    }

    pub const fn start(&self) -> u16 {
        self.start
    }

    pub const fn length(&self) -> u16 {
        self.length
    }

    /// Encode as the 5-byte auto-increment write starting at `register`:
    /// `[register, start_l, start_h, length_l, length_h]`.
    pub const fn frame(&self, register: u8) -> [u8; 5] {
        let (start_l, start_h) = encode16(self.start);
        let (length_l, length_h) = encode16(self.length);
        [register, start_l, start_h, length_l, length_h]
    }

    /// Decode the four register bytes of a channel as read back from the chip.
    ///
    /// The upper nibble of each high byte holds the full-on/full-off flags, those are masked off.
    pub const fn from_registers(regs: [u8; 4]) -> Self {
        Self {
            start: decode16(regs[0], regs[1]) & MAX_12BIT,
            length: decode16(regs[2], regs[3]) & MAX_12BIT,
        }
    }
}

/// Decode a two byte ADC conversion frame into the 12-bit result.
///
/// The lowest nibble carries the channel tag and is dropped.
pub const fn adc_sample(bytes: [u8; 2], big_endian: bool) -> u16 {
    let raw = if big_endian {
        decode16(bytes[1], bytes[0])
    } else {
        decode16(bytes[0], bytes[1])
    };
    raw >> 4
}
