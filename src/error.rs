/// Errors returned by the shield driver.
///
/// Numeric arguments (pulse ticks, angles, thresholds, frequencies) are never an error, they are
/// clamped into range.  Only port numbers that don't exist on the configured board are rejected,
/// and that check happens before anything is sent on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The logical port is outside the board's port range.
    OutOfRange,
    /// The bus transaction failed.
    Bus(E),
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::Bus(e)
    }
}

impl<E: core::fmt::Debug> embedded_hal::digital::Error for Error<E> {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

impl<E: core::fmt::Debug> embedded_hal::pwm::Error for Error<E> {
    fn kind(&self) -> embedded_hal::pwm::ErrorKind {
        embedded_hal::pwm::ErrorKind::Other
    }
}

impl<E: core::fmt::Debug> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::OutOfRange => f.write_str("logical port out of range"),
            Error::Bus(e) => write!(f, "bus error: {e:?}"),
        }
    }
}
