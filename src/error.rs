//! Error handling shared by every board driver.

use core::fmt;

/// Crate-wide result type alias.
pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// Error variants produced by the drivers.
///
/// Argument checks always run before the first bus transaction, so an `OutOfRange` or
/// `CapacityExceeded` error means the device was not touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Any error reported by the underlying bus.
    Bus(E),
    /// An argument was outside the range the chip or board accepts.
    OutOfRange(Argument),
    /// The ADC never reported a finished conversion within the poll bound.
    ConversionTimeout,
    /// An RTC memory access would run past the end of the battery-backed RAM.
    CapacityExceeded,
    /// A GPIO side line (output-enable, reset) could not be driven.
    Pin,
}

/// Names the argument that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Argument {
    /// Logical IO pin, 1-based.
    Pin,
    /// 8-bit port selector, 0 or 1.
    Port,
    /// ADC, DAC, PWM or switch channel.
    Channel,
    /// Single-ended / differential input selection.
    Mode,
    /// PGA or DAC gain.
    Gain,
    /// ADC sample resolution.
    BitRate,
    /// DAC output voltage.
    Voltage,
    /// Raw register or DAC code.
    Value,
    /// I2C device address.
    Address,
    /// RTC user memory address.
    MemoryAddress,
    /// PWM frequency or resulting prescaler.
    Frequency,
    /// Servo pulse-width limit.
    Limit,
    /// Servo position.
    Position,
    /// Servo step resolution.
    Steps,
    /// PWM on/off tick count.
    Ticks,
    /// A calendar field of an RTC date.
    DateTime,
    /// RTC square-wave output frequency.
    SquareWave,
}

impl<E> From<E> for Error<E> {
    fn from(err: E) -> Self {
        Self::Bus(err)
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Argument::Pin => "pin",
            Argument::Port => "port",
            Argument::Channel => "channel",
            Argument::Mode => "mode",
            Argument::Gain => "gain",
            Argument::BitRate => "bit rate",
            Argument::Voltage => "voltage",
            Argument::Value => "value",
            Argument::Address => "i2c address",
            Argument::MemoryAddress => "memory address",
            Argument::Frequency => "frequency",
            Argument::Limit => "limit",
            Argument::Position => "position",
            Argument::Steps => "steps",
            Argument::Ticks => "ticks",
            Argument::DateTime => "date/time",
            Argument::SquareWave => "square-wave frequency",
        };
        f.write_str(name)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bus(e) => write!(f, "bus error: {:?}", e),
            Error::OutOfRange(arg) => write!(f, "{} out of range", arg),
            Error::ConversionTimeout => f.write_str("conversion timeout"),
            Error::CapacityExceeded => f.write_str("memory access exceeds available space"),
            Error::Pin => f.write_str("gpio line error"),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for Error<E> {}
