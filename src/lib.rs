//! Drivers for the AB Electronics UK Raspberry Pi expansion boards.
//!
//! | Board | Chip | Driver |
//! |---|---|---|
//! | ADC Pi | 2x MCP3424 | [`AdcPi`] |
//! | ADC-DAC Pi | MCP3202, MCP4822 | [`Mcp3202`], [`Mcp4822`] |
//! | Expander Pi | MCP3208, MCP4822, MCP23017, DS1307 | [`Mcp3208`], [`Mcp4822`], [`Mcp23017`], [`Ds1307`] |
//! | IO Pi | 2x MCP23017 | [`Mcp23017`] |
//! | IO Zero 32 | 2x PCA9535 | [`Pca9535`] |
//! | RTC Pi | DS1307 | [`Ds1307`] |
//! | Servo Pi | PCA9685 | [`Pca9685`], [`Servo`] |
//! | I2C Switch | PCA9546A | [`Pca9546a`] |
//!
//! Every driver owns its `embedded-hal` bus handle and gives it back through `release()`.
//! Arguments are validated before the first bus transaction.
#![cfg_attr(not(any(test, feature = "std")), no_std)]

mod log;

mod bus;
mod common;
pub mod dev;
mod error;
mod port;
pub mod servo;

#[cfg(test)]
mod emulator;

pub use common::{BitField, Direction, NoPin};
pub use error::{Argument, Error, Result};

pub use dev::ds1307::{DateTime, Ds1307, SquareWave};
pub use dev::mcp23017::{InterruptPolarity, Mcp23017};
pub use dev::mcp320x::{InputMode, Mcp3202, Mcp3208};
pub use dev::mcp3424::{AdcPi, BitRate, ConversionMode, Gain, Sample};
pub use dev::mcp4822::{DacGain, Mcp4822};
pub use dev::pca9535::Pca9535;
pub use dev::pca9546a::Pca9546a;
pub use dev::pca9685::Pca9685;
pub use servo::Servo;
