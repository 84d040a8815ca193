//! Support for the `PCA9535` "16-bit I2C-bus and SMBus low power I/O port with interrupt", two
//! of which make up the IO Zero 32 board.
//!
//! Port 0 controls pins 1 to 8, port 1 controls pins 9 to 16.  The chip has no pull-ups and no
//! interrupt configuration; its interrupt output simply follows any input change.
use crate::common::Direction;
use crate::error::{Argument, Error, Result};
use crate::log::debug;
use crate::port::{RegisterPair, RegisterPort};
use embedded_hal::i2c::I2c;

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Regs {
    InputPort0 = 0x00,
    InputPort1 = 0x01,
    OutputPort0 = 0x02,
    OutputPort1 = 0x03,
    PolarityInversion0 = 0x04,
    PolarityInversion1 = 0x05,
    /// 1 = input, 0 = output
    Configuration0 = 0x06,
    Configuration1 = 0x07,
}

const fn pair(a: Regs, b: Regs) -> RegisterPair {
    RegisterPair::new(a as u8, b as u8)
}

const INPUT: RegisterPair = pair(Regs::InputPort0, Regs::InputPort1);
const OUTPUT: RegisterPair = pair(Regs::OutputPort0, Regs::OutputPort1);
const INVERT: RegisterPair = pair(Regs::PolarityInversion0, Regs::PolarityInversion1);
const CONFIG: RegisterPair = pair(Regs::Configuration0, Regs::Configuration1);

/// `PCA9535` "16-bit I2C-bus and SMBus low power I/O port with interrupt"
pub struct Pca9535<I2C> {
    port: RegisterPort<I2C>,
}

impl<I2C: I2c> Pca9535<I2C> {
    /// Create a new instance at `address` (`0x20` to `0x27`).  The device is not touched.
    pub fn new(i2c: I2C, address: u8) -> Result<Self, I2C::Error> {
        if !(0x20..=0x27).contains(&address) {
            return Err(Error::OutOfRange(Argument::Address));
        }
        debug!("pca9535 at {=u8:#x}", address);
        Ok(Self {
            port: RegisterPort::new(i2c, address),
        })
    }

    pub fn set_pin_direction(&mut self, pin: u8, direction: Direction) -> Result<(), I2C::Error> {
        self.port.set_pin(pin, direction.as_bit(), CONFIG)
    }

    pub fn get_pin_direction(&mut self, pin: u8) -> Result<Direction, I2C::Error> {
        self.port.get_pin(pin, CONFIG).map(Direction::from_bit)
    }

    /// For each bit 1 = input, 0 = output.
    pub fn set_port_direction(&mut self, port: u8, direction: u8) -> Result<(), I2C::Error> {
        self.port.set_port(port, direction, CONFIG)
    }

    pub fn get_port_direction(&mut self, port: u8) -> Result<u8, I2C::Error> {
        self.port.get_port(port, CONFIG)
    }

    pub fn set_bus_direction(&mut self, direction: u16) -> Result<(), I2C::Error> {
        self.port.set_bus(direction, CONFIG)
    }

    pub fn get_bus_direction(&mut self) -> Result<u16, I2C::Error> {
        self.port.get_bus(CONFIG)
    }

    /// Read-modify-write of the output latch for a single pin.
    pub fn write_pin(&mut self, pin: u8, value: bool) -> Result<(), I2C::Error> {
        self.port.set_pin(pin, value, OUTPUT)
    }

    pub fn write_port(&mut self, port: u8, value: u8) -> Result<(), I2C::Error> {
        self.port.set_port(port, value, OUTPUT)
    }

    pub fn write_bus(&mut self, value: u16) -> Result<(), I2C::Error> {
        self.port.set_bus(value, OUTPUT)
    }

    pub fn read_pin(&mut self, pin: u8) -> Result<bool, I2C::Error> {
        self.port.get_pin(pin, INPUT)
    }

    pub fn read_port(&mut self, port: u8) -> Result<u8, I2C::Error> {
        self.port.get_port(port, INPUT)
    }

    pub fn read_bus(&mut self) -> Result<u16, I2C::Error> {
        self.port.get_bus(INPUT)
    }

    /// `true` inverts the logic level reported for an input pin.
    pub fn set_pin_polarity(&mut self, pin: u8, inverted: bool) -> Result<(), I2C::Error> {
        self.port.set_pin(pin, inverted, INVERT)
    }

    pub fn get_pin_polarity(&mut self, pin: u8) -> Result<bool, I2C::Error> {
        self.port.get_pin(pin, INVERT)
    }

    pub fn set_port_polarity(&mut self, port: u8, polarity: u8) -> Result<(), I2C::Error> {
        self.port.set_port(port, polarity, INVERT)
    }

    pub fn get_port_polarity(&mut self, port: u8) -> Result<u8, I2C::Error> {
        self.port.get_port(port, INVERT)
    }

    pub fn set_bus_polarity(&mut self, polarity: u16) -> Result<(), I2C::Error> {
        self.port.set_bus(polarity, INVERT)
    }

    pub fn get_bus_polarity(&mut self) -> Result<u16, I2C::Error> {
        self.port.get_bus(INVERT)
    }
}

impl<I2C> Pca9535<I2C> {
    pub fn address(&self) -> u8 {
        self.port.address()
    }

    pub fn release(self) -> I2C {
        self.port.release()
    }
}
