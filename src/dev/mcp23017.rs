//! Support for the `MCP23017` "16-Bit I/O Expander with Serial Interface", as fitted to the
//! IO Pi (two chips, 32 pins) and the Expander Pi (one chip at `0x20`).
//!
//! Datasheet: https://ww1.microchip.com/downloads/en/devicedoc/20001952c.pdf
//!
//! Each chip offers two eight-bit GPIO ports.  Port 0 controls pins 1 to 8, port 1 controls pins
//! 9 to 16.  When writing to or reading from a port the least significant bit represents the
//! lowest numbered pin on that port.  Bus-wide 16-bit values carry port 0 in the low byte.
use crate::common::{BitField, Direction};
use crate::error::{Argument, Error, Result};
use crate::log::debug;
use crate::port::{RegisterPair, RegisterPort};
use embedded_hal::i2c::I2c;

/// Default `IOCON` value: sequential addressing, interrupt pins active-high.
pub const DEFAULT_CONFIG: u8 = 0x02;

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// N.B.: These values are for BANK=0, which is the reset state of
/// the chip (and this driver does not change).
enum Regs {
    /// IODIR: input/output direction: 0=output; 1=input
    IODIRA = 0x00,
    IODIRB = 0x01,
    /// IPOL: input polarity: 0=register values match input pins; 1=opposite
    IPOLA = 0x02,
    IPOLB = 0x03,
    /// GPINTEN: interrupt-on-change: 0=disable; 1=enable
    GPINTENA = 0x04,
    GPINTENB = 0x05,
    /// DEFVAL: default values for interrupt-on-change
    DEFVALA = 0x06,
    DEFVALB = 0x07,
    /// INTCON: interrupt-on-change config: 0=compare to previous pin value;
    ///   1=compare to corresponding bit in DEFVAL
    INTCONA = 0x08,
    INTCONB = 0x09,
    /// IOCON: configuration register
    /// - Bit 6: MIRROR: INTA and INTB are internally connected
    /// - Bit 5: SEQOP: disables the incrementing address pointer
    /// - Bit 1: INTPOL: interrupt pins are 0=active-low or 1=active-high
    IOCON = 0x0a,
    /// GPPU: GPIO pull-ups: enables the weak internal 100k pull-ups
    GPPUA = 0x0c,
    GPPUB = 0x0d,
    /// INTF: interrupt flags: 1=corresponding pin caused interrupt
    INTFA = 0x0e,
    INTFB = 0x0f,
    /// INTCAP: port value captured when the interrupt occurred; reading clears the interrupt
    INTCAPA = 0x10,
    INTCAPB = 0x11,
    /// GPIO: reflects logic level on pins
    GPIOA = 0x12,
    GPIOB = 0x13,
    /// OLAT: output latches
    OLATA = 0x14,
    OLATB = 0x15,
}

impl From<Regs> for u8 {
    fn from(r: Regs) -> u8 {
        r as u8
    }
}

const fn pair(a: Regs, b: Regs) -> RegisterPair {
    RegisterPair::new(a as u8, b as u8)
}

const IODIR: RegisterPair = pair(Regs::IODIRA, Regs::IODIRB);
const IPOL: RegisterPair = pair(Regs::IPOLA, Regs::IPOLB);
const GPINTEN: RegisterPair = pair(Regs::GPINTENA, Regs::GPINTENB);
const DEFVAL: RegisterPair = pair(Regs::DEFVALA, Regs::DEFVALB);
const INTCON: RegisterPair = pair(Regs::INTCONA, Regs::INTCONB);
const GPPU: RegisterPair = pair(Regs::GPPUA, Regs::GPPUB);
const INTF: RegisterPair = pair(Regs::INTFA, Regs::INTFB);
const INTCAP: RegisterPair = pair(Regs::INTCAPA, Regs::INTCAPB);
const GPIO: RegisterPair = pair(Regs::GPIOA, Regs::GPIOB);

const IOCON_MIRROR: u8 = 6;
const IOCON_INTPOL: u8 = 1;

/// Electrical polarity of the `INTA`/`INTB` output pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptPolarity {
    ActiveLow,
    ActiveHigh,
}

/// `MCP23017` "16-Bit I/O Expander with Serial Interface"
pub struct Mcp23017<I2C> {
    port: RegisterPort<I2C>,
    config: u8,
}

impl<I2C: I2c> Mcp23017<I2C> {
    /// Create a new instance at `address` (`0x20` to `0x27`) using [`DEFAULT_CONFIG`].
    ///
    /// With `initialise` set, all pins become inputs with pull-ups disabled and polarity not
    /// inverted.  Without it the device state is left as found.
    pub fn new(i2c: I2C, address: u8, initialise: bool) -> Result<Self, I2C::Error> {
        Self::with_config(i2c, address, DEFAULT_CONFIG, initialise)
    }

    /// Like [`Mcp23017::new`] but writes a caller supplied `IOCON` value.
    pub fn with_config(
        i2c: I2C,
        address: u8,
        config: u8,
        initialise: bool,
    ) -> Result<Self, I2C::Error> {
        if !(0x20..=0x27).contains(&address) {
            return Err(Error::OutOfRange(Argument::Address));
        }

        let mut port = RegisterPort::new(i2c, address);
        port.write_register(Regs::IOCON.into(), config)?;
        let mut dev = Self { port, config };
        if initialise {
            dev.set_bus_direction(0xffff)?;
            dev.set_bus_pullups(0x0000)?;
            dev.invert_bus(0x0000)?;
        }
        debug!("mcp23017 at {=u8:#x} ready", address);
        Ok(dev)
    }

    /// Set the IO direction of an individual pin (1 to 16).
    pub fn set_pin_direction(&mut self, pin: u8, direction: Direction) -> Result<(), I2C::Error> {
        self.port.set_pin(pin, direction.as_bit(), IODIR)
    }

    pub fn get_pin_direction(&mut self, pin: u8) -> Result<Direction, I2C::Error> {
        self.port.get_pin(pin, IODIR).map(Direction::from_bit)
    }

    /// Set the direction of a port.  For each bit 1 = input, 0 = output.
    pub fn set_port_direction(&mut self, port: u8, direction: u8) -> Result<(), I2C::Error> {
        self.port.set_port(port, direction, IODIR)
    }

    pub fn get_port_direction(&mut self, port: u8) -> Result<u8, I2C::Error> {
        self.port.get_port(port, IODIR)
    }

    /// Set the direction of all 16 pins.  For each bit 1 = input, 0 = output.
    pub fn set_bus_direction(&mut self, direction: u16) -> Result<(), I2C::Error> {
        self.port.set_bus(direction, IODIR)
    }

    pub fn get_bus_direction(&mut self) -> Result<u16, I2C::Error> {
        self.port.get_bus(IODIR)
    }

    /// Enable or disable the internal 100k pull-up on an individual pin.
    pub fn set_pin_pullup(&mut self, pin: u8, enabled: bool) -> Result<(), I2C::Error> {
        self.port.set_pin(pin, enabled, GPPU)
    }

    pub fn get_pin_pullup(&mut self, pin: u8) -> Result<bool, I2C::Error> {
        self.port.get_pin(pin, GPPU)
    }

    pub fn set_port_pullups(&mut self, port: u8, value: u8) -> Result<(), I2C::Error> {
        self.port.set_port(port, value, GPPU)
    }

    pub fn get_port_pullups(&mut self, port: u8) -> Result<u8, I2C::Error> {
        self.port.get_port(port, GPPU)
    }

    pub fn set_bus_pullups(&mut self, value: u16) -> Result<(), I2C::Error> {
        self.port.set_bus(value, GPPU)
    }

    pub fn get_bus_pullups(&mut self) -> Result<u16, I2C::Error> {
        self.port.get_bus(GPPU)
    }

    /// Drive an individual output pin.
    pub fn write_pin(&mut self, pin: u8, value: bool) -> Result<(), I2C::Error> {
        self.port.set_pin(pin, value, GPIO)
    }

    pub fn write_port(&mut self, port: u8, value: u8) -> Result<(), I2C::Error> {
        self.port.set_port(port, value, GPIO)
    }

    pub fn write_bus(&mut self, value: u16) -> Result<(), I2C::Error> {
        self.port.set_bus(value, GPIO)
    }

    /// Read the logic level of an individual pin.
    pub fn read_pin(&mut self, pin: u8) -> Result<bool, I2C::Error> {
        self.port.get_pin(pin, GPIO)
    }

    pub fn read_port(&mut self, port: u8) -> Result<u8, I2C::Error> {
        self.port.get_port(port, GPIO)
    }

    pub fn read_bus(&mut self) -> Result<u16, I2C::Error> {
        self.port.get_bus(GPIO)
    }

    /// Invert the input polarity of an individual pin.
    pub fn invert_pin(&mut self, pin: u8, inverted: bool) -> Result<(), I2C::Error> {
        self.port.set_pin(pin, inverted, IPOL)
    }

    pub fn get_pin_polarity(&mut self, pin: u8) -> Result<bool, I2C::Error> {
        self.port.get_pin(pin, IPOL)
    }

    pub fn invert_port(&mut self, port: u8, polarity: u8) -> Result<(), I2C::Error> {
        self.port.set_port(port, polarity, IPOL)
    }

    pub fn get_port_polarity(&mut self, port: u8) -> Result<u8, I2C::Error> {
        self.port.get_port(port, IPOL)
    }

    pub fn invert_bus(&mut self, polarity: u16) -> Result<(), I2C::Error> {
        self.port.set_bus(polarity, IPOL)
    }

    pub fn get_bus_polarity(&mut self) -> Result<u16, I2C::Error> {
        self.port.get_bus(IPOL)
    }

    /// Internally connect `INTA` and `INTB` so an interrupt on either port drives both pins.
    pub fn mirror_interrupts(&mut self, mirror: bool) -> Result<(), I2C::Error> {
        self.config = self
            .port
            .update_bit(Regs::IOCON.into(), IOCON_MIRROR, mirror)?;
        Ok(())
    }

    pub fn set_interrupt_polarity(
        &mut self,
        polarity: InterruptPolarity,
    ) -> Result<(), I2C::Error> {
        let high = polarity == InterruptPolarity::ActiveHigh;
        self.config = self
            .port
            .update_bit(Regs::IOCON.into(), IOCON_INTPOL, high)?;
        Ok(())
    }

    pub fn get_interrupt_polarity(&mut self) -> Result<InterruptPolarity, I2C::Error> {
        let iocon = self.port.read_register(Regs::IOCON.into())?;
        Ok(if iocon.bit(IOCON_INTPOL) {
            InterruptPolarity::ActiveHigh
        } else {
            InterruptPolarity::ActiveLow
        })
    }

    /// Select the interrupt type for each pin of a port: 1 = fire when the pin matches the
    /// default value, 0 = fire on any state change.
    pub fn set_interrupt_type(&mut self, port: u8, value: u8) -> Result<(), I2C::Error> {
        self.port.set_port(port, value, INTCON)
    }

    pub fn get_interrupt_type(&mut self, port: u8) -> Result<u8, I2C::Error> {
        self.port.get_port(port, INTCON)
    }

    /// Compare values for pins configured to interrupt on a mismatch with the default value.
    pub fn set_interrupt_defaults(&mut self, port: u8, value: u8) -> Result<(), I2C::Error> {
        self.port.set_port(port, value, DEFVAL)
    }

    pub fn get_interrupt_defaults(&mut self, port: u8) -> Result<u8, I2C::Error> {
        self.port.get_port(port, DEFVAL)
    }

    pub fn set_interrupt_on_pin(&mut self, pin: u8, enabled: bool) -> Result<(), I2C::Error> {
        self.port.set_pin(pin, enabled, GPINTEN)
    }

    pub fn get_interrupt_on_pin(&mut self, pin: u8) -> Result<bool, I2C::Error> {
        self.port.get_pin(pin, GPINTEN)
    }

    pub fn set_interrupt_on_port(&mut self, port: u8, value: u8) -> Result<(), I2C::Error> {
        self.port.set_port(port, value, GPINTEN)
    }

    pub fn get_interrupt_on_port(&mut self, port: u8) -> Result<u8, I2C::Error> {
        self.port.get_port(port, GPINTEN)
    }

    pub fn set_interrupt_on_bus(&mut self, value: u16) -> Result<(), I2C::Error> {
        self.port.set_bus(value, GPINTEN)
    }

    pub fn get_interrupt_on_bus(&mut self) -> Result<u16, I2C::Error> {
        self.port.get_bus(GPINTEN)
    }

    /// Which pins of a port caused the pending interrupt.
    pub fn read_interrupt_status(&mut self, port: u8) -> Result<u8, I2C::Error> {
        self.port.get_port(port, INTF)
    }

    /// Port value captured at the time of the last interrupt.  Reading clears the interrupt.
    pub fn read_interrupt_capture(&mut self, port: u8) -> Result<u8, I2C::Error> {
        self.port.get_port(port, INTCAP)
    }

    /// Clear both interrupt outputs by reading the capture registers.
    pub fn reset_interrupts(&mut self) -> Result<(), I2C::Error> {
        self.read_interrupt_capture(0)?;
        self.read_interrupt_capture(1)?;
        Ok(())
    }
}

impl<I2C> Mcp23017<I2C> {
    pub fn address(&self) -> u8 {
        self.port.address()
    }

    /// Last `IOCON` value written by this driver.
    pub fn config(&self) -> u8 {
        self.config
    }

    pub fn release(self) -> I2C {
        self.port.release()
    }
}
