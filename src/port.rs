//! Logical pin / port / bus addressing over an A/B pair of 8-bit registers.
//!
//! Both IO expander chips split their 16 pins over two register banks.  Pins are numbered
//! 1 to 16 by callers: pins 1-8 live in the `a` register (bit `pin - 1`), pins 9-16 in the `b`
//! register (bit `pin - 9`).  Port 0 selects `a`, port 1 selects `b`.  The bus view treats `a`
//! and `b = a + 1` as one little-endian 16-bit value.
use crate::bus::I2cExt;
use crate::common::BitField;
use crate::error::{Argument, Error, Result};
use embedded_hal::i2c::I2c;

/// A pair of registers holding the same function for port A/0 and port B/1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RegisterPair {
    pub a: u8,
    pub b: u8,
}

impl RegisterPair {
    pub(crate) const fn new(a: u8, b: u8) -> Self {
        Self { a, b }
    }

    /// Map a 1-based pin to its register and 0-based bit.
    pub(crate) fn locate(self, pin: u8) -> core::result::Result<(u8, u8), Argument> {
        match pin {
            1..=8 => Ok((self.a, pin - 1)),
            9..=16 => Ok((self.b, pin - 9)),
            _ => Err(Argument::Pin),
        }
    }

    pub(crate) fn select(self, port: u8) -> core::result::Result<u8, Argument> {
        match port {
            0 => Ok(self.a),
            1 => Ok(self.b),
            _ => Err(Argument::Port),
        }
    }
}

/// Register-level access to one port-expander chip.
///
/// Reads always go to the device; there is no shadow copy of the port registers.
pub(crate) struct RegisterPort<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C> RegisterPort<I2C> {
    pub(crate) fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    pub(crate) fn address(&self) -> u8 {
        self.address
    }

    pub(crate) fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> RegisterPort<I2C> {
    pub(crate) fn set_pin(
        &mut self,
        pin: u8,
        value: bool,
        regs: RegisterPair,
    ) -> Result<(), I2C::Error> {
        let (reg, bit) = regs.locate(pin).map_err(Error::OutOfRange)?;
        let current = self.i2c.read_reg(self.address, reg)?;
        self.i2c
            .write_reg(self.address, reg, current.with_bit(bit, value))?;
        Ok(())
    }

    pub(crate) fn get_pin(&mut self, pin: u8, regs: RegisterPair) -> Result<bool, I2C::Error> {
        let (reg, bit) = regs.locate(pin).map_err(Error::OutOfRange)?;
        Ok(self.i2c.read_reg(self.address, reg)?.bit(bit))
    }

    pub(crate) fn set_port(
        &mut self,
        port: u8,
        value: u8,
        regs: RegisterPair,
    ) -> Result<(), I2C::Error> {
        let reg = regs.select(port).map_err(Error::OutOfRange)?;
        self.i2c.write_reg(self.address, reg, value)?;
        Ok(())
    }

    pub(crate) fn get_port(&mut self, port: u8, regs: RegisterPair) -> Result<u8, I2C::Error> {
        let reg = regs.select(port).map_err(Error::OutOfRange)?;
        Ok(self.i2c.read_reg(self.address, reg)?)
    }

    pub(crate) fn set_bus(&mut self, value: u16, regs: RegisterPair) -> Result<(), I2C::Error> {
        self.i2c.write_word(self.address, regs.a, value)?;
        Ok(())
    }

    pub(crate) fn get_bus(&mut self, regs: RegisterPair) -> Result<u16, I2C::Error> {
        Ok(self.i2c.read_word(self.address, regs.a)?)
    }

    /// Read-modify-write of a single register, for configuration bits outside the A/B pairs.
    pub(crate) fn update_bit(&mut self, reg: u8, bit: u8, value: bool) -> Result<u8, I2C::Error> {
        let (set, clear) = if value { (1 << bit, 0) } else { (0, 1 << bit) };
        Ok(self.i2c.update_reg(self.address, reg, set, clear)?)
    }

    pub(crate) fn read_register(&mut self, reg: u8) -> Result<u8, I2C::Error> {
        Ok(self.i2c.read_reg(self.address, reg)?)
    }

    pub(crate) fn write_register(&mut self, reg: u8, value: u8) -> Result<(), I2C::Error> {
        self.i2c.write_reg(self.address, reg, value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{RegisterPair, RegisterPort};
    use crate::emulator::RegisterFile;
    use crate::error::{Argument, Error};
    use embedded_hal_mock::eh1::i2c as mock_i2c;

    const GPIO: RegisterPair = RegisterPair::new(0x12, 0x13);

    #[test]
    fn pin_round_trip_affects_only_its_bit() {
        let dev = RegisterFile::new(0x20);
        let mut port = RegisterPort::new(dev.clone(), 0x20);

        for pin in 1..=16u8 {
            dev.set_register(0x12, 0x5a);
            dev.set_register(0x13, 0xa5);

            port.set_pin(pin, true, GPIO).unwrap();
            assert!(port.get_pin(pin, GPIO).unwrap());
            port.set_pin(pin, false, GPIO).unwrap();
            assert!(!port.get_pin(pin, GPIO).unwrap());

            let bit = (pin - 1) % 8;
            let (touched, untouched, before, other) = if pin <= 8 {
                (0x12, 0x13, 0x5a, 0xa5)
            } else {
                (0x13, 0x12, 0xa5, 0x5a)
            };
            assert_eq!(dev.register(touched), before & !(1 << bit));
            assert_eq!(dev.register(untouched), other);
        }
    }

    #[test]
    fn port_round_trip() {
        let dev = RegisterFile::new(0x20);
        let mut port = RegisterPort::new(dev, 0x20);

        for value in 0..=255u8 {
            for p in 0..=1u8 {
                port.set_port(p, value, GPIO).unwrap();
                assert_eq!(port.get_port(p, GPIO).unwrap(), value);
            }
        }
    }

    #[test]
    fn bus_round_trip() {
        let dev = RegisterFile::new(0x20);
        let mut port = RegisterPort::new(dev.clone(), 0x20);

        for value in (0..=u16::MAX).step_by(257) {
            port.set_bus(value, GPIO).unwrap();
            assert_eq!(port.get_bus(GPIO).unwrap(), value);
            assert_eq!(dev.register(0x12), value as u8);
            assert_eq!(dev.register(0x13), (value >> 8) as u8);
        }
    }

    #[test]
    fn invalid_arguments_never_reach_the_bus() {
        let expectations: [mock_i2c::Transaction; 0] = [];
        let mut bus = mock_i2c::Mock::new(&expectations);
        let mut port = RegisterPort::new(bus.clone(), 0x20);

        assert_eq!(
            port.set_pin(0, true, GPIO),
            Err(Error::OutOfRange(Argument::Pin))
        );
        assert_eq!(
            port.get_pin(17, GPIO),
            Err(Error::OutOfRange(Argument::Pin))
        );
        assert_eq!(
            port.set_port(2, 0xff, GPIO),
            Err(Error::OutOfRange(Argument::Port))
        );
        assert_eq!(port.get_port(2, GPIO), Err(Error::OutOfRange(Argument::Port)));

        bus.done();
    }
}
