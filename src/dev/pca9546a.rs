//! Support for the `PCA9546A` "4-channel I2C-bus switch with reset", the chip on the I2C Switch
//! board.
//!
//! Datasheet: https://www.nxp.com/docs/en/data-sheet/PCA9546A.pdf
//!
//! The chip has a single control register and no register pointer: a one byte write replaces the
//! channel mask, a one byte read returns it.  Bit `n` enables downstream channel `n + 1`.
use crate::common::{BitField, NoPin};
use crate::error::{Argument, Error, Result};
use crate::log::debug;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;

pub const DEFAULT_ADDRESS: u8 = 0x70;

/// Downstream channels.
pub const CHANNELS: u8 = 4;

const RESET_PULSE_MS: u32 = 1;

/// `PCA9546A` four channel I2C switch with an optional reset line.
pub struct Pca9546a<I2C, RST = NoPin> {
    i2c: I2C,
    address: u8,
    reset: RST,
}

impl<I2C: I2c> Pca9546a<I2C, NoPin> {
    /// Create a new instance at `address` (`0x70` to `0x77`) without control of the reset line.
    pub fn new(i2c: I2C, address: u8) -> Result<Self, I2C::Error> {
        Self::with_reset(i2c, address, NoPin)
    }
}

impl<I2C: I2c, RST: OutputPin> Pca9546a<I2C, RST> {
    /// Create a new instance and release the (active low) reset line.
    pub fn with_reset(i2c: I2C, address: u8, mut reset: RST) -> Result<Self, I2C::Error> {
        if !(0x70..=0x77).contains(&address) {
            return Err(Error::OutOfRange(Argument::Address));
        }
        reset.set_high().map_err(|_| Error::Pin)?;
        debug!("pca9546a at {=u8:#x}", address);
        Ok(Self {
            i2c,
            address,
            reset,
        })
    }

    /// Connect `channel` (1 to 4) and disconnect all others.
    pub fn switch_channel(&mut self, channel: u8) -> Result<(), I2C::Error> {
        let bit = channel_bit(channel)?;
        self.i2c.write(self.address, &[0u8.with_bit(bit, true)])?;
        Ok(())
    }

    /// Connect or disconnect `channel` (1 to 4) leaving the other channels as they are.
    pub fn set_channel_state(&mut self, channel: u8, enabled: bool) -> Result<(), I2C::Error> {
        let bit = channel_bit(channel)?;
        let mask = self.read_control()?;
        self.i2c
            .write(self.address, &[mask.with_bit(bit, enabled)])?;
        Ok(())
    }

    pub fn get_channel_state(&mut self, channel: u8) -> Result<bool, I2C::Error> {
        let bit = channel_bit(channel)?;
        Ok(self.read_control()?.bit(bit))
    }

    /// Pulse the reset line low for 1ms and wait another 1ms for the chip to come back.  All
    /// channels are disconnected afterwards.
    pub fn reset<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), I2C::Error> {
        self.reset.set_low().map_err(|_| Error::Pin)?;
        delay.delay_ms(RESET_PULSE_MS);
        self.reset.set_high().map_err(|_| Error::Pin)?;
        delay.delay_ms(RESET_PULSE_MS);
        Ok(())
    }

    fn read_control(&mut self) -> Result<u8, I2C::Error> {
        let mut buf = [0x00];
        self.i2c.read(self.address, &mut buf)?;
        Ok(buf[0])
    }
}

impl<I2C, RST> Pca9546a<I2C, RST> {
    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn release(self) -> (I2C, RST) {
        (self.i2c, self.reset)
    }
}

fn channel_bit<E>(channel: u8) -> Result<u8, E> {
    if !(1..=CHANNELS).contains(&channel) {
        return Err(Error::OutOfRange(Argument::Channel));
    }
    Ok(channel - 1)
}

#[cfg(test)]
mod tests {
    use super::Pca9546a;
    use crate::error::{Argument, Error};
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital as mock_pin;
    use embedded_hal_mock::eh1::i2c as mock_i2c;

    #[test]
    fn channel_mask() {
        let expectations = [
            mock_i2c::Transaction::write(0x70, vec![0x04]),
            mock_i2c::Transaction::read(0x70, vec![0x04]),
            mock_i2c::Transaction::write(0x70, vec![0x05]),
            mock_i2c::Transaction::read(0x70, vec![0x05]),
            mock_i2c::Transaction::read(0x70, vec![0x05]),
            mock_i2c::Transaction::read(0x70, vec![0x05]),
            mock_i2c::Transaction::write(0x70, vec![0x01]),
            mock_i2c::Transaction::read(0x70, vec![0x01]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let mut switch = Pca9546a::new(bus.clone(), 0x70).unwrap();
        switch.switch_channel(3).unwrap();
        switch.set_channel_state(1, true).unwrap();
        assert!(switch.get_channel_state(1).unwrap());
        assert!(switch.get_channel_state(3).unwrap());
        switch.set_channel_state(3, false).unwrap();
        assert!(!switch.get_channel_state(3).unwrap());

        bus.done();
    }

    #[test]
    fn reset_pulse() {
        let expectations: [mock_i2c::Transaction; 0] = [];
        let mut bus = mock_i2c::Mock::new(&expectations);
        let pin_expectations = [
            mock_pin::Transaction::set(mock_pin::State::High),
            mock_pin::Transaction::set(mock_pin::State::Low),
            mock_pin::Transaction::set(mock_pin::State::High),
        ];
        let mut rst = mock_pin::Mock::new(&pin_expectations);

        let mut switch = Pca9546a::with_reset(bus.clone(), 0x77, rst.clone()).unwrap();
        switch.reset(&mut NoopDelay::new()).unwrap();
        assert_eq!(switch.address(), 0x77);

        bus.done();
        rst.done();
    }

    #[test]
    fn arguments_are_checked_before_io() {
        let expectations: [mock_i2c::Transaction; 0] = [];
        let mut bus = mock_i2c::Mock::new(&expectations);

        assert!(matches!(
            Pca9546a::new(bus.clone(), 0x6f),
            Err(Error::OutOfRange(Argument::Address))
        ));
        let mut switch = Pca9546a::new(bus.clone(), 0x71).unwrap();
        assert_eq!(
            switch.switch_channel(0),
            Err(Error::OutOfRange(Argument::Channel))
        );
        assert_eq!(
            switch.set_channel_state(5, true),
            Err(Error::OutOfRange(Argument::Channel))
        );
        assert_eq!(
            switch.get_channel_state(5),
            Err(Error::OutOfRange(Argument::Channel))
        );

        bus.done();
    }
}
