use embedded_hal::i2c::I2c;

/// Register-level access on top of a plain `embedded_hal` I2C bus.
///
/// All boards on the I2C side address their chips with a one-byte register pointer followed by
/// data.  Word access is SMBus style: the low byte lives at the base register and the high byte
/// at `base + 1`, transferred in a single transaction.
pub(crate) trait I2cExt {
    type Error;

    fn write_reg<R: Into<u8>>(&mut self, addr: u8, reg: R, value: u8) -> Result<(), Self::Error>;
    fn update_reg<R: Into<u8>>(
        &mut self,
        addr: u8,
        reg: R,
        mask_set: u8,
        mask_clear: u8,
    ) -> Result<u8, Self::Error>;
    fn read_reg<R: Into<u8>>(&mut self, addr: u8, reg: R) -> Result<u8, Self::Error>;
    fn write_word<R: Into<u8>>(&mut self, addr: u8, reg: R, value: u16)
        -> Result<(), Self::Error>;
    fn read_word<R: Into<u8>>(&mut self, addr: u8, reg: R) -> Result<u16, Self::Error>;
}

impl<I2C: I2c> I2cExt for I2C {
    type Error = I2C::Error;

    fn write_reg<R: Into<u8>>(&mut self, addr: u8, reg: R, value: u8) -> Result<(), Self::Error> {
        self.write(addr, &[reg.into(), value])?;
        Ok(())
    }

    /// Read-modify-write of a single register.  Returns the value that was written back.
    fn update_reg<R: Into<u8>>(
        &mut self,
        addr: u8,
        reg: R,
        mask_set: u8,
        mask_clear: u8,
    ) -> Result<u8, Self::Error> {
        let reg = reg.into();
        let mut buf = [0x00];
        self.write_read(addr, &[reg], &mut buf)?;
        buf[0] |= mask_set;
        buf[0] &= !mask_clear;
        self.write(addr, &[reg, buf[0]])?;
        Ok(buf[0])
    }

    fn read_reg<R: Into<u8>>(&mut self, addr: u8, reg: R) -> Result<u8, Self::Error> {
        let mut buf = [0x00];
        self.write_read(addr, &[reg.into()], &mut buf)?;
        Ok(buf[0])
    }

    fn write_word<R: Into<u8>>(
        &mut self,
        addr: u8,
        reg: R,
        value: u16,
    ) -> Result<(), Self::Error> {
        let [lo, hi] = value.to_le_bytes();
        self.write(addr, &[reg.into(), lo, hi])?;
        Ok(())
    }

    fn read_word<R: Into<u8>>(&mut self, addr: u8, reg: R) -> Result<u16, Self::Error> {
        let mut buf = [0x00; 2];
        self.write_read(addr, &[reg.into()], &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::I2cExt;
    use embedded_hal_mock::eh1::i2c as mock_i2c;

    #[test]
    fn update_reg_keeps_unrelated_bits() {
        let expectations = [
            mock_i2c::Transaction::write_read(0x20, vec![0x0a], vec![0b1000_0010]),
            mock_i2c::Transaction::write(0x20, vec![0x0a, 0b1100_0000]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let written = bus.update_reg(0x20, 0x0au8, 0b0100_0000, 0b0000_0010).unwrap();
        assert_eq!(written, 0b1100_0000);

        bus.done();
    }

    #[test]
    fn words_are_little_endian() {
        let expectations = [
            mock_i2c::Transaction::write(0x20, vec![0x12, 0x34, 0x12]),
            mock_i2c::Transaction::write_read(0x20, vec![0x12], vec![0xcd, 0xab]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        bus.write_word(0x20, 0x12u8, 0x1234).unwrap();
        assert_eq!(bus.read_word(0x20, 0x12u8).unwrap(), 0xabcd);

        bus.done();
    }
}
