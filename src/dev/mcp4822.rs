//! Support for the `MCP4822` "12-Bit Dual Voltage Output Digital-to-Analog Converter with SPI
//! Interface", the DAC on the ADC-DAC Pi and the Expander Pi.
//!
//! Datasheet: https://ww1.microchip.com/downloads/en/DeviceDoc/20002249B.pdf
//!
//! Each write is a single 16 bit command: channel select, gain, active mode and the 12 bit code.
//! The SPI device must own the DAC chip-select line (CE1 on both boards).
use crate::error::{Argument, Error, Result};
use embedded_hal::spi::SpiDevice;

/// Internal reference of the chip.
const REFERENCE: f32 = 2.048;
const MAX_CODE: u16 = 4095;

const CHANNEL_B: u8 = 1 << 7;
/// Output gain x1 when set, x2 when clear.
const GAIN_X1: u8 = 1 << 5;
/// Output active when set, shut down when clear.
const ACTIVE: u8 = 1 << 4;

/// Output amplifier gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DacGain {
    /// 0 to 2.048V
    X1,
    /// 0 to 3.3V, limited by the supply rail
    X2,
}

impl DacGain {
    pub fn max_voltage(self) -> f32 {
        match self {
            DacGain::X1 => 2.048,
            DacGain::X2 => 3.3,
        }
    }

    fn factor(self) -> f32 {
        match self {
            DacGain::X1 => 1.0,
            DacGain::X2 => 2.0,
        }
    }
}

impl TryFrom<u8> for DacGain {
    type Error = Argument;

    fn try_from(gain: u8) -> core::result::Result<Self, Argument> {
        match gain {
            1 => Ok(DacGain::X1),
            2 => Ok(DacGain::X2),
            _ => Err(Argument::Gain),
        }
    }
}

/// `MCP4822` dual 12 bit DAC.
pub struct Mcp4822<SPI> {
    spi: SPI,
    gain: DacGain,
}

impl<SPI: SpiDevice> Mcp4822<SPI> {
    /// Create a new instance with gain x1.  The outputs are not touched.
    pub fn new(spi: SPI) -> Self {
        Self {
            spi,
            gain: DacGain::X1,
        }
    }

    /// Set `channel` (1 or 2) to `volts`, between 0 and the maximum for the current gain.
    pub fn set_voltage(&mut self, channel: u8, volts: f32) -> Result<(), SPI::Error> {
        if !(1..=2).contains(&channel) {
            return Err(Error::OutOfRange(Argument::Channel));
        }
        if !(0.0..=self.gain.max_voltage()).contains(&volts) {
            return Err(Error::OutOfRange(Argument::Voltage));
        }
        let code = volts / REFERENCE * 4096.0 / self.gain.factor();
        // Nearest code.  The top of the x1 range maps to 4096 which the chip cannot represent.
        let code = ((code + 0.5) as u16).min(MAX_CODE);
        self.set_raw(channel, code)
    }

    /// Write the 12 bit `value` (0 to 4095) to `channel` (1 or 2).
    pub fn set_raw(&mut self, channel: u8, value: u16) -> Result<(), SPI::Error> {
        if !(1..=2).contains(&channel) {
            return Err(Error::OutOfRange(Argument::Channel));
        }
        if value > MAX_CODE {
            return Err(Error::OutOfRange(Argument::Value));
        }
        let [hi, lo] = value.to_be_bytes();
        let mut command = hi | ACTIVE;
        if channel == 2 {
            command |= CHANNEL_B;
        }
        if self.gain == DacGain::X1 {
            command |= GAIN_X1;
        }
        self.spi.write(&[command, lo])?;
        Ok(())
    }
}

impl<SPI> Mcp4822<SPI> {
    /// Select the output gain.  Takes effect on the next write.
    pub fn set_gain(&mut self, gain: DacGain) {
        self.gain = gain;
    }

    pub fn gain(&self) -> DacGain {
        self.gain
    }

    pub fn release(self) -> SPI {
        self.spi
    }
}

#[cfg(test)]
mod tests {
    use super::{DacGain, Mcp4822};
    use crate::error::{Argument, Error};
    use embedded_hal_mock::eh1::spi as mock_spi;

    fn write(command: [u8; 2]) -> [mock_spi::Transaction<u8>; 3] {
        [
            mock_spi::Transaction::transaction_start(),
            mock_spi::Transaction::write_vec(command.to_vec()),
            mock_spi::Transaction::transaction_end(),
        ]
    }

    #[test]
    fn command_words() {
        let expectations: Vec<_> = [
            write([0x3f, 0xff]),
            write([0xb1, 0x23]),
            write([0x98, 0x00]),
            write([0x1c, 0xe4]),
        ]
        .concat();
        let mut spi = mock_spi::Mock::new(&expectations);

        let mut dac = Mcp4822::new(spi.clone());
        dac.set_raw(1, 4095).unwrap();
        dac.set_raw(2, 0x123).unwrap();
        dac.set_gain(DacGain::X2);
        dac.set_raw(2, 0x800).unwrap();
        // 3.3V at x2 is code 3300
        dac.set_voltage(1, 3.3).unwrap();

        spi.done();
    }

    #[test]
    fn full_scale_is_clamped() {
        let expectations: Vec<_> = [write([0x3f, 0xff]), write([0x38, 0x00])].concat();
        let mut spi = mock_spi::Mock::new(&expectations);

        let mut dac = Mcp4822::new(spi.clone());
        dac.set_voltage(1, 2.048).unwrap();
        dac.set_voltage(1, 1.024).unwrap();

        spi.done();
    }

    #[test]
    fn arguments_are_checked_before_io() {
        let expectations: [mock_spi::Transaction<u8>; 0] = [];
        let mut spi = mock_spi::Mock::new(&expectations);

        let mut dac = Mcp4822::new(spi.clone());
        assert_eq!(dac.set_raw(0, 1), Err(Error::OutOfRange(Argument::Channel)));
        assert_eq!(dac.set_raw(1, 4096), Err(Error::OutOfRange(Argument::Value)));
        assert_eq!(
            dac.set_voltage(3, 1.0),
            Err(Error::OutOfRange(Argument::Channel))
        );
        assert_eq!(
            dac.set_voltage(1, 2.5),
            Err(Error::OutOfRange(Argument::Voltage))
        );
        assert_eq!(
            dac.set_voltage(2, -0.1),
            Err(Error::OutOfRange(Argument::Voltage))
        );
        assert_eq!(DacGain::try_from(3), Err(Argument::Gain));
        assert_eq!(DacGain::try_from(2), Ok(DacGain::X2));

        spi.done();
    }
}
