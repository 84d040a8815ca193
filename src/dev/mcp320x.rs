//! Support for the `MCP3202` (ADC-DAC Pi) and `MCP3208` (Expander Pi) "12-Bit A/D Converters with
//! SPI Serial Interface".
//!
//! Datasheets:
//! - https://ww1.microchip.com/downloads/en/DeviceDoc/21034F.pdf
//! - https://ww1.microchip.com/downloads/en/DeviceDoc/21298e.pdf
//!
//! Both chips answer a three byte command frame with the 12 bit result in the low nibble of the
//! second byte and the whole of the third byte.  The SPI device must be configured for mode 0 and
//! own the ADC chip-select line (CE0 on both boards).
use crate::error::{Argument, Error, Result};
use embedded_hal::spi::SpiDevice;

/// Reference voltage after construction: the Raspberry Pi 3.3V rail.
pub const DEFAULT_REFERENCE: f32 = 3.3;

const FULL_SCALE: f32 = 4096.0;

/// How a channel is sampled.
///
/// In differential mode channels are paired (1/2, 3/4, ...).  Selecting the odd channel of a pair
/// makes it IN+ and its even neighbour IN-; selecting the even channel swaps them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputMode {
    SingleEnded,
    Differential,
}

impl TryFrom<u8> for InputMode {
    type Error = Argument;

    fn try_from(mode: u8) -> core::result::Result<Self, Argument> {
        match mode {
            0 => Ok(InputMode::SingleEnded),
            1 => Ok(InputMode::Differential),
            _ => Err(Argument::Mode),
        }
    }
}

/// Transport and calibration shared by both chips.
struct Converter<SPI> {
    spi: SPI,
    reference: f32,
}

impl<SPI: SpiDevice> Converter<SPI> {
    fn new(spi: SPI) -> Self {
        Self {
            spi,
            reference: DEFAULT_REFERENCE,
        }
    }

    fn sample(&mut self, command: [u8; 3]) -> Result<u16, SPI::Error> {
        let mut response = [0x00; 3];
        self.spi.transfer(&mut response, &command)?;
        Ok(u16::from(response[1] & 0x0f) << 8 | u16::from(response[2]))
    }

    fn volts(&self, raw: u16) -> f32 {
        self.reference / FULL_SCALE * f32::from(raw)
    }
}

/// `MCP3202` two channel 12 bit ADC.
pub struct Mcp3202<SPI>(Converter<SPI>);

impl<SPI: SpiDevice> Mcp3202<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self(Converter::new(spi))
    }

    /// Read the raw 12 bit value of `channel` (1 or 2).
    pub fn read_raw(&mut self, channel: u8, mode: InputMode) -> Result<u16, SPI::Error> {
        let config = match (channel, mode) {
            (1, InputMode::SingleEnded) => 0x80,
            (1, InputMode::Differential) => 0x00,
            (2, InputMode::SingleEnded) => 0xc0,
            (2, InputMode::Differential) => 0x40,
            _ => return Err(Error::OutOfRange(Argument::Channel)),
        };
        self.0.sample([0x01, config, 0x00])
    }

    /// Read `channel` (1 or 2) scaled to volts between 0 and the reference voltage.
    pub fn read_voltage(&mut self, channel: u8, mode: InputMode) -> Result<f32, SPI::Error> {
        let raw = self.read_raw(channel, mode)?;
        Ok(self.0.volts(raw))
    }
}

impl<SPI> Mcp3202<SPI> {
    /// Set the reference to the measured voltage of the 3.3V rail.
    pub fn set_reference_voltage(&mut self, volts: f32) {
        self.0.reference = volts;
    }

    pub fn reference_voltage(&self) -> f32 {
        self.0.reference
    }

    pub fn release(self) -> SPI {
        self.0.spi
    }
}

/// `MCP3208` eight channel 12 bit ADC.
pub struct Mcp3208<SPI>(Converter<SPI>);

impl<SPI: SpiDevice> Mcp3208<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self(Converter::new(spi))
    }

    /// Read the raw 12 bit value of `channel` (1 to 8).
    pub fn read_raw(&mut self, channel: u8, mode: InputMode) -> Result<u16, SPI::Error> {
        if !(1..=8).contains(&channel) {
            return Err(Error::OutOfRange(Argument::Channel));
        }
        let index = channel - 1;
        // start bit, SGL/DIFF, then D2 D1 D0
        let start = match mode {
            InputMode::SingleEnded => 0x06,
            InputMode::Differential => 0x04,
        };
        self.0
            .sample([start | (index >> 2), (index & 0x03) << 6, 0x00])
    }

    /// Read `channel` (1 to 8) scaled to volts between 0 and the reference voltage.
    pub fn read_voltage(&mut self, channel: u8, mode: InputMode) -> Result<f32, SPI::Error> {
        let raw = self.read_raw(channel, mode)?;
        Ok(self.0.volts(raw))
    }
}

impl<SPI> Mcp3208<SPI> {
    /// Set the reference to the measured voltage of the 3.3V rail.
    pub fn set_reference_voltage(&mut self, volts: f32) {
        self.0.reference = volts;
    }

    pub fn reference_voltage(&self) -> f32 {
        self.0.reference
    }

    pub fn release(self) -> SPI {
        self.0.spi
    }
}

#[cfg(test)]
mod tests {
    use super::{InputMode, Mcp3202, Mcp3208};
    use crate::error::{Argument, Error};
    use embedded_hal_mock::eh1::spi as mock_spi;

    fn sample(write: [u8; 3], response: [u8; 3]) -> [mock_spi::Transaction<u8>; 3] {
        [
            mock_spi::Transaction::transaction_start(),
            mock_spi::Transaction::transfer(write.to_vec(), response.to_vec()),
            mock_spi::Transaction::transaction_end(),
        ]
    }

    #[test]
    fn mcp3202_command_frames() {
        let expectations: Vec<_> = [
            sample([0x01, 0x80, 0x00], [0x00, 0xf8, 0x12]),
            sample([0x01, 0x00, 0x00], [0x00, 0x00, 0x00]),
            sample([0x01, 0xc0, 0x00], [0x00, 0x0f, 0xff]),
            sample([0x01, 0x40, 0x00], [0x00, 0x01, 0x00]),
        ]
        .concat();
        let mut spi = mock_spi::Mock::new(&expectations);

        let mut adc = Mcp3202::new(spi.clone());
        assert_eq!(adc.read_raw(1, InputMode::SingleEnded).unwrap(), 0x812);
        assert_eq!(adc.read_raw(1, InputMode::Differential).unwrap(), 0);
        assert_eq!(adc.read_raw(2, InputMode::SingleEnded).unwrap(), 4095);
        adc.set_reference_voltage(4.096);
        let volts = adc.read_voltage(2, InputMode::Differential).unwrap();
        assert!((volts - 0.256).abs() < 1e-6);

        spi.done();
    }

    #[test]
    fn mcp3208_command_frames() {
        let expectations: Vec<_> = [
            sample([0x06, 0x00, 0x00], [0x00, 0x00, 0x01]),
            sample([0x06, 0xc0, 0x00], [0x00, 0x00, 0x02]),
            sample([0x07, 0x00, 0x00], [0x00, 0x00, 0x03]),
            sample([0x07, 0xc0, 0x00], [0x00, 0x00, 0x04]),
            sample([0x04, 0x40, 0x00], [0x00, 0x00, 0x05]),
            sample([0x05, 0x80, 0x00], [0x00, 0x08, 0x00]),
        ]
        .concat();
        let mut spi = mock_spi::Mock::new(&expectations);

        let mut adc = Mcp3208::new(spi.clone());
        assert_eq!(adc.read_raw(1, InputMode::SingleEnded).unwrap(), 1);
        assert_eq!(adc.read_raw(4, InputMode::SingleEnded).unwrap(), 2);
        assert_eq!(adc.read_raw(5, InputMode::SingleEnded).unwrap(), 3);
        assert_eq!(adc.read_raw(8, InputMode::SingleEnded).unwrap(), 4);
        assert_eq!(adc.read_raw(2, InputMode::Differential).unwrap(), 5);
        let volts = adc.read_voltage(7, InputMode::Differential).unwrap();
        assert!((volts - 1.65).abs() < 1e-6);

        spi.done();
    }

    #[test]
    fn invalid_channel_never_transfers() {
        let expectations: [mock_spi::Transaction<u8>; 0] = [];
        let mut spi = mock_spi::Mock::new(&expectations);

        let mut small = Mcp3202::new(spi.clone());
        assert_eq!(
            small.read_raw(3, InputMode::SingleEnded),
            Err(Error::OutOfRange(Argument::Channel))
        );
        let mut large = Mcp3208::new(spi.clone());
        assert_eq!(
            large.read_voltage(0, InputMode::Differential),
            Err(Error::OutOfRange(Argument::Channel))
        );
        assert_eq!(InputMode::try_from(2), Err(Argument::Mode));

        spi.done();
    }
}
