//! Support for the ADC Pi: two `MCP3424` "18-Bit, Multi-Channel ΔΣ Analog-to-Digital Converter
//! with I2C Interface" chips behind one 8-channel interface.
//!
//! Datasheet: https://ww1.microchip.com/downloads/en/DeviceDoc/22088c.pdf
//!
//! Channels 1 to 4 live on the first chip, channels 5 to 8 on the second.  The chips have no
//! register pointer: every write replaces the single configuration byte and every read returns
//! the conversion result followed by the configuration byte, whose bit 7 reads `0` once the
//! result is fresh.
use crate::common::BitField;
use crate::error::{Argument, Error, Result};
use crate::log::{debug, trace, warning};
use embedded_hal::i2c::I2c;

/// Configuration register after power-on: channel 1, continuous, 18 bit, gain x1.
const DEFAULT_CONFIG: u8 = 0x9c;

/// Number of polls before a read gives up with [`Error::ConversionTimeout`].
pub const DEFAULT_POLL_LIMIT: u16 = 1000;

/// The on-board input divider scales the inputs down so the full range fits the converter.
const INPUT_SCALE: f32 = 2.471;

const RDY: u8 = 7;
const MODE: u8 = 4;
const RATE_MASK: u8 = 0b0000_1100;
const GAIN_MASK: u8 = 0b0000_0011;
const CHANNEL_MASK: u8 = 0b0110_0000;

/// Sample resolution.  Higher resolutions convert more slowly (240, 60, 15 and 3.75 SPS).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitRate {
    Bits12,
    Bits14,
    Bits16,
    Bits18,
}

impl BitRate {
    pub fn bits(self) -> u8 {
        match self {
            BitRate::Bits12 => 12,
            BitRate::Bits14 => 14,
            BitRate::Bits16 => 16,
            BitRate::Bits18 => 18,
        }
    }

    /// Volts per code at gain x1.
    fn lsb(self) -> f32 {
        match self {
            BitRate::Bits12 => 0.0005,
            BitRate::Bits14 => 0.000125,
            BitRate::Bits16 => 0.000_031_25,
            BitRate::Bits18 => 0.000_007_812_5,
        }
    }

    fn config_bits(self) -> u8 {
        (self as u8) << 2
    }

    /// The 18 bit result needs an extra data byte ahead of the configuration byte.
    fn response_len(self) -> usize {
        if self == BitRate::Bits18 {
            4
        } else {
            3
        }
    }
}

impl TryFrom<u8> for BitRate {
    type Error = Argument;

    fn try_from(bits: u8) -> core::result::Result<Self, Argument> {
        match bits {
            12 => Ok(BitRate::Bits12),
            14 => Ok(BitRate::Bits14),
            16 => Ok(BitRate::Bits16),
            18 => Ok(BitRate::Bits18),
            _ => Err(Argument::BitRate),
        }
    }
}

/// Programmable gain amplifier setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gain {
    X1,
    X2,
    X4,
    X8,
}

impl Gain {
    /// Divisor applied to the LSB when converting to volts.
    fn pga(self) -> f32 {
        match self {
            Gain::X1 => 0.5,
            Gain::X2 => 1.0,
            Gain::X4 => 2.0,
            Gain::X8 => 4.0,
        }
    }
}

impl TryFrom<u8> for Gain {
    type Error = Argument;

    fn try_from(gain: u8) -> core::result::Result<Self, Argument> {
        match gain {
            1 => Ok(Gain::X1),
            2 => Ok(Gain::X2),
            4 => Ok(Gain::X4),
            8 => Ok(Gain::X8),
            _ => Err(Argument::Gain),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConversionMode {
    /// A conversion is started explicitly for every read.
    OneShot,
    /// The chip converts continuously; a read returns the newest result.
    Continuous,
}

impl TryFrom<u8> for ConversionMode {
    type Error = Argument;

    fn try_from(mode: u8) -> core::result::Result<Self, Argument> {
        match mode {
            0 => Ok(ConversionMode::OneShot),
            1 => Ok(ConversionMode::Continuous),
            _ => Err(Argument::Mode),
        }
    }
}

/// A decoded conversion result with its sign bit split off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    /// Result code with the sign bit cleared.
    pub magnitude: u32,
    /// The sign bit was set: the input was below zero.
    pub negative: bool,
}

impl Sample {
    fn decode(bit_rate: BitRate, response: &[u8]) -> Self {
        let h = u32::from(response[0]);
        let m = u32::from(response[1]);
        let raw = match bit_rate {
            BitRate::Bits18 => (h & 0x03) << 16 | m << 8 | u32::from(response[2]),
            BitRate::Bits16 => h << 8 | m,
            BitRate::Bits14 => (h & 0x3f) << 8 | m,
            BitRate::Bits12 => (h & 0x0f) << 8 | m,
        };
        let sign = bit_rate.bits() - 1;
        Sample {
            magnitude: raw.with_bit(sign, false),
            negative: raw.bit(sign),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Chip {
    address: u8,
    config: u8,
    /// Last channel written to `config`, 0 before the first read.
    channel: u8,
}

impl Chip {
    fn new(address: u8) -> Self {
        Self {
            address,
            config: DEFAULT_CONFIG,
            channel: 0,
        }
    }

    /// Configuration byte selecting `channel`, leaving the shadow untouched.
    fn config_for(&self, channel: u8) -> u8 {
        if channel == self.channel {
            return self.config;
        }
        let mux = ((channel - 1) % 4) << 5;
        (self.config & !CHANNEL_MASK) | mux
    }
}

/// ADC Pi: eight single-ended inputs over a pair of `MCP3424` converters.
pub struct AdcPi<I2C> {
    i2c: I2C,
    chips: [Chip; 2],
    bit_rate: BitRate,
    gain: Gain,
    mode: ConversionMode,
    poll_limit: u16,
}

impl<I2C: I2c> AdcPi<I2C> {
    /// Create a new instance for the chips at `address1` (channels 1-4) and `address2`
    /// (channels 5-8), both `0x68` to `0x6f`.  The chips start in continuous mode at gain x1.
    pub fn new(
        i2c: I2C,
        address1: u8,
        address2: u8,
        bit_rate: BitRate,
    ) -> Result<Self, I2C::Error> {
        for address in [address1, address2] {
            if !(0x68..=0x6f).contains(&address) {
                return Err(Error::OutOfRange(Argument::Address));
            }
        }
        let mut adc = Self {
            i2c,
            chips: [Chip::new(address1), Chip::new(address2)],
            bit_rate: BitRate::Bits18,
            gain: Gain::X1,
            mode: ConversionMode::Continuous,
            poll_limit: DEFAULT_POLL_LIMIT,
        };
        adc.set_bit_rate(bit_rate);
        debug!(
            "adc pi at {=u8:#x}/{=u8:#x}, {=u8} bit",
            address1,
            address2,
            bit_rate.bits()
        );
        Ok(adc)
    }

    /// Read the voltage on `channel` (1 to 8).  Negative inputs read as `0.0`.
    pub fn read_voltage(&mut self, channel: u8) -> Result<f32, I2C::Error> {
        let sample = self.read_raw(channel)?;
        if sample.negative {
            return Ok(0.0);
        }
        Ok(sample.magnitude as f32 * (self.bit_rate.lsb() / self.gain.pga()) * INPUT_SCALE)
    }

    /// Read the raw conversion result on `channel` (1 to 8).
    ///
    /// In one-shot mode a conversion is started first.  The chip is then polled until it
    /// reports a fresh result; after the poll limit the read fails with
    /// [`Error::ConversionTimeout`] and the instance stays usable.
    pub fn read_raw(&mut self, channel: u8) -> Result<Sample, I2C::Error> {
        let index = match channel {
            1..=4 => 0,
            5..=8 => 1,
            _ => return Err(Error::OutOfRange(Argument::Channel)),
        };
        let chip = self.chips[index];
        let config = chip.config_for(channel);

        let mut poll = config;
        if self.mode == ConversionMode::OneShot {
            self.i2c.write(chip.address, &[config.with_bit(RDY, true)])?;
            poll = config.with_bit(RDY, false);
        }

        let mut response = [0x00; 4];
        let response = &mut response[..self.bit_rate.response_len()];
        for _ in 0..self.poll_limit.max(1) {
            self.i2c.write(chip.address, &[poll])?;
            self.chips[index].config = config;
            self.chips[index].channel = channel;

            self.i2c.read(chip.address, response)?;
            let status = response[response.len() - 1];
            if !status.bit(RDY) {
                let sample = Sample::decode(self.bit_rate, response);
                trace!("adc channel {=u8}: {=u32}", channel, sample.magnitude);
                return Ok(sample);
            }
        }

        warning!("adc {=u8:#x}: conversion timeout", chip.address);
        Err(Error::ConversionTimeout)
    }

    /// Select the amplifier gain for both chips.  Takes effect on the next read.
    pub fn set_pga(&mut self, gain: Gain) {
        for chip in self.chips.iter_mut() {
            chip.config = (chip.config & !GAIN_MASK) | gain as u8;
        }
        self.gain = gain;
    }

    /// Select the sample resolution for both chips.  Takes effect on the next read.
    pub fn set_bit_rate(&mut self, bit_rate: BitRate) {
        for chip in self.chips.iter_mut() {
            chip.config = (chip.config & !RATE_MASK) | bit_rate.config_bits();
        }
        self.bit_rate = bit_rate;
    }

    /// Select one-shot or continuous conversion for both chips.  Takes effect on the next read.
    pub fn set_conversion_mode(&mut self, mode: ConversionMode) {
        let continuous = mode == ConversionMode::Continuous;
        for chip in self.chips.iter_mut() {
            chip.config = chip.config.with_bit(MODE, continuous);
        }
        self.mode = mode;
    }

    /// Number of polls a read makes before timing out.  Zero is treated as one.
    pub fn set_poll_limit(&mut self, limit: u16) {
        self.poll_limit = limit;
    }
}

impl<I2C> AdcPi<I2C> {
    pub fn bit_rate(&self) -> BitRate {
        self.bit_rate
    }

    pub fn gain(&self) -> Gain {
        self.gain
    }

    pub fn conversion_mode(&self) -> ConversionMode {
        self.mode
    }

    pub fn poll_limit(&self) -> u16 {
        self.poll_limit
    }

    /// I2C addresses of the chips for channels 1-4 and 5-8.
    pub fn addresses(&self) -> (u8, u8) {
        (self.chips[0].address, self.chips[1].address)
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}
