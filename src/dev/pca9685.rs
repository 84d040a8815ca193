//! Support for the `PCA9685` "16-channel, 12-bit PWM Fm+ I2C-bus LED controller", the PWM chip
//! of the Servo Pi.
//!
//! Datasheet: https://www.nxp.com/docs/en/data-sheet/PCA9685.pdf
//!
//! Each channel has an on and an off tick within a 4096 tick period.  Auto-increment stays off
//! (MODE1 default), so every register is written on its own.
use crate::bus::I2cExt;
use crate::common::{BitField, NoPin};
use crate::error::{Argument, Error, Result};
use crate::log::debug;
use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;

pub const DEFAULT_ADDRESS: u8 = 0x40;

/// Highest on/off tick within a period.
pub const MAX_TICKS: u16 = 4095;

/// Number of PWM channels.
pub const CHANNELS: u8 = 16;

/// MODE1 after construction: auto-increment off, all-call off, awake.
const MODE1_DEFAULT: u8 = 0x00;
/// MODE2 after construction: totem-pole outputs, outputs change on ACK.
const MODE2_DEFAULT: u8 = 0x0c;

const OSCILLATOR_HZ: u32 = 25_000_000;

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Regs {
    /// MODE1
    /// - Bit 7: RESTART
    /// - Bit 4: SLEEP: oscillator off
    /// - Bit 0: ALLCALL: respond to the all-call address
    Mode1 = 0x00,
    /// MODE2
    /// - Bit 4: INVRT: invert outputs
    /// - Bit 3: OCH: outputs change on ACK
    /// - Bit 2: OUTDRV: totem-pole outputs
    Mode2 = 0x01,
    SubAddress1 = 0x02,
    SubAddress2 = 0x03,
    SubAddress3 = 0x04,
    AllCallAddress = 0x05,
    /// First channel register block; each channel uses ON_L, ON_H, OFF_L, OFF_H.
    Led0OnL = 0x06,
    AllLedOnL = 0xfa,
    AllLedOnH = 0xfb,
    AllLedOffL = 0xfc,
    AllLedOffH = 0xfd,
    PreScale = 0xfe,
}

impl From<Regs> for u8 {
    fn from(r: Regs) -> u8 {
        r as u8
    }
}

const MODE1_RESTART: u8 = 7;
const MODE1_SLEEP: u8 = 4;
const MODE1_ALLCALL: u8 = 0;
const MODE2_INVRT: u8 = 4;

/// Valid range of the PRE_SCALE register.
const PRESCALE_MIN: i32 = 3;
const PRESCALE_MAX: i32 = 255;

/// Prescaler for `freq`, rounded to nearest, before calibration.
fn prescale(freq: u16) -> i32 {
    let period = 4096 * u32::from(freq);
    ((OSCILLATOR_HZ + period / 2) / period) as i32 - 1
}

/// Register offsets (ON_L) of a 1-based channel.
fn channel_base(channel: u8) -> core::result::Result<u8, Argument> {
    if !(1..=CHANNELS).contains(&channel) {
        return Err(Argument::Channel);
    }
    Ok(Regs::Led0OnL as u8 + 4 * (channel - 1))
}

/// `PCA9685` 16 channel PWM controller with an optional output-enable line.
pub struct Pca9685<I2C, OE = NoPin> {
    i2c: I2C,
    address: u8,
    oe: OE,
}

impl<I2C: I2c> Pca9685<I2C, NoPin> {
    /// Create a new instance at `address` (`0x40` to `0x7f`) without control of the OE line.
    pub fn new(i2c: I2C, address: u8) -> Result<Self, I2C::Error> {
        Self::with_output_enable(i2c, address, NoPin)
    }
}

impl<I2C: I2c, OE: OutputPin> Pca9685<I2C, OE> {
    /// Create a new instance, write the default modes and enable the outputs through `oe`
    /// (active low).
    pub fn with_output_enable(i2c: I2C, address: u8, oe: OE) -> Result<Self, I2C::Error> {
        if !(0x40..=0x7f).contains(&address) {
            return Err(Error::OutOfRange(Argument::Address));
        }
        let mut dev = Self { i2c, address, oe };
        dev.i2c.write_reg(address, Regs::Mode1, MODE1_DEFAULT)?;
        dev.i2c.write_reg(address, Regs::Mode2, MODE2_DEFAULT)?;
        dev.output_enable()?;
        debug!("pca9685 at {=u8:#x} ready", address);
        Ok(dev)
    }

    /// Set the PWM frequency (40 to 1000 Hz).  `calibration` is added to the prescaler to
    /// compensate oscillator drift, typically -10 to 10.
    pub fn set_pwm_frequency(&mut self, freq: u16, calibration: i8) -> Result<(), I2C::Error> {
        if !(40..=1000).contains(&freq) {
            return Err(Error::OutOfRange(Argument::Frequency));
        }
        let scale = prescale(freq) + i32::from(calibration);
        if !(PRESCALE_MIN..=PRESCALE_MAX).contains(&scale) {
            return Err(Error::OutOfRange(Argument::Frequency));
        }

        // The prescaler can only be written while the oscillator sleeps.
        let old = self.i2c.read_reg(self.address, Regs::Mode1)?;
        let sleeping = old.with_bit(MODE1_RESTART, false).with_bit(MODE1_SLEEP, true);
        self.i2c.write_reg(self.address, Regs::Mode1, sleeping)?;
        self.i2c.write_reg(self.address, Regs::PreScale, scale as u8)?;
        self.i2c.write_reg(self.address, Regs::Mode1, old)?;
        self.i2c
            .write_reg(self.address, Regs::Mode1, old.with_bit(MODE1_RESTART, true))?;
        debug!("pca9685 {=u16} Hz, prescale {=i32}", freq, scale);
        Ok(())
    }

    /// Set the on and off tick (0 to 4095, on not after off) of `channel` (1 to 16).
    pub fn set_pwm(&mut self, channel: u8, on: u16, off: u16) -> Result<(), I2C::Error> {
        let base = channel_base(channel).map_err(Error::OutOfRange)?;
        if on > MAX_TICKS || off > MAX_TICKS || on > off {
            return Err(Error::OutOfRange(Argument::Ticks));
        }
        self.write_ticks(base, on)?;
        self.write_ticks(base + 2, off)
    }

    pub fn set_pwm_on_time(&mut self, channel: u8, on: u16) -> Result<(), I2C::Error> {
        let base = channel_base(channel).map_err(Error::OutOfRange)?;
        if on > MAX_TICKS {
            return Err(Error::OutOfRange(Argument::Ticks));
        }
        self.write_ticks(base, on)
    }

    pub fn set_pwm_off_time(&mut self, channel: u8, off: u16) -> Result<(), I2C::Error> {
        let base = channel_base(channel).map_err(Error::OutOfRange)?;
        if off > MAX_TICKS {
            return Err(Error::OutOfRange(Argument::Ticks));
        }
        self.write_ticks(base + 2, off)
    }

    pub fn get_pwm_on_time(&mut self, channel: u8) -> Result<u16, I2C::Error> {
        let base = channel_base(channel).map_err(Error::OutOfRange)?;
        self.read_ticks(base)
    }

    pub fn get_pwm_off_time(&mut self, channel: u8) -> Result<u16, I2C::Error> {
        let base = channel_base(channel).map_err(Error::OutOfRange)?;
        self.read_ticks(base + 2)
    }

    /// Set the on and off tick of every channel at once.
    pub fn set_all_pwm(&mut self, on: u16, off: u16) -> Result<(), I2C::Error> {
        if on > MAX_TICKS || off > MAX_TICKS || on > off {
            return Err(Error::OutOfRange(Argument::Ticks));
        }
        self.write_ticks(Regs::AllLedOnL.into(), on)?;
        self.write_ticks(Regs::AllLedOffL.into(), off)
    }

    /// Drive OE low.
    pub fn output_enable(&mut self) -> Result<(), I2C::Error> {
        self.oe.set_low().map_err(|_| Error::Pin)
    }

    /// Drive OE high; all outputs go to their disabled state.
    pub fn output_disable(&mut self) -> Result<(), I2C::Error> {
        self.oe.set_high().map_err(|_| Error::Pin)
    }

    /// Program the all-call address (7 bit) and enable responding to it.
    pub fn set_all_call_address(&mut self, address: u8) -> Result<(), I2C::Error> {
        if address > 0x7f {
            return Err(Error::OutOfRange(Argument::Address));
        }
        self.enable_all_call_address()?;
        self.i2c
            .write_reg(self.address, Regs::AllCallAddress, address << 1)?;
        Ok(())
    }

    pub fn enable_all_call_address(&mut self) -> Result<(), I2C::Error> {
        self.update_mode(Regs::Mode1, MODE1_ALLCALL, true)
    }

    pub fn disable_all_call_address(&mut self) -> Result<(), I2C::Error> {
        self.update_mode(Regs::Mode1, MODE1_ALLCALL, false)
    }

    /// Stop the oscillator.  Outputs are off while sleeping.
    pub fn sleep(&mut self) -> Result<(), I2C::Error> {
        self.update_mode(Regs::Mode1, MODE1_SLEEP, true)
    }

    pub fn wake(&mut self) -> Result<(), I2C::Error> {
        self.update_mode(Regs::Mode1, MODE1_SLEEP, false)
    }

    pub fn is_sleeping(&mut self) -> Result<bool, I2C::Error> {
        Ok(self.i2c.read_reg(self.address, Regs::Mode1)?.bit(MODE1_SLEEP))
    }

    /// Invert the output logic of every channel.
    pub fn invert_output(&mut self, inverted: bool) -> Result<(), I2C::Error> {
        self.update_mode(Regs::Mode2, MODE2_INVRT, inverted)
    }

    fn update_mode(&mut self, reg: Regs, bit: u8, value: bool) -> Result<(), I2C::Error> {
        let (set, clear) = if value { (1 << bit, 0) } else { (0, 1 << bit) };
        self.i2c.update_reg(self.address, reg, set, clear)?;
        Ok(())
    }

    fn write_ticks(&mut self, reg: u8, ticks: u16) -> Result<(), I2C::Error> {
        let [lo, hi] = ticks.to_le_bytes();
        self.i2c.write_reg(self.address, reg, lo)?;
        self.i2c.write_reg(self.address, reg + 1, hi)?;
        Ok(())
    }

    /// 12 bit tick count; the full-on/full-off flag in bit 12 is dropped.
    fn read_ticks(&mut self, reg: u8) -> Result<u16, I2C::Error> {
        let lo = self.i2c.read_reg(self.address, reg)?;
        let hi = self.i2c.read_reg(self.address, reg + 1)?;
        Ok(u16::from_le_bytes([lo, hi]) & MAX_TICKS)
    }
}

impl<I2C, OE> Pca9685<I2C, OE> {
    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn release(self) -> (I2C, OE) {
        (self.i2c, self.oe)
    }
}
