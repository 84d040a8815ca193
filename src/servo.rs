//! RC servo control on top of the [`Pca9685`].
//!
//! Each channel has a low and a high pulse-width limit in ticks.  A move maps a position in
//! `0..=steps` linearly onto `low..=high` and sets the off tick accordingly.  With offsets
//! enabled the pulses of the channels start at staggered ticks instead of all at tick 0, so the
//! servos do not all draw current at the same moment.
use crate::common::NoPin;
use crate::dev::pca9685::{Pca9685, CHANNELS, MAX_TICKS};
use crate::error::{Argument, Error, Result};
use crate::log::debug;
use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;

/// Positions per full sweep used by typical RC servos.
pub const DEFAULT_STEPS: u16 = 250;

/// Frame rate expected by typical RC servos.
pub const DEFAULT_FREQUENCY: u16 = 50;

pub const DEFAULT_LOW_LIMIT_MS: f32 = 1.0;
pub const DEFAULT_HIGH_LIMIT_MS: f32 = 2.0;

const N: usize = CHANNELS as usize;

/// Convert a pulse width in milliseconds to ticks at `frequency`, rounded to nearest.
fn limit_ticks(ms: f32, frequency: u16) -> Option<u16> {
    let ticks = 4096.0 * (ms / 1000.0) * f32::from(frequency);
    // also rejects NaN
    if !(ticks >= 0.0) {
        return None;
    }
    let ticks = (ticks + 0.5) as u32;
    if ticks > u32::from(MAX_TICKS) {
        return None;
    }
    Some(ticks as u16)
}

/// Ceiling division for signed operands, `den != 0`.
fn div_ceil(num: i32, den: i32) -> i32 {
    let q = num / den;
    if num % den != 0 && (num > 0) == (den > 0) {
        q + 1
    } else {
        q
    }
}

/// Servo Pi: sixteen RC servos driven by one [`Pca9685`].
pub struct Servo<I2C, OE = NoPin> {
    pwm: Pca9685<I2C, OE>,
    frequency: u16,
    low: [u16; N],
    high: [u16; N],
    /// Pulse width in ticks, 0 while a channel is off.
    position: [u16; N],
    offset: [u16; N],
    use_offset: bool,
}

impl<I2C: I2c, OE: OutputPin> Servo<I2C, OE> {
    /// Take control of `pwm` with the given limits in milliseconds for all channels.
    ///
    /// With `reset` the frequency is set to 50 Hz and every channel is switched off.  Without
    /// it the current on and off ticks of all channels are read back from the chip and kept.
    pub fn new(
        pwm: Pca9685<I2C, OE>,
        low_limit_ms: f32,
        high_limit_ms: f32,
        reset: bool,
    ) -> Result<Self, I2C::Error> {
        let low = limit_ticks(low_limit_ms, DEFAULT_FREQUENCY)
            .ok_or(Error::OutOfRange(Argument::Limit))?;
        let high = limit_ticks(high_limit_ms, DEFAULT_FREQUENCY)
            .ok_or(Error::OutOfRange(Argument::Limit))?;

        let mut servo = Self {
            pwm,
            frequency: DEFAULT_FREQUENCY,
            low: [low; N],
            high: [high; N],
            position: [0; N],
            offset: [0; N],
            use_offset: false,
        };

        if reset {
            servo.set_frequency(DEFAULT_FREQUENCY, 0)?;
            servo.calculate_offsets()?;
        } else {
            for channel in 1..=CHANNELS {
                let i = usize::from(channel - 1);
                let on = servo.pwm.get_pwm_on_time(channel)?;
                let off = servo.pwm.get_pwm_off_time(channel)?;
                servo.offset[i] = on;
                servo.position[i] = off.saturating_sub(on);
            }
        }
        Ok(servo)
    }

    /// Move the servo on `channel` (1 to 16) to `position` out of `steps` (1 to 4095).
    pub fn move_servo(&mut self, channel: u8, position: u16, steps: u16) -> Result<(), I2C::Error> {
        let i = channel_index(channel)?;
        if !(1..=MAX_TICKS).contains(&steps) {
            return Err(Error::OutOfRange(Argument::Steps));
        }
        if position > steps {
            return Err(Error::OutOfRange(Argument::Position));
        }

        let low = i32::from(self.low[i]);
        let high = i32::from(self.high[i]);
        let ticks = low + (high - low) * i32::from(position) / i32::from(steps);
        let ticks = ticks as u16;

        if self.use_offset {
            let on = self.offset[i];
            self.pwm.set_pwm(channel, on, ticks + on)?;
        } else {
            self.pwm.set_pwm(channel, 0, ticks)?;
        }
        self.position[i] = ticks;
        Ok(())
    }

    /// Position of the servo on `channel` out of `steps`, derived from the chip's off tick.
    ///
    /// Rounds up, so positions above 250 steps may read back one higher than they were set.
    /// A pulse shorter than the low limit, such as a stopped channel, gives a negative value.
    pub fn get_position(&mut self, channel: u8, steps: u16) -> Result<i32, I2C::Error> {
        let i = channel_index(channel)?;
        let low = i32::from(self.low[i]);
        let high = i32::from(self.high[i]);
        if high == low {
            return Err(Error::OutOfRange(Argument::Limit));
        }

        let mut ticks = i32::from(self.pwm.get_pwm_off_time(channel)?);
        if self.use_offset {
            ticks -= i32::from(self.offset[i]);
        }
        Ok(div_ceil(i32::from(steps) * (ticks - low), high - low))
    }

    /// Set the low limit in milliseconds for `channel` (1 to 16), or for all channels when
    /// `channel` is 0.  Typically 1.0ms; too low a value may damage the servo.
    pub fn set_low_limit(&mut self, ms: f32, channel: u8) -> Result<(), I2C::Error> {
        let ticks = self.checked_limit(ms, channel)?;
        apply(&mut self.low, ticks, channel);
        self.calculate_offsets()
    }

    /// Set the high limit in milliseconds for `channel` (1 to 16), or for all channels when
    /// `channel` is 0.  Typically 2.0ms; too high a value may damage the servo.
    pub fn set_high_limit(&mut self, ms: f32, channel: u8) -> Result<(), I2C::Error> {
        let ticks = self.checked_limit(ms, channel)?;
        apply(&mut self.high, ticks, channel);
        self.calculate_offsets()
    }

    /// Change the PWM frequency.  Limits keep their tick values; set them again to convert
    /// from milliseconds at the new frequency.
    pub fn set_frequency(&mut self, freq: u16, calibration: i8) -> Result<(), I2C::Error> {
        self.pwm.set_pwm_frequency(freq, calibration)?;
        self.frequency = freq;
        Ok(())
    }

    pub fn output_enable(&mut self) -> Result<(), I2C::Error> {
        self.pwm.output_enable()?;
        self.calculate_offsets()
    }

    pub fn output_disable(&mut self) -> Result<(), I2C::Error> {
        self.pwm.output_disable()
    }

    /// Stagger the pulse start of each channel.
    pub fn offset_enable(&mut self) -> Result<(), I2C::Error> {
        self.use_offset = true;
        self.calculate_offsets()
    }

    /// Start all pulses at tick 0.
    pub fn offset_disable(&mut self) -> Result<(), I2C::Error> {
        self.use_offset = false;
        self.refresh_channels()
    }

    pub fn sleep(&mut self) -> Result<(), I2C::Error> {
        self.pwm.sleep()
    }

    pub fn wake(&mut self) -> Result<(), I2C::Error> {
        self.pwm.wake()
    }

    pub fn is_sleeping(&mut self) -> Result<bool, I2C::Error> {
        self.pwm.is_sleeping()
    }

    fn checked_limit(&self, ms: f32, channel: u8) -> Result<u16, I2C::Error> {
        if channel > CHANNELS {
            return Err(Error::OutOfRange(Argument::Channel));
        }
        limit_ticks(ms, self.frequency).ok_or(Error::OutOfRange(Argument::Limit))
    }

    /// Each channel starts where the previous one's longest pulse ends, wrapping back to half
    /// the first channel's high limit once a pulse would run past the end of the period.
    fn calculate_offsets(&mut self) -> Result<(), I2C::Error> {
        let mut x = 0;
        for i in 0..N {
            x += self.high[i];
            if x > MAX_TICKS - self.high[i] {
                x = self.high[0] / 2;
            }
            self.offset[i] = x;
        }
        debug!("servo offsets {=[?]}", &self.offset[..]);
        self.refresh_channels()
    }

    fn refresh_channels(&mut self) -> Result<(), I2C::Error> {
        for channel in 1..=CHANNELS {
            let i = usize::from(channel - 1);
            let width = self.position[i];
            if width == 0 {
                self.pwm.set_pwm(channel, 0, 0)?;
            } else if self.use_offset {
                let on = self.offset[i];
                self.pwm.set_pwm(channel, on, width + on)?;
            } else {
                self.pwm.set_pwm(channel, 0, width)?;
            }
        }
        Ok(())
    }
}

impl<I2C, OE> Servo<I2C, OE> {
    pub fn frequency(&self) -> u16 {
        self.frequency
    }

    /// Low and high limit in ticks of `channel` (1 to 16).
    pub fn limits(&self, channel: u8) -> Option<(u16, u16)> {
        let i = usize::from(channel.checked_sub(1)?);
        Some((*self.low.get(i)?, *self.high.get(i)?))
    }

    pub fn offsets_enabled(&self) -> bool {
        self.use_offset
    }

    /// Direct access to the PWM controller.  Changes made through it are not tracked.
    pub fn pwm(&mut self) -> &mut Pca9685<I2C, OE> {
        &mut self.pwm
    }

    pub fn release(self) -> Pca9685<I2C, OE> {
        self.pwm
    }
}

fn channel_index<E>(channel: u8) -> Result<usize, E> {
    if !(1..=CHANNELS).contains(&channel) {
        return Err(Error::OutOfRange(Argument::Channel));
    }
    Ok(usize::from(channel - 1))
}

/// Store `ticks` for one channel, or for all of them when `channel` is 0.
fn apply(table: &mut [u16; N], ticks: u16, channel: u8) {
    match channel {
        0 => table.fill(ticks),
        _ => table[usize::from(channel - 1)] = ticks,
    }
}
