//! Support for the `DS1307` "64 x 8, Serial, I2C Real-Time Clock" on the RTC Pi and the
//! Expander Pi.
//!
//! Datasheet: https://www.analog.com/media/en/technical-documentation/data-sheets/DS1307.pdf
//!
//! Time and date live in seven BCD registers.  The chip only stores a two digit year; the
//! century is a fixed property of the driver instance (2000 unless given otherwise).
use crate::error::{Argument, Error, Result};
use crate::log::debug;
use embedded_hal::i2c::I2c;
use heapless::Vec;

/// I2C address of the clock.  Shared with the ADC Pi default, so the two boards cannot be
/// stacked without re-addressing the ADC.
pub const ADDRESS: u8 = 0x68;

/// Control register after construction: square wave off, output low, rate bits 32.768kHz.
pub const DEFAULT_CONFIG: u8 = 0x03;

pub const DEFAULT_CENTURY: u16 = 2000;

/// First and last address of the battery-backed user memory.
pub const MEMORY_START: u8 = 0x08;
pub const MEMORY_END: u8 = 0x3f;

/// Largest possible memory transfer.
pub const MEMORY_SIZE: usize = (MEMORY_END - MEMORY_START + 1) as usize;
const FRAME_SIZE: usize = MEMORY_SIZE + 1;

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Regs {
    Seconds = 0x00,
    Minutes = 0x01,
    Hours = 0x02,
    DayOfWeek = 0x03,
    Day = 0x04,
    Month = 0x05,
    Year = 0x06,
    /// - Bit 7: OUT: output level while the square wave is off
    /// - Bit 4: SQWE: square wave enable
    /// - Bits 1:0: RS: square wave rate
    Control = 0x07,
}

/// Clock halt flag in the seconds register.
const CH_MASK: u8 = 0x7f;
/// 12/24 hour select in the hours register; the driver always runs in 24 hour mode.
const HOURS_MASK: u8 = 0x3f;

const OUT: u8 = 1 << 7;
const SQWE: u8 = 1 << 4;
const RS_MASK: u8 = 0b0000_0011;

/// Convert a decimal value (0 to 99) to packed BCD.
pub fn dec_to_bcd(value: u8) -> u8 {
    (value / 10) << 4 | value % 10
}

/// Convert packed BCD to decimal.
pub fn bcd_to_dec(value: u8) -> u8 {
    value - 6 * (value >> 4)
}

/// Frequency of the square-wave output pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SquareWave {
    Hz1,
    Hz4096,
    Hz8192,
    Hz32768,
}

impl TryFrom<u8> for SquareWave {
    type Error = Argument;

    /// 1 = 1Hz, 2 = 4.096kHz, 3 = 8.192kHz, 4 = 32.768kHz
    fn try_from(frequency: u8) -> core::result::Result<Self, Argument> {
        match frequency {
            1 => Ok(SquareWave::Hz1),
            2 => Ok(SquareWave::Hz4096),
            3 => Ok(SquareWave::Hz8192),
            4 => Ok(SquareWave::Hz32768),
            _ => Err(Argument::SquareWave),
        }
    }
}

/// Calendar date and 24 hour time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DateTime {
    /// Full year, within the century of the clock.
    pub year: u16,
    /// 1 to 12
    pub month: u8,
    /// 1 to 31
    pub day: u8,
    /// Day of the week, 1 to 7 as counted by the chip.  Which day is 1 is up to the
    /// application; calendars that number Sunday as 0 must map it to 7 (or shift every day by
    /// one), since 0 is rejected.
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DateTime {
    fn is_valid(&self, century: u16) -> bool {
        self.year.checked_sub(century).map_or(false, |y| y < 100)
            && (1..=12).contains(&self.month)
            && (1..=31).contains(&self.day)
            && (1..=7).contains(&self.weekday)
            && self.hour < 24
            && self.minute < 60
            && self.second < 60
    }
}

/// Check that `[address, address + len)` stays inside the user memory.
///
/// The start address is checked first, so an address past `0x3f` reports
/// `OutOfRange(MemoryAddress)` even when the length alone would already exceed the capacity.
fn check_memory<E>(address: u8, len: usize) -> Result<(), E> {
    if !(MEMORY_START..=MEMORY_END).contains(&address) {
        return Err(Error::OutOfRange(Argument::MemoryAddress));
    }
    if usize::from(address) + len > usize::from(MEMORY_END) {
        return Err(Error::CapacityExceeded);
    }
    Ok(())
}

/// `DS1307` real-time clock.
pub struct Ds1307<I2C> {
    i2c: I2C,
    config: u8,
    century: u16,
}

impl<I2C: I2c> Ds1307<I2C> {
    /// Create a new instance and write the default control register.
    pub fn new(i2c: I2C) -> Result<Self, I2C::Error> {
        Self::with_century(i2c, DEFAULT_CENTURY)
    }

    /// Like [`Ds1307::new`] but with two digit years relative to `century`.
    pub fn with_century(mut i2c: I2C, century: u16) -> Result<Self, I2C::Error> {
        i2c.write(ADDRESS, &[Regs::Control as u8, DEFAULT_CONFIG])?;
        debug!("ds1307 ready, century {=u16}", century);
        Ok(Self {
            i2c,
            config: DEFAULT_CONFIG,
            century,
        })
    }

    /// Set the date and time.  All fields are validated before the clock is written, and the
    /// write also clears the clock-halt flag so the oscillator runs.
    pub fn set_date(&mut self, date: &DateTime) -> Result<(), I2C::Error> {
        if !date.is_valid(self.century) {
            return Err(Error::OutOfRange(Argument::DateTime));
        }
        let year = (date.year - self.century) as u8;
        self.i2c.write(
            ADDRESS,
            &[
                Regs::Seconds as u8,
                dec_to_bcd(date.second),
                dec_to_bcd(date.minute),
                dec_to_bcd(date.hour),
                dec_to_bcd(date.weekday),
                dec_to_bcd(date.day),
                dec_to_bcd(date.month),
                dec_to_bcd(year),
            ],
        )?;
        Ok(())
    }

    /// Read the date and time in one transfer.
    pub fn read_date(&mut self) -> Result<DateTime, I2C::Error> {
        let mut regs = [0x00; 7];
        self.i2c
            .write_read(ADDRESS, &[Regs::Seconds as u8], &mut regs)?;
        Ok(DateTime {
            year: self.century + u16::from(bcd_to_dec(regs[6])),
            month: bcd_to_dec(regs[5]),
            day: bcd_to_dec(regs[4]),
            weekday: bcd_to_dec(regs[3]),
            hour: bcd_to_dec(regs[2] & HOURS_MASK),
            minute: bcd_to_dec(regs[1]),
            second: bcd_to_dec(regs[0] & CH_MASK),
        })
    }

    /// Drive the square wave onto the output pin.
    pub fn enable_output(&mut self) -> Result<(), I2C::Error> {
        self.write_config(self.config | OUT | SQWE)
    }

    /// Stop the square wave and hold the output pin low.
    pub fn disable_output(&mut self) -> Result<(), I2C::Error> {
        self.write_config(self.config & !(OUT | SQWE))
    }

    pub fn set_frequency(&mut self, frequency: SquareWave) -> Result<(), I2C::Error> {
        self.write_config((self.config & !RS_MASK) | frequency as u8)
    }

    /// Write `data` to user memory starting at `address` (`0x08` to `0x3f`).
    ///
    /// An `address` outside that range fails with `OutOfRange(MemoryAddress)` before the length
    /// is looked at; a range running past `0x3f` fails with `CapacityExceeded`.
    pub fn write_memory(&mut self, address: u8, data: &[u8]) -> Result<(), I2C::Error> {
        check_memory(address, data.len())?;
        let mut frame: Vec<u8, FRAME_SIZE> = Vec::new();
        frame.push(address).map_err(|_| Error::CapacityExceeded)?;
        frame
            .extend_from_slice(data)
            .map_err(|_| Error::CapacityExceeded)?;
        self.i2c.write(ADDRESS, &frame)?;
        Ok(())
    }

    /// Read `len` bytes of user memory starting at `address` (`0x08` to `0x3f`).
    pub fn read_memory(
        &mut self,
        address: u8,
        len: usize,
    ) -> Result<Vec<u8, MEMORY_SIZE>, I2C::Error> {
        check_memory(address, len)?;
        let mut data = Vec::new();
        data.resize(len, 0x00)
            .map_err(|_| Error::CapacityExceeded)?;
        self.i2c.write_read(ADDRESS, &[address], &mut data)?;
        Ok(data)
    }

    fn write_config(&mut self, config: u8) -> Result<(), I2C::Error> {
        self.i2c.write(ADDRESS, &[Regs::Control as u8, config])?;
        self.config = config;
        Ok(())
    }
}

impl<I2C> Ds1307<I2C> {
    pub fn century(&self) -> u16 {
        self.century
    }

    /// Last control register value written.
    pub fn config(&self) -> u8 {
        self.config
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

#[cfg(test)]
mod tests {
    use super::{bcd_to_dec, dec_to_bcd, DateTime, Ds1307, SquareWave};
    use crate::emulator::RegisterFile;
    use crate::error::{Argument, Error};
    use embedded_hal_mock::eh1::i2c as mock_i2c;

    fn date() -> DateTime {
        DateTime {
            year: 2024,
            month: 12,
            day: 31,
            weekday: 2,
            hour: 23,
            minute: 59,
            second: 58,
        }
    }

    #[test]
    fn bcd_round_trip() {
        for d in 0..=99u8 {
            assert_eq!(bcd_to_dec(dec_to_bcd(d)), d);
        }
        assert_eq!(dec_to_bcd(59), 0x59);
        assert_eq!(bcd_to_dec(0x23), 23);
    }

    #[test]
    fn date_registers() {
        let expectations = [
            mock_i2c::Transaction::write(0x68, vec![0x07, 0x03]),
            mock_i2c::Transaction::write(
                0x68,
                vec![0x00, 0x58, 0x59, 0x23, 0x02, 0x31, 0x12, 0x24],
            ),
            mock_i2c::Transaction::write_read(
                0x68,
                vec![0x00],
                vec![0x80 | 0x07, 0x30, 0x40 | 0x09, 0x05, 0x01, 0x03, 0x99],
            ),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let mut rtc = Ds1307::new(bus.clone()).unwrap();
        rtc.set_date(&date()).unwrap();
        assert_eq!(
            rtc.read_date().unwrap(),
            DateTime {
                year: 2099,
                month: 3,
                day: 1,
                weekday: 5,
                hour: 9,
                minute: 30,
                second: 7,
            }
        );

        bus.done();
    }

    #[test]
    fn date_round_trip_with_century() {
        let dev = RegisterFile::new(0x68);
        let mut rtc = Ds1307::with_century(dev.clone(), 2100).unwrap();

        let mut when = date();
        when.year = 2105;
        rtc.set_date(&when).unwrap();
        assert_eq!(dev.register(0x06), 0x05);
        assert_eq!(rtc.read_date().unwrap(), when);

        when.year = 2099;
        assert_eq!(
            rtc.set_date(&when),
            Err(Error::OutOfRange(Argument::DateTime))
        );
    }

    #[test]
    fn weekday_counts_from_one() {
        let dev = RegisterFile::new(0x68);
        let mut rtc = Ds1307::new(dev.clone()).unwrap();

        let mut when = date();
        when.weekday = 0;
        assert_eq!(
            rtc.set_date(&when),
            Err(Error::OutOfRange(Argument::DateTime))
        );
        assert_eq!(dev.register(0x03), 0x00);

        when.weekday = 7;
        rtc.set_date(&when).unwrap();
        assert_eq!(dev.register(0x03), 0x07);
        assert_eq!(rtc.read_date().unwrap().weekday, 7);
    }

    #[test]
    fn control_register() {
        let dev = RegisterFile::new(0x68);
        let mut rtc = Ds1307::new(dev.clone()).unwrap();
        assert_eq!(dev.register(0x07), 0x03);

        rtc.set_frequency(SquareWave::Hz1).unwrap();
        assert_eq!(dev.register(0x07), 0x00);
        rtc.enable_output().unwrap();
        assert_eq!(dev.register(0x07), 0x90);
        rtc.set_frequency(SquareWave::try_from(3).unwrap()).unwrap();
        assert_eq!(dev.register(0x07), 0x92);
        rtc.disable_output().unwrap();
        assert_eq!(dev.register(0x07), 0x02);
        assert_eq!(rtc.config(), 0x02);
        assert_eq!(SquareWave::try_from(5), Err(Argument::SquareWave));
    }

    #[test]
    fn memory_round_trip() {
        let dev = RegisterFile::new(0x68);
        let mut rtc = Ds1307::new(dev.clone()).unwrap();

        rtc.write_memory(0x3c, &[1, 2, 3]).unwrap();
        assert_eq!(dev.register(0x3e), 3);
        assert_eq!(&rtc.read_memory(0x3c, 3).unwrap()[..], &[1, 2, 3]);

        let block = [0xa5; 55];
        rtc.write_memory(0x08, &block).unwrap();
        assert_eq!(&rtc.read_memory(0x08, 55).unwrap()[..], &block[..]);
    }

    #[test]
    fn memory_bounds_are_checked_before_io() {
        let expectations = [mock_i2c::Transaction::write(0x68, vec![0x07, 0x03])];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let mut rtc = Ds1307::new(bus.clone()).unwrap();
        assert_eq!(
            rtc.write_memory(0x3c, &[0, 1, 2, 3]),
            Err(Error::CapacityExceeded)
        );
        assert_eq!(
            rtc.write_memory(0x07, &[0]),
            Err(Error::OutOfRange(Argument::MemoryAddress))
        );
        assert_eq!(
            rtc.write_memory(0x40, &[]),
            Err(Error::OutOfRange(Argument::MemoryAddress))
        );
        assert_eq!(
            rtc.write_memory(0x40, &[0; 60]),
            Err(Error::OutOfRange(Argument::MemoryAddress))
        );
        assert_eq!(rtc.read_memory(0x30, 16), Err(Error::CapacityExceeded));
        assert_eq!(
            rtc.read_memory(0x00, 1),
            Err(Error::OutOfRange(Argument::MemoryAddress))
        );

        let mut bad = DateTime { month: 13, ..date() };
        assert_eq!(
            rtc.set_date(&bad),
            Err(Error::OutOfRange(Argument::DateTime))
        );
        bad.month = 12;
        bad.weekday = 0;
        assert_eq!(
            rtc.set_date(&bad),
            Err(Error::OutOfRange(Argument::DateTime))
        );
        bad.weekday = 7;
        bad.hour = 24;
        assert_eq!(
            rtc.set_date(&bad),
            Err(Error::OutOfRange(Argument::DateTime))
        );

        bus.done();
    }
}
