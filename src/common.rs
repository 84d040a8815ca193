/// Single-bit access on register-sized integers.
///
/// Bit indices are 0-based.  Callers validate the index; out-of-width indices are a logic error.
pub trait BitField: Copy {
    /// Return `self` with bit `index` forced to `value`, all other bits unchanged.
    fn with_bit(self, index: u8, value: bool) -> Self;

    /// Whether bit `index` is set.
    fn bit(self, index: u8) -> bool;
}

macro_rules! impl_bit_field {
    ($($ty:ty),*) => {
        $(
            impl BitField for $ty {
                #[inline]
                fn with_bit(self, index: u8, value: bool) -> Self {
                    if value {
                        self | (1 << index)
                    } else {
                        self & !(1 << index)
                    }
                }

                #[inline]
                fn bit(self, index: u8) -> bool {
                    (self >> index) & 1 != 0
                }
            }
        )*
    };
}

impl_bit_field!(u8, u16, u32);

/// Pin direction as stored in the direction registers of both IO expander chips
/// (`1` = input, `0` = output).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub(crate) fn as_bit(self) -> bool {
        self == Direction::Input
    }

    pub(crate) fn from_bit(bit: bool) -> Self {
        if bit {
            Direction::Input
        } else {
            Direction::Output
        }
    }
}

/// Placeholder for an optional GPIO side line that is not wired up.
///
/// Used for the Servo Pi output-enable line and the I2C switch reset line when the caller does
/// not control them.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPin;

impl embedded_hal::digital::ErrorType for NoPin {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::BitField;

    #[test]
    fn with_bit_touches_only_one_bit() {
        for index in 0..8 {
            assert_eq!(0x00u8.with_bit(index, true), 1u8 << index);
            assert_eq!(0xffu8.with_bit(index, false), !(1u8 << index));
            assert_eq!(0xa5u8.with_bit(index, 0xa5u8.bit(index)), 0xa5);
        }
    }

    #[test]
    fn wide_values() {
        let raw = 0x0002_0001u32;
        assert!(raw.bit(17));
        assert!(raw.bit(0));
        assert!(!raw.bit(16));
        assert_eq!(raw.with_bit(17, false), 1);
        assert_eq!(0u16.with_bit(15, true), 0x8000);
    }
}
