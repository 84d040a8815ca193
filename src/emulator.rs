//! Register-file I2C device used by the unit tests.
//!
//! Behaves like the register-pointer chips on the boards: the first written byte selects a
//! register, further written bytes are stored at consecutive registers, and reads continue from
//! the current pointer.  Clones share the same register file so a test can inspect the device
//! while a driver owns the bus.
use core::convert::Infallible;
use embedded_hal::i2c::{ErrorType, I2c, Operation};
use std::cell::RefCell;
use std::rc::Rc;

struct State {
    registers: [u8; 256],
    pointer: u8,
}

#[derive(Clone)]
pub(crate) struct RegisterFile {
    address: u8,
    state: Rc<RefCell<State>>,
}

impl RegisterFile {
    pub(crate) fn new(address: u8) -> Self {
        Self {
            address,
            state: Rc::new(RefCell::new(State {
                registers: [0x00; 256],
                pointer: 0,
            })),
        }
    }

    pub(crate) fn register(&self, reg: u8) -> u8 {
        self.state.borrow().registers[reg as usize]
    }

    pub(crate) fn set_register(&self, reg: u8, value: u8) {
        self.state.borrow_mut().registers[reg as usize] = value;
    }
}

impl ErrorType for RegisterFile {
    type Error = Infallible;
}

impl I2c for RegisterFile {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        assert_eq!(address, self.address, "unexpected i2c address");
        let mut state = self.state.borrow_mut();
        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    if let Some((reg, data)) = bytes.split_first() {
                        state.pointer = *reg;
                        for byte in data {
                            let at = state.pointer as usize;
                            state.registers[at] = *byte;
                            state.pointer = state.pointer.wrapping_add(1);
                        }
                    }
                }
                Operation::Read(buf) => {
                    for byte in buf.iter_mut() {
                        *byte = state.registers[state.pointer as usize];
                        state.pointer = state.pointer.wrapping_add(1);
                    }
                }
            }
        }
        Ok(())
    }
}
