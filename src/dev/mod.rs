//! The device module contains the drivers for each of the supported chips.
//!
//! In most cases you will not need anything from here explicitly, the exposed types at the root of
//! the crate should be enough.  The modules additionally hold per-chip constants such as default
//! addresses and limits.

pub mod ds1307;
pub mod mcp23017;
pub mod mcp320x;
pub mod mcp3424;
pub mod mcp4822;
pub mod pca9535;
pub mod pca9546a;
pub mod pca9685;
