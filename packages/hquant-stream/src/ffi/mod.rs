//! FFI module.
//!
//! - `c`: C ABI (stable surface for other languages, see `include/hquant_stream.h`)
//! - `python`: PyO3 extension module (feature: `ffi-python`)

pub mod c;

#[cfg(feature = "ffi-python")]
pub mod python;
