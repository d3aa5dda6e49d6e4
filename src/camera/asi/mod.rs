//! ZWO ASI camera backend.
//!
//! All vendor FFI is behind `#[cfg(feature = "asi")]`; mock-based tests run
//! without the ASICamera2 library.

pub mod api;
pub mod controls;
pub mod device;
pub mod discovery;
#[cfg(feature = "asi")]
pub mod ffi;
pub mod mock;
#[cfg(feature = "asi")]
pub mod sdk;
pub mod types;
