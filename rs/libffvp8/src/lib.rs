//! C bindings for [ffvp8].
//!
//! Decoders and pictures are referred to by positive `int32_t` handles; negative return values are
//! error codes. See the generated `ffvp8.h`.
mod api;
mod error;
mod ffi;
mod id;
mod state;

pub use api::*;
pub use error::*;
pub use id::*;
