//! # ffvp8: VP8 decoding into host-owned frame buffers
//!
//! `ffvp8` wraps FFmpeg's VP8 decoder, but never lets FFmpeg allocate picture storage itself.
//! Instead the decoder borrows every frame buffer from a [FrameAllocator] through a pair of callbacks:
//! one lends storage when the codec starts a frame, the other takes it back when the codec
//! (and any [Picture] aliasing it) is done.
//!
//! ## Overview
//!
//! - **Decoder**: Feed compressed packets, get back zero-copy [Picture]s.
//! - **Pool**: Released buffers are recycled by [FramePool] instead of reallocated.
//! - **Registry**: Every lent buffer is tracked by a [Handle] until it comes back.
//!
//! ```no_run
//! let mut decoder = ffvp8::Decoder::open()?;
//!
//! let packet: &[u8] = &[/* one compressed vp8 frame */];
//! if let Some(picture) = decoder.decode(packet, Some(0))? {
//! 	let luma = picture.row(ffvp8::Plane::Y, 0);
//! }
//! # Ok::<(), ffvp8::Error>(())
//! ```
mod buffer;
mod config;
mod decoder;
mod error;
mod layout;
mod log;
mod picture;
mod pool;
mod registry;
mod store;

pub use buffer::*;
pub use config::*;
pub use decoder::*;
pub use error::*;
pub use layout::*;
pub use log::*;
pub use picture::*;
pub use pool::*;
pub use registry::*;

// export the ffmpeg version in use
pub use ffmpeg_next as ffmpeg;

use std::sync::OnceLock;

/// Initialize FFmpeg. Safe to call any number of times, from any thread.
///
/// [Decoder::open] calls this itself.
pub fn init() -> Result<()> {
	static INIT: OnceLock<std::result::Result<(), ffmpeg::Error>> = OnceLock::new();

	(*INIT.get_or_init(|| {
		let res = ffmpeg::init();
		if res.is_ok() {
			tracing::debug!("initialized ffmpeg");
		}
		res
	}))
	.map_err(Error::Init)
}
