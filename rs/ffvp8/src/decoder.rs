use std::sync::Arc;

use ffmpeg_next as ffmpeg;

use crate::store::{self, FrameStore};
use crate::{DecoderConfig, Error, FramePool, Picture, PoolStats, Result};

/// A VP8 decoder backed by FFmpeg, writing into pooled host-owned frame storage.
///
/// One decoder handles one stream. `decode` takes `&mut self`, so only one call is ever in flight;
/// decode several streams concurrently by opening one decoder per stream.
pub struct Decoder {
	// Dropped first: closing the context releases every buffer the codec still holds.
	decoder: ffmpeg::decoder::Video,

	// The context's opaque pointer refers to this store.
	store: Arc<FrameStore>,
}

impl Decoder {
	/// Open a decoder with the default configuration.
	pub fn open() -> Result<Self> {
		Self::with_config(DecoderConfig::default())
	}

	pub fn with_config(config: DecoderConfig) -> Result<Self> {
		crate::init()?;

		let codec = ffmpeg::decoder::find(ffmpeg::codec::Id::VP8).ok_or(Error::CodecNotFound)?;

		let pool = FramePool::new(config.pool_capacity);
		let store = Arc::new(FrameStore::new(Box::new(pool), config.max_pixels));

		let mut context = ffmpeg::codec::context::Context::new_with_codec(codec);

		// The callbacks must be installed before the codec is opened.
		unsafe {
			let ctx = context.as_mut_ptr();
			if ctx.is_null() {
				return Err(Error::ContextAlloc);
			}

			(*ctx).opaque = Arc::as_ptr(&store).cast_mut().cast();
			(*ctx).get_buffer2 = Some(store::get_buffer);

			// Frame threads would call get_buffer2 off the caller's stack.
			(*ctx).thread_count = 1;
		}

		let mut decoder = context.decoder();
		if config.skip_loop_filter {
			decoder.skip_loop_filter(ffmpeg::Discard::All);
		}

		let decoder = decoder
			.open_as(codec)
			.and_then(|opened| opened.video())
			.map_err(Error::Open)?;

		tracing::debug!(?config, "opened vp8 decoder");

		Ok(Self { decoder, store })
	}

	/// Decode one packet.
	///
	/// Returns `Ok(None)` when the packet was consumed without producing a picture yet, such as a
	/// frame the stream marks as not shown. Errors only affect this call; keep feeding packets.
	///
	/// `pts` is not interpreted, only carried to the picture decoded from this packet. `i64::MIN` is
	/// FFmpeg's "no timestamp" and reads back as None.
	pub fn decode(&mut self, packet: &[u8], pts: Option<i64>) -> Result<Option<Picture>> {
		if packet.is_empty() {
			return Err(Error::EmptyPacket);
		}

		let mut input = ffmpeg::Packet::copy(packet);
		input.set_pts(pts);

		self.store.clear_failure();

		if let Err(err) = self.decoder.send_packet(&input) {
			return Err(self.failed(err));
		}

		let mut picture = None;

		loop {
			let mut frame = ffmpeg::frame::Video::empty();
			match self.decoder.receive_frame(&mut frame) {
				Ok(()) => {
					if picture.replace(Picture::new(frame)).is_some() {
						tracing::debug!("dropping superseded picture");
					}
				}
				Err(ffmpeg::Error::Other {
					errno: ffmpeg::error::EAGAIN,
				})
				| Err(ffmpeg::Error::Eof) => break,
				Err(err) => return Err(self.failed(err)),
			}
		}

		if picture.is_none() {
			tracing::trace!(size = packet.len(), "packet produced no picture");
		}

		Ok(picture)
	}

	fn failed(&self, err: ffmpeg::Error) -> Error {
		let err = self.store.take_failure().unwrap_or(Error::Decode(err));
		tracing::warn!(%err, "decode failed");
		err
	}

	/// Drop all reference frames, e.g. before decoding from a new position in the stream.
	///
	/// The next packet must be a key frame.
	pub fn flush(&mut self) {
		self.decoder.flush();
		tracing::debug!(in_flight = self.store.in_flight(), "flushed vp8 decoder");
	}

	/// The stream's frame size, once the first key frame has been decoded.
	pub fn dimensions(&self) -> Option<(u32, u32)> {
		match (self.decoder.width(), self.decoder.height()) {
			(0, _) | (_, 0) => None,
			size => Some(size),
		}
	}

	pub fn stats(&self) -> PoolStats {
		self.store.stats()
	}

	/// The number of frame buffers currently held by the codec or by outstanding pictures.
	pub fn in_flight(&self) -> usize {
		self.store.in_flight()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tracing_test::traced_test;

	const KEY: &[u8] = include_bytes!("../tests/fixtures/key16.vp8");

	#[test]
	fn test_send() {
		fn assert_send<T: Send>() {}
		assert_send::<Decoder>();
		assert_send::<Picture>();
	}

	#[test]
	#[traced_test]
	fn test_failure_is_logged() {
		let mut decoder = Decoder::open().unwrap();

		assert!(decoder.decode(&KEY[..10], None).is_err());
		assert!(logs_contain("decode failed"));
	}

	#[test]
	#[traced_test]
	fn test_allocation_failure_is_surfaced() {
		let mut config = DecoderConfig::default();
		config.max_pixels = Some(1);

		let mut decoder = Decoder::with_config(config).unwrap();
		let err = decoder.decode(KEY, None).unwrap_err();

		assert!(matches!(err, Error::TooLarge { width: 16, height: 16 }));
		assert!(logs_contain("failed to provide frame buffer"));

		// The stashed failure doesn't leak into the next call.
		assert!(decoder.store.take_failure().is_none());
	}
}
