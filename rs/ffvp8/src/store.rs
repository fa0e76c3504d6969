//! The storage callbacks installed on the codec context.
//!
//! FFmpeg asks for storage through `get_buffer2` and gives it back by dropping the last reference
//! to the `AVBufferRef` we wrapped around it. Both run synchronously inside `decode`, `flush` or the
//! context teardown, except when a [crate::Picture] holds the final reference: then the release runs
//! wherever that picture is dropped.

use std::ffi::{c_int, c_void};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use ffmpeg_next as ffmpeg;
use ffmpeg::sys::{self, AVCodecContext, AVFrame, AVPixelFormat};
use parking_lot::Mutex;

use crate::{Error, FrameAllocator, FrameLayout, Handle, Plane, PoolStats, Registry, Result};

/// Everything the callbacks need, shared between the decoder and every outstanding buffer.
pub(crate) struct FrameStore {
	allocator: Box<dyn FrameAllocator>,
	registry: Registry,
	max_pixels: Option<u64>,

	// The reason the most recent provide failed, surfaced instead of FFmpeg's generic code.
	failure: Mutex<Option<Error>>,
}

// Carried by each AVBufferRef and handed back to release_buffer.
struct Reclaim {
	store: Arc<FrameStore>,
	handle: Handle,
}

impl FrameStore {
	pub fn new(allocator: Box<dyn FrameAllocator>, max_pixels: Option<u64>) -> Self {
		Self {
			allocator,
			registry: Registry::new(),
			max_pixels,
			failure: Mutex::new(None),
		}
	}

	pub fn stats(&self) -> PoolStats {
		self.allocator.stats()
	}

	pub fn in_flight(&self) -> usize {
		self.registry.len()
	}

	pub fn clear_failure(&self) {
		self.failure.lock().take();
	}

	pub fn take_failure(&self) -> Option<Error> {
		self.failure.lock().take()
	}

	/// Recover the store from the context's `opaque` back-reference.
	///
	/// # Safety
	/// `ctx.opaque` must have been set from [Arc::as_ptr] on a store that is still alive.
	unsafe fn from_context(ctx: *mut AVCodecContext) -> Arc<Self> {
		unsafe {
			let ptr = (*ctx).opaque as *const Self;
			Arc::increment_strong_count(ptr);
			Arc::from_raw(ptr)
		}
	}

	/// Lend a buffer to the codec for `frame`.
	///
	/// # Safety
	/// Must only be called from `get_buffer2` with the pointers FFmpeg passed in.
	unsafe fn provide(self: &Arc<Self>, ctx: *mut AVCodecContext, frame: *mut AVFrame) -> Result<()> {
		let (pix_fmt, width, height) = unsafe { ((*ctx).pix_fmt, (*frame).width, (*frame).height) };

		if pix_fmt != AVPixelFormat::AV_PIX_FMT_YUV420P {
			return Err(Error::UnsupportedFormat(format!("{:?}", ffmpeg::format::Pixel::from(pix_fmt))));
		}

		let (Ok(width), Ok(height)) = (u32::try_from(width), u32::try_from(height)) else {
			return Err(Error::Decode(ffmpeg::Error::InvalidData));
		};

		if let Some(max) = self.max_pixels {
			if u64::from(width) * u64::from(height) > max {
				return Err(Error::TooLarge { width, height });
			}
		}

		let layout = unsafe { Self::codec_layout(ctx, width, height) };

		let mut buffer = self.allocator.acquire(layout)?;
		let planes = Plane::ALL.map(|plane| buffer.plane_ptr(plane));
		let size = buffer.len();

		let (handle, base) = self.registry.insert(buffer);

		let reclaim = Box::into_raw(Box::new(Reclaim {
			store: self.clone(),
			handle,
		}));

		let buf = unsafe { sys::av_buffer_create(base, size, Some(release_buffer), reclaim.cast(), 0) };
		if buf.is_null() {
			// SAFETY: FFmpeg didn't take ownership, so the box is still ours.
			drop(unsafe { Box::from_raw(reclaim) });
			if let Some(buffer) = self.registry.remove(handle) {
				self.allocator.release(buffer);
			}
			return Err(Error::OutOfMemory);
		}

		unsafe {
			(*frame).buf[0] = buf;
			for plane in Plane::ALL {
				let i = plane.index();
				(*frame).data[i] = planes[i];
				(*frame).linesize[i] = layout.stride(plane) as c_int;
			}
			(*frame).extended_data = (&raw mut (*frame).data).cast();
		}

		tracing::trace!(handle = handle.get(), size, width, height, "provided frame buffer");

		Ok(())
	}

	/// The layout for a `width` x `height` frame, grown to whatever the codec requires.
	unsafe fn codec_layout(ctx: *mut AVCodecContext, width: u32, height: u32) -> FrameLayout {
		let mut coded_width = width as c_int;
		let mut coded_height = height as c_int;
		let mut linesize_align = [0 as c_int; sys::AV_NUM_DATA_POINTERS as usize];

		unsafe {
			sys::avcodec_align_dimensions2(ctx, &mut coded_width, &mut coded_height, linesize_align.as_mut_ptr());
		}

		let align = linesize_align.iter().copied().max().unwrap_or(1).max(1) as usize;
		let coded = (coded_width.max(0) as u32, coded_height.max(0) as u32);

		FrameLayout::with_alignment(width, height, coded, align)
	}

	/// Take back the buffer registered under `handle`.
	///
	/// Unknown handles are reported by the registry and otherwise ignored.
	fn reclaim(&self, handle: Handle) {
		if let Some(buffer) = self.registry.remove(handle) {
			tracing::trace!(handle = handle.get(), "reclaimed frame buffer");
			self.allocator.release(buffer);
		}
	}
}

/// The `get_buffer2` callback.
pub(crate) unsafe extern "C" fn get_buffer(ctx: *mut AVCodecContext, frame: *mut AVFrame, _flags: c_int) -> c_int {
	let res = catch_unwind(AssertUnwindSafe(|| unsafe {
		let store = FrameStore::from_context(ctx);
		store.provide(ctx, frame).map_err(|err| (store, err))
	}));

	match res {
		Ok(Ok(())) => 0,
		Ok(Err((store, err))) => {
			tracing::warn!(%err, "failed to provide frame buffer");
			let code = match err {
				Error::OutOfMemory => sys::AVERROR(ffmpeg::error::ENOMEM),
				_ => sys::AVERROR(ffmpeg::error::EINVAL),
			};
			*store.failure.lock() = Some(err);
			code
		}
		Err(_) => {
			tracing::error!("panic while providing frame buffer");
			sys::AVERROR_BUG
		}
	}
}

/// The `AVBufferRef` free callback; `opaque` is the boxed [Reclaim] created in provide.
unsafe extern "C" fn release_buffer(opaque: *mut c_void, _data: *mut u8) {
	// SAFETY: FFmpeg calls this exactly once per av_buffer_create.
	let reclaim = unsafe { Box::from_raw(opaque.cast::<Reclaim>()) };

	if catch_unwind(AssertUnwindSafe(move || reclaim.store.reclaim(reclaim.handle))).is_err() {
		tracing::error!("panic while reclaiming frame buffer");
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{FrameBuffer, FramePool};
	use tracing_test::traced_test;

	#[test]
	#[traced_test]
	fn test_unknown_handle_is_reported_once() {
		let store = FrameStore::new(Box::new(FramePool::new(4)), None);

		let buffer = store.allocator.acquire(FrameLayout::new(16, 16)).unwrap();
		let (handle, _) = store.registry.insert(buffer);
		store.reclaim(handle);
		store.reclaim(handle);

		logs_assert(|lines: &[&str]| {
			match lines.iter().filter(|line| line.contains("unknown frame buffer")).count() {
				1 => Ok(()),
				n => Err(format!("expected one report, got {n}")),
			}
		});
	}

	#[test]
	fn test_reclaim_returns_buffer_to_pool() {
		let store = FrameStore::new(Box::new(FramePool::new(4)), None);

		let buffer = store.allocator.acquire(FrameLayout::new(32, 32)).unwrap();
		let (handle, _) = store.registry.insert(buffer);
		assert_eq!(store.in_flight(), 1);

		store.reclaim(handle);
		assert_eq!(store.in_flight(), 0);
		assert_eq!(store.stats().idle, 1);

		// A second release of the same handle is a no-op.
		store.reclaim(handle);
		assert_eq!(store.stats().idle, 1);
	}

	struct PanicOnRelease;

	impl FrameAllocator for PanicOnRelease {
		fn acquire(&self, layout: FrameLayout) -> Result<FrameBuffer> {
			FrameBuffer::new(layout)
		}

		fn release(&self, _buffer: FrameBuffer) {
			panic!("release failed");
		}

		fn stats(&self) -> PoolStats {
			PoolStats::default()
		}
	}

	#[test]
	fn test_release_callback_contains_panics() {
		let store = Arc::new(FrameStore::new(Box::new(PanicOnRelease), None));

		let buffer = store.allocator.acquire(FrameLayout::new(16, 16)).unwrap();
		let (handle, base) = store.registry.insert(buffer);
		let reclaim = Box::into_raw(Box::new(Reclaim {
			store: store.clone(),
			handle,
		}));

		// Returns normally instead of unwinding into C.
		unsafe { release_buffer(reclaim.cast(), base) };

		assert_eq!(store.in_flight(), 0);
		assert_eq!(Arc::strong_count(&store), 1);
	}

	#[test]
	fn test_failure_is_taken_once() {
		let store = FrameStore::new(Box::new(FramePool::new(1)), None);

		*store.failure.lock() = Some(Error::OutOfMemory);
		assert!(matches!(store.take_failure(), Some(Error::OutOfMemory)));
		assert!(store.take_failure().is_none());
	}
}
