use std::num::NonZeroUsize;

use parking_lot::Mutex;
use slab::Slab;

use crate::FrameBuffer;

/// An opaque, non-zero identifier for a buffer lent to the codec.
///
/// The codec echoes it back when it is done with the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(NonZeroUsize);

impl Handle {
	fn from_key(key: usize) -> Self {
		// Slab keys start at zero; shift by one so the handle is never null.
		Self(NonZeroUsize::MIN.saturating_add(key))
	}

	fn key(self) -> usize {
		self.0.get() - 1
	}

	pub fn get(self) -> usize {
		self.0.get()
	}
}

/// The buffers currently lent to the codec, keyed by [Handle].
#[derive(Default)]
pub struct Registry {
	entries: Mutex<Slab<FrameBuffer>>,
}

impl Registry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Take ownership of `buffer` until the matching [Registry::remove].
	///
	/// Returns the handle along with the buffer's base address, which stays valid until removal.
	pub fn insert(&self, mut buffer: FrameBuffer) -> (Handle, *mut u8) {
		let ptr = buffer.as_mut_ptr();
		let key = self.entries.lock().insert(buffer);
		(Handle::from_key(key), ptr)
	}

	/// Give back the buffer registered under `handle`.
	///
	/// Returns None if the handle is unknown, which includes a second removal of the same handle.
	pub fn remove(&self, handle: Handle) -> Option<FrameBuffer> {
		let buffer = self.entries.lock().try_remove(handle.key());
		if buffer.is_none() {
			tracing::warn!(handle = handle.get(), "release of unknown frame buffer");
		}
		buffer
	}

	pub fn contains(&self, handle: Handle) -> bool {
		self.entries.lock().contains(handle.key())
	}

	/// The number of buffers currently lent out.
	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
