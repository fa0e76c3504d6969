use std::alloc::{self, Layout};
use std::ptr::NonNull;

use crate::{layout, Error, FrameLayout, Plane, Result};

/// Host-owned storage for the three planes of one picture.
///
/// The allocation never moves or resizes, so the plane addresses handed to the codec stay valid
/// for as long as the buffer itself is alive.
pub struct FrameBuffer {
	ptr: NonNull<u8>,
	alloc: Layout,
	layout: FrameLayout,
}

// SAFETY: FrameBuffer uniquely owns its allocation, like a Box<[u8]>.
unsafe impl Send for FrameBuffer {}
unsafe impl Sync for FrameBuffer {}

impl FrameBuffer {
	/// Allocate zeroed storage for `layout`.
	pub fn new(layout: FrameLayout) -> Result<Self> {
		let alloc = Layout::from_size_align(layout.size(), layout::ALIGN).map_err(|_| Error::OutOfMemory)?;

		// SAFETY: the size is never zero; every layout carries tail padding.
		let ptr = unsafe { alloc::alloc_zeroed(alloc) };
		let ptr = NonNull::new(ptr).ok_or(Error::OutOfMemory)?;

		Ok(Self { ptr, alloc, layout })
	}

	pub fn layout(&self) -> &FrameLayout {
		&self.layout
	}

	/// The base address of the allocation.
	pub fn as_mut_ptr(&mut self) -> *mut u8 {
		self.ptr.as_ptr()
	}

	/// The number of bytes allocated.
	pub fn len(&self) -> usize {
		self.alloc.size()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// The address of the first sample of `plane`.
	pub fn plane_ptr(&mut self, plane: Plane) -> *mut u8 {
		// SAFETY: offsets are always within the allocation.
		unsafe { self.ptr.as_ptr().add(self.layout.offset(plane)) }
	}

	/// All of the storage, for inspection while no codec holds the buffer.
	pub fn as_slice(&self) -> &[u8] {
		// SAFETY: the allocation is initialized (zeroed) and lives as long as self.
		unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len()) }
	}
}

impl Drop for FrameBuffer {
	fn drop(&mut self) {
		// SAFETY: allocated in FrameBuffer::new with the same layout.
		unsafe { alloc::dealloc(self.ptr.as_ptr(), self.alloc) }
	}
}

impl std::fmt::Debug for FrameBuffer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FrameBuffer")
			.field("ptr", &self.ptr)
			.field("size", &self.len())
			.field("layout", &self.layout)
			.finish()
	}
}
