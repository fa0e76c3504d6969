use parking_lot::Mutex;

use crate::{FrameBuffer, FrameLayout, Result};

/// Obtains and takes back storage for decoded frames.
///
/// Release may be called from any thread: the last reference to a frame can be dropped wherever the
/// caller sent its picture.
pub trait FrameAllocator: Send + Sync {
	/// Return a buffer with exactly `layout`, reused or freshly allocated.
	fn acquire(&self, layout: FrameLayout) -> Result<FrameBuffer>;

	/// Take back a buffer that no one references any longer.
	fn release(&self, buffer: FrameBuffer);

	fn stats(&self) -> PoolStats;
}

/// Counters describing a [FrameAllocator]'s behavior so far.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
	/// Buffers allocated from the heap.
	pub allocated: u64,
	/// Acquisitions served from the free list.
	pub reused: u64,
	/// Buffers returned to the heap.
	pub freed: u64,
	/// Buffers currently sitting in the free list.
	pub idle: usize,
}

impl PoolStats {
	/// Buffers that exist right now, idle or lent out.
	///
	/// Buffers released into the pool without coming from it count as freed, so this saturates.
	pub fn live(&self) -> u64 {
		self.allocated.saturating_sub(self.freed)
	}
}

/// A free list of same-sized buffers, recycled across frames.
///
/// Only buffers matching the most recently requested layout are kept; a resolution change flushes
/// the rest back to the heap.
pub struct FramePool {
	capacity: usize,
	state: Mutex<PoolState>,
}

#[derive(Default)]
struct PoolState {
	idle: Vec<FrameBuffer>,
	current: Option<FrameLayout>,
	stats: PoolStats,
}

impl FramePool {
	/// Create a pool that keeps at most `capacity` idle buffers.
	pub fn new(capacity: usize) -> Self {
		Self {
			capacity,
			state: Default::default(),
		}
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}
}

impl FrameAllocator for FramePool {
	fn acquire(&self, layout: FrameLayout) -> Result<FrameBuffer> {
		let stale = {
			let mut state = self.state.lock();

			let stale = match state.current {
				Some(current) if current == layout => Vec::new(),
				_ => {
					state.current = Some(layout);
					std::mem::take(&mut state.idle)
				}
			};
			state.stats.freed += stale.len() as u64;

			if let Some(buffer) = state.idle.pop() {
				state.stats.reused += 1;
				return Ok(buffer);
			}

			stale
		};

		if !stale.is_empty() {
			tracing::debug!(count = stale.len(), width = layout.width, height = layout.height, "layout changed, dropping idle buffers");
		}
		drop(stale);

		let buffer = FrameBuffer::new(layout)?;
		self.state.lock().stats.allocated += 1;

		tracing::trace!(size = buffer.len(), width = layout.width, height = layout.height, "allocated frame buffer");

		Ok(buffer)
	}

	fn release(&self, buffer: FrameBuffer) {
		let mut state = self.state.lock();

		if state.idle.len() < self.capacity && state.current.as_ref() == Some(buffer.layout()) {
			state.idle.push(buffer);
			return;
		}

		state.stats.freed += 1;
		drop(state);

		drop(buffer);
	}

	fn stats(&self) -> PoolStats {
		let state = self.state.lock();
		PoolStats {
			idle: state.idle.len(),
			..state.stats
		}
	}
}
