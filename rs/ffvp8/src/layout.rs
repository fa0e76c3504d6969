/// Alignment of every plane start and every stride, in bytes.
///
/// 64 covers the widest SIMD loads FFmpeg performs (AVX-512).
pub const ALIGN: usize = 64;

// Each dimension is rounded to a macroblock and then padded by one more.
const MACROBLOCK: usize = 16;

// Slack past the final plane; the decoder may over-read by up to 16 + ALIGN - 1 bytes.
const TAIL: usize = MACROBLOCK + ALIGN;

/// One of the three sample planes of a 4:2:0 picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plane {
	/// Luma.
	Y,
	/// Blue-difference chroma.
	Cb,
	/// Red-difference chroma.
	Cr,
}

impl Plane {
	pub const ALL: [Plane; 3] = [Plane::Y, Plane::Cb, Plane::Cr];

	/// The index of this plane in FFmpeg's `data`/`linesize` arrays.
	pub const fn index(self) -> usize {
		match self {
			Self::Y => 0,
			Self::Cb => 1,
			Self::Cr => 2,
		}
	}

	pub const fn is_chroma(self) -> bool {
		!matches!(self, Self::Y)
	}

	/// The logical width of this plane for a picture `width` luma samples wide.
	///
	/// Chroma is half resolution, rounded up for odd dimensions.
	pub const fn width(self, width: u32) -> u32 {
		match self {
			Self::Y => width,
			_ => width.div_ceil(2),
		}
	}

	/// The logical height of this plane for a picture `height` luma rows tall.
	pub const fn height(self, height: u32) -> u32 {
		match self {
			Self::Y => height,
			_ => height.div_ceil(2),
		}
	}
}

/// The geometry of one frame buffer: where each plane starts, its stride and row count.
///
/// Two buffers with equal layouts are interchangeable, which is what makes pooling possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameLayout {
	/// The logical size this layout was computed for.
	pub width: u32,
	pub height: u32,

	strides: [usize; 3],
	rows: [usize; 3],
	offsets: [usize; 3],
	size: usize,
}

impl FrameLayout {
	/// Compute a layout for a `width` x `height` 4:2:0 picture.
	pub fn new(width: u32, height: u32) -> Self {
		Self::with_alignment(width, height, (width, height), ALIGN)
	}

	/// Compute a layout that also satisfies the codec's own requirements.
	///
	/// `coded` is the size returned by `avcodec_align_dimensions2`, and `linesize_align` the largest
	/// stride alignment it asked for.
	pub fn with_alignment(width: u32, height: u32, coded: (u32, u32), linesize_align: usize) -> Self {
		let stride_align = linesize_align.max(ALIGN).next_power_of_two();

		let mut strides = [0; 3];
		let mut rows = [0; 3];
		let mut offsets = [0; 3];
		let mut size = 0;

		for plane in Plane::ALL {
			let i = plane.index();

			let w = padded(plane.width(width)).max(plane.width(coded.0) as usize);
			let h = padded(plane.height(height)).max(plane.height(coded.1) as usize);

			strides[i] = align_up(w, stride_align);
			rows[i] = h;
			offsets[i] = align_up(size, ALIGN);
			size = offsets[i] + strides[i] * rows[i];
		}

		Self {
			width,
			height,
			strides,
			rows,
			offsets,
			size: size + TAIL,
		}
	}

	/// The byte distance between rows of `plane`.
	pub fn stride(&self, plane: Plane) -> usize {
		self.strides[plane.index()]
	}

	/// The number of rows allocated for `plane`, including padding.
	pub fn rows(&self, plane: Plane) -> usize {
		self.rows[plane.index()]
	}

	/// The byte offset of `plane` from the start of the buffer.
	pub fn offset(&self, plane: Plane) -> usize {
		self.offsets[plane.index()]
	}

	/// The total number of bytes needed for all three planes.
	pub fn size(&self) -> usize {
		self.size
	}
}

/// Round up to a multiple of 16, plus one extra 16 of slack.
fn padded(dim: u32) -> usize {
	align_up(dim as usize, MACROBLOCK) + MACROBLOCK
}

fn align_up(value: usize, align: usize) -> usize {
	value.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_plane_dimensions_round_up() {
		assert_eq!(Plane::Y.width(17), 17);
		assert_eq!(Plane::Cb.width(17), 9);
		assert_eq!(Plane::Cr.height(15), 8);
		assert_eq!(Plane::Cb.height(16), 8);
	}

	#[test]
	fn test_layout_padding() {
		let layout = FrameLayout::new(640, 480);

		// 640 -> 656 -> 704 after stride alignment.
		assert_eq!(layout.stride(Plane::Y), 704);
		assert_eq!(layout.rows(Plane::Y), 496);

		// 320 -> 336 -> 384.
		assert_eq!(layout.stride(Plane::Cb), 384);
		assert_eq!(layout.stride(Plane::Cr), 384);
		assert_eq!(layout.rows(Plane::Cb), 256);
	}

	#[test]
	fn test_stride_covers_plane_width() {
		for (width, height) in [(1, 1), (15, 9), (16, 16), (17, 33), (1279, 719), (1920, 1080), (16383, 3)] {
			let layout = FrameLayout::new(width, height);
			for plane in Plane::ALL {
				assert!(layout.stride(plane) >= plane.width(width) as usize, "{width}x{height} {plane:?}");
				assert!(layout.rows(plane) >= plane.height(height) as usize, "{width}x{height} {plane:?}");
				assert_eq!(layout.stride(plane) % ALIGN, 0);
				assert_eq!(layout.offset(plane) % ALIGN, 0);
			}
		}
	}

	#[test]
	fn test_planes_do_not_overlap() {
		let layout = FrameLayout::new(33, 17);

		let y_end = layout.offset(Plane::Y) + layout.stride(Plane::Y) * layout.rows(Plane::Y);
		assert!(layout.offset(Plane::Cb) >= y_end);

		let cb_end = layout.offset(Plane::Cb) + layout.stride(Plane::Cb) * layout.rows(Plane::Cb);
		assert!(layout.offset(Plane::Cr) >= cb_end);

		let cr_end = layout.offset(Plane::Cr) + layout.stride(Plane::Cr) * layout.rows(Plane::Cr);
		assert!(layout.size() >= cr_end + TAIL);
	}

	#[test]
	fn test_codec_alignment_wins_when_larger() {
		let layout = FrameLayout::with_alignment(16, 16, (64, 48), 128);

		assert_eq!(layout.stride(Plane::Y), 128);
		assert_eq!(layout.rows(Plane::Y), 48);
		assert_eq!(layout.stride(Plane::Cb), 128);
		assert_eq!(layout.rows(Plane::Cb), 32);
	}

	#[test]
	fn test_equal_sizes_share_a_layout() {
		assert_eq!(FrameLayout::new(320, 240), FrameLayout::new(320, 240));
		assert_ne!(FrameLayout::new(320, 240), FrameLayout::new(320, 256));
	}
}
