use ffmpeg_next as ffmpeg;

use crate::Plane;

/// The chroma subsampling of a [Picture]. VP8 only produces 4:2:0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsampling {
	/// Chroma at half resolution both horizontally and vertically.
	Yuv420,
}

/// The visible region of a picture, always anchored at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
	pub x: u32,
	pub y: u32,
	pub width: u32,
	pub height: u32,
}

/// A decoded picture: three 8-bit planes in 4:2:0 layout.
///
/// The planes alias the decoder's pooled frame storage; no bytes were copied to build this value.
/// The storage goes back to the pool once both the codec and this picture are done with it, so the
/// picture may safely outlive the [crate::Decoder] that produced it.
///
/// Rows must be indexed with [Picture::stride], which may be larger than the plane width.
pub struct Picture {
	frame: ffmpeg::frame::Video,
}

impl Picture {
	pub(crate) fn new(frame: ffmpeg::frame::Video) -> Self {
		Self { frame }
	}

	pub fn width(&self) -> u32 {
		self.frame.width()
	}

	pub fn height(&self) -> u32 {
		self.frame.height()
	}

	pub fn rect(&self) -> Rect {
		Rect {
			x: 0,
			y: 0,
			width: self.width(),
			height: self.height(),
		}
	}

	pub fn subsampling(&self) -> Subsampling {
		Subsampling::Yuv420
	}

	/// The timestamp supplied with the packet this picture was decoded from.
	pub fn pts(&self) -> Option<i64> {
		self.frame.pts()
	}

	/// Whether this picture came from a key frame.
	pub fn is_key(&self) -> bool {
		self.frame.is_key()
	}

	/// The byte distance between the starts of consecutive rows of `plane`.
	pub fn stride(&self, plane: Plane) -> usize {
		self.frame.stride(plane.index())
	}

	pub fn plane_width(&self, plane: Plane) -> u32 {
		plane.width(self.width())
	}

	pub fn plane_height(&self, plane: Plane) -> u32 {
		plane.height(self.height())
	}

	/// All rows of `plane`, `stride` bytes apart.
	pub fn plane(&self, plane: Plane) -> &[u8] {
		self.frame.data(plane.index())
	}

	/// The visible samples of row `y` of `plane`, or None if out of range.
	pub fn row(&self, plane: Plane, y: u32) -> Option<&[u8]> {
		if y >= self.plane_height(plane) {
			return None;
		}

		let start = y as usize * self.stride(plane);
		let end = start + self.plane_width(plane) as usize;
		self.plane(plane).get(start..end)
	}

	/// Copy the visible samples into tightly packed planes owned by the caller.
	pub fn to_planes(&self) -> PlanarImage {
		let copy = |plane: Plane| {
			let mut out = Vec::with_capacity(self.plane_width(plane) as usize * self.plane_height(plane) as usize);
			for y in 0..self.plane_height(plane) {
				out.extend_from_slice(self.row(plane, y).unwrap_or_default());
			}
			out
		};

		PlanarImage {
			width: self.width(),
			height: self.height(),
			y: copy(Plane::Y),
			cb: copy(Plane::Cb),
			cr: copy(Plane::Cr),
			pts: self.pts(),
		}
	}
}

impl std::fmt::Debug for Picture {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Picture")
			.field("width", &self.width())
			.field("height", &self.height())
			.field("strides", &Plane::ALL.map(|plane| self.stride(plane)))
			.field("pts", &self.pts())
			.finish()
	}
}

/// A tightly packed copy of a [Picture]; each plane's stride equals its width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanarImage {
	pub width: u32,
	pub height: u32,
	pub y: Vec<u8>,
	pub cb: Vec<u8>,
	pub cr: Vec<u8>,
	pub pts: Option<i64>,
}

impl PlanarImage {
	pub fn plane(&self, plane: Plane) -> &[u8] {
		match plane {
			Plane::Y => &self.y,
			Plane::Cb => &self.cb,
			Plane::Cr => &self.cr,
		}
	}
}
