use std::ffi::c_char;
use std::str::FromStr;

use tracing::Level;

use crate::ffi;
use crate::state::State;
use crate::Error;

/// A decoded picture, as described by [ffvp8_picture_info].
///
/// Plane 0 is luma, 1 and 2 are Cb and Cr at half resolution. Row `y` of plane `i` starts at
/// `planes[i] + y * strides[i]`; strides may exceed the visible width.
#[repr(C)]
pub struct Picture {
	pub planes: [*const u8; 3],
	pub strides: [usize; 3],

	pub width: u32,
	pub height: u32,
	pub chroma_width: u32,
	pub chroma_height: u32,

	// Only meaningful when has_pts is set.
	pub pts: i64,
	pub has_pts: bool,

	pub keyframe: bool,
}

impl From<&ffvp8::Picture> for Picture {
	fn from(picture: &ffvp8::Picture) -> Self {
		use ffvp8::Plane;

		Self {
			planes: Plane::ALL.map(|plane| picture.plane(plane).as_ptr()),
			strides: Plane::ALL.map(|plane| picture.stride(plane)),
			width: picture.width(),
			height: picture.height(),
			chroma_width: picture.plane_width(Plane::Cb),
			chroma_height: picture.plane_height(Plane::Cb),
			pts: picture.pts().unwrap_or_default(),
			has_pts: picture.pts().is_some(),
			keyframe: picture.is_key(),
		}
	}
}

/// Initialize logging with a level.
///
/// The level is a string: "error", "warn", "info", "debug", "trace". Null or empty means "info".
/// FFmpeg's own log output follows the same level.
///
/// Returns a zero on success, or a negative code on failure.
///
/// # Safety
/// - The caller must ensure that level is a valid null-terminated C string, or null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ffvp8_log_level(level: *const c_char) -> i32 {
	ffi::return_code(move || {
		match unsafe { ffi::parse_str(level)? } {
			"" => ffvp8::Log::default(),
			level => ffvp8::Log {
				level: Level::from_str(level).map_err(|err| Error::Level(err.to_string()))?,
			},
		}
		.init();

		Ok(())
	})
}

/// Open a VP8 decoder with the default configuration.
///
/// Returns a non-zero handle to the decoder on success, or a negative code on failure.
/// Call [ffvp8_decoder_close] to free it.
#[unsafe(no_mangle)]
pub extern "C" fn ffvp8_decoder_open() -> i32 {
	ffi::return_code(move || State::lock().decoder_open(ffvp8::DecoderConfig::default()))
}

/// Open a VP8 decoder with explicit settings.
///
/// - `pool_capacity`: released frame buffers kept for reuse; zero disables recycling.
/// - `max_pixels`: frames with more pixels than this fail to decode; zero means no limit.
/// - `skip_loop_filter`: skip the deblocking filter, trading quality for speed.
///
/// Returns a non-zero handle to the decoder on success, or a negative code on failure.
/// Call [ffvp8_decoder_close] to free it.
#[unsafe(no_mangle)]
pub extern "C" fn ffvp8_decoder_open_config(pool_capacity: usize, max_pixels: u64, skip_loop_filter: bool) -> i32 {
	ffi::return_code(move || {
		let mut config = ffvp8::DecoderConfig::default();
		config.pool_capacity = pool_capacity;
		config.max_pixels = (max_pixels > 0).then_some(max_pixels);
		config.skip_loop_filter = skip_loop_filter;

		State::lock().decoder_open(config)
	})
}

/// Decode one compressed frame.
///
/// `pts` is carried through to the resulting picture untouched when `has_pts` is set.
///
/// Returns a non-zero handle to a picture, zero if the frame produced no picture, or a negative
/// code on failure. A failure only affects this call; the decoder remains usable.
/// Every returned picture must be released with [ffvp8_picture_close].
///
/// Different decoders may be used from different threads at the same time.
///
/// # Safety
/// - The caller must ensure that data is valid for size bytes, or null when size is zero.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ffvp8_decoder_decode(
	decoder: i32,
	data: *const u8,
	size: usize,
	pts: i64,
	has_pts: bool,
) -> i32 {
	ffi::return_code(move || {
		let decoder = ffi::parse_id(decoder)?;
		let data = unsafe { ffi::parse_slice(data, size)? };
		let pts = has_pts.then_some(pts);
		State::decoder_decode(decoder, data, pts)
	})
}

/// Describe a picture returned by [ffvp8_decoder_decode].
///
/// The plane pointers stay valid until [ffvp8_picture_close], even if the decoder is closed first.
///
/// Returns a zero on success, or a negative code on failure.
///
/// # Safety
/// - The caller must ensure that dst points to writable memory for a [Picture].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ffvp8_picture_info(picture: i32, dst: *mut Picture) -> i32 {
	ffi::return_code(move || {
		let picture = ffi::parse_id(picture)?;
		let dst = unsafe { ffi::parse_out(dst)? };
		*dst = State::lock().picture(picture)?.into();
		Ok(())
	})
}

/// Release a picture, returning its frame storage to the decoder's pool.
///
/// Returns a zero on success, or a negative code on failure.
#[unsafe(no_mangle)]
pub extern "C" fn ffvp8_picture_close(picture: i32) -> i32 {
	ffi::return_code(move || {
		let picture = ffi::parse_id(picture)?;
		State::lock().picture_close(picture)
	})
}

/// Discard all reference frames. The next frame must be a key frame.
///
/// Returns a zero on success, or a negative code on failure.
#[unsafe(no_mangle)]
pub extern "C" fn ffvp8_decoder_flush(decoder: i32) -> i32 {
	ffi::return_code(move || {
		let decoder = ffi::parse_id(decoder)?;
		State::decoder_flush(decoder)
	})
}

/// Close a decoder. Pictures it produced remain valid until closed.
///
/// Returns a zero on success, or a negative code on failure.
#[unsafe(no_mangle)]
pub extern "C" fn ffvp8_decoder_close(decoder: i32) -> i32 {
	ffi::return_code(move || {
		let decoder = ffi::parse_id(decoder)?;
		State::lock().decoder_close(decoder)
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	const KEY: &[u8] = include_bytes!("../../ffvp8/tests/fixtures/key16.vp8");

	fn decode(decoder: i32, data: &[u8], pts: Option<i64>) -> i32 {
		unsafe { ffvp8_decoder_decode(decoder, data.as_ptr(), data.len(), pts.unwrap_or_default(), pts.is_some()) }
	}

	fn info(picture: i32) -> Picture {
		let mut dst = std::mem::MaybeUninit::<Picture>::uninit();
		assert_eq!(unsafe { ffvp8_picture_info(picture, dst.as_mut_ptr()) }, 0);
		unsafe { dst.assume_init() }
	}

	#[test]
	fn test_decode_round_trip() {
		let decoder = ffvp8_decoder_open();
		assert!(decoder > 0);

		let picture = decode(decoder, KEY, Some(42));
		assert!(picture > 0);

		let info = info(picture);
		assert_eq!((info.width, info.height), (16, 16));
		assert_eq!((info.chroma_width, info.chroma_height), (8, 8));
		assert!(info.has_pts);
		assert_eq!(info.pts, 42);
		assert!(info.keyframe);
		assert!(info.strides[0] >= 16);
		assert!(info.strides[1] >= 8 && info.strides[2] >= 8);
		assert!(info.planes.iter().all(|plane| !plane.is_null()));

		assert_eq!(ffvp8_picture_close(picture), 0);
		assert_eq!(ffvp8_decoder_close(decoder), 0);
	}

	#[test]
	fn test_missing_pts() {
		let decoder = ffvp8_decoder_open();
		let picture = decode(decoder, KEY, None);

		let info = info(picture);
		assert!(!info.has_pts);
		assert_eq!(info.pts, 0);

		assert_eq!(ffvp8_picture_close(picture), 0);
		assert_eq!(ffvp8_decoder_close(decoder), 0);
	}

	#[test]
	fn test_picture_outlives_decoder() {
		let decoder = ffvp8_decoder_open();
		let picture = decode(decoder, KEY, Some(1));
		assert_eq!(ffvp8_decoder_close(decoder), 0);

		// The last visible luma row is still readable.
		let info = info(picture);
		let row = unsafe { std::slice::from_raw_parts(info.planes[0].add(15 * info.strides[0]), 16) };
		assert_eq!(row.len(), 16);

		assert_eq!(ffvp8_picture_close(picture), 0);
	}

	#[test]
	fn test_errors_leave_decoder_usable() {
		let decoder = ffvp8_decoder_open();

		assert_eq!(decode(decoder, &[], None), ffvp8::Error::EmptyPacket.code());
		assert_eq!(decode(decoder, &KEY[..10], None), ffvp8::Error::Decode(ffvp8::ffmpeg::Error::InvalidData).code());

		// Invisible key frame: consumed, but nothing to show.
		let mut hidden = KEY.to_vec();
		hidden[0] &= !0x10;
		assert_eq!(decode(decoder, &hidden, None), 0);

		let picture = decode(decoder, KEY, None);
		assert!(picture > 0);

		assert_eq!(ffvp8_decoder_flush(decoder), 0);
		assert_eq!(ffvp8_picture_close(picture), 0);
		assert_eq!(ffvp8_decoder_close(decoder), 0);
	}

	#[test]
	fn test_invalid_arguments() {
		assert_eq!(ffvp8_decoder_close(0), Error::InvalidId.code());
		assert_eq!(ffvp8_decoder_flush(-3), Error::InvalidId.code());
		assert_eq!(ffvp8_picture_close(i32::MAX), Error::NotFound.code());

		let decoder = ffvp8_decoder_open();
		let code = unsafe { ffvp8_decoder_decode(decoder, std::ptr::null(), 8, 0, false) };
		assert_eq!(code, Error::InvalidPointer.code());

		assert_eq!(unsafe { ffvp8_picture_info(1, std::ptr::null_mut()) }, Error::InvalidPointer.code());
		assert_eq!(ffvp8_decoder_close(decoder), 0);
	}

	#[test]
	fn test_open_config() {
		let decoder = ffvp8_decoder_open_config(0, 64, true);
		assert!(decoder > 0);

		// 16x16 is over the limit.
		let code = decode(decoder, KEY, None);
		assert_eq!(code, ffvp8::Error::TooLarge { width: 16, height: 16 }.code());
		assert_eq!(ffvp8_decoder_close(decoder), 0);

		// Zero means no limit.
		let decoder = ffvp8_decoder_open_config(2, 0, false);
		let picture = decode(decoder, KEY, None);
		assert!(picture > 0);

		assert_eq!(ffvp8_picture_close(picture), 0);
		assert_eq!(ffvp8_decoder_close(decoder), 0);
	}

	#[test]
	fn test_decoders_on_two_threads() {
		let threads: Vec<_> = (0..2)
			.map(|_| {
				std::thread::spawn(|| {
					let decoder = ffvp8_decoder_open();
					assert!(decoder > 0);

					let mut planes = Vec::new();
					for pts in 0..10 {
						let picture = decode(decoder, KEY, Some(pts));
						assert!(picture > 0);

						let info = info(picture);
						assert_eq!(info.pts, pts);
						planes.push(unsafe { std::slice::from_raw_parts(info.planes[0], 16) }.to_vec());

						assert_eq!(ffvp8_picture_close(picture), 0);
					}

					assert_eq!(ffvp8_decoder_close(decoder), 0);
					planes
				})
			})
			.collect();

		let results: Vec<_> = threads.into_iter().map(|thread| thread.join().unwrap()).collect();
		assert_eq!(results[0], results[1]);
	}

	#[test]
	fn test_log_level() {
		assert_eq!(unsafe { ffvp8_log_level(c"debug".as_ptr()) }, 0);
		assert_eq!(unsafe { ffvp8_log_level(std::ptr::null()) }, 0);
		assert_eq!(unsafe { ffvp8_log_level(c"loud".as_ptr()) }, Error::Level(String::new()).code());
	}
}
