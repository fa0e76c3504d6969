use ffmpeg_next as ffmpeg;

/// A list of possible errors that can occur while opening or driving a [crate::Decoder].
///
/// Everything but [Error::CodecNotFound], [Error::ContextAlloc], [Error::Init] and [Error::Open]
/// is a per-call failure: the decoder stays usable and the next packet may be submitted.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
	/// FFmpeg was built without a VP8 decoder.
	#[error("vp8 decoder not found")]
	CodecNotFound,

	#[error("failed to allocate codec context")]
	ContextAlloc,

	/// The process-wide FFmpeg registration failed.
	#[error("init error: {0}")]
	Init(ffmpeg::Error),

	#[error("failed to open decoder: {0}")]
	Open(ffmpeg::Error),

	/// The bitstream was malformed or uses an unsupported feature.
	#[error("decode error: {0}")]
	Decode(ffmpeg::Error),

	// An empty packet means "drain" to FFmpeg, so it's never forwarded.
	#[error("empty packet")]
	EmptyPacket,

	#[error("unsupported pixel format: {0}")]
	UnsupportedFormat(String),

	#[error("frame too large: {width}x{height}")]
	TooLarge { width: u32, height: u32 },

	#[error("out of memory")]
	OutOfMemory,
}

impl Error {
	/// A stable, negative integer code, used when crossing a C boundary.
	pub fn code(&self) -> i32 {
		match self {
			Self::CodecNotFound => -1,
			Self::ContextAlloc => -2,
			Self::Init(_) => -3,
			Self::Open(_) => -4,
			Self::Decode(_) => -5,
			Self::EmptyPacket => -6,
			Self::UnsupportedFormat(_) => -7,
			Self::TooLarge { .. } => -8,
			Self::OutOfMemory => -9,
		}
	}

	/// Returns true if the error only affects the call that produced it.
	pub fn is_recoverable(&self) -> bool {
		!matches!(
			self,
			Self::CodecNotFound | Self::ContextAlloc | Self::Init(_) | Self::Open(_)
		)
	}
}

pub type Result<T> = std::result::Result<T, Error>;
