/// Errors returned across the C boundary as negative codes.
#[derive(Debug, thiserror::Error, Clone)]
#[non_exhaustive]
pub enum Error {
	#[error("decoder error: {0}")]
	Decoder(#[from] ffvp8::Error),

	#[error("not found")]
	NotFound,

	#[error("invalid pointer")]
	InvalidPointer,

	#[error("invalid id")]
	InvalidId,

	#[error("invalid code")]
	InvalidCode,

	#[error("utf8 error: {0}")]
	Utf8(#[from] std::str::Utf8Error),

	#[error("invalid log level: {0}")]
	Level(String),

	#[error("panic")]
	Panic,
}

impl Error {
	/// Decoder errors keep their own codes; the binding's codes start at -100.
	pub fn code(&self) -> i32 {
		match self {
			Self::Decoder(err) => err.code(),
			Self::NotFound => -100,
			Self::InvalidPointer => -101,
			Self::InvalidId => -102,
			Self::InvalidCode => -103,
			Self::Utf8(_) => -104,
			Self::Level(_) => -105,
			Self::Panic => -106,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_decoder_codes_pass_through() {
		let err = Error::from(ffvp8::Error::EmptyPacket);
		assert_eq!(err.code(), ffvp8::Error::EmptyPacket.code());
		assert!(Error::Panic.code() < 0);
	}
}
