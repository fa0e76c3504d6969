use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use crate::{Error, Id, NonZeroSlab};

static STATE: LazyLock<Mutex<State>> = LazyLock::new(Default::default);

// Each decoder has its own lock, so a slow decode never holds up the global state.
type SharedDecoder = Arc<parking_lot::Mutex<ffvp8::Decoder>>;

#[derive(Default)]
pub struct State {
	// All open decoders, indexed by an ID.
	decoders: NonZeroSlab<SharedDecoder>,

	// Pictures handed out but not yet closed. Each keeps its frame storage alive.
	pictures: NonZeroSlab<ffvp8::Picture>,
}

impl State {
	pub fn lock() -> MutexGuard<'static, State> {
		// Every method leaves the state consistent, so a panic elsewhere doesn't taint it.
		STATE.lock().unwrap_or_else(PoisonError::into_inner)
	}

	pub fn decoder_open(&mut self, config: ffvp8::DecoderConfig) -> Result<Id, Error> {
		let decoder = ffvp8::Decoder::with_config(config)?;
		self.decoders.insert(Arc::new(parking_lot::Mutex::new(decoder)))
	}

	fn decoder(&self, decoder: Id) -> Result<SharedDecoder, Error> {
		self.decoders.get(decoder).cloned().ok_or(Error::NotFound)
	}

	/// Decode with only the decoder's own lock held; the global lock is taken just for the lookup
	/// and to register the resulting picture.
	pub fn decoder_decode(decoder: Id, data: &[u8], pts: Option<i64>) -> Result<Option<Id>, Error> {
		let decoder = Self::lock().decoder(decoder)?;
		let picture = decoder.lock().decode(data, pts)?;

		picture.map(|picture| Self::lock().pictures.insert(picture)).transpose()
	}

	pub fn decoder_flush(decoder: Id) -> Result<(), Error> {
		let decoder = Self::lock().decoder(decoder)?;
		decoder.lock().flush();
		Ok(())
	}

	/// Forget the decoder. A decode still running on another thread finishes first; the decoder is
	/// dropped once it does.
	pub fn decoder_close(&mut self, decoder: Id) -> Result<(), Error> {
		self.decoders.remove(decoder).ok_or(Error::NotFound)?;
		Ok(())
	}

	pub fn picture(&self, picture: Id) -> Result<&ffvp8::Picture, Error> {
		self.pictures.get(picture).ok_or(Error::NotFound)
	}

	pub fn picture_close(&mut self, picture: Id) -> Result<(), Error> {
		self.pictures.remove(picture).ok_or(Error::NotFound)?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const KEY: &[u8] = include_bytes!("../../ffvp8/tests/fixtures/key16.vp8");

	#[test]
	fn test_busy_decoder_does_not_block_others() {
		let busy = State::lock().decoder_open(Default::default()).unwrap();
		let other = State::lock().decoder_open(Default::default()).unwrap();

		// Hold the first decoder as if a decode were running on it.
		let shared = State::lock().decoder(busy).unwrap();
		let guard = shared.lock();

		let picture = State::decoder_decode(other, KEY, Some(3)).unwrap().unwrap();
		assert_eq!(State::lock().picture(picture).unwrap().pts(), Some(3));
		State::lock().picture_close(picture).unwrap();
		State::decoder_flush(other).unwrap();

		// Closing a busy decoder doesn't wait for it either.
		State::lock().decoder_close(busy).unwrap();
		drop(guard);
		assert_eq!(Arc::strong_count(&shared), 1);

		State::lock().decoder_close(other).unwrap();
	}
}
