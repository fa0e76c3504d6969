use std::num::NonZeroU32;

use crate::Error;

/// A positive handle handed across the C boundary.
///
/// Zero is never a valid handle, leaving it free to mean "nothing".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(NonZeroU32);

impl Id {
	fn from_key(key: usize) -> Result<Self, Error> {
		let id = u32::try_from(key)
			.ok()
			.and_then(|key| key.checked_add(1))
			.filter(|id| *id <= i32::MAX as u32)
			.and_then(NonZeroU32::new)
			.ok_or(Error::InvalidId)?;
		Ok(Self(id))
	}

	fn key(self) -> usize {
		self.0.get() as usize - 1
	}
}

impl TryFrom<i32> for Id {
	type Error = Error;

	fn try_from(id: i32) -> Result<Self, Self::Error> {
		u32::try_from(id)
			.ok()
			.and_then(NonZeroU32::new)
			.map(Self)
			.ok_or(Error::InvalidId)
	}
}

impl TryFrom<Id> for i32 {
	type Error = Error;

	fn try_from(id: Id) -> Result<Self, Self::Error> {
		i32::try_from(id.0.get()).map_err(|_| Error::InvalidId)
	}
}

/// A [slab::Slab] keyed by [Id] instead of a zero-based index.
pub struct NonZeroSlab<T>(slab::Slab<T>);

impl<T> Default for NonZeroSlab<T> {
	fn default() -> Self {
		Self(slab::Slab::new())
	}
}

impl<T> NonZeroSlab<T> {
	pub fn insert(&mut self, value: T) -> Result<Id, Error> {
		let entry = self.0.vacant_entry();
		let id = Id::from_key(entry.key())?;
		entry.insert(value);
		Ok(id)
	}

	pub fn get(&self, id: Id) -> Option<&T> {
		self.0.get(id.key())
	}

	pub fn get_mut(&mut self, id: Id) -> Option<&mut T> {
		self.0.get_mut(id.key())
	}

	pub fn remove(&mut self, id: Id) -> Option<T> {
		self.0.try_remove(id.key())
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
