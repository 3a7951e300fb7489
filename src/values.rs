/*!
# Growable value tables

A [`ValueTable`] stores interned character spans in a single contiguous
buffer plus parallel offset/length arrays. Each committed value gets a stable
index, which is what the encoder and decoder exchange instead of the text.

A table may sit on top of a read-only base ([`SharedValues`]). The base is
immutable and cheaply clonable, so several decoders can share a common
vocabulary while each appends its own entries locally. Indices below
[`ValueTable::read_only_base_size`] resolve into the base, indices above it
into the local storage.
*/
use std::fmt;

use log::debug;

use crate::context::Context;
use crate::error::{Error, Result, ERRCTX_TABLE_CHARACTERS, ERRCTX_TABLE_ENTRIES};
use crate::RcPtr;

/// Configuration for a [`ValueTable`].
///
/// Capacities are counted across the base and the local entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueTableOptions {
	/// Number of entries to allocate room for on construction.
	pub initial_capacity: usize,

	/// Maximum number of entries the table may hold.
	///
	/// Adding beyond this limit fails with
	/// [`Error::CapacityExceeded`](crate::Error::CapacityExceeded).
	pub maximum_capacity: usize,

	/// Number of bytes to allocate in the character buffer on construction.
	pub initial_character_size: usize,

	/// Maximum number of bytes the character buffer may hold.
	pub maximum_character_size: usize,
}

impl ValueTableOptions {
	/// Set the [`ValueTableOptions::initial_capacity`] value.
	pub fn initial_capacity(mut self, v: usize) -> ValueTableOptions {
		self.initial_capacity = v;
		self
	}

	/// Set the [`ValueTableOptions::maximum_capacity`] value.
	///
	/// # Example
	///
	/// ```
	/// use fiscope::{ValueTable, ValueTableOptions};
	/// let mut table = ValueTable::with_options(ValueTableOptions::default().maximum_capacity(1));
	/// assert!(table.add("foo").is_ok());
	/// assert!(table.add("bar").is_err());
	/// ```
	pub fn maximum_capacity(mut self, v: usize) -> ValueTableOptions {
		self.maximum_capacity = v;
		self
	}

	/// Set the [`ValueTableOptions::initial_character_size`] value.
	pub fn initial_character_size(mut self, v: usize) -> ValueTableOptions {
		self.initial_character_size = v;
		self
	}

	/// Set the [`ValueTableOptions::maximum_character_size`] value.
	pub fn maximum_character_size(mut self, v: usize) -> ValueTableOptions {
		self.maximum_character_size = v;
		self
	}
}

impl Default for ValueTableOptions {
	/// Constructs default table options.
	///
	/// The defaults are implementation-defined and should not be relied upon.
	fn default() -> Self {
		Self {
			initial_capacity: 10,
			maximum_capacity: i32::MAX as usize,
			initial_character_size: 512,
			maximum_character_size: i32::MAX as usize,
		}
	}
}

#[derive(Debug, Default)]
struct Frozen {
	chars: String,
	offsets: Vec<usize>,
	lengths: Vec<usize>,
}

impl Frozen {
	fn get(&self, index: usize) -> Option<&str> {
		let offset = *self.offsets.get(index)?;
		Some(&self.chars[offset..offset + self.lengths[index]])
	}
}

/// Immutable table usable as a read-only base of [`ValueTable`]s.
///
/// Cloning is cheap: all clones share the same storage. A `SharedValues` is
/// always flat; freezing a table which itself has a base copies the base
/// entries, so bases never form chains.
#[derive(Clone, Default)]
pub struct SharedValues(RcPtr<Frozen>);

impl SharedValues {
	/// Build a frozen table from a sequence of values, in order.
	pub fn from_values<'a, I: IntoIterator<Item = &'a str>>(values: I) -> SharedValues {
		let mut frozen = Frozen::default();
		for value in values {
			frozen.offsets.push(frozen.chars.len());
			frozen.lengths.push(value.len());
			frozen.chars.push_str(value);
		}
		SharedValues(RcPtr::new(frozen))
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.0.offsets.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Number of bytes in the character buffer.
	pub fn character_count(&self) -> usize {
		self.0.chars.len()
	}

	/// Return the value at `index`, if any.
	pub fn get(&self, index: usize) -> Option<&str> {
		self.0.get(index)
	}

	/// Iterate over all values in index order.
	pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
		(0..self.len()).filter_map(move |i| self.get(i))
	}

	/// Return true if both handles refer to the same storage.
	pub fn ptr_eq(&self, other: &SharedValues) -> bool {
		RcPtr::ptr_eq(&self.0, &other.0)
	}
}

impl fmt::Debug for SharedValues {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.debug_list().entries(self.iter()).finish()
	}
}

/**
# Append-only table of interned values

Values are appended with [`ValueTable::add`] and retrieved by index with
[`ValueTable::get`] (borrowed) or [`ValueTable::materialize`] (shared pointer,
cached per index).

Growth reallocates the entry arrays and, independently, the character buffer
to 1.5 times the required size, bounded by the configured maxima.

## Example

```
use fiscope::ValueTable;
let mut table = ValueTable::new();
let idx = table.add("urn:example").unwrap();
assert_eq!(table.get(idx), Some("urn:example"));

let base = table.freeze();
let mut derived = ValueTable::with_base(base.clone());
let local = derived.add("urn:local").unwrap();
assert_eq!(derived.get(idx), Some("urn:example"));
derived.clear();
assert_eq!(derived.get(local), None);
assert_eq!(base.get(idx), Some("urn:example"));
```
*/
pub struct ValueTable {
	opts: ValueTableOptions,
	base: Option<SharedValues>,
	chars: String,
	offsets: Vec<usize>,
	lengths: Vec<usize>,
	entry_capacity: usize,
	character_capacity: usize,
	cache: Vec<Option<RcPtr<str>>>,
	ctx: Option<RcPtr<Context>>,
}

impl ValueTable {
	/// Create an empty table with default options.
	pub fn new() -> ValueTable {
		Self::with_options(ValueTableOptions::default())
	}

	/// Create an empty table with the given options.
	pub fn with_options(opts: ValueTableOptions) -> ValueTable {
		let entry_capacity = opts.initial_capacity.min(opts.maximum_capacity);
		let character_capacity = opts
			.initial_character_size
			.min(opts.maximum_character_size);
		ValueTable {
			opts,
			base: None,
			chars: String::with_capacity(character_capacity),
			offsets: Vec::with_capacity(entry_capacity),
			lengths: Vec::with_capacity(entry_capacity),
			entry_capacity,
			character_capacity,
			cache: Vec::new(),
			ctx: None,
		}
	}

	/// Create a table which logically begins where `base` ends.
	pub fn with_base(base: SharedValues) -> ValueTable {
		let mut table = Self::new();
		table.set_read_only_base(base, true);
		table
	}

	/// Use the given [`Context`] to deduplicate materialized values.
	pub fn set_context(&mut self, ctx: RcPtr<Context>) {
		self.ctx = Some(ctx);
	}

	/// Access the options of this table.
	pub fn options(&self) -> &ValueTableOptions {
		&self.opts
	}

	/// Number of committed entries, including the base.
	#[inline]
	pub fn size(&self) -> usize {
		self.read_only_base_size() + self.offsets.len()
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.size()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.size() == 0
	}

	/// Number of entries inherited from the read-only base.
	#[inline]
	pub fn read_only_base_size(&self) -> usize {
		self.base.as_ref().map(|b| b.len()).unwrap_or(0)
	}

	/// The read-only base, if any.
	pub fn read_only_base(&self) -> Option<&SharedValues> {
		self.base.as_ref()
	}

	/// Number of bytes stored, including the base.
	pub fn character_count(&self) -> usize {
		self.base_character_count() + self.chars.len()
	}

	fn base_character_count(&self) -> usize {
		self.base.as_ref().map(|b| b.character_count()).unwrap_or(0)
	}

	fn ensure_entry_capacity(&mut self) -> Result<()> {
		let size = self.size();
		if size < self.entry_capacity {
			return Ok(());
		}
		if size >= self.opts.maximum_capacity {
			return Err(Error::capacity(ERRCTX_TABLE_ENTRIES));
		}
		let new_capacity = (size * 3 / 2 + 1).min(self.opts.maximum_capacity);
		let local = new_capacity - self.read_only_base_size();
		self.offsets.reserve_exact(local - self.offsets.len());
		self.lengths.reserve_exact(local - self.lengths.len());
		debug!(
			"value table entries grown from {} to {}",
			self.entry_capacity, new_capacity
		);
		self.entry_capacity = new_capacity;
		Ok(())
	}

	fn ensure_character_capacity(&mut self, additional: usize) -> Result<()> {
		let used = self.character_count();
		let required = match used.checked_add(additional) {
			Some(v) => v,
			None => return Err(Error::capacity(ERRCTX_TABLE_CHARACTERS)),
		};
		if required <= self.character_capacity {
			return Ok(());
		}
		if required > self.opts.maximum_character_size {
			return Err(Error::capacity(ERRCTX_TABLE_CHARACTERS));
		}
		let new_capacity = (required / 2)
			.saturating_add(required)
			.saturating_add(1)
			.min(self.opts.maximum_character_size);
		let local = new_capacity - self.base_character_count();
		self.chars.reserve_exact(local - self.chars.len());
		debug!(
			"value table characters grown from {} to {}",
			self.character_capacity, new_capacity
		);
		self.character_capacity = new_capacity;
		Ok(())
	}

	/// Append a copy of `value` and return its index.
	///
	/// Existing entries are never modified. Fails with
	/// [`Error::CapacityExceeded`] if either the entry or the character
	/// limit would be exceeded; the table is unchanged in that case.
	pub fn add(&mut self, value: &str) -> Result<usize> {
		self.ensure_entry_capacity()?;
		self.ensure_character_capacity(value.len())?;
		let index = self.size();
		self.offsets.push(self.chars.len());
		self.lengths.push(value.len());
		self.chars.push_str(value);
		Ok(index)
	}

	/// Return the value at `index`, if it has been committed.
	pub fn get(&self, index: usize) -> Option<&str> {
		let base_size = self.read_only_base_size();
		if index < base_size {
			return self.base.as_ref().and_then(|b| b.get(index));
		}
		let local = index - base_size;
		let offset = *self.offsets.get(local)?;
		Some(&self.chars[offset..offset + self.lengths[local]])
	}

	/// Return a shared pointer to the value at `index`.
	///
	/// The pointer is created on first access and cached; repeated calls
	/// return the same pointer until the entry is cleared.
	pub fn materialize(&mut self, index: usize) -> Option<RcPtr<str>> {
		if let Some(Some(ptr)) = self.cache.get(index) {
			return Some(ptr.clone());
		}
		let ptr = {
			let value = self.get(index)?;
			match self.ctx.as_ref() {
				Some(ctx) => ctx.intern(value),
				None => RcPtr::from(value),
			}
		};
		if self.cache.len() <= index {
			self.cache.resize(index + 1, None);
		}
		self.cache[index] = Some(ptr.clone());
		Some(ptr)
	}

	/// Iterate over all values in index order, base first.
	pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
		(0..self.size()).filter_map(move |i| self.get(i))
	}

	/// Drop all local entries; the base is kept.
	pub fn clear(&mut self) {
		self.chars.clear();
		self.offsets.clear();
		self.lengths.clear();
		let base_size = self.read_only_base_size();
		self.cache.truncate(base_size);
	}

	/// Drop all local entries and detach the base.
	pub fn clear_completely(&mut self) {
		if self.base.is_some() {
			debug!("detaching read-only base of {} entries", self.read_only_base_size());
		}
		self.base = None;
		self.cache.clear();
		self.clear();
		self.entry_capacity = self.offsets.capacity().min(self.opts.maximum_capacity);
		self.character_capacity = self
			.chars
			.capacity()
			.min(self.opts.maximum_character_size);
	}

	/// Attach `base` as the read-only base of this table.
	///
	/// If `clear_local` is true, local entries are dropped. Otherwise they
	/// are kept and renumbered to follow the new base.
	///
	/// Cached materializations are dropped in either case, since indices
	/// may have moved.
	pub fn set_read_only_base(&mut self, base: SharedValues, clear_local: bool) {
		if clear_local {
			self.chars.clear();
			self.offsets.clear();
			self.lengths.clear();
		}
		debug!(
			"attaching read-only base of {} entries ({} local entries kept)",
			base.len(),
			self.offsets.len()
		);
		self.base = Some(base);
		self.cache.clear();
		self.entry_capacity = (self.read_only_base_size() + self.offsets.capacity())
			.min(self.opts.maximum_capacity)
			.max(self.size());
		self.character_capacity = (self.base_character_count() + self.chars.capacity())
			.min(self.opts.maximum_character_size)
			.max(self.character_count());
	}

	/// Copy base and local entries into a new flat [`SharedValues`].
	pub fn freeze(&self) -> SharedValues {
		match self.base.as_ref() {
			Some(base) if self.offsets.is_empty() => base.clone(),
			_ => SharedValues::from_values(self.iter()),
		}
	}
}

impl Default for ValueTable {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for ValueTable {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("ValueTable")
			.field("size", &self.size())
			.field("read_only_base_size", &self.read_only_base_size())
			.field("entry_capacity", &self.entry_capacity)
			.field("character_capacity", &self.character_capacity)
			.finish()
	}
}
