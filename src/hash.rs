/*!
# Hashing and sizing policy for the bucketed tables

The prefix map of [`PrefixTable`](crate::PrefixTable) and the buckets of
[`DuplicateAttributeVerifier`](crate::DuplicateAttributeVerifier) share the
same policy: capacities are powers of two, integer hashes are scrambled before
masking, and growth is driven by a load factor.

This module only defines that policy; each table brings its own entry storage
and decides whether (and how) it rehashes.
*/

/// Capacity used when no other capacity is requested.
pub const DEFAULT_INITIAL_CAPACITY: usize = 16;

/// Upper bound for any capacity computed by [`HashSizing`].
pub const MAXIMUM_CAPACITY: usize = 1 << 20;

/// Load factor used when no other load factor is requested.
pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;

/// Scramble a hash value so that low-entropy integers (such as table
/// indices) spread over the low bits used for bucket selection.
#[inline]
pub fn hash_hash(h: u32) -> u32 {
	let mut h = h;
	h = h.wrapping_add(!(h << 9));
	h ^= h >> 14;
	h = h.wrapping_add(h << 4);
	h ^= h >> 10;
	h
}

/// Map an (already scrambled) hash to a bucket of a table with `capacity`
/// buckets.
///
/// `capacity` must be a power of two.
#[inline]
pub fn index_for(h: u32, capacity: usize) -> usize {
	debug_assert!(capacity.is_power_of_two());
	(h as usize) & (capacity - 1)
}

/// Deterministic hash of a string, independent of the process and of the
/// hasher seed.
pub fn hash_str(s: &str) -> u32 {
	s.bytes()
		.fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(b as u32))
}

/// Capacity, load factor and resize threshold of a bucketed table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HashSizing {
	capacity: usize,
	threshold: usize,
	load_factor: f32,
}

impl HashSizing {
	/// Derive a sizing from a requested initial capacity.
	///
	/// The capacity is rounded up to the next power of two and capped at
	/// [`MAXIMUM_CAPACITY`].
	///
	/// # Panics
	///
	/// If `load_factor` is not a positive number.
	pub fn new(initial_capacity: usize, load_factor: f32) -> HashSizing {
		assert!(
			load_factor > 0.0 && !load_factor.is_nan(),
			"load factor must be positive"
		);
		let capacity = initial_capacity
			.max(1)
			.min(MAXIMUM_CAPACITY)
			.next_power_of_two();
		HashSizing {
			capacity,
			threshold: Self::threshold_for(capacity, load_factor),
			load_factor,
		}
	}

	fn threshold_for(capacity: usize, load_factor: f32) -> usize {
		(capacity as f32 * load_factor) as usize
	}

	/// Number of buckets.
	#[inline]
	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// Number of entries at which the table should grow.
	#[inline]
	pub fn threshold(&self) -> usize {
		self.threshold
	}

	#[inline]
	pub fn load_factor(&self) -> f32 {
		self.load_factor
	}

	/// Bucket for the raw hash `h`.
	#[inline]
	pub fn index(&self, h: u32) -> usize {
		index_for(hash_hash(h), self.capacity)
	}

	/// Return true if a table holding `size` entries has reached its
	/// threshold and can still grow.
	#[inline]
	pub fn needs_grow(&self, size: usize) -> bool {
		size >= self.threshold && self.capacity < MAXIMUM_CAPACITY
	}

	/// Double the capacity.
	///
	/// Returns false (and changes nothing) if the capacity is already at
	/// [`MAXIMUM_CAPACITY`]. All bucket indices have to be re-derived by the
	/// caller after a successful grow.
	pub fn grow(&mut self) -> bool {
		if self.capacity >= MAXIMUM_CAPACITY {
			return false;
		}
		self.capacity <<= 1;
		self.threshold = Self::threshold_for(self.capacity, self.load_factor);
		true
	}
}

impl Default for HashSizing {
	fn default() -> Self {
		Self::new(DEFAULT_INITIAL_CAPACITY, DEFAULT_LOAD_FACTOR)
	}
}
