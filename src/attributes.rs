/*!
# Duplicate attribute detection

[`DuplicateAttributeVerifier`] answers "has this attribute already been seen
on the current element?" without clearing anything between elements. Every
entry is stamped with the iteration it was recorded in; advancing to the next
element bumps the iteration, which makes all older entries invisible.
*/
use std::fmt;

use log::{debug, trace};

use crate::error::{Result, WFError};
use crate::hash::{HashSizing, DEFAULT_LOAD_FACTOR};

/// Number of buckets of a [`DuplicateAttributeVerifier`].
pub const MAP_SIZE: usize = 256;

/// Pack the identity of a qualified attribute name into an attribute value
/// for [`DuplicateAttributeVerifier::check_and_record`].
#[inline]
pub fn attribute_id(local_name_index: usize, namespace_index: usize) -> u64 {
	((namespace_index as u64) << 32) | (local_name_index as u64 & 0xffff_ffff)
}

/// Bucket hash for an attribute value produced by [`attribute_id`].
#[inline]
pub fn attribute_hash(value: u64) -> u32 {
	(value ^ (value >> 32)) as u32
}

#[derive(Clone, Copy)]
struct Entry {
	iteration: u32,
	bucket: u32,
	value: u64,
	next: Option<u32>,
}

/**
# Per-element duplicate attribute check

Call [`DuplicateAttributeVerifier::start_element`] before the attributes of
each element and [`DuplicateAttributeVerifier::check_and_record`] once per
attribute.

Entries live in a pool which is rewound at every element start, so the pool
only ever grows to the largest number of attributes seen on a single
element.

## Example

```
use fiscope::DuplicateAttributeVerifier;
let mut v = DuplicateAttributeVerifier::new();
v.start_element();
assert!(v.check_and_record(3, 42).is_ok());
assert!(v.check_and_record(3, 42).is_err());
v.start_element();
assert!(v.check_and_record(3, 42).is_ok());
```
*/
pub struct DuplicateAttributeVerifier {
	sizing: HashSizing,
	map: Vec<Option<u32>>,
	pool: Vec<Entry>,
	pool_current: usize,
	current_iteration: u32,
}

impl DuplicateAttributeVerifier {
	pub fn new() -> DuplicateAttributeVerifier {
		let sizing = HashSizing::new(MAP_SIZE, DEFAULT_LOAD_FACTOR);
		DuplicateAttributeVerifier {
			map: vec![None; sizing.capacity()],
			sizing,
			pool: Vec::new(),
			pool_current: 0,
			current_iteration: 0,
		}
	}

	/// The iteration entries are currently stamped with.
	pub fn current_iteration(&self) -> u32 {
		self.current_iteration
	}

	/// Begin checking the attributes of a new element.
	///
	/// All previously recorded attributes become invisible.
	pub fn start_element(&mut self) {
		self.reset();
	}

	fn head(&self, bucket: usize) -> Option<u32> {
		let head = self.map[bucket]?;
		let entry = &self.pool[head as usize];
		if entry.iteration == self.current_iteration && entry.bucket as usize == bucket {
			Some(head)
		} else {
			None
		}
	}

	/// Record `value` in the bucket selected by `hash`.
	///
	/// Fails with [`WFError::DuplicateAttribute`] if `value` was already
	/// recorded for the current element. The verifier is [`reset`] in that
	/// case: nothing recorded so far stays visible and the element should be
	/// abandoned.
	///
	///   [`reset`]: Self::reset
	pub fn check_and_record(&mut self, hash: u32, value: u64) -> Result<()> {
		let bucket = self.sizing.index(hash);
		let head = self.head(bucket);
		let mut cursor = head;
		while let Some(i) = cursor {
			let entry = &self.pool[i as usize];
			if entry.iteration != self.current_iteration || entry.bucket as usize != bucket {
				break;
			}
			if entry.value == value {
				trace!("duplicate attribute {:#x} in iteration {}", value, self.current_iteration);
				self.reset();
				return Err(WFError::DuplicateAttribute.into());
			}
			cursor = entry.next;
		}

		let entry = Entry {
			iteration: self.current_iteration,
			bucket: bucket as u32,
			value,
			next: head,
		};
		let slot = self.pool_current;
		if slot < self.pool.len() {
			self.pool[slot] = entry;
		} else {
			self.pool.push(entry);
		}
		self.pool_current += 1;
		self.map[bucket] = Some(slot as u32);
		Ok(())
	}

	/// Advance to a fresh iteration and rewind the pool cursor.
	///
	/// Entries are neither freed nor unlinked. Their stamps no longer match,
	/// so they are invisible and the next checks overwrite them from the front
	/// of the pool.
	pub fn reset(&mut self) {
		if self.current_iteration == u32::MAX - 1 {
			debug!("attribute iteration counter wrapped around");
			self.clear();
		}
		self.current_iteration += 1;
		self.rewind();
	}

	fn rewind(&mut self) {
		self.pool_current = 0;
	}

	/// Zero all stamps and empty every bucket.
	pub fn clear(&mut self) {
		for entry in self.pool.iter_mut() {
			entry.iteration = 0;
		}
		for bucket in self.map.iter_mut() {
			*bucket = None;
		}
		self.current_iteration = 0;
		self.rewind();
	}

	/// Number of pooled entries ever allocated.
	pub fn pool_size(&self) -> usize {
		self.pool.len()
	}
}

impl Default for DuplicateAttributeVerifier {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for DuplicateAttributeVerifier {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("DuplicateAttributeVerifier")
			.field("current_iteration", &self.current_iteration)
			.field("pool_current", &self.pool_current)
			.field("pool_size", &self.pool.len())
			.finish()
	}
}
