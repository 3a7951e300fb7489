/*!
# Cross-table string sharing

[`ValueTable::materialize`](crate::ValueTable::materialize) hands out shared
pointers to table entries. When a [`Context`] is attached, equal entries of
all tables using that context resolve to a single allocation, so namespace
names and element names shared by many documents are only kept once.
*/
use std::fmt;

#[cfg(all(feature = "shared_ns", not(feature = "mt")))]
use std::cell::{RefCell, RefMut};
#[cfg(all(feature = "shared_ns", not(feature = "mt")))]
use std::rc::Weak;
#[cfg(all(feature = "shared_ns", feature = "mt"))]
use std::sync::{Mutex, MutexGuard, Weak};

use crate::RcPtr;

#[cfg(feature = "shared_ns")]
type Interned = weak_table::WeakHashSet<Weak<str>>;

#[cfg(all(feature = "shared_ns", feature = "mt"))]
type Guarded = Mutex<Interned>;
#[cfg(all(feature = "shared_ns", not(feature = "mt")))]
type Guarded = RefCell<Interned>;

/**
# Interning pool shared between tables

Only strings which are still referenced somewhere are kept alive; the pool
holds weak references and forgets entries once their last user drops them.

Without the `shared_ns` feature the context keeps no state and
[`Context::intern`] allocates on every call. With `mt`, the context is
`Send + Sync` and may be shared between decoders on different threads.
*/
pub struct Context {
	#[cfg(feature = "shared_ns")]
	interned: Guarded,
}

impl Context {
	/// Create an empty context
	pub fn new() -> Context {
		Context {
			#[cfg(all(feature = "shared_ns", feature = "mt"))]
			interned: Mutex::new(Interned::new()),
			#[cfg(all(feature = "shared_ns", not(feature = "mt")))]
			interned: RefCell::new(Interned::new()),
		}
	}

	#[cfg(all(feature = "shared_ns", feature = "mt"))]
	fn pool<'a>(&'a self) -> MutexGuard<'a, Interned> {
		// a poisoned pool still only holds weak pointers to immutable strings
		match self.interned.lock() {
			Ok(guard) => guard,
			Err(poisoned) => poisoned.into_inner(),
		}
	}

	#[cfg(all(feature = "shared_ns", not(feature = "mt")))]
	fn pool<'a>(&'a self) -> RefMut<'a, Interned> {
		self.interned.borrow_mut()
	}

	/// Return a shared pointer to `s`, reusing a live pointer with equal
	/// text if there is one.
	pub fn intern(&self, s: &str) -> RcPtr<str> {
		#[cfg(feature = "shared_ns")]
		{
			let mut pool = self.pool();
			if let Some(ptr) = pool.get(s) {
				return ptr;
			}
			let ptr: RcPtr<str> = RcPtr::from(s);
			pool.insert(ptr.clone());
			ptr
		}
		#[cfg(not(feature = "shared_ns"))]
		RcPtr::from(s)
	}

	/// Return true if a live pointer with text `s` is pooled.
	///
	/// Always false without `shared_ns`.
	pub fn contains(&self, s: &str) -> bool {
		#[cfg(feature = "shared_ns")]
		return self.pool().contains(s);
		#[cfg(not(feature = "shared_ns"))]
		{
			let _ = s;
			false
		}
	}

	/// Drop expired entries and shrink the pool.
	pub fn release_temporaries(&self) {
		#[cfg(feature = "shared_ns")]
		{
			let mut pool = self.pool();
			pool.remove_expired();
			pool.shrink_to_fit();
		}
	}

	/// Number of pooled strings, including expired ones not yet released.
	///
	/// Always zero without `shared_ns`.
	pub fn strings(&self) -> usize {
		#[cfg(feature = "shared_ns")]
		return self.pool().len();
		#[cfg(not(feature = "shared_ns"))]
		0
	}
}

impl Default for Context {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for Context {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("Context")
			.field("strings", &self.strings())
			.finish()
	}
}
