/*!
# Recycling node arena

Nodes are addressed by [`Handle`]s. Released handles go onto a free list and
are handed out again before the arena grows, so a balanced push/pop workload
stops allocating once the arena has reached its high-water mark.

A node belongs either to the free list or to exactly one live structure:
structures store handles, never references, and a handle is only reachable
from the free list after [`Pool::release`].
*/

/// Index of a node in a [`Pool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Handle(usize);

impl Handle {
	#[inline]
	fn index(self) -> usize {
		self.0
	}
}

pub(crate) struct Pool<T> {
	nodes: Vec<T>,
	free: Vec<Handle>,
}

impl<T> Pool<T> {
	pub(crate) fn with_capacity(capacity: usize) -> Pool<T> {
		Pool {
			nodes: Vec::with_capacity(capacity),
			free: Vec::with_capacity(capacity),
		}
	}

	/// Store `node`, reusing a released slot if one is available.
	pub(crate) fn alloc(&mut self, node: T) -> Handle {
		match self.free.pop() {
			Some(h) => {
				self.nodes[h.index()] = node;
				h
			}
			None => {
				let h = Handle(self.nodes.len());
				self.nodes.push(node);
				h
			}
		}
	}

	/// Return the slot of `h` to the free list.
	///
	/// The node stays in place until the slot is reused; callers must drop
	/// every copy of `h` they hold.
	pub(crate) fn release(&mut self, h: Handle) {
		debug_assert!(h.index() < self.nodes.len());
		debug_assert!(!self.free.contains(&h), "handle released twice");
		self.free.push(h);
	}

	#[inline]
	pub(crate) fn get(&self, h: Handle) -> &T {
		&self.nodes[h.index()]
	}

	#[inline]
	pub(crate) fn get_mut(&mut self, h: Handle) -> &mut T {
		&mut self.nodes[h.index()]
	}

	/// Number of nodes currently handed out.
	pub(crate) fn live(&self) -> usize {
		self.nodes.len() - self.free.len()
	}

	/// Number of slots ever allocated.
	pub(crate) fn allocated(&self) -> usize {
		self.nodes.len()
	}

	/// Iterate over all slots, live or free.
	pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
		self.nodes.iter_mut()
	}

	/// Forget all nodes. Outstanding handles become invalid.
	pub(crate) fn clear(&mut self) {
		self.nodes.clear();
		self.free.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn released_slots_are_reused() {
		let mut p = Pool::with_capacity(2);
		let a = p.alloc(1);
		let b = p.alloc(2);
		assert_ne!(a, b);
		assert_eq!(p.live(), 2);
		p.release(a);
		assert_eq!(p.live(), 1);
		let c = p.alloc(3);
		assert_eq!(c, a);
		assert_eq!(*p.get(c), 3);
		assert_eq!(*p.get(b), 2);
		assert_eq!(p.allocated(), 2);
	}

	#[test]
	fn get_mut_updates_node() {
		let mut p = Pool::with_capacity(1);
		let a = p.alloc(String::from("a"));
		p.get_mut(a).push('b');
		assert_eq!(p.get(a), "ab");
	}

	#[test]
	fn handles_are_slot_indices() {
		let mut p = Pool::with_capacity(0);
		let handles: Vec<_> = (0..300).map(|i| p.alloc(i)).collect();
		for (i, h) in handles.iter().enumerate() {
			assert_eq!(*h, Handle(i));
			assert_eq!(*p.get(*h), i);
		}
	}

	#[test]
	fn clear_forgets_everything() {
		let mut p = Pool::with_capacity(1);
		p.alloc(1);
		let b = p.alloc(2);
		p.release(b);
		p.clear();
		assert_eq!(p.live(), 0);
		assert_eq!(p.allocated(), 0);
		assert_eq!(p.alloc(5), Handle(0));
	}

	#[test]
	#[should_panic]
	#[cfg(debug_assertions)]
	fn double_release_is_caught_in_debug_builds() {
		let mut p = Pool::with_capacity(1);
		let a = p.alloc(1);
		p.release(a);
		p.release(a);
	}
}
