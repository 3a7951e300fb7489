/*!
# Namespace prefix scopes

The [`PrefixTable`] tracks, for every known namespace prefix, the stack of
namespace bindings which are currently in scope. Prefixes are interned once
and referred to by a stable *prefix index* afterwards; index
[`EMPTY_PREFIX`] is the empty (default namespace) prefix and [`XML_PREFIX`] is
the fixed `xml` prefix. Both are registered on construction.

Each prefix slot has its own stack of bindings (most recent first), so
looking up or popping a prefix costs the same no matter how many other
prefixes are in scope. Binding nodes are recycled through a pool: once the
table has seen its deepest nesting, pushing and popping no longer allocates.

## Namespace indices

Bindings carry a *namespace index* which the decoder compares against the
namespace index of qualified names. A namespace index hint `Some(k)` as
passed to [`PrefixTable::push_scope`] is stored as `k + 1`, with `Some(0)`
denoting the XML namespace ([`XML_NAMESPACE_INDEX`]). `None` declares the
prefix as unbound and is stored as [`NO_NAMESPACE`].

## Declaration ids

A prefix may only be declared once per element. Instead of clearing a set of
declared prefixes for every element, each binding is stamped with the
declaration id current at the time it was pushed. The decoder calls
[`PrefixTable::start_declarations`] once per element; a push onto a slot
whose top binding carries the current id is a redeclaration and is rejected.

## Example

```
use fiscope::PrefixTable;
let mut table = PrefixTable::new();
let p = table.intern_prefix("ns0").unwrap();
table.start_declarations();
table.push_scope_with_binding("ns0", "urn:a".into(), p, Some(7)).unwrap();
assert_eq!(table.namespace_for_prefix("ns0").map(|ns| &**ns), Some("urn:a"));
table.pop_scope(p);
assert!(table.namespace_for_prefix("ns0").is_none());
```
*/
use std::fmt;
use std::iter::FusedIterator;

use log::{debug, trace};
use smartstring::alias::String as SmartString;

use crate::error::{
	add_context, Error, NWFError, Result, ERRCTX_PREFIX_TABLE, ERRCTX_UNKNOWN,
};
use crate::hash::{hash_str, HashSizing, DEFAULT_LOAD_FACTOR};
use crate::values::{SharedValues, ValueTable, ValueTableOptions};
use crate::{RcPtr, XMLNS_PREFIX, XMLNS_XML, XML_PREFIX_STR};

mod pool;

use self::pool::{Handle, Pool};

/// Prefix index of the empty prefix.
pub const EMPTY_PREFIX: usize = 0;

/// Prefix index of the `xml` prefix.
pub const XML_PREFIX: usize = 1;

/// Namespace index of an unbound prefix.
pub const NO_NAMESPACE: usize = 0;

/// Namespace index of the XML namespace.
pub const XML_NAMESPACE_INDEX: usize = 1;

const RESERVED_SLOTS: usize = 2;

/// Shared namespace URI
pub type NamespaceName = RcPtr<str>;

/// Convert a namespace index hint into the stored namespace index.
#[inline]
pub fn namespace_index(hint: Option<usize>) -> usize {
	match hint {
		Some(i) => i + 1,
		None => NO_NAMESPACE,
	}
}

/// Configuration for a [`PrefixTable`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrefixTableOptions {
	/// Options for the table holding the interned prefix strings.
	pub values: ValueTableOptions,

	/// Initial number of buckets of the prefix map.
	pub initial_map_capacity: usize,

	/// Load factor at which the prefix map is rehashed into twice as many
	/// buckets.
	pub load_factor: f32,

	/// Number of binding and map nodes to preallocate.
	pub initial_pool_size: usize,
}

impl PrefixTableOptions {
	/// Set the [`PrefixTableOptions::values`] value.
	pub fn values(mut self, v: ValueTableOptions) -> PrefixTableOptions {
		self.values = v;
		self
	}

	/// Set the [`PrefixTableOptions::initial_map_capacity`] value.
	pub fn initial_map_capacity(mut self, v: usize) -> PrefixTableOptions {
		self.initial_map_capacity = v;
		self
	}

	/// Set the [`PrefixTableOptions::load_factor`] value.
	pub fn load_factor(mut self, v: f32) -> PrefixTableOptions {
		self.load_factor = v;
		self
	}

	/// Set the [`PrefixTableOptions::initial_pool_size`] value.
	pub fn initial_pool_size(mut self, v: usize) -> PrefixTableOptions {
		self.initial_pool_size = v;
		self
	}
}

impl Default for PrefixTableOptions {
	/// Constructs default prefix table options.
	///
	/// The defaults are implementation-defined and should not be relied upon.
	fn default() -> Self {
		Self {
			values: ValueTableOptions::default(),
			initial_map_capacity: 64,
			load_factor: DEFAULT_LOAD_FACTOR,
			initial_pool_size: 16,
		}
	}
}

struct Binding {
	namespace_index: usize,
	namespace: Option<NamespaceName>,
	declaration_id: u32,
	next: Option<Handle>,
}

struct PrefixEntry {
	prefix: SmartString,
	hash: u32,
	prefix_index: usize,
	next: Option<Handle>,
}

/**
# Stack of in-scope namespace bindings per prefix

See the [module documentation](self) for an overview.

`push_scope*` and [`PrefixTable::pop_scope`] must be called in strictly
nested order per prefix slot, exactly as element declarations open and
close. The table does not track element boundaries itself; see
[`ScopeDriver`](crate::ScopeDriver) for a wrapper which does.
*/
pub struct PrefixTable {
	opts: PrefixTableOptions,
	prefixes: ValueTable,
	in_scope: Vec<Option<Handle>>,
	current_in_scope: Vec<usize>,
	bindings: Pool<Binding>,
	entries: Pool<PrefixEntry>,
	map: Vec<Option<Handle>>,
	sizing: HashSizing,
	declaration_id: u32,
	xml_namespace: NamespaceName,
}

impl PrefixTable {
	/// Create a new prefix table with default options.
	pub fn new() -> PrefixTable {
		Self::with_options(PrefixTableOptions::default())
	}

	/// Create a new prefix table with the given options.
	pub fn with_options(opts: PrefixTableOptions) -> PrefixTable {
		let sizing = HashSizing::new(opts.initial_map_capacity, opts.load_factor);
		let mut result = PrefixTable {
			opts,
			prefixes: ValueTable::with_options(opts.values),
			in_scope: Vec::new(),
			current_in_scope: Vec::new(),
			bindings: Pool::with_capacity(opts.initial_pool_size),
			entries: Pool::with_capacity(opts.initial_pool_size),
			map: vec![None; sizing.capacity()],
			sizing,
			declaration_id: 1,
			xml_namespace: RcPtr::from(XMLNS_XML),
		};
		result.initialize();
		result
	}

	/// Create a new prefix table whose user prefixes start with those of
	/// `base`.
	pub fn with_base(base: SharedValues) -> PrefixTable {
		let mut result = Self::new();
		result.set_read_only_base(base);
		result
	}

	fn initialize(&mut self) {
		debug_assert!(self.in_scope.is_empty());
		let default_binding = self.bindings.alloc(Binding {
			namespace_index: NO_NAMESPACE,
			namespace: None,
			declaration_id: 0,
			next: None,
		});
		let xml_binding = self.bindings.alloc(Binding {
			namespace_index: XML_NAMESPACE_INDEX,
			namespace: Some(self.xml_namespace.clone()),
			declaration_id: 0,
			next: None,
		});
		self.in_scope.push(Some(default_binding));
		self.current_in_scope.push(NO_NAMESPACE);
		self.in_scope.push(Some(xml_binding));
		self.current_in_scope.push(XML_NAMESPACE_INDEX);
		self.register("", EMPTY_PREFIX);
		self.register(XML_PREFIX_STR, XML_PREFIX);

		for i in 0..self.prefixes.size() {
			let prefix_index = i + RESERVED_SLOTS;
			self.in_scope.push(None);
			self.current_in_scope.push(NO_NAMESPACE);
			let prefix: SmartString = match self.prefixes.get(i) {
				Some(v) => v.into(),
				None => continue,
			};
			if self.lookup(&prefix).is_none() {
				self.register(&prefix, prefix_index);
			}
		}
	}

	fn lookup(&self, prefix: &str) -> Option<usize> {
		let mut cursor = self.map[self.sizing.index(hash_str(prefix))];
		while let Some(h) = cursor {
			let entry = self.entries.get(h);
			if entry.prefix.as_str() == prefix {
				return Some(entry.prefix_index);
			}
			cursor = entry.next;
		}
		None
	}

	fn register(&mut self, prefix: &str, prefix_index: usize) {
		let hash = hash_str(prefix);
		let bucket = self.sizing.index(hash);
		let h = self.entries.alloc(PrefixEntry {
			prefix: prefix.into(),
			hash,
			prefix_index,
			next: self.map[bucket],
		});
		self.map[bucket] = Some(h);
		if self.sizing.needs_grow(self.entries.live()) && self.sizing.grow() {
			self.rehash();
		}
	}

	fn rehash(&mut self) {
		debug!(
			"prefix map grown to {} buckets for {} prefixes",
			self.sizing.capacity(),
			self.entries.live()
		);
		let old = std::mem::replace(&mut self.map, vec![None; self.sizing.capacity()]);
		for head in old.into_iter() {
			let mut cursor = head;
			while let Some(h) = cursor {
				let entry = self.entries.get_mut(h);
				cursor = entry.next;
				let bucket = self.sizing.index(entry.hash);
				entry.next = self.map[bucket];
				self.map[bucket] = Some(h);
			}
		}
	}

	/// Return the index of `prefix`, interning it if it is not known yet.
	///
	/// `""` and `"xml"` always map to [`EMPTY_PREFIX`] and [`XML_PREFIX`].
	/// The `xmlns` prefix can never be interned.
	pub fn intern_prefix(&mut self, prefix: &str) -> Result<usize> {
		if let Some(index) = self.lookup(prefix) {
			return Ok(index);
		}
		if prefix == XMLNS_PREFIX {
			return Err(Error::NotNamespaceWellFormed(
				NWFError::ReservedNamespacePrefix,
			));
		}
		let table_index = add_context(self.prefixes.add(prefix), ERRCTX_PREFIX_TABLE)?;
		let prefix_index = table_index + RESERVED_SLOTS;
		debug_assert_eq!(prefix_index, self.in_scope.len());
		self.in_scope.push(None);
		self.current_in_scope.push(NO_NAMESPACE);
		self.register(prefix, prefix_index);
		Ok(prefix_index)
	}

	/// Return the index of `prefix` without interning it.
	pub fn prefix_index(&self, prefix: &str) -> Option<usize> {
		self.lookup(prefix)
	}

	/// Return the text of the prefix at `prefix_index`.
	pub fn prefix(&self, prefix_index: usize) -> Option<&str> {
		match prefix_index {
			EMPTY_PREFIX => Some(""),
			XML_PREFIX => Some(XML_PREFIX_STR),
			other => self.prefixes.get(other - RESERVED_SLOTS),
		}
	}

	/// Number of known prefixes, including the two reserved ones.
	pub fn len(&self) -> usize {
		self.in_scope.len()
	}

	/// The current declaration id.
	pub fn declaration_id(&self) -> u32 {
		self.declaration_id
	}

	/// Begin the namespace declarations of a new element.
	///
	/// Bindings pushed before this call may be shadowed again afterwards.
	pub fn start_declarations(&mut self) {
		self.declaration_id += 1;
		if self.declaration_id == u32::MAX {
			debug!("declaration id wrapped around");
			self.clear_declaration_ids();
		}
	}

	/// Treat all existing bindings as declared in an earlier context.
	pub fn clear_declaration_ids(&mut self) {
		for binding in self.bindings.iter_mut() {
			binding.declaration_id = 0;
		}
		self.declaration_id = 1;
	}

	fn push_binding(
		&mut self,
		prefix_index: usize,
		namespace_hint: Option<usize>,
		namespace: Option<NamespaceName>,
	) -> Result<usize> {
		let top = match self.in_scope.get(prefix_index) {
			Some(top) => *top,
			None => {
				return Err(Error::NotNamespaceWellFormed(
					NWFError::UndeclaredNamespacePrefix(ERRCTX_UNKNOWN),
				))
			}
		};
		let namespace_index = namespace_index(namespace_hint);
		if prefix_index == XML_PREFIX && namespace_index != XML_NAMESPACE_INDEX {
			return Err(Error::NotNamespaceWellFormed(
				NWFError::ReservedNamespacePrefix,
			));
		}
		if let Some(h) = top {
			if self.bindings.get(h).declaration_id >= self.declaration_id {
				trace!(
					"rejecting second declaration of prefix {} in declaration {}",
					prefix_index,
					self.declaration_id
				);
				return Err(Error::NotNamespaceWellFormed(
					NWFError::DuplicateNamespaceDeclaration,
				));
			}
		}
		let h = self.bindings.alloc(Binding {
			namespace_index,
			namespace,
			declaration_id: self.declaration_id,
			next: top,
		});
		self.in_scope[prefix_index] = Some(h);
		self.current_in_scope[prefix_index] = namespace_index;
		Ok(namespace_index)
	}

	/// Push a binding for `prefix_index` and return its namespace index.
	///
	/// Fails with [`NWFError::DuplicateNamespaceDeclaration`] if the prefix
	/// was already declared since the last
	/// [`PrefixTable::start_declarations`]; the table is unchanged in that
	/// case.
	pub fn push_scope(
		&mut self,
		prefix_index: usize,
		namespace_hint: Option<usize>,
	) -> Result<usize> {
		self.push_binding(prefix_index, namespace_hint, None)
	}

	/// Push a binding like [`PrefixTable::push_scope`] and record the
	/// namespace name, so that it can be resolved by
	/// [`PrefixTable::namespace_for_prefix`] and
	/// [`PrefixTable::prefix_for_namespace`].
	///
	/// An empty `namespace` records an undeclaration. `prefix` must be the
	/// text interned at `prefix_index`, otherwise
	/// [`NWFError::UndeclaredNamespacePrefix`] is returned and the table is
	/// unchanged.
	pub fn push_scope_with_binding(
		&mut self,
		prefix: &str,
		namespace: NamespaceName,
		prefix_index: usize,
		namespace_hint: Option<usize>,
	) -> Result<usize> {
		if self.lookup(prefix) != Some(prefix_index) {
			trace!("prefix {:?} is not interned at index {}", prefix, prefix_index);
			return Err(Error::NotNamespaceWellFormed(
				NWFError::UndeclaredNamespacePrefix(ERRCTX_PREFIX_TABLE),
			));
		}
		self.push_binding(prefix_index, namespace_hint, Some(namespace))
	}

	/// Pop the innermost binding of `prefix_index`.
	///
	/// Must be paired with a preceding push for the same prefix. The
	/// bindings present on construction can not be popped.
	pub fn pop_scope(&mut self, prefix_index: usize) {
		let h = match self.in_scope.get(prefix_index) {
			Some(Some(h)) => *h,
			_ => return,
		};
		let binding = self.bindings.get_mut(h);
		let next = binding.next;
		if next.is_none() && prefix_index < RESERVED_SLOTS {
			return;
		}
		binding.namespace = None;
		self.in_scope[prefix_index] = next;
		self.current_in_scope[prefix_index] = match next {
			Some(n) => self.bindings.get(n).namespace_index,
			None => NO_NAMESPACE,
		};
		self.bindings.release(h);
	}

	/// Namespace index currently bound to `prefix_index`, or
	/// [`NO_NAMESPACE`].
	#[inline]
	pub fn current_namespace_index(&self, prefix_index: usize) -> usize {
		self.current_in_scope
			.get(prefix_index)
			.copied()
			.unwrap_or(NO_NAMESPACE)
	}

	/// Return true if `prefix_index` is currently bound to
	/// `namespace_index`.
	#[inline]
	pub fn is_in_scope(&self, prefix_index: usize, namespace_index: usize) -> bool {
		self.current_in_scope.get(prefix_index) == Some(&namespace_index)
	}

	/// Fail with [`NWFError::UndeclaredNamespacePrefix`] unless
	/// `prefix_index` is currently bound to `namespace_index`.
	pub fn check_in_scope(&self, prefix_index: usize, namespace_index: usize) -> Result<()> {
		if self.is_in_scope(prefix_index, namespace_index) {
			Ok(())
		} else {
			Err(Error::NotNamespaceWellFormed(
				NWFError::UndeclaredNamespacePrefix(ERRCTX_UNKNOWN),
			))
		}
	}

	fn namespace_at(&self, prefix_index: usize) -> Option<&NamespaceName> {
		let binding = self.bindings.get((*self.in_scope.get(prefix_index)?)?);
		if binding.namespace_index == NO_NAMESPACE {
			return None;
		}
		binding.namespace.as_ref().filter(|ns| ns.len() > 0)
	}

	/// Resolve `prefix` to the namespace name currently bound to it.
	///
	/// Returns `None` if the prefix is unknown, unbound, or bound without a
	/// recorded namespace name.
	pub fn namespace_for_prefix(&self, prefix: &str) -> Option<&NamespaceName> {
		self.namespace_at(self.lookup(prefix)?)
	}

	/// Return a prefix currently bound to `namespace`.
	///
	/// If several prefixes are bound to it, the one with the lowest prefix
	/// index wins.
	pub fn prefix_for_namespace(&self, namespace: &str) -> Option<&str> {
		(0..self.in_scope.len())
			.find(|i| self.is_bound_to(*i, namespace))
			.and_then(|i| self.prefix(i))
	}

	fn is_bound_to(&self, prefix_index: usize, namespace: &str) -> bool {
		match self.namespace_at(prefix_index) {
			Some(ns) => &**ns == namespace,
			None => false,
		}
	}

	/// Iterate over all prefixes currently bound to `namespace`, in prefix
	/// index order.
	pub fn prefixes_for_namespace<'a, 'b>(
		&'a self,
		namespace: &'b str,
	) -> impl Iterator<Item = &'a str> + 'b
	where
		'a: 'b,
	{
		(0..self.in_scope.len())
			.filter(move |i| self.is_bound_to(*i, namespace))
			.filter_map(move |i| self.prefix(i))
	}

	/// Iterate over all currently bound prefixes, in prefix index order.
	pub fn prefixes(&self) -> Prefixes<'_> {
		Prefixes {
			table: self,
			next: 0,
		}
	}

	/// Freeze the interned user prefixes (excluding `""` and `xml`) for use
	/// as the base of other prefix tables.
	pub fn vocabulary(&self) -> SharedValues {
		self.prefixes.freeze()
	}

	/// Replace all state by a fresh table whose user prefixes start with
	/// those in `base`.
	pub fn set_read_only_base(&mut self, base: SharedValues) {
		self.reset_state();
		debug!("prefix table based on {} prefixes", base.len());
		self.prefixes.set_read_only_base(base, true);
		self.initialize();
	}

	fn reset_state(&mut self) {
		self.bindings.clear();
		self.entries.clear();
		self.in_scope.clear();
		self.current_in_scope.clear();
		for bucket in self.map.iter_mut() {
			*bucket = None;
		}
		self.declaration_id = 1;
	}

	/// Forget all local prefixes; prefixes of the read-only base are kept.
	///
	/// Bindings of the base prefixes and of the reserved prefixes are not
	/// touched.
	pub fn clear(&mut self) {
		let keep = RESERVED_SLOTS + self.prefixes.read_only_base_size();
		for slot in keep..self.in_scope.len() {
			let mut cursor = self.in_scope[slot];
			while let Some(h) = cursor {
				let binding = self.bindings.get_mut(h);
				cursor = binding.next;
				binding.namespace = None;
				self.bindings.release(h);
			}
		}
		self.in_scope.truncate(keep);
		self.current_in_scope.truncate(keep);
		self.prefixes.clear();

		self.entries.clear();
		for bucket in self.map.iter_mut() {
			*bucket = None;
		}
		self.register("", EMPTY_PREFIX);
		self.register(XML_PREFIX_STR, XML_PREFIX);
		for i in 0..self.prefixes.size() {
			let prefix: SmartString = match self.prefixes.get(i) {
				Some(v) => v.into(),
				None => continue,
			};
			if self.lookup(&prefix).is_none() {
				self.register(&prefix, i + RESERVED_SLOTS);
			}
		}
	}

	/// Reset the table to its freshly constructed state, dropping the
	/// read-only base.
	pub fn clear_completely(&mut self) {
		debug!("clearing prefix table completely");
		self.reset_state();
		self.prefixes.clear_completely();
		self.sizing = HashSizing::new(self.opts.initial_map_capacity, self.opts.load_factor);
		self.map = vec![None; self.sizing.capacity()];
		self.initialize();
	}

	/// Access the options of this table.
	pub fn options(&self) -> &PrefixTableOptions {
		&self.opts
	}
}

impl Default for PrefixTable {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for PrefixTable {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("PrefixTable")
			.field("prefixes", &self.len())
			.field("bindings", &self.bindings.live())
			.field("allocated_bindings", &self.bindings.allocated())
			.field("map_capacity", &self.sizing.capacity())
			.field("declaration_id", &self.declaration_id)
			.finish()
	}
}

/// Iterator over the currently bound prefixes of a [`PrefixTable`].
///
/// Created by [`PrefixTable::prefixes`]. Each call creates a fresh iterator
/// which reflects the live state of the table.
pub struct Prefixes<'a> {
	table: &'a PrefixTable,
	next: usize,
}

impl<'a> Iterator for Prefixes<'a> {
	type Item = &'a str;

	fn next(&mut self) -> Option<Self::Item> {
		while self.next < self.table.len() {
			let i = self.next;
			self.next += 1;
			if self.table.current_namespace_index(i) != NO_NAMESPACE {
				if let Some(prefix) = self.table.prefix(i) {
					return Some(prefix);
				}
			}
		}
		None
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		(0, Some(self.table.len().saturating_sub(self.next)))
	}
}

impl<'a> FusedIterator for Prefixes<'a> {}

#[cfg(test)]
mod tests {
	use super::*;

	use proptest::prelude::*;

	fn ns(s: &str) -> NamespaceName {
		RcPtr::from(s)
	}

	fn resolved<'a>(t: &'a PrefixTable, prefix: &str) -> Option<&'a str> {
		t.namespace_for_prefix(prefix).map(|ns| &**ns)
	}

	#[test]
	fn reserved_prefixes_are_registered() {
		let mut t = PrefixTable::new();
		assert_eq!(t.len(), 2);
		assert_eq!(t.intern_prefix("").unwrap(), EMPTY_PREFIX);
		assert_eq!(t.intern_prefix("xml").unwrap(), XML_PREFIX);
		assert_eq!(t.prefix(EMPTY_PREFIX), Some(""));
		assert_eq!(t.prefix(XML_PREFIX), Some("xml"));
		assert_eq!(t.current_namespace_index(EMPTY_PREFIX), NO_NAMESPACE);
		assert_eq!(t.current_namespace_index(XML_PREFIX), XML_NAMESPACE_INDEX);
		assert_eq!(resolved(&t, "xml"), Some(XMLNS_XML));
		assert_eq!(resolved(&t, ""), None);
	}

	#[test]
	fn intern_prefix_returns_stable_indices() {
		let mut t = PrefixTable::new();
		assert_eq!(t.intern_prefix("ns0").unwrap(), 2);
		assert_eq!(t.intern_prefix("ns1").unwrap(), 3);
		assert_eq!(t.intern_prefix("ns0").unwrap(), 2);
		assert_eq!(t.len(), 4);
		assert_eq!(t.prefix(3), Some("ns1"));
		assert_eq!(t.prefix_index("ns1"), Some(3));
		assert_eq!(t.prefix_index("ns2"), None);
		assert_eq!(t.prefix(4), None);
	}

	#[test]
	fn xmlns_cannot_be_interned() {
		let mut t = PrefixTable::new();
		match t.intern_prefix("xmlns") {
			Err(Error::NotNamespaceWellFormed(NWFError::ReservedNamespacePrefix)) => (),
			other => panic!("unexpected result: {:?}", other),
		}
		assert_eq!(t.len(), 2);
	}

	#[test]
	fn push_shadows_and_pop_restores() {
		let mut t = PrefixTable::new();
		let p = t.intern_prefix("a").unwrap();
		t.start_declarations();
		assert_eq!(t.push_scope_with_binding("a", ns("urn:outer"), p, Some(1)).unwrap(), 2);
		assert_eq!(resolved(&t, "a"), Some("urn:outer"));
		t.start_declarations();
		assert_eq!(t.push_scope_with_binding("a", ns("urn:inner"), p, Some(2)).unwrap(), 3);
		assert_eq!(resolved(&t, "a"), Some("urn:inner"));
		assert_eq!(t.current_namespace_index(p), 3);
		t.pop_scope(p);
		assert_eq!(resolved(&t, "a"), Some("urn:outer"));
		assert_eq!(t.current_namespace_index(p), 2);
		t.pop_scope(p);
		assert_eq!(resolved(&t, "a"), None);
		assert_eq!(t.current_namespace_index(p), NO_NAMESPACE);
	}

	#[test]
	fn redeclaration_on_same_element_is_rejected() {
		let mut t = PrefixTable::new();
		let p = t.intern_prefix("ns0").unwrap();
		assert_eq!(p, 2);
		t.start_declarations();
		t.push_scope_with_binding("ns0", ns("urn:a"), p, Some(1)).unwrap();
		let live = t.bindings.live();
		match t.push_scope_with_binding("ns0", ns("urn:b"), p, Some(2)) {
			Err(Error::NotNamespaceWellFormed(NWFError::DuplicateNamespaceDeclaration)) => (),
			other => panic!("unexpected result: {:?}", other),
		}
		assert_eq!(t.bindings.live(), live);
		assert_eq!(resolved(&t, "ns0"), Some("urn:a"));
	}

	#[test]
	fn rejected_push_keeps_stack_order() {
		let mut t = PrefixTable::new();
		let p = t.intern_prefix("ns0").unwrap();
		t.start_declarations();
		t.push_scope_with_binding("ns0", ns("urn:a"), p, Some(1)).unwrap();
		t.start_declarations();
		t.push_scope_with_binding("ns0", ns("urn:b"), p, Some(2)).unwrap();
		assert!(t.push_scope_with_binding("ns0", ns("urn:c"), p, Some(3)).is_err());
		t.pop_scope(p);
		assert_eq!(resolved(&t, "ns0"), Some("urn:a"));
	}

	#[test]
	fn plain_push_tracks_indices_only() {
		let mut t = PrefixTable::new();
		let p = t.intern_prefix("p").unwrap();
		t.start_declarations();
		assert_eq!(t.push_scope(p, Some(4)).unwrap(), 5);
		assert!(t.is_in_scope(p, 5));
		assert!(!t.is_in_scope(p, 4));
		assert_eq!(resolved(&t, "p"), None);
		assert_eq!(t.prefixes().collect::<Vec<_>>(), vec!["xml", "p"]);
	}

	#[test]
	fn undeclaration_unbinds_prefix() {
		let mut t = PrefixTable::new();
		let p = t.intern_prefix("p").unwrap();
		t.start_declarations();
		t.push_scope_with_binding("p", ns("urn:p"), p, Some(0)).unwrap();
		t.start_declarations();
		assert_eq!(t.push_scope_with_binding("p", ns(""), p, None).unwrap(), NO_NAMESPACE);
		assert_eq!(resolved(&t, "p"), None);
		assert!(t.prefixes().all(|x| x != "p"));
		t.pop_scope(p);
		assert_eq!(resolved(&t, "p"), Some("urn:p"));
	}

	#[test]
	fn default_namespace_can_be_declared() {
		let mut t = PrefixTable::new();
		t.start_declarations();
		t.push_scope_with_binding("", ns("urn:default"), EMPTY_PREFIX, Some(3)).unwrap();
		assert_eq!(resolved(&t, ""), Some("urn:default"));
		assert_eq!(t.prefix_for_namespace("urn:default"), Some(""));
		t.pop_scope(EMPTY_PREFIX);
		assert_eq!(resolved(&t, ""), None);
		// the construction-time binding stays
		t.pop_scope(EMPTY_PREFIX);
		assert_eq!(t.current_namespace_index(EMPTY_PREFIX), NO_NAMESPACE);
		t.start_declarations();
		t.push_scope(EMPTY_PREFIX, Some(3)).unwrap();
	}

	#[test]
	fn xml_prefix_can_only_be_bound_to_xml_namespace() {
		let mut t = PrefixTable::new();
		t.start_declarations();
		match t.push_scope(XML_PREFIX, Some(5)) {
			Err(Error::NotNamespaceWellFormed(NWFError::ReservedNamespacePrefix)) => (),
			other => panic!("unexpected result: {:?}", other),
		}
		assert_eq!(
			t.push_scope_with_binding("xml", ns(XMLNS_XML), XML_PREFIX, Some(0))
				.unwrap(),
			XML_NAMESPACE_INDEX
		);
		t.pop_scope(XML_PREFIX);
		t.pop_scope(XML_PREFIX);
		assert_eq!(resolved(&t, "xml"), Some(XMLNS_XML));
	}

	#[test]
	fn unknown_prefix_index_is_rejected() {
		let mut t = PrefixTable::new();
		match t.push_scope(17, Some(1)) {
			Err(Error::NotNamespaceWellFormed(NWFError::UndeclaredNamespacePrefix(_))) => (),
			other => panic!("unexpected result: {:?}", other),
		}
		// popping an unknown slot is ignored
		t.pop_scope(17);
	}

	#[test]
	fn mismatched_prefix_text_is_rejected() {
		let mut t = PrefixTable::new();
		let a = t.intern_prefix("a").unwrap();
		let b = t.intern_prefix("b").unwrap();
		let live = t.bindings.live();
		match t.push_scope_with_binding("a", RcPtr::from("urn:a"), b, Some(1)) {
			Err(Error::NotNamespaceWellFormed(NWFError::UndeclaredNamespacePrefix(_))) => (),
			other => panic!("unexpected result: {:?}", other),
		}
		assert!(t.push_scope_with_binding("zzz", RcPtr::from("urn:a"), a, Some(1)).is_err());
		assert_eq!(t.bindings.live(), live);
		assert!(t.prefix_index("zzz").is_none());
		assert!(t.namespace_for_prefix("a").is_none());
		assert!(t.namespace_for_prefix("b").is_none());
		assert!(t.prefix_for_namespace("urn:a").is_none());
	}

	#[test]
	fn clear_declaration_ids_allows_redeclaration() {
		let mut t = PrefixTable::new();
		let p = t.intern_prefix("p").unwrap();
		t.push_scope(p, Some(1)).unwrap();
		assert!(t.push_scope(p, Some(2)).is_err());
		t.clear_declaration_ids();
		assert_eq!(t.declaration_id(), 1);
		assert_eq!(t.push_scope(p, Some(2)).unwrap(), 3);
	}

	#[test]
	fn declaration_id_wraps_around() {
		let mut t = PrefixTable::new();
		let p = t.intern_prefix("p").unwrap();
		t.declaration_id = u32::MAX - 1;
		t.push_scope(p, Some(1)).unwrap();
		t.start_declarations();
		assert_eq!(t.declaration_id(), 1);
		assert_eq!(t.push_scope(p, Some(2)).unwrap(), 3);
		assert!(t.push_scope(p, Some(3)).is_err());
	}

	#[test]
	fn check_in_scope_reports_undeclared_prefix() {
		let mut t = PrefixTable::new();
		let p = t.intern_prefix("p").unwrap();
		assert!(t.check_in_scope(XML_PREFIX, XML_NAMESPACE_INDEX).is_ok());
		match t.check_in_scope(p, 2) {
			Err(Error::NotNamespaceWellFormed(NWFError::UndeclaredNamespacePrefix(_))) => (),
			other => panic!("unexpected result: {:?}", other),
		}
		t.push_scope(p, Some(1)).unwrap();
		assert!(t.check_in_scope(p, 2).is_ok());
	}

	#[test]
	fn reverse_lookup_uses_slot_order() {
		let mut t = PrefixTable::new();
		let a = t.intern_prefix("a").unwrap();
		let b = t.intern_prefix("b").unwrap();
		t.start_declarations();
		t.push_scope_with_binding("b", ns("urn:x"), b, Some(1)).unwrap();
		t.push_scope_with_binding("a", ns("urn:x"), a, Some(1)).unwrap();
		assert_eq!(t.prefix_for_namespace("urn:x"), Some("a"));
		assert_eq!(t.prefixes_for_namespace("urn:x").collect::<Vec<_>>(), vec!["a", "b"]);
		assert_eq!(t.prefix_for_namespace(XMLNS_XML), Some("xml"));
		assert_eq!(t.prefix_for_namespace("urn:y"), None);
		assert_eq!(t.prefixes().collect::<Vec<_>>(), vec!["xml", "a", "b"]);
		// restartable
		assert_eq!(t.prefixes().count(), 3);
	}

	#[test]
	fn balanced_cycles_do_not_grow_the_pool() {
		let mut t = PrefixTable::new();
		let p = t.intern_prefix("p").unwrap();
		for _ in 0..4 {
			t.start_declarations();
			t.push_scope(p, Some(1)).unwrap();
		}
		for _ in 0..4 {
			t.pop_scope(p);
		}
		let allocated = t.bindings.allocated();
		for _ in 0..100 {
			for _ in 0..4 {
				t.start_declarations();
				t.push_scope(p, Some(1)).unwrap();
			}
			for _ in 0..4 {
				t.pop_scope(p);
			}
		}
		assert_eq!(t.bindings.allocated(), allocated);
	}

	#[test]
	fn prefix_map_grows() {
		let mut t =
			PrefixTable::with_options(PrefixTableOptions::default().initial_map_capacity(4));
		for i in 0..300 {
			assert_eq!(t.intern_prefix(&format!("p{}", i)).unwrap(), i + 2);
		}
		assert!(t.sizing.capacity() >= 256);
		for i in 0..300 {
			assert_eq!(t.prefix_index(&format!("p{}", i)), Some(i + 2));
		}
		assert_eq!(t.prefix_index(""), Some(EMPTY_PREFIX));
		assert_eq!(t.prefix_index("xml"), Some(XML_PREFIX));
	}

	#[test]
	fn prefix_capacity_is_enforced() {
		let mut t = PrefixTable::with_options(
			PrefixTableOptions::default().values(ValueTableOptions::default().maximum_capacity(1)),
		);
		t.intern_prefix("a").unwrap();
		assert_eq!(
			t.intern_prefix("b").err().unwrap(),
			Error::CapacityExceeded(ERRCTX_PREFIX_TABLE)
		);
		assert_eq!(t.len(), 3);
	}

	#[test]
	fn base_prefixes_survive_clear() {
		let mut v = PrefixTable::new();
		v.intern_prefix("soap").unwrap();
		v.intern_prefix("wsa").unwrap();
		let vocabulary = v.vocabulary();

		let mut t = PrefixTable::with_base(vocabulary.clone());
		assert_eq!(t.prefix_index("soap"), Some(2));
		assert_eq!(t.prefix_index("wsa"), Some(3));
		assert_eq!(t.intern_prefix("local").unwrap(), 4);
		t.start_declarations();
		t.push_scope_with_binding("local", ns("urn:l"), 4, Some(1)).unwrap();
		t.push_scope_with_binding("soap", ns("urn:s"), 2, Some(2)).unwrap();

		t.clear();
		assert_eq!(t.len(), 4);
		assert_eq!(t.prefix_index("local"), None);
		assert_eq!(t.prefix_index("soap"), Some(2));
		assert_eq!(resolved(&t, "soap"), Some("urn:s"));
		assert_eq!(t.intern_prefix("other").unwrap(), 4);
		assert_eq!(vocabulary.len(), 2);

		t.clear_completely();
		assert_eq!(t.len(), 2);
		assert_eq!(t.prefix_index("soap"), None);
		assert_eq!(resolved(&t, "xml"), Some(XMLNS_XML));
	}

	#[test]
	fn concrete_scenario() {
		let mut t = PrefixTable::new();
		assert_eq!(t.intern_prefix("").unwrap(), 0);
		assert_eq!(t.intern_prefix("xml").unwrap(), 1);
		assert_eq!(t.intern_prefix("ns0").unwrap(), 2);
		t.start_declarations();
		t.push_scope_with_binding("ns0", ns("urn:ns_a"), 2, Some(1)).unwrap();
		t.start_declarations();
		t.push_scope_with_binding("ns0", ns("urn:ns_b"), 2, Some(2)).unwrap();
		assert!(t.push_scope_with_binding("ns0", ns("urn:ns_b"), 2, Some(2)).is_err());
		t.pop_scope(2);
		assert_eq!(resolved(&t, "ns0"), Some("urn:ns_a"));
	}

	#[derive(Debug, Clone)]
	enum Op {
		Push(usize, usize),
		Pop(usize),
	}

	fn op() -> impl Strategy<Value = Op> {
		prop_oneof![
			(0usize..4, 0usize..8).prop_map(|(p, n)| Op::Push(p, n)),
			(0usize..4).prop_map(Op::Pop),
		]
	}

	proptest! {
		#[test]
		fn scopes_behave_like_stacks(ops in prop::collection::vec(op(), 0..200)) {
			let mut t = PrefixTable::new();
			let names = ["a", "b", "c", "d"];
			let slots: Vec<usize> = names.iter().map(|n| t.intern_prefix(n).unwrap()).collect();
			let mut model: Vec<Vec<usize>> = vec![Vec::new(); names.len()];
			for op in ops {
				match op {
					Op::Push(p, n) => {
						t.start_declarations();
						let uri = format!("urn:{}", n);
						t.push_scope_with_binding(
							names[p],
							RcPtr::from(uri.as_str()),
							slots[p],
							Some(n),
						)
						.unwrap();
						model[p].push(n);
					}
					Op::Pop(p) => {
						if model[p].pop().is_some() {
							t.pop_scope(slots[p]);
						}
					}
				}
				for p in 0..names.len() {
					let expected = model[p].last().map(|n| format!("urn:{}", n));
					prop_assert_eq!(resolved(&t, names[p]).map(|s| s.to_string()), expected);
					prop_assert_eq!(
						t.current_namespace_index(slots[p]),
						model[p].last().map(|n| n + 1).unwrap_or(NO_NAMESPACE)
					);
				}
			}
			for p in 0..names.len() {
				while model[p].pop().is_some() {
					t.pop_scope(slots[p]);
				}
				prop_assert_eq!(resolved(&t, names[p]), None);
			}
			prop_assert_eq!(t.bindings.live(), 2);
		}
	}
}
