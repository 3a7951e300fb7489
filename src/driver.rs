/*!
Element-level bookkeeping on top of the individual tables.

The [`ScopeDriver`] is what a decoder talks to while it walks a document: it
opens and closes element frames, declares namespace prefixes, and checks
attributes. It keeps the prefix bindings of each open element on a stack so
that closing an element undoes exactly the declarations made on it.
*/
use std::collections::HashMap;

use smartstring::alias::String as SmartString;

use crate::attributes::{attribute_hash, attribute_id, DuplicateAttributeVerifier};
use crate::context::Context;
use crate::error::{
	add_context, Error, NWFError, Result, ERRCTX_ATTNAME, ERRCTX_ELEMENT,
	ERRCTX_NAMESPACE_TABLE,
};
use crate::scope::{
	NamespaceName, PrefixTable, PrefixTableOptions, EMPTY_PREFIX, NO_NAMESPACE,
	XML_NAMESPACE_INDEX, XML_PREFIX,
};
use crate::values::{SharedValues, ValueTable, ValueTableOptions};
use crate::{RcPtr, XMLNS_XML, XMLNS_XMLNS};

/// Configuration for a [`ScopeDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriverOptions {
	/// Options for the prefix table.
	pub prefixes: PrefixTableOptions,

	/// Options for the table of namespace names.
	pub namespace_names: ValueTableOptions,
}

impl DriverOptions {
	/// Set the [`DriverOptions::prefixes`] value.
	pub fn prefixes(mut self, v: PrefixTableOptions) -> DriverOptions {
		self.prefixes = v;
		self
	}

	/// Set the [`DriverOptions::namespace_names`] value.
	pub fn namespace_names(mut self, v: ValueTableOptions) -> DriverOptions {
		self.namespace_names = v;
		self
	}
}

/**
# Scope tracking for a single document traversal

## Namespace indices

Namespace names declared through [`ScopeDriver::declare`] are interned in a
namespace name table. The namespace index of a name is its table index plus
two; [`NO_NAMESPACE`] and [`XML_NAMESPACE_INDEX`] are reserved.
[`ScopeDriver::namespace_index`] maps a name to its namespace index.

## Errors

Any error returned from [`ScopeDriver::declare`],
[`ScopeDriver::check_element`] or [`ScopeDriver::check_attribute`] poisons
the driver: the same error is returned from all checking operations until
[`ScopeDriver::reset`] or [`ScopeDriver::reset_on_error`] is called.

## Example

```
use fiscope::ScopeDriver;
let mut d = ScopeDriver::new();
d.start_element();
let ns = d.declare("a", "urn:a").unwrap();
let a = d.prefixes().prefix_index("a").unwrap();
d.check_attribute(a, ns, 0).unwrap();
assert!(d.check_attribute(a, ns, 0).is_err());
```
*/
pub struct ScopeDriver {
	ctx: RcPtr<Context>,
	prefixes: PrefixTable,
	namespace_names: ValueTable,
	namespace_indices: HashMap<NamespaceName, usize>,
	attributes: DuplicateAttributeVerifier,
	xml_namespace: NamespaceName,
	undeclared: NamespaceName,
	declared: Vec<usize>,
	frames: Vec<usize>,
	poison: Option<Error>,
}

impl ScopeDriver {
	/// Create a new driver with default options and its own (unshared)
	/// [`Context`].
	pub fn new() -> ScopeDriver {
		Self::with_options(DriverOptions::default())
	}

	/// Create a new driver with the given options and its own (unshared)
	/// [`Context`].
	pub fn with_options(opts: DriverOptions) -> ScopeDriver {
		Self::with_context(opts, RcPtr::new(Context::new()))
	}

	/// Create a new driver with the given options and [`Context`].
	pub fn with_context(opts: DriverOptions, ctx: RcPtr<Context>) -> ScopeDriver {
		let mut namespace_names = ValueTable::with_options(opts.namespace_names);
		namespace_names.set_context(ctx.clone());
		ScopeDriver {
			xml_namespace: ctx.intern(XMLNS_XML),
			undeclared: ctx.intern(""),
			ctx,
			prefixes: PrefixTable::with_options(opts.prefixes),
			namespace_names,
			namespace_indices: HashMap::new(),
			attributes: DuplicateAttributeVerifier::new(),
			declared: Vec::new(),
			frames: Vec::new(),
			poison: None,
		}
	}

	fn check_poison(&self) -> Result<()> {
		if let Some(poison) = self.poison.as_ref() {
			return Err(poison.clone());
		}
		Ok(())
	}

	fn track<T>(&mut self, r: Result<T>) -> Result<T> {
		if let Err(e) = r.as_ref() {
			self.poison = Some(e.clone());
		}
		r
	}

	/// Open a new element frame.
	pub fn start_element(&mut self) {
		self.frames.push(self.declared.len());
		self.prefixes.start_declarations();
		self.attributes.start_element();
	}

	/// Close the innermost element frame.
	///
	/// The declarations made on the element are popped in reverse order and
	/// the prefixes which went out of scope are returned in that order.
	pub fn end_element(&mut self) -> Vec<SmartString> {
		let start = match self.frames.pop() {
			Some(start) => start,
			None => return Vec::new(),
		};
		let mut result = Vec::with_capacity(self.declared.len() - start);
		while self.declared.len() > start {
			let prefix_index = match self.declared.pop() {
				Some(v) => v,
				None => break,
			};
			self.prefixes.pop_scope(prefix_index);
			if let Some(prefix) = self.prefixes.prefix(prefix_index) {
				result.push(prefix.into());
			}
		}
		result
	}

	/// Number of open element frames.
	pub fn depth(&self) -> usize {
		self.frames.len()
	}

	fn intern_namespace(&mut self, namespace: &str) -> Result<(usize, NamespaceName)> {
		if let Some(index) = self.namespace_indices.get(namespace) {
			if let Some(name) = self.namespace_names.materialize(*index) {
				return Ok((*index, name));
			}
		}
		let index = add_context(self.namespace_names.add(namespace), ERRCTX_NAMESPACE_TABLE)?;
		let name = match self.namespace_names.materialize(index) {
			Some(name) => name,
			None => self.ctx.intern(namespace),
		};
		self.namespace_indices.insert(name.clone(), index);
		Ok((index, name))
	}

	fn declare_inner(&mut self, prefix: &str, namespace: &str) -> Result<usize> {
		let prefix_index = self.prefixes.intern_prefix(prefix)?;
		let (hint, name) = if prefix_index == XML_PREFIX {
			if namespace != XMLNS_XML {
				return Err(NWFError::ReservedNamespacePrefix.into());
			}
			(Some(0), self.xml_namespace.clone())
		} else if namespace.is_empty() {
			(None, self.undeclared.clone())
		} else if namespace == XMLNS_XML || namespace == XMLNS_XMLNS {
			return Err(NWFError::ReservedNamespacePrefix.into());
		} else {
			let (index, name) = self.intern_namespace(namespace)?;
			(Some(index + 1), name)
		};
		let namespace_index = self
			.prefixes
			.push_scope_with_binding(prefix, name, prefix_index, hint)?;
		self.declared.push(prefix_index);
		Ok(namespace_index)
	}

	/// Declare `prefix` as bound to `namespace` on the current element and
	/// return the namespace index of the binding.
	///
	/// `""` declares the default namespace. An empty `namespace` undeclares
	/// the prefix for the scope of the element. The `xmlns` prefix can not
	/// be declared, and `xml` can only be bound to its fixed namespace.
	pub fn declare(&mut self, prefix: &str, namespace: &str) -> Result<usize> {
		self.check_poison()?;
		let r = self.declare_inner(prefix, namespace);
		self.track(r)
	}

	/// Namespace index of `namespace`, or [`NO_NAMESPACE`] if it has never
	/// been declared.
	pub fn namespace_index(&self, namespace: &str) -> usize {
		if namespace == XMLNS_XML {
			return XML_NAMESPACE_INDEX;
		}
		match self.namespace_indices.get(namespace) {
			Some(index) => index + 2,
			None => NO_NAMESPACE,
		}
	}

	/// Check that the element name `(prefix_index, namespace_index)` refers
	/// to the binding currently in scope.
	pub fn check_element(&mut self, prefix_index: usize, namespace_index: usize) -> Result<()> {
		self.check_poison()?;
		let r = add_context(
			self.prefixes.check_in_scope(prefix_index, namespace_index),
			ERRCTX_ELEMENT,
		);
		self.track(r)
	}

	fn check_attribute_inner(
		&mut self,
		prefix_index: usize,
		namespace_index: usize,
		local_name_index: usize,
	) -> Result<()> {
		if prefix_index != EMPTY_PREFIX {
			add_context(
				self.prefixes.check_in_scope(prefix_index, namespace_index),
				ERRCTX_ATTNAME,
			)?;
		} else if namespace_index != NO_NAMESPACE {
			// unprefixed attributes never take the default namespace
			return Err(NWFError::UndeclaredNamespacePrefix(ERRCTX_ATTNAME).into());
		}
		let value = attribute_id(local_name_index, namespace_index);
		self.attributes.check_and_record(attribute_hash(value), value)
	}

	/// Check an attribute of the current element.
	///
	/// A prefixed attribute must use the binding currently in scope for its
	/// prefix; an unprefixed attribute must have no namespace. Each
	/// `(namespace_index, local_name_index)` pair may only occur once per
	/// element.
	pub fn check_attribute(
		&mut self,
		prefix_index: usize,
		namespace_index: usize,
		local_name_index: usize,
	) -> Result<()> {
		self.check_poison()?;
		let r = self.check_attribute_inner(prefix_index, namespace_index, local_name_index);
		self.track(r)
	}

	/// Resolve `prefix` in the current scope.
	pub fn resolve(&self, prefix: &str) -> Option<&NamespaceName> {
		self.prefixes.namespace_for_prefix(prefix)
	}

	/// Unwind all open frames and lift the poison, keeping interned prefixes
	/// and namespace names.
	pub fn reset(&mut self) {
		while let Some(prefix_index) = self.declared.pop() {
			self.prefixes.pop_scope(prefix_index);
		}
		self.frames.clear();
		self.prefixes.clear_declaration_ids();
		self.attributes.reset();
		self.poison = None;
	}

	/// Drop all state, including interned prefixes, namespace names and any
	/// vocabulary installed with [`ScopeDriver::set_vocabulary`].
	pub fn reset_on_error(&mut self) {
		self.declared.clear();
		self.frames.clear();
		self.prefixes.clear_completely();
		self.namespace_names.clear_completely();
		self.namespace_indices.clear();
		self.attributes.clear();
		self.poison = None;
	}

	/// Reset the driver and install shared prefixes and namespace names as
	/// read-only bases.
	///
	/// Prefix `i` of `prefixes` gets prefix index `i + 2`, namespace name `j`
	/// of `namespace_names` gets namespace index `j + 2`.
	pub fn set_vocabulary(&mut self, prefixes: SharedValues, namespace_names: SharedValues) {
		self.reset();
		self.prefixes.set_read_only_base(prefixes);
		self.namespace_names.set_read_only_base(namespace_names, true);
		self.namespace_indices.clear();
		for index in 0..self.namespace_names.size() {
			if let Some(name) = self.namespace_names.materialize(index) {
				self.namespace_indices.entry(name).or_insert(index);
			}
		}
	}

	/// Freeze the interned prefixes and namespace names, for use with
	/// [`ScopeDriver::set_vocabulary`] on other drivers.
	pub fn vocabulary(&self) -> (SharedValues, SharedValues) {
		(self.prefixes.vocabulary(), self.namespace_names.freeze())
	}

	/// Access the prefix table
	pub fn prefixes(&self) -> &PrefixTable {
		&self.prefixes
	}

	/// Access the namespace name table
	pub fn namespace_names(&self) -> &ValueTable {
		&self.namespace_names
	}

	/// Access the duplicate attribute verifier
	pub fn attributes(&self) -> &DuplicateAttributeVerifier {
		&self.attributes
	}

	/// Access the inner context
	pub fn context(&self) -> &RcPtr<Context> {
		&self.ctx
	}
}

impl Default for ScopeDriver {
	fn default() -> Self {
		Self::new()
	}
}
