/*!
# Namespace scope bookkeeping for binary XML codecs

This crate provides the in-memory bookkeeping a streaming decoder or encoder
of a compact binary XML representation (such as Fast Infoset) needs while it
walks a document:

* [`ValueTable`]: growable, index-addressed tables of interned strings which
  can extend a shared read-only vocabulary ([`SharedValues`]).
* [`PrefixTable`]: the stack of namespace bindings of every prefix, with
  per-element redeclaration checks.
* [`DuplicateAttributeVerifier`]: constant-time duplicate attribute detection
  without clearing anything between elements.
* [`ScopeDriver`]: wires the above together for element-by-element use.

No parsing and no I/O happens here; the structures are driven by a caller who
knows the document structure.

## Example

```
use fiscope::{ScopeDriver, Error};
let mut d = ScopeDriver::new();
d.start_element();
d.declare("soap", "http://www.w3.org/2003/05/soap-envelope").unwrap();
assert_eq!(
	d.resolve("soap").map(|ns| &**ns),
	Some("http://www.w3.org/2003/05/soap-envelope"),
);
// a prefix may only be declared once per element
assert!(matches!(
	d.declare("soap", "urn:other"),
	Err(Error::NotNamespaceWellFormed(_)),
));
d.reset();
assert!(d.resolve("soap").is_none());
```

## Feature flags

- `mt`: Use [`std::sync::Arc`] for shared strings and make [`Context`]
  `Send + Sync`.
- `shared_ns`: Deduplicate materialized strings across all tables which share
  a [`Context`].
*/
#[cfg(not(feature = "mt"))]
use std::rc::Rc;
#[cfg(feature = "mt")]
use std::sync::Arc;

pub mod attributes;
mod context;
pub mod driver;
mod errctx;
pub mod error;
pub mod hash;
pub mod scope;
pub mod values;


#[doc(inline)]
pub use attributes::DuplicateAttributeVerifier;
pub use context::Context;
#[doc(inline)]
pub use driver::{DriverOptions, ScopeDriver};
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use hash::HashSizing;
#[doc(inline)]
pub use scope::{NamespaceName, PrefixTable, PrefixTableOptions};
#[doc(inline)]
pub use values::{SharedValues, ValueTable, ValueTableOptions};

/// Shared pointer used for interned strings
///
/// In builds with the `mt` feature, this is a [`Arc`]. In non-`mt` builds,
/// this is a [`std::rc::Rc`].
#[cfg(feature = "mt")]
pub type RcPtr<T> = Arc<T>;
/// Shared pointer used for interned strings
///
/// In builds with the `mt` feature, this is a [`std::sync::Arc`].
/// In non-`mt` builds, this is a [`Rc`].
#[cfg(not(feature = "mt"))]
pub type RcPtr<T> = Rc<T>;

pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");

/// XML core namespace URI (for the `xml:` prefix)
pub const XMLNS_XML: &'static str = "http://www.w3.org/XML/1998/namespace";

/// XML namespace URI (for the `xmlns:` prefix)
pub const XMLNS_XMLNS: &'static str = "http://www.w3.org/2000/xmlns/";

pub(crate) const XML_PREFIX_STR: &'static str = "xml";
pub(crate) const XMLNS_PREFIX: &'static str = "xmlns";
