/*!
# Error types

This module holds the error types returned by the various structures of this
crate.
*/
use std::error;
use std::fmt;
use std::result::Result as StdResult;

pub use crate::errctx::*;

/// Violation of a well-formedness constraint detected while tracking an
/// element.
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub enum WFError {
	/// Attribute was declared multiple times in the same element.
	///
	/// **Note:** The detector only sees attribute identities, so this is also
	/// emitted for namespaced attributes which resolve to the same
	/// `(namespace, localname)` pair through different prefixes.
	DuplicateAttribute,
}

impl error::Error for WFError {}

impl fmt::Display for WFError {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			WFError::DuplicateAttribute => f.write_str("duplicate attribute"),
		}
	}
}

/// Violation of a namespace-well-formedness constraint.
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub enum NWFError {
	/// The same prefix was declared more than once on a single element.
	DuplicateNamespaceDeclaration,

	/// Attempt to declare the `xmlns` prefix or to rebind the `xml` prefix.
	ReservedNamespacePrefix,

	/// A qualified name refers to a prefix which is not bound to the expected
	/// namespace in the current scope.
	///
	/// The contents are implementation details.
	UndeclaredNamespacePrefix(&'static str),
}

impl error::Error for NWFError {}

impl ErrorWithContext for NWFError {
	fn with_context(self, ctx: &'static str) -> NWFError {
		match self {
			Self::UndeclaredNamespacePrefix(_) => Self::UndeclaredNamespacePrefix(ctx),
			other => other,
		}
	}
}

impl fmt::Display for NWFError {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::DuplicateNamespaceDeclaration => {
				f.write_str("namespace prefix declared twice on the same element")
			}
			Self::ReservedNamespacePrefix => f.write_str("reserved namespace prefix"),
			Self::UndeclaredNamespacePrefix(ctx) => {
				write!(f, "use of undeclared namespace prefix {}", ctx)
			}
		}
	}
}

/// Error types which may be returned from the tables and the driver.
///
/// None of these errors is retried internally. [`Error::CapacityExceeded`]
/// should be treated as fatal for the current document; the other variants
/// indicate a malformed element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
	/// A violation of a well-formedness constraint was detected.
	NotWellFormed(WFError),
	/// A violation of a namespace-well-formedness constraint was detected.
	NotNamespaceWellFormed(NWFError),
	/// A growable structure hit its configured maximum.
	///
	/// The string indicates which limit was hit and should not be
	/// interpreted by user code.
	CapacityExceeded(&'static str),
}

pub type Result<T> = StdResult<T, Error>;

pub(crate) trait ErrorWithContext {
	fn with_context(self, ctx: &'static str) -> Self;
}

impl Error {
	pub(crate) fn capacity(ctx: &'static str) -> Error {
		Error::CapacityExceeded(ctx)
	}

	/// Return true if this error indicates a malformed element (as opposed
	/// to exhaustion of a configured limit).
	pub fn is_malformed(&self) -> bool {
		match self {
			Self::NotWellFormed(_) | Self::NotNamespaceWellFormed(_) => true,
			Self::CapacityExceeded(_) => false,
		}
	}
}

impl ErrorWithContext for Error {
	fn with_context(self, ctx: &'static str) -> Self {
		match self {
			Self::NotNamespaceWellFormed(nwf) => {
				Self::NotNamespaceWellFormed(nwf.with_context(ctx))
			}
			Self::CapacityExceeded(_) => Self::CapacityExceeded(ctx),
			other => other,
		}
	}
}

pub(crate) fn add_context<T>(r: Result<T>, ctx: &'static str) -> Result<T> {
	r.or_else(|e| Err(e.with_context(ctx)))
}

impl From<WFError> for Error {
	fn from(e: WFError) -> Error {
		Error::NotWellFormed(e)
	}
}

impl From<NWFError> for Error {
	fn from(e: NWFError) -> Error {
		Error::NotNamespaceWellFormed(e)
	}
}

impl fmt::Display for Error {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Error::NotWellFormed(e) => write!(f, "not-well-formed: {}", e),
			Error::NotNamespaceWellFormed(e) => write!(f, "not namespace-well-formed: {}", e),
			Error::CapacityExceeded(ctx) => write!(f, "capacity exceeded {}", ctx),
		}
	}
}

impl error::Error for Error {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		match self {
			Error::NotWellFormed(e) => Some(e),
			Error::NotNamespaceWellFormed(e) => Some(e),
			Error::CapacityExceeded(_) => None,
		}
	}
}
