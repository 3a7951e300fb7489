pub const ERRCTX_UNKNOWN: &'static str = "in unknown context";
pub const ERRCTX_TABLE_ENTRIES: &'static str = "in value table entries";
pub const ERRCTX_TABLE_CHARACTERS: &'static str = "in value table characters";
pub const ERRCTX_PREFIX_TABLE: &'static str = "in prefix table";
pub const ERRCTX_NAMESPACE_TABLE: &'static str = "in namespace name table";
pub const ERRCTX_ELEMENT: &'static str = "in element";
pub const ERRCTX_ATTNAME: &'static str = "in attribute name";
