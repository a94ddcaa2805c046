//! # Primitives
//!
//! Fixed constants shared by the URI utilities, the entry model and the
//! graph engine.
//!
//! These are compiled into the binary and are immutable at runtime.

/// The property holding an object's own identity URI.
///
/// Excluded from reference flattening, otherwise every object would
/// reference itself.
pub const OWN_PROPERTY: &str = "uri";

/// Flattened stand-in for a `null` value.
///
/// Keeps the property path visible while never parsing as a URI.
pub const NULL_SENTINEL: &str = "NULL";

/// Display label of an entry whose last refresh failed.
pub const ERROR_LABEL: &str = "<<LOAD ERROR>>";

/// Path marker of stored lists.
pub const STORED_LIST_MARKER: &str = "/storedlist";

/// Path marker of stored maps.
pub const STORED_MAP_MARKER: &str = "/storedmap";

/// Path marker of scoped object references.
pub const STORED_REF_MARKER: &str = "/storedRef";

/// Path marker of stored sequences (counters).
pub const STORED_SEQ_MARKER: &str = "/storedSeq";

/// Prefix of the version suffix (`.v<digits>`) appended to a URI path.
pub const VERSION_PREFIX: &str = ".v";

/// Suffix of single-version object paths.
pub const SINGLE_VERSION_SUFFIX: &str = "-s";

/// Key holding the URIs of a stored list or map.
pub const COLLECTION_URIS_KEY: &str = "uris";

/// Key holding the counter value of a stored sequence.
pub const SEQUENCE_CURRENT_KEY: &str = "current";

/// Upper bound on the worker pool size.
pub const MAX_WORKERS: usize = 16;

/// Longest edge label before it is trimmed with an ellipsis.
pub const EDGE_LABEL_LIMIT: usize = 15;

/// Default number of outgoing rounds for [`crate::GraphRenderer::render`].
pub const DEFAULT_OUTBOUND_LIMIT: i32 = 2;

/// Default number of incoming rounds for [`crate::GraphRenderer::render`].
pub const DEFAULT_INBOUND_LIMIT: i32 = 0;
