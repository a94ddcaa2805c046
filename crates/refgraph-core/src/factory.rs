//! # Entry Factory
//!
//! Maps a URI to an entry variant by its path markers:
//!
//! | Marker        | Variant  | Scoped                        |
//! |---------------|----------|-------------------------------|
//! | `/storedSeq`  | Sequence | never                         |
//! | `/storedlist` | List     | when a host URI precedes it   |
//! | `/storedmap`  | Map      | when a host URI precedes it   |
//! | `/storedRef`  | Object   | always, a host is required    |
//! | none          | Object   | no                            |
//!
//! Creation builds an invalid shell and performs no I/O.

use crate::driver::StorageDriver;
use crate::entry::StorageEntry;
use crate::primitives::{
    STORED_LIST_MARKER, STORED_MAP_MARKER, STORED_REF_MARKER, STORED_SEQ_MARKER,
};
use crate::types::EntryKind;
use crate::uri::StorageUri;
use crate::RefgraphError;
use std::sync::Arc;

/// Builds entry shells over one storage driver.
#[derive(Clone)]
pub struct EntryFactory {
    driver: Arc<dyn StorageDriver>,
}

impl EntryFactory {
    /// Create a factory for `driver`.
    #[must_use]
    pub fn new(driver: Arc<dyn StorageDriver>) -> Self {
        Self { driver }
    }

    /// The driver handed to every created entry.
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn StorageDriver> {
        &self.driver
    }

    /// Determine the variant and host of `uri`.
    pub fn classify(uri: &StorageUri) -> Result<(EntryKind, Option<StorageUri>), RefgraphError> {
        let uri = uri.canonical();
        if uri.contains_marker(STORED_SEQ_MARKER) {
            return Ok((EntryKind::Sequence, None));
        }
        if uri.contains_marker(STORED_LIST_MARKER) {
            return Ok((EntryKind::List, uri.host_before(STORED_LIST_MARKER)));
        }
        if uri.contains_marker(STORED_MAP_MARKER) {
            return Ok((EntryKind::Map, uri.host_before(STORED_MAP_MARKER)));
        }
        if uri.contains_marker(STORED_REF_MARKER) {
            return match uri.host_before(STORED_REF_MARKER) {
                Some(host) => Ok((EntryKind::Object, Some(host))),
                None => Err(RefgraphError::UnknownEntryType(uri.to_string())),
            };
        }
        // Objects need a type segment and an identifier segment.
        if uri.segments().count() < 2 || uri.type_name().is_empty() {
            return Err(RefgraphError::UnknownEntryType(uri.to_string()));
        }
        Ok((EntryKind::Object, None))
    }

    /// Create an entry shell for `uri`.
    pub fn create(&self, uri: &StorageUri) -> Result<Arc<StorageEntry>, RefgraphError> {
        let (kind, host) = Self::classify(uri)?;
        Ok(Arc::new(StorageEntry::new(
            uri,
            kind,
            host,
            Arc::clone(&self.driver),
        )))
    }
}
