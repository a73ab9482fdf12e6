//! Change-stream events emitted by the primary store.

use super::Document;

/// One event from a per-table change stream.
///
/// `value` is always the current document. `Updated` additionally carries
/// the changed-fields diff when the store supplies one; without a diff the
/// consumer falls back to re-indexing the full document. A `Deleted` event
/// without a value is a pure tombstone and carries nothing to act on.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    Created {
        value: Document,
    },
    Updated {
        value: Document,
        changed: Option<Document>,
    },
    Deleted {
        value: Option<Document>,
    },
}
