//! Bulk-action framing for the `_bulk` endpoint.
//!
//! Every action is one header line plus, except for deletes, one source
//! line. `document_request` fans a single document out to its own index and
//! to every parent index it routes into, so parent indices always hold the
//! current copy of their children.

use serde_json::{json, Map, Value};

use crate::errors::SearchIndexError;
use table_sync_shared::{Document, Parent};

/// Bulk operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOp {
    Create,
    Update,
    Delete,
}

impl BulkOp {
    /// Key used in the action header line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// One framed bulk action: a header line and an optional source line.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkAction {
    pub op: BulkOp,
    pub index: String,
    pub id: String,
    /// Shard routing; defaults to the document id.
    pub routing: String,
    pub source: Option<Value>,
}

impl BulkAction {
    /// The action header line.
    pub fn header(&self) -> Value {
        let mut meta = Map::new();
        meta.insert("_index".to_string(), json!(self.index));
        meta.insert("_id".to_string(), json!(self.id));
        meta.insert("routing".to_string(), json!(self.routing));
        let mut header = Map::new();
        header.insert(self.op.as_str().to_string(), Value::Object(meta));
        Value::Object(header)
    }

    /// Header plus source as individual JSON lines.
    pub fn lines(&self) -> Vec<Value> {
        let mut lines = vec![self.header()];
        if let Some(source) = &self.source {
            lines.push(source.clone());
        }
        lines
    }

    /// The action as newline-joined JSON, without a trailing newline.
    pub fn ndjson(&self) -> String {
        self.lines()
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Frame a complete `_bulk` body. The bulk endpoint requires the body to end
/// with a newline.
pub fn ndjson_body(actions: &[BulkAction]) -> String {
    let mut body = actions
        .iter()
        .map(BulkAction::ndjson)
        .collect::<Vec<_>>()
        .join("\n");
    body.push('\n');
    body
}

/// A document-level write: the current document supplies the id and routing
/// values, and updates additionally carry the changed-fields diff used as
/// the source.
#[derive(Debug, Clone, Copy)]
pub enum DocumentWrite<'a> {
    Create(&'a Document),
    Update {
        document: &'a Document,
        changed: &'a Document,
    },
    Delete(&'a Document),
}

impl<'a> DocumentWrite<'a> {
    fn op(self) -> BulkOp {
        match self {
            Self::Create(_) => BulkOp::Create,
            Self::Update { .. } => BulkOp::Update,
            Self::Delete(_) => BulkOp::Delete,
        }
    }

    fn document(self) -> &'a Document {
        match self {
            Self::Create(document) | Self::Delete(document) => document,
            Self::Update { document, .. } => document,
        }
    }

    /// Source line for one action. Creates carry the document merged with
    /// the `type` discriminator and the join field; updates wrap the partial
    /// document in `doc`; deletes have no source.
    fn source(self, doc_name: &str, join: Option<Value>) -> Option<Value> {
        match self {
            Self::Create(document) => {
                let mut fields = document.fields().clone();
                fields.insert("type".to_string(), json!(doc_name));
                if let Some(join) = join {
                    fields.insert("join".to_string(), join);
                }
                Some(Value::Object(fields))
            }
            Self::Update { changed, .. } => Some(json!({ "doc": changed.fields() })),
            Self::Delete(_) => None,
        }
    }
}

/// Fan a document out into bulk actions: one against its own index, one per
/// parent index the document routes into.
///
/// The own-index action routes by the document id and, when the index has
/// children, marks the document as a join parent. Parent-index actions route
/// by the parent id and always write the child join form. Parents whose
/// routing attribute is absent or empty on the document are skipped — the
/// document logically has no such parent.
pub fn document_request(
    write: DocumentWrite<'_>,
    index: &str,
    doc_name: &str,
    parents: &[Parent],
    has_children: bool,
) -> Result<Vec<BulkAction>, SearchIndexError> {
    let document = write.document();
    let id = document.id().ok_or_else(|| {
        SearchIndexError::validation(format!("{doc_name} document has no id"))
    })?;
    let op = write.op();

    let mut actions = Vec::with_capacity(1 + parents.len());

    let own_join = has_children.then(|| Value::String(doc_name.to_string()));
    actions.push(BulkAction {
        op,
        index: index.to_string(),
        id: id.to_string(),
        routing: id.to_string(),
        source: write.source(doc_name, own_join),
    });

    for parent in parents {
        let Some(parent_id) = document
            .get_str(&parent.routing_attr)
            .filter(|value| !value.is_empty())
        else {
            continue;
        };
        let join = json!({ "name": doc_name, "parent": parent_id });
        actions.push(BulkAction {
            op,
            index: parent.index.clone(),
            id: id.to_string(),
            routing: parent_id.to_string(),
            source: write.source(doc_name, Some(join)),
        });
    }

    Ok(actions)
}
