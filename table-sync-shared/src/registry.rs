//! Process-lifetime registry of the managed model set.
//!
//! Validates the model set at construction and precomputes the parent and
//! child relations the schema builder and bulk fan-out depend on. The
//! registry is immutable after construction and shared read-only across
//! tasks.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use crate::types::{ModelDescriptor, Parent};

/// Errors raised while validating the managed model set.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    /// Two managed models share a document name.
    #[error("Duplicate document name: {0}")]
    DuplicateDocumentName(String),

    /// A `parent` tag names a model outside the managed set.
    #[error("Model {model} names unknown parent {parent}")]
    UnknownParent { model: String, parent: String },

    /// The parent relations contain a cycle.
    #[error("Cyclic parent relation involving {0}")]
    CyclicRelation(String),
}

/// Immutable map of the managed models with derived relations.
#[derive(Debug)]
pub struct ModelRegistry {
    models: Vec<ModelDescriptor>,
    by_name: HashMap<String, usize>,
    parents: HashMap<String, Vec<Parent>>,
    children: HashMap<String, Vec<String>>,
}

impl ModelRegistry {
    /// Build the registry, rejecting duplicate document names, unknown
    /// parents, and cyclic parent relations.
    pub fn new(models: Vec<ModelDescriptor>) -> Result<Self, ModelError> {
        let mut by_name = HashMap::with_capacity(models.len());
        for (position, model) in models.iter().enumerate() {
            let document_name = model.document_name().to_string();
            if by_name.insert(document_name, position).is_some() {
                return Err(ModelError::DuplicateDocumentName(
                    model.document_name().to_string(),
                ));
            }
        }

        let mut parents: HashMap<String, Vec<Parent>> = HashMap::new();
        let mut children: HashMap<String, BTreeSet<String>> = HashMap::new();
        for model in &models {
            let document_name = model.document_name();
            for attr in &model.attributes {
                let Some(parent_name) = &attr.tags.parent else {
                    continue;
                };
                let parent_model = by_name
                    .get(parent_name)
                    .map(|position| &models[*position])
                    .ok_or_else(|| ModelError::UnknownParent {
                        model: document_name.to_string(),
                        parent: parent_name.clone(),
                    })?;
                parents
                    .entry(document_name.to_string())
                    .or_default()
                    .push(Parent {
                        name: parent_name.clone(),
                        index: parent_model.table.clone(),
                        routing_attr: attr.name.clone(),
                    });
                children
                    .entry(parent_name.clone())
                    .or_default()
                    .insert(document_name.to_string());
            }
        }

        check_acyclic(&parents)?;

        let children = children
            .into_iter()
            .map(|(name, set)| (name, set.into_iter().collect()))
            .collect();

        Ok(Self {
            models,
            by_name,
            parents,
            children,
        })
    }

    /// Every managed model, in registration order.
    pub fn models(&self) -> &[ModelDescriptor] {
        &self.models
    }

    /// Look a model up by document name.
    pub fn get(&self, document_name: &str) -> Option<&ModelDescriptor> {
        self.by_name
            .get(document_name)
            .map(|position| &self.models[*position])
    }

    /// Parent relations of a model, in attribute order.
    pub fn parents(&self, document_name: &str) -> &[Parent] {
        self.parents
            .get(document_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Document names of the model's children, sorted.
    pub fn children(&self, document_name: &str) -> &[String] {
        self.children
            .get(document_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_children(&self, document_name: &str) -> bool {
        !self.children(document_name).is_empty()
    }
}

/// Walk child → parent edges and reject any cycle. A cycle would make the
/// schema builder's child-property merge non-terminating.
fn check_acyclic(parents: &HashMap<String, Vec<Parent>>) -> Result<(), ModelError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        InProgress,
        Done,
    }

    fn visit(
        name: &str,
        parents: &HashMap<String, Vec<Parent>>,
        marks: &mut HashMap<String, Mark>,
    ) -> Result<(), ModelError> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => return Err(ModelError::CyclicRelation(name.to_string())),
            None => {}
        }
        marks.insert(name.to_string(), Mark::InProgress);
        if let Some(relations) = parents.get(name) {
            for parent in relations {
                visit(&parent.name, parents, marks)?;
            }
        }
        marks.insert(name.to_string(), Mark::Done);
        Ok(())
    }

    let mut marks = HashMap::new();
    for name in parents.keys() {
        visit(name, parents, &mut marks)?;
    }
    Ok(())
}
