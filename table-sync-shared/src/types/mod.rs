//! Shared data types.

mod change_event;
mod document;
mod model;

pub use change_event::ChangeEvent;
pub use document::Document;
pub use model::{Attribute, AttributeTags, ModelDescriptor, Parent};
