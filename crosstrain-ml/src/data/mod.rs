//! Data layer: in-memory tabular frame and the document-store boundary.

pub mod frame;
pub mod source;

pub use frame::{Dataset, NumericFrame};
pub use source::{Document, DocumentStore, JsonlDocumentStore, materialize};
