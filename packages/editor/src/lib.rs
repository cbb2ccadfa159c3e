//! Editing sessions over widget documents.
//!
//! A [`Document`] owns one widget tree plus its document-level metadata and
//! version counter. [`DocumentStore`] adds selection and persistence through
//! any [`widgetforge_common::RowStore`].

pub mod document;
pub mod errors;
pub mod payload;
pub mod selection;
pub mod store;

pub use document::{BindingProperty, DataBinding, Document, ListItemMeta, ListItemMetaPatch, WidgetKind};
pub use errors::EditorError;
pub use payload::{decode_payload, encode_payload, DecodedPayload, PAYLOAD_VERSION};
pub use selection::Selection;
pub use store::{DocumentStore, WIDGETS_TABLE};
