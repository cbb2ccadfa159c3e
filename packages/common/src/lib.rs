//! Shared building blocks for widgetforge crates: id generation and the
//! row-oriented storage seam that documents and workflows persist through.

pub mod error;
pub mod filesystem;
pub mod id_generator;
pub mod result;
pub mod storage;

pub use error::*;
pub use filesystem::FileStore;
pub use id_generator::{get_scope_id, next_id};
pub use result::*;
pub use storage::{MemoryStore, Row, RowStore};
