//! Widget documents as trees: the node model, default construction, an
//! id-keyed arena for editing, validated structural mutations, partial prop
//! patches, CSS projection and best-effort decoding of stored trees.

pub mod arena;
pub mod factory;
pub mod mutations;
pub mod node;
pub mod patch;
pub mod salvage;
pub mod style;

pub use arena::{build_index, can_have_children, find_node, find_parent, remove_node, WidgetTree};
pub use factory::{create_node, default_props, new_rich_span};
pub use mutations::{reissue_ids, DropPosition, Mutation, MutationError, MutationOutcome};
pub use node::*;
pub use patch::{PropsPatch, SpacingPatch};
pub use salvage::{salvage, salvage_node};
pub use style::{project_span_style, project_style, StyleMap};
