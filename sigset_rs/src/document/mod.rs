//! Signal set document model.
//!
//! - [`tree`] - JSON syntax tree with byte spans
//! - [`model`] - typed Signal/Command/SignalGroup/BitFormat/Filter views
//! - [`command_id`] - canonical `hdr.[rax.]cmd` identifiers
//! - [`edits`] - byte-range text edits used by auto-fixes

pub mod command_id;
pub mod edits;
pub mod model;
pub mod tree;

pub use command_id::{CommandId, matches_command, normalize_id};
pub use edits::{Suggestion, TextEdit, apply_edits, format_filter, format_number};
pub use model::{
    BitFormat, Command, CommandPayload, CommandView, Document, Filter, Malformed, Signal,
    SignalGroup, SignalGroupView, SignalSet, SignalView,
};
pub use tree::{Node, NodeKind, PathSegment, Span, parse_tree};
