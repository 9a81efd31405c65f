//! Rules about the layout of the document rather than its wording.

mod duplicate_id;
mod overlap;
mod rax_ambiguity;

pub use duplicate_id::{DuplicateIdRule, next_version_id};
pub use overlap::{BitOverlapRule, OBSOLETE_MARKERS, overlap_groups};
pub use rax_ambiguity::{RaxAmbiguityRule, normalized_cmd};

use crate::document::{Node, TextEdit, edits::remove_element};

/// Removal edit for the array element that starts at `target.offset`.
pub(crate) fn remove_item(array: &Node, target: &Node) -> Option<TextEdit> {
    let items = array.items();
    let index = items.iter().position(|item| item.offset == target.offset)?;
    remove_element(items, index)
}
