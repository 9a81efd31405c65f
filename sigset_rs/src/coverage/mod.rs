//! Model-year coverage engine.
//!
//! Maps Command Identifiers to supported/unsupported model years using the
//! per-year test fixtures, then derives or tightens the command's debug
//! filter inside the bounds of its vehicle generation.

pub mod filter;
pub mod generations;
pub mod test_cases;

use std::path::Path;

use serde::Serialize;

pub use filter::{
    FilterOptimization, calculate_debug_filter, format_year_set, format_years_as_ranges,
    optimize_debug_filter, optimize_debug_filter_with_gaps,
};
pub use generations::{Generation, Generations};
pub use test_cases::{CommandSupport, SupportManifest, TestCaseIndex, YearFixtures};

use crate::document::edits::{insert_property_after, remove_element};
use crate::document::{CommandId, CommandView, Filter, Suggestion, TextEdit, format_filter};

/// What should happen to a command's `dbgfilter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "filter", rename_all = "snake_case")]
pub enum FilterChange {
    /// Leave the command as authored.
    Keep,
    /// Write this filter.
    Set(Filter),
    /// Delete the `dbgfilter` field.
    Remove,
    /// No bounded filter is possible; the unconditional `dbg` flag stands.
    Unconditional,
}

/// Coverage result and filter decision for one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterPlan {
    pub id: String,
    pub support: CommandSupport,
    pub generation: Option<String>,
    pub before: Option<Filter>,
    pub change: FilterChange,
}

impl FilterPlan {
    pub fn is_change(&self) -> bool {
        matches!(self.change, FilterChange::Set(_) | FilterChange::Remove)
    }

    /// Filter in effect after the change.
    pub fn after(&self) -> Option<Filter> {
        match &self.change {
            FilterChange::Keep | FilterChange::Unconditional => self.before.clone(),
            FilterChange::Set(filter) => Some(filter.clone()),
            FilterChange::Remove => None,
        }
    }

    /// Text edit realizing the change against the command's source node.
    pub fn edit(&self, text: &str, command: &CommandView<'_>) -> Option<Suggestion> {
        let object = command.node;
        let existing = object
            .children
            .iter()
            .position(|prop| prop.key() == Some("dbgfilter"));

        match (&self.change, existing) {
            (FilterChange::Set(filter), Some(idx)) => {
                let value = object.children[idx].value_node()?;
                Some(Suggestion::single(
                    "Update debug filter",
                    TextEdit::replace(value, format_filter(filter)),
                ))
            }
            (FilterChange::Set(filter), None) => {
                let anchor = object
                    .children
                    .iter()
                    .position(|prop| prop.key() == Some("dbg"))
                    .or_else(|| object.children.len().checked_sub(1))?;
                let edit =
                    insert_property_after(text, object, anchor, "dbgfilter", &format_filter(filter))?;
                Some(Suggestion::single("Add debug filter", edit))
            }
            (FilterChange::Remove, Some(idx)) => Some(Suggestion::single(
                "Remove debug filter",
                remove_element(&object.children, idx)?,
            )),
            _ => None,
        }
    }
}

/// Test-case index plus generation bounds.
#[derive(Debug, Clone, Default)]
pub struct CoverageEngine {
    index: TestCaseIndex,
    generations: Generations,
}

impl CoverageEngine {
    pub fn new(index: TestCaseIndex, generations: Generations) -> Self {
        Self { index, generations }
    }

    pub fn load(test_cases: &Path, generations: &Path) -> Self {
        Self::new(TestCaseIndex::load(test_cases), Generations::load(generations))
    }

    pub fn has_data(&self) -> bool {
        !self.index.is_empty()
    }

    pub fn index(&self) -> &TestCaseIndex {
        &self.index
    }

    pub fn generations(&self) -> &Generations {
        &self.generations
    }

    pub fn support_for(&self, id: &CommandId) -> CommandSupport {
        self.index.support_for(id)
    }

    /// Explicit generation by name, else the one holding every supported
    /// year. Without supported years the earliest known year decides.
    pub fn generation_for(
        &self,
        support: &CommandSupport,
        name: Option<&str>,
    ) -> Option<&Generation> {
        if let Some(name) = name {
            let found = self.generations.by_name(name);
            if found.is_none() {
                tracing::warn!(generation = name, "unknown generation, using year bounds only");
            }
            return found;
        }
        match (support.supported.first(), support.supported.last()) {
            (Some(&first), Some(&last)) => self
                .generations
                .containing(first)
                .filter(|g| g.contains(last)),
            _ => self.generations.for_years(&support.unsupported),
        }
    }

    /// Decide the filter for one command.
    ///
    /// Authored filters are optimized; `dbg: true` commands without a filter
    /// get a calculated one; other commands are left alone.
    pub fn plan(&self, command: &CommandView<'_>, generation: Option<&str>) -> FilterPlan {
        let id = command.command.identifier();
        let support = self.support_for(&id);
        self.plan_with_support(command, support, generation)
    }

    pub fn plan_with_support(
        &self,
        command: &CommandView<'_>,
        support: CommandSupport,
        generation: Option<&str>,
    ) -> FilterPlan {
        let id = command.command.identifier();
        let bound = self.generation_for(&support, generation);
        let before = command.command.dbgfilter.clone();

        let change = match &before {
            Some(existing) => {
                match optimize_debug_filter_with_gaps(
                    existing,
                    &support.supported,
                    &support.unsupported,
                ) {
                    FilterOptimization::AlreadyOptimal => FilterChange::Keep,
                    FilterOptimization::Remove => FilterChange::Remove,
                    FilterOptimization::Tightened(filter) => FilterChange::Set(filter),
                }
            }
            None if command.command.dbg => {
                match calculate_debug_filter(&support.supported, &support.unsupported, bound) {
                    Some(filter) => FilterChange::Set(filter),
                    None => FilterChange::Unconditional,
                }
            }
            None => FilterChange::Keep,
        };

        FilterPlan {
            id: id.to_string(),
            generation: bound.map(|g| g.name.clone()),
            support,
            before,
            change,
        }
    }
}
