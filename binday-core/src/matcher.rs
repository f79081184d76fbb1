//! Decides whether the next collection falls on the target day.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::model::{CollectionResult, ResolvedEvent};
use crate::rules::Companion;

/// Collapse the window into a result for `target`.
///
/// Only the calendar date is compared. Synonymous labels that resolved to the
/// same kind are reported once.
#[must_use]
pub fn due_on(window: &[ResolvedEvent], target: NaiveDate) -> CollectionResult {
    let kinds = window
        .iter()
        .filter(|event| event.date == target)
        .map(|event| event.kind.clone())
        .collect::<BTreeSet<_>>();
    CollectionResult::from_kinds(kinds)
}

/// Add companion kinds to a due set.
#[must_use]
pub fn with_companions(result: CollectionResult, companions: &[Companion]) -> CollectionResult {
    match result {
        CollectionResult::Due(due) => {
            let extra = companions
                .iter()
                .filter(|companion| due.contains(&companion.with))
                .map(|companion| companion.also.clone())
                .collect::<Vec<_>>();
            CollectionResult::Due(extra.into_iter().fold(due, |acc, kind| acc.with(kind)))
        }
        CollectionResult::NoneDueToday => CollectionResult::NoneDueToday,
    }
}
