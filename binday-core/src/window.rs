//! Narrows a rolling multi-week schedule down to the next collection day.

use chrono::NaiveDate;

use crate::model::ResolvedEvent;

/// Keep the events that share the earliest date on or after `from`.
///
/// Events dated strictly before `from` are dropped. Every event on the
/// earliest remaining date is kept, so several kinds collected together stay
/// together. Applying the filter to its own output returns it unchanged.
#[must_use]
pub fn next_collection(events: &[ResolvedEvent], from: NaiveDate) -> Vec<ResolvedEvent> {
    let Some(earliest) = events
        .iter()
        .map(|event| event.date)
        .filter(|date| *date >= from)
        .min()
    else {
        return Vec::new();
    };

    events
        .iter()
        .filter(|event| event.date == earliest)
        .cloned()
        .collect()
}
