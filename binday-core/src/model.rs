//! Domain data structures for raw and resolved collection events.

use std::collections::{BTreeSet, btree_set};
use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Identifier for a configured data source.
pub struct SourceId(pub String);

impl fmt::Display for SourceId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Metadata describing a source and its human-friendly name.
pub struct SourceMeta {
    /// Unique identifier.
    pub id: SourceId,
    /// Display name, usually the council.
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Canonical bin categories shared by every source.
pub enum BinKind {
    /// General refuse.
    Black,
    /// Dry recycling.
    Blue,
    /// Garden waste, brown or green depending on the council.
    #[serde(alias = "brown")]
    Green,
    /// Food caddy.
    FoodWaste,
    /// Glass, cans and plastic bottles.
    Pink,
    /// Label no rule recognised, lower-cased and trimmed.
    Unknown(String),
}

impl fmt::Display for BinKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BinKind::Black => "Black",
            BinKind::Blue => "Blue",
            BinKind::Green => "Green",
            BinKind::FoodWaste => "Food Waste",
            BinKind::Pink => "Pink",
            BinKind::Unknown(label) => label,
        };
        formatter.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Collection record exactly as a source delivered it.
pub struct RawEvent {
    /// Free-text bin description.
    pub label: String,
    /// Source-specific encoding of the collection date.
    pub start: String,
    /// Optional end marker; most sources leave it empty.
    #[serde(default)]
    pub end: Option<String>,
}

impl RawEvent {
    /// Construct an event without an end marker.
    #[must_use]
    pub fn new<L: Into<String>, S: Into<String>>(label: L, start: S) -> Self {
        Self {
            label: label.into(),
            start: start.into(),
            end: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Normalized pair of bin kind and calendar date.
pub struct ResolvedEvent {
    /// Canonical bin category.
    pub kind: BinKind,
    /// Collection day without any time-of-day component.
    pub date: NaiveDate,
}

impl ResolvedEvent {
    /// Render the date as a relative token when it is today or tomorrow.
    #[must_use]
    pub fn relative_day(&self, today: NaiveDate) -> Option<RelativeDay> {
        RelativeDay::of(self.date, today)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Literal day tokens some sources print instead of a date.
pub enum RelativeDay {
    /// The current calendar day.
    Today,
    /// The day after the current calendar day.
    Tomorrow,
}

impl RelativeDay {
    /// Classify `date` relative to `today`.
    #[must_use]
    pub fn of(date: NaiveDate, today: NaiveDate) -> Option<Self> {
        if date == today {
            Some(RelativeDay::Today)
        } else if today.checked_add_days(Days::new(1)) == Some(date) {
            Some(RelativeDay::Tomorrow)
        } else {
            None
        }
    }

    /// Calendar date this token denotes, anchored on `today`.
    #[must_use]
    pub fn resolve(self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            RelativeDay::Today => Some(today),
            RelativeDay::Tomorrow => today.checked_add_days(Days::new(1)),
        }
    }
}

impl fmt::Display for RelativeDay {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelativeDay::Today => formatter.write_str("Today"),
            RelativeDay::Tomorrow => formatter.write_str("Tomorrow"),
        }
    }
}

impl FromStr for RelativeDay {
    type Err = ();

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let token = token.trim();
        if token.eq_ignore_ascii_case("today") {
            Ok(RelativeDay::Today)
        } else if token.eq_ignore_ascii_case("tomorrow") {
            Ok(RelativeDay::Tomorrow)
        } else {
            Err(())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Non-empty, deduplicated set of bins due on the target day.
pub struct DueSet(BTreeSet<BinKind>);

impl DueSet {
    /// Wrap a set of kinds, refusing an empty one.
    #[must_use]
    pub fn new(kinds: BTreeSet<BinKind>) -> Option<Self> {
        (!kinds.is_empty()).then_some(Self(kinds))
    }

    /// Add another kind to the set.
    #[must_use]
    pub fn with(mut self, kind: BinKind) -> Self {
        self.0.insert(kind);
        self
    }

    /// Whether `kind` is part of the set.
    #[must_use]
    pub fn contains(&self, kind: &BinKind) -> bool {
        self.0.contains(kind)
    }

    /// Number of distinct kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with collections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate kinds in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &BinKind> {
        self.0.iter()
    }

    /// One-line human summary handed to notifiers.
    #[must_use]
    pub fn summary(&self) -> String {
        let names = self
            .0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        format!("Bins out today: {names}")
    }
}

impl<'set> IntoIterator for &'set DueSet {
    type Item = &'set BinKind;
    type IntoIter = btree_set::Iter<'set, BinKind>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Outcome of resolving one source for the target day.
pub enum CollectionResult {
    /// At least one bin goes out.
    Due(DueSet),
    /// The pipeline completed and nothing is due.
    NoneDueToday,
}

impl CollectionResult {
    /// Build a result from a possibly empty set.
    #[must_use]
    pub fn from_kinds(kinds: BTreeSet<BinKind>) -> Self {
        DueSet::new(kinds).map_or(CollectionResult::NoneDueToday, CollectionResult::Due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(year: i32, month: u32, dom: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, dom).expect("valid date")
    }

    #[test]
    fn empty_set_is_none_due() {
        assert_eq!(
            CollectionResult::from_kinds(BTreeSet::new()),
            CollectionResult::NoneDueToday
        );
        assert!(DueSet::new(BTreeSet::new()).is_none());
    }

    #[test]
    fn summary_lists_kinds_in_canonical_order() {
        let due = DueSet::new(BTreeSet::from([BinKind::FoodWaste, BinKind::Black]))
            .expect("non-empty");
        assert_eq!(due.summary(), "Bins out today: Black, Food Waste");
    }

    #[test]
    fn relative_day_round_trips_through_tokens() {
        let today = day(2024, 12, 31);
        for token in ["Today", "Tomorrow"] {
            let parsed: RelativeDay = token.parse().expect("known token");
            let date = parsed.resolve(today).expect("in range");
            let event = ResolvedEvent {
                kind: BinKind::Blue,
                date,
            };
            assert_eq!(
                event.relative_day(today).map(|rel| rel.to_string()),
                Some(token.to_owned())
            );
        }
        assert_eq!(RelativeDay::of(day(2025, 1, 2), today), None);
    }

    #[test]
    fn brown_alias_deserializes_to_green() {
        let kind: BinKind = serde_json::from_str("\"brown\"").expect("alias");
        assert_eq!(kind, BinKind::Green);
    }
}
