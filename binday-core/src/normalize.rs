//! Turns raw source events into canonical `(BinKind, NaiveDate)` pairs.

use std::sync::LazyLock;

use chrono::{DateTime, Local, NaiveDate};
use regex::Regex;

use crate::model::{BinKind, RawEvent, RelativeDay, ResolvedEvent};
use crate::rules::{DateStrategy, SourceProfile, normalize_label};

static EPOCH_MILLIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+").expect("epoch pattern is valid"));

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Failures while normalizing a single raw event.
pub enum NormalizeError {
    /// The date marker could not be decoded with the source's strategy.
    #[error("Malformed date {marker:?} for {label:?}: {reason}")]
    MalformedDate {
        /// Label of the offending event.
        label: String,
        /// Marker as received.
        marker: String,
        /// What went wrong.
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Outcome for one raw event.
pub enum Normalized {
    /// Event with a usable date.
    Resolved(ResolvedEvent),
    /// Source reported no scheduled date for this bin.
    Unscheduled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Result of normalizing a whole batch, with diagnostics.
pub struct Normalization {
    /// Events that carry a date.
    pub events: Vec<ResolvedEvent>,
    /// Number of events without a scheduled date.
    pub unscheduled: usize,
    /// Labels that fell through every rule.
    pub misses: Vec<String>,
}

/// Shared normalizer driven by a [`SourceProfile`].
pub struct Normalizer<'profile> {
    profile: &'profile SourceProfile,
    today: NaiveDate,
}

impl<'profile> Normalizer<'profile> {
    /// Bind the profile to the day captured for this run.
    #[must_use]
    pub fn new(profile: &'profile SourceProfile, today: NaiveDate) -> Self {
        Self { profile, today }
    }

    /// Map a free-text label to a kind; unmatched labels become [`BinKind::Unknown`].
    #[must_use]
    pub fn classify(&self, label: &str) -> BinKind {
        self.profile
            .rules
            .classify(label)
            .unwrap_or_else(|| BinKind::Unknown(normalize_label(label)))
    }

    /// Decode a date marker.
    ///
    /// Returns `Ok(None)` when the marker means "no scheduled date".
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::MalformedDate`] when the marker does not decode.
    pub fn parse_date(&self, label: &str, marker: &str) -> Result<Option<NaiveDate>, NormalizeError> {
        let malformed = |reason: String| NormalizeError::MalformedDate {
            label: label.to_owned(),
            marker: marker.to_owned(),
            reason,
        };

        let cleaned = self
            .profile
            .noise
            .iter()
            .fold(marker.to_owned(), |acc, noise| acc.replace(noise.as_str(), ""));
        let cleaned = cleaned.trim();

        if cleaned.to_lowercase().contains("null") {
            return Ok(None);
        }

        if let Ok(relative) = cleaned.parse::<RelativeDay>() {
            return relative
                .resolve(self.today)
                .map(Some)
                .ok_or_else(|| malformed("date out of range".to_owned()));
        }

        if cleaned.is_empty() {
            return Err(malformed("empty marker".to_owned()));
        }

        match &self.profile.date {
            DateStrategy::Layout { format } => NaiveDate::parse_from_str(cleaned, format)
                .map(Some)
                .map_err(|err| malformed(err.to_string())),
            DateStrategy::EpochMillis => {
                let token = EPOCH_MILLIS
                    .find(cleaned)
                    .ok_or_else(|| malformed("no epoch token".to_owned()))?;
                let millis = token
                    .as_str()
                    .parse::<i64>()
                    .map_err(|err| malformed(err.to_string()))?;
                DateTime::from_timestamp_millis(millis)
                    .map(|instant| Some(instant.with_timezone(&Local).date_naive()))
                    .ok_or_else(|| malformed("epoch out of range".to_owned()))
            }
        }
    }

    /// Normalize one raw event.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::MalformedDate`] when the start marker does not decode.
    pub fn normalize(&self, raw: &RawEvent) -> Result<Normalized, NormalizeError> {
        let Some(date) = self.parse_date(&raw.label, &raw.start)? else {
            return Ok(Normalized::Unscheduled);
        };
        Ok(Normalized::Resolved(ResolvedEvent {
            kind: self.classify(&raw.label),
            date,
        }))
    }

    /// Normalize a batch, stopping at the first malformed date.
    ///
    /// # Errors
    ///
    /// Propagates the first [`NormalizeError`].
    pub fn normalize_all(&self, raw_events: &[RawEvent]) -> Result<Normalization, NormalizeError> {
        let mut out = Normalization::default();
        for raw in raw_events {
            match self.normalize(raw)? {
                Normalized::Resolved(event) => {
                    if let BinKind::Unknown(label) = &event.kind {
                        tracing::warn!(label = %raw.label, normalized = %label, "unrecognised bin label");
                        out.misses.push(raw.label.clone());
                    }
                    out.events.push(event);
                }
                Normalized::Unscheduled => {
                    tracing::debug!(label = %raw.label, marker = %raw.start, "no scheduled date");
                    out.unscheduled += 1;
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::rules::{LabelRule, LabelRules};

    fn day(year: i32, month: u32, dom: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, dom).expect("valid date")
    }

    fn corby_like() -> SourceProfile {
        SourceProfile::new(DateStrategy::layout("%A, %d %B %Y"))
            .with_rules(LabelRules::new(
                1,
                vec![
                    LabelRule::prefix("Green Garden", BinKind::Green),
                    LabelRule::prefix("Black", BinKind::Black),
                ],
            ))
            .with_noise("Empty Garden 240L ")
    }

    #[test]
    fn tomorrow_token_is_today_plus_one() {
        let profile = corby_like();
        for today in [day(2024, 2, 28), day(2024, 2, 29), day(2024, 12, 31)] {
            let normalizer = Normalizer::new(&profile, today);
            let date = normalizer
                .parse_date("Black bin", "Tomorrow")
                .expect("token parses")
                .expect("scheduled");
            assert_eq!(date, today.succ_opt().expect("in range"));
        }
    }

    #[test]
    fn tokens_are_case_and_space_insensitive() {
        let profile = corby_like();
        let today = day(2024, 6, 3);
        let normalizer = Normalizer::new(&profile, today);
        assert_eq!(
            normalizer.parse_date("x", "  today ").expect("parses"),
            Some(today)
        );
        assert_eq!(
            normalizer.parse_date("x", "TOMORROW").expect("parses"),
            Some(day(2024, 6, 4))
        );
    }

    #[test]
    fn null_markers_are_unscheduled() {
        let profile = corby_like();
        let normalizer = Normalizer::new(&profile, day(2024, 6, 3));
        for marker in ["null", "Date: null", "NULL"] {
            let raw = RawEvent::new("Black bin", marker);
            assert_eq!(
                normalizer.normalize(&raw).expect("not an error"),
                Normalized::Unscheduled
            );
        }
    }

    #[test]
    fn layout_dates_parse_after_noise_is_stripped() {
        let profile = corby_like();
        let normalizer = Normalizer::new(&profile, day(2024, 6, 3));
        let raw = RawEvent::new("Green Garden Waste", "Empty Garden 240L Friday, 07 June 2024");
        assert_eq!(
            normalizer.normalize(&raw).expect("parses"),
            Normalized::Resolved(ResolvedEvent {
                kind: BinKind::Green,
                date: day(2024, 6, 7),
            })
        );
    }

    #[test]
    fn relative_tokens_survive_noise() {
        let profile = corby_like();
        let today = day(2024, 6, 6);
        let normalizer = Normalizer::new(&profile, today);
        assert_eq!(
            normalizer
                .parse_date("Green Garden Bin", "Empty Garden 240L Tomorrow")
                .expect("token parses"),
            Some(day(2024, 6, 7))
        );
        assert_eq!(
            normalizer
                .parse_date("Green Garden Bin", "Empty Garden 240L null")
                .expect("not an error"),
            None
        );
    }

    #[test]
    fn unparseable_layout_is_malformed() {
        let profile = corby_like();
        let normalizer = Normalizer::new(&profile, day(2024, 6, 3));
        let err = normalizer
            .normalize(&RawEvent::new("Black bin", "next week sometime"))
            .expect_err("must fail");
        assert!(matches!(err, NormalizeError::MalformedDate { ref label, .. } if label == "Black bin"));
        assert!(
            normalizer
                .normalize(&RawEvent::new("Black bin", "Empty Garden 240L "))
                .is_err()
        );
    }

    #[test]
    fn epoch_millis_are_extracted_from_wrappers() {
        let profile = SourceProfile::new(DateStrategy::EpochMillis);
        let normalizer = Normalizer::new(&profile, day(2024, 6, 3));
        let noon = Utc
            .with_ymd_and_hms(2024, 6, 10, 12, 0, 0)
            .single()
            .expect("valid instant")
            .timestamp_millis();
        let expected = DateTime::from_timestamp_millis(noon)
            .expect("in range")
            .with_timezone(&Local)
            .date_naive();
        for marker in [format!("/Date({noon})/"), format!("/Date({noon}+0100)/")] {
            assert_eq!(
                normalizer.parse_date("Refuse", &marker).expect("parses"),
                Some(expected)
            );
        }
        assert!(normalizer.parse_date("Refuse", "/Date()/").is_err());
    }

    #[test]
    fn unknown_labels_are_kept_and_reported() {
        let profile = SourceProfile::new(DateStrategy::layout("%Y-%m-%d"));
        let normalizer = Normalizer::new(&profile, day(2024, 6, 3));
        let batch = normalizer
            .normalize_all(&[
                RawEvent::new(" Mystery Bin Type ", "2024-06-04"),
                RawEvent::new("Refuse", "null"),
            ])
            .expect("batch parses");
        assert_eq!(
            batch.events,
            vec![ResolvedEvent {
                kind: BinKind::Unknown("mystery bin type".to_owned()),
                date: day(2024, 6, 4),
            }]
        );
        assert_eq!(batch.unscheduled, 1);
        assert_eq!(batch.misses, vec![" Mystery Bin Type ".to_owned()]);
    }
}
