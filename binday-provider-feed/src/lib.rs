//! Generic source for councils that publish their schedule as a JSON feed.
//!
//! The feed is an array of `{ "label": ..., "start": ..., "end": ... }`
//! objects. Everything council-specific lives in the [`SourceProfile`], so a
//! new council of this shape only needs configuration.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use binday_core::{
    model::{RawEvent, SourceId, SourceMeta},
    ports::{EventSource, PortError},
    rules::SourceProfile,
};

/// Single entry of the feed.
#[derive(Debug, Deserialize)]
struct FeedEntry {
    #[serde(alias = "type", alias = "service")]
    label: String,
    #[serde(alias = "date", alias = "collectionDate")]
    start: String,
    #[serde(default)]
    end: Option<String>,
}

impl From<FeedEntry> for RawEvent {
    fn from(entry: FeedEntry) -> Self {
        RawEvent {
            label: entry.label,
            start: entry.start,
            end: entry.end,
        }
    }
}

/// Feed-backed source with a configured profile.
pub struct FeedSource {
    client: Client,
    meta: SourceMeta,
    profile: SourceProfile,
    url: String,
}

impl FeedSource {
    /// Create a source reading `url` and normalizing with `profile`.
    #[must_use]
    pub fn new(client: Client, meta: SourceMeta, url: &str, profile: SourceProfile) -> Self {
        Self {
            client,
            meta,
            profile,
            url: url.to_owned(),
        }
    }

    /// Metadata for a feed configured under `id`.
    #[must_use]
    pub fn meta_for(id: &str, name: Option<&str>) -> SourceMeta {
        SourceMeta {
            id: SourceId(id.to_owned()),
            name: name.unwrap_or(id).to_owned(),
        }
    }
}

#[async_trait]
impl EventSource for FeedSource {
    fn meta(&self) -> &SourceMeta {
        &self.meta
    }

    fn profile(&self) -> &SourceProfile {
        &self.profile
    }

    async fn fetch(&self) -> Result<Vec<RawEvent>, PortError> {
        let entries = fetch_json::<Vec<FeedEntry>>(self.client.get(&self.url)).await?;
        Ok(entries.into_iter().map(RawEvent::from).collect())
    }
}

// Small helper to fetch and decode JSON with status handling.
async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, PortError> {
    req.send()
        .await
        .map_err(PortError::from)?
        .error_for_status()
        .map_err(PortError::from)?
        .json()
        .await
        .map_err(PortError::from)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Local, TimeZone, Utc};

    use super::*;
    use binday_core::rules::DateStrategy;
    use binday_core::service::resolve;
    use binday_core::{BinKind, CollectionResult, DueSet};

    fn noon_millis(year: i32, month: u32, dom: u32) -> i64 {
        Utc.with_ymd_and_hms(year, month, dom, 12, 0, 0)
            .single()
            .expect("valid instant")
            .timestamp_millis()
    }

    #[test]
    fn entries_accept_common_field_names() {
        let json = r#"[
            {"label": "Refuse", "start": "/Date(1)/"},
            {"type": "Recycling", "date": "/Date(2)/", "end": "/Date(3)/"},
            {"service": "Garden", "collectionDate": "/Date(4)/"}
        ]"#;
        let events = serde_json::from_str::<Vec<FeedEntry>>(json)
            .expect("valid feed")
            .into_iter()
            .map(RawEvent::from)
            .collect::<Vec<_>>();
        assert_eq!(
            events,
            vec![
                RawEvent::new("Refuse", "/Date(1)/"),
                RawEvent {
                    label: "Recycling".to_owned(),
                    start: "/Date(2)/".to_owned(),
                    end: Some("/Date(3)/".to_owned()),
                },
                RawEvent::new("Garden", "/Date(4)/"),
            ]
        );
    }

    #[test]
    fn epoch_feed_resolves() {
        let tomorrow_millis = noon_millis(2024, 6, 4);
        let tomorrow = DateTime::from_timestamp_millis(tomorrow_millis)
            .expect("in range")
            .with_timezone(&Local)
            .date_naive();
        let today = tomorrow.pred_opt().expect("in range");
        let json = format!(
            r#"[
                {{"label": "General Waste", "start": "/Date({tomorrow_millis})/"}},
                {{"label": "Food Waste", "start": "/Date({tomorrow_millis}+0100)/"}},
                {{"label": "Garden Waste", "start": "/Date({})/"}}
            ]"#,
            noon_millis(2024, 6, 11)
        );
        let events = serde_json::from_str::<Vec<FeedEntry>>(&json)
            .expect("valid feed")
            .into_iter()
            .map(RawEvent::from)
            .collect::<Vec<_>>();
        let meta = FeedSource::meta_for("feed", None);
        let profile = SourceProfile::new(DateStrategy::EpochMillis);

        let result = resolve(&meta.id, &profile, &events, today).expect("resolves");
        let expected = DueSet::new([BinKind::Black, BinKind::FoodWaste].into_iter().collect())
            .expect("non-empty");
        assert_eq!(result, CollectionResult::Due(expected));
    }
}
