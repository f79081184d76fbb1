//! Source implementation for Corby's waste collection date service.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use scraper::{ElementRef, Html, Selector};

use binday_core::{
    model::{BinKind, RawEvent, SourceId, SourceMeta},
    ports::{EventSource, PortError},
    rules::{DateStrategy, LabelRule, LabelRules, SourceProfile},
};

// e.g. "Friday, 07 June 2024"
const DATE_FORMAT: &str = "%A, %d %B %Y";

// The service sometimes prints the garden bin capacity in front of the date.
const CAPACITY_NOISE: &str = "Empty Garden 240L ";

/// Collection table lookup for one Corby property.
pub struct CorbySource {
    client: Client,
    meta: SourceMeta,
    profile: SourceProfile,
    page_url: String,
}

impl CorbySource {
    /// Create a source reading the collections table at `page_url`.
    ///
    /// With `green_out_with_blue`, the garden bin is reported whenever the
    /// blue bin is due.
    #[must_use]
    pub fn new(client: Client, page_url: &str, green_out_with_blue: bool) -> Self {
        Self {
            client,
            meta: source_meta(),
            profile: profile(green_out_with_blue),
            page_url: page_url.to_owned(),
        }
    }
}

#[async_trait]
impl EventSource for CorbySource {
    fn meta(&self) -> &SourceMeta {
        &self.meta
    }

    fn profile(&self) -> &SourceProfile {
        &self.profile
    }

    async fn fetch(&self) -> Result<Vec<RawEvent>, PortError> {
        tracing::info!(url = %self.page_url, "reading collection table");
        let body = fetch_text(self.client.get(&self.page_url)).await?;
        let events = parse_table(&body)?;
        for event in &events {
            tracing::debug!(label = %event.label, date = %event.start, "collection row");
        }
        Ok(events)
    }
}

fn source_meta() -> SourceMeta {
    SourceMeta {
        id: SourceId(String::from("corby")),
        name: String::from("Corby"),
    }
}

/// Normalization rules for Corby's labels, dates and capacity noise.
#[must_use]
pub fn profile(green_out_with_blue: bool) -> SourceProfile {
    let profile = SourceProfile::new(DateStrategy::layout(DATE_FORMAT))
        .with_rules(LabelRules::new(
            1,
            vec![
                LabelRule::prefix("Green Garden", BinKind::Green),
                LabelRule::prefix("Brown or Blue", BinKind::Blue),
                LabelRule::prefix("Green Food", BinKind::FoodWaste),
                LabelRule::prefix("Black", BinKind::Black),
            ],
        ))
        .with_noise(CAPACITY_NOISE);

    if green_out_with_blue {
        profile.with_companion(BinKind::Blue, BinKind::Green)
    } else {
        profile
    }
}

fn selector(css: &str) -> Result<Selector, PortError> {
    Selector::parse(css).map_err(|err| PortError::Payload(format!("selector {css}: {err}")))
}

fn first_text(row: ElementRef<'_>, cell: &Selector) -> Option<String> {
    row.select(cell)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_owned())
}

/// Read `(label, date)` pairs from the `#WasteCollections` table.
fn parse_table(html: &str) -> Result<Vec<RawEvent>, PortError> {
    let document = Html::parse_document(html);
    let rows = selector("#WasteCollections tr")?;
    let labels = selector("td:nth-child(2) b")?;
    let dates = selector("td:nth-child(3) h5")?;

    let mut events = Vec::new();
    for (index, row) in document.select(&rows).enumerate() {
        match (first_text(row, &labels), first_text(row, &dates)) {
            (Some(label), Some(date)) => events.push(RawEvent::new(label, date)),
            (None, None) => {}
            (Some(label), None) => {
                return Err(PortError::Payload(format!(
                    "row {index} ({label}): missing date cell"
                )));
            }
            (None, Some(_)) => {
                return Err(PortError::Payload(format!("row {index}: missing label cell")));
            }
        }
    }

    if document.select(&rows).next().is_none() {
        return Err(PortError::Payload("collection table missing".to_owned()));
    }

    Ok(events)
}

// Small helper to fetch a page body with status handling.
async fn fetch_text(req: RequestBuilder) -> Result<String, PortError> {
    req.send()
        .await
        .map_err(PortError::from)?
        .error_for_status()
        .map_err(PortError::from)?
        .text()
        .await
        .map_err(PortError::from)
}
