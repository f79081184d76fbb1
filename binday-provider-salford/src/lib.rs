//! Source implementation for Salford City Council's bin collection pages.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CACHE_CONTROL, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use scraper::{ElementRef, Html, Selector};

use binday_core::{
    model::{BinKind, RawEvent, SourceId, SourceMeta},
    ports::{EventSource, PortError},
    rules::{DateStrategy, LabelRule, LabelRules, SourceProfile},
};

const BASE_URL: &str = "https://www.salford.gov.uk";
const SEARCH_PATH: &str = "/bins-and-recycling/bin-collection-days";
// e.g. "Tuesday 4 June 2024"
const DATE_FORMAT: &str = "%A %e %B %Y";
// The council site turns away non-browser agents.
const BROWSER_AGENT: &str = "Mozilla/5.0 (X11; Fedora; Linux x86_64) AppleWebKit/537.36 \
                             (KHTML, like Gecko) Chrome/86.0.4240.111 Safari/537.36";

/// Bin collection lookup for one Salford property.
pub struct SalfordSource {
    client: Client,
    meta: SourceMeta,
    profile: SourceProfile,
    house_number: u32,
    postcode: String,
}

impl SalfordSource {
    /// Create a source for the given house number and postcode.
    #[must_use]
    pub fn new(client: Client, house_number: u32, postcode: &str) -> Self {
        Self {
            client,
            meta: source_meta(),
            profile: profile(),
            house_number,
            postcode: postcode.trim().to_uppercase(),
        }
    }

    async fn property_link(&self) -> Result<String, PortError> {
        let req = self
            .client
            .post(format!("{BASE_URL}{SEARCH_PATH}"))
            .headers(browser_headers())
            .form(&[("prop", self.postcode.as_str())]);
        let body = fetch_text(req).await?;

        let href = find_property_link(&body, self.house_number)?.ok_or_else(|| {
            PortError::PropertyNotFound(format!(
                "house {} at {}",
                self.house_number, self.postcode
            ))
        })?;
        tracing::debug!(
            %href,
            house_number = self.house_number,
            postcode = %self.postcode,
            "found property link"
        );
        Ok(href)
    }
}

#[async_trait]
impl EventSource for SalfordSource {
    fn meta(&self) -> &SourceMeta {
        &self.meta
    }

    fn profile(&self) -> &SourceProfile {
        &self.profile
    }

    async fn fetch(&self) -> Result<Vec<RawEvent>, PortError> {
        let href = self.property_link().await?;
        let body = fetch_text(
            self.client
                .get(format!("{BASE_URL}{href}"))
                .headers(browser_headers()),
        )
        .await?;
        parse_collections(&body)
    }
}

fn source_meta() -> SourceMeta {
    SourceMeta {
        id: SourceId(String::from("salford")),
        name: String::from("Salford City Council"),
    }
}

/// Normalization rules for Salford's labels and date layout.
#[must_use]
pub fn profile() -> SourceProfile {
    SourceProfile::new(DateStrategy::layout(DATE_FORMAT)).with_rules(LabelRules::new(
        1,
        vec![
            LabelRule::prefix("black", BinKind::Black),
            LabelRule::prefix("blue", BinKind::Blue),
            LabelRule::prefix("brown", BinKind::Green),
            LabelRule::prefix("pink", BinKind::Pink),
        ],
    ))
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_AGENT));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert("dnt", HeaderValue::from_static("1"));
    headers
}

fn selector(css: &str) -> Result<Selector, PortError> {
    Selector::parse(css).map_err(|err| PortError::Payload(format!("selector {css}: {err}")))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}

/// Find the link of the property whose text starts with `"<house_number> "`.
fn find_property_link(html: &str, house_number: u32) -> Result<Option<String>, PortError> {
    let document = Html::parse_document(html);
    let links = selector("ul.properties li a")?;
    let wanted = format!("{house_number} ");

    Ok(document
        .select(&links)
        .find(|link| element_text(*link).starts_with(&wanted))
        .and_then(|link| link.value().attr("href"))
        .map(str::to_owned))
}

/// Extract one raw event per listed date from a property page.
fn parse_collections(html: &str) -> Result<Vec<RawEvent>, PortError> {
    let document = Html::parse_document(html);
    let blocks = selector("div[class=clearfix] div div")?;
    let headings = selector("strong")?;
    let dates = selector("ul li")?;

    let mut events = Vec::new();

    for block in document.select(&blocks) {
        let label = match block.value().attr("class") {
            Some("black") => "Black bin",
            Some("pink") => "Pink bin",
            Some("bluebrown") => {
                let heading = block.select(&headings).next().map(element_text);
                match heading.as_deref() {
                    Some("Blue bins:") => "Blue bin",
                    Some("Brown bins:") => "Brown bin",
                    other => {
                        tracing::warn!(heading = ?other, "skipping unrecognised bluebrown block");
                        continue;
                    }
                }
            }
            _ => continue,
        };

        events.extend(
            block
                .select(&dates)
                .map(element_text)
                .filter(|text| !text.is_empty())
                .map(|text| RawEvent::new(label, text)),
        );
    }

    if events.is_empty() {
        tracing::warn!("no collection dates found on property page");
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

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use binday_core::service::resolve;
    use binday_core::{CollectionResult, DueSet};

    const SEARCH_PAGE: &str = r#"
        <html><body>
          <ul class="properties">
            <li><a href="/bins/uprn/100">10 Acacia Avenue, Salford</a></li>
            <li><a href="/bins/uprn/101">1 Acacia Avenue, Salford</a></li>
          </ul>
        </body></html>"#;

    const PROPERTY_PAGE: &str = r#"
        <html><body>
          <div class="clearfix">
            <div>
              <div class="black"><strong>Black bin:</strong>
                <ul><li>Tuesday 4 June 2024</li><li>Tuesday 18 June 2024</li></ul>
              </div>
              <div class="bluebrown"><strong>Blue bins:</strong>
                <ul><li>Tuesday 11 June 2024</li></ul>
              </div>
              <div class="bluebrown"><strong>Brown bins:</strong>
                <ul><li>Tuesday 4 June 2024</li></ul>
              </div>
              <div class="pink"><strong>Pink bin:</strong>
                <ul><li>Tuesday 25 June 2024</li></ul>
              </div>
            </div>
          </div>
        </body></html>"#;

    #[test]
    fn property_link_matches_whole_house_number() {
        assert_eq!(
            find_property_link(SEARCH_PAGE, 1).expect("parses"),
            Some("/bins/uprn/101".to_owned())
        );
        assert_eq!(
            find_property_link(SEARCH_PAGE, 10).expect("parses"),
            Some("/bins/uprn/100".to_owned())
        );
        assert_eq!(find_property_link(SEARCH_PAGE, 7).expect("parses"), None);
    }

    #[test]
    fn property_page_lists_every_date() {
        let events = parse_collections(PROPERTY_PAGE).expect("parses");
        assert_eq!(events.len(), 5);
        assert!(events.contains(&RawEvent::new("Brown bin", "Tuesday 4 June 2024")));
        assert!(events.contains(&RawEvent::new("Pink bin", "Tuesday 25 June 2024")));
    }

    #[test]
    fn unrecognised_bluebrown_heading_is_skipped() {
        let page = r#"
            <div class="clearfix"><div>
              <div class="bluebrown"><strong>Glass bins:</strong>
                <ul><li>Tuesday 4 June 2024</li></ul>
              </div>
              <div class="black"><strong>Black bin:</strong>
                <ul><li>Tuesday 11 June 2024</li></ul>
              </div>
            </div></div>"#;
        let events = parse_collections(page).expect("parses");
        assert_eq!(events, vec![RawEvent::new("Black bin", "Tuesday 11 June 2024")]);
    }

    #[test]
    fn requests_look_like_a_browser() {
        let headers = browser_headers();
        let agent = headers
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .expect("user agent set");
        assert!(agent.starts_with("Mozilla/5.0"));
        assert!(!agent.contains("  "));
    }

    #[test]
    fn property_page_resolves_against_profile() {
        let events = parse_collections(PROPERTY_PAGE).expect("parses");
        let today = NaiveDate::from_ymd_opt(2024, 6, 3).expect("valid date");
        let result = resolve(&source_meta().id, &profile(), &events, today).expect("resolves");
        let expected = DueSet::new([BinKind::Black, BinKind::Green].into_iter().collect())
            .expect("non-empty");
        assert_eq!(result, CollectionResult::Due(expected));
    }
}
