//! Traits describing source and notifier capabilities, plus their errors.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Error as ReqwestError;

use crate::model::{CollectionResult, DueSet, RawEvent, SourceId, SourceMeta};
use crate::normalize::NormalizeError;
use crate::rules::SourceProfile;

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to a council backend.
pub enum PortError {
    /// Network layer failed.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// The upstream payload did not have the expected shape.
    #[error("Unexpected payload: {0}")]
    Payload(String),
    /// The configured property could not be found.
    #[error("Property not found: {0}")]
    PropertyNotFound(String),
}

#[derive(thiserror::Error, Debug)]
/// Errors that stop a source from producing a collection result.
pub enum ResolveError {
    /// Fetching raw events failed.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] PortError),
    /// A raw event carried an undecodable date.
    #[error("{0}")]
    Normalize(#[from] NormalizeError),
    /// The source answered with no events at all.
    #[error("Source {provider} returned no collection events")]
    EmptyUpstreamData {
        /// Source that returned nothing.
        provider: SourceId,
    },
    /// The captured day has no successor.
    #[error("No target day after {0}")]
    TargetOutOfRange(NaiveDate),
}

#[derive(thiserror::Error, Debug)]
/// Errors reported by notification channels.
pub enum DispatchError {
    /// Transport failed before a response arrived.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// Channel rejected the request.
    #[error("Rejected with status {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body for diagnostics.
        body: String,
    },
    /// Channel reported a temporary failure; not retried.
    #[error("Temporarily unavailable (status {0}), not retrying")]
    Unavailable(u16),
    /// Channel answered but did not confirm delivery.
    #[error("Delivery not confirmed: {0}")]
    Unconfirmed(String),
    /// Local output could not be written.
    #[error("Output error: {0}")]
    Output(String),
}

#[async_trait]
/// A council backend that yields raw collection events for one property.
pub trait EventSource: Send + Sync {
    /// Metadata describing the source.
    fn meta(&self) -> &SourceMeta;

    /// Rules used to normalize this source's events.
    fn profile(&self) -> &SourceProfile;

    /// Fetch the raw schedule for the configured property.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails or the payload is malformed.
    async fn fetch(&self) -> Result<Vec<RawEvent>, PortError>;
}

#[async_trait]
/// Resolves which bins go out for the day after `today`.
pub trait Provider: Send + Sync {
    /// Identifier used in logs and errors.
    fn id(&self) -> &SourceId;

    /// Resolve the bins due on the day after `today`.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolveError`] when fetching or normalizing fails, or when
    /// the source returned no events at all.
    async fn bins(&self, today: NaiveDate) -> Result<CollectionResult, ResolveError>;
}

#[async_trait]
/// Channel that tells the household which bins to put out.
pub trait Notifier: Send + Sync {
    /// Channel name used in logs.
    fn name(&self) -> &str;

    /// Deliver the due set and its pre-formatted summary.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] when the channel fails; callers do not retry.
    async fn notify(&self, due: &DueSet, summary: &str) -> Result<(), DispatchError>;
}
