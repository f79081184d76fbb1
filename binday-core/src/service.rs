//! Resolution pipeline and the service facade that dispatches its result.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};

use crate::matcher::{due_on, with_companions};
use crate::model::{CollectionResult, DueSet, RawEvent, SourceId};
use crate::normalize::Normalizer;
use crate::ports::{DispatchError, EventSource, Notifier, Provider, ResolveError};
use crate::rules::SourceProfile;
use crate::window::next_collection;

/// Run the pure part of the pipeline over already fetched events.
///
/// The window starts at the target day: a collection dated today is already
/// under way and can no longer be put out for tomorrow.
///
/// # Errors
///
/// Returns [`ResolveError::EmptyUpstreamData`] for an empty batch and
/// [`ResolveError::Normalize`] for the first undecodable date.
pub fn resolve(
    source: &SourceId,
    profile: &SourceProfile,
    raw_events: &[RawEvent],
    today: NaiveDate,
) -> Result<CollectionResult, ResolveError> {
    if raw_events.is_empty() {
        return Err(ResolveError::EmptyUpstreamData {
            provider: source.clone(),
        });
    }

    let target = today
        .checked_add_days(Days::new(1))
        .ok_or(ResolveError::TargetOutOfRange(today))?;

    let normalization = Normalizer::new(profile, today).normalize_all(raw_events)?;
    tracing::debug!(
        source = %source,
        rules_version = profile.rules.version,
        resolved = normalization.events.len(),
        unscheduled = normalization.unscheduled,
        misses = normalization.misses.len(),
        "normalized events"
    );

    let window = next_collection(&normalization.events, target);
    let result = with_companions(due_on(&window, target), &profile.companions);

    match &result {
        CollectionResult::Due(due) => {
            tracing::info!(source = %source, %target, bins = %due.summary(), "bins due");
        }
        CollectionResult::NoneDueToday => {
            tracing::info!(source = %source, %target, "no bins due");
        }
    }

    Ok(result)
}

/// Provider backed by any [`EventSource`].
pub struct SourceProvider {
    source: Arc<dyn EventSource>,
}

impl SourceProvider {
    /// Wrap a source so it can be resolved.
    #[must_use]
    pub fn new(source: Arc<dyn EventSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Provider for SourceProvider {
    fn id(&self) -> &SourceId {
        &self.source.meta().id
    }

    async fn bins(&self, today: NaiveDate) -> Result<CollectionResult, ResolveError> {
        let meta = self.source.meta();
        tracing::info!(source = %meta.id, name = %meta.name, "fetching collection events");
        let raw_events = self.source.fetch().await?;
        tracing::info!(source = %meta.id, count = raw_events.len(), "retrieved collection events");
        resolve(&meta.id, self.source.profile(), &raw_events, today)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Pipeline stage a failure belongs to.
pub enum Stage {
    /// Talking to the source.
    Fetch,
    /// Decoding dates.
    Normalize,
    /// Filtering and matching.
    Resolve,
    /// Sending the notification.
    Dispatch,
}

impl fmt::Display for Stage {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Normalize => "normalize",
            Stage::Resolve => "resolve",
            Stage::Dispatch => "dispatch",
        };
        formatter.write_str(name)
    }
}

#[derive(thiserror::Error, Debug)]
/// Terminal failure of one invocation.
pub enum RunError {
    /// Resolution failed.
    #[error("{0}")]
    Resolve(#[from] ResolveError),
    /// The notifier failed.
    #[error("{notifier}: {source}")]
    Dispatch {
        /// Channel that failed.
        notifier: String,
        /// Underlying channel error.
        source: DispatchError,
    },
}

impl RunError {
    /// Stage the failure happened in.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            RunError::Resolve(ResolveError::Fetch(_) | ResolveError::EmptyUpstreamData { .. }) => {
                Stage::Fetch
            }
            RunError::Resolve(ResolveError::Normalize(_)) => Stage::Normalize,
            RunError::Resolve(ResolveError::TargetOutOfRange(_)) => Stage::Resolve,
            RunError::Dispatch { .. } => Stage::Dispatch,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Successful end states of an invocation.
pub enum Outcome {
    /// The notifier accepted the due set.
    Dispatched(DueSet),
    /// Nothing is due; the notifier was not called.
    NothingDue,
}

/// Public entry point wiring one provider to one notifier.
pub struct BinService {
    provider: Arc<dyn Provider>,
    notifier: Arc<dyn Notifier>,
}

impl BinService {
    /// Create a new service bound to the selected provider and notifier.
    #[must_use]
    pub fn new(provider: Arc<dyn Provider>, notifier: Arc<dyn Notifier>) -> Self {
        Self { provider, notifier }
    }

    /// Resolve without dispatching.
    ///
    /// # Errors
    ///
    /// Returns a [`RunError`] when resolution fails.
    pub async fn check(&self, today: NaiveDate) -> Result<CollectionResult, RunError> {
        Ok(self.provider.bins(today).await?)
    }

    /// Resolve and, when anything is due, dispatch it.
    ///
    /// # Errors
    ///
    /// Returns a [`RunError`] naming the failed stage.
    pub async fn run(&self, today: NaiveDate) -> Result<Outcome, RunError> {
        let due = match self.check(today).await? {
            CollectionResult::Due(due) => due,
            CollectionResult::NoneDueToday => return Ok(Outcome::NothingDue),
        };

        let summary = due.summary();
        self.notifier
            .notify(&due, &summary)
            .await
            .map_err(|source| RunError::Dispatch {
                notifier: self.notifier.name().to_owned(),
                source,
            })?;
        tracing::info!(
            provider = %self.provider.id(),
            notifier = self.notifier.name(),
            "notification dispatched"
        );
        Ok(Outcome::Dispatched(due))
    }
}
