use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;

use binday_core::{
    ports::{EventSource, Notifier},
    service::{BinService, SourceProvider},
};
use binday_notify::{PushoverNotifier, StdoutNotifier};
use binday_provider_corby::CorbySource;
use binday_provider_feed::FeedSource;
use binday_provider_salford::SalfordSource;

use crate::config::{Config, NotifierConfig, ProviderConfig};

pub(crate) fn http_client(config: &Config) -> Result<Client> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .context("Failed to build HTTP client")
}

pub(crate) fn source(config: &ProviderConfig, client: Client) -> Arc<dyn EventSource> {
    match config {
        ProviderConfig::Salford {
            house_number,
            postcode,
        } => Arc::new(SalfordSource::new(client, *house_number, postcode)),
        ProviderConfig::Corby {
            page_url,
            green_out_with_blue,
        } => Arc::new(CorbySource::new(client, page_url, *green_out_with_blue)),
        ProviderConfig::Feed {
            id,
            name,
            url,
            profile,
        } => Arc::new(FeedSource::new(
            client,
            FeedSource::meta_for(id, name.as_deref()),
            url,
            profile.clone(),
        )),
    }
}

pub(crate) fn notifier(config: &NotifierConfig, client: Client) -> Arc<dyn Notifier> {
    match config {
        NotifierConfig::Stdout => Arc::new(StdoutNotifier::new()),
        NotifierConfig::Pushover {
            api_token,
            users,
            priority,
        } => Arc::new(PushoverNotifier::new(client, api_token, users.clone()).with_priority(*priority)),
    }
}

/// Wire the configured source and channel into a service.
pub(crate) fn service(config: &Config) -> Result<BinService> {
    let client = http_client(config)?;
    let provider = Arc::new(SourceProvider::new(source(&config.provider, client.clone())));
    Ok(BinService::new(provider, notifier(&config.notifier, client)))
}
