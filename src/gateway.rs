use crate::errors::FetchError;
use crate::models::{CounterSnapshot, EntityCode, Envelope, IncrementReport};
use async_trait::async_trait;
use reqwest::Client;
use std::{collections::BTreeMap, time::Duration};
use tokio::runtime::Handle;
use tracing::{debug, warn};

pub const COUNTRIES_PATH: &str = "/api/v1/countries";

/// Network boundary to the authoritative counter service.
#[async_trait]
pub trait CounterGateway: Send + Sync {
    /// Pulls every entity's current count.
    async fn fetch_snapshot(&self) -> Result<CounterSnapshot, FetchError>;

    /// Tells the service about one click. Returns immediately; delivery is
    /// not awaited and failures are only logged, never surfaced to the caller.
    fn report_increment(&self, entity: &EntityCode);
}

#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    countries_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            countries_url: format!("{}{COUNTRIES_PATH}", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl CounterGateway for HttpGateway {
    async fn fetch_snapshot(&self) -> Result<CounterSnapshot, FetchError> {
        let response = self.client.get(&self.countries_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let envelope: Envelope<BTreeMap<EntityCode, u64>> = response.json().await?;
        if !envelope.success {
            return Err(FetchError::Rejected(envelope.message));
        }
        let counts = envelope
            .data
            .ok_or_else(|| FetchError::Decode("envelope has no data".to_string()))?;

        Ok(CounterSnapshot::from_counts(counts))
    }

    fn report_increment(&self, entity: &EntityCode) {
        let Ok(runtime) = Handle::try_current() else {
            warn!(country_code = %entity, "no runtime available, dropping click report");
            return;
        };

        let client = self.client.clone();
        let url = self.countries_url.clone();
        let report = IncrementReport {
            country_code: entity.clone(),
        };
        // The join handle is dropped on purpose: nobody waits on delivery.
        runtime.spawn(async move {
            match client.post(&url).json(&report).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(country_code = %report.country_code, "click reported");
                }
                Ok(response) => {
                    warn!(
                        country_code = %report.country_code,
                        status = response.status().as_u16(),
                        "click report rejected"
                    );
                }
                Err(err) => {
                    warn!(country_code = %report.country_code, "click report failed: {err}");
                }
            }
        });
    }
}
