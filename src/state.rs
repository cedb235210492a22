use crate::gateway::CounterGateway;
use crate::models::{ClickResponse, EntityCode};
use crate::personal::PersonalCounterStore;
use crate::shared::SharedCounterStore;
use crate::sync::SyncScheduler;
use std::sync::Arc;

/// Composition root: both stores, the remote gateway and the poller.
#[derive(Clone)]
pub struct AppState {
    pub personal: PersonalCounterStore,
    pub shared: SharedCounterStore,
    pub gateway: Arc<dyn CounterGateway>,
    pub scheduler: Arc<SyncScheduler>,
}

impl AppState {
    pub fn new(
        personal: PersonalCounterStore,
        shared: SharedCounterStore,
        gateway: Arc<dyn CounterGateway>,
        scheduler: Arc<SyncScheduler>,
    ) -> Self {
        Self {
            personal,
            shared,
            gateway,
            scheduler,
        }
    }

    /// Applies the click to both stores before anything touches the network,
    /// then fires the report without waiting for it.
    pub fn register_click(&self, entity: &EntityCode) -> ClickResponse {
        let (my_count, my_total) = self.personal.increment(entity);
        let (count, total) = self.shared.increment(entity);
        self.gateway.report_increment(entity);

        ClickResponse {
            country_code: entity.to_string(),
            my_count,
            my_total,
            count,
            total,
        }
    }
}
