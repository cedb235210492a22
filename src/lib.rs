pub mod app;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod personal;
pub mod shared;
pub mod stats;
pub mod storage;
pub mod sync;
pub mod ui;
pub mod state;

pub use app::router;
pub use config::Config;
pub use gateway::{CounterGateway, HttpGateway};
pub use personal::PersonalCounterStore;
pub use shared::SharedCounterStore;
pub use state::AppState;
pub use sync::{SyncPhase, SyncScheduler};
