// services/triage-dash/src/lib.rs
//
// Terminal dashboard for mass-casualty triage operations

pub mod api;
pub mod app;
pub mod config;
pub mod derive;
pub mod dispatch;
pub mod export;
pub mod form;
pub mod gateway;
pub mod mock;
pub mod notify;
pub mod scheduler;
pub mod store;
pub mod ui;
pub mod view;

pub use dispatch::{Action, Dispatcher};
pub use gateway::{HttpGateway, TriageGateway};
pub use mock::DemoGateway;
pub use store::{RefreshOutcome, Snapshot, StateStore};
