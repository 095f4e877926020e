pub mod aggregator;
pub mod apis;
pub mod classify;
pub mod common;
pub mod config;
pub mod domain;
pub mod filters;
pub mod infra;
pub mod logging;
pub mod metrics;
pub mod window;

pub use aggregator::{fetch_all_competitions, Aggregator, SearchParams};
pub use domain::{Competition, Distance, ServiceKind, SportCode, SportFilter};
