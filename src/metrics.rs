//! Provider fetch metrics.
//!
//! The library only emits through the `metrics` facade. Installing a
//! recorder (Prometheus or otherwise) is up to the embedding program; without
//! one every call here is a no-op.

use crate::domain::ServiceKind;

pub const FETCH_TOTAL: &str = "race_finder_provider_fetch_total";
pub const FAILURES_TOTAL: &str = "race_finder_provider_failures_total";
pub const RECORDS_TOTAL: &str = "race_finder_provider_records_total";
pub const FETCH_SECONDS: &str = "race_finder_provider_fetch_seconds";

/// Why a provider contributed nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Error,
    Timeout,
    Panic,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Error => "error",
            FailureKind::Timeout => "timeout",
            FailureKind::Panic => "panic",
        }
    }
}

pub struct ProviderMetrics;

impl ProviderMetrics {
    pub fn record_success(service: ServiceKind, duration_secs: f64, records: usize) {
        ::metrics::counter!(FETCH_TOTAL, "service" => service.as_str()).increment(1);
        ::metrics::counter!(RECORDS_TOTAL, "service" => service.as_str()).increment(records as u64);
        ::metrics::histogram!(FETCH_SECONDS, "service" => service.as_str()).record(duration_secs);
    }

    pub fn record_failure(service: ServiceKind, duration_secs: f64, kind: FailureKind) {
        ::metrics::counter!(FETCH_TOTAL, "service" => service.as_str()).increment(1);
        ::metrics::counter!(
            FAILURES_TOTAL,
            "service" => service.as_str(),
            "kind" => kind.as_str()
        )
        .increment(1);
        ::metrics::histogram!(FETCH_SECONDS, "service" => service.as_str()).record(duration_secs);
    }
}
