//! Fan-out over the provider adapters and merge of their batches.
//!
//! Every active adapter runs as its own task with an overall deadline. A
//! provider that errors, panics or times out contributes nothing; the others
//! are unaffected and `fetch_all` itself never fails.

use crate::apis::default_apis;
use crate::common::constants::{ALL_SERVICES, DEFAULT_LIMIT, DEFAULT_PROVIDER_TIMEOUT_SECS, RELAXED_LIMIT};
use crate::common::types::{CompetitionApi, CompetitionQuery};
use crate::config::AggregatorConfig;
use crate::domain::{Competition, ServiceKind, SportFilter};
use crate::metrics::{FailureKind, ProviderMetrics};
use crate::window::Period;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

/// What the caller asks for.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub city: Option<String>,
    pub sport: Option<SportFilter>,
    pub limit: usize,
    pub period_months: Option<u32>,
    /// One provider name, or `all`/`None` for every provider
    pub service: Option<String>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            city: None,
            sport: None,
            limit: DEFAULT_LIMIT,
            period_months: None,
            service: None,
        }
    }
}

pub struct Aggregator {
    apis: Vec<Arc<dyn CompetitionApi>>,
    provider_timeout: Duration,
    relaxed_limit: usize,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self::with_apis(default_apis())
    }

    /// Adapters must be given in merge priority order.
    pub fn with_apis(apis: Vec<Arc<dyn CompetitionApi>>) -> Self {
        Self {
            apis,
            provider_timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
            relaxed_limit: RELAXED_LIMIT,
        }
    }

    pub fn with_config(mut self, config: &AggregatorConfig) -> Self {
        self.provider_timeout = Duration::from_secs(config.provider_timeout_seconds);
        self.relaxed_limit = config.relaxed_limit;
        self
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// Adapters picked by `selector`, in priority order.
    pub fn select(&self, selector: Option<&str>) -> Vec<Arc<dyn CompetitionApi>> {
        let selector = selector.map(str::trim).filter(|s| !s.is_empty());
        match selector {
            None => self.apis.clone(),
            Some(s) if s.eq_ignore_ascii_case(ALL_SERVICES) => self.apis.clone(),
            Some(s) => match ServiceKind::from_name(s) {
                Some(service) => self
                    .apis
                    .iter()
                    .filter(|api| api.service() == service)
                    .cloned()
                    .collect(),
                None => {
                    warn!("Unknown service '{}', nothing to query", s);
                    Vec::new()
                }
            },
        }
    }

    pub async fn fetch_all(&self, params: &SearchParams) -> Vec<Competition> {
        self.fetch_all_at(params, Utc::now()).await
    }

    /// `fetch_all` with an explicit invocation instant.
    #[instrument(skip(self))]
    pub async fn fetch_all_at(&self, params: &SearchParams, now: DateTime<Utc>) -> Vec<Competition> {
        let active = self.select(params.service.as_deref());
        if active.is_empty() {
            return Vec::new();
        }

        let per_provider_limit = if active.len() == 1 {
            params.limit
        } else {
            self.relaxed_limit.max(params.limit)
        };
        let query = CompetitionQuery::new(now, per_provider_limit)
            .with_city(params.city.clone())
            .with_sport(params.sport)
            .with_period(Period::from_months(params.period_months));

        let handles: Vec<_> = active
            .into_iter()
            .map(|api| {
                let service = api.service();
                let query = query.clone();
                let deadline = self.provider_timeout;
                let handle = tokio::spawn(async move { run_provider(api, query, deadline).await });
                (service, Instant::now(), handle)
            })
            .collect();

        // Awaited in spawn order, which is priority order
        let mut batches = Vec::with_capacity(handles.len());
        for (service, started, handle) in handles {
            match handle.await {
                Ok(batch) => batches.push(batch),
                Err(e) => {
                    error!(service = %service, "Provider task panicked: {}", e);
                    ProviderMetrics::record_failure(service, started.elapsed().as_secs_f64(), FailureKind::Panic);
                }
            }
        }

        let merged = merge_sorted(batches, params.limit);
        info!("Returning {} competitions", merged.len());
        merged
    }
}

async fn run_provider(api: Arc<dyn CompetitionApi>, query: CompetitionQuery, deadline: Duration) -> Vec<Competition> {
    let service = api.service();
    let started = Instant::now();

    match tokio::time::timeout(deadline, api.fetch_competitions(&query)).await {
        Ok(Ok(batch)) => {
            let elapsed = started.elapsed().as_secs_f64();
            info!(service = %service, records = batch.len(), elapsed, "Provider finished");
            ProviderMetrics::record_success(service, elapsed, batch.len());
            batch
        }
        Ok(Err(e)) => {
            error!(service = %service, "Provider failed: {}", e);
            ProviderMetrics::record_failure(service, started.elapsed().as_secs_f64(), FailureKind::Error);
            Vec::new()
        }
        Err(_) => {
            warn!(service = %service, "Provider timed out after {:?}", deadline);
            ProviderMetrics::record_failure(service, started.elapsed().as_secs_f64(), FailureKind::Timeout);
            Vec::new()
        }
    }
}

/// Concatenate batches in the given order, stable sort by start date with
/// undated records last, truncate to `limit`.
pub fn merge_sorted(batches: Vec<Vec<Competition>>, limit: usize) -> Vec<Competition> {
    let mut merged: Vec<Competition> = batches.into_iter().flatten().collect();
    merged.sort_by_key(|c| (c.begin_date.is_none(), c.begin_date));
    merged.truncate(limit);
    merged
}

/// Search every provider (or the one named by `service`) with default
/// aggregator settings.
pub async fn fetch_all_competitions(
    city: Option<String>,
    sport: Option<SportFilter>,
    limit: usize,
    period_months: Option<u32>,
    service: Option<String>,
) -> Vec<Competition> {
    let params = SearchParams {
        city,
        sport,
        limit,
        period_months,
        service,
    };
    Aggregator::new().fetch_all(&params).await
}
