//! A "source" is one upstream API that produces one kind of data. The
//! [DataProvider] fans a refresh out across all sources, caches what comes
//! back, and reports per-kind outcomes. Each source has a submodule.

pub mod news;
pub mod open_meteo;
pub mod weather;

use crate::{
    cache::TtlCache,
    config::Config,
    location::{Location, LocationRequest, Locator},
    snapshot::{DataKind, DataValue, Fetched},
};
use anyhow::Context;
use chrono::Local;
use indexmap::{IndexMap, IndexSet};
use log::{debug, error, info, trace, warn};
use serde::de::DeserializeOwned;
use std::{
    fmt::{self, Display},
    sync::{
        mpsc::{self, RecvTimeoutError},
        Arc, Mutex, PoisonError,
    },
    thread,
    time::{Duration, Instant},
};

/// One upstream API for one kind of data.
///
/// Sources are called from background threads, so they must be [Send] and
/// [Sync]. A fetch may block for as long as it likes; the provider stops
/// waiting once the refresh timeout passes.
pub trait Source: Send + Sync {
    fn kind(&self) -> DataKind;

    /// How long a fetched value stays fresh in the provider's cache
    fn ttl(&self) -> Duration;

    fn fetch(&self, location: &Location) -> anyhow::Result<DataValue>;
}

/// Attach this to a fetch error when the location will *never* be served by
/// the source (e.g. NWS outside the US). Retrying won't help, so the page
/// shows a persistent notice instead of stale data.
#[derive(Debug)]
pub struct OutOfCoverage(pub String);

impl Display for OutOfCoverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for OutOfCoverage {}

/// Best-effort fetching of every registered data kind
pub struct DataProvider {
    locator: Locator,
    sources: IndexMap<DataKind, Arc<dyn Source>>,
    /// Keyed by location + kind
    cache: Mutex<TtlCache<(String, DataKind), Arc<DataValue>>>,
    timeout: Duration,
}

impl DataProvider {
    /// Nothing we cache lives longer than this
    const MAX_TTL: Duration = Duration::from_secs(6 * 60 * 60);

    pub fn new(locator: Locator, timeout: Duration) -> Self {
        Self {
            locator,
            sources: IndexMap::new(),
            cache: Mutex::new(TtlCache::new()),
            timeout,
        }
    }

    /// Register a source. A later source for the same kind replaces the
    /// earlier one
    pub fn with_source(mut self, source: impl Source + 'static) -> Self {
        self.sources.insert(source.kind(), Arc::new(source));
        self
    }

    /// Register every real upstream source that applies to this install
    pub fn from_config(config: &Config) -> Self {
        let agent = http_agent(config);
        let nws = Arc::new(weather::NwsClient::new(agent.clone()));
        let mut provider = Self::new(
            Locator::new(agent.clone(), config.default_location.clone()),
            config.fetch_timeout(),
        )
        .with_source(weather::CurrentSource::new(Arc::clone(&nws)))
        .with_source(weather::ForecastSource::new(Arc::clone(&nws)))
        .with_source(weather::HourlySource::new(Arc::clone(&nws)))
        .with_source(weather::AlertsSource::new(Arc::clone(&nws)))
        .with_source(weather::RadarSource::new(Arc::clone(&nws)))
        .with_source(open_meteo::AirQualitySource::new(agent.clone()))
        .with_source(open_meteo::HistorySource::new(agent.clone()))
        .with_source(news::MsnSource)
        .with_source(news::RedditSource::new(agent.clone()))
        .with_source(news::LocalNewsSource::new(Arc::clone(&nws), agent.clone()));
        if config.coastal {
            provider =
                provider.with_source(open_meteo::MarineSource::new(agent));
        }
        info!(
            "Registered data kinds: {}",
            itertools::join(provider.sources.keys(), ", ")
        );
        provider
    }

    /// Every kind that has a registered source
    pub fn kinds(&self) -> IndexSet<DataKind> {
        self.sources.keys().copied().collect()
    }

    /// Produce fresh data for the requested kinds. Kinds still cached are
    /// served from the cache; everything else is fetched concurrently, one
    /// thread per kind. Whatever hasn't come back by the timeout counts as
    /// failed for this cycle.
    pub fn refresh(
        &self,
        request: &LocationRequest,
        kinds: &IndexSet<DataKind>,
    ) -> Fetched {
        let started = Instant::now();
        // Finding the location counts against the same deadline as fetching
        let deadline = started + self.timeout;
        let location = self.locator.resolve(request, deadline);
        let location_key = location.cache_key();
        let mut fetched = Fetched::new(location.clone());
        let mut pending: IndexSet<DataKind> = IndexSet::new();
        let (sender, receiver) = mpsc::channel();

        {
            let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            for (&kind, source) in &self.sources {
                if !kinds.contains(&kind) {
                    continue;
                }
                if let Some(value) =
                    cache.get(&(location_key.clone(), kind), source.ttl(), started)
                {
                    trace!("Serving {kind} from cache");
                    fetched.values.insert(kind, value);
                    fetched.cached.insert(kind);
                    continue;
                }

                let source = Arc::clone(source);
                let location = location.clone();
                let sender = sender.clone();
                let spawned = thread::Builder::new()
                    .name(format!("fetch-{kind}"))
                    .spawn(move || {
                        debug!("Fetching {kind}");
                        // If the refresh already gave up on us, nobody's
                        // listening and that's fine
                        let _ = sender.send((kind, source.fetch(&location)));
                    });
                match spawned {
                    Ok(_) => {
                        pending.insert(kind);
                    }
                    Err(err) => {
                        error!("Error spawning fetch for {kind}: {err}");
                        fetched.failures.insert(kind, err.to_string());
                    }
                }
            }
        }
        drop(sender);

        let mut timed_out = false;
        while !pending.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match receiver.recv_timeout(remaining) {
                Ok((kind, result)) => {
                    pending.shift_remove(&kind);
                    self.record(&location_key, kind, result, &mut fetched);
                }
                Err(RecvTimeoutError::Timeout) => {
                    timed_out = true;
                    break;
                }
                // Every fetch thread is gone, so the rest must have panicked
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        for kind in pending {
            let reason = if timed_out {
                format!("Timed out after {:?}", self.timeout)
            } else {
                "Fetch thread died".to_owned()
            };
            warn!("Error fetching {kind}: {reason}");
            fetched.failures.insert(kind, reason);
        }

        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .purge(Instant::now(), Self::MAX_TTL);
        fetched.completed_at = Local::now();
        info!(
            "Refresh for {} done in {:?}: {} ok ({} cached), {} failed, \
            {} unsupported",
            fetched.location,
            started.elapsed(),
            fetched.values.len(),
            fetched.cached.len(),
            fetched.failures.len(),
            fetched.out_of_coverage.len(),
        );
        fetched
    }

    /// Sort a single fetch result into the right bucket
    fn record(
        &self,
        location_key: &str,
        kind: DataKind,
        result: anyhow::Result<DataValue>,
        fetched: &mut Fetched,
    ) {
        match result {
            Ok(value) => {
                let value = Arc::new(value);
                self.cache
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(
                        (location_key.to_owned(), kind),
                        Arc::clone(&value),
                        Instant::now(),
                    );
                fetched.values.insert(kind, value);
            }
            Err(err) => {
                if let Some(out_of_coverage) = err.downcast_ref::<OutOfCoverage>() {
                    warn!("{kind} unavailable for this location: {out_of_coverage}");
                    fetched
                        .out_of_coverage
                        .insert(kind, out_of_coverage.to_string());
                } else {
                    warn!("Error fetching {kind}: {err:#}");
                    fetched.failures.insert(kind, format!("{err:#}"));
                }
            }
        }
    }
}

/// Shared HTTP agent. The timeout here is a backstop; the provider's own
/// deadline is what the rest of the app sees
pub fn http_agent(config: &Config) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .user_agent(&config.user_agent)
        .timeout(config.fetch_timeout())
        .build()
}

/// Send a request and parse the response body as JSON
pub(crate) fn get_json<T: DeserializeOwned>(
    request: ureq::Request,
) -> anyhow::Result<T> {
    let url = request.url().to_owned();
    request
        .call()
        .with_context(|| format!("Error fetching {url}"))?
        .into_json()
        .with_context(|| format!("Error parsing response from {url} as JSON"))
}
