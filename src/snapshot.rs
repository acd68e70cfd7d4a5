//! The data that pages are rendered from. A [Snapshot] is immutable; each
//! completed refresh produces a new one via [Snapshot::apply], and the
//! controller swaps it in whole between renders.

use crate::{
    location::Location,
    provider::{
        news::Headlines,
        open_meteo::{AirQuality, History, MarineConditions},
        weather::{Alert, CurrentConditions, Forecast, RadarImage},
    },
};
use chrono::{DateTime, Local};
use indexmap::{IndexMap, IndexSet};
use log::{debug, info};
use serde::Serialize;
use std::{fmt::Display, sync::Arc};

/// A named category of fetched data
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DataKind {
    Current,
    #[serde(rename = "forecast7day")]
    Forecast,
    Hourly,
    #[serde(rename = "radarImage")]
    Radar,
    Alerts,
    AirQuality,
    Marine,
    History,
    MsnHeadlines,
    RedditHeadlines,
    LocalNews,
}

impl DataKind {
    pub const ALL: &'static [Self] = &[
        Self::Current,
        Self::Forecast,
        Self::Hourly,
        Self::Radar,
        Self::Alerts,
        Self::AirQuality,
        Self::Marine,
        Self::History,
        Self::MsnHeadlines,
        Self::RedditHeadlines,
        Self::LocalNews,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Forecast => "forecast7day",
            Self::Hourly => "hourly",
            Self::Radar => "radarImage",
            Self::Alerts => "alerts",
            Self::AirQuality => "airQuality",
            Self::Marine => "marine",
            Self::History => "history",
            Self::MsnHeadlines => "msnHeadlines",
            Self::RedditHeadlines => "redditHeadlines",
            Self::LocalNews => "localNews",
        }
    }
}

impl Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One fetched value. Immutable once built
#[derive(Clone, Debug, PartialEq)]
pub enum DataValue {
    Current(CurrentConditions),
    Forecast(Forecast),
    Hourly(Forecast),
    Radar(RadarImage),
    Alerts(Vec<Alert>),
    AirQuality(AirQuality),
    Marine(MarineConditions),
    History(History),
    Headlines(Headlines),
}

/// Result of one refresh cycle, as produced by the data provider. Kinds that
/// failed transiently are listed in `failures` and have no value here.
#[derive(Clone, Debug)]
pub struct Fetched {
    pub location: Location,
    pub values: IndexMap<DataKind, Arc<DataValue>>,
    /// Kinds in `values` that came out of the cache rather than upstream
    pub cached: IndexSet<DataKind>,
    pub failures: IndexMap<DataKind, String>,
    /// Permanent errors, e.g. the location isn't covered by the provider
    pub out_of_coverage: IndexMap<DataKind, String>,
    pub completed_at: DateTime<Local>,
}

impl Fetched {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            values: IndexMap::new(),
            cached: IndexSet::new(),
            failures: IndexMap::new(),
            out_of_coverage: IndexMap::new(),
            completed_at: Local::now(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    /// Bumped on every apply, so renders can tell snapshots apart
    generation: u64,
    location: Option<Location>,
    /// When a value last came fresh from upstream
    updated_at: Option<DateTime<Local>>,
    values: IndexMap<DataKind, Arc<DataValue>>,
    notices: IndexMap<DataKind, String>,
}

impl Snapshot {
    /// Build the next snapshot from a refresh result. Kinds that failed keep
    /// whatever value they had before (stale is better than nothing).
    pub fn apply(&self, fetched: Fetched) -> Self {
        let mut next = self.clone();
        next.generation += 1;

        // Data for some other place isn't stale, it's wrong
        if self.location.as_ref().map(Location::cache_key)
            != Some(fetched.location.cache_key())
        {
            if self.location.is_some() {
                info!(
                    "Location changed to {}, dropping old data",
                    fetched.location
                );
            }
            next.values.clear();
            next.notices.clear();
        }
        next.location = Some(fetched.location);

        // Cache hits say nothing about whether upstream is reachable
        if fetched
            .values
            .keys()
            .any(|kind| !fetched.cached.contains(kind))
        {
            next.updated_at = Some(fetched.completed_at);
        }
        for (kind, value) in fetched.values {
            next.notices.shift_remove(&kind);
            next.values.insert(kind, value);
        }
        for (kind, notice) in fetched.out_of_coverage {
            next.values.shift_remove(&kind);
            next.notices.insert(kind, notice);
        }
        for (kind, error) in &fetched.failures {
            debug!(
                "Keeping {} value for {kind} after failure: {error}",
                if next.values.contains_key(kind) {
                    "previous"
                } else {
                    "no"
                }
            );
        }
        next
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn updated_at(&self) -> Option<DateTime<Local>> {
        self.updated_at
    }

    pub fn get(&self, kind: DataKind) -> Option<&DataValue> {
        self.values.get(&kind).map(Arc::as_ref)
    }

    pub fn contains(&self, kind: DataKind) -> bool {
        self.values.contains_key(&kind)
    }

    /// Persistent notice for a kind that can't be served for this location
    pub fn notice(&self, kind: DataKind) -> Option<&str> {
        self.notices.get(&kind).map(String::as_str)
    }

    pub fn current(&self) -> Option<&CurrentConditions> {
        match self.get(DataKind::Current)? {
            DataValue::Current(current) => Some(current),
            _ => None,
        }
    }

    pub fn forecast(&self) -> Option<&Forecast> {
        match self.get(DataKind::Forecast)? {
            DataValue::Forecast(forecast) => Some(forecast),
            _ => None,
        }
    }

    pub fn hourly(&self) -> Option<&Forecast> {
        match self.get(DataKind::Hourly)? {
            DataValue::Hourly(forecast) => Some(forecast),
            _ => None,
        }
    }

    pub fn headlines(&self, kind: DataKind) -> Option<&Headlines> {
        match self.get(kind)? {
            DataValue::Headlines(headlines) => Some(headlines),
            _ => None,
        }
    }
}
