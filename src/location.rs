//! Figuring out where we are. Either the user told us, or we ask an IP
//! geolocation service once per session.

use anyhow::{bail, Context};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, sync::OnceLock, time::Instant};

/// A resolved place that upstream sources are keyed on
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
}

impl Location {
    /// Key for caching fetched data. Four decimals is ~10m, which is plenty
    pub fn cache_key(&self) -> String {
        format!("{:.4},{:.4}", self.latitude, self.longitude)
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({:.4}, {:.4})",
            self.name, self.latitude, self.longitude
        )
    }
}

/// What the user asked for, before resolution
#[derive(Clone, Debug, PartialEq)]
pub enum LocationRequest {
    AutoDetect,
    Manual(Location),
}

/// Resolves [LocationRequest]s. Auto-detection hits the network until it
/// gets an answer (or a definite failure); that result is kept for the whole
/// session.
#[derive(Debug)]
pub struct Locator {
    agent: ureq::Agent,
    default: Location,
    ipapi_url: String,
    ip_api_url: String,
    detected: OnceLock<Location>,
}

impl Locator {
    const IPAPI_URL: &'static str = "https://ipapi.co/json/";
    const IP_API_URL: &'static str = "http://ip-api.com/json/";

    pub fn new(agent: ureq::Agent, default: Location) -> Self {
        Self {
            agent,
            default,
            ipapi_url: Self::IPAPI_URL.into(),
            ip_api_url: Self::IP_API_URL.into(),
            detected: OnceLock::new(),
        }
    }

    /// Build a locator that never touches the network. Auto-detection always
    /// resolves to the given location.
    pub fn fixed(agent: ureq::Agent, location: Location) -> Self {
        let locator = Self::new(agent, location.clone());
        let _ = locator.detected.set(location);
        locator
    }

    /// Point the geolocation services somewhere else
    #[cfg(test)]
    pub(crate) fn with_services(
        agent: ureq::Agent,
        default: Location,
        ipapi_url: &str,
        ip_api_url: &str,
    ) -> Self {
        Self {
            ipapi_url: ipapi_url.into(),
            ip_api_url: ip_api_url.into(),
            ..Self::new(agent, default)
        }
    }

    /// Resolve a request, giving up on auto-detection at `deadline`. Running
    /// out of time yields the default for this call only, so the next refresh
    /// tries again.
    pub fn resolve(&self, request: &LocationRequest, deadline: Instant) -> Location {
        let LocationRequest::Manual(location) = request else {
            return self.detect_once(deadline);
        };
        location.clone()
    }

    fn detect_once(&self, deadline: Instant) -> Location {
        if let Some(location) = self.detected.get() {
            return location.clone();
        }
        let location = match self.detect(deadline) {
            Ok(location) => {
                info!("Location detected: {location}");
                location
            }
            Err(err) if Instant::now() >= deadline => {
                warn!(
                    "Automatic location detection timed out, using default \
                    {} for now: {err:#}",
                    self.default
                );
                return self.default.clone();
            }
            Err(err) => {
                warn!(
                    "Automatic location detection failed, using default {}: \
                    {err:#}",
                    self.default
                );
                self.default.clone()
            }
        };
        self.detected.get_or_init(|| location).clone()
    }

    /// Try each geolocation service in order
    fn detect(&self, deadline: Instant) -> anyhow::Result<Location> {
        info!("Attempting automatic location detection");
        match self.detect_ipapi(deadline) {
            Ok(location) => Ok(location),
            Err(err) => {
                warn!("ipapi.co lookup failed: {err:#}");
                self.detect_ip_api(deadline)
            }
        }
    }

    fn detect_ipapi(&self, deadline: Instant) -> anyhow::Result<Location> {
        let response: IpapiResponse = self
            .request(&self.ipapi_url, deadline)?
            .call()
            .with_context(|| format!("Error fetching {}", self.ipapi_url))?
            .into_json()
            .context("Error parsing ipapi.co response")?;
        response.into_location()
    }

    fn detect_ip_api(&self, deadline: Instant) -> anyhow::Result<Location> {
        let response: IpApiResponse = self
            .request(&self.ip_api_url, deadline)?
            .call()
            .with_context(|| format!("Error fetching {}", self.ip_api_url))?
            .into_json()
            .context("Error parsing ip-api.com response")?;
        response.into_location()
    }

    /// Build a request bounded by whatever time is left
    fn request(&self, url: &str, deadline: Instant) -> anyhow::Result<ureq::Request> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            bail!("No time left to query {url}");
        }
        Ok(self.agent.get(url).timeout(remaining))
    }
}

/// https://ipapi.co/api/#complete-location
#[derive(Debug, Deserialize)]
struct IpapiResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
    city: Option<String>,
    region: Option<String>,
    country_code: Option<String>,
}

impl IpapiResponse {
    fn into_location(self) -> anyhow::Result<Location> {
        us_location(
            self.latitude,
            self.longitude,
            self.city,
            self.region,
            self.country_code,
        )
    }
}

/// https://ip-api.com/docs/api:json
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiResponse {
    status: String,
    lat: Option<f64>,
    lon: Option<f64>,
    city: Option<String>,
    region_name: Option<String>,
    country_code: Option<String>,
}

impl IpApiResponse {
    fn into_location(self) -> anyhow::Result<Location> {
        if self.status != "success" {
            bail!("ip-api.com lookup status: {}", self.status);
        }
        us_location(
            self.lat,
            self.lon,
            self.city,
            self.region_name,
            self.country_code,
        )
    }
}

/// Weather data comes from NWS, which only covers the US, so anything else
/// is rejected
fn us_location(
    latitude: Option<f64>,
    longitude: Option<f64>,
    city: Option<String>,
    region: Option<String>,
    country_code: Option<String>,
) -> anyhow::Result<Location> {
    let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
        bail!("Geolocation response has no coordinates");
    };
    if country_code.as_deref() != Some("US") {
        bail!("Detected location is outside the US ({country_code:?})");
    }
    let city = city.unwrap_or_else(|| "Unknown".into());
    let name = match region {
        Some(region) if !region.is_empty() => format!("{city}, {region}"),
        _ => city,
    };
    Ok(Location {
        latitude,
        longitude,
        name,
    })
}
