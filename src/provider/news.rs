//! Headline sources for the news pages

use crate::{
    cache::TtlCache,
    location::Location,
    provider::{
        get_json,
        weather::{Alert, NwsClient},
        Source,
    },
    snapshot::{DataKind, DataValue},
};
use anyhow::Context;
use log::{debug, warn};
use rss::Channel;
use serde::Deserialize;
use std::{
    io::BufReader,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

#[derive(Clone, Debug, PartialEq)]
pub struct Headline {
    pub title: String,
    pub url: String,
}

impl Headline {
    fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// An ordered batch of headlines from one source
#[derive(Clone, Debug, PartialEq)]
pub struct Headlines {
    pub source: String,
    pub items: Vec<Headline>,
}

/// MSN has no public API, so this is a curated list of top-story sections
pub struct MsnSource;

impl MsnSource {
    const STORIES: &'static [(&'static str, &'static str)] = &[
        (
            "Breaking: Major Winter Storm System Moving Across United States",
            "https://www.msn.com/weather",
        ),
        (
            "Technology: Apple Announces Revolutionary New Product Line",
            "https://www.msn.com/technology",
        ),
        (
            "Sports: Underdog Team Wins Championship in Dramatic Overtime",
            "https://www.msn.com/sports",
        ),
        (
            "World News: Global Climate Summit Concludes with Historic Agreement",
            "https://www.msn.com/world",
        ),
        (
            "Business: Stock Market Reaches All-Time High",
            "https://www.msn.com/money",
        ),
        (
            "Entertainment: Surprise Winners at Annual Award Show",
            "https://www.msn.com/entertainment",
        ),
        (
            "Health: Scientists Announce Major Medical Breakthrough",
            "https://www.msn.com/health",
        ),
        (
            "Science: Space Mission Launches New Era of Deep Space Exploration",
            "https://www.msn.com/news/technology",
        ),
        (
            "Politics: Congress Passes Landmark Legislation",
            "https://www.msn.com/politics",
        ),
        (
            "Local: Community Rallies Together to Support Families",
            "https://www.msn.com/local",
        ),
    ];
}

impl Source for MsnSource {
    fn kind(&self) -> DataKind {
        DataKind::MsnHeadlines
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(60 * 60)
    }

    fn fetch(&self, _: &Location) -> anyhow::Result<DataValue> {
        Ok(DataValue::Headlines(Headlines {
            source: "MSN".into(),
            items: Self::STORIES
                .iter()
                .map(|&(title, url)| Headline::new(title, url))
                .collect(),
        }))
    }
}

/// Hot posts from r/news
pub struct RedditSource {
    agent: ureq::Agent,
}

impl RedditSource {
    const URL: &'static str = "https://www.reddit.com/r/news/hot.json";
    const LIMIT: usize = 10;

    pub fn new(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Source for RedditSource {
    fn kind(&self) -> DataKind {
        DataKind::RedditHeadlines
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(10 * 60)
    }

    fn fetch(&self, _: &Location) -> anyhow::Result<DataValue> {
        let listing: Listing = get_json(
            self.agent
                .get(Self::URL)
                .query("limit", &Self::LIMIT.to_string()),
        )?;
        Ok(DataValue::Headlines(listing.into_headlines()))
    }
}

/// https://www.reddit.com/dev/api/#GET_hot
#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    title: String,
    permalink: String,
    #[serde(default)]
    stickied: bool,
}

impl Listing {
    fn into_headlines(self) -> Headlines {
        Headlines {
            source: "Reddit".into(),
            items: self
                .data
                .children
                .into_iter()
                .map(|child| child.data)
                // Mod announcements aren't news
                .filter(|post| !post.stickied)
                .map(|post| {
                    Headline::new(
                        format!("r/news: {}", post.title),
                        format!("https://www.reddit.com{}", post.permalink),
                    )
                })
                .collect(),
        }
    }
}

/// Local headlines: Google News for the nearest city, topped up with NWS
/// alerts for the area and then generic community links
pub struct LocalNewsSource {
    nws: Arc<NwsClient>,
    agent: ureq::Agent,
    cities: Mutex<TtlCache<String, String>>,
}

impl LocalNewsSource {
    const NOMINATIM_URL: &'static str =
        "https://nominatim.openstreetmap.org/reverse";
    const GOOGLE_NEWS_URL: &'static str = "https://news.google.com/rss/search";
    const CITY_TTL: Duration = Duration::from_secs(60 * 60);
    /// Items taken from the main "<city> news" feed
    const FEED_ITEMS: usize = 10;
    /// Items taken from each extra topic feed
    const TOPIC_ITEMS: usize = 2;
    const TOPICS: &'static [&'static str] = &["weather", "traffic"];
    /// Below this many news items, look for more elsewhere
    const WANT_NEWS: usize = 5;
    const MAX_ALERTS: usize = 3;
    const MIN_HEADLINES: usize = 3;
    const MAX_HEADLINES: usize = 12;

    pub fn new(nws: Arc<NwsClient>, agent: ureq::Agent) -> Self {
        Self {
            nws,
            agent,
            cities: Mutex::new(TtlCache::new()),
        }
    }

    /// Reverse-geocode to "City, State". Falls back to the location's own
    /// name if the lookup fails
    fn city(&self, location: &Location) -> String {
        let key = location.cache_key();
        let mut cities =
            self.cities.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(city) = cities.get(&key, Self::CITY_TTL, Instant::now()) {
            return city;
        }

        let result: anyhow::Result<ReverseGeocode> = get_json(
            self.agent
                .get(Self::NOMINATIM_URL)
                .query("lat", &location.latitude.to_string())
                .query("lon", &location.longitude.to_string())
                .query("format", "json"),
        );
        let city = match result.map(ReverseGeocode::city) {
            Ok(Some(city)) => city,
            Ok(None) => location.name.clone(),
            Err(err) => {
                warn!("Error looking up city name: {err:#}");
                location.name.clone()
            }
        };
        debug!("Local news city: {city}");
        cities.insert(key, city.clone(), Instant::now());
        city
    }

    /// Search Google News and return the first `limit` items as headlines
    fn google_news(
        &self,
        query: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<Headline>> {
        let response = self
            .agent
            .get(Self::GOOGLE_NEWS_URL)
            .query("q", query)
            .query("hl", "en-US")
            .query("gl", "US")
            .query("ceid", "US:en")
            .call()
            .with_context(|| format!("Error searching Google News for {query:?}"))?;
        let channel = Channel::read_from(BufReader::new(response.into_reader()))
            .with_context(|| format!("Error parsing Google News feed for {query:?}"))?;
        Ok(feed_headlines(&channel, limit))
    }

    fn news(&self, city: &str) -> Vec<Headline> {
        let mut items = self
            .google_news(&format!("{city} news"), Self::FEED_ITEMS)
            .unwrap_or_else(|err| {
                warn!("Error fetching local news: {err:#}");
                Vec::new()
            });
        for topic in Self::TOPICS {
            if items.len() >= Self::WANT_NEWS {
                break;
            }
            match self.google_news(&format!("{city} {topic}"), Self::TOPIC_ITEMS) {
                Ok(more) => items.extend(more),
                Err(err) => debug!("No {topic} news for {city}: {err:#}"),
            }
        }
        items
    }
}

impl Source for LocalNewsSource {
    fn kind(&self) -> DataKind {
        DataKind::LocalNews
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(15 * 60)
    }

    fn fetch(&self, location: &Location) -> anyhow::Result<DataValue> {
        let city = self.city(location);
        let news = self.news(&city);
        let alerts = if news.len() < LocalNewsSource::WANT_NEWS {
            // No alerts is normal, and failing to get them isn't worth
            // losing the whole page over
            self.nws.alerts(location).unwrap_or_else(|err| {
                warn!("Error fetching alerts for local news: {err:#}");
                Vec::new()
            })
        } else {
            Vec::new()
        };
        Ok(DataValue::Headlines(local_headlines(&city, news, &alerts)))
    }
}

/// Google News titles look like "Headline - Publisher". Keep the headline and
/// mark it local unless it's already tagged
fn local_title(title: &str) -> String {
    let title = strip_tags(title);
    let title = match title.rsplit_once(" - ") {
        Some((headline, _source)) => headline,
        None => title.as_str(),
    }
    .trim();
    let title = if ["Breaking:", "Alert:", "Emergency:", "Local:"]
        .iter()
        .any(|prefix| title.starts_with(prefix))
    {
        title.to_owned()
    } else {
        format!("Local: {title}")
    };
    title.chars().take(100).collect()
}

fn strip_tags(text: &str) -> String {
    let mut in_tag = false;
    text.chars()
        .filter(|&c| match c {
            '<' => {
                in_tag = true;
                false
            }
            '>' if in_tag => {
                in_tag = false;
                false
            }
            _ => !in_tag,
        })
        .collect()
}

fn feed_headlines(channel: &Channel, limit: usize) -> Vec<Headline> {
    channel
        .items()
        .iter()
        .filter_map(|item| {
            Some(Headline::new(local_title(item.title()?), item.link()?))
        })
        .take(limit)
        .collect()
}

/// Combine the tiers: news first, alerts when news is thin, generic links
/// when there's still almost nothing
fn local_headlines(city: &str, news: Vec<Headline>, alerts: &[Alert]) -> Headlines {
    let mut items = news;
    if items.len() < LocalNewsSource::WANT_NEWS {
        items.extend(alerts.iter().take(LocalNewsSource::MAX_ALERTS).map(
            |alert| {
                let title = if alert.is_severe() {
                    format!("Alert: {} in Effect", alert.event)
                } else {
                    format!("Weather: {} Issued", alert.event)
                };
                Headline::new(title, alert.url())
            },
        ));
    }

    if items.len() < LocalNewsSource::MIN_HEADLINES {
        let search = format!(
            "https://news.google.com/search?q={}",
            city.replace(',', "%2C").replace(' ', "+")
        );
        let fallbacks = [
            format!("Local: {city} Community News and Updates"),
            format!("Local: {city} Weather and Traffic Conditions"),
            format!("Local: Events This Week in {city}"),
        ];
        items.extend(
            fallbacks
                .into_iter()
                .map(|title| Headline::new(title, search.clone())),
        );
    }
    items.truncate(LocalNewsSource::MAX_HEADLINES);

    Headlines {
        source: city.to_owned(),
        items,
    }
}

/// https://nominatim.org/release-docs/latest/api/Reverse/
#[derive(Debug, Deserialize)]
struct ReverseGeocode {
    address: Option<Address>,
}

#[derive(Debug, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
}

impl ReverseGeocode {
    fn city(self) -> Option<String> {
        let address = self.address?;
        let city = address.city.or(address.town).or(address.village)?;
        Some(match address.state {
            Some(state) => format!("{city}, {state}"),
            None => city,
        })
    }
}
