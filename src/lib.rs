//! A WeatherStar 4000 style weather kiosk: rotates through weather and news
//! pages, refreshing data in the background.

pub mod cache;
pub mod config;
pub mod controller;
pub mod location;
pub mod music;
pub mod pages;
pub mod provider;
pub mod refresh;
pub mod settings;
pub mod snapshot;
pub mod surface;
#[cfg(test)]
mod testing;
