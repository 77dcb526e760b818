//! Core library for the RainCheck weather client.
//!
//! This crate defines:
//! - The `WeatherRecord` model
//! - A WeatherAPI.com client behind the `WeatherClient` trait
//! - Single-slot persistence of the selected city
//! - The search controller that ties them together
//! - Configuration & credentials handling
//!
//! It is used by `raincheck-cli`, but any presentation layer can bind to
//! `SearchController`.

pub mod client;
pub mod config;
pub mod controller;
pub mod model;
pub mod store;

pub use client::{FetchError, WeatherApiClient, WeatherClient};
pub use config::Config;
pub use controller::{SearchController, SearchState, Snapshot};
pub use model::{RecordError, WeatherRecord};
pub use store::{FileSelectionStore, MemorySelectionStore, SelectionStore, StoreError};
