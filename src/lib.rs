//! Read-through cache for the Influence game-state search API
//!
//! Callers ask for crews, lots, buildings or ships by id (or for the
//! buildings an address controls) on a given chain. Records still inside
//! their freshness window come from memory; the rest are fetched from the
//! search API together with whatever they depend on, cached, and returned.
//!
//! ```ignore
//! let config = Config::load()?;
//! let service = FetchThroughService::from_config(&config)?;
//! let lots = service
//!     .get_lots(&ChainId::from(SN_MAIN), &[EntityId::parse("10")?])
//!     .await?;
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod names;
pub mod parse;
pub mod resolver;
pub mod service;

pub use cache::{EntityCache, FreshnessWindows};
pub use client::{InfluenceClient, SearchApi, SearchIndex, SearchQuery};
pub use config::{ChainConfig, Config};
pub use error::{Error, Result};
pub use models::{Address, ChainId, EntityId, SN_MAIN, SN_SEPOLIA};
pub use names::{NameDirectory, StaticNameDirectory};
pub use resolver::DependencyResolver;
pub use service::FetchThroughService;
