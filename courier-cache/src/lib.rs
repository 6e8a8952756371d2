//! Response cache storage for the Courier HTTP client.
//!
//! Provides the [`CacheStore`] contract used by the client's cache
//! middleware and [`InMemoryCache`], a process-local backend with lazy
//! expiration.
//!
//! # Examples
//!
//! ```
//! use courier_cache::{CacheStore, InMemoryCache};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let cache = InMemoryCache::new();
//! cache.set("greeting", "hello".to_string(), Duration::from_secs(60)).await?;
//!
//! assert!(cache.has("greeting").await?);
//! assert_eq!(cache.get("greeting").await?.as_deref(), Some("hello"));
//! # Ok::<(), courier_cache::CacheError>(())
//! # });
//! ```

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{CacheError, CacheResult};
pub use memory::InMemoryCache;
pub use traits::CacheStore;
