//! # Courier Rate Limiting
//!
//! Client-side throttling for the Courier HTTP client.
//!
//! ## Features
//!
//! - **Keyed Token Buckets**: One bucket per key, created on first use
//! - **Waits, Never Rejects**: An empty bucket delays the caller until a
//!   token is available
//! - **Injectable Clock**: [`ManualClock`] makes waits deterministic in tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use courier_ratelimit::RateLimiter;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // 10 requests per second for each key
//! let limiter = RateLimiter::new(10, Duration::from_secs(1))?;
//!
//! limiter.attempt("api.example.com").await;
//!
//! if limiter.check("api.example.com") {
//!     println!("next call goes through immediately");
//! }
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod error;
pub mod limiter;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{RateLimitError, RateLimitResult};
pub use limiter::RateLimiter;

/// Prelude for common imports.
///
/// ```
/// use courier_ratelimit::prelude::*;
/// ```
pub mod prelude {
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::error::{RateLimitError, RateLimitResult};
    pub use crate::limiter::RateLimiter;
}
