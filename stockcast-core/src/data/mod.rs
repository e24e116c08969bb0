//! Market data: provider trait, HTTP client, rate limiting, seed universe.

pub mod polygon;
pub mod provider;
pub mod rate_limiter;
pub mod universe;

pub use polygon::PolygonProvider;
pub use provider::{DataError, DataProvider, Throttled};
pub use rate_limiter::{Clock, ManualClock, RateLimiter, SystemClock};
pub use universe::Universe;
