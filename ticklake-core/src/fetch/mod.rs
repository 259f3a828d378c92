//! Network retrieval from the provider archive.

pub mod direct;
pub mod rate_limit;
pub mod transport;

pub use direct::DirectFetcher;
pub use rate_limit::RateLimiter;
pub use transport::{HttpTransport, Transport};
