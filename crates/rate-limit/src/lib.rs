//! Per-client admission control for Reel.
//!
//! Every client key gets its own token bucket holding up to `burst` tokens, refilled at
//! `requests_per_second`. A request spends one token; a client with an empty bucket is
//! rejected until enough time has passed. Buckets that have not been touched for the idle
//! threshold are removed by a periodic sweep.

#![deny(missing_docs)]

mod bucket;
mod registry;

pub use bucket::TokenBucket;
pub use registry::RateLimiterRegistry;
