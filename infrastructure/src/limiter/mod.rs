//! Rate limiter adapters

mod token_bucket;

pub use token_bucket::TokenBucketLimiter;
