//! Markets Cache
//!
//! Market lists change rarely and every order creation needs one, so the
//! validator is wrapped in a read-through / write-through cache keyed by
//! the caller's role fingerprint.

mod cached_validator;
mod in_memory;

pub use cached_validator::CachedMarketValidator;
pub use in_memory::InMemoryMarketsCache;
