//! In-memory response cache for idempotent API reads.
//!
//! Entries carry an optional expiry instant. Expired entries are evicted
//! lazily on access; there is no background sweep. Keys are opaque strings,
//! and `clear` accepts a plain substring pattern so a whole endpoint family
//! (e.g. `/api/categories`) can be invalidated after a mutation.

mod store;
mod ttl;

pub use store::ResponseCache;
pub use ttl::CacheTtl;
