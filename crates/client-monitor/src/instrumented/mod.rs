//! Timed wrappers around clients and caches.
//!
//! The wrappers implement the same capability traits as what they wrap
//! and return the wrapped results untouched, so they substitute anywhere
//! the wrapped value was used.
//!
//! | Wrapper | Wraps | Verbs |
//! |---------|-------|-------|
//! | [`InstrumentedClient`] | [`Client`](crate::client::Client) | `Get`, `List`, `Create`, `Update`, `Patch`, `Delete`, `DeleteAllOf` |
//! | [`InstrumentedStatusWriter`] | [`StatusWriter`](crate::client::StatusWriter) | `StatusUpdate`, `StatusPatch` |
//! | [`InstrumentedCache`] | [`Reader`](crate::client::Reader) | `GetCache`, `ListCache` |

mod cache;
mod client;

pub use cache::InstrumentedCache;
pub use client::{InstrumentedClient, InstrumentedStatusWriter};
