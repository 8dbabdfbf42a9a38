//! Offline support: a response cache partitioned into versioned
//! generations, plus the controller that decides between cache,
//! network, and fallback for every intercepted GET.

mod controller;
mod store;
mod traits;

pub use controller::{CacheController, GenerationNames};
pub use store::{CacheStore, MemoryStore, SqliteStore};
pub use traits::{Destination, Fetcher, Method, Request, RequestMode, Response, ResponseKind};
