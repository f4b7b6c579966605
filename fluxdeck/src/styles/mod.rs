//! User-scoped style store.

mod store;

pub use store::StyleStore;
