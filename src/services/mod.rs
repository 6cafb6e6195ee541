//! Service layer: pipeline steps wired to the store.

pub mod analytics;
pub mod sessions;
