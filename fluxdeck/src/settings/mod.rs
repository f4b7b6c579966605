//! Effective settings for a new run.

mod resolver;

pub use resolver::{resolve, EffectiveSettings, PartialSettings, StyleChoice};
