//! Adapters between the group tree and its external representations.

pub mod markup;
pub mod snapshot;
