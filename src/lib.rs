//! Client-side mirror of a school platform's group hierarchy.
//!
//! The library keeps the platform's groups and classes in a local tree and
//! pushes changes back through an abstract service. The modules keep
//! responsibilities narrow: the tree itself lives in
//! [`smartschool::api::model`], adapters to the platform markup and to JSON
//! snapshots under [`smartschool::api::io`], structural walks in
//! [`smartschool::api::tree`] and [`smartschool::api::compare`], and the
//! orchestration against the remote platform in [`smartschool::api::manager`].

pub mod smartschool;

pub use smartschool::api::{
    ApiError, Result, compare, config, dates, error, io, logging, manager, model, service, tree,
};
