//! Implementations of clustering strategies.

pub mod common;
pub mod depth_greedy;
pub mod horizontal;
pub mod hybrid;
pub mod resource_aware;
pub mod runtime;
