//! Use cases orchestrating domain logic through the ports

pub mod evaluate_request;
pub mod stats;
pub mod supervisor;
