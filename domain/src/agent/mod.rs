//! Agent aggregate: lifecycle state machine and identity

pub mod entities;
pub mod value_objects;
