//! Interaction log domain: append-only supervision transcript

pub mod entities;
