//! Approval engine domain: risk classification, confidence scoring, and
//! the escalation decision rule

pub mod autonomy;
pub mod confidence;
pub mod entities;
pub mod risk;
pub mod rule;
