//! Advisory risk service adapters

mod http;

pub use http::HttpRiskEvaluator;
