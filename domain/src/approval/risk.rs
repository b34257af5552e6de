//! Risk classification for requested actions.
//!
//! A request payload is matched against an ordered table of categories,
//! most severe first. The first category whose keyword set matches decides
//! the risk score; a payload matching nothing gets a moderate default so
//! the advisory service (or a human) gets the final word.

use serde::{Deserialize, Serialize};

/// Score assigned to payloads that match no category.
pub const UNMATCHED_RISK: f64 = 0.5;

/// One row of the risk table: a named category with a severity score and
/// the keyword set that identifies it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskCategory {
    /// Category name (e.g., "destructive")
    pub name: String,
    /// Risk score assigned to matching payloads, in `[0, 1]`
    pub severity: f64,
    /// Case-insensitive substrings that place a payload in this category
    pub keywords: Vec<String>,
}

impl RiskCategory {
    pub fn new(name: impl Into<String>, severity: f64, keywords: &[&str]) -> Self {
        Self {
            name: name.into(),
            severity: severity.clamp(0.0, 1.0),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn matches(&self, haystack: &str) -> bool {
        self.keywords.iter().any(|k| haystack.contains(k.as_str()))
    }
}

/// Result of classifying one request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Risk score in `[0, 1]`
    pub score: f64,
    /// Matched category name, or `None` for the unmatched default
    pub category: Option<String>,
}

impl RiskAssessment {
    /// Reads and similar trivial actions sit at or below this score.
    pub fn is_trivial(&self) -> bool {
        self.score <= 0.2
    }
}

/// Ordered, data-driven risk table evaluated top-down.
///
/// Categories are kept sorted by severity (descending) so that a payload
/// matching both a destructive and a read keyword always scores as
/// destructive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskTable {
    categories: Vec<RiskCategory>,
}

impl RiskTable {
    /// Build a table from arbitrary categories, sorting by severity.
    pub fn new(mut categories: Vec<RiskCategory>) -> Self {
        categories.sort_by(|a, b| {
            b.severity
                .partial_cmp(&a.severity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Self { categories }
    }

    pub fn categories(&self) -> &[RiskCategory] {
        &self.categories
    }

    /// Classify a payload (any serialized form of the request) against the
    /// table. Matching is case-insensitive substring search.
    pub fn classify(&self, payload: &str) -> RiskAssessment {
        let haystack = payload.to_lowercase();
        for category in &self.categories {
            if category.matches(&haystack) {
                return RiskAssessment {
                    score: category.severity,
                    category: Some(category.name.clone()),
                };
            }
        }
        RiskAssessment {
            score: UNMATCHED_RISK,
            category: None,
        }
    }
}

impl Default for RiskTable {
    /// The built-in table. Severity bands follow the supervisor's policy:
    /// destructive/system commands 1.0, database schema changes 0.7–0.9,
    /// external network 0.8, file writes and installs 0.3–0.6, reads and
    /// tests 0.0–0.2.
    fn default() -> Self {
        Self::new(vec![
            RiskCategory::new(
                "destructive",
                1.0,
                &[
                    "rm -rf", "rm -r ", "sudo", "mkfs", "dd if=", "chmod 777", "chown -r",
                    "drop table", "drop database", "truncate table", "shutdown", "reboot",
                    "kill -9", "> /dev/",
                ],
            ),
            RiskCategory::new(
                "network",
                0.8,
                &[
                    "curl ", "wget ", "ssh ", "scp ", "netcat", "nc -", "http post",
                ],
            ),
            RiskCategory::new(
                "database",
                0.7,
                &[
                    "alter table", "create table", "migration", "schema", "database",
                    "delete from",
                ],
            ),
            RiskCategory::new(
                "write",
                0.5,
                &[
                    "edit", "write", "install", "mkdir", "git push", "git commit", "mv ", "cp ",
                ],
            ),
            RiskCategory::new(
                "read",
                0.1,
                &[
                    "read", "grep", "search", "find", "cat ", "ls ", "test", "pytest", "status",
                    "diff", "git log",
                ],
            ),
        ])
    }
}
