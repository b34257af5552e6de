//! SQLite-backed store.
//!
//! Single-writer embedded database in WAL mode. All five store ports are
//! served from one connection behind a mutex; every call is one short
//! transaction. Timestamps are stored as RFC 3339 text, JSON payloads as
//! serialized text columns. A corrupt or unreadable database fails `open`
//! rather than limping along.

use chrono::{DateTime, Utc};
use overseer_application::ports::store::{
    AgentStore, ApprovalStore, ConfigStore, DecisionStore, DecisionTally, EntryFilter,
    InteractionStore, StoreError,
};
use overseer_domain::{
    Agent, AgentId, AgentStatus, ApprovalRequest, Budget, Decision, EngineConfig, Feedback,
    FeedbackSample, InteractionEntry, NewDecision, NewEntry, RequestKind, RequestStatus,
    SessionId, SessionSummary,
};
use rusqlite::{Connection, Row, params};
use serde_json::Value;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::info;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS agents (
    id TEXT PRIMARY KEY,
    task TEXT NOT NULL,
    repo_path TEXT NOT NULL,
    status TEXT NOT NULL,
    priority TEXT NOT NULL,
    budget_ceiling REAL NOT NULL,
    budget_spent REAL NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS approval_queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    agent_id TEXT NOT NULL REFERENCES agents(id),
    kind TEXT NOT NULL,
    payload TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_queue_status ON approval_queue(status);
CREATE UNIQUE INDEX IF NOT EXISTS idx_queue_one_open
    ON approval_queue(agent_id) WHERE status = 'pending';

CREATE TABLE IF NOT EXISTS decisions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    agent_id TEXT NOT NULL,
    payload TEXT NOT NULL,
    outcome TEXT NOT NULL,
    risk_score REAL NOT NULL,
    confidence_score REAL NOT NULL,
    autonomy_level TEXT NOT NULL,
    model_used TEXT NOT NULL,
    reasoning TEXT,
    degraded INTEGER NOT NULL DEFAULT 0,
    feedback TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_decisions_feedback ON decisions(feedback)
    WHERE feedback IS NOT NULL;

CREATE TABLE IF NOT EXISTS interaction_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    agent_id TEXT NOT NULL,
    session_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    direction TEXT NOT NULL,
    content TEXT NOT NULL,
    metadata TEXT,
    timestamp TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_logs_agent ON interaction_logs(agent_id);
CREATE INDEX IF NOT EXISTS idx_logs_session ON interaction_logs(session_id);

CREATE TABLE IF NOT EXISTS config (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

const ENGINE_CONFIG_KEY: &str = "engine";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Backend(format!("failed to create data dir: {e}")))?;
        }
        let conn = Connection::open(path).map_err(open_error)?;
        Self::init(conn, &path.display().to_string())
    }

    /// Fully in-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(open_error)?;
        Self::init(conn, ":memory:")
    }

    fn init(conn: Connection, label: &str) -> Result<Self, StoreError> {
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(open_error)?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(open_error)?;
        conn.execute_batch(SCHEMA).map_err(open_error)?;
        info!(path = label, "state store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A poisoned mutex means another thread panicked mid-query; the
        // connection itself is still usable.
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Errors during open are treated as corruption: the daemon must not start
/// over a database it cannot trust.
fn open_error(e: rusqlite::Error) -> StoreError {
    StoreError::Corrupt(e.to_string())
}

fn sql_error(e: rusqlite::Error) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(inner, _) => match inner.code {
            rusqlite::ErrorCode::ConstraintViolation => StoreError::Constraint(e.to_string()),
            rusqlite::ErrorCode::DatabaseCorrupt | rusqlite::ErrorCode::NotADatabase => {
                StoreError::Corrupt(e.to_string())
            }
            _ => StoreError::Backend(e.to_string()),
        },
        _ => StoreError::Backend(e.to_string()),
    }
}

/// Stored enum or timestamp text that fails to parse is corruption.
fn decode_error(what: &str, e: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("bad {what} in database: {e}"))
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| decode_error("timestamp", e))
}

fn parse_json(text: &str) -> Result<Value, StoreError> {
    serde_json::from_str(text).map_err(|e| decode_error("json payload", e))
}

fn row_to_agent(row: &Row<'_>) -> Result<Agent, StoreError> {
    let id: String = row.get(0).map_err(sql_error)?;
    let task: String = row.get(1).map_err(sql_error)?;
    let repo_path: String = row.get(2).map_err(sql_error)?;
    let status: String = row.get(3).map_err(sql_error)?;
    let priority: String = row.get(4).map_err(sql_error)?;
    let ceiling: f64 = row.get(5).map_err(sql_error)?;
    let spent: f64 = row.get(6).map_err(sql_error)?;
    let created_at: String = row.get(7).map_err(sql_error)?;

    Ok(Agent {
        id: AgentId::new(id),
        task,
        repo_path,
        status: status
            .parse()
            .map_err(|e| decode_error("agent status", e))?,
        priority: priority
            .parse()
            .map_err(|e| decode_error("agent priority", e))?,
        budget: Budget::restore(ceiling, spent).map_err(|e| decode_error("agent budget", e))?,
        created_at: parse_timestamp(&created_at)?,
    })
}

const AGENT_COLUMNS: &str =
    "id, task, repo_path, status, priority, budget_ceiling, budget_spent, created_at";

impl AgentStore for SqliteStore {
    fn insert_agent(&self, agent: &Agent) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "INSERT INTO agents (id, task, repo_path, status, priority, budget_ceiling, budget_spent, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    agent.id.as_str(),
                    agent.task,
                    agent.repo_path,
                    agent.status.as_str(),
                    agent.priority.as_str(),
                    agent.budget.ceiling(),
                    agent.budget.spent(),
                    agent.created_at.to_rfc3339(),
                ],
            )
            .map_err(sql_error)?;
        Ok(())
    }

    fn get_agent(&self, id: &AgentId) -> Result<Agent, StoreError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?1"))
            .map_err(sql_error)?;
        let mut rows = stmt.query(params![id.as_str()]).map_err(sql_error)?;
        match rows.next().map_err(sql_error)? {
            Some(row) => row_to_agent(row),
            None => Err(StoreError::NotFound(format!("agent {id}"))),
        }
    }

    fn list_agents(&self, include_archived: bool) -> Result<Vec<Agent>, StoreError> {
        let conn = self.conn();
        let sql = if include_archived {
            format!("SELECT {AGENT_COLUMNS} FROM agents ORDER BY created_at DESC")
        } else {
            format!(
                "SELECT {AGENT_COLUMNS} FROM agents WHERE status != 'archived' ORDER BY created_at DESC"
            )
        };
        let mut stmt = conn.prepare(&sql).map_err(sql_error)?;
        let mut rows = stmt.query([]).map_err(sql_error)?;
        let mut agents = Vec::new();
        while let Some(row) = rows.next().map_err(sql_error)? {
            agents.push(row_to_agent(row)?);
        }
        Ok(agents)
    }

    fn update_agent_status(&self, id: &AgentId, status: AgentStatus) -> Result<(), StoreError> {
        let updated = self
            .conn()
            .execute(
                "UPDATE agents SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id.as_str()],
            )
            .map_err(sql_error)?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("agent {id}")));
        }
        Ok(())
    }

    fn record_agent_spend(&self, id: &AgentId, amount: f64) -> Result<(), StoreError> {
        let updated = self
            .conn()
            .execute(
                "UPDATE agents SET budget_spent = budget_spent + ?1 WHERE id = ?2",
                params![amount.max(0.0), id.as_str()],
            )
            .map_err(sql_error)?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("agent {id}")));
        }
        Ok(())
    }

    fn count_live_agents(&self) -> Result<usize, StoreError> {
        self.conn()
            .query_row(
                "SELECT COUNT(*) FROM agents WHERE status IN ('active', 'working', 'waiting_approval')",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n as usize)
            .map_err(sql_error)
    }
}

fn row_to_request(row: &Row<'_>) -> Result<ApprovalRequest, StoreError> {
    let id: i64 = row.get(0).map_err(sql_error)?;
    let agent_id: String = row.get(1).map_err(sql_error)?;
    let kind: String = row.get(2).map_err(sql_error)?;
    let payload: String = row.get(3).map_err(sql_error)?;
    let status: String = row.get(4).map_err(sql_error)?;
    let created_at: String = row.get(5).map_err(sql_error)?;

    Ok(ApprovalRequest {
        id,
        agent_id: AgentId::new(agent_id),
        kind: RequestKind::from_str(&kind).map_err(|e| decode_error("request kind", e))?,
        payload: parse_json(&payload)?,
        status: RequestStatus::from_str(&status).map_err(|e| decode_error("request status", e))?,
        created_at: parse_timestamp(&created_at)?,
    })
}

const REQUEST_COLUMNS: &str = "id, agent_id, kind, payload, status, created_at";

impl ApprovalStore for SqliteStore {
    fn enqueue_request(
        &self,
        agent_id: &AgentId,
        kind: RequestKind,
        payload: &Value,
    ) -> Result<ApprovalRequest, StoreError> {
        let conn = self.conn();
        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO approval_queue (agent_id, kind, payload, status, created_at)
             VALUES (?1, ?2, ?3, 'pending', ?4)",
            params![
                agent_id.as_str(),
                kind.as_str(),
                payload.to_string(),
                created_at.to_rfc3339(),
            ],
        )
        .map_err(sql_error)?;
        Ok(ApprovalRequest {
            id: conn.last_insert_rowid(),
            agent_id: agent_id.clone(),
            kind,
            payload: payload.clone(),
            status: RequestStatus::Pending,
            created_at,
        })
    }

    fn get_request(&self, id: i64) -> Result<ApprovalRequest, StoreError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {REQUEST_COLUMNS} FROM approval_queue WHERE id = ?1"
            ))
            .map_err(sql_error)?;
        let mut rows = stmt.query(params![id]).map_err(sql_error)?;
        match rows.next().map_err(sql_error)? {
            Some(row) => row_to_request(row),
            None => Err(StoreError::NotFound(format!("request {id}"))),
        }
    }

    fn pending_requests(&self) -> Result<Vec<ApprovalRequest>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {REQUEST_COLUMNS} FROM approval_queue WHERE status = 'pending' ORDER BY id"
            ))
            .map_err(sql_error)?;
        let mut rows = stmt.query([]).map_err(sql_error)?;
        let mut requests = Vec::new();
        while let Some(row) = rows.next().map_err(sql_error)? {
            requests.push(row_to_request(row)?);
        }
        Ok(requests)
    }

    fn open_request_for(&self, agent_id: &AgentId) -> Result<Option<ApprovalRequest>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {REQUEST_COLUMNS} FROM approval_queue WHERE agent_id = ?1 AND status = 'pending'"
            ))
            .map_err(sql_error)?;
        let mut rows = stmt.query(params![agent_id.as_str()]).map_err(sql_error)?;
        match rows.next().map_err(sql_error)? {
            Some(row) => Ok(Some(row_to_request(row)?)),
            None => Ok(None),
        }
    }

    fn resolve_request(&self, id: i64, approved: bool) -> Result<ApprovalRequest, StoreError> {
        let status = if approved { "approved" } else { "denied" };
        let conn = self.conn();
        let updated = conn
            .execute(
                "UPDATE approval_queue SET status = ?1 WHERE id = ?2 AND status = 'pending'",
                params![status, id],
            )
            .map_err(sql_error)?;
        if updated == 0 {
            // Distinguish a missing row from one resolved earlier.
            let exists: bool = conn
                .query_row(
                    "SELECT COUNT(*) FROM approval_queue WHERE id = ?1",
                    params![id],
                    |row| row.get::<_, i64>(0).map(|n| n > 0),
                )
                .map_err(sql_error)?;
            return Err(if exists {
                StoreError::AlreadyResolved(id)
            } else {
                StoreError::NotFound(format!("request {id}"))
            });
        }
        drop(conn);
        self.get_request(id)
    }
}

fn row_to_decision(row: &Row<'_>) -> Result<Decision, StoreError> {
    let id: i64 = row.get(0).map_err(sql_error)?;
    let agent_id: String = row.get(1).map_err(sql_error)?;
    let payload: String = row.get(2).map_err(sql_error)?;
    let outcome: String = row.get(3).map_err(sql_error)?;
    let risk_score: f64 = row.get(4).map_err(sql_error)?;
    let confidence_score: f64 = row.get(5).map_err(sql_error)?;
    let autonomy_level: String = row.get(6).map_err(sql_error)?;
    let model_used: String = row.get(7).map_err(sql_error)?;
    let reasoning: Option<String> = row.get(8).map_err(sql_error)?;
    let degraded: bool = row.get(9).map_err(sql_error)?;
    let feedback: Option<String> = row.get(10).map_err(sql_error)?;
    let created_at: String = row.get(11).map_err(sql_error)?;

    Ok(Decision {
        id,
        agent_id: AgentId::new(agent_id),
        payload: parse_json(&payload)?,
        outcome: outcome
            .parse()
            .map_err(|e| decode_error("decision outcome", e))?,
        risk_score,
        confidence_score,
        autonomy_level: autonomy_level
            .parse()
            .map_err(|e| decode_error("autonomy level", e))?,
        model_used,
        reasoning,
        degraded,
        feedback: feedback
            .map(|f| Feedback::from_str(&f))
            .transpose()
            .map_err(|e| decode_error("feedback", e))?,
        created_at: parse_timestamp(&created_at)?,
    })
}

const DECISION_COLUMNS: &str = "id, agent_id, payload, outcome, risk_score, confidence_score, \
     autonomy_level, model_used, reasoning, degraded, feedback, created_at";

impl DecisionStore for SqliteStore {
    fn insert_decision(&self, decision: &NewDecision) -> Result<Decision, StoreError> {
        let conn = self.conn();
        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO decisions (agent_id, payload, outcome, risk_score, confidence_score,
                                    autonomy_level, model_used, reasoning, degraded, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                decision.agent_id.as_str(),
                decision.payload.to_string(),
                decision.outcome.as_str(),
                decision.risk_score,
                decision.confidence_score,
                decision.autonomy_level.as_str(),
                decision.model_used,
                decision.reasoning,
                decision.degraded,
                created_at.to_rfc3339(),
            ],
        )
        .map_err(sql_error)?;
        Ok(Decision {
            id: conn.last_insert_rowid(),
            agent_id: decision.agent_id.clone(),
            payload: decision.payload.clone(),
            outcome: decision.outcome,
            risk_score: decision.risk_score,
            confidence_score: decision.confidence_score,
            autonomy_level: decision.autonomy_level,
            model_used: decision.model_used.clone(),
            reasoning: decision.reasoning.clone(),
            degraded: decision.degraded,
            feedback: None,
            created_at,
        })
    }

    fn get_decision(&self, id: i64) -> Result<Decision, StoreError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {DECISION_COLUMNS} FROM decisions WHERE id = ?1"
            ))
            .map_err(sql_error)?;
        let mut rows = stmt.query(params![id]).map_err(sql_error)?;
        match rows.next().map_err(sql_error)? {
            Some(row) => row_to_decision(row),
            None => Err(StoreError::NotFound(format!("decision {id}"))),
        }
    }

    fn recent_decisions(&self, limit: usize) -> Result<Vec<Decision>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {DECISION_COLUMNS} FROM decisions ORDER BY id DESC LIMIT ?1"
            ))
            .map_err(sql_error)?;
        let mut rows = stmt.query(params![limit as i64]).map_err(sql_error)?;
        let mut decisions = Vec::new();
        while let Some(row) = rows.next().map_err(sql_error)? {
            decisions.push(row_to_decision(row)?);
        }
        Ok(decisions)
    }

    fn attach_feedback(&self, id: i64, feedback: Feedback) -> Result<(), StoreError> {
        let conn = self.conn();
        // Feedback is permanent: the guard only updates unjudged rows.
        let updated = conn
            .execute(
                "UPDATE decisions SET feedback = ?1 WHERE id = ?2 AND feedback IS NULL",
                params![feedback.as_str(), id],
            )
            .map_err(sql_error)?;
        if updated == 0 {
            let exists: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM decisions WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .map_err(sql_error)?;
            if exists == 0 {
                return Err(StoreError::NotFound(format!("decision {id}")));
            }
            return Err(StoreError::Conflict(format!(
                "decision {id} already has feedback"
            )));
        }
        Ok(())
    }

    fn feedback_since(&self, since: DateTime<Utc>) -> Result<Vec<FeedbackSample>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT confidence_score, feedback FROM decisions
                 WHERE feedback IS NOT NULL AND created_at >= ?1",
            )
            .map_err(sql_error)?;
        let mut rows = stmt
            .query(params![since.to_rfc3339()])
            .map_err(sql_error)?;
        let mut samples = Vec::new();
        while let Some(row) = rows.next().map_err(sql_error)? {
            let confidence: f64 = row.get(0).map_err(sql_error)?;
            let feedback: String = row.get(1).map_err(sql_error)?;
            samples.push(FeedbackSample {
                confidence,
                feedback: Feedback::from_str(&feedback)
                    .map_err(|e| decode_error("feedback", e))?,
            });
        }
        Ok(samples)
    }

    fn decision_tally(&self) -> Result<DecisionTally, StoreError> {
        self.conn()
            .query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(outcome = 'approve'), 0),
                        COALESCE(SUM(outcome = 'deny'), 0),
                        COALESCE(SUM(outcome = 'escalate'), 0),
                        COALESCE(SUM(feedback = 'correct'), 0),
                        COALESCE(SUM(feedback = 'incorrect'), 0)
                 FROM decisions",
                [],
                |row| {
                    Ok(DecisionTally {
                        total: row.get::<_, i64>(0)? as u64,
                        approvals: row.get::<_, i64>(1)? as u64,
                        denials: row.get::<_, i64>(2)? as u64,
                        escalations: row.get::<_, i64>(3)? as u64,
                        feedback_correct: row.get::<_, i64>(4)? as u64,
                        feedback_incorrect: row.get::<_, i64>(5)? as u64,
                    })
                },
            )
            .map_err(sql_error)
    }
}

fn row_to_entry(row: &Row<'_>) -> Result<InteractionEntry, StoreError> {
    let id: i64 = row.get(0).map_err(sql_error)?;
    let agent_id: String = row.get(1).map_err(sql_error)?;
    let session_id: String = row.get(2).map_err(sql_error)?;
    let kind: String = row.get(3).map_err(sql_error)?;
    let direction: String = row.get(4).map_err(sql_error)?;
    let content: String = row.get(5).map_err(sql_error)?;
    let metadata: Option<String> = row.get(6).map_err(sql_error)?;
    let timestamp: String = row.get(7).map_err(sql_error)?;

    Ok(InteractionEntry {
        id,
        agent_id: AgentId::new(agent_id),
        session_id: SessionId::new(session_id),
        kind: kind.parse().map_err(|e| decode_error("entry kind", e))?,
        direction: direction
            .parse()
            .map_err(|e| decode_error("entry direction", e))?,
        content,
        metadata: metadata.as_deref().map(parse_json).transpose()?,
        timestamp: parse_timestamp(&timestamp)?,
    })
}

impl InteractionStore for SqliteStore {
    fn append_entry(&self, entry: &NewEntry) -> Result<i64, StoreError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO interaction_logs (agent_id, session_id, kind, direction, content, metadata, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.agent_id.as_str(),
                entry.session_id.as_str(),
                entry.kind.as_str(),
                entry.direction.as_str(),
                entry.content,
                entry.metadata.as_ref().map(|m| m.to_string()),
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(sql_error)?;
        Ok(conn.last_insert_rowid())
    }

    fn query_entries(&self, filter: &EntryFilter) -> Result<Vec<InteractionEntry>, StoreError> {
        let mut sql = String::from(
            "SELECT id, agent_id, session_id, kind, direction, content, metadata, timestamp
             FROM interaction_logs WHERE 1=1",
        );
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(agent_id) = &filter.agent_id {
            sql.push_str(" AND agent_id = ?");
            args.push(Box::new(agent_id.as_str().to_string()));
        }
        if let Some(session_id) = &filter.session_id {
            sql.push_str(" AND session_id = ?");
            args.push(Box::new(session_id.as_str().to_string()));
        }
        if let Some(kind) = filter.kind {
            sql.push_str(" AND kind = ?");
            args.push(Box::new(kind.as_str().to_string()));
        }
        if let Some(term) = &filter.search {
            sql.push_str(" AND content LIKE ?");
            args.push(Box::new(format!("%{term}%")));
        }
        // Newest first so LIMIT keeps the most recent rows; plain
        // retrieval is flipped back to append order below.
        sql.push_str(" ORDER BY id DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            args.push(Box::new(limit as i64));
        }

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql).map_err(sql_error)?;
        let params = rusqlite::params_from_iter(args.iter().map(|a| a.as_ref()));
        let mut rows = stmt.query(params).map_err(sql_error)?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next().map_err(sql_error)? {
            entries.push(row_to_entry(row)?);
        }
        if filter.search.is_none() {
            entries.reverse();
        }
        Ok(entries)
    }

    fn sessions_for(&self, agent_id: &AgentId) -> Result<Vec<SessionSummary>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT session_id, MIN(timestamp), MAX(timestamp), COUNT(*)
                 FROM interaction_logs WHERE agent_id = ?1
                 GROUP BY session_id ORDER BY MIN(timestamp)",
            )
            .map_err(sql_error)?;
        let mut rows = stmt.query(params![agent_id.as_str()]).map_err(sql_error)?;
        let mut sessions = Vec::new();
        while let Some(row) = rows.next().map_err(sql_error)? {
            let session_id: String = row.get(0).map_err(sql_error)?;
            let first: String = row.get(1).map_err(sql_error)?;
            let last: String = row.get(2).map_err(sql_error)?;
            let count: i64 = row.get(3).map_err(sql_error)?;
            sessions.push(SessionSummary {
                session_id: SessionId::new(session_id),
                first_entry: parse_timestamp(&first)?,
                last_entry: parse_timestamp(&last)?,
                entry_count: count as u64,
            });
        }
        Ok(sessions)
    }
}

impl ConfigStore for SqliteStore {
    fn load_engine_config(&self) -> Result<EngineConfig, StoreError> {
        let conn = self.conn();
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM config WHERE key = ?1",
                params![ENGINE_CONFIG_KEY],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(sql_error(other)),
            })?;
        match value {
            Some(text) => {
                serde_json::from_str(&text).map_err(|e| decode_error("engine config", e))
            }
            None => Ok(EngineConfig::default()),
        }
    }

    fn save_engine_config(&self, config: &EngineConfig) -> Result<(), StoreError> {
        let text = serde_json::to_string(config)
            .map_err(|e| StoreError::Backend(format!("failed to encode engine config: {e}")))?;
        self.conn()
            .execute(
                "INSERT INTO config (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![ENGINE_CONFIG_KEY, text],
            )
            .map_err(sql_error)?;
        Ok(())
    }
}
