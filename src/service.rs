//! The scoring service: the one component that touches both the
//! transaction store and the score history ledger.
//!
//! Every ingest runs the atomic rescore protocol: read the current
//! breakdown, persist the validated transaction, recompute over the
//! updated history, and append the audit entry, with the two writes in a
//! single database transaction and the whole sequence serialized per
//! subject.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::errors::{AppError, ResultExt};
use crate::models::{
    NewTransaction, RecordTransactionRequest, ScoreBreakdown, ScoreHistoryEntry, Transaction,
    TransactionKind, TransactionStatus,
};
use crate::scoring::{self, ScoringPolicy};
use crate::storage::{self, LedgerStorage};

/// Injectable time source for recency-window calculations.
///
/// The calculator never reads the wall clock itself; tests pin `now` to a
/// fixed instant and replay ledgers deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Registry of per-subject async locks.
///
/// Two concurrent ingests for the same subject racing through the
/// read-old-score step would both observe the same stale breakdown and
/// write a duplicated delta; holding the subject's lock across the whole
/// protocol prevents that. Different subjects never contend.
#[derive(Default)]
struct SubjectLocks {
    inner: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl SubjectLocks {
    fn for_subject(&self, subject_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().expect("subject lock registry poisoned");
        map.entry(subject_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

/// The composite result of one recorded transaction.
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    /// Breakdown over the history including the new transaction.
    pub breakdown: ScoreBreakdown,
    /// Score before the transaction was ingested.
    pub old_score: i32,
    /// Signed score delta caused by the transaction.
    pub score_change: i32,
    /// Human-readable audit explanation of the delta.
    pub change_reason: String,
    /// Identifier of the stored transaction.
    pub transaction_id: Uuid,
}

/// Orchestrates scoring reads and the atomic rescore protocol.
pub struct ScoringService {
    pool: PgPool,
    storage: LedgerStorage,
    policy: ScoringPolicy,
    clock: Arc<dyn Clock>,
    locks: SubjectLocks,
}

impl ScoringService {
    pub fn new(pool: PgPool, policy: ScoringPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage: LedgerStorage::new(pool.clone()),
            pool,
            policy,
            clock,
            locks: SubjectLocks::default(),
        }
    }

    /// Read access to the underlying stores for non-scoring queries.
    pub fn ledger(&self) -> &LedgerStorage {
        &self.storage
    }

    /// Current dynamic breakdown for a subject.
    ///
    /// A subject with no history is not an error; the neutral default
    /// breakdown comes back instead.
    pub async fn current_breakdown(&self, subject_id: Uuid) -> Result<ScoreBreakdown, AppError> {
        let history = self.storage.transactions_by_subject(subject_id).await?;
        Ok(scoring::calculate(&history, self.clock.now(), &self.policy))
    }

    /// Records one transaction and rescores the subject atomically.
    ///
    /// Holds the subject's lock across the whole read-compute-write
    /// sequence; the transaction append and the history append share one
    /// database transaction, so either both land or neither does.
    pub async fn record_transaction(
        &self,
        subject_id: Uuid,
        req: &RecordTransactionRequest,
    ) -> Result<RecordOutcome, AppError> {
        // Reject malformed input before anything touches the store.
        let input = validate_transaction_request(req)?;

        let lock = self.locks.for_subject(subject_id);
        let _guard = lock.lock().await;

        let as_of = self.clock.now();
        let history = self
            .storage
            .transactions_by_subject(subject_id)
            .await
            .context("load transaction history for rescore")?;
        let old = scoring::calculate(&history, as_of, &self.policy);

        let mut db_tx = self.pool.begin().await.map_err(AppError::DatabaseError)?;

        let transaction_id =
            storage::append_transaction(&mut *db_tx, subject_id, &input, as_of).await?;
        if transaction_id.is_nil() {
            // Rolls back on drop; a history entry must never reference a
            // transaction that did not persist.
            return Err(AppError::Consistency(
                "transaction append returned a nil id".to_string(),
            ));
        }

        let stored = Transaction {
            id: transaction_id,
            subject_id,
            kind: input.kind,
            amount: input.amount,
            status: input.status,
            due_at: input.due_at,
            paid_at: input.paid_at,
            days_late: input.days_late,
            provider: input.provider.clone(),
            description: input.description.clone(),
            occurred_at: as_of,
        };

        // The new breakdown covers the history up to and including the
        // stored transaction; it is the newest event, so it heads the list.
        let mut updated = Vec::with_capacity(history.len() + 1);
        updated.push(stored);
        updated.extend(history);
        let new = scoring::calculate(&updated, as_of, &self.policy);

        let score_change = new.score - old.score;
        let change_reason = scoring::change_reason(
            input.kind,
            input.status,
            input.amount,
            input.days_late,
            score_change,
        );

        storage::append_score_history(
            &mut *db_tx,
            subject_id,
            old.score,
            new.score,
            &change_reason,
            transaction_id,
            as_of,
        )
        .await?;

        db_tx.commit().await.map_err(AppError::DatabaseError)?;

        tracing::info!(
            "Recorded {} transaction for subject {}: score {} → {} ({:+})",
            input.kind,
            subject_id,
            old.score,
            new.score,
            score_change
        );

        Ok(RecordOutcome {
            breakdown: new,
            old_score: old.score,
            score_change,
            change_reason,
            transaction_id,
        })
    }

    /// Bounded score change history for a subject, most recent first.
    /// Read-only; nothing is recomputed.
    pub async fn score_history(
        &self,
        subject_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ScoreHistoryEntry>, AppError> {
        self.storage
            .score_history_by_subject(subject_id, limit)
            .await
    }
}

/// Validates a raw record-transaction request into a typed input.
///
/// Everything that can be malformed is checked here, so past this point
/// the calculator operates on fully typed data and nothing can silently
/// corrupt a recency window.
pub fn validate_transaction_request(
    req: &RecordTransactionRequest,
) -> Result<NewTransaction, AppError> {
    let kind: TransactionKind = req.kind.parse().map_err(|_| {
        AppError::BadRequest(format!("Unknown transaction kind '{}'", req.kind))
    })?;
    let status: TransactionStatus = req.status.parse().map_err(|_| {
        AppError::BadRequest(format!("Unknown transaction status '{}'", req.status))
    })?;

    if !req.amount.is_finite() || req.amount < 0.0 {
        return Err(AppError::BadRequest(
            "amount must be a non-negative number".to_string(),
        ));
    }

    let days_late = req.days_late.unwrap_or(0);
    if days_late < 0 {
        return Err(AppError::BadRequest(
            "days_late must not be negative".to_string(),
        ));
    }

    let due_at = parse_optional_timestamp(req.due_at.as_deref(), "due_at")?;
    let paid_at = parse_optional_timestamp(req.paid_at.as_deref(), "paid_at")?;

    let provider = req.provider.clone().unwrap_or_default();
    let description = req
        .description
        .clone()
        .unwrap_or_else(|| format!("{} Payment", kind.title()));

    Ok(NewTransaction {
        kind,
        amount: req.amount,
        status,
        due_at,
        paid_at,
        days_late,
        provider,
        description,
    })
}

fn parse_optional_timestamp(
    raw: Option<&str>,
    field: &str,
) -> Result<Option<DateTime<Utc>>, AppError> {
    match raw {
        None => Ok(None),
        Some(s) => parse_event_timestamp(s).map(Some).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Malformed {} timestamp '{}'; expected YYYY-MM-DD HH:MM:SS or YYYY-MM-DD",
                field, s
            ))
        }),
    }
}

/// Parses the two accepted event timestamp formats, both read as UTC.
fn parse_event_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}
