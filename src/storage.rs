//! Persistence for the transaction store and the score history ledger,
//! plus user and loan application records.
//!
//! Reads go through [`LedgerStorage`] over the shared pool. The two
//! append operations of the rescore protocol instead take a live
//! `PgConnection`, so the scoring service can bind them into a single
//! database transaction and keep the transaction log and the score
//! history consistent.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    DashboardResponse, LoanApplicationRequest, LoanDecision, NewTransaction, ScoreHistoryEntry,
    StoredCreditScoreResponse, Transaction, User,
};

/// Appends one validated transaction to the transaction store.
///
/// Runs on the caller's connection so it can participate in the rescore
/// protocol's database transaction.
pub async fn append_transaction(
    conn: &mut PgConnection,
    subject_id: Uuid,
    input: &NewTransaction,
    occurred_at: DateTime<Utc>,
) -> Result<Uuid, AppError> {
    let row: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO transactions
            (subject_id, kind, amount, status, due_at, paid_at, days_late,
             provider, description, occurred_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id
        "#,
    )
    .bind(subject_id)
    .bind(input.kind.as_str())
    .bind(input.amount)
    .bind(input.status.as_str())
    .bind(input.due_at)
    .bind(input.paid_at)
    .bind(input.days_late)
    .bind(&input.provider)
    .bind(&input.description)
    .bind(occurred_at)
    .fetch_one(&mut *conn)
    .await
    .map_err(AppError::DatabaseError)?;

    Ok(row.0)
}

/// Appends one score history entry.
///
/// Runs on the caller's connection, inside the same database transaction
/// as the transaction append it refers to.
pub async fn append_score_history(
    conn: &mut PgConnection,
    subject_id: Uuid,
    old_score: i32,
    new_score: i32,
    change_reason: &str,
    transaction_id: Uuid,
    recorded_at: DateTime<Utc>,
) -> Result<Uuid, AppError> {
    let row: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO score_history
            (subject_id, old_score, new_score, change_reason, transaction_id, recorded_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(subject_id)
    .bind(old_score)
    .bind(new_score)
    .bind(change_reason)
    .bind(transaction_id)
    .bind(recorded_at)
    .fetch_one(&mut *conn)
    .await
    .map_err(AppError::DatabaseError)?;

    Ok(row.0)
}

/// Pool-backed read and maintenance operations for the ledgers.
pub struct LedgerStorage {
    pool: PgPool,
}

impl LedgerStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Full transaction history for a subject, newest first.
    pub async fn transactions_by_subject(
        &self,
        subject_id: Uuid,
    ) -> Result<Vec<Transaction>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT id, subject_id, kind, amount, status, due_at, paid_at,
                   days_late, provider, description, occurred_at
            FROM transactions
            WHERE subject_id = $1
            ORDER BY occurred_at DESC
            "#,
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        rows.iter().map(transaction_from_row).collect()
    }

    /// Bounded transaction listing for a subject, newest first.
    pub async fn recent_transactions(
        &self,
        subject_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Transaction>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT id, subject_id, kind, amount, status, due_at, paid_at,
                   days_late, provider, description, occurred_at
            FROM transactions
            WHERE subject_id = $1
            ORDER BY occurred_at DESC
            LIMIT $2
            "#,
        )
        .bind(subject_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        rows.iter().map(transaction_from_row).collect()
    }

    /// Bounded score change history for a subject, newest first.
    pub async fn score_history_by_subject(
        &self,
        subject_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ScoreHistoryEntry>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT id, subject_id, old_score, new_score, change_reason,
                   transaction_id, recorded_at
            FROM score_history
            WHERE subject_id = $1
            ORDER BY recorded_at DESC
            LIMIT $2
            "#,
        )
        .bind(subject_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        rows.iter()
            .map(|row| {
                Ok(ScoreHistoryEntry {
                    id: row.try_get("id")?,
                    subject_id: row.try_get("subject_id")?,
                    old_score: row.try_get("old_score")?,
                    new_score: row.try_get("new_score")?,
                    change_reason: row.try_get("change_reason")?,
                    caused_by_transaction: row.try_get("transaction_id")?,
                    recorded_at: row.try_get("recorded_at")?,
                })
            })
            .collect()
    }

    /// Administrative bulk clear of a subject's transactions and score
    /// history. The two deletes share one database transaction; history
    /// rows go first because they reference the transactions.
    pub async fn clear_subject(&self, subject_id: Uuid) -> Result<(u64, u64), AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::DatabaseError)?;

        let history_deleted = sqlx::query("DELETE FROM score_history WHERE subject_id = $1")
            .bind(subject_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::DatabaseError)?
            .rows_affected();

        let transactions_deleted = sqlx::query("DELETE FROM transactions WHERE subject_id = $1")
            .bind(subject_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::DatabaseError)?
            .rows_affected();

        tx.commit().await.map_err(AppError::DatabaseError)?;

        tracing::info!(
            "Cleared ledger for subject {}: {} transactions, {} history entries",
            subject_id,
            transactions_deleted,
            history_deleted
        );

        Ok((transactions_deleted, history_deleted))
    }

    // ============ Users ============

    /// Looks up a user by login email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            r#"
            SELECT id, email, password_hash, name, phone, address, date_of_birth, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Creates a new user and returns its id.
    pub async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        phone: &str,
        address: &str,
        date_of_birth: &str,
    ) -> Result<Uuid, AppError> {
        let row: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO users (email, password_hash, name, phone, address, date_of_birth)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(phone)
        .bind(address)
        .bind(date_of_birth)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        tracing::info!("Registered user {} ({})", row.0, email);
        Ok(row.0)
    }

    // ============ Loan applications ============

    /// Persists a loan application in its initial pending state.
    pub async fn create_application(
        &self,
        subject_id: Uuid,
        req: &LoanApplicationRequest,
    ) -> Result<Uuid, AppError> {
        let row: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO loan_applications
                (subject_id, monthly_income, existing_debt, loan_purpose, requested_amount, status)
            VALUES ($1, $2, $3, $4, $5, 'pending')
            RETURNING id
            "#,
        )
        .bind(subject_id)
        .bind(req.monthly_income)
        .bind(req.existing_debt)
        .bind(&req.loan_purpose)
        .bind(req.requested_amount)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(row.0)
    }

    /// Moves an application to the status its scoring decided.
    pub async fn update_application_status(
        &self,
        application_id: Uuid,
        status: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE loan_applications SET status = $2, updated_at = now() WHERE id = $1",
        )
        .bind(application_id)
        .bind(status)
        .execute(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(())
    }

    /// Caches the static decision for one application, one row per
    /// application.
    pub async fn store_credit_score(
        &self,
        application_id: Uuid,
        subject_id: Uuid,
        decision: &LoanDecision,
    ) -> Result<(), AppError> {
        let factors = serde_json::to_value(&decision.factors)
            .map_err(|e| AppError::InternalError(format!("serialize loan factors: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO credit_scores
                (application_id, subject_id, score, grade, eligibility,
                 max_loan_amount, recommended_amount, interest_rate, emi_amount,
                 emi_to_income_ratio, rbi_compliant, factors)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(application_id)
        .bind(subject_id)
        .bind(decision.score)
        .bind(&decision.grade)
        .bind(decision.eligibility.as_str())
        .bind(decision.max_loan_amount)
        .bind(decision.recommended_amount)
        .bind(decision.interest_rate)
        .bind(decision.emi_amount)
        .bind(decision.emi_to_income_ratio)
        .bind(decision.rbi_compliant)
        .bind(factors)
        .execute(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        tracing::info!(
            "Stored credit score {} ({}) for application {}",
            decision.score,
            decision.grade,
            application_id
        );

        Ok(())
    }

    /// Latest cached static score for a subject, joined with its
    /// application figures.
    pub async fn latest_credit_score(
        &self,
        subject_id: Uuid,
    ) -> Result<Option<StoredCreditScoreResponse>, AppError> {
        let row = sqlx::query(
            r#"
            SELECT cs.score, cs.grade, cs.eligibility, cs.max_loan_amount,
                   cs.recommended_amount, cs.interest_rate, cs.emi_amount,
                   cs.emi_to_income_ratio, cs.rbi_compliant, cs.factors,
                   la.monthly_income, la.existing_debt, la.loan_purpose,
                   la.requested_amount
            FROM credit_scores cs
            JOIN loan_applications la ON la.id = cs.application_id
            WHERE cs.subject_id = $1
            ORDER BY cs.created_at DESC
            LIMIT 1
            "#,
        )
        .bind(subject_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        row.map(|row| {
            Ok(StoredCreditScoreResponse {
                score: row.try_get("score")?,
                grade: row.try_get("grade")?,
                eligibility: row.try_get("eligibility")?,
                max_loan_amount: row.try_get("max_loan_amount")?,
                recommended_amount: row.try_get("recommended_amount")?,
                interest_rate: row.try_get("interest_rate")?,
                emi_amount: row.try_get("emi_amount")?,
                emi_to_income_ratio: row.try_get("emi_to_income_ratio")?,
                rbi_compliant: row.try_get("rbi_compliant")?,
                factors: row
                    .try_get::<Option<serde_json::Value>, _>("factors")?
                    .unwrap_or(serde_json::Value::Null),
                monthly_income: row.try_get("monthly_income")?,
                existing_debt: row.try_get("existing_debt")?,
                loan_purpose: row.try_get("loan_purpose")?,
                requested_amount: row.try_get("requested_amount")?,
            })
        })
        .transpose()
    }

    /// Aggregate dashboard figures over every stored static score.
    pub async fn dashboard(&self) -> Result<DashboardResponse, AppError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(DISTINCT subject_id)                         AS total_subjects,
                COUNT(*)                                           AS total_scores,
                COUNT(*) FILTER (WHERE eligibility = 'approved')   AS approved_count,
                COUNT(*) FILTER (WHERE eligibility = 'review')     AS review_count,
                COUNT(*) FILTER (WHERE eligibility = 'rejected')   AS rejected_count,
                COUNT(*) FILTER (WHERE rbi_compliant)              AS rbi_compliant_count,
                COUNT(*) FILTER (WHERE grade = 'Excellent')        AS excellent_credit_count,
                COUNT(*) FILTER (WHERE grade = 'Good')             AS good_credit_count,
                COUNT(*) FILTER (WHERE grade = 'Poor')             AS poor_credit_count,
                COALESCE(AVG(score)::float8, 0)                    AS avg_score,
                COALESCE(AVG(recommended_amount), 0)               AS avg_eligible_loan_amount
            FROM credit_scores
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        let total_scores: i64 = row.try_get("total_scores")?;
        let rbi_compliant_count: i64 = row.try_get("rbi_compliant_count")?;
        let rbi_compliance_rate = if total_scores > 0 {
            (rbi_compliant_count as f64 / total_scores as f64 * 1000.0).round() / 10.0
        } else {
            0.0
        };

        let avg_score: f64 = row.try_get("avg_score")?;

        Ok(DashboardResponse {
            total_subjects: row.try_get("total_subjects")?,
            approved_count: row.try_get("approved_count")?,
            review_count: row.try_get("review_count")?,
            rejected_count: row.try_get("rejected_count")?,
            avg_score: (avg_score * 10.0).round() / 10.0,
            rbi_compliance_rate,
            avg_eligible_loan_amount: row.try_get("avg_eligible_loan_amount")?,
            excellent_credit_count: row.try_get("excellent_credit_count")?,
            good_credit_count: row.try_get("good_credit_count")?,
            poor_credit_count: row.try_get("poor_credit_count")?,
        })
    }
}

/// Maps one stored row to a typed transaction.
///
/// Kind and status live as text in the store; a value that no longer
/// parses means the ledger was tampered with and surfaces as a
/// consistency error instead of a guessed default.
fn transaction_from_row(row: &PgRow) -> Result<Transaction, AppError> {
    let kind_raw: String = row.try_get("kind")?;
    let status_raw: String = row.try_get("status")?;

    let kind = kind_raw.parse().map_err(|_| {
        AppError::Consistency(format!("stored transaction has unknown kind '{}'", kind_raw))
    })?;
    let status = status_raw.parse().map_err(|_| {
        AppError::Consistency(format!(
            "stored transaction has unknown status '{}'",
            status_raw
        ))
    })?;

    Ok(Transaction {
        id: row.try_get("id")?,
        subject_id: row.try_get("subject_id")?,
        kind,
        amount: row.try_get("amount")?,
        status,
        due_at: row.try_get("due_at")?,
        paid_at: row.try_get("paid_at")?,
        days_late: row.try_get("days_late")?,
        provider: row.try_get("provider")?,
        description: row.try_get("description")?,
        occurred_at: row.try_get("occurred_at")?,
    })
}

fn user_from_row(row: &PgRow) -> Result<User, AppError> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        date_of_birth: row.try_get("date_of_birth")?,
        created_at: row.try_get("created_at")?,
    })
}
