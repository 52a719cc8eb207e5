use sqlx::{postgres::PgPoolOptions, PgPool};

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Creates the ledger tables and indexes if they do not exist yet.
    ///
    /// Both logs are append-only: transactions and score history rows are
    /// only ever inserted (and bulk-deleted by the administrative clear).
    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        email TEXT UNIQUE NOT NULL,
        password_hash TEXT NOT NULL,
        name TEXT NOT NULL,
        phone TEXT NOT NULL DEFAULT '',
        address TEXT NOT NULL DEFAULT '',
        date_of_birth TEXT NOT NULL DEFAULT '',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS transactions (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        subject_id UUID NOT NULL,
        kind TEXT NOT NULL,
        amount DOUBLE PRECISION NOT NULL,
        status TEXT NOT NULL,
        due_at TIMESTAMPTZ,
        paid_at TIMESTAMPTZ,
        days_late INTEGER NOT NULL DEFAULT 0,
        provider TEXT NOT NULL DEFAULT '',
        description TEXT NOT NULL DEFAULT '',
        occurred_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_transactions_subject_occurred
        ON transactions (subject_id, occurred_at DESC)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS score_history (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        subject_id UUID NOT NULL,
        old_score INTEGER NOT NULL,
        new_score INTEGER NOT NULL,
        change_reason TEXT NOT NULL,
        transaction_id UUID NOT NULL REFERENCES transactions (id),
        recorded_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_score_history_subject_recorded
        ON score_history (subject_id, recorded_at DESC)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS loan_applications (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        subject_id UUID NOT NULL,
        monthly_income DOUBLE PRECISION NOT NULL,
        existing_debt DOUBLE PRECISION NOT NULL DEFAULT 0,
        loan_purpose TEXT NOT NULL,
        requested_amount DOUBLE PRECISION NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS credit_scores (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        application_id UUID NOT NULL REFERENCES loan_applications (id),
        subject_id UUID NOT NULL,
        score INTEGER NOT NULL,
        grade TEXT NOT NULL,
        eligibility TEXT NOT NULL,
        max_loan_amount DOUBLE PRECISION NOT NULL,
        recommended_amount DOUBLE PRECISION NOT NULL,
        interest_rate DOUBLE PRECISION NOT NULL,
        emi_amount DOUBLE PRECISION NOT NULL,
        emi_to_income_ratio DOUBLE PRECISION NOT NULL,
        rbi_compliant BOOLEAN NOT NULL,
        factors JSONB,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_credit_scores_subject_created
        ON credit_scores (subject_id, created_at DESC)
    "#,
];
