use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============ Domain Enums ============

/// The kind of financial event a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Electricity utility bill.
    Electricity,
    /// Mobile recharge or postpaid bill.
    Mobile,
    /// Salary credit.
    Salary,
    /// Buy-now-pay-later installment.
    Bnpl,
    /// Pay-later installment.
    Paylater,
}

impl TransactionKind {
    /// Wire/storage token for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Electricity => "electricity",
            TransactionKind::Mobile => "mobile",
            TransactionKind::Salary => "salary",
            TransactionKind::Bnpl => "bnpl",
            TransactionKind::Paylater => "paylater",
        }
    }

    /// Title-cased label used in change reasons and descriptions.
    pub fn title(&self) -> &'static str {
        match self {
            TransactionKind::Electricity => "Electricity",
            TransactionKind::Mobile => "Mobile",
            TransactionKind::Salary => "Salary",
            TransactionKind::Bnpl => "Bnpl",
            TransactionKind::Paylater => "Paylater",
        }
    }

    /// Kinds that represent a payment obligation (everything except salary).
    pub fn is_payment(&self) -> bool {
        !matches!(self, TransactionKind::Salary)
    }

    /// Utility bill kinds.
    pub fn is_bill(&self) -> bool {
        matches!(self, TransactionKind::Electricity | TransactionKind::Mobile)
    }

    /// Short-term unsecured credit kinds.
    pub fn is_debt(&self) -> bool {
        matches!(self, TransactionKind::Bnpl | TransactionKind::Paylater)
    }
}

impl FromStr for TransactionKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "electricity" => Ok(TransactionKind::Electricity),
            "mobile" => Ok(TransactionKind::Mobile),
            "salary" => Ok(TransactionKind::Salary),
            "bnpl" => Ok(TransactionKind::Bnpl),
            "paylater" => Ok(TransactionKind::Paylater),
            _ => Err(()),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Settled on or before the due date.
    PaidOnTime,
    /// Settled after the due date.
    PaidLate,
    /// Payment attempted and failed.
    Failed,
    /// Not yet settled.
    Pending,
}

impl TransactionStatus {
    /// Wire/storage token for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::PaidOnTime => "paid_on_time",
            TransactionStatus::PaidLate => "paid_late",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Pending => "pending",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paid_on_time" => Ok(TransactionStatus::PaidOnTime),
            "paid_late" => Ok(TransactionStatus::PaidLate),
            "failed" => Ok(TransactionStatus::Failed),
            "pending" => Ok(TransactionStatus::Pending),
            _ => Err(()),
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordinal credit grade derived from the final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "D")]
    D,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::D => "D",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loan eligibility tier derived from the final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Eligibility {
    Approved,
    Review,
    Rejected,
}

impl Eligibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Eligibility::Approved => "approved",
            Eligibility::Review => "review",
            Eligibility::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Eligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============ Database Models ============

/// One financial event in a subject's ledger.
///
/// Created once at ingestion by the scoring service; never mutated or
/// deleted outside the administrative bulk clear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier for the transaction.
    pub id: Uuid,
    /// The subject (borrower) who owns this event.
    pub subject_id: Uuid,
    /// Kind of financial event.
    pub kind: TransactionKind,
    /// Amount in rupees. Never negative.
    pub amount: f64,
    /// Settlement status.
    pub status: TransactionStatus,
    /// When the payment was due, if the event carries a due date.
    pub due_at: Option<DateTime<Utc>>,
    /// When the payment was actually made, if it was.
    pub paid_at: Option<DateTime<Utc>>,
    /// Days past due. Zero unless the payment was late.
    pub days_late: i32,
    /// Billing provider or employer, free text.
    pub provider: String,
    /// Free-text description.
    pub description: String,
    /// Ingestion timestamp, assigned by the service clock. Immutable.
    pub occurred_at: DateTime<Utc>,
}

/// One immutable audit record of a score change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreHistoryEntry {
    /// Unique identifier for the entry.
    pub id: Uuid,
    /// The subject whose score changed.
    pub subject_id: Uuid,
    /// Score before the causing transaction was ingested.
    pub old_score: i32,
    /// Score after the causing transaction was ingested.
    pub new_score: i32,
    /// Human-readable explanation of the change.
    pub change_reason: String,
    /// The transaction that caused this change.
    pub caused_by_transaction: Uuid,
    /// When the entry was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// A registered borrower.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: Uuid,
    /// Login email, unique.
    pub email: String,
    /// SHA-256 hex digest of the password.
    pub password_hash: String,
    /// Display name.
    pub name: String,
    /// Mobile number in E.164 form.
    pub phone: String,
    /// Postal address, free text.
    pub address: String,
    /// Date of birth as provided at registration.
    pub date_of_birth: String,
    /// Timestamp of registration.
    pub created_at: DateTime<Utc>,
}

/// A loan application submitted for one-shot static scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanApplication {
    /// Unique identifier.
    pub id: Uuid,
    /// The applying subject.
    pub subject_id: Uuid,
    /// Declared monthly income in rupees.
    pub monthly_income: f64,
    /// Declared outstanding debt in rupees.
    pub existing_debt: f64,
    /// Stated purpose of the loan.
    pub loan_purpose: String,
    /// Requested principal in rupees.
    pub requested_amount: f64,
    /// Application status, mirrors the scoring eligibility.
    pub status: String,
    /// Timestamp of submission.
    pub created_at: DateTime<Utc>,
}

// ============ Scoring Results ============

/// One explanatory entry accompanying a score breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreFactor {
    /// Factor category label.
    pub category: String,
    /// Weighted contribution of the category to the final score.
    pub impact: f64,
    /// Short count-based description.
    pub details: String,
}

/// The result of one dynamic score calculation.
///
/// Ephemeral: recomputed on demand and never persisted by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Final score, clamped to [0, 100].
    pub score: i32,
    /// Grade derived from the score.
    pub grade: Grade,
    /// Eligibility tier derived from the score.
    pub eligibility: Eligibility,
    /// Weighted contribution per named sub-score. Empty for an empty history.
    pub components: BTreeMap<String, f64>,
    /// Explanatory factors, one per non-empty category.
    pub factors: Vec<ScoreFactor>,
}

/// A validated transaction input, ready to persist.
///
/// Produced by the scoring service from a raw request; enums are parsed and
/// timestamps resolved before anything touches the store.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub amount: f64,
    pub status: TransactionStatus,
    pub due_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub days_late: i32,
    pub provider: String,
    pub description: String,
}

// ============ API Request Models ============

/// Request payload for recording a new transaction.
///
/// Kind, status and timestamps arrive as strings and are validated by the
/// scoring service, so a malformed value is rejected as a 400 with a
/// category rather than a generic deserialization failure.
#[derive(Debug, Deserialize)]
pub struct RecordTransactionRequest {
    /// Transaction kind token (electricity, mobile, salary, bnpl, paylater).
    pub kind: String,
    /// Amount in rupees, non-negative.
    pub amount: f64,
    /// Status token (paid_on_time, paid_late, failed, pending).
    pub status: String,
    /// Optional due timestamp, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`.
    pub due_at: Option<String>,
    /// Optional paid timestamp, same formats as `due_at`.
    pub paid_at: Option<String>,
    /// Days past due, defaults to 0.
    pub days_late: Option<i32>,
    /// Billing provider or employer.
    pub provider: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
}

/// Request payload for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: String,
    pub address: String,
    pub date_of_birth: String,
}

/// Request payload for user login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request payload for a loan application.
#[derive(Debug, Deserialize)]
pub struct LoanApplicationRequest {
    pub monthly_income: f64,
    pub existing_debt: f64,
    pub loan_purpose: String,
    pub requested_amount: f64,
}

/// Query parameters for bounded history listings.
#[derive(Debug, Deserialize)]
pub struct LimitParams {
    pub limit: Option<i64>,
}

// ============ API Response Models ============

/// Response payload after recording a transaction and rescoring.
#[derive(Debug, Serialize)]
pub struct RecordTransactionResponse {
    pub success: bool,
    /// The change reason, suitable for direct display.
    pub message: String,
    pub old_score: i32,
    pub new_score: i32,
    pub score_change: i32,
    pub new_grade: Grade,
    pub new_eligibility: Eligibility,
    pub transaction_id: Uuid,
}

/// One row of the score history listing.
#[derive(Debug, Serialize)]
pub struct ScoreHistoryItem {
    pub old_score: i32,
    pub new_score: i32,
    pub change_reason: String,
    pub date: DateTime<Utc>,
}

/// Response payload for the score history listing.
#[derive(Debug, Serialize)]
pub struct ScoreHistoryResponse {
    pub score_history: Vec<ScoreHistoryItem>,
}

/// Response payload for the transaction listing.
#[derive(Debug, Serialize)]
pub struct TransactionListResponse {
    pub transactions: Vec<Transaction>,
}

/// Response payload for the administrative bulk clear.
#[derive(Debug, Serialize)]
pub struct ClearSubjectResponse {
    pub success: bool,
    pub message: String,
    pub transactions_deleted: u64,
    pub history_deleted: u64,
}

/// Static loan decision percentages shown to the applicant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanFactors {
    pub income: i32,
    pub debt: i32,
    pub purpose: i32,
    pub amount: i32,
}

/// The full static loan decision for an application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanDecision {
    pub score: i32,
    pub grade: String,
    pub eligibility: Eligibility,
    pub max_loan_amount: f64,
    pub recommended_amount: f64,
    pub interest_rate: f64,
    pub emi_amount: f64,
    pub emi_to_income_ratio: f64,
    pub rbi_compliant: bool,
    pub factors: LoanFactors,
}

/// Response payload for a submitted loan application.
#[derive(Debug, Serialize)]
pub struct LoanApplicationResponse {
    pub application_id: Uuid,
    pub credit_score: LoanDecision,
}

/// Latest cached static credit score, joined with its application figures.
#[derive(Debug, Serialize)]
pub struct StoredCreditScoreResponse {
    pub score: i32,
    pub grade: String,
    pub eligibility: String,
    pub max_loan_amount: f64,
    pub recommended_amount: f64,
    pub interest_rate: f64,
    pub emi_amount: f64,
    pub emi_to_income_ratio: f64,
    pub monthly_income: f64,
    pub existing_debt: f64,
    pub loan_purpose: String,
    pub requested_amount: f64,
    pub rbi_compliant: bool,
    pub factors: serde_json::Value,
}

/// Aggregate figures for the admin dashboard.
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub total_subjects: i64,
    pub approved_count: i64,
    pub review_count: i64,
    pub rejected_count: i64,
    pub avg_score: f64,
    pub rbi_compliance_rate: f64,
    pub avg_eligible_loan_amount: f64,
    pub excellent_credit_count: i64,
    pub good_credit_count: i64,
    pub poor_credit_count: i64,
}
