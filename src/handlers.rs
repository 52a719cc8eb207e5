use crate::auth;
use crate::config::Config;
use crate::errors::AppError;
use crate::loan;
use crate::models::*;
use crate::service::ScoringService;
use crate::storage::LedgerStorage;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use moka::future::Cache;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Application configuration.
    pub config: Config,
    /// The scoring service owning the atomic rescore protocol.
    pub scoring: Arc<ScoringService>,
    /// Per-subject cache of the current score breakdown.
    ///
    /// Refreshed by every rescore and invalidated by the bulk clear, so a
    /// cached read never lags behind a write that went through this
    /// process. The TTL bounds staleness of the recency windows.
    pub score_cache: Cache<Uuid, ScoreBreakdown>,
}

/// Health check endpoint.
///
/// Returns the service status, version, and health information.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-riskscore-api",
            "version": "0.1.0"
        })),
    )
}

/// POST /api/v1/auth/register
///
/// Registers a new borrower after validating the email and normalizing the
/// mobile number.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    tracing::info!("POST /auth/register - email: {}", req.email);

    if !auth::is_valid_email(&req.email) {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    if req.password.trim().is_empty() {
        return Err(AppError::BadRequest("Password must not be empty".to_string()));
    }

    let (phone_valid, normalized_phone) = auth::validate_in_phone(&req.phone);
    if !phone_valid {
        return Err(AppError::BadRequest(normalized_phone));
    }

    let ledger = LedgerStorage::new(state.db.clone());
    if ledger.find_user_by_email(&req.email).await?.is_some() {
        return Err(AppError::BadRequest("Email already registered".to_string()));
    }

    let user_id = ledger
        .create_user(
            &req.email,
            &auth::hash_password(&req.password),
            &req.name,
            &normalized_phone,
            &req.address,
            &req.date_of_birth,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "user_id": user_id
        })),
    ))
}

/// POST /api/v1/auth/login
///
/// Verifies credentials and returns the user profile.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!("POST /auth/login - email: {}", credentials.email);

    let ledger = LedgerStorage::new(state.db.clone());
    let user = ledger
        .find_user_by_email(&credentials.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized(format!("unknown email {}", credentials.email)))?;

    if !auth::verify_password(&credentials.password, &user.password_hash) {
        return Err(AppError::Unauthorized(format!(
            "wrong password for {}",
            credentials.email
        )));
    }

    Ok(Json(json!({
        "message": "Login successful",
        "user": {
            "id": user.id,
            "email": user.email,
            "name": user.name,
            "phone": user.phone,
            "address": user.address,
            "date_of_birth": user.date_of_birth
        }
    })))
}

/// POST /api/v1/subjects/:subject_id/transactions
///
/// Records one transaction and rescores the subject atomically. The
/// response carries the old and new scores, the delta and the audit
/// change reason.
pub async fn record_transaction(
    State(state): State<Arc<AppState>>,
    Path(subject_id): Path<Uuid>,
    Json(req): Json<RecordTransactionRequest>,
) -> Result<(StatusCode, Json<RecordTransactionResponse>), AppError> {
    tracing::info!(
        "POST /subjects/{}/transactions - kind: {}, status: {}",
        subject_id,
        req.kind,
        req.status
    );

    let outcome = state.scoring.record_transaction(subject_id, &req).await?;

    // Keep the cached breakdown in step with the ledger.
    state
        .score_cache
        .insert(subject_id, outcome.breakdown.clone())
        .await;

    Ok((
        StatusCode::CREATED,
        Json(RecordTransactionResponse {
            success: true,
            message: outcome.change_reason.clone(),
            old_score: outcome.old_score,
            new_score: outcome.breakdown.score,
            score_change: outcome.score_change,
            new_grade: outcome.breakdown.grade,
            new_eligibility: outcome.breakdown.eligibility,
            transaction_id: outcome.transaction_id,
        }),
    ))
}

/// GET /api/v1/subjects/:subject_id/transactions
///
/// Bounded transaction listing, newest first.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Path(subject_id): Path<Uuid>,
    Query(params): Query<LimitParams>,
) -> Result<Json<TransactionListResponse>, AppError> {
    let limit = params.limit.unwrap_or(20).clamp(1, 200);
    tracing::info!("GET /subjects/{}/transactions - limit: {}", subject_id, limit);

    let transactions = state
        .scoring
        .ledger()
        .recent_transactions(subject_id, limit)
        .await?;

    Ok(Json(TransactionListResponse { transactions }))
}

/// DELETE /api/v1/subjects/:subject_id/transactions
///
/// Administrative bulk clear of a subject's transactions and score
/// history.
pub async fn clear_transactions(
    State(state): State<Arc<AppState>>,
    Path(subject_id): Path<Uuid>,
) -> Result<Json<ClearSubjectResponse>, AppError> {
    tracing::info!("DELETE /subjects/{}/transactions", subject_id);

    let (transactions_deleted, history_deleted) =
        state.scoring.ledger().clear_subject(subject_id).await?;
    state.score_cache.invalidate(&subject_id).await;

    Ok(Json(ClearSubjectResponse {
        success: true,
        message: format!(
            "Cleared {} transactions and {} score history entries",
            transactions_deleted, history_deleted
        ),
        transactions_deleted,
        history_deleted,
    }))
}

/// GET /api/v1/subjects/:subject_id/score
///
/// Current dynamic score breakdown. A subject with no history gets the
/// neutral default, not a 404.
pub async fn get_score(
    State(state): State<Arc<AppState>>,
    Path(subject_id): Path<Uuid>,
) -> Result<Json<ScoreBreakdown>, AppError> {
    tracing::info!("GET /subjects/{}/score", subject_id);

    if let Some(cached) = state.score_cache.get(&subject_id).await {
        tracing::debug!("Score cache HIT for subject {}", subject_id);
        return Ok(Json(cached));
    }

    let breakdown = state.scoring.current_breakdown(subject_id).await?;
    state
        .score_cache
        .insert(subject_id, breakdown.clone())
        .await;

    Ok(Json(breakdown))
}

/// GET /api/v1/subjects/:subject_id/score/history
///
/// Score change history, most recent first, bounded by `limit`.
pub async fn get_score_history(
    State(state): State<Arc<AppState>>,
    Path(subject_id): Path<Uuid>,
    Query(params): Query<LimitParams>,
) -> Result<Json<ScoreHistoryResponse>, AppError> {
    let limit = params.limit.unwrap_or(10).clamp(1, 100);
    tracing::info!("GET /subjects/{}/score/history - limit: {}", subject_id, limit);

    let entries = state.scoring.score_history(subject_id, limit).await?;
    let score_history = entries
        .into_iter()
        .map(|e| ScoreHistoryItem {
            old_score: e.old_score,
            new_score: e.new_score,
            change_reason: e.change_reason,
            date: e.recorded_at,
        })
        .collect();

    Ok(Json(ScoreHistoryResponse { score_history }))
}

/// POST /api/v1/subjects/:subject_id/loan-applications
///
/// Persists a loan application, scores it with the one-shot static
/// formula and caches the decision, one score row per application.
pub async fn apply_loan(
    State(state): State<Arc<AppState>>,
    Path(subject_id): Path<Uuid>,
    Json(req): Json<LoanApplicationRequest>,
) -> Result<(StatusCode, Json<LoanApplicationResponse>), AppError> {
    tracing::info!(
        "POST /subjects/{}/loan-applications - requested: {}",
        subject_id,
        req.requested_amount
    );

    let decision = loan::evaluate_application(&req)?;

    let ledger = LedgerStorage::new(state.db.clone());
    let application_id = ledger.create_application(subject_id, &req).await?;
    ledger
        .store_credit_score(application_id, subject_id, &decision)
        .await?;
    ledger
        .update_application_status(application_id, decision.eligibility.as_str())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LoanApplicationResponse {
            application_id,
            credit_score: decision,
        }),
    ))
}

/// GET /api/v1/subjects/:subject_id/credit-score
///
/// Latest cached static credit score for a subject, joined with the
/// application it was computed from.
pub async fn get_credit_score(
    State(state): State<Arc<AppState>>,
    Path(subject_id): Path<Uuid>,
) -> Result<Json<StoredCreditScoreResponse>, AppError> {
    tracing::info!("GET /subjects/{}/credit-score", subject_id);

    let ledger = LedgerStorage::new(state.db.clone());
    let score = ledger
        .latest_credit_score(subject_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No credit score found".to_string()))?;

    Ok(Json(score))
}

/// GET /api/v1/admin/dashboard
///
/// Aggregate figures over every stored static score.
pub async fn admin_dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardResponse>, AppError> {
    tracing::info!("GET /admin/dashboard");

    let dashboard = LedgerStorage::new(state.db.clone()).dashboard().await?;
    Ok(Json(dashboard))
}
