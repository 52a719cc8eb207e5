//! Dynamic credit scoring over a subject's transaction ledger.
//!
//! Everything in this module is pure: the calculator maps an already-fetched,
//! newest-first transaction history and an explicit `as_of` timestamp to a
//! [`ScoreBreakdown`]. No clock reads, no I/O. The scoring service owns the
//! store round-trips and feeds this module.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

use crate::models::{
    Eligibility, Grade, ScoreBreakdown, ScoreFactor, Transaction, TransactionKind,
    TransactionStatus,
};

/// Component key for the payment reliability sub-score.
pub const PAYMENT_RELIABILITY: &str = "payment_reliability";
/// Component key for the utility bill behavior sub-score.
pub const BILL_PAYMENTS: &str = "bill_payments";
/// Component key for the income stability sub-score.
pub const INCOME_STABILITY: &str = "income_stability";
/// Component key for the debt behavior sub-score.
pub const DEBT_BEHAVIOR: &str = "debt_behavior";
/// Component key for the transaction frequency sub-score.
pub const TRANSACTION_FREQUENCY: &str = "transaction_frequency";

/// Weights, windows and thresholds for the dynamic scorer.
///
/// Hoisted into an explicit structure so a changed policy can be replayed
/// against historical ledgers without touching the algorithm.
#[derive(Debug, Clone)]
pub struct ScoringPolicy {
    /// Neutral starting score before any component is applied.
    pub base_score: f64,
    /// Weight of the payment reliability sub-score.
    pub reliability_weight: f64,
    /// Weight of the utility bill behavior sub-score.
    pub bill_weight: f64,
    /// Weight of the income stability sub-score.
    pub income_weight: f64,
    /// Weight of the debt behavior sub-score.
    pub debt_weight: f64,
    /// Weight of the transaction frequency sub-score.
    pub frequency_weight: f64,
    /// Trailing window for recent bill behavior, in days.
    pub bill_window_days: i64,
    /// Trailing window for transaction frequency, in days.
    pub frequency_window_days: i64,
    /// Minimum salary credits required before stability can be assessed.
    pub min_salary_samples: usize,
    /// Number of most recent salary credits considered.
    pub salary_sample_cap: usize,
    /// Rupee amount at which accumulated debt costs 10 penalty points.
    pub debt_amount_scale: f64,
    /// Lower edge of the optimal monthly transaction count.
    pub optimal_frequency_min: usize,
    /// Upper edge of the optimal monthly transaction count.
    pub optimal_frequency_max: usize,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            base_score: 50.0,
            reliability_weight: 0.35,
            bill_weight: 0.25,
            income_weight: 0.20,
            debt_weight: 0.15,
            frequency_weight: 0.05,
            bill_window_days: 90,
            frequency_window_days: 30,
            min_salary_samples: 3,
            salary_sample_cap: 6,
            debt_amount_scale: 50_000.0,
            optimal_frequency_min: 8,
            optimal_frequency_max: 15,
        }
    }
}

/// Calculates the full score breakdown for a transaction history.
///
/// `history` must be ordered newest first (descending `occurred_at`), the
/// order the transaction store returns. Two calls with identical inputs
/// produce identical output, down to component map iteration order.
///
/// An empty history yields the fixed neutral default: 50 / B / review with
/// empty components. That is a deliberate neutral prior, not a penalty.
pub fn calculate(
    history: &[Transaction],
    as_of: DateTime<Utc>,
    policy: &ScoringPolicy,
) -> ScoreBreakdown {
    if history.is_empty() {
        return default_breakdown();
    }

    let payment_txns: Vec<&Transaction> =
        history.iter().filter(|t| t.kind.is_payment()).collect();
    let bill_txns: Vec<&Transaction> = history.iter().filter(|t| t.kind.is_bill()).collect();
    let salary_txns: Vec<&Transaction> = history
        .iter()
        .filter(|t| t.kind == TransactionKind::Salary)
        .collect();
    let debt_txns: Vec<&Transaction> = history.iter().filter(|t| t.kind.is_debt()).collect();

    let frequency_cutoff = as_of - Duration::days(policy.frequency_window_days);
    let recent_count = history
        .iter()
        .filter(|t| t.occurred_at > frequency_cutoff)
        .count();

    let mut components = BTreeMap::new();
    components.insert(
        PAYMENT_RELIABILITY.to_string(),
        payment_reliability(&payment_txns) * policy.reliability_weight,
    );
    components.insert(
        BILL_PAYMENTS.to_string(),
        bill_payment_score(&bill_txns, as_of, policy) * policy.bill_weight,
    );
    components.insert(
        INCOME_STABILITY.to_string(),
        income_stability(&salary_txns, policy) * policy.income_weight,
    );
    components.insert(
        DEBT_BEHAVIOR.to_string(),
        debt_behavior(&debt_txns, policy) * policy.debt_weight,
    );
    components.insert(
        TRANSACTION_FREQUENCY.to_string(),
        transaction_frequency(recent_count, policy) * policy.frequency_weight,
    );

    let weighted_total: f64 = components.values().sum();
    // Truncate first, clamp second, matching the historical behavior.
    let score = ((policy.base_score + weighted_total) as i32).clamp(0, 100);
    let (grade, eligibility) = grade_for_score(score);

    let factors = build_factors(
        &components,
        &payment_txns,
        &bill_txns,
        &salary_txns,
        &debt_txns,
        recent_count,
        policy,
    );

    ScoreBreakdown {
        score,
        grade,
        eligibility,
        components,
        factors,
    }
}

/// Maps a final score to its grade and eligibility tier.
///
/// A deterministic step function; a higher score never yields a worse tier.
pub fn grade_for_score(score: i32) -> (Grade, Eligibility) {
    if score >= 80 {
        (Grade::APlus, Eligibility::Approved)
    } else if score >= 70 {
        (Grade::A, Eligibility::Approved)
    } else if score >= 60 {
        (Grade::BPlus, Eligibility::Approved)
    } else if score >= 50 {
        (Grade::B, Eligibility::Review)
    } else if score >= 40 {
        (Grade::CPlus, Eligibility::Review)
    } else if score >= 30 {
        (Grade::C, Eligibility::Review)
    } else {
        (Grade::D, Eligibility::Rejected)
    }
}

/// Generates the human-readable reason recorded with a score change.
///
/// Pure classification by delta sign and transaction status; used only for
/// the audit record.
pub fn change_reason(
    kind: TransactionKind,
    status: TransactionStatus,
    amount: f64,
    days_late: i32,
    score_change: i32,
) -> String {
    if score_change > 0 {
        match status {
            TransactionStatus::PaidOnTime => format!(
                "✅ {} bill (₹{}) paid on time → +{} points",
                kind.title(),
                amount,
                score_change
            ),
            _ => format!(
                "📈 {} transaction added → +{} points",
                kind.title(),
                score_change
            ),
        }
    } else if score_change < 0 {
        match status {
            TransactionStatus::PaidLate => format!(
                "⚠️ {} bill (₹{}) paid {} days late → {} points",
                kind.title(),
                amount,
                days_late,
                score_change
            ),
            TransactionStatus::Failed => format!(
                "❌ {} payment (₹{}) failed → {} points",
                kind.title(),
                amount,
                score_change
            ),
            _ => format!(
                "📉 {} transaction impact → {} points",
                kind.title(),
                score_change
            ),
        }
    } else {
        format!("➡️ {} transaction added (no score impact)", kind.title())
    }
}

/// Fixed breakdown for subjects with no transaction history.
fn default_breakdown() -> ScoreBreakdown {
    ScoreBreakdown {
        score: 50,
        grade: Grade::B,
        eligibility: Eligibility::Review,
        components: BTreeMap::new(),
        factors: vec![ScoreFactor {
            category: "No History".to_string(),
            impact: 0.0,
            details: "No transaction data available".to_string(),
        }],
    }
}

/// Payment reliability across all payment obligations, in [-25, +25].
///
/// +25 for a fully on-time record, -25 for a fully failed one. Late
/// payments cost half of what failures cost.
fn payment_reliability(payments: &[&Transaction]) -> f64 {
    if payments.is_empty() {
        return 0.0;
    }

    let total = payments.len() as f64;
    let on_time = count_status(payments, TransactionStatus::PaidOnTime);
    let late = count_status(payments, TransactionStatus::PaidLate);
    let failed = count_status(payments, TransactionStatus::Failed);

    let on_time_ratio = on_time / total;
    let late_penalty = (late * 0.5 + failed) / total;

    ((on_time_ratio * 25.0) - (late_penalty * 25.0)).clamp(-25.0, 25.0)
}

/// Utility bill behavior inside the trailing bill window, in [-10, +15].
///
/// Only bills occurring within the window count; a subject with no recent
/// bills scores 0 here regardless of older behavior.
fn bill_payment_score(bills: &[&Transaction], as_of: DateTime<Utc>, policy: &ScoringPolicy) -> f64 {
    if bills.is_empty() {
        return 0.0;
    }

    let cutoff = as_of - Duration::days(policy.bill_window_days);
    let recent: Vec<&&Transaction> = bills.iter().filter(|t| t.occurred_at > cutoff).collect();
    if recent.is_empty() {
        return 0.0;
    }

    let on_time = recent
        .iter()
        .filter(|t| t.status == TransactionStatus::PaidOnTime)
        .count() as f64;
    let recent_ratio = on_time / recent.len() as f64;

    (recent_ratio * 15.0) - ((1.0 - recent_ratio) * 10.0)
}

/// Income stability from recent salary credits, in [-5, +10].
///
/// Fewer than the minimum number of salary entries is treated as
/// insufficient history and scored at -5. Otherwise the variance of the
/// most recent credits is scaled against their mean, with a small bonus for
/// a full monthly record.
fn income_stability(salaries: &[&Transaction], policy: &ScoringPolicy) -> f64 {
    if salaries.len() < policy.min_salary_samples {
        return -5.0;
    }

    // History is newest first, so the head holds the latest credits.
    let amounts: Vec<f64> = salaries
        .iter()
        .take(policy.salary_sample_cap)
        .map(|t| t.amount)
        .collect();

    let mean = amounts.iter().sum::<f64>() / amounts.len() as f64;
    if mean <= 0.0 {
        return 0.0;
    }

    let variance = amounts.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / amounts.len() as f64;
    let mut stability = (10.0 - (variance / mean * 100.0)).max(0.0);

    if amounts.len() >= policy.salary_sample_cap {
        stability += 2.0;
    }

    stability.min(10.0)
}

/// BNPL/pay-later usage behavior, in [-15, +5].
///
/// No debt usage at all is rewarded with the full +5. Otherwise the total
/// drawn amount and the repayment record both cost points.
fn debt_behavior(debts: &[&Transaction], policy: &ScoringPolicy) -> f64 {
    if debts.is_empty() {
        return 5.0;
    }

    let total_debt_amount: f64 = debts.iter().map(|t| t.amount).sum();
    let failed = count_status(debts, TransactionStatus::Failed);
    let late = count_status(debts, TransactionStatus::PaidLate);

    let debt_penalty = ((total_debt_amount / policy.debt_amount_scale) * 10.0).min(15.0);
    let repayment_penalty = failed * 3.0 + late * 1.5;

    (5.0 - debt_penalty - repayment_penalty).max(-15.0)
}

/// Transaction frequency inside the trailing frequency window, in [0, +5].
///
/// The optimal band scores the full +5; sparser or busier months taper off.
fn transaction_frequency(recent_count: usize, policy: &ScoringPolicy) -> f64 {
    if recent_count >= policy.optimal_frequency_min && recent_count <= policy.optimal_frequency_max
    {
        5.0
    } else if recent_count < policy.optimal_frequency_min {
        (recent_count as f64 * 0.6).max(0.0)
    } else {
        (5.0 - (recent_count - policy.optimal_frequency_max) as f64 * 0.2).max(0.0)
    }
}

fn count_status(txns: &[&Transaction], status: TransactionStatus) -> f64 {
    txns.iter().filter(|t| t.status == status).count() as f64
}

/// One explanatory factor per non-empty category, carrying the weighted
/// contribution and a count-based description.
fn build_factors(
    components: &BTreeMap<String, f64>,
    payment_txns: &[&Transaction],
    bill_txns: &[&Transaction],
    salary_txns: &[&Transaction],
    debt_txns: &[&Transaction],
    recent_count: usize,
    policy: &ScoringPolicy,
) -> Vec<ScoreFactor> {
    let mut factors = Vec::new();

    if !payment_txns.is_empty() {
        let count = |status: TransactionStatus| {
            payment_txns.iter().filter(|t| t.status == status).count()
        };
        let on_time = count(TransactionStatus::PaidOnTime);
        let late = count(TransactionStatus::PaidLate);
        let failed = count(TransactionStatus::Failed);

        factors.push(ScoreFactor {
            category: "Payment Reliability".to_string(),
            impact: components.get(PAYMENT_RELIABILITY).copied().unwrap_or(0.0),
            details: format!("{} on-time, {} late, {} failed payments", on_time, late, failed),
        });
    }

    if !bill_txns.is_empty() {
        factors.push(ScoreFactor {
            category: "Utility Bills".to_string(),
            impact: components.get(BILL_PAYMENTS).copied().unwrap_or(0.0),
            details: format!("{} utility payments tracked", bill_txns.len()),
        });
    }

    if !salary_txns.is_empty() {
        factors.push(ScoreFactor {
            category: "Income Stability".to_string(),
            impact: components.get(INCOME_STABILITY).copied().unwrap_or(0.0),
            details: format!(
                "{} salary entries, regular income pattern",
                salary_txns.len()
            ),
        });
    }

    if !debt_txns.is_empty() {
        factors.push(ScoreFactor {
            category: "Debt Usage".to_string(),
            impact: components.get(DEBT_BEHAVIOR).copied().unwrap_or(0.0),
            details: format!("{} BNPL/pay-later installments tracked", debt_txns.len()),
        });
    }

    if recent_count > 0 {
        factors.push(ScoreFactor {
            category: "Recent Activity".to_string(),
            impact: components
                .get(TRANSACTION_FREQUENCY)
                .copied()
                .unwrap_or(0.0),
            details: format!(
                "{} transactions in the last {} days",
                recent_count, policy.frequency_window_days
            ),
        });
    }

    factors
}
