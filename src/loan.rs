//! One-shot static scoring of a loan application.
//!
//! Unlike the dynamic ledger scorer, this formula looks only at the figures
//! declared on the application form. It is evaluated once at submission time
//! and its result is cached per application by the storage layer.

use crate::errors::AppError;
use crate::models::{Eligibility, LoanApplicationRequest, LoanDecision, LoanFactors};

/// Regulatory ceiling for small personal loans, in rupees.
const MAX_LOAN_CEILING: f64 = 125_000.0;
/// EMI schedule length used for affordability checks, in months.
const EMI_TENURE_MONTHS: i32 = 24;

/// Scores a loan application from its declared financials.
///
/// Returns a full decision: score, grade, eligibility, loan sizing, EMI
/// affordability and the RBI compliance flag. Rejects non-positive income
/// or requested amount and negative debt before computing anything, since
/// both ratios divide by the income.
pub fn evaluate_application(req: &LoanApplicationRequest) -> Result<LoanDecision, AppError> {
    if !req.monthly_income.is_finite() || req.monthly_income <= 0.0 {
        return Err(AppError::BadRequest(
            "monthly_income must be a positive number".to_string(),
        ));
    }
    if !req.requested_amount.is_finite() || req.requested_amount <= 0.0 {
        return Err(AppError::BadRequest(
            "requested_amount must be a positive number".to_string(),
        ));
    }
    if !req.existing_debt.is_finite() || req.existing_debt < 0.0 {
        return Err(AppError::BadRequest(
            "existing_debt must be a non-negative number".to_string(),
        ));
    }

    let mut score: i32 = 50;

    // Income factor (0-30 points)
    score += if req.monthly_income >= 50_000.0 {
        30
    } else if req.monthly_income >= 25_000.0 {
        20
    } else if req.monthly_income >= 15_000.0 {
        15
    } else if req.monthly_income >= 10_000.0 {
        10
    } else {
        5
    };

    // Debt factor (0-25 points)
    let debt_to_income_ratio = (req.existing_debt / req.monthly_income) * 100.0;
    score += if debt_to_income_ratio <= 20.0 {
        25
    } else if debt_to_income_ratio <= 40.0 {
        15
    } else if debt_to_income_ratio <= 60.0 {
        10
    } else {
        5
    };

    // Purpose factor (0-15 points); unknown purposes score the floor
    let purpose_points = purpose_points(&req.loan_purpose);
    score += purpose_points;

    // Amount factor (0-10 points)
    score += if req.requested_amount <= 25_000.0 {
        10
    } else if req.requested_amount <= 50_000.0 {
        8
    } else if req.requested_amount <= 75_000.0 {
        6
    } else if req.requested_amount <= 100_000.0 {
        4
    } else {
        2
    };

    let max_loan_amount = MAX_LOAN_CEILING.min(req.monthly_income * 50.0);
    let recommended_amount = req.requested_amount.min(max_loan_amount * 0.8);

    let interest_rate: f64 = if score >= 70 {
        18.0
    } else if score >= 50 {
        22.0
    } else {
        26.0
    };

    let monthly_rate = interest_rate / 100.0 / 12.0;
    let growth = (1.0 + monthly_rate).powi(EMI_TENURE_MONTHS);
    let emi_amount = (recommended_amount * monthly_rate * growth) / (growth - 1.0);
    let emi_to_income_ratio = (emi_amount / req.monthly_income) * 100.0;

    let (eligibility, grade) = if score >= 70
        && emi_to_income_ratio <= 50.0
        && req.requested_amount <= MAX_LOAN_CEILING
    {
        (Eligibility::Approved, "Excellent")
    } else if score >= 50 && emi_to_income_ratio <= 60.0 {
        (Eligibility::Review, "Good")
    } else {
        (Eligibility::Rejected, "Poor")
    };

    let rbi_compliant = req.requested_amount <= MAX_LOAN_CEILING
        && req.monthly_income >= 5_000.0
        && emi_to_income_ratio <= 50.0
        && interest_rate <= 26.0;

    let factors = LoanFactors {
        income: (((if req.monthly_income >= 25_000.0 { 30.0_f64 } else { 15.0 }) / 30.0) * 100.0)
            .round() as i32,
        debt: (((if debt_to_income_ratio <= 40.0 { 25.0_f64 } else { 10.0 }) / 25.0) * 100.0).round()
            as i32,
        purpose: ((purpose_points as f64 / 15.0) * 100.0).round() as i32,
        amount: (((if req.requested_amount <= 50_000.0 { 8.0_f64 } else { 4.0 }) / 10.0) * 100.0)
            .round() as i32,
    };

    Ok(LoanDecision {
        score,
        grade: grade.to_string(),
        eligibility,
        max_loan_amount,
        recommended_amount: recommended_amount.round(),
        interest_rate,
        emi_amount: emi_amount.round(),
        emi_to_income_ratio: (emi_to_income_ratio * 10.0).round() / 10.0,
        rbi_compliant,
        factors,
    })
}

fn purpose_points(purpose: &str) -> i32 {
    match purpose {
        "business" => 15,
        "agriculture" => 12,
        "education" => 10,
        "medical" => 8,
        "personal" => 5,
        _ => 5,
    }
}
