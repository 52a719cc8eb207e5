/// Unit tests for the one-shot static loan application scorer
use rust_riskscore_api::errors::AppError;
use rust_riskscore_api::loan::evaluate_application;
use rust_riskscore_api::models::{Eligibility, LoanApplicationRequest};

fn request(
    monthly_income: f64,
    existing_debt: f64,
    loan_purpose: &str,
    requested_amount: f64,
) -> LoanApplicationRequest {
    LoanApplicationRequest {
        monthly_income,
        existing_debt,
        loan_purpose: loan_purpose.to_string(),
        requested_amount,
    }
}

#[cfg(test)]
mod decision_tests {
    use super::*;

    #[test]
    fn strong_applicant_is_approved() {
        let decision =
            evaluate_application(&request(50_000.0, 5_000.0, "business", 50_000.0)).unwrap();

        // 50 + 30 (income) + 25 (10% debt ratio) + 15 (business) + 8 (amount)
        assert_eq!(decision.score, 128);
        assert_eq!(decision.eligibility, Eligibility::Approved);
        assert_eq!(decision.grade, "Excellent");
        assert_eq!(decision.interest_rate, 18.0);
        assert!(decision.rbi_compliant);
        assert_eq!(decision.recommended_amount, 50_000.0);
        assert!(decision.emi_to_income_ratio <= 50.0);
    }

    #[test]
    fn weak_applicant_is_rejected() {
        let decision =
            evaluate_application(&request(8_000.0, 6_000.0, "personal", 120_000.0)).unwrap();

        // 50 + 5 + 5 (75% debt ratio) + 5 + 2
        assert_eq!(decision.score, 67);
        assert_eq!(decision.eligibility, Eligibility::Rejected);
        assert_eq!(decision.grade, "Poor");
        assert_eq!(decision.interest_rate, 22.0);
        assert!(!decision.rbi_compliant);
        assert!(decision.emi_to_income_ratio > 60.0);
    }

    #[test]
    fn loan_sizing_respects_the_regulatory_ceiling() {
        let decision =
            evaluate_application(&request(10_000.0, 1_000.0, "education", 500_000.0)).unwrap();

        // max loan is min(125000, 50x income)
        assert_eq!(decision.max_loan_amount, 125_000.0);
        // recommendation never exceeds 80% of the max
        assert!(decision.recommended_amount <= 100_000.0);
        // a request above the ceiling can never be approved
        assert_ne!(decision.eligibility, Eligibility::Approved);
    }

    #[test]
    fn unknown_purpose_scores_the_floor() {
        let known = evaluate_application(&request(30_000.0, 3_000.0, "personal", 40_000.0)).unwrap();
        let unknown =
            evaluate_application(&request(30_000.0, 3_000.0, "vacation", 40_000.0)).unwrap();

        assert_eq!(known.score, unknown.score);
    }

    #[test]
    fn factor_percentages_match_the_bands() {
        let decision =
            evaluate_application(&request(50_000.0, 5_000.0, "business", 50_000.0)).unwrap();

        assert_eq!(decision.factors.income, 100);
        assert_eq!(decision.factors.debt, 100);
        assert_eq!(decision.factors.purpose, 100);
        assert_eq!(decision.factors.amount, 80);
    }
}

#[cfg(test)]
mod validation_tests {
    use super::*;

    #[test]
    fn non_positive_income_is_rejected() {
        let err = evaluate_application(&request(0.0, 0.0, "business", 10_000.0)).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = evaluate_application(&request(-5_000.0, 0.0, "business", 10_000.0)).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn non_positive_requested_amount_is_rejected() {
        let err = evaluate_application(&request(20_000.0, 0.0, "business", 0.0)).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn negative_debt_is_rejected() {
        let err = evaluate_application(&request(20_000.0, -1.0, "business", 10_000.0)).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn non_finite_inputs_are_rejected() {
        assert!(evaluate_application(&request(f64::NAN, 0.0, "business", 10_000.0)).is_err());
        assert!(evaluate_application(&request(20_000.0, 0.0, "business", f64::INFINITY)).is_err());
    }
}
