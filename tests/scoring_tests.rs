/// Unit tests for the dynamic scoring engine
/// Covers the neutral default, every sub-score formula, grade boundaries
/// and change reason generation.
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use rust_riskscore_api::models::{
    Eligibility, Grade, Transaction, TransactionKind, TransactionStatus,
};
use rust_riskscore_api::scoring::{
    calculate, change_reason, grade_for_score, ScoringPolicy, BILL_PAYMENTS, DEBT_BEHAVIOR,
    INCOME_STABILITY, PAYMENT_RELIABILITY, TRANSACTION_FREQUENCY,
};

const EPS: f64 = 1e-9;

fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
}

fn txn(
    kind: TransactionKind,
    status: TransactionStatus,
    amount: f64,
    age_days: i64,
) -> Transaction {
    Transaction {
        id: Uuid::new_v4(),
        subject_id: Uuid::nil(),
        kind,
        amount,
        status,
        due_at: None,
        paid_at: None,
        days_late: 0,
        provider: String::new(),
        description: String::new(),
        occurred_at: as_of() - Duration::days(age_days),
    }
}

/// Newest-first ordering, the order the transaction store returns.
fn sorted(mut history: Vec<Transaction>) -> Vec<Transaction> {
    history.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
    history
}

#[cfg(test)]
mod default_breakdown_tests {
    use super::*;

    #[test]
    fn empty_history_yields_neutral_default() {
        let breakdown = calculate(&[], as_of(), &ScoringPolicy::default());

        assert_eq!(breakdown.score, 50);
        assert_eq!(breakdown.grade, Grade::B);
        assert_eq!(breakdown.eligibility, Eligibility::Review);
        assert!(breakdown.components.is_empty());
        assert_eq!(breakdown.factors.len(), 1);
        assert_eq!(breakdown.factors[0].category, "No History");
        assert_eq!(breakdown.factors[0].details, "No transaction data available");
    }
}

#[cfg(test)]
mod reliability_tests {
    use super::*;

    #[test]
    fn four_payment_kinds_all_on_time_score_full_reliability() {
        let history = sorted(vec![
            txn(TransactionKind::Electricity, TransactionStatus::PaidOnTime, 1000.0, 10),
            txn(TransactionKind::Mobile, TransactionStatus::PaidOnTime, 1000.0, 11),
            txn(TransactionKind::Bnpl, TransactionStatus::PaidOnTime, 1000.0, 12),
            txn(TransactionKind::Paylater, TransactionStatus::PaidOnTime, 1000.0, 13),
        ]);

        let breakdown = calculate(&history, as_of(), &ScoringPolicy::default());

        // +25 raw, weighted by 0.35
        let reliability = breakdown.components[PAYMENT_RELIABILITY];
        assert!((reliability - 8.75).abs() < EPS, "got {}", reliability);
    }

    #[test]
    fn one_failed_three_on_time_reliability() {
        let history = sorted(vec![
            txn(TransactionKind::Electricity, TransactionStatus::PaidOnTime, 900.0, 5),
            txn(TransactionKind::Electricity, TransactionStatus::PaidOnTime, 950.0, 35),
            txn(TransactionKind::Electricity, TransactionStatus::PaidOnTime, 980.0, 65),
            txn(TransactionKind::Electricity, TransactionStatus::Failed, 1000.0, 95),
        ]);

        let breakdown = calculate(&history, as_of(), &ScoringPolicy::default());

        // (0.75 * 25) - (0.25 * 25) = 12.5 raw, 4.375 weighted
        let reliability = breakdown.components[PAYMENT_RELIABILITY];
        assert!((reliability - 4.375).abs() < EPS, "got {}", reliability);
    }

    #[test]
    fn salary_credits_do_not_count_toward_reliability() {
        let history = sorted(vec![
            txn(TransactionKind::Salary, TransactionStatus::PaidOnTime, 50_000.0, 10),
            txn(TransactionKind::Electricity, TransactionStatus::Failed, 1000.0, 20),
        ]);

        let breakdown = calculate(&history, as_of(), &ScoringPolicy::default());

        // The single payment transaction failed: -25 raw
        let reliability = breakdown.components[PAYMENT_RELIABILITY];
        assert!((reliability - (-25.0 * 0.35)).abs() < EPS, "got {}", reliability);
    }
}

#[cfg(test)]
mod bill_window_tests {
    use super::*;

    #[test]
    fn only_bills_inside_the_window_drive_the_bill_score() {
        // Two on-time bills inside 90 days, two late ones far outside
        let history = sorted(vec![
            txn(TransactionKind::Electricity, TransactionStatus::PaidOnTime, 1200.0, 10),
            txn(TransactionKind::Mobile, TransactionStatus::PaidOnTime, 500.0, 20),
            txn(TransactionKind::Electricity, TransactionStatus::PaidLate, 1100.0, 200),
            txn(TransactionKind::Mobile, TransactionStatus::PaidLate, 450.0, 210),
        ]);

        let breakdown = calculate(&history, as_of(), &ScoringPolicy::default());

        // Recent ratio is 1.0: 15 raw, 3.75 weighted, old lates ignored here
        let bills = breakdown.components[BILL_PAYMENTS];
        assert!((bills - 3.75).abs() < EPS, "got {}", bills);
    }

    #[test]
    fn bills_only_outside_the_window_score_zero() {
        let history = sorted(vec![
            txn(TransactionKind::Electricity, TransactionStatus::PaidOnTime, 1200.0, 120),
            txn(TransactionKind::Mobile, TransactionStatus::PaidOnTime, 500.0, 150),
        ]);

        let breakdown = calculate(&history, as_of(), &ScoringPolicy::default());

        assert!(breakdown.components[BILL_PAYMENTS].abs() < EPS);
    }
}

#[cfg(test)]
mod income_stability_tests {
    use super::*;

    #[test]
    fn fewer_than_three_salary_credits_is_insufficient_history() {
        let history = sorted(vec![
            txn(TransactionKind::Salary, TransactionStatus::PaidOnTime, 40_000.0, 10),
            txn(TransactionKind::Salary, TransactionStatus::PaidOnTime, 40_000.0, 40),
        ]);

        let breakdown = calculate(&history, as_of(), &ScoringPolicy::default());

        // Fixed -5 raw, -1.0 weighted
        let income = breakdown.components[INCOME_STABILITY];
        assert!((income - (-1.0)).abs() < EPS, "got {}", income);
    }

    #[test]
    fn six_identical_salaries_hit_the_cap() {
        let history = sorted(
            (0..6)
                .map(|i| {
                    txn(
                        TransactionKind::Salary,
                        TransactionStatus::PaidOnTime,
                        50_000.0,
                        i * 30,
                    )
                })
                .collect(),
        );

        let breakdown = calculate(&history, as_of(), &ScoringPolicy::default());

        // Zero variance plus the regularity bonus, capped at 10: 2.0 weighted
        let income = breakdown.components[INCOME_STABILITY];
        assert!((income - 2.0).abs() < EPS, "got {}", income);
    }

    #[test]
    fn volatile_salaries_keep_only_the_regularity_bonus() {
        let history = sorted(
            (0..6)
                .map(|i| {
                    let amount = if i % 2 == 0 { 10_000.0 } else { 90_000.0 };
                    txn(TransactionKind::Salary, TransactionStatus::PaidOnTime, amount, i * 30)
                })
                .collect(),
        );

        let breakdown = calculate(&history, as_of(), &ScoringPolicy::default());

        // Stability collapses to 0, the +2 bonus survives: 0.4 weighted
        let income = breakdown.components[INCOME_STABILITY];
        assert!((income - 0.4).abs() < EPS, "got {}", income);
    }
}

#[cfg(test)]
mod debt_behavior_tests {
    use super::*;

    #[test]
    fn no_debt_transactions_is_rewarded() {
        let history = sorted(vec![
            txn(TransactionKind::Electricity, TransactionStatus::PaidOnTime, 1200.0, 10),
            txn(TransactionKind::Salary, TransactionStatus::PaidOnTime, 50_000.0, 15),
        ]);

        let breakdown = calculate(&history, as_of(), &ScoringPolicy::default());

        // Fixed +5 raw, 0.75 weighted
        let debt = breakdown.components[DEBT_BEHAVIOR];
        assert!((debt - 0.75).abs() < EPS, "got {}", debt);
    }

    #[test]
    fn heavy_failed_debt_bottoms_out_at_the_floor() {
        let history = sorted(vec![
            txn(TransactionKind::Bnpl, TransactionStatus::Failed, 100_000.0, 10),
            txn(TransactionKind::Bnpl, TransactionStatus::Failed, 100_000.0, 20),
            txn(TransactionKind::Paylater, TransactionStatus::Failed, 100_000.0, 25),
        ]);

        let breakdown = calculate(&history, as_of(), &ScoringPolicy::default());

        // 5 - 15 - 9 clamps to -15 raw, -2.25 weighted
        let debt = breakdown.components[DEBT_BEHAVIOR];
        assert!((debt - (-2.25)).abs() < EPS, "got {}", debt);
    }
}

#[cfg(test)]
mod frequency_tests {
    use super::*;

    fn recent_bills(count: usize) -> Vec<Transaction> {
        sorted(
            (0..count)
                .map(|i| {
                    txn(
                        TransactionKind::Mobile,
                        TransactionStatus::PaidOnTime,
                        300.0,
                        (i % 25) as i64,
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn optimal_band_scores_full_points() {
        let breakdown = calculate(&recent_bills(10), as_of(), &ScoringPolicy::default());
        let frequency = breakdown.components[TRANSACTION_FREQUENCY];
        assert!((frequency - 0.25).abs() < EPS, "got {}", frequency);
    }

    #[test]
    fn sparse_month_tapers_down() {
        let breakdown = calculate(&recent_bills(3), as_of(), &ScoringPolicy::default());
        // 3 * 0.6 = 1.8 raw, 0.09 weighted
        let frequency = breakdown.components[TRANSACTION_FREQUENCY];
        assert!((frequency - 0.09).abs() < EPS, "got {}", frequency);
    }

    #[test]
    fn busy_month_tapers_down() {
        let breakdown = calculate(&recent_bills(20), as_of(), &ScoringPolicy::default());
        // 5 - (20 - 15) * 0.2 = 4 raw, 0.2 weighted
        let frequency = breakdown.components[TRANSACTION_FREQUENCY];
        assert!((frequency - 0.2).abs() < EPS, "got {}", frequency);
    }
}

#[cfg(test)]
mod breakdown_shape_tests {
    use super::*;

    fn full_history() -> Vec<Transaction> {
        sorted(vec![
            txn(TransactionKind::Electricity, TransactionStatus::PaidOnTime, 1200.0, 5),
            txn(TransactionKind::Mobile, TransactionStatus::PaidLate, 450.0, 12),
            txn(TransactionKind::Salary, TransactionStatus::PaidOnTime, 52_000.0, 15),
            txn(TransactionKind::Salary, TransactionStatus::PaidOnTime, 51_000.0, 45),
            txn(TransactionKind::Salary, TransactionStatus::PaidOnTime, 52_500.0, 75),
            txn(TransactionKind::Bnpl, TransactionStatus::Failed, 4_000.0, 20),
            txn(TransactionKind::Paylater, TransactionStatus::PaidOnTime, 2_500.0, 28),
        ])
    }

    #[test]
    fn non_empty_history_always_carries_all_five_components() {
        let breakdown = calculate(&full_history(), as_of(), &ScoringPolicy::default());

        assert_eq!(breakdown.components.len(), 5);
        for key in [
            PAYMENT_RELIABILITY,
            BILL_PAYMENTS,
            INCOME_STABILITY,
            DEBT_BEHAVIOR,
            TRANSACTION_FREQUENCY,
        ] {
            assert!(breakdown.components.contains_key(key), "missing {}", key);
        }
    }

    #[test]
    fn factors_cover_every_non_empty_category() {
        let breakdown = calculate(&full_history(), as_of(), &ScoringPolicy::default());

        let categories: Vec<&str> = breakdown
            .factors
            .iter()
            .map(|f| f.category.as_str())
            .collect();
        assert_eq!(
            categories,
            vec![
                "Payment Reliability",
                "Utility Bills",
                "Income Stability",
                "Debt Usage",
                "Recent Activity"
            ]
        );

        // 2 on-time, 1 late, 1 failed among the payment kinds
        assert_eq!(breakdown.factors[0].details, "2 on-time, 1 late, 1 failed payments");
        assert_eq!(breakdown.factors[1].details, "2 utility payments tracked");
        assert_eq!(
            breakdown.factors[2].details,
            "3 salary entries, regular income pattern"
        );
    }

    #[test]
    fn identical_inputs_produce_byte_identical_breakdowns() {
        let history = full_history();
        let policy = ScoringPolicy::default();

        let first = calculate(&history, as_of(), &policy);
        let second = calculate(&history, as_of(), &policy);

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn single_on_time_bill_never_lowers_the_neutral_prior() {
        let history = vec![txn(
            TransactionKind::Electricity,
            TransactionStatus::PaidOnTime,
            1200.0,
            3,
        )];

        let breakdown = calculate(&history, as_of(), &ScoringPolicy::default());
        assert!(breakdown.score >= 50, "got {}", breakdown.score);
    }

    #[test]
    fn final_score_clamps_at_the_floor() {
        // A policy with a low base pushes a bad ledger below zero
        let policy = ScoringPolicy {
            base_score: 5.0,
            ..ScoringPolicy::default()
        };
        let history = sorted(
            (0..10)
                .map(|i| txn(TransactionKind::Bnpl, TransactionStatus::Failed, 100_000.0, i))
                .collect(),
        );

        let breakdown = calculate(&history, as_of(), &policy);
        assert_eq!(breakdown.score, 0);
        assert_eq!(breakdown.grade, Grade::D);
        assert_eq!(breakdown.eligibility, Eligibility::Rejected);
    }

    #[test]
    fn final_score_clamps_at_the_ceiling() {
        let policy = ScoringPolicy {
            base_score: 95.0,
            ..ScoringPolicy::default()
        };
        let history = sorted(
            (0..10)
                .map(|i| {
                    txn(
                        TransactionKind::Electricity,
                        TransactionStatus::PaidOnTime,
                        1000.0,
                        i,
                    )
                })
                .collect(),
        );

        let breakdown = calculate(&history, as_of(), &policy);
        assert_eq!(breakdown.score, 100);
        assert_eq!(breakdown.grade, Grade::APlus);
        assert_eq!(breakdown.eligibility, Eligibility::Approved);
    }
}

#[cfg(test)]
mod grade_boundary_tests {
    use super::*;

    #[test]
    fn boundaries_are_exact() {
        assert_eq!(grade_for_score(80), (Grade::APlus, Eligibility::Approved));
        assert_eq!(grade_for_score(79), (Grade::A, Eligibility::Approved));
        assert_eq!(grade_for_score(70), (Grade::A, Eligibility::Approved));
        assert_eq!(grade_for_score(69), (Grade::BPlus, Eligibility::Approved));
        assert_eq!(grade_for_score(60), (Grade::BPlus, Eligibility::Approved));
        assert_eq!(grade_for_score(59), (Grade::B, Eligibility::Review));
        assert_eq!(grade_for_score(50), (Grade::B, Eligibility::Review));
        assert_eq!(grade_for_score(49), (Grade::CPlus, Eligibility::Review));
        assert_eq!(grade_for_score(40), (Grade::CPlus, Eligibility::Review));
        assert_eq!(grade_for_score(39), (Grade::C, Eligibility::Review));
        assert_eq!(grade_for_score(30), (Grade::C, Eligibility::Review));
        assert_eq!(grade_for_score(29), (Grade::D, Eligibility::Rejected));
        assert_eq!(grade_for_score(0), (Grade::D, Eligibility::Rejected));
        assert_eq!(grade_for_score(100), (Grade::APlus, Eligibility::Approved));
    }

    #[test]
    fn eligibility_never_worsens_as_the_score_rises() {
        fn rank(e: Eligibility) -> u8 {
            match e {
                Eligibility::Rejected => 0,
                Eligibility::Review => 1,
                Eligibility::Approved => 2,
            }
        }

        let mut previous = rank(grade_for_score(0).1);
        for score in 1..=100 {
            let current = rank(grade_for_score(score).1);
            assert!(current >= previous, "eligibility worsened at score {}", score);
            previous = current;
        }
    }
}

#[cfg(test)]
mod change_reason_tests {
    use super::*;

    #[test]
    fn positive_on_time_cites_kind_and_amount() {
        let reason = change_reason(
            TransactionKind::Electricity,
            TransactionStatus::PaidOnTime,
            1200.0,
            0,
            5,
        );
        assert_eq!(reason, "✅ Electricity bill (₹1200) paid on time → +5 points");
    }

    #[test]
    fn positive_other_status_is_generic() {
        let reason = change_reason(
            TransactionKind::Salary,
            TransactionStatus::Pending,
            50_000.0,
            0,
            3,
        );
        assert_eq!(reason, "📈 Salary transaction added → +3 points");
    }

    #[test]
    fn negative_late_cites_days_late() {
        let reason = change_reason(
            TransactionKind::Mobile,
            TransactionStatus::PaidLate,
            450.0,
            7,
            -4,
        );
        assert_eq!(reason, "⚠️ Mobile bill (₹450) paid 7 days late → -4 points");
    }

    #[test]
    fn negative_failed_cites_the_failure() {
        let reason = change_reason(
            TransactionKind::Bnpl,
            TransactionStatus::Failed,
            8000.0,
            0,
            -6,
        );
        assert_eq!(reason, "❌ Bnpl payment (₹8000) failed → -6 points");
    }

    #[test]
    fn negative_other_status_is_generic() {
        let reason = change_reason(
            TransactionKind::Paylater,
            TransactionStatus::Pending,
            2000.0,
            0,
            -1,
        );
        assert_eq!(reason, "📉 Paylater transaction impact → -1 points");
    }

    #[test]
    fn zero_delta_is_neutral() {
        let reason = change_reason(
            TransactionKind::Mobile,
            TransactionStatus::PaidOnTime,
            299.0,
            0,
            0,
        );
        assert_eq!(reason, "➡️ Mobile transaction added (no score impact)");
    }
}
