//! Script to seed demo borrowers and six months of realistic ledger
//! activity for local development.

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use std::env;

use rust_riskscore_api::auth::hash_password;
use rust_riskscore_api::db::Database;
use rust_riskscore_api::models::{
    LoanApplicationRequest, NewTransaction, TransactionKind, TransactionStatus,
};
use rust_riskscore_api::storage::{self, LedgerStorage};

const KINDS: &[TransactionKind] = &[
    TransactionKind::Electricity,
    TransactionKind::Mobile,
    TransactionKind::Salary,
    TransactionKind::Bnpl,
    TransactionKind::Paylater,
];

fn providers_for(kind: TransactionKind) -> &'static [&'static str] {
    match kind {
        TransactionKind::Electricity => &["BSES", "Tata Power", "MSEB", "KSEB"],
        TransactionKind::Mobile => &["Airtel", "Jio", "Vi", "BSNL"],
        TransactionKind::Salary => &["TechCorp Ltd", "InfoSys", "Wipro", "Freelance"],
        TransactionKind::Bnpl => &["Paytm Postpaid", "Amazon Pay Later", "Flipkart Pay Later"],
        TransactionKind::Paylater => &["LazyPay", "Simpl", "ZestMoney", "KreditBee"],
    }
}

fn amount_for(kind: TransactionKind, rng: &mut impl Rng) -> f64 {
    match kind {
        TransactionKind::Electricity => rng.gen_range(800..=3500) as f64,
        TransactionKind::Mobile => rng.gen_range(199..=999) as f64,
        TransactionKind::Salary => rng.gen_range(25_000..=80_000) as f64,
        TransactionKind::Bnpl | TransactionKind::Paylater => rng.gen_range(500..=15_000) as f64,
    }
}

/// Main entry point for the seed script.
///
/// Creates three demo users with pending loan applications and 30-50
/// transactions each, spread over the last six months with an
/// 80/15/5 on-time/late/failed distribution.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt::init();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = Database::new(&database_url).await?;
    db.ensure_schema().await?;
    let ledger = LedgerStorage::new(db.pool.clone());

    let demo_users = [
        (
            "john@example.com",
            "password123",
            "John Doe",
            "+919876543210",
            "Mumbai, Maharashtra",
            "1990-01-15",
            (25_000.0, 15_000.0, "business", 50_000.0),
        ),
        (
            "jane@example.com",
            "demo123",
            "Jane Smith",
            "+919876543211",
            "Delhi, Delhi",
            "1992-03-20",
            (35_000.0, 8_000.0, "education", 75_000.0),
        ),
        (
            "demo@test.com",
            "demo",
            "Demo User",
            "+919876543212",
            "Bangalore, Karnataka",
            "1988-07-10",
            (45_000.0, 20_000.0, "business", 100_000.0),
        ),
    ];

    let mut rng = rand::thread_rng();
    let now = Utc::now();

    for (email, password, name, phone, address, dob, (income, debt, purpose, requested)) in
        demo_users
    {
        if ledger.find_user_by_email(email).await?.is_some() {
            tracing::info!("User {} already seeded, skipping", email);
            continue;
        }

        let user_id = ledger
            .create_user(email, &hash_password(password), name, phone, address, dob)
            .await?;

        ledger
            .create_application(
                user_id,
                &LoanApplicationRequest {
                    monthly_income: income,
                    existing_debt: debt,
                    loan_purpose: purpose.to_string(),
                    requested_amount: requested,
                },
            )
            .await?;

        let num_transactions = rng.gen_range(30..=50);
        let mut conn = db.pool.acquire().await?;

        for _ in 0..num_transactions {
            let kind = *KINDS.choose(&mut rng).expect("kind pool is non-empty");
            let provider = providers_for(kind)
                .choose(&mut rng)
                .expect("provider pool is non-empty")
                .to_string();
            let amount = amount_for(kind, &mut rng);

            let occurred_at: DateTime<Utc> = now - Duration::days(rng.gen_range(0..180));
            let due_at = occurred_at;

            // 80% on time, 15% late, 5% failed
            let roll: f64 = rng.gen();
            let (status, paid_at, days_late) = if roll < 0.80 {
                (
                    TransactionStatus::PaidOnTime,
                    Some(due_at - Duration::days(rng.gen_range(0..=2))),
                    0,
                )
            } else if roll < 0.95 {
                let late = rng.gen_range(1..=15);
                (
                    TransactionStatus::PaidLate,
                    Some(due_at + Duration::days(late)),
                    late as i32,
                )
            } else {
                (TransactionStatus::Failed, None, rng.gen_range(15..=45))
            };

            let input = NewTransaction {
                kind,
                amount,
                status,
                due_at: Some(due_at),
                paid_at,
                days_late,
                provider: provider.clone(),
                description: format!("{} - {} Payment", provider, kind.title()),
            };

            storage::append_transaction(&mut conn, user_id, &input, occurred_at).await?;
        }

        tracing::info!(
            "Seeded {} with {} transactions over the last six months",
            email,
            num_transactions
        );
    }

    tracing::info!("Seed data with realistic transactions created successfully");

    Ok(())
}
