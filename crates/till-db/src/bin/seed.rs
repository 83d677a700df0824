//! # Seed Data Generator
//!
//! Populates a database with a demo shift and a few invoices for
//! development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database file
//! cargo run -p till-db --bin seed
//!
//! # Specify the database path
//! cargo run -p till-db --bin seed -- --db ./data/till.db
//! ```
//!
//! Creates:
//! - settings for the "Main Store" profile, carried through the versioned
//!   field configuration
//! - one open shift for `cashier-1`
//! - a finalized sale (WIDGET x10, GADGET x2) paid in cash
//! - a finalized partial return of 3 WIDGET against it

use std::env;

use chrono::Utc;
use serde_json::{json, Map, Value};
use till_core::fields::FieldConfig;
use till_core::{Invoice, InvoiceLine, InvoiceStatus, PaymentLine, Shift, ShiftStatus};
use till_db::{Database, DbConfig};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut db_path = "./till.db".to_string();
    let args: Vec<String> = env::args().collect();
    if let Some(pos) = args.iter().position(|a| a == "--db") {
        if let Some(path) = args.get(pos + 1) {
            db_path = path.clone();
        }
    }

    let db = Database::open(DbConfig::new(&db_path)).await?;

    // Profile settings, carried out of a legacy-shaped document. The merge
    // keeps exactly the fields the current config version enumerates; stray
    // keys and wrong-kind values are dropped.
    let legacy: Map<String, Value> = serde_json::from_value(json!({
        "default_customer": "Walk-in Customer",
        "allow_return_without_original": 1,
        "allow_partial_payment": 0,
        "server_cache_ttl_secs": 900,
        "legacy_theme": "dark",
    }))?;
    let config = FieldConfig::current();
    let mut settings = Map::new();
    let copied = config.merge_settings(&mut settings, &legacy);
    db.profiles()
        .upsert_settings(
            "Main Store",
            &Value::Object(settings).to_string(),
            config.version(),
        )
        .await?;
    tracing::info!(copied, version = config.version(), "profile settings written");

    let now = Utc::now();
    let shift = Shift {
        id: Uuid::new_v4().to_string(),
        pos_profile: "Main Store".to_string(),
        user_id: "cashier-1".to_string(),
        status: ShiftStatus::Open,
        opening_float_cents: 10_000,
        closing_total_cents: None,
        opened_at: now,
        closed_at: None,
    };
    db.shifts().open(&shift).await?;

    // Finalized sale: WIDGET x10 @ $1.00, GADGET x2 @ $5.00.
    let sale = Invoice {
        id: Uuid::new_v4().to_string(),
        idempotency_token: Some(format!("seed-{}", &shift.id[..8])),
        status: InvoiceStatus::Draft,
        customer: "Walk-in Customer".to_string(),
        shift_id: Some(shift.id.clone()),
        is_return: false,
        return_against: None,
        subtotal_cents: 2_000,
        total_cents: 2_000,
        created_at: now,
        updated_at: now,
        finalized_at: None,
    };
    let sale_lines = vec![
        line(&sale.id, "WIDGET", 10, 100),
        line(&sale.id, "GADGET", 2, 500),
    ];
    let payment = PaymentLine {
        id: Uuid::new_v4().to_string(),
        invoice_id: sale.id.clone(),
        mode: "cash".to_string(),
        amount_cents: 2_000,
    };
    db.invoices()
        .create_draft(&sale, &sale_lines, &[payment])
        .await?;
    db.invoices().finalize(&sale.id).await?;

    // Finalized return of 3 WIDGET against the sale.
    let ret = Invoice {
        id: Uuid::new_v4().to_string(),
        idempotency_token: None,
        status: InvoiceStatus::Draft,
        customer: sale.customer.clone(),
        shift_id: Some(shift.id.clone()),
        is_return: true,
        return_against: Some(sale.id.clone()),
        subtotal_cents: -300,
        total_cents: -300,
        created_at: now,
        updated_at: now,
        finalized_at: None,
    };
    let ret_lines = vec![line(&ret.id, "WIDGET", -3, 100)];
    db.invoices().create_draft(&ret, &ret_lines, &[]).await?;
    db.invoices().finalize(&ret.id).await?;

    tracing::info!(
        db = %db_path,
        shift = %shift.id,
        sale = %sale.id,
        ret = %ret.id,
        "seed data written"
    );

    Ok(())
}

fn line(invoice_id: &str, item: &str, qty: i64, rate_cents: i64) -> InvoiceLine {
    InvoiceLine {
        id: Uuid::new_v4().to_string(),
        invoice_id: invoice_id.to_string(),
        item_code: item.to_string(),
        qty,
        rate_cents,
        amount_cents: qty * rate_cents,
    }
}
