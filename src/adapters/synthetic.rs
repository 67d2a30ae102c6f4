// ============================================
// Synthetic demo data
// ============================================
//
// Deterministic record sets used only in demo mode (never as an implicit
// fallback on production errors). The same (source, data_type, index)
// always produces the same record.

use serde_json::{Value, json};

use crate::models::Source;

/// How many records a synthetic set contains before the limit is applied.
pub const DEFAULT_SYNTHETIC_COUNT: usize = 8;

const FIRST_NAMES: &[&str] = &[
    "Ava", "Liam", "Noah", "Mia", "Ethan", "Zoe", "Lucas", "Ruby",
];
const LAST_NAMES: &[&str] = &[
    "Chen", "Okafor", "Silva", "Novak", "Haddad", "Kimura", "Berg", "Reyes",
];
const APPOINTMENT_TYPES: &[&str] = &[
    "Portfolio Review",
    "Tax Planning",
    "Retirement Check-in",
    "Initial Consultation",
];
const MERCHANTS: &[&str] = &[
    "Blue Bottle Coffee",
    "Trader Joe's",
    "Shell",
    "Netflix",
    "Delta Air Lines",
    "Office Depot",
    "Stripe Payout",
    "Payroll",
];

/// The data type a source's synthetic set is generated for when the caller
/// does not pick one.
pub fn default_data_type(source: Source) -> &'static str {
    match source {
        Source::Acuity => "appointments",
        Source::Google => "sheets",
        Source::Plaid => "transactions",
        Source::Quickbooks => "invoices",
    }
}

/// Generate up to `limit` deterministic records for (source, data_type).
pub fn synthetic_records(source: Source, data_type: &str, limit: usize) -> Vec<Value> {
    let count = DEFAULT_SYNTHETIC_COUNT.min(limit);
    (0..count)
        .map(|i| synthetic_record(source, data_type, i))
        .collect()
}

fn client_email(i: usize) -> String {
    format!(
        "{}.{}@example.com",
        FIRST_NAMES[i % FIRST_NAMES.len()].to_lowercase(),
        LAST_NAMES[i % LAST_NAMES.len()].to_lowercase()
    )
}

fn synthetic_record(source: Source, data_type: &str, i: usize) -> Value {
    match (source, data_type) {
        (Source::Acuity, "appointments") => json!({
            "id": 9000 + i,
            "datetime": format!("2025-01-{:02}T{:02}:00:00Z", 6 + i / 4, 9 + (i % 4) * 2),
            "duration": 45,
            "type": APPOINTMENT_TYPES[i % APPOINTMENT_TYPES.len()],
            "price": "150.00",
            "client": {
                "first_name": FIRST_NAMES[i % FIRST_NAMES.len()],
                "last_name": LAST_NAMES[i % LAST_NAMES.len()],
                "email": client_email(i),
            },
        }),
        (Source::Acuity, "clients") => json!({
            "id": 4000 + i,
            "first_name": FIRST_NAMES[i % FIRST_NAMES.len()],
            "last_name": LAST_NAMES[i % LAST_NAMES.len()],
            "email": client_email(i),
            "phone": format!("+1-555-01{:02}", i),
        }),
        (Source::Acuity, "appointment_types") => json!({
            "id": 100 + i,
            "name": APPOINTMENT_TYPES[i % APPOINTMENT_TYPES.len()],
            "duration": 30 + (i % 3) * 15,
            "price": format!("{}.00", 100 + i * 25),
        }),
        (Source::Acuity, "calendars") => json!({
            "id": 10 + i,
            "name": format!("Advisor {}", FIRST_NAMES[i % FIRST_NAMES.len()]),
            "timezone": "America/New_York",
        }),
        (Source::Google, "sheets") => json!({
            "id": format!("sheet-{}", i),
            "title": format!("Q{} Budget", i % 4 + 1),
            "row_count": 40 + i * 10,
            "updated": format!("2025-01-{:02}T12:00:00Z", i + 1),
        }),
        (Source::Plaid, "transactions") => json!({
            "transaction_id": format!("txn-{:04}", i),
            "account_id": "acct-demo-1",
            "date": format!("2025-01-{:02}", i + 2),
            "name": MERCHANTS[i % MERCHANTS.len()],
            "amount": format!("{}.{:02}", 12 + i * 7, (i * 37) % 100),
            "currency": "USD",
        }),
        (Source::Quickbooks, "invoices") => json!({
            "id": format!("inv-{:04}", 1000 + i),
            "customer": format!("{} {}", FIRST_NAMES[i % FIRST_NAMES.len()], LAST_NAMES[i % LAST_NAMES.len()]),
            "total": format!("{}.00", 500 + i * 120),
            "status": if i % 3 == 0 { "paid" } else { "open" },
            "due_date": format!("2025-02-{:02}", i + 1),
        }),
        _ => json!({
            "id": i,
            "source": source.as_str(),
            "data_type": data_type,
            "synthetic": true,
        }),
    }
}
