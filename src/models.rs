// Records exchanged with the REST and GraphQL services and persisted in the local cache
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Amounts on invoices are sent in minor units (øre)
pub const MINOR_UNITS_PER_MAJOR: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct User {
    #[serde(rename = "userId")]
    pub id: i64,
    #[serde(rename = "userReference")]
    pub reference: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub email: String,
}

// Trip boundaries are Unix epoch seconds
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Reservation {
    #[serde(rename = "licencePlate")]
    pub plate: String,
    #[serde(rename = "openCallSuccessfulTime")]
    pub start: i64,
    #[serde(rename = "closeCallSuccessfulTime")]
    pub end: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Bill {
    pub date: DateTime<Utc>,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Voucher {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub value: f64,
    #[serde(rename = "grantedAt")]
    pub granted_at: DateTime<Utc>,
}

// Bills and vouchers are fetched and cached together
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Financials {
    pub bills: Vec<Bill>,
    pub vouchers: Vec<Voucher>,
}

// Invoice as returned by the GraphQL service
#[derive(Debug, Deserialize)]
pub struct RemoteInvoice {
    pub date: DateTime<Utc>,
    pub total: RemoteAmount,
}

#[derive(Debug, Deserialize)]
pub struct RemoteAmount {
    pub amount: f64,
}

impl From<RemoteInvoice> for Bill {
    fn from(invoice: RemoteInvoice) -> Self {
        Bill {
            date: invoice.date,
            amount: invoice.total.amount / MINOR_UNITS_PER_MAJOR,
        }
    }
}
