use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use tracing::warn;

use super::lenient;

/// Invoice identifier as issued by the API (numeric or opaque).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(String);

impl InvoiceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InvoiceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for InvoiceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for InvoiceId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Invoice status. The server owns the set, so unknown values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
    Other(String),
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
            InvoiceStatus::Other(s) => s,
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => InvoiceStatus::Draft,
            "sent" => InvoiceStatus::Sent,
            "paid" => InvoiceStatus::Paid,
            "overdue" => InvoiceStatus::Overdue,
            "cancelled" | "canceled" => InvoiceStatus::Cancelled,
            _ => InvoiceStatus::Other(s.trim().to_string()),
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for InvoiceStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Wire shape of an invoice. Every field is optional and tolerant.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawInvoice {
    #[serde(deserialize_with = "lenient::text")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub invoice_number: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub client_name: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub client_full_name: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub billing_address: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub service_address: Option<String>,

    #[serde(deserialize_with = "lenient::decimal")]
    pub subtotal: Option<Decimal>,
    #[serde(deserialize_with = "lenient::decimal")]
    pub gst_amount: Option<Decimal>,
    #[serde(deserialize_with = "lenient::decimal")]
    pub total_amount: Option<Decimal>,

    #[serde(deserialize_with = "lenient::date")]
    pub invoice_date: Option<NaiveDate>,
    #[serde(deserialize_with = "lenient::date")]
    pub due_date: Option<NaiveDate>,
    #[serde(deserialize_with = "lenient::date")]
    pub service_start_date: Option<NaiveDate>,
    #[serde(deserialize_with = "lenient::date")]
    pub service_end_date: Option<NaiveDate>,
    #[serde(deserialize_with = "lenient::timestamp")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(deserialize_with = "lenient::text")]
    pub status: Option<String>,
    #[serde(deserialize_with = "lenient::flag")]
    pub is_overdue: bool,
    #[serde(deserialize_with = "lenient::count")]
    pub days_overdue: u32,

    #[serde(deserialize_with = "lenient::flag")]
    pub email_sent: bool,
    #[serde(deserialize_with = "lenient::timestamp")]
    pub email_sent_at: Option<DateTime<Utc>>,

    #[serde(deserialize_with = "lenient::flag")]
    pub is_ndis_invoice: bool,
    #[serde(deserialize_with = "lenient::text")]
    pub participant_name: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub ndis_number: Option<String>,

    #[serde(deserialize_with = "lenient::flag")]
    pub deposit_required: bool,
    #[serde(deserialize_with = "lenient::flag")]
    pub requires_deposit: bool,
    #[serde(deserialize_with = "lenient::decimal")]
    pub deposit_amount: Option<Decimal>,
    #[serde(deserialize_with = "lenient::decimal")]
    pub deposit_percentage: Option<Decimal>,
    #[serde(deserialize_with = "lenient::flag")]
    pub deposit_paid: bool,
    #[serde(deserialize_with = "lenient::date")]
    pub deposit_paid_date: Option<NaiveDate>,
    #[serde(deserialize_with = "lenient::decimal")]
    pub remaining_balance: Option<Decimal>,
    #[serde(deserialize_with = "lenient::text")]
    pub formatted_deposit_amount: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub formatted_remaining_balance: Option<String>,

    #[serde(deserialize_with = "lenient::list")]
    pub items: Vec<RawLineItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLineItem {
    #[serde(deserialize_with = "lenient::text")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient::decimal")]
    pub quantity: Option<Decimal>,
    #[serde(deserialize_with = "lenient::decimal")]
    pub unit_price: Option<Decimal>,
    #[serde(deserialize_with = "lenient::flag")]
    pub is_taxable: bool,
    #[serde(deserialize_with = "lenient::decimal")]
    pub gst_amount: Option<Decimal>,
    #[serde(deserialize_with = "lenient::decimal")]
    pub total_price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub is_taxable: bool,
    pub gst_amount: Decimal,
    pub total_price: Decimal,
}

/// NDIS plan participant billed on the invoice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NdisParticipant {
    pub participant_name: String,
    pub ndis_number: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DepositTerms {
    /// `deposit_required || requires_deposit`: older records use the second name
    pub required: bool,
    pub amount: Decimal,
    pub percentage: Option<Decimal>,
    pub paid: bool,
    pub paid_date: Option<NaiveDate>,
    pub remaining_balance: Option<Decimal>,
    pub formatted_amount: Option<String>,
    pub formatted_remaining_balance: Option<String>,
}

/// Invoice as used everywhere past the API boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub client_name: String,
    /// The short `client_name` when a full name took its place above
    pub client_short_name: Option<String>,
    pub billing_address: String,
    pub service_address: String,
    pub subtotal: Decimal,
    pub gst_amount: Decimal,
    pub total_amount: Decimal,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub service_start_date: Option<NaiveDate>,
    pub service_end_date: Option<NaiveDate>,
    pub created_at: Option<DateTime<Utc>>,
    pub status: InvoiceStatus,
    pub is_overdue: bool,
    pub days_overdue: u32,
    pub email_sent: bool,
    pub email_sent_at: Option<DateTime<Utc>>,
    pub ndis: Option<NdisParticipant>,
    pub deposit: DepositTerms,
    pub items: Vec<LineItem>,
}

impl Invoice {
    /// Read one record from a JSON value; None if it is not an object.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value::<RawInvoice>(value.clone())
            .ok()
            .map(Invoice::from)
    }

    pub fn is_ndis(&self) -> bool {
        self.ndis.is_some()
    }

    pub fn is_paid(&self) -> bool {
        self.status == InvoiceStatus::Paid
    }
}

impl From<RawInvoice> for Invoice {
    fn from(raw: RawInvoice) -> Self {
        let (client_name, client_short_name) = match (raw.client_full_name, raw.client_name) {
            (Some(full), short) => {
                let short = short.filter(|s| s != &full);
                (full, short)
            }
            (None, short) => (short.unwrap_or_default(), None),
        };

        let ndis = raw.is_ndis_invoice.then(|| NdisParticipant {
            participant_name: raw.participant_name.unwrap_or_default(),
            ndis_number: raw.ndis_number.unwrap_or_default(),
        });

        let deposit = DepositTerms {
            required: raw.deposit_required || raw.requires_deposit,
            amount: raw.deposit_amount.unwrap_or_default(),
            percentage: raw.deposit_percentage,
            paid: raw.deposit_paid,
            paid_date: raw.deposit_paid_date,
            remaining_balance: raw.remaining_balance,
            formatted_amount: raw.formatted_deposit_amount,
            formatted_remaining_balance: raw.formatted_remaining_balance,
        };

        let items = raw
            .items
            .into_iter()
            .map(|item| LineItem {
                description: item.description.unwrap_or_default(),
                quantity: item.quantity.unwrap_or_default(),
                unit_price: item.unit_price.unwrap_or_default(),
                is_taxable: item.is_taxable,
                gst_amount: item.gst_amount.unwrap_or_default(),
                total_price: item.total_price.unwrap_or_default(),
            })
            .collect();

        Invoice {
            id: InvoiceId::new(raw.id.unwrap_or_default()),
            invoice_number: raw.invoice_number.unwrap_or_default(),
            client_name,
            client_short_name,
            billing_address: raw.billing_address.unwrap_or_default(),
            service_address: raw.service_address.unwrap_or_default(),
            subtotal: raw.subtotal.unwrap_or_default(),
            gst_amount: raw.gst_amount.unwrap_or_default(),
            total_amount: raw.total_amount.unwrap_or_default(),
            invoice_date: raw.invoice_date,
            due_date: raw.due_date,
            service_start_date: raw.service_start_date,
            service_end_date: raw.service_end_date,
            created_at: raw.created_at,
            status: raw
                .status
                .as_deref()
                .map(InvoiceStatus::from_string)
                .unwrap_or_default(),
            is_overdue: raw.is_overdue,
            days_overdue: raw.days_overdue,
            email_sent: raw.email_sent,
            email_sent_at: raw.email_sent_at,
            ndis,
            deposit,
            items,
        }
    }
}

/// Extract invoices from a list response.
///
/// Accepts a bare array or an object wrapping one under `results`, `invoices`
/// or `data`. Any other shape yields an empty list.
pub fn invoices_from_payload(payload: &Value) -> Vec<Invoice> {
    let elements = match payload {
        Value::Array(elements) => Some(elements),
        Value::Object(map) => ["results", "invoices", "data"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array)),
        _ => None,
    };

    let Some(elements) = elements else {
        warn!("invoice list response was not an array; treating as empty");
        return Vec::new();
    };

    let invoices: Vec<Invoice> = elements.iter().filter_map(Invoice::from_value).collect();
    if invoices.len() != elements.len() {
        warn!(
            skipped = elements.len() - invoices.len(),
            "dropped malformed invoice records"
        );
    }
    invoices
}
