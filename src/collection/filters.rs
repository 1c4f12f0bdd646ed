use std::cmp::Ordering;
use std::sync::Arc;

use crate::api::InvoiceQuery;
use crate::invoice::Invoice;

pub const DEFAULT_ORDERING: &str = "-created_at";
pub const ALL_STATUSES: &str = "all";

/// Search, filter and ordering criteria for an invoice list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceFilters {
    pub search: String,
    pub status: String,
    pub is_ndis: Option<bool>,
    /// Applied locally only; never sent to the server
    pub email_sent: Option<bool>,
    pub deposit_required: Option<bool>,
    pub deposit_paid: Option<bool>,
    /// Field name, `-` prefix for descending
    pub ordering: String,
}

impl Default for InvoiceFilters {
    fn default() -> Self {
        Self {
            search: String::new(),
            status: ALL_STATUSES.to_string(),
            is_ndis: None,
            email_sent: None,
            deposit_required: None,
            deposit_paid: None,
            ordering: DEFAULT_ORDERING.to_string(),
        }
    }
}

impl InvoiceFilters {
    /// The subset of these filters the API evaluates.
    pub fn server_query(&self) -> InvoiceQuery {
        let non_blank = |s: &str| {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };
        InvoiceQuery {
            search: non_blank(&self.search),
            ordering: non_blank(&self.ordering),
            is_ndis_invoice: self.is_ndis,
            deposit_required: self.deposit_required,
            deposit_paid: self.deposit_paid,
            status: non_blank(&self.status).filter(|s| !s.eq_ignore_ascii_case(ALL_STATUSES)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    TotalAmount,
    Subtotal,
    GstAmount,
    DepositAmount,
    DaysOverdue,
    InvoiceDate,
    DueDate,
    ServiceStartDate,
    CreatedAt,
    InvoiceNumber,
    ClientName,
    Status,
}

impl SortField {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "total_amount" => SortField::TotalAmount,
            "subtotal" => SortField::Subtotal,
            "gst_amount" => SortField::GstAmount,
            "deposit_amount" => SortField::DepositAmount,
            "days_overdue" => SortField::DaysOverdue,
            "invoice_date" => SortField::InvoiceDate,
            "due_date" => SortField::DueDate,
            "service_start_date" => SortField::ServiceStartDate,
            "created_at" => SortField::CreatedAt,
            "invoice_number" => SortField::InvoiceNumber,
            "client_name" | "client_full_name" => SortField::ClientName,
            "status" => SortField::Status,
            _ => return None,
        })
    }

    fn compare(self, a: &Invoice, b: &Invoice) -> Ordering {
        match self {
            SortField::TotalAmount => a.total_amount.cmp(&b.total_amount),
            SortField::Subtotal => a.subtotal.cmp(&b.subtotal),
            SortField::GstAmount => a.gst_amount.cmp(&b.gst_amount),
            SortField::DepositAmount => a.deposit.amount.cmp(&b.deposit.amount),
            SortField::DaysOverdue => a.days_overdue.cmp(&b.days_overdue),
            SortField::InvoiceDate => a.invoice_date.cmp(&b.invoice_date),
            SortField::DueDate => a.due_date.cmp(&b.due_date),
            SortField::ServiceStartDate => a.service_start_date.cmp(&b.service_start_date),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::InvoiceNumber => compare_text(&a.invoice_number, &b.invoice_number),
            SortField::ClientName => compare_text(&a.client_name, &b.client_name),
            SortField::Status => compare_text(a.status.as_str(), b.status.as_str()),
        }
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Parsed ordering key such as `-total_amount`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub field: Option<SortField>,
    pub descending: bool,
}

impl SortOrder {
    pub fn parse(ordering: &str) -> Self {
        let trimmed = ordering.trim();
        let (descending, name) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        Self {
            field: SortField::from_name(name),
            descending,
        }
    }
}

/// Stable sort; an unknown field leaves the order untouched.
pub fn sort_invoices(invoices: &mut [Arc<Invoice>], ordering: &str) {
    let order = SortOrder::parse(ordering);
    let Some(field) = order.field else {
        return;
    };
    invoices.sort_by(|a, b| {
        let ord = field.compare(a, b);
        if order.descending {
            ord.reverse()
        } else {
            ord
        }
    });
}

fn matches_search(invoice: &Invoice, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    let participant = invoice
        .ndis
        .as_ref()
        .map(|n| n.participant_name.as_str())
        .unwrap_or_default();
    let short_name = invoice.client_short_name.as_deref().unwrap_or_default();
    [
        invoice.invoice_number.as_str(),
        invoice.client_name.as_str(),
        short_name,
        participant,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
}

fn matches_status(invoice: &Invoice, status: &str) -> bool {
    status.is_empty()
        || status.eq_ignore_ascii_case(ALL_STATUSES)
        || invoice.status.as_str().eq_ignore_ascii_case(status)
}

fn matches_flag(actual: bool, wanted: Option<bool>) -> bool {
    wanted.map_or(true, |w| w == actual)
}

/// Run the filter stages in order (search, status, NDIS, email sent,
/// deposit required, deposit paid) and then sort.
pub fn apply_filters(invoices: &[Arc<Invoice>], filters: &InvoiceFilters) -> Vec<Arc<Invoice>> {
    let needle = filters.search.trim().to_lowercase();
    let status = filters.status.trim();

    let mut result: Vec<Arc<Invoice>> = invoices
        .iter()
        .filter(|inv| matches_search(inv, &needle))
        .filter(|inv| matches_status(inv, status))
        .filter(|inv| matches_flag(inv.is_ndis(), filters.is_ndis))
        .filter(|inv| matches_flag(inv.email_sent, filters.email_sent))
        .filter(|inv| matches_flag(inv.deposit.required, filters.deposit_required))
        .filter(|inv| matches_flag(inv.deposit.paid, filters.deposit_paid))
        .cloned()
        .collect();

    sort_invoices(&mut result, &filters.ordering);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn list(values: Vec<Value>) -> Vec<Arc<Invoice>> {
        values
            .iter()
            .map(|v| Arc::new(Invoice::from_value(v).unwrap()))
            .collect()
    }

    fn totals(invoices: &[Arc<Invoice>]) -> Vec<String> {
        invoices.iter().map(|i| i.total_amount.to_string()).collect()
    }

    #[test]
    fn sorts_by_total_both_directions() {
        let mut invoices = list(vec![
            json!({"total_amount": "50"}),
            json!({"total_amount": "10"}),
            json!({"total_amount": "30"}),
        ]);
        sort_invoices(&mut invoices, "-total_amount");
        assert_eq!(totals(&invoices), ["50", "30", "10"]);
        sort_invoices(&mut invoices, "total_amount");
        assert_eq!(totals(&invoices), ["10", "30", "50"]);
    }

    #[test]
    fn numeric_sort_is_not_lexical() {
        let mut invoices = list(vec![
            json!({"total_amount": "9"}),
            json!({"total_amount": "100"}),
        ]);
        sort_invoices(&mut invoices, "total_amount");
        assert_eq!(totals(&invoices), ["9", "100"]);
    }

    #[test]
    fn unknown_field_keeps_order() {
        let mut invoices = list(vec![
            json!({"total_amount": "2"}),
            json!({"total_amount": "1"}),
        ]);
        sort_invoices(&mut invoices, "-colour");
        assert_eq!(totals(&invoices), ["2", "1"]);
    }

    #[test]
    fn ndis_filter_preserves_relative_order() {
        let invoices = list(vec![
            json!({"id": 1}),
            json!({"id": 2, "is_ndis_invoice": true}),
            json!({"id": 3}),
            json!({"id": 4, "is_ndis_invoice": true}),
            json!({"id": 5}),
        ]);
        let filters = InvoiceFilters {
            is_ndis: Some(true),
            ordering: String::new(),
            ..Default::default()
        };
        let ids: Vec<String> = apply_filters(&invoices, &filters)
            .iter()
            .map(|i| i.id.to_string())
            .collect();
        assert_eq!(ids, ["2", "4"]);
    }

    #[test]
    fn search_covers_number_client_and_participant() {
        let invoices = list(vec![
            json!({"id": 1, "invoice_number": "INV-001", "client_name": "Acme"}),
            json!({"id": 2, "invoice_number": "INV-002", "client_name": "Birch"}),
            json!({"id": 3, "is_ndis_invoice": true, "participant_name": "Acme Jones"}),
        ]);
        let search = |text: &str| {
            let filters = InvoiceFilters {
                search: text.to_string(),
                ordering: String::new(),
                ..Default::default()
            };
            apply_filters(&invoices, &filters)
                .iter()
                .map(|i| i.id.to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(search("acme"), ["1", "3"]);
        assert_eq!(search("inv-002"), ["2"]);
        assert_eq!(search("  "), ["1", "2", "3"]);
    }

    #[test]
    fn search_matches_short_client_name_behind_full_name() {
        let invoices = list(vec![
            json!({"id": 1, "client_full_name": "Margaret Okafor", "client_name": "Maggie"}),
            json!({"id": 2, "client_name": "Maggie's Cafe"}),
            json!({"id": 3, "client_full_name": "Tom Reid"}),
        ]);
        let filters = InvoiceFilters {
            search: "maggie".to_string(),
            ordering: String::new(),
            ..Default::default()
        };
        let ids: Vec<String> = apply_filters(&invoices, &filters)
            .iter()
            .map(|i| i.id.to_string())
            .collect();
        assert_eq!(ids, ["1", "2"]);
        assert_eq!(invoices[0].client_name, "Margaret Okafor");
    }

    #[test]
    fn stages_combine() {
        let invoices = list(vec![
            json!({"id": 1, "status": "paid", "email_sent": true, "deposit_required": true, "deposit_paid": true}),
            json!({"id": 2, "status": "paid", "email_sent": false, "deposit_required": true}),
            json!({"id": 3, "status": "sent", "email_sent": true, "requires_deposit": true}),
            json!({"id": 4, "status": "PAID", "email_sent": true}),
        ]);
        let filters = InvoiceFilters {
            status: "paid".to_string(),
            email_sent: Some(true),
            deposit_required: Some(true),
            deposit_paid: Some(true),
            ..Default::default()
        };
        let result = apply_filters(&invoices, &filters);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id.as_str(), "1");

        let all = InvoiceFilters {
            status: "all".to_string(),
            ..Default::default()
        };
        assert_eq!(apply_filters(&invoices, &all).len(), 4);
    }

    #[test]
    fn server_query_excludes_local_filters() {
        let filters = InvoiceFilters {
            search: " smith ".to_string(),
            email_sent: Some(true),
            ..Default::default()
        };
        let query = filters.server_query();
        assert_eq!(query.search.as_deref(), Some("smith"));
        assert_eq!(query.ordering.as_deref(), Some(DEFAULT_ORDERING));
        assert_eq!(query.status, None);

        let local_only = InvoiceFilters {
            email_sent: Some(false),
            ..Default::default()
        };
        assert_eq!(local_only.server_query(), InvoiceFilters::default().server_query());
    }

    #[test]
    fn parse_ordering() {
        assert_eq!(
            SortOrder::parse("-due_date"),
            SortOrder {
                field: Some(SortField::DueDate),
                descending: true
            }
        );
        assert!(!SortOrder::parse("client_name").descending);
        assert_eq!(SortOrder::parse("").field, None);
    }
}
