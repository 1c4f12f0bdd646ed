//! Display-ready views derived from a single [`Invoice`].
//!
//! Everything here is a pure function of the record: no state, no clock.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::format::{format_amount, format_date, NOT_AVAILABLE};
use super::record::Invoice;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepositInfo {
    pub amount: Decimal,
    pub percentage: Option<Decimal>,
    pub paid: bool,
    pub paid_date: Option<NaiveDate>,
    pub formatted_paid_date: String,
    pub remaining_balance: Decimal,
    pub formatted_amount: String,
    pub formatted_remaining_balance: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NdisInfo {
    pub participant_name: String,
    pub ndis_number: String,
    pub service_start_date: String,
    pub service_end_date: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct InvoiceSummary {
    pub id: String,
    pub invoice_number: String,
    pub client_name: String,
    pub status: String,
    pub subtotal: String,
    pub gst_amount: String,
    pub total_amount: String,
    pub invoice_date: String,
    pub due_date: String,
    pub service_period: String,
    pub is_overdue: bool,
    pub days_overdue: u32,
    pub email_sent: bool,
    pub is_ndis: bool,
    pub ndis: Option<NdisInfo>,
    pub deposit: Option<DepositInfo>,
    pub item_count: usize,
}

/// The server's overdue flag; no local date math is applied.
pub fn is_overdue(invoice: &Invoice) -> bool {
    invoice.is_overdue
}

pub fn service_period(invoice: &Invoice) -> String {
    let Some(start) = invoice.service_start_date else {
        return NOT_AVAILABLE.to_string();
    };
    let start = format_date(Some(start));
    match invoice.service_end_date.map(|end| format_date(Some(end))) {
        Some(end) if end != start => format!("{} - {}", start, end),
        _ => start,
    }
}

pub fn deposit_info(invoice: &Invoice) -> Option<DepositInfo> {
    let terms = &invoice.deposit;
    if !terms.required {
        return None;
    }

    let paid_towards_total = if terms.paid { terms.amount } else { Decimal::ZERO };
    let remaining_balance = terms
        .remaining_balance
        .unwrap_or_else(|| invoice.total_amount.saturating_sub(paid_towards_total));

    // Server-formatted strings win over local formatting
    let formatted_amount = terms
        .formatted_amount
        .clone()
        .unwrap_or_else(|| format_amount(terms.amount));
    let formatted_remaining_balance = terms
        .formatted_remaining_balance
        .clone()
        .unwrap_or_else(|| format_amount(remaining_balance));

    Some(DepositInfo {
        amount: terms.amount,
        percentage: terms.percentage,
        paid: terms.paid,
        paid_date: terms.paid_date,
        formatted_paid_date: format_date(terms.paid_date),
        remaining_balance,
        formatted_amount,
        formatted_remaining_balance,
    })
}

pub fn ndis_info(invoice: &Invoice) -> Option<NdisInfo> {
    let participant = invoice.ndis.as_ref()?;
    Some(NdisInfo {
        participant_name: participant.participant_name.clone(),
        ndis_number: participant.ndis_number.clone(),
        service_start_date: format_date(invoice.service_start_date),
        service_end_date: format_date(invoice.service_end_date),
    })
}

/// Everything the invoice views render. `None` yields an empty summary.
pub fn invoice_summary(invoice: Option<&Invoice>) -> InvoiceSummary {
    let Some(invoice) = invoice else {
        return InvoiceSummary::default();
    };

    InvoiceSummary {
        id: invoice.id.to_string(),
        invoice_number: invoice.invoice_number.clone(),
        client_name: invoice.client_name.clone(),
        status: invoice.status.to_string(),
        subtotal: format_amount(invoice.subtotal),
        gst_amount: format_amount(invoice.gst_amount),
        total_amount: format_amount(invoice.total_amount),
        invoice_date: format_date(invoice.invoice_date),
        due_date: format_date(invoice.due_date),
        service_period: service_period(invoice),
        is_overdue: is_overdue(invoice),
        days_overdue: invoice.days_overdue,
        email_sent: invoice.email_sent,
        is_ndis: invoice.is_ndis(),
        ndis: ndis_info(invoice),
        deposit: deposit_info(invoice),
        item_count: invoice.items.len(),
    }
}
