use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::invoice::{Invoice, InvoiceStatus};

/// Aggregates over a user's loaded invoices
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct InvoiceStats {
    pub total: usize,
    /// One bucket per status value the server returned
    pub by_status: BTreeMap<String, usize>,
    pub ndis: usize,
    pub total_amount: Decimal,
    /// Sum of totals that are overdue and not yet paid
    pub overdue_amount: Decimal,
    pub deposit_required: usize,
    pub deposit_paid: usize,
    pub deposit_pending: usize,
    pub total_deposit_amount: Decimal,
}

pub fn compute_stats(invoices: &[Arc<Invoice>]) -> InvoiceStats {
    let mut stats = InvoiceStats {
        total: invoices.len(),
        ..Default::default()
    };

    for invoice in invoices {
        *stats
            .by_status
            .entry(invoice.status.as_str().to_string())
            .or_default() += 1;

        if invoice.is_ndis() {
            stats.ndis += 1;
        }

        // Amounts saturate at the Decimal bounds instead of overflowing
        stats.total_amount = stats.total_amount.saturating_add(invoice.total_amount);
        if invoice.is_overdue && !invoice.is_paid() {
            stats.overdue_amount = stats.overdue_amount.saturating_add(invoice.total_amount);
        }

        if invoice.deposit.required {
            stats.deposit_required += 1;
            stats.total_deposit_amount = stats
                .total_deposit_amount
                .saturating_add(invoice.deposit.amount);
            if invoice.deposit.paid {
                stats.deposit_paid += 1;
            } else {
                stats.deposit_pending += 1;
            }
        }
    }

    stats
}

fn subset(invoices: &[Arc<Invoice>], keep: impl Fn(&Invoice) -> bool) -> Vec<Arc<Invoice>> {
    invoices.iter().filter(|inv| keep(inv)).cloned().collect()
}

/// Overdue, unpaid and not cancelled
pub fn overdue(invoices: &[Arc<Invoice>]) -> Vec<Arc<Invoice>> {
    subset(invoices, |inv| {
        inv.is_overdue && !inv.is_paid() && inv.status != InvoiceStatus::Cancelled
    })
}

/// Newest first by creation time, falling back to the invoice date.
pub fn recent(invoices: &[Arc<Invoice>], limit: usize) -> Vec<Arc<Invoice>> {
    let mut sorted = invoices.to_vec();
    sorted.sort_by(|a, b| {
        (b.created_at, b.invoice_date).cmp(&(a.created_at, a.invoice_date))
    });
    sorted.truncate(limit);
    sorted
}

pub fn ndis(invoices: &[Arc<Invoice>]) -> Vec<Arc<Invoice>> {
    subset(invoices, Invoice::is_ndis)
}

pub fn deposit_required(invoices: &[Arc<Invoice>]) -> Vec<Arc<Invoice>> {
    subset(invoices, |inv| inv.deposit.required)
}

pub fn deposit_pending(invoices: &[Arc<Invoice>]) -> Vec<Arc<Invoice>> {
    subset(invoices, |inv| inv.deposit.required && !inv.deposit.paid)
}
