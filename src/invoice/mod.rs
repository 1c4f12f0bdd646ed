mod format;
pub mod lenient;
mod record;
mod summary;

pub use format::{format_amount, format_date, format_date_str, Amount, NOT_AVAILABLE};
pub use record::{
    invoices_from_payload, DepositTerms, Invoice, InvoiceId, InvoiceStatus, LineItem,
    NdisParticipant, RawInvoice, RawLineItem,
};
pub use summary::{
    deposit_info, invoice_summary, is_overdue, ndis_info, service_period, DepositInfo,
    InvoiceSummary, NdisInfo,
};
