//! Consumer side of the portal REST API.

mod client;
mod query;
mod response;

pub use client::ApiClient;
pub use query::InvoiceQuery;
pub use response::{error_for_status, extract_message};

use crate::error::Result;
use crate::invoice::{Invoice, InvoiceId};

/// Result of asking the API to email an invoice again
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResendReceipt {
    pub success: bool,
    pub message: Option<String>,
}

/// The invoice endpoints the portal consumes.
pub trait InvoiceApi {
    /// `GET /invoices/my-invoices/`. Non-array payloads come back empty.
    fn list_invoices(&self, query: &InvoiceQuery) -> Result<Vec<Invoice>>;

    /// `GET /invoices/<id>/`
    fn get_invoice(&self, id: &InvoiceId) -> Result<Invoice>;

    /// `GET /invoices/<id>/download/`, the raw PDF bytes
    fn download_invoice(&self, id: &InvoiceId) -> Result<Vec<u8>>;

    fn resend_invoice_email(&self, id: &InvoiceId) -> Result<ResendReceipt>;
}
