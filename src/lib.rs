pub mod api;
pub mod collection;
pub mod config;
pub mod error;
pub mod invoice;

pub use api::{ApiClient, InvoiceApi, InvoiceQuery, ResendReceipt};
pub use collection::{ActionOutcome, InvoiceCollection, InvoiceDetail, InvoiceFilters, InvoiceStats};
pub use config::{Config, Session};
pub use error::{PortalError, Result};
pub use invoice::{invoice_summary, Invoice, InvoiceId, InvoiceStatus, InvoiceSummary};
