use std::sync::Arc;
use tracing::debug;

use crate::api::InvoiceApi;
use crate::error::Result;
use crate::invoice::{invoice_summary, Invoice, InvoiceId, InvoiceSummary};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DetailState {
    #[default]
    Idle,
    Loading,
    Loaded(Arc<Invoice>),
    NotFound,
    Failed(String),
}

/// Handle for one in-flight detail request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailTicket {
    generation: u64,
    id: InvoiceId,
}

impl DetailTicket {
    pub fn id(&self) -> &InvoiceId {
        &self.id
    }
}

/// Single-invoice view. Only the most recent request may update it, and
/// nothing may after `unmount`.
#[derive(Debug, Default)]
pub struct InvoiceDetail {
    state: DetailState,
    generation: u64,
    unmounted: bool,
    auth_expired: bool,
}

impl InvoiceDetail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    pub fn invoice(&self) -> Option<&Arc<Invoice>> {
        match &self.state {
            DetailState::Loaded(invoice) => Some(invoice),
            _ => None,
        }
    }

    pub fn summary(&self) -> InvoiceSummary {
        invoice_summary(self.invoice().map(|inv| inv.as_ref()))
    }

    pub fn auth_expired(&self) -> bool {
        self.auth_expired
    }

    /// Start loading `id`, superseding any request still in flight.
    pub fn request(&mut self, id: InvoiceId) -> Option<DetailTicket> {
        if self.unmounted {
            return None;
        }
        self.generation += 1;
        self.state = DetailState::Loading;
        Some(DetailTicket {
            generation: self.generation,
            id,
        })
    }

    /// Apply a response. Returns false when the ticket is stale or the view is gone.
    pub fn resolve(&mut self, ticket: DetailTicket, result: Result<Invoice>) -> bool {
        if self.unmounted || ticket.generation != self.generation {
            debug!(id = %ticket.id, "discarding stale invoice detail");
            return false;
        }
        self.state = match result {
            Ok(invoice) => DetailState::Loaded(Arc::new(invoice)),
            Err(e) if e.is_not_found() => DetailState::NotFound,
            Err(e) => {
                self.auth_expired |= e.is_auth();
                DetailState::Failed(e.user_message())
            }
        };
        true
    }

    pub fn load(&mut self, api: &dyn InvoiceApi, id: InvoiceId) -> &DetailState {
        if let Some(ticket) = self.request(id) {
            let result = api.get_invoice(ticket.id());
            self.resolve(ticket, result);
        }
        &self.state
    }

    pub fn unmount(&mut self) {
        self.unmounted = true;
    }
}
