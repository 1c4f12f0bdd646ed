//! Client-side view model over the signed-in user's invoices.
//!
//! Owns the fetch lifecycle, the filter state and every derived view. Derived
//! views are computed lazily and dropped whenever the invoices or filters
//! change, so they are never stale.

mod detail;
mod filters;
mod outcome;
mod stats;

pub use detail::{DetailState, DetailTicket, InvoiceDetail};
pub use filters::{
    apply_filters, sort_invoices, InvoiceFilters, SortField, SortOrder, ALL_STATUSES,
    DEFAULT_ORDERING,
};
pub use outcome::ActionOutcome;
pub use stats::{compute_stats, InvoiceStats};

use chrono::Utc;
use std::cell::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::{InvoiceApi, InvoiceQuery, ResendReceipt};
use crate::error::{PortalError, Result};
use crate::invoice::{Invoice, InvoiceId};

pub const DEFAULT_RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}

/// Handle for one fetch cycle; completions from superseded cycles are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

/// An in-flight PDF download; hand it back to `complete_download`.
#[derive(Debug, PartialEq, Eq)]
pub struct DownloadTicket {
    id: InvoiceId,
}

impl DownloadTicket {
    pub fn id(&self) -> &InvoiceId {
        &self.id
    }
}

/// An in-flight email resend; hand it back to `complete_resend`.
#[derive(Debug, PartialEq, Eq)]
pub struct ResendTicket {
    id: InvoiceId,
}

impl ResendTicket {
    pub fn id(&self) -> &InvoiceId {
        &self.id
    }
}

#[derive(Debug)]
struct Derived {
    filtered: Vec<Arc<Invoice>>,
    stats: InvoiceStats,
}

#[derive(Debug, Default)]
pub struct InvoiceCollection {
    user: Option<String>,
    invoices: Vec<Arc<Invoice>>,
    filters: InvoiceFilters,
    state: FetchState,
    error: Option<String>,
    generation: u64,
    unmounted: bool,
    downloading: bool,
    resending: bool,
    auth_expired: bool,
    derived: OnceCell<Derived>,
}

fn failure_message(err: &PortalError, fallback: &str) -> String {
    let message = err.user_message();
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

/// File name for a downloaded invoice PDF
pub fn pdf_file_name(id: &InvoiceId, invoice_number: Option<&str>) -> String {
    match invoice_number.map(str::trim).filter(|n| !n.is_empty()) {
        Some(number) => format!("{}.pdf", number.replace(['/', '\\'], "-")),
        None => format!("invoice-{}.pdf", id),
    }
}

impl InvoiceCollection {
    pub fn new(user: Option<String>) -> Self {
        Self {
            user,
            ..Default::default()
        }
    }

    fn invalidate(&mut self) {
        self.derived.take();
    }

    fn derived(&self) -> &Derived {
        self.derived.get_or_init(|| Derived {
            filtered: apply_filters(&self.invoices, &self.filters),
            stats: compute_stats(&self.invoices),
        })
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Change the identity the collection belongs to. Returns true when a
    /// fetch is now required.
    pub fn set_user(&mut self, user: Option<String>) -> bool {
        if self.user == user {
            return false;
        }
        debug!(?user, "invoice collection identity changed");
        self.user = user;
        self.invoices.clear();
        self.error = None;
        self.state = FetchState::Idle;
        self.generation += 1;
        self.invalidate();
        self.user.is_some()
    }

    pub fn filters(&self) -> &InvoiceFilters {
        &self.filters
    }

    /// Replace the filters. Returns true when the server-side query changed
    /// and the caller should refetch.
    pub fn set_filters(&mut self, filters: InvoiceFilters) -> bool {
        let refetch = filters.server_query() != self.filters.server_query();
        self.filters = filters;
        self.invalidate();
        refetch
    }

    pub fn clear_filters(&mut self) -> bool {
        self.set_filters(InvoiceFilters::default())
    }

    pub fn query(&self) -> InvoiceQuery {
        self.filters.server_query()
    }

    pub fn state(&self) -> &FetchState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == FetchState::Loading
    }

    pub fn is_downloading(&self) -> bool {
        self.downloading
    }

    pub fn is_resending(&self) -> bool {
        self.resending
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// True once any call saw a 401; the session should be dropped.
    pub fn auth_expired(&self) -> bool {
        self.auth_expired
    }

    pub fn invoices(&self) -> &[Arc<Invoice>] {
        &self.invoices
    }

    /// Start a fetch cycle. None when there is no user or the view is gone.
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        if self.unmounted || self.user.is_none() {
            return None;
        }
        self.generation += 1;
        self.state = FetchState::Loading;
        Some(FetchTicket(self.generation))
    }

    /// Finish a fetch cycle. Returns false if the result was discarded.
    pub fn complete_fetch(&mut self, ticket: FetchTicket, result: Result<Vec<Invoice>>) -> bool {
        if self.unmounted || ticket.0 != self.generation {
            debug!("discarding stale invoice fetch");
            return false;
        }

        match result {
            Ok(invoices) => {
                info!(count = invoices.len(), "invoices loaded");
                self.invoices = invoices.into_iter().map(Arc::new).collect();
                self.error = None;
                self.state = FetchState::Loaded;
            }
            Err(e) => {
                warn!(error = %e, "failed to load invoices");
                self.auth_expired |= e.is_auth();
                self.invoices.clear();
                self.error = Some(failure_message(&e, "Failed to load invoices"));
                self.state = FetchState::Failed;
            }
        }
        self.invalidate();
        true
    }

    /// One full fetch cycle against the API. Never retries on its own.
    pub fn refresh(&mut self, api: &dyn InvoiceApi) -> bool {
        let Some(ticket) = self.begin_fetch() else {
            return false;
        };
        let result = api.list_invoices(&self.query());
        self.complete_fetch(ticket, result)
    }

    /// Loaded invoices after search, filters and ordering
    pub fn filtered(&self) -> &[Arc<Invoice>] {
        &self.derived().filtered
    }

    pub fn stats(&self) -> &InvoiceStats {
        &self.derived().stats
    }

    pub fn overdue(&self) -> Vec<Arc<Invoice>> {
        stats::overdue(&self.invoices)
    }

    pub fn recent(&self, limit: usize) -> Vec<Arc<Invoice>> {
        stats::recent(&self.invoices, limit)
    }

    pub fn ndis(&self) -> Vec<Arc<Invoice>> {
        stats::ndis(&self.invoices)
    }

    pub fn deposit_required(&self) -> Vec<Arc<Invoice>> {
        stats::deposit_required(&self.invoices)
    }

    pub fn deposit_pending(&self) -> Vec<Arc<Invoice>> {
        stats::deposit_pending(&self.invoices)
    }

    pub fn get_invoice_by_id(&self, id: &InvoiceId) -> Option<Arc<Invoice>> {
        self.invoices.iter().find(|inv| &inv.id == id).cloned()
    }

    fn action_guard(&self, busy: bool, what: &str) -> Result<()> {
        if self.unmounted {
            return Err(PortalError::ActionFailed(
                "Invoice list is no longer active".to_string(),
            ));
        }
        if busy {
            return Err(PortalError::ActionFailed(format!(
                "{} is already in progress",
                what
            )));
        }
        Ok(())
    }

    /// Mark a download of `id` as in flight. Fails while another is running.
    pub fn begin_download(&mut self, id: &InvoiceId) -> Result<DownloadTicket> {
        self.action_guard(self.downloading, "A download")?;
        self.downloading = true;
        Ok(DownloadTicket { id: id.clone() })
    }

    /// Save the fetched PDF under `out_dir` and clear the in-flight flag.
    pub fn complete_download(
        &mut self,
        ticket: DownloadTicket,
        result: Result<Vec<u8>>,
        out_dir: &Path,
    ) -> ActionOutcome<PathBuf> {
        self.downloading = false;
        let id = ticket.id;
        if self.unmounted {
            return ActionOutcome::failed("Invoice list is no longer active");
        }

        let bytes = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(%id, error = %e, "invoice download failed");
                self.auth_expired |= e.is_auth();
                return ActionOutcome::failed(failure_message(&e, "Failed to download invoice"));
            }
        };

        let number = self.get_invoice_by_id(&id).map(|inv| inv.invoice_number.clone());
        let path = out_dir.join(pdf_file_name(&id, number.as_deref()));
        let written = fs::create_dir_all(out_dir).and_then(|_| fs::write(&path, &bytes));
        match written {
            Ok(()) => {
                info!(%id, path = %path.display(), bytes = bytes.len(), "invoice saved");
                ActionOutcome::ok(path)
            }
            Err(e) => ActionOutcome::failed(failure_message(
                &PortalError::Io(e),
                "Failed to download invoice",
            )),
        }
    }

    /// Fetch the PDF for `id` and save it under `out_dir`.
    pub fn download_invoice(
        &mut self,
        api: &dyn InvoiceApi,
        id: &InvoiceId,
        out_dir: &Path,
    ) -> ActionOutcome<PathBuf> {
        let ticket = match self.begin_download(id) {
            Ok(ticket) => ticket,
            Err(e) => return ActionOutcome::failed(e.user_message()),
        };
        let result = api.download_invoice(ticket.id());
        self.complete_download(ticket, result, out_dir)
    }

    /// Mark an email resend of `id` as in flight. Fails while another is running.
    pub fn begin_resend(&mut self, id: &InvoiceId) -> Result<ResendTicket> {
        self.action_guard(self.resending, "An email resend")?;
        self.resending = true;
        Ok(ResendTicket { id: id.clone() })
    }

    /// Apply the API's answer. On success the local copy is marked as sent.
    ///
    /// Only the matching record is replaced; local state may drift from the
    /// server until the next full fetch.
    pub fn complete_resend(
        &mut self,
        ticket: ResendTicket,
        result: Result<ResendReceipt>,
    ) -> ActionOutcome<String> {
        self.resending = false;
        let id = ticket.id;
        if self.unmounted {
            return ActionOutcome::failed("Invoice list is no longer active");
        }

        let receipt = match result {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(%id, error = %e, "invoice email resend failed");
                self.auth_expired |= e.is_auth();
                return ActionOutcome::failed(failure_message(
                    &e,
                    "Failed to resend invoice email",
                ));
            }
        };

        if !receipt.success {
            return ActionOutcome::failed(
                receipt
                    .message
                    .unwrap_or_else(|| "Failed to resend invoice email".to_string()),
            );
        }

        if let Some(slot) = self.invoices.iter_mut().find(|inv| inv.id == id) {
            let patched = Invoice {
                email_sent: true,
                email_sent_at: Some(Utc::now()),
                ..Invoice::clone(slot)
            };
            *slot = Arc::new(patched);
            self.invalidate();
        }

        ActionOutcome::ok(
            receipt
                .message
                .unwrap_or_else(|| "Invoice email sent".to_string()),
        )
    }

    /// Ask the API to email the invoice again, then mark the local copy as sent.
    pub fn resend_invoice_email(
        &mut self,
        api: &dyn InvoiceApi,
        id: &InvoiceId,
    ) -> ActionOutcome<String> {
        let ticket = match self.begin_resend(id) {
            Ok(ticket) => ticket,
            Err(e) => return ActionOutcome::failed(e.user_message()),
        };
        let result = api.resend_invoice_email(ticket.id());
        self.complete_resend(ticket, result)
    }

    /// Detach the view; later completions and actions change nothing.
    pub fn unmount(&mut self) {
        self.unmounted = true;
    }
}
