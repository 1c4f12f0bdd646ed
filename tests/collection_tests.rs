use client_portal::api::error_for_status;
use client_portal::collection::{DetailState, FetchState};
use client_portal::{
    Invoice, InvoiceApi, InvoiceCollection, InvoiceDetail, InvoiceFilters, InvoiceId,
    InvoiceQuery, PortalError, ResendReceipt, Result,
};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

/// In-memory stand-in for the portal API
#[derive(Default)]
struct FakeApi {
    records: Vec<Value>,
    /// Status code to fail with; 0 simulates a dropped connection
    fail_with: Option<u16>,
    resend_refused: bool,
    queries: RefCell<Vec<InvoiceQuery>>,
    resends: Cell<usize>,
}

impl FakeApi {
    fn with(records: Vec<Value>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    fn failing(status: u16) -> Self {
        Self {
            fail_with: Some(status),
            ..Default::default()
        }
    }

    fn failure(&self) -> Option<PortalError> {
        self.fail_with.map(|status| match status {
            0 => PortalError::Network("connection refused".to_string()),
            _ => error_for_status(status, r#"{"detail": "Boom"}"#, "invoice"),
        })
    }
}

impl InvoiceApi for FakeApi {
    fn list_invoices(&self, query: &InvoiceQuery) -> Result<Vec<Invoice>> {
        self.queries.borrow_mut().push(query.clone());
        if let Some(err) = self.failure() {
            return Err(err);
        }
        Ok(self.records.iter().filter_map(Invoice::from_value).collect())
    }

    fn get_invoice(&self, id: &InvoiceId) -> Result<Invoice> {
        if let Some(err) = self.failure() {
            return Err(err);
        }
        self.records
            .iter()
            .filter_map(Invoice::from_value)
            .find(|inv| &inv.id == id)
            .ok_or_else(|| PortalError::NotFound(format!("invoice {id}")))
    }

    fn download_invoice(&self, _id: &InvoiceId) -> Result<Vec<u8>> {
        match self.failure() {
            Some(err) => Err(err),
            None => Ok(b"%PDF-1.4 fake".to_vec()),
        }
    }

    fn resend_invoice_email(&self, _id: &InvoiceId) -> Result<ResendReceipt> {
        self.resends.set(self.resends.get() + 1);
        if let Some(err) = self.failure() {
            return Err(err);
        }
        Ok(ResendReceipt {
            success: !self.resend_refused,
            message: Some(if self.resend_refused {
                "Client has no email address".to_string()
            } else {
                "Invoice emailed to client".to_string()
            }),
        })
    }
}

fn sample_records() -> Vec<Value> {
    vec![
        json!({"id": 1, "invoice_number": "INV-001", "client_name": "Acme", "total_amount": "50",
               "status": "sent", "created_at": "2024-01-10T00:00:00Z"}),
        json!({"id": 2, "invoice_number": "INV-002", "client_name": "Birch", "total_amount": "10",
               "status": "paid", "email_sent": true, "created_at": "2024-02-10T00:00:00Z"}),
        json!({"id": 3, "invoice_number": "INV-003", "client_name": "Cedar", "total_amount": "30",
               "status": "overdue", "is_overdue": true, "days_overdue": 12,
               "is_ndis_invoice": true, "participant_name": "Dana",
               "created_at": "2024-03-10T00:00:00Z"}),
    ]
}

fn loaded(api: &FakeApi) -> InvoiceCollection {
    let mut collection = InvoiceCollection::new(Some("client-7".to_string()));
    assert!(collection.refresh(api));
    collection
}

#[test]
fn refresh_populates_invoices() {
    let api = FakeApi::with(sample_records());
    let collection = loaded(&api);

    assert_eq!(collection.state(), &FetchState::Loaded);
    assert_eq!(collection.invoices().len(), 3);
    assert!(collection.error().is_none());

    // default ordering is newest first
    let ids: Vec<&str> = collection.filtered().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, ["3", "2", "1"]);
}

#[test]
fn failed_fetch_clears_invoices_and_stores_message() {
    let api = FakeApi::failing(0);
    let mut collection = InvoiceCollection::new(Some("client-7".to_string()));
    collection.refresh(&api);

    assert_eq!(collection.state(), &FetchState::Failed);
    assert!(collection.invoices().is_empty());
    assert!(collection.error().is_some_and(|e| !e.is_empty()));
    assert!(!collection.auth_expired());
    // no automatic retry
    assert_eq!(api.queries.borrow().len(), 1);
}

#[test]
fn failure_after_success_drops_previous_invoices() {
    let ok = FakeApi::with(sample_records());
    let mut collection = loaded(&ok);
    assert_eq!(collection.invoices().len(), 3);

    collection.refresh(&FakeApi::failing(503));
    assert!(collection.invoices().is_empty());
    assert_eq!(collection.error(), Some("Boom"));
    assert!(collection.filtered().is_empty());
}

#[test]
fn unauthorised_fetch_flags_sign_out() {
    let mut collection = InvoiceCollection::new(Some("client-7".to_string()));
    collection.refresh(&FakeApi::failing(401));
    assert!(collection.auth_expired());
    assert!(collection.error().is_some());
}

#[test]
fn server_side_filters_are_sent() {
    let api = FakeApi::with(sample_records());
    let mut collection = InvoiceCollection::new(Some("client-7".to_string()));
    collection.set_filters(InvoiceFilters {
        search: "acme".to_string(),
        status: "all".to_string(),
        deposit_paid: Some(false),
        email_sent: Some(true),
        ordering: "-total_amount".to_string(),
        ..Default::default()
    });
    collection.refresh(&api);

    let queries = api.queries.borrow();
    let params = queries[0].params();
    assert_eq!(
        params,
        vec![
            ("search", "acme".to_string()),
            ("ordering", "-total_amount".to_string()),
            ("deposit_paid", "false".to_string()),
        ]
    );
}

#[test]
fn stale_fetch_is_ignored() {
    let mut collection = InvoiceCollection::new(Some("client-7".to_string()));
    let first = collection.begin_fetch().unwrap();
    let second = collection.begin_fetch().unwrap();

    let newer = vec![Invoice::from_value(&json!({"id": 2})).unwrap()];
    let older = vec![Invoice::from_value(&json!({"id": 1})).unwrap()];
    assert!(collection.complete_fetch(second, Ok(newer)));
    assert!(!collection.complete_fetch(first, Ok(older)));
    assert_eq!(collection.invoices()[0].id.as_str(), "2");
}

#[test]
fn unmounted_collection_ignores_completions() {
    let mut collection = InvoiceCollection::new(Some("client-7".to_string()));
    let ticket = collection.begin_fetch().unwrap();
    collection.unmount();

    let invoices = vec![Invoice::from_value(&json!({"id": 1})).unwrap()];
    assert!(!collection.complete_fetch(ticket, Ok(invoices)));
    assert!(collection.invoices().is_empty());
    assert!(collection.begin_fetch().is_none());

    let outcome = collection.resend_invoice_email(&FakeApi::default(), &InvoiceId::from(1));
    assert!(!outcome.success);
}

#[test]
fn user_change_discards_old_invoices() {
    let api = FakeApi::with(sample_records());
    let mut collection = loaded(&api);
    assert!(collection.set_user(Some("client-8".to_string())));
    assert!(collection.invoices().is_empty());
    assert!(!collection.set_user(None));
    assert!(!collection.refresh(&api));
}

#[test]
fn filters_recompute_derived_views() {
    let api = FakeApi::with(sample_records());
    let mut collection = loaded(&api);
    assert_eq!(collection.filtered().len(), 3);

    let refetch = collection.set_filters(InvoiceFilters {
        email_sent: Some(true),
        ..Default::default()
    });
    assert!(!refetch);
    let ids: Vec<&str> = collection.filtered().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, ["2"]);

    assert!(!collection.clear_filters());
    assert_eq!(collection.filtered().len(), 3);
}

#[test]
fn sort_by_total_through_collection() {
    let api = FakeApi::with(sample_records());
    let mut collection = loaded(&api);
    collection.set_filters(InvoiceFilters {
        ordering: "-total_amount".to_string(),
        ..Default::default()
    });
    let totals: Vec<String> = collection
        .filtered()
        .iter()
        .map(|i| i.total_amount.to_string())
        .collect();
    assert_eq!(totals, ["50", "30", "10"]);
}

#[test]
fn subsets_and_stats() {
    let api = FakeApi::with(sample_records());
    let collection = loaded(&api);

    assert_eq!(collection.overdue().len(), 1);
    assert_eq!(collection.ndis()[0].id.as_str(), "3");
    assert_eq!(collection.recent(2).len(), 2);
    assert!(collection.deposit_required().is_empty());

    let stats = collection.stats();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.by_status["overdue"], 1);
    assert_eq!(stats.total_amount.to_string(), "90");
}

#[test]
fn lookup_by_id() {
    let empty = InvoiceCollection::new(Some("client-7".to_string()));
    assert!(empty.get_invoice_by_id(&InvoiceId::from(1)).is_none());

    let api = FakeApi::with(sample_records());
    let collection = loaded(&api);
    assert_eq!(
        collection
            .get_invoice_by_id(&InvoiceId::from(2))
            .unwrap()
            .invoice_number,
        "INV-002"
    );
    assert!(collection.get_invoice_by_id(&InvoiceId::from(99)).is_none());
}

#[test]
fn resend_patches_only_the_target_record() {
    let api = FakeApi::with(sample_records());
    let mut collection = loaded(&api);
    let before: Vec<Arc<Invoice>> = collection.invoices().to_vec();

    let outcome = collection.resend_invoice_email(&api, &InvoiceId::from(1));
    assert!(outcome.success);
    assert_eq!(outcome.data.as_deref(), Some("Invoice emailed to client"));
    assert_eq!(api.resends.get(), 1);

    let after = collection.invoices();
    assert!(after[0].email_sent);
    assert!(after[0].email_sent_at.is_some());
    assert!(!Arc::ptr_eq(&before[0], &after[0]));
    assert!(Arc::ptr_eq(&before[1], &after[1]));
    assert!(Arc::ptr_eq(&before[2], &after[2]));
    assert_eq!(after[1].as_ref(), before[1].as_ref());

    // derived views see the patch
    collection.set_filters(InvoiceFilters {
        email_sent: Some(false),
        ..Default::default()
    });
    let ids: Vec<&str> = collection.filtered().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, ["3"]);
}

#[test]
fn second_resend_is_rejected_while_one_is_in_flight() {
    let api = FakeApi::with(sample_records());
    let mut collection = loaded(&api);
    let id = InvoiceId::from(1);

    let ticket = collection.begin_resend(&id).unwrap();
    assert!(collection.is_resending());

    let rejected = collection.resend_invoice_email(&api, &id);
    assert!(!rejected.success);
    assert_eq!(
        rejected.error.as_deref(),
        Some("An email resend is already in progress")
    );
    assert_eq!(api.resends.get(), 0);
    assert!(collection.is_resending());

    let result = api.resend_invoice_email(ticket.id());
    let outcome = collection.complete_resend(ticket, result);
    assert!(outcome.success);
    assert!(!collection.is_resending());
    assert!(collection.get_invoice_by_id(&id).unwrap().email_sent);
}

#[test]
fn refused_resend_leaves_records_alone() {
    let mut api = FakeApi::with(sample_records());
    api.resend_refused = true;
    let mut collection = loaded(&api);

    let outcome = collection.resend_invoice_email(&api, &InvoiceId::from(1));
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("Client has no email address"));
    assert!(!collection.invoices()[0].email_sent);
}

#[test]
fn download_saves_pdf_named_by_invoice_number() {
    let dir = TempDir::new().unwrap();
    let api = FakeApi::with(sample_records());
    let mut collection = loaded(&api);

    let outcome = collection.download_invoice(&api, &InvoiceId::from(2), dir.path());
    assert!(outcome.success);
    let path = outcome.data.unwrap();
    assert_eq!(path, dir.path().join("INV-002.pdf"));
    assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.4 fake");
    assert!(!collection.is_downloading());

    let outcome = collection.download_invoice(&api, &InvoiceId::from(44), dir.path());
    assert_eq!(outcome.data.unwrap(), dir.path().join("invoice-44.pdf"));
}

#[test]
fn download_failure_reports_server_message() {
    let dir = TempDir::new().unwrap();
    let mut collection = InvoiceCollection::new(Some("client-7".to_string()));

    let outcome = collection.download_invoice(&FakeApi::failing(500), &InvoiceId::from(1), dir.path());
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("Boom"));
    assert!(outcome.data.is_none());
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[test]
fn detail_view_loads_and_reports_not_found() {
    let api = FakeApi::with(sample_records());
    let mut detail = InvoiceDetail::new();

    match detail.load(&api, InvoiceId::from(3)) {
        DetailState::Loaded(invoice) => assert_eq!(invoice.invoice_number, "INV-003"),
        other => panic!("unexpected state {other:?}"),
    }
    let summary = detail.summary();
    assert_eq!(summary.ndis.unwrap().participant_name, "Dana");
    assert_eq!(summary.total_amount, "$30.00");

    assert_eq!(detail.load(&api, InvoiceId::from(99)), &DetailState::NotFound);
}
