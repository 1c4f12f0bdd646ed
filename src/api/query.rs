/// Server-side filter for `GET /invoices/my-invoices/`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InvoiceQuery {
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub is_ndis_invoice: Option<bool>,
    pub deposit_required: Option<bool>,
    pub deposit_paid: Option<bool>,
    /// `"all"` means no status filter and is never sent
    pub status: Option<String>,
}

impl InvoiceQuery {
    /// Query parameters in a stable order; unset, blank and `"all"` values are omitted.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();

        let text = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        if let Some(search) = text(&self.search) {
            params.push(("search", search));
        }
        if let Some(ordering) = text(&self.ordering) {
            params.push(("ordering", ordering));
        }
        if let Some(flag) = self.is_ndis_invoice {
            params.push(("is_ndis_invoice", flag.to_string()));
        }
        if let Some(flag) = self.deposit_required {
            params.push(("deposit_required", flag.to_string()));
        }
        if let Some(flag) = self.deposit_paid {
            params.push(("deposit_paid", flag.to_string()));
        }
        if let Some(status) = text(&self.status).filter(|s| !s.eq_ignore_ascii_case("all")) {
            params.push(("status", status));
        }

        params
    }
}
