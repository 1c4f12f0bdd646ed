use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use ureq::http::Response;
use ureq::{Agent, Body};

use super::query::InvoiceQuery;
use super::response::{error_for_status, extract_message};
use super::{InvoiceApi, ResendReceipt};
use crate::error::{PortalError, Result};
use crate::invoice::{invoices_from_payload, Invoice, InvoiceId};

/// Largest PDF accepted from the download endpoint
const MAX_DOWNLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Blocking HTTP client for the portal REST API.
pub struct ApiClient {
    agent: Agent,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    fn get(&self, path: &str, params: &[(&'static str, String)]) -> Result<Response<Body>> {
        let url = self.url(path);
        debug!(%url, ?params, "GET");

        let mut request = self
            .agent
            .get(&url)
            .header("Authorization", self.bearer())
            .header("Accept", "application/json");
        for (key, value) in params {
            request = request.query(*key, value);
        }
        request
            .call()
            .map_err(|e| PortalError::Network(e.to_string()))
    }

    fn post(&self, path: &str) -> Result<Response<Body>> {
        let url = self.url(path);
        debug!(%url, "POST");

        self.agent
            .post(&url)
            .header("Authorization", self.bearer())
            .header("Accept", "application/json")
            .send_empty()
            .map_err(|e| PortalError::Network(e.to_string()))
    }

    /// Read a JSON body, failing with the mapped error on non-2xx statuses.
    fn json_body(mut response: Response<Body>, what: &str) -> Result<Value> {
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| PortalError::Network(e.to_string()))?;
        debug!(status, bytes = body.len(), "response");

        if !(200..300).contains(&status) {
            return Err(error_for_status(status, &body, what));
        }
        Ok(serde_json::from_str(&body).unwrap_or(Value::Null))
    }
}

/// A successful single-invoice response must carry a JSON object.
fn invoice_from_payload(payload: &Value, what: &str) -> Result<Invoice> {
    Invoice::from_value(payload).ok_or_else(|| PortalError::UnexpectedStatus {
        status: 200,
        message: format!("The server sent an unreadable record for {}", what),
    })
}

impl InvoiceApi for ApiClient {
    fn list_invoices(&self, query: &InvoiceQuery) -> Result<Vec<Invoice>> {
        let response = self.get("invoices/my-invoices/", &query.params())?;
        let payload = Self::json_body(response, "invoices")?;
        Ok(invoices_from_payload(&payload))
    }

    fn get_invoice(&self, id: &InvoiceId) -> Result<Invoice> {
        let what = format!("invoice {}", id);
        let response = self.get(&format!("invoices/{}/", id), &[])?;
        let payload = Self::json_body(response, &what)?;
        invoice_from_payload(&payload, &what)
    }

    fn download_invoice(&self, id: &InvoiceId) -> Result<Vec<u8>> {
        let mut response = self.get(&format!("invoices/{}/download/", id), &[])?;
        let status = response.status().as_u16();

        if !(200..300).contains(&status) {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(error_for_status(status, &body, &format!("invoice {}", id)));
        }

        response
            .body_mut()
            .with_config()
            .limit(MAX_DOWNLOAD_BYTES)
            .read_to_vec()
            .map_err(|e| PortalError::Network(e.to_string()))
    }

    fn resend_invoice_email(&self, id: &InvoiceId) -> Result<ResendReceipt> {
        let response = self.post(&format!("invoices/{}/resend-email/", id))?;
        let payload = Self::json_body(response, &format!("invoice {}", id))?;

        Ok(ResendReceipt {
            success: payload
                .get("success")
                .and_then(Value::as_bool)
                .unwrap_or(true),
            message: extract_message(&payload),
        })
    }
}
