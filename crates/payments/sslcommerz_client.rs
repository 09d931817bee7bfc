use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use tracing::error;
use url::Url;

pub const SANDBOX_API_URL: &str = "https://sandbox.sslcommerz.com/gwprocess/v4/api.php";

/// Hosted-checkout client for an SSLCommerz-style gateway, built on reqwest.
pub struct SslCommerzClient {
    http: reqwest::Client,
    store_id: String,
    store_password: String,
    api_url: Url,
    currency: String,
    callback_base_url: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    status: Option<String>,
    #[serde(rename = "GatewayPageURL")]
    gateway_page_url: Option<String>,
    failedreason: Option<String>,
}

impl SslCommerzClient {
    pub fn new(
        store_id: String,
        store_password: String,
        api_url: Url,
        currency: String,
        callback_base_url: String,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build gateway http client")?;

        Ok(Self {
            http,
            store_id,
            store_password,
            api_url,
            currency,
            callback_base_url: callback_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn callback_url(&self, outcome: &str) -> String {
        format!("{}/payments/{}", self.callback_base_url, outcome)
    }

    /// Form fields of a session request. Customer and product fields are the
    /// fixed placeholders the gateway requires but this service does not track.
    fn session_form(&self, tran_id: &str, amount: Decimal) -> Vec<(&'static str, String)> {
        vec![
            ("store_id", self.store_id.clone()),
            ("store_passwd", self.store_password.clone()),
            ("total_amount", format_amount(amount)),
            ("currency", self.currency.clone()),
            ("tran_id", tran_id.to_string()),
            ("success_url", self.callback_url("success")),
            ("fail_url", self.callback_url("fail")),
            ("cancel_url", self.callback_url("cancel")),
            ("cus_name", "Customer".to_string()),
            ("cus_email", "customer@test.com".to_string()),
            ("cus_phone", "01700000000".to_string()),
            ("cus_add1", "Customer Address".to_string()),
            ("cus_city", "Dhaka".to_string()),
            ("cus_country", "Bangladesh".to_string()),
            ("shipping_method", "NO".to_string()),
            ("num_of_item", "1".to_string()),
            ("product_name", "Hospital Service".to_string()),
            ("product_category", "Healthcare".to_string()),
            ("product_profile", "general".to_string()),
        ]
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        error!(
            status = %status,
            response_body = %body,
            context = %context,
            "gateway api request failed"
        );

        anyhow::bail!("gateway request failed: {} (status {})", context, status);
    }

    /// Opens a hosted checkout session and returns the page the payer is
    /// redirected to.
    pub async fn create_session(&self, tran_id: &str, amount: Decimal) -> Result<String> {
        let form = self.session_form(tran_id, amount);

        let resp = self
            .http
            .post(self.api_url.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&form)
            .send()
            .await
            .context("gateway session request failed")?;
        let resp = Self::ensure_success(resp, "create session").await?;

        let body = resp.text().await.context("failed to read gateway response")?;
        parse_session_response(&body, tran_id)
    }
}

fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.2}")
}

fn parse_session_response(body: &str, tran_id: &str) -> Result<String> {
    let parsed: SessionResponse =
        serde_json::from_str(body).context("gateway returned a non-JSON session response")?;

    let accepted = parsed
        .status
        .as_deref()
        .is_some_and(|status| status.eq_ignore_ascii_case("SUCCESS"));

    match parsed.gateway_page_url.filter(|url| !url.is_empty()) {
        Some(url) if accepted => Ok(url),
        _ => {
            error!(
                tran_id,
                gateway_status = ?parsed.status,
                failed_reason = ?parsed.failedreason,
                "gateway rejected session"
            );
            anyhow::bail!(
                "gateway rejected session: {}",
                parsed
                    .failedreason
                    .unwrap_or_else(|| "no reason given".to_string())
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SslCommerzClient {
        SslCommerzClient::new(
            "store".to_string(),
            "secret".to_string(),
            Url::parse(SANDBOX_API_URL).unwrap(),
            "BDT".to_string(),
            "https://hms.example.com/".to_string(),
            Duration::from_secs(20),
        )
        .unwrap()
    }

    #[test]
    fn session_form_carries_amount_and_callbacks() {
        let form = client().session_form("tran-1", Decimal::new(15, 0));
        let get = |key: &str| {
            form.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
                .unwrap()
        };

        assert_eq!(get("total_amount"), "15.00");
        assert_eq!(get("tran_id"), "tran-1");
        assert_eq!(get("currency"), "BDT");
        assert_eq!(get("store_passwd"), "secret");
        assert_eq!(get("success_url"), "https://hms.example.com/payments/success");
        assert_eq!(get("fail_url"), "https://hms.example.com/payments/fail");
        assert_eq!(get("cancel_url"), "https://hms.example.com/payments/cancel");
    }

    #[test]
    fn session_form_rounds_to_two_places() {
        let form = client().session_form("tran-2", Decimal::new(12345, 3));
        let amount = form.iter().find(|(k, _)| *k == "total_amount").unwrap();
        assert_eq!(amount.1, "12.35");
    }

    #[test]
    fn accepted_session_yields_gateway_page() {
        let body = r#"{"status":"SUCCESS","GatewayPageURL":"https://pay.example/abc","failedreason":""}"#;
        assert_eq!(
            parse_session_response(body, "t").unwrap(),
            "https://pay.example/abc"
        );
    }

    #[test]
    fn rejected_session_surfaces_reason() {
        let body = r#"{"status":"FAILED","GatewayPageURL":"","failedreason":"Store Credential Error"}"#;
        let err = parse_session_response(body, "t").unwrap_err();
        assert!(err.to_string().contains("Store Credential Error"));
    }

    #[test]
    fn success_without_page_is_rejected() {
        let body = r#"{"status":"SUCCESS"}"#;
        assert!(parse_session_response(body, "t").is_err());
    }
}
