use std::sync::Arc;

use log::*;
use reqwest::{Client, StatusCode};

use crate::{
    response::{parse_close_order_response, parse_create_order_response, ParsedResponse},
    signature::{close_order_signature, create_order_signature},
    CreateOrderRequest,
    CreatedPayment,
    GatewayConfig,
    GatewayError,
    OrderParam,
};

/// HTTP client for the payment aggregator. Cheap to clone.
#[derive(Clone)]
pub struct PaymentGatewayApi {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl PaymentGatewayApi {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Registers a new payment with the gateway and returns the URL the customer must be sent to.
    ///
    /// Nothing is persisted here. The caller stores the returned gateway order id against its own order.
    pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<CreatedPayment, GatewayError> {
        let param = OrderParam {
            product_id: request.product_id.clone(),
            contact_info: request.contact_info.clone(),
            order_id: request.order_id.clone(),
        }
        .to_param_string()?;
        let price = request.amount.to_major_units_string();
        let payment_type = request.payment_type.gateway_code();
        let sign =
            create_order_signature(&request.order_id, &param, payment_type, &price, self.config.secret_key.reveal());
        let form = [
            ("payId", request.order_id.as_str()),
            ("type", payment_type),
            ("price", price.as_str()),
            ("sign", sign.as_str()),
            ("param", param.as_str()),
            ("isHtml", "1"),
            ("returnUrl", self.config.return_url.as_str()),
            ("notifyUrl", self.config.notify_url.as_str()),
        ];
        debug!("💳️ Creating gateway order for {} ({} {price})", request.order_id, request.payment_type);
        let (status, body) = self.post_form("/createOrder", &form).await?;
        match parse_create_order_response(&self.config.base_url, &body) {
            ParsedResponse::Json { pay_url, gateway_order_id } => {
                info!("💳️ Gateway order created for {} (JSON response). Gateway id: {gateway_order_id:?}", request.order_id);
                Ok(CreatedPayment { pay_url, gateway_order_id })
            },
            ParsedResponse::HtmlRedirect { pay_url, gateway_order_id } => {
                info!("💳️ Gateway order created for {} (HTML redirect). Gateway id: {gateway_order_id:?}", request.order_id);
                Ok(CreatedPayment { pay_url, gateway_order_id })
            },
            ParsedResponse::Rejected { code, message } => {
                warn!("💳️ Gateway rejected order {}. Code {code}: {message}", request.order_id);
                Err(GatewayError::Rejected { code, message })
            },
            ParsedResponse::Unrecognized if !status.is_success() => {
                warn!("💳️ Gateway returned HTTP {status} for order {}", request.order_id);
                Err(GatewayError::Rejected { code: i64::from(status.as_u16()), message: status.to_string() })
            },
            ParsedResponse::Unrecognized => {
                warn!("💳️ Could not parse the gateway response for order {}", request.order_id);
                trace!("💳️ Unparseable response body: {}", String::from_utf8_lossy(&body));
                Err(GatewayError::UnparseableResponse)
            },
        }
    }

    /// Closes an order on the gateway side so that it can no longer be paid.
    pub async fn close_order(&self, gateway_order_id: &str) -> Result<(), GatewayError> {
        let sign = close_order_signature(gateway_order_id, self.config.secret_key.reveal());
        let form = [("orderId", gateway_order_id), ("sign", sign.as_str())];
        debug!("💳️ Closing gateway order {gateway_order_id}");
        let (_, body) = self.post_form("/closeOrder", &form).await?;
        parse_close_order_response(&body)?;
        info!("💳️ Gateway order {gateway_order_id} closed");
        Ok(())
    }

    async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Result<(StatusCode, Vec<u8>), GatewayError> {
        let url = self.url(path);
        trace!("💳️ POST {url}");
        let response = self.client.post(url).form(form).send().await.map_err(network_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(network_error)?;
        trace!("💳️ Gateway responded with HTTP {status}, {} bytes", body.len());
        Ok((status, body.to_vec()))
    }
}

fn network_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        warn!("💳️ Payment gateway request timed out. {e}");
        GatewayError::Network("request timed out".to_string())
    } else {
        warn!("💳️ Payment gateway request failed. {e}");
        GatewayError::Network(e.to_string())
    }
}
