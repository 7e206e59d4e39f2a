use actix_web::{
    body::to_bytes,
    http::{header, StatusCode},
    test,
    test::TestRequest,
    web,
    App,
};
use card_shop_engine::{
    db_types::{FulfillmentResult, Order, PaymentMethod, Product},
    order_objects::{CheckoutRequest, PaymentConfirmation},
    test_utils::prepare_env::{seed_product, temp_json_store},
    CatalogApi,
    JsonFileStore,
    OrderFlowApi,
    StatsApi,
};
use httpmock::MockServer;
use log::debug;
use pay_gateway::{CallbackVerifier, GatewayConfig, PaymentGatewayApi, SignatureMode};
use shop_common::Secret;
use tempfile::TempDir;

use crate::{config::ServerOptions, server::configure_routes};

pub const SECRET: &str = "endpoint-test-secret";
pub const ADMIN_TOKEN: &str = "let-me-in";
pub const FRONTEND: &str = "http://shop.test";

pub struct TestShop {
    // Dropping the directory deletes the store
    _dir: TempDir,
    pub db: JsonFileStore,
    pub gateway: MockServer,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or_else(|e| panic!("Not JSON ({e}): {}", self.body))
    }
}

impl TestShop {
    pub async fn new() -> Self {
        let _ = env_logger::try_init();
        let (dir, db) = temp_json_store().await;
        let gateway = MockServer::start_async().await;
        Self { _dir: dir, db, gateway }
    }

    pub async fn with_product(&self, title: &str, price: i64, secrets: usize) -> Product {
        seed_product(&self.db, title, price, secrets).await
    }

    pub fn orders(&self) -> OrderFlowApi<JsonFileStore> {
        OrderFlowApi::new(self.db.clone())
    }

    /// A pending order, created directly through the engine so no gateway call is involved.
    pub async fn pending_order(&self, product: &Product, contact: &str) -> Order {
        let request = CheckoutRequest {
            product_id: product.id.clone(),
            quantity: 1,
            contact_info: contact.into(),
            payment_method: PaymentMethod::Alipay,
        };
        self.orders().checkout(request).await.expect("Error creating order")
    }

    /// Confirms payment of the full order total, as a verified gateway notification would.
    pub async fn pay(&self, order: &Order) -> FulfillmentResult {
        let confirmation = PaymentConfirmation {
            order_id: order.id.clone(),
            product_id: order.product_id.clone(),
            amount_paid: Some(order.total_amount),
        };
        self.orders().confirm_payment(confirmation).await.expect("Error confirming payment")
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig::default().with_base_url(self.gateway.base_url()).with_secret(SECRET)
    }

    pub async fn send(&self, req: TestRequest) -> TestResponse {
        self.send_with_mode(req, SignatureMode::Strict).await
    }

    pub async fn send_with_mode(&self, req: TestRequest, mode: SignatureMode) -> TestResponse {
        let gateway = PaymentGatewayApi::new(self.gateway_config()).expect("Error creating gateway client");
        let verifier = CallbackVerifier::new(Secret::new(SECRET.to_string()), mode);
        let options = ServerOptions {
            frontend_url: FRONTEND.to_string(),
            use_x_forwarded_for: false,
            use_forwarded: false,
        };
        let db = self.db.clone();
        let app = App::new()
            .app_data(web::Data::new(OrderFlowApi::new(db.clone())))
            .app_data(web::Data::new(CatalogApi::new(db.clone())))
            .app_data(web::Data::new(StatsApi::new(db)))
            .app_data(web::Data::new(gateway))
            .app_data(web::Data::new(verifier))
            .app_data(web::Data::new(options))
            .configure(|cfg| configure_routes::<JsonFileStore>(cfg, Some(Secret::new(ADMIN_TOKEN.to_string()))));
        let service = test::init_service(app).await;
        debug!("Making request");
        match test::try_call_service(&service, req.to_request()).await {
            Ok(res) => {
                let status = res.status();
                let location =
                    res.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()).map(|s| s.to_string());
                let body = test::read_body(res).await;
                TestResponse { status, location, body: String::from_utf8_lossy(&body).into_owned() }
            },
            Err(e) => {
                let res = e.error_response();
                let status = res.status();
                let body = to_bytes(res.into_body()).await.unwrap_or_default();
                TestResponse { status, location: None, body: String::from_utf8_lossy(&body).into_owned() }
            },
        }
    }
}

pub fn admin(req: TestRequest) -> TestRequest {
    req.insert_header(("X-Admin-Token", ADMIN_TOKEN))
}
