use std::time::Duration;

#[cfg(feature = "postgres")]
use card_shop_engine::PostgresDatabase;
use card_shop_engine::{BackendSelection, CatalogApi, JsonFileStore, OrderFlowApi, ShopDatabase, StatsApi};
use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use pay_gateway::{CallbackVerifier, PaymentGatewayApi, SignatureMode};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    middleware::AdminTokenMiddlewareFactory,
    routes::*,
};

#[cfg(feature = "postgres")]
const MAX_DB_CONNECTIONS: u32 = 25;

/// Opens the configured backend and runs the server on it. This is the only place that looks at which backend was
/// selected; everything downstream is generic over [`ShopDatabase`].
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    config.backend.log_choice();
    let srv = match &config.backend {
        #[cfg(feature = "postgres")]
        BackendSelection::Postgres { url } => {
            let db = PostgresDatabase::new_with_url(url, MAX_DB_CONNECTIONS)
                .await
                .map_err(|e| ServerError::InitializeError(e.to_string()))?;
            db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
            create_server_instance(config.clone(), db)?
        },
        #[cfg(not(feature = "postgres"))]
        BackendSelection::Postgres { .. } => {
            return Err(ServerError::ConfigurationError(
                "SHOP_DATABASE_URL is set, but this build has no Postgres support".into(),
            ))
        },
        BackendSelection::JsonFile { data_dir } => {
            let db = JsonFileStore::new(data_dir).await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
            create_server_instance(config.clone(), db)?
        },
    };
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance<B>(config: ServerConfig, db: B) -> Result<Server, ServerError>
where B: ShopDatabase + Send + 'static {
    let gateway = PaymentGatewayApi::new(config.gateway.clone())?;
    let verifier = CallbackVerifier::new(
        config.gateway.secret_key.clone(),
        SignatureMode::for_build(config.gateway.allow_mock_signature),
    );
    let options = ServerOptions::from_config(&config);
    let admin_token = config.admin_token.clone();
    let order_ttl = config.order_ttl;
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone()).with_order_ttl(order_ttl);
        let catalog_api = CatalogApi::new(db.clone());
        let stats_api = StatsApi::new(db.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("shop::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(catalog_api))
            .app_data(web::Data::new(stats_api))
            .app_data(web::Data::new(gateway.clone()))
            .app_data(web::Data::new(verifier.clone()))
            .app_data(web::Data::new(options.clone()))
            .service(health)
            .configure(|cfg| configure_routes::<B>(cfg, admin_token.clone()))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    info!("💻️ Listening on {}:{}", config.host, config.port);
    Ok(srv)
}

/// Registers every `/api` route. Shared with the endpoint tests so they exercise the real routing table.
pub fn configure_routes<B>(cfg: &mut web::ServiceConfig, admin_token: Option<shop_common::Secret<String>>)
where B: ShopDatabase + 'static {
    let admin_scope = web::scope("/admin")
        .wrap(AdminTokenMiddlewareFactory::new(admin_token))
        .service(DashboardStatsRoute::<B>::new())
        .service(EmailStatsRoute::<B>::new())
        .service(DatabaseStatusRoute::<B>::new())
        .service(AllProductsRoute::<B>::new())
        .service(NewProductRoute::<B>::new())
        .service(UpdateProductRoute::<B>::new())
        .service(DeleteProductRoute::<B>::new())
        .service(UpdateStockRoute::<B>::new())
        .service(ProductCardSecretsRoute::<B>::new())
        .service(UploadCardSecretsRoute::<B>::new())
        .service(DeleteCardSecretRoute::<B>::new())
        .service(AllOrdersRoute::<B>::new())
        .service(CancelOrderRoute::<B>::new())
        .service(FulfillOrderRoute::<B>::new());
    let api_scope = web::scope("/api")
        .service(admin_scope)
        .service(ProductsRoute::<B>::new())
        .service(ProductByIdRoute::<B>::new())
        .service(CategoriesRoute::<B>::new())
        .service(CreateOrderRoute::<B>::new())
        .service(QueryOrdersRoute::<B>::new())
        .service(OrderStatusRoute::<B>::new())
        .service(OrderCardSecretRoute::<B>::new())
        .service(PaymentNotifyRoute::<B>::new())
        .service(payment_return);
    cfg.service(api_scope);
}
