//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module (see [`crate::payments`]). Keep this
//! module neat and tidy 🙏
//!
//! Every handler is async. Storage and gateway calls are awaited, never blocked on, so one slow gateway response
//! does not stall the worker thread.
use actix_web::{get, http::header, web, HttpRequest, HttpResponse, Responder, ResponseError};
use card_shop_engine::{
    db_types::{FulfillmentResult, NewProduct},
    order_objects::{ProductQuery, ProductUpdate},
    CatalogApi,
    OrderFlowApi,
    ShopDatabase,
    StatsApi,
};
use chrono::Utc;
use log::*;
use pay_gateway::{CallbackVerifier, PaymentCallback, PaymentGatewayApi};
use serde_json::json;

use crate::{
    config::ServerOptions,
    data_objects::{
        CardSecretFilter,
        CardSecretQuery,
        CardSecretUpload,
        CreateOrderParams,
        JsonResponse,
        OrderQueryParams,
        OrderStatusResponse,
        ProductListParams,
        StockUpdate,
    },
    errors::ServerError,
    helpers::get_remote_ip,
    payments::{create_order_with_payment, handle_payment_notification},
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Catalogue  ----------------------------------------------------
route!(products => Get "/products" impl ShopDatabase);
pub async fn products<B: ShopDatabase>(
    api: web::Data<CatalogApi<B>>,
    params: web::Query<ProductListParams>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received product list request");
    let query = ProductQuery::try_from(params.into_inner())?;
    let products = api.list_products(&query).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "products": products })))
}

route!(product_by_id => Get "/products/{id}" impl ShopDatabase);
pub async fn product_by_id<B: ShopDatabase>(
    path: web::Path<String>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    trace!("💻️ Received product request for {id}");
    // Storefront visitors never see inactive or draft products
    let product = api
        .product(&id)
        .await?
        .filter(|p| p.is_purchasable())
        .ok_or_else(|| ServerError::NoRecordFound(format!("Product {id}")))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "product": product })))
}

route!(categories => Get "/categories" impl ShopDatabase);
pub async fn categories<B: ShopDatabase>(api: web::Data<CatalogApi<B>>) -> Result<HttpResponse, ServerError> {
    let categories = api.categories().await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "categories": categories })))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl ShopDatabase);
pub async fn create_order<B: ShopDatabase>(
    orders: web::Data<OrderFlowApi<B>>,
    gateway: web::Data<PaymentGatewayApi>,
    body: web::Json<CreateOrderParams>,
) -> Result<HttpResponse, ServerError> {
    let params = body.into_inner();
    debug!("💻️ Received order request for product {}", params.product_id);
    let response = create_order_with_payment(orders.get_ref(), gateway.get_ref(), params.into()).await?;
    Ok(HttpResponse::Ok().json(response))
}

route!(query_orders => Post "/orders/query" impl ShopDatabase);
pub async fn query_orders<B: ShopDatabase>(
    orders: web::Data<OrderFlowApi<B>>,
    body: web::Json<OrderQueryParams>,
) -> Result<HttpResponse, ServerError> {
    let contact = body.into_inner().contact_info;
    if contact.trim().is_empty() {
        return Err(ServerError::ValidationError("contactInfo is required".into()));
    }
    let orders = orders.orders_for_contact(&contact).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "orders": orders })))
}

route!(order_status => Get "/orders/status/{order_number}" impl ShopDatabase);
pub async fn order_status<B: ShopDatabase>(
    path: web::Path<String>,
    orders: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let number = path.into_inner();
    let order =
        orders.order_by_number(&number).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Order {number}")))?;
    Ok(HttpResponse::Ok().json(OrderStatusResponse {
        success: true,
        order_id: order.id,
        order_number: order.order_number,
        payment_status: order.payment_status,
        total_amount: order.total_amount,
    }))
}

route!(order_card_secret => Get "/orders/{id}/card-secret" impl ShopDatabase);
pub async fn order_card_secret<B: ShopDatabase>(
    path: web::Path<String>,
    query: web::Query<CardSecretQuery>,
    orders: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let secret = orders
        .card_secret_for_order(&order_id, &query.email)
        .await?
        .ok_or_else(|| ServerError::ValidationError(format!("Order {order_id} has not been paid yet")))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "cardSecret": secret })))
}

//----------------------------------------------   Payment  ----------------------------------------------------
route!(payment_notify => Post "/payment/notify" impl ShopDatabase);
/// The gateway's server-to-server notification. The gateway retries until it sees the plain-text body `success`.
pub async fn payment_notify<B: ShopDatabase>(
    req: HttpRequest,
    form: web::Form<PaymentCallback>,
    verifier: web::Data<CallbackVerifier>,
    orders: web::Data<OrderFlowApi<B>>,
    options: web::Data<ServerOptions>,
) -> HttpResponse {
    let peer = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded);
    let callback = form.into_inner();
    info!("💻️ Payment notification for {} from {peer:?}", callback.pay_id);
    match handle_payment_notification(verifier.get_ref(), orders.get_ref(), &callback).await {
        Ok(result) => {
            if let FulfillmentResult::OutOfStock(order) = &result {
                error!("💻️ Order {} is paid but waiting for inventory. Restock and fulfil it manually.", order.id);
            }
            HttpResponse::Ok().content_type("text/plain").body("success")
        },
        Err(e) => {
            warn!("💻️ Payment notification for {} was not applied. {e}", callback.pay_id);
            HttpResponse::build(e.status_code()).content_type("text/plain").body(e.to_string())
        },
    }
}

/// Where the customer's browser lands after paying. Nothing is changed here; the notification does that.
#[get("/payment/return")]
pub async fn payment_return(
    req: HttpRequest,
    verifier: web::Data<CallbackVerifier>,
    options: web::Data<ServerOptions>,
) -> HttpResponse {
    let location = match web::Query::<PaymentCallback>::from_query(req.query_string()) {
        Ok(callback) => match verifier.verify(&callback) {
            Ok(verified) => {
                format!("{}/success?orderId={}", options.frontend_url, urlencoding::encode(&verified.order_id))
            },
            Err(e) => error_page(&options.frontend_url, &e.public_message()),
        },
        Err(e) => {
            debug!("💻️ Payment return with unreadable parameters. {e}");
            error_page(&options.frontend_url, "Invalid payment return parameters")
        },
    };
    HttpResponse::Found().insert_header((header::LOCATION, location)).finish()
}

fn error_page(frontend_url: &str, message: &str) -> String {
    format!("{frontend_url}/payment/error?message={}", urlencoding::encode(message))
}

//----------------------------------------------   Admin: stats  ----------------------------------------------------
route!(dashboard_stats => Get "/stats" impl ShopDatabase);
pub async fn dashboard_stats<B: ShopDatabase>(api: web::Data<StatsApi<B>>) -> Result<HttpResponse, ServerError> {
    let stats = api.dashboard_stats(Utc::now()).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "stats": stats })))
}

route!(email_stats => Get "/email-stats" impl ShopDatabase);
pub async fn email_stats<B: ShopDatabase>(api: web::Data<StatsApi<B>>) -> Result<HttpResponse, ServerError> {
    let stats = api.email_stats().await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": stats })))
}

route!(database_status => Get "/database" impl ShopDatabase);
pub async fn database_status<B: ShopDatabase>(api: web::Data<StatsApi<B>>) -> HttpResponse {
    let (healthy, error) = match api.health_check().await {
        Ok(()) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };
    HttpResponse::Ok().json(json!({ "success": true, "backend": api.backend_name(), "healthy": healthy, "error": error }))
}

//----------------------------------------------   Admin: products  ----------------------------------------------------
route!(all_products => Get "/products" impl ShopDatabase);
pub async fn all_products<B: ShopDatabase>(api: web::Data<CatalogApi<B>>) -> Result<HttpResponse, ServerError> {
    let products = api.all_products().await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "products": products })))
}

route!(new_product => Post "/products" impl ShopDatabase);
pub async fn new_product<B: ShopDatabase>(
    api: web::Data<CatalogApi<B>>,
    body: web::Json<NewProduct>,
) -> Result<HttpResponse, ServerError> {
    let product = api.create_product(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "product": product })))
}

route!(update_product => Put "/products/{id}" impl ShopDatabase);
pub async fn update_product<B: ShopDatabase>(
    path: web::Path<String>,
    api: web::Data<CatalogApi<B>>,
    body: web::Json<ProductUpdate>,
) -> Result<HttpResponse, ServerError> {
    let product = api.update_product(&path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "product": product })))
}

route!(delete_product => Delete "/products/{id}" impl ShopDatabase);
pub async fn delete_product<B: ShopDatabase>(
    path: web::Path<String>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let outcome = api.delete_product(&id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "result": outcome })))
}

route!(update_stock => Patch "/products/{id}/stock" impl ShopDatabase);
pub async fn update_stock<B: ShopDatabase>(
    path: web::Path<String>,
    api: web::Data<CatalogApi<B>>,
    body: web::Json<StockUpdate>,
) -> Result<HttpResponse, ServerError> {
    let product = api.update_stock(&path.into_inner(), body.stock).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "product": product })))
}

//----------------------------------------------   Admin: card secrets  ------------------------------------------------
route!(product_card_secrets => Get "/products/{id}/card-secrets" impl ShopDatabase);
pub async fn product_card_secrets<B: ShopDatabase>(
    path: web::Path<String>,
    filter: web::Query<CardSecretFilter>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let inventory = api.card_secrets_for_product(&path.into_inner(), filter.status).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": inventory })))
}

route!(upload_card_secrets => Post "/products/{id}/card-secrets/upload" impl ShopDatabase);
pub async fn upload_card_secrets<B: ShopDatabase>(
    path: web::Path<String>,
    api: web::Data<CatalogApi<B>>,
    body: web::Json<CardSecretUpload>,
) -> Result<HttpResponse, ServerError> {
    let rows = body.into_inner().card_secrets;
    if rows.is_empty() {
        return Err(ServerError::ValidationError("No card secrets were supplied".into()));
    }
    let results = api.upload_card_secrets(&path.into_inner(), rows).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "results": results })))
}

route!(delete_card_secret => Delete "/card-secrets/{id}" impl ShopDatabase);
pub async fn delete_card_secret<B: ShopDatabase>(
    path: web::Path<String>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    api.delete_card_secret(&id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Card secret {id} deleted"))))
}

//----------------------------------------------   Admin: orders  ----------------------------------------------------
route!(all_orders => Get "/orders" impl ShopDatabase);
pub async fn all_orders<B: ShopDatabase>(api: web::Data<StatsApi<B>>) -> Result<HttpResponse, ServerError> {
    let orders = api.orders().await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "orders": orders })))
}

route!(cancel_order => Post "/orders/{id}/cancel" impl ShopDatabase);
pub async fn cancel_order<B: ShopDatabase>(
    path: web::Path<String>,
    orders: web::Data<OrderFlowApi<B>>,
    gateway: web::Data<PaymentGatewayApi>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let order = orders.fetch_order(&id).await?;
    if !order.is_pending() {
        return Err(ServerError::Conflict(format!("Order {id} is {} and cannot be cancelled", order.payment_status)));
    }
    if order.is_payment_received() {
        return Err(ServerError::Conflict(format!("Order {id} has been paid and cannot be cancelled")));
    }
    if let Some(gateway_order_id) = &order.payment_transaction_id {
        // The gateway may already have expired its side of the order. Cancelling locally is what matters.
        if let Err(e) = gateway.close_order(gateway_order_id).await {
            warn!("💻️ Could not close gateway order {gateway_order_id} for {id}. {e}");
        }
    }
    let order = orders.cancel_order(&id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "order": order })))
}

route!(fulfill_order => Post "/orders/{id}/fulfill" impl ShopDatabase);
pub async fn fulfill_order<B: ShopDatabase>(
    path: web::Path<String>,
    orders: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let (status, order) = match orders.fulfill(&id).await? {
        FulfillmentResult::Fulfilled(o) => ("fulfilled", o),
        FulfillmentResult::AlreadyFulfilled(o) => ("already_fulfilled", o),
        FulfillmentResult::NotPayable(o) => ("not_payable", o),
        FulfillmentResult::OutOfStock(o) => ("out_of_stock", o),
        FulfillmentResult::AwaitingPayment(_) => {
            return Err(ServerError::Conflict(format!("Order {id} has no confirmed payment")));
        },
        FulfillmentResult::OrderNotFound => return Err(ServerError::NoRecordFound(format!("Order {id}"))),
    };
    let success = matches!(status, "fulfilled" | "already_fulfilled");
    Ok(HttpResponse::Ok().json(json!({ "success": success, "result": status, "order": order })))
}
