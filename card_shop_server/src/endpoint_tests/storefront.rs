use actix_web::{http::StatusCode, test::TestRequest};
use card_shop_engine::{db_types::PaymentStatus, ProductManagement};
use httpmock::prelude::*;
use serde_json::json;

use super::helpers::TestShop;

#[actix_web::test]
async fn list_products_hides_inactive() {
    let shop = TestShop::new().await;
    let visible = shop.with_product("Steam Key", 1500, 1).await;
    let hidden = shop.with_product("Old Key", 900, 1).await;
    let mut hidden = shop.db.fetch_product(&hidden.id).await.unwrap().unwrap();
    hidden.status = card_shop_engine::db_types::ProductStatus::Inactive;
    shop.db.upsert_product(hidden.clone()).await.unwrap();

    let res = shop.send(TestRequest::get().uri("/api/products")).await;
    assert_eq!(res.status, StatusCode::OK);
    let body = res.json();
    assert_eq!(body["success"], true);
    let products = body["products"].as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["id"], visible.id.as_str());

    let res = shop.send(TestRequest::get().uri(&format!("/api/products/{}", hidden.id))).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.json()["success"], false);
}

#[actix_web::test]
async fn unknown_sort_order_is_rejected() {
    let shop = TestShop::new().await;
    let res = shop.send(TestRequest::get().uri("/api/products?sort=random")).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn categories() {
    let shop = TestShop::new().await;
    shop.with_product("Steam Key", 1500, 1).await;
    let res = shop.send(TestRequest::get().uri("/api/categories")).await;
    assert_eq!(res.status, StatusCode::OK);
    let body = res.json();
    assert_eq!(body["categories"][0]["name"], "Games");
    assert_eq!(body["categories"][0]["subcategories"][0], "Accounts");
}

#[actix_web::test]
async fn create_order_returns_pay_url() {
    let shop = TestShop::new().await;
    let product = shop.with_product("Steam Key", 1550, 1).await;
    let mock = shop
        .gateway
        .mock_async(|when, then| {
            when.method(POST)
                .path("/createOrder")
                .x_www_form_urlencoded_tuple("price", "15.5")
                .x_www_form_urlencoded_tuple("type", "2");
            then.status(200).body(r#"{"code":1,"data":{"orderId":"G777","payUrl":"https://pay.example/p/1"}}"#);
        })
        .await;
    let req = TestRequest::post().uri("/api/orders").set_json(json!({
        "productId": product.id,
        "contactInfo": "alice@example.com",
        "quantity": 1,
        "unitPrice": 1,
        "paymentType": "alipay"
    }));
    let res = shop.send(req).await;
    mock.assert_async().await;
    assert_eq!(res.status, StatusCode::OK);
    let body = res.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["payUrl"], "https://pay.example/p/1");
    let order_id = body["orderId"].as_str().unwrap();
    let order = shop.orders().fetch_order(order_id).await.unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.total_amount.value(), 1550, "the client's price must be ignored");
    assert_eq!(order.payment_transaction_id.as_deref(), Some("G777"));
}

#[actix_web::test]
async fn gateway_failure_marks_order_failed() {
    let shop = TestShop::new().await;
    let product = shop.with_product("Steam Key", 1500, 1).await;
    shop.gateway
        .mock_async(|when, then| {
            when.method(POST).path("/createOrder");
            then.status(200).body(r#"{"code":0,"msg":"merchant disabled"}"#);
        })
        .await;
    let req = TestRequest::post().uri("/api/orders").set_json(json!({
        "productId": product.id,
        "contactInfo": "alice@example.com",
        "paymentType": "wechat"
    }));
    let res = shop.send(req).await;
    assert_eq!(res.status, StatusCode::BAD_GATEWAY);
    let body = res.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "merchant disabled");
    let orders = shop.orders().orders_for_contact("alice@example.com").await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].payment_status, PaymentStatus::Failed);
}

#[actix_web::test]
async fn invalid_contact_is_rejected_before_the_gateway() {
    let shop = TestShop::new().await;
    let product = shop.with_product("Steam Key", 1500, 1).await;
    let mock = shop
        .gateway
        .mock_async(|when, then| {
            when.method(POST).path("/createOrder");
            then.status(200);
        })
        .await;
    let req = TestRequest::post().uri("/api/orders").set_json(json!({
        "productId": product.id,
        "contactInfo": "nobody",
        "paymentType": "wechat"
    }));
    let res = shop.send(req).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(mock.hits_async().await, 0);
}

#[actix_web::test]
async fn order_query_hides_card_secrets() {
    let shop = TestShop::new().await;
    let product = shop.with_product("Steam Key", 1500, 1).await;
    let order = shop.pending_order(&product, "alice@example.com").await;
    shop.pay(&order).await;

    let req = TestRequest::post().uri("/api/orders/query").set_json(json!({ "contactInfo": "Alice@Example.com " }));
    let res = shop.send(req).await;
    assert_eq!(res.status, StatusCode::OK);
    let body = res.json();
    let orders = body["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["payment_status"], "paid");
    assert!(orders[0].get("card_secret").is_none());
}

#[actix_web::test]
async fn card_secret_requires_matching_contact() {
    let shop = TestShop::new().await;
    let product = shop.with_product("Steam Key", 1500, 1).await;
    let order = shop.pending_order(&product, "alice@example.com").await;

    let uri = format!("/api/orders/{}/card-secret?email=alice%40example.com", order.id);
    let res = shop.send(TestRequest::get().uri(&uri)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST, "unpaid orders have no card secret");

    shop.pay(&order).await;
    let res = shop.send(TestRequest::get().uri(&uri)).await;
    assert_eq!(res.status, StatusCode::OK);
    let body = res.json();
    assert_eq!(body["success"], true);
    assert!(body["cardSecret"]["account"].as_str().unwrap().starts_with("user"));
    assert!(body["cardSecret"]["password"].as_str().unwrap().starts_with("pass"));

    let uri = format!("/api/orders/{}/card-secret?email=mallory%40example.com", order.id);
    let res = shop.send(TestRequest::get().uri(&uri)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn order_status_by_number() {
    let shop = TestShop::new().await;
    let product = shop.with_product("Steam Key", 1500, 1).await;
    let order = shop.pending_order(&product, "13812345678").await;
    let res = shop.send(TestRequest::get().uri(&format!("/api/orders/status/{}", order.order_number))).await;
    assert_eq!(res.status, StatusCode::OK);
    let body = res.json();
    assert_eq!(body["paymentStatus"], "pending");
    assert_eq!(body["orderId"], order.id.as_str());

    let res = shop.send(TestRequest::get().uri("/api/orders/status/ORD000")).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}
