use actix_web::{http::StatusCode, test::TestRequest};
use card_shop_engine::db_types::{FulfillmentResult, PaymentStatus};
use httpmock::prelude::*;
use serde_json::json;

use super::helpers::{admin, TestShop};

#[actix_web::test]
async fn admin_routes_need_the_token() {
    let shop = TestShop::new().await;
    let res = shop.send(TestRequest::get().uri("/api/admin/products")).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    let res = shop.send(TestRequest::get().uri("/api/admin/products").insert_header(("X-Admin-Token", "guess"))).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    let res = shop.send(admin(TestRequest::get().uri("/api/admin/products"))).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[actix_web::test]
async fn product_lifecycle() {
    let shop = TestShop::new().await;
    let req = admin(TestRequest::post().uri("/api/admin/products")).set_json(json!({
        "title": "Netflix Month",
        "price": 3000,
        "category": "Streaming",
        "stock": 0
    }));
    let res = shop.send(req).await;
    assert_eq!(res.status, StatusCode::CREATED);
    let id = res.json()["product"]["id"].as_str().unwrap().to_string();

    let req = admin(TestRequest::put().uri(&format!("/api/admin/products/{id}"))).set_json(json!({ "price": 2500 }));
    let res = shop.send(req).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["product"]["price"], 2500);

    let req = admin(TestRequest::patch().uri(&format!("/api/admin/products/{id}/stock"))).set_json(json!({ "stock": -1 }));
    assert_eq!(shop.send(req).await.status, StatusCode::BAD_REQUEST);

    let res = shop.send(admin(TestRequest::delete().uri(&format!("/api/admin/products/{id}")))).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["result"], "deleted");
    let res = shop.send(admin(TestRequest::delete().uri(&format!("/api/admin/products/{id}")))).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn invalid_product_is_rejected() {
    let shop = TestShop::new().await;
    let req = admin(TestRequest::post().uri("/api/admin/products")).set_json(json!({ "title": " ", "price": 100 }));
    assert_eq!(shop.send(req).await.status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn card_secret_upload_reports_each_row() {
    let shop = TestShop::new().await;
    let product = shop.with_product("Steam Key", 1500, 0).await;
    let req = admin(TestRequest::post().uri(&format!("/api/admin/products/{}/card-secrets/upload", product.id)))
        .set_json(json!({
            "cardSecrets": [
                { "account": "acc1", "password": "pw1" },
                { "cardSecret": "acc2----pw2" },
                { "remark": "nothing useful" },
                { "cardSecret": "REDEEM-CODE-3" }
            ]
        }));
    let res = shop.send(req).await;
    assert_eq!(res.status, StatusCode::OK);
    let results = &res.json()["results"];
    assert_eq!(results["total"], 4);
    assert_eq!(results["successful"], 3);
    assert_eq!(results["failed"], 1);
    assert_eq!(results["errors"][0]["row"], 3);

    let uri = format!("/api/admin/products/{}/card-secrets?status=available", product.id);
    let res = shop.send(admin(TestRequest::get().uri(&uri))).await;
    let data = &res.json()["data"];
    assert_eq!(data["total"], 3);
    assert_eq!(data["available"], 3);
    assert_eq!(data["card_secrets"].as_array().unwrap().len(), 3);

    let res = shop.send(TestRequest::get().uri(&format!("/api/products/{}", product.id))).await;
    assert_eq!(res.json()["product"]["stock"], 3);
}

#[actix_web::test]
async fn sold_card_secret_cannot_be_deleted() {
    let shop = TestShop::new().await;
    let product = shop.with_product("Steam Key", 1500, 1).await;
    let order = shop.pending_order(&product, "alice@example.com").await;
    shop.pay(&order).await;
    let uri = format!("/api/admin/products/{}/card-secrets?status=sold", product.id);
    let res = shop.send(admin(TestRequest::get().uri(&uri))).await;
    let secret_id = res.json()["data"]["card_secrets"][0]["id"].as_str().unwrap().to_string();

    let res = shop.send(admin(TestRequest::delete().uri(&format!("/api/admin/card-secrets/{secret_id}")))).await;
    assert_eq!(res.status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn referenced_product_is_deactivated() {
    let shop = TestShop::new().await;
    let product = shop.with_product("Steam Key", 1500, 1).await;
    shop.pending_order(&product, "alice@example.com").await;
    let res = shop.send(admin(TestRequest::delete().uri(&format!("/api/admin/products/{}", product.id)))).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["result"], "deactivated");
    let res = shop.send(TestRequest::get().uri("/api/products")).await;
    assert_eq!(res.json()["products"].as_array().unwrap().len(), 0);
}

#[actix_web::test]
async fn cancel_closes_the_gateway_order() {
    let shop = TestShop::new().await;
    let product = shop.with_product("Steam Key", 1500, 1).await;
    let order = shop.pending_order(&product, "alice@example.com").await;
    shop.orders().record_gateway_order(&order.id, "G42").await.unwrap();
    let close = shop
        .gateway
        .mock_async(|when, then| {
            when.method(POST).path("/closeOrder").x_www_form_urlencoded_tuple("orderId", "G42");
            then.status(200).body(r#"{"code":1,"msg":"ok"}"#);
        })
        .await;
    let res = shop.send(admin(TestRequest::post().uri(&format!("/api/admin/orders/{}/cancel", order.id)))).await;
    close.assert_async().await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["order"]["payment_status"], "cancelled");

    let res = shop.send(admin(TestRequest::post().uri(&format!("/api/admin/orders/{}/cancel", order.id)))).await;
    assert_eq!(res.status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn fulfil_after_restock() {
    let shop = TestShop::new().await;
    let product = shop.with_product("Steam Key", 1500, 1).await;
    let order = shop.pending_order(&product, "alice@example.com").await;
    // Sell the only secret to somebody else first
    let other = shop.pending_order(&product, "bob@example.com").await;
    shop.pay(&other).await;
    assert!(matches!(shop.pay(&order).await, FulfillmentResult::OutOfStock(_)));

    // Paid while out of stock: the order can neither be cancelled nor failed
    let res = shop.send(admin(TestRequest::post().uri(&format!("/api/admin/orders/{}/cancel", order.id)))).await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    let failed = shop.orders().mark_failed(&order.id).await.unwrap();
    assert_eq!(failed.payment_status, PaymentStatus::Pending);
    assert!(failed.paid_at.is_some());

    let uri = format!("/api/admin/orders/{}/fulfill", order.id);
    let res = shop.send(admin(TestRequest::post().uri(&uri))).await;
    assert_eq!(res.json()["result"], "out_of_stock");
    assert_eq!(res.json()["success"], false);

    let req = admin(TestRequest::post().uri(&format!("/api/admin/products/{}/card-secrets/upload", product.id)))
        .set_json(json!({ "cardSecrets": [{ "account": "late", "password": "arrival" }] }));
    shop.send(req).await;
    let res = shop.send(admin(TestRequest::post().uri(&uri))).await;
    assert_eq!(res.json()["result"], "fulfilled");
    let order = shop.orders().fetch_order(&order.id).await.unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(order.card_secret.unwrap().account, "late");
}

#[actix_web::test]
async fn unpaid_order_is_not_fulfilled() {
    let shop = TestShop::new().await;
    let product = shop.with_product("Steam Key", 1500, 1).await;
    let order = shop.pending_order(&product, "alice@example.com").await;
    let uri = format!("/api/admin/orders/{}/fulfill", order.id);
    let res = shop.send(admin(TestRequest::post().uri(&uri))).await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let order = shop.orders().fetch_order(&order.id).await.unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert!(order.card_secret.is_none());
    let uri = format!("/api/admin/products/{}/card-secrets?status=available", product.id);
    let res = shop.send(admin(TestRequest::get().uri(&uri))).await;
    assert_eq!(res.json()["data"]["available"], 1);
}

#[actix_web::test]
async fn stats() {
    let shop = TestShop::new().await;
    let product = shop.with_product("Steam Key", 1500, 3).await;
    for contact in ["alice@example.com", "ALICE@example.com", "bob@example.com"] {
        let order = shop.pending_order(&product, contact).await;
        shop.pay(&order).await;
    }
    let res = shop.send(admin(TestRequest::get().uri("/api/admin/email-stats"))).await;
    assert_eq!(res.status, StatusCode::OK);
    let data = &res.json()["data"];
    assert_eq!(data["totalEmails"], 3);
    assert_eq!(data["uniqueEmails"], 2);

    let res = shop.send(admin(TestRequest::get().uri("/api/admin/stats"))).await;
    let stats = &res.json()["stats"];
    assert_eq!(stats["todaySales"], 3);
    assert_eq!(stats["todayRevenue"], 4500);

    let res = shop.send(admin(TestRequest::get().uri("/api/admin/database"))).await;
    assert_eq!(res.json()["healthy"], true);
    assert_eq!(res.json()["backend"], "json-file");
}
