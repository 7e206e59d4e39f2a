use actix_web::{http::StatusCode, test::TestRequest};
use card_shop_engine::{
    db_types::{Cents, Order, PaymentStatus},
    ProductManagement,
};
use pay_gateway::{OrderParam, PaymentCallback, PaymentType, SignatureMode, MOCK_SIGNATURE};

use super::helpers::{TestShop, FRONTEND, SECRET};

fn signed_callback(order: &Order, secret: &str) -> PaymentCallback {
    let param = OrderParam {
        product_id: order.product_id.clone(),
        contact_info: order.contact_info.clone(),
        order_id: order.id.clone(),
    };
    PaymentCallback::new_signed(&order.id, &param, PaymentType::Alipay, order.total_amount, order.total_amount, secret)
        .unwrap()
}

fn notify(callback: &PaymentCallback) -> TestRequest {
    TestRequest::post().uri("/api/payment/notify").set_form(callback)
}

#[actix_web::test]
async fn notification_fulfils_the_order() {
    let shop = TestShop::new().await;
    let product = shop.with_product("Steam Key", 1500, 2).await;
    let order = shop.pending_order(&product, "alice@example.com").await;

    let res = shop.send(notify(&signed_callback(&order, SECRET))).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, "success");

    let order = shop.orders().fetch_order(&order.id).await.unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert!(order.card_secret.is_some());
    assert!(order.card_secret_delivered_at.is_some());
    let product = shop.db.fetch_product(&product.id).await.unwrap().unwrap();
    assert_eq!(product.stock, 1);
    assert_eq!(product.sold_count, 1);
}

#[actix_web::test]
async fn duplicate_notification_is_acknowledged_once() {
    let shop = TestShop::new().await;
    let product = shop.with_product("Steam Key", 1500, 2).await;
    let order = shop.pending_order(&product, "alice@example.com").await;
    let callback = signed_callback(&order, SECRET);

    for _ in 0..3 {
        let res = shop.send(notify(&callback)).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body, "success");
    }
    let product = shop.db.fetch_product(&product.id).await.unwrap().unwrap();
    assert_eq!(product.stock, 1);
    assert_eq!(product.sold_count, 1);
}

#[actix_web::test]
async fn forged_notification_is_rejected() {
    let shop = TestShop::new().await;
    let product = shop.with_product("Steam Key", 1500, 1).await;
    let order = shop.pending_order(&product, "alice@example.com").await;

    let res = shop.send(notify(&signed_callback(&order, "wrong-secret"))).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body, "Invalid signature");

    let mut tampered = signed_callback(&order, SECRET);
    tampered.really_price = "0.01".into();
    let res = shop.send(notify(&tampered)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let order = shop.orders().fetch_order(&order.id).await.unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Pending);
}

#[actix_web::test]
async fn notification_for_unknown_order() {
    let shop = TestShop::new().await;
    let product = shop.with_product("Steam Key", 1500, 1).await;
    let mut order = shop.pending_order(&product, "alice@example.com").await;
    order.id = "no-such-order".into();
    let res = shop.send(notify(&signed_callback(&order, SECRET))).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn mock_signature_needs_the_mock_mode() {
    let shop = TestShop::new().await;
    let product = shop.with_product("Steam Key", 1500, 1).await;
    let order = shop.pending_order(&product, "alice@example.com").await;
    let mut callback = signed_callback(&order, SECRET);
    callback.sign = MOCK_SIGNATURE.into();

    let res = shop.send(notify(&callback)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = shop.send_with_mode(notify(&callback), SignatureMode::AcceptMockSignature).await;
    assert_eq!(res.status, StatusCode::OK);
    let order = shop.orders().fetch_order(&order.id).await.unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Paid);
}

#[actix_web::test]
async fn return_redirects_to_the_frontend() {
    let shop = TestShop::new().await;
    let product = shop.with_product("Steam Key", 1500, 1).await;
    let order = shop.pending_order(&product, "alice@example.com").await;
    let callback = signed_callback(&order, SECRET);

    let query = format!(
        "payId={}&param={}&type={}&price={}&reallyPrice={}&sign={}",
        urlencoding::encode(&callback.pay_id),
        urlencoding::encode(&callback.param),
        callback.payment_type,
        callback.price,
        callback.really_price,
        callback.sign
    );
    let res = shop.send(TestRequest::get().uri(&format!("/api/payment/return?{query}"))).await;
    assert_eq!(res.status, StatusCode::FOUND);
    assert_eq!(res.location, Some(format!("{FRONTEND}/success?orderId={}", order.id)));
    // The browser return never changes the order
    let stored = shop.orders().fetch_order(&order.id).await.unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Pending);

    let bad = query.replace(&callback.sign, "0000");
    let res = shop.send(TestRequest::get().uri(&format!("/api/payment/return?{bad}"))).await;
    assert_eq!(res.status, StatusCode::FOUND);
    assert_eq!(res.location, Some(format!("{FRONTEND}/payment/error?message=Invalid%20signature")));

    let res = shop.send(TestRequest::get().uri("/api/payment/return")).await;
    assert_eq!(res.status, StatusCode::FOUND);
    assert!(res.location.unwrap().starts_with(&format!("{FRONTEND}/payment/error?message=")));
}

#[actix_web::test]
async fn paid_amount_is_taken_from_the_order() {
    let shop = TestShop::new().await;
    let product = shop.with_product("Steam Key", 1500, 1).await;
    let order = shop.pending_order(&product, "alice@example.com").await;
    let param = OrderParam {
        product_id: order.product_id.clone(),
        contact_info: order.contact_info.clone(),
        order_id: order.id.clone(),
    };
    // Aggregators sometimes knock a few cents off. The order total is what gets recorded.
    let callback =
        PaymentCallback::new_signed(&order.id, &param, PaymentType::Wechat, Cents::from(1500), Cents::from(1498), SECRET)
            .unwrap();
    let res = shop.send(notify(&callback)).await;
    assert_eq!(res.status, StatusCode::OK);
    let stored = shop.orders().fetch_order(&order.id).await.unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Paid);
    assert_eq!(stored.total_amount, Cents::from(1500));
}
