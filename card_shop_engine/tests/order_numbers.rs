use std::cell::RefCell;

use card_shop_engine::{
    backend_tests,
    db_types::{PaymentMethod, Product},
    helpers::new_order_number,
    order_objects::CheckoutRequest,
    shop_api::order_flow_api::ORDER_NUMBER_ATTEMPTS,
    test_utils::{prepare_env::seed_product, AnyStore},
    OrderFlowApi,
    OrderFlowError,
    StoreError,
};
use chrono::{DateTime, Utc};

thread_local! {
    static TAKEN_NUMBERS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Hands out the queued numbers first, then fresh ones.
fn queued_numbers(now: DateTime<Utc>) -> String {
    TAKEN_NUMBERS.with(|q| q.borrow_mut().pop()).unwrap_or_else(|| new_order_number(now))
}

fn queue_numbers(number: &str, count: usize) {
    TAKEN_NUMBERS.with(|q| q.borrow_mut().extend(std::iter::repeat(number.to_string()).take(count)));
}

fn request(product: &Product, contact: &str) -> CheckoutRequest {
    CheckoutRequest {
        product_id: product.id.clone(),
        quantity: 1,
        contact_info: contact.into(),
        payment_method: PaymentMethod::Alipay,
    }
}

backend_tests!(taken_order_number_is_replaced, checkout_gives_up_after_repeated_collisions);

async fn taken_order_number_is_replaced(db: AnyStore) {
    let product = seed_product(&db, "Steam Key", 1500, 2).await;
    let api = OrderFlowApi::new(db).with_order_numbers(queued_numbers);
    let first = api.checkout(request(&product, "alice@example.com")).await.unwrap();

    queue_numbers(&first.order_number, ORDER_NUMBER_ATTEMPTS - 1);
    let second = api.checkout(request(&product, "bob@example.com")).await.expect("Checkout did not retry");
    assert_ne!(second.order_number, first.order_number);
    assert_eq!(api.order_by_number(&second.order_number).await.unwrap().map(|o| o.id), Some(second.id));
}

async fn checkout_gives_up_after_repeated_collisions(db: AnyStore) {
    let product = seed_product(&db, "Steam Key", 1500, 2).await;
    let api = OrderFlowApi::new(db).with_order_numbers(queued_numbers);
    let first = api.checkout(request(&product, "alice@example.com")).await.unwrap();

    queue_numbers(&first.order_number, ORDER_NUMBER_ATTEMPTS);
    let err = api.checkout(request(&product, "bob@example.com")).await.expect_err("A taken order number was reused");
    assert!(matches!(err, OrderFlowError::DatabaseError(StoreError::Duplicate(_))), "{err}");
    TAKEN_NUMBERS.with(|q| assert!(q.borrow().is_empty()));
}
