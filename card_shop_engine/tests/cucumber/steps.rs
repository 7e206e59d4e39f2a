use card_shop_engine::{
    db_types::{CardSecretStatus, Cents, FulfillmentResult, PaymentMethod, PaymentStatus, ProductDeletion, ProductStatus},
    order_objects::{CardSecretUploadRow, CheckoutRequest, PaymentConfirmation},
    CardSecretManagement,
    OrderFlowError,
    ProductManagement,
};
use cucumber::{then, when};

use crate::cucumber::ShopWorld;

#[when(expr = "{string} checks out {string} paying by {word}")]
async fn checkout(world: &mut ShopWorld, contact: String, title: String, method: String) {
    let product_id = world.product(&title).id.clone();
    let payment_method = method.parse::<PaymentMethod>().expect("Unknown payment method");
    let request = CheckoutRequest { product_id, quantity: 1, contact_info: contact.clone(), payment_method };
    match world.orders().checkout(request).await {
        Ok(order) => {
            world.orders.insert(contact, order);
            world.last_error = None;
        },
        Err(e) => world.last_error = Some(e),
    }
}

#[when(expr = "the gateway confirms payment for the order of {string}")]
async fn confirm_payment(world: &mut ShopWorld, contact: String) {
    let order = world.order(&contact);
    let confirmation = PaymentConfirmation {
        order_id: order.id.clone(),
        product_id: order.product_id.clone(),
        amount_paid: Some(order.total_amount),
    };
    record_fulfillment(world, confirmation).await;
}

#[when(expr = "the gateway confirms payment for the order of {string} against product {string}")]
async fn confirm_payment_wrong_product(world: &mut ShopWorld, contact: String, title: String) {
    let confirmation = PaymentConfirmation {
        order_id: world.order(&contact).id.clone(),
        product_id: world.product(&title).id.clone(),
        amount_paid: None,
    };
    record_fulfillment(world, confirmation).await;
}

async fn record_fulfillment(world: &mut ShopWorld, confirmation: PaymentConfirmation) {
    match world.orders().confirm_payment(confirmation).await {
        Ok(result) => {
            world.last_fulfillment = Some(result);
            world.last_error = None;
        },
        Err(e) => {
            world.last_fulfillment = None;
            world.last_error = Some(e);
        },
    }
}

#[when(expr = "the order of {string} is cancelled")]
async fn cancel_order(world: &mut ShopWorld, contact: String) {
    let id = world.order(&contact).id.clone();
    world.orders().cancel_order(&id).await.expect("Error cancelling order");
}

#[when(expr = "the order of {string} is marked failed")]
async fn fail_order(world: &mut ShopWorld, contact: String) {
    let id = world.order(&contact).id.clone();
    world.orders().mark_failed(&id).await.expect("Error failing order");
}

#[when(expr = "the admin retries fulfillment of the order of {string}")]
async fn retry_fulfillment(world: &mut ShopWorld, contact: String) {
    let id = world.order(&contact).id.clone();
    let result = world.orders().fulfill(&id).await.expect("Error fulfilling order");
    world.last_fulfillment = Some(result);
}

#[then(expr = "the order of {string} cannot be cancelled")]
async fn cancel_refused(world: &mut ShopWorld, contact: String) {
    let id = world.order(&contact).id.clone();
    let result = world.orders().cancel_order(&id).await;
    assert!(matches!(result, Err(OrderFlowError::InvalidOrderState(_))), "Unexpected result: {result:?}");
}

#[when(expr = "every available card secret of {string} is deleted")]
async fn delete_available_secrets(world: &mut ShopWorld, title: String) {
    let product_id = world.product(&title).id.clone();
    let secrets = world
        .catalog()
        .db()
        .fetch_card_secrets_for_product(&product_id, Some(CardSecretStatus::Available))
        .await
        .expect("Error fetching card secrets");
    for secret in secrets {
        world.catalog().delete_card_secret(&secret.id).await.expect("Error deleting card secret");
    }
}

#[when(expr = "the admin uploads card secrets {string} for {string}")]
async fn upload_secrets(world: &mut ShopWorld, codes: String, title: String) {
    let product_id = world.product(&title).id.clone();
    let rows = codes
        .split(',')
        .map(|c| CardSecretUploadRow { card_secret: Some(c.trim().to_string()), ..Default::default() })
        .collect();
    let results = world.catalog().upload_card_secrets(&product_id, rows).await.expect("Error uploading card secrets");
    assert_eq!(results.total, results.successful + results.failed);
}

#[then(expr = "the order of {string} is {word}")]
async fn order_status(world: &mut ShopWorld, contact: String, status: String) {
    let expected = status.parse::<PaymentStatus>().expect("Unknown payment status");
    let id = world.order(&contact).id.clone();
    let order = world.orders().fetch_order(&id).await.expect("Error fetching order");
    assert_eq!(order.payment_status, expected);
}

#[then(expr = "the order of {string} costs {int} cents")]
async fn order_price(world: &mut ShopWorld, contact: String, cents: i64) {
    assert_eq!(world.order(&contact).total_amount, Cents::from(cents));
}

#[then(expr = "{string} can retrieve a card secret for their order")]
async fn secret_delivered(world: &mut ShopWorld, contact: String) {
    let id = world.order(&contact).id.clone();
    let secret = world.orders().card_secret_for_order(&id, &contact).await.expect("Error fetching card secret");
    assert!(secret.is_some(), "No card secret was delivered");
}

#[then(expr = "{string} cannot retrieve a card secret for the order of {string}")]
async fn secret_hidden(world: &mut ShopWorld, stranger: String, contact: String) {
    let id = world.order(&contact).id.clone();
    let result = world.orders().card_secret_for_order(&id, &stranger).await;
    assert!(matches!(result, Err(OrderFlowError::OrderNotFound(_))), "Unexpected result: {result:?}");
}

#[then(expr = "the payment is reported as {word}")]
async fn fulfillment_outcome(world: &mut ShopWorld, outcome: String) {
    let result = world.last_fulfillment.as_ref().expect("No fulfillment result recorded");
    let matched = match outcome.as_str() {
        "fulfilled" => matches!(result, FulfillmentResult::Fulfilled(_)),
        "already_fulfilled" => matches!(result, FulfillmentResult::AlreadyFulfilled(_)),
        "not_payable" => matches!(result, FulfillmentResult::NotPayable(_)),
        "out_of_stock" => matches!(result, FulfillmentResult::OutOfStock(_)),
        "awaiting_payment" => matches!(result, FulfillmentResult::AwaitingPayment(_)),
        _ => panic!("Unknown outcome {outcome}"),
    };
    assert!(matched, "Expected {outcome} but got {result:?}");
}

#[then(expr = "the checkout is rejected with {string}")]
async fn checkout_rejected(world: &mut ShopWorld, message: String) {
    let err = world.last_error.as_ref().expect("The request was not rejected");
    assert!(err.to_string().contains(&message), "Expected '{message}' in '{err}'");
}

#[then(expr = "{string} has {int} in stock and {int} sold")]
async fn stock_levels(world: &mut ShopWorld, title: String, stock: i64, sold: i64) {
    let id = world.product(&title).id.clone();
    let product = world.catalog().product(&id).await.expect("Error fetching product").expect("Product vanished");
    assert_eq!(product.stock, stock, "stock");
    assert_eq!(product.sold_count, sold, "sold count");
}

#[then(expr = "{string} has {int} available and {int} sold card secrets")]
async fn inventory(world: &mut ShopWorld, title: String, available: usize, sold: usize) {
    let id = world.product(&title).id.clone();
    let inventory = world.catalog().card_secrets_for_product(&id, None).await.expect("Error fetching inventory");
    assert_eq!(inventory.available, available, "available");
    assert_eq!(inventory.sold, sold, "sold");
}

#[then(expr = "the sold card secret of {string} cannot be deleted")]
async fn sold_secret_is_kept(world: &mut ShopWorld, title: String) {
    let id = world.product(&title).id.clone();
    let sold = world
        .catalog()
        .db()
        .fetch_card_secrets_for_product(&id, Some(CardSecretStatus::Sold))
        .await
        .expect("Error fetching card secrets");
    let secret = sold.first().expect("No sold card secret");
    assert!(world.catalog().delete_card_secret(&secret.id).await.is_err());
}

#[then(expr = "no card secrets of {string} remain")]
async fn no_secrets_remain(world: &mut ShopWorld, title: String) {
    let id = world.product(&title).id.clone();
    let secrets = world.catalog().db().fetch_card_secrets().await.expect("Error fetching card secrets");
    assert!(secrets.iter().all(|s| s.product_id != id), "Card secrets of {title} were left behind");
}

#[then(expr = "deleting {string} leaves it {word}")]
async fn delete_product(world: &mut ShopWorld, title: String, outcome: String) {
    let id = world.product(&title).id.clone();
    let result = world.catalog().delete_product(&id).await.expect("Error deleting product");
    let remaining = world.catalog().db().fetch_product(&id).await.expect("Error fetching product");
    match outcome.as_str() {
        "deactivated" => {
            assert_eq!(result, ProductDeletion::Deactivated);
            assert_eq!(remaining.map(|p| p.status), Some(ProductStatus::Inactive));
        },
        "deleted" => {
            assert_eq!(result, ProductDeletion::Deleted);
            assert!(remaining.is_none());
        },
        _ => panic!("Unknown outcome {outcome}"),
    }
}
