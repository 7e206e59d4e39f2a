//! The two places where the shop and the payment gateway meet: creating a payment for a fresh order, and applying
//! the gateway's asynchronous notification.
use card_shop_engine::{
    db_types::FulfillmentResult,
    order_objects::{CheckoutRequest, PaymentConfirmation},
    OrderFlowApi,
    ShopDatabase,
};
use log::*;
use pay_gateway::{CallbackVerifier, CreateOrderRequest, PaymentCallback, PaymentGatewayApi};

use crate::{data_objects::CreateOrderResponse, errors::ServerError, helpers::gateway_payment_type};

/// Creates a pending order and registers it with the gateway.
///
/// If the gateway call fails for any reason the order is marked `failed` and the gateway's error is returned. The
/// customer can simply try again; a new order is created each time.
pub async fn create_order_with_payment<B: ShopDatabase>(
    orders: &OrderFlowApi<B>,
    gateway: &PaymentGatewayApi,
    request: CheckoutRequest,
) -> Result<CreateOrderResponse, ServerError> {
    let payment_type = gateway_payment_type(request.payment_method);
    let order = orders.checkout(request).await?;
    let gateway_request = CreateOrderRequest {
        order_id: order.id.clone(),
        product_id: order.product_id.clone(),
        payment_type,
        amount: order.total_amount,
        contact_info: order.contact_info.clone(),
    };
    let payment = match gateway.create_order(&gateway_request).await {
        Ok(payment) => payment,
        Err(e) => {
            warn!("💳️ Gateway refused order {}. {e}", order.order_number);
            if let Err(e) = orders.mark_failed(&order.id).await {
                error!("💳️ Could not mark order {} as failed. {e}", order.id);
            }
            return Err(e.into());
        },
    };
    match &payment.gateway_order_id {
        Some(gateway_order_id) => {
            if let Err(e) = orders.record_gateway_order(&order.id, gateway_order_id).await {
                // The customer can still pay; only admin cancellation loses the ability to close the gateway order.
                warn!("💳️ Could not record gateway order {gateway_order_id} against {}. {e}", order.id);
            }
        },
        None => debug!("💳️ Gateway did not return an order id for {}", order.order_number),
    }
    info!("💳️ Order {} is awaiting payment", order.order_number);
    Ok(CreateOrderResponse {
        success: true,
        order_id: order.id,
        order_number: order.order_number,
        pay_url: payment.pay_url,
    })
}

/// Authenticates a payment notification and fulfils the order it refers to.
///
/// Any `Ok` means the notification was handled and the gateway should stop retrying. That includes repeats of a
/// notification that was already applied.
pub async fn handle_payment_notification<B: ShopDatabase>(
    verifier: &CallbackVerifier,
    orders: &OrderFlowApi<B>,
    callback: &PaymentCallback,
) -> Result<FulfillmentResult, ServerError> {
    let verified = verifier.verify(callback)?;
    let confirmation = PaymentConfirmation {
        order_id: verified.order_id,
        product_id: verified.product_id,
        amount_paid: verified.really_price,
    };
    let result = orders.confirm_payment(confirmation).await?;
    match result {
        FulfillmentResult::OrderNotFound => Err(ServerError::NoRecordFound(format!("Order {}", callback.pay_id))),
        result => Ok(result),
    }
}
