use anyhow::Result;
use pay_gateway::{signature::sign, OrderParam, PaymentCallback};

use crate::{CallbackParams, SignParams};

/// Renders the callback as the `application/x-www-form-urlencoded` body the gateway would post.
pub fn form_body(callback: &PaymentCallback) -> String {
    [
        ("payId", callback.pay_id.as_str()),
        ("param", callback.param.as_str()),
        ("type", callback.payment_type.as_str()),
        ("price", callback.price.as_str()),
        ("reallyPrice", callback.really_price.as_str()),
        ("sign", callback.sign.as_str()),
    ]
    .iter()
    .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
    .collect::<Vec<_>>()
    .join("&")
}

pub fn build_callback(params: &CallbackParams) -> Result<PaymentCallback> {
    let param = OrderParam {
        product_id: params.product_id.clone(),
        contact_info: params.contact_info.clone(),
        order_id: params.order_id.clone(),
    };
    let really_price = params.really_price.unwrap_or(params.price);
    let callback = PaymentCallback::new_signed(
        &params.order_id,
        &param,
        params.payment_type,
        params.price,
        really_price,
        &params.secret,
    )?;
    Ok(callback)
}

pub fn print_callback(params: CallbackParams) -> Result<()> {
    let callback = build_callback(&params)?;
    println!("----------------------------- Payment callback -----------------------------");
    println!("Order id : {}", params.order_id);
    println!("Param    : {}", callback.param);
    println!("Sign     : {}", callback.sign);
    println!("----------------------------------------------------------------------------");
    println!("{}", form_body(&callback));
    Ok(())
}

pub fn print_signature(params: SignParams) {
    println!("{}", sign(&params.fields, &params.secret));
}
