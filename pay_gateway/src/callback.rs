use log::*;

use crate::{signature::callback_signature, GatewayError, OrderParam, PaymentCallback, VerifiedCallback};

/// The signature value a local test harness may send instead of a real digest.
pub const MOCK_SIGNATURE: &str = "mock_signature";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureMode {
    #[default]
    Strict,
    /// Additionally accept [`MOCK_SIGNATURE`]. Only constructible in debug builds via [`SignatureMode::for_build`].
    AcceptMockSignature,
}

impl SignatureMode {
    /// Resolves the requested mode against the build profile. Release builds are always strict.
    pub fn for_build(allow_mock_signature: bool) -> Self {
        match (allow_mock_signature, cfg!(debug_assertions)) {
            (true, true) => {
                warn!("🔏️ Mock payment signatures are ENABLED. Never run this configuration in production.");
                SignatureMode::AcceptMockSignature
            },
            (true, false) => {
                warn!("🔏️ Mock payment signatures were requested, but this is a release build. Ignoring.");
                SignatureMode::Strict
            },
            (false, _) => SignatureMode::Strict,
        }
    }
}

/// Authenticates gateway payment notifications. Stateless: verifying the same callback twice gives the same answer.
#[derive(Debug, Clone)]
pub struct CallbackVerifier {
    secret: shop_common::Secret<String>,
    mode: SignatureMode,
}

impl CallbackVerifier {
    pub fn new(secret: shop_common::Secret<String>, mode: SignatureMode) -> Self {
        Self { secret, mode }
    }

    pub fn mode(&self) -> SignatureMode {
        self.mode
    }

    /// Checks the signature first, then decodes `param`. A tampered callback is always reported as
    /// [`GatewayError::InvalidSignature`], whatever its `param` contains.
    pub fn verify(&self, callback: &PaymentCallback) -> Result<VerifiedCallback, GatewayError> {
        if !self.signature_matches(callback) {
            warn!("🔏️ Rejecting payment callback for {}. Invalid signature.", callback.pay_id);
            return Err(GatewayError::InvalidSignature);
        }
        let param = OrderParam::from_param_string(&callback.param).map_err(|e| {
            warn!("🔏️ Rejecting payment callback for {}. Param is not valid: {}", callback.pay_id, callback.param);
            e
        })?;
        if param.order_id != callback.pay_id {
            debug!("🔏️ Callback payId {} differs from the order id in param ({})", callback.pay_id, param.order_id);
        }
        let really_price = callback.really_price.parse().ok();
        Ok(VerifiedCallback {
            order_id: callback.pay_id.clone(),
            product_id: param.product_id,
            contact_info: param.contact_info,
            really_price,
        })
    }

    fn signature_matches(&self, callback: &PaymentCallback) -> bool {
        if self.mode == SignatureMode::AcceptMockSignature && callback.sign == MOCK_SIGNATURE {
            debug!("🔏️ Accepting mock signature for {}", callback.pay_id);
            return true;
        }
        let expected = callback_signature(
            &callback.pay_id,
            &callback.param,
            &callback.payment_type,
            &callback.price,
            &callback.really_price,
            self.secret.reveal(),
        );
        expected == callback.sign
    }
}
