//! Admin token middleware for Actix Web.
//!
//! Every request under `/api/admin` must carry the configured token in the `X-Admin-Token` header. When no token is
//! configured the middleware lets everything through; the server logs a warning about that at startup.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use shop_common::Secret;
use subtle::ConstantTimeEq;

use crate::errors::ServerError;

pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

pub struct AdminTokenMiddlewareFactory {
    token: Option<Secret<String>>,
}

impl AdminTokenMiddlewareFactory {
    pub fn new(token: Option<Secret<String>>) -> Self {
        AdminTokenMiddlewareFactory { token }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminTokenMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AdminTokenMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminTokenMiddlewareService { token: self.token.clone(), service: Rc::new(service) }))
    }
}

pub struct AdminTokenMiddlewareService<S> {
    token: Option<Secret<String>>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminTokenMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let expected = self.token.as_ref().map(|t| t.reveal().clone());
        Box::pin(async move {
            let Some(expected) = expected else {
                trace!("🔐️ No admin token configured. Allowing request.");
                return service.call(req).await;
            };
            let provided = req.headers().get(ADMIN_TOKEN_HEADER).map(|v| v.as_bytes()).unwrap_or_default();
            if bool::from(provided.ct_eq(expected.as_bytes())) {
                trace!("🔐️ Admin token check ✅️");
                service.call(req).await
            } else {
                warn!("🔐️ Missing or invalid admin token on {}. Denying access.", req.path());
                Err(ServerError::AdminTokenRequired.into())
            }
        })
    }
}
