//! Session authentication middleware.
//!
//! Wrap any route or scope with [`SessionAuthMiddlewareFactory`] to require a bearer session token. A valid token puts
//! the caller's [`VerifiedIdentity`] into the request extensions, where handlers pick it up with
//! `web::ReqData<VerifiedIdentity>`. Anything else is answered with a 401 before the handler runs.
//!
//! The [`SessionTokens`] used for verification must be registered as app data.
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
    HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::*;
use parley_engine::db_types::VerifiedIdentity;

use crate::{auth::SessionTokens, errors::ServerError, helpers::bearer_token};

#[derive(Default)]
pub struct SessionAuthMiddlewareFactory;

impl SessionAuthMiddlewareFactory {
    pub fn new() -> Self {
        Self
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionAuthMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = SessionAuthMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionAuthMiddlewareService { service: Rc::new(service) }))
    }
}

pub struct SessionAuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SessionAuthMiddlewareService<S>
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
        Box::pin(async move {
            let tokens = req.app_data::<web::Data<SessionTokens>>().cloned().ok_or_else(|| {
                error!("🔐️ No session token verifier has been configured. Denying access.");
                ServerError::ConfigurationError("Session tokens are not configured".into())
            })?;
            let token = bearer_token(req.headers()).map_err(|e| {
                debug!("🔐️ {} {} called without a bearer token", req.method(), req.path());
                ServerError::AuthenticationError(e)
            })?;
            let identity: VerifiedIdentity = tokens.verify(token).map_err(ServerError::AuthenticationError)?;
            trace!("🔐️ Authenticated {identity} for {}", req.path());
            req.extensions_mut().insert(identity);
            service.call(req).await
        })
    }
}
