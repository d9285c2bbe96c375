/// Session Middleware
///
/// Runs the session gate on every request of the wrapped scope or resource
/// and injects the resulting `AuthenticatedUser` into request extensions.
/// Requests that fail the gate never reach the handler; the rejection is
/// rendered here so outer middleware still sees a response.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::SessionGate;

pub struct SessionMiddleware {
    gate: SessionGate,
}

impl SessionMiddleware {
    pub fn new(gate: SessionGate) -> Self {
        Self { gate }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(SessionMiddlewareService {
            service: Rc::new(service),
            gate: self.gate.clone(),
        }))
    }
}

pub struct SessionMiddlewareService<S> {
    service: Rc<S>,
    gate: SessionGate,
}

impl<S, B> Service<ServiceRequest> for SessionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let authorization = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(str::to_owned);

        let gate = self.gate.clone();
        let service = self.service.clone();

        Box::pin(async move {
            let identity = match gate.authenticate(authorization.as_deref()).await {
                Ok(identity) => identity,
                Err(e) => return Ok(req.error_response(e).map_into_right_body()),
            };

            tracing::debug!(
                user_id = %identity.id,
                role = %identity.role,
                "Session validated"
            );
            req.extensions_mut().insert(identity);

            Ok(service.call(req).await?.map_into_left_body())
        })
    }
}
