use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, FromRequest, HttpMessage, HttpRequest, HttpResponse, ResponseError,
};
use futures::future::{ready, Ready};
use std::fmt;
use std::future::Future;
use std::ops::Deref;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use crate::identity::{Authenticator, Identity};

/// Body of every 401 produced by this crate
pub const UNAUTHORIZED_MESSAGE: &str = "Invalid, expired, or revoked token";

const BEARER_PREFIX: &str = "Bearer ";

/// Bearer-token authentication stage
///
/// Never rejects: a request without a usable token simply continues without
/// an [`Identity`]. Handlers that need a caller take [`Authenticated`].
#[derive(Clone)]
pub struct AuthenticationMiddleware {
    authenticator: Arc<dyn Authenticator>,
}

impl AuthenticationMiddleware {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self { authenticator }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthenticationMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthenticationMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthenticationMiddlewareService {
            service: Rc::new(service),
            authenticator: self.authenticator.clone(),
        }))
    }
}

pub struct AuthenticationMiddlewareService<S> {
    service: Rc<S>,
    authenticator: Arc<dyn Authenticator>,
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}

impl<S, B> Service<ServiceRequest> for AuthenticationMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        // Already authenticated further out; run at most once per request
        if req.extensions().contains::<Identity>() {
            return Box::pin(async move { service.call(req).await });
        }

        let token = bearer_token(&req);
        let authenticator = self.authenticator.clone();

        Box::pin(async move {
            if let Some(token) = token {
                match authenticator.authenticate(&token).await {
                    Ok(identity) => {
                        tracing::debug!(
                            subject = %identity.subject,
                            token_id = %identity.token_id,
                            "request authenticated"
                        );
                        req.extensions_mut().insert(identity);
                    }
                    Err(_) => {
                        tracing::debug!(path = %req.path(), "bearer token rejected, continuing anonymously");
                    }
                }
            }

            service.call(req).await
        })
    }
}

/// Extractor for handlers that require an authenticated caller
///
/// Answers `401` when the request carries no [`Identity`]. Use
/// `Option<Authenticated>` where a caller is optional.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Identity);

impl Authenticated {
    pub fn into_inner(self) -> Identity {
        self.0
    }
}

impl Deref for Authenticated {
    type Target = Identity;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug)]
pub struct MissingIdentity;

impl fmt::Display for MissingIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(UNAUTHORIZED_MESSAGE)
    }
}

impl ResponseError for MissingIdentity {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::Unauthorized().json(serde_json::json!({ "error": UNAUTHORIZED_MESSAGE }))
    }
}

impl FromRequest for Authenticated {
    type Error = MissingIdentity;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Identity>()
                .cloned()
                .map(Authenticated)
                .ok_or(MissingIdentity),
        )
    }
}
