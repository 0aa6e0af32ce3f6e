//! Request logging
//!
//! One structured event per request. Wrap it inside
//! [`crate::CorrelationIdMiddleware`] so the correlation id is available, and
//! outside [`crate::AuthenticationMiddleware`] so the caller is.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::StatusCode,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::time::{Duration, Instant};

use crate::correlation_id::CorrelationId;
use crate::identity::Identity;

#[derive(Clone, Default)]
pub struct Logging;

impl<S, B> Transform<S, ServiceRequest> for Logging
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = LoggingService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LoggingService { service }))
    }
}

pub struct LoggingService<S> {
    service: S,
}

/// Fields captured before the request is handed on
struct RequestLine {
    method: String,
    path: String,
    correlation_id: String,
    started: Instant,
}

impl RequestLine {
    fn capture(req: &ServiceRequest) -> Self {
        Self {
            method: req.method().to_string(),
            path: req.path().to_string(),
            correlation_id: req
                .extensions()
                .get::<CorrelationId>()
                .map(|id| id.0.clone())
                .unwrap_or_default(),
            started: Instant::now(),
        }
    }

    fn finish(self, status: StatusCode, subject: Option<&str>) {
        let duration_ms = millis(self.started.elapsed());
        let subject = subject.unwrap_or("-");

        // server faults stand out; auth rejections are expected traffic
        if status.is_server_error() {
            tracing::error!(
                method = %self.method,
                path = %self.path,
                status = status.as_u16(),
                duration_ms,
                correlation_id = %self.correlation_id,
                subject,
                "request failed"
            );
        } else {
            tracing::info!(
                method = %self.method,
                path = %self.path,
                status = status.as_u16(),
                duration_ms,
                correlation_id = %self.correlation_id,
                subject,
                "request completed"
            );
        }
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

impl<S, B> Service<ServiceRequest> for LoggingService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let line = RequestLine::capture(&req);
        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;
            let subject = res
                .request()
                .extensions()
                .get::<Identity>()
                .map(|identity| identity.subject.clone());
            line.finish(res.status(), subject.as_deref());
            Ok(res)
        })
    }
}
