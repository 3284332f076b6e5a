//! Access log middleware.
//!
//! Emits exactly one INFO record per request once the response is known.

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::http::header::USER_AGENT;
use axum::http::{Request, Response, StatusCode};
use futures_util::future::{BoxFuture, FutureExt};
use tower::{Layer, Service};

use crate::config::AccessLogConfig;
use crate::http::client_ip::client_ip;
use crate::http::errors::HandlerErrors;
use crate::observability::Logger;

/// One completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessLogRecord {
    pub status: u16,
    pub method: String,
    pub path: String,
    pub query: String,
    pub ip: String,
    pub user_agent: String,
    pub errors: String,
    pub cost: Duration,
}

impl AccessLogRecord {
    /// Write the record through `logger`. The message is the request path.
    pub fn emit(&self, logger: &Logger) {
        logger.in_scope(|| {
            tracing::info!(
                status = self.status,
                method = %self.method,
                path = %self.path,
                query = %self.query,
                ip = %self.ip,
                user_agent = %self.user_agent,
                errors = %self.errors,
                cost = ?self.cost,
                "{}",
                self.path
            )
        });
    }
}

/// Request data captured before the request is handed downstream.
struct PendingRecord {
    started: Instant,
    method: String,
    path: String,
    query: String,
    ip: String,
    user_agent: String,
}

impl PendingRecord {
    fn begin<B>(request: &Request<B>, trust_forwarded: bool) -> Self {
        Self {
            started: Instant::now(),
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            query: request.uri().query().unwrap_or_default().to_string(),
            ip: client_ip(request, trust_forwarded),
            user_agent: request
                .headers()
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string(),
        }
    }

    fn finish(self, status: StatusCode, errors: String) -> AccessLogRecord {
        AccessLogRecord {
            status: status.as_u16(),
            method: self.method,
            path: self.path,
            query: self.query,
            ip: self.ip,
            user_agent: self.user_agent,
            errors,
            cost: self.started.elapsed(),
        }
    }
}

/// Layer emitting one access record per request.
#[derive(Clone)]
pub struct AccessLogLayer {
    logger: Arc<Logger>,
    trust_forwarded_headers: bool,
}

impl AccessLogLayer {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self::from_config(logger, &AccessLogConfig::default())
    }

    pub fn from_config(logger: Arc<Logger>, config: &AccessLogConfig) -> Self {
        Self {
            logger,
            trust_forwarded_headers: config.trust_forwarded_headers,
        }
    }
}

impl<S> Layer<S> for AccessLogLayer {
    type Service = AccessLog<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AccessLog {
            inner,
            logger: self.logger.clone(),
            trust_forwarded_headers: self.trust_forwarded_headers,
        }
    }
}

/// Service produced by [`AccessLogLayer`].
#[derive(Clone)]
pub struct AccessLog<S> {
    inner: S,
    logger: Arc<Logger>,
    trust_forwarded_headers: bool,
}

impl<S, B, ResBody> Service<Request<B>> for AccessLog<S>
where
    S: Service<Request<B>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: fmt::Display + Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response<ResBody>, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let pending = PendingRecord::begin(&request, self.trust_forwarded_headers);
        let future = self.inner.call(request);
        let logger = self.logger.clone();

        async move {
            let result = future.await;

            let record = match &result {
                Ok(response) => {
                    let errors = response
                        .extensions()
                        .get::<HandlerErrors>()
                        .map(HandlerErrors::summary)
                        .unwrap_or_default();
                    pending.finish(response.status(), errors)
                }
                Err(e) => pending.finish(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            };
            record.emit(&logger);

            result
        }
        .boxed()
    }
}
