//! Panic recovery middleware.
//!
//! # Responsibilities
//! - Contain panics raised while a request is handled
//! - Log them with a dump of the request (and optionally a backtrace)
//! - Answer generic failures with a fixed apology response
//! - Mark connection-abort failures without writing a body
//!
//! # Design Decisions
//! - Ordinary handler failures travel as `AppError` results; this layer only
//!   deals with real panics
//! - Recovery is scoped to the request that panicked; the worker keeps going

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::future::{BoxFuture, FutureExt};
use tower::{Layer, Service};

use crate::config::RecoveryConfig;
use crate::http::dump::RequestHead;
use crate::http::errors::attach_error;
use crate::http::middleware::panic::{
    classify, enable_backtrace_capture, panic_message, take_backtrace, PanicKind,
};
use crate::observability::Logger;

/// Response extension marking a request whose client connection was lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestAborted;

/// Layer installing the panic boundary.
#[derive(Clone)]
pub struct RecoveryLayer {
    logger: Arc<Logger>,
    include_stack: bool,
    apology_status: StatusCode,
    apology_message: Arc<str>,
}

impl RecoveryLayer {
    /// Recovery with the default apology (200, "an error occurred").
    pub fn new(logger: Arc<Logger>, include_stack: bool) -> Self {
        let defaults = RecoveryConfig::default();
        Self::build(
            logger,
            include_stack,
            StatusCode::OK,
            &defaults.apology_message,
        )
    }

    pub fn from_config(logger: Arc<Logger>, config: &RecoveryConfig) -> Self {
        let status = StatusCode::from_u16(config.apology_status).unwrap_or(StatusCode::OK);
        Self::build(logger, config.include_stack, status, &config.apology_message)
    }

    /// Override the response sent after a generic panic.
    pub fn with_apology(mut self, status: StatusCode, message: impl Into<String>) -> Self {
        self.apology_status = status;
        self.apology_message = Arc::from(message.into());
        self
    }

    fn build(logger: Arc<Logger>, include_stack: bool, status: StatusCode, message: &str) -> Self {
        if include_stack {
            enable_backtrace_capture();
        }
        Self {
            logger,
            include_stack,
            apology_status: status,
            apology_message: Arc::from(message),
        }
    }

    /// Log a recovered panic and build the response that replaces the
    /// handler's.
    fn recover(&self, payload: Box<dyn Any + Send>, head: &RequestHead) -> Response {
        let stack = take_backtrace();
        let error = panic_message(&*payload);
        let request = head.dump();

        match classify(&*payload) {
            PanicKind::ConnectionAbort => {
                self.logger.in_scope(|| {
                    tracing::error!(
                        error = %error,
                        request = %request,
                        broken_pipe = true,
                        "{}",
                        head.path()
                    )
                });

                let mut response = Response::new(Body::empty());
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                response.extensions_mut().insert(RequestAborted);
                attach_error(&mut response, error);
                response
            }
            PanicKind::Generic => {
                if self.include_stack {
                    let stack = stack.unwrap_or_else(|| Backtrace::force_capture().to_string());
                    self.logger.in_scope(|| {
                        tracing::error!(
                            error = %error,
                            request = %request,
                            stack = %stack,
                            broken_pipe = false,
                            "[Recovery from panic]"
                        )
                    });
                } else {
                    self.logger.in_scope(|| {
                        tracing::error!(
                            error = %error,
                            request = %request,
                            broken_pipe = false,
                            "[Recovery from panic]"
                        )
                    });
                }

                let mut response =
                    (self.apology_status, self.apology_message.to_string()).into_response();
                attach_error(&mut response, error);
                response
            }
        }
    }
}

impl<S> Layer<S> for RecoveryLayer {
    type Service = Recovery<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Recovery {
            inner,
            layer: self.clone(),
        }
    }
}

/// Service produced by [`RecoveryLayer`].
#[derive(Clone)]
pub struct Recovery<S> {
    inner: S,
    layer: RecoveryLayer,
}

impl<S, B> Service<Request<B>> for Recovery<S>
where
    S: Service<Request<B>, Response = Response>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let head = RequestHead::capture(&request);

        let inner = &mut self.inner;
        let future = match panic::catch_unwind(AssertUnwindSafe(|| inner.call(request))) {
            Ok(future) => future,
            Err(payload) => {
                let response = self.layer.recover(payload, &head);
                return async move { Ok(response) }.boxed();
            }
        };

        let layer = self.layer.clone();
        async move {
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Ok(layer.recover(payload, &head)),
            }
        }
        .boxed()
    }
}
