// Copyright (c) The ergotest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`Runnable`]: one callable unit — a name, optional timeout, and an
//! optional body — executed under a timeout to produce a [`RunResult`].

use std::{any::Any, collections::HashMap, fmt, future::Future, panic::AssertUnwindSafe, pin::Pin, sync::Arc};

use camino::Utf8PathBuf;
use serde::de::DeserializeOwned;

use crate::{clock, result::RunResult};

/// The failure carried by a `fail` [`RunResult`], and crossed over the
/// worker process boundary intact.
///
/// Rust has no "throw anything" analogue of the original's thrown value, so
/// a test body fails either by returning `Err(TestError)` or by panicking;
/// both collapse into this one representation. `extra` is the bag of
/// arbitrary custom fields the specification asks be preserved across the
/// wire; `assertion` carries actual/expected/operator metadata for
/// assertion-style failures.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TestError {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub stack_trace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub assertion: Option<AssertionMetadata>,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty", default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Actual/expected/operator metadata surfaced by assertion-style failures.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AssertionMetadata {
    pub actual: serde_json::Value,
    pub expected: serde_json::Value,
    pub operator: String,
}

impl TestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack_trace: None,
            assertion: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Mirrors the specification's "if `e` exposes a message string, use it"
    /// rule: any `Display` value's rendering is the message.
    pub fn from_display(e: impl fmt::Display) -> Self {
        Self::new(e.to_string())
    }

    /// Mirrors "else if `e` is a string, use it."
    pub fn from_string(s: String) -> Self {
        Self::new(s)
    }

    /// Mirrors the deep-inspection fallback, applied to a caught panic
    /// payload that is neither a `&str` nor a `String`.
    pub fn from_panic_payload(payload: Box<dyn Any + Send>) -> Self {
        if let Some(s) = payload.downcast_ref::<&str>() {
            return Self::new(*s);
        }
        if let Some(s) = payload.downcast_ref::<String>() {
            return Self::new(s.clone());
        }
        Self::new("non-string panic payload")
    }

    pub fn with_stack_trace(mut self, trace: impl Into<String>) -> Self {
        self.stack_trace = Some(trace.into());
        self
    }

    pub fn with_assertion(mut self, assertion: AssertionMetadata) -> Self {
        self.assertion = Some(assertion);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TestError {}

/// Parameters threaded into a running body.
#[derive(Clone)]
pub struct TestParameters {
    config: Arc<HashMap<String, serde_json::Value>>,
}

impl TestParameters {
    pub fn new(config: Arc<HashMap<String, serde_json::Value>>) -> Self {
        Self { config }
    }

    /// Looks up `name` in the run's config map and deserializes it as `T`.
    /// A missing key becomes a [`TestError`], which the caller should
    /// propagate as the body's failure.
    pub fn get_config<T: DeserializeOwned>(&self, name: &str) -> Result<T, TestError> {
        let value = self
            .config
            .get(name)
            .ok_or_else(|| TestError::new(format!("no such config value: '{name}'")))?;
        serde_json::from_value(value.clone())
            .map_err(|e| TestError::new(format!("config value '{name}' has the wrong shape: {e}")))
    }
}

/// A boxed, pinned, `'static` body future — the shape every `Runnable` body
/// is stored as so the engine can hold a heterogeneous collection of hooks
/// and test bodies.
pub type BodyFuture = Pin<Box<dyn Future<Output = Result<(), TestError>> + Send>>;

/// A user-supplied body: takes [`TestParameters`], returns a future that
/// resolves to success or a [`TestError`].
pub type BodyFn = dyn Fn(TestParameters) -> BodyFuture + Send + Sync;

/// Per-invocation options accepted by [`Runnable::run`].
#[derive(Clone, Debug, Default)]
pub struct RunnableOptions {
    pub timeout_ms: Option<u64>,
}

/// Ambient data threaded down through a recursive run, carrying the
/// effective timeout and whether an ancestor's failure has already forced
/// everything below it to be skipped.
#[derive(Clone)]
pub struct RunData {
    pub timeout_ms: u64,
    pub config: Arc<HashMap<String, serde_json::Value>>,
    pub skip_all: bool,
    pub renderer: Option<Arc<dyn Fn(&[String], &TestError, Option<&Utf8PathBuf>) -> serde_json::Value + Send + Sync>>,
}

/// One callable unit: a name, optional timeout, and optional body.
pub struct Runnable {
    name: Vec<String>,
    filename: Option<Utf8PathBuf>,
    options: RunnableOptions,
    body: Option<Arc<BodyFn>>,
}

impl Runnable {
    pub fn new(
        name: Vec<String>,
        filename: Option<Utf8PathBuf>,
        options: RunnableOptions,
        body: Option<Arc<BodyFn>>,
    ) -> Self {
        assert!(!name.is_empty(), "Runnable name must not be empty");
        if let Some(ms) = options.timeout_ms {
            assert!(ms > 0, "timeout must be a positive number of milliseconds");
        }
        Self {
            name,
            filename,
            options,
            body,
        }
    }

    pub fn name(&self) -> &[String] {
        &self.name
    }

    /// Runs the body (if any) under a timeout, producing a [`RunResult`].
    ///
    /// If `run_data.skip_all` is set, the body is not invoked at all and the
    /// result is `skip`. A missing body is treated as `skip` as well; callers
    /// that need "missing body is a failure" (e.g. `it.only` with no body)
    /// special-case that before calling `run`.
    pub async fn run(&self, run_data: &RunData) -> RunResult {
        if run_data.skip_all {
            return RunResult::skip(self.name.clone(), self.filename.clone());
        }
        let Some(body) = self.body.clone() else {
            return RunResult::skip(self.name.clone(), self.filename.clone());
        };

        let effective_timeout = self.options.timeout_ms.unwrap_or(run_data.timeout_ms);
        let params = TestParameters::new(run_data.config.clone());
        let name = self.name.clone();
        let filename = self.filename.clone();

        let body_future = async move {
            let fut = body(params);
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(())) => Outcome::Pass,
                Ok(Err(e)) => Outcome::Fail(e),
                Err(payload) => Outcome::Fail(TestError::from_panic_payload(payload)),
            }
        };

        let outcome = clock::timeout(effective_timeout, body_future, || Outcome::Timeout).await;

        let result = match outcome {
            Outcome::Pass => RunResult::pass(name.clone(), filename.clone()),
            Outcome::Fail(e) => {
                let base = RunResult::fail(name.clone(), filename.clone(), &e);
                match &run_data.renderer {
                    Some(render) => base.with_render(render(&name, &e, filename.as_ref())),
                    None => base,
                }
            }
            Outcome::Timeout => RunResult::timeout(name, filename, effective_timeout),
        };
        result
    }
}

enum Outcome {
    Pass,
    Fail(TestError),
    Timeout,
}

trait CatchUnwind: Future + Sized {
    fn catch_unwind(self) -> futures_catch_unwind::CatchUnwind<Self>;
}

impl<F: Future> CatchUnwind for F {
    fn catch_unwind(self) -> futures_catch_unwind::CatchUnwind<Self> {
        futures_catch_unwind::CatchUnwind::new(self)
    }
}

/// A minimal, local `catch_unwind` combinator for futures, avoiding a
/// dependency on `futures` for a single adapter. Mirrors the shape of
/// `futures::FutureExt::catch_unwind`.
mod futures_catch_unwind {
    use std::{
        any::Any,
        future::Future,
        panic::{catch_unwind, AssertUnwindSafe},
        pin::Pin,
        task::{Context, Poll},
    };

    pin_project_lite::pin_project! {
        pub struct CatchUnwind<F> {
            #[pin]
            inner: F,
        }
    }

    impl<F> CatchUnwind<F> {
        pub fn new(inner: F) -> Self {
            Self { inner }
        }
    }

    impl<F: Future> Future for CatchUnwind<F> {
        type Output = Result<F::Output, Box<dyn Any + Send>>;

        fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            let this = self.project();
            catch_unwind(AssertUnwindSafe(|| this.inner.poll(cx)))?.map(Ok)
        }
    }
}
