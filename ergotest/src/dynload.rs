// Copyright (c) The ergotest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loading compiled Rust code at run time.
//!
//! Rust has no runtime `import`; the nearest idiomatic equivalent used by
//! plugin-style Rust tools is dynamic loading via `libloading`. A loadable
//! "module" is a `cdylib` built against this same `ergotest` crate, exposing
//! the `extern "C"` entry points below. Because the exchanged values are
//! full Rust types rather than a C-safe ABI, host and module must be built
//! against the same `ergotest` version and toolchain — this is the same
//! constraint every Rust plugin system built this way accepts, and is
//! recorded as an open question in `DESIGN.md`.

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error as ThisError;

use crate::{context::Renderer, errors::Error, runnable::TestError, test_suite::TestSuite};

/// Symbol a loadable test module must export.
pub const SUITE_SYMBOL: &[u8] = b"ergotest_suite";

/// Symbol a loadable renderer module must export.
pub const RENDERER_SYMBOL: &[u8] = b"render_error";

type SuiteEntryPoint = unsafe extern "C" fn() -> *mut TestSuite;
type RendererEntryPoint =
    unsafe extern "C" fn(*const Vec<String>, *const TestError, *const Option<Utf8PathBuf>) -> *mut serde_json::Value;

/// A module-load failure, kept distinct from [`Error`]: unlike renderer load
/// failures, a module that fails to load is recovered locally by
/// [`crate::loader`] into a synthetic failure case, never propagated to the
/// caller of `run`.
#[derive(Debug, ThisError)]
pub enum DynLoadError {
    #[error("Test module not found")]
    NotFound,
    #[error("failed to load module: {0}")]
    Load(#[source] libloading::Error),
    #[error("module does not export `{0}`: {1}")]
    Symbol(&'static str, #[source] libloading::Error),
}

/// Loads a module's `TestSuite` by calling its `ergotest_suite` entry point.
///
/// # Safety contract
///
/// The caller is trusted to point at a `cdylib` built against a compatible
/// `ergotest`; a mismatched build can corrupt memory.
pub fn load_suite(path: &Utf8Path) -> Result<Box<TestSuite>, DynLoadError> {
    if !path.exists() {
        return Err(DynLoadError::NotFound);
    }
    let library = unsafe { libloading::Library::new(path.as_std_path()) }.map_err(DynLoadError::Load)?;
    let entry: libloading::Symbol<'_, SuiteEntryPoint> =
        unsafe { library.get(SUITE_SYMBOL) }.map_err(|e| DynLoadError::Symbol("ergotest_suite", e))?;
    let raw = unsafe { entry() };
    if raw.is_null() {
        return Err(DynLoadError::Symbol("ergotest_suite", libloading::Error::DlSymUnknown));
    }
    let suite = unsafe { Box::from_raw(raw) };
    // Keep the library resident for the process lifetime: dropping it would
    // unmap code the suite's closures may still call into.
    std::mem::forget(library);
    Ok(suite)
}

/// Loads a renderer module and wraps its `render_error` export as a
/// [`Renderer`] closure. Unlike [`load_suite`], failures here are
/// engine-level: a missing or malformed renderer is fatal to the run.
pub fn load_renderer(path: &Utf8Path) -> Result<Renderer, Error> {
    let library = unsafe { libloading::Library::new(path.as_std_path()) }
        .map_err(|source| Error::RendererLoad { path: path.to_owned(), source })?;
    let entry: libloading::Symbol<'_, RendererEntryPoint> = unsafe { library.get(RENDERER_SYMBOL) }
        .map_err(|source| Error::RendererSymbol { path: path.to_owned(), source })?;
    let entry = unsafe { *entry.into_raw() };
    std::mem::forget(library);

    let render = move |name: &[String], error: &TestError, filename: Option<&Utf8PathBuf>| -> serde_json::Value {
        let name = name.to_vec();
        let filename = filename.cloned();
        let raw = unsafe { entry(&name as *const _, error as *const _, &filename as *const _) };
        if raw.is_null() {
            return serde_json::Value::Null;
        }
        *unsafe { Box::from_raw(raw) }
    };
    Ok(std::sync::Arc::new(render))
}
