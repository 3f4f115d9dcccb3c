//! # userware-http
//!
//! HTTP types for userware: [`HttpRequest`], [`HttpResponse`] and its
//! helpers, [`QueryDict`] for form and query data, the named route table in
//! [`urls`], and [`utils`] for redirect and host validation.

pub mod querydict;
pub mod request;
pub mod response;
pub mod urls;
pub mod utils;

use std::future::Future;
use std::pin::Pin;

pub use querydict::QueryDict;
pub use request::{HttpRequest, HttpRequestBuilder};
pub use response::{HttpResponse, HttpResponseRedirect, JsonResponse};
pub use urls::{ResolverMatch, RouteHandler, Routes, URLPattern};

/// A boxed, sendable future resolving to an [`HttpResponse`].
pub type BoxFuture = Pin<Box<dyn Future<Output = HttpResponse> + Send>>;
