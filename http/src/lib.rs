#![cfg_attr(feature = "docs", feature(doc_cfg))]
#![deny(
    missing_debug_implementations,
    anonymous_parameters,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    non_ascii_idents,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_extern_crates,
    unused_import_braces
)]

//! # resty-http
//!
//! ## Resty HTTP 接口
//!
//! 为不同的 HTTP 客户端实现提供相同的基础接口，
//! 上层的 REST 客户端只依赖这里定义的请求、响应与错误类型，
//! 具体的 HTTP 客户端实现（ureq / isahc / reqwest）则各自实现 [`HttpCaller`]。

mod error;
mod extensions;
mod request;
mod response;

use auto_impl::auto_impl;
use std::fmt::Debug;

pub use error::{Error as ResponseError, ErrorBuilder as ResponseErrorBuilder, ErrorKind as ResponseErrorKind};
pub use extensions::TimeoutExtension;
pub use http::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    method::{self, Method},
    status::{self, StatusCode},
    uri::{self, Uri},
    Extensions, Version,
};
pub use request::{Request, RequestParts, RequestPartsBuilder, SyncRequest, SyncRequestBody, SyncRequestBuilder};
pub use response::{
    Response, ResponseParts, ResponseResult, SyncResponse, SyncResponseBody, SyncResponseBuilder, SyncResponseResult,
};

/// HTTP 请求处理接口
///
/// 实现该接口，即可处理所有 REST 客户端发送的 HTTP 请求。
/// HTTP 状态码为 4xx / 5xx 的响应仍然是响应，不应该作为错误返回。
#[auto_impl(&, Box, Arc)]
pub trait HttpCaller: Debug + Send + Sync {
    /// 阻塞发送 HTTP 请求
    fn call(&self, request: &mut SyncRequest<'_>) -> SyncResponseResult;
}

/// 获取 resty-http 的默认 User-Agent
#[inline]
pub fn user_agent() -> &'static str {
    &request::FULL_USER_AGENT
}
