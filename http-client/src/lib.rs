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

//! # resty-client
//!
//! ## Resty REST 客户端
//!
//! 在 [`resty_http::HttpCaller`] 之上提供流式 API 的同步 REST 客户端，支持
//!
//! - URI 模版展开与基础 URL 拼接
//! - 默认 HTTP 头，默认 Cookie 与默认请求设置
//! - 请求初始化函数与拦截器链
//! - 基于编解码器的结构化请求体与响应体
//! - Multipart 表单
//! - 按状态码定制错误处理
//!
//! ### 功能描述
//!
//! #### `ureq`
//!
//! 启用基于 Ureq 的 HTTP 客户端，默认启用。
//!
//! #### `isahc`
//!
//! 启用基于 Isahc 的 HTTP 客户端。
//!
//! #### `reqwest`
//!
//! 启用基于 Reqwest 的 HTTP 客户端。
//!
//! 同时启用多个 HTTP 客户端时，[`RestClient::default`] 依次优先使用 Ureq，Isahc 和 Reqwest。
//!
//! ### 代码示例
//!
//! ```no_run
//! use resty_client::{Multipart, Part, RestClientBuilder};
//!
//! # fn example() -> anyhow::Result<()> {
//! let client = RestClientBuilder::default()
//!     .base_url("https://upload.example.com".parse()?)
//!     .build();
//! let multipart = Multipart::new()
//!     .add_part("name", Part::text("avatar"))
//!     .add_part("file", Part::file_path("/tmp/avatar.png")?);
//! let entity = client
//!     .post()
//!     .uri("/files")
//!     .multipart(multipart)
//!     .retrieve()
//!     .to_bodiless_entity()?;
//! println!("{}", entity.status_code());
//! # Ok(())
//! # }
//! ```

mod client;

#[cfg(test)]
mod test_utils;

pub use client::{
    default_codecs, expand_uri_template, resolve_uri, ApiResult, BodyCodec, BufferingPolicy, ClientErrorStatus,
    ClientResponse, CodecError, Cookies, EncodedBody, FormCodec, Hints, Interceptor, JsonCodec, JsonView, Multipart,
    Next, Part, PartMetadata, RequestBuilder, RequestInitializer, ResponseEntity, ResponseError, ResponseErrorKind,
    ResponseSpec, RestClient, RestClientBuilder, ServerErrorStatus, StatusHandler, StringCodec, UriExpansionError,
    UriVariables,
};

pub use resty_http as http;

#[cfg(feature = "isahc")]
#[cfg_attr(feature = "docs", doc(cfg(feature = "isahc")))]
pub use resty_isahc as isahc;

#[cfg(feature = "reqwest")]
#[cfg_attr(feature = "docs", doc(cfg(feature = "reqwest")))]
pub use resty_reqwest as reqwest;

#[cfg(feature = "ureq")]
#[cfg_attr(feature = "docs", doc(cfg(feature = "ureq")))]
pub use resty_ureq as ureq;
