mod error;
mod retrieve;

pub use error::{ApiResult, ClientErrorStatus, Error as ResponseError, ErrorKind as ResponseErrorKind, ServerErrorStatus};
pub use retrieve::ResponseSpec;

use super::{codec::find_reader, BodyCodec};
use mime::{Mime, APPLICATION_OCTET_STREAM};
use resty_http::{
    header::CONTENT_TYPE, Extensions, HeaderMap, HeaderValue, StatusCode, SyncResponse, SyncResponseBody, Version,
};
use serde::de::DeserializeOwned;
use std::{
    any::{type_name, TypeId},
    io::Read,
    sync::Arc,
};

/// REST 客户端响应
///
/// 响应体默认只能读取一次。如果该请求开启了响应体缓冲，可以通过 [`ClientResponse::rewind`] 从头再次读取，
/// 读取全部内容的方法总是从头读取。
#[derive(Debug)]
pub struct ClientResponse {
    inner: SyncResponse,
    codecs: Arc<[Arc<dyn BodyCodec>]>,
}

impl ClientResponse {
    pub(super) fn new(inner: SyncResponse, codecs: Arc<[Arc<dyn BodyCodec>]>) -> Self {
        Self { inner, codecs }
    }

    /// 获取状态码
    #[inline]
    pub fn status_code(&self) -> StatusCode {
        self.inner.status_code()
    }

    /// 获取响应头
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// 获取响应头的值
    #[inline]
    pub fn header(&self, header_name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.inner.header(header_name)
    }

    /// 获取 HTTP 版本
    #[inline]
    pub fn version(&self) -> Version {
        self.inner.version()
    }

    /// 获取扩展信息
    #[inline]
    pub fn extensions(&self) -> &Extensions {
        self.inner.extensions()
    }

    /// 获取响应体的 MIME 类型
    ///
    /// 没有 `Content-Type` 或无法解析时返回 `None`
    pub fn content_type(&self) -> Option<Mime> {
        self.header(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
    }

    /// 响应体是否已被缓冲
    #[inline]
    pub fn is_buffered(&self) -> bool {
        self.inner.body().is_buffered()
    }

    /// 获取响应体
    #[inline]
    pub fn body_mut(&mut self) -> &mut SyncResponseBody {
        self.inner.body_mut()
    }

    /// 将已缓冲的响应体重置到起始位置
    ///
    /// 响应体未被缓冲时返回 `false`
    #[inline]
    pub fn rewind(&mut self) -> bool {
        let body = self.inner.body_mut();
        body.is_buffered() && body.rewind()
    }

    /// 读取响应体的全部内容
    ///
    /// 已缓冲的响应体将从头读取
    pub fn read_bytes(&mut self) -> ApiResult<Vec<u8>> {
        self.rewind();
        let mut buf = Vec::new();
        self.body_mut().read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// 以 UTF-8 文本读取响应体的全部内容
    ///
    /// 已缓冲的响应体将从头读取
    pub fn read_text(&mut self) -> ApiResult<String> {
        self.rewind();
        let mut text = String::new();
        self.body_mut().read_to_string(&mut text)?;
        Ok(text)
    }

    /// 按照 `Content-Type` 解码响应体
    ///
    /// 没有 `Content-Type` 时视为 `application/octet-stream`，响应体为空或为 JSON `null` 时返回 `None`
    pub fn body<T: DeserializeOwned + 'static>(&mut self) -> ApiResult<Option<T>> {
        let body = self.read_bytes()?;
        if body.is_empty() {
            return Ok(None);
        }
        let content_type = self.content_type().unwrap_or(APPLICATION_OCTET_STREAM);
        let codec = find_reader(&self.codecs, TypeId::of::<T>(), type_name::<T>(), &content_type)?;
        match codec.read(&body, &content_type)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// 转换为 HTTP 响应
    #[inline]
    pub fn into_inner(self) -> SyncResponse {
        self.inner
    }
}

/// 响应实体
///
/// 包含状态码，响应头和解码后的响应体
#[derive(Debug, Clone)]
pub struct ResponseEntity<T> {
    status_code: StatusCode,
    headers: HeaderMap,
    body: T,
}

impl<T> ResponseEntity<T> {
    /// 创建响应实体
    #[inline]
    pub fn new(status_code: StatusCode, headers: HeaderMap, body: T) -> Self {
        Self {
            status_code,
            headers,
            body,
        }
    }

    /// 获取状态码
    #[inline]
    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// 获取响应头
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// 获取响应体
    #[inline]
    pub fn body(&self) -> &T {
        &self.body
    }

    /// 转换为响应体
    #[inline]
    pub fn into_body(self) -> T {
        self.body
    }

    /// 转换为状态码，响应头和响应体
    #[inline]
    pub fn into_parts(self) -> (StatusCode, HeaderMap, T) {
        (self.status_code, self.headers, self.body)
    }
}
