use super::ResponseError;
use assert_impl::assert_impl;
use http::{
    header::{HeaderMap, HeaderValue, IntoHeaderName},
    response::{Parts as HttpResponseParts, Response as HttpResponse},
    status::StatusCode,
    Extensions, Version,
};
use std::{
    fmt::{self, Debug},
    io::{Cursor, Read, Result as IoResult},
    mem::take,
    ops::{Deref, DerefMut},
    result,
};

/// HTTP 响应信息
///
/// 不包含响应体信息
#[derive(Debug)]
pub struct ResponseParts {
    inner: HttpResponseParts,
}

impl ResponseParts {
    /// 获取 HTTP 状态码
    #[inline]
    pub fn status_code(&self) -> StatusCode {
        self.inner.status
    }

    /// 获取 HTTP 状态码的可变引用
    #[inline]
    pub fn status_code_mut(&mut self) -> &mut StatusCode {
        &mut self.inner.status
    }

    /// 获取 HTTP Headers
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    /// 获取 HTTP Headers 的可变引用
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.inner.headers
    }

    /// 获取 HTTP Header
    #[inline]
    pub fn header(&self, header_name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.inner.headers.get(header_name.as_ref())
    }

    /// 获取 HTTP 版本
    #[inline]
    pub fn version(&self) -> Version {
        self.inner.version
    }

    /// 获取 HTTP 版本的可变引用
    #[inline]
    pub fn version_mut(&mut self) -> &mut Version {
        &mut self.inner.version
    }

    /// 获取扩展信息
    #[inline]
    pub fn extensions(&self) -> &Extensions {
        &self.inner.extensions
    }

    /// 获取扩展信息的可变引用
    #[inline]
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.inner.extensions
    }
}

impl Default for ResponseParts {
    #[inline]
    fn default() -> Self {
        let (parts, _) = HttpResponse::new(()).into_parts();
        Self { inner: parts }
    }
}

/// HTTP 响应
///
/// 封装 HTTP 响应相关字段
#[derive(Debug, Default)]
pub struct Response<B> {
    parts: ResponseParts,
    body: B,
}

impl<B> Response<B> {
    /// 通过 HTTP 响应信息与响应体创建 HTTP 响应
    #[inline]
    pub fn from_parts_and_body(parts: ResponseParts, body: B) -> Self {
        Self { parts, body }
    }

    /// 获取 HTTP 响应信息
    #[inline]
    pub fn parts(&self) -> &ResponseParts {
        &self.parts
    }

    /// 获取 HTTP 响应信息的可变引用
    #[inline]
    pub fn parts_mut(&mut self) -> &mut ResponseParts {
        &mut self.parts
    }

    /// 获取 HTTP 响应体
    #[inline]
    pub fn body(&self) -> &B {
        &self.body
    }

    /// 获取 HTTP 响应体的可变引用
    #[inline]
    pub fn body_mut(&mut self) -> &mut B {
        &mut self.body
    }

    /// 转换为 HTTP 响应体
    #[inline]
    pub fn into_body(self) -> B {
        self.body
    }

    /// 转换为 HTTP 响应信息与响应体
    #[inline]
    pub fn into_parts_and_body(self) -> (ResponseParts, B) {
        (self.parts, self.body)
    }

    /// 对 HTTP 响应体进行映射
    #[inline]
    pub fn map_body<B2>(self, f: impl FnOnce(B) -> B2) -> Response<B2> {
        Response {
            parts: self.parts,
            body: f(self.body),
        }
    }

    /// 尝试对 HTTP 响应体进行映射
    #[inline]
    pub fn try_map_body<B2, E>(self, f: impl FnOnce(B) -> result::Result<B2, E>) -> result::Result<Response<B2>, E> {
        Ok(Response {
            parts: self.parts,
            body: f(self.body)?,
        })
    }
}

impl<B> Deref for Response<B> {
    type Target = ResponseParts;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.parts
    }
}

impl<B> DerefMut for Response<B> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.parts
    }
}

/// HTTP 响应结果
pub type ResponseResult<B> = result::Result<Response<B>, ResponseError>;

/// 阻塞 HTTP 响应
pub type SyncResponse = Response<SyncResponseBody>;

/// 阻塞 HTTP 响应结果
pub type SyncResponseResult = ResponseResult<SyncResponseBody>;

impl SyncResponse {
    /// 创建阻塞 HTTP 响应构建器
    #[inline]
    pub fn builder() -> SyncResponseBuilder {
        SyncResponseBuilder::default()
    }
}

/// 阻塞 HTTP 响应构建器
#[derive(Debug, Default)]
pub struct SyncResponseBuilder {
    inner: SyncResponse,
}

impl SyncResponseBuilder {
    /// 设置 HTTP 状态码
    #[inline]
    pub fn status_code(&mut self, status_code: StatusCode) -> &mut Self {
        *self.inner.status_code_mut() = status_code;
        self
    }

    /// 设置 HTTP Headers
    #[inline]
    pub fn headers(&mut self, headers: HeaderMap) -> &mut Self {
        *self.inner.headers_mut() = headers;
        self
    }

    /// 插入 HTTP Header
    #[inline]
    pub fn header(&mut self, header_name: impl IntoHeaderName, header_value: HeaderValue) -> &mut Self {
        self.inner.headers_mut().insert(header_name, header_value);
        self
    }

    /// 设置 HTTP 版本
    #[inline]
    pub fn version(&mut self, version: Version) -> &mut Self {
        *self.inner.version_mut() = version;
        self
    }

    /// 添加扩展信息
    #[inline]
    pub fn add_extension<T: Send + Sync + 'static>(&mut self, val: T) -> &mut Self {
        self.inner.extensions_mut().insert(val);
        self
    }

    /// 设置 HTTP 响应体
    #[inline]
    pub fn body(&mut self, body: SyncResponseBody) -> &mut Self {
        *self.inner.body_mut() = body;
        self
    }

    /// 使用输入流作为 HTTP 响应体
    #[inline]
    pub fn stream_as_body(&mut self, reader: impl Read + Send + 'static) -> &mut Self {
        self.body(SyncResponseBody::from_reader(reader))
    }

    /// 使用二进制数据作为 HTTP 响应体
    #[inline]
    pub fn bytes_as_body(&mut self, bytes: impl Into<Vec<u8>>) -> &mut Self {
        self.body(SyncResponseBody::from_bytes(bytes.into()))
    }

    /// 构建阻塞 HTTP 响应，同时重置构建器
    #[inline]
    pub fn build(&mut self) -> SyncResponse {
        take(&mut self.inner)
    }
}

/// 阻塞 HTTP 响应体
///
/// 默认只能读取一次。调用 [`SyncResponseBody::buffer`] 后，响应体将被完整读入内存，
/// 之后可以通过 [`SyncResponseBody::rewind`] 反复读取。
pub struct SyncResponseBody {
    inner: SyncResponseBodyInner,
    buffered: bool,
}

enum SyncResponseBodyInner {
    Reader(Box<dyn Read + Send>),
    Bytes(Cursor<Vec<u8>>),
}

impl SyncResponseBody {
    /// 通过输入流创建 HTTP 响应体
    #[inline]
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self {
            inner: SyncResponseBodyInner::Reader(Box::new(reader)),
            buffered: false,
        }
    }

    /// 通过二进制数据创建 HTTP 响应体
    #[inline]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            inner: SyncResponseBodyInner::Bytes(Cursor::new(bytes)),
            buffered: false,
        }
    }

    /// 将尚未读取的响应体全部读入内存，使其可以反复读取
    ///
    /// 已经读取过的部分无法恢复
    pub fn buffer(&mut self) -> IoResult<()> {
        if let SyncResponseBodyInner::Reader(reader) = &mut self.inner {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf)?;
            self.inner = SyncResponseBodyInner::Bytes(Cursor::new(buf));
        }
        self.buffered = true;
        Ok(())
    }

    /// 响应体是否已经被缓冲
    #[inline]
    pub fn is_buffered(&self) -> bool {
        self.buffered
    }

    /// 将内存中的响应体重置到起始位置
    ///
    /// 输入流无法重置，返回 `false`
    #[inline]
    pub fn rewind(&mut self) -> bool {
        match &mut self.inner {
            SyncResponseBodyInner::Bytes(bytes) => {
                bytes.set_position(0);
                true
            }
            SyncResponseBodyInner::Reader(_) => false,
        }
    }

    /// 获取内存中的响应体数据
    ///
    /// 输入流返回 `None`
    #[inline]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.inner {
            SyncResponseBodyInner::Bytes(bytes) => Some(bytes.get_ref()),
            SyncResponseBodyInner::Reader(_) => None,
        }
    }

    #[allow(dead_code)]
    fn ignore() {
        assert_impl!(Send: Self);
    }
}

impl Default for SyncResponseBody {
    #[inline]
    fn default() -> Self {
        Self::from_bytes(Default::default())
    }
}

impl Read for SyncResponseBody {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        match &mut self.inner {
            SyncResponseBodyInner::Reader(reader) => reader.read(buf),
            SyncResponseBodyInner::Bytes(bytes) => bytes.read(buf),
        }
    }
}

impl Debug for SyncResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            SyncResponseBodyInner::Reader(_) => f.debug_struct("Reader").finish(),
            SyncResponseBodyInner::Bytes(bytes) => f
                .debug_struct("Bytes")
                .field("len", &bytes.get_ref().len())
                .field("buffered", &self.buffered)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_TYPE;

    #[test]
    fn test_build_sync_response() {
        let mut response = SyncResponse::builder()
            .status_code(StatusCode::NOT_FOUND)
            .header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .bytes_as_body("Not Found")
            .build();
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(response.header("Content-Type").unwrap(), "text/plain");
        let mut body = String::new();
        response.body_mut().read_to_string(&mut body).unwrap();
        assert_eq!(body, "Not Found");
        assert!(!response.body().is_buffered());
    }

    #[test]
    fn test_buffer_response_body() {
        let mut body = SyncResponseBody::from_reader(Cursor::new(b"Hello, world".to_vec()));
        assert!(body.as_bytes().is_none());
        assert!(!body.rewind());

        let mut prefix = [0u8; 7];
        body.read_exact(&mut prefix).unwrap();
        body.buffer().unwrap();
        assert!(body.is_buffered());
        assert_eq!(body.as_bytes(), Some(b"world".as_slice()));

        for _ in 0..2 {
            assert!(body.rewind());
            let mut content = String::new();
            body.read_to_string(&mut content).unwrap();
            assert_eq!(content, "world");
        }
    }

    #[test]
    fn test_try_map_body() {
        let response = SyncResponse::builder()
            .status_code(StatusCode::OK)
            .bytes_as_body(b"42".to_vec())
            .build();
        let response = response
            .try_map_body(|mut body| {
                let mut s = String::new();
                body.read_to_string(&mut s).map(|_| s)
            })
            .unwrap();
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.into_body(), "42");
    }
}
