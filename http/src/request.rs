use assert_impl::assert_impl;
use http::{
    header::{HeaderMap, HeaderName, HeaderValue, IntoHeaderName},
    method::Method,
    request::{Parts as HttpRequestParts, Request as HttpRequest},
    uri::Uri,
    Extensions, Version,
};
use once_cell::sync::Lazy;
use std::{
    borrow::Cow,
    fmt::{self, Debug},
    io::{copy, Cursor, Read, Result as IoResult},
    mem::take,
    ops::{Deref, DerefMut},
};

pub(super) static FULL_USER_AGENT: Lazy<Box<str>> = Lazy::new(|| {
    format!(
        "Resty/resty-http-{}/rust-{}",
        env!("CARGO_PKG_VERSION"),
        env!("RESTY_RUSTC_VERSION"),
    )
    .into()
});

/// HTTP 请求信息
///
/// 不包含请求体信息
#[derive(Debug)]
pub struct RequestParts {
    inner: HttpRequestParts,
    appended_user_agent: String,
}

impl RequestParts {
    /// 创建 HTTP 请求信息构建器
    #[inline]
    pub fn builder() -> RequestPartsBuilder {
        RequestPartsBuilder::default()
    }

    /// 获取 HTTP 请求 URL
    #[inline]
    pub fn url(&self) -> &Uri {
        &self.inner.uri
    }

    /// 获取 HTTP 请求 URL 的可变引用
    #[inline]
    pub fn url_mut(&mut self) -> &mut Uri {
        &mut self.inner.uri
    }

    /// 获取请求 HTTP 版本
    #[inline]
    pub fn version(&self) -> Version {
        self.inner.version
    }

    /// 获取请求 HTTP 版本的可变引用
    #[inline]
    pub fn version_mut(&mut self) -> &mut Version {
        &mut self.inner.version
    }

    /// 获取请求 HTTP 方法
    #[inline]
    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    /// 获取请求 HTTP 方法的可变引用
    #[inline]
    pub fn method_mut(&mut self) -> &mut Method {
        &mut self.inner.method
    }

    /// 获取请求 HTTP Headers
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    /// 获取请求 HTTP Headers 的可变引用
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.inner.headers
    }

    /// 获取请求 HTTP Header
    #[inline]
    pub fn header(&self, header_name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.inner.headers.get(header_name.as_ref())
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

    /// 获取 UserAgent
    ///
    /// 由 resty-http 的默认 UserAgent 与追加的 UserAgent 拼接而成
    #[inline]
    pub fn user_agent(&self) -> String {
        let mut user_agent = String::from(FULL_USER_AGENT.as_ref());
        user_agent.push_str(&self.appended_user_agent);
        user_agent
    }

    /// 获取追加的 UserAgent
    #[inline]
    pub fn appended_user_agent(&self) -> &str {
        &self.appended_user_agent
    }

    /// 获取追加的 UserAgent 的可变引用
    #[inline]
    pub fn appended_user_agent_mut(&mut self) -> &mut String {
        &mut self.appended_user_agent
    }
}

impl Default for RequestParts {
    #[inline]
    fn default() -> Self {
        let (parts, _) = HttpRequest::new(()).into_parts();
        Self {
            inner: parts,
            appended_user_agent: Default::default(),
        }
    }
}

/// HTTP 请求信息构建器
#[derive(Debug, Default)]
pub struct RequestPartsBuilder(RequestParts);

impl RequestPartsBuilder {
    /// 设置 HTTP 请求 URL
    #[inline]
    pub fn url(&mut self, url: Uri) -> &mut Self {
        self.0.inner.uri = url;
        self
    }

    /// 设置请求 HTTP 方法
    #[inline]
    pub fn method(&mut self, method: Method) -> &mut Self {
        self.0.inner.method = method;
        self
    }

    /// 设置请求 HTTP 版本
    #[inline]
    pub fn version(&mut self, version: Version) -> &mut Self {
        self.0.inner.version = version;
        self
    }

    /// 设置请求 HTTP Headers
    #[inline]
    pub fn headers(&mut self, headers: HeaderMap) -> &mut Self {
        self.0.inner.headers = headers;
        self
    }

    /// 插入请求 HTTP Header
    #[inline]
    pub fn header(&mut self, header_name: impl IntoHeaderName, header_value: HeaderValue) -> &mut Self {
        self.0.inner.headers.insert(header_name, header_value);
        self
    }

    /// 设置扩展信息
    #[inline]
    pub fn extensions(&mut self, extensions: Extensions) -> &mut Self {
        self.0.inner.extensions = extensions;
        self
    }

    /// 添加扩展信息
    #[inline]
    pub fn add_extension<T: Send + Sync + 'static>(&mut self, val: T) -> &mut Self {
        self.0.inner.extensions.insert(val);
        self
    }

    /// 追加 UserAgent
    #[inline]
    pub fn appended_user_agent(&mut self, user_agent: impl AsRef<str>) -> &mut Self {
        self.0.appended_user_agent.push_str(user_agent.as_ref());
        self
    }

    /// 构建 HTTP 请求信息，同时重置构建器
    #[inline]
    pub fn build(&mut self) -> RequestParts {
        take(&mut self.0)
    }
}

/// HTTP 请求
///
/// 封装 HTTP 请求相关字段
#[derive(Debug, Default)]
pub struct Request<B> {
    parts: RequestParts,
    body: B,
}

impl<B> Request<B> {
    /// 通过 HTTP 请求信息与请求体创建 HTTP 请求
    #[inline]
    pub fn from_parts_and_body(parts: RequestParts, body: B) -> Self {
        Self { parts, body }
    }

    /// 获取请求体
    #[inline]
    pub fn body(&self) -> &B {
        &self.body
    }

    /// 获取请求体的可变引用
    #[inline]
    pub fn body_mut(&mut self) -> &mut B {
        &mut self.body
    }

    /// 获取 HTTP 请求信息
    #[inline]
    pub fn parts(&self) -> &RequestParts {
        &self.parts
    }

    /// 获取 HTTP 请求信息的可变引用
    #[inline]
    pub fn parts_mut(&mut self) -> &mut RequestParts {
        &mut self.parts
    }

    /// 转换为 HTTP 请求信息与请求体
    #[inline]
    pub fn into_parts_and_body(self) -> (RequestParts, B) {
        (self.parts, self.body)
    }
}

impl<B> Deref for Request<B> {
    type Target = RequestParts;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.parts
    }
}

impl<B> DerefMut for Request<B> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.parts
    }
}

/// 阻塞 HTTP 请求
pub type SyncRequest<'r> = Request<SyncRequestBody<'r>>;

impl<'r> SyncRequest<'r> {
    /// 创建阻塞 HTTP 请求构建器
    #[inline]
    pub fn builder() -> SyncRequestBuilder<'r> {
        SyncRequestBuilder::default()
    }
}

/// 阻塞 HTTP 请求构建器
#[derive(Debug, Default)]
pub struct SyncRequestBuilder<'r> {
    parts: RequestPartsBuilder,
    body: SyncRequestBody<'r>,
}

impl<'r> SyncRequestBuilder<'r> {
    /// 设置 HTTP 请求 URL
    #[inline]
    pub fn url(&mut self, url: Uri) -> &mut Self {
        self.parts.url(url);
        self
    }

    /// 设置请求 HTTP 方法
    #[inline]
    pub fn method(&mut self, method: Method) -> &mut Self {
        self.parts.method(method);
        self
    }

    /// 设置请求 HTTP 版本
    #[inline]
    pub fn version(&mut self, version: Version) -> &mut Self {
        self.parts.version(version);
        self
    }

    /// 设置请求 HTTP Headers
    #[inline]
    pub fn headers(&mut self, headers: HeaderMap) -> &mut Self {
        self.parts.headers(headers);
        self
    }

    /// 插入请求 HTTP Header
    #[inline]
    pub fn header(&mut self, header_name: HeaderName, header_value: HeaderValue) -> &mut Self {
        self.parts.header(header_name, header_value);
        self
    }

    /// 添加扩展信息
    #[inline]
    pub fn add_extension<T: Send + Sync + 'static>(&mut self, val: T) -> &mut Self {
        self.parts.add_extension(val);
        self
    }

    /// 追加 UserAgent
    #[inline]
    pub fn appended_user_agent(&mut self, user_agent: impl AsRef<str>) -> &mut Self {
        self.parts.appended_user_agent(user_agent);
        self
    }

    /// 设置请求体
    #[inline]
    pub fn body(&mut self, body: SyncRequestBody<'r>) -> &mut Self {
        self.body = body;
        self
    }

    /// 构建阻塞 HTTP 请求，同时重置构建器
    #[inline]
    pub fn build(&mut self) -> SyncRequest<'r> {
        Request {
            parts: self.parts.build(),
            body: take(&mut self.body),
        }
    }
}

/// 阻塞 HTTP 请求体
///
/// 可以是内存数据（引用或所有），也可以是流式的输入源
pub struct SyncRequestBody<'a>(SyncRequestBodyInner<'a>);

enum SyncRequestBodyInner<'a> {
    Bytes(Cursor<Cow<'a, [u8]>>),
    Reader {
        reader: Box<dyn Read + Send + Sync>,
        size: Option<u64>,
    },
}

impl<'a> SyncRequestBody<'a> {
    /// 通过二进制数据的引用创建阻塞 HTTP 请求体
    #[inline]
    pub fn from_referenced_bytes(bytes: &'a [u8]) -> Self {
        Self(SyncRequestBodyInner::Bytes(Cursor::new(Cow::Borrowed(bytes))))
    }

    /// 通过二进制数据创建阻塞 HTTP 请求体
    #[inline]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(SyncRequestBodyInner::Bytes(Cursor::new(Cow::Owned(bytes))))
    }

    /// 通过输入流创建阻塞 HTTP 请求体
    ///
    /// 如果不知道输入流的长度，`size` 传入 `None`，HTTP 客户端实现将使用分块传输
    #[inline]
    pub fn from_reader(reader: impl Read + Send + Sync + 'static, size: Option<u64>) -> Self {
        Self(SyncRequestBodyInner::Reader {
            reader: Box::new(reader),
            size,
        })
    }

    /// 获取请求体的长度
    ///
    /// 长度未知的输入流返回 `None`
    #[inline]
    pub fn size(&self) -> Option<u64> {
        match &self.0 {
            SyncRequestBodyInner::Bytes(bytes) => Some(bytes.get_ref().len() as u64),
            SyncRequestBodyInner::Reader { size, .. } => *size,
        }
    }

    /// 请求体是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size() == Some(0)
    }

    /// 获取内存中的请求体数据
    ///
    /// 输入流返回 `None`
    #[inline]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.0 {
            SyncRequestBodyInner::Bytes(bytes) => Some(bytes.get_ref()),
            SyncRequestBodyInner::Reader { .. } => None,
        }
    }

    /// 读取全部请求体数据到内存中
    pub fn into_bytes(self) -> IoResult<Vec<u8>> {
        match self.0 {
            SyncRequestBodyInner::Bytes(bytes) => Ok(bytes.into_inner().into_owned()),
            SyncRequestBodyInner::Reader { mut reader, size } => {
                let mut buf = Vec::with_capacity(preallocated_len(size));
                copy(&mut reader, &mut buf)?;
                Ok(buf)
            }
        }
    }

    /// 转换为不持有任何引用的阻塞 HTTP 请求体
    ///
    /// 引用的二进制数据将被复制
    #[inline]
    pub fn into_owned(self) -> SyncRequestBody<'static> {
        SyncRequestBody(match self.0 {
            SyncRequestBodyInner::Bytes(bytes) => {
                let position = bytes.position();
                let mut cursor = Cursor::new(Cow::Owned(bytes.into_inner().into_owned()));
                cursor.set_position(position);
                SyncRequestBodyInner::Bytes(cursor)
            }
            SyncRequestBodyInner::Reader { reader, size } => SyncRequestBodyInner::Reader { reader, size },
        })
    }

    #[allow(dead_code)]
    fn ignore() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }
}

/// 输入流的长度仅作为预分配的参考，预分配的内存不超过该值
const PREALLOCATED_LEN_LIMIT: u64 = 1 << 16;

fn preallocated_len(size: Option<u64>) -> usize {
    size.map_or(0, |size| size.min(PREALLOCATED_LEN_LIMIT) as usize)
}

impl Default for SyncRequestBody<'_> {
    #[inline]
    fn default() -> Self {
        Self::from_bytes(Default::default())
    }
}

impl Read for SyncRequestBody<'_> {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        match &mut self.0 {
            SyncRequestBodyInner::Bytes(bytes) => bytes.read(buf),
            SyncRequestBodyInner::Reader { reader, .. } => reader.read(buf),
        }
    }
}

impl Debug for SyncRequestBody<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            SyncRequestBodyInner::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.get_ref().len()).finish(),
            SyncRequestBodyInner::Reader { size, .. } => f.debug_struct("Reader").field("size", size).finish(),
        }
    }
}

impl From<Vec<u8>> for SyncRequestBody<'_> {
    #[inline]
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<String> for SyncRequestBody<'_> {
    #[inline]
    fn from(s: String) -> Self {
        Self::from_bytes(s.into_bytes())
    }
}

impl<'a> From<&'a [u8]> for SyncRequestBody<'a> {
    #[inline]
    fn from(bytes: &'a [u8]) -> Self {
        Self::from_referenced_bytes(bytes)
    }
}

impl<'a> From<&'a str> for SyncRequestBody<'a> {
    #[inline]
    fn from(s: &'a str) -> Self {
        Self::from_referenced_bytes(s.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{ACCEPT, CONTENT_TYPE};

    #[test]
    fn test_build_sync_request() {
        let mut request = SyncRequest::builder()
            .url("http://localhost:8080/greeting".parse().unwrap())
            .method(Method::POST)
            .header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .appended_user_agent("/resty-test")
            .body(SyncRequestBody::from_referenced_bytes(b"Hello, world"))
            .build();
        assert_eq!(request.url().path(), "/greeting");
        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.header("content-type"), Some(&HeaderValue::from_static("text/plain")));
        assert!(request.header(ACCEPT).is_none());
        assert!(request.user_agent().starts_with("Resty/resty-http-"));
        assert!(request.user_agent().ends_with("/resty-test"));
        assert_eq!(request.body().size(), Some(12));

        let mut buf = String::new();
        request.body_mut().read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "Hello, world");
    }

    #[test]
    fn test_reader_body() {
        let body = SyncRequestBody::from_reader(Cursor::new(b"streaming".to_vec()), None);
        assert_eq!(body.size(), None);
        assert!(!body.is_empty());
        assert!(body.as_bytes().is_none());
        assert_eq!(body.into_bytes().unwrap(), b"streaming");

        assert!(SyncRequestBody::default().is_empty());
    }

    #[test]
    fn test_reader_body_with_oversized_size() {
        let body = SyncRequestBody::from_reader(Cursor::new(b"tiny".to_vec()), Some(u64::MAX));
        assert_eq!(body.size(), Some(u64::MAX));
        assert_eq!(body.into_bytes().unwrap(), b"tiny");
        assert_eq!(preallocated_len(Some(u64::MAX)), 1 << 16);
        assert_eq!(preallocated_len(Some(4)), 4);
        assert_eq!(preallocated_len(None), 0);
    }

    #[test]
    fn test_into_owned_keeps_position() {
        let data = b"abcdef".to_vec();
        let mut body = SyncRequestBody::from_referenced_bytes(&data);
        let mut first = [0u8; 2];
        body.read_exact(&mut first).unwrap();
        let mut owned = body.into_owned();
        drop(data);
        let mut rest = String::new();
        owned.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "cdef");
    }
}
