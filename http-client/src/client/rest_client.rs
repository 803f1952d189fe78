use super::{
    codec::default_codecs, ApiResult, BodyCodec, BufferingPolicy, ClientResponse, Cookies, Interceptor, Next,
    RequestBuilder, RequestInitializer, ResponseError, StatusHandler,
};
use anyhow::Result as AnyResult;
use cfg_if::cfg_if;
use log::{debug, warn};
use resty_http::{
    header::IntoHeaderName,
    HeaderMap, HeaderValue, HttpCaller, Method, RequestParts, StatusCode, SyncRequest, SyncRequestBody, SyncResponse,
    Uri,
};
use std::{
    fmt::{self, Debug},
    mem::take,
    sync::Arc,
};
use url::Url;

type DefaultRequest = Arc<dyn Fn(&mut RequestBuilder) + Send + Sync>;

/// REST 客户端
///
/// 克隆代价很低，所有克隆共享同一份配置。
/// 配置在构建后不可修改，需要不同配置时可以通过 [`RestClient::mutate`] 派生出新的客户端。
///
/// ### 发送 JSON 请求并解析响应
///
/// ```no_run
/// use resty_client::RestClientBuilder;
/// use serde_json::{json, Value};
///
/// # fn example() -> anyhow::Result<()> {
/// let client = RestClientBuilder::default()
///     .base_url("https://api.example.com/v1".parse()?)
///     .build();
/// let user: Option<Value> = client
///     .post()
///     .uri_with_args("/users/{id}", [42])
///     .body(json!({"name": "resty"}))
///     .retrieve()
///     .body()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RestClient {
    inner: Arc<RestClientInner>,
}

#[derive(Clone)]
pub(super) struct RestClientInner {
    pub(super) http_caller: Arc<dyn HttpCaller>,
    pub(super) base_url: Option<Url>,
    pub(super) appended_user_agent: String,
    pub(super) default_headers: HeaderMap,
    pub(super) default_cookies: Cookies,
    pub(super) default_requests: Vec<DefaultRequest>,
    pub(super) initializers: Vec<RequestInitializer>,
    pub(super) interceptors: Vec<Arc<dyn Interceptor>>,
    pub(super) buffering: Option<BufferingPolicy>,
    pub(super) status_handlers: Vec<StatusHandler>,
    pub(super) codecs: Arc<[Arc<dyn BodyCodec>]>,
}

impl RestClientInner {
    fn new(http_caller: Arc<dyn HttpCaller>) -> Self {
        Self {
            http_caller,
            base_url: None,
            appended_user_agent: Default::default(),
            default_headers: Default::default(),
            default_cookies: Default::default(),
            default_requests: Default::default(),
            initializers: Default::default(),
            interceptors: Default::default(),
            buffering: None,
            status_handlers: Default::default(),
            codecs: default_codecs().into(),
        }
    }

    /// 依次调用请求初始化函数，拦截器链和 HTTP 客户端
    pub(super) fn execute(
        self: &Arc<Self>,
        parts: &mut RequestParts,
        body: SyncRequestBody<'static>,
    ) -> ApiResult<SyncResponse> {
        for initializer in self.initializers.iter() {
            initializer(parts);
        }
        if self.interceptors.is_empty() {
            return self.call_http_caller(parts, body);
        }
        let body = body.into_bytes()?;
        Next::new(Arc::clone(self)).execute(parts, &body)
    }

    pub(super) fn call_http_caller(
        &self,
        parts: &mut RequestParts,
        body: SyncRequestBody<'_>,
    ) -> ApiResult<SyncResponse> {
        let mut request = SyncRequest::from_parts_and_body(take(parts), body);
        debug!("{} {}", request.method(), request.url());
        let result = self.http_caller.call(&mut request);
        *parts = request.into_parts_and_body().0;
        let mut response = result.map_err(|err| {
            warn!("Failed to call {} {}: {}", parts.method(), parts.url(), err);
            ResponseError::from(err)
        })?;
        debug!("{} {} responded {}", parts.method(), parts.url(), response.status_code());
        if self.buffers(parts.url(), parts.method()) {
            response.body_mut().buffer()?;
        }
        Ok(response)
    }

    fn buffers(&self, uri: &Uri, method: &Method) -> bool {
        self.buffering.as_ref().map_or(false, |policy| policy(uri, method))
    }
}

impl Debug for RestClientInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClientInner")
            .field("http_caller", &self.http_caller)
            .field("base_url", &self.base_url)
            .field("appended_user_agent", &self.appended_user_agent)
            .field("default_headers", &self.default_headers)
            .field("default_cookies", &self.default_cookies)
            .field("default_requests", &self.default_requests.len())
            .field("initializers", &self.initializers.len())
            .field("interceptors", &self.interceptors.len())
            .field("buffering", &self.buffering.is_some())
            .field("status_handlers", &self.status_handlers)
            .field("codecs", &self.codecs)
            .finish()
    }
}

impl RestClient {
    /// 创建 REST 客户端构建器
    #[inline]
    pub fn builder(http_caller: impl HttpCaller + 'static) -> RestClientBuilder {
        RestClientBuilder::new(http_caller)
    }

    /// 使用指定的 HTTP 客户端创建 REST 客户端
    #[inline]
    pub fn new(http_caller: impl HttpCaller + 'static) -> Self {
        Self::builder(http_caller).build()
    }

    /// 创建基于 Ureq 的 REST 客户端构建器
    #[inline]
    #[cfg(feature = "ureq")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "ureq")))]
    pub fn build_ureq() -> RestClientBuilder {
        RestClientBuilder::new(resty_ureq::Client::default())
    }

    /// 创建基于 Isahc 的 REST 客户端构建器
    #[inline]
    #[cfg(feature = "isahc")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "isahc")))]
    pub fn build_isahc() -> Result<RestClientBuilder, resty_isahc::isahc::Error> {
        Ok(RestClientBuilder::new(resty_isahc::Client::default_client()?))
    }

    /// 创建基于 Reqwest 的 REST 客户端构建器
    #[inline]
    #[cfg(feature = "reqwest")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "reqwest")))]
    pub fn build_reqwest() -> RestClientBuilder {
        RestClientBuilder::new(resty_reqwest::Client::default())
    }

    /// 基于当前客户端的配置创建新的构建器
    ///
    /// 对新构建器的修改不会影响当前客户端
    #[inline]
    pub fn mutate(&self) -> RestClientBuilder {
        RestClientBuilder {
            inner: RestClientInner::clone(&self.inner),
        }
    }

    /// 创建 GET 请求
    #[inline]
    pub fn get(&self) -> RequestBuilder {
        self.method(Method::GET)
    }

    /// 创建 HEAD 请求
    #[inline]
    pub fn head(&self) -> RequestBuilder {
        self.method(Method::HEAD)
    }

    /// 创建 POST 请求
    #[inline]
    pub fn post(&self) -> RequestBuilder {
        self.method(Method::POST)
    }

    /// 创建 PUT 请求
    #[inline]
    pub fn put(&self) -> RequestBuilder {
        self.method(Method::PUT)
    }

    /// 创建 PATCH 请求
    #[inline]
    pub fn patch(&self) -> RequestBuilder {
        self.method(Method::PATCH)
    }

    /// 创建 DELETE 请求
    #[inline]
    pub fn delete(&self) -> RequestBuilder {
        self.method(Method::DELETE)
    }

    /// 创建 OPTIONS 请求
    #[inline]
    pub fn options(&self) -> RequestBuilder {
        self.method(Method::OPTIONS)
    }

    /// 创建指定方法的请求
    ///
    /// 客户端的默认请求设置将被首先应用
    pub fn method(&self, method: Method) -> RequestBuilder {
        let mut builder = RequestBuilder::new(Arc::clone(&self.inner), method);
        for default_request in self.inner.default_requests.iter() {
            default_request(&mut builder);
        }
        builder
    }
}

#[cfg(any(feature = "ureq", feature = "isahc", feature = "reqwest"))]
impl Default for RestClient {
    #[inline]
    fn default() -> Self {
        RestClientBuilder::default().build()
    }
}

/// REST 客户端构建器
#[derive(Debug, Clone)]
pub struct RestClientBuilder {
    inner: RestClientInner,
}

impl RestClientBuilder {
    /// 使用指定的 HTTP 客户端创建构建器
    #[inline]
    pub fn new(http_caller: impl HttpCaller + 'static) -> Self {
        Self {
            inner: RestClientInner::new(Arc::new(http_caller)),
        }
    }

    /// 设置 HTTP 客户端
    #[inline]
    pub fn http_caller(&mut self, http_caller: impl HttpCaller + 'static) -> &mut Self {
        self.inner.http_caller = Arc::new(http_caller);
        self
    }

    /// 设置基础 URL
    ///
    /// 相对 URI 将拼接在基础 URL 的路径之后
    #[inline]
    pub fn base_url(&mut self, base_url: Url) -> &mut Self {
        self.inner.base_url = Some(base_url);
        self
    }

    /// 设置追加的 UserAgent
    #[inline]
    pub fn appended_user_agent(&mut self, appended_user_agent: impl Into<String>) -> &mut Self {
        self.inner.appended_user_agent = appended_user_agent.into();
        self
    }

    /// 添加默认 HTTP 头
    ///
    /// 请求中设置了同名 HTTP 头时，默认值将被忽略
    #[inline]
    pub fn default_header(&mut self, header_name: impl IntoHeaderName, header_value: HeaderValue) -> &mut Self {
        self.inner.default_headers.append(header_name, header_value);
        self
    }

    /// 修改默认 HTTP 头
    #[inline]
    pub fn default_headers(&mut self, f: impl FnOnce(&mut HeaderMap)) -> &mut Self {
        f(&mut self.inner.default_headers);
        self
    }

    /// 添加默认 Cookie
    ///
    /// 请求中设置了同名 Cookie 时，该名称下的全部默认值将被忽略
    #[inline]
    pub fn default_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.inner.default_cookies.add(name, value);
        self
    }

    /// 修改默认 Cookie
    #[inline]
    pub fn default_cookies(&mut self, f: impl FnOnce(&mut Cookies)) -> &mut Self {
        f(&mut self.inner.default_cookies);
        self
    }

    /// 添加默认请求设置
    ///
    /// 在每个请求构建器创建后立即调用，之后对请求构建器的设置将覆盖这里的设置
    #[inline]
    pub fn default_request(&mut self, f: impl Fn(&mut RequestBuilder) + Send + Sync + 'static) -> &mut Self {
        self.inner.default_requests.push(Arc::new(f));
        self
    }

    /// 添加请求初始化函数
    #[inline]
    pub fn request_initializer(&mut self, initializer: impl Fn(&mut RequestParts) + Send + Sync + 'static) -> &mut Self {
        self.inner.initializers.push(Arc::new(initializer));
        self
    }

    /// 修改请求初始化函数列表
    #[inline]
    pub fn request_initializers(&mut self, f: impl FnOnce(&mut Vec<RequestInitializer>)) -> &mut Self {
        f(&mut self.inner.initializers);
        self
    }

    /// 添加拦截器
    #[inline]
    pub fn interceptor(&mut self, interceptor: impl Interceptor + 'static) -> &mut Self {
        self.inner.interceptors.push(Arc::new(interceptor));
        self
    }

    /// 修改拦截器列表
    #[inline]
    pub fn interceptors(&mut self, f: impl FnOnce(&mut Vec<Arc<dyn Interceptor>>)) -> &mut Self {
        f(&mut self.inner.interceptors);
        self
    }

    /// 设置响应体缓冲策略
    ///
    /// 默认不缓冲任何响应体
    #[inline]
    pub fn buffer_content(&mut self, policy: impl Fn(&Uri, &Method) -> bool + Send + Sync + 'static) -> &mut Self {
        self.inner.buffering = Some(Arc::new(policy));
        self
    }

    /// 添加默认状态码处理函数
    ///
    /// 在请求自身的状态码处理函数之后被尝试
    #[inline]
    pub fn default_status_handler(
        &mut self,
        predicate: impl Fn(&StatusCode) -> bool + Send + Sync + 'static,
        action: impl Fn(&RequestParts, &mut ClientResponse) -> AnyResult<()> + Send + Sync + 'static,
    ) -> &mut Self {
        self.inner.status_handlers.push(StatusHandler::new(predicate, action));
        self
    }

    /// 修改编解码器列表
    ///
    /// 编解码器按照列表顺序被尝试
    #[inline]
    pub fn codecs(&mut self, f: impl FnOnce(&mut Vec<Arc<dyn BodyCodec>>)) -> &mut Self {
        let mut codecs = self.inner.codecs.to_vec();
        f(&mut codecs);
        self.inner.codecs = codecs.into();
        self
    }

    /// 构建 REST 客户端
    ///
    /// 构建器可以继续使用，后续修改不会影响已经构建的客户端
    #[inline]
    pub fn build(&self) -> RestClient {
        RestClient {
            inner: Arc::new(self.inner.to_owned()),
        }
    }
}

cfg_if! {
    if #[cfg(feature = "ureq")] {
        impl Default for RestClientBuilder {
            #[inline]
            fn default() -> Self {
                RestClient::build_ureq()
            }
        }
    } else if #[cfg(feature = "isahc")] {
        impl Default for RestClientBuilder {
            #[inline]
            fn default() -> Self {
                RestClient::build_isahc().unwrap_or_else(|err| panic!("Failed to create Isahc client: {err}"))
            }
        }
    } else if #[cfg(feature = "reqwest")] {
        impl Default for RestClientBuilder {
            #[inline]
            fn default() -> Self {
                RestClient::build_reqwest()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        super::{super::test_utils::RecordingHttpCaller, ResponseErrorKind},
        *,
    };
    use resty_http::header::{HeaderName, COOKIE};

    #[test]
    fn test_interceptors_order_and_initializers() -> anyhow::Result<()> {
        env_logger::builder().is_test(true).try_init().ok();
        let caller = RecordingHttpCaller::new(StatusCode::OK, "Hello World");
        let client = RestClient::builder(caller.to_owned())
            .base_url("http://localhost:8080/api".parse()?)
            .request_initializer(|parts| {
                parts
                    .headers_mut()
                    .append("x-trace", HeaderValue::from_static("initializer"));
            })
            .interceptor(|parts: &mut RequestParts, body: &[u8], next: Next| -> ApiResult<SyncResponse> {
                assert_eq!(body, b"payload");
                parts
                    .headers_mut()
                    .append("x-trace", HeaderValue::from_static("first"));
                next.execute(parts, body)
            })
            .interceptor(|parts: &mut RequestParts, body: &[u8], next: Next| -> ApiResult<SyncResponse> {
                parts
                    .headers_mut()
                    .append("x-trace", HeaderValue::from_static("second"));
                next.execute(parts, body)
            })
            .build();
        let text = client.post().uri("/greeting").body_text("payload").retrieve().body_text()?;
        assert_eq!(text, "Hello World");

        let recorded = caller.last_request().expect("request should be recorded");
        assert_eq!(recorded.url, "http://localhost:8080/api/greeting");
        assert_eq!(recorded.body, b"payload");
        let traces = recorded
            .headers
            .get_all(HeaderName::from_static("x-trace"))
            .iter()
            .map(|value| value.to_str().unwrap().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(traces, ["initializer", "first", "second"]);
        Ok(())
    }

    #[test]
    fn test_interceptors_inbound_order() -> anyhow::Result<()> {
        env_logger::builder().is_test(true).try_init().ok();
        let caller = RecordingHttpCaller::new(StatusCode::OK, "Hello World");
        let client = RestClient::builder(caller)
            .interceptor(|parts: &mut RequestParts, body: &[u8], next: Next| -> ApiResult<SyncResponse> {
                let mut response = next.execute(parts, body)?;
                response
                    .headers_mut()
                    .append("x-trace", HeaderValue::from_static("A"));
                Ok(response)
            })
            .interceptor(|parts: &mut RequestParts, body: &[u8], next: Next| -> ApiResult<SyncResponse> {
                let mut response = next.execute(parts, body)?;
                response
                    .headers_mut()
                    .append("x-trace", HeaderValue::from_static("B"));
                Ok(response)
            })
            .build();
        let entity = client.get().uri("http://localhost/").retrieve().to_bodiless_entity()?;
        let traces = entity
            .headers()
            .get_all("x-trace")
            .iter()
            .map(|value| value.to_str().unwrap().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(traces, ["B", "A"]);
        Ok(())
    }

    #[test]
    fn test_interceptor_with_oversized_body_size() -> anyhow::Result<()> {
        env_logger::builder().is_test(true).try_init().ok();
        let caller = RecordingHttpCaller::new(StatusCode::OK, "Hello World");
        let client = RestClient::builder(caller.to_owned())
            .interceptor(|parts: &mut RequestParts, body: &[u8], next: Next| -> ApiResult<SyncResponse> {
                next.execute(parts, body)
            })
            .build();
        let text = client
            .post()
            .uri("http://localhost/upload")
            .body_reader(std::io::Cursor::new(b"tiny".to_vec()), Some(u64::MAX))
            .retrieve()
            .body_text()?;
        assert_eq!(text, "Hello World");
        assert_eq!(caller.last_request().unwrap().body, b"tiny");
        Ok(())
    }

    #[test]
    fn test_interceptor_short_circuit() -> anyhow::Result<()> {
        env_logger::builder().is_test(true).try_init().ok();
        let caller = RecordingHttpCaller::new(StatusCode::OK, "unreachable");
        let client = RestClient::builder(caller.to_owned())
            .interceptor(|_: &mut RequestParts, _: &[u8], _: Next| -> ApiResult<SyncResponse> {
                let mut builder = SyncResponse::builder();
                builder.status_code(StatusCode::ACCEPTED).bytes_as_body(b"cached".to_vec());
                Ok(builder.build())
            })
            .build();
        let entity = client
            .get()
            .uri("http://localhost/cached")
            .retrieve()
            .to_entity::<String>()?;
        assert_eq!(entity.status_code(), StatusCode::ACCEPTED);
        assert_eq!(entity.body().as_deref(), Some("cached"));
        assert_eq!(caller.request_count(), 0);

        let client = client
            .mutate()
            .interceptors(|interceptors| interceptors.clear())
            .interceptor(|_: &mut RequestParts, _: &[u8], _: Next| -> ApiResult<SyncResponse> {
                Err(ResponseError::new_with_msg(ResponseErrorKind::Interceptor, "Rejected"))
            })
            .build();
        let err = client.get().uri("http://localhost/").retrieve().body_text().unwrap_err();
        assert_eq!(err.kind(), ResponseErrorKind::Interceptor);
        assert_eq!(caller.request_count(), 0);
        Ok(())
    }

    #[test]
    fn test_default_headers_and_cookies() -> anyhow::Result<()> {
        env_logger::builder().is_test(true).try_init().ok();
        let caller = RecordingHttpCaller::new(StatusCode::OK, "");
        let client = RestClient::builder(caller.to_owned())
            .default_header("foo", HeaderValue::from_static("bar"))
            .default_header("baz", HeaderValue::from_static("qux"))
            .default_cookie("session", "first")
            .default_cookie("session", "second")
            .default_cookie("theme", "dark")
            .build();

        client
            .get()
            .uri("http://localhost/")
            .header("baz", HeaderValue::from_static("override"))
            .cookie("session", "third")
            .retrieve()
            .to_bodiless_entity()?;
        let recorded = caller.last_request().expect("request should be recorded");
        assert_eq!(recorded.headers.get("foo").unwrap(), "bar");
        assert_eq!(
            recorded.headers.get_all("baz").iter().collect::<Vec<_>>(),
            [&HeaderValue::from_static("override")]
        );
        assert_eq!(recorded.headers.get(COOKIE).unwrap(), "session=third; theme=dark");
        Ok(())
    }

    #[test]
    fn test_mutate_keeps_original_client() -> anyhow::Result<()> {
        env_logger::builder().is_test(true).try_init().ok();
        let caller = RecordingHttpCaller::new(StatusCode::OK, "");
        let client = RestClient::builder(caller.to_owned()).build();
        let mutated = client
            .mutate()
            .default_request(|request| {
                request.header("foo", HeaderValue::from_static("bar"));
            })
            .build();

        mutated.get().uri("http://localhost/").retrieve().to_bodiless_entity()?;
        assert_eq!(caller.last_request().unwrap().headers.get("foo").unwrap(), "bar");

        client.get().uri("http://localhost/").retrieve().to_bodiless_entity()?;
        assert!(caller.last_request().unwrap().headers.get("foo").is_none());
        Ok(())
    }

    #[test]
    fn test_buffered_response_in_interceptor() -> anyhow::Result<()> {
        env_logger::builder().is_test(true).try_init().ok();
        let caller = RecordingHttpCaller::new(StatusCode::OK, "Hello World");
        let client = RestClient::builder(caller)
            .buffer_content(|_, _| true)
            .interceptor(|parts: &mut RequestParts, body: &[u8], next: Next| -> ApiResult<SyncResponse> {
                let mut response = next.execute(parts, body)?;
                let mut peeked = String::new();
                std::io::Read::read_to_string(response.body_mut(), &mut peeked)?;
                assert_eq!(peeked, "Hello World");
                Ok(response)
            })
            .build();
        let text = client.get().uri("http://localhost/").retrieve().body_text()?;
        assert_eq!(text, "Hello World");
        Ok(())
    }

    #[test]
    fn test_buffered_response_read_in_chunks_by_exchange() -> anyhow::Result<()> {
        env_logger::builder().is_test(true).try_init().ok();
        let caller = RecordingHttpCaller::new(StatusCode::OK, "abcdef");
        let client = RestClient::builder(caller).buffer_content(|_, _| true).build();
        let collected = client.get().uri("http://localhost/").exchange(|_, response| {
            let mut collected = Vec::new();
            let mut chunk = [0u8; 4];
            for _ in 0..8 {
                let n = std::io::Read::read(response.body_mut(), &mut chunk)?;
                if n == 0 {
                    break;
                }
                collected.extend_from_slice(&chunk[..n]);
            }
            Ok(collected)
        })?;
        assert_eq!(collected, b"abcdef");
        Ok(())
    }
}
