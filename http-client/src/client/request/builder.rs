use super::{
    super::{
        codec::write_body,
        rest_client::RestClientInner,
        status_handler::into_response_error,
        uri::{expand_uri_template, resolve_uri},
        ApiResult, ClientResponse, Cookies, Hints, ResponseError, ResponseErrorKind, ResponseSpec, UriVariables,
    },
    Multipart,
};
use anyhow::Result as AnyResult;
use chrono::{DateTime, Utc};
use log::debug;
use mime::{Mime, APPLICATION_OCTET_STREAM};
use resty_http::{
    header::{
        InvalidHeaderValue, IntoHeaderName, ACCEPT, ACCEPT_CHARSET, CONTENT_TYPE, COOKIE, IF_MODIFIED_SINCE,
        IF_NONE_MATCH,
    },
    Extensions, HeaderMap, HeaderName, HeaderValue, Method, RequestParts, ResponseError as HttpResponseError,
    ResponseErrorKind as HttpResponseErrorKind, SyncRequestBody, Version,
};
use serde::Serialize;
use serde_json::{Error as JsonError, Value};
use std::{io::Read, mem::take, sync::Arc, time::SystemTime};
use url::Url;

/// REST 请求构建器
///
/// 由 [`super::super::RestClient`] 创建，只有在调用 [`RequestBuilder::retrieve`] 或 [`RequestBuilder::exchange`] 时才会构建请求。
/// 请求构建后，构建器中的 URI，HTTP 头，Cookie 和请求体都将被清空。
#[derive(Debug)]
pub struct RequestBuilder {
    client: Arc<RestClientInner>,
    method: Method,
    uri: RequestUri,
    version: Version,
    headers: HeaderMap,
    cookies: Cookies,
    extensions: Extensions,
    hints: Hints,
    body: RequestBody,
    appended_user_agent: String,
    invalid_header: Option<InvalidHeaderValue>,
}

#[derive(Debug, Default)]
enum RequestUri {
    #[default]
    Unset,
    Template {
        template: String,
        variables: UriVariables,
    },
    Url(Url),
}

#[derive(Debug, Default)]
enum RequestBody {
    #[default]
    Empty,
    Value(Result<Value, JsonError>),
    Bytes(Vec<u8>),
    Stream(SyncRequestBody<'static>),
    Multipart(Multipart),
}

impl RequestBuilder {
    pub(in super::super) fn new(client: Arc<RestClientInner>, method: Method) -> Self {
        let appended_user_agent = client.appended_user_agent.to_owned();
        Self {
            client,
            method,
            appended_user_agent,
            uri: Default::default(),
            version: Default::default(),
            headers: Default::default(),
            cookies: Default::default(),
            extensions: Default::default(),
            hints: Default::default(),
            body: Default::default(),
            invalid_header: None,
        }
    }

    /// 设置 URI 模版
    ///
    /// 模版中的变量必须通过 [`RequestBuilder::uri_with_vars`] 或 [`RequestBuilder::uri_with_args`] 提供，否则构建请求时将返回错误
    #[inline]
    pub fn uri(&mut self, template: impl Into<String>) -> &mut Self {
        self.uri_with_variables(template, UriVariables::None)
    }

    /// 设置 URI 模版和命名变量
    #[inline]
    pub fn uri_with_vars<K: Into<String>, V: ToString>(
        &mut self,
        template: impl Into<String>,
        variables: impl IntoIterator<Item = (K, V)>,
    ) -> &mut Self {
        self.uri_with_variables(template, UriVariables::named(variables))
    }

    /// 设置 URI 模版和按顺序使用的变量
    #[inline]
    pub fn uri_with_args(
        &mut self,
        template: impl Into<String>,
        args: impl IntoIterator<Item = impl ToString>,
    ) -> &mut Self {
        self.uri_with_variables(template, UriVariables::positional(args))
    }

    /// 设置 URI 模版和模版变量
    #[inline]
    pub fn uri_with_variables(&mut self, template: impl Into<String>, variables: UriVariables) -> &mut Self {
        self.uri = RequestUri::Template {
            template: template.into(),
            variables,
        };
        self
    }

    /// 设置 URL
    ///
    /// URL 将原样使用，不会被展开或拼接基础 URL
    #[inline]
    pub fn url(&mut self, url: Url) -> &mut Self {
        self.uri = RequestUri::Url(url);
        self
    }

    /// 设置 HTTP 协议版本
    #[inline]
    pub fn version(&mut self, version: Version) -> &mut Self {
        self.version = version;
        self
    }

    /// 追加 HTTP 头
    ///
    /// 请求中的 HTTP 头将覆盖客户端同名的默认 HTTP 头
    #[inline]
    pub fn header(&mut self, header_name: impl IntoHeaderName, header_value: impl Into<HeaderValue>) -> &mut Self {
        self.headers.append(header_name, header_value.into());
        self
    }

    /// 修改 HTTP 头
    #[inline]
    pub fn headers(&mut self, f: impl FnOnce(&mut HeaderMap)) -> &mut Self {
        f(&mut self.headers);
        self
    }

    /// 设置可接受的响应体 MIME 类型
    pub fn accept(&mut self, mimes: &[Mime]) -> &mut Self {
        let value = mimes.iter().map(|mime| mime.as_ref()).collect::<Vec<_>>().join(", ");
        self.set_header(ACCEPT, &value)
    }

    /// 设置可接受的字符集
    pub fn accept_charset(&mut self, charsets: &[&str]) -> &mut Self {
        self.set_header(ACCEPT_CHARSET, &charsets.join(", "))
    }

    /// 设置请求体的 MIME 类型
    ///
    /// 结构化请求体将使用支持该类型的编解码器编码
    #[inline]
    pub fn content_type(&mut self, content_type: Mime) -> &mut Self {
        self.set_header(CONTENT_TYPE, content_type.as_ref())
    }

    /// 设置 `If-None-Match`
    pub fn if_none_match(&mut self, etags: impl IntoIterator<Item = impl AsRef<str>>) -> &mut Self {
        let value = etags
            .into_iter()
            .map(|etag| etag.as_ref().to_owned())
            .collect::<Vec<_>>()
            .join(", ");
        self.set_header(IF_NONE_MATCH, &value)
    }

    /// 设置 `If-Modified-Since`
    #[inline]
    pub fn if_modified_since(&mut self, time: SystemTime) -> &mut Self {
        self.set_header(IF_MODIFIED_SINCE, &format_http_date(time))
    }

    fn set_header(&mut self, header_name: HeaderName, header_value: &str) -> &mut Self {
        match HeaderValue::from_str(header_value) {
            Ok(header_value) => {
                self.headers.insert(header_name, header_value);
            }
            Err(err) => {
                self.invalid_header.get_or_insert(err);
            }
        }
        self
    }

    /// 追加 Cookie
    ///
    /// 同名 Cookie 的多个值将按照添加顺序全部发送
    #[inline]
    pub fn cookie(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.cookies.add(name, value);
        self
    }

    /// 修改 Cookie
    #[inline]
    pub fn cookies(&mut self, f: impl FnOnce(&mut Cookies)) -> &mut Self {
        f(&mut self.cookies);
        self
    }

    /// 添加编解码器提示
    #[inline]
    pub fn hint<T: Send + Sync + 'static>(&mut self, hint: T) -> &mut Self {
        self.hints.insert(hint);
        self
    }

    /// 添加扩展信息
    #[inline]
    pub fn add_extension<T: Send + Sync + 'static>(&mut self, val: T) -> &mut Self {
        self.extensions.insert(val);
        self
    }

    /// 设置追加的 UserAgent
    #[inline]
    pub fn appended_user_agent(&mut self, user_agent: impl Into<String>) -> &mut Self {
        self.appended_user_agent = user_agent.into();
        self
    }

    /// 设置结构化请求体
    ///
    /// 将按照请求体的 MIME 类型选择编解码器，没有设置 MIME 类型时，字符串编码为 `text/plain`，其他数据编码为 JSON
    #[inline]
    pub fn body(&mut self, body: impl Serialize) -> &mut Self {
        self.body = RequestBody::Value(serde_json::to_value(body));
        self
    }

    /// 设置文本请求体
    #[inline]
    pub fn body_text(&mut self, body: impl Into<String>) -> &mut Self {
        self.body = RequestBody::Value(Ok(Value::String(body.into())));
        self
    }

    /// 设置二进制请求体
    ///
    /// 没有设置 MIME 类型时使用 `application/octet-stream`
    #[inline]
    pub fn body_bytes(&mut self, body: impl Into<Vec<u8>>) -> &mut Self {
        self.body = RequestBody::Bytes(body.into());
        self
    }

    /// 设置流式请求体
    ///
    /// 没有注册拦截器时，数据流将直接交给 HTTP 客户端读取
    #[inline]
    pub fn body_reader(&mut self, reader: impl Read + Send + Sync + 'static, size: Option<u64>) -> &mut Self {
        self.body = RequestBody::Stream(SyncRequestBody::from_reader(reader, size));
        self
    }

    /// 设置 Multipart 表单请求体
    #[inline]
    pub fn multipart(&mut self, multipart: Multipart) -> &mut Self {
        self.body = RequestBody::Multipart(multipart);
        self
    }

    /// 构建请求并获取响应规格
    ///
    /// 构建请求的错误将在获取响应时返回
    #[inline]
    pub fn retrieve(&mut self) -> ResponseSpec {
        let request = self.build();
        ResponseSpec::new(Arc::clone(&self.client), request)
    }

    /// 发送请求并用处理函数直接处理响应
    ///
    /// 不会调用任何状态码处理函数，非 2xx 响应同样交给处理函数
    pub fn exchange<T>(
        &mut self,
        handler: impl FnOnce(&RequestParts, &mut ClientResponse) -> AnyResult<T>,
    ) -> ApiResult<T> {
        let (mut parts, body) = self.build()?;
        let response = self.client.execute(&mut parts, body)?;
        let mut response = ClientResponse::new(response, Arc::clone(&self.client.codecs));
        response.rewind();
        handler(&parts, &mut response).map_err(|err| into_response_error(err, ResponseErrorKind::Exchange))
    }

    /// 发送请求并用处理函数直接处理响应，处理函数必须返回值
    pub fn exchange_for_required_value<T>(
        &mut self,
        handler: impl FnOnce(&RequestParts, &mut ClientResponse) -> AnyResult<Option<T>>,
    ) -> ApiResult<T> {
        self.exchange(handler)?.ok_or_else(|| {
            ResponseError::new_with_msg(ResponseErrorKind::MissingValue, "Exchange handler returned no value")
        })
    }

    fn build(&mut self) -> ApiResult<(RequestParts, SyncRequestBody<'static>)> {
        if let Some(err) = self.invalid_header.take() {
            return Err(invalid_header_error(err));
        }
        let expanded = match take(&mut self.uri) {
            RequestUri::Unset => String::new(),
            RequestUri::Template { template, variables } => expand_uri_template(&template, &variables)?,
            RequestUri::Url(url) => url.into(),
        };
        let url = resolve_uri(self.client.base_url.as_ref(), &expanded)?;

        let mut headers = self.client.default_headers.to_owned();
        override_headers(&mut headers, take(&mut self.headers));
        let cookies = self.client.default_cookies.merged_with(&take(&mut self.cookies));
        if let Some(cookie) = cookies.to_header_value() {
            headers.insert(COOKIE, HeaderValue::from_str(&cookie).map_err(invalid_header_error)?);
        }
        let body = self.build_body(&mut headers)?;
        debug!("Built request {} {}", self.method, url);

        let parts = RequestParts::builder()
            .url(url)
            .method(self.method.to_owned())
            .version(self.version)
            .headers(headers)
            .extensions(take(&mut self.extensions))
            .appended_user_agent(&self.appended_user_agent)
            .build();
        Ok((parts, body))
    }

    fn build_body(&mut self, headers: &mut HeaderMap) -> ApiResult<SyncRequestBody<'static>> {
        let body = match take(&mut self.body) {
            RequestBody::Empty => Default::default(),
            RequestBody::Value(value) => {
                let value = value?;
                let declared = headers
                    .get(CONTENT_TYPE)
                    .and_then(|content_type| content_type.to_str().ok())
                    .and_then(|content_type| content_type.parse::<Mime>().ok());
                let (body, content_type) = write_body(&self.client.codecs, &value, declared.as_ref(), &self.hints)?
                    .into_body_and_content_type();
                set_content_type(headers, &content_type)?;
                SyncRequestBody::from_bytes(body)
            }
            RequestBody::Bytes(bytes) => {
                set_default_content_type(headers)?;
                SyncRequestBody::from_bytes(bytes)
            }
            RequestBody::Stream(body) => {
                set_default_content_type(headers)?;
                body
            }
            RequestBody::Multipart(multipart) => {
                set_content_type(headers, &multipart.content_type())?;
                multipart.into_request_body()
            }
        };
        Ok(body)
    }
}

/// 请求中出现的 HTTP 头将替换同名的默认 HTTP 头的全部值
fn override_headers(headers: &mut HeaderMap, overrides: HeaderMap) {
    let mut last_name: Option<HeaderName> = None;
    for (header_name, header_value) in overrides {
        if let Some(header_name) = header_name {
            headers.remove(&header_name);
            last_name = Some(header_name);
        }
        if let Some(header_name) = &last_name {
            headers.append(header_name.to_owned(), header_value);
        }
    }
}

fn set_content_type(headers: &mut HeaderMap, content_type: &Mime) -> ApiResult<()> {
    let content_type = HeaderValue::from_str(content_type.as_ref()).map_err(invalid_header_error)?;
    headers.insert(CONTENT_TYPE, content_type);
    Ok(())
}

fn set_default_content_type(headers: &mut HeaderMap) -> ApiResult<()> {
    if !headers.contains_key(CONTENT_TYPE) {
        set_content_type(headers, &APPLICATION_OCTET_STREAM)?;
    }
    Ok(())
}

fn invalid_header_error(err: InvalidHeaderValue) -> ResponseError {
    HttpResponseError::builder(HttpResponseErrorKind::InvalidHeader, err)
        .build()
        .into()
}

fn format_http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}
