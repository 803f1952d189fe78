use super::builder::ClientBuilder;
use isahc::{
    config::Configurable,
    error::{Error as IsahcError, ErrorKind as IsahcErrorKind},
    http::{header::USER_AGENT, request::Builder as IsahcRequestBuilder},
    Body as IsahcBody, HttpClient as IsahcHttpClient,
};
use resty_http::{
    HeaderValue, HttpCaller, RequestParts, ResponseError, ResponseErrorKind, SyncRequest, SyncResponse,
    SyncResponseBody, SyncResponseResult, TimeoutExtension,
};
use std::mem::take;

type IsahcSyncRequest = isahc::Request<IsahcBody>;
type IsahcSyncResponse = isahc::Response<IsahcBody>;

/// Isahc 客户端
///
/// Isahc 内部维护 libcurl 连接缓存，克隆后的客户端共享同一个连接池
#[derive(Debug, Clone)]
pub struct Client {
    isahc_client: IsahcHttpClient,
}

impl Client {
    /// 创建 Isahc 客户端
    #[inline]
    pub fn new(isahc_client: IsahcHttpClient) -> Self {
        Client { isahc_client }
    }

    /// 创建 Isahc 客户端构建器
    #[inline]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// 创建默认的 Isahc 客户端
    #[inline]
    pub fn default_client() -> Result<Self, IsahcError> {
        Ok(Self::new(IsahcHttpClient::new()?))
    }
}

impl From<IsahcHttpClient> for Client {
    #[inline]
    fn from(isahc_client: IsahcHttpClient) -> Self {
        Self::new(isahc_client)
    }
}

impl HttpCaller for Client {
    fn call(&self, request: &mut SyncRequest<'_>) -> SyncResponseResult {
        let isahc_request = make_sync_isahc_request(request)?;
        match self.isahc_client.send(isahc_request) {
            Ok(isahc_response) => make_sync_response(isahc_response, request),
            Err(err) => Err(from_isahc_error(err, request)),
        }
    }
}

fn make_user_agent(request: &RequestParts) -> Result<HeaderValue, ResponseError> {
    HeaderValue::from_str(&format!("{}/resty-isahc", request.user_agent())).map_err(|err| {
        ResponseError::builder(ResponseErrorKind::InvalidHeader, err)
            .uri(request.url())
            .build()
    })
}

fn make_sync_response(mut response: IsahcSyncResponse, request: &mut SyncRequest) -> SyncResponseResult {
    let mut sync_response = SyncResponse::builder()
        .status_code(response.status())
        .version(response.version())
        .headers(take(response.headers_mut()))
        .build();
    *sync_response.extensions_mut() = take(request.extensions_mut());
    *sync_response.body_mut() = SyncResponseBody::from_reader(response.into_body());
    Ok(sync_response)
}

fn make_sync_isahc_request(request: &mut SyncRequest) -> Result<IsahcSyncRequest, ResponseError> {
    let mut isahc_request_builder = isahc::Request::builder().uri(request.url()).method(request.method());
    for (header_name, header_value) in request.headers() {
        isahc_request_builder = isahc_request_builder.header(header_name, header_value);
    }
    isahc_request_builder = add_extensions_to_isahc_request_builder(request, isahc_request_builder);
    if !request.headers().contains_key(USER_AGENT) {
        isahc_request_builder = isahc_request_builder.header(USER_AGENT, make_user_agent(request)?);
    }

    let body = take(request.body_mut()).into_owned();
    let isahc_body = match body.size() {
        Some(size) => IsahcBody::from_reader_sized(body, size),
        None => IsahcBody::from_reader(body),
    };
    isahc_request_builder.body(isahc_body).map_err(|err| {
        ResponseError::builder(ResponseErrorKind::InvalidRequestResponse, err)
            .uri(request.url())
            .build()
    })
}

fn add_extensions_to_isahc_request_builder(
    request: &RequestParts,
    mut isahc_request_builder: IsahcRequestBuilder,
) -> IsahcRequestBuilder {
    use super::extensions::*;

    if let Some(extension) = request.extensions().get::<TimeoutExtension>() {
        isahc_request_builder = isahc_request_builder.timeout(extension.get());
    }

    if let Some(extension) = request.extensions().get::<ConnectTimeoutRequestExtension>() {
        isahc_request_builder = isahc_request_builder.connect_timeout(extension.get().to_owned());
    }

    if let Some(extension) = request.extensions().get::<LowSpeedTimeoutRequestExtension>() {
        isahc_request_builder =
            isahc_request_builder.low_speed_timeout(extension.get().0.to_owned(), extension.get().1.to_owned());
    }

    if let Some(extension) = request.extensions().get::<RedirectPolicyRequestExtension>() {
        isahc_request_builder = isahc_request_builder.redirect_policy(extension.get().to_owned());
    }

    if let Some(extension) = request.extensions().get::<AutomaticDecompressionRequestExtension>() {
        isahc_request_builder = isahc_request_builder.automatic_decompression(extension.get().to_owned());
    }

    if request.extensions().get::<TcpNodelayRequestExtension>().is_some() {
        isahc_request_builder = isahc_request_builder.tcp_nodelay();
    }

    if let Some(extension) = request.extensions().get::<ProxyRequestExtension>() {
        isahc_request_builder = isahc_request_builder.proxy(extension.get().to_owned());
    }

    if let Some(extension) = request.extensions().get::<TitleCaseHeadersRequestExtension>() {
        isahc_request_builder = isahc_request_builder.title_case_headers(extension.get().to_owned());
    }

    isahc_request_builder
}

fn from_isahc_error(err: IsahcError, request: &RequestParts) -> ResponseError {
    let error_builder = match err.kind() {
        IsahcErrorKind::BadClientCertificate => ResponseError::builder(ResponseErrorKind::SslError, err),
        IsahcErrorKind::BadServerCertificate => ResponseError::builder(ResponseErrorKind::SslError, err),
        IsahcErrorKind::ClientInitialization => ResponseError::builder(ResponseErrorKind::LocalIoError, err),
        IsahcErrorKind::ConnectionFailed => ResponseError::builder(ResponseErrorKind::ConnectError, err),
        IsahcErrorKind::InvalidContentEncoding => ResponseError::builder(ResponseErrorKind::InvalidHeader, err),
        IsahcErrorKind::InvalidCredentials => ResponseError::builder(ResponseErrorKind::InvalidHeader, err),
        IsahcErrorKind::InvalidRequest => ResponseError::builder(ResponseErrorKind::InvalidRequestResponse, err),
        IsahcErrorKind::Io => ResponseError::builder(ResponseErrorKind::SendError, err),
        IsahcErrorKind::NameResolution => ResponseError::builder(ResponseErrorKind::UnknownHostError, err),
        IsahcErrorKind::ProtocolViolation => ResponseError::builder(ResponseErrorKind::InvalidRequestResponse, err),
        IsahcErrorKind::Timeout => ResponseError::builder(ResponseErrorKind::TimeoutError, err),
        IsahcErrorKind::TlsEngine => ResponseError::builder(ResponseErrorKind::SslError, err),
        IsahcErrorKind::TooManyRedirects => ResponseError::builder(ResponseErrorKind::TooManyRedirect, err),
        _ => ResponseError::builder(ResponseErrorKind::UnknownError, err),
    };
    error_builder.uri(request.url()).build()
}
