use anyhow::Error as AnyError;
use resty_http::{
    header::{CONTENT_LENGTH, USER_AGENT},
    HeaderName, HeaderValue, HttpCaller, RequestParts, ResponseError, ResponseErrorKind, StatusCode, SyncRequest,
    SyncResponse, SyncResponseBody, SyncResponseResult, TimeoutExtension, Version,
};
use std::{error::Error as StdError, fmt::Display, io::ErrorKind as IoErrorKind, mem::take};
use ureq::{Agent, Error as UreqError, ErrorKind as UreqErrorKind, Request as UreqRequest, Response as UreqResponse};

/// Ureq 客户端
#[derive(Debug, Clone)]
pub struct Client {
    client: Agent,
}

impl Client {
    /// 创建 Ureq 客户端
    #[inline]
    pub fn new(client: Agent) -> Self {
        Self { client }
    }
}

impl From<Agent> for Client {
    #[inline]
    fn from(agent: Agent) -> Self {
        Self::new(agent)
    }
}

impl Default for Client {
    #[inline]
    fn default() -> Self {
        Self { client: ureq::agent() }
    }
}

impl HttpCaller for Client {
    fn call(&self, request: &mut SyncRequest<'_>) -> SyncResponseResult {
        let ureq_request = make_ureq_request(&self.client, request)?;
        match ureq_request.send(request.body_mut()) {
            Ok(response) => make_ureq_sync_response(response, request),
            Err(UreqError::Status(_, response)) => make_ureq_sync_response(response, request),
            Err(UreqError::Transport(transport)) => Err(from_ureq_error(transport, request)),
        }
    }
}

fn make_user_agent(request: &RequestParts) -> Result<HeaderValue, ResponseError> {
    let user_agent = format!("{}/resty-ureq", request.user_agent());
    HeaderValue::from_str(&user_agent).map_err(|err| build_header_value_error(request, &user_agent, &err))
}

fn make_ureq_request(agent: &Agent, request: &SyncRequest) -> Result<UreqRequest, ResponseError> {
    let mut request_builder = agent.request(request.method().as_str(), &request.url().to_string());
    for (header_name, header_value) in request.headers() {
        request_builder = set_header_for_request_builder(request_builder, request, header_name, header_value)?;
    }
    if !request.headers().contains_key(USER_AGENT) {
        request_builder =
            set_header_for_request_builder(request_builder, request, &USER_AGENT, &make_user_agent(request)?)?;
    }
    if !request.headers().contains_key(CONTENT_LENGTH) {
        if let Some(size) = request.body().size() {
            request_builder = request_builder.set(CONTENT_LENGTH.as_str(), &size.to_string());
        }
    }
    if let Some(extension) = request.extensions().get::<TimeoutExtension>() {
        request_builder = request_builder.timeout(extension.get());
    }
    Ok(request_builder)
}

fn make_ureq_sync_response(response: UreqResponse, request: &mut SyncRequest) -> SyncResponseResult {
    let mut sync_response = SyncResponse::builder()
        .status_code(status_code_of_response(&response, request)?)
        .version(parse_http_version(response.http_version(), request)?)
        .build();
    for header_name_str in response.headers_names() {
        let header_name = HeaderName::from_bytes(header_name_str.as_bytes())
            .map_err(|err| build_header_name_error(request, &header_name_str, &err))?;
        for header_value_str in response.all(&header_name_str) {
            let header_value = HeaderValue::from_bytes(header_value_str.as_bytes())
                .map_err(|err| build_header_value_error(request, header_value_str, &err))?;
            sync_response.headers_mut().append(header_name.to_owned(), header_value);
        }
    }
    *sync_response.extensions_mut() = take(request.extensions_mut());
    *sync_response.body_mut() = SyncResponseBody::from_reader(response.into_reader());
    Ok(sync_response)
}

fn build_status_code_error(request: &RequestParts, code: u16, err: &dyn Display) -> ResponseError {
    ResponseError::builder_with_msg(
        ResponseErrorKind::InvalidRequestResponse,
        format!("invalid status code({code}): {err}"),
    )
    .uri(request.url())
    .build()
}

fn build_header_name_error(request: &RequestParts, header_name: &str, err: &dyn Display) -> ResponseError {
    ResponseError::builder_with_msg(
        ResponseErrorKind::InvalidHeader,
        format!("invalid header name({header_name}): {err}"),
    )
    .uri(request.url())
    .build()
}

fn build_header_value_error(request: &RequestParts, header_value: &str, err: &dyn Display) -> ResponseError {
    ResponseError::builder_with_msg(
        ResponseErrorKind::InvalidHeader,
        format!("invalid header value({header_value}): {err}"),
    )
    .uri(request.url())
    .build()
}

fn convert_header_value_error(request: &RequestParts, header_value: &HeaderValue, err: &dyn Display) -> ResponseError {
    ResponseError::builder_with_msg(
        ResponseErrorKind::InvalidHeader,
        format!("invalid header value({header_value:?}): {err}"),
    )
    .uri(request.url())
    .build()
}

fn set_header_for_request_builder(
    request_builder: UreqRequest,
    request: &RequestParts,
    header_name: &HeaderName,
    header_value: &HeaderValue,
) -> Result<UreqRequest, ResponseError> {
    Ok(request_builder.set(
        header_name.as_str(),
        header_value
            .to_str()
            .map_err(|err| convert_header_value_error(request, header_value, &err))?,
    ))
}

fn status_code_of_response(response: &UreqResponse, request: &RequestParts) -> Result<StatusCode, ResponseError> {
    StatusCode::from_u16(response.status()).map_err(|err| build_status_code_error(request, response.status(), &err))
}

fn parse_http_version(version: &str, request: &RequestParts) -> Result<Version, ResponseError> {
    match version {
        "HTTP/0.9" => Ok(Version::HTTP_09),
        "HTTP/1.0" => Ok(Version::HTTP_10),
        "HTTP/1.1" => Ok(Version::HTTP_11),
        "HTTP/2.0" => Ok(Version::HTTP_2),
        "HTTP/3.0" => Ok(Version::HTTP_3),
        _ => Err(ResponseError::builder_with_msg(
            ResponseErrorKind::InvalidRequestResponse,
            format!("invalid http version: {version}"),
        )
        .uri(request.url())
        .build()),
    }
}

fn from_ureq_error(transport: ureq::Transport, request: &RequestParts) -> ResponseError {
    let response_error_kind = match transport.kind() {
        UreqErrorKind::InvalidUrl => ResponseErrorKind::InvalidUrl,
        UreqErrorKind::UnknownScheme => ResponseErrorKind::InvalidUrl,
        UreqErrorKind::Dns => ResponseErrorKind::UnknownHostError,
        UreqErrorKind::ConnectionFailed => ResponseErrorKind::ConnectError,
        UreqErrorKind::TooManyRedirects => ResponseErrorKind::TooManyRedirect,
        UreqErrorKind::BadStatus => ResponseErrorKind::InvalidRequestResponse,
        UreqErrorKind::BadHeader => ResponseErrorKind::InvalidHeader,
        UreqErrorKind::Io if is_timeout(&transport) => ResponseErrorKind::TimeoutError,
        UreqErrorKind::Io => ResponseErrorKind::LocalIoError,
        UreqErrorKind::InvalidProxyUrl => ResponseErrorKind::ProxyError,
        UreqErrorKind::ProxyConnect => ResponseErrorKind::ProxyError,
        UreqErrorKind::ProxyUnauthorized => ResponseErrorKind::ProxyError,
        UreqErrorKind::HTTP => ResponseErrorKind::InvalidRequestResponse,
        UreqErrorKind::InsecureRequestHttpsOnly => ResponseErrorKind::SslError,
    };
    ResponseError::builder(response_error_kind, AnyError::new(transport))
        .uri(request.url())
        .build()
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    transport
        .source()
        .and_then(|err| err.downcast_ref::<std::io::Error>())
        .map_or(false, |err| matches!(err.kind(), IoErrorKind::TimedOut | IoErrorKind::WouldBlock))
}
