use super::super::{CodecError, UriExpansionError};
use anyhow::Error as AnyError;
use assert_impl::assert_impl;
use resty_http::{
    HeaderMap, ResponseError as HttpResponseError, ResponseErrorKind as HttpResponseErrorKind, StatusCode,
};
use serde_json::Error as JsonError;
use std::{
    borrow::Cow,
    error::Error as StdError,
    fmt::{self, Debug, Display},
    io::{Error as IoError, Read, Result as IoResult},
};

/// 4xx 状态码错误类型
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ClientErrorStatus {
    /// 400
    BadRequest,
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 405
    MethodNotAllowed,
    /// 406
    NotAcceptable,
    /// 409
    Conflict,
    /// 410
    Gone,
    /// 415
    UnsupportedMediaType,
    /// 422
    UnprocessableEntity,
    /// 429
    TooManyRequests,
    /// 其他已登记的 4xx 状态码
    Other(StatusCode),
}

impl ClientErrorStatus {
    fn from_status_code(status_code: StatusCode) -> Self {
        match status_code {
            StatusCode::BAD_REQUEST => Self::BadRequest,
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::FORBIDDEN => Self::Forbidden,
            StatusCode::NOT_FOUND => Self::NotFound,
            StatusCode::METHOD_NOT_ALLOWED => Self::MethodNotAllowed,
            StatusCode::NOT_ACCEPTABLE => Self::NotAcceptable,
            StatusCode::CONFLICT => Self::Conflict,
            StatusCode::GONE => Self::Gone,
            StatusCode::UNSUPPORTED_MEDIA_TYPE => Self::UnsupportedMediaType,
            StatusCode::UNPROCESSABLE_ENTITY => Self::UnprocessableEntity,
            StatusCode::TOO_MANY_REQUESTS => Self::TooManyRequests,
            other => Self::Other(other),
        }
    }

    /// 获取对应的状态码
    pub fn status_code(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Gone => StatusCode::GONE,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::UnprocessableEntity => StatusCode::UNPROCESSABLE_ENTITY,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::Other(status_code) => status_code,
        }
    }
}

/// 5xx 状态码错误类型
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ServerErrorStatus {
    /// 500
    InternalServerError,
    /// 501
    NotImplemented,
    /// 502
    BadGateway,
    /// 503
    ServiceUnavailable,
    /// 504
    GatewayTimeout,
    /// 其他已登记的 5xx 状态码
    Other(StatusCode),
}

impl ServerErrorStatus {
    fn from_status_code(status_code: StatusCode) -> Self {
        match status_code {
            StatusCode::INTERNAL_SERVER_ERROR => Self::InternalServerError,
            StatusCode::NOT_IMPLEMENTED => Self::NotImplemented,
            StatusCode::BAD_GATEWAY => Self::BadGateway,
            StatusCode::SERVICE_UNAVAILABLE => Self::ServiceUnavailable,
            StatusCode::GATEWAY_TIMEOUT => Self::GatewayTimeout,
            other => Self::Other(other),
        }
    }

    /// 获取对应的状态码
    pub fn status_code(self) -> StatusCode {
        match self {
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            Self::BadGateway => StatusCode::BAD_GATEWAY,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Other(status_code) => status_code,
        }
    }
}

/// REST 客户端错误类型
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// URI 模版展开失败
    UriExpansion,

    /// HTTP 客户端错误
    Transport(HttpResponseErrorKind),

    /// 4xx 状态码错误
    ClientStatus(ClientErrorStatus),

    /// 5xx 状态码错误
    ServerStatus(ServerErrorStatus),

    /// 其他非 2xx 状态码，或未登记原因短语的状态码
    UnknownStatus(StatusCode),

    /// 状态码处理函数返回了错误
    StatusHandling,

    /// 响应交换函数返回了错误
    Exchange,

    /// 拦截器返回了错误
    Interceptor,

    /// 响应交换函数没有返回值
    MissingValue,

    /// 编解码失败
    Codec,

    /// 读取请求体或响应体失败
    LocalIo,
}

const MESSAGE_BODY_LEN_LIMIT: usize = 1024;

/// REST 客户端错误
///
/// 状态码错误将额外携带状态码，原因短语，响应头和响应体
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    error: AnyError,
    status: Option<StatusInfo>,
}

#[derive(Debug)]
struct StatusInfo {
    status_code: StatusCode,
    status_text: Cow<'static, str>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Error {
    /// 创建 REST 客户端错误
    #[inline]
    pub fn new(kind: ErrorKind, err: impl Into<AnyError>) -> Self {
        Error {
            kind,
            error: err.into(),
            status: None,
        }
    }

    /// 创建 REST 客户端错误
    #[inline]
    pub fn new_with_msg(kind: ErrorKind, msg: impl Display + Debug + Send + Sync + 'static) -> Self {
        Self::new(kind, AnyError::msg(msg))
    }

    /// 按照默认策略为非 2xx 响应创建状态码错误
    ///
    /// 响应体将被完整读取，错误信息中最多只包含响应体的前 1024 个字节
    pub fn from_status<R: Read>(status_code: StatusCode, headers: HeaderMap, mut body: R) -> IoResult<Self> {
        let mut buf = Vec::new();
        body.read_to_end(&mut buf)?;
        Ok(Self::from_status_and_body(status_code, headers, buf))
    }

    fn from_status_and_body(status_code: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
        let kind = status_error_kind(status_code);
        let status_text = status_text(status_code);
        let message = if body.is_empty() {
            format!("{} {}: [no body]", status_code.as_u16(), status_text)
        } else {
            format!(
                "{} {}: \"{}\"",
                status_code.as_u16(),
                status_text,
                String::from_utf8_lossy(&body[..body.len().min(MESSAGE_BODY_LEN_LIMIT)])
            )
        };
        Error {
            kind,
            error: AnyError::msg(message),
            status: Some(StatusInfo {
                status_code,
                status_text,
                headers,
                body,
            }),
        }
    }

    /// 获取错误类型
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// 获取状态码
    ///
    /// 仅状态码错误才有状态码
    #[inline]
    pub fn status_code(&self) -> Option<StatusCode> {
        self.status.as_ref().map(|status| status.status_code)
    }

    /// 获取原因短语
    #[inline]
    pub fn status_text(&self) -> Option<&str> {
        self.status.as_ref().map(|status| status.status_text.as_ref())
    }

    /// 获取响应头
    #[inline]
    pub fn response_headers(&self) -> Option<&HeaderMap> {
        self.status.as_ref().map(|status| &status.headers)
    }

    /// 获取响应体
    #[inline]
    pub fn response_body(&self) -> &[u8] {
        self.status
            .as_ref()
            .map(|status| status.body.as_slice())
            .unwrap_or_default()
    }

    /// 以字符串形式获取响应体
    #[inline]
    pub fn response_body_as_string(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.response_body())
    }

    /// 获取错误信息
    #[inline]
    pub fn message(&self) -> String {
        self.error.to_string()
    }

    /// 尝试获取指定类型的内部错误
    #[inline]
    pub fn downcast_ref<E: Display + Debug + Send + Sync + 'static>(&self) -> Option<&E> {
        self.error.downcast_ref()
    }

    /// 转换为内部错误
    #[inline]
    pub fn into_inner(self) -> AnyError {
        self.error
    }

    #[allow(dead_code)]
    fn assert() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }
}

fn status_error_kind(status_code: StatusCode) -> ErrorKind {
    if status_code.canonical_reason().is_none() {
        ErrorKind::UnknownStatus(status_code)
    } else if status_code.is_client_error() {
        ErrorKind::ClientStatus(ClientErrorStatus::from_status_code(status_code))
    } else if status_code.is_server_error() {
        ErrorKind::ServerStatus(ServerErrorStatus::from_status_code(status_code))
    } else {
        ErrorKind::UnknownStatus(status_code)
    }
}

fn status_text(status_code: StatusCode) -> Cow<'static, str> {
    if let Some(reason) = status_code.canonical_reason() {
        return Cow::Borrowed(reason);
    }
    Cow::Borrowed(match status_code.as_u16() / 100 {
        1 => "Informational",
        2 => "Success",
        3 => "Redirection",
        4 => "Client Error",
        5 => "Server Error",
        _ => "Unknown Status",
    })
}

impl Display for Error {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.error)
    }
}

impl StdError for Error {
    #[inline]
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.error.as_ref())
    }
}

impl From<HttpResponseError> for Error {
    #[inline]
    fn from(error: HttpResponseError) -> Self {
        Self::new(ErrorKind::Transport(error.kind()), error)
    }
}

impl From<IoError> for Error {
    #[inline]
    fn from(error: IoError) -> Self {
        Self::new(ErrorKind::LocalIo, error)
    }
}

impl From<JsonError> for Error {
    #[inline]
    fn from(error: JsonError) -> Self {
        Self::new(ErrorKind::Codec, error)
    }
}

impl From<CodecError> for Error {
    #[inline]
    fn from(error: CodecError) -> Self {
        Self::new(ErrorKind::Codec, error)
    }
}

impl From<UriExpansionError> for Error {
    #[inline]
    fn from(error: UriExpansionError) -> Self {
        Self::new(ErrorKind::UriExpansion, error)
    }
}

/// REST 客户端 API 调用结果
pub type ApiResult<T> = Result<T, Error>;
