use super::ClientBuilder;
use reqwest::{
    blocking::{
        Body as SyncBody, Client as SyncReqwestClient, Request as SyncReqwestRequest,
        Response as SyncReqwestResponse,
    },
    header::USER_AGENT,
    Error as ReqwestError, Url,
};
use resty_http::{
    HeaderValue, HttpCaller, RequestParts, ResponseError, ResponseErrorKind, SyncRequest, SyncResponse,
    SyncResponseBody, SyncResponseResult, TimeoutExtension,
};
use std::mem::take;

/// Reqwest 客户端
///
/// 基于 Reqwest 阻塞客户端，请求实际由 Reqwest 在后台线程中的异步运行时驱动
#[derive(Debug, Clone, Default)]
pub struct Client {
    sync_client: SyncReqwestClient,
}

impl Client {
    /// 创建 Reqwest 客户端
    #[inline]
    pub fn new(sync_client: SyncReqwestClient) -> Self {
        Self { sync_client }
    }

    /// 创建 Reqwest 客户端构建器
    #[inline]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }
}

impl From<SyncReqwestClient> for Client {
    #[inline]
    fn from(sync_client: SyncReqwestClient) -> Self {
        Self::new(sync_client)
    }
}

impl HttpCaller for Client {
    fn call(&self, request: &mut SyncRequest<'_>) -> SyncResponseResult {
        let reqwest_request = make_sync_reqwest_request(request)?;
        match self.sync_client.execute(reqwest_request) {
            Ok(reqwest_response) => from_sync_response(reqwest_response, request),
            Err(err) => Err(from_reqwest_error(err, request)),
        }
    }
}

fn make_sync_reqwest_request(request: &mut SyncRequest) -> Result<SyncReqwestRequest, ResponseError> {
    let url = Url::parse(&request.url().to_string()).map_err(|err| {
        ResponseError::builder(ResponseErrorKind::InvalidUrl, err)
            .uri(request.url())
            .build()
    })?;
    let mut reqwest_request = SyncReqwestRequest::new(request.method().to_owned(), url);
    for (header_name, header_value) in request.headers() {
        reqwest_request
            .headers_mut()
            .append(header_name, header_value.to_owned());
    }
    if !request.headers().contains_key(USER_AGENT) {
        reqwest_request
            .headers_mut()
            .insert(USER_AGENT, make_user_agent(request)?);
    }

    let body = take(request.body_mut()).into_owned();
    *reqwest_request.body_mut() = Some(match body.size() {
        Some(size) => SyncBody::sized(body, size),
        None => SyncBody::new(body),
    });

    if let Some(timeout) = request.extensions().get::<TimeoutExtension>() {
        *reqwest_request.timeout_mut() = Some(timeout.get());
    }

    Ok(reqwest_request)
}

fn make_user_agent(request: &RequestParts) -> Result<HeaderValue, ResponseError> {
    HeaderValue::from_str(&format!("{}/resty-reqwest", request.user_agent())).map_err(|err| {
        ResponseError::builder(ResponseErrorKind::InvalidHeader, err)
            .uri(request.url())
            .build()
    })
}

fn from_sync_response(mut response: SyncReqwestResponse, request: &mut SyncRequest) -> SyncResponseResult {
    let mut sync_response = SyncResponse::builder()
        .status_code(response.status())
        .version(response.version())
        .headers(take(response.headers_mut()))
        .build();
    *sync_response.extensions_mut() = take(request.extensions_mut());
    *sync_response.body_mut() = SyncResponseBody::from_reader(response);
    Ok(sync_response)
}

fn from_reqwest_error(err: ReqwestError, request: &RequestParts) -> ResponseError {
    let kind = if err.is_builder() {
        ResponseErrorKind::InvalidUrl
    } else if err.is_timeout() {
        ResponseErrorKind::TimeoutError
    } else if err.is_connect() {
        ResponseErrorKind::ConnectError
    } else if err.is_redirect() {
        ResponseErrorKind::TooManyRedirect
    } else if err.is_body() {
        ResponseErrorKind::SendError
    } else if err.is_decode() {
        ResponseErrorKind::ReceiveError
    } else if err.is_request() {
        ResponseErrorKind::InvalidRequestResponse
    } else {
        ResponseErrorKind::UnknownError
    };
    ResponseError::builder(kind, err).uri(request.url()).build()
}
