use super::{ApiResult, ClientResponse, ResponseError, ResponseErrorKind};
use anyhow::{Error as AnyError, Result as AnyResult};
use log::debug;
use resty_http::{RequestParts, StatusCode};
use std::{
    fmt::{self, Debug},
    sync::Arc,
};

type StatusPredicate = Arc<dyn Fn(&StatusCode) -> bool + Send + Sync>;
type StatusAction = Arc<dyn Fn(&RequestParts, &mut ClientResponse) -> AnyResult<()> + Send + Sync>;

/// 状态码处理函数
///
/// 由状态码判断函数和处理函数组成，第一个判断成功的处理函数将被调用。
/// 处理函数返回 `Ok` 时，默认的状态码错误将被抑制。
#[derive(Clone)]
pub struct StatusHandler {
    predicate: StatusPredicate,
    action: StatusAction,
}

impl StatusHandler {
    /// 创建状态码处理函数
    #[inline]
    pub fn new(
        predicate: impl Fn(&StatusCode) -> bool + Send + Sync + 'static,
        action: impl Fn(&RequestParts, &mut ClientResponse) -> AnyResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            predicate: Arc::new(predicate),
            action: Arc::new(action),
        }
    }

    /// 是否处理该状态码
    #[inline]
    pub fn matches(&self, status_code: StatusCode) -> bool {
        (self.predicate)(&status_code)
    }

    /// 调用处理函数
    #[inline]
    pub fn handle(&self, request: &RequestParts, response: &mut ClientResponse) -> AnyResult<()> {
        (self.action)(request, response)
    }
}

impl Debug for StatusHandler {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusHandler").finish()
    }
}

/// 依次尝试本次调用的处理函数，客户端默认的处理函数和默认策略
///
/// 默认策略对所有非 2xx 状态码返回状态码错误
pub(super) fn handle_status(
    per_call: &[StatusHandler],
    defaults: &[StatusHandler],
    request: &RequestParts,
    response: &mut ClientResponse,
) -> ApiResult<()> {
    let status_code = response.status_code();
    if let Some(handler) = per_call
        .iter()
        .chain(defaults.iter())
        .find(|handler| handler.matches(status_code))
    {
        debug!("Status {status_code} of {} is handled by status handler", request.url());
        response.rewind();
        return handler
            .handle(request, response)
            .map_err(|err| into_response_error(err, ResponseErrorKind::StatusHandling));
    }
    if status_code.is_success() {
        Ok(())
    } else {
        response.rewind();
        let headers = response.headers().to_owned();
        Err(ResponseError::from_status(status_code, headers, response.body_mut())?)
    }
}

/// 处理函数返回的客户端错误原样返回，其他错误使用指定类型包装
pub(super) fn into_response_error(err: AnyError, kind: ResponseErrorKind) -> ResponseError {
    match err.downcast::<ResponseError>() {
        Ok(err) => err,
        Err(err) => ResponseError::new(kind, err),
    }
}
