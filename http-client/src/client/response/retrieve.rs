use super::{
    super::{rest_client::RestClientInner, status_handler::handle_status, StatusHandler},
    ApiResult, ClientResponse, ResponseEntity,
};
use anyhow::Result as AnyResult;
use log::debug;
use resty_http::{RequestParts, StatusCode, SyncRequestBody};
use serde::de::DeserializeOwned;
use std::{
    io::{copy, sink},
    sync::Arc,
};

/// 获取响应的规格
///
/// 只有调用获取响应体或响应实体的方法时才会发送请求。
/// 非 2xx 响应默认将返回状态码错误，可以通过 [`ResponseSpec::on_status`] 自定义处理方式。
#[derive(Debug)]
#[must_use]
pub struct ResponseSpec {
    client: Arc<RestClientInner>,
    request: ApiResult<(RequestParts, SyncRequestBody<'static>)>,
    status_handlers: Vec<StatusHandler>,
}

impl ResponseSpec {
    pub(in super::super) fn new(
        client: Arc<RestClientInner>,
        request: ApiResult<(RequestParts, SyncRequestBody<'static>)>,
    ) -> Self {
        Self {
            client,
            request,
            status_handlers: Default::default(),
        }
    }

    /// 添加本次调用的状态码处理函数
    ///
    /// 先于客户端默认的状态码处理函数被调用，按照添加顺序第一个匹配的处理函数生效
    #[inline]
    pub fn on_status(
        mut self,
        predicate: impl Fn(&StatusCode) -> bool + Send + Sync + 'static,
        action: impl Fn(&RequestParts, &mut ClientResponse) -> AnyResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.status_handlers.push(StatusHandler::new(predicate, action));
        self
    }

    /// 解码响应体
    ///
    /// 响应体为空或为 JSON `null` 时返回 `None`
    pub fn body<T: DeserializeOwned + 'static>(self) -> ApiResult<Option<T>> {
        self.retrieve()?.body()
    }

    /// 获取响应体的全部内容
    pub fn body_bytes(self) -> ApiResult<Vec<u8>> {
        self.retrieve()?.read_bytes()
    }

    /// 以 UTF-8 文本获取响应体的全部内容
    pub fn body_text(self) -> ApiResult<String> {
        self.retrieve()?.read_text()
    }

    /// 获取包含解码后响应体的响应实体
    pub fn to_entity<T: DeserializeOwned + 'static>(self) -> ApiResult<ResponseEntity<Option<T>>> {
        let mut response = self.retrieve()?;
        let body = response.body()?;
        Ok(ResponseEntity::new(
            response.status_code(),
            response.headers().to_owned(),
            body,
        ))
    }

    /// 获取不含响应体的响应实体
    ///
    /// 响应体将被读取并丢弃
    pub fn to_bodiless_entity(self) -> ApiResult<ResponseEntity<()>> {
        let mut response = self.retrieve()?;
        response.rewind();
        let drained = copy(response.body_mut(), &mut sink())?;
        debug!("Discarded {drained} bytes of response body");
        Ok(ResponseEntity::new(
            response.status_code(),
            response.headers().to_owned(),
            (),
        ))
    }

    fn retrieve(self) -> ApiResult<ClientResponse> {
        let (mut parts, body) = self.request?;
        let response = self.client.execute(&mut parts, body)?;
        let mut response = ClientResponse::new(response, self.client.codecs.to_owned());
        handle_status(
            &self.status_handlers,
            &self.client.status_handlers,
            &parts,
            &mut response,
        )?;
        Ok(response)
    }
}
