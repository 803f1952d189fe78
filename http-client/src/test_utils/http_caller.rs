use resty_http::{
    HeaderMap, HttpCaller, Method, ResponseError, ResponseErrorKind, StatusCode, SyncRequest, SyncResponse,
    SyncResponseResult,
};
use std::{
    io::Read,
    sync::{Arc, Mutex},
};

/// 记录收到的请求，并总是返回固定响应的 HTTP 客户端
#[derive(Debug, Clone)]
pub(crate) struct RecordingHttpCaller {
    status_code: StatusCode,
    body: Vec<u8>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedRequest {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Vec<u8>,
}

impl RecordingHttpCaller {
    pub(crate) fn new(status_code: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status_code,
            body: body.into(),
            requests: Default::default(),
        }
    }

    pub(crate) fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().to_owned()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl HttpCaller for RecordingHttpCaller {
    fn call(&self, request: &mut SyncRequest<'_>) -> SyncResponseResult {
        let mut body = Vec::new();
        request
            .body_mut()
            .read_to_end(&mut body)
            .map_err(|err| ResponseError::builder(ResponseErrorKind::LocalIoError, err).uri(request.url()).build())?;
        self.requests.lock().unwrap().push(RecordedRequest {
            method: request.method().to_owned(),
            url: request.url().to_string(),
            headers: request.headers().to_owned(),
            body,
        });
        Ok(SyncResponse::builder()
            .status_code(self.status_code)
            .bytes_as_body(self.body.to_owned())
            .build())
    }
}
