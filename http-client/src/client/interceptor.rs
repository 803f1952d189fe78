use super::{rest_client::RestClientInner, ApiResult};
use resty_http::{Method, RequestParts, SyncResponse, Uri};
use std::sync::Arc;

/// 请求拦截器
///
/// 按照注册顺序依次处理请求，响应则以相反的顺序返回。
/// 拦截器可以不调用 [`Next::execute`] 直接返回响应，从而短路后续的拦截器和 HTTP 客户端。
///
/// 注册了拦截器时，请求体将在拦截器链开始前被完整读入内存。
/// 在拦截器内读取响应体将消耗响应体，除非该请求开启了响应体缓冲。
pub trait Interceptor: Send + Sync {
    /// 拦截请求
    fn intercept(&self, request: &mut RequestParts, body: &[u8], next: Next) -> ApiResult<SyncResponse>;
}

impl<F> Interceptor for F
where
    F: Fn(&mut RequestParts, &[u8], Next) -> ApiResult<SyncResponse> + Send + Sync,
{
    #[inline]
    fn intercept(&self, request: &mut RequestParts, body: &[u8], next: Next) -> ApiResult<SyncResponse> {
        self(request, body, next)
    }
}

/// 拦截器链的后续部分
///
/// 最后一个拦截器之后是 HTTP 客户端
pub struct Next {
    client: Arc<RestClientInner>,
    position: usize,
}

impl Next {
    pub(super) fn new(client: Arc<RestClientInner>) -> Self {
        Self { client, position: 0 }
    }

    /// 将请求交给拦截器链的下一环
    pub fn execute(self, request: &mut RequestParts, body: &[u8]) -> ApiResult<SyncResponse> {
        match self.client.interceptors.get(self.position).cloned() {
            Some(interceptor) => interceptor.intercept(
                request,
                body,
                Next {
                    client: self.client,
                    position: self.position + 1,
                },
            ),
            None => self.client.call_http_caller(request, body.into()),
        }
    }
}

impl std::fmt::Debug for Next {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("position", &self.position)
            .field("interceptors", &self.client.interceptors.len())
            .finish()
    }
}

/// 请求初始化函数
///
/// 在请求构建完成后，拦截器链开始前调用
pub type RequestInitializer = Arc<dyn Fn(&mut RequestParts) + Send + Sync>;

/// 响应体缓冲策略
///
/// 返回 `true` 的请求，其响应体将在 HTTP 客户端返回后立即被完整读入内存，之后可以反复读取
pub type BufferingPolicy = Arc<dyn Fn(&Uri, &Method) -> bool + Send + Sync>;
