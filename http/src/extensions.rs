use std::time::Duration;

/// 单个请求的超时时长扩展
///
/// 放入 [`crate::RequestParts::extensions_mut`] 后，所有 HTTP 客户端实现都会将其作为本次请求的整体超时时长，
/// 覆盖客户端自身配置的超时时长。
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimeoutExtension(Duration);

impl TimeoutExtension {
    /// 创建超时时长扩展
    #[inline]
    pub fn new(timeout: Duration) -> Self {
        Self(timeout)
    }

    /// 获取超时时长
    #[inline]
    pub fn get(&self) -> Duration {
        self.0
    }
}
