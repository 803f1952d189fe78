use super::client::Client;
use isahc::{
    config::{Configurable, RedirectPolicy},
    Error as IsahcError, HttpClientBuilder as IsahcHttpClientBuilder,
};
use resty_http::Uri;
use std::time::Duration;

/// Isahc 客户端构建器
///
/// 连接池与超时相关的配置都在这里设置，对该客户端发出的所有请求生效
#[derive(Debug, Default)]
pub struct ClientBuilder {
    client_builder: IsahcHttpClientBuilder,
}

impl ClientBuilder {
    /// 设置连接缓存中空闲连接的存活时长
    #[inline]
    pub fn connection_cache_ttl(mut self, ttl: Duration) -> Self {
        self.client_builder = self.client_builder.connection_cache_ttl(ttl);
        self
    }

    /// 设置连接缓存的大小
    #[inline]
    pub fn connection_cache_size(mut self, size: usize) -> Self {
        self.client_builder = self.client_builder.connection_cache_size(size);
        self
    }

    /// 设置最大并发连接数
    #[inline]
    pub fn max_connections(mut self, max: usize) -> Self {
        self.client_builder = self.client_builder.max_connections(max);
        self
    }

    /// 设置每个主机的最大并发连接数
    #[inline]
    pub fn max_connections_per_host(mut self, max: usize) -> Self {
        self.client_builder = self.client_builder.max_connections_per_host(max);
        self
    }

    /// 设置请求的整体超时时长
    #[inline]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.client_builder = self.client_builder.timeout(timeout);
        self
    }

    /// 设置连接超时时长
    #[inline]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.client_builder = self.client_builder.connect_timeout(timeout);
        self
    }

    /// 设置低速传输超时
    #[inline]
    pub fn low_speed_timeout(mut self, low_speed: u32, timeout: Duration) -> Self {
        self.client_builder = self.client_builder.low_speed_timeout(low_speed, timeout);
        self
    }

    /// 设置重定向策略
    #[inline]
    pub fn redirect_policy(mut self, policy: RedirectPolicy) -> Self {
        self.client_builder = self.client_builder.redirect_policy(policy);
        self
    }

    /// 设置是否自动解压响应体
    #[inline]
    pub fn automatic_decompression(mut self, decompress: bool) -> Self {
        self.client_builder = self.client_builder.automatic_decompression(decompress);
        self
    }

    /// 启用 TCP_NODELAY
    #[inline]
    pub fn tcp_nodelay(mut self) -> Self {
        self.client_builder = self.client_builder.tcp_nodelay();
        self
    }

    /// 设置代理地址
    #[inline]
    pub fn proxy(mut self, proxy: impl Into<Option<Uri>>) -> Self {
        self.client_builder = self.client_builder.proxy(proxy);
        self
    }

    /// 构建 Isahc 客户端
    #[inline]
    pub fn build(self) -> Result<Client, IsahcError> {
        Ok(Client::new(self.client_builder.build()?))
    }
}
