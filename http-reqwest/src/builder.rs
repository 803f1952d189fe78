use super::Client;
use reqwest::{blocking::ClientBuilder as SyncClientBuilder, Proxy, Result as ReqwestResult};
use resty_http::HeaderMap;
use std::time::Duration;

#[derive(Debug, Default)]
struct Config {
    default_headers: Option<HeaderMap>,
    #[cfg(feature = "gzip")]
    gzip: Option<bool>,
    referer: Option<bool>,
    proxy: Option<Proxy>,
    no_proxy: bool,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    pool_idle_timeout: Option<Duration>,
    pool_max_idle_per_host: Option<usize>,
    http1_title_case_headers: bool,
    tcp_nodelay: Option<bool>,
    tcp_keepalive: Option<Duration>,
}

/// Reqwest 客户端构建器
///
/// 超时时长未设置时，Reqwest 阻塞客户端默认为 30 秒
#[derive(Debug, Default)]
pub struct ClientBuilder {
    config: Config,
}

impl ClientBuilder {
    /// 设置每个请求都会携带的默认 HTTP 头
    #[inline]
    pub fn default_headers(mut self, default_headers: HeaderMap) -> Self {
        self.config.default_headers = Some(default_headers);
        self
    }

    /// 是否启用 gzip 自动解压
    #[inline]
    #[cfg(feature = "gzip")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "gzip")))]
    pub fn gzip(mut self, gzip: bool) -> Self {
        self.config.gzip = Some(gzip);
        self
    }

    /// 重定向时是否自动设置 Referer
    #[inline]
    pub fn referer(mut self, referer: bool) -> Self {
        self.config.referer = Some(referer);
        self
    }

    /// 设置代理
    #[inline]
    pub fn proxy(mut self, proxy: Proxy) -> Self {
        self.config.proxy = Some(proxy);
        self
    }

    /// 禁用代理，包括系统代理
    #[inline]
    pub fn no_proxy(mut self) -> Self {
        self.config.no_proxy = true;
        self
    }

    /// 设置请求的整体超时时长
    #[inline]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// 设置连接超时时长
    #[inline]
    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.config.connect_timeout = Some(connect_timeout);
        self
    }

    /// 设置连接池中空闲连接的存活时长
    #[inline]
    pub fn pool_idle_timeout(mut self, pool_idle_timeout: Duration) -> Self {
        self.config.pool_idle_timeout = Some(pool_idle_timeout);
        self
    }

    /// 设置连接池中每个主机的最大空闲连接数
    #[inline]
    pub fn pool_max_idle_per_host(mut self, pool_max_idle_per_host: usize) -> Self {
        self.config.pool_max_idle_per_host = Some(pool_max_idle_per_host);
        self
    }

    /// 发送 HTTP/1.x 请求时，将 HTTP 头名称转换为首字母大写格式
    #[inline]
    pub fn http1_title_case_headers(mut self) -> Self {
        self.config.http1_title_case_headers = true;
        self
    }

    /// 设置 TCP_NODELAY
    #[inline]
    pub fn tcp_nodelay(mut self, tcp_nodelay: bool) -> Self {
        self.config.tcp_nodelay = Some(tcp_nodelay);
        self
    }

    /// 设置 TCP Keepalive 间隔
    #[inline]
    pub fn tcp_keepalive(mut self, tcp_keepalive: Duration) -> Self {
        self.config.tcp_keepalive = Some(tcp_keepalive);
        self
    }

    /// 构建 Reqwest 客户端
    ///
    /// Reqwest 阻塞客户端内部会启动后台异步运行时，不能在异步上下文中调用
    #[inline]
    pub fn build(self) -> ReqwestResult<Client> {
        Ok(Client::new(self.into_sync_client_builder().build()?))
    }

    fn into_sync_client_builder(self) -> SyncClientBuilder {
        let config = self.config;
        let mut builder = SyncClientBuilder::new();
        if let Some(default_headers) = config.default_headers {
            builder = builder.default_headers(default_headers);
        }
        #[cfg(feature = "gzip")]
        if let Some(enable) = config.gzip {
            builder = builder.gzip(enable);
        }
        if let Some(enable) = config.referer {
            builder = builder.referer(enable);
        }
        if let Some(proxy) = config.proxy {
            builder = builder.proxy(proxy);
        }
        if config.no_proxy {
            builder = builder.no_proxy();
        }
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        if let Some(timeout) = config.pool_idle_timeout {
            builder = builder.pool_idle_timeout(timeout);
        }
        if let Some(value) = config.pool_max_idle_per_host {
            builder = builder.pool_max_idle_per_host(value);
        }
        if config.http1_title_case_headers {
            builder = builder.http1_title_case_headers();
        }
        if let Some(enable) = config.tcp_nodelay {
            builder = builder.tcp_nodelay(enable);
        }
        if let Some(tcp_keepalive) = config.tcp_keepalive {
            builder = builder.tcp_keepalive(tcp_keepalive);
        }
        builder
    }
}
