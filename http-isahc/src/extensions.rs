use isahc::config::RedirectPolicy;
use resty_http::Uri;
use std::time::Duration;

macro_rules! make_request_extension {
    ($(#[$attr:meta])* $extension_name:ident) => {
        $(#[$attr])*
        #[derive(Copy, Clone, Debug, Default)]
        pub struct $extension_name;
    };
    ($(#[$attr:meta])* $extension_name:ident, $type:ty) => {
        $(#[$attr])*
        #[derive(Clone, Debug)]
        pub struct $extension_name($type);
        impl $extension_name {
            /// 创建扩展
            #[inline]
            pub fn new(value: $type) -> Self {
                Self(value)
            }

            /// 获取扩展的值
            #[inline]
            pub fn get(&self) -> &$type {
                &self.0
            }
        }
    };
    ($(#[$attr:meta])* $extension_name:ident, $type1:ty, $type2:ty) => {
        $(#[$attr])*
        #[derive(Clone, Debug)]
        pub struct $extension_name(($type1, $type2));
        impl $extension_name {
            /// 创建扩展
            #[inline]
            pub fn new(value1: $type1, value2: $type2) -> Self {
                Self((value1, value2))
            }

            /// 获取扩展的值
            #[inline]
            pub fn get(&self) -> (&$type1, &$type2) {
                (&(self.0).0, &(self.0).1)
            }
        }
    };
}

make_request_extension!(
    /// 连接超时时长
    ConnectTimeoutRequestExtension,
    Duration
);
make_request_extension!(
    /// 低速传输超时，传输速度在指定时长内持续低于指定字节数即视为超时
    LowSpeedTimeoutRequestExtension,
    u32,
    Duration
);
make_request_extension!(
    /// 重定向策略
    RedirectPolicyRequestExtension,
    RedirectPolicy
);
make_request_extension!(
    /// 是否自动解压响应体
    AutomaticDecompressionRequestExtension,
    bool
);
make_request_extension!(
    /// 启用 TCP_NODELAY
    TcpNodelayRequestExtension
);
make_request_extension!(
    /// 代理地址，`None` 表示不使用代理
    ProxyRequestExtension,
    Option<Uri>
);
make_request_extension!(
    /// 发送 HTTP/1.x 请求时，是否将 HTTP 头名称转换为首字母大写格式
    TitleCaseHeadersRequestExtension,
    bool
);
