#![cfg_attr(feature = "docs", feature(doc_cfg))]
#![deny(
    missing_debug_implementations,
    anonymous_parameters,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    non_ascii_idents,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_extern_crates,
    unused_import_braces
)]

//! # resty-isahc
//!
//! ## Resty Isahc HTTP 客户端实现
//!
//! 基于 Isahc 库提供 HTTP 客户端接口实现。
//! Isahc 底层使用 libcurl，自带连接池，适合向同一个服务器发送大量请求的场景。

mod builder;
mod client;
mod extensions;

pub use builder::ClientBuilder;
pub use client::Client;
pub use extensions::*;

pub use isahc;
pub use resty_http as http;

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::channel::oneshot::channel;
    use isahc::http::header::{CONTENT_LENGTH, USER_AGENT};
    use md5::{Digest, Md5};
    use rand::{thread_rng, RngCore};
    use resty_http::{
        HttpCaller, Method, ResponseErrorKind, StatusCode, SyncRequest, SyncRequestBody, TimeoutExtension,
    };
    use std::{
        io::{copy as io_copy, Cursor, Read},
        net::TcpListener,
        time::Duration,
    };
    use tokio::task::spawn_blocking;
    use warp::{
        filters::{body::bytes, method::post},
        header::value as header_value,
        http::header::HeaderValue,
        path,
        reply::{with_status, Response},
        Filter,
    };

    macro_rules! starts_with_server {
        ($addr:ident, $routes:ident, $code:block) => {{
            let (tx, rx) = channel();
            let ($addr, server) = warp::serve($routes).bind_with_graceful_shutdown(([127, 0, 0, 1], 0), async move {
                rx.await.ok();
            });
            let handler = tokio::spawn(server);
            $code?;
            tx.send(()).ok();
            handler.await.ok();
        }};
    }

    const BUF_LEN: usize = 1 << 20;
    const MD5_LEN: usize = 16;

    #[tokio::test]
    async fn sync_http_test() -> anyhow::Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let routes = path!("dir1" / "dir2" / "file")
            .and(post())
            .and(header_value(USER_AGENT.as_str()))
            .and(bytes())
            .map(|user_agent: HeaderValue, req_body: Bytes| {
                assert_eq!(req_body.len(), BUF_LEN + MD5_LEN);
                {
                    let mut hasher = Md5::new();
                    hasher.update(&req_body[..BUF_LEN]);
                    assert_eq!(hasher.finalize().as_slice(), &req_body[BUF_LEN..]);
                }

                assert!(user_agent.to_str().unwrap().starts_with("Resty/"));
                assert!(user_agent.to_str().unwrap().ends_with("/resty-isahc"));

                let mut resp_body = vec![0u8; BUF_LEN + MD5_LEN];
                thread_rng().fill_bytes(&mut resp_body[..BUF_LEN]);
                {
                    let mut hasher = Md5::new();
                    hasher.update(&resp_body[..BUF_LEN]);
                    resp_body[BUF_LEN..].copy_from_slice(hasher.finalize().as_slice());
                }
                Response::new(resp_body.into())
            });
        starts_with_server!(addr, routes, {
            spawn_blocking(move || {
                let mut request_body = vec![0u8; BUF_LEN + MD5_LEN];
                thread_rng().fill_bytes(&mut request_body[..BUF_LEN]);
                {
                    let mut hasher = Md5::new();
                    hasher.update(&request_body[..BUF_LEN]);
                    request_body[BUF_LEN..].copy_from_slice(hasher.finalize().as_slice());
                }

                let mut response = {
                    let mut request = SyncRequest::builder()
                        .method(Method::POST)
                        .url(format!("http://{addr}/dir1/dir2/file").parse().expect("invalid uri"))
                        .body(SyncRequestBody::from_referenced_bytes(&request_body))
                        .add_extension(TimeoutExtension::new(Duration::from_secs(10)))
                        .add_extension(ConnectTimeoutRequestExtension::new(Duration::from_secs(1)))
                        .build();
                    Client::default_client()?.call(&mut request)?
                };
                assert_eq!(
                    response.header(CONTENT_LENGTH).map(|h| h.as_bytes()),
                    Some(format!("{}", BUF_LEN + MD5_LEN).as_bytes())
                );
                assert_eq!(
                    response.extensions().get::<TimeoutExtension>().map(|ext| ext.get()),
                    Some(Duration::from_secs(10))
                );

                {
                    let mut body_part = Vec::new();
                    let mut checksum_part = Vec::new();

                    assert_eq!(
                        io_copy(&mut response.body_mut().take(BUF_LEN as u64), &mut body_part)?,
                        BUF_LEN as u64
                    );
                    assert_eq!(
                        io_copy(&mut response.body_mut().take(MD5_LEN as u64), &mut checksum_part)?,
                        MD5_LEN as u64
                    );

                    let mut hasher = Md5::new();
                    hasher.update(&body_part);
                    assert_eq!(hasher.finalize().as_slice(), checksum_part.as_slice());
                }
                Ok::<_, anyhow::Error>(())
            })
            .await?
        });

        Ok(())
    }

    #[tokio::test]
    async fn sync_http_error_status_test() -> anyhow::Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let routes = path!("broken").map(|| with_status("Internal Server Error", StatusCode::INTERNAL_SERVER_ERROR));
        starts_with_server!(addr, routes, {
            spawn_blocking(move || {
                let client = Client::builder().connect_timeout(Duration::from_secs(1)).build()?;
                let mut request = SyncRequest::builder()
                    .url(format!("http://{addr}/broken").parse().expect("invalid uri"))
                    .build();
                let mut response = client.call(&mut request)?;
                assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
                let mut body = String::new();
                response.body_mut().read_to_string(&mut body)?;
                assert_eq!(body, "Internal Server Error");
                Ok::<_, anyhow::Error>(())
            })
            .await?
        });

        Ok(())
    }

    #[tokio::test]
    async fn sync_http_streaming_body_test() -> anyhow::Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let routes = path!("echo")
            .and(post())
            .and(bytes())
            .map(|req_body: Bytes| Response::new(req_body.to_vec().into()));
        starts_with_server!(addr, routes, {
            spawn_blocking(move || {
                let mut request = SyncRequest::builder()
                    .method(Method::POST)
                    .url(format!("http://{addr}/echo").parse().expect("invalid uri"))
                    .body(SyncRequestBody::from_reader(Cursor::new(b"streamed content".to_vec()), None))
                    .build();
                let mut response = Client::default_client()?.call(&mut request)?;
                assert_eq!(response.status_code(), StatusCode::OK);
                let mut body = String::new();
                response.body_mut().read_to_string(&mut body)?;
                assert_eq!(body, "streamed content");
                Ok::<_, anyhow::Error>(())
            })
            .await?
        });

        Ok(())
    }

    #[test]
    fn sync_http_connect_error_test() -> anyhow::Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let addr = TcpListener::bind("127.0.0.1:0")?.local_addr()?;
        let mut request = SyncRequest::builder()
            .url(format!("http://{addr}/closed").parse()?)
            .build();
        let err = Client::default_client()?.call(&mut request).unwrap_err();
        assert_eq!(err.kind(), ResponseErrorKind::ConnectError);
        Ok(())
    }
}
