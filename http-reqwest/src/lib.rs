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

//! # resty-reqwest
//!
//! ## Resty Reqwest HTTP 客户端实现
//!
//! 基于 Reqwest 库的阻塞客户端提供 HTTP 客户端接口实现。
//! Reqwest 阻塞客户端实际是在后台线程中运行异步运行时，再将结果同步返回，
//! 因此不能在异步上下文中创建或销毁该客户端。

mod builder;
mod client;

pub use builder::ClientBuilder;
pub use client::Client;

pub use reqwest;
pub use resty_http as http;

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::channel::oneshot::channel;
    use md5::{Digest, Md5};
    use rand::{thread_rng, RngCore};
    use reqwest::header::{CONTENT_LENGTH, USER_AGENT};
    use resty_http::{
        HttpCaller, Method, ResponseErrorKind, StatusCode, SyncRequest, SyncRequestBody, TimeoutExtension,
    };
    use std::{
        io::{copy as io_copy, Cursor, Read},
        net::TcpListener,
        time::Duration,
    };
    use tokio::{task::spawn_blocking, time::sleep};
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

    fn make_client() -> anyhow::Result<Client> {
        Ok(Client::builder().no_proxy().build()?)
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

                assert!(user_agent.as_bytes().starts_with(b"Resty/"));
                assert!(user_agent.as_bytes().ends_with(b"/resty-reqwest"));

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
                        .build();
                    make_client()?.call(&mut request)?
                };
                assert_eq!(
                    response.header(CONTENT_LENGTH).map(|h| h.as_bytes()),
                    Some(format!("{}", BUF_LEN + MD5_LEN).as_bytes())
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

        let routes = path!("missing").map(|| with_status("Not Found", StatusCode::NOT_FOUND));
        starts_with_server!(addr, routes, {
            spawn_blocking(move || {
                let mut request = SyncRequest::builder()
                    .url(format!("http://{addr}/missing").parse().expect("invalid uri"))
                    .build();
                let mut response = make_client()?.call(&mut request)?;
                assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
                let mut body = String::new();
                response.body_mut().read_to_string(&mut body)?;
                assert_eq!(body, "Not Found");
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
                let mut response = make_client()?.call(&mut request)?;
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

    #[tokio::test]
    async fn sync_http_timeout_extension_test() -> anyhow::Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let routes = path!("slow").and_then(|| async {
            sleep(Duration::from_secs(3)).await;
            Ok::<_, warp::Rejection>("too late")
        });
        starts_with_server!(addr, routes, {
            spawn_blocking(move || {
                let mut request = SyncRequest::builder()
                    .url(format!("http://{addr}/slow").parse().expect("invalid uri"))
                    .add_extension(TimeoutExtension::new(Duration::from_millis(200)))
                    .build();
                let err = make_client()?.call(&mut request).unwrap_err();
                assert_eq!(err.kind(), ResponseErrorKind::TimeoutError);
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
        let err = make_client()?.call(&mut request).unwrap_err();
        assert_eq!(err.kind(), ResponseErrorKind::ConnectError);
        Ok(())
    }
}
