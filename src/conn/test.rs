use bytes::Bytes;
use http::{Method, StatusCode, Version};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use super::*;
use crate::{
    adapter::AdapterError,
    body::{Cursor, Read, ReadOptions},
    cookie::{CookieOptions, SameSite},
    headers::InvalidHeader,
    multipart::MultipartError,
    query::{DecodeOptions, Value},
    testing::{self, TestAdapter},
};

const fn is_send<T: Send>() {}
const _: () = {
    is_send::<Conn<TestAdapter>>();
};

fn get(uri: &str) -> Conn<TestAdapter> {
    testing::conn(Method::GET, uri.parse().unwrap(), "")
}

fn post(content_type: &str, body: &'static str, chunk_size: usize) -> Conn<TestAdapter> {
    testing::conn_with(
        TestAdapter::new(body).with_chunk_size(chunk_size),
        Method::POST,
        "/upload".parse().unwrap(),
        Headers::from_iter([("content-type", content_type)]),
    )
}

// ===== Request =====

#[test]
fn test_request_fields() {
    let conn = get("/foo/bar/?a=1");
    assert_eq!(conn.method(), Method::GET);
    assert_eq!(conn.scheme(), Scheme::Http);
    assert_eq!(conn.host(), "www.example.com");
    assert_eq!(conn.port(), 80);
    assert_eq!(conn.path_info(), ["foo", "bar"]);
    assert!(conn.script_name().is_empty());
    assert_eq!(conn.request_path(), "/foo/bar/");
    assert_eq!(conn.query_string(), "a=1");
    assert_eq!(conn.remote_ip().to_string(), "127.0.0.1");
    assert_eq!(conn.state(), State::Unset);
    assert_eq!(conn.status(), None);
    assert!(!conn.query_params().is_fetched());
    assert!(!conn.params().is_fetched());
    assert!(!conn.cookies().is_fetched());
}

#[test]
fn test_request_url() {
    assert_eq!(get("/foo?a=1").request_url(), "http://www.example.com/foo?a=1");
    assert_eq!(get("https://example.com/").request_url(), "https://example.com/");
    assert_eq!(get("https://example.com:8443/x").request_url(), "https://example.com:8443/x");
    assert_eq!(get("http://example.com:443/").request_url(), "http://example.com:443/");

    let conn = testing::conn_with(
        TestAdapter::new(""),
        Method::GET,
        "/".parse().unwrap(),
        Headers::from_iter([("host", "[::1]:4000")]),
    );
    assert_eq!(conn.host(), "[::1]");
    assert_eq!(conn.port(), 4000);
    assert_eq!(conn.get_req_header("host"), Some("[::1]:4000"));
}

#[test]
fn test_req_headers() {
    let mut conn = get("/");
    conn.put_req_header("accept", "text/html").unwrap();
    assert_eq!(conn.get_req_header("accept"), Some("text/html"));
    conn.delete_req_header("accept");
    assert_eq!(conn.get_req_header("accept"), None);
}

// ===== Response headers =====

#[test]
fn test_resp_headers() {
    let mut conn = get("/");
    conn.delete_resp_header("cache-control").unwrap();

    conn.put_resp_header("x-a", "1").unwrap();
    conn.put_resp_header("x-b", "2").unwrap();
    conn.put_resp_header("x-a", "3").unwrap();
    assert_eq!(conn.resp_headers().iter().collect::<Vec<_>>(), [("x-a", "3"), ("x-b", "2")]);

    conn.prepend_resp_headers([("x-c", "4")]).unwrap();
    conn.merge_resp_headers([("x-b", "5"), ("x-d", "6")]).unwrap();
    assert_eq!(
        conn.resp_headers().iter().collect::<Vec<_>>(),
        [("x-c", "4"), ("x-a", "3"), ("x-b", "5"), ("x-d", "6")]
    );

    conn.update_resp_header("x-a", "init", |v| format!("{v},7")).unwrap();
    conn.update_resp_header("x-e", "init", |v| format!("{v},7")).unwrap();
    assert_eq!(conn.get_resp_header("x-a"), Some("3,7"));
    assert_eq!(conn.get_resp_header("x-e"), Some("init"));

    conn.put_resp_content_type("text/html", Some("utf-8")).unwrap();
    assert_eq!(conn.get_resp_header("content-type"), Some("text/html; charset=utf-8"));
    conn.put_resp_content_type("application/octet-stream", None).unwrap();
    assert_eq!(conn.get_resp_header("content-type"), Some("application/octet-stream"));
}

#[test]
fn test_header_validation() {
    let mut conn = get("/");
    conn.set_validate_header_keys(true);

    assert!(matches!(
        conn.put_resp_header("X-Foo", "bar"),
        Err(ConnError::InvalidHeader(InvalidHeader::Uppercase(_)))
    ));
    assert!(matches!(
        conn.put_resp_header("x-foo", "bar\r\nx-evil: 1"),
        Err(ConnError::InvalidHeader(InvalidHeader::Newline(_)))
    ));
    assert!(matches!(
        conn.prepend_resp_headers([("x-ok", "1"), ("x-bad", "\n")]),
        Err(ConnError::InvalidHeader(_))
    ));
    assert_eq!(conn.get_resp_header("x-ok"), None);

    conn.set_validate_header_keys(false);
    conn.put_resp_header("X-Foo", "bar").unwrap();
    assert!(conn.put_resp_header("x-foo", "\n").is_err());
}

// ===== State machine =====

#[tokio::test]
async fn test_resp_and_send() {
    let mut conn = get("/");
    conn.resp(StatusCode::OK, "hi").unwrap();
    assert_eq!(conn.state(), State::Set);
    assert_eq!(conn.status(), Some(StatusCode::OK));
    assert_eq!(conn.resp_body().unwrap(), "hi");

    // a set response can be replaced
    conn.resp(StatusCode::CREATED, "hello").unwrap();
    conn.send().await.unwrap();
    assert_eq!(conn.state(), State::Sent);
    assert_eq!(conn.resp_body().unwrap(), "hello");

    let sent = conn.adapter().sent().unwrap();
    assert_eq!(sent.status, StatusCode::CREATED);
    assert_eq!(sent.body, "hello");
    assert_eq!(
        sent.headers.get("cache-control"),
        Some("max-age=0, private, must-revalidate")
    );
}

#[tokio::test]
async fn test_send_unset() {
    let mut conn = get("/");
    assert!(matches!(conn.send().await, Err(ConnError::Argument(_))));
    assert_eq!(conn.state(), State::Unset);
}

#[tokio::test]
async fn test_sent_is_terminal() {
    let mut conn = get("/");
    conn.send_resp(StatusCode::OK, "done").await.unwrap();

    assert!(matches!(conn.put_resp_header("x-a", "1"), Err(ConnError::AlreadySent)));
    assert!(matches!(conn.delete_resp_header("x-a"), Err(ConnError::AlreadySent)));
    assert!(matches!(conn.put_status(StatusCode::OK), Err(ConnError::AlreadySent)));
    assert!(matches!(conn.resp(StatusCode::OK, ""), Err(ConnError::AlreadySent)));
    assert!(matches!(conn.send_resp(StatusCode::OK, "").await, Err(ConnError::AlreadySent)));
    assert!(matches!(conn.send().await, Err(ConnError::AlreadySent)));
    assert!(matches!(conn.register_before_send(|_| Ok(())), Err(ConnError::AlreadySent)));
    assert!(matches!(
        conn.put_resp_cookie("a", "1", CookieOptions::default()),
        Err(ConnError::AlreadySent)
    ));
    assert!(matches!(conn.send_chunked(StatusCode::OK).await, Err(ConnError::AlreadySent)));
    assert!(matches!(
        conn.inform(StatusCode::CONTINUE, [("x", "1")]).await,
        Err(ConnError::AlreadySent)
    ));
    assert_eq!(conn.adapter().sent().unwrap().body, "done");
}

#[tokio::test]
async fn test_before_send_order() {
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut conn = get("/");
    for name in ["a", "b", "c"] {
        let order = order.clone();
        conn.register_before_send(move |conn| {
            order.lock().unwrap().push(name);
            conn.put_resp_header(format!("x-{name}"), "1")?;
            Ok(())
        })
        .unwrap();
    }

    conn.send_resp(StatusCode::OK, "").await.unwrap();
    assert_eq!(*order.lock().unwrap(), ["c", "b", "a"]);

    let headers = &conn.adapter().sent().unwrap().headers;
    assert!(headers.contains_key("x-a") && headers.contains_key("x-b") && headers.contains_key("x-c"));
}

#[tokio::test]
async fn test_before_send_sees_pending_state() {
    let mut conn = get("/");
    conn.register_before_send(|conn| {
        assert_eq!(conn.state(), State::SetChunked);
        conn.put_status(StatusCode::PARTIAL_CONTENT)?;
        Ok(())
    })
    .unwrap();

    conn.send_chunked(StatusCode::OK).await.unwrap();
    assert_eq!(conn.adapter().sent().unwrap().status, StatusCode::PARTIAL_CONTENT);
}

#[tokio::test]
async fn test_before_send_state_change() {
    let mut conn = get("/");
    conn.register_before_send(|conn| {
        conn.resp(StatusCode::OK, "replaced")?;
        Ok(())
    })
    .unwrap();

    assert!(matches!(conn.send_chunked(StatusCode::OK).await, Err(ConnError::Argument(_))));
    assert!(conn.adapter().sent().is_none());
}

#[tokio::test]
async fn test_before_send_error() {
    let mut conn = get("/");
    conn.register_before_send(|_| Err(ConnError::argument("rejected"))).unwrap();
    assert!(matches!(conn.send_resp(StatusCode::OK, "").await, Err(ConnError::Argument(_))));
    assert!(conn.adapter().sent().is_none());
}

#[tokio::test]
async fn test_send_retry_after_adapter_error() {
    let calls = Arc::new(Mutex::new(0));

    let mut conn = testing::conn_with(
        TestAdapter::new("").with_failing_sends(1),
        Method::GET,
        "/".parse().unwrap(),
        Headers::new(),
    );
    conn.put_resp_cookie("a", "1", CookieOptions::default()).unwrap();
    let counter = calls.clone();
    conn.register_before_send(move |_| {
        *counter.lock().unwrap() += 1;
        Ok(())
    })
    .unwrap();

    conn.resp(StatusCode::OK, "hi").unwrap();
    assert!(matches!(conn.send().await, Err(ConnError::Adapter(AdapterError::Closed))));
    assert_eq!(conn.state(), State::Set);
    assert_eq!(conn.resp_body().unwrap(), "hi");
    assert!(!conn.resp_headers().contains_key("set-cookie"));

    conn.send().await.unwrap();
    assert_eq!(conn.state(), State::Sent);
    assert_eq!(*calls.lock().unwrap(), 1);

    let sent = conn.adapter().sent().unwrap();
    assert_eq!(sent.body, "hi");
    assert_eq!(sent.headers.get_all("set-cookie").count(), 1);
    assert_eq!(conn.resp_headers().get_all("set-cookie").count(), 1);
}

#[tokio::test]
async fn test_stream_after_adapter_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("file.txt");
    std::fs::write(&path, "hello").unwrap();

    let failing = || {
        testing::conn_with(
            TestAdapter::new("").with_failing_sends(1),
            Method::GET,
            "/".parse().unwrap(),
            Headers::new(),
        )
    };

    let mut conn = failing();
    assert!(matches!(
        conn.send_file(StatusCode::OK, &path, 0, None).await,
        Err(ConnError::Adapter(AdapterError::Closed))
    ));
    assert_eq!(conn.state(), State::SetFile);
    assert!(matches!(
        conn.send_file(StatusCode::OK, &path, 0, None).await,
        Err(ConnError::AlreadySent)
    ));
    assert!(conn.adapter().sent().is_none());

    let mut conn = failing();
    assert!(matches!(
        conn.send_chunked(StatusCode::OK).await,
        Err(ConnError::Adapter(AdapterError::Closed))
    ));
    assert_eq!(conn.state(), State::SetChunked);
    assert!(matches!(conn.send_chunked(StatusCode::OK).await, Err(ConnError::AlreadySent)));
    assert!(matches!(conn.chunk("data").await, Err(ConnError::Argument(_))));
    assert!(conn.adapter().sent().is_none());
}

#[tokio::test]
async fn test_send_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("file.txt");
    std::fs::write(&path, "hello world").unwrap();

    let mut conn = get("/");
    conn.resp(StatusCode::OK, "ignored").unwrap();
    conn.send_file(StatusCode::OK, &path, 6, None).await.unwrap();
    assert_eq!(conn.state(), State::File);
    assert_eq!(conn.adapter().sent().unwrap().body, "world");

    assert!(matches!(
        conn.send_file(StatusCode::OK, &path, 0, None).await,
        Err(ConnError::AlreadySent)
    ));

    let mut conn = get("/");
    conn.send_file(StatusCode::OK, &path, 0, Some(5)).await.unwrap();
    assert_eq!(conn.adapter().sent().unwrap().body, "hello");

    let mut conn = get("/");
    assert!(matches!(
        conn.send_file(StatusCode::OK, "foo\0bar", 0, None).await,
        Err(ConnError::Argument(_))
    ));
    assert_eq!(conn.state(), State::Unset);
}

#[tokio::test]
async fn test_send_chunked() {
    let mut conn = get("/");
    assert!(matches!(conn.chunk("early").await, Err(ConnError::Argument(_))));

    conn.send_chunked(StatusCode::OK).await.unwrap();
    assert_eq!(conn.state(), State::Chunked);
    conn.chunk("hello ").await.unwrap();
    conn.chunk("").await.unwrap();
    conn.chunk(Bytes::from_static(b"world")).await.unwrap();

    assert_eq!(conn.adapter().sent().unwrap().body, "hello world");
    assert!(matches!(conn.put_resp_header("x-a", "1"), Err(ConnError::AlreadySent)));
}

#[tokio::test]
async fn test_adapter_capabilities() {
    let mut conn = get("/");

    assert!(matches!(
        conn.inform(StatusCode::OK, [("x", "1")]).await,
        Err(ConnError::Argument(_))
    ));
    conn.inform(StatusCode::EARLY_HINTS, [("link", "</style.css>; rel=preload")])
        .await
        .unwrap();
    assert_eq!(conn.adapter().informs()[0].0, StatusCode::EARLY_HINTS);

    conn.push("/style.css", [("accept", "text/css")]).unwrap();
    assert_eq!(conn.adapter().pushes()[0].0, "/style.css");

    assert_eq!(conn.http_protocol(), Version::HTTP_11);
    assert_eq!(conn.peer_data().unwrap().port, 11131);

    conn.upgrade_adapter("websocket", &Headers::new()).unwrap();
    assert_eq!(conn.state(), State::Upgraded);
    assert_eq!(conn.adapter().upgraded(), Some("websocket"));
    assert!(matches!(conn.resp(StatusCode::OK, ""), Err(ConnError::AlreadySent)));

    let mut conn = get("/");
    conn.resp(StatusCode::OK, "").unwrap();
    assert!(matches!(
        conn.upgrade_adapter("websocket", &Headers::new()),
        Err(ConnError::AlreadySent)
    ));
}

// ===== Cookies =====

#[tokio::test]
async fn test_resp_cookies() {
    let mut conn = get("/");
    conn.put_resp_cookie("a", "1", CookieOptions::default()).unwrap();
    conn.put_resp_cookie(
        "b",
        "2",
        CookieOptions::default().with_http_only(false).with_same_site(SameSite::Strict),
    )
    .unwrap();
    conn.delete_resp_cookie("c", CookieOptions::default()).unwrap();

    // encoded at send time only
    assert!(!conn.resp_headers().contains_key("set-cookie"));

    conn.send_resp(StatusCode::OK, "").await.unwrap();
    let headers = &conn.adapter().sent().unwrap().headers;
    assert_eq!(
        headers.get_all("set-cookie").collect::<Vec<_>>(),
        [
            "a=1; Path=/; HttpOnly",
            "b=2; Path=/; SameSite=Strict",
            "c=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly",
        ]
    );
}

#[test]
fn test_secure_cookie_default() {
    let mut conn = get("https://example.com/");
    conn.put_resp_cookie("a", "1", CookieOptions::default()).unwrap();
    conn.put_resp_cookie("b", "2", CookieOptions::default().with_secure(false)).unwrap();
    assert_eq!(conn.resp_cookies()["a"].options.secure, Some(true));
    assert_eq!(conn.resp_cookies()["b"].options.secure, Some(false));

    let mut conn = get("/");
    conn.put_resp_cookie("a", "1", CookieOptions::default()).unwrap();
    assert_eq!(conn.resp_cookies()["a"].options.secure, Some(false));
}

#[tokio::test]
async fn test_cookie_overflow() {
    let mut conn = get("/");
    conn.put_resp_cookie("big", "x".repeat(5000), CookieOptions::default()).unwrap();

    match conn.send_resp(StatusCode::OK, "").await {
        Err(ConnError::CookieOverflow { name, size }) => {
            assert_eq!(name, "big");
            assert!(size > 4096);
        }
        other => panic!("expected cookie overflow, got {other:?}"),
    }
    assert!(conn.adapter().sent().is_none());
}

#[tokio::test]
async fn test_cookie_newline() {
    let mut conn = get("/");
    assert!(matches!(
        conn.put_resp_cookie("a", "x\r\nx-injected: 1", CookieOptions::default()),
        Err(ConnError::InvalidHeader(InvalidHeader::Newline(_)))
    ));
    assert!(matches!(
        conn.put_resp_cookie("a\n", "1", CookieOptions::default()),
        Err(ConnError::InvalidHeader(_))
    ));
    assert!(matches!(
        conn.put_resp_cookie("a", "1", CookieOptions::default().with_path("/\r\nx-injected: 1")),
        Err(ConnError::InvalidHeader(_))
    ));
    assert!(matches!(
        conn.delete_resp_cookie("a", CookieOptions::default().with_extra("Partitioned\n")),
        Err(ConnError::InvalidHeader(_))
    ));
    assert!(conn.resp_cookies().is_empty());

    conn.send_resp(StatusCode::OK, "").await.unwrap();
    let headers = &conn.adapter().sent().unwrap().headers;
    assert!(!headers.contains_key("set-cookie"));
    assert!(!headers.contains_key("x-injected"));
}

#[test]
fn test_fetch_cookies() {
    let mut conn = testing::conn_with(
        TestAdapter::new(""),
        Method::GET,
        "/".parse().unwrap(),
        Headers::from_iter([("cookie", "a=1; b=2"), ("cookie", "a=3; $Path=/; c=4")]),
    );

    conn.put_resp_cookie("d", "5", CookieOptions::default()).unwrap();
    conn.delete_resp_cookie("b", CookieOptions::default()).unwrap();
    conn.fetch_cookies();

    let req = conn.req_cookies().get().unwrap();
    assert_eq!(req.len(), 3);
    assert_eq!(req["a"], "1");

    let cookies = conn.cookies().get().unwrap();
    assert_eq!(cookies.keys().collect::<Vec<_>>(), ["a", "c", "d"]);

    // fetched cookies follow later response cookies
    conn.put_resp_cookie("a", "9", CookieOptions::default()).unwrap();
    conn.delete_resp_cookie("c", CookieOptions::default()).unwrap();
    let cookies = conn.cookies().get().unwrap();
    assert_eq!(cookies["a"], "9");
    assert!(!cookies.contains_key("c"));
}

// ===== Params =====

#[test]
fn test_fetch_query_params() {
    let mut conn = get("/?a=1&b[]=2&b[]=3");
    conn.fetch_query_params(&DecodeOptions::default()).unwrap();

    let params = conn.query_params().get().unwrap();
    assert_eq!(params["a"], "1");
    assert_eq!(params["b"], Value::List(vec!["2".into(), "3".into()]));
    assert_eq!(conn.param("a").unwrap(), "1");

    let mut conn = get("/?a=%zz");
    let err = conn.fetch_query_params(&DecodeOptions::default()).unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert!(!conn.query_params().is_fetched());
}

#[test]
fn test_params_precedence() {
    let mut conn = get("/?a=query&b=query&c=query");
    conn.fetch_query_params(&DecodeOptions::default()).unwrap();
    conn.put_body_params(Map::from([
        ("b".to_owned(), Value::from("body")),
        ("c".to_owned(), Value::from("body")),
    ]));
    conn.put_path_params(Map::from([("c".to_owned(), Value::from("path"))]));

    let params = conn.params().get().unwrap();
    assert_eq!(params["a"], "query");
    assert_eq!(params["b"], "body");
    assert_eq!(params["c"], "path");
}

#[test]
fn test_storage() {
    #[derive(Debug, PartialEq)]
    struct User(&'static str);

    let mut conn = get("/");
    conn.assign(User("john")).put_private(7u8);
    assert_eq!(conn.assigns().get::<User>(), Some(&User("john")));
    assert_eq!(conn.private().get::<u8>(), Some(&7));
    assert!(conn.assigns().get::<u8>().is_none());

    assert!(!conn.is_halted());
    conn.halt();
    assert!(conn.is_halted());
}

// ===== Body =====

#[tokio::test]
async fn test_read_body() {
    let mut conn = post("text/plain", "hello world", 3);

    let read = conn.read_body(&ReadOptions::default().with_length(5)).await.unwrap();
    assert_eq!(read, Read::More(Bytes::from_static(b"hello")));

    let read = conn.read_body(&ReadOptions::default()).await.unwrap();
    assert_eq!(read, Read::Ok(Bytes::from_static(b" world")));

    let read = conn.read_body(&ReadOptions::default()).await.unwrap();
    assert_eq!(read, Read::Ok(Bytes::new()));
}

#[tokio::test(start_paused = true)]
async fn test_read_body_timeout() {
    let mut conn = testing::conn_with(
        TestAdapter::new("never").with_stalled_body(),
        Method::POST,
        "/".parse().unwrap(),
        Headers::new(),
    );

    let options = ReadOptions::default().with_read_timeout(Duration::from_millis(10));
    let err = conn.read_body(&options).await.unwrap_err();
    assert!(matches!(err, AdapterError::Timeout));
    assert_eq!(ConnError::from(err).status(), StatusCode::REQUEST_TIMEOUT);
}

const MULTIPART: &str = "preamble\r\n\
    --xyz\r\n\
    content-disposition: form-data; name=\"a\"\r\n\
    \r\n\
    hello world\r\n\
    --xyz\r\n\
    content-disposition: form-data; name=\"b\"\r\n\
    Content-Type: text/plain\r\n\
    \r\n\
    \r\n\
    --xyz--\r\n";

#[tokio::test]
async fn test_read_parts() {
    for chunk_size in [1, 3, 7, 1024] {
        let mut conn = post("multipart/form-data; boundary=xyz", MULTIPART, chunk_size);
        let options = ReadOptions::default();

        let PartHeaders::Headers(headers) = conn.read_part_headers(&options).await.unwrap() else {
            panic!("expected first part");
        };
        assert_eq!(headers, [("content-disposition".to_owned(), "form-data; name=\"a\"".to_owned())]);
        assert_eq!(conn.read_part_body(&options).await.unwrap(), Read::Ok("hello world".into()));

        let PartHeaders::Headers(headers) = conn.read_part_headers(&options).await.unwrap() else {
            panic!("expected second part");
        };
        assert_eq!(headers[1], ("content-type".to_owned(), "text/plain".to_owned()));
        assert_eq!(conn.read_part_body(&options).await.unwrap(), Read::Ok(Bytes::new()));

        assert_eq!(conn.read_part_headers(&options).await.unwrap(), PartHeaders::Done);
        assert_eq!(conn.read_part_headers(&options).await.unwrap(), PartHeaders::Done);
    }
}

#[tokio::test]
async fn test_read_part_body_more() {
    let mut conn = post("multipart/form-data; boundary=xyz", MULTIPART, 2);
    let options = ReadOptions::default().with_length(4);
    conn.read_part_headers(&options).await.unwrap();

    let mut body = Vec::new();
    loop {
        match conn.read_part_body(&options).await.unwrap() {
            Read::More(chunk) => {
                assert!(chunk.len() > 4);
                body.extend_from_slice(&chunk);
            }
            Read::Ok(chunk) => {
                body.extend_from_slice(&chunk);
                break;
            }
        }
    }
    assert_eq!(body, b"hello world");
}

#[tokio::test]
async fn test_read_parts_terminated() {
    let body = "--xyz\r\ncontent-disposition: form-data; name=\"a\"\r\n\r\nunterminated";
    let mut conn = post("multipart/form-data; boundary=xyz", body, 4);
    let options = ReadOptions::default();

    conn.read_part_headers(&options).await.unwrap();
    match conn.read_part_body(&options).await {
        Err(ConnError::Multipart(MultipartError::TerminatedTooSoon)) => {}
        other => panic!("expected termination error, got {other:?}"),
    }

    let mut conn = post("multipart/form-data; boundary=xyz", "--xyz\r\nconten", 4);
    assert!(matches!(
        conn.read_part_headers(&options).await,
        Err(ConnError::Multipart(MultipartError::TerminatedTooSoon))
    ));
}

#[tokio::test]
async fn test_read_parts_boundary() {
    let options = ReadOptions::default();

    let mut conn = post("multipart/form-data", MULTIPART, 1024);
    assert!(matches!(conn.read_part_headers(&options).await, Err(ConnError::Argument(_))));

    let mut conn = post("text/plain; boundary=xyz", MULTIPART, 1024);
    assert!(matches!(conn.read_part_headers(&options).await, Err(ConnError::Argument(_))));

    let mut conn = testing::conn(Method::POST, "/".parse().unwrap(), MULTIPART);
    assert!(matches!(conn.read_part_body(&options).await, Err(ConnError::Argument(_))));
}

#[tokio::test]
async fn test_read_part_headers_too_large() {
    let body = format!(
        "--xyz\r\ncontent-disposition: form-data; name=\"a\"; x=\"{}\"\r\n\r\nbody\r\n--xyz--\r\n",
        "a".repeat(1000),
    );
    let mut conn = testing::conn_with(
        TestAdapter::new(body).with_chunk_size(64),
        Method::POST,
        "/".parse().unwrap(),
        Headers::from_iter([("content-type", "multipart/form-data; boundary=xyz")]),
    );

    let options = ReadOptions::part_headers().with_length(128);
    match conn.read_part_headers(&options).await {
        Err(ConnError::Multipart(err @ MultipartError::HeadersTooLarge(128))) => {
            assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        }
        other => panic!("expected headers too large, got {other:?}"),
    }
    assert_eq!(conn.read_part_headers(&options).await.unwrap(), PartHeaders::Done);
}

#[tokio::test]
async fn test_read_part_error_keeps_cursor() {
    let body = "--xyz\r\ncontent-disposition: form-data; name=\"a\"\r\n\r\nunterminated";
    let mut conn = post("multipart/form-data; boundary=xyz", body, 4);
    let options = ReadOptions::default();

    conn.read_part_headers(&options).await.unwrap();
    assert!(conn.read_part_body(&options).await.is_err());

    match conn.private().get::<Cursor>() {
        Some(Cursor::Active { boundary, buffer }) => {
            assert_eq!(boundary, "xyz");
            assert_eq!(buffer, "unterminated");
        }
        other => panic!("expected an active cursor, got {other:?}"),
    }

    // the restored cursor fails the same way instead of restarting the body
    assert!(matches!(
        conn.read_part_body(&options).await,
        Err(ConnError::Multipart(MultipartError::TerminatedTooSoon))
    ));
}
