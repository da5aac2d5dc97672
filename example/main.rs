use http::{Method, StatusCode};
use plume::{
    Conn, ConnError, Parsers, ParsersOptions, Pipeline, from_fn,
    cookie::CookieOptions,
    headers::Headers,
    query::Value,
    testing::{self, TestAdapter},
};

#[tokio::main]
async fn main() -> Result<(), ConnError> {
    env_logger::init();

    let pipeline = Pipeline::new()
        .plug(Parsers::new(ParsersOptions::default()))
        .plug(from_fn(session))
        .plug(from_fn(greet));

    let adapter = TestAdapter::new("name=plume&langs[]=rust&langs[]=elixir").with_chunk_size(8);
    let conn = testing::conn_with(
        adapter,
        Method::POST,
        "/greet?lang=en".parse().unwrap(),
        Headers::from_iter([
            ("content-type", "application/x-www-form-urlencoded"),
            ("cookie", "visits=2"),
        ]),
    );

    let conn = pipeline.run(conn).await?;

    let sent = conn.adapter().sent().unwrap();
    println!("< {}", sent.status);
    for (key, value) in sent.headers.iter() {
        println!("< {key}: {value}");
    }
    println!();
    println!("{}", String::from_utf8_lossy(&sent.body));
    Ok(())
}

async fn session(mut conn: Conn<TestAdapter>) -> Result<Conn<TestAdapter>, ConnError> {
    conn.fetch_cookies();
    let visits = conn
        .cookies()
        .get()
        .and_then(|cookies| cookies.get("visits"))
        .and_then(|visits| visits.parse::<u32>().ok())
        .unwrap_or(0);

    conn.put_resp_cookie("visits", (visits + 1).to_string(), CookieOptions::default())?;
    conn.register_before_send(|conn| {
        conn.put_resp_header("x-powered-by", "plume")?;
        Ok(())
    })?;
    Ok(conn)
}

async fn greet(mut conn: Conn<TestAdapter>) -> Result<Conn<TestAdapter>, ConnError> {
    let name = conn.param("name").and_then(Value::as_str).unwrap_or("stranger");
    let langs = conn
        .param("langs")
        .and_then(Value::as_list)
        .map(|langs| langs.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(", "))
        .unwrap_or_default();
    let body = format!("hello {name}, you write {langs}");

    conn.put_resp_content_type("text/plain", Some("utf-8"))?;
    conn.send_resp(StatusCode::OK, body).await?;
    conn.halt();
    Ok(conn)
}
