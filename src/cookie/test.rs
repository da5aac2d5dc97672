use std::time::{Duration, SystemTime};

use super::*;

#[test]
fn test_decode() {
    macro_rules! test {
        ($($input:literal => [$($k:literal: $v:literal),*];)*) => {
            $(
                let expected: BTreeMap<String, String> =
                    BTreeMap::from([$(($k.to_owned(), $v.to_owned())),*]);
                assert_eq!(decode($input), expected, "decode({:?})", $input);
            )*
        };
    }

    test! {
        "" => [];
        "a=1" => ["a": "1"];
        " a = 1 ;b=2;" => ["a": "1", "b": "2"];
        "a=1; a=2" => ["a": "1"];
        "$Version=1; a=1; $Path=/" => ["a": "1"];
        "=1; a" => ["a": ""];
        "a=b=c" => ["a": "b=c"];
    }
}

#[test]
fn test_decode_into_keeps_existing() {
    let mut cookies = decode("a=1");
    decode_into(&mut cookies, "a=2; b=3");
    assert_eq!(cookies["a"], "1");
    assert_eq!(cookies["b"], "3");
}

#[test]
fn test_encode() {
    let epoch = SystemTime::UNIX_EPOCH;
    let cookie = |options| ResponseCookie { value: "v".into(), options };

    assert_eq!(
        encode_at("k", &cookie(CookieOptions::default().with_http_only(false)), epoch),
        "k=v; Path=/"
    );
    assert_eq!(
        encode_at(
            "k",
            &cookie(
                CookieOptions::default()
                    .with_path("/app")
                    .with_domain("example.com")
                    .with_secure(true)
                    .with_same_site(SameSite::Lax)
                    .with_extra("Partitioned")
            ),
            epoch
        ),
        "k=v; Path=/app; Domain=example.com; Secure; HttpOnly; SameSite=Lax; Partitioned"
    );
    assert_eq!(
        encode_at("k", &cookie(CookieOptions::default().with_secure(false)), epoch),
        "k=v; Path=/; HttpOnly"
    );
}

#[test]
fn test_encode_expires() {
    let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_451_606_400);
    let cookie = |options| ResponseCookie { value: "v".into(), options };

    // derived from max-age
    assert_eq!(
        encode_at("k", &cookie(CookieOptions::default().with_max_age(60)), now),
        "k=v; Path=/; Max-Age=60; Expires=Fri, 01 Jan 2016 00:01:00 GMT; HttpOnly"
    );

    // explicit expires wins
    assert_eq!(
        encode_at(
            "k",
            &cookie(CookieOptions::default().with_max_age(60).with_expires(now)),
            now
        ),
        "k=v; Path=/; Max-Age=60; Expires=Fri, 01 Jan 2016 00:00:00 GMT; HttpOnly"
    );

    assert_eq!(
        encode_at("k", &cookie(CookieOptions::default().with_expires(now)), now),
        "k=v; Path=/; Expires=Fri, 01 Jan 2016 00:00:00 GMT; HttpOnly"
    );
}

#[test]
fn test_deleted() {
    let cookie = ResponseCookie::deleted(CookieOptions::default());
    assert!(cookie.is_deleted());
    assert_eq!(
        encode_at("k", &cookie, SystemTime::now()),
        "k=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly"
    );
}
