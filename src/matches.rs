macro_rules! byte_map {
    {
        $(#[$meta:meta])*
        $vis:vis const fn $fn_id:ident($byte:ident:$u8:ty) { $e:expr }
    } => {
        $(#[$meta])*
        $vis const fn $fn_id($byte: $u8) -> bool {
            const PAT: [bool; 256] = {
                let mut bytes = [false; 256];
                let mut $byte = 0u8;
                const fn filter($byte: $u8) -> bool {
                    $e
                }
                loop {
                    bytes[$byte as usize] = filter($byte);
                    if $byte == 255 {
                        break;
                    }
                    $byte += 1;
                }
                bytes
            };
            PAT[$byte as usize]
        }
    };
}

byte_map! {
    /// Bytes that are kept as is by `application/x-www-form-urlencoded` serialization.
    ///
    /// unreserved = ALPHA / DIGIT / "-" / "." / "_" / "~"
    #[inline(always)]
    pub(crate) const fn form_unreserved(byte: u8) {
        byte.is_ascii_alphanumeric()
        || matches!(byte, b'-' | b'.' | b'_' | b'~')
    }
}

/// Returns the value of an ascii hex digit.
#[inline]
pub(crate) const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Uppercase hex digits, indexed by nibble.
pub(crate) const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Returns the offset of the first occurrence of `needle` in `haystack`.
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    let Some((&first, rest)) = needle.split_first() else {
        return Some(0);
    };
    let last_start = haystack.len().checked_sub(needle.len())?;

    let mut offset = 0;
    while offset <= last_start {
        let pos = haystack[offset..=last_start].iter().position(|&b| b == first)?;
        let start = offset + pos;
        if &haystack[start + 1..start + needle.len()] == rest {
            return Some(start);
        }
        offset = start + 1;
    }
    None
}

#[test]
fn test_find() {
    assert_eq!(find(b"hello world", b"world"), Some(6));
    assert_eq!(find(b"hello world", b"hello"), Some(0));
    assert_eq!(find(b"hello world", b"d"), Some(10));
    assert_eq!(find(b"hello", b"hello world"), None);
    assert_eq!(find(b"aaab", b"aab"), Some(1));
    assert_eq!(find(b"\r\n--\r\n--B", b"\r\n--B"), Some(4));
    assert_eq!(find(b"abc", b""), Some(0));
    assert_eq!(find(b"", b"a"), None);
}

#[test]
fn test_form_unreserved() {
    assert!(form_unreserved(b'a'));
    assert!(form_unreserved(b'Z'));
    assert!(form_unreserved(b'7'));
    assert!(form_unreserved(b'~'));
    assert!(!form_unreserved(b' '));
    assert!(!form_unreserved(b'['));
    assert!(!form_unreserved(b'&'));
    assert!(!form_unreserved(0xff));
}
