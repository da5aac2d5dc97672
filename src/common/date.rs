use std::time::{SystemTime, UNIX_EPOCH};

/// Latest representable date, `Fri, 31 Dec 9999 23:59:59 GMT`.
const MAX_SECS: u64 = 253402300799;

/// Create [httpdate][rfc] with given time, the format used by cookie `Expires`.
///
/// Times before the unix epoch are clamped to the epoch, and times after year 9999 are clamped to
/// the last second of 9999.
///
/// [rfc]: <https://datatracker.ietf.org/doc/html/rfc9110#section-5.6.7>
pub fn httpdate(v: SystemTime) -> [u8; 29] {
    let secs_since_epoch = v
        .duration_since(UNIX_EPOCH)
        .map(|dur| dur.as_secs())
        .unwrap_or_default()
        .min(MAX_SECS);

    /* 2000-03-01 (mod 400 year, immediately after feb29 */

    const LEAPOCH: i64 = 11017;
    const DAYS_PER_400Y: i64 = 365 * 400 + 97;
    const DAYS_PER_100Y: i64 = 365 * 100 + 24;
    const DAYS_PER_4Y: i64 = 365 * 4 + 1;

    let days = (secs_since_epoch / 86400) as i64 - LEAPOCH;
    let secs_of_day = secs_since_epoch % 86400;

    let mut qc_cycles = days / DAYS_PER_400Y;
    let mut remdays = days % DAYS_PER_400Y;

    if remdays < 0 {
        remdays += DAYS_PER_400Y;
        qc_cycles -= 1;
    }

    let mut c_cycles = remdays / DAYS_PER_100Y;
    if c_cycles == 4 {
        c_cycles -= 1;
    }
    remdays -= c_cycles * DAYS_PER_100Y;

    let mut q_cycles = remdays / DAYS_PER_4Y;
    if q_cycles == 25 {
        q_cycles -= 1;
    }
    remdays -= q_cycles * DAYS_PER_4Y;

    let mut remyears = remdays / 365;
    if remyears == 4 {
        remyears -= 1;
    }
    remdays -= remyears * 365;

    let mut year = 2000 + remyears + 4 * q_cycles + 100 * c_cycles + 400 * qc_cycles;

    // months starting from march
    const MONTHS: [i64; 12] = [31, 30, 31, 30, 31, 31, 30, 31, 30, 31, 31, 29];
    let mut mon = 0;
    for mon_len in MONTHS {
        mon += 1;
        if remdays < mon_len {
            break;
        }
        remdays -= mon_len;
    }
    let mday = remdays + 1;
    let mon = if mon + 2 > 12 {
        year += 1;
        mon - 10
    } else {
        mon + 2
    };

    let mut wday = (3 + days) % 7;
    if wday <= 0 {
        wday += 7
    };

    const WDAYS: [&[u8; 3]; 7] = [b"Mon", b"Tue", b"Wed", b"Thu", b"Fri", b"Sat", b"Sun"];
    const MONS: [&[u8; 3]; 12] = [
        b"Jan", b"Feb", b"Mar", b"Apr", b"May", b"Jun",
        b"Jul", b"Aug", b"Sep", b"Oct", b"Nov", b"Dec",
    ];

    let mut buf: [u8; 29] = *b"ddd, 00 mmm 1970 00:00:00 GMT";

    buf[..3].copy_from_slice(WDAYS[(wday - 1) as usize]);

    let day = mday as u8;
    buf[5] = b'0' + (day / 10);
    buf[6] = b'0' + (day % 10);

    buf[8..11].copy_from_slice(MONS[(mon - 1) as usize]);

    buf[12] = b'0' + (year / 1000) as u8;
    buf[13] = b'0' + (year / 100 % 10) as u8;
    buf[14] = b'0' + (year / 10 % 10) as u8;
    buf[15] = b'0' + (year % 10) as u8;

    let hour = (secs_of_day / 3600) as u8;
    buf[17] = b'0' + (hour / 10);
    buf[18] = b'0' + (hour % 10);

    let min = ((secs_of_day % 3600) / 60) as u8;
    buf[20] = b'0' + (min / 10);
    buf[21] = b'0' + (min % 10);

    let sec = (secs_of_day % 60) as u8;
    buf[23] = b'0' + (sec / 10);
    buf[24] = b'0' + (sec % 10);

    buf
}
