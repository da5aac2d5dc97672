//! Shared utilities.
mod date;
mod extensions;

pub use date::httpdate;
pub use extensions::Extensions;

use bytes::{Bytes, BytesMut};

/// Join two buffers, avoiding a copy when either side is empty.
pub(crate) fn concat(head: Bytes, tail: Bytes) -> Bytes {
    if head.is_empty() {
        return tail;
    }
    if tail.is_empty() {
        return head;
    }
    let mut buf = BytesMut::with_capacity(head.len() + tail.len());
    buf.extend_from_slice(&head);
    buf.extend_from_slice(&tail);
    buf.freeze()
}
