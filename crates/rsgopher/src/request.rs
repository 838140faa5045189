//! Reading the client's selector.
//!
//! A Gopher client ends its request with `\r\n`, a Gopher+ client with
//! `\r\n\t+`. Both contain `\r\n`, and the trailing `+` may arrive in a later
//! read, so a complete `\r\n` is not enough to stop: the reader keeps going for
//! a short grace window to see whether `\t+` follows.

use std::time::Duration;

use log::trace;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    time::{Instant, timeout},
};

use crate::{error::Error, io_err, res, utils::Result};

/// Gopher+ request terminator.
pub const GOPHER_PLUS_TERMINATOR: &[u8] = b"\r\n\t+";

/// Upper bound for a single read attempt. Reads are retried until the
/// overall selector timeout is used up.
const READ_SLICE: Duration = Duration::from_millis(250);

/// A parsed client request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    /// Selector without its terminator. Empty means the root listing.
    pub selector: String,
    /// Whether the client announced Gopher+ support.
    pub gopher_plus: bool,
}

impl Request {
    pub fn is_root(&self) -> bool {
        self.selector.is_empty()
    }
}

/// Where the accumulated bytes stand with respect to a terminator.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Scan {
    /// No terminator at the end of the buffer.
    Open,
    /// A plain terminator of the given length, possibly followed by a `\t`
    /// that may still become `\t+`.
    Plain(usize),
    /// A complete Gopher+ terminator.
    GopherPlus,
}

fn scan(buf: &[u8]) -> Scan {
    if buf.ends_with(GOPHER_PLUS_TERMINATOR) {
        Scan::GopherPlus
    } else if buf.ends_with(b"\r\n") {
        Scan::Plain(2)
    } else if buf.ends_with(b"\r\n\t") {
        Scan::Plain(3)
    } else if buf.ends_with(b"\n") {
        Scan::Plain(1)
    } else {
        Scan::Open
    }
}

fn finish(buf: &[u8], terminator: usize, gopher_plus: bool) -> Request {
    let selector = String::from_utf8_lossy(&buf[..buf.len() - terminator]).into_owned();
    Request {
        selector,
        gopher_plus,
    }
}

/// Read the selector from `reader`.
///
/// At most `max_len` bytes are accepted; more without a terminator fails with
/// [`Error::SelectorTooLong`]. The selector must be complete within `limit`
/// of cumulative waiting, otherwise this fails with [`Error::SelectorTimeout`].
/// Once a plain `\r\n` has been received the reader waits at most `grace`
/// (never past `limit`) for a Gopher+ `\t+`, then settles on plain Gopher.
///
/// The reader is only borrowed; no deadline outlives this call.
pub async fn read_request<R>(
    reader: &mut R,
    max_len: usize,
    limit: Duration,
    grace: Duration,
) -> Result<Request>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let start = Instant::now();
    let deadline = start + limit;
    let mut buf = vec![0u8; max_len];
    let mut len = 0;
    // Set once a plain terminator is seen; cleared if more data follows it.
    let mut plain_deadline: Option<Instant> = None;

    loop {
        let now = Instant::now();
        let wait_until = plain_deadline.unwrap_or(deadline).min(deadline);
        if now >= wait_until {
            return match scan(&buf[..len]) {
                Scan::Plain(n) => Ok(finish(&buf[..len], n, false)),
                _ => Err(Error::SelectorTimeout(limit)),
            };
        }

        if len == buf.len() {
            return match scan(&buf[..len]) {
                Scan::Plain(n) => Ok(finish(&buf[..len], n, false)),
                _ => Err(Error::SelectorTooLong(max_len)),
            };
        }

        let slice = (wait_until - now).min(READ_SLICE);
        let n = match timeout(slice, reader.read(&mut buf[len..])).await {
            Ok(read) => read?,
            // Nothing arrived in this slice, the deadlines are checked above.
            Err(_) => continue,
        };

        if n == 0 {
            return match scan(&buf[..len]) {
                Scan::Plain(n) => Ok(finish(&buf[..len], n, false)),
                Scan::GopherPlus => {
                    Ok(finish(&buf[..len], GOPHER_PLUS_TERMINATOR.len(), true))
                }
                Scan::Open => res!(io_err!(
                    UnexpectedEof,
                    "connection closed before the selector was complete"
                )),
            };
        }
        len += n;
        trace!("selector buffer: {:?}", String::from_utf8_lossy(&buf[..len]));

        match scan(&buf[..len]) {
            Scan::GopherPlus => {
                return Ok(finish(&buf[..len], GOPHER_PLUS_TERMINATOR.len(), true));
            }
            Scan::Plain(_) => {
                plain_deadline.get_or_insert_with(|| Instant::now() + grace);
            }
            Scan::Open => plain_deadline = None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    const LIMIT: Duration = Duration::from_secs(2);
    const GRACE: Duration = Duration::from_millis(50);

    async fn read(input: &[u8]) -> Result<Request> {
        let mut reader = input;
        read_request(&mut reader, 64, LIMIT, GRACE).await
    }

    #[tokio::test]
    async fn selector_extraction() {
        let cases: &[(&[u8], &str, bool)] = &[
            (b"\r\n", "", false),
            (b"\r\n\t+", "", true),
            (b"foo.txt\r\n", "foo.txt", false),
            (b"test.unknownfiletype\r\n\t+", "test.unknownfiletype", true),
            (b"/docs/a b.txt\r\n", "/docs/a b.txt", false),
            (b"lf-only\n", "lf-only", false),
        ];
        for (input, selector, gopher_plus) in cases {
            let req = read(input).await.unwrap();
            assert_eq!(req.selector, *selector, "input {input:?}");
            assert_eq!(req.gopher_plus, *gopher_plus, "input {input:?}");
        }
    }

    #[tokio::test]
    async fn empty_selector_is_root() {
        assert!(read(b"\r\n").await.unwrap().is_root());
        assert!(!read(b"x\r\n").await.unwrap().is_root());
    }

    #[tokio::test]
    async fn too_long_without_terminator() {
        let input = vec![b'a'; 100];
        assert!(matches!(read(&input).await, Err(Error::SelectorTooLong(64))));
    }

    #[tokio::test]
    async fn full_buffer_with_terminator_is_plain() {
        let mut input = vec![b'a'; 62];
        input.extend_from_slice(b"\r\n");
        let req = read(&input).await.unwrap();
        assert_eq!(req.selector.len(), 62);
        assert!(!req.gopher_plus);
    }

    #[tokio::test]
    async fn eof_before_terminator() {
        assert!(matches!(read(b"partial").await, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn plus_in_a_later_write() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let writer = tokio::spawn(async move {
            client.write_all(b"foo.txt\r\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            client.write_all(b"\t").await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            client.write_all(b"+").await.unwrap();
            client
        });

        let req = read_request(&mut server, 64, LIMIT, Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(
            req,
            Request {
                selector: "foo.txt".to_owned(),
                gopher_plus: true,
            }
        );
        drop(writer.await.unwrap());
    }

    #[tokio::test]
    async fn selector_split_across_writes() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let writer = tokio::spawn(async move {
            for chunk in [&b"do"[..], b"cs/", b"a.txt", b"\r", b"\n"] {
                client.write_all(chunk).await.unwrap();
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            client
        });

        let req = read_request(&mut server, 64, LIMIT, GRACE).await.unwrap();
        assert_eq!(req.selector, "docs/a.txt");
        assert!(!req.gopher_plus);
        drop(writer.await.unwrap());
    }

    #[tokio::test]
    async fn plain_client_settles_after_grace() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(b"foo\r\n").await.unwrap();

        let started = Instant::now();
        let req = read_request(&mut server, 64, LIMIT, GRACE).await.unwrap();
        assert_eq!(req.selector, "foo");
        assert!(!req.gopher_plus);
        assert!(started.elapsed() < LIMIT);
        drop(client);
    }

    #[tokio::test]
    async fn stalled_client_times_out() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(b"never finished").await.unwrap();

        let result = read_request(&mut server, 64, Duration::from_millis(100), GRACE).await;
        assert!(matches!(result, Err(Error::SelectorTimeout(_))));
        drop(client);
    }

    #[tokio::test]
    async fn data_after_terminator_reopens_the_request() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(b"a\r\nb").await.unwrap();

        let result = read_request(&mut server, 64, Duration::from_millis(100), GRACE).await;
        assert!(matches!(result, Err(Error::SelectorTimeout(_))));
        drop(client);
    }
}
