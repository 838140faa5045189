//! Writing responses to the client.

use std::path::Path;

use bytes::{BufMut, BytesMut};
use log::{error, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    error::{Error, ErrorCode},
    fs::{Filesystem, Stat},
    gophermap::Gophermap,
    serialize::{Encodable, ErrorResponse, TransferHeader},
    utils::Result,
};

/// Message for a selector that does not name an item. The root is shown as `/`.
pub fn item_not_found(selector: &str) -> (ErrorCode, String) {
    let selector = if selector.is_empty() { "/" } else { selector };
    (
        ErrorCode::ItemNotFound,
        format!("The item {selector} could not be found on this server."),
    )
}

/// Message for a transient failure.
pub fn temporary_error(reason: &str) -> (ErrorCode, String) {
    (
        ErrorCode::TemporaryError,
        format!("Your request couldn't be served: {reason}. Please try again later."),
    )
}

/// An item-moved error carries the new selector as its message.
pub fn item_moved(new_selector: &str) -> (ErrorCode, String) {
    (ErrorCode::ItemMoved, new_selector.to_owned())
}

/// Message for a request that failed with `e`.
///
/// The real reason of a not-found response is never revealed, so a
/// selector escaping the root looks exactly like a missing item.
pub fn describe(e: &Error, selector: &str) -> (ErrorCode, String) {
    match e.error_code() {
        ErrorCode::ItemNotFound => item_not_found(selector),
        ErrorCode::TemporaryError => temporary_error("the server failed to read the item"),
        // No `Error` maps to this code; redirects are sent with `item_moved` directly.
        ErrorCode::ItemMoved => item_moved(selector),
        ErrorCode::Unknown => {
            let reason = match e {
                Error::SelectorTooLong(max) => {
                    format!("Malformed request: selector longer than {max} bytes.")
                }
                Error::SelectorTimeout(limit) => {
                    format!("Malformed request: selector not received within {limit:?}.")
                }
                _ => "Internal server error.".to_owned(),
            };
            (ErrorCode::Unknown, reason)
        }
    }
}

async fn write_encoded<W, T>(writer: &mut W, value: &T) -> Result<usize>
where
    W: AsyncWrite + Unpin + ?Sized,
    T: Encodable + ?Sized,
{
    let mut buf = BytesMut::with_capacity(4096).writer();
    let n = value.encode(&mut buf)?;
    writer.write_all(&buf.into_inner().freeze()).await?;
    Ok(n)
}

/// Serialize `map` and send it.
///
/// The listing is serialized completely before anything is written, so an
/// invalid item produces [`Error::InvalidItem`] with nothing sent yet.
pub async fn send_gophermap<W>(writer: &mut W, map: &Gophermap) -> Result<usize>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    write_encoded(writer, map).await
}

/// Stream an opened file to the client.
///
/// For Gopher+ clients the body is prefixed with `+<size>\r\n`, where `size`
/// is taken from `stat` at open time, and at most `size` bytes are sent.
/// Bytes written before an I/O failure have already reached the client.
pub async fn send_stream<W, F>(
    writer: &mut W,
    file: F,
    stat: Stat,
    gopher_plus: bool,
) -> Result<u64>
where
    W: AsyncWrite + Unpin + ?Sized,
    F: AsyncRead + Unpin,
{
    let sent = if gopher_plus {
        write_encoded(writer, &TransferHeader { size: stat.size }).await?;
        tokio::io::copy(&mut file.take(stat.size), writer).await?
    } else {
        let mut file = file;
        tokio::io::copy(&mut file, writer).await?
    };
    if gopher_plus && sent < stat.size {
        warn!("file shrank during transfer: sent {} of {} bytes", sent, stat.size);
    }
    Ok(sent)
}

/// Open `path` through `fs` and send its content.
pub async fn send_file<Fs, W>(
    fs: &Fs,
    writer: &mut W,
    path: &Path,
    gopher_plus: bool,
) -> Result<u64>
where
    Fs: Filesystem + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let (file, stat) = fs
        .open(path)
        .await
        .map_err(|e| Error::from_lookup(path, e))?;
    send_stream(writer, file, stat, gopher_plus).await
}

/// Send an error response.
///
/// A failure while sending is logged and discarded: the request is
/// answered either way and there is no other channel left to report on.
pub async fn send_error<W>(
    writer: &mut W,
    admin: &str,
    (code, message): (ErrorCode, String),
    gopher_plus: bool,
) where
    W: AsyncWrite + Unpin + ?Sized,
{
    let response = ErrorResponse {
        code,
        message: &message,
        admin,
        gopher_plus,
    };
    let sent = match write_encoded(writer, &response).await {
        Ok(_) => writer.flush().await.map_err(Error::from),
        Err(e) => Err(e),
    };
    if let Err(e) = sent {
        error!("could not send error {:?} to client: {}", message, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fs::LocalFs, gophertype::ItemType, item::Item};
    use std::{path::PathBuf, time::Duration};

    fn sample_file() -> (tempfile::TempDir, PathBuf, Vec<u8>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        let content: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        std::fs::write(&path, &content).unwrap();
        (dir, path, content)
    }

    #[tokio::test]
    async fn plain_file_is_verbatim() {
        let (_dir, path, content) = sample_file();
        let mut out = Vec::new();
        let sent = send_file(&LocalFs, &mut out, &path, false).await.unwrap();
        assert_eq!(sent, content.len() as u64);
        assert_eq!(out, content);
    }

    #[tokio::test]
    async fn gopher_plus_file_has_size_prefix() {
        let (_dir, path, content) = sample_file();
        let mut out = Vec::new();
        send_file(&LocalFs, &mut out, &path, true).await.unwrap();

        let mut expected = b"+10000\r\n".to_vec();
        expected.extend_from_slice(&content);
        assert_eq!(out, expected);
    }

    #[tokio::test]
    async fn body_never_exceeds_announced_size() {
        let stat = Stat {
            is_dir: false,
            size: 3,
        };
        let mut out = Vec::new();
        send_stream(&mut out, &b"abcdef"[..], stat, true).await.unwrap();
        assert_eq!(out, b"+3\r\nabc");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Vec::new();
        let result = send_file(&LocalFs, &mut out, &dir.path().join("nope"), true).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn invalid_listing_sends_nothing() {
        let item = Item {
            item_type: ItemType::Text,
            display: "a.txt".to_owned(),
            selector: "/a.txt".to_owned(),
            host: String::new(),
            port: 70,
            location: PathBuf::from("/srv/a.txt"),
            gopher_plus: false,
        };
        let mut out = Vec::new();
        let result = send_gophermap(&mut out, &Gophermap::new(vec![item], false)).await;
        assert!(matches!(result, Err(Error::InvalidItem(_))));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn not_found_in_both_variants() {
        let mut out = Vec::new();
        send_error(&mut out, "me@example.org", item_not_found("nope.txt"), false).await;
        assert_eq!(
            out,
            b"3The item nope.txt could not be found on this server. \
              Server admin: [me@example.org].\r\n."
        );

        let mut out = Vec::new();
        send_error(&mut out, "me@example.org", item_not_found("nope.txt"), true).await;
        assert_eq!(
            out,
            b"--1\r\n1 [me@example.org]\r\n\
              The item nope.txt could not be found on this server.\r\n.\r\n"
        );
    }

    #[tokio::test]
    async fn moved_carries_new_selector() {
        let mut out = Vec::new();
        send_error(&mut out, "me", item_moved("/new/place"), true).await;
        assert_eq!(out, b"--1\r\n3 [me]\r\n/new/place\r\n.\r\n");
    }

    #[tokio::test]
    async fn failed_error_delivery_is_swallowed() {
        let (client, mut server) = tokio::io::duplex(8);
        drop(client);
        send_error(&mut server, "me", temporary_error("busy"), false).await;
    }

    #[test]
    fn root_not_found_names_the_root() {
        let (code, message) = describe(&Error::NotFound(PathBuf::from("/srv")), "");
        assert_eq!(code, ErrorCode::ItemNotFound);
        assert_eq!(message, "The item / could not be found on this server.");
    }

    #[test]
    fn errors_never_describe_a_move() {
        let errors = [
            Error::PathEscape {
                selector: "..".to_owned(),
            },
            Error::NotFound(PathBuf::from("/srv/x")),
            Error::SelectorTooLong(16),
            Error::SelectorTimeout(Duration::from_secs(1)),
            Error::InvalidItem("host missing"),
            Error::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe)),
        ];
        for e in &errors {
            assert_ne!(describe(e, "/x").0, ErrorCode::ItemMoved, "{e:?}");
        }
    }

    #[test]
    fn descriptions_hide_escape_reason() {
        let escape = Error::PathEscape {
            selector: "../secret".to_owned(),
        };
        assert_eq!(describe(&escape, "../secret"), item_not_found("../secret"));

        let (code, message) = describe(&Error::SelectorTimeout(Duration::from_secs(5)), "");
        assert_eq!(code, ErrorCode::Unknown);
        assert!(message.starts_with("Malformed request"));

        let (code, message) = describe(&Error::InvalidItem("host missing"), "x");
        assert_eq!(code, ErrorCode::Unknown);
        assert_eq!(message, "Internal server error.");
    }
}
