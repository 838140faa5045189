//! Serialize Gopher responses into their wire representation.
//!
//! Clients parse these byte layouts positionally (type character, then
//! tab-delimited fields), so every terminator and separator is fixed.

use std::io::Write;

use crate::{
    error::ErrorCode, gophermap::Gophermap, gophertype::ItemType, item::Item, utils::Result,
};

/// Item terminator for plain Gopher listings.
pub const CRLF: &str = "\r\n";

/// Item terminator for Gopher+ listings. The `\t+` marks the item as Gopher+ capable.
pub const GOPHER_PLUS_CRLF: &str = "\t+\r\n";

/// Marks the end of a listing. Not followed by a terminator.
pub const LAST_LINE: &str = ".";

/// Trait representing a type which can be serialized into a Gopher response
pub trait Encodable {
    /// Encode self to w and return the number of bytes encoded
    fn encode<W: Write>(&self, w: &mut W) -> Result<usize>;
}

/// Write `s` and return its length.
fn put<W: Write>(w: &mut W, s: &str) -> Result<usize> {
    w.write_all(s.as_bytes())?;
    Ok(s.len())
}

/// Write the line of an already validated item.
fn put_item<W: Write>(w: &mut W, item: &Item) -> Result<usize> {
    let line = format!(
        "{}{}\t{}\t{}\t{}",
        item.item_type, item.display, item.selector, item.host, item.port
    );
    put(w, &line)
}

/// An item line without its terminator:
/// `<type><display>\t<selector>\t<host>\t<port>`
impl Encodable for Item {
    fn encode<W: Write>(&self, w: &mut W) -> Result<usize> {
        self.validate()?;
        put_item(w, self)
    }
}

impl Encodable for Gophermap {
    fn encode<W: Write>(&self, w: &mut W) -> Result<usize> {
        // Validate everything up front so an invalid item never
        // leaves a half-written listing behind.
        for item in self.items() {
            item.validate()?;
        }

        let terminator = if self.gopher_plus() {
            GOPHER_PLUS_CRLF
        } else {
            CRLF
        };

        let mut bytes = 0;
        for item in self.items() {
            bytes += put_item(w, item)?;
            bytes += put(w, terminator)?;
        }
        bytes += put(w, LAST_LINE)?;
        Ok(bytes)
    }
}

/// Size prefix of a Gopher+ file transfer: `+<size>\r\n`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TransferHeader {
    pub size: u64,
}

impl Encodable for TransferHeader {
    fn encode<W: Write>(&self, w: &mut W) -> Result<usize> {
        put(w, &format!("+{}{}", self.size, CRLF))
    }
}

/// An error response.
///
/// Gopher+: `--1\r\n<code> [<admin>]\r\n<message>\r\n.\r\n`.
/// Plain Gopher: `3<message> Server admin: [<admin>].\r\n.`, a single type `3`
/// line without tab-delimited fields.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ErrorResponse<'a> {
    pub code: ErrorCode,
    pub message: &'a str,
    pub admin: &'a str,
    pub gopher_plus: bool,
}

impl Encodable for ErrorResponse<'_> {
    fn encode<W: Write>(&self, w: &mut W) -> Result<usize> {
        let response = if self.gopher_plus {
            format!(
                "--1{CRLF}{} [{}]{CRLF}{}{CRLF}{LAST_LINE}{CRLF}",
                self.code, self.admin, self.message
            )
        } else {
            format!(
                "{}{} Server admin: [{}].{CRLF}{LAST_LINE}",
                ItemType::Error,
                self.message,
                self.admin
            )
        };
        put(w, &response)
    }
}

/// Helper function to serialize a response into a fresh buffer
pub fn to_bytes<T: Encodable + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    value.encode(&mut buf)?;
    Ok(buf)
}
