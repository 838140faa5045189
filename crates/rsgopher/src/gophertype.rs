//! Gopher item types and extension-based classification.
//!
//! # Protocol
//! Gopher (RFC 1436) and Gopher+

use std::{collections::HashMap, fmt, path::Path, sync::LazyLock};

use crate::{error::Error, fs::Filesystem, utils::Result};

/// Item type code of a gophermap entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ItemType {
    /// `0` Text file
    Text,
    /// `1` Directory
    Directory,
    /// `3` Error
    Error,
    /// `5` DOS binary
    DosBinary,
    /// `9` Binary file
    Binary,
    /// `g` GIF image
    Gif,
    /// `I` Image (Gopher+)
    Image,
    /// `:` Bitmap image (plain Gopher)
    Bitmap,
    /// `;` Video (Gopher+)
    Video,
    /// `<` Sound (Gopher+)
    Sound,
}

impl ItemType {
    /// Get the single-character wire code.
    pub fn code(self) -> char {
        match self {
            ItemType::Text => '0',
            ItemType::Directory => '1',
            ItemType::Error => '3',
            ItemType::DosBinary => '5',
            ItemType::Binary => '9',
            ItemType::Gif => 'g',
            ItemType::Image => 'I',
            ItemType::Bitmap => ':',
            ItemType::Video => ';',
            ItemType::Sound => '<',
        }
    }

    /// Classify an entry by its kind and file extension.
    ///
    /// Directories are always `1`. Files are looked up by lowercased extension;
    /// anything unknown is `9`, so clients offer a download instead of
    /// rendering it inline.
    pub fn for_path(path: &Path, is_dir: bool, gopher_plus: bool) -> ItemType {
        if is_dir {
            return ItemType::Directory;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| EXTENSIONS.get(ext.to_ascii_lowercase().as_str()))
            .and_then(|kind| kind.item_type(gopher_plus))
            .unwrap_or(ItemType::Binary)
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Content kind derived from a file extension.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Kind {
    Image,
    Gif,
    DosBinary,
    Text,
    Video,
    Audio,
}

impl Kind {
    fn item_type(self, gopher_plus: bool) -> Option<ItemType> {
        match (self, gopher_plus) {
            (Kind::Image, true) => Some(ItemType::Image),
            (Kind::Image, false) => Some(ItemType::Bitmap),
            (Kind::Gif, _) => Some(ItemType::Gif),
            (Kind::DosBinary, _) => Some(ItemType::DosBinary),
            (Kind::Text, _) => Some(ItemType::Text),
            (Kind::Video, true) => Some(ItemType::Video),
            (Kind::Audio, true) => Some(ItemType::Sound),
            // Plain Gopher has no video or audio types.
            (Kind::Video | Kind::Audio, false) => None,
        }
    }
}

#[rustfmt::skip]
const EXTENSION_TABLE: &[(Kind, &[&str])] = &[
    (Kind::Image,     &["jpg", "jpeg", "jp2", "jpx", "tiff", "tif", "bmp", "png", "webp", "pbm",
                        "pgm", "ppm", "pnm", "heic", "bpg", "ecw", "fits", "fit", "fts", "flif",
                        "ico", "jxr", "hdp", "svg"]),
    // GIF has its own type in the base protocol
    (Kind::Gif,       &["gif"]),
    (Kind::DosBinary, &["com", "exe"]),
    (Kind::Text,      &["txt", "md", "rtf"]),
    (Kind::Video,     &["mp4", "m4v", "mkv", "webm", "mov", "avi", "wmv", "mpg", "flv"]),
    (Kind::Audio,     &["mp3", "mid", "m4a", "ogg", "flac", "wav", "amr"]),
];

static EXTENSIONS: LazyLock<HashMap<&'static str, Kind>> = LazyLock::new(|| {
    EXTENSION_TABLE
        .iter()
        .flat_map(|(kind, exts)| exts.iter().map(move |ext| (*ext, *kind)))
        .collect()
});

/// Stat `path` and classify it.
///
/// Fails with [`Error::NotFound`] when the path does not exist and
/// [`Error::Unreadable`] when it cannot be statted for any other reason.
pub async fn classify<Fs: Filesystem + ?Sized>(
    fs: &Fs,
    path: &Path,
    gopher_plus: bool,
) -> Result<ItemType> {
    match fs.stat(path).await {
        Ok(stat) => Ok(ItemType::for_path(path, stat.is_dir, gopher_plus)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(Error::NotFound(path.to_owned()))
        }
        Err(source) => Err(Error::Unreadable {
            path: path.to_owned(),
            source,
        }),
    }
}
