//! Filesystem capability used by the protocol engine.

use {
    crate::{io_err, res},
    async_trait::async_trait,
    std::{ffi::OsString, io, path::Path},
    tokio::{fs, io::AsyncRead},
    tokio_stream::{StreamExt, wrappers::ReadDirStream},
};

/// The subset of file metadata the server needs.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Stat {
    pub is_dir: bool,
    /// Size in bytes.
    pub size: u64,
}

impl From<&std::fs::Metadata> for Stat {
    fn from(attr: &std::fs::Metadata) -> Self {
        Stat {
            is_dir: attr.is_dir(),
            size: attr.len(),
        }
    }
}

/// Read-only access to the tree being served.
///
/// All paths are absolute and already resolved below the root.
/// Symbolic links are followed.
#[async_trait]
pub trait Filesystem: Send + Sync {
    /// Handle for streaming a file's content.
    type File: AsyncRead + Send + Unpin;

    /// Get metadata for `path`.
    async fn stat(&self, path: &Path) -> io::Result<Stat>;

    /// List the names of the entries in the directory at `path`.
    ///
    /// `.` and `..` are not included. Order is unspecified.
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>>;

    /// Open `path` for reading.
    ///
    /// The returned [`Stat`] describes the opened handle, not a separate lookup.
    async fn open(&self, path: &Path) -> io::Result<(Self::File, Stat)>;
}

/// [`Filesystem`] backed by the local disk through `tokio::fs`.
#[derive(Copy, Clone, Debug, Default)]
pub struct LocalFs;

#[async_trait]
impl Filesystem for LocalFs {
    type File = fs::File;

    async fn stat(&self, path: &Path) -> io::Result<Stat> {
        Ok(Stat::from(&fs::metadata(path).await?))
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        let mut entries = ReadDirStream::new(fs::read_dir(path).await?);
        let mut names = Vec::new();
        while let Some(entry) = entries.next().await {
            names.push(entry?.file_name());
        }
        Ok(names)
    }

    async fn open(&self, path: &Path) -> io::Result<(Self::File, Stat)> {
        let file = fs::File::open(path).await?;
        let stat = Stat::from(&file.metadata().await?);
        if stat.is_dir {
            return res!(io_err!(InvalidInput, "cannot stream a directory"));
        }
        Ok((file, stat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn local_stat_and_listing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let stat = LocalFs.stat(&dir.path().join("a.txt")).await.unwrap();
        assert_eq!(stat, Stat { is_dir: false, size: 5 });
        assert!(LocalFs.stat(&dir.path().join("sub")).await.unwrap().is_dir);

        let mut names = LocalFs.read_dir(dir.path()).await.unwrap();
        names.sort();
        assert_eq!(names, vec![OsString::from("a.txt"), OsString::from("sub")]);
    }

    #[tokio::test]
    async fn local_open_reads_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.bin");
        std::fs::write(&path, [0u8, 1, 2, 255]).unwrap();

        let (mut file, stat) = LocalFs.open(&path).await.unwrap();
        assert_eq!(stat.size, 4);
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, vec![0, 1, 2, 255]);
    }

    #[tokio::test]
    async fn local_open_rejects_directories() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LocalFs.open(dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn local_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalFs.stat(&dir.path().join("nope")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
