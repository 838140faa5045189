//! Directory listings.

use std::path::Path;

use log::{debug, warn};

use crate::{
    config::Config,
    error::Error,
    fs::Filesystem,
    item::{Item, ItemBuilder},
    utils::{Result, is_line_safe},
};

/// An ordered list of items, serialized as a plain Gopher or Gopher+ listing.
///
/// Built fresh for each request and immutable afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Gophermap {
    items: Vec<Item>,
    gopher_plus: bool,
}

impl Gophermap {
    pub fn new(items: Vec<Item>, gopher_plus: bool) -> Gophermap {
        Gophermap { items, gopher_plus }
    }

    /// Build the listing of the directory at `dir`, which must lie within the root.
    ///
    /// Entries are sorted by file name. Entries that vanish while the listing is
    /// being built, entries that cannot be statted (e.g. symlink loops) and
    /// entries whose names cannot be written into a gophermap line are left out.
    pub async fn from_dir<Fs: Filesystem + ?Sized>(
        config: &Config,
        fs: &Fs,
        dir: &Path,
        gopher_plus: bool,
    ) -> Result<Gophermap> {
        let mut names = fs
            .read_dir(dir)
            .await
            .map_err(|e| Error::from_lookup(dir, e))?;
        names.sort();

        let builder = ItemBuilder::new(config, fs, gopher_plus);
        let mut items = Vec::with_capacity(names.len());
        for name in names {
            let Some(name) = name.to_str().filter(|name| is_line_safe(name)) else {
                warn!("skipping {:?} in {:?}: not representable in a gophermap", name, dir);
                continue;
            };
            match builder.build(dir, name).await {
                Ok(item) => items.push(item),
                Err(Error::NotFound(path)) => debug!("{:?} vanished during listing", path),
                Err(e @ Error::Unreadable { .. }) => {
                    warn!("skipping {:?} in {:?}: {}", name, dir, e)
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Gophermap { items, gopher_plus })
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn gopher_plus(&self) -> bool {
        self.gopher_plus
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
