//! Gophermap entries.

use std::path::{Path, PathBuf};

use crate::{
    config::Config,
    error::Error,
    fs::Filesystem,
    gophertype::{self, ItemType},
    path,
    utils::{Result, is_line_safe},
};

/// One entry of a gophermap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    pub item_type: ItemType,
    /// Label the client renders.
    pub display: String,
    /// Root-relative, `/`-separated selector the client sends to fetch the item.
    pub selector: String,
    /// Host of the server the item resides on.
    pub host: String,
    /// Port of the server the item resides on.
    pub port: u16,
    /// Absolute path backing the item. Empty for remote items, which are not supported.
    pub location: PathBuf,
    /// Whether the item was classified with the Gopher+ type alphabet.
    pub gopher_plus: bool,
}

impl Item {
    /// Check that every required field is set and fits the line format.
    pub fn validate(&self) -> Result<()> {
        if self.display.is_empty() {
            return Err(Error::InvalidItem("display string missing"));
        }
        if self.selector.is_empty() {
            return Err(Error::InvalidItem("selector missing"));
        }
        if self.host.is_empty() {
            return Err(Error::InvalidItem("host missing"));
        }
        if self.port == 0 {
            return Err(Error::InvalidItem("port missing"));
        }
        if ![&self.display, &self.selector, &self.host]
            .into_iter()
            .all(|field| is_line_safe(field))
        {
            return Err(Error::InvalidItem("field contains a tab or line break"));
        }
        Ok(())
    }

    /// Whether the item is backed by the local filesystem.
    pub fn is_local(&self) -> bool {
        !self.location.as_os_str().is_empty()
    }
}

/// Builds items for directory entries below the configured root.
pub struct ItemBuilder<'a, Fs: ?Sized> {
    config: &'a Config,
    fs: &'a Fs,
    gopher_plus: bool,
}

impl<'a, Fs: Filesystem + ?Sized> ItemBuilder<'a, Fs> {
    pub fn new(config: &'a Config, fs: &'a Fs, gopher_plus: bool) -> Self {
        ItemBuilder {
            config,
            fs,
            gopher_plus,
        }
    }

    /// Build the item for `entry` inside the directory `base`.
    ///
    /// `base` must lie within the configured root. Fails with
    /// [`Error::NotFound`] if the entry disappeared and with
    /// [`Error::Unreadable`] if it cannot be statted.
    pub async fn build(&self, base: &Path, entry: &str) -> Result<Item> {
        let location = base.join(entry);
        let item_type = gophertype::classify(self.fs, &location, self.gopher_plus).await?;
        let selector = path::selector_for(&self.config.root, &location)?;

        Ok(Item {
            item_type,
            display: entry.to_owned(),
            selector,
            host: self.config.advertised_host().to_owned(),
            port: self.config.port,
            location,
            gopher_plus: self.gopher_plus,
        })
    }
}
