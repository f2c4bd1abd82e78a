//! Output delivery: write results next to their sources, or pack them into
//! one archive that mirrors the discovered folder structure.
//!
//! The strategy is picked per item. Items carrying live handles are written
//! back directly; every completed item can also be archived on demand.

pub mod archive;
pub mod writeback;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::DeliveryError;
use crate::item::{Item, ResultImage};

pub use archive::{assemble_archive, StudioArchive};
pub use writeback::write_back;

/// How results of the current batch reach the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Results are written next to their sources.
    DirectWrite,
    /// Results are downloaded as an archive.
    ZipReconstruction,
}

/// Delivers one result. Returns the written path for live items and `None`
/// for items that can only be archived.
pub async fn deliver(item: &Item, result: &ResultImage) -> Result<Option<PathBuf>, DeliveryError> {
    match &item.handles {
        Some(handles) => write_back(handles, &item.source, result).await.map(Some),
        None => Ok(None),
    }
}
