mod task;

pub use task::{create_task, AdminTask};

use clap::Subcommand;

use crate::library::{Asset, MediaKind};

/// Commands accepted by the admin task.
#[derive(Subcommand, Debug, Clone)]
pub enum AdminRequest {
    /// list the assets in the library along with their upload state
    List,

    /// upload one asset to the remote service
    Upload {
        /// identifier of the asset to upload
        id: String,

        /// caption stored alongside the media
        #[clap(short, long, default_value = "")]
        description: String,
    },

    /// re-fetch the uploaded-asset list from the remote service
    Refresh,

    /// set or clear the favorite flag on an asset
    Favorite {
        id: String,

        #[clap(parse(try_from_str))]
        favorite: bool,
    },

    /// delete an asset from the library
    Delete { id: String },
}

#[derive(Debug, Clone)]
pub enum AdminResponse {
    Unit,
    Assets(Vec<AssetSummary>),
    Upload { succeeded: bool },
}

/// One row of `photos list` output.
#[derive(Debug, Clone)]
pub struct AssetSummary {
    pub identifier: String,
    pub media_kind: MediaKind,
    pub is_favorite: bool,
    pub is_uploaded: bool,
}

impl From<&Asset> for AssetSummary {
    fn from(asset: &Asset) -> Self {
        AssetSummary {
            identifier: asset.identifier().to_owned(),
            media_kind: asset.media_kind,
            is_favorite: asset.is_favorite,
            is_uploaded: asset.is_uploaded,
        }
    }
}
