use std::sync::Arc;

use async_trait::async_trait;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{AdminRequest, AdminResponse, AssetSummary};
use crate::{
    library::{Asset, PhotoLibrary},
    task::{ChannelCommandSink, ChannelCommandSource, Task},
    upload::UploadPipeline,
    uploaded::UploadedSet,
};

/// Task that owns the session's view of the photo library and executes
/// admin commands against it. Commands are handled one at a time, so at
/// most one upload attempt is ever in flight.
pub struct AdminTask {
    library: Arc<dyn PhotoLibrary>,
    uploaded: Arc<UploadedSet>,
    pipeline: UploadPipeline,
    cmd_tx: ChannelCommandSink<AdminRequest, AdminResponse>,
    cmd_rx: ChannelCommandSource<AdminRequest, AdminResponse>,
}

pub fn create_task(
    library: Arc<dyn PhotoLibrary>,
    uploaded: Arc<UploadedSet>,
    pipeline: UploadPipeline,
) -> AdminTask {
    let (cmd_tx, cmd_rx) = flume::bounded(256);

    AdminTask {
        library,
        uploaded,
        pipeline,
        cmd_tx,
        cmd_rx,
    }
}

impl AdminTask {
    pub fn cmd(&self) -> ChannelCommandSink<AdminRequest, AdminResponse> {
        self.cmd_tx.clone()
    }
}

#[async_trait]
impl Task for AdminTask {
    fn name(&self) -> &'static str {
        "admin"
    }

    async fn run(self: Box<Self>, cancel: CancellationToken) -> anyhow::Result<()> {
        let Self {
            library,
            uploaded,
            pipeline,
            cmd_rx,
            cmd_tx: _,
        } = *self;

        // session view of the library; flags are updated in place
        let mut assets: Vec<Asset> = Vec::new();

        // the original client fetched the uploaded list when its first
        // view appeared; task start is the equivalent moment here
        uploaded.refresh().await;

        let loop_fut = async {
            while let Ok((request, ret)) = cmd_rx.recv_async().await {
                let result = handle(&*library, &uploaded, &pipeline, &mut assets, request).await;
                let _ = ret.send(result);
            }

            Ok::<_, anyhow::Error>(())
        };

        select! {
            _ = cancel.cancelled() => {}
            res = loop_fut => { res? }
        }

        Ok(())
    }
}

async fn handle(
    library: &dyn PhotoLibrary,
    uploaded: &Arc<UploadedSet>,
    pipeline: &UploadPipeline,
    assets: &mut Vec<Asset>,
    request: AdminRequest,
) -> anyhow::Result<AdminResponse> {
    match request {
        AdminRequest::List => {
            reload_assets(library, uploaded, assets).await?;

            Ok(AdminResponse::Assets(
                assets.iter().map(AssetSummary::from).collect(),
            ))
        }

        AdminRequest::Upload { id, description } => {
            if assets.is_empty() {
                reload_assets(library, uploaded, assets).await?;
            }

            let asset = assets
                .iter_mut()
                .find(|asset| asset.identifier() == id)
                .ok_or_else(|| anyhow::anyhow!("no asset with identifier {}", id))?;

            let succeeded = match pipeline.upload(library, asset, &description).await {
                Ok(()) => true,
                Err(err) => {
                    warn!(id = asset.identifier(), error = ?err, "upload attempt failed");
                    false
                }
            };

            if succeeded {
                asset.is_uploaded = true;
                info!(id = asset.identifier(), "upload confirmed");

                // the refresh runs in the background; its outcome does not
                // change the result reported for this upload
                let uploaded = Arc::clone(uploaded);
                tokio::spawn(async move { uploaded.refresh().await });
            }

            Ok(AdminResponse::Upload { succeeded })
        }

        AdminRequest::Refresh => {
            uploaded.refresh().await;

            Ok(AdminResponse::Unit)
        }

        AdminRequest::Favorite { id, favorite } => {
            library.set_favorite(&id, favorite).await?;

            if let Some(asset) = assets.iter_mut().find(|asset| asset.identifier() == id) {
                asset.is_favorite = favorite;
            }

            Ok(AdminResponse::Unit)
        }

        AdminRequest::Delete { id } => {
            library.delete(&id).await?;
            assets.retain(|asset| asset.identifier() != id);

            Ok(AdminResponse::Unit)
        }
    }
}

async fn reload_assets(
    library: &dyn PhotoLibrary,
    uploaded: &UploadedSet,
    assets: &mut Vec<Asset>,
) -> anyhow::Result<()> {
    let mut fresh = library.assets().await?;

    for asset in &mut fresh {
        // keep confirmations from this session even when the remote
        // listing has not caught up yet
        let locally_confirmed = assets
            .iter()
            .any(|prior| prior.identifier() == asset.identifier() && prior.is_uploaded);

        asset.is_uploaded = locally_confirmed || uploaded.contains(asset.identifier());
    }

    *assets = fresh;

    Ok(())
}
