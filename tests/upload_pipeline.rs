//! End-to-end coverage of the upload flow against local HTTP stand-ins for
//! the upload endpoint and the geocoding service.

use std::{
    collections::HashMap,
    net::SocketAddr,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use warp::Filter;

use instabao_admin::{
    admin::{self, AdminRequest, AdminResponse},
    config::EncoderConfig,
    geocode::Geocoder,
    library::{Asset, Coords2D, MediaKind, PhotoLibrary},
    media::MediaEncoder,
    task::{CommandSink, Task},
    upload::{UploadError, UploadPipeline},
    uploaded::UploadedSet,
};

struct StubLibrary {
    assets: Vec<Asset>,
    image_bytes: HashMap<String, Vec<u8>>,
    video_paths: HashMap<String, PathBuf>,
}

impl StubLibrary {
    fn with_image(asset: Asset, bytes: Vec<u8>) -> Self {
        let image_bytes = HashMap::from([(asset.identifier().to_owned(), bytes)]);

        StubLibrary {
            assets: vec![asset],
            image_bytes,
            video_paths: HashMap::new(),
        }
    }

    fn with_video(asset: Asset, source: PathBuf) -> Self {
        let video_paths = HashMap::from([(asset.identifier().to_owned(), source)]);

        StubLibrary {
            assets: vec![asset],
            image_bytes: HashMap::new(),
            video_paths,
        }
    }
}

#[async_trait]
impl PhotoLibrary for StubLibrary {
    async fn is_authorized(&self) -> bool {
        true
    }

    async fn assets(&self) -> anyhow::Result<Vec<Asset>> {
        Ok(self.assets.clone())
    }

    async fn image_data(&self, identifier: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.image_bytes.get(identifier).cloned())
    }

    async fn video_source(&self, identifier: &str) -> anyhow::Result<Option<PathBuf>> {
        Ok(self.video_paths.get(identifier).cloned())
    }

    async fn set_favorite(&self, _identifier: &str, _favorite: bool) -> anyhow::Result<()> {
        Ok(())
    }

    async fn delete(&self, _identifier: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct SeenUpload {
    query: String,
    content_type: String,
    body_len: usize,
}

struct RemoteService {
    addr: SocketAddr,
    uploads: Arc<Mutex<Vec<SeenUpload>>>,
    refreshes: Arc<AtomicUsize>,
}

/// Stand-in for the instabao service: records POSTed uploads and counts
/// GETs of the uploaded listing.
fn spawn_remote(listing: &'static str, upload_status: u16) -> RemoteService {
    let uploads = Arc::new(Mutex::new(Vec::new()));
    let refreshes = Arc::new(AtomicUsize::new(0));

    let post = warp::post()
        .and(warp::query::raw())
        .and(warp::header::<String>("content-type"))
        .and(warp::body::bytes())
        .map({
            let uploads = Arc::clone(&uploads);
            move |query: String, content_type: String, body: bytes::Bytes| {
                uploads.lock().unwrap().push(SeenUpload {
                    query,
                    content_type,
                    body_len: body.len(),
                });

                warp::reply::with_status(
                    "created".to_owned(),
                    warp::http::StatusCode::from_u16(upload_status).unwrap(),
                )
            }
        });

    let get = warp::get().map({
        let refreshes = Arc::clone(&refreshes);
        move || {
            refreshes.fetch_add(1, Ordering::SeqCst);

            warp::reply::with_status(listing.to_owned(), warp::http::StatusCode::OK)
        }
    });

    let (addr, server) = warp::serve(post.or(get)).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    RemoteService {
        addr,
        uploads,
        refreshes,
    }
}

fn spawn_geocoder() -> SocketAddr {
    let route = warp::path("reverse").map(|| {
        warp::reply::json(&serde_json::json!({
            "address": { "city": "Testville", "state": "CA" }
        }))
    });

    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    addr
}

fn spawn_failing_geocoder() -> SocketAddr {
    let route = warp::path("reverse").map(|| {
        warp::reply::with_status(
            "gone".to_owned(),
            warp::http::StatusCode::INTERNAL_SERVER_ERROR,
        )
    });

    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    addr
}

fn pipeline_for(remote_addr: SocketAddr, geocode_addr: SocketAddr) -> UploadPipeline {
    pipeline_with_encoder(remote_addr, geocode_addr, EncoderConfig::default())
}

fn pipeline_with_encoder(
    remote_addr: SocketAddr,
    geocode_addr: SocketAddr,
    encoder: EncoderConfig,
) -> UploadPipeline {
    let http = reqwest::Client::new();
    let geocoder = Geocoder::new(http.clone(), &format!("http://{}", geocode_addr)).unwrap();

    UploadPipeline::new(
        http,
        &format!("http://{}", remote_addr),
        geocoder,
        MediaEncoder::new(&encoder),
    )
    .unwrap()
}

fn test_image_bytes() -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        4,
        4,
        image::Rgb([200, 120, 40]),
    ));

    let mut bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

async fn wait_for_refreshes(refreshes: &Arc<AtomicUsize>, want: usize) {
    for _ in 0..200 {
        if refreshes.load(Ordering::SeqCst) >= want {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    panic!(
        "remote saw {} refreshes, wanted {}",
        refreshes.load(Ordering::SeqCst),
        want
    );
}

#[tokio::test]
async fn image_upload_reaches_the_server_with_full_metadata() {
    let remote = spawn_remote("[]", 201);
    let geocode = spawn_geocoder();

    let mut asset = Asset::new("sunset-1.jpg", MediaKind::Image);
    asset.location = Some(Coords2D::new(37.0, -122.0));

    let library = StubLibrary::with_image(asset.clone(), test_image_bytes());
    let pipeline = pipeline_for(remote.addr, geocode);

    pipeline.upload(&library, &asset, "sunset").await.unwrap();

    let uploads = remote.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);

    let seen = &uploads[0];
    assert!(seen.query.contains("id=sunset-1.jpg"));
    assert!(seen.query.contains("description=sunset"));
    assert!(seen.query.contains("latitude=37"));
    assert!(seen.query.contains("longitude=-122"));
    assert!(seen.query.contains("city=Testville"));
    assert!(seen.query.contains("state=CA"));
    assert!(seen.query.contains("mediaType=image"));
    assert_eq!(seen.content_type, "image/jpeg");
    assert!(seen.body_len > 0);
}

#[tokio::test]
async fn geocode_failure_aborts_before_any_request_is_sent() {
    let remote = spawn_remote("[]", 201);
    let geocode = spawn_failing_geocoder();

    let mut asset = Asset::new("sunset-1.jpg", MediaKind::Image);
    asset.location = Some(Coords2D::new(37.0, -122.0));

    let library = StubLibrary::with_image(asset.clone(), test_image_bytes());
    let pipeline = pipeline_for(remote.addr, geocode);

    let err = pipeline.upload(&library, &asset, "sunset").await.unwrap_err();

    assert!(matches!(err, UploadError::Geocode(_)));
    assert!(remote.uploads.lock().unwrap().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn failed_video_export_cleans_up_and_sends_nothing() {
    let remote = spawn_remote("[]", 201);
    let geocode = spawn_geocoder();

    let source_dir = tempfile::tempdir().unwrap();
    let source = source_dir.path().join("clip.mov");
    std::fs::write(&source, b"source video").unwrap();

    let staging = tempfile::tempdir().unwrap();

    let asset = Asset::new("clip.mov", MediaKind::Video);
    let library = StubLibrary::with_video(asset.clone(), source);

    let pipeline = pipeline_with_encoder(
        remote.addr,
        geocode,
        EncoderConfig {
            ffmpeg_path: PathBuf::from("false"),
            temp_dir: Some(staging.path().to_path_buf()),
        },
    );

    let err = pipeline.upload(&library, &asset, "").await.unwrap_err();

    assert!(matches!(err, UploadError::Encode(_)));
    assert!(remote.uploads.lock().unwrap().is_empty());
    assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn server_rejection_surfaces_as_a_server_error() {
    let remote = spawn_remote("[]", 500);
    let geocode = spawn_geocoder();

    let asset = Asset::new("sunset-1.jpg", MediaKind::Image);
    let library = StubLibrary::with_image(asset.clone(), test_image_bytes());
    let pipeline = pipeline_for(remote.addr, geocode);

    let err = pipeline.upload(&library, &asset, "").await.unwrap_err();

    match err {
        UploadError::Server { status } => assert_eq!(status.as_u16(), 500),
        other => panic!("expected server error, got {:?}", other),
    }
}

#[tokio::test]
async fn missing_image_data_fails_without_a_network_call() {
    let remote = spawn_remote("[]", 201);
    let geocode = spawn_geocoder();

    let asset = Asset::new("ghost.jpg", MediaKind::Image);
    let library = StubLibrary {
        assets: vec![asset.clone()],
        image_bytes: HashMap::new(),
        video_paths: HashMap::new(),
    };
    let pipeline = pipeline_for(remote.addr, geocode);

    let err = pipeline.upload(&library, &asset, "").await.unwrap_err();

    assert!(matches!(err, UploadError::Encode(_)));
    assert!(remote.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn confirmed_upload_marks_the_asset_and_triggers_one_refresh() {
    let remote = spawn_remote("[]", 201);
    let geocode = spawn_geocoder();

    let mut asset = Asset::new("sunset-1.jpg", MediaKind::Image);
    asset.location = Some(Coords2D::new(37.0, -122.0));

    let library: Arc<dyn PhotoLibrary> =
        Arc::new(StubLibrary::with_image(asset, test_image_bytes()));

    let http = reqwest::Client::new();
    let uploaded = Arc::new(UploadedSet::new(
        http.clone(),
        format!("http://{}", remote.addr).parse().unwrap(),
        "baostagram/",
    ));
    let geocoder = Geocoder::new(http.clone(), &format!("http://{}", geocode)).unwrap();
    let pipeline = UploadPipeline::new(
        http,
        &format!("http://{}", remote.addr),
        geocoder,
        MediaEncoder::new(&EncoderConfig::default()),
    )
    .unwrap();

    let task = admin::create_task(library, Arc::clone(&uploaded), pipeline);
    let cmd = task.cmd();

    let cancel = CancellationToken::new();
    let task_handle = tokio::spawn(Box::new(task).run(cancel.clone()));

    // the task refreshes once on startup
    wait_for_refreshes(&remote.refreshes, 1).await;

    let response = cmd
        .command(AdminRequest::Upload {
            id: "sunset-1.jpg".to_owned(),
            description: "sunset".to_owned(),
        })
        .await
        .unwrap();

    assert!(matches!(
        response,
        AdminResponse::Upload { succeeded: true }
    ));

    // exactly one more refresh fires after the confirmed upload
    wait_for_refreshes(&remote.refreshes, 2).await;
    assert_eq!(remote.uploads.lock().unwrap().len(), 1);

    let response = cmd.command(AdminRequest::List).await.unwrap();
    match response {
        AdminResponse::Assets(assets) => {
            assert_eq!(assets.len(), 1);
            assert!(assets[0].is_uploaded);
        }
        other => panic!("expected asset listing, got {:?}", other),
    }

    cancel.cancel();
    task_handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn failed_upload_leaves_the_asset_unmarked() {
    let remote = spawn_remote("[]", 500);
    let geocode = spawn_geocoder();

    let asset = Asset::new("sunset-1.jpg", MediaKind::Image);
    let library: Arc<dyn PhotoLibrary> =
        Arc::new(StubLibrary::with_image(asset, test_image_bytes()));

    let http = reqwest::Client::new();
    let uploaded = Arc::new(UploadedSet::new(
        http.clone(),
        format!("http://{}", remote.addr).parse().unwrap(),
        "baostagram/",
    ));
    let geocoder = Geocoder::new(http.clone(), &format!("http://{}", geocode)).unwrap();
    let pipeline = UploadPipeline::new(
        http,
        &format!("http://{}", remote.addr),
        geocoder,
        MediaEncoder::new(&EncoderConfig::default()),
    )
    .unwrap();

    let task = admin::create_task(library, Arc::clone(&uploaded), pipeline);
    let cmd = task.cmd();

    let cancel = CancellationToken::new();
    let task_handle = tokio::spawn(Box::new(task).run(cancel.clone()));

    wait_for_refreshes(&remote.refreshes, 1).await;
    let refreshes_before = remote.refreshes.load(Ordering::SeqCst);

    let response = cmd
        .command(AdminRequest::Upload {
            id: "sunset-1.jpg".to_owned(),
            description: "sunset".to_owned(),
        })
        .await
        .unwrap();

    assert!(matches!(
        response,
        AdminResponse::Upload { succeeded: false }
    ));

    let response = cmd.command(AdminRequest::List).await.unwrap();
    match response {
        AdminResponse::Assets(assets) => assert!(!assets[0].is_uploaded),
        other => panic!("expected asset listing, got {:?}", other),
    }

    // no fire-and-forget refresh after a failed upload
    assert_eq!(remote.refreshes.load(Ordering::SeqCst), refreshes_before);

    cancel.cancel();
    task_handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn listing_reflects_the_remote_uploaded_set() {
    let remote = spawn_remote(r#"[{"uploaded":"t","key":"baostagram/sunset-1.jpg"}]"#, 201);
    let geocode = spawn_geocoder();

    let asset = Asset::new("sunset-1.jpg", MediaKind::Image);
    let other = Asset::new("zz-later.jpg", MediaKind::Image);
    let library: Arc<dyn PhotoLibrary> = Arc::new(StubLibrary {
        assets: vec![asset, other],
        image_bytes: HashMap::new(),
        video_paths: HashMap::new(),
    });

    let http = reqwest::Client::new();
    let uploaded = Arc::new(UploadedSet::new(
        http.clone(),
        format!("http://{}", remote.addr).parse().unwrap(),
        "baostagram/",
    ));
    let geocoder = Geocoder::new(http.clone(), &format!("http://{}", geocode)).unwrap();
    let pipeline = UploadPipeline::new(
        http,
        &format!("http://{}", remote.addr),
        geocoder,
        MediaEncoder::new(&EncoderConfig::default()),
    )
    .unwrap();

    let task = admin::create_task(library, Arc::clone(&uploaded), pipeline);
    let cmd = task.cmd();

    let cancel = CancellationToken::new();
    let task_handle = tokio::spawn(Box::new(task).run(cancel.clone()));

    wait_for_refreshes(&remote.refreshes, 1).await;

    let response = cmd.command(AdminRequest::List).await.unwrap();
    match response {
        AdminResponse::Assets(assets) => {
            assert_eq!(assets.len(), 2);
            assert!(assets[0].is_uploaded, "listed asset is in the remote set");
            assert!(!assets[1].is_uploaded);
        }
        other => panic!("expected asset listing, got {:?}", other),
    }

    cancel.cancel();
    task_handle.await.unwrap().unwrap();
}
