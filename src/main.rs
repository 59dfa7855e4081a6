use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rustyline_async::{Readline, SharedWriter};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::metadata::LevelFilter;
use tracing::{debug, info};
use tracing_subscriber::{filter::Targets, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use instabao_admin::{
    admin,
    cli::{args::MainArgs, interactive::run_interactive_cli},
    config::InstabaoConfig,
    geocode::Geocoder,
    library::{FsPhotoLibrary, PhotoLibrary},
    media::MediaEncoder,
    task::Task,
    upload::UploadPipeline,
    uploaded::UploadedSet,
    util::USER_AGENT,
};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // setup colorful backtraces
    color_backtrace::install();

    // set up logging and interactive line editor
    let (editor, stdout) =
        Readline::new("instabao> ".into()).context("failed to create interactive editor")?;

    let mut targets = tracing_subscriber::filter::Targets::new();

    if let Ok(directives) = std::env::var("RUST_LOG") {
        for directive in directives.split(',') {
            if let Some((target, level)) = directive.split_once('=') {
                targets = targets.with_target(
                    target,
                    level.parse::<LevelFilter>().context("invalid log level")?,
                );
            } else {
                targets = targets.with_default(
                    directive
                        .parse::<LevelFilter>()
                        .context("invalid log level")?,
                );
            }
        }
    }

    let (writer, _guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::hourly("logs", "instabao-admin"));

    let reg = tracing_subscriber::registry();

    #[cfg(tokio_unstable)]
    let reg = reg.with(console_subscriber::spawn());

    reg
        // writer that outputs to console
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer({
                    let stdout = stdout.clone();
                    move || stdout.clone()
                })
                .with_filter(targets),
        )
        // writer that outputs to files
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(
                    Targets::new().with_targets(vec![("instabao_admin", LevelFilter::DEBUG)]),
                ),
        )
        .init();

    let main_args: MainArgs = MainArgs::parse();

    debug!("reading config from {:?}", &main_args.config);
    let config =
        InstabaoConfig::read_from_path(main_args.config).context("failed to read config file")?;

    run_tasks(config, editor, stdout).await
}

async fn run_tasks(
    config: InstabaoConfig,
    editor: Readline,
    stdout: SharedWriter,
) -> anyhow::Result<()> {
    let cancellation_token = CancellationToken::new();

    ctrlc::set_handler({
        let cancellation_token = cancellation_token.clone();
        move || {
            info!("received interrupt, shutting down");
            cancellation_token.cancel();
        }
    })
    .context("could not set ctrl+c handler")?;

    let library: Arc<dyn PhotoLibrary> =
        Arc::new(FsPhotoLibrary::new(config.library.media_path.clone()));

    if !library.is_authorized().await {
        anyhow::bail!(
            "photo library at {} is not readable",
            config.library.media_path.display()
        );
    }

    let http = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("could not build http client")?;

    let endpoint = config
        .upload
        .address
        .parse::<reqwest::Url>()
        .context("invalid upload endpoint url")?;

    let uploaded = Arc::new(UploadedSet::new(
        http.clone(),
        endpoint,
        config.upload.storage_prefix.clone(),
    ));

    let geocoder = Geocoder::new(http.clone(), &config.geocode.address)
        .context("failed to initialize geocoder")?;

    let encoder = MediaEncoder::new(&config.encoder);

    debug!("initializing admin task");
    let pipeline = UploadPipeline::new(http, &config.upload.address, geocoder, encoder)
        .context("failed to initialize upload pipeline")?;

    let admin_task = admin::create_task(library, Arc::clone(&uploaded), pipeline);
    let admin_cmd_tx = admin_task.cmd();

    let mut tasks = Vec::<Box<dyn Task>>::new();
    tasks.push(Box::new(admin_task));

    let mut join_set = JoinSet::new();

    join_set.spawn(run_interactive_cli(
        editor,
        stdout,
        admin_cmd_tx,
        cancellation_token.clone(),
    ));

    for task in tasks {
        debug!("starting {} task", task.name());
        join_set.spawn(task.run(cancellation_token.clone()));
    }

    while let Some(res) = join_set.join_next().await {
        // if a task panicked, then this is Err
        // if a task terminated w/ error, then this is Ok(Err)
        // need to propagate errors in both cases

        match res {
            Err(err) => {
                cancellation_token.cancel();
                return Err(err).context("task failed");
            }
            Ok(Err(err)) => {
                cancellation_token.cancel();
                return Err(err).context("task terminated with error");
            }
            _ => {
                info!("exited task");
            }
        }
    }

    Ok(())
}
