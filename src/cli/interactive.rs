use clap::Parser;
use futures::{AsyncWriteExt, FutureExt};
use rustyline_async::{Readline, SharedWriter};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    admin::{AdminRequest, AdminResponse},
    task::{ChannelCommandSink, CommandSink},
};

#[derive(Parser, Debug)]
#[clap(setting(clap::AppSettings::NoBinaryName))]
#[clap(rename_all = "kebab-case")]
enum Commands {
    /// inspect and upload photo-library assets
    #[clap(subcommand)]
    #[clap(name = "photos")]
    Photos(AdminRequest),
    Exit,
}

pub async fn run_interactive_cli(
    mut editor: Readline,
    mut stdout: SharedWriter,
    admin_cmd_tx: ChannelCommandSink<AdminRequest, AdminResponse>,
    cancellation_token: CancellationToken,
) -> anyhow::Result<()> {
    loop {
        select! {
            _ = cancellation_token.cancelled() => {
                break;
            }
            result = editor.readline().fuse() => {
                match result {
                    Ok(line) => {
                        stdout.write_all(format!("instabao> {}\n", line).as_bytes()).await?;

                        let request: Result<Commands, _> = Parser::try_parse_from(line.split_ascii_whitespace());

                        let request = match request {
                            Ok(request) => request,
                            Err(err) => {
                                stdout.write_all(err.to_string().as_bytes()).await?;
                                continue;
                            },
                        };

                        editor.add_history_entry(line);

                        match request {
                            Commands::Photos(request) => match admin_cmd_tx.command(request).await {
                                Ok(AdminResponse::Upload { succeeded: true }) => {
                                    info!("upload succeeded");
                                }
                                // the specific cause stays in the logs; the
                                // user sees a single generic failure signal
                                Ok(AdminResponse::Upload { succeeded: false }) => {
                                    error!("upload failed, try again");
                                }
                                Ok(AdminResponse::Assets(assets)) => {
                                    for asset in assets {
                                        info!("{:?}", asset);
                                    }
                                }
                                Ok(AdminResponse::Unit) => info!("ok"),
                                Err(err) => error!("{:?}", err),
                            },

                            Commands::Exit => {
                                info!("exiting");
                                cancellation_token.cancel();
                            }
                        };
                    }
                    Err(err) => {
                        error!("interactive error: {:#?}", err);
                        break;
                    }
                };
            }
        }
    }

    cancellation_token.cancel();

    Ok(())
}
