use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// A long-running unit of the admin client. Tasks are constructed up front,
/// spawned once from `main`, and run until they finish on their own or the
/// cancellation token fires.
#[async_trait]
pub trait Task: Send {
    fn name(&self) -> &'static str;

    async fn run(self: Box<Self>, cancel: CancellationToken) -> anyhow::Result<()>;
}

/// A request paired with the one-shot channel its result is returned on.
pub type Command<Req, Res> = (Req, oneshot::Sender<anyhow::Result<Res>>);

/// Sending half of a task's command channel.
pub type ChannelCommandSink<Req, Res> = flume::Sender<Command<Req, Res>>;

/// Receiving half of a task's command channel.
pub type ChannelCommandSource<Req, Res> = flume::Receiver<Command<Req, Res>>;

/// Anything a request can be submitted to for an eventual response.
#[async_trait]
pub trait CommandSink {
    type Request;
    type Response;

    async fn command(&self, request: Self::Request) -> Self::Response;
}

#[async_trait]
impl<Req: Send, Res: Send> CommandSink for ChannelCommandSink<Req, Res> {
    type Request = Req;
    type Response = anyhow::Result<Res>;

    async fn command(&self, request: Self::Request) -> Self::Response {
        let (ret_tx, ret_rx) = oneshot::channel();

        if self.send_async((request, ret_tx)).await.is_err() {
            anyhow::bail!("task is no longer accepting commands");
        }

        ret_rx.await?
    }
}
