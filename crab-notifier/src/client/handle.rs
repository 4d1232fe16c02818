use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::http::AcceptResponse;
use crate::{ClientError, ClientResult};

/// Everything the event loop reacts to besides the channel and its timers
#[derive(Debug)]
pub(crate) enum Command {
    Accept(i64),
    Dismiss(i64),
    OpenDetails(i64),
    ToggleMute,
    Refresh,
    /// Posted back by the spawned accept request
    AcceptFinished {
        order_id: i64,
        result: ClientResult<AcceptResponse>,
    },
}

/// Handle to a running notifier
///
/// User actions are queued to the event loop and never block. Dropping the
/// handle leaves the loop running; call [`NotifierHandle::stop`] to end it.
#[derive(Debug)]
pub struct NotifierHandle {
    commands: mpsc::UnboundedSender<Command>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl NotifierHandle {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<Command>,
        shutdown: CancellationToken,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            commands,
            shutdown,
            task,
        }
    }

    fn send(&self, command: Command) -> ClientResult<()> {
        self.commands.send(command).map_err(|_| ClientError::Stopped)
    }

    /// Quick-accept from the order's card
    pub fn accept(&self, order_id: i64) -> ClientResult<()> {
        self.send(Command::Accept(order_id))
    }

    /// Close the order's card
    pub fn dismiss(&self, order_id: i64) -> ClientResult<()> {
        self.send(Command::Dismiss(order_id))
    }

    /// Follow the card's details link
    pub fn open_details(&self, order_id: i64) -> ClientResult<()> {
        self.send(Command::OpenDetails(order_id))
    }

    /// Flip the sound preference
    pub fn toggle_mute(&self) -> ClientResult<()> {
        self.send(Command::ToggleMute)
    }

    /// Ask the server for a fresh order snapshot
    pub fn refresh(&self) -> ClientResult<()> {
        self.send(Command::Refresh)
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancel the loop and wait for it to close the channel
    pub async fn stop(self) {
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            tracing::error!("Notifier task failed: {e}");
        }
    }
}
