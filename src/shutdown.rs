use tokio::sync::broadcast;

pub type ShutdownSender = broadcast::Sender<()>;
pub type ShutdownReceiver = broadcast::Receiver<()>;

const SHUTDOWN_CHANNEL_CAPACITY: usize = 1;

/// Broadcast channel used to cancel a run from any wait point.
#[must_use]
pub fn shutdown_channel() -> (ShutdownSender, ShutdownReceiver) {
    broadcast::channel(SHUTDOWN_CHANNEL_CAPACITY)
}
