//! The callback interface through which a connection delivers incoming
//! ASDUs and reports its own loss to application code.
use async_trait::async_trait;

use crate::asdu::Asdu;
use crate::error::IecError;

/// Implemented by application code that wants to react to traffic on a
/// [`crate::connection::ConnectionHandle`].
///
/// Both methods run on the connection's actor task; an implementation
/// that blocks delays every other I/O the connection needs to do
/// (acknowledgements, timers). Hand long-running work off to another
/// task.
#[async_trait]
pub trait ConnectionListener: Send + Sync {
    /// Called once per incoming ASDU, in the order it was received.
    async fn on_asdu_received(&self, asdu: Asdu);

    /// Called exactly once, when the connection transitions to `CLOSED`
    /// for any reason: a fatal protocol error, the peer closing the
    /// socket, or an explicit local close.
    async fn on_connection_lost(&self, cause: IecError);
}
