//! Factory functions that turn a TCP socket into a running connection
//! actor: [`connect`] for the controlling (client) station, [`listen`]
//! for the controlled (server) station.
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::info;

use crate::connection::{spawn, ConnectionHandle, ConnectionSettings};
use crate::error::IecResult;
use crate::listener::ConnectionListener;

/// Dial `addr` and spawn a connection actor over the resulting TCP
/// stream.
pub async fn connect(
    addr: impl ToSocketAddrs,
    settings: ConnectionSettings,
    listener: Arc<dyn ConnectionListener>,
) -> IecResult<ConnectionHandle> {
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    let peer = stream.peer_addr()?;
    info!(%peer, "connected");
    let (read_half, write_half) = stream.into_split();
    Ok(spawn(read_half, write_half, settings, listener))
}

/// A bound listening socket that accepts inbound connections and spawns
/// a connection actor for each, handing the handle to `on_connected`.
pub struct Endpoint {
    listener: TcpListener,
}

impl Endpoint {
    /// Bind a TCP listener at `addr`.
    pub async fn bind(addr: impl ToSocketAddrs) -> IecResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "listening");
        Ok(Self { listener })
    }

    /// Accept one inbound connection and spawn a connection actor over
    /// it.
    pub async fn accept(
        &self,
        settings: ConnectionSettings,
        listener: Arc<dyn ConnectionListener>,
    ) -> IecResult<(ConnectionHandle, SocketAddr)> {
        let (stream, peer) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        info!(%peer, "accepted connection");
        let (read_half, write_half) = stream.into_split();
        Ok((spawn(read_half, write_half, settings, listener), peer))
    }

    /// The address this endpoint is bound to.
    pub fn local_addr(&self) -> IecResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}
