//! Error taxonomy for the IEC 60870-5-104 core.
use thiserror::Error;

/// Errors surfaced by the APDU codec, the ASDU layer, and the connection
/// state machine.
///
/// All variants except [`IecError::WindowExhausted`] are fatal to the
/// [`crate::connection::Connection`] that raised them: the state machine
/// transitions to `CLOSED`, every armed timer is disarmed, and the error is
/// handed to [`crate::listener::ConnectionListener::on_connection_lost`].
/// `WindowExhausted` is returned only to the caller of `send`; the
/// connection remains usable.
#[derive(Error, Debug)]
pub enum IecError {
    /// Framing was violated: bad start byte, bad control bits, or a length
    /// byte out of the `[4, 253]` range.
    #[error("malformed APDU: {0}")]
    MalformedApdu(String),

    /// An information object's bytes didn't match the schema implied by its
    /// enclosing `TypeId`.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// A standard-range (1..=127) `TypeId` that isn't in the catalogue.
    #[error("unknown type identification: {0}")]
    UnknownTypeId(u8),

    /// A partial frame did not complete within `message_fragment_timeout`.
    #[error("timed out waiting for the rest of an APDU fragment")]
    FragmentTimeout,

    /// `send` was blocked by the outstanding-I-frame window (`k`) longer
    /// than the caller's timeout. Non-fatal.
    #[error("send window exhausted: no acknowledgement within the given timeout")]
    WindowExhausted,

    /// A STARTDT/STOPDT/TESTFR confirmation, or the acknowledgement of an
    /// outstanding I-frame, did not arrive before t1 elapsed.
    #[error("handshake timed out waiting for confirmation")]
    HandshakeTimeout,

    /// `send`/`start_data_transfer`/`stop_data_transfer` was called while
    /// data transfer was not active.
    #[error("data transfer not started")]
    NotStarted,

    /// The peer closed the TCP connection, or the socket faulted.
    #[error("transport closed: {0}")]
    TransportClosed(String),

    /// The connection has already reached the terminal `CLOSED` state.
    #[error("connection is closed")]
    ConnectionClosed,

    /// `ConnectionSettings` failed validation (e.g. `t2 >= t1`, an
    /// out-of-range field length).
    #[error("invalid configuration: {0}")]
    ConfigError(String),

    /// Propagated I/O failure (socket read/write, connect, bind).
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate's public API.
pub type IecResult<T> = Result<T, IecError>;
