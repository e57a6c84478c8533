//! The connection state machine: a single actor task owns the socket and
//! every piece of mutable protocol state, reached only through
//! [`ConnectionHandle`]. No field here is ever touched from more than one
//! task, so nothing in this module needs a `Mutex`.
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::apdu::{Apci, Apdu, UFrameFunction};
use crate::asdu::{Asdu, WireFormat};
use crate::error::{IecError, IecResult};
use crate::listener::ConnectionListener;

/// Immutable, validated connection parameters.
///
/// Build with [`ConnectionSettings::builder`]; the builder's `.build()`
/// enforces the invariants the bare struct can't: `t2` must leave room
/// inside `t1`, and the information-object address width must be one
/// IEC 60870-5-104 actually supports.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    /// Acknowledgement timeout: how long an I-frame may go unacknowledged.
    pub t1: Duration,
    /// Maximum delay before acknowledging received I-frames.
    pub t2: Duration,
    /// Idle timeout before a TESTFR is sent to confirm the link is alive.
    pub t3: Duration,
    /// Maximum number of outstanding (sent, unacknowledged) I-frames.
    pub k: u16,
    /// Maximum number of received I-frames before a forced acknowledgement.
    pub w: u16,
    /// How long a partially-received APDU may take to complete.
    pub message_fragment_timeout: Duration,
    /// Wire field widths for the ASDU layer.
    pub wire_format: WireFormat,
}

impl ConnectionSettings {
    /// Start building settings from the standard's recommended defaults
    /// (t1=15s, t2=10s, t3=20s, k=12, w=8).
    pub fn builder() -> ConnectionSettingsBuilder {
        ConnectionSettingsBuilder::default()
    }
}

/// Builder for [`ConnectionSettings`].
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettingsBuilder {
    t1: Duration,
    t2: Duration,
    t3: Duration,
    k: u16,
    w: u16,
    message_fragment_timeout: Duration,
    wire_format: WireFormat,
}

impl Default for ConnectionSettingsBuilder {
    fn default() -> Self {
        Self {
            t1: Duration::from_secs(15),
            t2: Duration::from_secs(10),
            t3: Duration::from_secs(20),
            k: 12,
            w: 8,
            message_fragment_timeout: Duration::from_secs(5),
            wire_format: WireFormat::default(),
        }
    }
}

impl ConnectionSettingsBuilder {
    /// Set t1, the acknowledgement timeout.
    pub fn with_t1(mut self, t1: Duration) -> Self {
        self.t1 = t1;
        self
    }

    /// Set t2, the maximum delayed-acknowledgement interval.
    pub fn with_t2(mut self, t2: Duration) -> Self {
        self.t2 = t2;
        self
    }

    /// Set t3, the idle/test-frame interval.
    pub fn with_t3(mut self, t3: Duration) -> Self {
        self.t3 = t3;
        self
    }

    /// Set k, the outstanding-I-frame window.
    pub fn with_k(mut self, k: u16) -> Self {
        self.k = k;
        self
    }

    /// Set w, the received-but-unacknowledged threshold.
    pub fn with_w(mut self, w: u16) -> Self {
        self.w = w;
        self
    }

    /// Set how long a fragmented APDU may take to complete.
    pub fn with_message_fragment_timeout(mut self, timeout: Duration) -> Self {
        self.message_fragment_timeout = timeout;
        self
    }

    /// Set the ASDU wire field widths.
    pub fn with_wire_format(mut self, wire_format: WireFormat) -> Self {
        self.wire_format = wire_format;
        self
    }

    /// Validate and produce [`ConnectionSettings`].
    pub fn build(self) -> IecResult<ConnectionSettings> {
        if self.t2 >= self.t1 {
            return Err(IecError::ConfigError(format!(
                "t2 ({:?}) must be less than t1 ({:?})",
                self.t2, self.t1
            )));
        }
        if self.k == 0 {
            return Err(IecError::ConfigError("k must be at least 1".into()));
        }
        if self.w == 0 || self.w > self.k {
            return Err(IecError::ConfigError(format!(
                "w ({}) must be nonzero and at most k ({})",
                self.w, self.k
            )));
        }
        if !matches!(self.wire_format.ioa_len, 1..=3) {
            return Err(IecError::ConfigError(format!(
                "ioa_len must be 1, 2, or 3, got {}",
                self.wire_format.ioa_len
            )));
        }
        if !matches!(self.wire_format.cot_field_len, 1 | 2)
            || !matches!(self.wire_format.common_address_len, 1 | 2)
        {
            return Err(IecError::ConfigError(
                "cot_field_len and common_address_len must each be 1 or 2".into(),
            ));
        }
        Ok(ConnectionSettings {
            t1: self.t1,
            t2: self.t2,
            t3: self.t3,
            k: self.k,
            w: self.w,
            message_fragment_timeout: self.message_fragment_timeout,
            wire_format: self.wire_format,
        })
    }
}

/// The connection's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connected, but data transfer has not been started.
    Idle,
    /// STARTDT confirmed; I-frames may be exchanged.
    Started,
    /// STOPDT confirmed; no further I-frames will be exchanged.
    Stopped,
    /// STOPDT sent, awaiting confirmation.
    PendingStop,
    /// Terminal: the socket is gone and the actor task has exited.
    Closed,
}

enum ConnectionEvent {
    FrameReceived(Apdu),
    ReaderClosed(IecError),
    Send {
        asdu: Asdu,
        deadline: Option<Instant>,
        reply: oneshot::Sender<IecResult<()>>,
    },
    StartDataTransfer(oneshot::Sender<IecResult<()>>),
    StopDataTransfer(oneshot::Sender<IecResult<()>>),
    Close(oneshot::Sender<()>),
}

/// A cheaply-cloneable, `Send + Sync` handle to a running connection
/// actor. Every method sends an event across an internal channel and
/// awaits the actor's reply; there is no shared mutable state between
/// clones.
#[derive(Clone)]
pub struct ConnectionHandle {
    events: mpsc::Sender<ConnectionEvent>,
}

impl ConnectionHandle {
    /// Send an ASDU as an I-frame, waiting up to `timeout` if the
    /// outstanding-frame window (`k`) is currently full.
    ///
    /// Returns [`IecError::WindowExhausted`] if the window doesn't free
    /// up in time, and [`IecError::NotStarted`] if data transfer isn't
    /// active.
    pub async fn send(&self, asdu: Asdu, timeout: Duration) -> IecResult<()> {
        let (reply, rx) = oneshot::channel();
        let deadline = Some(Instant::now() + timeout);
        self.events
            .send(ConnectionEvent::Send { asdu, deadline, reply })
            .await
            .map_err(|_| IecError::ConnectionClosed)?;
        rx.await.map_err(|_| IecError::ConnectionClosed)?
    }

    /// Send a confirmation ASDU mirroring `original`'s type and address
    /// with the cause of transmission set to activation-confirmation.
    pub async fn send_confirmation(&self, original: &Asdu, timeout: Duration) -> IecResult<()> {
        self.send(original.as_confirmation(), timeout).await
    }

    /// Send STARTDT and wait for the peer's confirmation.
    pub async fn start_data_transfer(&self) -> IecResult<()> {
        let (reply, rx) = oneshot::channel();
        self.events
            .send(ConnectionEvent::StartDataTransfer(reply))
            .await
            .map_err(|_| IecError::ConnectionClosed)?;
        rx.await.map_err(|_| IecError::ConnectionClosed)?
    }

    /// Send STOPDT and wait for the peer's confirmation.
    pub async fn stop_data_transfer(&self) -> IecResult<()> {
        let (reply, rx) = oneshot::channel();
        self.events
            .send(ConnectionEvent::StopDataTransfer(reply))
            .await
            .map_err(|_| IecError::ConnectionClosed)?;
        rx.await.map_err(|_| IecError::ConnectionClosed)?
    }

    /// Close the connection. Idempotent: closing an already-closed
    /// connection is a no-op.
    pub async fn close(&self) {
        let (reply, rx) = oneshot::channel();
        if self.events.send(ConnectionEvent::Close(reply)).await.is_ok() {
            let _ = rx.await;
        }
    }
}

struct PendingSend {
    asdu: Asdu,
    deadline: Option<Instant>,
    reply: oneshot::Sender<IecResult<()>>,
}

/// Spawn the connection actor over an already-connected, already-split
/// async byte stream, returning a handle to it.
///
/// The reader half is driven by a dedicated task that only ever forwards
/// [`ConnectionEvent`]s into the actor's channel; all decoding beyond
/// framing, all timers, and all state transitions live on the actor task
/// spawned here.
pub fn spawn<R, W>(
    reader: R,
    writer: W,
    settings: ConnectionSettings,
    listener: Arc<dyn ConnectionListener>,
) -> ConnectionHandle
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (events_tx, events_rx) = mpsc::channel(64);

    let reader_events_tx = events_tx.clone();
    tokio::spawn(read_loop(reader, settings, reader_events_tx));

    tokio::spawn(run_actor(writer, settings, listener, events_rx));

    ConnectionHandle { events: events_tx }
}

async fn read_loop<R>(mut reader: R, settings: ConnectionSettings, events_tx: mpsc::Sender<ConnectionEvent>)
where
    R: AsyncRead + Unpin,
{
    loop {
        match Apdu::read_from(&mut reader, settings.wire_format, settings.message_fragment_timeout).await {
            Ok(apdu) => {
                if events_tx.send(ConnectionEvent::FrameReceived(apdu)).await.is_err() {
                    return;
                }
            }
            Err(err) => {
                let _ = events_tx.send(ConnectionEvent::ReaderClosed(err)).await;
                return;
            }
        }
    }
}

/// Signed 15-bit sequence-number difference `a - b`, wrapped into
/// `[-2^14, 2^14)`. Negative means `a` precedes `b` in send order.
fn seq_diff(a: u16, b: u16) -> i32 {
    let raw = (a as i32 - b as i32) & 0x7FFF;
    if raw >= 0x4000 {
        raw - 0x8000
    } else {
        raw
    }
}

/// Pop every entry from `outstanding` that the peer's `recv_seq` has now
/// acknowledged. `outstanding` holds send-sequence numbers in the order
/// they were transmitted, so acknowledgement is always a prefix: an
/// entry is acknowledged once it precedes `recv_seq` under the signed
/// 15-bit sequence ordering. A stale or regressed `recv_seq` (one that
/// doesn't precede the oldest outstanding entry) acknowledges nothing,
/// rather than draining the whole queue.
fn acknowledge_up_to(outstanding: &mut VecDeque<u16>, recv_seq: u16) {
    while let Some(&front) = outstanding.front() {
        if seq_diff(front, recv_seq) < 0 {
            outstanding.pop_front();
        } else {
            break;
        }
    }
}

struct Actor<W> {
    writer: W,
    settings: ConnectionSettings,
    listener: Arc<dyn ConnectionListener>,
    state: ConnectionState,
    send_seq: u16,
    recv_seq: u16,
    outstanding: VecDeque<u16>,
    pending_sends: VecDeque<PendingSend>,
    unacked_received: u16,
    t1_deadline: Option<Instant>,
    t2_deadline: Option<Instant>,
    t3_deadline: Instant,
    awaiting_test_confirmation: bool,
    start_reply: Option<oneshot::Sender<IecResult<()>>>,
    stop_reply: Option<oneshot::Sender<IecResult<()>>>,
}

impl<W> Actor<W>
where
    W: AsyncWrite + Unpin,
{
    async fn write_apdu(&mut self, apdu: &Apdu) -> IecResult<()> {
        let bytes = apdu.encode(self.settings.wire_format)?;
        self.writer.write_all(&bytes).await?;
        self.t3_deadline = Instant::now() + self.settings.t3;
        Ok(())
    }

    async fn handle_frame(&mut self, apdu: Apdu) -> IecResult<()> {
        self.t3_deadline = Instant::now() + self.settings.t3;
        match apdu.apci {
            Apci::IFrame { send_seq, recv_seq } => {
                if send_seq != self.recv_seq {
                    return Err(IecError::MalformedApdu(format!(
                        "expected send sequence {}, peer sent {}",
                        self.recv_seq, send_seq
                    )));
                }
                self.recv_seq = self.recv_seq.wrapping_add(1) & 0x7FFF;
                acknowledge_up_to(&mut self.outstanding, recv_seq);
                self.rearm_t1();
                self.unacked_received += 1;
                if self.t2_deadline.is_none() {
                    self.t2_deadline = Some(Instant::now() + self.settings.t2);
                }
                if self.unacked_received >= self.settings.w {
                    self.send_standalone_ack().await?;
                }
                if let Some(asdu) = apdu.asdu {
                    self.listener.on_asdu_received(asdu).await;
                }
                self.try_drain_pending_sends().await?;
            }
            Apci::SFrame { recv_seq } => {
                acknowledge_up_to(&mut self.outstanding, recv_seq);
                self.rearm_t1();
                self.try_drain_pending_sends().await?;
            }
            Apci::UFrame(function) => self.handle_u_frame(function).await?,
        }
        Ok(())
    }

    async fn handle_u_frame(&mut self, function: UFrameFunction) -> IecResult<()> {
        match function {
            UFrameFunction::StartDtActivation => {
                self.state = ConnectionState::Started;
                self.write_apdu(&Apdu::u_frame(UFrameFunction::StartDtConfirmation)).await?;
            }
            UFrameFunction::StartDtConfirmation => {
                self.state = ConnectionState::Started;
                if let Some(reply) = self.start_reply.take() {
                    let _ = reply.send(Ok(()));
                }
                self.rearm_t1();
            }
            UFrameFunction::StopDtActivation => {
                self.state = ConnectionState::Stopped;
                self.write_apdu(&Apdu::u_frame(UFrameFunction::StopDtConfirmation)).await?;
            }
            UFrameFunction::StopDtConfirmation => {
                self.state = ConnectionState::Stopped;
                if let Some(reply) = self.stop_reply.take() {
                    let _ = reply.send(Ok(()));
                }
                self.rearm_t1();
            }
            UFrameFunction::TestFrActivation => {
                self.write_apdu(&Apdu::u_frame(UFrameFunction::TestFrConfirmation)).await?;
            }
            UFrameFunction::TestFrConfirmation => {
                self.awaiting_test_confirmation = false;
                self.rearm_t1();
            }
        }
        Ok(())
    }

    async fn send_standalone_ack(&mut self) -> IecResult<()> {
        self.write_apdu(&Apdu::s_frame(self.recv_seq)).await?;
        self.unacked_received = 0;
        self.t2_deadline = None;
        Ok(())
    }

    /// Recompute `t1_deadline` from the outstanding-I-frame queue. A no-op
    /// while a STARTDT/STOPDT/TESTFR confirmation is still pending: that
    /// deadline is armed explicitly by whoever sent the activation, and
    /// must survive unrelated traffic (e.g. acks) arriving in the meantime.
    fn rearm_t1(&mut self) {
        if self.start_reply.is_some() || self.stop_reply.is_some() || self.awaiting_test_confirmation {
            return;
        }
        self.t1_deadline = if self.outstanding.is_empty() {
            None
        } else {
            Some(Instant::now() + self.settings.t1)
        };
    }

    async fn try_send_now(&mut self, asdu: Asdu) -> IecResult<()> {
        let send_seq = self.send_seq;
        let apdu = Apdu::i_frame(send_seq, self.recv_seq, asdu);
        self.write_apdu(&apdu).await?;
        self.outstanding.push_back(send_seq);
        self.send_seq = self.send_seq.wrapping_add(1) & 0x7FFF;
        self.unacked_received = 0;
        self.t2_deadline = None;
        self.rearm_t1();
        Ok(())
    }

    async fn try_drain_pending_sends(&mut self) -> IecResult<()> {
        if self.state != ConnectionState::Started {
            return Ok(());
        }
        while (self.outstanding.len() as u16) < self.settings.k {
            let Some(pending) = self.pending_sends.pop_front() else {
                break;
            };
            if pending.deadline.is_some_and(|d| Instant::now() > d) {
                let _ = pending.reply.send(Err(IecError::WindowExhausted));
                continue;
            }
            let result = self.try_send_now(pending.asdu).await;
            let _ = pending.reply.send(result);
        }
        Ok(())
    }

    async fn handle_send(
        &mut self,
        asdu: Asdu,
        deadline: Option<Instant>,
        reply: oneshot::Sender<IecResult<()>>,
    ) -> IecResult<()> {
        if self.state != ConnectionState::Started {
            let _ = reply.send(Err(IecError::NotStarted));
            return Ok(());
        }
        if (self.outstanding.len() as u16) < self.settings.k && self.pending_sends.is_empty() {
            let result = self.try_send_now(asdu).await;
            let _ = reply.send(result);
        } else {
            self.pending_sends.push_back(PendingSend { asdu, deadline, reply });
        }
        Ok(())
    }

    fn expire_pending_sends(&mut self) {
        let now = Instant::now();
        self.pending_sends.retain_mut(|pending| {
            if pending.deadline.is_some_and(|d| now > d) {
                let reply = std::mem::replace(&mut pending.reply, oneshot::channel().0);
                let _ = reply.send(Err(IecError::WindowExhausted));
                false
            } else {
                true
            }
        });
    }

    async fn on_t1_expired(&mut self) -> IecResult<()> {
        if !self.outstanding.is_empty()
            || self.start_reply.is_some()
            || self.stop_reply.is_some()
            || self.awaiting_test_confirmation
        {
            return Err(IecError::HandshakeTimeout);
        }
        Ok(())
    }

    async fn on_t2_expired(&mut self) -> IecResult<()> {
        self.send_standalone_ack().await
    }

    async fn on_t3_expired(&mut self) -> IecResult<()> {
        if self.awaiting_test_confirmation {
            return Err(IecError::HandshakeTimeout);
        }
        self.awaiting_test_confirmation = true;
        self.write_apdu(&Apdu::u_frame(UFrameFunction::TestFrActivation)).await?;
        self.t1_deadline = Some(Instant::now() + self.settings.t1);
        Ok(())
    }
}

async fn run_actor<W>(
    writer: W,
    settings: ConnectionSettings,
    listener: Arc<dyn ConnectionListener>,
    mut events_rx: mpsc::Receiver<ConnectionEvent>,
) where
    W: AsyncWrite + Unpin,
{
    let mut actor = Actor {
        writer,
        settings,
        listener,
        state: ConnectionState::Idle,
        send_seq: 0,
        recv_seq: 0,
        outstanding: VecDeque::new(),
        pending_sends: VecDeque::new(),
        unacked_received: 0,
        t1_deadline: None,
        t2_deadline: None,
        t3_deadline: Instant::now() + settings.t3,
        awaiting_test_confirmation: false,
        start_reply: None,
        stop_reply: None,
    };

    let mut closed_locally = false;
    let close_cause = loop {
        let t1_sleep = sleep_until_opt(actor.t1_deadline);
        let t2_sleep = sleep_until_opt(actor.t2_deadline);
        let t3_sleep = tokio::time::sleep_until(actor.t3_deadline);

        tokio::select! {
            event = events_rx.recv() => {
                let Some(event) = event else {
                    break IecError::ConnectionClosed;
                };
                match event {
                    ConnectionEvent::FrameReceived(apdu) => {
                        if let Err(err) = actor.handle_frame(apdu).await {
                            break err;
                        }
                    }
                    ConnectionEvent::ReaderClosed(err) => break err,
                    ConnectionEvent::Send { asdu, deadline, reply } => {
                        if let Err(err) = actor.handle_send(asdu, deadline, reply).await {
                            break err;
                        }
                    }
                    ConnectionEvent::StartDataTransfer(reply) => {
                        if actor.state == ConnectionState::Started {
                            let _ = reply.send(Ok(()));
                        } else {
                            actor.start_reply = Some(reply);
                            if let Err(err) = actor
                                .write_apdu(&Apdu::u_frame(UFrameFunction::StartDtActivation))
                                .await
                            {
                                break err;
                            }
                            actor.t1_deadline = Some(Instant::now() + actor.settings.t1);
                        }
                    }
                    ConnectionEvent::StopDataTransfer(reply) => {
                        if actor.state == ConnectionState::Stopped {
                            let _ = reply.send(Ok(()));
                        } else {
                            actor.stop_reply = Some(reply);
                            actor.state = ConnectionState::PendingStop;
                            if let Err(err) = actor
                                .write_apdu(&Apdu::u_frame(UFrameFunction::StopDtActivation))
                                .await
                            {
                                break err;
                            }
                            actor.t1_deadline = Some(Instant::now() + actor.settings.t1);
                        }
                    }
                    ConnectionEvent::Close(reply) => {
                        let _ = reply.send(());
                        closed_locally = true;
                        break IecError::ConnectionClosed;
                    }
                }
            }
            _ = t1_sleep, if actor.t1_deadline.is_some() => {
                if let Err(err) = actor.on_t1_expired().await {
                    break err;
                }
            }
            _ = t2_sleep, if actor.t2_deadline.is_some() => {
                if let Err(err) = actor.on_t2_expired().await {
                    break err;
                }
            }
            _ = t3_sleep => {
                if let Err(err) = actor.on_t3_expired().await {
                    break err;
                }
            }
        }
        actor.expire_pending_sends();
    };

    actor.state = ConnectionState::Closed;
    for pending in actor.pending_sends.drain(..) {
        let _ = pending.reply.send(Err(IecError::ConnectionClosed));
    }
    if let Some(reply) = actor.start_reply.take() {
        let _ = reply.send(Err(IecError::ConnectionClosed));
    }
    if let Some(reply) = actor.stop_reply.take() {
        let _ = reply.send(Err(IecError::ConnectionClosed));
    }
    debug!(?close_cause, "connection actor exiting");
    if !closed_locally {
        actor.listener.on_connection_lost(close_cause).await;
    }
    info!("connection closed");
}

fn sleep_until_opt(deadline: Option<Instant>) -> tokio::time::Sleep {
    tokio::time::sleep_until(deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acknowledge_up_to_pops_a_prefix() {
        let mut outstanding: VecDeque<u16> = vec![10, 11, 12, 13].into();
        acknowledge_up_to(&mut outstanding, 12);
        assert_eq!(outstanding, VecDeque::from(vec![12, 13]));
    }

    #[test]
    fn acknowledge_up_to_wraps_at_15_bits() {
        let mut outstanding: VecDeque<u16> = vec![0x7FFE, 0x7FFF, 0x0000, 0x0001].into();
        acknowledge_up_to(&mut outstanding, 0x0001);
        assert_eq!(outstanding, VecDeque::from(vec![0x0001]));
    }

    #[test]
    fn acknowledge_up_to_ignores_a_stale_recv_seq() {
        let mut outstanding: VecDeque<u16> = vec![10, 11, 12].into();
        acknowledge_up_to(&mut outstanding, 3);
        assert_eq!(outstanding, VecDeque::from(vec![10, 11, 12]));
    }

    #[test]
    fn seq_diff_stays_within_signed_15_bit_range() {
        assert_eq!(seq_diff(10, 12), -2);
        assert_eq!(seq_diff(12, 10), 2);
        assert_eq!(seq_diff(0x7FFE, 0x0001), -3);
        assert_eq!(seq_diff(0x0001, 0x7FFE), 3);
        assert_eq!(seq_diff(5, 5), 0);
    }

    #[test]
    fn settings_builder_rejects_t2_not_less_than_t1() {
        let err = ConnectionSettings::builder()
            .with_t1(Duration::from_secs(5))
            .with_t2(Duration::from_secs(5))
            .build()
            .unwrap_err();
        assert!(matches!(err, IecError::ConfigError(_)));
    }

    #[test]
    fn settings_builder_rejects_w_greater_than_k() {
        let err = ConnectionSettings::builder().with_k(4).with_w(5).build().unwrap_err();
        assert!(matches!(err, IecError::ConfigError(_)));
    }

    #[test]
    fn settings_builder_accepts_defaults() {
        ConnectionSettings::builder().build().unwrap();
    }
}
