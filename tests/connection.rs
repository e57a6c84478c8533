//! End-to-end exercises of the connection actor over an in-memory duplex
//! stream, reproducing the handshake, windowing, and timer scenarios.
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;

use iec60870_core::asdu::{Asdu, InformationObject, TypeId, WireFormat};
use iec60870_core::common::CauseOfTransmission;
use iec60870_core::connection::{self, ConnectionHandle, ConnectionSettings};
use iec60870_core::elements::InformationElement;
use iec60870_core::error::IecError;
use iec60870_core::listener::ConnectionListener;
use iec60870_core::Apdu;

struct RecordingListener {
    received: mpsc::UnboundedSender<Asdu>,
    lost: mpsc::UnboundedSender<IecError>,
}

#[async_trait]
impl ConnectionListener for RecordingListener {
    async fn on_asdu_received(&self, asdu: Asdu) {
        let _ = self.received.send(asdu);
    }

    async fn on_connection_lost(&self, cause: IecError) {
        let _ = self.lost.send(cause);
    }
}

struct Harness {
    handle: ConnectionHandle,
    peer: DuplexStream,
    received: mpsc::UnboundedReceiver<Asdu>,
    lost: mpsc::UnboundedReceiver<IecError>,
}

fn spawn_harness(settings: ConnectionSettings) -> Harness {
    let (actor_io, peer) = tokio::io::duplex(8192);
    let (reader, writer) = tokio::io::split(actor_io);
    let (received_tx, received_rx) = mpsc::unbounded_channel();
    let (lost_tx, lost_rx) = mpsc::unbounded_channel();
    let listener = std::sync::Arc::new(RecordingListener {
        received: received_tx,
        lost: lost_tx,
    });
    let handle = connection::spawn(reader, writer, settings, listener);
    Harness {
        handle,
        peer,
        received: received_rx,
        lost: lost_rx,
    }
}

async fn read_exact_timeout(peer: &mut DuplexStream, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    tokio::time::timeout(Duration::from_secs(2), peer.read_exact(&mut buf))
        .await
        .expect("frame did not arrive in time")
        .expect("read failed");
    buf
}

async fn write_frame(peer: &mut DuplexStream, bytes: &[u8]) {
    peer.write_all(bytes).await.expect("write failed");
}

fn settings(t1_ms: u64, t2_ms: u64, t3_ms: u64, k: u16, w: u16) -> ConnectionSettings {
    ConnectionSettings::builder()
        .with_t1(Duration::from_millis(t1_ms))
        .with_t2(Duration::from_millis(t2_ms))
        .with_t3(Duration::from_millis(t3_ms))
        .with_k(k)
        .with_w(w)
        .build()
        .unwrap()
}

async fn perform_startdt_handshake(handle: &ConnectionHandle, peer: &mut DuplexStream) {
    let start = tokio::spawn({
        let handle = handle.clone();
        async move { handle.start_data_transfer().await }
    });
    let act = read_exact_timeout(peer, 6).await;
    assert_eq!(act, vec![0x68, 0x04, 0x07, 0x00, 0x00, 0x00]);
    write_frame(peer, &[0x68, 0x04, 0x0B, 0x00, 0x00, 0x00]).await;
    start.await.unwrap().unwrap();
}

fn scaled_asdu(common_address: u16) -> Asdu {
    Asdu::new(
        TypeId::MMeNb1,
        false,
        CauseOfTransmission::Spontaneous,
        0,
        common_address,
        vec![InformationObject::new(
            100,
            vec![InformationElement::ScaledValue {
                raw: 1234,
                quality: Default::default(),
            }],
        )],
    )
}

#[tokio::test]
async fn s1_startdt_handshake() {
    let mut harness = spawn_harness(settings(500, 200, 5_000, 12, 8));
    perform_startdt_handshake(&harness.handle, &mut harness.peer).await;
}

#[tokio::test]
async fn s2_first_i_frame_bytes_match_the_wire_format() {
    let mut harness = spawn_harness(settings(500, 200, 5_000, 12, 8));
    perform_startdt_handshake(&harness.handle, &mut harness.peer).await;

    harness
        .handle
        .send(scaled_asdu(1), Duration::from_secs(1))
        .await
        .unwrap();

    let frame = read_exact_timeout(&mut harness.peer, 18).await;
    assert_eq!(
        frame,
        vec![
            0x68, 0x10, 0x00, 0x00, 0x00, 0x00, 0x0B, 0x01, 0x03, 0x00, 0x01, 0x00, 0x64, 0x00,
            0x00, 0xD2, 0x04, 0x00,
        ]
    );
}

#[tokio::test]
async fn s3_delayed_ack_via_t2() {
    let mut harness = spawn_harness(settings(500, 60, 5_000, 12, 8));
    perform_startdt_handshake(&harness.handle, &mut harness.peer).await;

    let asdu = Asdu::new_private(200, CauseOfTransmission::Spontaneous, 0, 1, vec![1, 2, 3]);
    let i_frame = Apdu::i_frame(0, 0, asdu).encode(WireFormat::default()).unwrap();
    write_frame(&mut harness.peer, &i_frame).await;

    let ack = read_exact_timeout(&mut harness.peer, 6).await;
    assert_eq!(ack, vec![0x68, 0x04, 0x01, 0x00, 0x02, 0x00]);
}

#[tokio::test]
async fn s4_testfr_on_idle_and_reply_keeps_the_connection_open() {
    let mut harness = spawn_harness(settings(500, 200, 60, 12, 8));

    let act = read_exact_timeout(&mut harness.peer, 6).await;
    assert_eq!(act, vec![0x68, 0x04, 0x43, 0x00, 0x00, 0x00]);
    write_frame(&mut harness.peer, &[0x68, 0x04, 0x83, 0x00, 0x00, 0x00]).await;

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(harness.lost.try_recv().is_err(), "connection should still be alive");
}

#[tokio::test]
async fn s5_t1_timeout_on_unacked_i_frame_closes_the_connection() {
    let mut harness = spawn_harness(settings(80, 40, 5_000, 12, 8));
    perform_startdt_handshake(&harness.handle, &mut harness.peer).await;

    harness
        .handle
        .send(scaled_asdu(1), Duration::from_secs(1))
        .await
        .unwrap();

    let cause = tokio::time::timeout(Duration::from_secs(1), harness.lost.recv())
        .await
        .expect("connection should be torn down")
        .expect("listener channel closed");
    assert!(matches!(cause, IecError::HandshakeTimeout));
}

#[tokio::test]
async fn s6_private_type_asdu_reaches_the_listener() {
    let mut harness = spawn_harness(settings(500, 200, 5_000, 12, 8));

    let asdu = Asdu::new_private(200, CauseOfTransmission::Spontaneous, 0, 1, vec![9, 8, 7, 6, 5, 4]);
    let i_frame = Apdu::i_frame(0, 0, asdu.clone())
        .encode(WireFormat::default())
        .unwrap();
    write_frame(&mut harness.peer, &i_frame).await;

    let delivered = tokio::time::timeout(Duration::from_secs(1), harness.received.recv())
        .await
        .expect("asdu was never delivered")
        .expect("listener channel closed");
    assert_eq!(delivered, asdu);
}

#[tokio::test]
async fn p4_kth_plus_one_send_blocks_then_times_out() {
    let mut harness = spawn_harness(settings(5_000, 2_000, 5_000, 1, 8));
    perform_startdt_handshake(&harness.handle, &mut harness.peer).await;

    harness
        .handle
        .send(scaled_asdu(1), Duration::from_secs(1))
        .await
        .unwrap();
    let _first = read_exact_timeout(&mut harness.peer, 18).await;

    let err = harness
        .handle
        .send(scaled_asdu(1), Duration::from_millis(80))
        .await
        .unwrap_err();
    assert!(matches!(err, IecError::WindowExhausted));
}

#[tokio::test]
async fn p4_ack_frees_a_window_slot() {
    let mut harness = spawn_harness(settings(5_000, 2_000, 5_000, 1, 8));
    perform_startdt_handshake(&harness.handle, &mut harness.peer).await;

    harness
        .handle
        .send(scaled_asdu(1), Duration::from_secs(1))
        .await
        .unwrap();
    let _first = read_exact_timeout(&mut harness.peer, 18).await;

    let second_send = tokio::spawn({
        let handle = harness.handle.clone();
        async move { handle.send(scaled_asdu(2), Duration::from_secs(2)).await }
    });

    // Acknowledge send_seq 0 by advertising recv_seq 1.
    write_frame(&mut harness.peer, &[0x68, 0x04, 0x01, 0x00, 0x02, 0x00]).await;

    second_send.await.unwrap().unwrap();
    let _second = read_exact_timeout(&mut harness.peer, 18).await;
}

#[tokio::test]
async fn p5_w_threshold_forces_an_immediate_ack() {
    let mut harness = spawn_harness(settings(5_000, 5_000, 5_000, 12, 2));
    perform_startdt_handshake(&harness.handle, &mut harness.peer).await;

    for send_seq in 0..2u16 {
        let asdu = Asdu::new_private(200, CauseOfTransmission::Spontaneous, 0, 1, vec![1]);
        let i_frame = Apdu::i_frame(send_seq, 0, asdu).encode(WireFormat::default()).unwrap();
        write_frame(&mut harness.peer, &i_frame).await;
    }

    // t2 is deliberately far longer than any reasonable wait here, so an ack
    // arriving at all demonstrates it came from the w-threshold check, not
    // from t2 expiring.
    let ack = read_exact_timeout(&mut harness.peer, 6).await;
    assert_eq!(ack, vec![0x68, 0x04, 0x01, 0x00, 0x04, 0x00]);
}

#[tokio::test]
async fn close_is_idempotent_and_unblocks_pending_callers() {
    let mut harness = spawn_harness(settings(5_000, 2_000, 5_000, 1, 8));
    perform_startdt_handshake(&harness.handle, &mut harness.peer).await;
    harness
        .handle
        .send(scaled_asdu(1), Duration::from_secs(1))
        .await
        .unwrap();
    let _first = read_exact_timeout(&mut harness.peer, 18).await;

    let blocked_send = tokio::spawn({
        let handle = harness.handle.clone();
        async move { handle.send(scaled_asdu(2), Duration::from_secs(5)).await }
    });

    harness.handle.close().await;
    harness.handle.close().await;

    let err = blocked_send.await.unwrap().unwrap_err();
    assert!(matches!(err, IecError::ConnectionClosed));

    // An explicit, local close must not be reported through the listener:
    // onConnectionLost is for the peer/transport tearing the link down.
    assert!(
        harness.lost.try_recv().is_err(),
        "local close() must not invoke on_connection_lost"
    );
}

#[tokio::test]
async fn start_data_transfer_without_confirmation_times_out() {
    let mut harness = spawn_harness(settings(80, 40, 5_000, 12, 8));

    let start = tokio::spawn({
        let handle = harness.handle.clone();
        async move { handle.start_data_transfer().await }
    });
    let act = read_exact_timeout(&mut harness.peer, 6).await;
    assert_eq!(act, vec![0x68, 0x04, 0x07, 0x00, 0x00, 0x00]);
    // Peer never answers with STARTDT_CON.

    let cause = tokio::time::timeout(Duration::from_secs(1), harness.lost.recv())
        .await
        .expect("connection should be torn down")
        .expect("listener channel closed");
    assert!(matches!(cause, IecError::HandshakeTimeout));

    let err = start.await.unwrap().unwrap_err();
    assert!(matches!(err, IecError::ConnectionClosed));
}

#[tokio::test]
async fn stop_data_transfer_without_confirmation_times_out() {
    let mut harness = spawn_harness(settings(80, 40, 5_000, 12, 8));
    perform_startdt_handshake(&harness.handle, &mut harness.peer).await;

    let stop = tokio::spawn({
        let handle = harness.handle.clone();
        async move { handle.stop_data_transfer().await }
    });
    let act = read_exact_timeout(&mut harness.peer, 6).await;
    assert_eq!(act, vec![0x68, 0x04, 0x13, 0x00, 0x00, 0x00]);
    // Peer never answers with STOPDT_CON.

    let cause = tokio::time::timeout(Duration::from_secs(1), harness.lost.recv())
        .await
        .expect("connection should be torn down")
        .expect("listener channel closed");
    assert!(matches!(cause, IecError::HandshakeTimeout));

    let err = stop.await.unwrap().unwrap_err();
    assert!(matches!(err, IecError::ConnectionClosed));
}

#[tokio::test]
async fn stray_traffic_during_testfr_challenge_still_times_out() {
    let mut harness = spawn_harness(settings(80, 40, 60, 12, 8));

    let act = read_exact_timeout(&mut harness.peer, 6).await;
    assert_eq!(act, vec![0x68, 0x04, 0x43, 0x00, 0x00, 0x00]);

    // The peer keeps sending unrelated S-frames instead of TESTFR_CON; none
    // of this should reset the t1 deadline armed for the challenge.
    for _ in 0..3 {
        tokio::time::sleep(Duration::from_millis(30)).await;
        write_frame(&mut harness.peer, &[0x68, 0x04, 0x01, 0x00, 0x00, 0x00]).await;
    }

    let cause = tokio::time::timeout(Duration::from_secs(1), harness.lost.recv())
        .await
        .expect("connection should be torn down")
        .expect("listener channel closed");
    assert!(matches!(cause, IecError::HandshakeTimeout));
}

#[tokio::test]
async fn pending_sends_do_not_drain_while_stopped() {
    let mut harness = spawn_harness(settings(5_000, 2_000, 5_000, 1, 8));
    perform_startdt_handshake(&harness.handle, &mut harness.peer).await;

    harness
        .handle
        .send(scaled_asdu(1), Duration::from_secs(1))
        .await
        .unwrap();
    let _first = read_exact_timeout(&mut harness.peer, 18).await;

    // Window is full (k=1). Queue a second send, then request STOPDT before
    // it has a chance to go out.
    let queued_send = tokio::spawn({
        let handle = harness.handle.clone();
        async move { handle.send(scaled_asdu(2), Duration::from_secs(2)).await }
    });

    let stop = tokio::spawn({
        let handle = harness.handle.clone();
        async move { handle.stop_data_transfer().await }
    });
    let stop_act = read_exact_timeout(&mut harness.peer, 6).await;
    assert_eq!(stop_act, vec![0x68, 0x04, 0x13, 0x00, 0x00, 0x00]);

    // Ack the first I-frame, freeing window space, while still PENDING_STOP.
    write_frame(&mut harness.peer, &[0x68, 0x04, 0x01, 0x00, 0x02, 0x00]).await;

    // No new I-frame should appear: a byte read here would have to be one.
    let mut probe = [0u8; 1];
    let result = tokio::time::timeout(Duration::from_millis(150), harness.peer.read(&mut probe)).await;
    assert!(result.is_err(), "an I-frame was sent while PENDING_STOP/STOPPED");

    write_frame(&mut harness.peer, &[0x68, 0x04, 0x23, 0x00, 0x00, 0x00]).await;
    stop.await.unwrap().unwrap();

    // Still stopped: the queued send remains parked, not transmitted.
    let mut probe = [0u8; 1];
    let result = tokio::time::timeout(Duration::from_millis(150), harness.peer.read(&mut probe)).await;
    assert!(result.is_err(), "an I-frame was sent while STOPPED");

    harness.handle.close().await;
    let err = queued_send.await.unwrap().unwrap_err();
    assert!(matches!(err, IecError::ConnectionClosed));
}

#[tokio::test]
async fn p6_inbound_traffic_resets_the_idle_timer() {
    let mut harness = spawn_harness(settings(5_000, 5_000, 200, 12, 8));

    for send_seq in 0..3u16 {
        tokio::time::sleep(Duration::from_millis(60)).await;
        let asdu = Asdu::new_private(200, CauseOfTransmission::Spontaneous, 0, 1, vec![1]);
        let i_frame = Apdu::i_frame(send_seq, 0, asdu).encode(WireFormat::default()).unwrap();
        write_frame(&mut harness.peer, &i_frame).await;
    }

    // Each I-frame arrived well inside t3 (200ms) of the last, so the idle
    // timer should never have fired a TESTFR_ACT: no bytes are waiting.
    let mut probe = [0u8; 1];
    let result = tokio::time::timeout(Duration::from_millis(50), harness.peer.read(&mut probe)).await;
    assert!(result.is_err(), "idle timer fired even though traffic kept arriving");
}

#[tokio::test]
async fn send_before_start_data_transfer_is_rejected() {
    let harness = spawn_harness(settings(500, 200, 5_000, 12, 8));
    let err = harness
        .handle
        .send(scaled_asdu(1), Duration::from_millis(200))
        .await
        .unwrap_err();
    assert!(matches!(err, IecError::NotStarted));
}
