//! Integration tests for the connection session.
//!
//! These drive a [`Connection`] end to end through the device side of a
//! transport pair: the test plays the peripheral, answering the frames the
//! session writes.

use std::sync::Arc;
use std::time::Duration;

use meshprobe_protocol::{PacketType, PublicKeyHex};
use meshprobe_session::{
    Connection, ConnectionStatus, DeviceIdentity, FrameTransport, SessionError, TransactionFamily,
};

fn identity() -> DeviceIdentity {
    DeviceIdentity {
        id: "AA:BB:CC:DD:EE:FF".to_string(),
        name: Some("MeshCore-test".to_string()),
    }
}

fn trace_frame(hop_count: u8, rssi: i16, noise_floor: i16, timestamp: u32) -> Vec<u8> {
    let mut frame = vec![PacketType::TraceRoute.byte(), hop_count];
    frame.extend_from_slice(&rssi.to_le_bytes());
    frame.extend_from_slice(&noise_floor.to_le_bytes());
    frame.extend_from_slice(&timestamp.to_le_bytes());
    frame
}

fn contact_frame(pubkey: &str, name: &[u8]) -> Vec<u8> {
    let mut frame = vec![PacketType::Contact.byte()];
    frame.extend_from_slice(pubkey.as_bytes());
    frame.extend_from_slice(name);
    frame
}

fn target_key() -> PublicKeyHex {
    PublicKeyHex::new("ab".repeat(32)).expect("valid key")
}

#[tokio::test]
async fn test_fetch_contacts_round_trip() {
    let (transport, mut device) = FrameTransport::pair(16);
    let conn = Connection::open(transport, identity()).expect("open");
    assert_eq!(conn.status(), ConnectionStatus::Connected);
    assert_eq!(conn.identity(), Some(identity()));

    let device_task = tokio::spawn(async move {
        let request = device.writes.recv().await.expect("request");
        assert_eq!(request, vec![PacketType::GetContacts.byte()]);

        device.frames.send(vec![PacketType::ContactStart.byte()]).await.unwrap();
        device
            .frames
            .send(contact_frame(&"aa".repeat(32), b"Alpha\0"))
            .await
            .unwrap();
        device
            .frames
            .send(contact_frame(&"bb".repeat(32), b""))
            .await
            .unwrap();
        device.frames.send(vec![PacketType::ContactEnd.byte()]).await.unwrap();
        device
    });

    let contacts = conn
        .fetch_contacts(Duration::from_secs(3))
        .await
        .expect("contacts");
    assert_eq!(contacts.len(), 2);
    assert_eq!(contacts[0].pubkey, "aa".repeat(32));
    assert_eq!(contacts[0].name, "Alpha");
    assert_eq!(contacts[1].name, "Unknown-bb");
    assert_eq!(contacts[1].prefix, "bb");

    device_task.await.expect("device task");
}

#[tokio::test]
async fn test_fetch_contacts_empty_list() {
    let (transport, mut device) = FrameTransport::pair(16);
    let conn = Connection::open(transport, identity()).expect("open");

    let device_task = tokio::spawn(async move {
        device.writes.recv().await.expect("request");
        device.frames.send(vec![PacketType::ContactStart.byte()]).await.unwrap();
        device.frames.send(vec![PacketType::ContactEnd.byte()]).await.unwrap();
        device
    });

    let contacts = conn
        .fetch_contacts(Duration::from_secs(3))
        .await
        .expect("contacts");
    assert!(contacts.is_empty());

    device_task.await.expect("device task");
}

#[tokio::test]
async fn test_trace_resolves_on_direct_route() {
    let (transport, mut device) = FrameTransport::pair(16);
    let conn = Connection::open(transport, identity()).expect("open");

    let device_task = tokio::spawn(async move {
        let request = device.writes.recv().await.expect("request");
        assert_eq!(request[0], PacketType::Trace.byte());
        assert_eq!(&request[1..], "ab".repeat(32).as_bytes());

        // Unrelated push before the answer must be ignored
        device.frames.send(vec![PacketType::Ack.byte()]).await.unwrap();
        device
            .frames
            .send(trace_frame(0, -87, -112, 1_700_000_000))
            .await
            .unwrap();
        device
    });

    let resp = conn
        .perform_trace(&target_key(), Duration::from_secs(5))
        .await
        .expect("trace");
    assert_eq!(resp.hop_count, 0);
    assert_eq!(resp.rssi, -87);
    assert_eq!(resp.noise_floor, -112);
    assert_eq!(resp.snr(), 25);

    device_task.await.expect("device task");
}

#[tokio::test]
async fn test_trace_rejects_indirect_route() {
    let (transport, mut device) = FrameTransport::pair(16);
    let conn = Connection::open(transport, identity()).expect("open");

    let device_task = tokio::spawn(async move {
        device.writes.recv().await.expect("request");
        device.frames.send(trace_frame(2, -60, -110, 42)).await.unwrap();
        device
    });

    let err = conn
        .perform_trace(&target_key(), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::NotDirect { hops: 2 });

    device_task.await.expect("device task");
}

#[tokio::test]
async fn test_trace_rejects_on_device_error() {
    let (transport, mut device) = FrameTransport::pair(16);
    let conn = Connection::open(transport, identity()).expect("open");

    let device_task = tokio::spawn(async move {
        device.writes.recv().await.expect("request");
        device.frames.send(vec![PacketType::Error.byte()]).await.unwrap();
        device
    });

    let err = conn
        .perform_trace(&target_key(), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::DeviceError);

    device_task.await.expect("device task");
}

#[tokio::test(start_paused = true)]
async fn test_trace_times_out_without_answer() {
    let (transport, mut device) = FrameTransport::pair(16);
    let conn = Connection::open(transport, identity()).expect("open");

    let err = conn
        .perform_trace(&target_key(), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::Timeout);

    // The request was written before the deadline expired
    let request = device.writes.recv().await.expect("request");
    assert_eq!(request[0], PacketType::Trace.byte());

    // The registration is gone: a new trace can start right away
    let device_task = tokio::spawn(async move {
        device.writes.recv().await.expect("request");
        device.frames.send(trace_frame(0, -70, -100, 7)).await.unwrap();
        device
    });
    let resp = conn
        .perform_trace(&target_key(), Duration::from_secs(5))
        .await
        .expect("trace");
    assert_eq!(resp.hop_count, 0);

    device_task.await.expect("device task");
}

#[tokio::test(start_paused = true)]
async fn test_timeout_leaves_other_transactions_pending() {
    let (transport, mut device) = FrameTransport::pair(16);
    let conn = Arc::new(Connection::open(transport, identity()).expect("open"));

    // Long-deadline contact fetch that the device answers only after the
    // trace deadline has expired.
    let contacts_task = tokio::spawn({
        let conn = Arc::clone(&conn);
        async move { conn.fetch_contacts(Duration::from_secs(60)).await }
    });
    let request = device.writes.recv().await.expect("contacts request");
    assert_eq!(request, vec![PacketType::GetContacts.byte()]);

    let err = conn
        .perform_trace(&target_key(), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::Timeout);

    device.writes.recv().await.expect("trace request");
    device.frames.send(vec![PacketType::ContactStart.byte()]).await.unwrap();
    device
        .frames
        .send(contact_frame(&"cc".repeat(32), b"Survivor"))
        .await
        .unwrap();
    device.frames.send(vec![PacketType::ContactEnd.byte()]).await.unwrap();

    let contacts = contacts_task
        .await
        .expect("join")
        .expect("contacts");
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].name, "Survivor");
}

#[tokio::test]
async fn test_second_request_of_same_kind_is_busy() {
    let (transport, mut device) = FrameTransport::pair(16);
    let conn = Arc::new(Connection::open(transport, identity()).expect("open"));

    let first = tokio::spawn({
        let conn = Arc::clone(&conn);
        async move { conn.perform_trace(&target_key(), Duration::from_secs(3)).await }
    });

    // Wait until the first request is on the wire
    let request = device.writes.recv().await.expect("first request");
    assert_eq!(request[0], PacketType::Trace.byte());

    let err = conn
        .perform_trace(&target_key(), Duration::from_secs(3))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        SessionError::Busy {
            family: TransactionFamily::Trace
        }
    );

    device.frames.send(trace_frame(0, -80, -110, 1)).await.unwrap();
    let resp = first.await.expect("join").expect("trace");
    assert_eq!(resp.hop_count, 0);
}

#[tokio::test]
async fn test_interleaved_contacts_and_trace_stay_isolated() {
    let (transport, mut device) = FrameTransport::pair(16);
    let conn = Arc::new(Connection::open(transport, identity()).expect("open"));

    let contacts_task = tokio::spawn({
        let conn = Arc::clone(&conn);
        async move { conn.fetch_contacts(Duration::from_secs(5)).await }
    });
    device.writes.recv().await.expect("contacts request");

    let trace_task = tokio::spawn({
        let conn = Arc::clone(&conn);
        async move { conn.perform_trace(&target_key(), Duration::from_secs(5)).await }
    });
    device.writes.recv().await.expect("trace request");

    // Interleave the two response sequences
    device.frames.send(vec![PacketType::ContactStart.byte()]).await.unwrap();
    device
        .frames
        .send(contact_frame(&"aa".repeat(32), b"Alpha"))
        .await
        .unwrap();
    device.frames.send(trace_frame(0, -75, -105, 9)).await.unwrap();
    device
        .frames
        .send(contact_frame(&"bb".repeat(32), b"Bravo"))
        .await
        .unwrap();
    device.frames.send(vec![PacketType::ContactEnd.byte()]).await.unwrap();

    let trace = trace_task.await.expect("join").expect("trace");
    assert_eq!(trace.hop_count, 0);
    assert_eq!(trace.rssi, -75);

    let contacts = contacts_task.await.expect("join").expect("contacts");
    assert_eq!(contacts.len(), 2);
    assert_eq!(contacts[0].name, "Alpha");
    assert_eq!(contacts[1].name, "Bravo");
}

#[tokio::test]
async fn test_close_is_idempotent_and_fails_fast() {
    let (transport, _device) = FrameTransport::pair(16);
    let conn = Connection::open(transport, identity()).expect("open");

    conn.close();
    assert_eq!(conn.status(), ConnectionStatus::Disconnected);
    assert!(conn.identity().is_none());

    // Operations after close fail immediately with NotConnected, not Timeout
    let err = conn
        .fetch_contacts(Duration::from_secs(3))
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::NotConnected);
    let err = conn
        .perform_trace(&target_key(), Duration::from_secs(3))
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::NotConnected);

    // Closing again, with nothing pending, is a no-op
    conn.close();
    assert_eq!(conn.status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn test_close_fails_pending_transaction() {
    let (transport, mut device) = FrameTransport::pair(16);
    let conn = Arc::new(Connection::open(transport, identity()).expect("open"));

    let pending = tokio::spawn({
        let conn = Arc::clone(&conn);
        async move { conn.fetch_contacts(Duration::from_secs(60)).await }
    });
    device.writes.recv().await.expect("request");

    conn.close();

    let err = pending.await.expect("join").unwrap_err();
    assert_eq!(
        err,
        SessionError::ConnectionClosed {
            reason: "connection closed".to_string()
        }
    );
}

#[tokio::test]
async fn test_link_loss_fails_pending_and_sets_error() {
    let (transport, mut device) = FrameTransport::pair(16);
    let conn = Arc::new(Connection::open(transport, identity()).expect("open"));

    let pending = tokio::spawn({
        let conn = Arc::clone(&conn);
        async move { conn.perform_trace(&target_key(), Duration::from_secs(60)).await }
    });
    device.writes.recv().await.expect("request");

    drop(device);

    let err = pending.await.expect("join").unwrap_err();
    assert_eq!(
        err,
        SessionError::ConnectionClosed {
            reason: "link lost".to_string()
        }
    );
    assert_eq!(conn.status(), ConnectionStatus::Error);
}

#[tokio::test]
async fn test_open_fails_on_dead_link() {
    let (transport, device) = FrameTransport::pair(16);
    drop(device);

    let err = Connection::open(transport, identity()).unwrap_err();
    assert!(matches!(err, SessionError::Transport(_)));
}
