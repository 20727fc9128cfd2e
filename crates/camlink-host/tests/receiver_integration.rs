//! End-to-end tests for the stream receiver over real loopback TCP.
//!
//! A fake phone is a `TcpListener` on `127.0.0.1:0`; the receiver is pointed
//! at its port and the results are observed through the registry and the
//! composed canvas, exactly as the output loop would see them.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use camlink_core::{encode_frame, Compositor, ConnectionState, EndpointId, ImageFrameDecoder};
use camlink_host::application::compose_output::ComposeOutputUseCase;
use camlink_host::application::registry::StreamRegistry;
use camlink_host::application::session::Session;
use camlink_host::infrastructure::network::receiver::{ReceiverConfig, StreamReceiver};
use image::{ImageFormat, Rgb, RgbImage};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

const RED: [u8; 3] = [255, 0, 0];
const GREEN: [u8; 3] = [0, 255, 0];
const BLUE: [u8; 3] = [0, 0, 255];

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Encodes a solid 16×9 PNG and wraps it in the wire framing.
fn wire_frame(rgb: [u8; 3]) -> Vec<u8> {
    let image = RgbImage::from_pixel(16, 9, Rgb(rgb));
    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, ImageFormat::Png).unwrap();
    encode_frame(png.get_ref(), [0; 4]).unwrap()
}

async fn accept(listener: &TcpListener) -> TcpStream {
    let (stream, _) = tokio::time::timeout(Duration::from_secs(5), listener.accept())
        .await
        .expect("receiver did not connect")
        .unwrap();
    stream
}

async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

struct Harness {
    listener: TcpListener,
    registry: Arc<StreamRegistry>,
    compose: ComposeOutputUseCase,
    endpoint: EndpointId,
    shutdown: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl Harness {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let registry = Arc::new(StreamRegistry::new());
        let endpoint = EndpointId::new("127.0.0.1");
        registry.register(&endpoint);

        let receiver = StreamReceiver::new(
            endpoint.clone(),
            ReceiverConfig {
                port,
                connect_timeout: Duration::from_secs(1),
                reconnect_backoff: Duration::from_millis(50),
            },
            Arc::clone(&registry),
            Arc::new(ImageFrameDecoder::new()),
        );
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(receiver.run(shutdown.clone()));
        let compose = ComposeOutputUseCase::new(
            Arc::clone(&registry),
            Arc::new(Session::new()),
            Compositor::new(64, 36),
        );

        Self {
            listener,
            registry,
            compose,
            endpoint,
            shutdown,
            task,
        }
    }

    async fn accept(&self) -> TcpStream {
        accept(&self.listener).await
    }

    fn centre_pixel(&self) -> [u8; 3] {
        self.compose.compose_tick().get_pixel(32, 18).0
    }

    async fn stop(self) {
        self.shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), self.task)
            .await
            .expect("receiver did not stop")
            .unwrap();
    }
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_frames_are_published_in_order_and_latest_is_composed() {
    // Arrange
    let h = Harness::start().await;
    let mut phone = h.accept().await;

    // Act: three frames back to back on one connection
    for colour in [RED, GREEN, BLUE] {
        phone.write_all(&wire_frame(colour)).await.unwrap();
    }

    // Assert
    wait_until("third frame", || h.centre_pixel() == BLUE).await;
    assert_eq!(h.registry.active_count(), 1);
    assert_eq!(h.registry.state(&h.endpoint), Some(ConnectionState::Streaming));

    h.stop().await;
}

#[tokio::test]
async fn test_undecodable_payload_keeps_connection_open() {
    // Arrange
    let h = Harness::start().await;
    let mut phone = h.accept().await;

    // Act
    phone.write_all(&wire_frame(RED)).await.unwrap();
    phone.write_all(&encode_frame(b"definitely not an image", [0; 4]).unwrap()).await.unwrap();
    phone.write_all(&wire_frame(GREEN)).await.unwrap();

    // Assert
    wait_until("frame after garbage", || h.centre_pixel() == GREEN).await;
    assert_eq!(h.registry.active_count(), 1);

    h.stop().await;
}

#[tokio::test]
async fn test_short_read_evicts_endpoint_and_region_turns_black() {
    // Arrange
    let h = Harness::start().await;
    let mut phone = h.accept().await;
    phone.write_all(&wire_frame(RED)).await.unwrap();
    wait_until("first frame", || h.centre_pixel() == RED).await;

    // Act: a header promising 1000 bytes, then only 10, then close
    let mut partial = encode_frame(&[7u8; 1000], [0; 4]).unwrap();
    partial.truncate(8 + 10);
    phone.write_all(&partial).await.unwrap();
    drop(phone);

    // Assert
    wait_until("eviction", || h.registry.active_count() == 0).await;
    assert_eq!(h.centre_pixel(), [0, 0, 0]);
    assert!(h.registry.latest_frame(&h.endpoint).is_none());

    h.stop().await;
}

#[tokio::test]
async fn test_receiver_reconnects_after_disconnect() {
    // Arrange
    let h = Harness::start().await;
    let mut phone = h.accept().await;
    phone.write_all(&wire_frame(RED)).await.unwrap();
    wait_until("first connection", || h.centre_pixel() == RED).await;

    // Act: drop the connection; the receiver must come back on its own
    drop(phone);
    wait_until("eviction", || h.registry.active_count() == 0).await;
    let mut phone = h.accept().await;
    phone.write_all(&wire_frame(GREEN)).await.unwrap();

    // Assert
    wait_until("second connection", || h.centre_pixel() == GREEN).await;
    assert_eq!(h.registry.active_endpoints(), vec![h.endpoint.clone()]);

    h.stop().await;
}

#[tokio::test]
async fn test_rotation_survives_reconnect() {
    // Arrange
    let h = Harness::start().await;
    let mut phone = h.accept().await;
    phone.write_all(&wire_frame(RED)).await.unwrap();
    wait_until("first frame", || h.registry.active_count() == 1).await;
    h.registry.rotate_active(0);

    // Act
    drop(phone);
    wait_until("eviction", || h.registry.active_count() == 0).await;
    let mut phone = h.accept().await;
    phone.write_all(&wire_frame(RED)).await.unwrap();
    wait_until("reactivation", || h.registry.active_count() == 1).await;

    // Assert
    assert_eq!(h.registry.rotation(&h.endpoint).map(|r| r.degrees()), Some(90));

    h.stop().await;
}

#[tokio::test]
async fn test_mid_frame_drop_leaves_other_endpoint_streaming() {
    // Arrange: two phones on separate loopback listeners.  The second is
    // addressed by name so the two endpoints have distinct identities.
    let registry = Arc::new(StreamRegistry::new());
    let shutdown = CancellationToken::new();
    let listener_a = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let listener_b = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint_a = EndpointId::new("127.0.0.1");
    let endpoint_b = EndpointId::new("localhost");
    let mut tasks = Vec::new();
    for (endpoint, listener) in [(&endpoint_a, &listener_a), (&endpoint_b, &listener_b)] {
        registry.register(endpoint);
        let receiver = StreamReceiver::new(
            endpoint.clone(),
            ReceiverConfig {
                port: listener.local_addr().unwrap().port(),
                connect_timeout: Duration::from_secs(1),
                reconnect_backoff: Duration::from_millis(50),
            },
            Arc::clone(&registry),
            Arc::new(ImageFrameDecoder::new()),
        );
        tasks.push(tokio::spawn(receiver.run(shutdown.clone())));
    }
    let mut phone_a = accept(&listener_a).await;
    let mut phone_b = accept(&listener_b).await;
    phone_a.write_all(&wire_frame(RED)).await.unwrap();
    phone_b.write_all(&wire_frame(GREEN)).await.unwrap();
    wait_until("both streaming", || registry.active_count() == 2).await;

    // Act: A hangs up halfway through a payload
    let mut partial = encode_frame(&[7u8; 1000], [0; 4]).unwrap();
    partial.truncate(8 + 500);
    phone_a.write_all(&partial).await.unwrap();
    drop(phone_a);
    wait_until("A evicted", || registry.latest_frame(&endpoint_a).is_none()).await;

    // Assert: B is untouched and its next frame still lands
    assert_eq!(registry.active_endpoints(), vec![endpoint_b.clone()]);
    assert_eq!(registry.state(&endpoint_b), Some(ConnectionState::Streaming));
    phone_b.write_all(&wire_frame(BLUE)).await.unwrap();
    let shade_b = || {
        registry
            .latest_frame(&endpoint_b)
            .map(|frame| frame.image().get_pixel(0, 0).0)
    };
    wait_until("B's next frame", || shade_b() == Some(BLUE)).await;
    assert_eq!(registry.active_endpoints(), vec![endpoint_b.clone()]);

    shutdown.cancel();
    for task in tasks {
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("receiver did not stop")
            .unwrap();
    }
}

