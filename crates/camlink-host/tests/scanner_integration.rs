//! Discovery against a real loopback listener, wired to the real supervisor.

use std::sync::Arc;
use std::time::Duration;

use camlink_core::{encode_frame, EndpointId, FrameDecoder, ImageFrameDecoder};
use camlink_host::application::registry::StreamRegistry;
use camlink_host::infrastructure::network::probe::TcpPortProber;
use camlink_host::infrastructure::network::receiver::ReceiverConfig;
use camlink_host::infrastructure::network::scanner::{DiscoveryScanner, ScanConfig};
use camlink_host::infrastructure::network::supervisor::ReceiverSupervisor;
use image::{ImageFormat, Rgb, RgbImage};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

fn png_wire_frame() -> Vec<u8> {
    let mut png = std::io::Cursor::new(Vec::new());
    RgbImage::from_pixel(4, 4, Rgb([9, 9, 9]))
        .write_to(&mut png, ImageFormat::Png)
        .unwrap();
    encode_frame(png.get_ref(), [0; 4]).unwrap()
}

struct Pipeline {
    registry: Arc<StreamRegistry>,
    supervisor: Arc<ReceiverSupervisor>,
    scanner: DiscoveryScanner,
    shutdown: CancellationToken,
}

fn pipeline(port: u16, statics: &[&str]) -> Pipeline {
    let shutdown = CancellationToken::new();
    let registry = Arc::new(StreamRegistry::new());
    let decoder: Arc<dyn FrameDecoder> = Arc::new(ImageFrameDecoder::new());
    let supervisor = Arc::new(ReceiverSupervisor::new(
        Arc::clone(&registry),
        decoder,
        ReceiverConfig {
            port,
            connect_timeout: Duration::from_secs(1),
            reconnect_backoff: Duration::from_millis(50),
        },
        shutdown.clone(),
    ));
    let scanner = DiscoveryScanner::new(
        ScanConfig {
            port,
            subnets: Vec::new(),
            static_addresses: statics.iter().map(|s| EndpointId::new(*s)).collect(),
            probe_timeout: Duration::from_millis(200),
            ..ScanConfig::default()
        },
        Arc::new(TcpPortProber),
        Arc::clone(&registry),
        supervisor.clone(),
    );
    Pipeline {
        registry,
        supervisor,
        scanner,
        shutdown,
    }
}

#[tokio::test]
async fn test_scan_pass_discovers_listener_and_starts_streaming() {
    // Arrange: the "phone" sends one frame to every connection after the
    // probe's, which closes without reading
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = stream.write_all(&png_wire_frame()).await;
                tokio::time::sleep(Duration::from_secs(10)).await;
            });
        }
    });
    let p = pipeline(port, &["127.0.0.1"]);

    // Act
    let added = p.scanner.scan_pass(&p.shutdown).await.unwrap();

    // Assert
    assert_eq!(added, vec![EndpointId::new("127.0.0.1")]);
    assert_eq!(p.supervisor.running(), 1);
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while p.registry.active_count() == 0 {
        assert!(tokio::time::Instant::now() < deadline, "endpoint never became active");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    p.shutdown.cancel();
    p.supervisor.join_all().await;
}

#[tokio::test]
async fn test_scan_pass_ignores_closed_ports() {
    // Arrange: bind then drop so nothing listens
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let p = pipeline(port, &["127.0.0.1"]);

    // Act
    let added = p.scanner.scan_pass(&p.shutdown).await.unwrap();

    // Assert
    assert!(added.is_empty());
    assert!(!p.registry.contains(&EndpointId::new("127.0.0.1")));
    assert_eq!(p.supervisor.running(), 0);
}

#[tokio::test]
async fn test_run_registers_static_address_without_probe() {
    // Arrange: nothing listens, but a static address is registered anyway
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let p = pipeline(port, &["127.0.0.1"]);
    let (registry, supervisor, shutdown) = (p.registry, p.supervisor, p.shutdown);

    // Act
    let task = tokio::spawn(p.scanner.run(shutdown.clone()));
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Assert
    assert!(registry.contains(&EndpointId::new("127.0.0.1")));
    assert_eq!(supervisor.running(), 1);

    shutdown.cancel();
    task.await.unwrap();
    supervisor.join_all().await;
}
