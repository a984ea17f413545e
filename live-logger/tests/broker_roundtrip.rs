//! End-to-end runs against an in-process rumqttd broker
//!
//! Run with: cargo test -p live-logger --features integration-tests

use std::io::{BufRead, BufReader};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use config::{Config as FileConfig, File as ConfigFile, FileFormat};
use live_logger::{
    BrokerAddress, LifecycleController, LifecycleState, LoggingEvents, SubscriberConfig,
    SubscriptionSet,
};
use openf1_protocol::Topic;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use rumqttd::{Broker, Config};
use tokio::sync::oneshot;

fn broker_config(port: u16) -> String {
    format!(
        r#"
id = 0

[router]
id = 0
max_connections = 100
max_outgoing_packet_count = 200
max_segment_size = 104857600
max_segment_count = 10

[v4.1]
name = "v4-1"
listen = "127.0.0.1:{port}"
next_connection_delay_ms = 1

[v4.1.connections]
connection_timeout_ms = 60000
max_payload_size = 20480
max_inflight_count = 100
dynamic_filters = true
"#
    )
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Start a broker thread and wait until it accepts connections
fn start_broker() -> u16 {
    let port = free_port();
    let rumq_cfg: Config = FileConfig::builder()
        .add_source(ConfigFile::from_str(&broker_config(port), FileFormat::Toml))
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap();
    let mut broker = Broker::new(rumq_cfg);

    thread::spawn(move || {
        broker.start().unwrap();
    });

    let deadline = Instant::now() + Duration::from_secs(10);
    while TcpStream::connect(("127.0.0.1", port)).is_err() {
        assert!(Instant::now() < deadline, "broker did not start on {}", port);
        thread::sleep(Duration::from_millis(50));
    }
    port
}

fn subscriber_config(port: u16, log_file: &Path) -> SubscriberConfig {
    let mut config = SubscriberConfig::new(BrokerAddress::plain("127.0.0.1", port));
    config.log_file = log_file.to_path_buf();
    config.username = Some("test-user".to_string());
    config.token = Some("test-token".to_string());
    config
}

async fn publisher(port: u16) -> AsyncClient {
    let options = MqttOptions::new(format!("publisher-{}", port), "127.0.0.1", port);
    let (client, mut eventloop) = AsyncClient::new(options, 100);
    tokio::spawn(async move { while eventloop.poll().await.is_ok() {} });
    client
}

async fn wait_for_lines(path: &Path, expected: usize) -> String {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.lines().count() >= expected || Instant::now() > deadline {
            return content;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_every_topic_is_logged_and_shutdown_is_orderly() {
    let port = start_broker();
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("openf1_live.log");

    let controller = LifecycleController::new(subscriber_config(port, &log_path))
        .with_subscriptions(SubscriptionSet::openf1())
        .with_events(Arc::new(LoggingEvents));
    let mut state = controller.state();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let run = controller.run_with_console(Vec::new(), async {
        let _ = shutdown_rx.await;
    });

    let drive = async {
        state
            .wait_for(|s| *s == LifecycleState::Running)
            .await
            .unwrap();

        let client = publisher(port).await;
        for topic in Topic::all() {
            let payload = format!(r#"{{"driver_number":44,"topic":"{}"}}"#, topic);
            client
                .publish(topic.as_str(), QoS::AtLeastOnce, false, payload)
                .await
                .unwrap();
        }
        let car_data = r#"{"driver_number":44,"rpm":11000,"speed":310}"#;
        for _ in 0..2 {
            client
                .publish("v1/car_data", QoS::AtLeastOnce, false, car_data)
                .await
                .unwrap();
        }
        client
            .publish("v1/car_data", QoS::AtLeastOnce, false, "{broken")
            .await
            .unwrap();

        let content = wait_for_lines(&log_path, Topic::all().len() + 3).await;
        let triggered = Instant::now();
        shutdown_tx.send(()).unwrap();
        (content, triggered)
    };

    let (result, (content, triggered)) = tokio::join!(run, drive);
    let elapsed = triggered.elapsed();
    let report = result.unwrap();

    assert_eq!(*state.borrow(), LifecycleState::Stopped);
    assert!(
        elapsed < Duration::from_millis(250) + Duration::from_secs(1),
        "shutdown took {:?}",
        elapsed
    );

    for topic in Topic::all() {
        let line = format!(r#"[{}] {{"driver_number":44,"topic":"{}"}}"#, topic, topic);
        assert_eq!(
            content.lines().filter(|l| *l == line).count(),
            1,
            "missing line for {}",
            topic
        );
    }
    let car_line = r#"[v1/car_data] {"driver_number":44,"rpm":11000,"speed":310}"#;
    assert_eq!(content.lines().filter(|l| *l == car_line).count(), 2);
    assert!(content.lines().any(|l| l == "[v1/car_data] {broken"));

    assert_eq!(report.stats.total(), 17);
    assert_eq!(report.stats.delivered["v1/car_data"], 4);
    assert_eq!(report.stats.decoded, 3);
    assert_eq!(report.stats.decode_failures, 1);
    assert_eq!(String::from_utf8(report.console).unwrap(), content);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_log_survives_consecutive_runs() {
    let port = start_broker();
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("openf1_live.log");

    for run in 1..=2 {
        let controller = LifecycleController::new(subscriber_config(port, &log_path));
        let mut state = controller.state();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let run_fut = controller.run_with_console(Vec::new(), async {
            let _ = shutdown_rx.await;
        });
        let drive = async {
            state
                .wait_for(|s| *s == LifecycleState::Running)
                .await
                .unwrap();
            let client = publisher(port).await;
            client
                .publish("v1/weather", QoS::AtLeastOnce, false, format!("run {}", run))
                .await
                .unwrap();
            wait_for_lines(&log_path, run).await;
            shutdown_tx.send(()).unwrap();
        };

        let (result, ()) = tokio::join!(run_fut, drive);
        result.unwrap();
    }

    let content = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(content, "[v1/weather] run 1\n[v1/weather] run 2\n");
}

#[cfg(unix)]
#[test]
fn test_binary_exits_cleanly_on_sigterm() {
    let port = start_broker();
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("openf1_live.log");

    let mut child = Command::new(env!("CARGO_BIN_EXE_live-logger"))
        .arg("--broker")
        .arg(format!("mqtt://127.0.0.1:{}", port))
        .arg("--log-file")
        .arg(&log_path)
        .env("RUST_LOG", "info")
        .env("OPENF1_USERNAME", "test-user")
        .env("OPENF1_TOKEN", "test-token")
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    // Keep draining stderr so the child never blocks on a full pipe
    let stderr = BufReader::new(child.stderr.take().unwrap());
    let (line_tx, line_rx) = mpsc::channel();
    thread::spawn(move || {
        for line in stderr.lines().map_while(Result::ok) {
            let _ = line_tx.send(line);
        }
    });

    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let line = line_rx
            .recv_timeout(remaining)
            .expect("logger never reached Running");
        if line.contains("Connecting -> Running") {
            break;
        }
    }

    let killed = Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(killed.success());

    let deadline = Instant::now() + Duration::from_secs(5);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("logger did not exit after SIGTERM");
        }
        thread::sleep(Duration::from_millis(20));
    };

    assert!(status.success(), "exit status {:?}", status);
    assert!(log_path.exists());
    assert!(line_rx
        .iter()
        .any(|line| line.contains("Graceful shutdown completed")));
}
