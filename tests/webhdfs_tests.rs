//! WebHDFS Tests
//!
//! Redirect handling for WebHDFS clients: `307` pass-through, tunnelled
//! re-requests to the data node and the global redirect bound.
//!
//! Run: cargo nextest run --test webhdfs_tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use platform_client::webhdfs::{self, ALLOWED_REDIRECTION_LIMIT, webhdfs_url};
use platform_client::{
    ClientConfiguration, ClientRegistry, ClientType, Error, PlatformSettings, Tunnel,
    TunnelOpener, TunnelSpec, WebhdfsRedirect,
};
use reqwest::Method;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Default)]
struct TunnelLog {
    opened: AtomicUsize,
    connected: AtomicUsize,
    disconnected: AtomicUsize,
    specs: Mutex<Vec<TunnelSpec>>,
}

/// Opener whose tunnels do nothing; the data node is reachable directly.
#[derive(Debug)]
struct RecordingOpener {
    log: Arc<TunnelLog>,
    fail_connect: bool,
}

impl RecordingOpener {
    fn new(log: Arc<TunnelLog>) -> Self {
        Self {
            log,
            fail_connect: false,
        }
    }

    fn failing(log: Arc<TunnelLog>) -> Self {
        Self {
            log,
            fail_connect: true,
        }
    }
}

impl TunnelOpener for RecordingOpener {
    fn open(&self, spec: TunnelSpec) -> Box<dyn Tunnel> {
        self.log.opened.fetch_add(1, Ordering::SeqCst);
        self.log.specs.lock().unwrap().push(spec.clone());
        Box::new(RecordingTunnel {
            spec,
            log: Arc::clone(&self.log),
            fail_connect: self.fail_connect,
        })
    }
}

#[derive(Debug)]
struct RecordingTunnel {
    spec: TunnelSpec,
    log: Arc<TunnelLog>,
    fail_connect: bool,
}

#[async_trait]
impl Tunnel for RecordingTunnel {
    async fn connect(&mut self) -> platform_client::Result<()> {
        self.log.connected.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            return Err(Error::Tunnel {
                message: "connection refused by jump host".to_string(),
            });
        }
        Ok(())
    }

    async fn disconnect(&mut self) -> platform_client::Result<()> {
        self.log.disconnected.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn spec(&self) -> &TunnelSpec {
        &self.spec
    }
}

fn settings() -> PlatformSettings {
    PlatformSettings::new().with_domain("example.com")
}

fn port_of(server: &MockServer) -> u16 {
    server.address().port()
}

fn data_node_location(server: &MockServer) -> String {
    format!(
        "http://datanode1.internal:{}/webhdfs/v1/tmp/data.csv?op=OPEN",
        port_of(server)
    )
}

async fn mount_data_node(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/webhdfs/v1/tmp/data.csv"))
        .and(query_param("op", "OPEN"))
        .and(query_param("namenoderpcaddress", "nameservice1"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("a,b,c"))
        .mount(server)
        .await;
}

fn redirect(location: String) -> WebhdfsRedirect {
    WebhdfsRedirect::new(Method::GET, "/tmp/data.csv", location).params(vec![
        ("op".to_string(), "OPEN".to_string()),
        ("user.name".to_string(), "hdfs".to_string()),
    ])
}

// =============================================================================
// Name node
// =============================================================================

mod name_node_tests {
    use super::*;

    #[tokio::test]
    async fn test_redirect_returned_raw() {
        let name_node = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/webhdfs/v1/tmp/data.csv"))
            .and(query_param("op", "OPEN"))
            .and(query_param("user.name", "hdfs"))
            .respond_with(
                ResponseTemplate::new(307).insert_header("location", "http://datanode1.internal:50075/x"),
            )
            .mount(&name_node)
            .await;

        let registry = ClientRegistry::new(settings());
        let config = ClientConfiguration::new(
            ClientType::Webhdfs,
            format!("{}/webhdfs/v1", name_node.uri()),
        )
        .unwrap();
        let client = registry.get(&config).await.unwrap();

        let payload = client
            .request(
                platform_client::ApiRequest::get("/tmp/data.csv")
                    .params(webhdfs::operation_params(webhdfs::WebhdfsOperation::Open)),
            )
            .await
            .unwrap();

        let raw = payload.as_raw().unwrap();
        assert_eq!(raw.status().as_u16(), 307);
        assert_eq!(raw.location(), Some("http://datanode1.internal:50075/x"));
    }

    #[tokio::test]
    async fn test_metadata_operations_decode_json() {
        let name_node = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/webhdfs/v1/tmp"))
            .and(query_param("op", "GETCONTENTSUMMARY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ContentSummary": {"directoryCount": 2, "fileCount": 1, "length": 24930}
            })))
            .mount(&name_node)
            .await;

        let registry = ClientRegistry::new(settings());
        let config = ClientConfiguration::new(
            ClientType::Webhdfs,
            format!("{}/webhdfs/v1", name_node.uri()),
        )
        .unwrap();
        let client = registry.get(&config).await.unwrap();

        let payload = webhdfs::get_content_summary(&client, "/tmp").await.unwrap();
        assert_eq!(
            payload.as_json().unwrap()["ContentSummary"]["fileCount"],
            1
        );
    }
}

// =============================================================================
// Tunnelled redirects
// =============================================================================

mod redirect_tests {
    use super::*;

    #[tokio::test]
    async fn test_open_and_read_follows_redirect_through_tunnel() {
        let name_node = MockServer::start().await;
        let data_node = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/webhdfs/v1/tmp/data.csv"))
            .and(query_param("op", "OPEN"))
            .respond_with(
                ResponseTemplate::new(307).insert_header("location", data_node_location(&data_node)),
            )
            .expect(1)
            .mount(&name_node)
            .await;
        mount_data_node(&data_node).await;

        let log = Arc::new(TunnelLog::default());
        let registry = ClientRegistry::new(settings())
            .with_tunnel_opener(Arc::new(RecordingOpener::new(Arc::clone(&log))));
        let config = ClientConfiguration::new(
            ClientType::Webhdfs,
            format!("{}/webhdfs/v1", name_node.uri()),
        )
        .unwrap();
        let client = registry.get(&config).await.unwrap();

        let payload = webhdfs::open_and_read(&registry, &client, "/tmp/data.csv")
            .await
            .unwrap();
        assert_eq!(payload.as_text(), Some("a,b,c"));

        assert_eq!(log.opened.load(Ordering::SeqCst), 1);
        assert_eq!(log.disconnected.load(Ordering::SeqCst), 1);

        let specs = log.specs.lock().unwrap();
        let spec = &specs[0];
        assert_eq!(spec.remote_host, "datanode1.internal");
        assert_eq!(spec.remote_port, port_of(&data_node));
        assert_eq!(spec.local_port, port_of(&data_node));
        assert_eq!(spec.jump_host, "jump.example.com");
        assert_eq!(spec.jump_user, "ubuntu");

        // The data-node client is cached under the tunnel URL
        let tunnel_config = ClientConfiguration::new(
            ClientType::Webhdfs,
            webhdfs_url("localhost", port_of(&data_node)),
        )
        .unwrap();
        assert!(registry.contains(&tunnel_config));
    }

    #[tokio::test]
    async fn test_redirect_limit_is_global() {
        let data_node = MockServer::start().await;
        mount_data_node(&data_node).await;

        let log = Arc::new(TunnelLog::default());
        let registry = ClientRegistry::new(settings())
            .with_tunnel_opener(Arc::new(RecordingOpener::new(Arc::clone(&log))));

        for _ in 0..ALLOWED_REDIRECTION_LIMIT {
            let payload = registry
                .follow_webhdfs_redirect(redirect(data_node_location(&data_node)))
                .await
                .unwrap();
            assert_eq!(payload.as_text(), Some("a,b,c"));
        }

        let err = registry
            .follow_webhdfs_redirect(redirect(data_node_location(&data_node)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RedirectionLimitExceeded { limit: 3 }));
        assert_eq!(log.opened.load(Ordering::SeqCst), 3);
        assert_eq!(data_node.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_tunnel_failure_still_disconnects() {
        let data_node = MockServer::start().await;
        mount_data_node(&data_node).await;

        let log = Arc::new(TunnelLog::default());
        let registry = ClientRegistry::new(settings())
            .with_tunnel_opener(Arc::new(RecordingOpener::failing(Arc::clone(&log))));

        let err = registry
            .follow_webhdfs_redirect(redirect(data_node_location(&data_node)))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Tunnel { .. }));
        assert_eq!(log.connected.load(Ordering::SeqCst), 1);
        assert_eq!(log.disconnected.load(Ordering::SeqCst), 1);
        assert!(data_node.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_redirect_without_jump_host_is_configuration_error() {
        let registry = ClientRegistry::new(PlatformSettings::new())
            .with_tunnel_opener(Arc::new(RecordingOpener::new(Arc::default())));

        let err = registry
            .follow_webhdfs_redirect(redirect(
                "http://datanode1.internal:50075/webhdfs/v1/tmp/data.csv".to_string(),
            ))
            .await
            .unwrap_err();
        assert!(err.is_configuration_error());
    }
}
