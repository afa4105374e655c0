//! End-to-end tests against a live server on ephemeral loopback ports.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use mauerspecht::client::{ClientOptions, Direction, ProbeOutcome, Prober, Verdict};
use mauerspecht::crypto::CryptoSession;
use mauerspecht::identity::ClientId;
use mauerspecht::protocol::{
    Channel, ChannelSet, ProbeConfig, ProbeResult, CONFIG_PATH, DATA_PATH, ID_HEADER, KEX_PATH,
    PROBE_HEADER,
};
use mauerspecht::server::{MemorySink, RunningServer, Server, ServerConfig};

const CANARIES: [&str; 2] = ["EICAR-TEST", "second canary"];

async fn start_server() -> (RunningServer, Arc<MemorySink>) {
    start_server_with(&CANARIES).await
}

async fn start_server_with(canaries: &[&str]) -> (RunningServer, Arc<MemorySink>) {
    let mut config = ServerConfig::new(ProbeConfig {
        hostname: "localhost".into(),
        ports: vec![0],
        canaries: canaries.iter().map(|c| c.to_string()).collect(),
    });
    config.listen_addr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    let sink = Arc::new(MemorySink::new());
    let running = Server::new(config)
        .unwrap()
        .with_sink(sink.clone())
        .bind()
        .await
        .unwrap();
    (running, sink)
}

fn base_url(addr: SocketAddr) -> String {
    format!("http://{}/", addr)
}

fn options() -> ClientOptions {
    ClientOptions {
        timeout: Duration::from_secs(10),
        proxy: None,
    }
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

#[tokio::test]
async fn test_full_run_without_middlebox() {
    let (running, sink) = start_server().await;
    let addr = running.local_addrs()[0];

    let mut prober = Prober::connect(&base_url(addr), options()).await.unwrap();
    assert_eq!(prober.server_key(), running.public_key());
    assert_eq!(prober.config().canaries, CANARIES);
    assert_eq!(prober.config().ports, vec![addr.port()]);
    assert_eq!(running.registry().count(), 1);

    let outcomes = prober.run().await;
    assert_eq!(outcomes.len(), 2 * CANARIES.len() * 7);

    let downloads: Vec<&ProbeOutcome> = outcomes
        .iter()
        .filter(|o| o.direction == Direction::Download)
        .collect();
    assert_eq!(downloads.len(), CANARIES.len() * 7);

    // Ascending canary, then ascending channel set
    assert_eq!(downloads[0].canary, 0);
    assert_eq!(downloads[0].channels, ChannelSet::HEADER);
    assert_eq!(downloads[6].channels, ChannelSet::EVERYTHING);
    assert_eq!(downloads[7].canary, 1);

    // Nothing in the path, so every requested channel survives
    for outcome in &outcomes {
        match &outcome.verdict {
            Verdict::Checked(verdicts) => {
                assert_eq!(verdicts.len(), outcome.channels.channels().count());
                assert!(verdicts.iter().all(|v| v.survived), "{:?}", outcome);
            }
            Verdict::Failed(reason) => panic!("probe failed: {}", reason),
        }
    }

    // The report carries every log line up to and including its own header
    let recorded = sink.entries();
    assert_eq!(recorded.len(), prober.log().len());
    assert!(recorded.iter().all(|(id, _)| id == prober.client_id()));
    assert!(recorded
        .iter()
        .any(|(_, e)| e.message == "download xfer< header > (0): found string in header"));
    assert!(recorded
        .iter()
        .any(|(_, e)| e.message == "upload xfer< header cookie body > (1): found string in body"));
    assert_eq!(
        recorded.last().map(|(_, e)| e.message.as_str()),
        Some("Submitting results to server")
    );

    let metrics = running.metrics().snapshot();
    assert_eq!(metrics.key_exchanges, 1);
    assert_eq!(metrics.configs_served, 1);
    assert_eq!(metrics.downloads, 14);
    assert_eq!(metrics.uploads, 14);
    assert_eq!(metrics.report_entries, recorded.len() as u64);

    running.shutdown().await;
}

#[tokio::test]
async fn test_raw_protocol_exchange() {
    let (running, _sink) = start_server().await;
    let base = base_url(running.local_addrs()[0]);
    let http = http_client();

    let id = ClientId::generate().unwrap();
    let session = CryptoSession::generate().unwrap();

    // Key exchange
    let response = http
        .post(format!("{}{}", base.trim_end_matches('/'), KEX_PATH))
        .header(ID_HEADER, id.format())
        .body(session.public_key().to_bytes().to_vec())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let key = response.bytes().await.unwrap();
    assert_eq!(key.len(), 32);
    assert_eq!(&key[..], running.public_key().as_bytes());
    let server_key = running.public_key();

    // Config
    let sealed = http
        .get(format!("{}{}", base.trim_end_matches('/'), CONFIG_PATH))
        .header(ID_HEADER, id.format())
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    let config: ProbeConfig =
        serde_json::from_slice(&session.decrypt(&server_key, &sealed).unwrap()).unwrap();
    assert_eq!(config.hostname, "localhost");
    assert_eq!(config.canaries, CANARIES);

    // Download with every channel
    let response = http
        .get(format!(
            "{}{}?id=0&header=1&cookie=1&body=1",
            base.trim_end_matches('/'),
            DATA_PATH
        ))
        .header(ID_HEADER, id.format())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers().get(PROBE_HEADER).unwrap(), "EICAR-TEST");
    assert_eq!(
        response.headers().get("set-cookie").unwrap(),
        "Specht=EICAR-TEST"
    );
    assert_eq!(response.text().await.unwrap(), "EICAR-TEST");

    // Upload with every channel
    let sealed = http
        .post(format!("{}{}", base.trim_end_matches('/'), DATA_PATH))
        .header(ID_HEADER, id.format())
        .header(PROBE_HEADER, "second canary")
        .header("cookie", "Specht=second canary")
        .body("second canary")
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    let result: ProbeResult =
        serde_json::from_slice(&session.decrypt(&server_key, &sealed).unwrap()).unwrap();
    assert_eq!(
        result,
        ProbeResult {
            header: Some(1),
            cookie: Some(1),
            body: Some(1),
        }
    );
    assert_eq!(result.index(Channel::Cookie), Some(1));

    running.shutdown().await;
}

/// Key exchange plus config fetch over raw HTTP, returning the decrypted config.
async fn raw_handshake(
    http: &reqwest::Client,
    base: &str,
    id: &ClientId,
    session: &CryptoSession,
    running: &RunningServer,
) -> ProbeConfig {
    let response = http
        .post(format!("{}{}", base.trim_end_matches('/'), KEX_PATH))
        .header(ID_HEADER, id.format())
        .body(session.public_key().to_bytes().to_vec())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.bytes().await.unwrap().len(), 32);

    let sealed = http
        .get(format!("{}{}", base.trim_end_matches('/'), CONFIG_PATH))
        .header(ID_HEADER, id.format())
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    serde_json::from_slice(&session.decrypt(&running.public_key(), &sealed).unwrap()).unwrap()
}

async fn raw_upload(
    request: reqwest::RequestBuilder,
    session: &CryptoSession,
    running: &RunningServer,
) -> ProbeResult {
    let response = request.send().await.unwrap();
    assert_eq!(response.status(), 200);
    let sealed = response.bytes().await.unwrap();
    serde_json::from_slice(&session.decrypt(&running.public_key(), &sealed).unwrap()).unwrap()
}

#[tokio::test]
async fn test_single_canary_full_exchange() {
    let (running, _sink) = start_server_with(&["EICAR-TEST"]).await;
    let base = base_url(running.local_addrs()[0]);
    let http = http_client();

    let id = ClientId::generate().unwrap();
    let session = CryptoSession::generate().unwrap();

    let config = raw_handshake(&http, &base, &id, &session, &running).await;
    assert_eq!(config.canaries, vec!["EICAR-TEST".to_string()]);

    let response = http
        .get(format!(
            "{}{}?id=0&header=1&cookie=1&body=1",
            base.trim_end_matches('/'),
            DATA_PATH
        ))
        .header(ID_HEADER, id.format())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers().get(PROBE_HEADER).unwrap(), "EICAR-TEST");
    assert_eq!(
        response.headers().get("set-cookie").unwrap(),
        "Specht=EICAR-TEST"
    );
    assert_eq!(response.text().await.unwrap(), "EICAR-TEST");

    let result = raw_upload(
        http.post(format!("{}{}", base.trim_end_matches('/'), DATA_PATH))
            .header(ID_HEADER, id.format())
            .header(PROBE_HEADER, "EICAR-TEST")
            .header("cookie", "Specht=EICAR-TEST")
            .body("EICAR-TEST"),
        &session,
        &running,
    )
    .await;
    assert_eq!(
        result,
        ProbeResult {
            header: Some(0),
            cookie: Some(0),
            body: Some(0),
        }
    );

    running.shutdown().await;
}

#[tokio::test]
async fn test_partial_upload_leaves_other_channels_empty() {
    let (running, _sink) = start_server().await;
    let base = base_url(running.local_addrs()[0]);
    let http = http_client();

    let id = ClientId::generate().unwrap();
    let session = CryptoSession::generate().unwrap();
    raw_handshake(&http, &base, &id, &session, &running).await;

    // Header only
    let result = raw_upload(
        http.post(format!("{}{}", base.trim_end_matches('/'), DATA_PATH))
            .header(ID_HEADER, id.format())
            .header(PROBE_HEADER, "second canary"),
        &session,
        &running,
    )
    .await;
    assert_eq!(
        result,
        ProbeResult {
            header: Some(1),
            cookie: None,
            body: None,
        }
    );

    // Body only
    let result = raw_upload(
        http.post(format!("{}{}", base.trim_end_matches('/'), DATA_PATH))
            .header(ID_HEADER, id.format())
            .body("EICAR-TEST"),
        &session,
        &running,
    )
    .await;
    assert_eq!(
        result,
        ProbeResult {
            header: None,
            cookie: None,
            body: Some(0),
        }
    );
    assert_eq!(result.index(Channel::Header), None);

    running.shutdown().await;
}

#[tokio::test]
async fn test_missing_identity_looks_like_unknown_route() {
    let (running, _sink) = start_server().await;
    let base = base_url(running.local_addrs()[0]);
    let http = http_client();

    let unknown = http.get(format!("{}nowhere", base)).send().await.unwrap();
    let unknown_status = unknown.status();
    let unknown_body = unknown.bytes().await.unwrap();

    let anonymous = http
        .get(format!("{}{}", base.trim_end_matches('/'), CONFIG_PATH))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), unknown_status);
    assert_eq!(anonymous.status(), 404);
    assert_eq!(anonymous.bytes().await.unwrap(), unknown_body);

    let banner = http.get(base.as_str()).send().await.unwrap();
    assert_eq!(banner.status(), 200);

    running.shutdown().await;
}

#[tokio::test]
async fn test_probes_fail_once_server_is_gone() {
    let (running, sink) = start_server().await;
    let addr = running.local_addrs()[0];

    let mut prober = Prober::connect(&base_url(addr), options()).await.unwrap();
    running.shutdown().await;

    let outcomes = prober.download().await;
    assert_eq!(outcomes.len(), CANARIES.len() * 7);
    assert!(outcomes.iter().all(ProbeOutcome::is_failure));

    assert!(prober.report().await.is_err());
    assert!(sink.is_empty());
    assert!(prober
        .log()
        .entries()
        .iter()
        .any(|e| e.message.starts_with("Failed to send log message:")));
}

#[tokio::test]
async fn test_connect_fails_without_server() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = Prober::connect(&base_url(addr), options()).await;
    assert!(matches!(result, Err(ref e) if e.is_transport_failure()));
}
