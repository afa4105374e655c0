//! Probing client.
//!
//! A [`Prober`] registers with the server, fetches the probing
//! configuration, walks the download and upload matrices one request at a
//! time and finally ships its run log back to the server.
//!
//! ```no_run
//! # async fn demo() -> mauerspecht::Result<()> {
//! use mauerspecht::client::{ClientOptions, Prober};
//!
//! let mut prober = Prober::connect("http://probe.example:8080", ClientOptions::default()).await?;
//! let outcomes = prober.run().await;
//! println!("{} probes", outcomes.len());
//! # Ok(())
//! # }
//! ```

mod log;
mod matrix;

pub use log::RunLog;
pub use matrix::{ChannelVerdict, Direction, MatrixSummary, ProbeOutcome, Verdict};

use std::net::IpAddr;
use std::time::Duration;

use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{RequestBuilder, Response, StatusCode, Url};

use crate::crypto::{CryptoSession, PublicKey, PUBLIC_KEY_SIZE};
use crate::error::{Error, Result};
use crate::identity::ClientId;
use crate::protocol::{
    cookie_value, Channel, ChannelSet, ProbeConfig, ProbeResult, CONFIG_PATH, DATA_PATH,
    ID_HEADER, KEX_PATH, LOG_PATH, PROBE_HEADER,
};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client options.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Timeout applied to every request
    pub timeout: Duration,
    /// Explicit HTTP proxy. When unset the system proxy environment is used.
    pub proxy: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            proxy: None,
        }
    }
}

/// A client that has completed key exchange and holds the probing config.
pub struct Prober {
    http: reqwest::Client,
    base: Url,
    id: ClientId,
    crypto: CryptoSession,
    server_key: PublicKey,
    config: ProbeConfig,
    log: RunLog,
}

impl Prober {
    /// Exchange keys with the server at `base_url` and fetch its config.
    ///
    /// Any failure here is fatal to the run.
    pub async fn connect(base_url: &str, options: ClientOptions) -> Result<Self> {
        let mut log = RunLog::new();

        let base = Url::parse(base_url)
            .map_err(|e| Error::config(format!("invalid server URL {}: {}", base_url, e)))?;

        let mut builder = reqwest::Client::builder().timeout(options.timeout);
        if let Some(proxy) = &options.proxy {
            log.record(format!("Using proxy: {}", proxy));
            builder = builder.proxy(reqwest::Proxy::all(proxy.as_str())?);
        } else if is_loopback(&base) {
            builder = builder.no_proxy();
        }
        let http = builder.build()?;

        let id = ClientId::generate()?;
        let crypto = CryptoSession::generate()?;
        log.record(format!("Client id: {}", id));

        log.record("Performing key exchange");
        let server_key = Self::exchange_keys(&http, &base, &id, &crypto).await?;

        log.record(format!("Fetching configuration from {}", base_url));
        let request = http.get(endpoint(&base, CONFIG_PATH));
        let sealed = send(request, &id).await?.bytes().await?;
        let config: ProbeConfig = serde_json::from_slice(&crypto.decrypt(&server_key, &sealed)?)?;

        log.record(format!(
            "Server {} listens on ports {:?} and sent {} canaries",
            config.hostname,
            config.ports,
            config.canaries.len()
        ));

        Ok(Self {
            http,
            base,
            id,
            crypto,
            server_key,
            config,
            log,
        })
    }

    async fn exchange_keys(
        http: &reqwest::Client,
        base: &Url,
        id: &ClientId,
        crypto: &CryptoSession,
    ) -> Result<PublicKey> {
        let request = http
            .post(endpoint(base, KEX_PATH))
            .body(crypto.public_key().to_bytes().to_vec());
        let body = send(request, id).await?.bytes().await?;
        if body.len() != PUBLIC_KEY_SIZE {
            return Err(Error::protocol(format!(
                "expected {} byte key lengths from server, got {}",
                PUBLIC_KEY_SIZE,
                body.len()
            )));
        }

        let server_key = PublicKey::from_slice(&body)?;
        if !crypto.accepts_peer(&server_key) {
            return Err(Error::protocol("server sent a low-order public key"));
        }
        Ok(server_key)
    }

    /// This run's identity.
    pub fn client_id(&self) -> &ClientId {
        &self.id
    }

    /// The server's public key.
    pub fn server_key(&self) -> PublicKey {
        self.server_key
    }

    /// Configuration the server handed out.
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Messages recorded so far.
    pub fn log(&self) -> &RunLog {
        &self.log
    }

    /// Ask the server to mirror every canary through every channel set.
    pub async fn download(&mut self) -> Vec<ProbeOutcome> {
        self.log.record("Trying downloads");
        let canaries = self.config.canaries.clone();

        let mut outcomes = Vec::with_capacity(canaries.len() * ChannelSet::ALL.len());
        for (index, canary) in canaries.iter().enumerate() {
            for channels in ChannelSet::ALL {
                let outcome = match self.probe_download(index, canary, channels).await {
                    Ok(verdicts) => ProbeOutcome::checked(Direction::Download, channels, index, verdicts),
                    Err(e) => ProbeOutcome::failed(Direction::Download, channels, index, &e),
                };
                self.record_outcome(&outcome);
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    async fn probe_download(
        &self,
        index: usize,
        canary: &str,
        channels: ChannelSet,
    ) -> Result<Vec<ChannelVerdict>> {
        let mut query = vec![("id", index.to_string())];
        for channel in channels.channels() {
            query.push((channel.name(), "1".to_string()));
        }

        let request = self.http.get(endpoint(&self.base, DATA_PATH)).query(&query);
        let response = send(request, &self.id).await?;

        let headers = response.headers().clone();
        let body = if channels.contains(Channel::Body) {
            response.bytes().await?.to_vec()
        } else {
            Vec::new()
        };

        Ok(matrix::check_download(
            channels,
            canary,
            headers.get(PROBE_HEADER).map(|v| v.as_bytes()),
            headers.get(SET_COOKIE).map(|v| v.as_bytes()),
            &body,
        ))
    }

    /// Send every canary to the server through every channel set.
    pub async fn upload(&mut self) -> Vec<ProbeOutcome> {
        self.log.record("Trying uploads");
        let canaries = self.config.canaries.clone();

        let mut outcomes = Vec::with_capacity(canaries.len() * ChannelSet::ALL.len());
        for (index, canary) in canaries.iter().enumerate() {
            for channels in ChannelSet::ALL {
                let outcome = match self.probe_upload(index, canary, channels).await {
                    Ok(verdicts) => ProbeOutcome::checked(Direction::Upload, channels, index, verdicts),
                    Err(e) => ProbeOutcome::failed(Direction::Upload, channels, index, &e),
                };
                self.record_outcome(&outcome);
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    async fn probe_upload(
        &self,
        index: usize,
        canary: &str,
        channels: ChannelSet,
    ) -> Result<Vec<ChannelVerdict>> {
        let mut request = self.http.post(endpoint(&self.base, DATA_PATH));
        if channels.contains(Channel::Header) {
            request = request.header(PROBE_HEADER, canary);
        }
        if channels.contains(Channel::Cookie) {
            request = request.header(COOKIE, cookie_value(canary));
        }
        if channels.contains(Channel::Body) {
            request = request.body(canary.to_owned());
        }

        let sealed = send(request, &self.id).await?.bytes().await?;
        let result: ProbeResult =
            serde_json::from_slice(&self.crypto.decrypt(&self.server_key, &sealed)?)?;

        Ok(matrix::check_upload(channels, index, &result))
    }

    fn record_outcome(&mut self, outcome: &ProbeOutcome) {
        for line in outcome.log_lines() {
            self.log.record(line);
        }
    }

    /// Ship the run log to the server.
    ///
    /// A failure is recorded in the local log and returned; the run itself
    /// is unaffected.
    pub async fn report(&mut self) -> Result<()> {
        self.log.record("Submitting results to server");

        let result = self.send_report().await;
        if let Err(e) = &result {
            self.log.record(format!("Failed to send log message: {}", matrix::failure_text(e)));
        }
        result
    }

    async fn send_report(&self) -> Result<()> {
        let json = serde_json::to_vec(self.log.entries())?;
        let sealed = self.crypto.encrypt(&self.server_key, &json)?;

        let request = self.http.post(endpoint(&self.base, LOG_PATH)).body(sealed);
        send(request, &self.id).await?;
        Ok(())
    }

    /// Run downloads, then uploads, then report.
    pub async fn run(&mut self) -> Vec<ProbeOutcome> {
        let mut outcomes = self.download().await;
        outcomes.extend(self.upload().await);

        let summary = MatrixSummary::from_outcomes(&outcomes);
        self.log.record(format!("Summary: {}", summary));

        // Failure is already in the log
        let _ = self.report().await;
        outcomes
    }
}

fn endpoint(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    url.set_path(path);
    url.set_query(None);
    url
}

/// Loopback servers are never reached through the system proxy.
fn is_loopback(url: &Url) -> bool {
    match url.host_str() {
        Some("localhost") => true,
        Some(host) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false),
        None => false,
    }
}

/// Tag `request` with the identity, send it and insist on 200.
async fn send(request: RequestBuilder, id: &ClientId) -> Result<Response> {
    let response = request.header(ID_HEADER, id.format()).send().await?;
    let status = response.status();
    if status != StatusCode::OK {
        return Err(Error::Status(status.as_u16()));
    }
    Ok(response)
}
