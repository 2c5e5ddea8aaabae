//! HTTP on both sides of the beacon.
//!
//! - Control server: every request goes through one wildcard handler that
//!   asks the [`Beacon`] where it lands. A start trigger is acknowledged first,
//!   then the cycle runs on the same httpd task, so no other request is
//!   served until discovery and reporting finish.
//! - Report client: [`HttpPoster`] issues the single blocking JSON POST.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::anyhow;
use attendance_beacon::beacon::{Beacon, CycleOutcome, Dispatch, Request as ControlRequest};
use attendance_beacon::comm::{self, Reply};
use attendance_beacon::defaults::{HTTP_PORT, MAX_REQUEST_BODY};
use attendance_beacon::report::{JsonPoster, Uplink};
use attendance_beacon::scanner::DiscoveryStrategy;
use embedded_svc::http::client::Client;
use embedded_svc::http::{Headers, Method};
use embedded_svc::io::{Read, Write};
use esp_idf_svc::http::client::{Configuration as ClientConfig, EspHttpConnection};
use esp_idf_svc::http::server::{Configuration as ServerConfig, EspHttpServer, Request};

use crate::indicator::Indicator;

/// Timeout for the report POST
const REPORT_TIMEOUT: Duration = Duration::from_secs(10);

/// httpd task stack — the report buffer lives on it during a cycle
const HTTPD_STACK_SIZE: usize = 12 * 1024;

/// Methods the wildcard handler is registered for. httpd answers 405 itself
/// for a method with no handler on a matching URI, so every method a client
/// may send has to land here to get the 404 from `comm::route`.
const ROUTED_METHODS: [Method; 8] = [
    Method::Get,
    Method::Post,
    Method::Put,
    Method::Delete,
    Method::Head,
    Method::Patch,
    Method::Options,
    Method::Trace,
];

struct Shared<D, U, P> {
    beacon: Mutex<Beacon<D, U, P>>,
    indicator: Mutex<Indicator>,
    boot: Instant,
}

/// Start the control server. The server stops when the returned handle drops.
pub fn start<D, U, P>(
    beacon: Beacon<D, U, P>,
    indicator: Indicator,
    boot: Instant,
) -> anyhow::Result<EspHttpServer<'static>>
where
    D: DiscoveryStrategy + Send + 'static,
    U: Uplink + Send + 'static,
    P: JsonPoster + Send + 'static,
{
    log::info!("Reports go to {}", beacon.report_url());

    let shared = Arc::new(Shared {
        beacon: Mutex::new(beacon),
        indicator: Mutex::new(indicator),
        boot,
    });

    let mut server = EspHttpServer::new(&ServerConfig {
        http_port: HTTP_PORT,
        stack_size: HTTPD_STACK_SIZE,
        uri_match_wildcard: true,
        max_uri_handlers: ROUTED_METHODS.len(),
        ..Default::default()
    })?;

    for method in ROUTED_METHODS {
        let shared = shared.clone();
        server.fn_handler("/*", method, move |req| handle(&shared, req))?;
    }

    log::info!("Web server started on port {}", HTTP_PORT);
    log::info!("Endpoint: POST {}", D::TRIGGER_PATH);
    Ok(server)
}

fn handle<D, U, P>(
    shared: &Shared<D, U, P>,
    mut req: Request<&mut EspHttpConnection<'_>>,
) -> anyhow::Result<()>
where
    D: DiscoveryStrategy,
    U: Uplink,
    P: JsonPoster,
{
    let mut body = [0u8; MAX_REQUEST_BODY];
    let mut body_len = 0;
    while body_len < body.len() {
        let n = req.read(&mut body[body_len..])?;
        if n == 0 {
            break;
        }
        body_len += n;
    }

    let dispatch = {
        let control = ControlRequest {
            method: match req.method() {
                Method::Get => comm::Method::Get,
                Method::Post => comm::Method::Post,
                _ => comm::Method::Other,
            },
            uri: req.uri(),
            content_type: req.header("Content-Type"),
            body: &body[..body_len],
        };
        let uptime = shared.boot.elapsed().as_secs() as u32;
        lock(&shared.beacon)?.dispatch(&control, uptime)
    };

    match dispatch {
        Dispatch::Reply(reply) => write_reply(req, &reply),
        Dispatch::StartCycle { ack, params } => {
            write_reply(req, &ack)?;

            let mut indicator = lock(&shared.indicator)?;
            indicator.set(true);
            let outcome = lock(&shared.beacon)?.run_cycle(params);
            indicator.set(false);

            if outcome == CycleOutcome::Rejected {
                log::info!("Trigger acknowledged but no cycle ran");
            } else {
                log::info!("Scan completed.");
            }
            Ok(())
        }
    }
}

fn write_reply(req: Request<&mut EspHttpConnection<'_>>, reply: &Reply) -> anyhow::Result<()> {
    let mut response = req.into_response(
        reply.status,
        Some(reply.reason()),
        &[("Content-Type", reply.content_type)],
    )?;
    response.write_all(reply.body.as_bytes())?;
    response.flush()?;
    Ok(())
}

fn lock<T>(mutex: &Mutex<T>) -> anyhow::Result<std::sync::MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| anyhow!("control state lock poisoned"))
}

// ── Report client ────────────────────────────────────────────────────

/// Blocking JSON POST over `EspHttpConnection`. HTTPS uses the bundled CA set.
pub struct HttpPoster;

impl JsonPoster for HttpPoster {
    type Error = anyhow::Error;

    fn post_json(&mut self, url: &str, body: &[u8]) -> anyhow::Result<u16> {
        let connection = EspHttpConnection::new(&ClientConfig {
            timeout: Some(REPORT_TIMEOUT),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        })?;
        let mut client = Client::wrap(connection);

        let content_length = body.len().to_string();
        let headers = [
            ("Content-Type", comm::CONTENT_TYPE_JSON),
            ("Content-Length", content_length.as_str()),
        ];

        let mut request = client.post(url, &headers)?;
        request.write_all(body)?;
        request.flush()?;
        let response = request.submit()?;
        Ok(response.status())
    }
}
