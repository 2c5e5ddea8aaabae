/// The beacon controller: one object owning the scan session, the discovery
/// strategy and the reporter.
///
/// The firmware keeps a single `Beacon` behind its HTTP handlers. A trigger is
/// handled in two steps on the same execution context: [`Beacon::dispatch`]
/// renders the acknowledgment, the handler writes it, then
/// [`Beacon::run_cycle`] performs discovery and reporting. Nothing from the
/// cycle flows back to the trigger caller.
use crate::comm::{self, Method, Reply, Route};
use crate::protocol::{StartAck, StatusBody, VERSION};
use crate::report::{JsonPoster, ReportOutcome, Reporter, Uplink};
use crate::scanner::DiscoveryStrategy;
use crate::session::{BeginError, ScanSession};

/// An incoming control request, as much of it as the surface looks at.
pub struct Request<'a> {
    pub method: Method,
    /// Request target, possibly with a query string
    pub uri: &'a str,
    pub content_type: Option<&'a str>,
    pub body: &'a [u8],
}

/// What the transport should do with a request.
#[derive(Debug)]
pub enum Dispatch<P> {
    /// Write the reply; nothing else to do
    Reply(Reply),
    /// Write the acknowledgment, then call [`Beacon::run_cycle`] with `params`
    StartCycle { ack: Reply, params: P },
}

/// Result of one discovery+report cycle. Logged by the caller, never returned
/// to the HTTP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another cycle held the session; nothing ran
    Rejected,
    Completed {
        /// Identifiers collected this cycle
        devices: usize,
        /// Whether the radio reported an error during discovery
        discovery_failed: bool,
        report: ReportOutcome,
    },
}

pub struct Beacon<D, U, P> {
    session: ScanSession,
    strategy: D,
    reporter: Reporter<U, P>,
    board: &'static str,
}

impl<D, U, P> Beacon<D, U, P>
where
    D: DiscoveryStrategy,
    U: Uplink,
    P: JsonPoster,
{
    pub fn new(strategy: D, reporter: Reporter<U, P>, board: &'static str) -> Self {
        Self {
            session: ScanSession::new(),
            strategy,
            reporter,
            board,
        }
    }

    /// Route a request and render the immediate response.
    pub fn dispatch(&self, req: &Request<'_>, uptime_secs: u32) -> Dispatch<D::Params> {
        match comm::route::<D>(req.method, req.uri) {
            Route::Start => {
                let query = comm::split_uri(req.uri).1;
                let scan_time = comm::scan_time_param(query, req.content_type, req.body);
                let params = D::params(scan_time);
                log::info!("Received {} request, params {:?}", D::TRIGGER_PATH, params);

                let ack = Reply::json(
                    200,
                    &StartAck {
                        status: "success",
                        message: D::STARTED_MESSAGE,
                        scan_time: D::reported_scan_time(params),
                    },
                );
                Dispatch::StartCycle { ack, params }
            }
            Route::Status => Dispatch::Reply(Reply::json(200, &self.status(uptime_secs))),
            Route::Info => Dispatch::Reply(Reply::info_page()),
            Route::MethodNotAllowed => Dispatch::Reply(Reply::method_not_allowed()),
            Route::NotFound => {
                log::debug!("No route for {:?} {}", req.method, req.uri);
                Dispatch::Reply(Reply::not_found())
            }
        }
    }

    /// Run one discovery step and report the result.
    ///
    /// A call while a cycle is in progress is a logged no-op.
    pub fn run_cycle(&mut self, params: D::Params) -> CycleOutcome {
        if let Err(BeginError::AlreadyScanning) = self.session.begin() {
            log::warn!("Scan already in progress, trigger ignored");
            return CycleOutcome::Rejected;
        }

        let session = &mut self.session;
        let discovery_failed = match self.strategy.discover(params, &mut |id| session.record(id)) {
            Ok(()) => false,
            Err(e) => {
                log::error!("{} discovery failed: {:?}", D::LABEL, e);
                true
            }
        };

        self.session.note_lost(self.strategy.take_lost());
        let dropped = self.session.dropped();
        if dropped > 0 {
            log::warn!("{} observations dropped", dropped);
        }

        let report = self.reporter.report(self.session.devices());
        let devices = self.session.devices().len();
        self.session.finish();

        log::info!("Cycle completed: {} devices, report {:?}", devices, report);
        CycleOutcome::Completed {
            devices,
            discovery_failed,
            report,
        }
    }

    pub fn status(&self, uptime_secs: u32) -> StatusBody {
        StatusBody {
            status: "ok",
            scanning: self.session.is_scanning(),
            strategy: D::LABEL,
            uptime: uptime_secs,
            last_count: self.session.last_count(),
            board: self.board,
            version: VERSION,
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.session.is_scanning()
    }

    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    pub fn report_url(&self) -> &'static str {
        self.reporter.url()
    }

    #[cfg(test)]
    fn session_mut(&mut self) -> &mut ScanSession {
        &mut self.session
    }

    #[cfg(test)]
    fn reporter_mut(&mut self) -> &mut Reporter<U, P> {
        &mut self.reporter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::Body;
    use crate::report::fakes::{FakeUplink, RecordingPoster};
    use crate::scanner::{
        AdvertisementRadio, InstantRosterSnapshot, StationRoster, TimedAdvertisementScan,
    };
    use crate::session::ScanTime;
    use std::vec::Vec;

    const URL: &str = "http://collector.test/api/attendance";

    /// Replays one advertisement list per scan call.
    struct ScriptedRadio {
        rounds: Vec<Vec<[u8; 6]>>,
        durations: Vec<u32>,
        fail: bool,
        /// Lost advertisements reported after each scan
        lost: u16,
    }

    impl ScriptedRadio {
        fn new(rounds: Vec<Vec<[u8; 6]>>) -> Self {
            Self {
                rounds,
                durations: Vec::new(),
                fail: false,
                lost: 0,
            }
        }
    }

    impl AdvertisementRadio for ScriptedRadio {
        type Error = &'static str;

        fn scan(
            &mut self,
            duration: ScanTime,
            on_advertisement: &mut dyn FnMut(&[u8; 6]),
        ) -> Result<(), &'static str> {
            self.durations.push(duration.secs());
            let round = if self.rounds.is_empty() {
                Vec::new()
            } else {
                self.rounds.remove(0)
            };
            for addr in &round {
                on_advertisement(addr);
            }
            if self.fail {
                Err("scan aborted")
            } else {
                Ok(())
            }
        }

        fn take_lost(&mut self) -> u16 {
            core::mem::take(&mut self.lost)
        }
    }

    struct FixedRoster(Vec<[u8; 6]>);

    impl StationRoster for FixedRoster {
        type Error = ();

        fn for_each_station(&mut self, on_station: &mut dyn FnMut(&[u8; 6])) -> Result<(), ()> {
            self.0.iter().for_each(|a| on_station(a));
            Ok(())
        }
    }

    type BleBeacon = Beacon<TimedAdvertisementScan<ScriptedRadio>, FakeUplink, RecordingPoster>;
    type ApBeacon = Beacon<InstantRosterSnapshot<FixedRoster>, FakeUplink, RecordingPoster>;

    fn ble_beacon(rounds: Vec<Vec<[u8; 6]>>, connected: bool) -> BleBeacon {
        Beacon::new(
            TimedAdvertisementScan::new(ScriptedRadio::new(rounds)),
            Reporter::new(URL, FakeUplink(connected), RecordingPoster::answering(200)),
            "test_board",
        )
    }

    fn ap_beacon(stations: Vec<[u8; 6]>) -> ApBeacon {
        Beacon::new(
            InstantRosterSnapshot::new(FixedRoster(stations)),
            Reporter::new(URL, FakeUplink(true), RecordingPoster::answering(200)),
            "test_board",
        )
    }

    fn mac(last: u8) -> [u8; 6] {
        [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, last]
    }

    fn post<'a>(uri: &'a str, body: &'a [u8]) -> Request<'a> {
        Request {
            method: Method::Post,
            uri,
            content_type: None,
            body,
        }
    }

    fn get(uri: &str) -> Request<'_> {
        Request {
            method: Method::Get,
            uri,
            content_type: None,
            body: b"",
        }
    }

    fn body_str(reply: &Reply) -> &str {
        core::str::from_utf8(reply.body.as_bytes()).unwrap()
    }

    fn sent_bodies<D: DiscoveryStrategy>(
        beacon: &mut Beacon<D, FakeUplink, RecordingPoster>,
    ) -> Vec<std::string::String> {
        let (_, poster) = beacon.reporter_mut().parts_mut();
        poster.requests.iter().map(|(_, b)| b.clone()).collect()
    }

    // ── Dispatch ────────────────────────────────────────────────────

    #[test]
    fn trigger_acknowledges_with_effective_scan_time() {
        let beacon = ble_beacon(Vec::new(), true);
        match beacon.dispatch(&post("/api/start-attendance?scanTime=9", b""), 0) {
            Dispatch::StartCycle { ack, params } => {
                assert_eq!(ack.status, 200);
                assert_eq!(
                    body_str(&ack),
                    r#"{"status":"success","message":"Attendance scan started","scanTime":9}"#
                );
                assert_eq!(params.secs(), 9);
            }
            other => panic!("expected StartCycle, got {other:?}"),
        }
    }

    #[test]
    fn invalid_scan_time_uses_default() {
        let beacon = ble_beacon(Vec::new(), true);
        let Dispatch::StartCycle { ack, params } =
            beacon.dispatch(&post("/api/start-attendance", b"scanTime=-7"), 0)
        else {
            panic!("expected StartCycle");
        };
        assert_eq!(params.secs(), 5);
        assert!(body_str(&ack).ends_with(r#""scanTime":5}"#));
    }

    #[test]
    fn undefined_route_is_404_text() {
        let beacon = ble_beacon(Vec::new(), true);
        let Dispatch::Reply(reply) = beacon.dispatch(&get("/missing"), 0) else {
            panic!("expected Reply");
        };
        assert_eq!(reply.status, 404);
        assert_eq!(reply.content_type, "text/plain");
        assert_eq!(reply.body, Body::Static("Not Found"));
    }

    #[test]
    fn other_methods_are_404_text_on_every_path() {
        fn other(uri: &str) -> Request<'_> {
            Request {
                method: Method::Other,
                uri,
                content_type: None,
                body: b"",
            }
        }

        fn assert_not_found<P>(dispatch: Dispatch<P>) {
            let Dispatch::Reply(reply) = dispatch else {
                panic!("expected Reply");
            };
            assert_eq!(reply.status, 404);
            assert_eq!(reply.content_type, "text/plain");
            assert_eq!(reply.body, Body::Static("Not Found"));
        }

        let ble = ble_beacon(Vec::new(), true);
        for uri in ["/", "/status", "/api/start-attendance", "/nope"] {
            assert_not_found(ble.dispatch(&other(uri), 0));
        }
        let ap = ap_beacon(Vec::new());
        for uri in ["/", "/status", "/start-attendance", "/nope"] {
            assert_not_found(ap.dispatch(&other(uri), 0));
        }
    }

    #[test]
    fn ap_get_on_trigger_is_405_json() {
        let beacon = ap_beacon(Vec::new());
        let Dispatch::Reply(reply) = beacon.dispatch(&get("/start-attendance"), 0) else {
            panic!("expected Reply");
        };
        assert_eq!(reply.status, 405);
        assert_eq!(reply.content_type, "application/json");
        assert!(body_str(&reply).contains(r#""status":"error""#));
    }

    #[test]
    fn ap_ack_has_no_scan_time() {
        let beacon = ap_beacon(Vec::new());
        let Dispatch::StartCycle { ack, .. } =
            beacon.dispatch(&post("/start-attendance?scanTime=30", b""), 0)
        else {
            panic!("expected StartCycle");
        };
        assert_eq!(ack.status, 200);
        assert!(!body_str(&ack).contains("scanTime"));
    }

    #[test]
    fn ap_serves_info_page() {
        let beacon = ap_beacon(Vec::new());
        let Dispatch::Reply(reply) = beacon.dispatch(&get("/"), 0) else {
            panic!("expected Reply");
        };
        assert_eq!(reply.status, 200);
        assert_eq!(reply.content_type, "text/html");
    }

    #[test]
    fn status_reports_last_cycle() {
        let mut beacon = ble_beacon(vec![vec![mac(1), mac(2)]], true);
        beacon.run_cycle(ScanTime::default());

        let Dispatch::Reply(reply) = beacon.dispatch(&get("/status"), 77) else {
            panic!("expected Reply");
        };
        let body = body_str(&reply);
        assert!(body.contains(r#""scanning":false"#));
        assert!(body.contains(r#""strategy":"ble""#));
        assert!(body.contains(r#""uptime":77"#));
        assert!(body.contains(r#""lastCount":2"#));
        assert!(body.contains(r#""board":"test_board""#));
    }

    // ── Cycles ──────────────────────────────────────────────────────

    #[test]
    fn cycle_scans_for_requested_duration_and_reports() {
        let mut beacon = ble_beacon(vec![vec![mac(1), mac(2), mac(3)]], true);
        let outcome = beacon.run_cycle(ScanTime::from_requested(4));

        assert_eq!(
            outcome,
            CycleOutcome::Completed {
                devices: 3,
                discovery_failed: false,
                report: ReportOutcome::Sent(200),
            }
        );
        assert!(!beacon.is_scanning());
        assert_eq!(beacon.strategy_radio().durations, [4]);
        assert_eq!(
            sent_bodies(&mut beacon),
            [r#"{"devices":["aa:bb:cc:dd:ee:01","aa:bb:cc:dd:ee:02","aa:bb:cc:dd:ee:03"]}"#]
        );
    }

    #[test]
    fn no_leakage_between_cycles() {
        let mut beacon = ble_beacon(vec![vec![mac(1), mac(2)], vec![mac(9)]], true);
        beacon.run_cycle(ScanTime::default());
        beacon.run_cycle(ScanTime::default());

        assert_eq!(beacon.session().devices().len(), 1);
        let bodies = sent_bodies(&mut beacon);
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[1], r#"{"devices":["aa:bb:cc:dd:ee:09"]}"#);
    }

    #[test]
    fn empty_cycle_sends_nothing() {
        let mut beacon = ble_beacon(vec![Vec::new()], true);
        let outcome = beacon.run_cycle(ScanTime::default());
        assert!(matches!(
            outcome,
            CycleOutcome::Completed {
                devices: 0,
                report: ReportOutcome::SkippedEmpty,
                ..
            }
        ));
        assert!(sent_bodies(&mut beacon).is_empty());
    }

    #[test]
    fn disconnected_cycle_sends_nothing() {
        let mut beacon = ble_beacon(vec![vec![mac(1)]], false);
        let outcome = beacon.run_cycle(ScanTime::default());
        assert!(matches!(
            outcome,
            CycleOutcome::Completed {
                devices: 1,
                report: ReportOutcome::SkippedDisconnected,
                ..
            }
        ));
        assert!(sent_bodies(&mut beacon).is_empty());
    }

    #[test]
    fn reentrant_cycle_is_rejected() {
        let mut beacon = ble_beacon(vec![vec![mac(1)]], true);
        beacon.session_mut().begin().unwrap();

        assert_eq!(beacon.run_cycle(ScanTime::default()), CycleOutcome::Rejected);
        assert!(beacon.strategy_radio().durations.is_empty());
        assert!(sent_bodies(&mut beacon).is_empty());
        // Still held by the first cycle
        assert!(beacon.is_scanning());
    }

    #[test]
    fn radio_losses_count_as_dropped_observations() {
        let mut beacon = ble_beacon(vec![vec![mac(1), mac(2)]], true);
        beacon.strategy_radio().lost = 9;

        beacon.run_cycle(ScanTime::default());
        assert_eq!(beacon.session().dropped(), 9);
        assert_eq!(beacon.session().devices().len(), 2);

        beacon.run_cycle(ScanTime::default());
        assert_eq!(beacon.session().dropped(), 0);
    }

    #[test]
    fn discovery_error_still_reports_partial_list() {
        let mut beacon = ble_beacon(vec![vec![mac(1)]], true);
        beacon.strategy_radio().fail = true;

        let outcome = beacon.run_cycle(ScanTime::default());
        assert_eq!(
            outcome,
            CycleOutcome::Completed {
                devices: 1,
                discovery_failed: true,
                report: ReportOutcome::Sent(200),
            }
        );
        assert!(!beacon.is_scanning());
    }

    #[test]
    fn roster_cycle_reports_stations() {
        let mut beacon = ap_beacon(vec![[0x10, 0x20, 0x30, 0x40, 0x50, 0x60]]);
        let outcome = beacon.run_cycle(());
        assert!(matches!(
            outcome,
            CycleOutcome::Completed {
                devices: 1,
                report: ReportOutcome::Sent(200),
                ..
            }
        ));
        assert_eq!(
            sent_bodies(&mut beacon),
            [r#"{"devices":["10:20:30:40:50:60"]}"#]
        );
    }

    impl BleBeacon {
        fn strategy_radio(&mut self) -> &mut ScriptedRadio {
            self.strategy.radio_mut()
        }
    }
}
