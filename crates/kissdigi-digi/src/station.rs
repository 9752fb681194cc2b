use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use kissdigi_kiss::{KissError, KissFrame, KissReader, KissWriter};
use kissdigi_table::{FrameTable, SharedTable, SlotId, TableError};
use kissdigi_transport::{ModemStream, TransportError};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::beacon::BeaconTable;
use crate::config::StationConfig;
use crate::error::{DigiError, Result};
use crate::heard::HeardList;
use crate::inject::inject_ui;
use crate::pipeline::{Pipeline, PipelineEvent, TickReport};

/// Fixed-period schedule for pipeline ticks.
///
/// Deadlines advance by exactly one period, so a slow tick does not shift
/// the ones after it. A loop that falls more than a period behind starts
/// over from the current time instead of bursting.
#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    next: Instant,
}

impl Ticker {
    pub fn new(period: Duration, start: Instant) -> Self {
        Self {
            period,
            next: start + period,
        }
    }

    /// Sleep until the next deadline and return it.
    pub fn wait(&mut self) -> Instant {
        let now = Instant::now();
        if self.next > now {
            thread::sleep(self.next - now);
        } else if now - self.next > self.period {
            self.next = now;
        }
        let deadline = self.next;
        self.next += self.period;
        deadline
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

/// Counters accumulated over a station run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub ticks: u64,
    pub received: u64,
    pub admitted: u64,
    pub duplicates: u64,
    pub rejected: u64,
    pub digipeated: u64,
    pub transmitted: u64,
    pub reclaimed: u64,
}

impl RunStats {
    pub fn absorb(&mut self, report: &TickReport) {
        self.ticks += 1;
        for event in &report.events {
            let counter = match event {
                PipelineEvent::Admitted { .. } => &mut self.admitted,
                PipelineEvent::Duplicate { .. } => &mut self.duplicates,
                PipelineEvent::Rejected { .. } => &mut self.rejected,
                PipelineEvent::Digipeated { .. } => &mut self.digipeated,
                PipelineEvent::Transmitted { .. } => &mut self.transmitted,
                PipelineEvent::Reclaimed { .. } => &mut self.reclaimed,
                PipelineEvent::NotRepeated { .. } => continue,
            };
            *counter += 1;
        }
    }
}

/// Store one received KISS frame in the table, ready for Admission.
///
/// Allocation and decode happen under a single lock. A frame that fails
/// to decode gives its slot back.
pub fn receive_frame(table: &SharedTable, frame: &KissFrame) -> Result<SlotId> {
    let mut guard = table.lock()?;
    store_frame(&mut guard, &frame.payload)
}

fn store_frame(table: &mut FrameTable, raw: &[u8]) -> Result<SlotId> {
    let slot = table.alloc()?;
    if let Err(err) = table.decode_into(slot, raw) {
        table.free(slot)?;
        return Err(err.into());
    }
    Ok(slot)
}

/// Read frames from the modem until EOF, a fatal error, or `running`
/// clears. Returns the number of frames stored.
pub fn receive_loop<R: std::io::Read>(
    mut reader: KissReader<R>,
    table: SharedTable,
    running: Arc<AtomicBool>,
) -> Result<u64> {
    let mut stored = 0u64;
    let outcome = loop {
        if !running.load(Ordering::SeqCst) {
            break Ok(());
        }
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(KissError::BadStream(err))
                if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                continue
            }
            Err(KissError::ConnectionClosed) => {
                info!("modem closed the link");
                break Ok(());
            }
            Err(err @ (KissError::BadFrame { .. } | KissError::BufferOverflow { .. })) => {
                warn!(error = %err, "discarding KISS frame");
                continue;
            }
            Err(err) => break Err(err.into()),
        };
        match receive_frame(&table, &frame) {
            Ok(slot) => {
                stored += 1;
                trace!(slot, port = frame.port, len = frame.payload.len(), "frame stored");
            }
            Err(err) => warn!(error = %err, port = frame.port, "dropping received frame"),
        }
    };
    running.store(false, Ordering::SeqCst);
    outcome.map(|()| stored)
}

/// A digipeater bound to one modem link.
pub struct Station {
    config: StationConfig,
    table: SharedTable,
    pipeline: Pipeline,
    beacons: BeaconTable,
    heard: HeardList,
    running: Arc<AtomicBool>,
}

impl Station {
    /// Validate `config` and build an idle station.
    pub fn new(config: StationConfig) -> Result<Self> {
        config.validate()?;
        let table = SharedTable::new(FrameTable::with_config(config.table_config()));
        let beacons = BeaconTable::from_configs(&config.beacons, Instant::now())?;
        Ok(Self {
            pipeline: Pipeline::new(&config),
            table,
            beacons,
            heard: HeardList::new(),
            running: Arc::new(AtomicBool::new(true)),
            config,
        })
    }

    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    pub fn table(&self) -> &SharedTable {
        &self.table
    }

    pub fn heard(&self) -> &HeardList {
        &self.heard
    }

    pub fn beacons_mut(&mut self) -> &mut BeaconTable {
        &mut self.beacons
    }

    /// The run flag. Clearing it stops [`Station::run`] within a tick.
    pub fn running(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Queue a UI frame from this station for immediate transmission.
    pub fn send_ui(&self, info: &[u8]) -> Result<Option<SlotId>> {
        let mut table = self.table.lock()?;
        Ok(inject_ui(&mut table, &self.config, info, 0))
    }

    /// One main-loop pass: inject due beacons, tick the pipeline and feed
    /// the heard list. The table lock is released before returning.
    pub fn step(&mut self, now: Instant) -> Result<TickReport> {
        let report = {
            let mut table = self.table.lock()?;
            let config = &self.config;
            let beacons = self.beacons.process(now, |text| {
                inject_ui(&mut table, config, text.as_bytes(), 0).is_some()
            });
            if beacons > 0 {
                debug!(beacons, "beacons queued");
            }
            self.pipeline.tick(&mut table)?
        };

        self.heard.refresh(now);
        for (source, direct) in report.admitted() {
            if !self.heard.record(source, direct, now) {
                trace!(%source, "heard list full");
            }
        }
        Ok(report)
    }

    /// Digipeat on `stream` until the run flag clears or the link drops.
    pub fn run(&mut self, stream: ModemStream) -> Result<RunStats> {
        let kiss = self.config.kiss_config();
        let reader = KissReader::with_config_modem(stream.try_clone()?, kiss.clone())?;
        let mut writer = KissWriter::with_config_modem(stream, kiss)?;

        self.running.store(true, Ordering::SeqCst);
        let receiver = {
            let table = self.table.clone();
            let running = self.running.clone();
            thread::Builder::new()
                .name("kiss-rx".into())
                .spawn(move || receive_loop(reader, table, running))
                .map_err(TransportError::Io)?
        };
        info!(
            call = %self.config.call,
            transport = writer.get_ref().transport_name(),
            tick_ms = self.config.tick_ms,
            "station running"
        );

        let mut ticker = Ticker::new(self.config.tick_period(), Instant::now());
        let mut stats = RunStats::default();
        let outcome = loop {
            if !self.running.load(Ordering::SeqCst) {
                break Ok(());
            }
            let now = ticker.wait();
            let report = match self.step(now) {
                Ok(report) => report,
                // Already logged by the lock; try again next tick.
                Err(DigiError::Table(TableError::LockTimeout { .. })) => continue,
                Err(err) => break Err(err),
            };
            stats.absorb(&report);
            let sent = report
                .outbound
                .iter()
                .try_for_each(|raw| writer.send(self.config.kiss_port, raw));
            if let Err(err) = sent {
                break Err(err.into());
            }
        };

        self.running.store(false, Ordering::SeqCst);
        if let Err(err) = writer.get_ref().shutdown() {
            debug!(error = %err, "modem shutdown failed");
        }
        let received = receiver.join().map_err(|_| DigiError::ReceiverPanicked)?;
        outcome?;
        stats.received = received?;
        info!(?stats, "station stopped");
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use kissdigi_ax25::{Ax25Frame, Header};
    use kissdigi_kiss::{encode_data, KissConfig};
    use kissdigi_transport::UnixDomainSocket;

    fn config() -> StationConfig {
        StationConfig {
            call: "N0DIGI-1".parse().unwrap(),
            tick_ms: 10,
            transmit_ttl: 2,
            receive_ttl: 5,
            ..StationConfig::default()
        }
    }

    fn raw(src: &str, path: &[&str], info: &[u8]) -> Vec<u8> {
        let header = Header::ui(
            "APRS".parse().unwrap(),
            src.parse().unwrap(),
            path.iter().map(|v| v.parse().unwrap()).collect(),
        )
        .unwrap();
        Ax25Frame {
            header,
            info: Bytes::copy_from_slice(info),
        }
        .encode()
        .to_vec()
    }

    #[test]
    fn ticker_keeps_fixed_deadlines() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_millis(5), start);
        assert_eq!(ticker.wait(), start + Duration::from_millis(5));
        assert_eq!(ticker.wait(), start + Duration::from_millis(10));
        assert!(Instant::now() >= start + Duration::from_millis(10));
    }

    #[test]
    fn ticker_resyncs_when_far_behind() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_millis(1), start);
        thread::sleep(Duration::from_millis(20));
        let deadline = ticker.wait();
        assert!(deadline > start + Duration::from_millis(10));
    }

    #[test]
    fn bad_frame_frees_its_slot() {
        let station = Station::new(config()).unwrap();
        let frame = KissFrame::new(0, Bytes::from_static(&[0x82, 0x84]));
        let err = receive_frame(station.table(), &frame).unwrap_err();
        assert!(matches!(err, DigiError::Table(TableError::Decode(_))));
        assert_eq!(station.table().lock().unwrap().in_use(), 0);
    }

    #[test]
    fn empty_frame_is_truncated() {
        let station = Station::new(config()).unwrap();
        let err = receive_frame(station.table(), &KissFrame::new(0, Bytes::new())).unwrap_err();
        assert!(matches!(
            err,
            DigiError::Table(TableError::Decode(kissdigi_ax25::Ax25Error::Truncated { len: 0 }))
        ));
        assert_eq!(station.table().lock().unwrap().in_use(), 0);
    }

    #[test]
    fn step_runs_pipeline_and_feeds_heard_list() {
        let mut station = Station::new(config()).unwrap();
        let frame = KissFrame::new(0, Bytes::from(raw("N0CALL-5", &["WIDE1-1"], b"hi")));
        receive_frame(station.table(), &frame).unwrap();

        let now = Instant::now();
        let report = station.step(now).unwrap();
        assert!(matches!(report.events[0], PipelineEvent::Admitted { .. }));
        let heard = station.heard().get(&"N0CALL-5".parse().unwrap()).unwrap();
        assert_eq!(heard.heard[0], 1);
        assert_eq!(heard.direct[0], 1);

        station.step(now).unwrap();
        station.step(now).unwrap();
        let report = station.step(now).unwrap();
        assert_eq!(
            report.outbound,
            vec![Bytes::from(raw("N0CALL-5", &["N0DIGI-1*"], b"hi"))]
        );
    }

    #[test]
    fn due_beacons_go_out_on_the_next_step() {
        let mut config = config();
        config.beacons = vec![crate::beacon::BeaconConfig {
            interval_secs: 0,
            offset_secs: 0,
            text: ">beacon".into(),
        }];
        let mut station = Station::new(config).unwrap();

        let report = station.step(Instant::now() + Duration::from_secs(1)).unwrap();
        assert_eq!(report.outbound.len(), 1);
        let frame = Ax25Frame::decode(&report.outbound[0]).unwrap();
        assert_eq!(frame.header.source.to_string(), "N0DIGI-1");
        assert_eq!(frame.info.as_ref(), b">beacon");
    }

    #[test]
    fn send_ui_reports_exhaustion() {
        let station = Station::new(StationConfig {
            slots: 1,
            ..config()
        })
        .unwrap();
        assert_eq!(station.send_ui(b"one").unwrap(), Some(0));
        assert_eq!(station.send_ui(b"two").unwrap(), None);
    }

    #[test]
    fn run_digipeats_over_a_socket() {
        let path = std::env::temp_dir().join(format!("kissdigi-station-{}.sock", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let tnc = UnixDomainSocket::bind(&path).unwrap();

        let mut station = Station::new(config()).unwrap();
        let running = station.running();
        let client = UnixDomainSocket::connect(&path).unwrap();
        let runner = thread::spawn(move || station.run(client));

        let mut modem = tnc.accept().unwrap();
        let mut wire = bytes::BytesMut::new();
        encode_data(0, &raw("N0CALL-5", &["WIDE2-2"], b"test"), &mut wire).unwrap();
        std::io::Write::write_all(&mut modem, &wire).unwrap();

        let mut reader = KissReader::with_config(
            modem,
            KissConfig {
                read_timeout: Some(Duration::from_secs(5)),
                ..KissConfig::default()
            },
        );
        reader
            .get_ref()
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let echoed = reader.read_frame().unwrap();
        let frame = Ax25Frame::decode(&echoed.payload).unwrap();
        let path_text: Vec<_> = frame.header.via.iter().map(ToString::to_string).collect();
        assert_eq!(path_text, ["N0DIGI-1*", "WIDE2-1"]);

        running.store(false, Ordering::SeqCst);
        let stats = runner.join().unwrap().unwrap();
        assert_eq!(stats.received, 1);
        assert_eq!(stats.digipeated, 1);
        assert_eq!(stats.transmitted, 1);
    }
}
