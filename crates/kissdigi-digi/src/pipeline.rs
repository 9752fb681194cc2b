use bytes::Bytes;
use kissdigi_ax25::Address;
use kissdigi_table::{FrameTable, QueueFlags, Result, SlotId};
use tracing::{debug, trace};

use crate::config::StationConfig;
use crate::digipeat::{digipeat, RepeatModes};
use crate::filter::{FilterConfig, RejectReason, Verdict};

/// Something the pipeline did to one slot during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// Passed the filters and moved to Forward.
    Admitted {
        slot: SlotId,
        source: Address,
        /// No via was marked repeated when we heard it.
        direct: bool,
    },
    /// Same information field as a frame already past Admission.
    Duplicate { slot: SlotId },
    Rejected { slot: SlotId, reason: RejectReason },
    /// Path rewritten; `via` now holds our call.
    Digipeated { slot: SlotId, via: usize },
    /// Forward found nothing for us to do.
    NotRepeated { slot: SlotId },
    /// Encoded and queued for the modem.
    Transmitted { slot: SlotId, len: usize },
    Reclaimed { slot: SlotId },
}

/// Result of one pass over the table.
#[derive(Debug, Default)]
pub struct TickReport {
    pub events: Vec<PipelineEvent>,
    /// Raw AX.25 frames to hand to the KISS writer, in slot order.
    pub outbound: Vec<Bytes>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.outbound.is_empty()
    }

    /// Sources admitted this tick, with their heard-direct flag.
    pub fn admitted(&self) -> impl Iterator<Item = (&Address, bool)> {
        self.events.iter().filter_map(|event| match event {
            PipelineEvent::Admitted { source, direct, .. } => Some((source, *direct)),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Admission,
    Forward,
    Transmit,
    Reclaim,
}

impl Stage {
    /// The first stage whose precondition holds.
    fn select(flags: &QueueFlags, lifetime: u8) -> Option<Self> {
        if !flags.used || !flags.valid {
            return None;
        }
        if !flags.forward && !flags.transmit && !flags.reclaim {
            Some(Self::Admission)
        } else if flags.forward && !flags.transmit && !flags.reclaim {
            Some(Self::Forward)
        } else if flags.transmit && !flags.reclaim && lifetime == 0 {
            Some(Self::Transmit)
        } else if flags.reclaim && lifetime == 0 {
            Some(Self::Reclaim)
        } else {
            None
        }
    }
}

/// The Admission → Forward → Transmit → Reclaim state machine.
#[derive(Debug, Clone)]
pub struct Pipeline {
    station: Address,
    modes: RepeatModes,
    filter: FilterConfig,
    receive_ttl: u8,
    transmit_ttl: u8,
}

impl Pipeline {
    pub fn new(config: &StationConfig) -> Self {
        Self {
            station: config.call,
            modes: config.repeat,
            filter: config.filter.clone(),
            receive_ttl: config.receive_ttl,
            transmit_ttl: config.transmit_ttl,
        }
    }

    pub fn station(&self) -> &Address {
        &self.station
    }

    /// Run one tick over every slot.
    ///
    /// Each slot's lifetime is decremented first, then at most one stage
    /// runs for it.
    pub fn tick(&self, table: &mut FrameTable) -> Result<TickReport> {
        let mut report = TickReport::default();
        for slot in 0..table.len() {
            let entry = table.frame_mut(slot)?;
            if !entry.flags.used {
                continue;
            }
            entry.tick();
            let Some(stage) = Stage::select(&entry.flags, entry.lifetime) else {
                continue;
            };
            trace!(slot, ?stage, "stage selected");
            let event = match stage {
                Stage::Admission => self.admission(table, slot)?,
                Stage::Forward => self.forward(table, slot)?,
                Stage::Transmit => self.transmit(table, slot, &mut report.outbound)?,
                Stage::Reclaim => match self.reclaim(table, slot)? {
                    Some(event) => event,
                    None => continue,
                },
            };
            report.events.push(event);
        }
        Ok(report)
    }

    fn admission(&self, table: &mut FrameTable, slot: SlotId) -> Result<PipelineEvent> {
        let crc = table.frame(slot)?.info_crc();
        let duplicate = table.slots().any(|(other, entry)| {
            let past_admission =
                entry.flags.forward || entry.flags.transmit || entry.flags.reclaim;
            other != slot
                && entry.flags.used
                && entry.flags.valid
                && past_admission
                && entry.info_crc() == crc
        });

        let verdict = if duplicate {
            None
        } else {
            Some(self.filter.evaluate(&table.frame(slot)?.header, &self.station))
        };

        let entry = table.frame_mut(slot)?;
        let event = match verdict {
            Some(Verdict::Admit) => {
                entry.flags.forward = true;
                PipelineEvent::Admitted {
                    slot,
                    source: entry.header.source,
                    direct: !entry.header.via.iter().any(Address::is_repeated),
                }
            }
            Some(Verdict::Reject(reason)) => {
                entry.flags.reclaim = true;
                entry.lifetime = 0;
                PipelineEvent::Rejected { slot, reason }
            }
            None => {
                entry.flags.reclaim = true;
                entry.lifetime = 0;
                PipelineEvent::Duplicate { slot }
            }
        };
        debug!(frame = %table.describe(slot)?, ?event, "admission");
        Ok(event)
    }

    fn forward(&self, table: &mut FrameTable, slot: SlotId) -> Result<PipelineEvent> {
        let transmit_ttl = self.transmit_ttl;
        let entry = table.frame_mut(slot)?;
        let event = match digipeat(&mut entry.header, &self.station, &self.modes) {
            Some(via) => {
                entry.lifetime = transmit_ttl;
                entry.flags.transmit = true;
                PipelineEvent::Digipeated { slot, via }
            }
            None => {
                entry.flags.reclaim = true;
                PipelineEvent::NotRepeated { slot }
            }
        };
        debug!(frame = %table.describe(slot)?, "forward");
        Ok(event)
    }

    fn transmit(
        &self,
        table: &mut FrameTable,
        slot: SlotId,
        outbound: &mut Vec<Bytes>,
    ) -> Result<PipelineEvent> {
        let raw = table.encode_from(slot)?.freeze();
        let len = raw.len();
        outbound.push(raw);

        let entry = table.frame_mut(slot)?;
        entry.lifetime = self.receive_ttl;
        entry.flags.reclaim = true;
        debug!(frame = %table.describe(slot)?, len, "transmit");
        Ok(PipelineEvent::Transmitted { slot, len })
    }

    /// Free the slot once every other valid frame is also waiting to be
    /// reclaimed.
    fn reclaim(&self, table: &mut FrameTable, slot: SlotId) -> Result<Option<PipelineEvent>> {
        let busy = table.slots().any(|(other, entry)| {
            other != slot && entry.flags.used && entry.flags.valid && !entry.flags.reclaim
        });
        if busy {
            return Ok(None);
        }
        trace!(frame = %table.describe(slot)?, "reclaim");
        table.free(slot)?;
        Ok(Some(PipelineEvent::Reclaimed { slot }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterPolicy;
    use bytes::Bytes;
    use kissdigi_ax25::{Ax25Frame, Header};

    fn config() -> StationConfig {
        StationConfig {
            call: "N0DIGI-1".parse().unwrap(),
            filter: FilterConfig {
                policy: FilterPolicy::Deny,
                dest_allow: vec!["APRS".into()],
                ..FilterConfig::default()
            },
            ..StationConfig::default()
        }
    }

    fn raw(src: &str, dest: &str, path: &[&str], info: &[u8]) -> Vec<u8> {
        let header = Header::ui(
            dest.parse().unwrap(),
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

    fn receive(table: &mut FrameTable, frame: &[u8]) -> SlotId {
        let slot = table.alloc().unwrap();
        table.decode_into(slot, frame).unwrap();
        slot
    }

    fn table(config: &StationConfig) -> FrameTable {
        FrameTable::with_config(config.table_config())
    }

    fn via_text(table: &FrameTable, slot: SlotId) -> Vec<String> {
        table
            .frame(slot)
            .unwrap()
            .header
            .via
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn end_to_end_wide2_2() {
        let config = config();
        let pipeline = Pipeline::new(&config);
        let mut table = table(&config);
        let slot = receive(&mut table, &raw("N0CALL-5", "APRS", &["WIDE2-2"], b"test"));

        let report = pipeline.tick(&mut table).unwrap();
        assert_eq!(
            report.events,
            vec![PipelineEvent::Admitted {
                slot,
                source: "N0CALL-5".parse().unwrap(),
                direct: true,
            }]
        );
        assert!(table.frame(slot).unwrap().flags.forward);

        let report = pipeline.tick(&mut table).unwrap();
        assert_eq!(report.events, vec![PipelineEvent::Digipeated { slot, via: 0 }]);
        let entry = table.frame(slot).unwrap();
        assert_eq!(via_text(&table, slot), ["N0DIGI-1*", "WIDE2-1"]);
        assert_eq!(entry.header.hops(), 2);
        assert!(entry.flags.transmit);
        assert_eq!(entry.lifetime, config.transmit_ttl);

        // Waits out the transmit delay, then goes on air once.
        for _ in 0..config.transmit_ttl - 1 {
            assert!(pipeline.tick(&mut table).unwrap().outbound.is_empty());
        }
        let report = pipeline.tick(&mut table).unwrap();
        assert_eq!(report.outbound.len(), 1);
        assert_eq!(
            report.outbound[0],
            raw("N0CALL-5", "APRS", &["N0DIGI-1*", "WIDE2-1"], b"test")
        );
        let entry = table.frame(slot).unwrap();
        assert!(entry.flags.reclaim);
        assert_eq!(entry.lifetime, config.receive_ttl);

        for _ in 0..config.receive_ttl - 1 {
            assert!(pipeline.tick(&mut table).unwrap().is_empty());
        }
        let report = pipeline.tick(&mut table).unwrap();
        assert_eq!(report.events, vec![PipelineEvent::Reclaimed { slot }]);
        assert_eq!(table.in_use(), 0);
        assert_eq!(table.arena().occupied(), 0);
    }

    #[test]
    fn wide1_1_keeps_hop_count() {
        let config = config();
        let pipeline = Pipeline::new(&config);
        let mut table = table(&config);
        let slot = receive(&mut table, &raw("N0CALL-5", "APRS", &["WIDE1-1"], b"x"));

        pipeline.tick(&mut table).unwrap();
        pipeline.tick(&mut table).unwrap();
        assert_eq!(via_text(&table, slot), ["N0DIGI-1*"]);
        assert_eq!(table.frame(slot).unwrap().header.hops(), 1);
    }

    #[test]
    fn duplicates_are_suppressed_once() {
        let config = config();
        let pipeline = Pipeline::new(&config);
        let mut table = table(&config);
        let frame = raw("N0CALL-5", "APRS", &["WIDE2-2"], b"same");
        let a = receive(&mut table, &frame);
        let b = receive(&mut table, &frame);

        let report = pipeline.tick(&mut table).unwrap();
        assert!(matches!(report.events[0], PipelineEvent::Admitted { slot, .. } if slot == a));
        assert_eq!(report.events[1], PipelineEvent::Duplicate { slot: b });

        let a_flags = table.frame(a).unwrap().flags;
        let b_entry = table.frame(b).unwrap();
        assert!(a_flags.forward && !a_flags.reclaim);
        assert!(b_entry.flags.reclaim && !b_entry.flags.forward);
        assert_eq!(b_entry.lifetime, 0);
    }

    #[test]
    fn late_duplicate_of_digipeated_frame_is_suppressed() {
        let config = config();
        let pipeline = Pipeline::new(&config);
        let mut table = table(&config);
        receive(&mut table, &raw("N0CALL-5", "APRS", &["WIDE2-2"], b"same"));
        pipeline.tick(&mut table).unwrap();
        pipeline.tick(&mut table).unwrap();

        // Heard again from another digipeater.
        let echo = receive(
            &mut table,
            &raw("N0CALL-5", "APRS", &["OTHER*", "WIDE2-1"], b"same"),
        );
        let report = pipeline.tick(&mut table).unwrap();
        assert_eq!(report.events, vec![PipelineEvent::Duplicate { slot: echo }]);
    }

    #[test]
    fn own_frames_are_rejected() {
        let config = config();
        let pipeline = Pipeline::new(&config);
        let mut table = table(&config);
        let slot = receive(&mut table, &raw("N0DIGI-1", "APRS", &["WIDE2-1"], b"me"));

        let report = pipeline.tick(&mut table).unwrap();
        assert_eq!(
            report.events,
            vec![PipelineEvent::Rejected {
                slot,
                reason: RejectReason::OwnSource
            }]
        );
        // Lifetime is already zero, so the next tick frees it.
        let report = pipeline.tick(&mut table).unwrap();
        assert_eq!(report.events, vec![PipelineEvent::Reclaimed { slot }]);
    }

    #[test]
    fn filtered_destination_is_rejected() {
        let config = config();
        let pipeline = Pipeline::new(&config);
        let mut table = table(&config);
        let slot = receive(&mut table, &raw("N0CALL-5", "BEACON", &["WIDE2-1"], b"b"));

        let report = pipeline.tick(&mut table).unwrap();
        assert_eq!(
            report.events,
            vec![PipelineEvent::Rejected {
                slot,
                reason: RejectReason::Policy
            }]
        );
    }

    #[test]
    fn unroutable_frame_waits_for_lifetime() {
        let config = config();
        let pipeline = Pipeline::new(&config);
        let mut table = table(&config);
        let slot = receive(&mut table, &raw("N0CALL-5", "APRS", &["NOPATH"], b"n"));

        pipeline.tick(&mut table).unwrap();
        let report = pipeline.tick(&mut table).unwrap();
        assert_eq!(report.events, vec![PipelineEvent::NotRepeated { slot }]);
        let entry = table.frame(slot).unwrap();
        assert!(entry.flags.reclaim);
        assert!(entry.lifetime > 0);
    }

    #[test]
    fn reclaim_waits_for_every_valid_frame() {
        let config = config();
        let pipeline = Pipeline::new(&config);
        let mut table = table(&config);
        let rejected = receive(&mut table, &raw("N0CALL-5", "XYZ", &[], b"1"));
        let pending = receive(&mut table, &raw("N0CALL-6", "APRS", &["WIDE2-1"], b"2"));

        pipeline.tick(&mut table).unwrap();
        // `pending` moves to Forward then Transmit; `rejected` must wait.
        for _ in 0..5 {
            let report = pipeline.tick(&mut table).unwrap();
            assert!(!report
                .events
                .contains(&PipelineEvent::Reclaimed { slot: rejected }));
        }
        assert!(table.frame(rejected).unwrap().flags.used);

        // Force the other frame into Reclaim and the gate opens.
        let entry = table.frame_mut(pending).unwrap();
        entry.flags.reclaim = true;
        entry.lifetime = 0;
        let report = pipeline.tick(&mut table).unwrap();
        assert!(report
            .events
            .contains(&PipelineEvent::Reclaimed { slot: rejected }));
    }

    #[test]
    fn one_transition_per_tick() {
        let config = config();
        let pipeline = Pipeline::new(&config);
        let mut table = table(&config);
        let slot = receive(&mut table, &raw("N0CALL-5", "APRS", &["WIDE2-1"], b"t"));

        assert_eq!(pipeline.tick(&mut table).unwrap().events.len(), 1);
        let flags = table.frame(slot).unwrap().flags;
        assert!(flags.forward && !flags.transmit);
    }

    #[test]
    fn heard_direct_reflects_repeated_vias() {
        let config = config();
        let pipeline = Pipeline::new(&config);
        let mut table = table(&config);
        receive(&mut table, &raw("N0CALL-5", "APRS", &["OTHER*", "WIDE2-1"], b"a"));
        receive(&mut table, &raw("N0CALL-6", "APRS", &["WIDE2-1"], b"b"));

        let report = pipeline.tick(&mut table).unwrap();
        let heard: Vec<_> = report
            .admitted()
            .map(|(source, direct)| (source.to_string(), direct))
            .collect();
        assert_eq!(
            heard,
            [("N0CALL-5".to_string(), false), ("N0CALL-6".to_string(), true)]
        );
    }

    #[test]
    fn undecoded_slots_are_left_alone() {
        let config = config();
        let pipeline = Pipeline::new(&config);
        let mut table = table(&config);
        let slot = table.alloc().unwrap();

        assert!(pipeline.tick(&mut table).unwrap().is_empty());
        assert!(table.frame(slot).unwrap().flags.used);
    }
}
