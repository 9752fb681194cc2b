//! Frames the station originates itself.

use kissdigi_ax25::Header;
use kissdigi_table::{FrameTable, SlotId};
use tracing::{debug, warn};

use crate::config::StationConfig;
use crate::error::Result;

/// A UI header from our call to the configured destination and path.
pub fn station_header(config: &StationConfig) -> Result<Header> {
    Ok(Header::ui(config.destination, config.call, config.path.clone())?)
}

/// Queue a UI frame straight into Transmit.
///
/// The frame goes out once `lifetime` ticks have passed. Returns `None`
/// (after logging) when no slot or arena space is free; nothing is retried.
pub fn inject_ui(
    table: &mut FrameTable,
    config: &StationConfig,
    info: &[u8],
    lifetime: u8,
) -> Option<SlotId> {
    match try_inject(table, config, info, lifetime) {
        Ok(slot) => {
            debug!(slot, lifetime, info_len = info.len(), "frame injected");
            Some(slot)
        }
        Err(err) => {
            warn!(error = %err, info_len = info.len(), "dropping injected frame");
            None
        }
    }
}

fn try_inject(
    table: &mut FrameTable,
    config: &StationConfig,
    info: &[u8],
    lifetime: u8,
) -> Result<SlotId> {
    let header = station_header(config)?;
    let slot = table.alloc()?;
    if let Err(err) = table.set_info(slot, info) {
        table.free(slot)?;
        return Err(err.into());
    }
    let entry = table.frame_mut(slot)?;
    entry.header = header;
    entry.lifetime = lifetime;
    entry.flags.valid = true;
    entry.flags.transmit = true;
    Ok(slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kissdigi_table::{TableConfig, TableError};

    fn config() -> StationConfig {
        StationConfig {
            call: "N0DIGI-1".parse().unwrap(),
            ..StationConfig::default()
        }
    }

    #[test]
    fn injected_frame_waits_in_transmit() {
        let config = config();
        let mut table = FrameTable::with_config(config.table_config());
        let slot = inject_ui(&mut table, &config, b">on the air", 0).unwrap();

        assert_eq!(
            table.describe(slot).unwrap(),
            "[UV--T-] N0DIGI-1>APZKDG,WIDE2-1:>on the air"
        );
        let entry = table.frame(slot).unwrap();
        assert_eq!(entry.lifetime, 0);
        assert_eq!(entry.header.control, kissdigi_ax25::CTRL_UI);
        assert_eq!(entry.header.pid, kissdigi_ax25::PID_NO_LAYER3);
    }

    #[test]
    fn no_slot_drops_frame() {
        let config = config();
        let mut table = FrameTable::with_config(TableConfig {
            slots: 1,
            ..config.table_config()
        });
        assert!(inject_ui(&mut table, &config, b"a", 0).is_some());
        assert!(inject_ui(&mut table, &config, b"b", 0).is_none());
    }

    #[test]
    fn no_space_frees_the_slot() {
        let config = config();
        let mut table = FrameTable::with_config(TableConfig {
            arena_capacity: 4,
            ..config.table_config()
        });
        assert!(matches!(
            try_inject(&mut table, &config, b"too long", 0),
            Err(crate::DigiError::Table(TableError::InsufficientSpace { .. }))
        ));
        assert_eq!(table.in_use(), 0);
    }
}
