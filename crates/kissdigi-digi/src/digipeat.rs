//! Via-path rewriting for digipeated frames.

use kissdigi_ax25::{Address, Header, MAX_VIAS};
use serde::{Deserialize, Serialize};

/// Which path aliases the station answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepeatModes {
    /// `RELAY`, `TRACE` and bare `WIDE`.
    pub legacy: bool,
    /// `WIDE1-N`.
    pub wide1: bool,
    /// `WIDE2-N`.
    pub wide2: bool,
}

impl Default for RepeatModes {
    fn default() -> Self {
        Self {
            legacy: false,
            wide1: true,
            wide2: true,
        }
    }
}

const LEGACY_ALIASES: [&str; 3] = ["RELAY", "TRACE", "WIDE"];

/// Outcome of looking at one via.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViaAction {
    /// Already used by someone else; look at the next one.
    NoAction,
    /// The walk ends without a retransmit.
    Stop,
    /// The header was rewritten and the frame should go out again.
    /// `via` is the index now holding our call.
    Retransmit { via: usize },
}

/// Evaluate via `index` of `header` for `station`, rewriting the path when
/// it qualifies.
pub fn evaluate_via(
    header: &mut Header,
    index: usize,
    station: &Address,
    modes: &RepeatModes,
) -> ViaAction {
    let Some(via) = header.via.get(index).copied() else {
        return ViaAction::Stop;
    };
    let ours = via.same_station(station);
    if via.is_repeated() {
        return if ours {
            ViaAction::Stop
        } else {
            ViaAction::NoAction
        };
    }
    let here = station.with_repeated(true);
    if ours {
        header.via[index] = here;
        return ViaAction::Retransmit { via: index };
    }

    let call = via.callsign();
    if modes.legacy && LEGACY_ALIASES.contains(&call) {
        header.via[index] = here;
        return ViaAction::Retransmit { via: index };
    }

    let wide_enabled = match call {
        "WIDE1" => modes.wide1,
        "WIDE2" => modes.wide2,
        _ => false,
    };
    let remaining = via.ssid();
    if !wide_enabled || remaining == 0 {
        return ViaAction::Stop;
    }
    if remaining == 1 {
        header.via[index] = here;
        return ViaAction::Retransmit { via: index };
    }
    if header.via.len() >= MAX_VIAS {
        return ViaAction::Stop;
    }
    match Address::new(call, remaining - 1) {
        Ok(next) => {
            header.via.insert(index + 1, next);
            header.via[index] = here;
            ViaAction::Retransmit { via: index }
        }
        Err(_) => ViaAction::Stop,
    }
}

/// Walk the path until one via decides the frame's fate.
///
/// Returns the index of the rewritten via, or `None` if this station
/// should not repeat the frame.
pub fn digipeat(header: &mut Header, station: &Address, modes: &RepeatModes) -> Option<usize> {
    for index in 0..header.via.len() {
        match evaluate_via(header, index, station, modes) {
            ViaAction::NoAction => continue,
            ViaAction::Stop => return None,
            ViaAction::Retransmit { via } => return Some(via),
        }
    }
    None
}
