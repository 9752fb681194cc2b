//! APRS digipeater engine.
//!
//! Frames received from the modem land in a shared
//! [`FrameTable`](kissdigi_table::FrameTable). A fixed-period tick moves
//! each one through Admission, Forward, Transmit and Reclaim; frames that
//! should be repeated come back out with their path rewritten.
//!
//! [`Station`] ties the pipeline to a modem link with a receive thread,
//! and adds beacons and a heard list.

pub mod beacon;
pub mod config;
pub mod digipeat;
pub mod error;
pub mod filter;
pub mod heard;
pub mod inject;
pub mod pipeline;
pub mod station;

pub use beacon::{BeaconConfig, BeaconTable, MAX_BEACONS};
pub use config::StationConfig;
pub use digipeat::{digipeat, evaluate_via, RepeatModes, ViaAction};
pub use error::{DigiError, Result};
pub use filter::{FilterConfig, FilterPolicy, RejectReason, Verdict};
pub use heard::{HeardEntry, HeardList};
pub use inject::{inject_ui, station_header};
pub use pipeline::{Pipeline, PipelineEvent, TickReport};
pub use station::{receive_frame, receive_loop, RunStats, Station, Ticker};
