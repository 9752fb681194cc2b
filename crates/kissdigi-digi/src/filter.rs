use kissdigi_ax25::{Address, Header};
use serde::{Deserialize, Serialize};

/// Destination prefixes admitted by the default deny policy.
pub const DEFAULT_DEST_ALLOW: [&str; 26] = [
    "AIR", "ALL", "AP", "BEACON", "CQ", "GPS", "DF", "DGPS", "DRILL", "DX", "ID", "JAVA", "MAIL",
    "MICE", "QST", "QTH", "RTCM", "SKY", "SPACE", "SPC", "SYM", "TEL", "TEST", "TLM", "WX", "ZIP",
];

/// What happens to a frame no list entry speaks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterPolicy {
    /// Admit unless a deny list matches.
    Allow,
    /// Admit only if an allow list matches.
    #[default]
    Deny,
}

/// Why Admission turned a frame away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The list policy did not admit it.
    Policy,
    /// We sent it.
    OwnSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Admit,
    Reject(RejectReason),
}

/// Admission lists. Entries are callsign prefixes; SSIDs are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub policy: FilterPolicy,
    pub source_allow: Vec<String>,
    pub source_deny: Vec<String>,
    pub dest_allow: Vec<String>,
    pub dest_deny: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            policy: FilterPolicy::Deny,
            source_allow: Vec::new(),
            source_deny: Vec::new(),
            dest_allow: DEFAULT_DEST_ALLOW.iter().map(|s| s.to_string()).collect(),
            dest_deny: Vec::new(),
        }
    }
}

fn any_prefix(list: &[String], address: &Address) -> bool {
    list.iter().any(|prefix| address.matches_prefix(prefix))
}

impl FilterConfig {
    /// Decide whether `station` should consider `header` for digipeating.
    ///
    /// Frames addressed to the station are always admitted and frames from
    /// the station are always rejected; the source rule wins if both apply.
    pub fn evaluate(&self, header: &Header, station: &Address) -> Verdict {
        let mut admit = match self.policy {
            FilterPolicy::Deny => {
                any_prefix(&self.source_allow, &header.source)
                    || any_prefix(&self.dest_allow, &header.destination)
            }
            FilterPolicy::Allow => {
                !(any_prefix(&self.source_deny, &header.source)
                    || any_prefix(&self.dest_deny, &header.destination))
            }
        };
        if header.destination.same_station(station) {
            admit = true;
        }
        if header.source.same_station(station) {
            return Verdict::Reject(RejectReason::OwnSource);
        }
        if admit {
            Verdict::Admit
        } else {
            Verdict::Reject(RejectReason::Policy)
        }
    }
}
