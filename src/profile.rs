//! Participant profile aggregation.
//!
//! Folds the party lists of every discovered call into one profile per
//! participant, keyed by lowercased email (falling back to lowercased name).
//! Profiles feed `participants.csv` and the per-participant transcript tree.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::{Call, Party, PartyContext};

/// Aggregated view of one participant across all discovered calls.
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantProfile {
    /// Participant name as first observed
    pub name: String,
    /// Email address, if known
    pub email: String,
    /// Internal/External classification
    pub context: PartyContext,
    /// Role on calls (first observed)
    pub role: String,
    /// Company affiliation (first observed)
    pub company: String,
    /// Job title (first observed)
    pub title: String,
    /// Speaker ID (first observed)
    pub speaker_id: String,
    /// Number of calls this participant appeared on
    pub total_calls: u64,
    /// Sum of those calls' durations, in minutes
    pub total_duration_minutes: i64,
    /// Calls where this participant was the host
    pub host_count: u64,
    /// Calls where this participant was the organizer
    pub organizer_count: u64,
    /// Earliest call date observed (`YYYY-MM-DD`)
    pub first_seen: String,
    /// Latest call date observed (`YYYY-MM-DD`)
    pub last_seen: String,
    /// IDs of the calls this participant appeared on
    pub call_ids: Vec<String>,
    /// Distinct call dates, sorted
    pub call_dates: Vec<String>,
}

impl ParticipantProfile {
    fn from_party(party: &Party) -> Self {
        Self {
            name: party.name.clone().unwrap_or_default(),
            email: party.email_address.clone().unwrap_or_default(),
            context: party.context,
            role: party.role.clone().unwrap_or_default(),
            company: party.company.clone().unwrap_or_default(),
            title: party.title.clone().unwrap_or_default(),
            speaker_id: party.speaker_id.clone().unwrap_or_default(),
            total_calls: 0,
            total_duration_minutes: 0,
            host_count: 0,
            organizer_count: 0,
            first_seen: String::new(),
            last_seen: String::new(),
            call_ids: Vec::new(),
            call_dates: Vec::new(),
        }
    }

    /// Average call duration in minutes, zero when no calls were recorded.
    pub fn average_duration_minutes(&self) -> f64 {
        if self.total_calls == 0 {
            return 0.0;
        }
        self.total_duration_minutes as f64 / self.total_calls as f64
    }

    /// Best display label for directories and summaries.
    pub fn display_name(&self) -> &str {
        if !self.name.is_empty() {
            &self.name
        } else if !self.email.is_empty() {
            &self.email
        } else {
            "Unknown"
        }
    }

    fn absorb(&mut self, call: &Call, party: &Party) {
        let date = call.date();
        self.total_calls += 1;
        self.total_duration_minutes += call.duration_minutes();
        self.call_ids.push(call.id.clone());
        if !self.call_dates.contains(&date) {
            self.call_dates.push(date.clone());
        }
        if party.is_host {
            self.host_count += 1;
        }
        if party.is_organizer {
            self.organizer_count += 1;
        }
        // "unknown-date" sorts after real dates, which is acceptable for a
        // first/last-seen heuristic.
        if self.first_seen.is_empty() || date < self.first_seen {
            self.first_seen = date.clone();
        }
        if self.last_seen.is_empty() || date > self.last_seen {
            self.last_seen = date;
        }
    }
}

/// Build participant profiles from all discovered calls.
///
/// Keys are [`Party::profile_key`] values; the map is ordered so CSV output
/// is deterministic.
pub fn build_participant_profiles(calls: &[Call]) -> BTreeMap<String, ParticipantProfile> {
    let mut profiles: BTreeMap<String, ParticipantProfile> = BTreeMap::new();

    for call in calls {
        for party in &call.parties {
            let key = party.profile_key();
            let profile = profiles
                .entry(key)
                .or_insert_with(|| ParticipantProfile::from_party(party));
            profile.absorb(call, party);
        }
    }

    for profile in profiles.values_mut() {
        profile.call_dates.sort();
    }

    profiles
}
