use crate::core::{LaneRole, StreamId};
use crate::error::{PlaybackError, RateError, SeekError};
use crate::media::StreamHandle;
use crate::sync::drift::{DriftEntry, DriftReport, ResyncOutcome};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// A set of streams kept time- and state-aligned
///
/// The group is the sole mutator of member play state and rate. Every
/// group-wide operation dispatches to members in a fixed order (primary
/// lane first, then ascending id), so repeated identical commands produce
/// identical per-member ordering. Play and rate changes are all-or-nothing:
/// a member failure rolls the whole group back rather than leaving members
/// disagreeing about state.
pub struct SyncGroup {
    /// Members in dispatch order; the first member is the drift reference
    members: Vec<StreamHandle>,
    /// Group play intent; single source of truth
    playing: bool,
    /// Target rate applied uniformly to all members
    rate: f64,
    /// Maximum allowed divergence from the reference, in seconds
    tolerance: f64,
    /// Minimum gap between corrective seeks of the same member
    resync_cooldown: Duration,
    /// Last corrective seek per member
    last_resync: HashMap<StreamId, Instant>,
}

fn role_rank(role: LaneRole) -> u8 {
    match role {
        LaneRole::Primary => 0,
        LaneRole::Opponent => 1,
    }
}

impl SyncGroup {
    /// Build a group from loaded handles
    ///
    /// Members are sorted into dispatch order here, once; every later
    /// operation iterates that stored order.
    pub fn new(
        mut members: Vec<StreamHandle>,
        rate: f64,
        tolerance: f64,
        resync_cooldown: Duration,
    ) -> Self {
        members.sort_by(|a, b| {
            role_rank(a.role())
                .cmp(&role_rank(b.role()))
                .then_with(|| a.id().cmp(b.id()))
        });
        Self {
            members,
            playing: false,
            rate,
            tolerance,
            resync_cooldown,
            last_resync: HashMap::new(),
        }
    }

    pub fn playing(&self) -> bool {
        self.playing
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn members(&self) -> &[StreamHandle] {
        &self.members
    }

    /// Position of the reference (primary) member
    pub fn primary_position(&self) -> Option<f64> {
        self.members.first().map(|m| m.position())
    }

    /// Current positions of all members, keyed by id
    pub fn positions(&self) -> BTreeMap<StreamId, f64> {
        self.members
            .iter()
            .map(|m| (m.id().clone(), m.position()))
            .collect()
    }

    /// Apply a play/pause intent to every member
    ///
    /// Starting playback fails closed: if any member refuses to play, all
    /// members are paused again and the offending member is reported, so
    /// the group never sits half-playing.
    pub async fn set_playing(&mut self, playing: bool) -> Result<(), PlaybackError> {
        if playing {
            for index in 0..self.members.len() {
                if let Err(err) = self.members[index].play().await {
                    let failed_id = self.members[index].id().clone();
                    warn!("stream {} refused to play, pausing group: {}", failed_id, err);
                    self.pause_all().await;
                    self.playing = false;
                    return Err(PlaybackError::Member {
                        id: failed_id,
                        source: Box::new(err),
                    });
                }
            }
            self.playing = true;
            Ok(())
        } else {
            let first_failure = self.pause_all().await;
            self.playing = false;
            match first_failure {
                Some((id, err)) => Err(PlaybackError::Member {
                    id,
                    source: Box::new(err),
                }),
                None => Ok(()),
            }
        }
    }

    /// Pause every member, continuing past failures
    async fn pause_all(&mut self) -> Option<(StreamId, PlaybackError)> {
        let mut first_failure = None;
        for member in &mut self.members {
            if let Err(err) = member.pause().await {
                warn!("stream {} failed to pause: {}", member.id(), err);
                if first_failure.is_none() {
                    first_failure = Some((member.id().clone(), err));
                }
            }
        }
        first_failure
    }

    /// Seek every member to the same target
    ///
    /// The authoritative way to realign the group: every member is
    /// attempted even if an earlier one fails, and drift tracking is reset
    /// so corrections start fresh from the new position.
    pub async fn seek_all(&mut self, seconds: f64) -> Result<(), SeekError> {
        let mut first_failure = None;
        for member in &mut self.members {
            if let Err(err) = member.seek(seconds).await {
                warn!("stream {} failed to seek to {}s: {}", member.id(), seconds, err);
                if first_failure.is_none() {
                    first_failure = Some(SeekError::Member {
                        id: member.id().clone(),
                        source: Box::new(err),
                    });
                }
            }
        }
        self.last_resync.clear();

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Apply a rate to every member, all-or-nothing
    ///
    /// If any member rejects the multiplier, members already switched are
    /// reverted to the previous rate before the rejection is surfaced.
    pub async fn set_rate(&mut self, multiplier: f64) -> Result<(), RateError> {
        let previous = self.rate;
        for index in 0..self.members.len() {
            if self.members[index].set_rate(multiplier).await.is_err() {
                let failed_id = self.members[index].id().clone();
                warn!(
                    "stream {} rejected rate {}x, reverting group to {}x",
                    failed_id, multiplier, previous
                );
                for member in &mut self.members[..index] {
                    if let Err(err) = member.set_rate(previous).await {
                        warn!("stream {} failed to revert rate: {}", member.id(), err);
                    }
                }
                return Err(RateError::Member {
                    id: failed_id,
                    multiplier,
                });
            }
        }
        self.rate = multiplier;
        Ok(())
    }

    /// Compare every member against the primary member's clock
    ///
    /// Pure query: no timers, no side effects. The caller decides the
    /// cadence and whether to follow up with a resync.
    pub fn check_drift(&self) -> Option<DriftReport> {
        let reference = self.primary_position()?;

        let drifted: Vec<DriftEntry> = self.members[1..]
            .iter()
            .filter_map(|member| {
                let position = member.position();
                let delta = position - reference;
                (delta.abs() > self.tolerance).then(|| DriftEntry {
                    id: member.id().clone(),
                    position,
                    delta,
                })
            })
            .collect();

        if drifted.is_empty() {
            None
        } else {
            Some(DriftReport { reference, drifted })
        }
    }

    /// Seek drifted members back to the reference position
    ///
    /// Members corrected recently are skipped until the cooldown expires,
    /// so a jittery backend does not trigger a seek storm. Failed seeks are
    /// reported in the outcome and retried on a later check.
    pub async fn resync(&mut self, report: &DriftReport, now: Instant) -> ResyncOutcome {
        let mut outcome = ResyncOutcome::default();

        for entry in &report.drifted {
            let cooling = self
                .last_resync
                .get(&entry.id)
                .is_some_and(|last| now.duration_since(*last) < self.resync_cooldown);
            if cooling {
                outcome.in_cooldown.push(entry.id.clone());
                continue;
            }

            let Some(member) = self.members.iter_mut().find(|m| m.id() == &entry.id) else {
                continue;
            };
            match member.seek(report.reference).await {
                Ok(()) => {
                    debug!(
                        "resynced stream {} from {:.3}s to {:.3}s",
                        entry.id, entry.position, report.reference
                    );
                    self.last_resync.insert(entry.id.clone(), now);
                    outcome.corrected.push(entry.id.clone());
                }
                Err(err) => {
                    warn!("resync of stream {} failed: {}", entry.id, err);
                    outcome.failed.push((entry.id.clone(), err));
                }
            }
        }

        outcome
    }
}
