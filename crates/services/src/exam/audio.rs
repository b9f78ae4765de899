use std::time::Duration;

use tracing::{debug, warn};

use crate::config::ExamTimings;

const ONE_SECOND: Duration = Duration::from_secs(1);

/// Instruction for the host's media element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaCommand {
    Mute,
    Unmute,
    Play,
    SeekTo(f64),
    SetPlaybackRate(f64),
}

/// Transition requested once listening audio has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEvent {
    AdvanceGroup,
    PartComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AudioStatus {
    pub is_playing: bool,
    pub has_ended: bool,
    /// Visible countdown after the audio ends.
    pub countdown_seconds: u32,
}

/// Output of `AudioGuard::poll`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AudioPoll {
    pub commands: Vec<MediaCommand>,
    pub event: Option<AudioEvent>,
}

#[derive(Debug, Clone, PartialEq)]
struct AudioRules {
    countdown_secs: u32,
    advance_delay: Duration,
    seek_tolerance_secs: f64,
    seek_lock: Duration,
}

/// Playback rules for the audio of the current question group.
///
/// While restricted (listening part of a full exam) the clip plays once from
/// the start: pauses are undone, seeking snaps back, the rate stays at 1.0,
/// and when it ends the guard counts down and then requests the next group
/// or reports the part complete. The displayed countdown and the actual
/// advance delay are configured separately.
#[derive(Debug, Clone)]
pub struct AudioGuard {
    rules: AudioRules,
    restricted: bool,
    is_last_group: bool,
    status: AudioStatus,
    muted_for_autoplay: bool,
    last_known_time: f64,
    playback_rate: f64,
    seek_locked_until: Option<Duration>,
    next_countdown_step: Option<Duration>,
    advance_at: Option<Duration>,
}

impl AudioGuard {
    #[must_use]
    pub fn new(timings: &ExamTimings) -> Self {
        Self {
            rules: AudioRules {
                countdown_secs: timings.audio_countdown_secs,
                advance_delay: timings.audio_advance_delay,
                seek_tolerance_secs: timings.seek_tolerance_secs,
                seek_lock: timings.seek_lock,
            },
            restricted: false,
            is_last_group: false,
            status: AudioStatus::default(),
            muted_for_autoplay: false,
            last_known_time: 0.0,
            playback_rate: 1.0,
            seek_locked_until: None,
            next_countdown_step: None,
            advance_at: None,
        }
    }

    #[must_use]
    pub fn status(&self) -> AudioStatus {
        self.status
    }

    #[must_use]
    pub fn is_restricted(&self) -> bool {
        self.restricted
    }

    #[must_use]
    pub fn allows_seek(&self) -> bool {
        !self.restricted
    }

    #[must_use]
    pub fn is_seek_locked(&self, now: Duration) -> bool {
        self.seek_locked_until.is_some_and(|until| now < until)
    }

    #[must_use]
    pub fn last_known_time(&self) -> f64 {
        self.last_known_time
    }

    /// Cancel both post-playback timers and return to the initial status.
    pub fn reset(&mut self) {
        self.status = AudioStatus::default();
        self.muted_for_autoplay = false;
        self.last_known_time = 0.0;
        self.playback_rate = 1.0;
        self.seek_locked_until = None;
        self.next_countdown_step = None;
        self.advance_at = None;
    }

    /// A new group's audio was attached to the player.
    ///
    /// In restricted mode playback starts muted from zero so autoplay is
    /// permitted; `on_playing` unmutes.
    pub fn mount(&mut self, restricted: bool, is_last_group: bool) -> Vec<MediaCommand> {
        self.reset();
        self.restricted = restricted;
        self.is_last_group = is_last_group;
        if !restricted {
            return Vec::new();
        }
        self.muted_for_autoplay = true;
        vec![MediaCommand::Mute, MediaCommand::SeekTo(0.0), MediaCommand::Play]
    }

    pub fn on_playing(&mut self) -> Vec<MediaCommand> {
        self.status.is_playing = true;
        if self.muted_for_autoplay {
            self.muted_for_autoplay = false;
            return vec![MediaCommand::Unmute];
        }
        Vec::new()
    }

    /// The browser refused to autoplay. Not surfaced to the learner.
    pub fn on_autoplay_blocked(&mut self, reason: &str) {
        warn!(reason, "audio autoplay blocked");
    }

    /// `at_end` is true when the pause comes from the media reaching its end.
    pub fn on_pause(&mut self, at_end: bool) -> Vec<MediaCommand> {
        if self.restricted && !at_end && !self.status.has_ended {
            debug!("pause reverted");
            return vec![MediaCommand::Play];
        }
        self.status.is_playing = false;
        Vec::new()
    }

    pub fn on_rate_change(&mut self, rate: f64) -> Vec<MediaCommand> {
        self.playback_rate = rate;
        self.enforce_rate().into_iter().collect()
    }

    pub fn on_time_update(&mut self, current_time: f64, now: Duration) {
        if !self.is_seek_locked(now) {
            self.last_known_time = current_time;
        }
    }

    pub fn on_seeking(&mut self, target: f64, now: Duration) -> Vec<MediaCommand> {
        if self.allows_seek() {
            self.last_known_time = target;
            return Vec::new();
        }
        if self.is_seek_locked(now) {
            return Vec::new();
        }
        if (target - self.last_known_time).abs() > self.rules.seek_tolerance_secs {
            debug!(target, last = self.last_known_time, "seek reverted");
            self.seek_locked_until = Some(now + self.rules.seek_lock);
            return vec![MediaCommand::SeekTo(self.last_known_time)];
        }
        Vec::new()
    }

    /// The media reached its natural end.
    pub fn on_ended(&mut self, now: Duration) {
        self.status.is_playing = false;
        self.status.has_ended = true;
        if !self.restricted {
            return;
        }
        self.status.countdown_seconds = self.rules.countdown_secs;
        self.next_countdown_step = (self.rules.countdown_secs > 0).then_some(now + ONE_SECOND);
        self.advance_at = Some(now + self.rules.advance_delay);
    }

    /// Advance the countdown, enforce the playback rate and fire the advance
    /// deadline.
    pub fn poll(&mut self, now: Duration) -> AudioPoll {
        let mut out = AudioPoll::default();

        if self.seek_locked_until.is_some_and(|until| now >= until) {
            self.seek_locked_until = None;
        }
        out.commands.extend(self.enforce_rate());

        while let Some(step) = self.next_countdown_step {
            if now < step {
                break;
            }
            self.status.countdown_seconds = self.status.countdown_seconds.saturating_sub(1);
            self.next_countdown_step =
                (self.status.countdown_seconds > 0).then_some(step + ONE_SECOND);
        }

        if self.advance_at.is_some_and(|at| now >= at) {
            self.advance_at = None;
            out.event = Some(if self.is_last_group {
                AudioEvent::PartComplete
            } else {
                AudioEvent::AdvanceGroup
            });
        }
        out
    }

    fn enforce_rate(&self) -> Option<MediaCommand> {
        #[allow(clippy::float_cmp)]
        let off_rate = self.playback_rate != 1.0;
        (self.restricted && off_rate).then_some(MediaCommand::SetPlaybackRate(1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    fn restricted(last: bool) -> AudioGuard {
        let mut guard = AudioGuard::new(&ExamTimings::default());
        guard.mount(true, last);
        guard.on_playing();
        guard
    }

    #[test]
    fn mount_mutes_and_autoplays_then_unmutes() {
        let mut guard = AudioGuard::new(&ExamTimings::default());
        assert_eq!(
            guard.mount(true, false),
            vec![MediaCommand::Mute, MediaCommand::SeekTo(0.0), MediaCommand::Play]
        );
        assert_eq!(guard.on_playing(), vec![MediaCommand::Unmute]);
        assert!(guard.status().is_playing);
        assert!(guard.on_playing().is_empty());
    }

    #[test]
    fn unrestricted_audio_is_left_alone() {
        let mut guard = AudioGuard::new(&ExamTimings::default());
        assert!(guard.mount(false, false).is_empty());
        assert!(guard.on_pause(false).is_empty());
        assert!(guard.on_rate_change(1.5).is_empty());
        assert!(guard.on_seeking(40.0, Duration::ZERO).is_empty());
        guard.on_ended(Duration::ZERO);
        assert_eq!(guard.poll(Duration::from_secs(10)).event, None);
    }

    #[test]
    fn pause_is_reverted_while_restricted() {
        let mut guard = restricted(false);
        assert_eq!(guard.on_pause(false), vec![MediaCommand::Play]);
        assert!(guard.status().is_playing);
        assert!(guard.on_pause(true).is_empty());
    }

    #[test]
    fn playback_rate_is_forced_on_every_poll() {
        let mut guard = restricted(false);
        assert_eq!(
            guard.on_rate_change(2.0),
            vec![MediaCommand::SetPlaybackRate(1.0)]
        );
        assert_eq!(
            guard.poll(100 * MS).commands,
            vec![MediaCommand::SetPlaybackRate(1.0)]
        );
        guard.on_rate_change(1.0);
        assert!(guard.poll(200 * MS).commands.is_empty());
    }

    #[test]
    fn seeking_forward_snaps_back_and_locks() {
        let mut guard = restricted(false);
        let t0 = Duration::from_secs(10);
        guard.on_time_update(12.0, t0);

        assert_eq!(guard.on_seeking(14.0, t0), vec![MediaCommand::SeekTo(12.0)]);
        assert!(guard.is_seek_locked(t0 + 299 * MS));
        assert!(guard.on_seeking(20.0, t0 + 100 * MS).is_empty());
        guard.on_time_update(14.0, t0 + 150 * MS);
        assert_eq!(guard.last_known_time(), 12.0);

        assert!(!guard.is_seek_locked(t0 + 300 * MS));
        guard.poll(t0 + 300 * MS);
        assert_eq!(guard.on_seeking(12.3, t0 + 310 * MS), Vec::new());
    }

    #[test]
    fn countdown_and_advance_are_independent() {
        let mut guard = restricted(false);
        let end = Duration::from_secs(30);
        guard.on_ended(end);
        assert_eq!(guard.status().countdown_seconds, 3);
        assert!(guard.status().has_ended);

        assert_eq!(guard.poll(end + Duration::from_secs(1)).event, None);
        assert_eq!(guard.status().countdown_seconds, 2);
        assert_eq!(guard.poll(end + Duration::from_secs(3)).event, None);
        assert_eq!(guard.status().countdown_seconds, 0);
        assert_eq!(guard.poll(end + 4_999 * MS).event, None);
        assert_eq!(
            guard.poll(end + Duration::from_secs(5)).event,
            Some(AudioEvent::AdvanceGroup)
        );
        assert_eq!(guard.poll(end + Duration::from_secs(6)).event, None);
    }

    #[test]
    fn last_group_reports_part_complete() {
        let mut guard = restricted(true);
        let end = Duration::from_secs(42);
        guard.on_ended(end);
        assert_eq!(
            guard.poll(end + Duration::from_secs(5)).event,
            Some(AudioEvent::PartComplete)
        );
    }

    #[test]
    fn remount_cancels_pending_advance() {
        let mut guard = restricted(false);
        guard.on_ended(Duration::ZERO);
        guard.mount(true, false);
        assert_eq!(guard.status(), AudioStatus::default());
        assert_eq!(guard.poll(Duration::from_secs(10)).event, None);
    }
}
