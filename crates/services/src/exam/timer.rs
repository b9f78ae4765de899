use exam_core::model::{ExamMode, TimeParam, derive_total_seconds};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    TimeUp,
}

/// Countdown for one attempt, advanced once per wall-clock second.
///
/// A total of `0` means unlimited: nothing counts down and time never runs
/// out, but elapsed seconds are still tracked for the submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamTimer {
    initial_seconds: u32,
    remaining_seconds: u32,
    elapsed_seconds: u32,
    paused: bool,
    finished: bool,
}

impl ExamTimer {
    #[must_use]
    pub fn new(total_seconds: u32) -> Self {
        Self {
            initial_seconds: total_seconds,
            remaining_seconds: total_seconds,
            elapsed_seconds: 0,
            paused: false,
            finished: false,
        }
    }

    #[must_use]
    pub fn for_mode(mode: ExamMode, time: TimeParam) -> Self {
        Self::new(derive_total_seconds(mode, time))
    }

    #[must_use]
    pub fn initial_seconds(&self) -> u32 {
        self.initial_seconds
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    #[must_use]
    pub fn elapsed_seconds(&self) -> u32 {
        self.elapsed_seconds
    }

    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        self.initial_seconds == 0
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// One second of wall time. Returns `TimeUp` on the tick that reaches zero
    /// and never again.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        if self.paused || self.finished {
            return None;
        }
        self.elapsed_seconds = self.elapsed_seconds.saturating_add(1);
        if self.is_unlimited() {
            return None;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.finished = true;
            return Some(TimerEvent::TimeUp);
        }
        None
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Stop for good, e.g. once the attempt is submitted.
    pub fn finish(&mut self) {
        self.finished = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_exam_times_up_exactly_once_at_7200() {
        let mut timer = ExamTimer::for_mode(ExamMode::Full, TimeParam::Minutes(10));
        assert_eq!(timer.initial_seconds(), 7_200);

        for _ in 0..7_199 {
            assert_eq!(timer.tick(), None);
        }
        assert_eq!(timer.remaining_seconds(), 1);
        assert_eq!(timer.tick(), Some(TimerEvent::TimeUp));
        assert!(timer.is_finished());
        for _ in 0..10 {
            assert_eq!(timer.tick(), None);
        }
        assert_eq!(timer.elapsed_seconds(), 7_200);
    }

    #[test]
    fn pause_keeps_elapsed_time() {
        let mut timer = ExamTimer::new(60);
        for _ in 0..10 {
            timer.tick();
        }
        timer.pause();
        for _ in 0..30 {
            assert_eq!(timer.tick(), None);
        }
        assert_eq!(timer.remaining_seconds(), 50);
        timer.resume();
        timer.tick();
        assert_eq!(timer.remaining_seconds(), 49);
        assert_eq!(timer.elapsed_seconds(), 11);
    }

    #[test]
    fn unlimited_never_times_up() {
        let mut timer = ExamTimer::for_mode(ExamMode::Partial, TimeParam::Unlimited);
        assert!(timer.is_unlimited());
        for _ in 0..10_000 {
            assert_eq!(timer.tick(), None);
        }
        assert_eq!(timer.remaining_seconds(), 0);
        assert_eq!(timer.elapsed_seconds(), 10_000);
    }

    #[test]
    fn finished_timer_stops_counting() {
        let mut timer = ExamTimer::new(120);
        timer.tick();
        timer.finish();
        assert_eq!(timer.tick(), None);
        assert_eq!(timer.elapsed_seconds(), 1);
    }
}
