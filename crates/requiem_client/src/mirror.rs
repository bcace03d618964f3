//! The client's view of its own death.
//!
//! The server only ever sends relative time. The mirror anchors it to the local
//! monotonic clock when the update arrives, so clock skew between the two
//! machines never matters.

use std::time::{Duration, Instant};

use requiem_protocol::packets::RespawnRequestC2s;
use tracing::debug;

use crate::settings::MirrorSettings;

/// What the death overlay should show this frame.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum MirrorView {
    /// Alive. No overlay.
    Hidden,
    /// Dead, but no deadline has arrived yet.
    Waiting,
    /// Whole seconds until respawning is allowed, rounded to nearest.
    Countdown { seconds_left: u64 },
    /// The countdown is over. Show the "press key to respawn" prompt.
    RespawnPrompt,
}

/// Outcome of pressing the respawn key.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum RespawnAttempt {
    /// Input capture is off, the character is alive, a menu is open or a
    /// request is already on its way.
    Ignored,
    /// The countdown is still running.
    TooEarly,
    /// The respawn sequence started. The caller should run a camera transition
    /// of this length. The request itself is emitted by
    /// [`CountdownMirror::poll`].
    Started { camera_switch: Duration },
}

#[derive(Clone, Debug)]
pub struct CountdownMirror {
    settings: MirrorSettings,
    is_dead: bool,
    deadline: Option<Instant>,
    input_enabled: bool,
    /// When the pending respawn request should be sent.
    pending: Option<Instant>,
    /// When input comes back after a request went unanswered.
    rearm_at: Option<Instant>,
}

impl CountdownMirror {
    pub fn new(settings: MirrorSettings) -> Self {
        Self {
            settings,
            is_dead: false,
            deadline: None,
            input_enabled: false,
            pending: None,
            rearm_at: None,
        }
    }

    pub fn settings(&self) -> &MirrorSettings {
        &self.settings
    }

    pub fn is_dead(&self) -> bool {
        self.is_dead
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Applies the server's `is_dead` flag.
    ///
    /// Becoming dead enables input capture. Becoming alive hides the overlay
    /// and drops any pending request.
    pub fn set_dead(&mut self, is_dead: bool) {
        if is_dead == self.is_dead {
            return;
        }

        self.is_dead = is_dead;

        if is_dead {
            self.input_enabled = true;
        } else {
            self.deadline = None;
            self.input_enabled = false;
            self.pending = None;
            self.rearm_at = None;
        }
    }

    /// Re-anchors a deadline update received at `received_at`.
    ///
    /// Zero or negative values mean respawning is already allowed.
    pub fn apply_deadline(&mut self, ms_remaining: i64, received_at: Instant) {
        let offset = Duration::from_millis(ms_remaining.unsigned_abs());

        let deadline = if ms_remaining >= 0 {
            received_at + offset
        } else {
            received_at.checked_sub(offset).unwrap_or(received_at)
        };

        self.deadline = Some(deadline);
        self.rearm_at = None;

        // A fresh deadline means the server has not respawned us. Allow another
        // attempt unless one is already in flight.
        if self.is_dead && self.pending.is_none() {
            self.input_enabled = true;
        }
    }

    /// Signed milliseconds until respawning is allowed, if a deadline is known.
    pub fn remaining_ms(&self, now: Instant) -> Option<i64> {
        let deadline = self.deadline?;

        Some(match deadline.checked_duration_since(now) {
            Some(ahead) => i64::try_from(ahead.as_millis()).unwrap_or(i64::MAX),
            None => -i64::try_from((now - deadline).as_millis()).unwrap_or(i64::MAX),
        })
    }

    pub fn view(&self, now: Instant) -> MirrorView {
        if !self.is_dead {
            return MirrorView::Hidden;
        }

        match self.remaining_ms(now) {
            None => MirrorView::Waiting,
            Some(ms) if ms > 0 => MirrorView::Countdown {
                seconds_left: (ms.unsigned_abs() + 500) / 1000,
            },
            Some(_) => MirrorView::RespawnPrompt,
        }
    }

    pub fn press_respawn_key(&mut self, now: Instant, menu_open: bool) -> RespawnAttempt {
        self.rearm_if_due(now);

        if !self.is_dead || !self.input_enabled || self.pending.is_some() {
            return RespawnAttempt::Ignored;
        }

        match self.remaining_ms(now) {
            None => return RespawnAttempt::Ignored,
            Some(ms) if ms > 0 => return RespawnAttempt::TooEarly,
            Some(_) => {}
        }

        if menu_open {
            debug!("respawn key pressed while a menu is open");
            return RespawnAttempt::Ignored;
        }

        self.input_enabled = false;
        self.pending = Some(now + self.settings.request_delay());

        RespawnAttempt::Started {
            camera_switch: self.settings.camera_switch(),
        }
    }

    /// Advances the pending respawn sequence. Returns the request once it is
    /// due.
    pub fn poll(&mut self, now: Instant) -> Option<RespawnRequestC2s> {
        self.rearm_if_due(now);

        if self.settings.auto_respawn && self.pending.is_none() {
            self.press_respawn_key(now, false);
        }

        let send_at = self.pending?;

        if now < send_at {
            return None;
        }

        self.pending = None;
        self.rearm_at = Some(now + self.settings.retry_cooldown());
        debug!("sending respawn request");

        Some(RespawnRequestC2s)
    }

    /// Drops a pending request, e.g. on disconnect. Input stays disabled until
    /// the server speaks again.
    pub fn cancel_pending(&mut self) {
        self.pending = None;
        self.rearm_at = None;
    }

    /// A sent request that was lost never gets an answer. Once the cooldown
    /// passes and we are still dead, allow another attempt.
    fn rearm_if_due(&mut self, now: Instant) {
        let Some(rearm_at) = self.rearm_at else {
            return;
        };

        if now < rearm_at {
            return;
        }

        self.rearm_at = None;

        if self.is_dead && self.pending.is_none() {
            debug!("no answer to respawn request, re-enabling input");
            self.input_enabled = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dead_mirror(settings: MirrorSettings) -> CountdownMirror {
        let mut mirror = CountdownMirror::new(settings);
        mirror.set_dead(true);
        mirror
    }

    #[test]
    fn deadline_is_anchored_to_receipt() {
        let received_at = Instant::now();
        let mut mirror = dead_mirror(MirrorSettings::default());

        mirror.apply_deadline(3000, received_at);

        assert_eq!(mirror.remaining_ms(received_at), Some(3000));
        assert_eq!(
            mirror.remaining_ms(received_at + Duration::from_millis(1000)),
            Some(2000)
        );
    }

    #[test]
    fn countdown_then_prompt() {
        let t0 = Instant::now();
        let mut mirror = dead_mirror(MirrorSettings::default());

        assert_eq!(mirror.view(t0), MirrorView::Waiting);

        mirror.apply_deadline(6000, t0);

        assert_eq!(
            mirror.view(t0),
            MirrorView::Countdown { seconds_left: 6 }
        );
        assert_eq!(
            mirror.view(t0 + Duration::from_millis(4400)),
            MirrorView::Countdown { seconds_left: 2 }
        );
        assert_eq!(
            mirror.view(t0 + Duration::from_millis(6000)),
            MirrorView::RespawnPrompt
        );
    }

    #[test]
    fn negative_remaining_allows_respawn_immediately() {
        let t0 = Instant::now();
        let mut mirror = dead_mirror(MirrorSettings::default());

        mirror.apply_deadline(-250, t0);

        assert_eq!(mirror.view(t0), MirrorView::RespawnPrompt);
        assert!(matches!(
            mirror.press_respawn_key(t0, false),
            RespawnAttempt::Started { .. }
        ));
    }

    #[test]
    fn key_sequence_sends_once() {
        let t0 = Instant::now();
        let mut mirror = dead_mirror(MirrorSettings::default());
        mirror.apply_deadline(1000, t0);

        assert_eq!(mirror.press_respawn_key(t0, false), RespawnAttempt::TooEarly);

        let t1 = t0 + Duration::from_millis(1000);
        assert_eq!(
            mirror.press_respawn_key(t1, false),
            RespawnAttempt::Started {
                camera_switch: Duration::from_millis(2000)
            }
        );
        assert!(!mirror.input_enabled());

        // Pressing again mid-sequence does nothing.
        assert_eq!(mirror.press_respawn_key(t1, false), RespawnAttempt::Ignored);

        assert_eq!(mirror.poll(t1 + Duration::from_millis(999)), None);
        assert_eq!(
            mirror.poll(t1 + Duration::from_millis(1000)),
            Some(RespawnRequestC2s)
        );
        assert_eq!(mirror.poll(t1 + Duration::from_millis(5000)), None);
    }

    #[test]
    fn open_menu_blocks_the_key() {
        let t0 = Instant::now();
        let mut mirror = dead_mirror(MirrorSettings::default());
        mirror.apply_deadline(0, t0);

        assert_eq!(mirror.press_respawn_key(t0, true), RespawnAttempt::Ignored);
        assert!(mirror.input_enabled());
    }

    #[test]
    fn alive_mirror_ignores_everything() {
        let t0 = Instant::now();
        let mut mirror = CountdownMirror::new(MirrorSettings::default());
        mirror.apply_deadline(0, t0);

        assert_eq!(mirror.view(t0), MirrorView::Hidden);
        assert_eq!(mirror.press_respawn_key(t0, false), RespawnAttempt::Ignored);
        assert_eq!(mirror.poll(t0), None);
    }

    #[test]
    fn respawn_clears_pending_request() {
        let t0 = Instant::now();
        let mut mirror = dead_mirror(MirrorSettings::default());
        mirror.apply_deadline(0, t0);
        mirror.press_respawn_key(t0, false);

        mirror.set_dead(false);

        assert!(!mirror.is_pending());
        assert_eq!(mirror.poll(t0 + Duration::from_secs(5)), None);
    }

    #[test]
    fn cancel_pending_on_disconnect() {
        let t0 = Instant::now();
        let mut mirror = dead_mirror(MirrorSettings::default());
        mirror.apply_deadline(0, t0);
        mirror.press_respawn_key(t0, false);

        mirror.cancel_pending();

        assert_eq!(mirror.poll(t0 + Duration::from_secs(5)), None);
        assert!(!mirror.input_enabled());

        // The server re-sending the deadline re-arms the key.
        mirror.apply_deadline(0, t0);
        assert!(mirror.input_enabled());
    }

    #[test]
    fn lost_request_rearms_the_key_after_cooldown() {
        let t0 = Instant::now();
        let mut mirror = dead_mirror(MirrorSettings::default());
        mirror.apply_deadline(0, t0);

        mirror.press_respawn_key(t0, false);
        let sent_at = t0 + Duration::from_millis(1000);
        assert_eq!(mirror.poll(sent_at), Some(RespawnRequestC2s));

        // The request never arrives and the server stays silent.
        assert_eq!(
            mirror.press_respawn_key(sent_at + Duration::from_millis(4999), false),
            RespawnAttempt::Ignored
        );

        let retry_at = sent_at + Duration::from_millis(5000);
        assert!(matches!(
            mirror.press_respawn_key(retry_at, false),
            RespawnAttempt::Started { .. }
        ));
        assert_eq!(
            mirror.poll(retry_at + Duration::from_millis(1000)),
            Some(RespawnRequestC2s)
        );
    }

    #[test]
    fn auto_respawn_retries_lost_request() {
        let t0 = Instant::now();
        let mut mirror = dead_mirror(MirrorSettings {
            auto_respawn: true,
            retry_cooldown_ms: 2000,
            ..Default::default()
        });
        mirror.apply_deadline(0, t0);

        assert_eq!(mirror.poll(t0), None);
        let sent_at = t0 + Duration::from_millis(1000);
        assert_eq!(mirror.poll(sent_at), Some(RespawnRequestC2s));

        assert_eq!(mirror.poll(sent_at + Duration::from_millis(1999)), None);
        assert!(!mirror.is_pending());

        let retry_at = sent_at + Duration::from_millis(2000);
        assert_eq!(mirror.poll(retry_at), None);
        assert!(mirror.is_pending());
        assert_eq!(
            mirror.poll(retry_at + Duration::from_millis(1000)),
            Some(RespawnRequestC2s)
        );
    }

    #[test]
    fn respawn_before_cooldown_keeps_input_off() {
        let t0 = Instant::now();
        let mut mirror = dead_mirror(MirrorSettings::default());
        mirror.apply_deadline(0, t0);
        mirror.press_respawn_key(t0, false);
        mirror.poll(t0 + Duration::from_millis(1000));

        mirror.set_dead(false);

        assert_eq!(mirror.poll(t0 + Duration::from_secs(10)), None);
        assert!(!mirror.input_enabled());
    }

    #[test]
    fn auto_respawn_starts_by_itself() {
        let t0 = Instant::now();
        let mut mirror = dead_mirror(MirrorSettings {
            auto_respawn: true,
            ..Default::default()
        });
        mirror.apply_deadline(500, t0);

        assert_eq!(mirror.poll(t0), None);
        assert!(!mirror.is_pending());

        let t1 = t0 + Duration::from_millis(500);
        assert_eq!(mirror.poll(t1), None);
        assert!(mirror.is_pending());

        assert_eq!(
            mirror.poll(t1 + Duration::from_millis(1000)),
            Some(RespawnRequestC2s)
        );
    }
}
