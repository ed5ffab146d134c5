use super::geometry::Point;

/// Dwell time over the overlay before it unlocks for dragging.
pub const HOVER_UNLOCK_DELAY_MS: u64 = 2_000;
/// Time away from overlay and close button before it locks again.
pub const AWAY_LOCK_DELAY_MS: u64 = 5_000;
/// Cadence of the interaction poll.
pub const POLL_INTERVAL_MS: u64 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionMode {
    /// Input passes through the overlay to whatever is underneath.
    ClickThrough,
    /// The overlay accepts mouse input and can be dragged.
    Interactive,
}

/// Cursor facts for one poll tick, gathered by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSignals {
    pub context_active: bool,
    pub over_overlay: bool,
    pub over_close_button: bool,
    pub primary_button_down: bool,
}

/// What the caller must do after a poll tick. Mode switches are reported
/// rather than applied because they fan out into window style changes,
/// cursor swaps and a re-render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollAction {
    None,
    /// Switch to [`InteractionMode::Interactive`].
    Unlock,
    /// Switch to [`InteractionMode::ClickThrough`].
    Lock,
    /// The primary button was released outside of a mouse-up message;
    /// the drag is over and the position should be saved.
    DragReleased,
}

/// Hover-timing state machine deciding when the overlay is draggable.
///
/// The overlay spends its life click-through. Dwelling on it for
/// [`HOVER_UNLOCK_DELAY_MS`] unlocks it; staying away from both it and
/// the close button for [`AWAY_LOCK_DELAY_MS`] locks it again. Timers
/// only run while a fullscreen context is active.
#[derive(Debug, Clone)]
pub struct InteractionState {
    mode: InteractionMode,
    hover_started_ms: Option<u64>,
    away_started_ms: Option<u64>,
    dragging: bool,
    drag_offset: Point,
}

impl Default for InteractionState {
    fn default() -> Self {
        Self {
            mode: InteractionMode::ClickThrough,
            hover_started_ms: None,
            away_started_ms: None,
            dragging: false,
            drag_offset: Point::default(),
        }
    }
}

impl InteractionState {
    pub fn poll(&mut self, now_ms: u64, signals: PollSignals) -> PollAction {
        if !signals.context_active {
            self.hover_started_ms = None;
            self.away_started_ms = None;
            if self.mode == InteractionMode::Interactive && !self.dragging {
                return PollAction::Lock;
            }
            return PollAction::None;
        }

        if self.dragging {
            // Mouse-up can bypass the overlay when capture is lost; the
            // poll notices the released button instead.
            if !signals.primary_button_down {
                self.dragging = false;
                return PollAction::DragReleased;
            }
            return PollAction::None;
        }

        if signals.over_overlay {
            self.away_started_ms = None;
            match self.hover_started_ms {
                None => {
                    self.hover_started_ms = Some(now_ms);
                }
                Some(start) => {
                    if self.mode == InteractionMode::ClickThrough
                        && now_ms.saturating_sub(start) >= HOVER_UNLOCK_DELAY_MS
                    {
                        return PollAction::Unlock;
                    }
                }
            }
            return PollAction::None;
        }

        self.hover_started_ms = None;
        if signals.over_close_button {
            self.away_started_ms = None;
            return PollAction::None;
        }
        if self.mode == InteractionMode::ClickThrough {
            self.away_started_ms = None;
            return PollAction::None;
        }
        match self.away_started_ms {
            None => {
                self.away_started_ms = Some(now_ms);
                PollAction::None
            }
            Some(start) if now_ms.saturating_sub(start) >= AWAY_LOCK_DELAY_MS => {
                self.away_started_ms = None;
                PollAction::Lock
            }
            Some(_) => PollAction::None,
        }
    }

    /// Record the applied mode. Returns false when nothing changed so
    /// callers can skip the style/render fan-out.
    pub fn set_mode(&mut self, mode: InteractionMode) -> bool {
        if self.mode == mode {
            return false;
        }
        self.mode = mode;
        self.away_started_ms = None;
        true
    }

    pub fn reset_timers(&mut self) {
        self.hover_started_ms = None;
        self.away_started_ms = None;
    }

    pub fn begin_drag(&mut self, offset: Point) {
        self.dragging = true;
        self.drag_offset = offset;
    }

    /// Returns whether a drag was actually in progress.
    pub fn end_drag(&mut self) -> bool {
        std::mem::replace(&mut self.dragging, false)
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn is_interactive(&self) -> bool {
        self.mode == InteractionMode::Interactive
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn drag_offset(&self) -> Point {
        self.drag_offset
    }
}
