//! Ties the overlay together: foreground context, visibility, the
//! hover/drag state machine, rendering, and settings changes all meet
//! here. Platform windows and monitors stay behind traits so the whole
//! flow runs in tests.

use crate::overlay::close_button::place_close_button;
use crate::overlay::compositor::{Compositor, FrameLayout, GlyphRasterizer, OverlayVisuals};
use crate::overlay::context::{ContextTracker, ForegroundProbe};
use crate::overlay::geometry::{clamp_to_bounds, preset_position, MonitorLayout, Point, Rect};
use crate::overlay::hook::SettleProbe;
use crate::overlay::interaction::{InteractionMode, InteractionState, PollAction, PollSignals};
use crate::overlay::visibility::{should_hide, HiddenInstanceSet};
use crate::overlay::window::{OverlayView, PointerEvent, SatelliteView};
use crate::sensors::{ReadingLines, TemperatureSnapshot};
use crate::settings::OverlaySettings;

/// Requests arriving from outside the overlay loop, such as the tray
/// menu or the settings dialog.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// A settings session opened; hide logic is suspended until
    /// [`ControllerEvent::PreviewEnded`].
    OpenSettingsRequested,
    /// Transient settings to show while the dialog is still open.
    SettingsPreviewed(OverlaySettings),
    /// Settings confirmed; applied and persisted.
    SettingsApplied(OverlaySettings),
    /// The settings session closed. `restore` carries the pre-session
    /// snapshot when the session was cancelled.
    PreviewEnded { restore: Option<OverlaySettings> },
    /// Quit the whole application.
    CloseRequested,
}

pub struct OverlayController<V, S, R> {
    settings: OverlaySettings,
    /// Where settings are persisted; `None` disables saving.
    settings_path: Option<String>,
    previewing: bool,
    context: ContextTracker,
    interaction: InteractionState,
    hidden: HiddenInstanceSet,
    compositor: Compositor<R>,
    visuals: OverlayVisuals,
    lines: ReadingLines,
    layout: FrameLayout,
    position: Point,
    visible: bool,
    close_button_rect: Option<Rect>,
    settle: SettleProbe,
    monitors: Box<dyn MonitorLayout>,
    // Declared before the overlay so teardown removes the satellite first.
    close_button: S,
    overlay: V,
    exit_requested: bool,
}

impl<V, S, R> OverlayController<V, S, R>
where
    V: OverlayView,
    S: SatelliteView,
    R: GlyphRasterizer,
{
    pub fn new(
        settings: OverlaySettings,
        settings_path: Option<String>,
        overlay: V,
        close_button: S,
        monitors: Box<dyn MonitorLayout>,
        rasterizer: R,
    ) -> Self {
        let mut compositor = Compositor::new(rasterizer);
        let visuals = compositor.visuals_for(&settings);
        Self {
            settings,
            settings_path,
            previewing: false,
            context: ContextTracker::default(),
            interaction: InteractionState::default(),
            hidden: HiddenInstanceSet::default(),
            compositor,
            visuals,
            lines: ReadingLines::default(),
            layout: FrameLayout::default(),
            position: Point::new(0, 0),
            visible: false,
            close_button_rect: None,
            settle: SettleProbe::default(),
            monitors,
            close_button,
            overlay,
            exit_requested: false,
        }
    }

    /// First readings, placement and paint, before the timers start.
    pub fn startup(&mut self, probe: &ForegroundProbe, snapshot: &TemperatureSnapshot) {
        self.visible = true;
        self.overlay.show();
        self.on_sensor_tick(probe, snapshot);
    }

    /// Sensor cadence: refresh the context, rebuild the reading lines
    /// and redraw. While interactive the text block keeps its anchor so
    /// a re-layout does not yank the overlay out from under the cursor.
    pub fn on_sensor_tick(&mut self, probe: &ForegroundProbe, snapshot: &TemperatureSnapshot) {
        self.refresh_context(probe);
        self.lines = ReadingLines::from_snapshot(snapshot);

        let preserve_anchor = self.interaction.is_interactive();
        let anchor = Point::new(
            self.position.x + self.layout.text_origin.x,
            self.position.y + self.layout.text_origin.y,
        );
        self.layout = self.compositor.layout(&self.lines, &self.visuals);
        if preserve_anchor {
            self.position = Point::new(
                anchor.x - self.layout.text_origin.x,
                anchor.y - self.layout.text_origin.y,
            );
        } else {
            self.reposition_for_context();
        }
        self.ensure_topmost();
        self.render();
    }

    /// Interaction cadence: context-driven visibility plus the
    /// hover-to-unlock and away-to-lock timers.
    pub fn on_interaction_tick(
        &mut self,
        now_ms: u64,
        probe: &ForegroundProbe,
        cursor: Point,
        primary_down: bool,
    ) {
        if self.previewing {
            return;
        }
        self.refresh_context(probe);
        self.update_context_visibility();
        if !self.visible {
            return;
        }

        let over_overlay = self.overlay_rect().contains(cursor);
        let over_close_button = self
            .close_button_rect
            .map_or(false, |rect| rect.contains(cursor));
        let action = self.interaction.poll(
            now_ms,
            PollSignals {
                context_active: self.context.is_active(),
                over_overlay,
                over_close_button,
                primary_button_down: primary_down,
            },
        );
        match action {
            PollAction::Unlock => self.set_interaction_mode(true),
            PollAction::Lock => self.set_interaction_mode(false),
            PollAction::DragReleased => self.save_position(),
            PollAction::None => {}
        }
    }

    /// Foreground changed: hide immediately, re-evaluate, then keep
    /// probing on a short cadence while the new app settles.
    pub fn on_foreground_event(&mut self, now_ms: u64, probe: &ForegroundProbe) {
        if self.previewing {
            return;
        }
        self.hide_for_foreground_transition();
        self.handle_foreground_changed(probe);
        self.settle.start(now_ms);
    }

    /// Settle cadence, active only while a probe window is open.
    pub fn on_settle_tick(&mut self, now_ms: u64, probe: &ForegroundProbe) {
        if self.previewing {
            self.settle.cancel();
            return;
        }
        if self.settle.tick(now_ms) {
            self.handle_foreground_changed(probe);
        }
    }

    pub fn settle_probe_running(&self) -> bool {
        self.settle.is_running()
    }

    /// Pointer activity from the overlay window. Only meaningful while
    /// interactive in an active context; everything else is ignored.
    pub fn on_pointer(&mut self, event: PointerEvent) {
        if !self.interaction.is_interactive() || !self.context.is_active() {
            return;
        }
        match event {
            PointerEvent::LeftDown { cursor } => {
                self.interaction.begin_drag(Point::new(
                    cursor.x - self.position.x,
                    cursor.y - self.position.y,
                ));
            }
            PointerEvent::Move { cursor } => {
                if !self.interaction.is_dragging() {
                    return;
                }
                let offset = self.interaction.drag_offset();
                self.position = Point::new(cursor.x - offset.x, cursor.y - offset.y);
                self.clamp_to_context_monitor();
                let position = self.position;
                self.overlay.move_to(position);
                self.update_close_button();
            }
            PointerEvent::LeftUp { .. } => {
                if self.interaction.end_drag() {
                    self.save_position();
                    self.update_close_button();
                }
            }
        }
    }

    /// Drain window-side input and feed it through the handlers above.
    pub fn pump_input(&mut self) {
        for event in self.overlay.drain_pointer_events() {
            self.on_pointer(event);
        }
        if self.close_button.take_clicked() {
            self.on_close_clicked();
        }
    }

    /// Close button clicked: dismiss the overlay for this app instance
    /// until the app relaunches.
    pub fn on_close_clicked(&mut self) {
        if !self.context.is_active() || self.context.instance_id().trim().is_empty() {
            return;
        }
        let instance = self.context.instance_id().to_string();
        self.hidden.insert(&instance);
        self.interaction.reset_timers();
        self.set_interaction_mode(false);
        if self.visible {
            self.visible = false;
            self.overlay.hide();
        }
        self.hide_close_button();
    }

    pub fn on_event(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::OpenSettingsRequested => {
                self.previewing = true;
                self.update_context_visibility();
                self.ensure_topmost();
                self.render();
            }
            ControllerEvent::SettingsPreviewed(settings) => {
                self.apply_settings(settings, false);
            }
            ControllerEvent::SettingsApplied(settings) => {
                self.apply_settings(settings, true);
            }
            ControllerEvent::PreviewEnded { restore } => {
                if let Some(settings) = restore {
                    self.settings = settings;
                    self.visuals = self.compositor.visuals_for(&self.settings);
                    self.layout = self.compositor.layout(&self.lines, &self.visuals);
                    self.previewing = false;
                    self.update_context_visibility();
                    self.reposition_for_context();
                    self.ensure_topmost();
                    self.render();
                } else {
                    self.previewing = false;
                    self.update_context_visibility();
                }
            }
            ControllerEvent::CloseRequested => self.exit_requested = true,
        }
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    pub fn settings(&self) -> &OverlaySettings {
        &self.settings
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_interactive(&self) -> bool {
        self.interaction.is_interactive()
    }

    fn refresh_context(&mut self, probe: &ForegroundProbe) {
        let delta = self.context.refresh(probe);
        if delta.reset_needed && !self.interaction.is_dragging() {
            self.interaction.reset_timers();
            if self.interaction.is_interactive() {
                self.set_interaction_mode(false);
            }
        }
    }

    fn update_context_visibility(&mut self) {
        if should_hide(self.previewing, &self.context, &self.hidden) {
            if self.visible {
                self.interaction.reset_timers();
                self.set_interaction_mode(false);
                self.visible = false;
                self.overlay.hide();
                self.hide_close_button();
            }
            return;
        }
        if self.visible {
            return;
        }
        self.visible = true;
        self.overlay.show();
        self.reposition_for_context();
        self.render();
    }

    fn hide_for_foreground_transition(&mut self) {
        if self.interaction.is_dragging() {
            return;
        }
        self.interaction.reset_timers();
        if self.interaction.is_interactive() {
            self.set_interaction_mode(false);
        }
        if self.visible {
            self.visible = false;
            self.overlay.hide();
        }
        self.hide_close_button();
    }

    fn handle_foreground_changed(&mut self, probe: &ForegroundProbe) {
        self.refresh_context(probe);
        self.update_context_visibility();
        if !self.visible || self.interaction.is_dragging() || self.interaction.is_interactive() {
            return;
        }
        self.reposition_for_context();
        self.ensure_topmost();
        self.render();
    }

    fn apply_settings(&mut self, settings: OverlaySettings, persist: bool) {
        self.settings = settings;
        self.settings.normalize();
        if persist {
            self.save_settings();
        }
        self.visuals = self.compositor.visuals_for(&self.settings);
        self.layout = self.compositor.layout(&self.lines, &self.visuals);
        self.reposition_for_context();
        self.ensure_topmost();
        self.render();
    }

    fn set_interaction_mode(&mut self, enabled: bool) {
        let mode = if enabled {
            InteractionMode::Interactive
        } else {
            InteractionMode::ClickThrough
        };
        if !self.interaction.set_mode(mode) {
            return;
        }
        self.overlay.set_input_transparent(!enabled);
        self.overlay.set_move_cursor(enabled);
        self.render();
    }

    /// Saved per-app position when one exists for the active context,
    /// otherwise the preset corner of the primary monitor. Previews
    /// always use the preset so dialog changes are visible immediately.
    fn reposition_for_context(&mut self) {
        if !self.previewing && self.context.is_active() && !self.context.app_key().is_empty() {
            if let Some(&(x, y)) = self
                .settings
                .fullscreen_app_positions
                .get(self.context.app_key())
            {
                self.position = Point::new(x, y);
                self.clamp_to_context_monitor();
                return;
            }
        }
        self.position = preset_position(
            self.settings.position,
            self.layout.size,
            self.monitors.primary(),
            self.settings.horizontal_padding,
            self.settings.vertical_padding,
        );
    }

    fn clamp_to_context_monitor(&mut self) {
        let mut bounds = self.context.monitor_bounds();
        if bounds.is_empty() {
            bounds = self.monitors.primary();
        }
        self.position = clamp_to_bounds(self.position, self.layout.size, bounds);
    }

    fn ensure_topmost(&mut self) {
        if self.previewing {
            return;
        }
        self.overlay.ensure_topmost();
        self.close_button.ensure_topmost();
    }

    fn render(&mut self) {
        if let Some(frame) = self
            .compositor
            .compose(&self.layout, self.interaction.is_interactive())
        {
            let rect = self.overlay_rect();
            self.overlay.set_frame(&frame, rect);
        }
        self.update_close_button();
    }

    fn overlay_rect(&self) -> Rect {
        Rect::from_point_size(self.position, self.layout.size)
    }

    fn update_close_button(&mut self) {
        if !self.interaction.is_interactive() || !self.context.is_active() || !self.visible {
            self.hide_close_button();
            return;
        }
        let overlay_rect = self.overlay_rect();
        let mut screen = self.monitors.containing(overlay_rect);
        if screen.is_empty() {
            screen = self.monitors.primary();
        }
        let rect = place_close_button(overlay_rect, screen);
        self.close_button_rect = Some(rect);
        self.close_button.show_at(rect);
    }

    fn hide_close_button(&mut self) {
        self.close_button_rect = None;
        self.close_button.hide();
    }

    fn save_position(&mut self) {
        if !self.context.is_active() {
            return;
        }
        let app_key = self.context.app_key().trim();
        if app_key.is_empty() {
            return;
        }
        let app_key = app_key.to_string();
        self.settings
            .fullscreen_app_positions
            .insert(app_key, (self.position.x, self.position.y));
        self.save_settings();
    }

    fn save_settings(&mut self) {
        if let Some(path) = self.settings_path.as_deref() {
            if let Err(error) = self.settings.save(path) {
                tracing::warn!(%error, "settings save failed");
            }
        }
    }
}
