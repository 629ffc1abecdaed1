//! # Input Fusion
//!
//! Keys and pointer contacts in, one [`CommandVector`] per tick out.
//!
//! ## Mapping
//!
//! ```text
//! SOURCE                         OUTPUT
//! Left / Right / Up / Down   →   rotate_left / rotate_right / zoom_in / zoom_out   (level)
//! Space (key-down)           →   check_alignment                                   (edge)
//! one contact, dx > +dz      →   rotate_right                                      (level)
//! one contact, dx < -dz      →   rotate_left                                       (level)
//! two contacts, spread > +dz →   zoom_in                                           (level)
//! two contacts, spread < -dz →   zoom_out                                          (level)
//! short, still release       →   check_alignment                                   (edge)
//! ```
//!
//! Levels are the OR of both sources. An edge latched by either source is
//! emitted by the next [`InputFusion::fuse`] and then dropped, whether or
//! not the output was gated.

use serde::Deserialize;
use tether_protocol::CommandVector;
use tether_shared::constants::{
    PINCH_DEAD_ZONE_PX, SWIPE_DEAD_ZONE_PX, TAP_MAX_DISTANCE_PX, TAP_MAX_DURATION_SECS,
};

/// Gesture thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Horizontal travel before a swipe counts (pixels).
    pub swipe_dead_zone_px: f32,
    /// Change in contact spread before a pinch counts (pixels).
    pub pinch_dead_zone_px: f32,
    /// Maximum travel of a tap (pixels).
    pub tap_max_distance_px: f32,
    /// Maximum duration of a tap (seconds).
    pub tap_max_duration_secs: f32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            swipe_dead_zone_px: SWIPE_DEAD_ZONE_PX,
            pinch_dead_zone_px: PINCH_DEAD_ZONE_PX,
            tap_max_distance_px: TAP_MAX_DISTANCE_PX,
            tap_max_duration_secs: TAP_MAX_DURATION_SECS,
        }
    }
}

// =============================================================================
// KEYBOARD
// =============================================================================

/// Keys the controller reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Arrow left.
    Left,
    /// Arrow right.
    Right,
    /// Arrow up.
    Up,
    /// Arrow down.
    Down,
    /// Space bar, the edge key.
    Space,
}

/// Held keys and the latched edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyboardState {
    left: bool,
    right: bool,
    up: bool,
    down: bool,
    space_held: bool,
    edge_latched: bool,
}

impl KeyboardState {
    /// Records a key press. Auto-repeat of a held Space does not re-latch.
    pub fn key_down(&mut self, key: Key) {
        match key {
            Key::Left => self.left = true,
            Key::Right => self.right = true,
            Key::Up => self.up = true,
            Key::Down => self.down = true,
            Key::Space => {
                if !self.space_held {
                    self.edge_latched = true;
                }
                self.space_held = true;
            }
        }
    }

    /// Records a key release.
    pub fn key_up(&mut self, key: Key) {
        match key {
            Key::Left => self.left = false,
            Key::Right => self.right = false,
            Key::Up => self.up = false,
            Key::Down => self.down = false,
            Key::Space => self.space_held = false,
        }
    }

    /// Returns true if the key is held.
    #[must_use]
    pub const fn is_held(&self, key: Key) -> bool {
        match key {
            Key::Left => self.left,
            Key::Right => self.right,
            Key::Up => self.up,
            Key::Down => self.down,
            Key::Space => self.space_held,
        }
    }

    fn levels(&self) -> CommandVector {
        CommandVector {
            rotate_left: self.left,
            rotate_right: self.right,
            zoom_in: self.up,
            zoom_out: self.down,
            ..CommandVector::NEUTRAL
        }
    }

    fn take_edge(&mut self) -> bool {
        std::mem::take(&mut self.edge_latched)
    }

    /// Releases every key and drops the latched edge.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

// =============================================================================
// POINTER
// =============================================================================

/// Screen position in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    /// Horizontal position.
    pub x: f32,
    /// Vertical position.
    pub y: f32,
}

impl Point {
    /// Creates a point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy)]
struct Contact {
    id: u64,
    start: Point,
    current: Point,
    started_at: f32,
}

impl Contact {
    const fn new(id: u64, pos: Point, t: f32) -> Self {
        Self {
            id,
            start: pos,
            current: pos,
            started_at: t,
        }
    }
}

/// Tracks up to two contacts and classifies swipe, pinch and tap.
#[derive(Debug, Clone, Default)]
pub struct PointerTracker {
    config: InputConfig,
    primary: Option<Contact>,
    secondary: Option<Contact>,
    pinch_start_distance: Option<f32>,
    /// A second contact joined during the primary's life; no tap.
    multi_touch: bool,
    tap_latched: bool,
}

impl PointerTracker {
    /// Creates a tracker with the given thresholds.
    #[must_use]
    pub fn new(config: InputConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// A contact went down.
    pub fn touch_start(&mut self, id: u64, pos: Point, t: f32) {
        match (self.primary, self.secondary) {
            (None, _) => {
                self.primary = Some(Contact::new(id, pos, t));
                self.multi_touch = false;
            }
            (Some(primary), None) if primary.id != id => {
                self.secondary = Some(Contact::new(id, pos, t));
                self.pinch_start_distance = Some(primary.current.distance(pos));
                self.multi_touch = true;
            }
            // Third and later contacts are ignored.
            _ => {}
        }
    }

    /// A contact moved.
    pub fn touch_move(&mut self, id: u64, pos: Point, _t: f32) {
        for contact in [&mut self.primary, &mut self.secondary].into_iter().flatten() {
            if contact.id == id {
                contact.current = pos;
            }
        }
    }

    /// A contact lifted.
    pub fn touch_end(&mut self, id: u64, pos: Point, t: f32) {
        if self.secondary.is_some_and(|c| c.id == id) {
            self.secondary = None;
            self.pinch_start_distance = None;
            // The remaining contact swipes from where it is now.
            if let Some(primary) = self.primary.as_mut() {
                primary.start = primary.current;
            }
            return;
        }

        let Some(mut primary) = self.primary.filter(|c| c.id == id) else {
            return;
        };
        primary.current = pos;

        let duration = t - primary.started_at;
        let travel = primary.start.distance(primary.current);
        if !self.multi_touch
            && duration <= self.config.tap_max_duration_secs
            && travel <= self.config.tap_max_distance_px
        {
            self.tap_latched = true;
        }

        // Promote the remaining contact with a fresh start.
        self.primary = self
            .secondary
            .take()
            .map(|second| Contact::new(second.id, second.current, t));
        self.pinch_start_distance = None;
        if self.primary.is_none() {
            self.multi_touch = false;
        }
    }

    /// The platform cancelled every contact.
    pub fn touch_cancel(&mut self) {
        self.primary = None;
        self.secondary = None;
        self.pinch_start_distance = None;
        self.multi_touch = false;
    }

    /// Number of tracked contacts.
    #[must_use]
    pub fn contact_count(&self) -> usize {
        usize::from(self.primary.is_some()) + usize::from(self.secondary.is_some())
    }

    fn levels(&self) -> CommandVector {
        let mut out = CommandVector::NEUTRAL;
        let Some(primary) = self.primary else {
            return out;
        };

        match (self.secondary, self.pinch_start_distance) {
            (Some(secondary), Some(start)) => {
                let spread = primary.current.distance(secondary.current) - start;
                out.zoom_in = spread > self.config.pinch_dead_zone_px;
                out.zoom_out = spread < -self.config.pinch_dead_zone_px;
            }
            _ => {
                let dx = primary.current.x - primary.start.x;
                out.rotate_right = dx > self.config.swipe_dead_zone_px;
                out.rotate_left = dx < -self.config.swipe_dead_zone_px;
            }
        }
        out
    }

    fn take_tap(&mut self) -> bool {
        std::mem::take(&mut self.tap_latched)
    }
}

// =============================================================================
// FUSION
// =============================================================================

/// Both input sources and the per-tick fusion pass.
#[derive(Debug, Clone, Default)]
pub struct InputFusion {
    keyboard: KeyboardState,
    pointer: PointerTracker,
}

impl InputFusion {
    /// Creates a fusion stage with the given gesture thresholds.
    #[must_use]
    pub fn new(config: InputConfig) -> Self {
        Self {
            keyboard: KeyboardState::default(),
            pointer: PointerTracker::new(config),
        }
    }

    /// Records a key press.
    pub fn key_down(&mut self, key: Key) {
        self.keyboard.key_down(key);
    }

    /// Records a key release.
    pub fn key_up(&mut self, key: Key) {
        self.keyboard.key_up(key);
    }

    /// A contact went down at `t` seconds.
    pub fn touch_start(&mut self, id: u64, pos: Point, t: f32) {
        self.pointer.touch_start(id, pos, t);
    }

    /// A contact moved.
    pub fn touch_move(&mut self, id: u64, pos: Point, t: f32) {
        self.pointer.touch_move(id, pos, t);
    }

    /// A contact lifted.
    pub fn touch_end(&mut self, id: u64, pos: Point, t: f32) {
        self.pointer.touch_end(id, pos, t);
    }

    /// The platform cancelled every contact.
    pub fn touch_cancel(&mut self) {
        self.pointer.touch_cancel();
    }

    /// Keyboard source.
    #[must_use]
    pub const fn keyboard(&self) -> &KeyboardState {
        &self.keyboard
    }

    /// Pointer source.
    #[must_use]
    pub const fn pointer(&self) -> &PointerTracker {
        &self.pointer
    }

    /// Produces this tick's vector and drops latched edges.
    ///
    /// With `active == false` the output is neutral.
    pub fn fuse(&mut self, active: bool) -> CommandVector {
        let edge = self.keyboard.take_edge() | self.pointer.take_tap();
        if !active {
            return CommandVector::NEUTRAL;
        }

        let mut out = self.keyboard.levels();
        out.merge(&self.pointer.levels());
        out.check_alignment = edge;
        out
    }
}
