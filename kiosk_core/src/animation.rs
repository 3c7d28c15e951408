//! Per-frame motion for the carousel row.
//!
//! Selection changes only move *targets*; every tick eases the current
//! values toward them with `1 - e^(-k·dt)` smoothing, so the result is the
//! same whether the host runs at 30, 60 or 144 Hz and never overshoots.
//! Purchase impulses (spin, jump) ride on top of the continuous spin and
//! idle float and expire on their own.

use std::f32::consts::PI;
use std::f64::consts::TAU;

use glam::Vec3;
use serde::Serialize;

use crate::config::AnimationTuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImpulseKind {
    Spin,
    Jump,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Impulse {
    pub elapsed_seconds: f32,
    pub kind: ImpulseKind,
}

impl Impulse {
    pub fn new(kind: ImpulseKind) -> Self {
        Self {
            elapsed_seconds: 0.0,
            kind,
        }
    }

    pub fn progress(&self, duration: f32) -> f32 {
        if duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed_seconds / duration).clamp(0.0, 1.0)
    }
}

pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Fraction of the remaining distance covered in `dt` at rate `k`.
pub fn smoothing_factor(rate: f32, dt: f32) -> f32 {
    1.0 - (-rate * dt).exp()
}

pub fn smooth_toward(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    current + (target - current) * smoothing_factor(rate, dt)
}

pub fn smooth_toward_vec3(current: Vec3, target: Vec3, rate: f32, dt: f32) -> Vec3 {
    current + (target - current) * smoothing_factor(rate, dt)
}

/// Non-finite or negative deltas become zero; long stalls (a backgrounded
/// window) are capped at `max_dt`.
pub fn sanitize_dt(dt: f32, max_dt: f32) -> f32 {
    if !dt.is_finite() || dt <= 0.0 {
        return 0.0;
    }
    dt.min(max_dt)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemAnimationState {
    pub current_scale: f32,
    pub target_scale: f32,
    pub current_rotation_speed: f32,
    pub target_rotation_speed: f32,
    /// Slot in the row before scrolling; y is the resting height.
    pub base_position: Vec3,
    pub base_rotation: Vec3,
    pub floating_phase_offset: f32,
    pub active_spin_impulses: Vec<Impulse>,
    pub active_jump_impulses: Vec<Impulse>,
    /// Vertical offset from idle floating plus active jumps, as of the last step.
    pub vertical_offset: f32,
}

/// Inputs to a single item step that come from the driver, not the item.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    /// Driver clock after this step, in seconds.
    pub clock: f64,
    pub selected: bool,
    pub tuning: &'a AnimationTuning,
}

impl ItemAnimationState {
    fn at_slot(index: usize, selected: bool, tuning: &AnimationTuning) -> Self {
        let (scale, speed) = targets_for(selected, tuning);
        Self {
            current_scale: scale,
            target_scale: scale,
            current_rotation_speed: speed,
            target_rotation_speed: speed,
            base_position: Vec3::new(index as f32 * tuning.item_spacing, tuning.base_height, 0.0),
            base_rotation: Vec3::ZERO,
            floating_phase_offset: index as f32 * tuning.float_phase_step,
            active_spin_impulses: Vec::new(),
            active_jump_impulses: Vec::new(),
            vertical_offset: 0.0,
        }
    }

    fn retarget(&mut self, selected: bool, tuning: &AnimationTuning) {
        let (scale, speed) = targets_for(selected, tuning);
        self.target_scale = scale;
        self.target_rotation_speed = speed;
    }

    /// Advances this item by `dt` seconds and returns the new state.
    pub fn step(&self, dt: f32, ctx: StepContext<'_>) -> Self {
        let tuning = ctx.tuning;
        let mut next = self.clone();

        next.current_scale = smooth_toward(self.current_scale, self.target_scale, tuning.scale_rate, dt);
        next.current_rotation_speed = smooth_toward(
            self.current_rotation_speed,
            self.target_rotation_speed,
            tuning.scale_rate,
            dt,
        );
        next.base_rotation.y += tuning.base_rotation_speed * next.current_rotation_speed * dt;

        // Each spin applies only the eased angle gained this step, so any
        // number of overlapping spins add up without a jump in the total.
        let mut spin_delta = 0.0;
        for impulse in &mut next.active_spin_impulses {
            let before = ease_out_cubic(impulse.progress(tuning.spin_duration));
            impulse.elapsed_seconds += dt;
            let after = ease_out_cubic(impulse.progress(tuning.spin_duration));
            spin_delta += (after - before) * tuning.spin_angle;
        }
        next.base_rotation.y += spin_delta;
        next.active_spin_impulses
            .retain(|impulse| impulse.progress(tuning.spin_duration) < 1.0);

        let mut jump = 0.0;
        for impulse in &mut next.active_jump_impulses {
            impulse.elapsed_seconds += dt;
            jump += (impulse.progress(tuning.jump_duration) * PI).sin() * tuning.jump_height;
        }
        next.active_jump_impulses
            .retain(|impulse| impulse.progress(tuning.jump_duration) < 1.0);

        let float_speed = if ctx.selected {
            tuning.selected_float_speed
        } else {
            tuning.unselected_float_speed
        };
        // Wrapped in f64 so the float keeps moving on a kiosk left up for weeks.
        let phase = (ctx.clock * f64::from(float_speed)).rem_euclid(TAU) as f32;
        let float = (phase + self.floating_phase_offset).sin() * tuning.float_amplitude;
        next.vertical_offset = float + jump.max(0.0);
        next
    }
}

fn targets_for(selected: bool, tuning: &AnimationTuning) -> (f32, f32) {
    if selected {
        (tuning.selected_scale, tuning.selected_rotation_speed)
    } else {
        (tuning.unselected_scale, tuning.unselected_rotation_speed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ItemTransform {
    pub position: Vec3,
    /// Euler angles in radians (x, y, z).
    pub rotation: Vec3,
    pub scale: f32,
}

/// Light that trails the selected item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Spotlight {
    pub position: Vec3,
    pub target: Vec3,
}

#[derive(Debug, Clone)]
pub struct AnimationDriver {
    tuning: AnimationTuning,
    items: Vec<ItemAnimationState>,
    selected: usize,
    clock: f64,
    scroll_offset: f32,
    target_scroll: f32,
    spotlight: Spotlight,
}

impl AnimationDriver {
    /// Builds resting state for `item_count` items with `selected` already
    /// settled (no easing on the first frame).
    pub fn new(item_count: usize, selected: usize, tuning: AnimationTuning) -> Self {
        let selected = selected.min(item_count.saturating_sub(1));
        let items = (0..item_count)
            .map(|index| ItemAnimationState::at_slot(index, index == selected, &tuning))
            .collect();
        let scroll = -(selected as f32) * tuning.item_spacing;
        let mut driver = Self {
            tuning,
            items,
            selected,
            clock: 0.0,
            scroll_offset: scroll,
            target_scroll: scroll,
            spotlight: Spotlight {
                position: Vec3::ZERO,
                target: Vec3::ZERO,
            },
        };
        let focus = driver.focus_point();
        driver.spotlight = Spotlight {
            position: focus + Vec3::from(driver.tuning.spotlight_offset),
            target: focus,
        };
        driver
    }

    pub fn tuning(&self) -> &AnimationTuning {
        &self.tuning
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    pub fn spotlight(&self) -> Spotlight {
        self.spotlight
    }

    pub fn item_state(&self, index: usize) -> Option<&ItemAnimationState> {
        self.items.get(index)
    }

    /// Points every item at its selected/unselected targets and the row at
    /// the new scroll position. Current values are left to ease.
    pub fn retarget(&mut self, selected: usize) {
        if self.items.is_empty() {
            return;
        }
        self.selected = selected.min(self.items.len() - 1);
        for (index, item) in self.items.iter_mut().enumerate() {
            item.retarget(index == self.selected, &self.tuning);
        }
        self.target_scroll = -(self.selected as f32) * self.tuning.item_spacing;
    }

    /// Spin and jump flourish on the selected item. Both lists are
    /// independent and keep their own durations.
    pub fn push_purchase_impulse(&mut self) {
        if let Some(item) = self.items.get_mut(self.selected) {
            item.active_spin_impulses.push(Impulse::new(ImpulseKind::Spin));
            item.active_jump_impulses.push(Impulse::new(ImpulseKind::Jump));
        }
    }

    /// Manual turn from an unclassified pointer drag.
    pub fn nudge_selected_rotation(&mut self, drag_dx: f32) {
        if !drag_dx.is_finite() {
            return;
        }
        let radians = drag_dx * self.tuning.drag_rotation_per_px;
        if let Some(item) = self.items.get_mut(self.selected) {
            item.base_rotation.y += radians;
        }
    }

    pub fn tick(&mut self, dt: f32) {
        let dt = sanitize_dt(dt, self.tuning.max_dt);
        if dt == 0.0 {
            return;
        }
        self.clock += f64::from(dt);
        self.scroll_offset = smooth_toward(
            self.scroll_offset,
            self.target_scroll,
            self.tuning.scroll_rate,
            dt,
        );
        let tuning = &self.tuning;
        let clock = self.clock;
        let selected = self.selected;
        self.items = self
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                item.step(
                    dt,
                    StepContext {
                        clock,
                        selected: index == selected,
                        tuning,
                    },
                )
            })
            .collect();

        let focus = self.focus_point();
        let light_goal = focus + Vec3::from(self.tuning.spotlight_offset);
        self.spotlight = Spotlight {
            position: smooth_toward_vec3(
                self.spotlight.position,
                light_goal,
                self.tuning.spotlight_rate,
                dt,
            ),
            target: smooth_toward_vec3(self.spotlight.target, focus, self.tuning.spotlight_rate, dt),
        };
    }

    pub fn transform(&self, index: usize) -> Option<ItemTransform> {
        let item = self.items.get(index)?;
        Some(ItemTransform {
            position: Vec3::new(
                item.base_position.x + self.scroll_offset,
                item.base_position.y + item.vertical_offset,
                item.base_position.z,
            ),
            rotation: item.base_rotation,
            scale: item.current_scale,
        })
    }

    pub fn transforms(&self) -> Vec<ItemTransform> {
        (0..self.items.len())
            .filter_map(|index| self.transform(index))
            .collect()
    }

    fn focus_point(&self) -> Vec3 {
        self.transform(self.selected)
            .map(|transform| transform.position)
            .unwrap_or(Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::TAU;

    use super::*;

    const FRAME: f32 = 1.0 / 60.0;

    fn driver(count: usize) -> AnimationDriver {
        AnimationDriver::new(count, 0, AnimationTuning::default())
    }

    fn no_idle_spin() -> AnimationTuning {
        AnimationTuning {
            base_rotation_speed: 0.0,
            float_amplitude: 0.0,
            ..AnimationTuning::default()
        }
    }

    #[test]
    fn starts_settled_on_the_selected_item() {
        let driver = driver(5);
        let first = driver.item_state(0).expect("item 0");
        assert_eq!(first.current_scale, 1.5);
        assert_eq!(driver.item_state(1).expect("item 1").current_scale, 1.0);
        assert_eq!(driver.scroll_offset(), 0.0);
    }

    #[test]
    fn retarget_eases_without_overshoot() {
        let mut driver = driver(3);
        driver.retarget(1);
        let mut previous = driver.item_state(1).expect("item").current_scale;
        assert_eq!(previous, 1.0, "retarget never snaps");
        for _ in 0..240 {
            driver.tick(FRAME);
            let scale = driver.item_state(1).expect("item").current_scale;
            assert!(scale >= previous - 1e-6, "scale went backwards");
            assert!(scale <= 1.5 + 1e-6, "scale overshot");
            previous = scale;
        }
        assert!((previous - 1.5).abs() < 1e-3);
        let old = driver.item_state(0).expect("item").current_scale;
        assert!((old - 1.0).abs() < 1e-3);
        assert!((driver.scroll_offset() + driver.tuning().item_spacing).abs() < 1e-3);
    }

    #[test]
    fn smoothing_is_frame_rate_independent() {
        let mut slow = driver(2);
        let mut fast = driver(2);
        slow.retarget(1);
        fast.retarget(1);
        for _ in 0..30 {
            slow.tick(1.0 / 30.0);
        }
        for _ in 0..120 {
            fast.tick(1.0 / 120.0);
        }
        let a = slow.item_state(1).expect("item").current_scale;
        let b = fast.item_state(1).expect("item").current_scale;
        assert!((a - b).abs() < 1e-4, "{a} vs {b}");
        assert!((slow.scroll_offset() - fast.scroll_offset()).abs() < 1e-3);
    }

    #[test]
    fn bad_deltas_are_clamped() {
        let mut driver = driver(2);
        driver.retarget(1);
        driver.tick(f32::NAN);
        driver.tick(-1.0);
        assert_eq!(driver.clock(), 0.0);
        driver.tick(30.0);
        assert!((driver.clock() - 0.1).abs() < 1e-6);
        let scale = driver.item_state(1).expect("item").current_scale;
        assert!(scale.is_finite() && scale < 1.5);
    }

    #[test]
    fn continuous_spin_follows_speed() {
        let tuning = AnimationTuning::default();
        let mut driver = AnimationDriver::new(2, 0, tuning.clone());
        driver.tick(0.05);
        let selected = driver.item_state(0).expect("item").base_rotation.y;
        let idle = driver.item_state(1).expect("item").base_rotation.y;
        assert!((selected - tuning.base_rotation_speed * 3.0 * 0.05).abs() < 1e-5);
        assert!((idle - tuning.base_rotation_speed * 0.5 * 0.05).abs() < 1e-5);
    }

    #[test]
    fn overlapping_spins_sum_their_eased_angles() {
        let tuning = no_idle_spin();
        let mut driver = AnimationDriver::new(1, 0, tuning.clone());
        driver.push_purchase_impulse();
        let mut first = 0.0_f32;
        for _ in 0..5 {
            driver.tick(0.02);
            first += 0.02;
        }
        driver.push_purchase_impulse();
        let mut second = 0.0_f32;

        let step = 0.016;
        // Largest per-step gain of a single spin is at its start.
        let single_max = ease_out_cubic(step / tuning.spin_duration) * tuning.spin_angle;
        let mut previous = driver.item_state(0).expect("item").base_rotation.y;
        for _ in 0..50 {
            driver.tick(step);
            first += step;
            second += step;
            let expected = tuning.spin_angle
                * (ease_out_cubic(first / tuning.spin_duration)
                    + ease_out_cubic(second / tuning.spin_duration));
            let rotation = driver.item_state(0).expect("item").base_rotation.y;
            assert!(
                (rotation - expected).abs() < 1e-3,
                "rotation {rotation} expected {expected}"
            );
            let jump = rotation - previous;
            assert!(jump >= -1e-6, "rotation went backwards");
            assert!(jump <= 2.0 * single_max + 1e-4, "discontinuity of {jump}");
            previous = rotation;
        }
        assert!((previous - 2.0 * TAU).abs() < 1e-3);
        let state = driver.item_state(0).expect("item");
        assert!(state.active_spin_impulses.is_empty());
        assert!(state.active_jump_impulses.is_empty());
    }

    #[test]
    fn concurrent_jumps_add_heights() {
        let tuning = no_idle_spin();
        let mut driver = AnimationDriver::new(1, 0, tuning.clone());
        driver.push_purchase_impulse();
        driver.push_purchase_impulse();
        // Two steps so the per-frame clamp does not shorten the delta.
        driver.tick(tuning.jump_duration / 4.0);
        driver.tick(tuning.jump_duration / 4.0);
        let offset = driver.item_state(0).expect("item").vertical_offset;
        assert!((offset - 2.0 * tuning.jump_height).abs() < 1e-4);
        let position = driver.transform(0).expect("transform").position;
        assert!((position.y - 2.0 * tuning.jump_height).abs() < 1e-4);
    }

    #[test]
    fn jumps_expire_before_spins() {
        let tuning = no_idle_spin();
        let mut driver = AnimationDriver::new(1, 0, tuning);
        driver.push_purchase_impulse();
        for _ in 0..18 {
            driver.tick(FRAME);
        }
        let state = driver.item_state(0).expect("item");
        assert!(state.active_jump_impulses.is_empty());
        assert_eq!(state.active_spin_impulses.len(), 1);
        assert!(state.vertical_offset.abs() < 1e-6);
    }

    #[test]
    fn floating_is_out_of_phase_between_items() {
        let mut driver = driver(3);
        driver.tick(0.05);
        let a = driver.item_state(1).expect("item").vertical_offset;
        let b = driver.item_state(2).expect("item").vertical_offset;
        assert!((a - b).abs() > 1e-4);
        let amplitude = driver.tuning().float_amplitude;
        assert!(a.abs() <= amplitude + 1e-6);
    }

    #[test]
    fn floating_keeps_moving_after_days_of_uptime() {
        let mut driver = driver(2);
        driver.clock = 600_000.0;
        let mut offsets = Vec::new();
        for _ in 0..60 {
            driver.tick(FRAME);
            offsets.push(driver.item_state(1).expect("item").vertical_offset);
        }
        let lowest = offsets.iter().copied().fold(f32::INFINITY, f32::min);
        let highest = offsets.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert!(highest - lowest > 1e-3, "float froze: {offsets:?}");
        assert!((driver.clock() - (600_000.0 + 60.0 * f64::from(FRAME))).abs() < 1e-6);
    }

    #[test]
    fn spotlight_lags_toward_new_selection() {
        let mut driver = driver(4);
        let start = driver.spotlight();
        driver.retarget(3);
        driver.tick(FRAME);
        let after_one = driver.spotlight();
        let focus_now = driver.transform(3).expect("transform").position;
        assert!(after_one.target.x > start.target.x, "light starts moving");
        assert!(after_one.target.x < focus_now.x, "light trails the item");
        for _ in 0..600 {
            driver.tick(FRAME);
        }
        let settled = driver.spotlight();
        let focus = driver.transform(3).expect("transform").position;
        assert!((settled.target - focus).length() < 0.05);
    }

    #[test]
    fn drag_nudge_turns_selected_item_only() {
        let mut driver = AnimationDriver::new(2, 1, no_idle_spin());
        driver.nudge_selected_rotation(50.0);
        assert!((driver.item_state(1).expect("item").base_rotation.y - 0.5).abs() < 1e-6);
        assert_eq!(driver.item_state(0).expect("item").base_rotation.y, 0.0);
        driver.nudge_selected_rotation(f32::INFINITY);
        assert!((driver.item_state(1).expect("item").base_rotation.y - 0.5).abs() < 1e-6);
    }
}
