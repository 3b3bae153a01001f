use log::{debug, warn};

use crate::core::slides::{Slide, SlideRegistry};
use crate::core::state::{Direction, NavigationState};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavAction {
    Back,
    Next,
    Reset,
    Confirm,
    Home,
    GoTo(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavOutcome {
    Moved {
        from: usize,
        to: usize,
        direction: Direction,
    },
    /// Held back behind the leave confirmation.
    Deferred,
    /// A leave dialog is already open.
    Blocked,
    Unchanged,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardState {
    Idle,
    /// `target` is the slide index resolved when the navigation was requested.
    Confirming { target: usize },
    Leaving { target: usize, deadline_ms: u64 },
}

/// Confirm-then-goodbye sequence in front of a navigation that would drop
/// unsaved input. Holds at most one pending target and one deadline.
#[derive(Clone, Debug)]
pub struct LeaveGuard {
    state: GuardState,
    delay_ms: u64,
}

impl LeaveGuard {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            state: GuardState::Idle,
            delay_ms,
        }
    }

    pub fn state(&self) -> &GuardState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == GuardState::Idle
    }

    pub fn defer(&mut self, target: usize) -> bool {
        if !self.is_idle() {
            return false;
        }
        self.state = GuardState::Confirming { target };
        true
    }

    /// User accepted leaving; the goodbye notice runs until `now_ms + delay`.
    pub fn confirm(&mut self, now_ms: u64) -> bool {
        match std::mem::replace(&mut self.state, GuardState::Idle) {
            GuardState::Confirming { target } => {
                self.state = GuardState::Leaving {
                    target,
                    deadline_ms: now_ms.saturating_add(self.delay_ms),
                };
                true
            }
            other => {
                self.state = other;
                false
            }
        }
    }

    pub fn cancel(&mut self) -> Option<usize> {
        match std::mem::replace(&mut self.state, GuardState::Idle) {
            GuardState::Confirming { target } => Some(target),
            other => {
                self.state = other;
                None
            }
        }
    }

    /// "Changed my mind" on the goodbye notice.
    pub fn stay(&mut self) -> Option<usize> {
        match std::mem::replace(&mut self.state, GuardState::Idle) {
            GuardState::Leaving { target, .. } => Some(target),
            other => {
                self.state = other;
                None
            }
        }
    }

    pub fn poll(&mut self, now_ms: u64) -> Option<usize> {
        let due = matches!(
            &self.state,
            GuardState::Leaving { deadline_ms, .. } if now_ms >= *deadline_ms
        );
        if !due {
            return None;
        }
        match std::mem::replace(&mut self.state, GuardState::Idle) {
            GuardState::Leaving { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn deadline_ms(&self) -> Option<u64> {
        match &self.state {
            GuardState::Leaving { deadline_ms, .. } => Some(*deadline_ms),
            _ => None,
        }
    }
}

pub struct Navigator {
    registry: SlideRegistry,
    state: NavigationState,
    guard: LeaveGuard,
}

impl Navigator {
    pub fn new(registry: SlideRegistry, goodbye_delay_ms: u64) -> Self {
        Self {
            registry,
            state: NavigationState::default(),
            guard: LeaveGuard::new(goodbye_delay_ms),
        }
    }

    pub fn registry(&self) -> &SlideRegistry {
        &self.registry
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    pub fn guard(&self) -> &LeaveGuard {
        &self.guard
    }

    pub fn active_index(&self) -> usize {
        self.state.active_index
    }

    pub fn current(&self) -> &Slide {
        self.registry.at(self.state.active_index)
    }

    pub fn is_first(&self) -> bool {
        self.state.active_index == 0
    }

    pub fn is_last(&self) -> bool {
        self.state.active_index == self.registry.last_index()
    }

    pub fn direction(&self) -> Direction {
        self.state.direction()
    }

    /// Target index for `action` from the current slide, or `None` to stay put.
    pub fn resolve(&self, action: &NavAction) -> Option<usize> {
        let active = self.state.active_index;
        let slide = self.current();
        let explicit = |button: &Option<crate::core::slides::ButtonConfig>| {
            let target = button.as_ref()?.navigate_to.as_deref()?;
            let index = self.registry.index_of(target);
            if index.is_none() {
                warn!("Slide {} targets unknown slide {}", slide.id, target);
            }
            index
        };

        match action {
            NavAction::Back => {
                Some(explicit(&slide.back_button).unwrap_or_else(|| active.saturating_sub(1)))
            }
            NavAction::Next => Some(
                explicit(&slide.next_button)
                    .unwrap_or_else(|| (active + 1).min(self.registry.last_index())),
            ),
            NavAction::Reset => explicit(&slide.reset_button),
            NavAction::Confirm => explicit(&slide.confirm_button),
            NavAction::Home => Some(0),
            NavAction::GoTo(id) => {
                let index = self.registry.index_of(id);
                if index.is_none() {
                    warn!("Ignoring navigation to unknown slide {}", id);
                }
                index
            }
        }
    }

    /// Runs `action` now, bypassing the guard.
    pub fn apply(&mut self, action: &NavAction) -> NavOutcome {
        match self.resolve(action) {
            Some(to) => self.move_to(to),
            None => NavOutcome::Unchanged,
        }
    }

    fn move_to(&mut self, to: usize) -> NavOutcome {
        let to = to.min(self.registry.last_index());
        let from = self.state.active_index;
        if to == from {
            return NavOutcome::Unchanged;
        }
        self.state.move_to(to);
        let direction = self.state.direction();
        debug!(
            "Slide {} -> {} ({:?})",
            self.registry.at(from).id,
            self.registry.at(to).id,
            direction
        );
        NavOutcome::Moved {
            from,
            to,
            direction,
        }
    }

    /// Runs `action`, or parks it behind the leave dialog when `guarded`.
    pub fn request(&mut self, action: NavAction, guarded: bool) -> NavOutcome {
        if !self.guard.is_idle() {
            return NavOutcome::Blocked;
        }
        let Some(to) = self.resolve(&action) else {
            return NavOutcome::Unchanged;
        };
        if guarded && to != self.state.active_index {
            self.guard.defer(to);
            return NavOutcome::Deferred;
        }
        self.move_to(to)
    }

    pub fn confirm_leave(&mut self, now_ms: u64) -> bool {
        self.guard.confirm(now_ms)
    }

    pub fn cancel_leave(&mut self) -> bool {
        self.guard.cancel().is_some()
    }

    pub fn stay(&mut self) -> bool {
        self.guard.stay().is_some()
    }

    /// Fires the deferred navigation once its goodbye delay has elapsed.
    pub fn tick(&mut self, now_ms: u64) -> NavOutcome {
        match self.guard.poll(now_ms) {
            Some(target) => self.move_to(target),
            None => NavOutcome::Unchanged,
        }
    }

    pub fn restart(&mut self) {
        self.guard = LeaveGuard::new(self.guard.delay_ms);
        self.state = NavigationState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::slides::*;

    fn navigator() -> Navigator {
        Navigator::new(SlideRegistry::default(), 3000)
    }

    fn goto(nav: &mut Navigator, id: &str) {
        nav.apply(&NavAction::GoTo(id.to_string()));
        assert_eq!(nav.current().id, id);
    }

    #[test]
    fn test_back_and_next_stay_in_bounds() {
        let mut nav = navigator();
        let len = nav.registry().len();
        for start in 0..len {
            for action in [NavAction::Back, NavAction::Next] {
                nav.restart();
                nav.state.move_to(start);
                nav.apply(&action);
                assert!(nav.active_index() < len);
            }
        }
    }

    #[test]
    fn test_clamped_relative_moves() {
        let mut nav = navigator();
        nav.state.move_to(1);
        assert_eq!(nav.resolve(&NavAction::Next), Some(2));

        let last = nav.registry().last_index();
        nav.state.move_to(last);
        assert!(nav.is_last());
        assert_eq!(nav.resolve(&NavAction::Next), Some(last));
    }

    #[test]
    fn test_explicit_targets() {
        let mut nav = navigator();
        assert_eq!(nav.apply(&NavAction::Next), NavOutcome::Moved {
            from: 0,
            to: 1,
            direction: Direction::Forward
        });

        goto(&mut nav, CONCERNS_SLIDE_ID);
        let outcome = nav.apply(&NavAction::Back);
        assert_eq!(nav.current().id, CATEGORIES_SLIDE_ID);
        assert!(matches!(outcome, NavOutcome::Moved { direction: Direction::Backward, .. }));
    }

    #[test]
    fn test_unknown_slide_id_is_noop() {
        let mut nav = navigator();
        nav.state.move_to(2);
        assert_eq!(nav.apply(&NavAction::GoTo("999".to_string())), NavOutcome::Unchanged);
        assert_eq!(nav.active_index(), 2);
    }

    #[test]
    fn test_dangling_explicit_target_falls_back_to_adjacent() {
        let mut slides = default_slides();
        slides[2].back_button = Some(ButtonConfig {
            text: "BACK".to_string(),
            navigate_to: Some("missing".to_string()),
        });
        let mut nav = Navigator::new(SlideRegistry::new(slides).unwrap(), 3000);
        nav.state.move_to(2);
        nav.apply(&NavAction::Back);
        assert_eq!(nav.active_index(), 1);
    }

    #[test]
    fn test_reset_and_confirm_without_target_stay() {
        let mut nav = navigator();
        goto(&mut nav, DEMOGRAPHICS_SLIDE_ID);
        assert_eq!(nav.apply(&NavAction::Reset), NavOutcome::Unchanged);
        assert_eq!(nav.apply(&NavAction::Confirm), NavOutcome::Unchanged);
        assert_eq!(nav.current().id, DEMOGRAPHICS_SLIDE_ID);
    }

    #[test]
    fn test_guarded_navigation_waits_for_goodbye() {
        let mut nav = navigator();
        goto(&mut nav, NAME_SLIDE_ID);
        let start = nav.active_index();

        assert_eq!(nav.request(NavAction::Back, true), NavOutcome::Deferred);
        assert_eq!(nav.active_index(), start);
        assert_eq!(nav.request(NavAction::Next, true), NavOutcome::Blocked);

        assert!(nav.confirm_leave(1_000));
        assert_eq!(nav.tick(3_999), NavOutcome::Unchanged);
        assert_eq!(nav.active_index(), start);

        assert!(matches!(nav.tick(4_000), NavOutcome::Moved { .. }));
        assert_eq!(nav.current().id, INTRO_SLIDE_ID);

        // exactly once
        assert_eq!(nav.tick(10_000), NavOutcome::Unchanged);
        assert_eq!(nav.current().id, INTRO_SLIDE_ID);
        assert!(nav.guard().is_idle());
    }

    #[test]
    fn test_cancel_drops_pending_navigation() {
        let mut nav = navigator();
        goto(&mut nav, NAME_SLIDE_ID);
        nav.request(NavAction::Home, true);
        assert!(nav.cancel_leave());
        assert_eq!(nav.tick(u64::MAX), NavOutcome::Unchanged);
        assert_eq!(nav.current().id, NAME_SLIDE_ID);
        assert!(!nav.confirm_leave(0));
    }

    #[test]
    fn test_stay_during_goodbye_drops_navigation() {
        let mut nav = navigator();
        goto(&mut nav, NAME_SLIDE_ID);
        nav.request(NavAction::Back, true);
        nav.confirm_leave(0);
        assert_eq!(nav.guard().deadline_ms(), Some(3000));
        assert!(nav.stay());
        assert_eq!(nav.tick(5_000), NavOutcome::Unchanged);
        assert_eq!(nav.current().id, NAME_SLIDE_ID);
    }

    #[test]
    fn test_deferred_target_is_fixed_at_request_time() {
        let mut nav = navigator();
        goto(&mut nav, LOCATION_SLIDE_ID);
        assert_eq!(nav.request(NavAction::Back, true), NavOutcome::Deferred);
        assert_eq!(nav.guard().state(), &GuardState::Confirming {
            target: nav.registry().index_of(NAME_SLIDE_ID).unwrap()
        });

        // the slide changes underneath the open dialog
        nav.apply(&NavAction::Next);
        assert_eq!(nav.current().id, CAPTURE_SLIDE_ID);

        nav.confirm_leave(0);
        nav.tick(3000);
        assert_eq!(nav.current().id, NAME_SLIDE_ID);
    }

    #[test]
    fn test_guard_ignores_noop_requests() {
        let mut nav = navigator();
        assert_eq!(nav.request(NavAction::Back, true), NavOutcome::Unchanged);
        assert!(nav.guard().is_idle());
    }
}
