use serde::{Deserialize, Serialize};

use crate::core::slides::TextAlign;
use crate::utils::text::sanitize_text;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Serialize, Deserialize, Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct NavigationState {
    pub active_index: usize,
    pub previous_index: usize,
}

impl NavigationState {
    /// Entrance animation direction; an unchanged index counts as backward.
    pub fn direction(&self) -> Direction {
        if self.active_index > self.previous_index {
            Direction::Forward
        } else {
            Direction::Backward
        }
    }

    pub fn move_to(&mut self, index: usize) {
        self.previous_index = self.active_index;
        self.active_index = index;
    }
}

#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
pub struct FormState {
    pub name: String,
    pub location: String,
    pub is_submitting: bool,
    pub submit_error: Option<String>,
    pub has_submitted_data: bool,
}

impl FormState {
    pub fn set_name(&mut self, value: &str) {
        self.name = sanitize_text(value);
    }

    pub fn set_location(&mut self, value: &str) {
        self.location = sanitize_text(value);
    }

    /// True while a typed name has not been sent and no request is pending.
    pub fn has_unsaved_data(&self) -> bool {
        !self.name.trim().is_empty() && !self.is_submitting && !self.has_submitted_data
    }

    pub fn clear_error(&mut self) {
        self.submit_error = None;
    }

    pub fn reset(&mut self) {
        *self = FormState::default();
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HoverSide {
    Left,
    Right,
}

/// Hover-driven title shift on the intro slide.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntroAnimation {
    pub hover: Option<HoverSide>,
}

impl IntroAnimation {
    pub fn effective_text_align(&self, is_intro_slide: bool) -> TextAlign {
        if !is_intro_slide {
            return TextAlign::Center;
        }
        match self.hover {
            Some(HoverSide::Right) => TextAlign::Left,
            Some(HoverSide::Left) => TextAlign::Right,
            None => TextAlign::Center,
        }
    }

    /// Horizontal title offset in pixels, `None` off the intro slide.
    pub fn title_offset_px(&self, is_intro_slide: bool) -> Option<i32> {
        if !is_intro_slide {
            return None;
        }
        Some(match self.hover {
            Some(HoverSide::Right) => -40,
            Some(HoverSide::Left) => 40,
            None => 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_follows_index_change() {
        let mut nav = NavigationState::default();
        nav.move_to(3);
        assert_eq!(nav.direction(), Direction::Forward);
        nav.move_to(1);
        assert_eq!(nav.direction(), Direction::Backward);
        assert_eq!(nav.previous_index, 3);
    }

    #[test]
    fn test_unsaved_data_predicate() {
        let mut form = FormState::default();
        assert!(!form.has_unsaved_data());

        form.set_name("   ");
        assert!(!form.has_unsaved_data());

        form.set_name("Ada");
        assert!(form.has_unsaved_data());

        form.is_submitting = true;
        assert!(!form.has_unsaved_data());

        form.is_submitting = false;
        form.has_submitted_data = true;
        assert!(!form.has_unsaved_data());

        form.reset();
        assert_eq!(form, FormState::default());
    }

    #[test]
    fn test_setters_sanitize() {
        let mut form = FormState::default();
        form.set_name("Mary-Jane O'Neil 3rd!");
        assert_eq!(form.name, "Mary-Jane O'Neil rd");
        form.set_location("São Paulo, BR");
        assert_eq!(form.location, "So Paulo BR");
    }

    #[test]
    fn test_intro_animation() {
        let mut anim = IntroAnimation::default();
        assert_eq!(anim.effective_text_align(true), TextAlign::Center);
        assert_eq!(anim.title_offset_px(true), Some(0));

        anim.hover = Some(HoverSide::Right);
        assert_eq!(anim.effective_text_align(true), TextAlign::Left);
        assert_eq!(anim.title_offset_px(true), Some(-40));

        anim.hover = Some(HoverSide::Left);
        assert_eq!(anim.effective_text_align(true), TextAlign::Right);
        assert_eq!(anim.title_offset_px(true), Some(40));

        assert_eq!(anim.effective_text_align(false), TextAlign::Center);
        assert_eq!(anim.title_offset_px(false), None);
    }
}
