use anyhow::Result;
use log::{debug, info, warn};

use crate::core::capture::{CaptureFlow, CaptureSource, CaptureTick};
use crate::core::config::Config;
use crate::core::io::Storage;
use crate::core::navigation::{NavAction, NavOutcome, Navigator};
use crate::core::slides::{
    CustomComponent, Slide, SlideRegistry, INTRO_SLIDE_ID, LOCATION_SLIDE_ID,
};
use crate::core::state::{FormState, HoverSide, IntroAnimation, NavigationState};
use crate::services::api::{AnalysisApi, AnalysisResult, ApiError};
use crate::services::selection::{Category, ConfirmedSelections, DisplayedEntry, SelectedEntries};
use crate::utils::image::normalize_base64_image;

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Empty input or a request already in flight.
    Ignored,
    /// Name stored locally, moved to the location slide.
    NameStored(NavOutcome),
    /// Identity accepted by the service, moved on to capture.
    Submitted(NavOutcome),
    Failed(String),
    /// The user left the slide before the response arrived.
    Stale,
}

/// Proof that a request was started on the slide visit that is still current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    visit: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub navigation: NavOutcome,
    pub capture: Option<CaptureTick>,
}

/// All state for one run through the flow. Every UI event maps to one
/// method; timers are driven by `tick(now_ms)`.
pub struct Session {
    navigator: Navigator,
    form: FormState,
    capture: CaptureFlow,
    intro: IntroAnimation,
    analysis: Option<AnalysisResult>,
    active_category: Category,
    selections: SelectedEntries,
    active_concern: usize,
    /// Bumped on every slide change so responses from an earlier visit are
    /// recognised even when the user came back to the same slide.
    visit: u64,
}

impl Session {
    pub fn new(config: &Config) -> Self {
        Self::with_registry(config, SlideRegistry::default())
    }

    pub fn with_registry(config: &Config, registry: SlideRegistry) -> Self {
        Self {
            navigator: Navigator::new(registry, config.goodbye_delay_ms),
            form: FormState::default(),
            capture: CaptureFlow::new(config.loading_delay_ms),
            intro: IntroAnimation::default(),
            analysis: None,
            active_category: Category::Race,
            selections: SelectedEntries::default(),
            active_concern: 0,
            visit: 0,
        }
    }

    // --- Accessors ---

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn current_slide(&self) -> &Slide {
        self.navigator.current()
    }

    pub fn navigation_state(&self) -> NavigationState {
        self.navigator.state()
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn capture(&self) -> &CaptureFlow {
        &self.capture
    }

    pub fn intro(&self) -> &IntroAnimation {
        &self.intro
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn selections(&self) -> &SelectedEntries {
        &self.selections
    }

    pub fn active_category(&self) -> Category {
        self.active_category
    }

    pub fn active_concern(&self) -> usize {
        self.active_concern
    }

    pub fn has_unsaved_data(&self) -> bool {
        self.form.has_unsaved_data()
    }

    /// Earliest pending timer, if any.
    pub fn next_deadline_ms(&self) -> Option<u64> {
        match (self.navigator.guard().deadline_ms(), self.capture.deadline_ms()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // --- Navigation ---

    pub fn go_back(&mut self) -> NavOutcome {
        self.navigate(NavAction::Back)
    }

    pub fn go_next(&mut self) -> NavOutcome {
        self.navigate(NavAction::Next)
    }

    pub fn go_home(&mut self) -> NavOutcome {
        self.navigate(NavAction::Home)
    }

    pub fn go_to_slide_id(&mut self, id: &str) -> NavOutcome {
        self.navigate(NavAction::GoTo(id.to_string()))
    }

    fn navigate(&mut self, action: NavAction) -> NavOutcome {
        let guarded = self.form.has_unsaved_data();
        let outcome = self.navigator.request(action, guarded);
        if outcome == NavOutcome::Deferred {
            info!("Unsaved input, asking before leaving");
        }
        self.after_navigation(&outcome);
        outcome
    }

    fn apply(&mut self, action: NavAction) -> NavOutcome {
        let outcome = self.navigator.apply(&action);
        self.after_navigation(&outcome);
        outcome
    }

    fn after_navigation(&mut self, outcome: &NavOutcome) {
        if let NavOutcome::Moved { from, .. } = outcome {
            self.visit += 1;
            let left = self.navigator.registry().at(*from);
            if left.custom_component == Some(CustomComponent::ImageCapture) {
                self.capture.reset();
            }
            if self.navigator.current().id != INTRO_SLIDE_ID {
                self.intro.hover = None;
            }
        }
    }

    pub fn confirm_leave(&mut self, now_ms: u64) -> bool {
        self.navigator.confirm_leave(now_ms)
    }

    pub fn cancel_leave(&mut self) -> bool {
        self.navigator.cancel_leave()
    }

    pub fn stay(&mut self) -> bool {
        self.navigator.stay()
    }

    pub fn tick(&mut self, now_ms: u64) -> TickOutcome {
        let navigation = self.navigator.tick(now_ms);
        self.after_navigation(&navigation);

        let on_capture_slide =
            self.current_slide().custom_component == Some(CustomComponent::ImageCapture);
        let capture = if on_capture_slide {
            self.capture.tick(now_ms)
        } else {
            None
        };

        let navigation = match capture {
            Some(CaptureTick::AnalysisReady) => self.apply(NavAction::Next),
            _ => navigation,
        };
        TickOutcome {
            navigation,
            capture,
        }
    }

    pub fn hover_intro(&mut self, side: Option<HoverSide>) {
        self.intro.hover = side;
    }

    /// Back to the first slide with everything cleared.
    pub fn restart(&mut self) {
        info!("Restarting flow");
        self.navigator.restart();
        self.form.reset();
        self.capture.reset();
        self.intro = IntroAnimation::default();
        self.analysis = None;
        self.active_category = Category::Race;
        self.selections.reset_entries();
        self.active_concern = 0;
        self.visit += 1;
    }

    // --- Form ---

    pub fn set_name(&mut self, value: &str) {
        self.form.set_name(value);
    }

    pub fn set_location(&mut self, value: &str) {
        self.form.set_location(value);
    }

    fn on_location_slide(&self) -> bool {
        self.current_slide().custom_component == Some(CustomComponent::LocationForm)
    }

    fn ticket(&self) -> RequestTicket {
        RequestTicket { visit: self.visit }
    }

    fn is_current(&self, ticket: &RequestTicket) -> bool {
        ticket.visit == self.visit
    }

    /// Name step: kept locally, no network call.
    pub fn submit_name(&mut self) -> SubmitOutcome {
        let trimmed = self.form.name.trim().to_string();
        if trimmed.is_empty() || self.form.is_submitting || !self.navigator.guard().is_idle() {
            return SubmitOutcome::Ignored;
        }
        self.form.clear_error();
        self.form.name = trimmed;

        match self.navigator.registry().index_of(LOCATION_SLIDE_ID) {
            Some(_) => {
                let outcome = self.apply(NavAction::GoTo(LOCATION_SLIDE_ID.to_string()));
                SubmitOutcome::NameStored(outcome)
            }
            None => {
                warn!("No location slide registered");
                SubmitOutcome::NameStored(NavOutcome::Unchanged)
            }
        }
    }

    /// Location step, first half: validates and marks the form busy.
    /// Nothing starts while a leave dialog is open.
    pub fn begin_location_submit(&mut self) -> Option<RequestTicket> {
        if self.form.is_submitting || !self.on_location_slide() || !self.navigator.guard().is_idle()
        {
            return None;
        }
        let location = self.form.location.trim().to_string();
        if location.is_empty() || self.form.name.trim().is_empty() {
            return None;
        }
        self.form.location = location;
        self.form.clear_error();
        self.form.is_submitting = true;
        Some(self.ticket())
    }

    /// Location step, second half: applies the service response.
    pub fn finish_location_submit(
        &mut self,
        ticket: RequestTicket,
        result: Result<(), ApiError>,
    ) -> SubmitOutcome {
        self.form.is_submitting = false;

        if !self.is_current(&ticket) {
            warn!("Discarding identity response for a slide the user already left");
            return SubmitOutcome::Stale;
        }

        match result {
            Ok(()) => {
                self.form.has_submitted_data = true;
                SubmitOutcome::Submitted(self.apply(NavAction::Next))
            }
            Err(e) => {
                let message = e.submission_message();
                warn!("{}", message);
                self.form.submit_error = Some(message.clone());
                SubmitOutcome::Failed(message)
            }
        }
    }

    pub async fn submit_location(&mut self, api: &dyn AnalysisApi) -> SubmitOutcome {
        let Some(ticket) = self.begin_location_submit() else {
            return SubmitOutcome::Ignored;
        };
        let result = api
            .submit_identity(&self.form.name, &self.form.location)
            .await;
        self.finish_location_submit(ticket, result)
    }

    /// Submit on whichever form slide is showing.
    pub async fn submit_form(&mut self, api: &dyn AnalysisApi) -> SubmitOutcome {
        match self.current_slide().custom_component {
            Some(CustomComponent::NameForm) => self.submit_name(),
            Some(CustomComponent::LocationForm) => self.submit_location(api).await,
            _ => SubmitOutcome::Ignored,
        }
    }

    // --- Capture ---

    pub fn request_capture(&mut self, source: CaptureSource) -> bool {
        self.capture.request(source)
    }

    pub fn allow_capture(&mut self, now_ms: u64) -> bool {
        self.capture.allow(now_ms)
    }

    pub fn deny_capture(&mut self) -> bool {
        self.capture.deny()
    }

    pub fn camera_unavailable(&mut self, message: &str) {
        self.capture.camera_unavailable(message);
    }

    pub fn close_capture(&mut self) -> bool {
        self.capture.close()
    }

    pub fn retake(&mut self) {
        self.capture.retake();
    }

    pub fn begin_upload(&mut self) -> Option<RequestTicket> {
        if !self.navigator.guard().is_idle() || !self.capture.begin_upload() {
            return None;
        }
        Some(self.ticket())
    }

    /// Applies the analysis response. `now_ms` is when the response arrived;
    /// the preparing screen runs from there. `Err` carries the message for
    /// the capture screen.
    pub fn finish_upload(
        &mut self,
        ticket: RequestTicket,
        result: Result<AnalysisResult, ApiError>,
        now_ms: u64,
    ) -> std::result::Result<(), String> {
        if !self.is_current(&ticket) {
            warn!("Discarding analysis response for a slide the user already left");
            return Err("Analysis discarded".to_string());
        }

        match result {
            Ok(data) => {
                debug!("Analysis stored");
                self.analysis = Some(data);
                self.selections.reset_entries();
                self.capture.upload_succeeded(now_ms);
                Ok(())
            }
            Err(e) => {
                let message = e.upload_message();
                warn!("{}", message);
                self.capture.upload_failed(&message);
                Err(message)
            }
        }
    }

    /// Sends a captured or picked image. Accepts a data URI or a bare payload.
    /// `clock` is read once the response is in.
    pub async fn upload_image(
        &mut self,
        api: &dyn AnalysisApi,
        image: &str,
        clock: impl Fn() -> u64,
    ) -> std::result::Result<(), String> {
        let payload = normalize_base64_image(image).map_err(|e| e.to_string())?;
        let Some(ticket) = self.begin_upload() else {
            return Err("Capture is not ready".to_string());
        };
        let result = api.upload_image(&payload).await;
        self.finish_upload(ticket, result, clock())
    }

    // --- Selection ---

    pub fn select_category(&mut self, category: Category) {
        self.active_category = category;
    }

    pub fn select_entry(&mut self, label: &str) {
        self.selections.select_entry(self.active_category.index(), label);
    }

    pub fn displayed_entry(&self, category: Category) -> Option<DisplayedEntry<'_>> {
        let analysis = self.analysis.as_ref()?;
        self.selections
            .displayed_entry(category.index(), analysis.mapping(category))
    }

    pub fn select_concern(&mut self, index: usize) {
        if crate::services::concerns::concern(index).is_some() {
            self.active_concern = index;
        }
    }

    pub fn reset_selections(&mut self) {
        self.selections.reset_entries();
    }

    pub async fn confirm_selections(&self, storage: &dyn Storage) -> Result<ConfirmedSelections> {
        self.selections.confirm_selections(storage).await
    }

    /// RESET button: clears overrides, then follows the button's target if any.
    pub fn press_reset(&mut self) -> NavOutcome {
        self.reset_selections();
        self.navigate(NavAction::Reset)
    }

    /// CONFIRM button: stores the snapshot, then follows the button's target if any.
    pub async fn press_confirm(&mut self, storage: &dyn Storage) -> Result<NavOutcome> {
        self.confirm_selections(storage).await?;
        Ok(self.follow_confirm())
    }

    /// Navigation half of CONFIRM, for callers that store the snapshot themselves.
    pub fn follow_confirm(&mut self) -> NavOutcome {
        self.navigate(NavAction::Confirm)
    }
}
