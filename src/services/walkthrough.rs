use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Confirm, Select, Text};
use log::info;
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::core::capture::{CaptureSource, CaptureState};
use crate::core::config::Config;
use crate::core::io::Storage;
use crate::core::navigation::NavOutcome;
use crate::core::slides::{CustomComponent, Slide};
use crate::services::api::AnalysisApi;
use crate::services::concerns::{format_percentage, CONCERNS};
use crate::services::selection::{load_confirmed, Category};
use crate::services::session::{Session, SubmitOutcome};
use crate::utils::image::encode_image_file;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Choice {
    Back,
    Next,
    Reset,
    Confirm,
    Home,
    /// Tile on the categories slide that opens another slide.
    Link(String),
    Category(Category),
    Concern(usize),
    Restart,
    Quit,
}

struct Labelled<T> {
    choice: T,
    label: String,
}

impl<T> Labelled<T> {
    fn new(choice: T, label: &str) -> Self {
        Self {
            choice,
            label: label.to_string(),
        }
    }
}

impl<T> fmt::Display for Labelled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Terminal rendition of the onboarding flow. Timers run on the wall clock
/// measured from the start of the walkthrough.
pub struct Walkthrough<'a> {
    session: Session,
    api: &'a dyn AnalysisApi,
    storage: &'a dyn Storage,
    started: Instant,
}

impl<'a> Walkthrough<'a> {
    pub fn new(config: &Config, api: &'a dyn AnalysisApi, storage: &'a dyn Storage) -> Self {
        Self {
            session: Session::new(config),
            api,
            storage,
            started: Instant::now(),
        }
    }

    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub async fn run(&mut self) -> Result<()> {
        if let Some(previous) = load_confirmed(self.storage).await? {
            println!("Previously confirmed selections: {:?}", previous);
        }

        loop {
            let slide = self.session.current_slide().clone();
            render(&slide, self.session.navigator().is_first());

            match slide.custom_component {
                Some(CustomComponent::NameForm) | Some(CustomComponent::LocationForm) => {
                    if self.form_step(&slide).await? {
                        continue;
                    }
                }
                Some(CustomComponent::ImageCapture) => {
                    if self.capture_step().await? {
                        continue;
                    }
                }
                Some(CustomComponent::Demographics) => self.print_demographics(),
                Some(CustomComponent::CosmeticConcerns) => {
                    print_concern(self.session.active_concern())
                }
                Some(CustomComponent::AnalysisCategories) | None => {}
            }

            let choice = self.choose(&slide)?;
            let nav = match choice {
                Choice::Quit => break,
                Choice::Back => self.session.go_back(),
                Choice::Next => self.session.go_next(),
                Choice::Home => self.session.go_home(),
                Choice::Link(target) => self.session.go_to_slide_id(&target),
                Choice::Reset => self.session.press_reset(),
                Choice::Confirm => {
                    let nav = self.session.press_confirm(self.storage).await?;
                    println!("Selections confirmed.");
                    nav
                }
                Choice::Category(category) => {
                    self.pick_entry(category)?;
                    NavOutcome::Unchanged
                }
                Choice::Concern(index) => {
                    self.session.select_concern(index);
                    NavOutcome::Unchanged
                }
                Choice::Restart => {
                    self.session.restart();
                    println!("Starting over.");
                    NavOutcome::Unchanged
                }
            };
            self.settle(nav).await?;
        }

        info!("Walkthrough finished");
        Ok(())
    }

    fn choose(&self, slide: &Slide) -> Result<Choice> {
        let options = actions(slide, self.session.navigator().is_first());
        let picked = Select::new("Choose an action:", options).prompt()?;
        Ok(picked.choice)
    }

    /// Returns true when the slide changed and the loop should redraw.
    async fn form_step(&mut self, slide: &Slide) -> Result<bool> {
        let is_name = slide.custom_component == Some(CustomComponent::NameForm);
        let prompt = if is_name {
            "Introduce Yourself"
        } else {
            "Where are you from?"
        };
        let value = Text::new(prompt)
            .with_help_message("Leave empty to pick another action")
            .prompt()?;
        if value.trim().is_empty() {
            return Ok(false);
        }
        if is_name {
            self.session.set_name(&value);
        } else {
            self.session.set_location(&value);
        }

        let spinner = spinner("Processing submission ...");
        let outcome = self.session.submit_form(self.api).await;
        spinner.finish_and_clear();
        match outcome {
            SubmitOutcome::NameStored(_) => Ok(true),
            SubmitOutcome::Submitted(_) => {
                println!("Thank you! Proceed for the next step");
                Ok(true)
            }
            SubmitOutcome::Failed(message) => {
                println!("{}", message);
                Ok(false)
            }
            SubmitOutcome::Ignored | SubmitOutcome::Stale => Ok(false),
        }
    }

    /// Returns true when the analysis finished and the flow moved on.
    async fn capture_step(&mut self) -> Result<bool> {
        let options = vec![
            Labelled::new(Some(CaptureSource::Camera), "Allow A.I. to scan your face"),
            Labelled::new(Some(CaptureSource::Gallery), "Allow A.I. access gallery"),
            Labelled::new(None, "Skip"),
        ];
        let picked = Select::new("Take a picture or upload one:", options).prompt()?;
        let Some(source) = picked.choice else {
            return Ok(false);
        };

        self.session.request_capture(source);
        let allowed = Confirm::new("ALLOW A.I. TO ACCESS YOUR CAMERA/GALLERY?")
            .with_default(true)
            .prompt()?;
        if !allowed {
            self.session.deny_capture();
            return Ok(false);
        }
        self.session.allow_capture(self.now_ms());

        if let CaptureState::CameraSetup { deadline_ms } = self.session.capture().state() {
            let deadline = *deadline_ms;
            self.wait_until(deadline, "SETTING UP CAMERA ...").await;
            self.session.tick(self.now_ms());
        }

        loop {
            let path = Text::new("Path to the image:").prompt()?;
            let image = match encode_image_file(Path::new(path.trim())).await {
                Ok(image) => image,
                Err(e) => {
                    println!("{:#}", e);
                    continue;
                }
            };

            let spinner = spinner("Uploading image ...");
            let started = self.started;
            let clock = move || started.elapsed().as_millis() as u64;
            let result = self.session.upload_image(self.api, &image, clock).await;
            spinner.finish_and_clear();

            match result {
                Ok(()) => break,
                Err(message) => {
                    println!("{}", message);
                    if !Confirm::new("Retake?").with_default(true).prompt()? {
                        self.session.close_capture();
                        return Ok(false);
                    }
                    self.session.retake();
                }
            }
        }

        if let Some(deadline) = self.session.capture().deadline_ms() {
            self.wait_until(deadline, "PREPARING YOUR ANALYSIS ...").await;
        }
        let tick = self.session.tick(self.now_ms());
        Ok(matches!(tick.navigation, NavOutcome::Moved { .. }))
    }

    fn print_demographics(&self) {
        if self.session.analysis().is_none() {
            println!("No analysis yet.");
            return;
        }
        for category in Category::ALL {
            match self.session.displayed_entry(category) {
                Some(entry) => println!(
                    "{:<8} {} {}",
                    category.title(),
                    entry.label.to_uppercase(),
                    entry.confidence.map(format_percentage).unwrap_or_default()
                ),
                None => println!("{:<8} -", category.title()),
            }
        }
    }

    fn pick_entry(&mut self, category: Category) -> Result<()> {
        self.session.select_category(category);
        let Some(analysis) = self.session.analysis() else {
            println!("No analysis yet.");
            return Ok(());
        };
        let mut labels: Vec<(String, f64)> = analysis
            .mapping(category)
            .iter()
            .map(|(label, confidence)| (label.clone(), *confidence))
            .collect();
        labels.sort_by(|a, b| b.1.total_cmp(&a.1));
        if labels.is_empty() {
            return Ok(());
        }

        let options: Vec<Labelled<String>> = labels
            .into_iter()
            .map(|(label, confidence)| {
                let text = format!("{} ({})", label, format_percentage(confidence));
                Labelled::new(label, &text)
            })
            .collect();
        let picked = Select::new("A.I. CONFIDENCE", options).prompt()?;
        self.session.select_entry(&picked.choice);
        Ok(())
    }

    /// Follows up a navigation that was held behind the leave dialog.
    async fn settle(&mut self, outcome: NavOutcome) -> Result<()> {
        if outcome != NavOutcome::Deferred {
            return Ok(());
        }
        let leave = Confirm::new("Are you sure you want to leave? Your information will not be saved.")
            .with_default(false)
            .prompt()?;
        if !leave {
            self.session.cancel_leave();
            return Ok(());
        }
        self.session.confirm_leave(self.now_ms());
        if let Some(deadline) = self.session.navigator().guard().deadline_ms() {
            self.wait_until(deadline, "Thank you for visiting. Goodbye!").await;
        }
        self.session.tick(self.now_ms());
        Ok(())
    }

    async fn wait_until(&self, deadline_ms: u64, message: &str) {
        let spinner = spinner(message);
        let now = self.now_ms();
        if deadline_ms > now {
            tokio::time::sleep(Duration::from_millis(deadline_ms - now)).await;
        }
        spinner.finish_and_clear();
    }
}

fn actions(slide: &Slide, is_first: bool) -> Vec<Labelled<Choice>> {
    let mut options = Vec::new();
    let mut push = |choice: Choice, label: &str| options.push(Labelled::new(choice, label));

    if let Some(b) = &slide.back_button {
        push(Choice::Back, &b.text);
    }
    if let Some(b) = &slide.next_button {
        push(Choice::Next, &b.text);
    }
    for link in &slide.links {
        // tiles without a target are decoration
        if let Some(target) = &link.navigate_to {
            push(Choice::Link(target.clone()), &link.text);
        }
    }
    match slide.custom_component {
        Some(CustomComponent::Demographics) => {
            for category in Category::ALL {
                push(Choice::Category(category), category.title());
            }
        }
        Some(CustomComponent::CosmeticConcerns) => {
            for (i, concern) in CONCERNS.iter().enumerate() {
                push(Choice::Concern(i), concern.label);
            }
        }
        _ => {}
    }
    if let Some(b) = &slide.reset_button {
        push(Choice::Reset, &b.text);
    }
    if let Some(b) = &slide.confirm_button {
        push(Choice::Confirm, &b.text);
    }
    if !is_first {
        push(Choice::Home, "SKINSTRIC (home)");
        push(Choice::Restart, "Start over");
    }
    push(Choice::Quit, "Quit");
    options
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn render(slide: &Slide, is_first: bool) {
    println!();
    if !is_first {
        println!("SKINSTRIC [ {} ]", slide.section_label());
    }
    if !slide.kicker.is_empty() {
        println!("{}", slide.kicker);
    }
    if !slide.title.is_empty() {
        println!("{}", slide.title);
    }
    if !slide.body.is_empty() {
        println!("{}", slide.body);
    }
}

fn print_concern(index: usize) {
    if let Some(concern) = CONCERNS.get(index) {
        let filled = ((concern.fraction() * 20.0).round() as usize).min(20);
        println!("{} {}", concern.label, concern.percentage);
        println!("[{}{}]", "#".repeat(filled), "-".repeat(20 - filled));
        println!("{}", concern.definition);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::slides::{
        SlideRegistry, CATEGORIES_SLIDE_ID, CONCERNS_SLIDE_ID, DEMOGRAPHICS_SLIDE_ID,
        INTRO_SLIDE_ID,
    };

    fn slide(id: &str) -> Slide {
        let registry = SlideRegistry::default();
        let index = registry.index_of(id).unwrap();
        registry.at(index).clone()
    }

    fn choices(slide: &Slide, is_first: bool) -> Vec<Choice> {
        actions(slide, is_first).into_iter().map(|l| l.choice).collect()
    }

    #[test]
    fn test_categories_offer_both_analysis_slides() {
        let offered = choices(&slide(CATEGORIES_SLIDE_ID), false);
        assert!(offered.contains(&Choice::Link(DEMOGRAPHICS_SLIDE_ID.to_string())));
        assert!(offered.contains(&Choice::Link(CONCERNS_SLIDE_ID.to_string())));

        let mut session = Session::new(&Config::default());
        session.go_to_slide_id(CATEGORIES_SLIDE_ID);
        assert!(matches!(
            session.go_to_slide_id(CONCERNS_SLIDE_ID),
            NavOutcome::Moved { .. }
        ));
        assert_eq!(session.current_slide().id, CONCERNS_SLIDE_ID);
    }

    #[test]
    fn test_restart_offered_away_from_intro() {
        assert!(!choices(&slide(INTRO_SLIDE_ID), true).contains(&Choice::Restart));

        let offered = choices(&slide(CONCERNS_SLIDE_ID), false);
        assert!(offered.contains(&Choice::Restart));
        assert_eq!(offered.iter().filter(|c| matches!(c, Choice::Concern(_))).count(), 8);
        assert_eq!(offered.last(), Some(&Choice::Quit));
    }

    #[test]
    fn test_labelled_shows_label_only() {
        let option = Labelled::new(Some(CaptureSource::Gallery), "Allow A.I. access gallery");
        assert_eq!(option.to_string(), "Allow A.I. access gallery");
        assert_eq!(option.choice, Some(CaptureSource::Gallery));
    }
}
