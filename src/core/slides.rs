use anyhow::{bail, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const INTRO_SLIDE_ID: &str = "000";
pub const NAME_SLIDE_ID: &str = "002";
pub const LOCATION_SLIDE_ID: &str = "504";
pub const CAPTURE_SLIDE_ID: &str = "003";
pub const CATEGORIES_SLIDE_ID: &str = "004";
pub const DEMOGRAPHICS_SLIDE_ID: &str = "005";
pub const CONCERNS_SLIDE_ID: &str = "006";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ButtonConfig {
    pub text: String,
    #[serde(default)]
    pub navigate_to: Option<String>,
}

impl ButtonConfig {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            navigate_to: None,
        }
    }

    fn to(text: &str, target: &str) -> Self {
        Self {
            text: text.to_string(),
            navigate_to: Some(target.to_string()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FooterContent {
    #[default]
    Text,
    Button,
    Both,
    None,
}

impl FooterContent {
    pub fn shows_text(self) -> bool {
        matches!(self, FooterContent::Text | FooterContent::Both)
    }

    pub fn shows_back_button(self) -> bool {
        matches!(self, FooterContent::Button | FooterContent::Both)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Center,
    Left,
    Right,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CustomComponent {
    NameForm,
    LocationForm,
    ImageCapture,
    AnalysisCategories,
    Demographics,
    CosmeticConcerns,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Slide {
    pub id: String,
    #[serde(default)]
    pub kicker: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub text_align: TextAlign,
    pub back_button: Option<ButtonConfig>,
    pub next_button: Option<ButtonConfig>,
    pub reset_button: Option<ButtonConfig>,
    pub confirm_button: Option<ButtonConfig>,
    #[serde(default)]
    pub footer_content: FooterContent,
    pub custom_component: Option<CustomComponent>,
    /// In-body tiles; a tile without a target is shown disabled.
    #[serde(default)]
    pub links: Vec<ButtonConfig>,
}

impl Slide {
    fn new(id: &str, kicker: &str, title: &str, body: &str) -> Self {
        Self {
            id: id.to_string(),
            kicker: kicker.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            text_align: TextAlign::Center,
            back_button: None,
            next_button: None,
            reset_button: None,
            confirm_button: None,
            footer_content: FooterContent::Text,
            custom_component: None,
            links: Vec::new(),
        }
    }

    /// Header breadcrumb for the slide.
    pub fn section_label(&self) -> &'static str {
        match self.custom_component {
            Some(CustomComponent::AnalysisCategories)
            | Some(CustomComponent::Demographics)
            | Some(CustomComponent::CosmeticConcerns) => "ANALYSIS",
            _ => "INTRO",
        }
    }

    /// Every explicit target, buttons first, then tiles.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        [
            &self.back_button,
            &self.next_button,
            &self.reset_button,
            &self.confirm_button,
        ]
        .into_iter()
        .filter_map(|b| b.as_ref())
        .chain(self.links.iter())
        .filter_map(|b| b.navigate_to.as_deref())
    }

    pub fn is_form(&self) -> bool {
        matches!(
            self.custom_component,
            Some(CustomComponent::NameForm) | Some(CustomComponent::LocationForm)
        )
    }
}

/// Ordered, immutable set of slides. Ids are unique and the list is never empty.
#[derive(Debug, Clone)]
pub struct SlideRegistry {
    slides: Vec<Slide>,
}

impl SlideRegistry {
    pub fn new(slides: Vec<Slide>) -> Result<Self> {
        if slides.is_empty() {
            bail!("Slide registry must contain at least one slide");
        }

        let mut seen = HashSet::new();
        for slide in &slides {
            if !seen.insert(slide.id.as_str()) {
                bail!("Duplicate slide id: {}", slide.id);
            }
        }

        for slide in &slides {
            for target in slide.targets() {
                if !seen.contains(target) {
                    warn!("Slide {} points at unknown slide id {}", slide.id, target);
                }
            }
        }

        Ok(Self { slides })
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.slides.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&Slide> {
        self.slides.get(index)
    }

    /// Slide at `index`, clamped to the last slide.
    pub fn at(&self, index: usize) -> &Slide {
        &self.slides[index.min(self.last_index())]
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.slides.iter().position(|s| s.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Slide> {
        self.slides.iter()
    }
}

impl Default for SlideRegistry {
    fn default() -> Self {
        Self {
            slides: default_slides(),
        }
    }
}

pub fn default_slides() -> Vec<Slide> {
    let mut intro = Slide::new(INTRO_SLIDE_ID, "", "Sophisticated skincare", "");
    intro.back_button = Some(ButtonConfig::new("DISCOVER A.I."));
    intro.next_button = Some(ButtonConfig::to("TAKE TEST", "001"));

    let mut primer = Slide::new(
        "001",
        "A.I. ANALYSIS",
        "Skintrinsic test",
        "A.I. will ask you a few questions and analyse a photo of your face.",
    );
    primer.back_button = Some(ButtonConfig::to("BACK", INTRO_SLIDE_ID));
    primer.next_button = Some(ButtonConfig::new("PROCEED"));

    let mut name = Slide::new(NAME_SLIDE_ID, "TO START ANALYSIS", "", "Introduce Yourself");
    name.back_button = Some(ButtonConfig::to("BACK", INTRO_SLIDE_ID));
    name.custom_component = Some(CustomComponent::NameForm);

    let mut location = Slide::new(LOCATION_SLIDE_ID, "TO START ANALYSIS", "", "Where are you from?");
    location.back_button = Some(ButtonConfig::to("BACK", NAME_SLIDE_ID));
    location.custom_component = Some(CustomComponent::LocationForm);

    let mut capture = Slide::new(CAPTURE_SLIDE_ID, "TO START ANALYSIS", "", "");
    capture.back_button = Some(ButtonConfig::to("BACK", NAME_SLIDE_ID));
    capture.footer_content = FooterContent::None;
    capture.custom_component = Some(CustomComponent::ImageCapture);

    let mut categories = Slide::new(
        CATEGORIES_SLIDE_ID,
        "A.I. ANALYSIS",
        "",
        "A.I. has estimated the following. Fix estimated information if needed.",
    );
    categories.text_align = TextAlign::Left;
    categories.back_button = Some(ButtonConfig::to("BACK", CAPTURE_SLIDE_ID));
    categories.next_button = Some(ButtonConfig::to("GET SUMMARY", DEMOGRAPHICS_SLIDE_ID));
    categories.footer_content = FooterContent::None;
    categories.custom_component = Some(CustomComponent::AnalysisCategories);
    categories.links = vec![
        ButtonConfig::to("DEMOGRAPHICS", DEMOGRAPHICS_SLIDE_ID),
        ButtonConfig::to("COSMETIC CONCERNS", CONCERNS_SLIDE_ID),
        ButtonConfig::new("SKIN TYPE DETAILS"),
        ButtonConfig::new("WEATHER"),
    ];

    let mut demographics = Slide::new(
        DEMOGRAPHICS_SLIDE_ID,
        "A.I. ANALYSIS",
        "DEMOGRAPHICS",
        "PREDICTED RACE & AGE",
    );
    demographics.text_align = TextAlign::Left;
    demographics.back_button = Some(ButtonConfig::to("BACK", CATEGORIES_SLIDE_ID));
    demographics.reset_button = Some(ButtonConfig::new("RESET"));
    demographics.confirm_button = Some(ButtonConfig::new("CONFIRM"));
    demographics.footer_content = FooterContent::Button;
    demographics.custom_component = Some(CustomComponent::Demographics);

    let mut concerns = Slide::new(
        CONCERNS_SLIDE_ID,
        "A.I. ANALYSIS",
        "COSMETIC CONCERNS",
        "PREDICTED SKIN CONDITIONS",
    );
    concerns.text_align = TextAlign::Left;
    concerns.back_button = Some(ButtonConfig::to("BACK", CATEGORIES_SLIDE_ID));
    concerns.footer_content = FooterContent::Button;
    concerns.custom_component = Some(CustomComponent::CosmeticConcerns);

    vec![
        intro,
        primer,
        name,
        location,
        capture,
        categories,
        demographics,
        concerns,
    ]
}
