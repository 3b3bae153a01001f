/// A cosmetic concern shown on the concerns slide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Concern {
    pub label: &'static str,
    pub definition: &'static str,
    pub percentage: &'static str,
}

pub const CONCERNS: [Concern; 8] = [
    Concern {
        label: "CROW'S FEET WRINKLE",
        definition: "Fine lines at the outer corners of the eyes caused by repetitive movement and collagen loss.",
        percentage: "98%",
    },
    Concern {
        label: "FROWN LINES",
        definition: "Vertical lines between the eyebrows that appear from muscle tension and expression patterns.",
        percentage: "32%",
    },
    Concern {
        label: "FOREHEAD LINES",
        definition: "Horizontal lines across the forehead linked to facial movement and skin elasticity decline.",
        percentage: "2%",
    },
    Concern {
        label: "SMILE LINES",
        definition: "Lines that form from the nose to the corners of the mouth, often deepening with age.",
        percentage: "0%",
    },
    Concern {
        label: "EYE BAGS",
        definition: "Puffiness beneath the eyes caused by fluid retention, fat displacement, or tissue laxity.",
        percentage: "46%",
    },
    Concern {
        label: "TEAR TROUGH DEPRESSION",
        definition: "A hollow under the eyes from volume loss that creates a sunken appearance.",
        percentage: "21%",
    },
    Concern {
        label: "UNDEREYE DARK CIRCLES",
        definition: "Darkened skin beneath the eyes due to pigmentation, vascular visibility, or shadowing.",
        percentage: "1%",
    },
    Concern {
        label: "UNDEREYE FAT PAD",
        definition: "A noticeable bulge under the eyes from protruding fat pads.",
        percentage: "0%",
    },
];

impl Concern {
    /// Share of the concern as a fraction, 0 when the table value is malformed.
    pub fn fraction(&self) -> f64 {
        parse_percentage(self.percentage).unwrap_or(0.0)
    }
}

pub fn concern(index: usize) -> Option<&'static Concern> {
    CONCERNS.get(index)
}

/// Whole-number percentage. Values above 1 are taken as already scaled.
pub fn format_percentage(value: f64) -> String {
    let normalized = if value > 1.0 { value } else { value * 100.0 };
    format!("{}%", normalized.round() as i64)
}

/// Parses `"46%"`, `"0.46"` or `"46"` into a fraction in `[0, 1]`.
pub fn parse_percentage(value: &str) -> Option<f64> {
    let has_percent = value.contains('%');
    let numeric: f64 = leading_float(&value.replace('%', ""))?;
    if has_percent {
        return Some(numeric / 100.0);
    }
    Some(if numeric > 1.0 { numeric / 100.0 } else { numeric })
}

// parseFloat semantics: longest numeric prefix after leading whitespace.
fn leading_float(value: &str) -> Option<f64> {
    let trimmed = value.trim_start();
    let mut end = 0;
    let mut seen_dot = false;
    let mut seen_digit = false;
    for (i, c) in trimmed.char_indices() {
        match c {
            '0'..='9' => {
                seen_digit = true;
                end = i + 1;
            }
            '.' if !seen_dot => seen_dot = true,
            '-' | '+' if i == 0 => {}
            _ => break,
        }
    }
    if !seen_digit {
        return None;
    }
    trimmed[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(0.456), "46%");
        assert_eq!(format_percentage(98.0), "98%");
        assert_eq!(format_percentage(1.0), "100%");
        assert_eq!(format_percentage(0.0), "0%");
    }

    #[test]
    fn test_parse_percentage() {
        assert_eq!(parse_percentage("46%"), Some(0.46));
        assert_eq!(parse_percentage("0.46"), Some(0.46));
        assert_eq!(parse_percentage("46"), Some(0.46));
        assert_eq!(parse_percentage(" 12.5 %"), Some(0.125));
        assert_eq!(parse_percentage("n/a"), None);
        assert_eq!(parse_percentage("%"), None);
    }

    #[test]
    fn test_table_percentages_parse() {
        for c in CONCERNS.iter() {
            let fraction = parse_percentage(c.percentage).unwrap();
            assert!((0.0..=1.0).contains(&fraction), "{}", c.label);
        }
        assert_eq!(concern(4).unwrap().label, "EYE BAGS");
        assert_eq!(concern(4).unwrap().fraction(), 0.46);
        assert_eq!(concern(3).unwrap().fraction(), 0.0);
        assert!(concern(8).is_none());
    }
}
