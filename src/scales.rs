use std::fmt::Write;

pub const FEELING_SCALE: [(u8, &str); 5] = [
    (1, "A bit sick"),
    (2, "Not great"),
    (3, "Not good, not bad"),
    (4, "Feeling good"),
    (5, "I am buzzing"),
];

/// BORG CR-10 descriptors used for the post-training RPE rating.
pub const BORG_SCALE: [(u8, &str); 10] = [
    (1, "Very light"),
    (2, "Light"),
    (3, "Moderate"),
    (4, "Somewhat hard"),
    (5, "Hard"),
    (6, "Harder"),
    (7, "Very hard"),
    (8, "Very, very hard"),
    (9, "Near maximal"),
    (10, "Maximal effort"),
];

pub fn feeling_label(value: i64) -> Option<&'static str> {
    FEELING_SCALE
        .iter()
        .find(|(score, _)| i64::from(*score) == value)
        .map(|(_, label)| *label)
}

pub fn borg_label(value: i64) -> Option<&'static str> {
    BORG_SCALE
        .iter()
        .find(|(score, _)| i64::from(*score) == value)
        .map(|(_, label)| *label)
}

pub fn render_scales() -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Pre-Training Feeling");
    for (score, label) in FEELING_SCALE.iter() {
        let _ = writeln!(output, "- {score}: {label}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "# BORG Scale (RPE 1-10)");
    for (score, label) in BORG_SCALE.iter() {
        let _ = writeln!(output, "- {score}: {label}");
    }

    output
}
