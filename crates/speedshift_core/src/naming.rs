//! Output file naming and speed annotations.
//!
//! A processed file is named `<stem><speed tag>_<+N>%.<ext>`, e.g.
//! `Song (Slowed)_-20%.mp3`. Names that already carry annotations are
//! cleaned first so reprocessing never stacks them.

use std::path::Path;

use crate::models::SpeedFactor;

/// Tag appended for factors below 1.0.
pub const SLOWED_TAG: &str = " (Slowed)";
/// Tag appended for factors above 1.0.
pub const SPEED_UP_TAG: &str = " (Speed Up)";

/// Annotation for a speed factor: slowed, sped up, or nothing at 1.0.
pub fn speed_tag(factor: SpeedFactor) -> &'static str {
    if factor.is_slowed() {
        SLOWED_TAG
    } else if factor.is_sped_up() {
        SPEED_UP_TAG
    } else {
        ""
    }
}

/// Remove every speed tag occurrence and trim.
pub fn strip_speed_tags(text: &str) -> String {
    text.replace(SLOWED_TAG, "")
        .replace(SPEED_UP_TAG, "")
        .trim()
        .to_string()
}

/// Append the speed tag for `factor` to an already clean title.
pub fn with_speed_tag(title: &str, factor: SpeedFactor) -> String {
    format!("{}{}", title, speed_tag(factor))
}

/// Percentage annotation, e.g. `_-20%` or `_+15%`; empty when the change
/// rounds to zero.
pub fn percent_suffix(factor: SpeedFactor) -> String {
    match factor.percent_change() {
        0 => String::new(),
        p => format!("_{:+}%", p),
    }
}

/// Strip one trailing `_<sign><digits>%` annotation, if present.
fn strip_percent_suffix(stem: &str) -> &str {
    let Some(body) = stem.strip_suffix('%') else {
        return stem;
    };
    let Some(idx) = body.rfind('_') else {
        return stem;
    };
    let number = &body[idx + 1..];
    let digits = number.strip_prefix(['+', '-']).unwrap_or("");
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        &stem[..idx]
    } else {
        stem
    }
}

/// Clean a file stem of earlier annotations.
pub fn clean_stem(stem: &str) -> String {
    strip_speed_tags(strip_percent_suffix(stem.trim()))
}

/// Derive the result file name from the submitted file name.
///
/// Prior speed tags and a trailing percentage annotation are removed from
/// the stem, then the tag and percentage for `factor` are appended. The
/// extension is preserved as given.
pub fn derive_output_name(original_filename: &str, factor: SpeedFactor) -> String {
    let path = Path::new(original_filename);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(original_filename);
    let suffix = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();

    format!(
        "{}{}{}{}",
        clean_stem(stem),
        speed_tag(factor),
        percent_suffix(factor),
        suffix
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(v: f64) -> SpeedFactor {
        SpeedFactor::new(v).unwrap()
    }

    #[test]
    fn slowed_name() {
        assert_eq!(derive_output_name("Song.mp3", f(0.8)), "Song (Slowed)_-20%.mp3");
    }

    #[test]
    fn sped_up_name() {
        assert_eq!(derive_output_name("Song.flac", f(1.2)), "Song (Speed Up)_+20%.flac");
    }

    #[test]
    fn identity_adds_nothing() {
        assert_eq!(derive_output_name("Song.wav", SpeedFactor::IDENTITY), "Song.wav");
    }

    #[test]
    fn naming_is_idempotent() {
        for factor in [0.5, 0.8, 1.0, 1.2, 2.0, 3.33] {
            let once = derive_output_name("My Track.mp3", f(factor));
            let twice = derive_output_name(&once, f(factor));
            assert_eq!(once, twice, "factor {}", factor);
        }
    }

    #[test]
    fn reprocessing_with_new_factor_replaces_annotations() {
        let first = derive_output_name("Song.mp3", f(0.8));
        assert_eq!(derive_output_name(&first, f(1.5)), "Song (Speed Up)_+50%.mp3");
    }

    #[test]
    fn name_without_extension() {
        assert_eq!(derive_output_name("voice memo", f(0.9)), "voice memo (Slowed)_-10%");
    }

    #[test]
    fn underscores_that_are_not_annotations_survive() {
        assert_eq!(strip_percent_suffix("track_01"), "track_01");
        assert_eq!(strip_percent_suffix("mix_100%"), "mix_100%");
        assert_eq!(strip_percent_suffix("mix_+5%"), "mix");
    }

    #[test]
    fn strip_tags_removes_all_occurrences() {
        assert_eq!(strip_speed_tags("A (Slowed) (Speed Up) (Slowed)"), "A");
    }
}
