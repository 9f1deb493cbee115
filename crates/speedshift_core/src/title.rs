//! Song title derivation from existing tags.
//!
//! Many files carry a combined `"Artist - Title"` string in their title tag
//! even when a separate artist tag exists. The output title should be just
//! the track name plus a speed annotation, so the artist is stripped using
//! an ordered cascade of strategies:
//!
//! 1. **Delimited**: title starts with `artist + sep` or ends with
//!    `sep + artist`, for each separator in [`SEPARATORS`] order.
//! 2. **Prefix**: title starts with the artist followed by a
//!    whitespace/separator run.
//! 3. **Split**: title splits on a separator and one side equals the
//!    artist; otherwise the longer side wins when the shorter one is short
//!    enough to be a name.
//! 4. **After separator**: everything after the first separator. Only
//!    reached when an artist is known and both split sides are long.
//!
//! The first strategy producing a non-blank title that differs from the
//! input wins. A final pass removes any artist occurrence still left in the
//! result. Without an artist, or when the title has no separator and no
//! artist prefix, the title passes through unchanged.
//!
//! Matching is case-insensitive throughout. The split heuristic and the
//! final removal pass are heuristics and can misfire on titles that really
//! contain the artist name (e.g. "Killer Queen" by Queen).

use std::path::Path;

use crate::models::SpeedFactor;
use crate::naming::{clean_stem, strip_speed_tags, with_speed_tag};

/// Artist/title separators, widest first so `" - "` wins over `"-"`.
pub const SEPARATORS: &[&str] = &[
    " - ", " – ", " — ", // dashes with spaces
    " : ", ": ", " | ", " / ", // other separators
    "- ", "– ", "— ", // dash, space on the right
    " -", " –", " —", // dash, space on the left
    ":", "|", "/", // bare
];

/// Characters stripped when they are left dangling at the start of a title.
const SEPARATOR_CHARS: &[char] = &['-', '–', '—', ':', '|', '/'];

/// A split part shorter than this is taken to be an artist name.
const ARTIST_LIKE_MAX_CHARS: usize = 30;

/// A strategy gets `(clean title, artist)` and returns the derived title or
/// `None` when it does not apply.
type Strategy = fn(&str, &str) -> Option<String>;

/// Strategies in priority order.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("delimited", strip_delimited_artist),
    ("prefix", strip_artist_prefix),
    ("split", split_on_separator),
    ("after-separator", take_after_first_separator),
];

/// Derive the bare song title (no speed tag) from a title tag and an
/// optional artist.
pub fn derive_song_title(existing_title: &str, artist: &str) -> String {
    let title = strip_speed_tags(existing_title);
    let artist = artist.trim();
    if artist.is_empty() {
        return title;
    }

    let derived = STRATEGIES.iter().find_map(|(name, strategy)| {
        let candidate = accept(&title, strategy(&title, artist))?;
        tracing::debug!("Title strategy '{}' matched: '{}' -> '{}'", name, title, candidate);
        Some(candidate)
    });

    match derived {
        Some(candidate) => remove_remaining_artist(&candidate, artist).unwrap_or(candidate),
        None => title,
    }
}

/// Derive the title tag to write for a processed file.
///
/// Uses the existing title when present; otherwise the stem of the
/// submitted file name. Returns `None` when neither yields anything, in
/// which case no title tag is written.
pub fn derive_output_title(
    existing_title: Option<&str>,
    artist: Option<&str>,
    factor: SpeedFactor,
    filename_hint: Option<&str>,
) -> Option<String> {
    let from_tag = existing_title
        .filter(|t| !t.trim().is_empty())
        .map(|t| derive_song_title(t, artist.unwrap_or("")))
        .filter(|t| !t.is_empty());

    let from_hint = || {
        filename_hint
            .and_then(|name| Path::new(name).file_stem()?.to_str().map(clean_stem))
            .filter(|t| !t.is_empty())
    };

    from_tag
        .or_else(from_hint)
        .map(|title| with_speed_tag(&title, factor))
}

/// Keep a candidate only if it is non-blank and actually changed the title.
fn accept(title: &str, candidate: Option<String>) -> Option<String> {
    candidate
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty() && c != title)
}

/// `"Artist - Title"` or `"Title - Artist"` with an exact separator.
fn strip_delimited_artist(title: &str, artist: &str) -> Option<String> {
    for sep in SEPARATORS {
        let leading = format!("{}{}", artist, sep);
        if let Some(rest) = strip_prefix_ignore_case(title, &leading) {
            if !rest.trim().is_empty() {
                return Some(rest.trim().to_string());
            }
        }

        let trailing = format!("{}{}", sep, artist);
        if let Some(head) = strip_suffix_ignore_case(title, &trailing) {
            if !head.trim().is_empty() {
                return Some(head.trim().to_string());
            }
        }
    }
    None
}

/// Title starts with the artist, followed by whitespace or separators.
///
/// Unlike a plain prefix match, the artist must end on a word boundary, so
/// "Sia" leaves "Siamese Dream" alone.
fn strip_artist_prefix(title: &str, artist: &str) -> Option<String> {
    let rest = strip_prefix_ignore_case(title, artist)?;

    // "Sia" must not eat the start of "Siamese Dream".
    let at_boundary = rest
        .chars()
        .next()
        .map_or(true, |c| c.is_whitespace() || SEPARATOR_CHARS.contains(&c));
    if !at_boundary {
        return None;
    }

    Some(trim_leading_residue(rest).to_string())
}

/// Split on the first separator whose parts look like artist and title.
fn split_on_separator(title: &str, artist: &str) -> Option<String> {
    SEPARATORS.iter().find_map(|sep| {
        let (left, right) = title.split_once(sep)?;
        let (left, right) = (left.trim(), right.trim());
        if left.is_empty() || right.is_empty() {
            return None;
        }

        if eq_ignore_case(left, artist) {
            return Some(right.to_string());
        }
        if eq_ignore_case(right, artist) {
            return Some(left.to_string());
        }

        // Equal lengths read as "Artist - Title".
        let (left_len, right_len) = (left.chars().count(), right.chars().count());
        let (shorter, longer) = if left_len > right_len {
            (right_len, left)
        } else {
            (left_len, right)
        };
        (shorter < ARTIST_LIKE_MAX_CHARS).then(|| longer.to_string())
    })
}

/// Everything after the first separator found.
fn take_after_first_separator(title: &str, _artist: &str) -> Option<String> {
    SEPARATORS.iter().find_map(|sep| {
        let (_, right) = title.split_once(sep)?;
        let right = right.trim();
        (!right.is_empty()).then(|| right.to_string())
    })
}

/// Remove an artist occurrence still present in a derived title.
///
/// Returns `None` if the artist is absent or removing it leaves nothing.
fn remove_remaining_artist(title: &str, artist: &str) -> Option<String> {
    let (start, end) = find_ignore_case(title, artist)?;
    let joined = format!("{}{}", &title[..start], &title[end..]);
    let cleaned = trim_leading_residue(joined.trim()).trim_end();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// Strip whitespace and separator characters from the start.
fn trim_leading_residue(text: &str) -> &str {
    text.trim_start_matches(|c: char| c.is_whitespace() || SEPARATOR_CHARS.contains(&c))
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars().count() == b.chars().count()
        && a.chars().zip(b.chars()).all(|(x, y)| chars_eq_ignore_case(x, y))
}

/// Case-insensitive `strip_prefix`, char by char so non-ASCII names work.
fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let mut end = 0;
    let mut text_chars = text.char_indices();
    for p in prefix.chars() {
        match text_chars.next() {
            Some((i, t)) if chars_eq_ignore_case(t, p) => end = i + t.len_utf8(),
            _ => return None,
        }
    }
    Some(&text[end..])
}

/// Case-insensitive `strip_suffix`.
fn strip_suffix_ignore_case<'a>(text: &'a str, suffix: &str) -> Option<&'a str> {
    let mut start = text.len();
    let mut text_chars = text.char_indices().rev();
    for s in suffix.chars().rev() {
        match text_chars.next() {
            Some((i, t)) if chars_eq_ignore_case(t, s) => start = i,
            _ => return None,
        }
    }
    Some(&text[..start])
}

/// Byte range of the first case-insensitive occurrence of `needle`.
fn find_ignore_case(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    if needle.is_empty() {
        return None;
    }
    haystack.char_indices().find_map(|(i, _)| {
        let rest = strip_prefix_ignore_case(&haystack[i..], needle)?;
        Some((i, haystack.len() - rest.len()))
    })
}
