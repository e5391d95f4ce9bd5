//! Text normalization: headers, slugs, locale-ambiguous numbers

use bigdecimal::{BigDecimal, ToPrimitive};
use regex::Regex;
use std::str::FromStr;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

/// Slug used when a name has no usable characters
pub const FALLBACK_SLUG: &str = "sin-categoria";

static WHITESPACE_RUN: OnceLock<Regex> = OnceLock::new();
static NON_SLUG_RUN: OnceLock<Regex> = OnceLock::new();

fn whitespace_run() -> &'static Regex {
    WHITESPACE_RUN.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn non_slug_run() -> &'static Regex {
    NON_SLUG_RUN.get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap())
}

/// Decompose accented characters and drop everything outside ASCII
fn fold_to_ascii(value: &str) -> String {
    value.nfkd().filter(char::is_ascii).collect()
}

/// Normalize a header cell: accents stripped, lowercase, single spaces, trimmed.
///
/// "  Categoría   Primaria " becomes "categoria primaria".
pub fn normalize_header(value: &str) -> String {
    let folded = fold_to_ascii(value).to_lowercase();
    whitespace_run()
        .replace_all(folded.trim(), " ")
        .into_owned()
}

/// Build a URL-safe slug from free text.
///
/// Empty results fall back to [`FALLBACK_SLUG`].
pub fn slugify(value: &str) -> String {
    let folded = fold_to_ascii(value).to_lowercase();
    let slug = non_slug_run().replace_all(&folded, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// Parse a price-like number written with either decimal convention.
///
/// When both `.` and `,` appear the dot is a thousands separator and the comma
/// the decimal point ("1.234,56"). A lone comma is a decimal point. A lone dot
/// is left alone, so "1.234" is 1.234. Anything unparseable yields `None`.
///
/// Precision is unbounded: every digit written in the cell is kept.
pub fn parse_decimal(value: &str) -> Option<BigDecimal> {
    let mut text: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    if text.is_empty() {
        return None;
    }

    if text.contains('.') && text.contains(',') {
        text = text.replace('.', "").replace(',', ".");
    } else if text.contains(',') {
        text = text.replace(',', ".");
    }

    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if matches!(cleaned.as_str(), "" | "-" | "." | "-.") {
        return None;
    }

    BigDecimal::from_str(&canonical_number(&cleaned)?).ok()
}

/// Shape-check `-?digits[.digits]` and fill in the digits a bare dot omits
fn canonical_number(cleaned: &str) -> Option<String> {
    let (negative, unsigned) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (unsigned, ""),
    };

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return None;
    }
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }

    let mut number = String::with_capacity(cleaned.len() + 1);
    if negative {
        number.push('-');
    }
    number.push_str(if int_part.is_empty() { "0" } else { int_part });
    if !frac_part.is_empty() {
        number.push('.');
        number.push_str(frac_part);
    }
    Some(number)
}

/// Parse an integer, truncating any fractional part toward zero
pub fn parse_int(value: &str) -> Option<i64> {
    parse_decimal(value)?.with_scale(0).to_i64()
}

/// First candidate that is non-empty after trimming, returned trimmed
pub fn pick_first<'a, I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}
