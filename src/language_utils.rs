use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for prompt-facing language names
///
/// Languages may be configured either as ISO 639-1 / ISO 639-2 codes or as
/// plain names ("English", "Brazilian Portuguese"). Codes are resolved to
/// their English name because that is what the model is prompted with.
/// Language code type
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T (3-letter) code
    Part2T,
    /// ISO 639-2/B (3-letter) code
    Part2B,
}

// @const: ISO 639-2/B codes that differ from their ISO 639-2/T form
const PART2B_TO_PART2T: [(&str, &str); 18] = [
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

fn part2b_to_part2t(code: &str) -> Option<&'static str> {
    PART2B_TO_PART2T.iter()
        .find(|(b, _)| *b == code)
        .map(|(_, t)| *t)
}

/// Validate if a language code is a valid ISO 639-1 or ISO 639-2 code
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 {
        if Language::from_639_1(&normalized_code).is_some() {
            return Ok(LanguageCodeType::Part1);
        }
    } else if normalized_code.len() == 3 {
        if Language::from_639_3(&normalized_code).is_some() {
            return Ok(LanguageCodeType::Part2T);
        }
        if part2b_to_part2t(&normalized_code).is_some() {
            return Ok(LanguageCodeType::Part2B);
        }
    }

    Err(anyhow!("Invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 {
        if let Some(lang) = Language::from_639_1(&normalized_code) {
            return Ok(lang.to_639_3().to_string());
        }
    } else if normalized_code.len() == 3 {
        if Language::from_639_3(&normalized_code).is_some() {
            return Ok(normalized_code);
        }
        if let Some(part2t) = part2b_to_part2t(&normalized_code) {
            return Ok(part2t.to_string());
        }
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}

/// Resolve a configured language to the name used in prompts.
/// Codes become English names; anything else is taken as a name verbatim.
pub fn resolve_language_name(language: &str) -> Result<String> {
    let trimmed = language.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Language must not be empty"));
    }

    match validate_language_code(trimmed) {
        Ok(_) => get_language_name(trimmed),
        Err(_) => Ok(trimmed.to_string()),
    }
}

/// Short lowercase tag for file names: the ISO 639-1 code when the language
/// is known, otherwise a slug of the name
pub fn language_tag(language: &str) -> String {
    let trimmed = language.trim();
    if let Ok(part2t) = normalize_to_part2t(trimmed) {
        if let Some(lang) = Language::from_639_3(&part2t) {
            return lang.to_639_1().map(|c| c.to_string()).unwrap_or(part2t);
        }
    }

    let lowered = trimmed.to_lowercase();
    if let Some(lang) = Language::from_name(trimmed).or_else(|| Language::from_name(&capitalize(&lowered))) {
        if let Some(code) = lang.to_639_1() {
            return code.to_string();
        }
        return lang.to_639_3().to_string();
    }

    lowered
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
