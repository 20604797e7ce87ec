/*!
 * Language utilities for the translation pipeline.
 *
 * The session payload and the document's declared `lang` attribute both use
 * ISO 639-1 (2-letter) codes. User input may be a code ("fr") or an English
 * language name ("French"); this module normalizes both, with the special
 * cases the translation service expects.
 */

use anyhow::{anyhow, Result};
use isolang::Language;

/// Normalize a language name or code to an ISO 639-1 code
///
/// Accepts 2-letter codes, 3-letter codes, English language names and the
/// pseudo-language "auto" (source-side detection left to the service).
pub fn normalize_to_part1(input: &str) -> Result<String> {
    let normalized = input.trim().to_lowercase();

    if normalized.is_empty() {
        return Err(anyhow!("Empty language identifier"));
    }

    if normalized == "auto" {
        return Ok("auto".to_string());
    }

    // The service has no generic variants for these; pin the codes it offers
    match normalized.as_str() {
        "norwegian" | "no" => return Ok("nb".to_string()),
        "chinese" | "chinese (simplified)" => return Ok("zh".to_string()),
        "portuguese" => return Ok("pt".to_string()),
        "english" => return Ok("en".to_string()),
        _ => {}
    }

    if normalized.len() == 2 {
        if Language::from_639_1(&normalized).is_some() {
            return Ok(normalized);
        }
    } else if normalized.len() == 3 {
        if let Some(lang) = Language::from_639_3(&normalized) {
            if let Some(code) = lang.to_639_1() {
                return Ok(code.to_string());
            }
            return Err(anyhow!("No 2-letter code exists for language: {}", input));
        }
    }

    // Fall back to an English language name lookup
    if let Some(lang) = Language::from_name(&capitalize(&normalized)) {
        if let Some(code) = lang.to_639_1() {
            return Ok(code.to_string());
        }
    }

    Err(anyhow!("Unsupported language: {}", input))
}

/// Check if two language identifiers refer to the same language
pub fn languages_match(first: &str, second: &str) -> bool {
    match (normalize_to_part1(first), normalize_to_part1(second)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Get the English language name for a code or name
pub fn get_language_name(input: &str) -> Result<String> {
    let code = normalize_to_part1(input)?;
    if code == "auto" {
        return Ok("Auto".to_string());
    }
    let lang = Language::from_639_1(&code)
        .ok_or_else(|| anyhow!("Failed to resolve language from code: {}", code))?;
    Ok(lang.to_name().to_string())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
