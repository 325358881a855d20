//! Cell-to-SQL coercions.
//!
//! Sheet cells are display strings; the mirror's columns are typed. Every
//! coercion here answers `None` for anything it cannot read so the bind
//! becomes SQL NULL instead of failing the insert.

use chrono::NaiveTime;

/// Trimmed value, `None` when blank
pub(crate) fn non_empty(value: &str) -> Option<&str> {
    let text = value.trim();
    if text.is_empty() { None } else { Some(text) }
}

/// `HH:MM` (seconds ignored) or bare `HHMM`
pub(crate) fn coerce_time(value: &str) -> Option<NaiveTime> {
    let text = value.trim();
    if let Some((hours, rest)) = text.split_once(':') {
        let minutes = rest.split(':').next().unwrap_or_default();
        return NaiveTime::from_hms_opt(hours.parse().ok()?, minutes.parse().ok()?, 0);
    }
    if text.len() == 4 && text.chars().all(|c| c.is_ascii_digit()) {
        return NaiveTime::from_hms_opt(text[..2].parse().ok()?, text[2..].parse().ok()?, 0);
    }
    None
}

/// Integer, tolerating a float rendering like `2.0`
pub(crate) fn coerce_int(value: &str) -> Option<i32> {
    let text = value.trim();
    if text.is_empty() {
        return None;
    }
    if text.contains('.') {
        return text.parse::<f64>().ok().map(|f| f.trunc() as i32);
    }
    text.parse().ok()
}

/// Sim/Não answer families to a boolean
pub(crate) fn coerce_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "sim" | "s" | "yes" | "true" | "1" => Some(true),
        "não" | "nao" | "n" | "no" | "false" | "0" => Some(false),
        _ => None,
    }
}
