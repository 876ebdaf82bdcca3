// src/render/mod.rs
//! Text rendering for chat delivery: battle cards, heartbeat notifications, command replies.

pub mod battle;
pub mod commands;
pub mod notification;

pub use battle::BattleReport;
pub use notification::format_notification;

/// Horizontal rule placed under every headline.
pub const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━";

/// Public site host used in deep links.
pub const WEB_HOST: &str = "moltarena.crosstoken.io";

/// Rating-style integer: rounded half away from zero; non-finite input renders as 0.
pub fn rounded(v: f64) -> i64 {
    if v.is_finite() {
        v.round() as i64
    } else {
        0
    }
}

/// Signed delta with an explicit `+` for positive values.
pub fn signed(delta: i64) -> String {
    if delta > 0 {
        format!("+{delta}")
    } else {
        delta.to_string()
    }
}

/// Fixed number of decimals with thousands separators, e.g. `1234567.5, 1` → `1,234,567.5`.
pub fn grouped(v: f64, decimals: usize) -> String {
    let v = if v.is_finite() { v } else { 0.0 };
    let body = format!("{:.*}", decimals, v.abs());
    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (body.as_str(), None),
    };

    let mut out = String::with_capacity(body.len() + body.len() / 3 + 1);
    if v < 0.0 && body.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }
    let len = int_part.len();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(f) = frac_part {
        out.push('.');
        out.push_str(f);
    }
    out
}

/// Quantity with thousands separators; whole numbers have no decimals, fractional ones
/// keep up to two.
pub fn quantity(v: f64) -> String {
    if !v.is_finite() || v.fract() == 0.0 {
        return grouped(v, 0);
    }
    let s = grouped(v, 2);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Percentage with one decimal place.
pub fn percent(v: f64) -> String {
    let v = if v.is_finite() { v } else { 0.0 };
    format!("{v:.1}%")
}
