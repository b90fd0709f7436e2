use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub fn format_count(count: u64) -> String {
    const UNITS: [&str; 3] = ["", "k", "M"];

    let mut value = count as f64;
    let mut unit = 0usize;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }

    if unit == 0 {
        count.to_string()
    } else {
        format!("{value:.1}{}", UNITS[unit])
    }
}

pub fn short_title(title: &str, max_chars: usize) -> String {
    if title.chars().count() <= max_chars {
        return title.to_owned();
    }

    let mut short = title
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    short.push('…');
    short
}

pub fn stable_hash(id: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    hasher.finish()
}

/// Maps an id onto `[0, 1]`; equal ids always land on the same value.
pub fn stable_unit(id: &str) -> f32 {
    let hash = stable_hash(id);
    ((hash >> 11) as f64 / (1u64 << 53) as f64) as f32
}

pub fn stable_pair(id: &str) -> (f32, f32) {
    let hash = stable_hash(id);

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}

/// Symmetric offset in `[-amplitude, amplitude]` used to spread nodes that
/// share a category lane.
pub fn lane_jitter(id: &str, amplitude: f32) -> f32 {
    ((stable_unit(id) * 2.0) - 1.0) * amplitude
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_values_repeat_for_same_id() {
        assert_eq!(stable_pair("W2741809807"), stable_pair("W2741809807"));
        assert_eq!(stable_unit("W2741809807"), stable_unit("W2741809807"));
        assert_ne!(stable_unit("W1"), stable_unit("W2"));
    }

    #[test]
    fn stable_unit_stays_in_range() {
        for index in 0..500 {
            let value = stable_unit(&format!("paper-{index}"));
            assert!((0.0..=1.0).contains(&value), "{value}");
        }
    }

    #[test]
    fn lane_jitter_respects_amplitude() {
        for index in 0..500 {
            let jitter = lane_jitter(&format!("paper-{index}"), 0.35);
            assert!(jitter.abs() <= 0.35 + f32::EPSILON, "{jitter}");
        }
    }

    #[test]
    fn format_count_uses_suffixes() {
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(12_300), "12.3k");
        assert_eq!(format_count(4_500_000), "4.5M");
    }

    #[test]
    fn short_title_truncates_on_chars() {
        assert_eq!(short_title("Attention", 20), "Attention");
        assert_eq!(short_title("Attention Is All You Need", 10), "Attention…");
    }
}
