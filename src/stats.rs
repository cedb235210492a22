use crate::models::{EntityCode, RankedEntity};
use std::collections::BTreeMap;

const PODIUM_SIZE: usize = 3;

/// Most clicked first; equal counts fall back to code order.
pub fn rank(clicks: &BTreeMap<EntityCode, u64>) -> Vec<RankedEntity> {
    let mut entries: Vec<(&EntityCode, u64)> =
        clicks.iter().map(|(code, count)| (code, *count)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    entries
        .into_iter()
        .enumerate()
        .map(|(index, (code, count))| RankedEntity {
            rank: index + 1,
            country_code: code.to_string(),
            count,
        })
        .collect()
}

/// Top three, or nothing while the leader has no clicks.
pub fn podium(clicks: &BTreeMap<EntityCode, u64>) -> Vec<RankedEntity> {
    let mut ranked = rank(clicks);
    if ranked.first().is_none_or(|leader| leader.count == 0) {
        return Vec::new();
    }
    ranked.truncate(PODIUM_SIZE);
    ranked
}

/// Short form for tight spaces: `999`, `1.5K`, `12M`, `3.4B`.
pub fn format_compact(value: u64) -> String {
    const UNITS: [(u64, &str); 3] = [(1_000_000_000, "B"), (1_000_000, "M"), (1_000, "K")];

    for (scale, suffix) in UNITS {
        if value >= scale {
            let scaled = format!("{:.1}", value as f64 / scale as f64);
            let trimmed = scaled.strip_suffix(".0").unwrap_or(&scaled);
            return format!("{trimmed}{suffix}");
        }
    }
    value.to_string()
}

/// Full digits grouped by dots: `1.234.567`.
pub fn group_thousands(value: u64) -> String {
    if value > 1_000_000_000_000_000 {
        return format_compact(value);
    }

    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clicks(entries: &[(&str, u64)]) -> BTreeMap<EntityCode, u64> {
        entries
            .iter()
            .map(|(raw, count)| (EntityCode::parse(raw).unwrap(), *count))
            .collect()
    }

    #[test]
    fn rank_orders_by_count_then_code() {
        let ranked = rank(&clicks(&[("US", 4), ("TR", 9), ("DE", 4), ("FR", 0)]));
        let order: Vec<_> = ranked
            .iter()
            .map(|entry| (entry.rank, entry.country_code.as_str(), entry.count))
            .collect();
        assert_eq!(
            order,
            vec![(1, "TR", 9), (2, "DE", 4), (3, "US", 4), (4, "FR", 0)]
        );
    }

    #[test]
    fn podium_is_empty_without_clicks() {
        assert!(podium(&BTreeMap::new()).is_empty());
        assert!(podium(&clicks(&[("TR", 0), ("US", 0)])).is_empty());
    }

    #[test]
    fn podium_keeps_top_three() {
        let top = podium(&clicks(&[("A", 1), ("B", 2), ("C", 3), ("D", 4)]));
        let codes: Vec<_> = top.iter().map(|entry| entry.country_code.as_str()).collect();
        assert_eq!(codes, vec!["D", "C", "B"]);
    }

    #[test]
    fn compact_numbers() {
        assert_eq!(format_compact(0), "0");
        assert_eq!(format_compact(999), "999");
        assert_eq!(format_compact(1_000), "1K");
        assert_eq!(format_compact(1_500), "1.5K");
        assert_eq!(format_compact(12_000_000), "12M");
        assert_eq!(format_compact(3_400_000_000), "3.4B");
    }

    #[test]
    fn grouped_numbers() {
        assert_eq!(group_thousands(7), "7");
        assert_eq!(group_thousands(1_000), "1.000");
        assert_eq!(group_thousands(1_234_567), "1.234.567");
        assert_eq!(group_thousands(2_000_000_000_000_000), "2000000B");
    }
}
