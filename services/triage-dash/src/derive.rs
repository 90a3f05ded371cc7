// services/triage-dash/src/derive.rs
//
// Pure derivations over the current snapshot: critical stock detection,
// stock-bar scaling, category colors and queue filtering

use chrono::{DateTime, NaiveDateTime};
use svckit::types::{Patient, Resource, TriageCategory};

/// Color token for a triage category. `Neutral` covers values the backend
/// may send that the dashboard does not know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryColor {
    Red,
    Yellow,
    Green,
    Gray,
    Neutral,
}

/// Queue filter selected by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatientFilter {
    #[default]
    All,
    Immediate,
    Delayed,
    Minimal,
    Expectant,
}

impl PatientFilter {
    pub const ALL: [PatientFilter; 5] = [
        PatientFilter::All,
        PatientFilter::Immediate,
        PatientFilter::Delayed,
        PatientFilter::Minimal,
        PatientFilter::Expectant,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PatientFilter::All => "All",
            PatientFilter::Immediate => "Immediate",
            PatientFilter::Delayed => "Delayed",
            PatientFilter::Minimal => "Minimal",
            PatientFilter::Expectant => "Expectant",
        }
    }

    fn category(self) -> Option<TriageCategory> {
        match self {
            PatientFilter::All => None,
            PatientFilter::Immediate => Some(TriageCategory::Immediate),
            PatientFilter::Delayed => Some(TriageCategory::Delayed),
            PatientFilter::Minimal => Some(TriageCategory::Minimal),
            PatientFilter::Expectant => Some(TriageCategory::Expectant),
        }
    }
}

/// Resources at or below their critical threshold, in input order.
pub fn critical_resources(resources: &[Resource]) -> Vec<&Resource> {
    resources.iter().filter(|r| r.is_critical()).collect()
}

/// Width of the stock bar in percent, scaled so the critical level sits at
/// the halfway mark. With a zero threshold the bar is empty at zero stock
/// and full otherwise.
pub fn stock_bar_percent(resource: &Resource) -> f64 {
    if resource.critical_level == 0 {
        return if resource.current_stock == 0 { 0.0 } else { 100.0 };
    }
    let scale = resource.critical_level as f64 * 2.0;
    (resource.current_stock as f64 / scale * 100.0).min(100.0)
}

pub fn category_color(category: &TriageCategory) -> CategoryColor {
    match category {
        TriageCategory::Immediate => CategoryColor::Red,
        TriageCategory::Delayed => CategoryColor::Yellow,
        TriageCategory::Minimal => CategoryColor::Green,
        TriageCategory::Expectant => CategoryColor::Gray,
        TriageCategory::Other(_) => CategoryColor::Neutral,
    }
}

pub fn matches_filter(patient: &Patient, filter: PatientFilter) -> bool {
    match filter.category() {
        None => true,
        Some(category) => patient.triage_category == category,
    }
}

/// Human label for a resource key: `blood_o_neg` -> `Blood O Neg`.
pub fn resource_label(resource_type: &str) -> String {
    resource_type
        .split(|c| c == '_' || c == '-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn display_count(count: Option<u64>) -> u64 {
    count.unwrap_or(0)
}

/// Wall-clock portion of a backend timestamp. Unparseable values are shown
/// as received.
pub fn clock_time(timestamp: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return dt.format("%H:%M:%S").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format("%H:%M:%S").to_string();
    }
    timestamp.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(resource_type: &str, current_stock: u32, critical_level: u32) -> Resource {
        Resource {
            id: 1,
            resource_type: resource_type.to_string(),
            current_stock,
            critical_level,
            last_updated: None,
            location: None,
        }
    }

    fn patient(category: &str) -> Patient {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "patient_id": "P1",
            "triage_category": category,
        }))
        .unwrap()
    }

    #[test]
    fn test_critical_resources_matches_threshold_rule() {
        let resources = vec![
            resource("blood", 5, 10),
            resource("saline", 20, 10),
            resource("oxygen", 10, 10),
            resource("gauze", 0, 0),
            resource("morphine", 11, 10),
        ];
        let critical: Vec<&str> = critical_resources(&resources)
            .iter()
            .map(|r| r.resource_type.as_str())
            .collect();
        assert_eq!(critical, vec!["blood", "oxygen", "gauze"]);

        for r in &resources {
            assert_eq!(
                critical.contains(&r.resource_type.as_str()),
                r.current_stock <= r.critical_level
            );
        }
    }

    #[test]
    fn test_stock_bar_percent_scaling() {
        assert_eq!(stock_bar_percent(&resource("blood", 5, 10)), 25.0);
        assert_eq!(stock_bar_percent(&resource("blood", 10, 10)), 50.0);
        assert_eq!(stock_bar_percent(&resource("blood", 20, 10)), 100.0);
        assert_eq!(stock_bar_percent(&resource("blood", 500, 10)), 100.0);
    }

    #[test]
    fn test_stock_bar_zero_threshold() {
        assert_eq!(stock_bar_percent(&resource("gauze", 0, 0)), 0.0);
        assert_eq!(stock_bar_percent(&resource("gauze", 1, 0)), 100.0);
        assert_eq!(stock_bar_percent(&resource("gauze", 9000, 0)), 100.0);
    }

    #[test]
    fn test_stock_bar_monotonic_and_bounded() {
        for critical_level in [0u32, 1, 3, 10, 50] {
            let mut previous = 0.0;
            for stock in 0..=250u32 {
                let pct = stock_bar_percent(&resource("x", stock, critical_level));
                assert!((0.0..=100.0).contains(&pct), "{} out of range", pct);
                assert!(pct >= previous, "not monotonic at stock {}", stock);
                previous = pct;
            }
        }
    }

    #[test]
    fn test_category_color_total() {
        assert_eq!(category_color(&TriageCategory::Immediate), CategoryColor::Red);
        assert_eq!(category_color(&TriageCategory::Delayed), CategoryColor::Yellow);
        assert_eq!(category_color(&TriageCategory::Minimal), CategoryColor::Green);
        assert_eq!(category_color(&TriageCategory::Expectant), CategoryColor::Gray);
        assert_eq!(
            category_color(&TriageCategory::Other("black".to_string())),
            CategoryColor::Neutral
        );
    }

    #[test]
    fn test_matches_filter() {
        let delayed = patient("delayed");
        assert!(matches_filter(&delayed, PatientFilter::All));
        assert!(matches_filter(&delayed, PatientFilter::Delayed));
        assert!(!matches_filter(&delayed, PatientFilter::Immediate));

        let unknown = patient("walking-wounded");
        assert!(matches_filter(&unknown, PatientFilter::All));
        for filter in &PatientFilter::ALL[1..] {
            assert!(!matches_filter(&unknown, *filter));
        }
    }

    #[test]
    fn test_resource_label() {
        assert_eq!(resource_label("blood_o_neg"), "Blood O Neg");
        assert_eq!(resource_label("oxygen"), "Oxygen");
        assert_eq!(resource_label("iv-fluids"), "Iv Fluids");
    }

    #[test]
    fn test_clock_time() {
        assert_eq!(clock_time("2024-03-01T10:15:30.123456"), "10:15:30");
        assert_eq!(clock_time("2024-03-01T10:15:30+02:00"), "10:15:30");
        assert_eq!(clock_time("yesterday"), "yesterday");
    }
}
