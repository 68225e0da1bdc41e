//! Laptop fleet inventory
//!
//! Static fleet records shown in the inventory pane and by
//! `flip list --inventory`. The lifecycle Status column is gated on the
//! `release-laptop-life-remaining` flag: device age in months (at 30
//! days per month) is measured against a 36-month end-of-life with a
//! 3-month warning window.

use chrono::NaiveDate;
use serde::Serialize;

/// Flag gating the lifecycle Status column
pub const LIFECYCLE_FLAG: &str = "release-laptop-life-remaining";

/// Fleet refresh cycle in months
const EOL_MONTHS: f64 = 36.0;

/// Months before end-of-life at which status turns yellow
const WARNING_THRESHOLD: f64 = 3.0;

/// One laptop in the managed fleet
#[derive(Debug, Clone, Serialize)]
pub struct Laptop {
    pub id: u32,
    pub name: &'static str,
    pub brand: &'static str,
    pub assigned_to: &'static str,
    pub purchased: NaiveDate,
}

/// Lifecycle standing of one device against the refresh cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    /// Within the refresh cycle
    Green,
    /// Inside the warning window before end-of-life
    Yellow,
    /// Past end-of-life
    Red,
}

impl Lifecycle {
    /// Status for a device purchased on `purchased`, evaluated at `today`
    pub fn evaluate(purchased: NaiveDate, today: NaiveDate) -> Self {
        let months = (today - purchased).num_days() as f64 / 30.0;
        if months < EOL_MONTHS - WARNING_THRESHOLD {
            Lifecycle::Green
        } else if months < EOL_MONTHS {
            Lifecycle::Yellow
        } else {
            Lifecycle::Red
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Lifecycle::Green => "green",
            Lifecycle::Yellow => "yellow",
            Lifecycle::Red => "red",
        }
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("invalid date literal")
}

/// The managed laptop fleet
pub fn fleet() -> Vec<Laptop> {
    vec![
        Laptop {
            id: 1,
            name: "ThinkPad X1 Carbon",
            brand: "Lenovo",
            assigned_to: "Alice Johnson",
            purchased: ymd(2024, 3, 15),
        },
        Laptop {
            id: 2,
            name: "MacBook Pro 14",
            brand: "Apple",
            assigned_to: "Bob Smith",
            purchased: ymd(2022, 7, 20),
        },
        Laptop {
            id: 3,
            name: "Dell Latitude 5490",
            brand: "Dell",
            assigned_to: "Charlie Brown",
            purchased: ymd(2020, 11, 10),
        },
        Laptop {
            id: 4,
            name: "HP EliteBook 840",
            brand: "HP",
            assigned_to: "Diana Prince",
            purchased: ymd(2023, 5, 5),
        },
        Laptop {
            id: 5,
            name: "MacBook Air M1",
            brand: "Apple",
            assigned_to: "Eve Adams",
            purchased: ymd(2023, 1, 10),
        },
        Laptop {
            id: 6,
            name: "ThinkPad T14",
            brand: "Lenovo",
            assigned_to: "Franklin West",
            purchased: ymd(2020, 4, 18),
        },
        Laptop {
            id: 7,
            name: "Dell XPS 13",
            brand: "Dell",
            assigned_to: "Grace Hopper",
            purchased: ymd(2022, 3, 1),
        },
        Laptop {
            id: 8,
            name: "HP Spectre x360",
            brand: "HP",
            assigned_to: "Hector Garcia",
            purchased: ymd(2022, 3, 21),
        },
        Laptop {
            id: 9,
            name: "Asus ZenBook 14",
            brand: "Asus",
            assigned_to: "Ivy Chan",
            purchased: ymd(2021, 8, 15),
        },
        Laptop {
            id: 10,
            name: "Surface Laptop 4",
            brand: "Microsoft",
            assigned_to: "Jake Miller",
            purchased: ymd(2024, 11, 2),
        },
        Laptop {
            id: 11,
            name: "MacBook Pro 13 (Intel)",
            brand: "Apple",
            assigned_to: "Karen Duke",
            purchased: ymd(2025, 10, 25),
        },
        Laptop {
            id: 12,
            name: "Lenovo IdeaPad Flex 5",
            brand: "Lenovo",
            assigned_to: "Leonard Nimoy",
            purchased: ymd(2023, 6, 3),
        },
        Laptop {
            id: 13,
            name: "Dell Latitude 5510",
            brand: "Dell",
            assigned_to: "Mia Townsend",
            purchased: ymd(2019, 9, 30),
        },
        Laptop {
            id: 14,
            name: "HP ProBook 450 G7",
            brand: "HP",
            assigned_to: "Nina Ransom",
            purchased: ymd(2024, 7, 11),
        },
        Laptop {
            id: 15,
            name: "Acer Swift 3",
            brand: "Acer",
            assigned_to: "Oscar Vazquez",
            purchased: ymd(2024, 2, 19),
        },
    ]
}

/// Case-insensitive search across name, brand, and assignee
pub fn filter(fleet: &[Laptop], term: &str) -> Vec<Laptop> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return fleet.to_vec();
    }
    fleet
        .iter()
        .filter(|laptop| {
            [laptop.name, laptop.brand, laptop.assigned_to]
                .iter()
                .any(|field| field.to_lowercase().contains(&term))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_fleet_size() {
        assert_eq!(fleet().len(), 15);
    }

    #[test]
    fn test_lifecycle_thresholds() {
        let purchased = ymd(2022, 1, 1);

        // 33 months at 30 days per month is 990 days
        let green = purchased + Duration::days(989);
        let warning = purchased + Duration::days(990);
        let still_warning = purchased + Duration::days(1079);
        let expired = purchased + Duration::days(1080);

        assert_eq!(Lifecycle::evaluate(purchased, green), Lifecycle::Green);
        assert_eq!(Lifecycle::evaluate(purchased, warning), Lifecycle::Yellow);
        assert_eq!(
            Lifecycle::evaluate(purchased, still_warning),
            Lifecycle::Yellow
        );
        assert_eq!(Lifecycle::evaluate(purchased, expired), Lifecycle::Red);
    }

    #[test]
    fn test_lifecycle_labels() {
        assert_eq!(Lifecycle::Green.label(), "green");
        assert_eq!(Lifecycle::Yellow.label(), "yellow");
        assert_eq!(Lifecycle::Red.label(), "red");
    }

    #[test]
    fn test_filter_matches_any_field() {
        let fleet = fleet();

        // Brand, assignee, and name matches
        assert_eq!(filter(&fleet, "apple").len(), 3);
        assert_eq!(filter(&fleet, "ALICE").len(), 1);
        assert_eq!(filter(&fleet, "zenbook").len(), 1);

        assert!(filter(&fleet, "chromebook").is_empty());
    }

    #[test]
    fn test_filter_empty_term_returns_all() {
        let fleet = fleet();
        assert_eq!(filter(&fleet, "").len(), 15);
        assert_eq!(filter(&fleet, "   ").len(), 15);
    }
}
