use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Topic a question belongs to. The set is closed and mirrors the published
/// theory-test syllabus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Alertness,
    Attitude,
    #[serde(rename = "Safety and Your Vehicle")]
    SafetyAndYourVehicle,
    #[serde(rename = "Safety Margins")]
    SafetyMargins,
    #[serde(rename = "Hazard Awareness")]
    HazardAwareness,
    #[serde(rename = "Vulnerable Road Users")]
    VulnerableRoadUsers,
    #[serde(rename = "Other Types of Vehicle")]
    OtherTypesOfVehicle,
    #[serde(rename = "Vehicle Handling")]
    VehicleHandling,
    #[serde(rename = "Motorway Rules")]
    MotorwayRules,
    #[serde(rename = "Rules of the Road")]
    RulesOfTheRoad,
    #[serde(rename = "Road and Traffic Signs")]
    RoadAndTrafficSigns,
    #[serde(rename = "Essential Documents")]
    EssentialDocuments,
    #[serde(rename = "Incidents, Accidents and Emergencies")]
    IncidentsAccidentsAndEmergencies,
    #[serde(rename = "Vehicle Loading")]
    VehicleLoading,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl Category {
    /// Every category, in syllabus order.
    pub const ALL: [Category; 14] = [
        Category::Alertness,
        Category::Attitude,
        Category::SafetyAndYourVehicle,
        Category::SafetyMargins,
        Category::HazardAwareness,
        Category::VulnerableRoadUsers,
        Category::OtherTypesOfVehicle,
        Category::VehicleHandling,
        Category::MotorwayRules,
        Category::RulesOfTheRoad,
        Category::RoadAndTrafficSigns,
        Category::EssentialDocuments,
        Category::IncidentsAccidentsAndEmergencies,
        Category::VehicleLoading,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Category::Alertness => "Alertness",
            Category::Attitude => "Attitude",
            Category::SafetyAndYourVehicle => "Safety and Your Vehicle",
            Category::SafetyMargins => "Safety Margins",
            Category::HazardAwareness => "Hazard Awareness",
            Category::VulnerableRoadUsers => "Vulnerable Road Users",
            Category::OtherTypesOfVehicle => "Other Types of Vehicle",
            Category::VehicleHandling => "Vehicle Handling",
            Category::MotorwayRules => "Motorway Rules",
            Category::RulesOfTheRoad => "Rules of the Road",
            Category::RoadAndTrafficSigns => "Road and Traffic Signs",
            Category::EssentialDocuments => "Essential Documents",
            Category::IncidentsAccidentsAndEmergencies => "Incidents, Accidents and Emergencies",
            Category::VehicleLoading => "Vehicle Loading",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|category| category.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownCategory(wanted.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_display_names_case_insensitively() {
        assert_eq!(
            "road and traffic signs".parse::<Category>().unwrap(),
            Category::RoadAndTrafficSigns
        );
        assert_eq!(
            " Incidents, Accidents and Emergencies ".parse::<Category>().unwrap(),
            Category::IncidentsAccidentsAndEmergencies
        );
        assert!("Parking".parse::<Category>().is_err());
    }

    #[test]
    fn serde_uses_display_name() {
        for category in Category::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.name()));
            let back: Category = serde_json::from_str(&json).unwrap();
            assert_eq!(back, category);
        }
    }
}
