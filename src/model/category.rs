use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The ten fixed budget categories, in the canonical order they appear in the Budgets table.
///
/// The derived `Ord` follows declaration order, so a `BTreeMap<BudgetCategory, _>` iterates in
/// canonical order.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum BudgetCategory {
    Tithe,
    RentalReserve,
    SavingsEmergency,
    Food,
    Transportation,
    InsuranceHealth,
    Child,
    Debt,
    ClothingPersonal,
    SubscriptionsMisc,
}

impl BudgetCategory {
    /// Every category in canonical order.
    pub const ALL: [BudgetCategory; 10] = [
        BudgetCategory::Tithe,
        BudgetCategory::RentalReserve,
        BudgetCategory::SavingsEmergency,
        BudgetCategory::Food,
        BudgetCategory::Transportation,
        BudgetCategory::InsuranceHealth,
        BudgetCategory::Child,
        BudgetCategory::Debt,
        BudgetCategory::ClothingPersonal,
        BudgetCategory::SubscriptionsMisc,
    ];

    /// The label used in the Category column of the Budgets and Daily_Spending tables.
    pub fn label(&self) -> &'static str {
        match self {
            BudgetCategory::Tithe => "Tithe",
            BudgetCategory::RentalReserve => "Rental Reserve",
            BudgetCategory::SavingsEmergency => "Savings (Emergency)",
            BudgetCategory::Food => "Food",
            BudgetCategory::Transportation => "Transportation",
            BudgetCategory::InsuranceHealth => "Insurance/Health",
            BudgetCategory::Child => "Child",
            BudgetCategory::Debt => "Debt",
            BudgetCategory::ClothingPersonal => "Clothing/Personal",
            BudgetCategory::SubscriptionsMisc => "Subscriptions/Misc",
        }
    }

    /// A short identifier for typing on the command line, e.g. `rental_reserve`.
    pub fn key(&self) -> &'static str {
        match self {
            BudgetCategory::Tithe => "tithe",
            BudgetCategory::RentalReserve => "rental_reserve",
            BudgetCategory::SavingsEmergency => "savings",
            BudgetCategory::Food => "food",
            BudgetCategory::Transportation => "transportation",
            BudgetCategory::InsuranceHealth => "insurance",
            BudgetCategory::Child => "child",
            BudgetCategory::Debt => "debt",
            BudgetCategory::ClothingPersonal => "clothing",
            BudgetCategory::SubscriptionsMisc => "subscriptions",
        }
    }

    /// Finds the category whose label matches a cell exactly (ignoring surrounding whitespace).
    pub fn from_label(cell: impl AsRef<str>) -> Option<BudgetCategory> {
        let cell = cell.as_ref().trim();
        BudgetCategory::ALL.into_iter().find(|c| c.label() == cell)
    }

    /// Whether this category is counted in the living-expenses aggregate.
    pub fn is_living(&self) -> bool {
        !matches!(
            self,
            BudgetCategory::Tithe | BudgetCategory::RentalReserve | BudgetCategory::SavingsEmergency
        )
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UnknownCategory(String);

impl Display for UnknownCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let labels: Vec<&str> = BudgetCategory::ALL.iter().map(|c| c.label()).collect();
        write!(
            f,
            "Unknown category '{}', expected one of: {}",
            self.0,
            labels.join(", ")
        )
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for BudgetCategory {
    type Err = UnknownCategory;

    /// Accepts the label (`Savings (Emergency)`) or the key (`savings`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        BudgetCategory::ALL
            .into_iter()
            .find(|c| {
                c.label().eq_ignore_ascii_case(wanted) || c.key().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

impl Display for BudgetCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for BudgetCategory {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for BudgetCategory {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        BudgetCategory::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order() {
        let labels: Vec<&str> = BudgetCategory::ALL.iter().map(|c| c.label()).collect();
        assert_eq!(
            labels,
            vec![
                "Tithe",
                "Rental Reserve",
                "Savings (Emergency)",
                "Food",
                "Transportation",
                "Insurance/Health",
                "Child",
                "Debt",
                "Clothing/Personal",
                "Subscriptions/Misc",
            ]
        );
        let mut sorted = BudgetCategory::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, BudgetCategory::ALL.to_vec());
    }

    #[test]
    fn test_from_str_label_and_key() {
        assert_eq!(
            BudgetCategory::from_str("savings (emergency)").unwrap(),
            BudgetCategory::SavingsEmergency
        );
        assert_eq!(
            BudgetCategory::from_str("rental_reserve").unwrap(),
            BudgetCategory::RentalReserve
        );
        let err = BudgetCategory::from_str("Groceries").unwrap_err();
        assert!(err.to_string().contains("Unknown category 'Groceries'"));
    }

    #[test]
    fn test_from_label_is_exact() {
        assert_eq!(BudgetCategory::from_label(" Food "), Some(BudgetCategory::Food));
        assert_eq!(BudgetCategory::from_label("food"), None);
    }

    #[test]
    fn test_living_partition() {
        let living: Vec<BudgetCategory> = BudgetCategory::ALL
            .into_iter()
            .filter(|c| c.is_living())
            .collect();
        assert_eq!(living.len(), 7);
        assert!(!BudgetCategory::Tithe.is_living());
    }

    #[test]
    fn test_serde() {
        let json = serde_json::to_string(&BudgetCategory::InsuranceHealth).unwrap();
        assert_eq!(json, "\"Insurance/Health\"");
        let back: BudgetCategory = serde_json::from_str("\"insurance\"").unwrap();
        assert_eq!(back, BudgetCategory::InsuranceHealth);
    }
}
