use crate::model::amount::to_decimal;
use crate::model::BudgetMode;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The canonical header row of the Dashboard_Data table.
pub fn settings_headers() -> Vec<String> {
    vec![KEY_STR.to_string(), VALUE_STR.to_string()]
}

const KEY_STR: &str = "Key";
const VALUE_STR: &str = "Value";

/// The keys this program understands in the Dashboard_Data table, in the order they are seeded.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum SettingKey {
    MonthlyIncome,
    RentalMonthly,
    TithePct,
    SavingsPct,
    EmergencyTargetMonths,
    EmergencyCurrent,
    Mode,
    VerseIndex,
}

impl SettingKey {
    pub const ALL: [SettingKey; 8] = [
        SettingKey::MonthlyIncome,
        SettingKey::RentalMonthly,
        SettingKey::TithePct,
        SettingKey::SavingsPct,
        SettingKey::EmergencyTargetMonths,
        SettingKey::EmergencyCurrent,
        SettingKey::Mode,
        SettingKey::VerseIndex,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            SettingKey::MonthlyIncome => "Monthly_Income",
            SettingKey::RentalMonthly => "Rental_Monthly",
            SettingKey::TithePct => "Tithe_Pct",
            SettingKey::SavingsPct => "Savings_Pct",
            SettingKey::EmergencyTargetMonths => "Emergency_Target_Months",
            SettingKey::EmergencyCurrent => "Emergency_Current",
            SettingKey::Mode => "Mode",
            SettingKey::VerseIndex => "Verse_Index",
        }
    }

    pub fn from_key(key: impl AsRef<str>) -> Option<SettingKey> {
        let key = key.as_ref().trim();
        SettingKey::ALL.into_iter().find(|k| k.key() == key)
    }
}

/// The typed contents of the Dashboard_Data table.
///
/// Missing keys take their defaults and values that cannot be read count as zero. Keys that this
/// program does not know about are kept and written back on save.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    pub monthly_income: Decimal,
    pub rental_monthly: Decimal,
    pub tithe_pct: Decimal,
    pub savings_pct: Decimal,
    pub emergency_target_months: Decimal,
    pub emergency_current: Decimal,
    pub mode: BudgetMode,
    pub verse_index: i64,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    other: Vec<(String, String)>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            monthly_income: Decimal::ZERO,
            rental_monthly: Decimal::from(2500),
            tithe_pct: Decimal::from(10),
            savings_pct: Decimal::from(10),
            emergency_target_months: Decimal::from(3),
            emergency_current: Decimal::ZERO,
            mode: BudgetMode::Temporary,
            verse_index: 0,
            other: Vec::new(),
        }
    }
}

impl Settings {
    /// Parses the table as returned by the store, header row first. When a key appears more than
    /// once the last value wins.
    pub fn parse<S, R>(sheet_data: impl IntoIterator<Item = R>) -> Self
    where
        S: Into<String>,
        R: IntoIterator<Item = S>,
    {
        let mut rows = sheet_data.into_iter();
        let (key_ix, value_ix) = match rows.next() {
            Some(header_row) => {
                let headers: Vec<String> = header_row.into_iter().map(|s| s.into()).collect();
                let find = |name: &str, fallback: usize| {
                    headers
                        .iter()
                        .position(|h| h.trim() == name)
                        .unwrap_or(fallback)
                };
                (find(KEY_STR, 0), find(VALUE_STR, 1))
            }
            None => (0, 1),
        };

        let mut settings = Settings::default();
        for row in rows {
            let row: Vec<String> = row.into_iter().map(|s| s.into()).collect();
            let key = row.get(key_ix).map(|s| s.trim()).unwrap_or_default();
            let value = row.get(value_ix).cloned().unwrap_or_default();
            if key.is_empty() {
                continue;
            }
            match SettingKey::from_key(key) {
                Some(known) => settings.set(known, &value),
                None => settings.set_other(key, value),
            }
        }
        settings
    }

    fn set(&mut self, key: SettingKey, value: &str) {
        match key {
            SettingKey::MonthlyIncome => self.monthly_income = to_decimal(value),
            SettingKey::RentalMonthly => self.rental_monthly = to_decimal(value),
            SettingKey::TithePct => self.tithe_pct = to_decimal(value),
            SettingKey::SavingsPct => self.savings_pct = to_decimal(value),
            SettingKey::EmergencyTargetMonths => self.emergency_target_months = to_decimal(value),
            SettingKey::EmergencyCurrent => self.emergency_current = to_decimal(value),
            SettingKey::Mode => self.mode = BudgetMode::from_str(value.trim()).unwrap_or_default(),
            SettingKey::VerseIndex => {
                self.verse_index = to_decimal(value).trunc().to_i64().unwrap_or_default()
            }
        }
    }

    fn set_other(&mut self, key: &str, value: String) {
        match self.other.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value,
            None => self.other.push((key.to_string(), value)),
        }
    }

    /// The value of `key` as written to the table.
    pub fn value(&self, key: SettingKey) -> String {
        match key {
            SettingKey::MonthlyIncome => cell(self.monthly_income),
            SettingKey::RentalMonthly => cell(self.rental_monthly),
            SettingKey::TithePct => cell(self.tithe_pct),
            SettingKey::SavingsPct => cell(self.savings_pct),
            SettingKey::EmergencyTargetMonths => cell(self.emergency_target_months),
            SettingKey::EmergencyCurrent => cell(self.emergency_current),
            SettingKey::Mode => self.mode.to_string(),
            SettingKey::VerseIndex => self.verse_index.to_string(),
        }
    }

    /// Keys found in the table that this program does not interpret.
    pub fn other(&self) -> &[(String, String)] {
        &self.other
    }

    /// The full table, header row first: the known keys in seed order, then any other keys.
    pub fn to_sheet(&self) -> Vec<Vec<String>> {
        let mut sheet = vec![settings_headers()];
        sheet.extend(
            SettingKey::ALL
                .iter()
                .map(|k| vec![k.key().to_string(), self.value(*k)]),
        );
        sheet.extend(self.other.iter().map(|(k, v)| vec![k.clone(), v.clone()]));
        sheet
    }
}

fn cell(value: Decimal) -> String {
    value.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_defaults_seed_order() {
        let sheet = Settings::default().to_sheet();
        assert_eq!(
            sheet,
            vec![
                vec!["Key", "Value"],
                vec!["Monthly_Income", "0"],
                vec!["Rental_Monthly", "2500"],
                vec!["Tithe_Pct", "10"],
                vec!["Savings_Pct", "10"],
                vec!["Emergency_Target_Months", "3"],
                vec!["Emergency_Current", "0"],
                vec!["Mode", "Temporary"],
                vec!["Verse_Index", "0"],
            ]
        );
    }

    #[test]
    fn test_missing_keys_take_defaults() {
        let settings = Settings::parse(vec![
            vec!["Key", "Value"],
            vec!["Monthly_Income", "$6,000.00"],
            vec!["Mode", "Post-Rental"],
        ]);
        assert_eq!(settings.monthly_income, dec("6000"));
        assert_eq!(settings.rental_monthly, dec("2500"));
        assert_eq!(settings.mode, BudgetMode::PostRental);
        assert_eq!(settings.verse_index, 0);
    }

    #[test]
    fn test_unreadable_values() {
        let settings = Settings::parse(vec![
            vec!["Key", "Value"],
            vec!["Tithe_Pct", "ten"],
            vec!["Mode", "Someday"],
            vec!["Verse_Index", "-7.9"],
        ]);
        assert_eq!(settings.tithe_pct, Decimal::ZERO);
        assert_eq!(settings.mode, BudgetMode::Temporary);
        assert_eq!(settings.verse_index, -7);
    }

    #[test]
    fn test_other_keys_survive_and_last_wins() {
        let mut settings = Settings::parse(vec![
            vec!["Key", "Value"],
            vec!["Notes", "first"],
            vec!["Rental_Monthly", "1800"],
            vec!["Notes", "second"],
            vec!["", "orphan"],
            vec!["Rental_Monthly", "1900"],
        ]);
        assert_eq!(settings.rental_monthly, dec("1900"));
        settings.monthly_income = dec("5000.50");
        let sheet = settings.to_sheet();
        assert_eq!(sheet.len(), 10);
        assert_eq!(sheet[1], vec!["Monthly_Income", "5000.5"]);
        assert_eq!(sheet[9], vec!["Notes", "second"]);
    }

    #[test]
    fn test_swapped_columns() {
        let settings = Settings::parse(vec![vec!["Value", "Key"], vec!["4", "Verse_Index"]]);
        assert_eq!(settings.verse_index, 4);
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(Settings::parse(Vec::<Vec<String>>::new()), Settings::default());
    }
}
