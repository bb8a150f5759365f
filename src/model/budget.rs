use crate::model::{total, Amount, BudgetCategory};
use crate::Result;
use anyhow::ensure;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// The number of check (paycheck) columns per mode.
pub const CHECKS: usize = 4;

/// The two budget scenarios. Each has its own four check columns in the Budgets table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Ord,
    PartialOrd,
    Hash,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
    clap::ValueEnum,
)]
pub enum BudgetMode {
    /// While the rental property is vacant.
    #[default]
    #[serde(alias = "temporary")]
    Temporary,
    /// After the rental property is rented.
    #[serde(rename = "Post-Rental", alias = "post-rental", alias = "PostRental")]
    #[value(name = "post-rental")]
    PostRental,
}

serde_plain::derive_display_from_serialize!(BudgetMode);
serde_plain::derive_fromstr_from_deserialize!(BudgetMode);

impl BudgetMode {
    /// The suffix of this mode's check column headers, e.g. `Check1_Temp`.
    fn suffix(&self) -> &'static str {
        match self {
            BudgetMode::Temporary => "Temp",
            BudgetMode::PostRental => "Post",
        }
    }

    /// The four column headers that are summed for this mode.
    pub fn columns(&self) -> [String; CHECKS] {
        std::array::from_fn(|ix| BudgetColumn::Check(*self, ix).header())
    }
}

/// Represents the known columns of the Budgets table.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum BudgetColumn {
    Category,
    /// A check column, the index is zero-based (`Check(_, 0)` is `Check1_*`).
    Check(BudgetMode, usize),
    MonthlyTarget,
}

impl BudgetColumn {
    /// The known columns in canonical header order.
    pub fn all() -> Vec<BudgetColumn> {
        let mut columns = vec![BudgetColumn::Category];
        for mode in [BudgetMode::Temporary, BudgetMode::PostRental] {
            columns.extend((0..CHECKS).map(|ix| BudgetColumn::Check(mode, ix)));
        }
        columns.push(BudgetColumn::MonthlyTarget);
        columns
    }

    pub fn header(&self) -> String {
        match self {
            BudgetColumn::Category => CATEGORY_STR.to_string(),
            BudgetColumn::Check(mode, ix) => format!("Check{}_{}", ix + 1, mode.suffix()),
            BudgetColumn::MonthlyTarget => MONTHLY_TARGET_STR.to_string(),
        }
    }

    pub fn from_header(header: impl AsRef<str>) -> Option<BudgetColumn> {
        let header = header.as_ref().trim();
        BudgetColumn::all().into_iter().find(|c| c.header() == header)
    }
}

/// The canonical header row of the Budgets table.
pub fn budget_headers() -> Vec<String> {
    BudgetColumn::all().iter().map(|c| c.header()).collect()
}

const CATEGORY_STR: &str = "Category";
const MONTHLY_TARGET_STR: &str = "Monthly_Target";

/// Represents a single row from the Budgets table.
///
/// Cells are held as the text found in the table so that writing the table back does not
/// reformat values the user typed. Use the amount accessors for arithmetic.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BudgetRow {
    category: String,
    temporary: [String; CHECKS],
    post_rental: [String; CHECKS],
    monthly_target: String,
    /// Cells in columns we do not know about, keyed by column position.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    other_fields: BTreeMap<usize, String>,
}

impl BudgetRow {
    /// A zeroed row, as written when seeding an empty table.
    pub fn zeroed(category: BudgetCategory) -> Self {
        Self {
            category: category.label().to_string(),
            temporary: std::array::from_fn(|_| String::from("0")),
            post_rental: std::array::from_fn(|_| String::from("0")),
            monthly_target: String::new(),
            other_fields: BTreeMap::new(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// The raw cells of the four check columns of `mode`.
    pub fn checks(&self, mode: BudgetMode) -> &[String; CHECKS] {
        match mode {
            BudgetMode::Temporary => &self.temporary,
            BudgetMode::PostRental => &self.post_rental,
        }
    }

    /// The four check amounts of `mode`, unreadable cells counting as zero.
    pub fn check_amounts(&self, mode: BudgetMode) -> [Amount; CHECKS] {
        let cells = self.checks(mode);
        std::array::from_fn(|ix| Amount::lenient(&cells[ix]))
    }

    /// The sum of the four check amounts of `mode`.
    pub fn total(&self, mode: BudgetMode) -> Decimal {
        total(self.check_amounts(mode).iter().map(|a| a.value()))
    }

    /// The optional monthly target. A blank cell means no target.
    pub fn monthly_target(&self) -> Option<Amount> {
        if self.monthly_target.trim().is_empty() {
            None
        } else {
            Some(Amount::lenient(&self.monthly_target))
        }
    }

    /// Sets one check amount. `check` is one-based, as in the column headers.
    pub fn set_check(&mut self, mode: BudgetMode, check: usize, amount: Amount) -> Result<()> {
        ensure!(
            (1..=CHECKS).contains(&check),
            "Check number must be between 1 and {CHECKS}, got {check}"
        );
        let cells = match mode {
            BudgetMode::Temporary => &mut self.temporary,
            BudgetMode::PostRental => &mut self.post_rental,
        };
        cells[check - 1] = amount.to_cell();
        Ok(())
    }

    pub fn set_monthly_target(&mut self, amount: Option<Amount>) {
        self.monthly_target = amount.map(|a| a.to_cell()).unwrap_or_default();
    }

    fn set(&mut self, column: BudgetColumn, value: String) {
        match column {
            BudgetColumn::Category => self.category = value,
            BudgetColumn::Check(BudgetMode::Temporary, ix) => self.temporary[ix] = value,
            BudgetColumn::Check(BudgetMode::PostRental, ix) => self.post_rental[ix] = value,
            BudgetColumn::MonthlyTarget => self.monthly_target = value,
        }
    }

    fn get(&self, column: BudgetColumn) -> &str {
        match column {
            BudgetColumn::Category => &self.category,
            BudgetColumn::Check(mode, ix) => &self.checks(mode)[ix],
            BudgetColumn::MonthlyTarget => &self.monthly_target,
        }
    }
}

/// Represents the Budgets table: its header row and its data rows in table order.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Budgets {
    headers: Vec<String>,
    data: Vec<BudgetRow>,
}

impl Budgets {
    /// Parses the table as returned by the store, header row first.
    ///
    /// Unknown columns are carried along untouched. A header that appears twice is only
    /// interpreted the first time. A table without a header row is read as the canonical header
    /// with no data.
    pub fn parse<S, R>(sheet_data: impl IntoIterator<Item = R>) -> Self
    where
        S: Into<String>,
        R: IntoIterator<Item = S>,
    {
        let mut rows = sheet_data.into_iter();
        let headers: Vec<String> = match rows.next() {
            Some(header_row) => header_row.into_iter().map(|s| s.into()).collect(),
            None => budget_headers(),
        };
        let layout = layout(&headers);

        let mut data = Vec::new();
        for (row_ix, row) in rows.enumerate() {
            let mut budget_row = BudgetRow::default();
            for (col_ix, value) in row.into_iter().map(|s| s.into()).enumerate() {
                match layout.get(col_ix) {
                    Some(Some(column)) => budget_row.set(*column, value),
                    Some(None) => {
                        budget_row.other_fields.insert(col_ix, value);
                    }
                    None if value.is_empty() => {}
                    None => warn!(
                        "Ignoring a Budgets cell without a header at row {}, column {}",
                        row_ix + 2,
                        col_ix + 1
                    ),
                }
            }
            data.push(budget_row);
        }
        Self { headers, data }
    }

    /// The table written when the Budgets table is first created: one zeroed row per category.
    pub fn seeded() -> Self {
        Self {
            headers: budget_headers(),
            data: BudgetCategory::ALL
                .into_iter()
                .map(BudgetRow::zeroed)
                .collect(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn data(&self) -> &[BudgetRow] {
        &self.data
    }

    /// The first row whose Category cell is `category`.
    pub fn find(&self, category: BudgetCategory) -> Option<&BudgetRow> {
        self.data
            .iter()
            .find(|r| BudgetCategory::from_label(&r.category) == Some(category))
    }

    /// The first row for `category`, appending a zeroed row if the table has none. Any canonical
    /// column missing from the header is added so the edit has somewhere to go.
    pub fn row_mut(&mut self, category: BudgetCategory) -> &mut BudgetRow {
        self.add_missing_columns();
        let position = self
            .data
            .iter()
            .position(|r| BudgetCategory::from_label(&r.category) == Some(category));
        let ix = match position {
            Some(ix) => ix,
            None => {
                self.data.push(BudgetRow::zeroed(category));
                self.data.len() - 1
            }
        };
        &mut self.data[ix]
    }

    fn add_missing_columns(&mut self) {
        let present: Vec<BudgetColumn> = self
            .headers
            .iter()
            .filter_map(BudgetColumn::from_header)
            .collect();
        for column in BudgetColumn::all() {
            if !present.contains(&column) {
                self.headers.push(column.header());
            }
        }
    }

    /// The full table, header row first, ready to be written back starting at the first row.
    pub fn to_sheet(&self) -> Vec<Vec<String>> {
        let layout = layout(&self.headers);
        let mut sheet = Vec::with_capacity(self.data.len() + 1);
        sheet.push(self.headers.clone());
        for row in &self.data {
            let cells = layout
                .iter()
                .enumerate()
                .map(|(col_ix, column)| match column {
                    Some(column) => row.get(*column).to_string(),
                    None => row.other_fields.get(&col_ix).cloned().unwrap_or_default(),
                })
                .collect();
            sheet.push(cells);
        }
        sheet
    }
}

/// Maps each column position to the known column it holds, if any. Only the first occurrence of
/// a header is mapped.
fn layout(headers: &[String]) -> Vec<Option<BudgetColumn>> {
    let mut seen = Vec::new();
    headers
        .iter()
        .map(|h| match BudgetColumn::from_header(h) {
            Some(column) if !seen.contains(&column) => {
                seen.push(column);
                Some(column)
            }
            _ => None,
        })
        .collect()
}
