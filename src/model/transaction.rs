use crate::model::{Amount, BudgetCategory};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// The canonical header row of the Daily_Spending table.
pub fn transaction_headers() -> Vec<String> {
    TransactionColumn::ALL
        .iter()
        .map(|c| c.header().to_string())
        .collect()
}

/// Represents the known columns of the Daily_Spending table.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum TransactionColumn {
    Date,
    Category,
    Amount,
    Memo,
}

impl TransactionColumn {
    pub const ALL: [TransactionColumn; 4] = [
        TransactionColumn::Date,
        TransactionColumn::Category,
        TransactionColumn::Amount,
        TransactionColumn::Memo,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            TransactionColumn::Date => "Date",
            TransactionColumn::Category => "Category",
            TransactionColumn::Amount => "Amount",
            TransactionColumn::Memo => "Memo",
        }
    }

    pub fn from_header(header: impl AsRef<str>) -> Option<TransactionColumn> {
        let header = header.as_ref().trim();
        TransactionColumn::ALL
            .into_iter()
            .find(|c| c.header() == header)
    }
}

/// Represents a single row from the Daily_Spending table.
///
/// Rows are held as text. The category in particular is free text when read, since anyone can type
/// into the table; only new submissions are restricted to `BudgetCategory`.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Transaction {
    date: String,
    category: String,
    amount: String,
    memo: String,
}

impl Transaction {
    /// A new submission, formatted the way it will be written to the table.
    pub fn new(
        date: NaiveDate,
        category: BudgetCategory,
        amount: Amount,
        memo: Option<String>,
    ) -> Self {
        Self {
            date: date.format(DATE_FORMAT).to_string(),
            category: category.label().to_string(),
            amount: amount.to_cell(),
            memo: memo.unwrap_or_default(),
        }
    }

    /// The date as it appears in the table.
    pub fn raw_date(&self) -> &str {
        &self.date
    }

    /// The date, if the cell could be read as one.
    pub fn date(&self) -> Option<NaiveDate> {
        parse_date(&self.date)
    }

    pub fn category(&self) -> &str {
        self.category.trim()
    }

    pub fn amount(&self) -> Amount {
        Amount::lenient(&self.amount)
    }

    pub fn memo(&self) -> &str {
        &self.memo
    }

    fn set(&mut self, column: TransactionColumn, value: String) {
        match column {
            TransactionColumn::Date => self.date = value,
            TransactionColumn::Category => self.category = value,
            TransactionColumn::Amount => self.amount = value,
            TransactionColumn::Memo => self.memo = value,
        }
    }

    fn get(&self, column: TransactionColumn) -> &str {
        match column {
            TransactionColumn::Date => &self.date,
            TransactionColumn::Category => &self.category,
            TransactionColumn::Amount => &self.amount,
            TransactionColumn::Memo => &self.memo,
        }
    }
}

/// The format used when writing dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const DATE_FORMATS: [&str; 4] = [DATE_FORMAT, "%m/%d/%Y", "%Y/%m/%d", "%m-%d-%Y"];
const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M:%S"];

/// Reads a date cell leniently. Returns `None` for anything that is not recognizably a date.
pub fn parse_date(cell: impl AsRef<str>) -> Option<NaiveDate> {
    let cell = cell.as_ref().trim();
    if cell.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(cell, f).ok())
        .or_else(|| {
            DATE_TIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(cell, f).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(cell)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

/// Represents the Daily_Spending table.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Transactions {
    headers: Vec<String>,
    data: Vec<Transaction>,
}

impl Transactions {
    /// Parses the table as returned by the store, header row first. Cells in unknown columns are
    /// ignored since transactions are never written back, and so are blank rows.
    pub fn parse<S, R>(sheet_data: impl IntoIterator<Item = R>) -> Self
    where
        S: Into<String>,
        R: IntoIterator<Item = S>,
    {
        let mut rows = sheet_data.into_iter();
        let headers: Vec<String> = match rows.next() {
            Some(header_row) => header_row.into_iter().map(|s| s.into()).collect(),
            None => transaction_headers(),
        };
        let layout = layout(&headers);

        let data = rows
            .map(|row| {
                let mut transaction = Transaction::default();
                for (col_ix, value) in row.into_iter().map(|s| s.into()).enumerate() {
                    if let Some(Some(column)) = layout.get(col_ix) {
                        transaction.set(*column, value);
                    }
                }
                transaction
            })
            .filter(|t| *t != Transaction::default())
            .collect();

        Self { headers, data }
    }

    pub fn data(&self) -> &[Transaction] {
        &self.data
    }

    pub(crate) fn push(&mut self, transaction: Transaction) {
        self.data.push(transaction);
    }

    /// Lays out `transaction` as a row that matches this table's header, so an append lands in the
    /// right columns even when the user has reordered them. Known columns that are missing from
    /// the header are not written.
    pub fn row_for(&self, transaction: &Transaction) -> Vec<String> {
        layout(&self.headers)
            .iter()
            .map(|column| match column {
                Some(column) => transaction.get(*column).to_string(),
                None => String::new(),
            })
            .collect()
    }

    /// The transactions that match `filter`, newest first. Rows without a readable date go last.
    pub fn filter(&self, filter: &TransactionFilter) -> Vec<&Transaction> {
        let mut found: Vec<&Transaction> = self.data.iter().filter(|t| filter.matches(t)).collect();
        sort_newest_first(&mut found);
        found
    }
}

fn layout(headers: &[String]) -> Vec<Option<TransactionColumn>> {
    let mut seen = Vec::new();
    headers
        .iter()
        .map(|h| match TransactionColumn::from_header(h) {
            Some(column) if !seen.contains(&column) => {
                seen.push(column);
                Some(column)
            }
            _ => None,
        })
        .collect()
}

/// Sorts by date descending. The sort is stable, so rows with equal dates keep table order.
pub fn sort_newest_first(transactions: &mut [&Transaction]) {
    transactions.sort_by(|a, b| match (a.date(), b.date()) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// An inclusive date range, either end optional, and an optional exact category.
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TransactionFilter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub category: Option<BudgetCategory>,
}

impl TransactionFilter {
    /// From the first day of `today`'s month through `today`.
    pub fn month_to_date(today: NaiveDate) -> Self {
        Self {
            start: today.with_day0(0),
            end: Some(today),
            category: None,
        }
    }

    pub fn with_category(mut self, category: Option<BudgetCategory>) -> Self {
        self.category = category;
        self
    }

    /// A row without a readable date never matches once either bound is set.
    pub fn matches(&self, transaction: &Transaction) -> bool {
        if let Some(category) = self.category {
            if transaction.category() != category.label() {
                return false;
            }
        }
        if self.start.is_none() && self.end.is_none() {
            return true;
        }
        let Some(date) = transaction.date() else {
            return false;
        };
        self.start.is_none_or(|start| date >= start) && self.end.is_none_or(|end| date <= end)
    }
}

/// Sums amounts per category. Categories are the text found in the table, so names outside the
/// fixed list get their own entry.
pub fn totals_by_category<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
) -> BTreeMap<String, Decimal> {
    let mut totals = BTreeMap::new();
    for t in transactions {
        let sum = totals.entry(t.category().to_string()).or_insert(Decimal::ZERO);
        *sum = sum.saturating_add(t.amount().value());
    }
    totals
}

/// The category totals ordered largest first.
pub fn largest_first(totals: &BTreeMap<String, Decimal>) -> Vec<(String, Decimal)> {
    let mut sorted: Vec<(String, Decimal)> =
        totals.iter().map(|(k, v)| (k.clone(), *v)).collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1));
    sorted
}
