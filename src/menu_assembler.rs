use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::MenuTable;

/// Placeholder for a meal the table leaves blank.
pub const NOT_LISTED: &str = "記載なし";

/// Row indices of the breakfast, lunch and dinner cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealRows {
    pub breakfast: usize,
    pub lunch: usize,
    pub dinner: usize,
}

impl MealRows {
    /// Three stacked sub-tables, one per meal.
    pub const STACKED: MealRows = MealRows {
        breakfast: 1,
        lunch: 8,
        dinner: 15,
    };
    /// One row per meal directly under the header.
    pub const COMPACT: MealRows = MealRows {
        breakfast: 1,
        lunch: 2,
        dinner: 3,
    };
}

impl Default for MealRows {
    fn default() -> Self {
        MealRows::STACKED
    }
}

impl TryFrom<&[usize]> for MealRows {
    type Error = String;

    fn try_from(rows: &[usize]) -> Result<Self, Self::Error> {
        match rows {
            &[breakfast, lunch, dinner] => Ok(MealRows {
                breakfast,
                lunch,
                dinner,
            }),
            _ => Err(format!("expected 3 meal rows, got {}", rows.len())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyMenu {
    pub date: NaiveDate,
    pub breakfast: String,
    pub lunch: String,
    pub dinner: String,
}

/// Reads the three meals for `column`. Blank or missing cells become
/// [`NOT_LISTED`]; this never fails.
pub fn assemble(table: &MenuTable, column: usize, date: NaiveDate, rows: MealRows) -> DailyMenu {
    let meal = |row| normalize(table.cell(row, column));
    DailyMenu {
        date,
        breakfast: meal(rows.breakfast),
        lunch: meal(rows.lunch),
        dinner: meal(rows.dinner),
    }
}

fn normalize(cell: Option<&str>) -> String {
    let text = cell
        .unwrap_or_default()
        .replace("\r\n", " ")
        .replace(['\r', '\n'], " ");
    let text = text.trim();
    if text.is_empty() {
        NOT_LISTED.to_string()
    } else {
        text.to_string()
    }
}
