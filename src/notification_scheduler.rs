use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use serde::Deserialize;

use crate::{DailyMenu, MenuError};

/// Which part of the day a notification is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// All three meals.
    Morning,
    /// Lunch only.
    Midday,
    /// Dinner only.
    Evening,
    /// Nothing to send.
    None,
}

/// Start hours of each window; intervals are half-open `[start, next)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct WindowBounds {
    pub morning_start: u32,
    pub midday_start: u32,
    pub evening_start: u32,
    pub evening_end: u32,
}

impl Default for WindowBounds {
    fn default() -> Self {
        Self {
            morning_start: 4,
            midday_start: 10,
            evening_start: 15,
            evening_end: 22,
        }
    }
}

impl WindowBounds {
    pub fn is_ordered(&self) -> bool {
        self.morning_start < self.midday_start
            && self.midday_start < self.evening_start
            && self.evening_start < self.evening_end
            && self.evening_end <= 24
    }
}

pub fn classify_window(now: NaiveTime, bounds: &WindowBounds) -> Window {
    let hour = now.hour();
    if (bounds.morning_start..bounds.midday_start).contains(&hour) {
        Window::Morning
    } else if (bounds.midday_start..bounds.evening_start).contains(&hour) {
        Window::Midday
    } else if (bounds.evening_start..bounds.evening_end).contains(&hour) {
        Window::Evening
    } else {
        Window::None
    }
}

pub const BREAKFAST_LABEL: &str = "■ 朝食";
pub const LUNCH_LABEL: &str = "■ 昼食";
pub const DINNER_LABEL: &str = "■ 夕食";

/// `M/D` without zero padding, e.g. "5/19".
pub fn date_label(date: NaiveDate) -> String {
    format!("{}/{}", date.month(), date.day())
}

/// Message text for `window`, or `None` when nothing should be sent.
pub fn render(window: Window, menu: &DailyMenu, date_label: &str) -> Option<String> {
    let text = match window {
        Window::Morning => compose(
            &format!("【本日の寮食メニュー ({date_label})】"),
            &[
                (BREAKFAST_LABEL, &menu.breakfast),
                (LUNCH_LABEL, &menu.lunch),
                (DINNER_LABEL, &menu.dinner),
            ],
        ),
        Window::Midday => compose(
            &format!("【今日の昼食 ({date_label})】"),
            &[(LUNCH_LABEL, &menu.lunch)],
        ),
        Window::Evening => compose(
            &format!("【今日の夕食 ({date_label})】"),
            &[(DINNER_LABEL, &menu.dinner)],
        ),
        Window::None => return None,
    };
    Some(text)
}

/// Full menu regardless of the time of day, for manual requests.
pub fn render_forced(menu: &DailyMenu, date_label: &str) -> String {
    compose(
        &format!("【献立確認 ({date_label})】"),
        &[
            (BREAKFAST_LABEL, &menu.breakfast),
            (LUNCH_LABEL, &menu.lunch),
            (DINNER_LABEL, &menu.dinner),
        ],
    )
}

/// Diagnostic text for a run that could not produce a menu.
pub fn render_failure(error: &MenuError, url: Option<&str>) -> String {
    match error {
        MenuError::AllCandidatesExhausted { last_url } => format!(
            "【お知らせ】\n献立表PDFが見つかりませんでした。\n最後に試したURL: {}",
            last_url.as_deref().unwrap_or("なし")
        ),
        _ => format!(
            "【お知らせ】\n献立表の解析に失敗しました。\n理由: {error}\n\n▼試したURL\n{}",
            url.unwrap_or("なし")
        ),
    }
}

fn compose(title: &str, sections: &[(&str, &String)]) -> String {
    let mut text = String::from(title);
    for (label, body) in sections {
        text.push_str("\n\n");
        text.push_str(label);
        text.push('\n');
        text.push_str(body);
    }
    text
}
