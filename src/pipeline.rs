use chrono::{DateTime, FixedOffset, NaiveDate};
use log::{error, info};

use crate::{
    ColumnStrategy, DailyMenu, DocumentLocator, MealRows, MenuError, TableParser, Window,
    WindowBounds, assemble, classify_window, date_label, extract_table, render, render_failure,
    render_forced, requests::Fetch,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Send whatever the current window calls for.
    Scheduled,
    /// Someone asked; send the full day regardless of the time.
    Forced,
}

#[derive(Debug, Clone, Copy)]
pub struct NotificationRequest<'a> {
    pub now: DateTime<FixedOffset>,
    /// URL cached for the current week, if any.
    pub cached_url: Option<&'a str>,
    /// Fetch exactly this URL instead of searching.
    pub force_url: Option<&'a str>,
    pub mode: RunMode,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct NotificationOutcome {
    /// Text to send; `None` means there is nothing to report.
    pub message: Option<String>,
    /// A newly probed URL the caller should cache for this week.
    pub url_to_cache: Option<String>,
    /// The fatal error behind a diagnostic `message`.
    pub error: Option<MenuError>,
}

impl NotificationOutcome {
    fn failure(error: MenuError, url: Option<&str>) -> Self {
        error!("{error}");
        Self {
            message: Some(render_failure(&error, url)),
            url_to_cache: None,
            error: Some(error),
        }
    }
}

pub struct MenuPipeline<F, P> {
    pub locator: DocumentLocator<F>,
    pub parser: P,
    pub strategy: ColumnStrategy,
    pub rows: MealRows,
    pub windows: WindowBounds,
}

impl<F: Fetch, P: TableParser> MenuPipeline<F, P> {
    pub async fn produce_notification(&self, request: NotificationRequest<'_>) -> NotificationOutcome {
        let today = request.now.date_naive();
        let window = classify_window(request.now.time(), &self.windows);
        if request.mode == RunMode::Scheduled && window == Window::None {
            info!("{} is outside every notification window", request.now.time());
            return NotificationOutcome::default();
        }

        let located = match request.force_url {
            Some(url) => self.locator.locate_url(url).await,
            None => self.locator.locate(today, request.cached_url).await,
        };
        let document = match located {
            Ok(document) => document,
            Err(e) => return NotificationOutcome::failure(e, None),
        };

        let menu = match self.menu_for(&document.bytes, today) {
            Ok(menu) => menu,
            Err(e) => return NotificationOutcome::failure(e, Some(&document.url)),
        };

        let label = date_label(today);
        let message = match request.mode {
            RunMode::Forced => Some(render_forced(&menu, &label)),
            RunMode::Scheduled => render(window, &menu, &label),
        };
        // Only documents that held today's column get here, so an older
        // week's file never ends up cached for this week.
        let probed = !document.from_cache && request.force_url.is_none();

        NotificationOutcome {
            message,
            url_to_cache: probed.then_some(document.url),
            error: None,
        }
    }

    fn menu_for(&self, bytes: &[u8], today: NaiveDate) -> Result<DailyMenu, MenuError> {
        let table = extract_table(&self.parser, bytes)?;
        let column = self.strategy.resolve_column(&table, today)?;
        Ok(assemble(&table, column, today, self.rows))
    }
}
