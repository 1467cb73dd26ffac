mod candidate_url_builder;
mod clock;
mod column_resolver;
mod date_math;
mod document_locator;
mod line_notifier;
mod menu_assembler;
mod menu_error;
mod notification_scheduler;
mod pdf_table;
mod pipeline;
mod table_extractor;
mod week_cache;

pub mod config;
pub mod requests;

pub use candidate_url_builder::{CandidateUrlBuilder, DocumentCandidate};
pub use clock::{Clock, FixedClock, SystemClock};
pub use column_resolver::{ColumnStrategy, find_day_column};
pub use date_math::{add_days, add_weeks, shift_month, start_of_week};
pub use document_locator::{DocumentLocator, ResolvedDocument};
pub use line_notifier::{Delivery, LineNotifier, Notify};
pub use menu_assembler::{DailyMenu, MealRows, NOT_LISTED, assemble};
pub use menu_error::MenuError;
pub use notification_scheduler::{
    Window, WindowBounds, classify_window, date_label, render, render_failure, render_forced,
};
pub use pdf_table::PdfTableParser;
pub use pipeline::{MenuPipeline, NotificationOutcome, NotificationRequest, RunMode};
pub use table_extractor::{MenuTable, TableParser, extract_table};
pub use week_cache::{CachedWeekUrl, JsonFileStore, KeyValueStore, MemoryStore, WeekCache};
