use std::sync::Mutex;

use chrono::{FixedOffset, TimeZone};
use lopdf::{
    Document, Object, Stream, StringFormat,
    content::{Content, Operation},
    dictionary,
};
use pretty_assertions::assert_eq;
use ryoshoku::{
    CandidateUrlBuilder, ColumnStrategy, DocumentLocator, MealRows, MemoryStore, MenuError,
    MenuPipeline, MenuTable, NotificationRequest, PdfTableParser, RunMode, TableParser, WeekCache,
    WindowBounds, requests::Fetch, start_of_week,
};

/// Serves `body` for the first URL containing `needle`, 404 otherwise.
struct OneUrl {
    needle: &'static str,
    body: Vec<u8>,
    attempts: Mutex<Vec<String>>,
}

impl OneUrl {
    fn new(needle: &'static str, body: Vec<u8>) -> Self {
        Self {
            needle,
            body,
            attempts: Mutex::new(Vec::new()),
        }
    }
}

impl Fetch for OneUrl {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, MenuError> {
        self.attempts.lock().unwrap().push(url.to_string());
        if url.contains(self.needle) {
            Ok(self.body.clone())
        } else {
            Err(MenuError::FetchFailed {
                url: url.to_string(),
                reason: "HTTP 404 Not Found".to_string(),
            })
        }
    }
}

struct StubTable(MenuTable);

impl TableParser for StubTable {
    fn parse_first_table(&self, _bytes: &[u8]) -> Result<Option<MenuTable>, MenuError> {
        Ok(Some(self.0.clone()))
    }
}

/// `header` plus 16 rows; `column`'s breakfast, lunch and dinner sit at rows
/// 1, 8 and 15.
fn stacked_rows(header: &[&str], column: usize, breakfast: &str, lunch: &str, dinner: &str) -> Vec<Vec<String>> {
    let mut rows = vec![header.iter().map(|h| h.to_string()).collect::<Vec<_>>()];
    for i in 1..=16 {
        let text = match i {
            1 => breakfast,
            8 => lunch,
            15 => dinner,
            _ => "",
        };
        let mut row = vec![String::new(); header.len()];
        row[0] = format!("r{i}");
        row[column] = text.to_string();
        rows.push(row);
    }
    rows
}

fn seven_am_on_monday() -> chrono::DateTime<FixedOffset> {
    FixedOffset::east_opt(9 * 3600)
        .unwrap()
        .with_ymd_and_hms(2025, 5, 19, 7, 0, 0)
        .unwrap()
}

#[tokio::test]
async fn monday_morning_sends_full_menu() {
    let table = MenuTable::from_strings(stacked_rows(
        &["", "19日", "20日", "21日"],
        1,
        "ご飯\n納豆",
        "ラーメン",
        "唐揚げ",
    ));
    let pipeline = MenuPipeline {
        locator: DocumentLocator::new(
            OneUrl::new("20250519", b"%PDF-stub".to_vec()),
            CandidateUrlBuilder::default(),
        ),
        parser: StubTable(table),
        strategy: ColumnStrategy::default(),
        rows: MealRows::default(),
        windows: WindowBounds::default(),
    };

    let outcome = pipeline
        .produce_notification(NotificationRequest {
            now: seven_am_on_monday(),
            cached_url: None,
            force_url: None,
            mode: RunMode::Scheduled,
        })
        .await;

    assert_eq!(outcome.error, None);
    assert_eq!(
        outcome.message.as_deref(),
        Some(
            "【本日の寮食メニュー (5/19)】\n\n■ 朝食\nご飯 納豆\n\n■ 昼食\nラーメン\n\n■ 夕食\n唐揚げ"
        )
    );
    assert_eq!(
        outcome.url_to_cache.as_deref(),
        Some("https://www.numazu-ct.ac.jp/wp-content/uploads/2025/05/kondate-20250519.pdf")
    );
    assert_eq!(pipeline.locator.fetcher().attempts.lock().unwrap().len(), 1);
}

/// Renders `cells` as a ruled grid on a single PDF page. Text goes through a
/// Type0 font with two-byte codes and a ToUnicode map; code `n` is the `n`-th
/// distinct character.
fn grid_pdf(cells: &[Vec<String>]) -> Vec<u8> {
    let (left, top, w, h) = (40, 800, 80, 24);
    let rows = cells.len() as i32;
    let cols = cells[0].len() as i32;

    let mut chars: Vec<char> = cells.iter().flatten().flat_map(|t| t.chars()).collect();
    chars.sort_unstable();
    chars.dedup();
    let encode = |text: &str| -> Object {
        let bytes = text
            .chars()
            .filter_map(|ch| chars.iter().position(|&c| c == ch))
            .flat_map(|i| (i as u16 + 1).to_be_bytes())
            .collect();
        Object::String(bytes, StringFormat::Hexadecimal)
    };

    let mut ops = Vec::new();
    for r in 0..=rows {
        ops.push(Operation::new("m", vec![left.into(), (top - r * h).into()]));
        ops.push(Operation::new("l", vec![(left + cols * w).into(), (top - r * h).into()]));
    }
    for c in 0..=cols {
        ops.push(Operation::new("m", vec![(left + c * w).into(), top.into()]));
        ops.push(Operation::new("l", vec![(left + c * w).into(), (top - rows * h).into()]));
    }
    ops.push(Operation::new("S", vec![]));
    for (r, row) in cells.iter().enumerate() {
        for (c, text) in row.iter().enumerate() {
            for (line_no, line) in text.lines().enumerate() {
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new("Tf", vec!["F1".into(), 9.into()]));
                ops.push(Operation::new(
                    "Td",
                    vec![
                        (left + c as i32 * w + 4).into(),
                        (top - r as i32 * h - 10 - line_no as i32 * 10).into(),
                    ],
                ));
                ops.push(Operation::new("Tj", vec![encode(line)]));
                ops.push(Operation::new("ET", vec![]));
            }
        }
    }

    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
         /CIDSystemInfo\n<< /Registry (Adobe)\n/Ordering (UCS)\n/Supplement 0\n>> def\n\
         /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );
    cmap.push_str(&format!("{} beginbfchar\n", chars.len()));
    for (i, ch) in chars.iter().enumerate() {
        let mut units = [0u16; 2];
        let unicode: String = ch.encode_utf16(&mut units).iter().map(|u| format!("{u:04X}")).collect();
        cmap.push_str(&format!("<{:04X}> <{unicode}>\n", i + 1));
    }
    cmap.push_str("endbfchar\nendcmap\nCMapName currentdict /CMap defineresource pop\nend\nend");

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let cmap_id = doc.add_object(Stream::new(dictionary! {}, cmap.into_bytes()));
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => "MS-Gothic",
        "Encoding" => "Identity-H",
        "ToUnicode" => cmap_id,
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content { operations: ops };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

#[tokio::test]
async fn real_pdf_through_cache_and_back() {
    let rows = stacked_rows(
        &["", "5/19（月）", "5/20（火）", "5/21（水）"],
        1,
        "ご飯\n味噌汁",
        "ラーメン",
        "唐揚げ",
    );
    let pdf = grid_pdf(&rows);

    // Published a day late, in the previous month's folder.
    let pipeline = MenuPipeline {
        locator: DocumentLocator::new(
            OneUrl::new("/2025/04/kondate-20250520", pdf),
            CandidateUrlBuilder::default(),
        ),
        parser: PdfTableParser::new(),
        strategy: ColumnStrategy::default(),
        rows: MealRows::STACKED,
        windows: WindowBounds::default(),
    };

    let now = seven_am_on_monday();
    let week = start_of_week(now.date_naive());
    let cache = WeekCache::new(Some(MemoryStore::default()));

    let first = pipeline
        .produce_notification(NotificationRequest {
            now,
            cached_url: cache.lookup(week).as_deref(),
            force_url: None,
            mode: RunMode::Scheduled,
        })
        .await;
    assert_eq!(first.error, None);
    let message = first.message.unwrap();
    assert_eq!(
        message,
        "【本日の寮食メニュー (5/19)】\n\n■ 朝食\nご飯 味噌汁\n\n■ 昼食\nラーメン\n\n■ 夕食\n唐揚げ"
    );
    let url = first.url_to_cache.unwrap();
    assert!(url.ends_with("/2025/04/kondate-20250520.pdf"));
    cache.remember(week, &url, now);

    let probes = pipeline.locator.fetcher().attempts.lock().unwrap().len();
    assert!(probes > 1);

    let second = pipeline
        .produce_notification(NotificationRequest {
            now,
            cached_url: cache.lookup(week).as_deref(),
            force_url: None,
            mode: RunMode::Forced,
        })
        .await;
    assert!(second.message.unwrap().starts_with("【献立確認 (5/19)】"));
    assert_eq!(second.url_to_cache, None);
    assert_eq!(pipeline.locator.fetcher().attempts.lock().unwrap().len(), probes + 1);
}

#[tokio::test]
async fn friday_lunch_on_a_day_matching_the_month() {
    let header = ["", "6/2（月）", "6/3（火）", "6/4（水）", "6/5（木）", "6/6（金）"];
    let mut rows = stacked_rows(&header, 5, "パン", "カレー", "焼き魚");
    // Monday's column is filled too, so picking it would show.
    rows[8][1] = "うどん".to_string();
    let pipeline = MenuPipeline {
        locator: DocumentLocator::new(
            OneUrl::new("/2025/06/kondate-20250602", grid_pdf(&rows)),
            CandidateUrlBuilder::default(),
        ),
        parser: PdfTableParser::new(),
        strategy: ColumnStrategy::default(),
        rows: MealRows::STACKED,
        windows: WindowBounds::default(),
    };

    let noon = FixedOffset::east_opt(9 * 3600)
        .unwrap()
        .with_ymd_and_hms(2025, 6, 6, 12, 0, 0)
        .unwrap();
    let outcome = pipeline
        .produce_notification(NotificationRequest {
            now: noon,
            cached_url: None,
            force_url: None,
            mode: RunMode::Scheduled,
        })
        .await;

    assert_eq!(outcome.error, None);
    assert_eq!(outcome.message.as_deref(), Some("【今日の昼食 (6/6)】\n\n■ 昼食\nカレー"));
    assert_eq!(
        outcome.url_to_cache.as_deref(),
        Some("https://www.numazu-ct.ac.jp/wp-content/uploads/2025/06/kondate-20250602.pdf")
    );
}
