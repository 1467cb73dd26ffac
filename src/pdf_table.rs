//! Table reconstruction for menu PDFs.
//!
//! The menu is drawn as a ruled grid. We replay the first page's content
//! stream, keep the ruling lines and the positioned text, group the rules into
//! connected regions and rebuild the topmost region's grid from its distinct
//! rule coordinates. Underlines and boxes elsewhere on the page are ignored.

use std::collections::BTreeMap;

use log::debug;
use lopdf::{Dictionary, Document, Object, content::Content};

use crate::{MenuError, MenuTable, TableParser};

/// Rule coordinates closer than this (in points) are the same rule.
const SNAP_TOLERANCE: f32 = 1.5;
/// Fragments whose baselines differ by less than this share a line.
const LINE_TOLERANCE: f32 = 2.0;
/// `TJ` adjustments below this (thousandths of an em) read as a word gap.
const WORD_GAP: f32 = -250.0;

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

fn multiply(m1: &Matrix, m2: &Matrix) -> Matrix {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

fn apply(m: &Matrix, x: f32, y: f32) -> (f32, f32) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

fn translation(tx: f32, ty: f32) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    from: (f32, f32),
    to: (f32, f32),
}

#[derive(Debug, Clone)]
struct Fragment {
    x: f32,
    y: f32,
    text: String,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTableParser;

impl PdfTableParser {
    pub fn new() -> Self {
        Self
    }
}

impl TableParser for PdfTableParser {
    fn parse_first_table(&self, bytes: &[u8]) -> Result<Option<MenuTable>, MenuError> {
        let unreadable = |e: lopdf::Error| MenuError::ExtractionError(format!("unreadable PDF: {e}"));

        let doc = Document::load_mem(bytes).map_err(unreadable)?;
        let pages = doc.get_pages();
        let Some(&page_id) = pages.values().next() else {
            return Ok(None);
        };

        let raw = doc.get_page_content(page_id).map_err(unreadable)?;
        let content = Content::decode(&raw).map_err(unreadable)?;
        let fonts = doc.get_page_fonts(page_id).unwrap_or_default();

        let mut page = PageInterpreter::new(&doc, &fonts);
        for op in &content.operations {
            page.apply(&op.operator, &op.operands);
        }
        debug!(
            "first page: {} ruling segments, {} text fragments",
            page.segments.len(),
            page.fragments.len()
        );

        Ok(build_grid(&page.segments, &page.fragments))
    }
}

struct PageInterpreter<'a> {
    doc: &'a Document,
    fonts: &'a BTreeMap<Vec<u8>, &'a Dictionary>,
    ctm: Matrix,
    saved: Vec<Matrix>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    leading: f32,
    font: Option<Vec<u8>>,
    subpath_start: (f32, f32),
    current: (f32, f32),
    pending: Vec<Segment>,
    segments: Vec<Segment>,
    fragments: Vec<Fragment>,
}

impl<'a> PageInterpreter<'a> {
    fn new(doc: &'a Document, fonts: &'a BTreeMap<Vec<u8>, &'a Dictionary>) -> Self {
        Self {
            doc,
            fonts,
            ctm: IDENTITY,
            saved: Vec::new(),
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            leading: 0.0,
            font: None,
            subpath_start: (0.0, 0.0),
            current: (0.0, 0.0),
            pending: Vec::new(),
            segments: Vec::new(),
            fragments: Vec::new(),
        }
    }

    fn apply(&mut self, operator: &str, operands: &[Object]) {
        let nums = numbers(operands);
        match operator {
            "q" => self.saved.push(self.ctm),
            "Q" => {
                if let Some(ctm) = self.saved.pop() {
                    self.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(m) = as_matrix(&nums) {
                    self.ctm = multiply(&m, &self.ctm);
                }
            }
            "m" => {
                if let [x, y, ..] = nums[..] {
                    self.current = apply(&self.ctm, x, y);
                    self.subpath_start = self.current;
                }
            }
            "l" => {
                if let [x, y, ..] = nums[..] {
                    let to = apply(&self.ctm, x, y);
                    self.pending.push(Segment { from: self.current, to });
                    self.current = to;
                }
            }
            "c" | "v" | "y" => {
                if let [.., x, y] = nums[..] {
                    self.current = apply(&self.ctm, x, y);
                }
            }
            "re" => {
                if let [x, y, w, h] = nums[..] {
                    let corners = [
                        apply(&self.ctm, x, y),
                        apply(&self.ctm, x + w, y),
                        apply(&self.ctm, x + w, y + h),
                        apply(&self.ctm, x, y + h),
                    ];
                    for i in 0..4 {
                        self.pending.push(Segment {
                            from: corners[i],
                            to: corners[(i + 1) % 4],
                        });
                    }
                    self.current = corners[0];
                    self.subpath_start = corners[0];
                }
            }
            "h" => self.close_subpath(),
            "s" | "b" | "b*" => {
                self.close_subpath();
                self.segments.append(&mut self.pending);
            }
            "S" | "f" | "F" | "f*" | "B" | "B*" => self.segments.append(&mut self.pending),
            "n" => self.pending.clear(),
            "BT" => {
                self.text_matrix = IDENTITY;
                self.line_matrix = IDENTITY;
            }
            "Tf" => self.font = operands.first().and_then(|o| o.as_name().ok()).map(<[u8]>::to_vec),
            "TL" => {
                if let [leading, ..] = nums[..] {
                    self.leading = leading;
                }
            }
            "Td" => {
                if let [tx, ty, ..] = nums[..] {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let [tx, ty, ..] = nums[..] {
                    self.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = as_matrix(&nums) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(Ok(bytes)) = operands.first().map(Object::as_str) {
                    let text = self.decode(bytes);
                    self.show(text);
                }
            }
            "'" => {
                self.next_line();
                if let Some(Ok(bytes)) = operands.first().map(Object::as_str) {
                    let text = self.decode(bytes);
                    self.show(text);
                }
            }
            "\"" => {
                self.next_line();
                if let Some(Ok(bytes)) = operands.get(2).map(Object::as_str) {
                    let text = self.decode(bytes);
                    self.show(text);
                }
            }
            "TJ" => {
                if let Some(Ok(items)) = operands.first().map(Object::as_array) {
                    let mut text = String::new();
                    for item in items {
                        match item {
                            Object::String(bytes, _) => text.push_str(&self.decode(bytes)),
                            other => {
                                if other.as_float().is_ok_and(|gap| gap < WORD_GAP) {
                                    text.push(' ');
                                }
                            }
                        }
                    }
                    self.show(text);
                }
            }
            _ => {}
        }
    }

    fn close_subpath(&mut self) {
        self.pending.push(Segment {
            from: self.current,
            to: self.subpath_start,
        });
        self.current = self.subpath_start;
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = multiply(&translation(tx, ty), &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    fn decode(&self, bytes: &[u8]) -> String {
        self.font
            .as_ref()
            .and_then(|name| self.fonts.get(name))
            .and_then(|font| font.get_font_encoding(self.doc).ok())
            .and_then(|encoding| Document::decode_text(&encoding, bytes).ok())
            .unwrap_or_else(|| String::from_utf8_lossy(bytes).into_owned())
    }

    fn show(&mut self, text: String) {
        if text.trim().is_empty() {
            return;
        }
        let origin = multiply(&self.text_matrix, &self.ctm);
        self.fragments.push(Fragment {
            x: origin[4],
            y: origin[5],
            text,
        });
    }
}

fn numbers(operands: &[Object]) -> Vec<f32> {
    operands.iter().filter_map(|o| o.as_float().ok()).collect()
}

fn as_matrix(nums: &[f32]) -> Option<Matrix> {
    match nums {
        [a, b, c, d, e, f] => Some([*a, *b, *c, *d, *e, *f]),
        _ => None,
    }
}

/// Merges coordinates within `SNAP_TOLERANCE` of each other, ascending.
fn snap(mut values: Vec<f32>) -> Vec<f32> {
    values.sort_by(f32::total_cmp);
    let mut clusters: Vec<Vec<f32>> = Vec::new();
    for v in values {
        match clusters.last_mut() {
            Some(cluster) if v - cluster[cluster.len() - 1] <= SNAP_TOLERANCE => cluster.push(v),
            _ => clusters.push(vec![v]),
        }
    }
    clusters
        .iter()
        .map(|c| c.iter().sum::<f32>() / c.len() as f32)
        .collect()
}

/// A horizontal or vertical ruling line in page space.
#[derive(Debug, Clone, Copy)]
enum Rule {
    Horizontal { y: f32, x0: f32, x1: f32 },
    Vertical { x: f32, y0: f32, y1: f32 },
}

impl Rule {
    fn from_segment(seg: &Segment) -> Option<Self> {
        let dx = (seg.from.0 - seg.to.0).abs();
        let dy = (seg.from.1 - seg.to.1).abs();
        if dy <= SNAP_TOLERANCE && dx > SNAP_TOLERANCE {
            Some(Rule::Horizontal {
                y: (seg.from.1 + seg.to.1) / 2.0,
                x0: seg.from.0.min(seg.to.0),
                x1: seg.from.0.max(seg.to.0),
            })
        } else if dx <= SNAP_TOLERANCE && dy > SNAP_TOLERANCE {
            Some(Rule::Vertical {
                x: (seg.from.0 + seg.to.0) / 2.0,
                y0: seg.from.1.min(seg.to.1),
                y1: seg.from.1.max(seg.to.1),
            })
        } else {
            None
        }
    }

    fn top(&self) -> f32 {
        match *self {
            Rule::Horizontal { y, .. } => y,
            Rule::Vertical { y1, .. } => y1,
        }
    }

    /// Whether the two rules cross, meet or overlap.
    fn touches(&self, other: &Rule) -> bool {
        let within = |v: f32, lo: f32, hi: f32| v >= lo - SNAP_TOLERANCE && v <= hi + SNAP_TOLERANCE;
        match (*self, *other) {
            (Rule::Horizontal { y, x0, x1 }, Rule::Vertical { x, y0, y1 })
            | (Rule::Vertical { x, y0, y1 }, Rule::Horizontal { y, x0, x1 }) => {
                within(x, x0, x1) && within(y, y0, y1)
            }
            (Rule::Horizontal { y: ya, x0: a0, x1: a1 }, Rule::Horizontal { y: yb, x0: b0, x1: b1 }) => {
                (ya - yb).abs() <= SNAP_TOLERANCE && (within(a0, b0, b1) || within(b0, a0, a1))
            }
            (Rule::Vertical { x: xa, y0: a0, y1: a1 }, Rule::Vertical { x: xb, y0: b0, y1: b1 }) => {
                (xa - xb).abs() <= SNAP_TOLERANCE && (within(a0, b0, b1) || within(b0, a0, a1))
            }
        }
    }
}

/// Groups rules into connected regions, one per candidate table.
fn regions(rules: &[Rule]) -> Vec<Vec<Rule>> {
    fn root(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    let mut parent: Vec<usize> = (0..rules.len()).collect();
    for i in 0..rules.len() {
        for j in i + 1..rules.len() {
            if rules[i].touches(&rules[j]) {
                let (a, b) = (root(&mut parent, i), root(&mut parent, j));
                parent[a] = b;
            }
        }
    }

    let mut groups: BTreeMap<usize, Vec<Rule>> = BTreeMap::new();
    for (i, rule) in rules.iter().enumerate() {
        let r = root(&mut parent, i);
        groups.entry(r).or_default().push(*rule);
    }
    groups.into_values().collect()
}

/// Distinct column and row boundaries of a region; rows top-down.
fn boundaries(region: &[Rule]) -> (Vec<f32>, Vec<f32>) {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for rule in region {
        match *rule {
            Rule::Horizontal { y, .. } => ys.push(y),
            Rule::Vertical { x, .. } => xs.push(x),
        }
    }
    let xs = snap(xs);
    let mut ys = snap(ys);
    // PDF space grows upwards; table rows read top-down.
    ys.reverse();
    (xs, ys)
}

fn build_grid(segments: &[Segment], fragments: &[Fragment]) -> Option<MenuTable> {
    let rules: Vec<Rule> = segments.iter().filter_map(Rule::from_segment).collect();
    let (xs, ys) = regions(&rules)
        .into_iter()
        .filter_map(|region| {
            let top = region.iter().map(Rule::top).fold(f32::MIN, f32::max);
            let (xs, ys) = boundaries(&region);
            (xs.len() >= 2 && ys.len() >= 2).then_some((top, xs, ys))
        })
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, xs, ys)| (xs, ys))?;

    let mut cells: Vec<Vec<Vec<usize>>> = vec![vec![Vec::new(); xs.len() - 1]; ys.len() - 1];
    for (i, frag) in fragments.iter().enumerate() {
        let column = xs.windows(2).position(|w| frag.x >= w[0] && frag.x < w[1]);
        let row = ys.windows(2).position(|w| frag.y <= w[0] && frag.y > w[1]);
        if let (Some(row), Some(column)) = (row, column) {
            cells[row][column].push(i);
        }
    }

    let rows = cells
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|members| cell_text(fragments, members))
                .collect()
        })
        .collect();
    Some(MenuTable::new(rows))
}

/// Joins a cell's fragments top-to-bottom, one output line per text line.
fn cell_text(fragments: &[Fragment], mut members: Vec<usize>) -> Option<String> {
    members.sort_by(|&a, &b| fragments[b].y.total_cmp(&fragments[a].y));

    let mut lines: Vec<Vec<usize>> = Vec::new();
    for i in members {
        match lines.last_mut() {
            Some(line) if (fragments[line[0]].y - fragments[i].y).abs() <= LINE_TOLERANCE => {
                line.push(i)
            }
            _ => lines.push(vec![i]),
        }
    }

    let text = lines
        .into_iter()
        .map(|mut line| {
            // Stable sort keeps content-stream order for fragments at the same x.
            line.sort_by(|&a, &b| fragments[a].x.total_cmp(&fragments[b].x));
            line.iter()
                .map(|&i| fragments[i].text.as_str())
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n");

    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
