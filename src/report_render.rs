use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfLayerReference,
    Point, Polygon, Rgb, image_crate,
};
use tracing::warn;

use crate::warehouse::{Cell, Table};

/// Fixture overview: kickoff, sides and the season's yellow card totals.
pub const FUTURE_MATCHES_QUERY: &str = "\
    SELECT match_start_datetime as start_date, team_1, team_2, \
    team_1_yellow_cards as yellow_cards_1, team_2_yellow_cards as yellow_cards_2 \
    FROM future_matches";

/// League top scorers playing for either side of an upcoming fixture,
/// best first. UNION deduplicates a scorer whose team appears on both sides.
pub const TOP_SCORERS_QUERY: &str = "\
    SELECT ts.name as name, ts.goals as goals, fm.team_1 as team \
    FROM future_matches as fm \
    JOIN top_scorers as ts on fm.team_1_id = ts.team_id \
    UNION \
    SELECT ts.name as name, ts.goals as goals, fm.team_2 as team \
    FROM future_matches as fm \
    JOIN top_scorers as ts on fm.team_2_id = ts.team_id \
    ORDER BY goals DESC";

/// Team names and recent form, strongest season first.
pub const TEAM_STATS_QUERY: &str = "\
    SELECT name, form \
    FROM teams_stats \
    ORDER BY wins DESC";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    r: u8,
    g: u8,
    b: u8,
}

impl RgbColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn to_pdf(self) -> Color {
        Color::Rgb(Rgb::new(
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
            None,
        ))
    }
}

pub const WHITE: RgbColor = RgbColor::rgb(0xFF, 0xFF, 0xFF);
pub const BLACK: RgbColor = RgbColor::rgb(0x00, 0x00, 0x00);
pub const FORM_WIN: RgbColor = RgbColor::rgb(0x7F, 0xFF, 0x00);
pub const FORM_LOSS: RgbColor = RgbColor::rgb(0xDC, 0x14, 0x3C);
pub const FORM_DRAW: RgbColor = RgbColor::rgb(0x00, 0xBF, 0xFF);

/// Cell color for one form letter.
pub fn form_color(letter: char) -> RgbColor {
    match letter {
        'W' => FORM_WIN,
        'L' => FORM_LOSS,
        'D' => FORM_DRAW,
        _ => WHITE,
    }
}

/// The last five form letters with their cell colors, oldest first. Shorter
/// forms are left-padded with blank white cells so every row has five.
pub fn form_cells(form: &str) -> Vec<(String, RgbColor)> {
    let letters: Vec<char> = form.chars().collect();
    let tail: Vec<char> = letters
        .iter()
        .copied()
        .skip(letters.len().saturating_sub(5))
        .collect();
    let mut cells = vec![(String::new(), WHITE); 5 - tail.len()];
    cells.extend(
        tail.into_iter()
            .map(|letter| (letter.to_string(), form_color(letter))),
    );
    cells
}

/// Column names turned into display headers: underscores out, uppercased.
pub fn header_labels(columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .map(|c| c.replace('_', " ").to_uppercase())
        .collect()
}

/// Per-table display settings.
struct TableStyle {
    /// Relative column widths; the last weight repeats for extra columns.
    weights: &'static [f32],
    header_fill: RgbColor,
    header_font: RgbColor,
    line: RgbColor,
    row_height: f32,
    cell_fill: RgbColor,
    cell_font: RgbColor,
}

const MATCHES_STYLE: TableStyle = TableStyle {
    weights: &[1.0],
    header_fill: RgbColor::rgb(0xFF, 0xA5, 0x77),
    header_font: RgbColor::rgb(0xF9, 0xF9, 0xFF),
    line: WHITE,
    row_height: 12.0,
    cell_fill: WHITE,
    cell_font: BLACK,
};

const SCORERS_STYLE: TableStyle = TableStyle {
    weights: &[1.0],
    header_fill: RgbColor::rgb(0xD5, 0x54, 0x48),
    header_font: RgbColor::rgb(0xF9, 0xF9, 0xFF),
    line: WHITE,
    row_height: 9.0,
    cell_fill: WHITE,
    cell_font: BLACK,
};

const FORM_STYLE: TableStyle = TableStyle {
    weights: &[5.0, 1.0, 1.0, 1.0, 1.0, 1.0],
    header_fill: RgbColor::rgb(0x89, 0x6E, 0x69),
    header_font: RgbColor::rgb(0xF9, 0xF9, 0xFF),
    line: RgbColor::rgb(0x89, 0x6E, 0x69),
    row_height: 12.0,
    cell_fill: WHITE,
    cell_font: BLACK,
};

/// Page box a table or image is anchored to, measured from the top-left of
/// the A4 page.
struct Frame {
    x: f32,
    y_top: f32,
    w: f32,
    h: f32,
}

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const TITLE_SIZE: f32 = 14.0;
const CELL_FONT_SIZE: f32 = 10.0;

const MATCHES_FRAME: Frame = Frame { x: 5.0, y_top: 15.0, w: 200.0, h: 150.0 };
const SCORERS_FRAME: Frame = Frame { x: 5.0, y_top: 85.0, w: 200.0, h: 150.0 };
const FORM_FRAME: Frame = Frame { x: 30.0, y_top: 160.0, w: 150.0, h: 100.0 };
const LOGO_FRAME: Frame = Frame { x: 185.0, y_top: 0.0, w: 20.0, h: 20.0 };
const FOOTER_FRAME: Frame = Frame { x: 85.0, y_top: 250.0, w: 50.0, h: 50.0 };

/// Decoration images placed on the page next to the tables.
pub struct ReportAssets<'a> {
    pub logo: Option<&'a Path>,
    pub footer: Option<&'a Path>,
}

/// Compose the single-page report: centered italic title, the three styled
/// tables, and the decoration images at their fixed positions.
pub fn render_report(
    title: &str,
    future_matches: &Table,
    top_scorers: &Table,
    team_stats: &Table,
    assets: &ReportAssets,
    out: &Path,
) -> Result<()> {
    let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_W), Mm(PAGE_H), "report");
    let layer = doc.get_page(page).get_layer(layer);
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .context("register table font")?;
    let title_font = doc
        .add_builtin_font(BuiltinFont::HelveticaOblique)
        .context("register title font")?;

    draw_centered_text(&layer, &title_font, title, TITLE_SIZE, BLACK, PAGE_H - 10.0);

    draw_table(
        &layer,
        &font,
        &MATCHES_FRAME,
        &MATCHES_STYLE,
        &header_labels(&future_matches.columns),
        &display_rows(future_matches),
        None,
    );
    draw_table(
        &layer,
        &font,
        &SCORERS_FRAME,
        &SCORERS_STYLE,
        &header_labels(&top_scorers.columns),
        &display_rows(top_scorers),
        None,
    );

    let (form_rows, form_colors) = form_display_rows(team_stats);
    draw_table(
        &layer,
        &font,
        &FORM_FRAME,
        &FORM_STYLE,
        &["NAME", "", "", "FORM", "", ""].map(str::to_string),
        &form_rows,
        Some(&form_colors),
    );

    place_image(&layer, assets.logo, &LOGO_FRAME)?;
    place_image(&layer, assets.footer, &FOOTER_FRAME)?;

    let file = File::create(out).with_context(|| format!("create {}", out.display()))?;
    doc.save(&mut BufWriter::new(file)).context("write pdf")?;
    Ok(())
}

/// Name plus the five most recent form letters, with per-cell fill colors.
pub fn form_display_rows(team_stats: &Table) -> (Vec<Vec<String>>, Vec<Vec<RgbColor>>) {
    let name_idx = team_stats.column("name");
    let form_idx = team_stats.column("form");

    let mut rows = Vec::with_capacity(team_stats.rows.len());
    let mut colors = Vec::with_capacity(team_stats.rows.len());
    for row in &team_stats.rows {
        let name = name_idx.map(|i| cell_text(&row[i])).unwrap_or_default();
        let form = form_idx.map(|i| cell_text(&row[i])).unwrap_or_default();

        let mut display = vec![name];
        let mut fills = vec![WHITE];
        for (letter, color) in form_cells(&form) {
            display.push(letter);
            fills.push(color);
        }
        rows.push(display);
        colors.push(fills);
    }
    (rows, colors)
}

fn display_rows(table: &Table) -> Vec<Vec<String>> {
    table
        .rows
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect()
}

fn cell_text(cell: &Cell) -> String {
    match cell {
        Cell::Int(v) => v.to_string(),
        Cell::Text(v) => v.clone(),
        Cell::Null => String::new(),
    }
}

fn draw_table(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    frame: &Frame,
    style: &TableStyle,
    headers: &[String],
    rows: &[Vec<String>],
    cell_fills: Option<&[Vec<RgbColor>]>,
) {
    if headers.is_empty() {
        return;
    }
    let widths = column_widths(style.weights, headers.len(), frame.w);
    // Shrink rows rather than spill out of the frame.
    let row_height = style
        .row_height
        .min(frame.h / (rows.len() as f32 + 1.0));

    let mut y_top = frame.y_top;
    draw_row(
        layer,
        font,
        frame.x,
        y_top,
        row_height,
        &widths,
        headers,
        |_| style.header_fill,
        style.header_font,
        style.line,
    );
    y_top += row_height;

    for (row_idx, row) in rows.iter().enumerate() {
        draw_row(
            layer,
            font,
            frame.x,
            y_top,
            row_height,
            &widths,
            row,
            |col| {
                cell_fills
                    .and_then(|fills| fills.get(row_idx))
                    .and_then(|fills| fills.get(col))
                    .copied()
                    .unwrap_or(style.cell_fill)
            },
            style.cell_font,
            style.line,
        );
        y_top += row_height;
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_row(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    x: f32,
    y_top: f32,
    height: f32,
    widths: &[f32],
    cells: &[String],
    fill_for: impl Fn(usize) -> RgbColor,
    font_color: RgbColor,
    line: RgbColor,
) {
    let mut cell_x = x;
    for (idx, width) in widths.iter().enumerate() {
        fill_rect(layer, cell_x, y_top, *width, height, fill_for(idx), line);
        if let Some(text) = cells.get(idx) {
            if !text.is_empty() {
                let text_x = cell_x + (width - approx_text_width(text, CELL_FONT_SIZE)).max(0.0) / 2.0;
                let baseline = PAGE_H - y_top - height / 2.0 - 1.5;
                layer.set_fill_color(font_color.to_pdf());
                layer.use_text(text.as_str(), CELL_FONT_SIZE, Mm(text_x), Mm(baseline), font);
            }
        }
        cell_x += width;
    }
}

fn column_widths(weights: &[f32], columns: usize, total: f32) -> Vec<f32> {
    let last = weights.last().copied().unwrap_or(1.0);
    let per_column: Vec<f32> = (0..columns)
        .map(|i| weights.get(i).copied().unwrap_or(last))
        .collect();
    let sum: f32 = per_column.iter().sum();
    per_column.iter().map(|w| total * w / sum).collect()
}

fn fill_rect(
    layer: &PdfLayerReference,
    x: f32,
    y_top: f32,
    w: f32,
    h: f32,
    fill: RgbColor,
    line: RgbColor,
) {
    let y0 = PAGE_H - y_top - h;
    let y1 = PAGE_H - y_top;
    let corners = vec![
        (Point::new(Mm(x), Mm(y0)), false),
        (Point::new(Mm(x + w), Mm(y0)), false),
        (Point::new(Mm(x + w), Mm(y1)), false),
        (Point::new(Mm(x), Mm(y1)), false),
    ];
    layer.set_fill_color(fill.to_pdf());
    layer.set_outline_color(line.to_pdf());
    layer.set_outline_thickness(0.2);
    layer.add_polygon(Polygon {
        rings: vec![corners],
        mode: PaintMode::FillStroke,
        winding_order: WindingOrder::NonZero,
    });
}

fn draw_centered_text(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    text: &str,
    size: f32,
    color: RgbColor,
    baseline: f32,
) {
    let x = (PAGE_W - approx_text_width(text, size)).max(0.0) / 2.0;
    layer.set_fill_color(color.to_pdf());
    layer.use_text(text, size, Mm(x), Mm(baseline), font);
}

/// Helvetica averages roughly half an em per glyph; close enough to center
/// headings and short cell values.
fn approx_text_width(text: &str, size_pt: f32) -> f32 {
    const PT_TO_MM: f32 = 0.352_778;
    text.chars().count() as f32 * size_pt * 0.5 * PT_TO_MM
}

fn place_image(layer: &PdfLayerReference, path: Option<&Path>, frame: &Frame) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    if !path.exists() {
        warn!(path = %path.display(), "decoration image missing, skipping");
        return Ok(());
    }
    let decoded = image_crate::open(path).with_context(|| format!("decode {}", path.display()))?;
    let image = printpdf::Image::from_dynamic_image(&decoded);

    const DPI: f32 = 300.0;
    const PX_TO_MM: f32 = 25.4 / DPI;
    let natural_w = image.image.width.0 as f32 * PX_TO_MM;
    let natural_h = image.image.height.0 as f32 * PX_TO_MM;

    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(frame.x)),
            translate_y: Some(Mm(PAGE_H - frame.y_top - frame.h)),
            scale_x: Some(frame.w / natural_w),
            scale_y: Some(frame.h / natural_h),
            dpi: Some(DPI),
            ..Default::default()
        },
    );
    Ok(())
}
