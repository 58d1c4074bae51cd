// src/pdf.rs
//
// Landscape PDF export of a user's absence records: seven-column table with
// greedy wrapping and pagination, optional watermark and header band, and a
// QR verification block after the last row.

use chrono::Utc;
use once_cell::sync::OnceCell;
use printpdf::image_crate::{self, DynamicImage, GenericImageView, Luma};
use printpdf::{
    BuiltinFont, Color, Image, ImageRotation, ImageTransform, IndirectFontRef, Line, Mm,
    PdfDocument, PdfLayerReference, Point, Px, Rgb,
};
use qrcode::{Color as QrColor, QrCode};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::models::Record;

// --- Page Geometry (landscape A4, millimetres) ---

pub const PAGE_W_MM: f32 = 297.0;
pub const PAGE_H_MM: f32 = 210.0;
pub const MARGIN_LEFT_MM: f32 = 10.0;
pub const MARGIN_RIGHT_MM: f32 = 10.0;
pub const MARGIN_TOP_MM: f32 = 12.0;
pub const MARGIN_BOTTOM_MM: f32 = 14.0;
pub const BODY_W_MM: f32 = PAGE_W_MM - MARGIN_LEFT_MM - MARGIN_RIGHT_MM;

const BODY_FONT_PT: f32 = 8.0;
const HEADER_FONT_PT: f32 = 8.5;
const TITLE_FONT_PT: f32 = 11.0;
const CAPTION_FONT_PT: f32 = 9.0;
pub const LINE_H_MM: f32 = 3.5;
pub const CELL_PAD_MM: f32 = 1.4;
// Distance from a row's top edge down to the first text baseline.
const FIRST_BASELINE_MM: f32 = CELL_PAD_MM + 2.55;

const PT_TO_MM: f32 = 0.352_778;

const HEADER_BAND_MAX_H_MM: f32 = 28.0;
const HEADER_BAND_GAP_MM: f32 = 4.0;
const WATERMARK_W_MM: f32 = 140.0;
const WATERMARK_OPACITY: f32 = 0.12;

const QR_SIDE_MM: f32 = 26.0;
const QR_GAP_MM: f32 = 6.0;
const QR_CAPTION_DROP_MM: f32 = 4.5;

const IMG_DPI: f32 = 300.0;
const PX_TO_MM: f32 = 25.4 / IMG_DPI;

// --- Columns ---

pub struct ColumnSpec {
    pub titulo: &'static str,
    pub ratio: f32,
    pub min_mm: f32,
}

pub const COLUMNS: [ColumnSpec; 7] = [
    ColumnSpec { titulo: "Dependencia", ratio: 0.18, min_mm: 28.0 },
    ColumnSpec { titulo: "Identificación", ratio: 0.12, min_mm: 20.0 },
    ColumnSpec { titulo: "Grado", ratio: 0.07, min_mm: 12.0 },
    ColumnSpec { titulo: "Nombre", ratio: 0.19, min_mm: 30.0 },
    ColumnSpec { titulo: "Novedad", ratio: 0.18, min_mm: 28.0 },
    ColumnSpec { titulo: "Detalle", ratio: 0.16, min_mm: 24.0 },
    ColumnSpec { titulo: "Fecha", ratio: 0.10, min_mm: 18.0 },
];

/// Resolves column widths against the usable body width. Every column gets
/// at least its floor width; the last column absorbs whatever remains so
/// the widths always sum exactly to `body_mm`.
pub fn column_widths(body_mm: f32, specs: &[ColumnSpec]) -> Vec<f32> {
    let mut widths: Vec<f32> = specs
        .iter()
        .map(|spec| (body_mm * spec.ratio).max(spec.min_mm))
        .collect();

    if let Some(last) = widths.len().checked_sub(1) {
        let consumed: f32 = widths[..last].iter().sum();
        widths[last] = body_mm - consumed;
    }

    widths
}

fn column_edges(left_mm: f32, widths: &[f32]) -> Vec<f32> {
    let mut edges = Vec::with_capacity(widths.len() + 1);
    let mut x = left_mm;
    edges.push(x);
    for width in widths {
        x += width;
        edges.push(x);
    }
    edges
}

// --- Text Measurement & Wrapping ---
// Approximate Helvetica advance widths, in em units. Close enough for
// choosing wrap points; the PDF viewer does the real glyph placement.

fn char_width_em(c: char) -> f32 {
    match c {
        'i' | 'j' | 'l' | '!' | '|' | '\'' | '.' | ',' | ':' | ';' => 0.28,
        'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '-' | ' ' => 0.34,
        'm' | 'w' | 'M' | 'W' | '@' => 0.89,
        'A'..='Z' | '0'..='9' | 'Ñ' => 0.67,
        _ => 0.55,
    }
}

pub fn text_width_mm(text: &str, font_pt: f32) -> f32 {
    let em: f32 = text.chars().map(char_width_em).sum();
    em * font_pt * PT_TO_MM
}

/// Greedy word wrap into lines no wider than `max_mm`. Words that alone
/// exceed the width are split mid-word. Always yields at least one line.
pub fn wrap_text(text: &str, max_mm: f32, font_pt: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };

        if text_width_mm(&candidate, font_pt) <= max_mm {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        // The word alone may still be too wide; hard-split it.
        let mut piece = String::new();
        for ch in word.chars() {
            piece.push(ch);
            if text_width_mm(&piece, font_pt) > max_mm && piece.chars().count() > 1 {
                let overflow = piece.pop().unwrap();
                lines.push(std::mem::take(&mut piece));
                piece.push(overflow);
            }
        }
        current = piece;
    }

    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

pub fn row_height_mm(line_count: usize) -> f32 {
    line_count.max(1) as f32 * LINE_H_MM + 2.0 * CELL_PAD_MM
}

fn cell_texts(registro: &Record) -> [String; 7] {
    [
        registro.dependencia.clone(),
        registro.identificacion.clone(),
        registro.grado.clone(),
        registro.nombre.clone(),
        registro.novedad.clone(),
        registro.detalle.clone().unwrap_or_default(),
        registro.created_at.format("%d/%m/%Y %H:%M").to_string(),
    ]
}

fn wrap_row(registro: &Record, widths: &[f32]) -> Vec<Vec<String>> {
    cell_texts(registro)
        .iter()
        .zip(widths)
        .map(|(text, width)| wrap_text(text, width - 2.0 * CELL_PAD_MM, BODY_FONT_PT))
        .collect()
}

fn max_lines(cells: &[Vec<String>]) -> usize {
    cells.iter().map(Vec::len).max().unwrap_or(1)
}

/// Splits rows into pages. A row goes on the current page only when it
/// fits in the remaining space; otherwise a new page starts. A row taller
/// than a whole page still gets a page of its own.
pub fn paginate_rows(row_heights: &[f32], first_avail_mm: f32, next_avail_mm: f32) -> Vec<Vec<usize>> {
    let mut pages: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut avail = first_avail_mm;
    let mut used = 0.0f32;

    for (index, &height) in row_heights.iter().enumerate() {
        if !current.is_empty() && used + height > avail {
            pages.push(std::mem::take(&mut current));
            avail = next_avail_mm;
            used = 0.0;
        }
        current.push(index);
        used += height;
    }

    if !current.is_empty() {
        pages.push(current);
    }
    pages
}

// --- Static Image Caches ---
// Loaded once per process on first use; a missing or corrupt file logs a
// warning and the renderer proceeds without that image.

static WATERMARK_CACHE: OnceCell<Option<DynamicImage>> = OnceCell::new();
static HEADER_CACHE: OnceCell<Option<DynamicImage>> = OnceCell::new();

pub struct ReportAssets {
    pub watermark: Option<&'static DynamicImage>,
    pub header: Option<&'static DynamicImage>,
}

pub fn cached_assets(config: &Config) -> ReportAssets {
    let watermark = WATERMARK_CACHE
        .get_or_init(|| load_image(&config.watermark_path, "watermark").map(soften_watermark))
        .as_ref();
    let header = HEADER_CACHE
        .get_or_init(|| load_image(&config.header_image_path, "header band"))
        .as_ref();

    ReportAssets { watermark, header }
}

fn load_image(path: &str, label: &str) -> Option<DynamicImage> {
    match std::fs::read(path) {
        Ok(bytes) => match image_crate::load_from_memory(&bytes) {
            Ok(img) => {
                info!("Loaded {} image from {}", label, path);
                Some(img)
            }
            Err(e) => {
                warn!("Could not decode {} image {}: {}. Rendering without it.", label, path, e);
                None
            }
        },
        Err(e) => {
            warn!("Could not read {} image {}: {}. Rendering without it.", label, path, e);
            None
        }
    }
}

/// Pre-blends the watermark toward white so it lands on the page at low
/// opacity without needing PDF transparency groups.
fn soften_watermark(img: DynamicImage) -> DynamicImage {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut out = image_crate::RgbImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = pixel[3] as f32 / 255.0 * WATERMARK_OPACITY;
        let blend = |c: u8| (255.0 - alpha * (255.0 - c as f32)).round() as u8;
        out.put_pixel(
            x,
            y,
            image_crate::Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]),
        );
    }

    DynamicImage::ImageRgb8(out)
}

// --- QR ---

const QR_MODULE_SCALE: u32 = 4;
const QR_QUIET_MODULES: u32 = 4;

fn qr_image(payload: &str) -> Result<DynamicImage, String> {
    let code = QrCode::new(payload.as_bytes()).map_err(|e| e.to_string())?;
    let width = code.width() as u32;
    let colors = code.to_colors();

    let side = (width + 2 * QR_QUIET_MODULES) * QR_MODULE_SCALE;
    let mut img = image_crate::GrayImage::from_pixel(side, side, Luma([255u8]));

    for (index, color) in colors.iter().enumerate() {
        if *color == QrColor::Dark {
            let module_x = (index as u32 % width + QR_QUIET_MODULES) * QR_MODULE_SCALE;
            let module_y = (index as u32 / width + QR_QUIET_MODULES) * QR_MODULE_SCALE;
            for dy in 0..QR_MODULE_SCALE {
                for dx in 0..QR_MODULE_SCALE {
                    img.put_pixel(module_x + dx, module_y + dy, Luma([0u8]));
                }
            }
        }
    }

    Ok(DynamicImage::ImageLuma8(img))
}

// --- Drawing Helpers ---

fn natural_size_mm(img: &DynamicImage) -> (f32, f32) {
    let (width, height) = img.dimensions();
    (width as f32 * PX_TO_MM, height as f32 * PX_TO_MM)
}

fn place_image(
    layer: &PdfLayerReference,
    img: &DynamicImage,
    x_mm: f32,
    y_mm: f32,
    w_mm: f32,
    h_mm: f32,
    rotate_deg: Option<f32>,
) {
    let (nat_w, nat_h) = natural_size_mm(img);
    let transform = ImageTransform {
        translate_x: Some(Mm(x_mm)),
        translate_y: Some(Mm(y_mm)),
        rotate: rotate_deg.map(|degrees| ImageRotation {
            angle_ccw_degrees: degrees,
            rotation_center_x: Px((img.width() / 2) as usize),
            rotation_center_y: Px((img.height() / 2) as usize),
        }),
        scale_x: Some(w_mm / nat_w),
        scale_y: Some(h_mm / nat_h),
        dpi: Some(IMG_DPI),
    };

    Image::from_dynamic_image(img).add_to_layer(layer.clone(), transform);
}

fn draw_watermark(layer: &PdfLayerReference, img: &DynamicImage) {
    let (nat_w, nat_h) = natural_size_mm(img);
    let w = WATERMARK_W_MM;
    let h = w * nat_h / nat_w;
    let x = (PAGE_W_MM - w) / 2.0;
    let y = (PAGE_H_MM - h) / 2.0;
    place_image(layer, img, x, y, w, h, Some(-30.0));
}

/// Draws the header image band at the top of the first page and returns
/// the vertical space it consumed.
fn draw_header_band(layer: &PdfLayerReference, img: &DynamicImage) -> f32 {
    let (nat_w, nat_h) = natural_size_mm(img);
    let mut w = BODY_W_MM;
    let mut h = w * nat_h / nat_w;
    if h > HEADER_BAND_MAX_H_MM {
        h = HEADER_BAND_MAX_H_MM;
        w = h * nat_w / nat_h;
    }
    let x = (PAGE_W_MM - w) / 2.0;
    let y = PAGE_H_MM - MARGIN_TOP_MM - h;
    place_image(layer, img, x, y, w, h, None);
    h + HEADER_BAND_GAP_MM
}

fn stroke_line(layer: &PdfLayerReference, x1: f32, y1: f32, x2: f32, y2: f32) {
    let line = Line {
        points: vec![
            (Point::new(Mm(x1), Mm(y1)), false),
            (Point::new(Mm(x2), Mm(y2)), false),
        ],
        is_closed: false,
    };
    layer.add_line(line);
}

fn draw_row_grid(layer: &PdfLayerReference, edges: &[f32], y_top: f32, height: f32) {
    for &x in edges {
        stroke_line(layer, x, y_top, x, y_top - height);
    }
    stroke_line(layer, edges[0], y_top - height, *edges.last().unwrap(), y_top - height);
}

fn draw_table_header(
    layer: &PdfLayerReference,
    bold: &IndirectFontRef,
    edges: &[f32],
    y_top: f32,
) -> f32 {
    let height = row_height_mm(1);
    stroke_line(layer, edges[0], y_top, *edges.last().unwrap(), y_top);
    for (index, spec) in COLUMNS.iter().enumerate() {
        layer.use_text(
            spec.titulo,
            HEADER_FONT_PT,
            Mm(edges[index] + CELL_PAD_MM),
            Mm(y_top - FIRST_BASELINE_MM),
            bold,
        );
    }
    draw_row_grid(layer, edges, y_top, height);
    y_top - height
}

fn draw_row(
    layer: &PdfLayerReference,
    regular: &IndirectFontRef,
    cells: &[Vec<String>],
    edges: &[f32],
    y_top: f32,
    height: f32,
) {
    for (index, lines) in cells.iter().enumerate() {
        let mut baseline = y_top - FIRST_BASELINE_MM;
        for line in lines {
            if !line.is_empty() {
                layer.use_text(
                    line.clone(),
                    BODY_FONT_PT,
                    Mm(edges[index] + CELL_PAD_MM),
                    Mm(baseline),
                    regular,
                );
            }
            baseline -= LINE_H_MM;
        }
    }
    draw_row_grid(layer, edges, y_top, height);
}

fn page_setup(layer: &PdfLayerReference) {
    layer.set_outline_thickness(0.25);
    layer.set_outline_color(Color::Rgb(Rgb::new(0.45, 0.45, 0.45, None)));
    layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
}

// --- Renderer ---

fn pdf_err(e: impl std::fmt::Display) -> AppError {
    AppError::Pdf(e.to_string())
}

/// Renders the full report to an in-memory PDF. Errors surface before any
/// byte reaches the client.
pub fn render_report(
    usuario: &str,
    registros: &[Record],
    assets: &ReportAssets,
) -> Result<Vec<u8>, AppError> {
    let (doc, first_page, first_layer) =
        PdfDocument::new("Registro de Novedades", Mm(PAGE_W_MM), Mm(PAGE_H_MM), "contenido");

    let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_err)?;

    let mut layer = doc.get_page(first_page).get_layer(first_layer);
    page_setup(&layer);
    if let Some(watermark) = assets.watermark {
        draw_watermark(&layer, watermark);
    }

    let mut y = PAGE_H_MM - MARGIN_TOP_MM;
    if let Some(band) = assets.header {
        y -= draw_header_band(&layer, band);
    }

    layer.use_text(
        format!("Registro de novedades - {}", usuario),
        TITLE_FONT_PT,
        Mm(MARGIN_LEFT_MM),
        Mm(y - 5.0),
        &bold,
    );
    y -= 9.0;

    if registros.is_empty() {
        layer.use_text(
            "Sin novedades registradas para este usuario.",
            10.0,
            Mm(MARGIN_LEFT_MM),
            Mm(y - 6.0),
            &regular,
        );
        return doc.save_to_bytes().map_err(pdf_err);
    }

    let widths = column_widths(BODY_W_MM, &COLUMNS);
    let edges = column_edges(MARGIN_LEFT_MM, &widths);
    let wrapped: Vec<Vec<Vec<String>>> = registros.iter().map(|r| wrap_row(r, &widths)).collect();
    let heights: Vec<f32> = wrapped
        .iter()
        .map(|cells| row_height_mm(max_lines(cells)))
        .collect();

    let header_h = row_height_mm(1);
    let first_avail = y - header_h - MARGIN_BOTTOM_MM;
    let next_avail = PAGE_H_MM - MARGIN_TOP_MM - header_h - MARGIN_BOTTOM_MM;
    let pages = paginate_rows(&heights, first_avail, next_avail);

    for (page_index, page_rows) in pages.iter().enumerate() {
        if page_index > 0 {
            let (page, page_layer) = doc.add_page(Mm(PAGE_W_MM), Mm(PAGE_H_MM), "contenido");
            layer = doc.get_page(page).get_layer(page_layer);
            page_setup(&layer);
            if let Some(watermark) = assets.watermark {
                draw_watermark(&layer, watermark);
            }
            y = PAGE_H_MM - MARGIN_TOP_MM;
        }

        y = draw_table_header(&layer, &bold, &edges, y);
        for &row_index in page_rows {
            let height = heights[row_index];
            draw_row(&layer, &regular, &wrapped[row_index], &edges, y, height);
            y -= height;
        }
    }

    // Verification QR. Failure here is not fatal: the report ships without
    // the code and the failure is logged.
    let codigo: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect::<String>()
        .to_uppercase();
    let payload = serde_json::json!({
        "usuario": usuario,
        "generado": Utc::now().to_rfc3339(),
        "total_registros": registros.len(),
        "codigo_verificacion": codigo,
    })
    .to_string();

    match qr_image(&payload) {
        Ok(qr) => {
            let needed = QR_GAP_MM + QR_SIDE_MM + QR_CAPTION_DROP_MM + 2.0;
            if y - needed < MARGIN_BOTTOM_MM {
                let (page, page_layer) = doc.add_page(Mm(PAGE_W_MM), Mm(PAGE_H_MM), "contenido");
                layer = doc.get_page(page).get_layer(page_layer);
                page_setup(&layer);
                if let Some(watermark) = assets.watermark {
                    draw_watermark(&layer, watermark);
                }
                y = PAGE_H_MM - MARGIN_TOP_MM;
            }

            let x = (PAGE_W_MM - QR_SIDE_MM) / 2.0;
            let y_img = y - QR_GAP_MM - QR_SIDE_MM;
            place_image(&layer, &qr, x, y_img, QR_SIDE_MM, QR_SIDE_MM, None);

            let caption = format!("Código de verificación: {}", codigo);
            let caption_x = (PAGE_W_MM - text_width_mm(&caption, CAPTION_FONT_PT)) / 2.0;
            layer.use_text(
                caption,
                CAPTION_FONT_PT,
                Mm(caption_x),
                Mm(y_img - QR_CAPTION_DROP_MM),
                &regular,
            );
        }
        Err(e) => {
            warn!("QR generation failed, omitting verification code: {}", e);
        }
    }

    doc.save_to_bytes().map_err(pdf_err)
}
