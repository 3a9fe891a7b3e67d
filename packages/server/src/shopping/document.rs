//! PDF rendering of a [`DocumentPlan`] via `printpdf`.
//!
//! Layout is A4 portrait with built-in Helvetica, a magenta accent for
//! headings, and blue recipe names. Gallery thumbnails are squeezed into a
//! 50 mm box and hyperlinked to the recipe page, as is the text link below
//! each recipe name.

use std::collections::HashMap;

use printpdf::image_crate::GenericImageView;
use printpdf::{
    Actions, BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, LinkAnnotation, Mm,
    PdfDocument, PdfLayerReference, Rect, Rgb, image_crate,
};
use thiserror::Error;

use super::aggregate::RecipeReference;
use super::plan::{DocumentPlan, ingredient_line};
use crate::error::AppError;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;

const TITLE_SIZE_PT: f32 = 25.0;
const HEADING_SIZE_PT: f32 = 22.0;
const NAME_SIZE_PT: f32 = 20.0;
const BODY_SIZE_PT: f32 = 15.0;

const ROW_STEP_MM: f32 = 10.0;
const THUMB_BOX_MM: f32 = 50.0;
const THUMB_X_MM: f32 = (PAGE_WIDTH_MM - THUMB_BOX_MM) / 2.0;
const THUMB_DPI: f32 = 300.0;

const ACCENT: (f32, f32, f32) = (1.0, 0.09, 0.35);
const LINK_BLUE: (f32, f32, f32) = (0.16, 0.28, 0.80);
const BLACK: (f32, f32, f32) = (0.0, 0.0, 0.0);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot decode image for recipe {recipe}: {detail}")]
    ImageDecode { recipe: String, detail: String },
    #[error("document serialization failed: {0}")]
    Pdf(String),
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::ImageDecode { .. } => AppError::ImageUnresolved(err.to_string()),
            RenderError::Pdf(detail) => AppError::Internal(detail),
        }
    }
}

/// Render the plan to PDF bytes.
///
/// `images` maps recipe id to raw image bytes; every gallery entry with an
/// image reference must have an entry here (see `resolve_images`).
pub fn render(
    plan: &DocumentPlan,
    images: &HashMap<i32, Vec<u8>>,
    base_url: &str,
) -> Result<Vec<u8>, RenderError> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        "Shopping list",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "content",
    );
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;

    for (index, rows) in plan.ingredient_pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "content");
            doc.get_page(page).get_layer(layer)
        };
        let mut y = PAGE_HEIGHT_MM - MARGIN_MM - 10.0;
        if index == 0 {
            layer.set_fill_color(rgb(ACCENT));
            layer.use_text("Shopping list", TITLE_SIZE_PT, Mm(MARGIN_MM), Mm(y), &bold);
            y -= ROW_STEP_MM;
            layer.use_text(
                "Everything you need for the recipes in your cart",
                BODY_SIZE_PT,
                Mm(MARGIN_MM),
                Mm(y),
                &regular,
            );
            y -= 2.0 * ROW_STEP_MM;
        }
        layer.set_fill_color(rgb(BLACK));
        for row in rows {
            layer.use_text(ingredient_line(row), BODY_SIZE_PT, Mm(MARGIN_MM), Mm(y), &regular);
            y -= ROW_STEP_MM;
        }
    }

    let mut gallery_chunks = plan.gallery_pages.iter();
    let (intro_page, intro_layer) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "content");
    let layer = doc.get_page(intro_page).get_layer(intro_layer);
    let mut y = PAGE_HEIGHT_MM - MARGIN_MM - 10.0;
    layer.set_fill_color(rgb(ACCENT));
    layer.use_text(
        "These ingredients make the following recipes",
        HEADING_SIZE_PT,
        Mm(MARGIN_MM),
        Mm(y),
        &bold,
    );
    y -= 2.0 * ROW_STEP_MM;
    if let Some(chunk) = gallery_chunks.next() {
        for entry in chunk {
            y = gallery_entry(&layer, entry, images, base_url, y, &regular, &bold)?;
        }
    }
    for chunk in gallery_chunks {
        let (page, layer_index) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "content");
        let layer = doc.get_page(page).get_layer(layer_index);
        let mut y = PAGE_HEIGHT_MM - MARGIN_MM - 10.0;
        for entry in chunk {
            y = gallery_entry(&layer, entry, images, base_url, y, &regular, &bold)?;
        }
    }

    doc.save_to_bytes().map_err(|e| RenderError::Pdf(e.to_string()))
}

fn rgb((r, g, b): (f32, f32, f32)) -> Color {
    Color::Rgb(Rgb::new(r, g, b, None))
}

fn recipe_url(base_url: &str, id: i32) -> String {
    format!("{}/recipes/{}", base_url.trim_end_matches('/'), id)
}

/// Draw one gallery entry starting at `y` (top of the entry) and return the
/// y position where the next entry should start.
fn gallery_entry(
    layer: &PdfLayerReference,
    entry: &RecipeReference,
    images: &HashMap<i32, Vec<u8>>,
    base_url: &str,
    mut y: f32,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
) -> Result<f32, RenderError> {
    let url = recipe_url(base_url, entry.id);

    layer.set_fill_color(rgb(LINK_BLUE));
    layer.use_text(entry.name.as_str(), NAME_SIZE_PT, Mm(MARGIN_MM), Mm(y), bold);
    y -= ROW_STEP_MM;

    layer.set_fill_color(rgb(BLACK));
    layer.use_text("Open the recipe online", BODY_SIZE_PT, Mm(MARGIN_MM), Mm(y), regular);
    layer.add_link_annotation(LinkAnnotation::new(
        Rect::new(
            Mm(MARGIN_MM),
            Mm(y - 2.0),
            Mm(MARGIN_MM + 70.0),
            Mm(y + 6.0),
        ),
        None,
        None,
        Actions::uri(url.clone()),
        None,
    ));
    y -= ROW_STEP_MM;

    if entry.image.is_some() {
        // resolve_images guarantees the bytes are present
        let bytes = images.get(&entry.id).map(Vec::as_slice).unwrap_or_default();
        let decoded =
            image_crate::load_from_memory(bytes).map_err(|e| RenderError::ImageDecode {
                recipe: entry.name.clone(),
                detail: e.to_string(),
            })?;
        let (px_w, px_h) = decoded.dimensions();
        // Squeeze into the thumbnail box, distorting if needed.
        let natural_w_mm = px_w.max(1) as f32 * 25.4 / THUMB_DPI;
        let natural_h_mm = px_h.max(1) as f32 * 25.4 / THUMB_DPI;
        let image = Image::from_dynamic_image(&decoded);
        let bottom = y - THUMB_BOX_MM;
        image.add_to_layer(
            layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(THUMB_X_MM)),
                translate_y: Some(Mm(bottom)),
                scale_x: Some(THUMB_BOX_MM / natural_w_mm),
                scale_y: Some(THUMB_BOX_MM / natural_h_mm),
                dpi: Some(THUMB_DPI),
                ..Default::default()
            },
        );
        layer.add_link_annotation(LinkAnnotation::new(
            Rect::new(
                Mm(THUMB_X_MM),
                Mm(bottom),
                Mm(THUMB_X_MM + THUMB_BOX_MM),
                Mm(bottom + THUMB_BOX_MM),
            ),
            None,
            None,
            Actions::uri(url),
            None,
        ));
        y = bottom - ROW_STEP_MM;
    } else {
        y -= ROW_STEP_MM;
    }
    Ok(y)
}
