//! PNG rendering of a [`FeatureBreakdown`].
//!
//! The canvas holds two panels side by side: legitimate transactions on the
//! left, fraudulent on the right. A colored strip above each panel marks which
//! subset it shows. Bars and lines are each scaled to their own maximum, like a
//! twin-axis chart.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::f64::consts::TAU;
use std::io::Cursor;

use crate::models::job::GraphFeature;
use crate::services::analysis::{Bucket, FeatureBreakdown};

pub const WIDTH: u32 = 1000;
pub const HEIGHT: u32 = 600;

const PANEL_WIDTH: u32 = WIDTH / 2;
const MARGIN: u32 = 40;
const STRIP_HEIGHT: u32 = 8;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([60, 60, 60]);
const BAR: Rgb<u8> = Rgb([161, 201, 244]);
const LINE: Rgb<u8> = Rgb([255, 165, 0]);
const LEGITIMATE: Rgb<u8> = Rgb([76, 175, 80]);
const FRAUDULENT: Rgb<u8> = Rgb([229, 57, 53]);
const PIE: [Rgb<u8>; 6] = [
    Rgb([161, 201, 244]),
    Rgb([255, 180, 130]),
    Rgb([141, 229, 161]),
    Rgb([255, 159, 155]),
    Rgb([208, 187, 255]),
    Rgb([222, 187, 155]),
];

/// Plot area of one panel, in pixels.
#[derive(Debug, Clone, Copy)]
struct Area {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

impl Area {
    fn panel(index: u32) -> Self {
        Self {
            x: index * PANEL_WIDTH + MARGIN,
            y: MARGIN,
            w: PANEL_WIDTH - 2 * MARGIN,
            h: HEIGHT - 2 * MARGIN,
        }
    }

    fn bottom(&self) -> u32 {
        self.y + self.h
    }
}

/// Render the two-panel chart and encode it as PNG.
pub fn render(breakdown: &FeatureBreakdown) -> Result<Vec<u8>, RenderError> {
    let mut canvas = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);

    let panels = [
        (&breakdown.legitimate, LEGITIMATE),
        (&breakdown.fraudulent, FRAUDULENT),
    ];
    for (index, (buckets, marker)) in panels.into_iter().enumerate() {
        let area = Area::panel(index as u32);
        fill_rect(
            &mut canvas,
            area.x,
            area.y - STRIP_HEIGHT * 2,
            area.w,
            STRIP_HEIGHT,
            marker,
        );

        match breakdown.feature {
            GraphFeature::Month => {
                draw_axes(&mut canvas, area);
                draw_bars(&mut canvas, area, &amounts(buckets));
                draw_line(&mut canvas, area, &counts(buckets));
            }
            GraphFeature::DayOfWeek => {
                draw_axes(&mut canvas, area);
                draw_bars(&mut canvas, area, &counts(buckets));
                draw_line(&mut canvas, area, &amounts(buckets));
            }
            GraphFeature::Gender => draw_pie(&mut canvas, area, &counts(buckets)),
            GraphFeature::Category => {
                draw_axes(&mut canvas, area);
                draw_bars(&mut canvas, area, &counts(buckets));
            }
        }
    }

    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(canvas).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

fn counts(buckets: &[Bucket]) -> Vec<f64> {
    buckets.iter().map(|b| b.count as f64).collect()
}

fn amounts(buckets: &[Bucket]) -> Vec<f64> {
    buckets.iter().map(|b| b.amount).collect()
}

fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(0.0, f64::max)
}

fn put(canvas: &mut RgbImage, x: u32, y: u32, color: Rgb<u8>) {
    if x < canvas.width() && y < canvas.height() {
        canvas.put_pixel(x, y, color);
    }
}

fn fill_rect(canvas: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    for px in x..x + w {
        for py in y..y + h {
            put(canvas, px, py, color);
        }
    }
}

fn draw_axes(canvas: &mut RgbImage, area: Area) {
    fill_rect(canvas, area.x, area.y, 2, area.h, AXIS);
    fill_rect(canvas, area.x, area.bottom(), area.w, 2, AXIS);
}

fn draw_bars(canvas: &mut RgbImage, area: Area, values: &[f64]) {
    let max = max_of(values);
    if values.is_empty() || max <= 0.0 {
        return;
    }
    let slot = area.w as f64 / values.len() as f64;
    let bar_width = ((slot * 0.7) as u32).max(1);
    for (i, value) in values.iter().enumerate() {
        let height = (value / max * area.h as f64).round() as u32;
        let x = area.x + (slot * i as f64 + slot * 0.15) as u32;
        fill_rect(canvas, x, area.bottom() - height, bar_width, height, BAR);
    }
}

fn draw_line(canvas: &mut RgbImage, area: Area, values: &[f64]) {
    let max = max_of(values);
    if values.is_empty() || max <= 0.0 {
        return;
    }
    let slot = area.w as f64 / values.len() as f64;
    let points: Vec<(f64, f64)> = values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let x = area.x as f64 + slot * (i as f64 + 0.5);
            let y = area.bottom() as f64 - value / max * area.h as f64;
            (x, y)
        })
        .collect();

    for &(x, y) in &points {
        fill_rect(canvas, x as u32 - 2, y as u32 - 2, 5, 5, LINE);
    }
    for pair in points.windows(2) {
        let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
        let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0) as u32;
        for step in 0..=steps {
            let t = step as f64 / steps as f64;
            let x = (x0 + (x1 - x0) * t) as u32;
            let y = (y0 + (y1 - y0) * t) as u32;
            put(canvas, x, y, LINE);
            put(canvas, x, y + 1, LINE);
        }
    }
}

fn draw_pie(canvas: &mut RgbImage, area: Area, values: &[f64]) {
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return;
    }
    // Cumulative slice boundaries as fractions of the full turn.
    let mut bounds = Vec::with_capacity(values.len());
    let mut acc = 0.0;
    for value in values {
        acc += value / total;
        bounds.push(acc);
    }

    let radius = area.w.min(area.h) as f64 / 2.0;
    let cx = area.x as f64 + area.w as f64 / 2.0;
    let cy = area.y as f64 + area.h as f64 / 2.0;
    for py in area.y..area.bottom() {
        for px in area.x..area.x + area.w {
            let dx = px as f64 + 0.5 - cx;
            let dy = py as f64 + 0.5 - cy;
            if dx * dx + dy * dy > radius * radius {
                continue;
            }
            // Clockwise from twelve o'clock.
            let turn = (dx.atan2(-dy) + TAU) % TAU / TAU;
            let slice = bounds
                .iter()
                .position(|&bound| turn < bound)
                .unwrap_or(values.len() - 1);
            put(canvas, px, py, PIE[slice % PIE.len()]);
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to encode plot: {0}")]
    Encode(#[from] image::ImageError),
}
