use ndarray::{Array2, ArrayView2, Zip, s};

use super::{BoardBounds, Frame};
use crate::Point;

/// Minimum score accepted as a tile when locating the board.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.8;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TemplateMatch {
    /// Top-left corner of the matched window.
    pub at: Point,
    pub score: f32,
}

/// Templates at least twice this size are matched coarse-to-fine, downscaled
/// by `size / PYRAMID_STEP` first.
const PYRAMID_STEP: usize = 16;

/// Score allowance of the coarse pass, a tile off the block grid blurs.
const COARSE_SLACK: f32 = 0.3;

/// Summed-area tables of pixel values and their squares.
struct Integral {
    sum: Array2<f64>,
    sum_sq: Array2<f64>,
}

impl Integral {
    fn new(image: ArrayView2<f32>) -> Self {
        let (rows, cols) = image.dim();
        let mut sum = Array2::zeros([rows + 1, cols + 1]);
        let mut sum_sq = Array2::zeros([rows + 1, cols + 1]);
        for y in 0..rows {
            let mut row_sum = 0.0;
            let mut row_sum_sq = 0.0;
            for x in 0..cols {
                let value = f64::from(image[[y, x]]);
                row_sum += value;
                row_sum_sq += value * value;
                sum[[y + 1, x + 1]] = sum[[y, x + 1]] + row_sum;
                sum_sq[[y + 1, x + 1]] = sum_sq[[y, x + 1]] + row_sum_sq;
            }
        }
        Self { sum, sum_sq }
    }

    fn window(table: &Array2<f64>, (x, y): (usize, usize), (w, h): (usize, usize)) -> f64 {
        table[[y + h, x + w]] - table[[y, x + w]] - table[[y + h, x]] + table[[y, x]]
    }
}

/// Mean-free template with its norm.
struct Template {
    centered: Array2<f32>,
    norm: f64,
}

impl Template {
    /// `None` for a template without contrast.
    fn new(template: ArrayView2<f32>) -> Option<Self> {
        let mean = template.mean()?;
        let centered = template.mapv(|value| value - mean);
        let norm = f64::from(centered.mapv(|value| value * value).sum()).sqrt();
        (norm >= 1e-3).then_some(Self { centered, norm })
    }

    fn score(&self, image: ArrayView2<f32>, integral: &Integral, (x, y): (usize, usize)) -> Option<f32> {
        let (h, w) = self.centered.dim();
        let n = (h * w) as f64;
        let sum = Integral::window(&integral.sum, (x, y), (w, h));
        let sum_sq = Integral::window(&integral.sum_sq, (x, y), (w, h));
        let variance = sum_sq - sum * sum / n;
        if variance < 1e-3 {
            return None;
        }

        let window = image.slice(s![y..y + h, x..x + w]);
        let cross = Zip::from(&window)
            .and(&self.centered)
            .fold(0.0f64, |acc, &pixel, &weight| {
                acc + f64::from(pixel) * f64::from(weight)
            });
        Some((cross / (self.norm * variance.sqrt())) as f32)
    }

    /// Scores every window flagged in `candidates`, keeping those at `threshold` or above.
    fn scan(
        &self,
        image: ArrayView2<f32>,
        candidates: &Array2<bool>,
        threshold: f32,
    ) -> Vec<TemplateMatch> {
        let integral = Integral::new(image);
        candidates
            .indexed_iter()
            .filter(|&(_, &keep)| keep)
            .filter_map(|((y, x), _)| {
                let score = self.score(image, &integral, (x, y))?;
                (score >= threshold).then_some(TemplateMatch {
                    at: (x as u32, y as u32),
                    score,
                })
            })
            .collect()
    }
}

/// Window positions of a `template`-sized window inside `image`, all flagged.
fn every_window(image: ArrayView2<f32>, template: ArrayView2<f32>) -> Array2<bool> {
    let (image_h, image_w) = image.dim();
    let (tmpl_h, tmpl_w) = template.dim();
    Array2::from_elem([image_h - tmpl_h + 1, image_w - tmpl_w + 1], true)
}

/// Block mean of `factor` x `factor` pixels, a partial last block is dropped.
fn downsample(image: ArrayView2<f32>, factor: usize) -> Array2<f32> {
    let (h, w) = image.dim();
    Array2::from_shape_fn([h / factor, w / factor], |(y, x)| {
        image
            .slice(s![y * factor..(y + 1) * factor, x * factor..(x + 1) * factor])
            .mean()
            .unwrap_or_default()
    })
}

/// Full-resolution windows near a match on the downscaled image.
fn coarse_candidates(
    image: ArrayView2<f32>,
    template: ArrayView2<f32>,
    factor: usize,
    threshold: f32,
) -> Array2<bool> {
    let coarse_template = downsample(template, factor);
    let Some(coarse) = Template::new(coarse_template.view()) else {
        return every_window(image, template);
    };
    let coarse_image = downsample(image, factor);
    let hits = coarse.scan(
        coarse_image.view(),
        &every_window(coarse_image.view(), coarse_template.view()),
        threshold - COARSE_SLACK,
    );
    log::trace!("coarse pass at 1/{} kept {} window(s)", factor, hits.len());

    let mut candidates = Array2::from_elem(every_window(image, template).dim(), false);
    let (rows, cols) = candidates.dim();
    for hit in hits {
        let (x, y) = (hit.at.0 as usize * factor, hit.at.1 as usize * factor);
        let xs = x.saturating_sub(factor - 1)..(x + factor).min(cols);
        let ys = y.saturating_sub(factor - 1)..(y + factor).min(rows);
        if !xs.is_empty() && !ys.is_empty() {
            candidates.slice_mut(s![ys, xs]).fill(true);
        }
    }
    candidates
}

/// Normalized correlation coefficient of `template` at every position of `image`.
///
/// Returns the windows scoring at least `threshold`, row-major. Windows without
/// any contrast have no defined score and never match, neither does a flat
/// template. Large templates are first matched on a downscaled image and only
/// scored in full around the coarse hits.
pub fn match_template(
    image: ArrayView2<f32>,
    template: ArrayView2<f32>,
    threshold: f32,
) -> Vec<TemplateMatch> {
    let (image_h, image_w) = image.dim();
    let (tmpl_h, tmpl_w) = template.dim();
    if tmpl_h == 0 || tmpl_w == 0 || tmpl_h > image_h || tmpl_w > image_w {
        return Vec::new();
    }
    let Some(prepared) = Template::new(template) else {
        log::warn!("template has no contrast, skipping it");
        return Vec::new();
    };

    let factor = tmpl_h.min(tmpl_w) / PYRAMID_STEP;
    let candidates = if factor >= 2 {
        coarse_candidates(image, template, factor, threshold)
    } else {
        every_window(image, template)
    };
    prepared.scan(image, &candidates, threshold)
}

/// Finds the board as the bounding box of every tile-template match.
///
/// The bottom-right corner is the last match plus one tile.
pub fn locate_board(
    frame: &Frame,
    templates: &[Frame],
    threshold: f32,
    tile: u32,
) -> Option<BoardBounds> {
    let gray = frame.to_gray();
    let mut matches = Vec::new();

    for (index, template) in templates.iter().enumerate() {
        let found = match_template(gray.view(), template.to_gray().view(), threshold);
        log::debug!("template {} matched {} window(s)", index, found.len());
        matches.extend(found);
    }

    let min_x = matches.iter().map(|m| m.at.0).min()?;
    let min_y = matches.iter().map(|m| m.at.1).min()?;
    let max_x = matches.iter().map(|m| m.at.0).max()?;
    let max_y = matches.iter().map(|m| m.at.1).max()?;

    Some(BoardBounds {
        top_left: (min_x, min_y),
        bottom_right: (max_x + tile, max_y + tile),
    })
}
