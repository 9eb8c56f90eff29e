//! Transforms introducing artificial anomalies into images.
use crate::{
    plane::{blur, from_planes, image_size, map_planes, resize, to_planes},
    Transform,
};
use anyhow::{bail, Result};
use image::imageops::FilterType;
use ndarray::{s, Array2, Array3, ArrayD, ArrayView2};
use rand::{rngs::StdRng, Rng};
use std::str::FromStr;

fn uniform(rng: &mut StdRng, (lo, hi): (f32, f32)) -> f32 {
    lo + (hi - lo) * rng.gen::<f32>()
}

fn clip01((lo, hi): (f32, f32)) -> (f32, f32) {
    (lo.clamp(0.0, 1.0), hi.clamp(0.0, 1.0))
}

/// Places a random rectangular mask over part of an image.
///
/// Ranges are fractions of the image size. `x` and `y` bound the top left
/// corner, `w` and `h` the size of the mask.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomMask {
    x: (f32, f32),
    y: (f32, f32),
    w: (f32, f32),
    h: (f32, f32),
    fill: f32,
}

impl Default for RandomMask {
    fn default() -> Self {
        Self::new((0.0, 1.0), (0.0, 1.0), (0.2, 0.4), (0.2, 0.4), 0.0)
    }
}

impl RandomMask {
    /// Constructs the transform. Ranges are clipped to `[0, 1]`.
    pub fn new(x: (f32, f32), y: (f32, f32), w: (f32, f32), h: (f32, f32), fill: f32) -> Self {
        Self {
            x: clip01(x),
            y: clip01(y),
            w: clip01(w),
            h: clip01(h),
            fill,
        }
    }
}

impl Transform for RandomMask {
    fn apply(&self, img: &ArrayD<f32>, rng: &mut StdRng) -> Result<ArrayD<f32>> {
        let (img_h, img_w) = image_size(img)?;
        let w = uniform(rng, self.w);
        let h = uniform(rng, self.h);
        let x1 = uniform(rng, (self.x.0, self.x.1 - w));
        let y1 = uniform(rng, (self.y.0, self.y.1 - h));
        let px = |v: f32, size: usize| ((v * size as f32) as isize).clamp(0, size as isize) as usize;
        let (c1, c2) = (px(x1, img_w), px(x1 + w, img_w));
        let (r1, r2) = (px(y1, img_h), px(y1 + h, img_h));

        let (mut planes, lead) = to_planes(img)?;
        if r1 < r2 && c1 < c2 {
            planes.slice_mut(s![.., r1..r2, c1..c2]).fill(self.fill);
        }
        from_planes(planes, &lead)
    }
}

/// How the border of an image is extended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaddingMode {
    /// Zeros.
    Constant,

    /// The last value at the edge.
    Edge,

    /// Reflection without repeating the edge value.
    Reflect,

    /// Reflection repeating the edge value.
    Symmetric,
}

impl PaddingMode {
    /// Index in `[0, n)` read for position `i`, `None` for constant padding.
    pub(crate) fn source(&self, i: isize, n: usize) -> Option<usize> {
        let n = n as isize;
        if (0..n).contains(&i) {
            return Some(i as usize);
        }
        if n == 0 {
            return None;
        }
        match self {
            Self::Constant => None,
            Self::Edge => Some(i.clamp(0, n - 1) as usize),
            Self::Reflect if n == 1 => Some(0),
            Self::Reflect => {
                let period = 2 * (n - 1);
                let m = i.rem_euclid(period);
                Some((if m < n { m } else { period - m }) as usize)
            }
            Self::Symmetric => {
                let period = 2 * n;
                let m = i.rem_euclid(period);
                Some((if m < n { m } else { period - 1 - m }) as usize)
            }
        }
    }

    fn pad(&self, plane: ArrayView2<f32>, p: usize) -> Array2<f32> {
        let (h, w) = plane.dim();
        let p = p as isize;
        Array2::from_shape_fn((h + 2 * p as usize, w + 2 * p as usize), |(r, c)| {
            match (
                self.source(r as isize - p, h),
                self.source(c as isize - p, w),
            ) {
                (Some(r), Some(c)) => plane[[r, c]],
                _ => 0.0,
            }
        })
    }
}

impl FromStr for PaddingMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "constant" => Ok(Self::Constant),
            "edge" => Ok(Self::Edge),
            "reflect" => Ok(Self::Reflect),
            "symmetric" => Ok(Self::Symmetric),
            _ => bail!("Invalid padding mode: {}", s),
        }
    }
}

/// Pads the edges of an image by a random amount, then resizes it back to
/// its original size.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomResizedPad {
    padding_range: (usize, usize),
    padding_modes: Vec<PaddingMode>,
}

impl Default for RandomResizedPad {
    fn default() -> Self {
        Self::new(
            (5, 18),
            vec![
                PaddingMode::Constant,
                PaddingMode::Edge,
                PaddingMode::Reflect,
                PaddingMode::Symmetric,
            ],
        )
    }
}

impl RandomResizedPad {
    /// Constructs the transform. The padding is drawn from the inclusive
    /// range, the mode uniformly from `padding_modes`.
    pub fn new(padding_range: (usize, usize), padding_modes: Vec<PaddingMode>) -> Self {
        let (lo, hi) = padding_range;
        Self {
            padding_range: (lo.min(hi), lo.max(hi)),
            padding_modes,
        }
    }
}

impl Transform for RandomResizedPad {
    fn apply(&self, img: &ArrayD<f32>, rng: &mut StdRng) -> Result<ArrayD<f32>> {
        if self.padding_modes.is_empty() {
            bail!("RandomResizedPad needs at least one padding mode");
        }
        let (h, w) = image_size(img)?;
        let padding = rng.gen_range(self.padding_range.0..=self.padding_range.1);
        let mode = self.padding_modes[rng.gen_range(0..self.padding_modes.len())];
        if h == 0 || w == 0 {
            return Ok(img.clone());
        }
        map_planes(img, |p| Ok(resize(mode.pad(p, padding).view(), h, w, FilterType::Triangle)))
    }
}

/// Scales the brightness of an image by a random factor, clipping to `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomBrightness {
    brightness: (f32, f32),
}

impl Default for RandomBrightness {
    fn default() -> Self {
        Self::new((0.2, 1.2))
    }
}

impl RandomBrightness {
    /// Constructs the transform. Factors below 1 darken the image.
    pub fn new(brightness: (f32, f32)) -> Self {
        Self {
            brightness: (brightness.0.max(0.0), brightness.1),
        }
    }
}

impl Transform for RandomBrightness {
    fn apply(&self, img: &ArrayD<f32>, rng: &mut StdRng) -> Result<ArrayD<f32>> {
        let factor = uniform(rng, self.brightness);
        Ok(img.mapv(|v| (v * factor).clamp(0.0, 1.0)))
    }
}

/// Channels affected by [`SaltAndPepper`] noise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaltAndPepperMode {
    /// The same noise for all channels of a pixel.
    Snp,

    /// Independent noise for each channel.
    Rgb,
}

impl FromStr for SaltAndPepperMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "snp" => Ok(Self::Snp),
            "rgb" => Ok(Self::Rgb),
            _ => bail!("Invalid mode: {}, must be 'snp' or 'rgb'", s),
        }
    }
}

/// Adds salt-and-pepper noise.
///
/// A pixel becomes `pepper` with probability `threshold` and `salt` with
/// probability `threshold`. The image is read as `[..., C, H, W]`. A 2-d image
/// has one channel.
#[derive(Clone, Debug, PartialEq)]
pub struct SaltAndPepper {
    threshold: f32,
    pepper: f32,
    salt: f32,
    mode: SaltAndPepperMode,
}

impl Default for SaltAndPepper {
    fn default() -> Self {
        Self::new(0.05, 0.1, 0.9, SaltAndPepperMode::Snp)
    }
}

impl SaltAndPepper {
    /// Constructs the transform. `pepper` and `salt` are clipped to `[0, 1]`.
    pub fn new(threshold: f32, pepper: f32, salt: f32, mode: SaltAndPepperMode) -> Self {
        Self {
            threshold,
            pepper: pepper.clamp(0.0, 1.0),
            salt: salt.clamp(0.0, 1.0),
            mode,
        }
    }
}

impl Transform for SaltAndPepper {
    fn apply(&self, img: &ArrayD<f32>, rng: &mut StdRng) -> Result<ArrayD<f32>> {
        let (h, w) = image_size(img)?;
        let c = match img.ndim() {
            2 => 1,
            nd => img.shape()[nd - 3],
        };
        let hw = h * w;
        let block = c * hw;
        if block == 0 {
            return Ok(img.clone());
        }
        let noise = match self.mode {
            SaltAndPepperMode::Snp => (0..hw).map(|_| rng.gen::<f32>()).collect::<Vec<_>>(),
            SaltAndPepperMode::Rgb => (0..block).map(|_| rng.gen::<f32>()).collect::<Vec<_>>(),
        };

        let mut out = img.clone();
        for (k, v) in out.iter_mut().enumerate() {
            let u = match self.mode {
                SaltAndPepperMode::Snp => noise[k % hw],
                SaltAndPepperMode::Rgb => noise[k % block],
            };
            if u <= self.threshold {
                *v = self.pepper;
            } else if u >= 1.0 - self.threshold {
                *v = self.salt;
            }
        }
        Ok(out)
    }
}

/// Splits the image at a random row, flips the top part and writes it over
/// the bottom of the image.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomSplitFlipVertical {
    split: (f32, f32),
}

impl Default for RandomSplitFlipVertical {
    fn default() -> Self {
        Self::new((0.5, 0.5))
    }
}

impl RandomSplitFlipVertical {
    /// Constructs the transform. The split is a fraction of the height.
    pub fn new(split: (f32, f32)) -> Self {
        Self { split }
    }
}

impl Transform for RandomSplitFlipVertical {
    fn apply(&self, img: &ArrayD<f32>, rng: &mut StdRng) -> Result<ArrayD<f32>> {
        let (mut planes, lead) = to_planes(img)?;
        let h = planes.dim().1;
        let index = ((h as f32 * uniform(rng, self.split)) as usize).min(h);
        if index > 0 {
            let top = planes.slice(s![.., ..index;-1, ..]).to_owned();
            planes.slice_mut(s![.., h - index.., ..]).assign(&top);
        }
        from_planes(planes, &lead)
    }
}

/// Splits the image at a random column, flips the left part and writes it
/// over the right of the image.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomSplitFlipHorizontal {
    split: (f32, f32),
}

impl Default for RandomSplitFlipHorizontal {
    fn default() -> Self {
        Self::new((0.5, 0.5))
    }
}

impl RandomSplitFlipHorizontal {
    /// Constructs the transform. The split is a fraction of the width.
    pub fn new(split: (f32, f32)) -> Self {
        Self { split }
    }
}

impl Transform for RandomSplitFlipHorizontal {
    fn apply(&self, img: &ArrayD<f32>, rng: &mut StdRng) -> Result<ArrayD<f32>> {
        let (mut planes, lead) = to_planes(img)?;
        let w = planes.dim().2;
        let index = ((w as f32 * uniform(rng, self.split)) as usize).min(w);
        if index > 0 {
            let left = planes.slice(s![.., .., ..index;-1]).to_owned();
            planes.slice_mut(s![.., .., w - index..]).assign(&left);
        }
        from_planes(planes, &lead)
    }
}

/// Blurs an image with a Gaussian kernel of random width.
///
/// The blur reaches at most `kernel_size / 2` pixels from the center, so
/// sigma is capped at `kernel_size / 4`.
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianBlur {
    kernel_size: usize,
    sigma: (f32, f32),
}

impl GaussianBlur {
    /// Constructs the transform with sigma drawn from `[0.1, 2.0]`.
    pub fn new(kernel_size: usize) -> Self {
        Self {
            kernel_size,
            sigma: (0.1, 2.0),
        }
    }

    /// Sets the range of sigma.
    pub fn sigma(mut self, lo: f32, hi: f32) -> Self {
        self.sigma = (lo, hi);
        self
    }
}

impl Transform for GaussianBlur {
    fn apply(&self, img: &ArrayD<f32>, rng: &mut StdRng) -> Result<ArrayD<f32>> {
        if self.kernel_size == 0 || self.kernel_size % 2 == 0 {
            bail!("Kernel size must be odd and positive, got {}", self.kernel_size);
        }
        let sigma = uniform(rng, self.sigma).min(self.kernel_size as f32 / 4.0);
        map_planes(img, |p| Ok(blur(p, sigma)))
    }
}

/// Rotates, translates and scales an image about its center.
///
/// The angle in degrees is drawn from `degrees`, the shift from
/// `±translate.0 * W` horizontally and `±translate.1 * H` vertically, rounded
/// to whole pixels, and the scale factor from `scale`. Pixels are sampled
/// with nearest interpolation; those mapped from outside the image are
/// `fill`.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomAffine {
    degrees: (f32, f32),
    translate: (f32, f32),
    scale: (f32, f32),
    fill: f32,
}

impl RandomAffine {
    /// Constructs the transform with angles in `[-degrees, degrees]`.
    pub fn new(degrees: f32, translate: (f32, f32), scale: (f32, f32)) -> Self {
        Self {
            degrees: (-degrees.abs(), degrees.abs()),
            translate: clip01(translate),
            scale,
            fill: 0.0,
        }
    }

    /// Sets the range of the angle.
    pub fn degrees(mut self, lo: f32, hi: f32) -> Self {
        self.degrees = (lo, hi);
        self
    }

    /// Sets the value of pixels outside the source image.
    pub fn fill(mut self, fill: f32) -> Self {
        self.fill = fill;
        self
    }
}

impl Transform for RandomAffine {
    fn apply(&self, img: &ArrayD<f32>, rng: &mut StdRng) -> Result<ArrayD<f32>> {
        let (planes, lead) = to_planes(img)?;
        let (n, h, w) = planes.dim();

        let (sin, cos) = uniform(rng, self.degrees).to_radians().sin_cos();
        let max_dx = self.translate.0 * w as f32;
        let max_dy = self.translate.1 * h as f32;
        let tx = uniform(rng, (-max_dx, max_dx)).round();
        let ty = uniform(rng, (-max_dy, max_dy)).round();
        let scale = uniform(rng, self.scale);
        if scale <= 0.0 {
            bail!("Scale must be positive, got {}", scale);
        }

        // Each output pixel is mapped back to its source by the inverse transform
        let (cx, cy) = ((w as f32 - 1.0) / 2.0, (h as f32 - 1.0) / 2.0);
        let mut out = Array3::from_elem((n, h, w), self.fill);
        for r in 0..h {
            for c in 0..w {
                let dx = c as f32 - cx - tx;
                let dy = r as f32 - cy - ty;
                let sx = ((cos * dx + sin * dy) / scale + cx).round();
                let sy = ((-sin * dx + cos * dy) / scale + cy).round();
                if sx < 0.0 || sy < 0.0 || sx >= w as f32 || sy >= h as f32 {
                    continue;
                }
                out.slice_mut(s![.., r, c])
                    .assign(&planes.slice(s![.., sy as usize, sx as usize]));
            }
        }
        from_planes(out, &lead)
    }
}

/// Crops a random part of an image and resizes it to a given size.
///
/// The area of the crop is a random fraction (`scale`) of the image and its
/// aspect ratio is drawn log-uniformly from `ratio`. When no valid crop is
/// found in 10 attempts the image is cropped at its center.
#[derive(Clone, Debug)]
pub struct RandomResizedCrop {
    size: (usize, usize),
    scale: (f32, f32),
    ratio: (f32, f32),
    filter: FilterType,
}

impl RandomResizedCrop {
    /// Constructs the transform with output size `(h, w)`.
    pub fn new(size: (usize, usize)) -> Self {
        Self {
            size,
            scale: (0.08, 1.0),
            ratio: (3.0 / 4.0, 4.0 / 3.0),
            filter: FilterType::Triangle,
        }
    }

    /// Sets the range of the area fraction.
    pub fn scale(mut self, lo: f32, hi: f32) -> Self {
        self.scale = (lo, hi);
        self
    }

    /// Sets the range of the aspect ratio.
    pub fn ratio(mut self, lo: f32, hi: f32) -> Self {
        self.ratio = (lo, hi);
        self
    }

    /// Sets the interpolation.
    pub fn filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    /// Top, left, height and width of the crop.
    fn crop_params(&self, h: usize, w: usize, rng: &mut StdRng) -> (usize, usize, usize, usize) {
        let area = (h * w) as f32;
        let log_ratio = (self.ratio.0.ln(), self.ratio.1.ln());
        for _ in 0..10 {
            let target = area * uniform(rng, self.scale);
            let aspect = uniform(rng, log_ratio).exp();
            let cw = (target * aspect).sqrt().round() as usize;
            let ch = (target / aspect).sqrt().round() as usize;
            if 0 < cw && cw <= w && 0 < ch && ch <= h {
                let top = rng.gen_range(0..=h - ch);
                let left = rng.gen_range(0..=w - cw);
                return (top, left, ch, cw);
            }
        }

        let in_ratio = w as f32 / h as f32;
        let (ch, cw) = if in_ratio < self.ratio.0 {
            (((w as f32 / self.ratio.0).round() as usize).min(h), w)
        } else if in_ratio > self.ratio.1 {
            (h, ((h as f32 * self.ratio.1).round() as usize).min(w))
        } else {
            (h, w)
        };
        ((h - ch) / 2, (w - cw) / 2, ch, cw)
    }
}

impl Transform for RandomResizedCrop {
    fn apply(&self, img: &ArrayD<f32>, rng: &mut StdRng) -> Result<ArrayD<f32>> {
        let (h, w) = image_size(img)?;
        if h == 0 || w == 0 {
            bail!("Cannot crop an empty image of shape {:?}", img.shape());
        }
        let (top, left, ch, cw) = self.crop_params(h, w, rng);
        let (out_h, out_w) = self.size;
        map_planes(img, |p| {
            let crop = p.slice(s![top..top + ch, left..left + cw]);
            Ok(resize(crop, out_h, out_w, self.filter))
        })
    }
}
