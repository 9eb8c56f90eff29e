//! Images as stacks of planes.
use anyhow::{bail, Result};
use image::{imageops, imageops::FilterType, ImageBuffer, Luma};
use ndarray::{Array2, Array3, ArrayD, ArrayView2, IxDyn};

type LumaImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Height and width of an image `[..., H, W]`.
pub(crate) fn image_size(img: &ArrayD<f32>) -> Result<(usize, usize)> {
    let nd = img.ndim();
    if nd < 2 {
        bail!("Expected an image [..., H, W], got shape {:?}", img.shape());
    }
    Ok((img.shape()[nd - 2], img.shape()[nd - 1]))
}

/// Reshapes an image into planes `[N, H, W]` and its leading dimensions.
pub(crate) fn to_planes(img: &ArrayD<f32>) -> Result<(Array3<f32>, Vec<usize>)> {
    let (h, w) = image_size(img)?;
    let lead = img.shape()[..img.ndim() - 2].to_vec();
    let n = lead.iter().product::<usize>();
    let data = img.iter().copied().collect::<Vec<_>>();
    Ok((Array3::from_shape_vec((n, h, w), data)?, lead))
}

/// Inverse of [`to_planes`].
pub(crate) fn from_planes(planes: Array3<f32>, lead: &[usize]) -> Result<ArrayD<f32>> {
    let (_, h, w) = planes.dim();
    let mut shape = lead.to_vec();
    shape.extend([h, w]);
    let data = planes.iter().copied().collect::<Vec<_>>();
    Ok(ArrayD::from_shape_vec(IxDyn(&shape), data)?)
}

/// Applies `f` to every plane of an image.
///
/// All planes must be mapped to the same size.
pub(crate) fn map_planes<F>(img: &ArrayD<f32>, mut f: F) -> Result<ArrayD<f32>>
where
    F: FnMut(ArrayView2<f32>) -> Result<Array2<f32>>,
{
    let (planes, mut shape) = to_planes(img)?;
    let mapped = planes.outer_iter().map(&mut f).collect::<Result<Vec<_>>>()?;
    let (h, w) = mapped
        .first()
        .map_or((planes.dim().1, planes.dim().2), |p| p.dim());
    if mapped.iter().any(|p| p.dim() != (h, w)) {
        bail!("Planes were mapped to different sizes");
    }
    shape.extend([h, w]);
    let data = mapped
        .iter()
        .flat_map(|p| p.iter().copied())
        .collect::<Vec<_>>();
    Ok(ArrayD::from_shape_vec(IxDyn(&shape), data)?)
}

fn to_image(plane: ArrayView2<f32>) -> LumaImage {
    let (h, w) = plane.dim();
    ImageBuffer::from_fn(w as u32, h as u32, |x, y| Luma([plane[[y as usize, x as usize]]]))
}

fn from_image(img: &LumaImage) -> Array2<f32> {
    let (w, h) = img.dimensions();
    Array2::from_shape_fn((h as usize, w as usize), |(y, x)| {
        img.get_pixel(x as u32, y as u32)[0]
    })
}

/// Resizes a plane to `h x w`.
pub(crate) fn resize(plane: ArrayView2<f32>, h: usize, w: usize, filter: FilterType) -> Array2<f32> {
    from_image(&imageops::resize(&to_image(plane), w as u32, h as u32, filter))
}

/// Blurs a plane with a Gaussian of standard deviation `sigma`.
pub(crate) fn blur(plane: ArrayView2<f32>, sigma: f32) -> Array2<f32> {
    from_image(&imageops::blur(&to_image(plane), sigma))
}
