use crate::navigator::AxisOrderNavigator;
use crate::overlay::OverlayBuffer;

use image::{ImageBuffer, Rgba, RgbaImage};
use nalgebra::Matrix3;
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};
use rayon::prelude::*;

/// A scalar voxel grid with its physical geometry.
///
/// Voxels are stored `(z, y, x)`. Image axes are numbered `0 = x`, `1 = y`,
/// `2 = z`, so the extent of image axis `a` is `dim()[2 - a]`.
#[derive(Debug, Clone)]
pub struct Volume {
    pub data: Array3<u16>,
    /// Voxel spacing in mm along image axes (x, y, z).
    pub spacing: (f32, f32, f32),
    /// Direction cosines; column `j` is image axis `j` in physical space.
    pub direction: Matrix3<f64>,
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(Array3::zeros((0, 0, 0)), (1.0, 1.0, 1.0))
    }
}

impl Volume {
    pub fn new(data: Array3<u16>, spacing: (f32, f32, f32)) -> Self {
        Self {
            data,
            spacing,
            direction: Matrix3::identity(),
        }
    }

    pub fn with_direction(mut self, direction: Matrix3<f64>) -> Self {
        self.direction = direction;
        self
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<u16> {
        &self.data
    }

    /// Number of voxels along image axis `axis`.
    pub fn extent(&self, axis: usize) -> usize {
        self.data.len_of(Axis(2 - axis.min(2)))
    }

    pub fn extents(&self) -> [usize; 3] {
        [self.extent(0), self.extent(1), self.extent(2)]
    }

    pub fn spacing_of(&self, axis: usize) -> f32 {
        match axis {
            0 => self.spacing.0,
            1 => self.spacing.1,
            _ => self.spacing.2,
        }
    }

    pub fn contains(&self, voxel: [usize; 3]) -> bool {
        voxel[0] < self.extent(0) && voxel[1] < self.extent(1) && voxel[2] < self.extent(2)
    }

    /// Value at image index `[x, y, z]`.
    pub fn value_at(&self, voxel: [usize; 3]) -> Option<u16> {
        self.data.get([voxel[2], voxel[1], voxel[0]]).copied()
    }

    /// Sums of the direction matrix columns, one entry per row.
    pub fn direction_column_sums(&self) -> [f64; 3] {
        let sums = self.direction.column_sum();
        [sums[0], sums[1], sums[2]]
    }

    /// Image axis aligned with each canonical axis.
    ///
    /// Canonical axis `c` is physical axis `2 - c` (0 = superior-inferior,
    /// 1 = anterior-posterior, 2 = left-right). Each gets the unused image
    /// axis with the largest direction cosine along it; ties go to the lower
    /// image axis.
    pub fn csa_to_image_axis(&self) -> [usize; 3] {
        let mut map = [0usize; 3];
        let mut used = [false; 3];
        for (canonical, slot) in map.iter_mut().enumerate() {
            let physical = 2 - canonical;
            let mut best: Option<(usize, f64)> = None;
            for image_axis in (0..3).filter(|&a| !used[a]) {
                let weight = self.direction[(physical, image_axis)].abs();
                if best.is_none_or(|(_, w)| weight > w) {
                    best = Some((image_axis, weight));
                }
            }
            if let Some((image_axis, _)) = best {
                *slot = image_axis;
                used[image_axis] = true;
            }
        }
        map
    }

    /// View of the current slice as (rows = vertical, cols = horizontal).
    pub fn oriented_slice<'a>(
        data: ArrayView3<'a, u16>,
        navigator: &AxisOrderNavigator,
    ) -> ArrayView2<'a, u16> {
        let [horizontal, vertical, through] = navigator.image_axis_order();
        let flip = navigator.flip();
        let mut slice = data
            .permuted_axes([2 - vertical, 2 - horizontal, 2 - through])
            .index_axis_move(Axis(2), navigator.current_slice());
        if flip[horizontal] {
            slice.invert_axis(Axis(1));
        }
        if flip[vertical] {
            slice.invert_axis(Axis(0));
        }
        slice
    }

    /// Copy of the slice currently selected by `navigator`.
    pub fn view_slice(&self, navigator: &AxisOrderNavigator) -> Option<Array2<u16>> {
        if !self.is_valid_index(navigator) {
            return None;
        }
        Some(Self::oriented_slice(self.data.view(), navigator).to_owned())
    }

    /// Intensity window spanning the `lower` and `upper` quantiles, linearly
    /// interpolated between neighbouring sorted values.
    pub fn auto_window(&self, lower: f64, upper: f64) -> IntensityWindow {
        let mut values: Vec<u16> = self.data.iter().copied().collect();
        if values.is_empty() {
            return IntensityWindow::default();
        }
        values.par_sort_unstable();
        let quantile = |q: f64| {
            let position = q.clamp(0.0, 1.0) * (values.len() - 1) as f64;
            let below = position.floor() as usize;
            let above = position.ceil() as usize;
            let fraction = position - below as f64;
            let (low, high) = (values[below] as f64, values[above] as f64);
            low + (high - low) * fraction
        };
        IntensityWindow::new(quantile(lower), quantile(upper))
    }

    /// Windowed gray slice with the overlay blended on top.
    pub fn render_view(
        &self,
        navigator: &AxisOrderNavigator,
        overlay: &OverlayBuffer,
        window: &IntensityWindow,
        opacity: f32,
    ) -> Option<RgbaImage> {
        if !self.is_valid_index(navigator) || overlay.dim() != self.dim() {
            return None;
        }
        let base = Self::oriented_slice(self.data.view(), navigator);
        let colors = overlay.oriented_slice(navigator);
        let (height, width) = base.dim();
        let opacity = opacity.clamp(0.0, 1.0);

        let base = &base;
        let colors = &colors;
        let pixel_data: Vec<u8> = (0..height)
            .into_par_iter()
            .flat_map_iter(move |row| {
                (0..width).flat_map(move |col| {
                    let gray = window.to_u8(base[[row, col]]) as f32;
                    let alpha = colors[[row, col, 3]] as f32 / 255.0 * opacity;
                    let blend =
                        |c: usize| (gray * (1.0 - alpha) + colors[[row, col, c]] as f32 * alpha) as u8;
                    [blend(0), blend(1), blend(2), 255]
                })
            })
            .collect();

        ImageBuffer::<Rgba<u8>, _>::from_raw(width as u32, height as u32, pixel_data)
    }

    fn is_valid_index(&self, navigator: &AxisOrderNavigator) -> bool {
        let through = navigator.through_axis();
        navigator.current_slice() < self.extent(through)
            && self.extent(0) > 0
            && self.extent(1) > 0
    }
}

/// Linear mapping of raw intensities onto display gray levels.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct IntensityWindow {
    pub min: f64,
    pub max: f64,
}

impl IntensityWindow {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min: min.min(max),
            max: max.max(min),
        }
    }

    pub fn center(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// Shift the center and widen (or narrow) the window; width stays >= 1.
    pub fn adjust(&mut self, center_delta: f64, width_delta: f64) {
        let center = self.center() + center_delta;
        let width = (self.width() + width_delta).max(1.0);
        self.min = center - width / 2.0;
        self.max = center + width / 2.0;
    }

    #[inline]
    pub fn to_u8(&self, value: u16) -> u8 {
        let value = value as f64;
        if self.max <= self.min {
            return if value >= self.min { 255 } else { 0 };
        }
        ((value - self.min) / (self.max - self.min) * 255.0).clamp(0.0, 255.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::ViewPlane;

    fn ramp(depth: usize, height: usize, width: usize) -> Volume {
        let data = Array3::from_shape_fn((depth, height, width), |(z, y, x)| {
            (z * 10_000 + y * 100 + x) as u16
        });
        Volume::new(data, (1.0, 1.0, 2.0))
    }

    #[test]
    fn extents_follow_image_axes() {
        let volume = ramp(5, 6, 7);
        assert_eq!(volume.extents(), [7, 6, 5]);
        assert_eq!(volume.value_at([3, 2, 1]), Some(10_203));
        assert_eq!(volume.value_at([7, 0, 0]), None);
    }

    #[test]
    fn identity_direction_maps_canonical_axes_in_array_order() {
        let volume = ramp(2, 2, 2);
        assert_eq!(volume.csa_to_image_axis(), [2, 1, 0]);
    }

    #[test]
    fn permuted_direction_is_always_a_permutation() {
        let direction = Matrix3::new(0.7, 0.7, 0.0, 0.7, 0.7, 0.0, 0.0, 0.0, 1.0);
        let volume = ramp(2, 2, 2).with_direction(direction);
        let mut map = volume.csa_to_image_axis();
        map.sort_unstable();
        assert_eq!(map, [0, 1, 2]);
    }

    #[test]
    fn axial_slice_has_x_across_and_y_down() {
        let volume = ramp(4, 3, 5);
        let mut navigator = AxisOrderNavigator::new(&volume);
        navigator.set_view_plane(&volume, ViewPlane::Axial);
        navigator.set_slice(2);
        let slice = volume.view_slice(&navigator).expect("slice in range");
        assert_eq!(slice.dim(), (3, 5));
        assert_eq!(slice[[1, 4]], 20_104);
    }

    #[test]
    fn coronal_slice_puts_superior_at_top() {
        let volume = ramp(4, 3, 5);
        let mut navigator = AxisOrderNavigator::new(&volume);
        navigator.set_view_plane(&volume, ViewPlane::Coronal);
        navigator.set_slice(1);
        let slice = volume.view_slice(&navigator).expect("slice in range");
        // rows walk z from the top slice down
        assert_eq!(slice.dim(), (4, 5));
        assert_eq!(slice[[0, 0]], 30_100);
        assert_eq!(slice[[3, 2]], 102);
    }

    #[test]
    fn auto_window_interpolates_between_sorted_values() {
        let data = Array3::from_shape_fn((1, 1, 5), |(_, _, x)| (40 - x * 10) as u16);
        let volume = Volume::new(data, (1.0, 1.0, 1.0));
        let window = volume.auto_window(0.05, 0.99);
        // sorted [0, 10, 20, 30, 40]: positions 0.2 and 3.96
        assert!((window.min - 2.0).abs() < 1e-9);
        assert!((window.max - 39.6).abs() < 1e-9);

        let window = volume.auto_window(0.0, 1.0);
        assert_eq!(window, IntensityWindow::new(0.0, 40.0));
    }

    #[test]
    fn window_maps_and_adjusts() {
        let mut window = IntensityWindow::new(100.0, 200.0);
        assert_eq!(window.to_u8(50), 0);
        assert_eq!(window.to_u8(200), 255);
        assert_eq!(window.to_u8(150), 127);
        window.adjust(10.0, -500.0);
        assert_eq!(window.width(), 1.0);
        assert_eq!(window.center(), 160.0);
        assert_eq!(IntensityWindow::new(7.0, 7.0).to_u8(7), 255);
    }

    #[test]
    fn render_view_blends_overlay() {
        let volume = Volume::new(Array3::zeros((2, 2, 2)), (1.0, 1.0, 1.0));
        let navigator = AxisOrderNavigator::new(&volume);
        let mut overlay = OverlayBuffer::for_volume(&volume);
        overlay.set_pixel([0, 0, navigator.current_slice()], [200, 0, 0, 255]);
        let image = volume
            .render_view(&navigator, &overlay, &IntensityWindow::new(0.0, 1.0), 0.5)
            .expect("view renders");
        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(image.get_pixel(0, 0).0, [100, 0, 0, 255]);
        assert_eq!(image.get_pixel(1, 1).0, [0, 0, 0, 255]);
    }
}
