use crate::navigator::AxisOrderNavigator;
use crate::scene::{Footprint, ObjectId, Scene, SceneObject};
use crate::settings::ViewerSettings;
use crate::volume::Volume;

use ndarray::{Array4, ArrayView3, Axis, Zip, aview1, s};
use std::collections::BTreeSet;
use tracing::{debug, instrument, warn};

pub const DEFAULT_HIGHLIGHT_COLOR: [u8; 4] = [0, 255, 0, 255];

/// RGBA raster aligned with a volume's voxel grid, stored `(z, y, x, 4)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayBuffer {
    data: Array4<u8>,
}

impl OverlayBuffer {
    pub fn new(dim: (usize, usize, usize)) -> Self {
        Self {
            data: Array4::zeros((dim.0, dim.1, dim.2, 4)),
        }
    }

    pub fn for_volume(volume: &Volume) -> Self {
        Self::new(volume.dim())
    }

    /// Voxel dimensions (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        let (depth, height, width, _) = self.data.dim();
        (depth, height, width)
    }

    pub fn data(&self) -> &Array4<u8> {
        &self.data
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub fn is_clear(&self) -> bool {
        self.data.iter().all(|&v| v == 0)
    }

    /// Color at image index `[x, y, z]`.
    pub fn pixel(&self, voxel: [usize; 3]) -> Option<[u8; 4]> {
        let [x, y, z] = voxel;
        if !self.in_bounds(voxel) {
            return None;
        }
        let px = self.data.slice(s![z, y, x, ..]);
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn set_pixel(&mut self, voxel: [usize; 3], color: [u8; 4]) -> bool {
        let [x, y, z] = voxel;
        if !self.in_bounds(voxel) {
            return false;
        }
        self.data.slice_mut(s![z, y, x, ..]).assign(&aview1(&color));
        true
    }

    fn in_bounds(&self, voxel: [usize; 3]) -> bool {
        let (depth, height, width) = self.dim();
        voxel[0] < width && voxel[1] < height && voxel[2] < depth
    }

    /// Current slice as (rows, cols, rgba), oriented like the base image.
    pub fn oriented_slice(&self, navigator: &AxisOrderNavigator) -> ArrayView3<'_, u8> {
        let [horizontal, vertical, through] = navigator.image_axis_order();
        let flip = navigator.flip();
        let mut slice = self
            .data
            .view()
            .permuted_axes([2 - vertical, 2 - horizontal, 2 - through, 3])
            .index_axis_move(Axis(2), navigator.current_slice());
        if flip[horizontal] {
            slice.invert_axis(Axis(1));
        }
        if flip[vertical] {
            slice.invert_axis(Axis(0));
        }
        slice
    }
}

/// Rasterizes scene objects into an [`OverlayBuffer`].
///
/// Objects are drawn in scene traversal order and overwrite each other
/// without blending, so the output depends only on the scene, the selection
/// and the volume geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayCompositor {
    pub highlight_color: [u8; 4],
    pub highlight_selected: bool,
}

impl Default for OverlayCompositor {
    fn default() -> Self {
        Self {
            highlight_color: DEFAULT_HIGHLIGHT_COLOR,
            highlight_selected: true,
        }
    }
}

impl OverlayCompositor {
    pub fn from_settings(settings: &ViewerSettings) -> Self {
        Self {
            highlight_color: settings.highlight_color,
            highlight_selected: settings.highlight_selected,
        }
    }

    /// Clear `buffer` and redraw every object in `scene`. Without a scene the
    /// buffer is left untouched.
    #[instrument(skip_all, fields(selected = selected.len()))]
    pub fn render(
        &self,
        scene: Option<&Scene>,
        selected: &BTreeSet<ObjectId>,
        volume: &Volume,
        buffer: &mut OverlayBuffer,
    ) {
        let Some(scene) = scene else {
            return;
        };
        if buffer.dim() != volume.dim() {
            warn!(
                buffer = ?buffer.dim(),
                volume = ?volume.dim(),
                "overlay does not match volume, reallocating"
            );
            *buffer = OverlayBuffer::for_volume(volume);
        } else {
            buffer.clear();
        }

        let objects = scene.objects();
        for object in &objects {
            self.render_object(object, selected, volume, buffer);
        }
        debug!(objects = objects.len(), "overlay rendered");
    }

    /// Draw one object over the current buffer contents.
    pub fn render_object(
        &self,
        object: &SceneObject,
        selected: &BTreeSet<ObjectId>,
        volume: &Volume,
        buffer: &mut OverlayBuffer,
    ) {
        let color = self.color_for(object, selected);
        match &object.footprint {
            Footprint::Voxels(voxels) => {
                for &voxel in voxels {
                    buffer.set_pixel(voxel, color);
                }
            }
            Footprint::Region { min, max } => {
                let (depth, height, width) = buffer.dim();
                let upper = [
                    max[0].min(width.saturating_sub(1)),
                    max[1].min(height.saturating_sub(1)),
                    max[2].min(depth.saturating_sub(1)),
                ];
                if buffer.data.is_empty() || (0..3).any(|axis| min[axis] > upper[axis]) {
                    return;
                }
                let mut region = buffer.data.slice_mut(s![
                    min[2]..=upper[2],
                    min[1]..=upper[1],
                    min[0]..=upper[0],
                    ..
                ]);
                region
                    .lanes_mut(Axis(3))
                    .into_iter()
                    .for_each(|mut px| px.assign(&aview1(&color)));
            }
            Footprint::Mask { mask, value } => {
                if mask.dim() != volume.dim() {
                    warn!(
                        id = %object.id,
                        mask = ?mask.dim(),
                        volume = ?volume.dim(),
                        "mask does not match volume grid, skipped"
                    );
                    return;
                }
                let value = *value;
                Zip::from(buffer.data.lanes_mut(Axis(3)))
                    .and(mask.view())
                    .par_for_each(|mut px, &label| {
                        if label == value {
                            px.assign(&aview1(&color));
                        }
                    });
            }
        }
    }

    fn color_for(&self, object: &SceneObject, selected: &BTreeSet<ObjectId>) -> [u8; 4] {
        if self.highlight_selected && selected.contains(&object.id) {
            self.highlight_color
        } else {
            object.color
        }
    }
}
