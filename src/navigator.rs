//! Per-volume navigation state for the 2D multiplanar view.
//!
//! A navigator maps the anatomical plane being shown onto the volume's image
//! axes, keeps one slice index per image axis and decides which display axes
//! run backwards.

use crate::enums::ViewPlane;
use crate::volume::Volume;

use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisOrderNavigator {
    plane: ViewPlane,
    csa_to_image_axis: [usize; 3],
    csa_axis_order: [usize; 3],
    image_axis_order: [usize; 3],
    flip: [bool; 3],
    slices: [usize; 3],
    extents: [usize; 3],
}

impl AxisOrderNavigator {
    /// Navigation state for a freshly loaded volume, showing its default plane.
    pub fn new(volume: &Volume) -> Self {
        let plane = Self::default_plane(volume);
        let mut navigator = Self {
            plane,
            csa_to_image_axis: volume.csa_to_image_axis(),
            csa_axis_order: plane.csa_axis_order(),
            image_axis_order: [0, 0, 0],
            flip: Self::flip_for_plane(volume, plane),
            slices: [0, 0, 0],
            extents: volume.extents(),
        };
        navigator.set_view_plane(volume, plane);
        navigator
    }

    /// Plane most orthogonal to the head-foot axis of the volume.
    ///
    /// Empirical rule: find the canonical axis stored along image axis 2 and
    /// take plane index `(axis + 2) % 3`, where 0 = coronal, 1 = sagittal and
    /// 2 = axial.
    pub fn default_plane(volume: &Volume) -> ViewPlane {
        let canonical = volume
            .csa_to_image_axis()
            .iter()
            .position(|&axis| axis == 2)
            .unwrap_or_default();
        ViewPlane::from_heuristic_index((canonical + 2) % 3)
    }

    /// Display flips for `plane`, indexed by data axis.
    ///
    /// Starts from the sign of the direction column sums. When canonical axis
    /// 2 runs across the display, data axis 2 is viewed in the negative
    /// direction and its bit is inverted. A navigator takes its flips from
    /// the default plane once, at load, and keeps them for every plane.
    pub fn flip_for_plane(volume: &Volume, plane: ViewPlane) -> [bool; 3] {
        let mut flip = volume.direction_column_sums().map(|sum| sum < 0.0);
        if plane.csa_axis_order()[0] == 2 {
            flip[2] = !flip[2];
        }
        flip
    }

    pub fn set_view_plane(&mut self, volume: &Volume, plane: ViewPlane) {
        self.plane = plane;
        self.csa_to_image_axis = volume.csa_to_image_axis();
        self.csa_axis_order = plane.csa_axis_order();
        self.image_axis_order = self.csa_axis_order.map(|c| self.csa_to_image_axis[c]);
        self.extents = volume.extents();

        let through = self.through_axis();
        self.slices[through] = self.slices[through].min(self.slice_max());
        debug!(
            ?plane,
            image_axis_order = ?self.image_axis_order,
            slice_max = self.slice_max(),
            "view plane set"
        );
    }

    /// Store `index` clamped to the slice bounds. Returns whether the stored
    /// slice changed.
    pub fn set_slice(&mut self, index: i64) -> bool {
        let clamped = index.clamp(0, self.slice_max() as i64) as usize;
        let through = self.through_axis();
        if self.slices[through] == clamped {
            return false;
        }
        self.slices[through] = clamped;
        true
    }

    pub fn plane(&self) -> ViewPlane {
        self.plane
    }

    pub fn csa_axis_order(&self) -> [usize; 3] {
        self.csa_axis_order
    }

    /// Image axes shown as (horizontal, vertical, through-plane).
    pub fn image_axis_order(&self) -> [usize; 3] {
        self.image_axis_order
    }

    pub fn flip(&self) -> [bool; 3] {
        self.flip
    }

    pub fn through_axis(&self) -> usize {
        self.image_axis_order[2]
    }

    pub fn current_slice(&self) -> usize {
        self.slices[self.through_axis()]
    }

    /// Stored slice for an image axis, kept while other planes are shown.
    pub fn slice_for_axis(&self, axis: usize) -> usize {
        self.slices[axis.min(2)]
    }

    pub fn slice_max(&self) -> usize {
        self.extents[self.through_axis()].saturating_sub(1)
    }

    pub fn slice_bounds(&self) -> (usize, usize) {
        (0, self.slice_max())
    }

    /// (width, height) of the displayed slice.
    pub fn display_extent(&self) -> (usize, usize) {
        (
            self.extents[self.image_axis_order[0]],
            self.extents[self.image_axis_order[1]],
        )
    }

    /// Voxel `[x, y, z]` under display pixel (`col`, `row`) of the current slice.
    pub fn display_to_voxel(&self, col: usize, row: usize) -> Option<[usize; 3]> {
        let (width, height) = self.display_extent();
        if col >= width || row >= height {
            return None;
        }
        let [horizontal, vertical, through] = self.image_axis_order;
        let mut voxel = [0usize; 3];
        voxel[horizontal] = if self.flip[horizontal] { width - 1 - col } else { col };
        voxel[vertical] = if self.flip[vertical] { height - 1 - row } else { row };
        voxel[through] = self.current_slice();
        Some(voxel)
    }
}
