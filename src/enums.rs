use serde::{Deserialize, Serialize};

/// Anatomical plane shown in the 2D view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewPlane {
    Axial,
    Coronal,
    Sagittal,
}

impl ViewPlane {
    /// Canonical axes shown as (horizontal, vertical, through-plane).
    pub fn csa_axis_order(self) -> [usize; 3] {
        match self {
            ViewPlane::Axial => [2, 1, 0],
            ViewPlane::Coronal => [2, 0, 1],
            ViewPlane::Sagittal => [1, 0, 2],
        }
    }

    /// Plane for the index produced by the default-plane heuristic
    /// (0 = coronal, 1 = sagittal, 2 = axial).
    pub fn from_heuristic_index(index: usize) -> Self {
        match index % 3 {
            0 => ViewPlane::Coronal,
            1 => ViewPlane::Sagittal,
            _ => ViewPlane::Axial,
        }
    }
}

/// What a press or drag in the 2D view does.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    #[default]
    Point,
    Select,
    WindowLevel,
    Paint,
    Contour,
    Ruler,
    Angle,
    Crop,
}

/// What the render collaborator has to refresh after an event.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Redraw {
    #[default]
    None,
    /// Slice, plane or window changed; overlay contents are unchanged.
    View,
    /// Overlay buffer was re-rendered.
    Overlay,
}

impl Redraw {
    /// The stronger of two redraw requests.
    pub fn merge(self, other: Redraw) -> Redraw {
        match (self, other) {
            (Redraw::Overlay, _) | (_, Redraw::Overlay) => Redraw::Overlay,
            (Redraw::View, _) | (_, Redraw::View) => Redraw::View,
            _ => Redraw::None,
        }
    }
}
