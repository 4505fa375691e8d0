//! UI-agnostic controller for the 2D view.
//!
//! Widgets translate their callbacks into [`ViewerEvent`]s and hand them to
//! [`Viewer2D::handle`]. Presses and drags are routed to the handler of the
//! current [`InteractionMode`]; the returned [`Redraw`] says what the render
//! collaborator has to refresh.

use crate::enums::{InteractionMode, Redraw, ViewPlane};
use crate::navigator::AxisOrderNavigator;
use crate::overlay::{OverlayBuffer, OverlayCompositor};
use crate::scene::{Footprint, ObjectId, Scene};
use crate::settings::ViewerSettings;
use crate::volume::{IntensityWindow, Volume};

use image::RgbaImage;
use nalgebra::Vector3;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info, instrument};

pub const PAINT_OBJECT_NAME: &str = "Paint";
pub const PAINT_COLOR: [u8; 4] = [255, 0, 0, 255];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewerError {
    #[error("No loaded volume for handle {0}")]
    UnknownVolume(usize),

    #[error("Invalid slice number: {0:?}")]
    InvalidSliceText(String),
}

/// Position of an image in the loaded-image list.
///
/// Unloading an image shifts the handles of every later image down by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VolumeHandle(pub usize);

#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub volume: Volume,
    pub navigator: AxisOrderNavigator,
    pub overlay: OverlayBuffer,
    pub window: IntensityWindow,
}

#[derive(Debug, Default)]
pub struct Workspace {
    images: Vec<LoadedImage>,
}

impl Workspace {
    pub fn load(&mut self, volume: Volume, window_quantiles: (f64, f64)) -> VolumeHandle {
        let navigator = AxisOrderNavigator::new(&volume);
        let overlay = OverlayBuffer::for_volume(&volume);
        let window = volume.auto_window(window_quantiles.0, window_quantiles.1);
        info!(
            dim = ?volume.dim(),
            plane = ?navigator.plane(),
            "volume loaded"
        );
        self.images.push(LoadedImage {
            volume,
            navigator,
            overlay,
            window,
        });
        VolumeHandle(self.images.len() - 1)
    }

    pub fn unload(&mut self, handle: VolumeHandle) -> Result<LoadedImage, ViewerError> {
        self.get(handle)?;
        Ok(self.images.remove(handle.0))
    }

    pub fn get(&self, handle: VolumeHandle) -> Result<&LoadedImage, ViewerError> {
        self.images
            .get(handle.0)
            .ok_or(ViewerError::UnknownVolume(handle.0))
    }

    pub fn get_mut(&mut self, handle: VolumeHandle) -> Result<&mut LoadedImage, ViewerError> {
        self.images
            .get_mut(handle.0)
            .ok_or(ViewerError::UnknownVolume(handle.0))
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    SetMode(InteractionMode),
    SetActive(VolumeHandle),
    SetPlane(ViewPlane),
    SliderMoved(i64),
    SliceText(String),
    /// Overlay opacity in percent.
    OpacityChanged(i32),
    Reset,
    SceneChanged(Option<Scene>),
    SelectionChanged(BTreeSet<ObjectId>),
    Press { col: usize, row: usize },
    Drag { col: usize, row: usize, dx: f64, dy: f64 },
}

impl ViewerEvent {
    fn name(&self) -> &'static str {
        match self {
            ViewerEvent::SetMode(_) => "set_mode",
            ViewerEvent::SetActive(_) => "set_active",
            ViewerEvent::SetPlane(_) => "set_plane",
            ViewerEvent::SliderMoved(_) => "slider_moved",
            ViewerEvent::SliceText(_) => "slice_text",
            ViewerEvent::OpacityChanged(_) => "opacity_changed",
            ViewerEvent::Reset => "reset",
            ViewerEvent::SceneChanged(_) => "scene_changed",
            ViewerEvent::SelectionChanged(_) => "selection_changed",
            ViewerEvent::Press { .. } => "press",
            ViewerEvent::Drag { .. } => "drag",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Measurement {
    Distance { from: [usize; 3], to: [usize; 3], mm: f64 },
    /// Angle at the middle point.
    Angle { points: [[usize; 3]; 3], degrees: f64 },
    Crop { min: [usize; 3], max: [usize; 3] },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub voxel: [usize; 3],
    pub value: u16,
}

#[derive(Debug)]
pub struct Viewer2D {
    workspace: Workspace,
    active: Option<VolumeHandle>,
    scene: Option<Scene>,
    selected: BTreeSet<ObjectId>,
    settings: ViewerSettings,
    compositor: OverlayCompositor,
    mode: InteractionMode,
    pending: Vec<[usize; 3]>,
    contour: Vec<[usize; 3]>,
    measurements: Vec<Measurement>,
    cursor: Option<Cursor>,
}

impl Default for Viewer2D {
    fn default() -> Self {
        Self::new(ViewerSettings::default())
    }
}

impl Viewer2D {
    pub fn new(settings: ViewerSettings) -> Self {
        Self {
            workspace: Workspace::default(),
            active: None,
            scene: None,
            selected: BTreeSet::new(),
            compositor: OverlayCompositor::from_settings(&settings),
            mode: settings.default_mode,
            settings,
            pending: Vec::new(),
            contour: Vec::new(),
            measurements: Vec::new(),
            cursor: None,
        }
    }

    pub fn settings(&self) -> &ViewerSettings {
        &self.settings
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn active(&self) -> Option<VolumeHandle> {
        self.active
    }

    pub fn active_image(&self) -> Option<&LoadedImage> {
        self.active.and_then(|handle| self.workspace.get(handle).ok())
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn selected(&self) -> &BTreeSet<ObjectId> {
        &self.selected
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    pub fn contour(&self) -> &[[usize; 3]] {
        &self.contour
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }

    /// Current slice and its bounds for the active volume.
    pub fn slice_state(&self) -> Option<(usize, (usize, usize))> {
        self.active_image()
            .map(|image| (image.navigator.current_slice(), image.navigator.slice_bounds()))
    }

    /// Load `volume`, make it the active image and draw the scene into it.
    pub fn load_volume(&mut self, volume: Volume) -> VolumeHandle {
        let handle = self.workspace.load(volume, self.settings.window_quantiles);
        self.active = Some(handle);
        self.pending.clear();
        self.render_overlay();
        handle
    }

    pub fn unload_volume(&mut self, handle: VolumeHandle) -> Result<(), ViewerError> {
        self.workspace.unload(handle)?;
        self.active = match self.active {
            Some(active) if active == handle => None,
            Some(active) if active > handle => Some(VolumeHandle(active.0 - 1)),
            other => other,
        };
        info!(handle = handle.0, "volume unloaded");
        Ok(())
    }

    /// Composited view of the active image's current slice.
    pub fn view_image(&self) -> Option<RgbaImage> {
        let image = self.active_image()?;
        image.volume.render_view(
            &image.navigator,
            &image.overlay,
            &image.window,
            self.settings.overlay_opacity,
        )
    }

    #[instrument(skip_all, fields(event = event.name()))]
    pub fn handle(&mut self, event: ViewerEvent) -> Result<Redraw, ViewerError> {
        let redraw = match event {
            ViewerEvent::SetMode(mode) => self.set_mode(mode),
            ViewerEvent::SetActive(handle) => {
                self.workspace.get(handle)?;
                self.active = Some(handle);
                self.pending.clear();
                self.render_overlay().merge(Redraw::View)
            }
            ViewerEvent::SetPlane(plane) => match self.active_mut() {
                Some(image) => {
                    image.navigator.set_view_plane(&image.volume, plane);
                    Redraw::View
                }
                None => Redraw::None,
            },
            ViewerEvent::SliderMoved(index) => self.set_slice(index),
            ViewerEvent::SliceText(text) => {
                if self.active_image().is_none() {
                    return Ok(Redraw::None);
                }
                let index = text
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| ViewerError::InvalidSliceText(text.clone()))?;
                self.set_slice(index)
            }
            ViewerEvent::OpacityChanged(percent) => {
                self.settings.overlay_opacity = percent.clamp(0, 100) as f32 / 100.0;
                Redraw::View
            }
            ViewerEvent::Reset => {
                let quantiles = self.settings.window_quantiles;
                match self.active_mut() {
                    Some(image) => {
                        image.window = image.volume.auto_window(quantiles.0, quantiles.1);
                        image.navigator.set_slice(0);
                        Redraw::View
                    }
                    None => Redraw::None,
                }
            }
            ViewerEvent::SceneChanged(scene) => {
                if let Some(scene) = &scene {
                    self.selected.retain(|id| scene.object(*id).is_some());
                } else {
                    self.selected.clear();
                }
                self.scene = scene;
                self.render_overlay()
            }
            ViewerEvent::SelectionChanged(selected) => {
                self.selected = selected;
                self.render_overlay()
            }
            ViewerEvent::Press { col, row } => match self.voxel_at(col, row) {
                Some(voxel) => self.press(voxel),
                None => Redraw::None,
            },
            ViewerEvent::Drag { col, row, dx, dy } => self.drag(col, row, dx, dy),
        };
        debug!(?redraw, "event handled");
        Ok(redraw)
    }

    fn active_mut(&mut self) -> Option<&mut LoadedImage> {
        let handle = self.active?;
        self.workspace.get_mut(handle).ok()
    }

    fn voxel_at(&self, col: usize, row: usize) -> Option<[usize; 3]> {
        self.active_image()?.navigator.display_to_voxel(col, row)
    }

    fn set_mode(&mut self, mode: InteractionMode) -> Redraw {
        if mode != self.mode {
            info!(from = ?self.mode, to = ?mode, "interaction mode changed");
            self.mode = mode;
            self.pending.clear();
        }
        Redraw::None
    }

    fn set_slice(&mut self, index: i64) -> Redraw {
        match self.active_mut() {
            Some(image) => {
                if image.navigator.set_slice(index) {
                    Redraw::View
                } else {
                    Redraw::None
                }
            }
            None => Redraw::None,
        }
    }

    /// Clear and redraw the active overlay from the scene.
    fn render_overlay(&mut self) -> Redraw {
        let Some(handle) = self.active else {
            return Redraw::None;
        };
        let Ok(image) = self.workspace.get_mut(handle) else {
            return Redraw::None;
        };
        if self.scene.is_none() {
            return Redraw::None;
        }
        self.compositor.render(
            self.scene.as_ref(),
            &self.selected,
            &image.volume,
            &mut image.overlay,
        );
        Redraw::Overlay
    }

    fn press(&mut self, voxel: [usize; 3]) -> Redraw {
        match self.mode {
            InteractionMode::Point => self.point(voxel),
            InteractionMode::Select => self.select(voxel),
            InteractionMode::WindowLevel => Redraw::None,
            InteractionMode::Paint => self.paint(voxel),
            InteractionMode::Contour => {
                self.contour.push(voxel);
                Redraw::View
            }
            InteractionMode::Ruler => self.ruler(voxel),
            InteractionMode::Angle => self.angle(voxel),
            InteractionMode::Crop => self.crop(voxel),
        }
    }

    fn drag(&mut self, col: usize, row: usize, dx: f64, dy: f64) -> Redraw {
        match self.mode {
            InteractionMode::WindowLevel => match self.active_mut() {
                Some(image) => {
                    image.window.adjust(dy, dx);
                    Redraw::View
                }
                None => Redraw::None,
            },
            InteractionMode::Point | InteractionMode::Paint => match self.voxel_at(col, row) {
                Some(voxel) => self.press(voxel),
                None => Redraw::None,
            },
            _ => Redraw::None,
        }
    }

    fn point(&mut self, voxel: [usize; 3]) -> Redraw {
        self.cursor = self
            .active_image()
            .and_then(|image| image.volume.value_at(voxel))
            .map(|value| Cursor { voxel, value });
        Redraw::None
    }

    fn select(&mut self, voxel: [usize; 3]) -> Redraw {
        let Some(id) = self.scene.as_ref().and_then(|scene| scene.pick(voxel)) else {
            return Redraw::None;
        };
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
        debug!(%id, selected = self.selected.len(), "selection toggled");
        self.render_overlay()
    }

    /// Add `voxel` to the paint object and redraw only that object.
    fn paint(&mut self, voxel: [usize; 3]) -> Redraw {
        let Some(handle) = self.active else {
            return Redraw::None;
        };
        let scene = self.scene.get_or_insert_with(Scene::new);
        let existing = scene.find_by_name(PAINT_OBJECT_NAME).map(|object| object.id);
        let id = match existing {
            Some(id) => id,
            None => scene.add(PAINT_OBJECT_NAME, PAINT_COLOR, Footprint::Voxels(Vec::new())),
        };
        let Some(object) = scene.object_mut(id) else {
            return Redraw::None;
        };
        if let Footprint::Voxels(voxels) = &mut object.footprint {
            if voxels.contains(&voxel) {
                return Redraw::None;
            }
            voxels.push(voxel);
        }
        let Ok(image) = self.workspace.get_mut(handle) else {
            return Redraw::None;
        };
        self.compositor
            .render_object(object, &self.selected, &image.volume, &mut image.overlay);
        Redraw::Overlay
    }

    fn ruler(&mut self, voxel: [usize; 3]) -> Redraw {
        self.pending.push(voxel);
        if self.pending.len() < 2 {
            return Redraw::None;
        }
        let (from, to) = (self.pending[0], self.pending[1]);
        self.pending.clear();
        let Some(image) = self.active_image() else {
            return Redraw::None;
        };
        let mm = (physical(&image.volume, to) - physical(&image.volume, from)).norm();
        info!(mm, "distance measured");
        self.measurements.push(Measurement::Distance { from, to, mm });
        Redraw::View
    }

    fn angle(&mut self, voxel: [usize; 3]) -> Redraw {
        self.pending.push(voxel);
        if self.pending.len() < 3 {
            return Redraw::None;
        }
        let points = [self.pending[0], self.pending[1], self.pending[2]];
        self.pending.clear();
        let Some(image) = self.active_image() else {
            return Redraw::None;
        };
        let vertex = physical(&image.volume, points[1]);
        let a = physical(&image.volume, points[0]) - vertex;
        let b = physical(&image.volume, points[2]) - vertex;
        let degrees = if a.norm() == 0.0 || b.norm() == 0.0 {
            0.0
        } else {
            a.angle(&b).to_degrees()
        };
        info!(degrees, "angle measured");
        self.measurements.push(Measurement::Angle { points, degrees });
        Redraw::View
    }

    fn crop(&mut self, voxel: [usize; 3]) -> Redraw {
        self.pending.push(voxel);
        if self.pending.len() < 2 {
            return Redraw::None;
        }
        let (a, b) = (self.pending[0], self.pending[1]);
        self.pending.clear();
        let min = [a[0].min(b[0]), a[1].min(b[1]), a[2].min(b[2])];
        let max = [a[0].max(b[0]), a[1].max(b[1]), a[2].max(b[2])];
        info!(?min, ?max, "crop region set");
        self.measurements.push(Measurement::Crop { min, max });
        Redraw::View
    }
}

/// Voxel position scaled by spacing, in mm.
fn physical(volume: &Volume, voxel: [usize; 3]) -> Vector3<f64> {
    Vector3::new(
        voxel[0] as f64 * volume.spacing_of(0) as f64,
        voxel[1] as f64 * volume.spacing_of(1) as f64,
        voxel[2] as f64 * volume.spacing_of(2) as f64,
    )
}
