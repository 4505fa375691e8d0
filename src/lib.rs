//! # minder-view
//!
//! Slice navigation and overlay compositing for a 2D multiplanar viewer of
//! volumetric medical images.
//!
//! Every loaded [`Volume`](volume::Volume) gets an
//! [`AxisOrderNavigator`](navigator::AxisOrderNavigator) that maps one of the
//! three medical planes onto the volume's image axes:
//!  - Axial
//!  - Coronal
//!  - Sagittal
//!
//! The navigator remembers a slice per image axis and clamps every request
//! to the volume bounds. Scene objects (point sets, boxes and label masks)
//! are rasterized into an [`OverlayBuffer`](overlay::OverlayBuffer) aligned
//! with the voxel grid. Selected objects are drawn in a highlight color.
//!
//! [`Viewer2D`](viewer::Viewer2D) ties both together behind a toolkit-neutral
//! event interface with one handler per interaction mode.
//!
//! # Examples
//!
//! ```
//! # use minder_view::{enums::ViewPlane, viewer::{Viewer2D, ViewerEvent}, volume::Volume};
//! # use ndarray::Array3;
//! let mut viewer = Viewer2D::default();
//! viewer.load_volume(Volume::new(Array3::zeros((50, 100, 100)), (1.0, 1.0, 2.5)));
//! viewer.handle(ViewerEvent::SliderMoved(200)).expect("volume is loaded");
//! assert_eq!(viewer.slice_state(), Some((49, (0, 49))));
//!
//! viewer.handle(ViewerEvent::SetPlane(ViewPlane::Coronal)).expect("volume is loaded");
//! let image = viewer.view_image().expect("slice is in range");
//! assert_eq!(image.dimensions(), (100, 50));
//! ```

pub mod enums;
pub mod mask;
pub mod navigator;
pub mod overlay;
pub mod scene;
pub mod settings;
pub mod viewer;
pub mod volume;
