use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use minder_view::{
    enums::ViewPlane,
    mask::{add_label_mask, relabel_mask},
    scene::Scene,
    settings::ViewerSettings,
    viewer::{Viewer2D, ViewerEvent},
    volume::Volume,
};
use ndarray::Array3;
use tracing::info;

#[derive(Clone, Copy, ValueEnum)]
enum Plane {
    Axial,
    Coronal,
    Sagittal,
}

impl From<Plane> for ViewPlane {
    fn from(plane: Plane) -> Self {
        match plane {
            Plane::Axial => ViewPlane::Axial,
            Plane::Coronal => ViewPlane::Coronal,
            Plane::Sagittal => ViewPlane::Sagittal,
        }
    }
}

/// Render one slice of a synthetic phantom with its threshold mask overlaid.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Voxels along x, y and z
    #[arg(long, num_args = 3, default_values_t = [128, 128, 64])]
    extent: Vec<usize>,

    #[arg(long, value_enum)]
    plane: Option<Plane>,

    /// Slice index; clamped to the volume
    #[arg(long)]
    slice: Option<i64>,

    /// Viewer settings file (TOML)
    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long, default_value = "result.png")]
    output: PathBuf,
}

/// Two nested spheres of increasing intensity.
fn phantom(width: usize, height: usize, depth: usize) -> Volume {
    let center = [width as f32 / 2.0, height as f32 / 2.0, depth as f32 / 2.0];
    let radius = center.iter().copied().fold(f32::MAX, f32::min);
    let data = Array3::from_shape_fn((depth, height, width), |(z, y, x)| {
        let d = ((x as f32 - center[0]).powi(2)
            + (y as f32 - center[1]).powi(2)
            + (z as f32 - center[2]).powi(2))
        .sqrt()
            / radius.max(1.0);
        match d {
            d if d < 0.4 => 3000,
            d if d < 0.8 => 1200,
            _ => 100,
        }
    });
    Volume::new(data, (1.0, 1.0, 2.0))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let settings = match &cli.settings {
        Some(path) => ViewerSettings::load_from_path(path)?,
        None => ViewerSettings::default(),
    };

    let volume = phantom(cli.extent[0], cli.extent[1], cli.extent[2]);
    let thresholded = volume.data().mapv(|v| match v {
        v if v >= 3000 => 2u8,
        v if v >= 1200 => 1,
        _ => 0,
    });
    let mut scene = Scene::new();
    add_label_mask(&mut scene, Arc::new(relabel_mask(&thresholded)));

    let mut viewer = Viewer2D::new(settings);
    viewer.load_volume(volume);
    viewer.handle(ViewerEvent::SceneChanged(Some(scene)))?;
    if let Some(plane) = cli.plane {
        viewer.handle(ViewerEvent::SetPlane(plane.into()))?;
    }
    match cli.slice {
        Some(slice) => viewer.handle(ViewerEvent::SliderMoved(slice))?,
        None => {
            let (_, (_, max)) = viewer.slice_state().unwrap_or_default();
            viewer.handle(ViewerEvent::SliderMoved(max as i64 / 2))?
        }
    };

    let image = viewer
        .view_image()
        .ok_or("current slice could not be rendered")?;
    image.save(&cli.output)?;
    if let Some((slice, bounds)) = viewer.slice_state() {
        info!(slice, ?bounds, output = %cli.output.display(), "slice written");
    }
    Ok(())
}
