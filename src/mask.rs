//! Label masks produced by thresholding and their scene objects.

use crate::scene::{Footprint, ObjectId, Scene};

use ndarray::Array3;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Colors assigned to mask labels, cycled by label position.
pub const LABEL_PALETTE: [[u8; 3]; 8] = [
    [230, 25, 75],
    [60, 180, 75],
    [255, 225, 25],
    [0, 130, 200],
    [245, 130, 48],
    [145, 30, 180],
    [70, 240, 240],
    [240, 50, 230],
];

fn distinct_labels(mask: &Array3<u8>) -> Vec<u8> {
    mask.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

/// Renumber labels to `0..n` in sorted order, then make the label found at
/// voxel `(0, 0, 0)` the background (0).
pub fn relabel_mask(mask: &Array3<u8>) -> Array3<u8> {
    let mut lookup = [0u8; 256];
    for (new, old) in distinct_labels(mask).into_iter().enumerate() {
        lookup[old as usize] = new as u8;
    }
    let mut relabeled = mask.mapv(|v| lookup[v as usize]);

    if let Some(&corner) = relabeled.get([0, 0, 0]) {
        if corner != 0 {
            relabeled.mapv_inplace(|v| match v {
                0 => corner,
                v if v == corner => 0,
                v => v,
            });
        }
    }
    relabeled
}

/// Add one mask object per non-zero label, all sharing `mask`.
pub fn add_label_mask(scene: &mut Scene, mask: Arc<Array3<u8>>) -> Vec<ObjectId> {
    let ids: Vec<ObjectId> = distinct_labels(&mask)
        .into_iter()
        .enumerate()
        .filter(|&(_, label)| label != 0)
        .map(|(position, label)| {
            let [r, g, b] = LABEL_PALETTE[(position + 1) % LABEL_PALETTE.len()];
            scene.add(
                format!("Otsu Threshold Mask {label}"),
                [r, g, b, 255],
                Footprint::Mask {
                    mask: Arc::clone(&mask),
                    value: label,
                },
            )
        })
        .collect();
    debug!(labels = ids.len(), "label mask added to scene");
    ids
}
