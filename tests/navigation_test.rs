use minder_view::enums::ViewPlane;
use minder_view::navigator::AxisOrderNavigator;
use minder_view::volume::Volume;
use nalgebra::Matrix3;
use ndarray::Array3;
use proptest::prelude::*;

const PLANES: [ViewPlane; 3] = [ViewPlane::Axial, ViewPlane::Coronal, ViewPlane::Sagittal];

fn volume(extent: [usize; 3]) -> Volume {
    Volume::new(
        Array3::zeros((extent[2], extent[1], extent[0])),
        (1.0, 1.0, 1.0),
    )
}

/// Direction matrix whose columns are signed unit axes picked by `perm`.
fn signed_permutation(perm: [usize; 3], signs: [bool; 3]) -> Matrix3<f64> {
    let mut direction = Matrix3::zeros();
    for (image_axis, &physical) in perm.iter().enumerate() {
        direction[(physical, image_axis)] = if signs[image_axis] { -1.0 } else { 1.0 };
    }
    direction
}

fn permutations() -> impl Strategy<Value = [usize; 3]> {
    prop::sample::select(vec![
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ])
}

#[test]
fn identity_scenario() {
    let volume = volume([100, 100, 50]);
    let mut navigator = AxisOrderNavigator::new(&volume);
    assert_eq!(navigator.plane(), ViewPlane::Axial);
    navigator.set_slice(200);
    assert_eq!(navigator.current_slice(), 49);
    navigator.set_slice(-5);
    assert_eq!(navigator.current_slice(), 0);
}

#[test]
fn coronal_flip_differs_from_sign_derived_value() {
    let volume = volume([4, 4, 4]);
    assert_eq!(volume.direction_column_sums(), [1.0, 1.0, 1.0]);
    let sign_derived = volume.direction_column_sums().map(|sum| sum < 0.0);
    let flip = AxisOrderNavigator::flip_for_plane(&volume, ViewPlane::Coronal);
    assert_ne!(flip[2], sign_derived[2]);
    assert_eq!(flip[..2], sign_derived[..2]);
}

proptest! {
    #[test]
    fn set_slice_stores_clamped_value(
        x in 1usize..40, y in 1usize..40, z in 1usize..40,
        plane in prop::sample::select(PLANES.to_vec()),
        requests in prop::collection::vec(-100i64..100, 1..8),
    ) {
        let volume = volume([x, y, z]);
        let mut navigator = AxisOrderNavigator::new(&volume);
        navigator.set_view_plane(&volume, plane);
        let max = volume.extent(navigator.through_axis()) as i64 - 1;
        prop_assert_eq!(navigator.slice_bounds(), (0, max as usize));
        for request in requests {
            navigator.set_slice(request);
            prop_assert_eq!(navigator.current_slice() as i64, request.clamp(0, max));
            prop_assert!(!navigator.set_slice(request));
        }
    }

    #[test]
    fn view_plane_is_idempotent(
        perm in permutations(),
        signs in prop::array::uniform3(any::<bool>()),
        plane in prop::sample::select(PLANES.to_vec()),
    ) {
        let volume = volume([5, 6, 7]).with_direction(signed_permutation(perm, signs));
        let mut navigator = AxisOrderNavigator::new(&volume);
        navigator.set_view_plane(&volume, plane);
        let once = navigator.clone();
        navigator.set_view_plane(&volume, plane);
        prop_assert_eq!(navigator, once);
    }

    #[test]
    fn axis_orders_are_permutations(
        perm in permutations(),
        signs in prop::array::uniform3(any::<bool>()),
        plane in prop::sample::select(PLANES.to_vec()),
    ) {
        let volume = volume([5, 6, 7]).with_direction(signed_permutation(perm, signs));
        let mut navigator = AxisOrderNavigator::new(&volume);
        navigator.set_view_plane(&volume, plane);
        let mut order = navigator.image_axis_order();
        order.sort_unstable();
        prop_assert_eq!(order, [0, 1, 2]);
    }

    #[test]
    fn default_plane_looks_down_the_head_foot_axis(
        perm in permutations(),
        signs in prop::array::uniform3(any::<bool>()),
    ) {
        let volume = volume([5, 6, 7]).with_direction(signed_permutation(perm, signs));
        let navigator = AxisOrderNavigator::new(&volume);
        // image axis 2 is stored along physical axis perm[2]
        let expected = match perm[2] {
            2 => ViewPlane::Axial,
            1 => ViewPlane::Coronal,
            _ => ViewPlane::Sagittal,
        };
        prop_assert_eq!(navigator.plane(), expected);
        prop_assert_eq!(navigator.through_axis(), 2);
    }

    #[test]
    fn display_pixels_map_inside_the_volume(
        perm in permutations(),
        signs in prop::array::uniform3(any::<bool>()),
        plane in prop::sample::select(PLANES.to_vec()),
        col in 0usize..10, row in 0usize..10,
    ) {
        let volume = volume([5, 6, 7]).with_direction(signed_permutation(perm, signs));
        let mut navigator = AxisOrderNavigator::new(&volume);
        navigator.set_view_plane(&volume, plane);
        let (width, height) = navigator.display_extent();
        match navigator.display_to_voxel(col, row) {
            Some(voxel) => {
                prop_assert!(col < width && row < height);
                prop_assert!(volume.contains(voxel));
            }
            None => prop_assert!(col >= width || row >= height),
        }
    }
}
