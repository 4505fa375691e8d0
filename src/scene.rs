//! Renderable objects drawn into the overlay.

use ndarray::Array3;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Voxels an object covers, in image index space `[x, y, z]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Footprint {
    Voxels(Vec<[usize; 3]>),
    /// Inclusive box.
    Region { min: [usize; 3], max: [usize; 3] },
    /// Voxels of a shared `(z, y, x)` label mask equal to `value`.
    Mask { mask: Arc<Array3<u8>>, value: u8 },
}

impl Footprint {
    pub fn contains(&self, voxel: [usize; 3]) -> bool {
        match self {
            Footprint::Voxels(voxels) => voxels.contains(&voxel),
            Footprint::Region { min, max } => {
                (0..3).all(|axis| min[axis] <= voxel[axis] && voxel[axis] <= max[axis])
            }
            Footprint::Mask { mask, value } => {
                mask.get([voxel[2], voxel[1], voxel[0]]) == Some(value)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub id: ObjectId,
    pub name: String,
    pub color: [u8; 4],
    pub footprint: Footprint,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneNode {
    Group { name: String, children: Vec<SceneNode> },
    Object(SceneObject),
}

/// A tree of groups and objects, traversed depth-first in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    children: Vec<SceneNode>,
    next_id: u32,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> ObjectId {
        self.next_id += 1;
        ObjectId(self.next_id)
    }

    pub fn add(&mut self, name: impl Into<String>, color: [u8; 4], footprint: Footprint) -> ObjectId {
        let id = self.allocate_id();
        self.children.push(SceneNode::Object(SceneObject {
            id,
            name: name.into(),
            color,
            footprint,
        }));
        id
    }

    /// Add an object under the top-level group `group`, creating it if needed.
    pub fn add_to_group(
        &mut self,
        group: &str,
        name: impl Into<String>,
        color: [u8; 4],
        footprint: Footprint,
    ) -> ObjectId {
        let id = self.allocate_id();
        let object = SceneNode::Object(SceneObject {
            id,
            name: name.into(),
            color,
            footprint,
        });
        let existing = self.children.iter_mut().find_map(|node| match node {
            SceneNode::Group { name, children } if name == group => Some(children),
            _ => None,
        });
        match existing {
            Some(children) => children.push(object),
            None => self.children.push(SceneNode::Group {
                name: group.to_string(),
                children: vec![object],
            }),
        }
        id
    }

    /// Objects in traversal order.
    pub fn objects(&self) -> Vec<&SceneObject> {
        fn walk<'a>(nodes: &'a [SceneNode], out: &mut Vec<&'a SceneObject>) {
            for node in nodes {
                match node {
                    SceneNode::Group { children, .. } => walk(children, out),
                    SceneNode::Object(object) => out.push(object),
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.children, &mut out);
        out
    }

    pub fn is_empty(&self) -> bool {
        self.objects().is_empty()
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects().into_iter().find(|object| object.id == id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        fn walk(nodes: &mut [SceneNode], id: ObjectId) -> Option<&mut SceneObject> {
            nodes.iter_mut().find_map(|node| match node {
                SceneNode::Group { children, .. } => walk(children, id),
                SceneNode::Object(object) if object.id == id => Some(object),
                SceneNode::Object(_) => None,
            })
        }
        walk(&mut self.children, id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&SceneObject> {
        self.objects().into_iter().find(|object| object.name == name)
    }

    /// Topmost object covering `voxel`; later objects are drawn over earlier ones.
    pub fn pick(&self, voxel: [usize; 3]) -> Option<ObjectId> {
        self.objects()
            .into_iter()
            .rev()
            .find(|object| object.footprint.contains(voxel))
            .map(|object| object.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traversal_is_depth_first_in_insertion_order() {
        let mut scene = Scene::new();
        let a = scene.add("a", [1, 0, 0, 255], Footprint::Voxels(vec![]));
        let b = scene.add_to_group("masks", "b", [2, 0, 0, 255], Footprint::Voxels(vec![]));
        let c = scene.add("c", [3, 0, 0, 255], Footprint::Voxels(vec![]));
        let d = scene.add_to_group("masks", "d", [4, 0, 0, 255], Footprint::Voxels(vec![]));
        let order: Vec<_> = scene.objects().iter().map(|o| o.id).collect();
        assert_eq!(order, vec![a, b, d, c]);
    }

    #[test]
    fn pick_returns_topmost() {
        let mut scene = Scene::new();
        let under = scene.add(
            "under",
            [1, 1, 1, 255],
            Footprint::Region { min: [0, 0, 0], max: [4, 4, 4] },
        );
        let over = scene.add("over", [2, 2, 2, 255], Footprint::Voxels(vec![[1, 1, 1]]));
        assert_eq!(scene.pick([1, 1, 1]), Some(over));
        assert_eq!(scene.pick([2, 1, 1]), Some(under));
        assert_eq!(scene.pick([5, 1, 1]), None);
    }

    #[test]
    fn object_mut_reaches_grouped_objects() {
        let mut scene = Scene::new();
        let id = scene.add_to_group("g", "x", [0; 4], Footprint::Voxels(vec![]));
        if let Some(object) = scene.object_mut(id) {
            object.color = [9, 9, 9, 9];
        }
        assert_eq!(scene.object(id).map(|o| o.color), Some([9, 9, 9, 9]));
    }
}
