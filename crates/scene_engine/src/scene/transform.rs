//! Transform hierarchy with lazily cached matrices
//!
//! Every entity owns one [`SpatialNode`] stored in a scene-wide [`TransformTree`].
//! Nodes refer to each other by generation-checked [`NodeId`]s: the parent is an
//! optional id and the children are an ordered list of ids in the same arena.
//!
//! Derived values (local/global matrices, their inverses, global position and
//! rotation) are memoized behind independent dirty bits. Reading a derived value
//! recomputes it only when its bit is set. Writing local state marks the node's
//! local bits and the global bits of the whole subtree.

use std::cell::Cell;

use bitflags::bitflags;
use slotmap::{new_key_type, SlotMap};

use crate::core::{SceneError, SceneResult};
use crate::foundation::math::{utils, Mat4, Mat4Ext, Point3, Quat, Vec3};
use crate::foundation::uid;

new_key_type! {
    /// Handle to a node in a [`TransformTree`]
    pub struct NodeId;
}

bitflags! {
    /// Cached values that must be recomputed before their next read
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct DirtyFlags: u8 {
        const LOCAL = 1;
        const LOCAL_INV = 1 << 1;
        const GLOBAL = 1 << 2;
        const GLOBAL_INV = 1 << 3;
        const GLOBAL_POSITION = 1 << 4;
        const GLOBAL_ROTATION = 1 << 5;

        const ALL_LOCAL = Self::LOCAL.bits() | Self::LOCAL_INV.bits();
        const ALL_GLOBAL = Self::GLOBAL.bits()
            | Self::GLOBAL_INV.bits()
            | Self::GLOBAL_POSITION.bits()
            | Self::GLOBAL_ROTATION.bits();
    }
}

/// A node in the transform hierarchy
///
/// Local state is read directly from the node. Anything that depends on the
/// parent chain goes through [`TransformTree`].
#[derive(Debug)]
pub struct SpatialNode {
    uid: u32,
    local_position: Vec3,
    local_rotation: Quat,
    local_scale: Vec3,
    parent: Option<NodeId>,
    children: Vec<NodeId>,

    dirty: Cell<DirtyFlags>,
    local_matrix: Cell<Mat4>,
    local_inverse: Cell<Mat4>,
    global_matrix: Cell<Mat4>,
    global_inverse: Cell<Mat4>,
    global_position: Cell<Vec3>,
    global_rotation: Cell<Quat>,
}

impl SpatialNode {
    fn new(uid: u32) -> Self {
        Self {
            uid,
            local_position: Vec3::zeros(),
            local_rotation: Quat::identity(),
            local_scale: Vec3::new(1.0, 1.0, 1.0),
            parent: None,
            children: Vec::new(),
            dirty: Cell::new(DirtyFlags::all()),
            local_matrix: Cell::new(Mat4::identity()),
            local_inverse: Cell::new(Mat4::identity()),
            global_matrix: Cell::new(Mat4::identity()),
            global_inverse: Cell::new(Mat4::identity()),
            global_position: Cell::new(Vec3::zeros()),
            global_rotation: Cell::new(Quat::identity()),
        }
    }

    /// Unique id of this node
    pub fn uid(&self) -> u32 {
        self.uid
    }

    /// Position relative to the parent
    pub fn local_position(&self) -> Vec3 {
        self.local_position
    }

    /// Rotation relative to the parent
    pub fn local_rotation(&self) -> Quat {
        self.local_rotation
    }

    /// Rotation relative to the parent as Euler angles in degrees
    pub fn local_rotation_euler(&self) -> Vec3 {
        utils::quat_to_euler_degrees(&self.local_rotation)
    }

    /// Scale relative to the parent
    pub fn local_scale(&self) -> Vec3 {
        self.local_scale
    }

    /// Parent node, if any
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child nodes in attach order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    fn is_dirty(&self, flag: DirtyFlags) -> bool {
        self.dirty.get().contains(flag)
    }

    fn clear_dirty(&self, flag: DirtyFlags) {
        self.dirty.set(self.dirty.get().difference(flag));
    }

    fn local_matrix(&self) -> Mat4 {
        if self.is_dirty(DirtyFlags::LOCAL) {
            self.local_matrix.set(Mat4::from_trs(&self.local_position, &self.local_rotation, &self.local_scale));
            self.clear_dirty(DirtyFlags::LOCAL);
        }
        self.local_matrix.get()
    }

    fn local_inverse(&self) -> Mat4 {
        if self.is_dirty(DirtyFlags::LOCAL_INV) {
            self.local_inverse.set(Mat4::from_trs_inverse(&self.local_position, &self.local_rotation, &self.local_scale));
            self.clear_dirty(DirtyFlags::LOCAL_INV);
        }
        self.local_inverse.get()
    }
}

/// Arena owning every [`SpatialNode`] of a scene
#[derive(Debug, Default)]
pub struct TransformTree {
    nodes: SlotMap<NodeId, SpatialNode>,
}

impl TransformTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a detached identity node with a fresh uid
    pub fn insert(&mut self) -> NodeId {
        self.insert_with_uid(uid::next_uid())
    }

    /// Add a detached identity node with a known uid
    pub fn insert_with_uid(&mut self, uid: u32) -> NodeId {
        self.nodes.insert(SpatialNode::new(uid))
    }

    /// Remove a node; its children become roots
    pub fn remove(&mut self, id: NodeId) -> Option<SpatialNode> {
        let parent = self.nodes.get(id)?.parent;
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.retain(|&c| c != id);
        }
        let children = std::mem::take(&mut self.nodes.get_mut(id)?.children);
        for child in children {
            if let Some(node) = self.nodes.get_mut(child) {
                node.parent = None;
            }
            self.mark_global_dirty(child);
        }
        self.nodes.remove(id)
    }

    /// Whether the id refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Borrow a node for reading local state
    pub fn get(&self, id: NodeId) -> Option<&SpatialNode> {
        self.nodes.get(id)
    }

    fn node_mut(&mut self, id: NodeId) -> SceneResult<&mut SpatialNode> {
        self.nodes.get_mut(id).ok_or(SceneError::StaleHandle)
    }

    // --- local state -------------------------------------------------------

    /// Set the position relative to the parent
    pub fn set_local_position(&mut self, id: NodeId, position: Vec3) -> SceneResult<()> {
        self.node_mut(id)?.local_position = position;
        self.mark_local_dirty(id);
        Ok(())
    }

    /// Set the rotation relative to the parent
    pub fn set_local_rotation(&mut self, id: NodeId, rotation: Quat) -> SceneResult<()> {
        self.node_mut(id)?.local_rotation = rotation;
        self.mark_local_dirty(id);
        Ok(())
    }

    /// Set the local rotation from Euler angles in degrees
    pub fn set_local_rotation_euler(&mut self, id: NodeId, euler_degrees: Vec3) -> SceneResult<()> {
        self.set_local_rotation(id, utils::quat_from_euler_degrees(euler_degrees))
    }

    /// Set the scale relative to the parent; zero components become a tiny epsilon
    pub fn set_local_scale(&mut self, id: NodeId, scale: Vec3) -> SceneResult<()> {
        self.node_mut(id)?.local_scale = utils::clamp_scale(scale);
        self.mark_local_dirty(id);
        Ok(())
    }

    /// Translate, rotate, scale matrix of the local state
    pub fn local_matrix(&self, id: NodeId) -> Option<Mat4> {
        self.nodes.get(id).map(SpatialNode::local_matrix)
    }

    /// Inverse of [`TransformTree::local_matrix`]
    pub fn local_inverse(&self, id: NodeId) -> Option<Mat4> {
        self.nodes.get(id).map(SpatialNode::local_inverse)
    }

    // --- global state ------------------------------------------------------

    /// Object to world matrix: the node's local matrix left-multiplied by every ancestor's
    pub fn global_matrix(&self, id: NodeId) -> Option<Mat4> {
        let node = self.nodes.get(id)?;
        if node.is_dirty(DirtyFlags::GLOBAL) {
            let mut matrix = node.local_matrix();
            let mut current = node.parent;
            while let Some(parent) = current.and_then(|p| self.nodes.get(p)) {
                matrix = parent.local_matrix() * matrix;
                current = parent.parent;
            }
            node.global_matrix.set(matrix);
            node.clear_dirty(DirtyFlags::GLOBAL);
        }
        Some(node.global_matrix.get())
    }

    /// World to object matrix
    pub fn global_inverse(&self, id: NodeId) -> Option<Mat4> {
        let node = self.nodes.get(id)?;
        if node.is_dirty(DirtyFlags::GLOBAL_INV) {
            let mut inverse = node.local_inverse();
            let mut current = node.parent;
            while let Some(parent) = current.and_then(|p| self.nodes.get(p)) {
                inverse *= parent.local_inverse();
                current = parent.parent;
            }
            node.global_inverse.set(inverse);
            node.clear_dirty(DirtyFlags::GLOBAL_INV);
        }
        Some(node.global_inverse.get())
    }

    /// World-space position
    pub fn position(&self, id: NodeId) -> Option<Vec3> {
        let node = self.nodes.get(id)?;
        if node.is_dirty(DirtyFlags::GLOBAL_POSITION) {
            let matrix = self.global_matrix(id)?;
            node.global_position.set(matrix.transform_point(&Point3::origin()).coords);
            node.clear_dirty(DirtyFlags::GLOBAL_POSITION);
        }
        Some(node.global_position.get())
    }

    /// World-space rotation
    pub fn rotation(&self, id: NodeId) -> Option<Quat> {
        let node = self.nodes.get(id)?;
        if node.is_dirty(DirtyFlags::GLOBAL_ROTATION) {
            let mut rotation = node.local_rotation;
            let mut current = node.parent;
            while let Some(parent) = current.and_then(|p| self.nodes.get(p)) {
                rotation = parent.local_rotation * rotation;
                current = parent.parent;
            }
            node.global_rotation.set(rotation);
            node.clear_dirty(DirtyFlags::GLOBAL_ROTATION);
        }
        Some(node.global_rotation.get())
    }

    /// World-space rotation as Euler angles in degrees
    pub fn rotation_euler(&self, id: NodeId) -> Option<Vec3> {
        self.rotation(id).map(|r| utils::quat_to_euler_degrees(&r))
    }

    /// Move the node to a world-space position by adjusting its local position
    pub fn set_position(&mut self, id: NodeId, position: Vec3) -> SceneResult<()> {
        let parent = self.nodes.get(id).ok_or(SceneError::StaleHandle)?.parent;
        let Some(parent) = parent else {
            return self.set_local_position(id, position);
        };
        let current = self.position(id).ok_or(SceneError::StaleHandle)?;
        let parent_inverse = self.global_inverse(parent).ok_or(SceneError::StaleHandle)?;
        let local_delta = parent_inverse.transform_vector(&(position - current));

        let node = self.node_mut(id)?;
        node.local_position += local_delta;
        self.mark_local_dirty(id);
        Ok(())
    }

    /// Rotate the node to a world-space rotation by adjusting its local rotation
    pub fn set_rotation(&mut self, id: NodeId, rotation: Quat) -> SceneResult<()> {
        let current = self.rotation(id).ok_or(SceneError::StaleHandle)?;
        let difference = current.inverse() * rotation;

        let node = self.node_mut(id)?;
        node.local_rotation *= difference;
        self.mark_local_dirty(id);
        Ok(())
    }

    /// Set the world-space rotation from Euler angles in degrees
    pub fn set_rotation_euler(&mut self, id: NodeId, euler_degrees: Vec3) -> SceneResult<()> {
        self.set_rotation(id, utils::quat_from_euler_degrees(euler_degrees))
    }

    // --- hierarchy ---------------------------------------------------------

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id)?.parent
    }

    /// Attach `id` under `parent`, or detach it with `None`
    ///
    /// Fails with [`SceneError::InvalidOperation`] if the new parent is the node
    /// itself or one of its descendants.
    pub fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) -> SceneResult<()> {
        let old_parent = self.nodes.get(id).ok_or(SceneError::StaleHandle)?.parent;
        if old_parent == parent {
            return Ok(());
        }
        if let Some(new_parent) = parent {
            if new_parent == id {
                return Err(SceneError::InvalidOperation("Cannot assign parent to self".to_string()));
            }
            let mut ancestor = Some(new_parent);
            while let Some(current) = ancestor {
                let node = self.nodes.get(current).ok_or(SceneError::StaleHandle)?;
                if current == id {
                    return Err(SceneError::InvalidOperation(
                        "Cannot parent a transform to one of its descendants".to_string(),
                    ));
                }
                ancestor = node.parent;
            }
        }

        if let Some(old) = old_parent.and_then(|p| self.nodes.get_mut(p)) {
            old.children.retain(|&c| c != id);
        }
        if let Some(new_parent) = parent {
            self.node_mut(new_parent)?.children.push(id);
        }
        self.node_mut(id)?.parent = parent;
        self.mark_global_dirty(id);
        Ok(())
    }

    // --- invalidation ------------------------------------------------------

    fn mark_local_dirty(&self, id: NodeId) {
        if let Some(node) = self.nodes.get(id) {
            node.dirty.set(node.dirty.get() | DirtyFlags::ALL_LOCAL);
        }
        self.mark_global_dirty(id);
    }

    fn mark_global_dirty(&self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(current) {
                node.dirty.set(node.dirty.get() | DirtyFlags::ALL_GLOBAL);
                stack.extend_from_slice(&node.children);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-4;

    fn chain_product(tree: &TransformTree, id: NodeId) -> Mat4 {
        let mut matrix = Mat4::identity();
        let mut current = Some(id);
        while let Some(node) = current {
            matrix = tree.local_matrix(node).unwrap() * matrix;
            current = tree.parent(node);
        }
        matrix
    }

    fn three_level_tree() -> (TransformTree, NodeId, NodeId, NodeId) {
        let mut tree = TransformTree::new();
        let root = tree.insert();
        let middle = tree.insert();
        let leaf = tree.insert();
        tree.set_parent(middle, Some(root)).unwrap();
        tree.set_parent(leaf, Some(middle)).unwrap();

        tree.set_local_position(root, Vec3::new(1.0, 2.0, 3.0)).unwrap();
        tree.set_local_rotation_euler(root, Vec3::new(0.0, 90.0, 0.0)).unwrap();
        tree.set_local_scale(middle, Vec3::new(2.0, 2.0, 2.0)).unwrap();
        tree.set_local_position(middle, Vec3::new(0.0, 1.0, 0.0)).unwrap();
        tree.set_local_rotation_euler(leaf, Vec3::new(30.0, 0.0, 45.0)).unwrap();
        tree.set_local_position(leaf, Vec3::new(0.5, 0.0, -1.0)).unwrap();
        (tree, root, middle, leaf)
    }

    #[test]
    fn test_global_position_of_child() {
        let mut tree = TransformTree::new();
        let parent = tree.insert();
        let child = tree.insert();
        tree.set_local_position(parent, Vec3::new(0.0, 5.0, 0.0)).unwrap();
        tree.set_local_position(child, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        tree.set_parent(child, Some(parent)).unwrap();

        assert_relative_eq!(tree.position(child).unwrap(), Vec3::new(1.0, 5.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_global_matrix_equals_chain_product() {
        let (tree, _, _, leaf) = three_level_tree();
        assert_relative_eq!(tree.global_matrix(leaf).unwrap(), chain_product(&tree, leaf), epsilon = EPSILON);
    }

    #[test]
    fn test_global_matrix_invalidated_by_ancestor_change() {
        let (mut tree, root, middle, leaf) = three_level_tree();

        // Warm every cache, then change the root
        tree.global_matrix(leaf).unwrap();
        tree.global_matrix(middle).unwrap();
        tree.set_local_position(root, Vec3::new(-4.0, 0.0, 2.0)).unwrap();
        assert_relative_eq!(tree.global_matrix(leaf).unwrap(), chain_product(&tree, leaf), epsilon = EPSILON);

        // Read the leaf first this time, then the middle node
        tree.set_local_rotation_euler(middle, Vec3::new(10.0, 20.0, 30.0)).unwrap();
        assert_relative_eq!(tree.global_matrix(leaf).unwrap(), chain_product(&tree, leaf), epsilon = EPSILON);
        assert_relative_eq!(tree.global_matrix(middle).unwrap(), chain_product(&tree, middle), epsilon = EPSILON);
    }

    #[test]
    fn test_global_inverse_is_inverse_of_global() {
        let (tree, _, _, leaf) = three_level_tree();
        let product = tree.global_matrix(leaf).unwrap() * tree.global_inverse(leaf).unwrap();
        assert_relative_eq!(product, Mat4::identity(), epsilon = EPSILON);
    }

    #[test]
    fn test_set_global_position_round_trip() {
        let (mut tree, _, _, leaf) = three_level_tree();
        let target = Vec3::new(3.0, -2.0, 7.5);

        tree.set_position(leaf, target).unwrap();
        assert_relative_eq!(tree.position(leaf).unwrap(), target, epsilon = EPSILON);
    }

    #[test]
    fn test_set_global_position_under_identity_parent() {
        let mut tree = TransformTree::new();
        let parent = tree.insert();
        let child = tree.insert();
        tree.set_parent(child, Some(parent)).unwrap();

        tree.set_position(child, Vec3::new(1.0, 2.0, 3.0)).unwrap();
        assert_relative_eq!(tree.get(child).unwrap().local_position(), Vec3::new(1.0, 2.0, 3.0), epsilon = EPSILON);
    }

    #[test]
    fn test_set_global_rotation_round_trip() {
        let (mut tree, _, _, leaf) = three_level_tree();
        let target = utils::quat_from_euler_degrees(Vec3::new(-20.0, 60.0, 5.0));

        tree.set_rotation(leaf, target).unwrap();
        assert_relative_eq!(tree.rotation(leaf).unwrap(), target, epsilon = EPSILON);
    }

    #[test]
    fn test_reparent_to_self_fails() {
        let mut tree = TransformTree::new();
        let node = tree.insert();
        let result = tree.set_parent(node, Some(node));
        assert!(matches!(result, Err(SceneError::InvalidOperation(_))));
        assert_eq!(tree.parent(node), None);
    }

    #[test]
    fn test_reparent_to_descendant_fails() {
        let (mut tree, root, _, leaf) = three_level_tree();
        let result = tree.set_parent(root, Some(leaf));
        assert!(matches!(result, Err(SceneError::InvalidOperation(_))));
        assert_eq!(tree.parent(root), None);
    }

    #[test]
    fn test_detach_moves_node_to_root() {
        let (mut tree, _, middle, leaf) = three_level_tree();
        tree.global_matrix(leaf).unwrap();

        tree.set_parent(leaf, None).unwrap();
        assert!(tree.get(middle).unwrap().children().is_empty());
        assert_relative_eq!(tree.global_matrix(leaf).unwrap(), tree.local_matrix(leaf).unwrap(), epsilon = EPSILON);
    }

    #[test]
    fn test_zero_scale_is_clamped() {
        let mut tree = TransformTree::new();
        let node = tree.insert();
        tree.set_local_scale(node, Vec3::new(0.0, 1.0, 1.0)).unwrap();

        assert!(tree.get(node).unwrap().local_scale().x > 0.0);
        assert!(tree.global_inverse(node).unwrap().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_remove_orphans_children() {
        let (mut tree, _, middle, leaf) = three_level_tree();
        tree.remove(middle);

        assert!(!tree.contains(middle));
        assert_eq!(tree.parent(leaf), None);
        assert_relative_eq!(tree.global_matrix(leaf).unwrap(), tree.local_matrix(leaf).unwrap(), epsilon = EPSILON);
    }

    #[test]
    fn test_stale_handle() {
        let mut tree = TransformTree::new();
        let node = tree.insert();
        tree.remove(node);
        assert!(matches!(tree.set_local_position(node, Vec3::zeros()), Err(SceneError::StaleHandle)));
        assert!(tree.global_matrix(node).is_none());
    }
}
