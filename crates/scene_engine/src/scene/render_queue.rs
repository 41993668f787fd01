//! Render-order buckets
//!
//! Each camera keeps its renderable units in three buckets chosen by render
//! order: opaque (< 2000), transparent (2000..3000), and overlay (>= 3000).
//! Buckets stay sorted by (render order, shader, mesh) so draws sharing
//! expensive GPU state are adjacent. The transparent bucket is re-sorted
//! back-to-front every frame before drawing.

use std::cmp::Ordering;

use crate::ecs::ComponentId;
use crate::render::ShaderId;

/// Render order used when a unit does not specify one
pub const DEFAULT_RENDER_ORDER: i32 = 1000;

/// First render order drawn in the transparent bucket
pub const TRANSPARENT_RENDER_ORDER: i32 = 2000;

/// First render order drawn in the overlay bucket
pub const OVERLAY_RENDER_ORDER: i32 = 3000;

/// The three draw-order partitions, drawn in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Background and opaque geometry
    Opaque,
    /// Alpha-blended geometry
    Transparent,
    /// Drawn last, on top of everything
    Overlay,
}

impl Bucket {
    /// All buckets in draw order
    pub const ALL: [Self; 3] = [Self::Opaque, Self::Transparent, Self::Overlay];

    /// Bucket a render order falls into
    pub fn from_render_order(render_order: i32) -> Self {
        if render_order < TRANSPARENT_RENDER_ORDER {
            Self::Opaque
        } else if render_order < OVERLAY_RENDER_ORDER {
            Self::Transparent
        } else {
            Self::Overlay
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Opaque => 0,
            Self::Transparent => 1,
            Self::Overlay => 2,
        }
    }
}

/// A renderable unit with its cached sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderItem {
    /// The unit to draw
    pub component: ComponentId,
    /// Render order at insertion time
    pub render_order: i32,
    /// Shader of the unit's first material
    pub shader: ShaderId,
    /// Uid of the unit's mesh, 0 for none
    pub mesh: u32,
}

impl RenderItem {
    fn cmp_key(&self, other: &Self) -> Ordering {
        self.render_order
            .cmp(&other.render_order)
            .then(self.shader.cmp(&other.shader))
            .then(self.mesh.cmp(&other.mesh))
    }
}

/// Sorted render buckets of one camera
#[derive(Debug, Clone, Default)]
pub struct RenderBuckets {
    buckets: [Vec<RenderItem>; 3],
}

impl RenderBuckets {
    /// Create empty buckets
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert after any items with an equal key; returns false if already present
    pub fn insert(&mut self, item: RenderItem) -> bool {
        if self.contains(item.component) {
            return false;
        }
        let bucket = &mut self.buckets[Bucket::from_render_order(item.render_order).index()];
        let position = bucket.partition_point(|existing| existing.cmp_key(&item) != Ordering::Greater);
        bucket.insert(position, item);
        true
    }

    /// Remove a unit from whichever bucket holds it
    pub fn remove(&mut self, component: ComponentId) -> bool {
        for bucket in &mut self.buckets {
            if let Some(index) = bucket.iter().position(|item| item.component == component) {
                bucket.remove(index);
                return true;
            }
        }
        false
    }

    /// Whether a unit is in any bucket
    pub fn contains(&self, component: ComponentId) -> bool {
        self.buckets.iter().flatten().any(|item| item.component == component)
    }

    /// Items of one bucket in draw order
    pub fn bucket(&self, bucket: Bucket) -> &[RenderItem] {
        &self.buckets[bucket.index()]
    }

    /// Total number of items
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    /// Whether all buckets are empty
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    /// Drop every item
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
    }

    /// Sort a bucket far-to-near using the squared distance each item reports
    ///
    /// Items without a distance keep their place relative to each other at the end.
    pub fn sort_back_to_front<F>(&mut self, bucket: Bucket, mut squared_distance: F)
    where
        F: FnMut(ComponentId) -> Option<f32>,
    {
        let items = &mut self.buckets[bucket.index()];
        let mut keyed: Vec<(f32, RenderItem)> = items
            .iter()
            .map(|item| (squared_distance(item.component).unwrap_or(f32::NEG_INFINITY), *item))
            .collect();
        keyed.sort_by(|a, b| b.0.total_cmp(&a.0));
        *items = keyed.into_iter().map(|(_, item)| item).collect();
    }
}
