//! GPU picking support
//!
//! The picking pass draws every visible unit with a shader that writes the
//! owning entity's uid as an RGBA8 color. After read-back, each pixel decodes
//! to a uid (0 means nothing was drawn there) and hits are counted per uid.

use std::cell::RefCell;
use std::rc::Rc;

use crate::ecs::EntityId;
use crate::scene::Scene;

/// Callback invoked once per picked entity with the number of pixels it covered
pub type PickCallback = Box<dyn FnMut(&mut Scene, EntityId, u32)>;

/// Shared handle so one request can fan out to several deferred tasks
pub(crate) type SharedPickCallback = Rc<RefCell<PickCallback>>;

/// A queued pick over a pixel rectangle
///
/// Coordinates are in window space with the origin at the top-left corner.
pub struct PickRequest {
    /// Left edge in pixels
    pub x: u32,
    /// Top edge in pixels
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    pub(crate) callback: SharedPickCallback,
}

impl PickRequest {
    /// Create a request for a `width` x `height` region
    pub fn new(x: u32, y: u32, width: u32, height: u32, callback: PickCallback) -> Self {
        Self {
            x,
            y,
            width: width.max(1),
            height: height.max(1),
            callback: Rc::new(RefCell::new(callback)),
        }
    }

    /// Bottom-left origin row for read-back on a surface `surface_height` pixels tall
    pub fn read_back_y(&self, surface_height: u32) -> u32 {
        surface_height.saturating_sub(self.y)
    }

    /// Bytes the read-back returns for this request
    pub fn buffer_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

impl std::fmt::Debug for PickRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PickRequest")
            .field("x", &self.x)
            .field("y", &self.y)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Color the picking shader writes for a uid
pub fn encode_uid(uid: u32) -> [u8; 4] {
    uid.to_le_bytes()
}

/// Uid stored in a picking pixel
pub fn decode_uid(rgba: [u8; 4]) -> u32 {
    u32::from_le_bytes(rgba)
}

/// Count pixels per uid in first-seen order, skipping empty pixels
pub fn count_hits(pixels: &[u8]) -> Vec<(u32, u32)> {
    let mut hits: Vec<(u32, u32)> = Vec::new();
    for chunk in pixels.chunks_exact(4) {
        let uid = decode_uid([chunk[0], chunk[1], chunk[2], chunk[3]]);
        if uid == 0 {
            continue;
        }
        match hits.iter_mut().find(|(id, _)| *id == uid) {
            Some((_, count)) => *count += 1,
            None => hits.push((uid, 1)),
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uid_color_encoding() {
        let uid = 0x0102_0304;
        assert_eq!(encode_uid(uid), [4, 3, 2, 1]);
        assert_eq!(decode_uid(encode_uid(uid)), uid);
    }

    #[test]
    fn test_count_hits_dedups_and_skips_background() {
        let mut pixels = Vec::new();
        for uid in [5, 0, 9, 5, 5, 0] {
            pixels.extend_from_slice(&encode_uid(uid));
        }
        assert_eq!(count_hits(&pixels), vec![(5, 3), (9, 1)]);
    }

    #[test]
    fn test_empty_region_has_no_hits() {
        assert!(count_hits(&[0, 0, 0, 0]).is_empty());
    }

    #[test]
    fn test_read_back_flips_y_and_sizes_by_height() {
        let request = PickRequest::new(10, 30, 4, 2, Box::new(|_, _, _| {}));
        assert_eq!(request.read_back_y(100), 70);
        assert_eq!(request.buffer_len(), 4 * 2 * 4);
    }
}
