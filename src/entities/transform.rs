//! 2D affine transforms for track placement.
//!
//! Uses glam::Affine2 for matrix math in screen space (Y-down, pixels).
//! Forward transform (footprint -> screen):
//!
//! ```text
//! screen = T(pos_px) * T(c) * R(theta) * S(sx, sy) * T(-c) * point
//! ```
//!
//! where `pos_px` is the normalized position mapped into the viewport and
//! `c = (w*sx/2, h*sy/2)` is the scaled footprint center. Rotation pivots
//! about the footprint's visual center rather than its top-left corner, so
//! tracks rotate in place under independent position control.

use glam::{Affine2, Vec2};

/// Logical placement parameters for one track.
///
/// `position` lives in the normalized control space (see `StageConfig`),
/// not in pixels. `footprint` is the fixed on-screen size in pixels that
/// every track is normalized to regardless of native resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformParams {
    pub position: (f32, f32),
    pub scale: (f32, f32),
    pub rotation_deg: f32,
    pub footprint: (f32, f32),
}

impl TransformParams {
    pub fn new(position: (f32, f32), footprint: (f32, f32)) -> Self {
        Self {
            position,
            scale: (1.0, 1.0),
            rotation_deg: 0.0,
            footprint,
        }
    }
}

/// Build the affine placement matrix for a track.
///
/// # Arguments
/// - `params` - logical position/scale/rotation/footprint
/// - `norm` - normalized control-space size `(norm_w, norm_h)`
/// - `viewport` - render surface size in pixels `(width, height)`
///
/// Deterministic: same inputs always produce the same matrix.
pub fn build_transform(params: &TransformParams, norm: (f32, f32), viewport: (u32, u32)) -> Affine2 {
    let (x, y) = params.position;
    let (sx, sy) = params.scale;
    let (w, h) = params.footprint;

    // Normalized position -> pixels
    let px = x / norm.0 * viewport.0 as f32;
    let py = y / norm.1 * viewport.1 as f32;

    // Scaled footprint center: the rotation pivot
    let c = Vec2::new(w * sx * 0.5, h * sy * 0.5);

    Affine2::from_translation(Vec2::new(px, py))
        * Affine2::from_translation(c)
        * Affine2::from_angle(params.rotation_deg.to_radians())
        * Affine2::from_scale(Vec2::new(sx, sy))
        * Affine2::from_translation(-c)
}

/// Lazily recomputed transform with a dirty flag.
///
/// Any parameter mutation or viewport resize marks the cache dirty; the
/// matrix is rebuilt on the next read (or during a batched recompute pass)
/// and served from cache while clean.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformCache {
    cached: Option<Affine2>,
}

impl TransformCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate the cached matrix.
    pub fn mark_dirty(&mut self) {
        self.cached = None;
    }

    pub fn is_dirty(&self) -> bool {
        self.cached.is_none()
    }

    /// Return the cached matrix, rebuilding via `build` if dirty.
    pub fn resolve(&mut self, build: impl FnOnce() -> Affine2) -> Affine2 {
        match self.cached {
            Some(m) => m,
            None => {
                let m = build();
                self.cached = Some(m);
                m
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NORM: (f32, f32) = (400.0, 300.0);
    const VIEWPORT: (u32, u32) = (800, 600);

    fn params() -> TransformParams {
        TransformParams {
            position: (200.0, 150.0),
            scale: (2.0, 0.5),
            rotation_deg: 33.0,
            footprint: (640.0, 360.0),
        }
    }

    #[test]
    fn test_deterministic() {
        let a = build_transform(&params(), NORM, VIEWPORT);
        let b = build_transform(&params(), NORM, VIEWPORT);
        assert_eq!(a, b);
    }

    #[test]
    fn test_full_turn_is_identity_rotation() {
        let mut p0 = params();
        p0.rotation_deg = 0.0;
        let mut p360 = params();
        p360.rotation_deg = 360.0;

        let a = build_transform(&p0, NORM, VIEWPORT);
        let b = build_transform(&p360, NORM, VIEWPORT);
        assert!(a.abs_diff_eq(b, 1e-3));
    }

    #[test]
    fn test_pivot_at_scaled_footprint_center() {
        // The pivot point (the scaled footprint center) must land on the same
        // screen point for any rotation angle - that is what "rotate in
        // place" means. With footprint 640x360 and scale (2.0, 0.5) the
        // pivot is (640, 90), and it maps to pos_px + pivot.
        let p = params();
        let pivot = Vec2::new(
            p.footprint.0 * p.scale.0 * 0.5,
            p.footprint.1 * p.scale.1 * 0.5,
        );
        let expected = Vec2::new(400.0, 300.0) + pivot;

        for deg in [-90.0, 0.0, 45.0, 180.0, 270.0] {
            let mut p = params();
            p.rotation_deg = deg;
            let pt = build_transform(&p, NORM, VIEWPORT).transform_point2(pivot);
            assert!(
                pt.abs_diff_eq(expected, 1e-2),
                "pivot moved under rotation {deg}: {pt:?} vs {expected:?}"
            );
        }
    }

    #[test]
    fn test_unrotated_top_left_lands_at_position() {
        let mut p = params();
        p.rotation_deg = 0.0;
        p.scale = (1.0, 1.0);
        let m = build_transform(&p, NORM, VIEWPORT);
        // (200, 150) in 400x300 space maps to (400, 300) in an 800x600 viewport
        let origin = m.transform_point2(Vec2::ZERO);
        assert!(origin.abs_diff_eq(Vec2::new(400.0, 300.0), 1e-3));
    }

    #[test]
    fn test_position_maps_through_norm_space() {
        let mut p = params();
        p.rotation_deg = 0.0;
        p.scale = (1.0, 1.0);
        p.position = (100.0, 75.0); // quarter of the norm space
        let m = build_transform(&p, NORM, (1600, 1200));
        let origin = m.transform_point2(Vec2::ZERO);
        assert!(origin.abs_diff_eq(Vec2::new(400.0, 300.0), 1e-3));
    }

    #[test]
    fn test_cache_dirty_lifecycle() {
        let mut cache = TransformCache::new();
        assert!(cache.is_dirty());

        let mut builds = 0;
        let p = params();
        let _ = cache.resolve(|| {
            builds += 1;
            build_transform(&p, NORM, VIEWPORT)
        });
        assert!(!cache.is_dirty());

        // Clean read does not rebuild
        let _ = cache.resolve(|| {
            builds += 1;
            build_transform(&p, NORM, VIEWPORT)
        });
        assert_eq!(builds, 1);

        cache.mark_dirty();
        let _ = cache.resolve(|| {
            builds += 1;
            build_transform(&p, NORM, VIEWPORT)
        });
        assert_eq!(builds, 2);
    }
}
