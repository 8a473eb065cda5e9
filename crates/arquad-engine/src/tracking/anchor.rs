use glam::{Mat4, Vec2, Vec3, Vec4};

/// Stable identifier assigned by the tracking engine.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct AnchorId(pub u64);

/// Orientation of a detected plane relative to gravity.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PlaneAlignment {
    Horizontal,
    Vertical,
}

/// A detected planar surface.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlaneAnchor {
    pub id: AnchorId,
    /// Anchor-to-world transform.
    pub transform: Mat4,
    /// Center of the detected extent in the anchor's local frame (y is 0).
    pub center: Vec3,
    /// Width (x) and length (z) of the detected extent.
    pub extent: Vec2,
    pub alignment: PlaneAlignment,
}

impl PlaneAnchor {
    /// Homogeneous world-space position of the plane's center.
    #[inline]
    pub fn world_position(&self) -> Vec4 {
        self.transform.transform_point3(self.center).extend(1.0)
    }
}

/// Anything the tracking engine pins to the world.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Anchor {
    Plane(PlaneAnchor),
    /// A bare pose, e.g. placed by a hit test.
    Point { id: AnchorId, transform: Mat4 },
}

impl Anchor {
    pub fn id(&self) -> AnchorId {
        match self {
            Anchor::Plane(p) => p.id,
            Anchor::Point { id, .. } => *id,
        }
    }

    pub fn as_plane(&self) -> Option<&PlaneAnchor> {
        match self {
            Anchor::Plane(p) => Some(p),
            Anchor::Point { .. } => None,
        }
    }
}

/// World positions of every horizontal plane in `anchors`, in input order.
///
/// Rebuilt from scratch each frame: the result always mirrors the engine's
/// current anchor set.
pub fn horizontal_plane_positions(anchors: &[Anchor]) -> Vec<Vec4> {
    anchors
        .iter()
        .filter_map(Anchor::as_plane)
        .filter(|p| p.alignment == PlaneAlignment::Horizontal)
        .map(PlaneAnchor::world_position)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane(id: u64, transform: Mat4, center: Vec3, alignment: PlaneAlignment) -> Anchor {
        Anchor::Plane(PlaneAnchor {
            id: AnchorId(id),
            transform,
            center,
            extent: Vec2::splat(0.5),
            alignment,
        })
    }

    #[test]
    fn identity_rotation_zero_center_is_translation_column() {
        let t = Mat4::from_translation(Vec3::new(0.3, -1.2, -2.0));
        let a = plane(1, t, Vec3::ZERO, PlaneAlignment::Horizontal);
        let positions = horizontal_plane_positions(&[a]);
        assert_eq!(positions, vec![t.w_axis]);
    }

    #[test]
    fn center_offset_is_expressed_in_anchor_frame() {
        let t = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0))
            * Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let a = plane(1, t, Vec3::new(0.5, 0.0, 0.0), PlaneAlignment::Horizontal);
        let p = horizontal_plane_positions(&[a])[0];
        // Local +X maps to world -Z after a quarter turn about Y.
        assert!((p - Vec4::new(1.0, 0.0, -0.5, 1.0)).abs().max_element() < 1e-6);
    }

    #[test]
    fn only_horizontal_planes_are_kept() {
        let anchors = [
            plane(1, Mat4::IDENTITY, Vec3::ZERO, PlaneAlignment::Horizontal),
            plane(2, Mat4::IDENTITY, Vec3::ZERO, PlaneAlignment::Vertical),
            Anchor::Point { id: AnchorId(3), transform: Mat4::IDENTITY },
            plane(4, Mat4::from_translation(Vec3::Y), Vec3::ZERO, PlaneAlignment::Horizontal),
        ];
        let positions = horizontal_plane_positions(&anchors);
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[1], Vec4::new(0.0, 1.0, 0.0, 1.0));
    }

    #[test]
    fn empty_anchor_set_yields_no_positions() {
        assert!(horizontal_plane_positions(&[]).is_empty());
    }
}
