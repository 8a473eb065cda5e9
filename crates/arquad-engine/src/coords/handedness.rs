use glam::{Mat4, Vec3, Vec4};

/// Basis change that negates Z, mapping the right-handed tracking space onto
/// the left-handed render space.
///
/// The same matrix flips the view matrix's Z basis and every anchor position,
/// so `view * flip_z() * flip_z() * p == view * p`.
#[inline]
pub fn flip_z() -> Mat4 {
    Mat4::from_scale(Vec3::new(1.0, 1.0, -1.0))
}

/// Converts a homogeneous tracking-space position to render space.
#[inline]
pub fn to_render_space(p: Vec4) -> Vec4 {
    Vec4::new(p.x, p.y, -p.z, p.w)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flip_is_an_involution() {
        assert_eq!(flip_z() * flip_z(), Mat4::IDENTITY);
        let p = Vec4::new(1.0, 2.0, 3.0, 1.0);
        assert_eq!(to_render_space(to_render_space(p)), p);
    }

    #[test]
    fn position_flip_matches_matrix_flip() {
        let p = Vec4::new(-0.4, 0.25, -1.5, 1.0);
        assert_eq!(flip_z() * p, to_render_space(p));
    }
}
