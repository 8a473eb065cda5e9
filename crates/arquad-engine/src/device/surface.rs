//! Swapchain policy for the passthrough view: which format and alpha mode to
//! ask for, when a size can be configured, and how acquire failures are handled.

use winit::dpi::PhysicalSize;

use super::SurfaceErrorAction;

/// 8-bit color formats, in the order the compositor prefers them.
const BYTE_COLOR_FORMATS: [wgpu::TextureFormat; 4] = [
    wgpu::TextureFormat::Bgra8UnormSrgb,
    wgpu::TextureFormat::Rgba8UnormSrgb,
    wgpu::TextureFormat::Bgra8Unorm,
    wgpu::TextureFormat::Rgba8Unorm,
];

// ── format / alpha selection ──

/// Picks the surface format whose encoding matches `prefer_srgb`.
///
/// An 8-bit format with the requested encoding wins, then any format with
/// that encoding, then whatever the surface lists first. The shaders read
/// `TextureFormat::is_srgb` of the result, so either encoding renders correctly.
pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    let encoding_matches = |f: &wgpu::TextureFormat| f.is_srgb() == prefer_srgb;

    BYTE_COLOR_FORMATS
        .into_iter()
        .filter(encoding_matches)
        .find(|f| caps.formats.contains(f))
        .or_else(|| caps.formats.iter().copied().find(encoding_matches))
        .or_else(|| caps.formats.first().copied())
}

/// The camera image covers every pixel, so an opaque surface is preferred
/// when the caller has no supported preference.
pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    let supported = |m: &wgpu::CompositeAlphaMode| caps.alpha_modes.contains(m);

    requested
        .filter(supported)
        .or_else(|| Some(wgpu::CompositeAlphaMode::Opaque).filter(supported))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

// ── sizing ──

/// Width and height to configure, or `None` while the window is minimized.
pub(crate) fn drawable_extent(size: PhysicalSize<u32>) -> Option<(u32, u32)> {
    (size.width > 0 && size.height > 0).then_some((size.width, size.height))
}

// ── acquire errors ──

pub(crate) fn classify_surface_error(err: &wgpu::SurfaceError) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
            SurfaceErrorAction::Reconfigured
        }
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::{CompositeAlphaMode, TextureFormat};

    fn caps(formats: &[TextureFormat], alpha_modes: &[CompositeAlphaMode]) -> wgpu::SurfaceCapabilities {
        wgpu::SurfaceCapabilities {
            formats: formats.to_vec(),
            alpha_modes: alpha_modes.to_vec(),
            ..Default::default()
        }
    }

    // ── format selection ──

    #[test]
    fn srgb_request_skips_linear_formats_listed_first() {
        let caps = caps(
            &[TextureFormat::Bgra8Unorm, TextureFormat::Rgba8UnormSrgb],
            &[],
        );
        assert_eq!(
            choose_surface_format(&caps, true),
            Some(TextureFormat::Rgba8UnormSrgb)
        );
    }

    #[test]
    fn linear_request_picks_linear_format() {
        let caps = caps(
            &[TextureFormat::Bgra8UnormSrgb, TextureFormat::Bgra8Unorm],
            &[],
        );
        let format = choose_surface_format(&caps, false);
        assert_eq!(format, Some(TextureFormat::Bgra8Unorm));
        assert!(!format.is_some_and(|f| f.is_srgb()));
    }

    #[test]
    fn byte_format_beats_wider_format_of_same_encoding() {
        let caps = caps(
            &[TextureFormat::Rgb10a2Unorm, TextureFormat::Rgba8Unorm],
            &[],
        );
        assert_eq!(
            choose_surface_format(&caps, false),
            Some(TextureFormat::Rgba8Unorm)
        );
    }

    #[test]
    fn missing_encoding_falls_back_to_first_listed() {
        let caps = caps(
            &[TextureFormat::Rgba16Float, TextureFormat::Bgra8Unorm],
            &[],
        );
        assert_eq!(
            choose_surface_format(&caps, true),
            Some(TextureFormat::Rgba16Float)
        );
        assert_eq!(choose_surface_format(&self::caps(&[], &[]), true), None);
    }

    // ── alpha selection ──

    #[test]
    fn supported_alpha_request_is_kept() {
        let caps = caps(
            &[],
            &[CompositeAlphaMode::Opaque, CompositeAlphaMode::PreMultiplied],
        );
        assert_eq!(
            choose_alpha_mode(&caps, Some(CompositeAlphaMode::PreMultiplied)),
            CompositeAlphaMode::PreMultiplied
        );
    }

    #[test]
    fn unsupported_alpha_request_prefers_opaque() {
        let caps = caps(
            &[],
            &[CompositeAlphaMode::Inherit, CompositeAlphaMode::Opaque],
        );
        assert_eq!(
            choose_alpha_mode(&caps, Some(CompositeAlphaMode::PostMultiplied)),
            CompositeAlphaMode::Opaque
        );
        assert_eq!(choose_alpha_mode(&caps, None), CompositeAlphaMode::Opaque);
    }

    #[test]
    fn alpha_without_opaque_takes_first_then_auto() {
        let caps_inherit = caps(&[], &[CompositeAlphaMode::Inherit]);
        assert_eq!(choose_alpha_mode(&caps_inherit, None), CompositeAlphaMode::Inherit);
        assert_eq!(choose_alpha_mode(&caps(&[], &[]), None), CompositeAlphaMode::Auto);
    }

    // ── sizing / errors ──

    #[test]
    fn zero_sized_drawable_is_not_configured() {
        assert_eq!(drawable_extent(PhysicalSize::new(0, 720)), None);
        assert_eq!(drawable_extent(PhysicalSize::new(1280, 0)), None);
        assert_eq!(drawable_extent(PhysicalSize::new(1280, 720)), Some((1280, 720)));
    }

    #[test]
    fn acquire_errors_map_to_actions() {
        use wgpu::SurfaceError;

        assert_eq!(
            classify_surface_error(&SurfaceError::Lost),
            SurfaceErrorAction::Reconfigured
        );
        assert_eq!(
            classify_surface_error(&SurfaceError::Outdated),
            SurfaceErrorAction::Reconfigured
        );
        assert_eq!(
            classify_surface_error(&SurfaceError::Timeout),
            SurfaceErrorAction::SkipFrame
        );
        assert_eq!(
            classify_surface_error(&SurfaceError::Other),
            SurfaceErrorAction::SkipFrame
        );
        assert_eq!(
            classify_surface_error(&SurfaceError::OutOfMemory),
            SurfaceErrorAction::Fatal
        );
    }
}
