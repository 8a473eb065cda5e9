//! Passthrough camera image drawn as a fullscreen quad behind everything else.

use bytemuck::{Pod, Zeroable};
use glam::{Affine2, Vec2};
use wgpu::util::DeviceExt;

use crate::coords::Viewport;
use crate::tracking::{ImagePlane as PixelPlane, PlanarImage};

use super::common::{self, SampledTexture};
use super::{RenderCtx, RenderTarget};

// ── image plane geometry ──────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ImagePlaneVertex {
    /// Clip-space position.
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl ImagePlaneVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2, // position
        1 => Float32x2  // uv
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ImagePlaneVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Triangle-strip order: bottom-left, bottom-right, top-left, top-right.
const CANONICAL_VERTICES: [ImagePlaneVertex; 4] = [
    ImagePlaneVertex { position: [-1.0, -1.0], uv: [0.0, 1.0] },
    ImagePlaneVertex { position: [1.0, -1.0], uv: [1.0, 1.0] },
    ImagePlaneVertex { position: [-1.0, 1.0], uv: [0.0, 0.0] },
    ImagePlaneVertex { position: [1.0, 1.0], uv: [1.0, 0.0] },
];

/// Fullscreen quad whose UVs sample the part of the camera image that is
/// visible after rotation and aspect fill.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ImagePlane {
    vertices: [ImagePlaneVertex; 4],
}

impl ImagePlane {
    pub fn canonical() -> Self {
        Self {
            vertices: CANONICAL_VERTICES,
        }
    }

    /// Maps each canonical viewport-corner UV through the inverse of the
    /// image-to-viewport `display_transform`.
    pub fn fitted(display_transform: Affine2) -> Self {
        let view_to_image = display_transform.inverse();
        let vertices = CANONICAL_VERTICES.map(|v| {
            let uv = view_to_image.transform_point2(Vec2::from(v.uv));
            ImagePlaneVertex {
                position: v.position,
                uv: uv.into(),
            }
        });
        Self { vertices }
    }

    pub fn vertices(&self) -> &[ImagePlaneVertex; 4] {
        &self.vertices
    }

    pub fn uvs(&self) -> [Vec2; 4] {
        self.vertices.map(|v| Vec2::from(v.uv))
    }
}

impl Default for ImagePlane {
    fn default() -> Self {
        Self::canonical()
    }
}

// ── captured image textures ───────────────────────────────────────────────

/// Which captured-image planes to write this frame and which need new textures.
#[derive(Debug)]
pub struct TextureUpload<'a> {
    pub luma: &'a PixelPlane,
    pub chroma: &'a PixelPlane,
    pub reallocate_luma: bool,
    pub reallocate_chroma: bool,
}

impl TextureUpload<'_> {
    pub fn reallocates(&self) -> bool {
        self.reallocate_luma || self.reallocate_chroma
    }
}

/// Sizes of the luma/chroma textures currently allocated.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CapturedTextures {
    luma: Option<(u32, u32)>,
    chroma: Option<(u32, u32)>,
}

impl CapturedTextures {
    const LUMA_TEXEL_BYTES: u32 = 1;
    const CHROMA_TEXEL_BYTES: u32 = 2;

    /// Decides the upload for `image` and records the resulting sizes.
    ///
    /// `None` (and no state change) for images with fewer than two planes or
    /// rows too short for their width.
    pub fn plan<'a>(&mut self, image: &'a PlanarImage) -> Option<TextureUpload<'a>> {
        let (luma, chroma) = image.luma_chroma()?;
        if !fits(luma, Self::LUMA_TEXEL_BYTES) || !fits(chroma, Self::CHROMA_TEXEL_BYTES) {
            log::debug!("captured image rejected: row pitch smaller than width");
            return None;
        }

        let reallocate_luma = self.luma != Some((luma.width, luma.height));
        let reallocate_chroma = self.chroma != Some((chroma.width, chroma.height));
        self.luma = Some((luma.width, luma.height));
        self.chroma = Some((chroma.width, chroma.height));

        Some(TextureUpload {
            luma,
            chroma,
            reallocate_luma,
            reallocate_chroma,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.luma.is_some() && self.chroma.is_some()
    }
}

fn fits(plane: &PixelPlane, texel_bytes: u32) -> bool {
    plane.bytes_per_row >= plane.width * texel_bytes
}

// ── compositor ────────────────────────────────────────────────────────────

/// Draws the captured bi-planar YCbCr camera image as the frame background.
///
/// The quad is drawn with depth compare `Always` and no depth write, so it
/// never occludes anchors drawn after it.
pub struct CameraImageCompositor {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    vertex_buffer: wgpu::Buffer,

    image_plane: ImagePlane,
    viewport: Viewport,

    textures: CapturedTextures,
    luma: Option<SampledTexture>,
    chroma: Option<SampledTexture>,
    bind_group: Option<wgpu::BindGroup>,
}

impl CameraImageCompositor {
    /// Builds the quad vertex buffer and the pipeline for the given
    /// attachment formats. Shader or pipeline errors abort through the
    /// device's uncaptured-error handler.
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> Self {
        let image_plane = ImagePlane::canonical();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("arquad image plane vbo"),
            contents: bytemuck::cast_slice(image_plane.vertices()),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("arquad camera image shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/camera_image.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("arquad camera image bgl"),
            entries: &[
                common::texture_entry(0),
                common::texture_entry(1),
                common::sampler_entry(2),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("arquad camera image pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let output_constants = common::output_constants(color_format);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("arquad camera image pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[ImagePlaneVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: wgpu::PipelineCompilationOptions {
                    constants: &output_constants,
                    ..Default::default()
                },
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: common::no_cull(wgpu::PrimitiveTopology::TriangleStrip),
            depth_stencil: Some(common::depth_state(
                depth_format,
                false,
                wgpu::CompareFunction::Always,
            )),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("camera image pipeline created for {color_format:?}/{depth_format:?}");

        Self {
            pipeline,
            bind_group_layout,
            sampler: common::linear_clamp_sampler(device, "arquad camera image sampler"),
            vertex_buffer,
            image_plane,
            viewport: Viewport::default(),
            textures: CapturedTextures::default(),
            luma: None,
            chroma: None,
            bind_group: None,
        }
    }

    pub fn image_plane(&self) -> &ImagePlane {
        &self.image_plane
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// True once both captured-image planes have been uploaded.
    pub fn has_textures(&self) -> bool {
        self.textures.is_complete() && self.bind_group.is_some()
    }

    /// Recomputes the quad UVs for a new viewport size or orientation.
    pub fn update_image_plane(
        &mut self,
        ctx: &RenderCtx<'_>,
        display_transform: Affine2,
        viewport: Viewport,
    ) {
        self.image_plane = ImagePlane::fitted(display_transform);
        self.viewport = viewport;
        ctx.queue.write_buffer(
            &self.vertex_buffer,
            0,
            bytemuck::cast_slice(self.image_plane.vertices()),
        );
    }

    /// Uploads the luma and chroma planes of `image`.
    ///
    /// Images with fewer than two planes are ignored and the previous
    /// textures stay bound.
    pub fn update_captured_image_textures(&mut self, ctx: &RenderCtx<'_>, image: &PlanarImage) {
        let Some(upload) = self.textures.plan(image) else { return };

        write_plane(
            ctx,
            &mut self.luma,
            upload.luma,
            upload.reallocate_luma,
            wgpu::TextureFormat::R8Unorm,
            "arquad captured luma",
        );
        write_plane(
            ctx,
            &mut self.chroma,
            upload.chroma,
            upload.reallocate_chroma,
            wgpu::TextureFormat::Rg8Unorm,
            "arquad captured chroma",
        );

        if upload.reallocates() || self.bind_group.is_none() {
            self.rebuild_bind_group(ctx.device);
        }
    }

    fn rebuild_bind_group(&mut self, device: &wgpu::Device) {
        let (Some(luma), Some(chroma)) = (self.luma.as_ref(), self.chroma.as_ref()) else {
            self.bind_group = None;
            return;
        };

        self.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("arquad camera image bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&luma.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&chroma.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        }));
    }

    /// Opens the frame's first pass (applying the target's clears) and draws
    /// the camera image into it. Before the first captured image arrives the
    /// pass only clears.
    pub fn draw(&self, target: &mut RenderTarget<'_>) {
        let mut rpass = target.begin_pass("arquad camera image pass");

        let Some(bind_group) = self.bind_group.as_ref() else { return };

        rpass.push_debug_group("DrawCapturedImage");
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        rpass.draw(0..4, 0..1);
        rpass.pop_debug_group();
    }
}

/// Writes `plane` into `slot`, allocating a new texture first when asked to.
fn write_plane(
    ctx: &RenderCtx<'_>,
    slot: &mut Option<SampledTexture>,
    plane: &PixelPlane,
    reallocate: bool,
    format: wgpu::TextureFormat,
    label: &str,
) {
    if reallocate || slot.is_none() {
        log::debug!("{label}: allocating {}x{} {format:?}", plane.width, plane.height);
        *slot = Some(SampledTexture::new(ctx.device, label, format, plane.width, plane.height));
    }
    if let Some(texture) = slot.as_ref() {
        texture.write(ctx.queue, &plane.data, plane.bytes_per_row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Orientation;
    use crate::tracking::{Intrinsics, PinholeCamera};
    use glam::{Mat2, Mat4, UVec2};

    fn camera() -> PinholeCamera {
        let resolution = UVec2::new(1920, 1440);
        PinholeCamera {
            pose: Mat4::IDENTITY,
            intrinsics: Intrinsics::from_horizontal_fov(resolution, 65f32.to_radians()),
            resolution,
        }
    }

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).abs().max_element() < 1e-5
    }

    #[test]
    fn identity_transform_keeps_canonical_uvs() {
        assert_eq!(ImagePlane::fitted(Affine2::IDENTITY), ImagePlane::canonical());
    }

    #[test]
    fn pure_rotation_permutes_corner_uvs() {
        // Quarter turn about the image center.
        let t = Affine2::from_mat2_translation(
            Mat2::from_cols(Vec2::new(0.0, -1.0), Vec2::new(1.0, 0.0)),
            Vec2::new(0.0, 1.0),
        );
        let canonical = ImagePlane::canonical().uvs();
        let fitted = ImagePlane::fitted(t).uvs();
        for uv in fitted {
            assert!(canonical.iter().any(|c| close(*c, uv)), "{uv:?} is not a corner");
        }
    }

    #[test]
    fn positions_never_change() {
        let t = camera().display_transform(Orientation::Portrait, Viewport::new(1170.0, 2532.0));
        let fitted = ImagePlane::fitted(t);
        for (a, b) in fitted.vertices().iter().zip(CANONICAL_VERTICES.iter()) {
            assert_eq!(a.position, b.position);
        }
    }

    #[test]
    fn aspect_fill_uvs_stay_in_unit_square_for_any_viewport() {
        let cam = camera();
        let sizes = [
            (1920.0, 1080.0),
            (1080.0, 1920.0),
            (1170.0, 2532.0),
            (800.0, 800.0),
            (3000.0, 200.0),
        ];
        for (w, h) in sizes {
            let t = cam.display_transform(Orientation::Portrait, Viewport::new(w, h));
            for uv in ImagePlane::fitted(t).uvs() {
                assert!(uv.min_element() >= -1e-5 && uv.max_element() <= 1.0 + 1e-5, "{w}x{h}: {uv:?}");
            }
        }
    }

    #[test]
    fn refitting_with_same_inputs_is_idempotent() {
        let t = camera().display_transform(Orientation::Portrait, Viewport::new(1080.0, 1920.0));
        assert_eq!(ImagePlane::fitted(t), ImagePlane::fitted(t));
    }

    #[test]
    fn portrait_fill_crops_the_long_image_axis() {
        // 1920x1440 sensor image shown in a tall 1080x1920 portrait viewport:
        // the rotated image is 1440 wide, 1920 tall, so the width overflows.
        let t = camera().display_transform(Orientation::Portrait, Viewport::new(1080.0, 1920.0));
        let uvs = ImagePlane::fitted(t).uvs();
        let (min, max) = uvs
            .iter()
            .fold((Vec2::splat(f32::MAX), Vec2::splat(f32::MIN)), |(lo, hi), uv| {
                (lo.min(*uv), hi.max(*uv))
            });
        // Image v (rotated onto the viewport's x axis) is cropped...
        assert!(max.y - min.y < 1.0 - 1e-3);
        // ...while image u spans the full height.
        assert!(close(Vec2::new(min.x, max.x), Vec2::new(0.0, 1.0)));
    }

    // ── captured textures ─────────────────────────────────────────────────

    fn pixel_plane(w: u32, h: u32, bytes_per_row: u32) -> PixelPlane {
        PixelPlane::new(w, h, bytes_per_row, vec![0u8; (bytes_per_row * h) as usize].into()).unwrap()
    }

    fn nv12(w: u32, h: u32) -> PlanarImage {
        PlanarImage::new(vec![pixel_plane(w, h, w), pixel_plane(w / 2, h / 2, w)])
    }

    #[test]
    fn single_plane_image_uploads_nothing() {
        let mut textures = CapturedTextures::default();
        let gray = PlanarImage::new(vec![pixel_plane(8, 8, 8)]);
        assert!(textures.plan(&gray).is_none());
        assert!(!textures.is_complete());
    }

    #[test]
    fn single_plane_image_keeps_previous_textures() {
        let mut textures = CapturedTextures::default();
        textures.plan(&nv12(8, 8)).unwrap();
        let before = textures.clone();

        assert!(textures.plan(&PlanarImage::new(vec![pixel_plane(8, 8, 8)])).is_none());
        assert_eq!(textures, before);
        assert!(textures.is_complete());
    }

    #[test]
    fn textures_reallocate_only_on_size_change() {
        let mut textures = CapturedTextures::default();
        assert!(textures.plan(&nv12(8, 8)).unwrap().reallocates());
        assert!(!textures.plan(&nv12(8, 8)).unwrap().reallocates());

        let resized = nv12(16, 8);
        let upload = textures.plan(&resized).unwrap();
        assert!(upload.reallocate_luma && upload.reallocate_chroma);
    }

    #[test]
    fn short_rows_are_rejected() {
        let mut textures = CapturedTextures::default();
        // Chroma is two bytes per texel: 4 texels need 8 bytes per row.
        let image = PlanarImage::new(vec![pixel_plane(8, 8, 8), pixel_plane(4, 4, 4)]);
        assert!(textures.plan(&image).is_none());
        assert!(!textures.is_complete());
    }
}
