//! One textured quad per detected plane, drawn with a single instanced call.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};
use wgpu::util::DeviceExt;

use crate::coords::{flip_z, to_render_space, Viewport};

use super::common::{self, SampledTexture};
use super::{RenderCtx, RenderTarget};

// ── geometry ──────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct PlaneVertex {
    position: [f32; 4],
    uv: [f32; 2],
}

impl PlaneVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x4, // position
        1 => Float32x2  // uv
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PlaneVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

//  z
//  ^
//  | v2  v3
//  |
//  | v0  v1
//  +-------> x
//
// Lies in the anchor's horizontal (y = 0) plane; scaled by the half-width
// uniform in the vertex shader.
const PLANE_VERTICES: [PlaneVertex; 4] = [
    PlaneVertex { position: [-1.0, 0.0, -1.0, 1.0], uv: [0.0, 0.0] },
    PlaneVertex { position: [1.0, 0.0, -1.0, 1.0], uv: [1.0, 0.0] },
    PlaneVertex { position: [-1.0, 0.0, 1.0, 1.0], uv: [0.0, 1.0] },
    PlaneVertex { position: [1.0, 0.0, 1.0, 1.0], uv: [1.0, 1.0] },
];

const PLANE_INDICES: [u32; 6] = [0, 1, 3, 0, 3, 2];

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct AnchorInstance {
    position: [f32; 4],
}

impl AnchorInstance {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32x4];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<AnchorInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct AnchorUniforms {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    half_width: f32,
    _pad: [f32; 3], // 16-byte alignment
}

// ── CPU-side scene state ──────────────────────────────────────────────────

/// Arguments of the single instanced draw issued for a frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct InstancedDraw {
    pub index_count: u32,
    pub instance_count: u32,
}

/// Per-frame inputs of the anchor draw, already converted to render space.
#[derive(Debug, Clone, Default)]
pub struct AnchorScene {
    viewport: Viewport,
    view: Mat4,
    projection: Mat4,
    positions: Vec<Vec4>,
}

impl AnchorScene {
    pub fn set_viewport_size(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Stores the camera matrices. The view matrix gets the Z flip; the
    /// projection already targets the GPU clip space and is kept as is.
    pub fn set_camera_matrices(&mut self, view: Mat4, projection: Mat4) {
        self.view = view * flip_z();
        self.projection = projection;
    }

    /// Replaces the anchor list, flipping each position's Z like the view.
    pub fn set_anchors(&mut self, world_positions: &[Vec4]) {
        self.positions.clear();
        self.positions
            .extend(world_positions.iter().copied().map(to_render_space));
    }

    pub fn anchor_count(&self) -> usize {
        self.positions.len()
    }

    pub fn positions(&self) -> &[Vec4] {
        &self.positions
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// `None` when there is nothing to draw.
    pub fn instanced_draw(&self) -> Option<InstancedDraw> {
        if self.positions.is_empty() {
            return None;
        }
        Some(InstancedDraw {
            index_count: PLANE_INDICES.len() as u32,
            instance_count: self.positions.len() as u32,
        })
    }

    fn uniforms(&self, quad_width: f32) -> AnchorUniforms {
        AnchorUniforms {
            view: self.view.to_cols_array_2d(),
            projection: self.projection.to_cols_array_2d(),
            half_width: quad_width * 0.5,
            _pad: [0.0; 3],
        }
    }
}

// ── renderer ──────────────────────────────────────────────────────────────

/// Draws the decal quad at every anchor position, depth-tested.
///
/// Must run after [`super::CameraImageCompositor::draw`]: it loads the color
/// target instead of clearing it.
pub struct AnchorRenderer {
    scene: AnchorScene,

    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    decal_bind_group: wgpu::BindGroup,

    plane_vbo: wgpu::Buffer,
    plane_ibo: wgpu::Buffer,

    instance_vbo: Option<wgpu::Buffer>,
    instance_capacity: usize,
}

impl AnchorRenderer {
    /// Builds the quad mesh, the depth-tested pipeline and the decal texture.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
        decal: &image::RgbaImage,
    ) -> Self {
        let plane_vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("arquad plane vbo"),
            contents: bytemuck::cast_slice(&PLANE_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let plane_ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("arquad plane ibo"),
            contents: bytemuck::cast_slice(&PLANE_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("arquad anchor ubo"),
            size: std::mem::size_of::<AnchorUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("arquad anchor uniform bgl"),
            entries: &[common::uniform_entry::<AnchorUniforms>(0, wgpu::ShaderStages::VERTEX)],
        });
        let decal_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("arquad decal bgl"),
            entries: &[common::texture_entry(0), common::sampler_entry(1)],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("arquad anchor uniform bind group"),
            layout: &uniform_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let decal_texture = SampledTexture::new(
            device,
            "arquad decal",
            wgpu::TextureFormat::Rgba8UnormSrgb,
            decal.width().max(1),
            decal.height().max(1),
        );
        if decal.width() > 0 && decal.height() > 0 {
            decal_texture.write(queue, decal.as_raw(), decal.width() * 4);
        }
        let sampler = common::linear_clamp_sampler(device, "arquad decal sampler");
        let decal_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("arquad decal bind group"),
            layout: &decal_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&decal_texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("arquad anchor shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/anchors.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("arquad anchor pipeline layout"),
            bind_group_layouts: &[&uniform_bgl, &decal_bgl],
            immediate_size: 0,
        });

        let output_constants = common::output_constants(color_format);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("arquad anchor pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[PlaneVertex::layout(), AnchorInstance::layout()],
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
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            // Winding flips with the handedness conversion; draw both faces.
            primitive: common::no_cull(wgpu::PrimitiveTopology::TriangleList),
            depth_stencil: Some(common::depth_state(
                depth_format,
                true,
                wgpu::CompareFunction::Less,
            )),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!(
            "anchor pipeline created for {color_format:?}/{depth_format:?}, decal {}x{}",
            decal.width(),
            decal.height()
        );

        Self {
            scene: AnchorScene::default(),
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            decal_bind_group,
            plane_vbo,
            plane_ibo,
            instance_vbo: None,
            instance_capacity: 0,
        }
    }

    pub fn scene(&self) -> &AnchorScene {
        &self.scene
    }

    pub fn anchor_count(&self) -> usize {
        self.scene.anchor_count()
    }

    pub fn set_viewport_size(&mut self, viewport: Viewport) {
        self.scene.set_viewport_size(viewport);
    }

    pub fn set_camera_matrices(&mut self, view: Mat4, projection: Mat4) {
        self.scene.set_camera_matrices(view, projection);
    }

    pub fn set_anchors(&mut self, world_positions: &[Vec4]) {
        self.scene.set_anchors(world_positions);
    }

    /// Uploads this frame's uniforms and instances, then issues one
    /// instanced draw. No-op without anchors.
    pub fn draw(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>, quad_width: f32) {
        let Some(call) = self.scene.instanced_draw() else { return };

        self.ensure_instance_capacity(ctx, self.scene.anchor_count());
        let Some(instance_vbo) = self.instance_vbo.as_ref() else { return };

        let instances: Vec<AnchorInstance> = self
            .scene
            .positions()
            .iter()
            .map(|p| AnchorInstance { position: p.to_array() })
            .collect();
        ctx.queue
            .write_buffer(instance_vbo, 0, bytemuck::cast_slice(&instances));
        ctx.queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&self.scene.uniforms(quad_width)),
        );

        let viewport = clamp_viewport(self.scene.viewport(), ctx.viewport);

        target.with_color_load(wgpu::LoadOp::Load, |target| {
            let mut rpass = target.begin_pass("arquad anchor pass");

            rpass.set_pipeline(&self.pipeline);
            if let Some(v) = viewport {
                rpass.set_viewport(0.0, 0.0, v.width, v.height, 0.0, 1.0);
            }
            rpass.set_bind_group(0, &self.uniform_bind_group, &[]);
            rpass.set_bind_group(1, &self.decal_bind_group, &[]);
            rpass.set_vertex_buffer(0, self.plane_vbo.slice(..));
            rpass.set_vertex_buffer(1, instance_vbo.slice(..));
            rpass.set_index_buffer(self.plane_ibo.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..call.index_count, 0, 0..call.instance_count);
        });
    }

    fn ensure_instance_capacity(&mut self, ctx: &RenderCtx<'_>, required_instances: usize) {
        if required_instances <= self.instance_capacity && self.instance_vbo.is_some() {
            return;
        }

        let new_cap = required_instances.next_power_of_two().max(16);
        let new_size = (new_cap * std::mem::size_of::<AnchorInstance>()) as u64;

        self.instance_vbo = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("arquad anchor instance vbo"),
            size: new_size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.instance_capacity = new_cap;
        log::debug!("anchor instance buffer grown to {new_cap}");
    }
}

/// Recorded viewport, limited to the drawable actually being rendered.
/// `None` keeps the pass default (whole target).
fn clamp_viewport(recorded: Viewport, drawable: Viewport) -> Option<Viewport> {
    if !recorded.is_valid() || !drawable.is_valid() {
        return None;
    }
    Some(Viewport::new(
        recorded.width.min(drawable.width),
        recorded.height.min(drawable.height),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec3, Vec4Swizzles};

    fn scene_with(n: usize) -> AnchorScene {
        let mut scene = AnchorScene::default();
        let positions: Vec<Vec4> = (0..n).map(|i| Vec4::new(i as f32, 0.0, -1.0, 1.0)).collect();
        scene.set_anchors(&positions);
        scene
    }

    // ── instanced draw ────────────────────────────────────────────────────

    #[test]
    fn no_anchors_no_draw() {
        assert_eq!(scene_with(0).instanced_draw(), None);
    }

    #[test]
    fn one_draw_with_instance_per_anchor() {
        for n in [1, 2, 17, 300] {
            let call = scene_with(n).instanced_draw().unwrap();
            assert_eq!(call, InstancedDraw { index_count: 6, instance_count: n as u32 });
        }
    }

    #[test]
    fn set_anchors_replaces_wholesale() {
        let mut scene = scene_with(5);
        scene.set_anchors(&[Vec4::new(1.0, 2.0, 3.0, 1.0)]);
        assert_eq!(scene.anchor_count(), 1);
        scene.set_anchors(&[]);
        assert_eq!(scene.anchor_count(), 0);
        assert!(scene.instanced_draw().is_none());
    }

    // ── handedness ────────────────────────────────────────────────────────

    #[test]
    fn anchor_z_is_negated() {
        let mut scene = AnchorScene::default();
        scene.set_anchors(&[Vec4::new(0.3, -1.2, -2.0, 1.0)]);
        assert_eq!(scene.positions()[0], Vec4::new(0.3, -1.2, 2.0, 1.0));
    }

    #[test]
    fn only_view_matrix_is_flipped() {
        let view = Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0));
        let proj = Mat4::perspective_rh(1.0, 0.5, 0.001, 10000.0);
        let mut scene = AnchorScene::default();
        scene.set_camera_matrices(view, proj);
        assert_eq!(scene.projection(), proj);
        assert_eq!(scene.view(), view * flip_z());
    }

    #[test]
    fn converted_view_and_positions_agree_with_originals() {
        let view = Mat4::look_at_rh(Vec3::new(1.0, 1.5, 2.0), Vec3::ZERO, Vec3::Y);
        let world = Vec4::new(0.25, -0.5, -0.75, 1.0);

        let mut scene = AnchorScene::default();
        scene.set_camera_matrices(view, Mat4::IDENTITY);
        scene.set_anchors(&[world]);
        let render = scene.positions()[0];

        let eye_original = view * world;
        let eye_converted = scene.view() * render;
        assert!((eye_original - eye_converted).abs().max_element() < 1e-5);

        // Inverting the converted view recovers x/y and the negated z.
        let back = scene.view().inverse() * eye_converted;
        assert!((back.xy() - world.xy()).abs().max_element() < 1e-5);
        assert!((back.z + world.z).abs() < 1e-5);
    }

    // ── uniforms ──────────────────────────────────────────────────────────

    #[test]
    fn uniform_layout_matches_shader() {
        assert_eq!(std::mem::size_of::<AnchorUniforms>(), 144);
        assert_eq!(std::mem::size_of::<PlaneVertex>(), 24);
        assert_eq!(std::mem::size_of::<AnchorInstance>(), 16);
    }

    #[test]
    fn half_width_is_half_the_quad_width() {
        let u = scene_with(1).uniforms(0.5);
        assert_eq!(u.half_width, 0.25);
    }

    #[test]
    fn viewport_is_clamped_to_drawable() {
        let v = clamp_viewport(Viewport::new(1920.0, 1080.0), Viewport::new(1080.0, 1920.0));
        assert_eq!(v, Some(Viewport::new(1080.0, 1080.0)));
        assert_eq!(clamp_viewport(Viewport::default(), Viewport::new(10.0, 10.0)), None);
    }
}
