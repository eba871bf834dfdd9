//! The wgpu side of the viewer.
//!
//! [`Context`] owns the device, queue and surface of one viewer window together
//! with the camera/light uniforms and the single render pipeline. It is the
//! production [`RenderBackend`]: geometry, materials and instances are GPU
//! buffers that are destroyed as soon as the scene releases them.

use std::{iter, sync::Arc};

use anyhow::{Context as _, ensure};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::{CameraUniform, ViewportRig},
    config::ViewerConfig,
    data_structures::{instance::Instance, mesh::DecodedMesh, texture},
    pipelines::{
        basic::mk_basic_pipeline,
        light::{LightResources, LightUniform},
        material::{self, MaterialUniform},
    },
    render::{Drawn, MaterialDesc, RenderBackend},
    scene::ResourceSet,
};

#[derive(Debug)]
pub struct CameraResources {
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    fn new(device: &wgpu::Device) -> Self {
        let uniform = CameraUniform::new();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }
}

/// Vertex buffer of a displayed mesh, expanded to a flat triangle list.
#[derive(Debug)]
pub struct GpuGeometry {
    pub vertex_buffer: wgpu::Buffer,
    pub num_vertices: u32,
}

#[derive(Debug)]
pub struct GpuMaterial {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

#[derive(Debug)]
pub struct GpuInstance {
    pub buffer: wgpu::Buffer,
}

pub struct Context {
    window: Option<Arc<Window>>,
    surface: Option<wgpu::Surface<'static>>,
    pub(crate) depth_texture: texture::Texture,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub light: LightResources,
    pub material_layout: wgpu::BindGroupLayout,
    pub pipeline: wgpu::RenderPipeline,
    pub clear_colour: wgpu::Color,
}

impl Context {
    pub async fn new(window: Arc<Window>, viewer: &ViewerConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let (width, height) = if size.width > 0 && size.height > 0 {
            (size.width, size.height)
        } else {
            (viewer.width, viewer.height)
        };

        // The instance is a handle to our GPU
        // BackendBit::PRIMARY => Vulkan + Metal + DX12 + Browser WebGPU
        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("cannot create a surface for the viewer window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no GPU adapter can present to the viewer surface")?;
        log::info!("device and queue");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("cannot open the GPU device")?;

        log::info!("Surface");
        let surface_caps = surface.get_capabilities(&adapter);
        ensure!(
            !surface_caps.formats.is_empty(),
            "the surface supports no texture format"
        );
        // The shader writes linear colour, so prefer an sRGB surface.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let camera = CameraResources::new(&device);
        let light = LightResources::new(LightUniform::default(), &device);
        let material_layout = material::mk_bind_group_layout(&device);
        let pipeline = mk_basic_pipeline(
            &device,
            &config,
            &camera.bind_group_layout,
            &light.bind_group_layout,
            &material_layout,
            MaterialDesc::default().double_sided,
        );

        let depth_texture = texture::Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            "depth_texture",
        );

        let [r, g, b, a] = viewer.clear_colour;
        Ok(Self {
            window: Some(window),
            surface: Some(surface),
            depth_texture,
            device,
            queue,
            config,
            camera,
            light,
            material_layout,
            pipeline,
            clear_colour: wgpu::Color { r, g, b, a },
        })
    }

    pub fn window(&self) -> Option<&Arc<Window>> {
        self.window.as_ref()
    }

    pub fn is_attached(&self) -> bool {
        self.surface.is_some()
    }

    fn reconfigure(&self) {
        if let Some(surface) = &self.surface {
            surface.configure(&self.device, &self.config);
        }
    }
}

impl RenderBackend for Context {
    type Geometry = GpuGeometry;
    type Material = GpuMaterial;
    type Instance = GpuInstance;

    fn create_geometry(&mut self, mesh: &DecodedMesh) -> anyhow::Result<GpuGeometry> {
        let vertices = mesh.to_vertices();
        ensure!(!vertices.is_empty(), "mesh has no triangles to upload");
        let num_vertices = u32::try_from(vertices.len()).context("mesh too large for one draw")?;
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertex Buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        Ok(GpuGeometry {
            vertex_buffer,
            num_vertices,
        })
    }

    fn create_material(&mut self, desc: &MaterialDesc) -> anyhow::Result<GpuMaterial> {
        let buffer = material::mk_buffer(&self.device, MaterialUniform::from(desc));
        let bind_group = material::mk_bind_group(&self.device, &self.material_layout, &buffer);
        Ok(GpuMaterial { buffer, bind_group })
    }

    fn create_instance(&mut self, instance: &Instance) -> anyhow::Result<GpuInstance> {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Instance Buffer"),
                contents: bytemuck::cast_slice(&[instance.to_raw()]),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
        Ok(GpuInstance { buffer })
    }

    fn release_geometry(&mut self, geometry: GpuGeometry) {
        geometry.vertex_buffer.destroy();
    }

    fn release_material(&mut self, material: GpuMaterial) {
        material.buffer.destroy();
    }

    fn release_instance(&mut self, instance: GpuInstance) {
        instance.buffer.destroy();
    }

    fn draw(
        &mut self,
        live: Option<&ResourceSet<Self>>,
        rig: &ViewportRig,
    ) -> anyhow::Result<Drawn> {
        let Some(surface) = &self.surface else {
            return Ok(Drawn::Skipped);
        };

        self.camera.uniform = rig.uniform();
        self.queue.write_buffer(
            &self.camera.buffer,
            0,
            bytemuck::cast_slice(&[self.camera.uniform]),
        );

        let output = match surface.get_current_texture() {
            Ok(output) => output,
            // Reconfigure the surface if it's lost or outdated
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.reconfigure();
                return Ok(Drawn::Skipped);
            }
            Err(e) => return Err(e).context("cannot acquire the next frame"),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let Some(set) = live {
                render_pass.set_pipeline(&self.pipeline);
                render_pass.set_bind_group(0, &self.camera.bind_group, &[]);
                render_pass.set_bind_group(1, &self.light.bind_group, &[]);
                render_pass.set_bind_group(2, &set.material.bind_group, &[]);
                render_pass.set_vertex_buffer(0, set.geometry.vertex_buffer.slice(..));
                render_pass.set_vertex_buffer(1, set.instance.buffer.slice(..));
                render_pass.draw(0..set.geometry.num_vertices, 0..1);
            }
        }

        self.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(Drawn::Presented)
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.reconfigure();
        self.depth_texture =
            texture::Texture::create_depth_texture(&self.device, [width, height], "depth_texture");
    }

    fn detach(&mut self) {
        // the surface borrows the window, so it goes first
        self.surface = None;
        if let Some(window) = self.window.take() {
            #[cfg(target_arch = "wasm32")]
            {
                use winit::platform::web::WindowExtWebSys;
                if let Some(canvas) = window.canvas() {
                    canvas.remove();
                }
            }
            window.set_visible(false);
        }
        log::info!("render surface detached");
    }
}
