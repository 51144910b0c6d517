// Flume Shoal: a CPU-simulated shoal drawn with ONE instanced draw call.
// The simulation's position and heading arrays are uploaded verbatim as two
// per-instance vertex buffers every frame.
//
//   flume_shoal [--config <file.ron>] [agent_count]
//
//   F3      stats panel + steering sliders
//   F4      target markers
//   WASD    orbit, mouse wheel zoom, left drag orbit
//   Esc     quit

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use bevy_ecs::prelude::*;
use glam::{Mat4, Vec4};
use wgpu::util::DeviceExt;
use winit::{
    event::{ElementState, Event as WinitEvent, KeyEvent, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use flume_shoal::engine::camera::OrbitCamera;
use flume_shoal::engine::debug_overlay::{DebugOverlay, DebugStats, OverlayLayers, TargetMarker};
use flume_shoal::engine::input::InputState;
use flume_shoal::engine::lathe::fish_mesh;
use flume_shoal::engine::mesh::{GpuVertex, instance_vec3_desc, triangulate_smooth};
use flume_shoal::engine::systems::{build_world, frame_schedule};
use flume_shoal::engine::{Shoal, SimStats, WorldClock};
use flume_shoal::flock::{FlockConfig, FlockSimulation};

const FISH_LENGTH: f32 = 0.3;
const FISH_SEGMENTS: u32 = 10;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

// ============================================================================
// UNIFORM DATA
// ============================================================================

/// Matches `Uniforms` in fish.wgsl (80 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    time: f32,
    swim_amplitude: f32,
    swim_frequency: f32,
    _pad: f32,
}

impl Uniforms {
    fn new(view_proj: Mat4, time: f32) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            time,
            swim_amplitude: FISH_LENGTH * 0.12,
            swim_frequency: 9.0,
            _pad: 0.0,
        }
    }
}

// ============================================================================
// COMMAND LINE
// ============================================================================

#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    agent_count: Option<usize>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config needs a file path")?;
                parsed.config = Some(PathBuf::from(path));
            }
            count => {
                if parsed.agent_count.is_some() {
                    bail!("unexpected argument `{count}`");
                }
                let n = count
                    .parse()
                    .with_context(|| format!("agent count `{count}` is not a number"))?;
                parsed.agent_count = Some(n);
            }
        }
    }
    Ok(parsed)
}

fn load_config(args: &Args) -> Result<FlockConfig> {
    let config = match &args.config {
        Some(path) => FlockConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => FlockConfig::default(),
    };
    Ok(match args.agent_count {
        Some(n) => config.with_agent_count(n),
        None => config,
    })
}

// ============================================================================
// FRAME TIMING
// ============================================================================

/// Frame times over the last whole second, for the overlay.
struct FrameTimer {
    window_start: Instant,
    frames: u32,
    sum_ms: f32,
    min_ms: f32,
    max_ms: f32,
    /// (fps, avg, min, max) of the last completed second.
    last: (u32, f32, f32, f32),
}

impl FrameTimer {
    fn new() -> Self {
        Self {
            window_start: Instant::now(),
            frames: 0,
            sum_ms: 0.0,
            min_ms: f32::MAX,
            max_ms: 0.0,
            last: (0, 0.0, 0.0, 0.0),
        }
    }

    fn record(&mut self, frame_ms: f32) {
        self.frames += 1;
        self.sum_ms += frame_ms;
        self.min_ms = self.min_ms.min(frame_ms);
        self.max_ms = self.max_ms.max(frame_ms);

        if self.window_start.elapsed().as_secs_f32() >= 1.0 {
            self.last = (
                self.frames,
                self.sum_ms / self.frames as f32,
                self.min_ms,
                self.max_ms,
            );
            *self = Self { last: self.last, ..Self::new() };
        }
    }
}

// ============================================================================
// APPLICATION STATE
// ============================================================================

struct State {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    render_pipeline: wgpu::RenderPipeline,
    depth_view: wgpu::TextureView,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_indices: u32,
    position_buffer: wgpu::Buffer,
    heading_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,

    // ECS world: Shoal, WorldClock, SimStats
    world: World,
    schedule: Schedule,

    camera: OrbitCamera,
    input: InputState,
    overlay: DebugOverlay,
    timer: FrameTimer,
    last_update: Instant,
}

fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

impl State {
    async fn new(window: Arc<Window>, sim: FlockSimulation) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible GPU adapter")?;
        let info = adapter.get_info();
        log::info!("adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Fish Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("fish.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::cast_slice(&[Uniforms::new(Mat4::IDENTITY, 0.0)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("uniform_bind_group_layout"),
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("uniform_bind_group"),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout],
                push_constant_ranges: &[],
            });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Fish Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                // Mesh + positions + headings
                buffers: &[GpuVertex::desc(), instance_vec3_desc(3), instance_vec3_desc(4)],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        let fish = triangulate_smooth(&fish_mesh(FISH_LENGTH, FISH_SEGMENTS));
        log::debug!(
            "fish mesh: {} vertices, {} triangles",
            fish.vertices.len(),
            fish.index_count() / 3
        );

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Fish Vertex Buffer"),
            contents: fish.vertex_bytes(),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Fish Index Buffer"),
            contents: fish.index_bytes(),
            usage: wgpu::BufferUsages::INDEX,
        });

        // One tightly packed vec3 per agent; sized once, the agent count never changes.
        let instance_bytes = (sim.agent_count() * std::mem::size_of::<[f32; 3]>()) as u64;
        let position_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Position Instance Buffer"),
            size: instance_bytes,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let heading_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Heading Instance Buffer"),
            size: instance_bytes,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let overlay = DebugOverlay::new(&window, &device, config.format);

        let mut input = InputState::new();
        input.window_size = (size.width, size.height);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            render_pipeline,
            depth_view,
            vertex_buffer,
            index_buffer,
            num_indices: fish.index_count(),
            position_buffer,
            heading_buffer,
            uniform_buffer,
            uniform_bind_group,
            world: build_world(sim),
            schedule: frame_schedule(),
            camera: OrbitCamera::new(),
            input,
            overlay,
            timer: FrameTimer::new(),
            last_update: Instant::now(),
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, &self.config);
        }
    }

    fn aspect(&self) -> f32 {
        self.size.width.max(1) as f32 / self.size.height.max(1) as f32
    }

    fn update(&mut self) {
        let now = Instant::now();
        let dt = (now - self.last_update).as_secs_f32();
        self.last_update = now;
        self.timer.record(dt * 1000.0);

        self.camera.update(&self.input, dt.min(0.1));
        self.input.end_frame();

        // advance_clock -> simulate_flock
        self.schedule.run(&mut self.world);
    }

    /// Project every target to egui points for the F4 markers.
    fn target_markers(&self, view_proj: Mat4) -> Vec<TargetMarker> {
        let scale = self.window.scale_factor() as f32;
        let (w, h) = (self.size.width as f32 / scale, self.size.height as f32 / scale);
        let focal = self.camera.projection_matrix(self.aspect()).y_axis.y;

        self.world
            .resource::<Shoal>()
            .0
            .targets()
            .iter()
            .filter_map(|t| {
                let clip = view_proj * Vec4::new(t.x, t.y, t.z, 1.0);
                if clip.w <= self.camera.near {
                    return None;
                }
                let ndc = clip.truncate() / clip.w;
                Some(TargetMarker {
                    pos: egui::pos2((ndc.x + 1.0) * 0.5 * w, (1.0 - ndc.y) * 0.5 * h),
                    radius_px: (0.4 * focal / clip.w * h * 0.5).clamp(3.0, 60.0),
                })
            })
            .collect()
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // Upload this frame's simulation output BEFORE the render pass.
        let shoal = &self.world.resource::<Shoal>().0;
        self.queue.write_buffer(&self.position_buffer, 0, shoal.position_bytes());
        self.queue.write_buffer(&self.heading_buffer, 0, shoal.heading_bytes());
        let instance_count = shoal.agent_count() as u32;
        let workers = shoal.workers();
        let mut weights = shoal.weights();

        let world_time = self.world.resource::<WorldClock>().elapsed();
        let view_proj = self.camera.view_projection(self.aspect());
        let uniforms = Uniforms::new(view_proj, world_time as f32);
        self.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shoal Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.01,
                            g: 0.05,
                            b: 0.09,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, self.position_buffer.slice(..));
            render_pass.set_vertex_buffer(2, self.heading_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

            // ONE DRAW CALL for the whole shoal
            render_pass.draw_indexed(0..self.num_indices, 0, 0..instance_count);
        }

        if self.overlay.visible || self.overlay.show_targets {
            let sim_stats = *self.world.resource::<SimStats>();
            let (fps, avg, min, max) = self.timer.last;
            let stats = DebugStats {
                fps,
                frame_time_avg_ms: avg,
                frame_time_min_ms: min,
                frame_time_max_ms: max,
                agent_count: sim_stats.agent_count,
                cell_count: sim_stats.cell_count,
                largest_cell: sim_stats.largest_cell,
                simulate_ms: sim_stats.simulate_ms,
                workers,
                resolution: (self.size.width, self.size.height),
                camera_distance: self.camera.distance(),
                world_time,
            };
            let markers = self.target_markers(view_proj);
            let screen_descriptor = egui_wgpu::ScreenDescriptor {
                size_in_pixels: [self.config.width, self.config.height],
                pixels_per_point: self.window.scale_factor() as f32,
            };
            let visible = self.overlay.visible;
            let layers = OverlayLayers {
                stats: visible.then_some(&stats),
                weights: visible.then_some(&mut weights),
                targets: self.overlay.show_targets.then_some(markers.as_slice()),
            };

            let weights_changed = self.overlay.render(
                &self.device,
                &self.queue,
                &mut encoder,
                &self.window,
                &view,
                &screen_descriptor,
                layers,
            );
            if weights_changed {
                log::debug!("steering weights set to {weights:?}");
                self.world.resource_mut::<Shoal>().0.set_weights(weights);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

// ============================================================================
// MAIN
// ============================================================================

fn main() -> Result<()> {
    env_logger::init();

    let args = parse_args(std::env::args().skip(1))?;
    let config = load_config(&args)?;
    let sim = FlockSimulation::new(config).context("failed to initialize the shoal")?;
    log::info!(
        "spawned {} agents on {} worker threads (seed {})",
        sim.agent_count(),
        sim.workers(),
        sim.seed()
    );

    let event_loop = EventLoop::new()?;

    let window_attributes = Window::default_attributes()
        .with_title(format!("Flume Shoal - {} fish, 1 draw call", sim.agent_count()))
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

    let window = Arc::new(event_loop.create_window(window_attributes)?);

    let mut state = pollster::block_on(State::new(window.clone(), sim))?;

    event_loop.run(move |event, control_flow| {
        match event {
            WinitEvent::WindowEvent {
                ref event,
                window_id,
            } if window_id == window.id() => {
                let consumed = state.overlay.handle_window_event(&window, event).consumed;
                if !consumed {
                    state.input.process_event(event);
                }

                match event {
                    WindowEvent::CloseRequested
                    | WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                state: ElementState::Pressed,
                                physical_key: PhysicalKey::Code(KeyCode::Escape),
                                ..
                            },
                        ..
                    } => control_flow.exit(),
                    WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                state: ElementState::Pressed,
                                physical_key: PhysicalKey::Code(key),
                                repeat: false,
                                ..
                            },
                        ..
                    } => match key {
                        KeyCode::F3 => state.overlay.toggle(),
                        KeyCode::F4 => state.overlay.toggle_targets(),
                        _ => {}
                    },
                    WindowEvent::Resized(physical_size) => {
                        state.resize(*physical_size);
                    }
                    WindowEvent::RedrawRequested => {
                        state.update();
                        match state.render() {
                            Ok(_) => {}
                            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                                state.resize(state.size)
                            }
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                log::error!("GPU out of memory");
                                control_flow.exit()
                            }
                            Err(e) => log::warn!("surface error: {e:?}"),
                        }
                    }
                    _ => {}
                }
            }
            WinitEvent::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_count_and_config() {
        assert_eq!(args(&[]).unwrap(), Args::default());
        assert_eq!(
            args(&["--config", "config/shoal.ron", "5000"]).unwrap(),
            Args {
                config: Some(PathBuf::from("config/shoal.ron")),
                agent_count: Some(5000),
            }
        );
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(args(&["many"]).is_err());
        assert!(args(&["--config"]).is_err());
        assert!(args(&["10", "20"]).is_err());
    }

    #[test]
    fn count_overrides_config_default() {
        let config = load_config(&Args { config: None, agent_count: Some(64) }).unwrap();
        assert_eq!(config.agent_count, 64);
    }

    #[test]
    fn uniforms_match_shader_layout() {
        assert_eq!(std::mem::size_of::<Uniforms>(), 80);
    }
}
