use std::error::Error;

use penumbra::{prelude::*, shaders};

const FRAMES: usize = 3;

/// Ground plane and a unit cube resting on it
fn default_scene(backend: &mut WgpuBackend) {
    let ground: [[f32; 3]; 4] = [
        [-10.0, 0.0, -10.0],
        [10.0, 0.0, -10.0],
        [10.0, 0.0, 10.0],
        [-10.0, 0.0, 10.0],
    ];
    backend.add_caster("ground", &ground, &[0, 3, 2, 0, 2, 1], Mat4::IDENTITY);

    let mut cube: Vec<[f32; 3]> = Vec::with_capacity(8);
    for i in 0..8u32 {
        let corner = |bit: u32| -> f32 { if i & bit == 0 { -0.5 } else { 0.5 } };
        cube.push([corner(1), corner(2), corner(4)]);
    }
    let indices: [u32; 36] = [
        0, 2, 1, 1, 2, 3, // -z
        4, 5, 6, 5, 7, 6, // +z
        0, 1, 4, 1, 5, 4, // -y
        2, 6, 3, 3, 6, 7, // +y
        0, 4, 2, 2, 4, 6, // -x
        1, 3, 5, 3, 7, 5, // +x
    ];
    backend.add_caster("cube", &cube, &indices, Mat4::from_translation(Vec3::new(0.0, 0.5, 0.0)));
}

fn load_obj(backend: &mut WgpuBackend, path: &str) -> Result<(), Box<dyn Error>> {
    let (models, _) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS)?;

    for model in models {
        let positions: Vec<[f32; 3]> = model
            .mesh
            .positions
            .chunks_exact(3)
            .map(|p| [p[0], p[1], p[2]])
            .collect();
        log::info!("caster '{}': {} vertices", model.name, positions.len());
        backend.add_caster(&model.name, &positions, &model.mesh.indices, Mat4::IDENTITY);
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => ShadowSettings::load(path)?,
        None => ShadowSettings::default(),
    };

    let mut backend = WgpuBackend::headless()?;
    backend.register_shader(&settings.shaders.caster, shaders::SHADOW_CASTER)?;
    backend.register_shader(&settings.shaders.moments, shaders::SHADOW_MOMENTS)?;
    backend.register_shader(&settings.shaders.deferred_lighting, shaders::DEFERRED_SHADING)?;

    match args.next() {
        Some(path) => load_obj(&mut backend, &path)?,
        None => default_scene(&mut backend),
    }

    let mut light = LightCamera::new(
        Projection::Orthographic(OrthographicProjection {
            area: Rect::new_min_max(-12.0, -12.0, 12.0, 12.0),
            near: 0.1,
            far: 80.0,
            ..Default::default()
        }),
        Transform::looking_at(Vec3::new(10.0, 25.0, 10.0), Vec3::ZERO, Vec3::Y),
    );

    let mut camera = ShadowmapCamera::new(settings)?;
    camera.request_rebuild();
    let mut globals = ShaderGlobals::new();

    for _ in 0..FRAMES {
        camera.update(Some(&mut light), &mut backend, &mut globals);
        backend.upload_globals(&globals);
    }

    let uniforms = ShadowUniforms::from_globals(&globals);
    log::info!("shadow type: {}", camera.shadow_type());
    log::info!("light_VP: {:?}", Mat4::from_cols_array_2d(&uniforms.light_vp));
    log::info!("targets: {:?}", camera.targets());
    log::info!(
        "deferred shading shader: {:?}",
        backend.custom_shader(BuiltinShader::DeferredShading)
    );

    if backend.shadow_bind_group(&globals).is_some() {
        log::info!("shadow bind group ready");
    } else {
        log::warn!("shadow textures missing, no bind group");
    }

    camera.release(&mut backend, &mut globals);

    Ok(())
}
