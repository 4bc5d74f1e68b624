use crate::{
    backend::{BuiltinShader, BuiltinShaderMode, RenderBackend, RenderTargetHandle, ShaderHandle},
    error::ConfigError,
    math::LightCamera,
};

use super::{
    globals::{ESM_NORMAL_BIAS, LIGHT_VIEW_PROJECTION, SHADOW_TYPE},
    RenderTargetDescriptor, ShaderGlobals, ShadowSettings, ShadowTargets, ShadowType,
};

/// Post-process pass of the moments shader writing exponential moments
pub const EXPONENTIAL_PASS: u32 = 0;
/// Post-process pass of the moments shader writing depth and squared depth
pub const VARIANCE_PASS: u32 = 1;

/// Drives shadow map generation for a single light and publishes the parameters the deferred
/// lighting shader reads.
///
/// Call [ShadowmapCamera::update] once per frame. Set [ShadowmapCamera::build_shadowmaps] to
/// re-render the shadow map and its moment textures on the next update.
#[derive(Debug)]
pub struct ShadowmapCamera {
    settings: ShadowSettings,
    /// One-shot rebuild request, cleared when the rebuild starts
    pub build_shadowmaps: bool,
    targets: ShadowTargets,
    lighting_shader: Option<ShaderHandle>,
}

impl ShadowmapCamera {
    /// Validates `settings` first, see [ShadowSettings::validate]
    pub fn new(mut settings: ShadowSettings) -> Result<Self, ConfigError> {
        settings.validate()?;

        Ok(Self {
            settings,
            build_shadowmaps: false,
            targets: ShadowTargets::default(),
            lighting_shader: None,
        })
    }

    pub fn settings(&self) -> &ShadowSettings {
        &self.settings
    }

    pub fn shadow_type(&self) -> ShadowType {
        self.settings.shadow_type
    }

    pub fn set_shadow_type(&mut self, shadow_type: ShadowType) {
        self.settings.shadow_type = shadow_type;
    }

    /// Sets the normal bias, clamped to [0, 0.1]. NaN resets it to the default.
    pub fn set_esm_normal_bias(&mut self, bias: f32) {
        self.settings.esm_normal_bias = ShadowSettings::clamp_esm_normal_bias(bias);
    }

    /// Resolution used by the next rebuild
    pub fn set_resolution(&mut self, resolution: u32) -> Result<(), ConfigError> {
        ShadowSettings::check_resolution(resolution)?;
        self.settings.resolution = resolution;
        Ok(())
    }

    pub fn request_rebuild(&mut self) {
        self.build_shadowmaps = true;
    }

    pub fn targets(&self) -> &ShadowTargets {
        &self.targets
    }

    /// Per-frame update. Does nothing without a light camera.
    pub fn update<B: RenderBackend>(
        &mut self,
        light: Option<&mut LightCamera>,
        backend: &mut B,
        globals: &mut ShaderGlobals,
    ) {
        let Some(light) = light else {
            return;
        };

        light.projection.make_square();

        globals.set_matrix(LIGHT_VIEW_PROJECTION, light.view_projection_matrix());
        globals.set_int(SHADOW_TYPE, self.settings.shadow_type.ordinal());
        globals.set_float(ESM_NORMAL_BIAS, self.settings.esm_normal_bias);

        if self.build_shadowmaps {
            self.build_shadowmaps = false;
            self.rebuild(light, backend);
        }

        self.publish_textures(globals);
        self.install_lighting_shader(backend);
    }

    /// Releases every held render target, binding names are removed from `globals`
    pub fn release<B: RenderBackend>(&mut self, backend: &mut B, globals: &mut ShaderGlobals) {
        for (name, target) in self.targets.bindings() {
            if let Some(target) = target {
                backend.release_render_target(target);
                globals.remove_texture(name);
            }
        }

        self.targets = ShadowTargets::default();
    }

    fn rebuild<B: RenderBackend>(&mut self, light: &LightCamera, backend: &mut B) {
        let size = self.settings.resolution;
        log::debug!("rebuilding {size}x{size} shadow maps ({})", self.settings.shadow_type);

        let shadow_map = replace_target(
            backend,
            &mut self.targets.shadow_map,
            &RenderTargetDescriptor::shadow_map(size),
        );
        match (shadow_map, backend.find_shader(&self.settings.shaders.caster)) {
            (Some(shadow_map), Some(caster)) => {
                if let Err(err) = backend.render_with_shader(light, shadow_map, caster) {
                    log::warn!("shadow caster pass failed: {err}");
                }
            }
            (_, None) => log::warn!("caster shader '{}' not found", self.settings.shaders.caster),
            (None, Some(_)) => {}
        }

        let moments = backend.find_shader(&self.settings.shaders.moments);
        if moments.is_none() {
            log::warn!("moments shader '{}' not found", self.settings.shaders.moments);
        }

        let exponential = replace_target(
            backend,
            &mut self.targets.exponential,
            &RenderTargetDescriptor::exponential_moments(size),
        );
        if let (Some(source), Some(destination), Some(moments)) = (shadow_map, exponential, moments) {
            if let Err(err) = backend.blit(source, destination, moments, EXPONENTIAL_PASS) {
                log::warn!("exponential moments pass failed: {err}");
            }
        }

        let variance = replace_target(
            backend,
            &mut self.targets.variance,
            &RenderTargetDescriptor::variance_moments(size),
        );
        if let (Some(source), Some(destination), Some(moments)) = (shadow_map, variance, moments) {
            if let Err(err) = backend.blit(source, destination, moments, VARIANCE_PASS) {
                log::warn!("variance moments pass failed: {err}");
            }
        }
    }

    /// Binds every held target. Names of targets that failed to allocate are unbound so no
    /// binding outlives its release.
    fn publish_textures(&self, globals: &mut ShaderGlobals) {
        for (name, target) in self.targets.bindings() {
            match target {
                Some(target) => globals.set_texture(name, target),
                None => {
                    globals.remove_texture(name);
                }
            }
        }
    }

    fn install_lighting_shader<B: RenderBackend>(&mut self, backend: &mut B) {
        if self.lighting_shader.is_none() {
            self.lighting_shader = backend.find_shader(&self.settings.shaders.deferred_lighting);
        }

        let Some(shader) = self.lighting_shader else {
            return;
        };

        if backend.custom_shader(BuiltinShader::DeferredShading) != Some(shader) {
            log::debug!("installing '{}' as deferred shading", self.settings.shaders.deferred_lighting);
            backend.set_shader_mode(BuiltinShader::DeferredShading, BuiltinShaderMode::UseCustom);
            backend.set_custom_shader(BuiltinShader::DeferredShading, shader);
        }
    }
}

impl Default for ShadowmapCamera {
    fn default() -> Self {
        Self {
            settings: ShadowSettings::default(),
            build_shadowmaps: false,
            targets: ShadowTargets::default(),
            lighting_shader: None,
        }
    }
}

/// Releases the target held in `slot`, then allocates its replacement. The slot stays empty
/// when allocation fails.
fn replace_target<B: RenderBackend>(
    backend: &mut B,
    slot: &mut Option<RenderTargetHandle>,
    descriptor: &RenderTargetDescriptor,
) -> Option<RenderTargetHandle> {
    if let Some(previous) = slot.take() {
        backend.release_render_target(previous);
    }

    match backend.create_render_target(descriptor) {
        Ok(target) => {
            *slot = Some(target);
            Some(target)
        }
        Err(err) => {
            log::warn!("skipping '{}': {err}", descriptor.label);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Quat, Vec3};

    use crate::{
        backend::{BackendCommand, RecordingBackend, RenderTargetHandle},
        math::{gpu_projection, PerspectiveProjection, Projection, Transform},
        shadows::globals::{ESM_TEXTURE, SHADOW_MAP_TEXTURE, VSM_TEXTURE},
    };

    use super::*;

    fn light() -> LightCamera {
        LightCamera::new(
            Projection::Perspective(PerspectiveProjection {
                fov: 60.0,
                near: 0.5,
                far: 40.0,
                aspect_ratio: 1.0,
            }),
            Transform::default()
                .with_translation(Vec3::new(2.0, 12.0, -3.0))
                .with_rotation(Quat::from_rotation_x(-1.2)),
        )
    }

    fn backend_with_shaders() -> RecordingBackend {
        let mut backend = RecordingBackend::new();
        let names = crate::shadows::ShaderNames::default();
        backend.register_shader(&names.caster);
        backend.register_shader(&names.moments);
        backend.register_shader(&names.deferred_lighting);
        backend
    }

    fn created(commands: &[BackendCommand]) -> Vec<RenderTargetHandle> {
        commands
            .iter()
            .filter_map(|c| match c {
                BackendCommand::CreateTarget { target, .. } => Some(*target),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn publishes_light_view_projection() {
        let mut camera = ShadowmapCamera::default();
        let mut backend = backend_with_shaders();
        let mut globals = ShaderGlobals::new();
        let mut light = light();

        camera.update(Some(&mut light), &mut backend, &mut globals);

        let expected = gpu_projection(Mat4::perspective_rh_gl(60f32.to_radians(), 1.0, 0.5, 40.0))
            * light.transform.as_matrix().inverse();
        let published = globals.matrix(LIGHT_VIEW_PROJECTION).unwrap();
        assert!(published.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn forces_square_aspect() {
        let mut camera = ShadowmapCamera::default();
        let mut backend = backend_with_shaders();
        let mut globals = ShaderGlobals::new();
        let mut light = LightCamera::new(
            Projection::Perspective(PerspectiveProjection {
                aspect_ratio: 2.0,
                ..Default::default()
            }),
            Transform::default(),
        );

        camera.update(Some(&mut light), &mut backend, &mut globals);

        let Projection::Perspective(p) = &light.projection else { unreachable!() };
        assert_eq!(p.aspect_ratio, 1.0);
    }

    #[test]
    fn publishes_shadow_type_and_bias() {
        let mut backend = backend_with_shaders();
        let mut globals = ShaderGlobals::new();
        let mut light = light();

        for shadow_type in ShadowType::ALL {
            let mut camera = ShadowmapCamera::default();
            camera.set_shadow_type(shadow_type);
            camera.set_esm_normal_bias(0.02);
            camera.update(Some(&mut light), &mut backend, &mut globals);

            assert_eq!(globals.int(SHADOW_TYPE), Some(shadow_type as i32));
            assert_eq!(globals.float(ESM_NORMAL_BIAS), Some(0.02));
        }
    }

    #[test]
    fn normal_bias_is_clamped() {
        let mut camera = ShadowmapCamera::default();
        camera.set_esm_normal_bias(3.0);
        assert_eq!(camera.settings().esm_normal_bias, 0.1);
        camera.set_esm_normal_bias(-3.0);
        assert_eq!(camera.settings().esm_normal_bias, 0.0);
    }

    #[test]
    fn nan_normal_bias_publishes_default() {
        let mut camera = ShadowmapCamera::default();
        let mut backend = backend_with_shaders();
        let mut globals = ShaderGlobals::new();

        camera.set_esm_normal_bias(f32::NAN);
        camera.update(Some(&mut light()), &mut backend, &mut globals);

        assert_eq!(globals.float(ESM_NORMAL_BIAS), Some(ShadowSettings::DEFAULT_ESM_NORMAL_BIAS));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let err = ShadowmapCamera::new(ShadowSettings {
            resolution: 0,
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Resolution { value: 0, .. }));

        let camera = ShadowmapCamera::new(ShadowSettings {
            esm_normal_bias: f32::NAN,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(camera.settings().esm_normal_bias, ShadowSettings::DEFAULT_ESM_NORMAL_BIAS);

        let mut camera = ShadowmapCamera::default();
        assert!(camera.set_resolution(0).is_err());
        assert!(camera.set_resolution(ShadowSettings::MAX_RESOLUTION + 1).is_err());
        assert_eq!(camera.settings().resolution, 2048);
        camera.set_resolution(1024).unwrap();
        assert_eq!(camera.settings().resolution, 1024);
    }

    #[test]
    fn missing_light_is_a_no_op() {
        let mut camera = ShadowmapCamera::default();
        camera.request_rebuild();
        let mut backend = backend_with_shaders();
        let mut globals = ShaderGlobals::new();

        camera.update(None, &mut backend, &mut globals);

        assert!(globals.is_empty());
        assert!(backend.commands().is_empty());
        assert!(camera.build_shadowmaps);
    }

    #[test]
    fn rebuild_renders_then_derives_moments() {
        let mut camera = ShadowmapCamera::default();
        camera.request_rebuild();
        let mut backend = backend_with_shaders();
        let mut globals = ShaderGlobals::new();
        let mut light = light();

        camera.update(Some(&mut light), &mut backend, &mut globals);
        assert!(!camera.build_shadowmaps);

        let caster = backend.find_shader("ESM/ShadowmapCaster").unwrap();
        let moments = backend.find_shader("ESM/E_ShadowmapCaster").unwrap();
        let targets = *camera.targets();
        let (sm, esm, vsm) = (
            targets.shadow_map.unwrap(),
            targets.exponential.unwrap(),
            targets.variance.unwrap(),
        );

        let commands: Vec<_> = backend
            .commands()
            .iter()
            .filter(|c| !matches!(c, BackendCommand::SetShaderMode(..) | BackendCommand::SetCustomShader(..)))
            .cloned()
            .collect();
        assert_eq!(
            commands,
            vec![
                BackendCommand::CreateTarget { target: sm, descriptor: RenderTargetDescriptor::shadow_map(2048) },
                BackendCommand::RenderWithShader {
                    target: sm,
                    shader: caster,
                    view_projection: light.view_projection_matrix(),
                },
                BackendCommand::CreateTarget { target: esm, descriptor: RenderTargetDescriptor::exponential_moments(2048) },
                BackendCommand::Blit { source: sm, destination: esm, shader: moments, pass: EXPONENTIAL_PASS },
                BackendCommand::CreateTarget { target: vsm, descriptor: RenderTargetDescriptor::variance_moments(2048) },
                BackendCommand::Blit { source: sm, destination: vsm, shader: moments, pass: VARIANCE_PASS },
            ]
        );

        assert_eq!(globals.texture(SHADOW_MAP_TEXTURE), Some(sm));
        assert_eq!(globals.texture(ESM_TEXTURE), Some(esm));
        assert_eq!(globals.texture(VSM_TEXTURE), Some(vsm));
    }

    #[test]
    fn second_rebuild_releases_previous_targets_first() {
        let mut camera = ShadowmapCamera::default();
        let mut backend = backend_with_shaders();
        let mut globals = ShaderGlobals::new();
        let mut light = light();

        camera.request_rebuild();
        camera.update(Some(&mut light), &mut backend, &mut globals);
        let first = created(&backend.take_commands());
        assert_eq!(first.len(), 3);

        camera.request_rebuild();
        camera.update(Some(&mut light), &mut backend, &mut globals);
        let commands = backend.take_commands();
        let second = created(&commands);
        assert_eq!(second.len(), 3);

        for (old, new) in first.iter().zip(&second) {
            let released_at = commands
                .iter()
                .position(|c| *c == BackendCommand::ReleaseTarget(*old))
                .expect("previous target should be released");
            let created_at = commands
                .iter()
                .position(|c| matches!(c, BackendCommand::CreateTarget { target, .. } if target == new))
                .unwrap();
            assert!(released_at < created_at);
        }

        // only the latest generation is alive
        let live: Vec<_> = backend.live_targets().map(|(handle, _)| handle).collect();
        assert_eq!(live, second);
        assert_eq!(globals.texture(SHADOW_MAP_TEXTURE), Some(second[0]));
    }

    #[test]
    fn rebuild_without_shaders_still_allocates_targets() {
        let mut camera = ShadowmapCamera::default();
        camera.request_rebuild();
        let mut backend = RecordingBackend::new();
        let mut globals = ShaderGlobals::new();
        let mut light = light();

        camera.update(Some(&mut light), &mut backend, &mut globals);

        assert_eq!(backend.live_targets().count(), 3);
        assert!(backend.commands().iter().all(|c| matches!(c, BackendCommand::CreateTarget { .. })));
        assert!(globals.texture(VSM_TEXTURE).is_some());
    }

    #[test]
    fn uses_configured_resolution() {
        let mut camera = ShadowmapCamera::new(ShadowSettings {
            resolution: 512,
            ..Default::default()
        })
        .unwrap();
        camera.request_rebuild();
        let mut backend = backend_with_shaders();
        let mut globals = ShaderGlobals::new();

        camera.update(Some(&mut light()), &mut backend, &mut globals);

        assert!(backend.live_targets().all(|(_, d)| d.width == 512 && d.height == 512));
    }

    #[test]
    fn targets_too_large_for_the_backend_are_skipped() {
        let mut camera = ShadowmapCamera::new(ShadowSettings {
            resolution: 16384,
            ..Default::default()
        })
        .unwrap();
        camera.request_rebuild();
        let mut backend = backend_with_shaders();
        let mut globals = ShaderGlobals::new();

        camera.update(Some(&mut light()), &mut backend, &mut globals);

        assert_eq!(backend.live_targets().count(), 0);
        assert_eq!(*camera.targets(), ShadowTargets::default());
        assert!(!backend.commands().iter().any(|c| matches!(
            c,
            BackendCommand::CreateTarget { .. } | BackendCommand::RenderWithShader { .. } | BackendCommand::Blit { .. }
        )));
        assert_eq!(globals.texture(SHADOW_MAP_TEXTURE), None);
        // the frame still publishes parameters and installs the lighting shader
        assert!(globals.matrix(LIGHT_VIEW_PROJECTION).is_some());
        assert!(backend.custom_shader(BuiltinShader::DeferredShading).is_some());
    }

    #[test]
    fn failed_rebuild_unbinds_released_targets() {
        let mut camera = ShadowmapCamera::new(ShadowSettings {
            resolution: 1024,
            ..Default::default()
        })
        .unwrap();
        let mut backend = backend_with_shaders().with_max_texture_dimension(1024);
        let mut globals = ShaderGlobals::new();
        let mut light = light();

        camera.request_rebuild();
        camera.update(Some(&mut light), &mut backend, &mut globals);
        assert_eq!(backend.live_targets().count(), 3);

        camera.set_resolution(2048).unwrap();
        camera.request_rebuild();
        camera.update(Some(&mut light), &mut backend, &mut globals);

        assert_eq!(backend.live_targets().count(), 0);
        assert_eq!(globals.texture(SHADOW_MAP_TEXTURE), None);
        assert_eq!(globals.texture(ESM_TEXTURE), None);
        assert_eq!(globals.texture(VSM_TEXTURE), None);
    }

    #[test]
    fn lighting_shader_is_installed_once() {
        let mut camera = ShadowmapCamera::default();
        let mut backend = backend_with_shaders();
        let mut globals = ShaderGlobals::new();
        let mut light = light();

        for _ in 0..3 {
            camera.update(Some(&mut light), &mut backend, &mut globals);
        }

        let lighting = backend.find_shader("ESM/DeferredShading").unwrap();
        let installs: Vec<_> = backend
            .commands()
            .iter()
            .filter(|c| matches!(c, BackendCommand::SetShaderMode(..) | BackendCommand::SetCustomShader(..)))
            .cloned()
            .collect();
        assert_eq!(
            installs,
            vec![
                BackendCommand::SetShaderMode(BuiltinShader::DeferredShading, BuiltinShaderMode::UseCustom),
                BackendCommand::SetCustomShader(BuiltinShader::DeferredShading, lighting),
            ]
        );
        assert_eq!(backend.custom_shader(BuiltinShader::DeferredShading), Some(lighting));
    }

    #[test]
    fn lighting_shader_reinstalled_when_replaced() {
        let mut camera = ShadowmapCamera::default();
        let mut backend = backend_with_shaders();
        let mut globals = ShaderGlobals::new();
        let mut light = light();
        let other = backend.register_shader("Other/Deferred");

        camera.update(Some(&mut light), &mut backend, &mut globals);
        backend.set_custom_shader(BuiltinShader::DeferredShading, other);
        camera.update(Some(&mut light), &mut backend, &mut globals);

        let lighting = backend.find_shader("ESM/DeferredShading").unwrap();
        assert_eq!(backend.custom_shader(BuiltinShader::DeferredShading), Some(lighting));
    }

    #[test]
    fn missing_lighting_shader_leaves_slot_unset() {
        let mut camera = ShadowmapCamera::default();
        let mut backend = RecordingBackend::new();
        let mut globals = ShaderGlobals::new();
        let mut light = light();

        camera.update(Some(&mut light), &mut backend, &mut globals);
        camera.update(Some(&mut light), &mut backend, &mut globals);

        assert_eq!(backend.custom_shader(BuiltinShader::DeferredShading), None);
        assert_eq!(backend.shader_mode(BuiltinShader::DeferredShading), BuiltinShaderMode::UseBuiltin);
        assert!(backend.commands().is_empty());
    }

    #[test]
    fn lighting_shader_resolved_once_registered() {
        let mut camera = ShadowmapCamera::default();
        let mut backend = RecordingBackend::new();
        let mut globals = ShaderGlobals::new();
        let mut light = light();

        camera.update(Some(&mut light), &mut backend, &mut globals);
        let lighting = backend.register_shader("ESM/DeferredShading");
        camera.update(Some(&mut light), &mut backend, &mut globals);

        assert_eq!(backend.custom_shader(BuiltinShader::DeferredShading), Some(lighting));
    }

    #[test]
    fn release_frees_targets_and_bindings() {
        let mut camera = ShadowmapCamera::default();
        camera.request_rebuild();
        let mut backend = backend_with_shaders();
        let mut globals = ShaderGlobals::new();

        camera.update(Some(&mut light()), &mut backend, &mut globals);
        camera.release(&mut backend, &mut globals);

        assert_eq!(backend.live_targets().count(), 0);
        assert_eq!(globals.texture(SHADOW_MAP_TEXTURE), None);
        assert_eq!(globals.texture(ESM_TEXTURE), None);
        assert_eq!(globals.texture(VSM_TEXTURE), None);
        assert_eq!(*camera.targets(), ShadowTargets::default());
    }
}
