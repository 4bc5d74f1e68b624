//! Demonstration WGSL shaders matching the layouts [WgpuBackend](crate::backend::WgpuBackend)
//! binds.

/// Caster override shader. `vs_main`/`fs_main`, light view-projection at group 0, model at group 1.
pub const SHADOW_CASTER: &str = include_str!("shadow_caster.wgsl");

/// Moments shader. `vs_fullscreen`, `fs_pass0` writes exp(c * d), `fs_pass1` writes (d, d^2).
pub const SHADOW_MOMENTS: &str = include_str!("shadow_moments.wgsl");

/// Debug deferred lighting shader reading the bind group from
/// [WgpuBackend::shadow_bind_group](crate::backend::WgpuBackend::shadow_bind_group).
pub const DEFERRED_SHADING: &str = include_str!("deferred_shading.wgsl");

#[cfg(test)]
mod tests {
    use naga::{
        front::wgsl as wgsl_in,
        valid::{Capabilities, ValidationFlags, Validator},
        Module, ShaderStage,
    };

    use crate::{
        backend::gpu::BlitPass,
        shadows::{EXPONENTIAL_PASS, VARIANCE_PASS},
    };

    use super::*;

    fn validated(source: &str) -> Module {
        let module = wgsl_in::parse_str(source).unwrap_or_else(|err| panic!("{}", err.emit_to_string(source)));
        Validator::new(ValidationFlags::all(), Capabilities::all())
            .validate(&module)
            .unwrap();
        module
    }

    fn entry_points(module: &Module) -> Vec<(&str, ShaderStage)> {
        module
            .entry_points
            .iter()
            .map(|entry| (entry.name.as_str(), entry.stage))
            .collect()
    }

    fn bindings(module: &Module) -> Vec<(u32, u32)> {
        let mut bindings: Vec<_> = module
            .global_variables
            .iter()
            .filter_map(|(_, global)| global.binding.as_ref())
            .map(|binding| (binding.group, binding.binding))
            .collect();
        bindings.sort();
        bindings
    }

    #[test]
    fn caster_matches_caster_pass() {
        let module = validated(SHADOW_CASTER);

        let entries = entry_points(&module);
        assert!(entries.contains(&("vs_main", ShaderStage::Vertex)));
        assert!(entries.contains(&("fs_main", ShaderStage::Fragment)));
        assert_eq!(bindings(&module), vec![(0, 0), (1, 0)]);
    }

    #[test]
    fn moments_has_a_fragment_entry_per_pass() {
        let module = validated(SHADOW_MOMENTS);

        let entries = entry_points(&module);
        assert!(entries.contains(&("vs_fullscreen", ShaderStage::Vertex)));
        for pass in [EXPONENTIAL_PASS, VARIANCE_PASS] {
            let name = BlitPass::entry_point(pass);
            assert!(
                entries.contains(&(name.as_str(), ShaderStage::Fragment)),
                "missing {name}"
            );
        }
        assert_eq!(bindings(&module), vec![(0, 0), (0, 1)]);
    }

    #[test]
    fn deferred_shading_reads_the_shadow_bind_group() {
        let module = validated(DEFERRED_SHADING);

        let entries = entry_points(&module);
        assert!(entries.contains(&("vs_fullscreen", ShaderStage::Vertex)));
        assert!(entries.contains(&("fs_main", ShaderStage::Fragment)));
        // uniforms, then a texture and sampler for each of smTex, esmTex, vsmTex
        let expected: Vec<_> = (0..7).map(|binding| (0, binding)).collect();
        assert_eq!(bindings(&module), expected);
    }
}
