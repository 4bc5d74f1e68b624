//! Shadow map generation for a single light.
//!
//! - **Camera**: [ShadowmapCamera], the per-frame component
//! - **Globals**: named parameters published for the deferred lighting shader
//! - **Settings**: serde configuration
//! - **Targets**: render target descriptors and the handles the camera owns

mod camera;
pub mod globals;
mod settings;
mod shadow_type;
mod targets;

pub use camera::{ShadowmapCamera, EXPONENTIAL_PASS, VARIANCE_PASS};
pub use globals::{GlobalValue, ShaderGlobals, ShadowUniforms};
pub use settings::{ShaderNames, ShadowSettings};
pub use shadow_type::ShadowType;
pub use targets::{RenderTargetDescriptor, ShadowTargets};
