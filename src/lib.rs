pub mod backend;
pub mod error;
pub mod math;
pub mod shaders;
pub mod shadows;

pub mod prelude;

pub use glam;
pub use wgpu;
