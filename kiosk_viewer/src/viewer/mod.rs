mod mesh;
mod overlays;
mod panel;
mod particles;
mod shaders;
mod state;

pub use panel::PanelSurface;
pub use particles::ParticleField;
pub use state::ViewerState;
