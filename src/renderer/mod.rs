//! Frame building
//!
//! Flattens the world into plain `Pod` instance buffers that any 2D
//! backend can upload directly. Traces are drawn first, then bonds,
//! then particles on top.

pub mod shapes;
pub mod vertex;

pub use vertex::{LineVertex, ParticleInstance, colors, parse_hex_color};

use crate::sim::World;

/// Everything needed to draw one frame
#[derive(Debug, Clone, Default)]
pub struct FrameData {
    pub clear_color: [f32; 4],
    pub traces: Vec<ParticleInstance>,
    pub bonds: Vec<LineVertex>,
    pub particles: Vec<ParticleInstance>,
    pub overlay: Vec<LineVertex>,
}

impl FrameData {
    pub fn build(world: &World) -> Self {
        Self {
            clear_color: colors::BACKGROUND,
            traces: shapes::trace_instances(&world.traces),
            bonds: shapes::bond_lines(&world.structures, &world.particles),
            particles: shapes::particle_instances(&world.particles),
            overlay: shapes::entropy_bar(
                world.entropy,
                world.settings.width,
                world.settings.height,
            )
            .to_vec(),
        }
    }

    /// Raw bytes of the particle instances, ready for a vertex buffer
    pub fn particle_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.particles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn test_frame_matches_world() {
        let mut world = World::with_seed(7);
        world.initialize(25, &[]);
        world.create_structure_from_line(Vec2::new(100.0, 100.0), Vec2::new(150.0, 100.0), None);
        world.capture_trace_checkpoint();
        let frame = FrameData::build(&world);
        assert_eq!(frame.particles.len(), world.particles.len());
        assert_eq!(frame.traces.len(), world.traces.len());
        assert_eq!(frame.bonds.len(), world.structures[0].bonds.len() * 2);
        assert_eq!(
            frame.particle_bytes().len(),
            frame.particles.len() * std::mem::size_of::<ParticleInstance>()
        );
    }
}
