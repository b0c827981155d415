//! Instance generation for particles, traces and bonds

use super::vertex::{LineVertex, ParticleInstance, color_or_fallback, colors};
use crate::sim::{ParticleStore, Structure, TraceMemory};

/// Glowing discs for live particles: radius swells with energy, alpha follows it
pub fn particle_instances(particles: &ParticleStore) -> Vec<ParticleInstance> {
    particles
        .iter()
        .map(|p| {
            let alpha = (p.energy * 0.8).min(1.0);
            ParticleInstance::new(
                p.pos.x,
                p.pos.y,
                p.radius * p.energy,
                color_or_fallback(p.display_color(), alpha),
            )
        })
        .collect()
}

/// Faint single-pixel discs for trace memory
pub fn trace_instances(traces: &TraceMemory) -> Vec<ParticleInstance> {
    traces
        .iter()
        .map(|t| ParticleInstance::new(t.pos.x, t.pos.y, 1.0, color_or_fallback(&t.color, t.alpha)))
        .collect()
}

/// Line segments for every bond whose endpoints are still alive.
/// Bonds fade out as the structure loses integrity.
pub fn bond_lines(structures: &[Structure], particles: &ParticleStore) -> Vec<LineVertex> {
    let mut vertices = Vec::new();
    for structure in structures {
        let color = color_or_fallback(&structure.color, structure.integrity * 0.6);
        for bond in &structure.bonds {
            let ends = structure
                .members
                .get(bond.a)
                .zip(structure.members.get(bond.b))
                .and_then(|(&a, &b)| particles.get(a).zip(particles.get(b)));
            if let Some((a, b)) = ends {
                vertices.push(LineVertex::new(a.pos.x, a.pos.y, color));
                vertices.push(LineVertex::new(b.pos.x, b.pos.y, color));
            }
        }
    }
    vertices
}

/// Thin bar along the bottom edge whose length tracks entropy
pub fn entropy_bar(entropy: f32, width: f32, height: f32) -> [LineVertex; 2] {
    let y = height - 2.0;
    [
        LineVertex::new(0.0, y, colors::ENTROPY_BAR),
        LineVertex::new(width * entropy.clamp(0.0, 1.0), y, colors::ENTROPY_BAR),
    ]
}
