//! Draw ordering for fixed-angle entities.

use tessera_common::WorldPos;

use crate::entity::PlacedEntity;

/// Maps world positions to screen positions for the current camera.
pub trait ScreenProjector {
    /// Projects a world position, with `reference_angle` the camera
    /// rotation in radians that fixed-angle sprites are drawn against.
    fn world_to_screen(&self, pos: WorldPos, reference_angle: f32) -> (f32, f32);
}

/// Orders fixed-angle entities back to front by projected screen Y.
///
/// Entities without a fixed angle are ignored. Entities whose position or
/// projection is not finite are dropped. Equal screen Y keeps input order.
pub fn sort_fixed_angle<'e, P>(
    entities: impl IntoIterator<Item = &'e PlacedEntity>,
    projector: &P,
    reference_angle: f32,
) -> Vec<&'e PlacedEntity>
where
    P: ScreenProjector + ?Sized,
{
    let mut keyed: Vec<(f32, &PlacedEntity)> = entities
        .into_iter()
        .filter(|entity| entity.is_fixed_angle() && entity.world_pos.is_finite())
        .filter_map(|entity| {
            let (sx, sy) = projector.world_to_screen(entity.world_pos, reference_angle);
            (sx.is_finite() && sy.is_finite()).then_some((sy, entity))
        })
        .collect();

    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    keyed.into_iter().map(|(_, entity)| entity).collect()
}
