use glam::{DVec2, DVec3};

/// Distance between two positions on the horizontal plane. The vertical (z)
/// axis is ignored.
pub fn planar_distance(a: DVec3, b: DVec3) -> f64 {
    DVec2::new(a.x, a.y).distance(DVec2::new(b.x, b.y))
}

/// Returns the index of the respawn site closest to `from` on the horizontal
/// plane, or `None` if there are no sites.
///
/// A later site replaces the best one so far when its distance is less than
/// **or equal to** the best distance. Among exactly tied sites the one with
/// the highest index wins.
pub fn nearest_respawn_site(from: DVec3, sites: &[DVec3]) -> Option<usize> {
    let (first, rest) = sites.split_first()?;

    let mut best = 0;
    let mut best_dist = planar_distance(from, *first);

    for (i, site) in rest.iter().enumerate() {
        let dist = planar_distance(from, *site);

        if dist > best_dist {
            continue;
        }

        best = i + 1;
        best_dist = dist;
    }

    Some(best)
}
