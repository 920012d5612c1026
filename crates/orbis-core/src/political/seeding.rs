//! Score-ranked farthest-point seeding, shared by capitals, county seeds
//! and province seeds.

/// Pick up to `target` seeds from `entities`.
///
/// Entities are ranked by score descending (ties: lower id). A first pass
/// accepts each entity whose distance to all previously accepted seeds is
/// at least `min_spacing`; if fewer than `target` survive, a second pass
/// tops up in rank order ignoring spacing.
pub fn farthest_point_seeds(
    entities: &[u32],
    position: impl Fn(u32) -> (f64, f64),
    score: impl Fn(u32) -> f64,
    target: usize,
    min_spacing: f64,
) -> Vec<u32> {
    if target == 0 || entities.is_empty() {
        return Vec::new();
    }
    let mut ranked: Vec<u32> = entities.to_vec();
    ranked.sort_unstable_by(|&a, &b| score(b).total_cmp(&score(a)).then(a.cmp(&b)));

    let spacing_sq = min_spacing * min_spacing;
    let mut seeds: Vec<u32> = Vec::with_capacity(target);
    for &e in &ranked {
        if seeds.len() >= target {
            break;
        }
        let (ex, ey) = position(e);
        let spaced = seeds.iter().all(|&s| {
            let (sx, sy) = position(s);
            (ex - sx).powi(2) + (ey - sy).powi(2) >= spacing_sq
        });
        if spaced {
            seeds.push(e);
        }
    }
    if seeds.len() < target {
        for &e in &ranked {
            if seeds.len() >= target {
                break;
            }
            if !seeds.contains(&e) {
                seeds.push(e);
            }
        }
    }
    seeds
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Entities on a line at x = id, all scored by id (highest first).
    fn line_position(e: u32) -> (f64, f64) {
        (e as f64, 0.0)
    }

    #[test]
    fn respects_spacing_in_first_pass() {
        let entities: Vec<u32> = (0..10).collect();
        let seeds = farthest_point_seeds(&entities, line_position, |e| e as f64, 3, 4.0);
        assert_eq!(seeds.len(), 3);
        // Rank order: 9, 8, 7, ... 8 and 7 are too close to 9; 5 is the
        // first spaced candidate, then 1.
        assert_eq!(seeds, vec![9, 5, 1]);
    }

    #[test]
    fn tops_up_when_spacing_starves_the_target() {
        let entities: Vec<u32> = (0..4).collect();
        let seeds = farthest_point_seeds(&entities, line_position, |e| e as f64, 4, 100.0);
        assert_eq!(seeds.len(), 4, "top-up must reach the target");
        assert_eq!(seeds[0], 3, "best-scored entity leads");
    }

    #[test]
    fn equal_scores_break_ties_on_lower_id() {
        let entities: Vec<u32> = vec![5, 2, 9];
        let seeds = farthest_point_seeds(&entities, line_position, |_| 1.0, 1, 0.0);
        assert_eq!(seeds, vec![2]);
    }

    #[test]
    fn never_returns_more_than_target() {
        let entities: Vec<u32> = (0..100).collect();
        let seeds = farthest_point_seeds(&entities, line_position, |e| e as f64, 7, 0.5);
        assert_eq!(seeds.len(), 7);
    }
}
