use glam::Vec3;
use log::{Level, debug, log_enabled};
use std::time::Instant;

use super::{
    Aabb, BvhNode, BvhRegionIterator, BvhStats,
    build::{build, build_parallel},
};
use crate::error::BvhError;

/// Owning handle to a hierarchy built over one snapshot of positions.
///
/// The tree stores indices only. Queries re-read the live coordinates, so
/// positions that drift after the build change query results but not the
/// shape of the tree.
#[derive(Debug)]
pub struct Bvh {
    root: BvhNode,
    // Length of the snapshot the tree was built from. Every stored index is below it.
    point_count: usize,
}

impl Bvh {
    pub fn build(positions: &[Vec3]) -> Self {
        let start_build = Instant::now();
        let tree = Self {
            root: build(positions),
            point_count: positions.len(),
        };
        tree.log_build("sequential", start_build);
        tree
    }

    /// Same tree as [`Bvh::build`], built on the rayon thread pool.
    pub fn build_parallel(positions: &[Vec3]) -> Self {
        let start_build = Instant::now();
        let tree = Self {
            root: build_parallel(positions),
            point_count: positions.len(),
        };
        tree.log_build("parallel", start_build);
        tree
    }

    fn log_build(&self, mode: &str, start_build: Instant) {
        if !log_enabled!(Level::Debug) {
            return;
        }
        let stats = self.root.stats();
        debug!(
            "BVH ({mode}): {} points, {} nodes, {} leaves, depth {} in {:.3}ms",
            self.point_count,
            stats.node_count,
            stats.leaf_count,
            stats.max_depth,
            start_build.elapsed().as_secs_f32() * 1000.0
        );
    }

    pub fn root(&self) -> &BvhNode {
        &self.root
    }

    pub fn point_count(&self) -> usize {
        self.point_count
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn stats(&self) -> BvhStats {
        self.root.stats()
    }

    fn check_positions(&self, positions: &[Vec3]) -> Result<(), BvhError> {
        if positions.len() < self.point_count {
            return Err(BvhError::PositionsTooShort {
                expected: self.point_count,
                actual: positions.len(),
            });
        }
        Ok(())
    }

    /// Returns every index whose point lies inside `region`, except `exclude`.
    ///
    /// Order is the left-to-right leaf order of the tree. `exclude` may be any
    /// value; one that is not in the tree simply never matches.
    pub fn query(
        &self,
        positions: &[Vec3],
        region: &Aabb,
        exclude: usize,
    ) -> Result<Vec<usize>, BvhError> {
        let mut result = Vec::new();
        self.query_into(positions, region, exclude, &mut result)?;
        Ok(result)
    }

    /// Appends matches to `result` without clearing it first.
    pub fn query_into(
        &self,
        positions: &[Vec3],
        region: &Aabb,
        exclude: usize,
        result: &mut Vec<usize>,
    ) -> Result<(), BvhError> {
        self.check_positions(positions)?;
        self.root.query_into(positions, region, exclude, result)
    }

    /// Returns every index whose point is within `radius` of `center`, except `exclude`.
    ///
    /// This is the neighbourhood lookup flocking agents use. Same order as
    /// [`Bvh::query`]; a negative or NaN radius matches nothing.
    pub fn query_sphere(
        &self,
        positions: &[Vec3],
        center: Vec3,
        radius: f32,
        exclude: usize,
    ) -> Result<Vec<usize>, BvhError> {
        let mut result = Vec::new();
        self.query_sphere_into(positions, center, radius, exclude, &mut result)?;
        Ok(result)
    }

    pub fn query_sphere_into(
        &self,
        positions: &[Vec3],
        center: Vec3,
        radius: f32,
        exclude: usize,
        result: &mut Vec<usize>,
    ) -> Result<(), BvhError> {
        self.check_positions(positions)?;
        self.root
            .query_sphere_into(positions, center, radius, exclude, result)
    }

    pub fn iter_region<'a>(
        &'a self,
        positions: &'a [Vec3],
        region: Aabb,
        exclude: usize,
    ) -> Result<BvhRegionIterator<'a>, BvhError> {
        self.check_positions(positions)?;
        Ok(BvhRegionIterator::new(&self.root, positions, region, exclude))
    }

    /// Eagerly releases every node. The handle stays usable and behaves like a
    /// tree built from no points.
    pub fn clear(&mut self) {
        self.root.clear();
        self.point_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use glam::Vec3;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use crate::{
        bench::{brute_force_query, brute_force_query_sphere},
        bvh::{Aabb, Axis, Bvh, BvhNode, LEAF_SIZE, build::bounding_box},
        error::BvhError,
    };

    fn random_points(rng: &mut StdRng, count: usize, extent: f32) -> Vec<Vec3> {
        (0..count)
            .map(|_| {
                Vec3::new(
                    rng.gen_range(-extent..extent),
                    rng.gen_range(-extent..extent),
                    rng.gen_range(-extent..extent),
                )
            })
            .collect()
    }

    fn random_region(rng: &mut StdRng, extent: f32) -> Aabb {
        let center = Vec3::new(
            rng.gen_range(-extent..extent),
            rng.gen_range(-extent..extent),
            rng.gen_range(-extent..extent),
        );
        let half = Vec3::new(
            rng.gen_range(0.0..extent / 2.0),
            rng.gen_range(0.0..extent / 2.0),
            rng.gen_range(0.0..extent / 2.0),
        );
        Aabb::from_center_half_extents(center, half)
    }

    // Point sets with plenty of duplicates, shared planes and the odd outlier
    fn awkward_point_sets() -> Vec<Vec<Vec3>> {
        let mut rng = StdRng::seed_from_u64(7);
        let mut grid = vec![];
        for x in 0..4 {
            for y in 0..4 {
                for z in 0..4 {
                    grid.push(Vec3::new(x as f32, y as f32, z as f32));
                }
            }
        }
        let mut clumped = vec![Vec3::ZERO; 40];
        clumped.push(Vec3::new(1000.0, 0.0, 0.0));
        let plane: Vec<Vec3> = (0..50)
            .map(|_| Vec3::new(rng.gen_range(-5.0..5.0), 2.0, rng.gen_range(-5.0..5.0)))
            .collect();
        vec![grid, clumped, plane, random_points(&mut rng, 500, 100.0)]
    }

    fn collect_indices(node: &BvhNode) -> Vec<usize> {
        let mut indices = vec![];
        node.for_each_leaf(|leaf| indices.extend_from_slice(leaf));
        indices
    }

    // Walks every internal node and checks the structural invariants against `positions`
    fn check_invariants(node: &BvhNode, positions: &[Vec3]) {
        if let BvhNode::Internal {
            bounds,
            left,
            right,
        } = node
        {
            let subtree = collect_indices(node);
            assert!(subtree.len() > LEAF_SIZE, "Internal node over only {} indices", subtree.len());
            assert_eq!(*bounds, bounding_box(positions, &subtree), "Bounds are not tight");
            assert!(!left.is_empty(), "Left child is empty");
            assert!(!right.is_empty(), "Right child is empty");
            check_invariants(left, positions);
            check_invariants(right, positions);
        } else {
            let indices = node.indices().unwrap();
            assert!(indices.len() <= LEAF_SIZE);
        }
    }

    #[test]
    fn test_partition_completeness() {
        let mut rng = StdRng::seed_from_u64(1);
        for count in [0, 1, 5, 6, 7, 13, 100, 1000] {
            let positions = random_points(&mut rng, count, 10.0);
            let tree = Bvh::build(&positions);
            let mut indices = collect_indices(tree.root());
            assert_eq!(indices.len(), count, "Index duplicated or lost for {count} points");
            indices.sort_unstable();
            assert_eq!(indices, (0..count).collect::<Vec<usize>>());
        }
        for positions in awkward_point_sets() {
            let tree = Bvh::build(&positions);
            let mut indices = collect_indices(tree.root());
            indices.sort_unstable();
            assert_eq!(indices, (0..positions.len()).collect::<Vec<usize>>());
        }
    }

    #[test]
    fn test_structural_invariants() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut sets = awkward_point_sets();
        sets.push(random_points(&mut rng, 2000, 1.0));
        for positions in sets {
            let tree = Bvh::build(&positions);
            check_invariants(tree.root(), &positions);
            assert!(tree.stats().max_leaf_size <= LEAF_SIZE);
        }
    }

    #[test]
    fn test_query_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let count = rng.gen_range(0..600);
            let positions = random_points(&mut rng, count, 50.0);
            let tree = Bvh::build(&positions);
            for _ in 0..25 {
                let region = random_region(&mut rng, 50.0);
                let exclude = rng.gen_range(0..count + 3);
                let result = tree.query(&positions, &region, exclude).unwrap();
                let expected = brute_force_query(&positions, &region, exclude);

                let result_set: HashSet<usize> = result.iter().copied().collect();
                assert_eq!(result_set.len(), result.len(), "Query returned duplicates");
                assert_eq!(result_set, expected.into_iter().collect::<HashSet<usize>>());
            }
        }
    }

    #[test]
    fn test_query_awkward_sets_match_brute_force() {
        let mut rng = StdRng::seed_from_u64(4);
        for positions in awkward_point_sets() {
            let tree = Bvh::build(&positions);
            for _ in 0..50 {
                let exclude = rng.gen_range(0..positions.len());
                let region =
                    Aabb::from_center_half_extents(positions[exclude], Vec3::splat(rng.gen_range(0.0..3.0)));
                let mut result = tree.query(&positions, &region, exclude).unwrap();
                let mut expected = brute_force_query(&positions, &region, exclude);
                result.sort_unstable();
                expected.sort_unstable();
                assert_eq!(result, expected);
            }
        }
    }

    #[test]
    fn test_sphere_query_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(10);
        let mut sets = awkward_point_sets();
        for _ in 0..10 {
            let count = rng.gen_range(0..600);
            sets.push(random_points(&mut rng, count, 50.0));
        }
        for positions in sets {
            let tree = Bvh::build(&positions);
            for _ in 0..25 {
                let exclude = rng.gen_range(0..positions.len() + 3);
                // Centre on an existing point most of the time, like a flocking agent
                let center = match positions.get(exclude) {
                    Some(p) => *p,
                    None => Vec3::new(rng.gen_range(-50.0..50.0), 0.0, rng.gen_range(-50.0..50.0)),
                };
                let radius = rng.gen_range(0.0..20.0);
                let result = tree.query_sphere(&positions, center, radius, exclude).unwrap();
                let expected = brute_force_query_sphere(&positions, center, radius, exclude);

                let result_set: HashSet<usize> = result.iter().copied().collect();
                assert_eq!(result_set.len(), result.len(), "Sphere query returned duplicates");
                assert_eq!(result_set, expected.into_iter().collect::<HashSet<usize>>());
            }
        }
    }

    #[test]
    fn test_sphere_query_on_line() {
        let positions: Vec<Vec3> = (0..6).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
        let tree = Bvh::build(&positions);
        // Boundary points at distance exactly 2 are included
        assert_eq!(tree.query_sphere(&positions, positions[2], 2.0, 2).unwrap(), vec![0, 1, 3, 4]);
        assert!(tree.query_sphere(&positions[..3], Vec3::ZERO, 1.0, 0).is_err());
    }

    #[test]
    fn test_iter_region_matches_query_order() {
        let mut rng = StdRng::seed_from_u64(5);
        let positions = random_points(&mut rng, 800, 20.0);
        let tree = Bvh::build(&positions);
        for i in 0..40 {
            let region = random_region(&mut rng, 20.0);
            let from_query = tree.query(&positions, &region, i).unwrap();
            let from_iter: Vec<usize> = tree.iter_region(&positions, region, i).unwrap().collect();
            assert_eq!(from_query, from_iter);
        }
    }

    #[test]
    fn test_query_into_appends() {
        let positions = vec![Vec3::ZERO, Vec3::ONE];
        let tree = Bvh::build(&positions);
        let region = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let mut buffer = vec![42];
        tree.query_into(&positions, &region, usize::MAX, &mut buffer)
            .unwrap();
        assert_eq!(buffer, vec![42, 0, 1]);
    }

    #[test]
    fn test_determinism() {
        let mut rng = StdRng::seed_from_u64(6);
        let positions = random_points(&mut rng, 3000, 100.0);
        let a = Bvh::build(&positions);
        let b = Bvh::build(&positions);
        assert_eq!(a.root(), b.root());
    }

    #[test]
    fn test_parallel_build_is_identical() {
        let mut rng = StdRng::seed_from_u64(8);
        for count in [0, 3, 900, 5000, 20_000] {
            let positions = random_points(&mut rng, count, 100.0);
            let sequential = Bvh::build(&positions);
            let parallel = Bvh::build_parallel(&positions);
            assert_eq!(sequential.root(), parallel.root(), "Trees differ for {count} points");
            assert_eq!(sequential.point_count(), parallel.point_count());
        }
        let coincident = vec![Vec3::splat(-4.0); 1500];
        assert_eq!(
            Bvh::build(&coincident).root(),
            Bvh::build_parallel(&coincident).root()
        );
    }

    #[test]
    fn test_example_six_points_on_a_line() {
        let positions: Vec<Vec3> = (0..6).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
        let tree = Bvh::build(&positions);
        let root_bounds = tree.root().bounds().unwrap();
        assert_eq!(Axis::largest_extent(root_bounds), Axis::X);
        let (left, right) = tree.root().children().unwrap();
        assert_eq!(left.indices().unwrap(), &[0, 1, 2]);
        assert_eq!(right.indices().unwrap(), &[3, 4, 5]);

        let region = Aabb::new(Vec3::new(1.0, -1.0, -1.0), Vec3::new(4.0, 1.0, 1.0));
        let result = tree.query(&positions, &region, 2).unwrap();
        assert_eq!(result, vec![1, 3, 4]);
    }

    #[test]
    fn test_example_five_identical_points() {
        let positions = vec![Vec3::ZERO; 5];
        let tree = Bvh::build(&positions);
        assert_eq!(tree.root().indices().unwrap(), &[0, 1, 2, 3, 4]);

        let region = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(0.1));
        let result = tree.query(&positions, &region, 3).unwrap();
        assert_eq!(result, vec![0, 1, 2, 4]);
    }

    #[test]
    fn test_empty_build_yields_empty_leaf_root() {
        let tree = Bvh::build(&[]);
        assert!(tree.is_empty());
        assert_eq!(tree.point_count(), 0);
        let region = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(100.0));
        assert!(tree.query(&[], &region, 0).unwrap().is_empty());
        assert_eq!(tree.iter_region(&[], region, 0).unwrap().count(), 0);
    }

    #[test]
    fn test_query_with_drifted_positions() {
        let mut positions: Vec<Vec3> = (0..6).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
        let tree = Bvh::build(&positions);
        let region = Aabb::new(Vec3::new(-0.5, -0.5, -0.5), Vec3::new(0.5, 0.5, 0.5));
        assert_eq!(tree.query(&positions, &region, usize::MAX).unwrap(), vec![0]);

        // Index 1 drifts into the region without a rebuild
        positions[1] = Vec3::new(0.25, 0.0, 0.0);
        assert_eq!(tree.query(&positions, &region, usize::MAX).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_query_positions_too_short() {
        let positions: Vec<Vec3> = (0..10).map(|i| Vec3::splat(i as f32)).collect();
        let tree = Bvh::build(&positions);
        let region = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE);
        let err = tree.query(&positions[..4], &region, 0).unwrap_err();
        assert_eq!(
            err,
            BvhError::PositionsTooShort {
                expected: 10,
                actual: 4
            }
        );
        assert!(tree.iter_region(&positions[..4], region, 0).is_err());
    }

    #[test]
    fn test_clear_twice() {
        let mut rng = StdRng::seed_from_u64(9);
        let positions = random_points(&mut rng, 300, 10.0);
        let mut tree = Bvh::build(&positions);
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.stats().node_count, 1);
        tree.clear();
        assert!(tree.is_empty());

        let region = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(100.0));
        assert!(tree.query(&positions, &region, 0).unwrap().is_empty());
    }

    #[test]
    fn test_drop_coincident_tree() {
        // Coincident points produce a chain one index shorter per level
        let positions = vec![Vec3::ONE; 2_000];
        let tree = Bvh::build_parallel(&positions);
        let stats = tree.stats();
        assert_eq!(stats.index_count, 2_000);
        assert_eq!(stats.max_depth, 2_000 - 5);
        drop(tree);
    }
}
