use std::collections::HashMap;

use capsule_physics::collision::{BruteForceIndex, IndexConfig, Indexable, KdTree, SpatialIndex, AABB};
use capsule_physics::collision::broadphase::TreeSnapshot;
use capsule_physics::math::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Copy)]
struct Probe {
    key: u32,
    rect: AABB,
    velocity: Vec2,
}

impl Indexable for Probe {
    type Key = u32;

    fn key(&self) -> u32 {
        self.key
    }

    fn fit_rect(&self) -> AABB {
        self.rect
    }

    fn velocity(&self) -> Vec2 {
        self.velocity
    }
}

fn random_rect(rng: &mut StdRng, extent: f64) -> AABB {
    let min = Vec2::new(rng.gen_range(-extent..extent), rng.gen_range(-extent..extent));
    let size = Vec2::new(rng.gen_range(0.5..40.0), rng.gen_range(0.5..40.0));
    AABB::new(min, min + size)
}

fn sorted_hits<I: SpatialIndex<u32>>(index: &I, rect: &AABB) -> Vec<u32> {
    let mut hits = Vec::new();
    index.traverse_overlapping(rect, &mut |k| hits.push(k)).unwrap();
    hits.sort_unstable();
    hits
}

fn sorted_keys<I: SpatialIndex<u32>>(index: &I) -> Vec<u32> {
    let mut keys = index.keys().unwrap();
    keys.sort_unstable();
    keys
}

fn run_random_sequence(seed: u64, config: IndexConfig, operations: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut tree = KdTree::new(config);
    let mut oracle = BruteForceIndex::new(config);
    let mut live: HashMap<u32, Probe> = HashMap::new();

    for step in 0..operations {
        let key = rng.gen_range(0..60u32);
        match rng.gen_range(0..10) {
            // Small moves, mostly absorbed by the fat rectangle.
            0..=4 => {
                let probe = match live.get(&key) {
                    Some(p) => {
                        let nudge = Vec2::new(rng.gen_range(-3.0..3.0), rng.gen_range(-3.0..3.0));
                        Probe { rect: p.rect.translate(nudge), velocity: nudge * 10.0, ..*p }
                    }
                    None => Probe { key, rect: random_rect(&mut rng, 500.0), velocity: Vec2::ZERO },
                };
                assert_eq!(tree.add_or_update(&probe).unwrap(), oracle.add_or_update(&probe).unwrap());
                live.insert(key, probe);
            }
            // Teleports.
            5..=7 => {
                let velocity = Vec2::new(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0));
                let probe = Probe { key, rect: random_rect(&mut rng, 500.0), velocity };
                assert_eq!(tree.add_or_update(&probe).unwrap(), oracle.add_or_update(&probe).unwrap());
                live.insert(key, probe);
            }
            _ => {
                assert_eq!(tree.remove(key).unwrap(), oracle.remove(key).unwrap());
                live.remove(&key);
            }
        }

        if let Err(err) = tree.validate() {
            panic!("seed {} step {}: {}", seed, step, err);
        }
        assert_eq!(tree.len(), live.len());
        assert_eq!(tree.contains(key), live.contains_key(&key));

        for _ in 0..3 {
            let rect = random_rect(&mut rng, 550.0);
            assert_eq!(sorted_hits(&tree, &rect), sorted_hits(&oracle, &rect), "seed {} step {}", seed, step);
        }
    }

    assert_eq!(sorted_keys(&tree), sorted_keys(&oracle));
    for key in live.keys() {
        assert_eq!(tree.fat_rect(*key).unwrap(), oracle.fat_rect(*key));
    }
}

#[test]
fn random_sequences_match_brute_force() {
    for seed in 0..8 {
        run_random_sequence(seed, IndexConfig::default(), 600);
    }
}

#[test]
fn eager_rebalancing_matches_brute_force() {
    let config = IndexConfig { rebalance_interval: 1, leaf_capacity: 3, ..IndexConfig::default() };
    for seed in 100..104 {
        run_random_sequence(seed, config, 600);
    }
}

#[test]
fn short_refresh_interval_matches_brute_force() {
    let config = IndexConfig { refresh_interval: 3, ..IndexConfig::default() };
    run_random_sequence(42, config, 800);
}

#[test]
fn unmoved_updates_are_structural_no_ops() {
    let config = IndexConfig { refresh_interval: 5, ..IndexConfig::default() };
    let mut tree = KdTree::new(config);
    let mut rng = StdRng::seed_from_u64(9);
    let probes: Vec<Probe> = (0..30)
        .map(|key| Probe { key, rect: random_rect(&mut rng, 300.0), velocity: Vec2::ZERO })
        .collect();
    for p in &probes {
        tree.add_or_update(p).unwrap();
    }

    let before = tree.stats();
    for _ in 0..5 {
        for p in &probes {
            assert!(!tree.add_or_update(p).unwrap());
        }
    }
    assert_eq!(tree.stats().structural_changes(), before.structural_changes());
    assert_eq!(tree.stats(), before);

    // The sixth cosmetic update exhausts the counter.
    assert!(tree.add_or_update(&probes[0]).unwrap());
    assert_eq!(tree.stats().refattens, before.refattens + 1);
    tree.validate().unwrap();
}

#[test]
fn grid_of_holders_builds_a_shallow_tree() {
    let mut tree = KdTree::new(IndexConfig::default());
    for key in 0..400u32 {
        let min = Vec2::new((key % 20) as f64 * 30.0, (key / 20) as f64 * 30.0);
        let probe = Probe { key, rect: AABB::new(min, min + Vec2::new(10.0, 10.0)), velocity: Vec2::ZERO };
        tree.add_or_update(&probe).unwrap();
    }
    tree.rebalance(10_000).unwrap();
    tree.validate().unwrap();

    let snapshot = tree.snapshot().unwrap();
    assert_eq!(snapshot.root.count(), 400);
    assert!(snapshot.root.leaf_count() > 50);
    assert!(snapshot.root.depth() < 30, "depth {}", snapshot.root.depth());
}

#[test]
fn snapshot_round_trips_through_json() {
    let mut tree = KdTree::new(IndexConfig { rebalance_interval: 1, ..IndexConfig::default() });
    for key in 0..12u32 {
        let min = Vec2::new(key as f64 * 25.0, 0.0);
        let probe = Probe { key, rect: AABB::new(min, min + Vec2::new(5.0, 5.0)), velocity: Vec2::ZERO };
        tree.add_or_update(&probe).unwrap();
    }
    tree.rebalance(100).unwrap();

    let snapshot = tree.snapshot().unwrap();
    let json = serde_json::to_string(&snapshot).unwrap();
    let restored: TreeSnapshot<u32> = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, snapshot);
    assert_eq!(restored.root.count(), 12);
    assert_eq!(restored.stats.inserts, 12);
}
