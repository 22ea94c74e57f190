use std::collections::HashMap;

use galaxy_config::GalaxyConfig;
use galaxy_space::{FieldGenerator, RandomSampler, Region};

fn default_generator() -> FieldGenerator {
    FieldGenerator::new(&GalaxyConfig::default()).unwrap()
}

#[test]
fn default_field_matches_region_budget() {
    let generator = default_generator();
    let mut sampler = RandomSampler::seeded(4000);
    let regions = generator.generate_stars(&mut sampler, |region, _| region);

    let mut counts: HashMap<Region, u32> = HashMap::new();
    for region in regions {
        *counts.entry(region).or_default() += 1;
    }
    assert_eq!(counts[&Region::Core], 1000);
    assert_eq!(counts[&Region::OuterCore], 1000);
    assert_eq!(counts[&Region::Arm(0)], 1000);
    assert_eq!(counts[&Region::Arm(1)], 1000);
    assert_eq!(counts[&Region::OuterRim], 240);
    assert!(!counts.contains_key(&Region::Arm(2)));
}

#[test]
fn counts_stay_within_truncation_tolerance() {
    for num_stars in [3, 10, 333, 4001, 7777] {
        for num_arms in [1, 2, 3, 5, 8] {
            let generator = FieldGenerator::new(&GalaxyConfig {
                num_stars,
                num_arms,
                ..Default::default()
            })
            .unwrap();
            let mut sampler = RandomSampler::seeded(num_stars as u64);
            let produced = generator.generate_stars(&mut sampler, |_, p| p).len() as i64;
            let requested = num_stars as i64 + generator.star_counts().outer_rim as i64;
            assert!(
                (requested - produced).abs() <= num_arms as i64 + 4,
                "N={num_stars} A={num_arms}: requested {requested}, produced {produced}"
            );
        }
    }
}

#[test]
fn arms_wind_in_one_direction() {
    let generator = default_generator();
    let spiral = generator.spiral();
    let mut prev = spiral.angle(150.0, 100.0, 0.0);
    for step in 1..200 {
        let x = 150.0 + step as f32 * 2.0;
        let angle = spiral.angle(x, 100.0, 0.0);
        assert!(angle > prev, "winding reversed at x={x}");
        prev = angle;
    }
}

#[test]
fn core_haze_is_thinner_than_disk() {
    let generator = default_generator();
    let mut sampler = RandomSampler::seeded(17);
    let haze = generator.generate_haze(&mut sampler, |region, pos| (region, pos));
    let core: Vec<f32> = haze
        .iter()
        .filter(|(r, _)| *r == Region::CoreHaze)
        .map(|(_, p)| p.z.abs())
        .collect();
    assert_eq!(core.len(), 100);
    let mean_height = core.iter().sum::<f32>() / core.len() as f32;
    // Core haze thickness is half the disk's.
    assert!(mean_height < GalaxyConfig::default().thickness);
}
