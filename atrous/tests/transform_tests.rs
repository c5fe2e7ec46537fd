//! End to end checks of the filter bank, pyramid and packet transforms.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use atrous::{
    BorderMode, Direction, EnergyThresholdCost, FullyDecomposedCost, Raster, Region,
    StationaryFilterBank, StopPolicy, TransformSettings, WaveletError, WaveletFamily,
    WaveletForwardTransform, WaveletInverseTransform, WaveletPacketInverseTransform,
    WaveletPacketTransform,
};

use log::info;
use shared::{approx_eq, constant, max_difference, noise, relative_error};

const EPSILON: f64 = 1e-9;

#[test]
fn test_constant_image_has_no_detail() {
    shared::init_logger();
    let v = 7.25;
    let input = constant(&[4, 4], v);
    let bank = StationaryFilterBank::new(WaveletFamily::Haar, Direction::Forward);
    let bands = bank.compute(&[input], None).unwrap();

    assert_eq!(bands.len(), 4);
    for sample in bands[0].as_slice() {
        assert!(approx_eq(*sample, v, EPSILON));
    }
    for band in &bands[1..] {
        assert_eq!(band.region(), &Region::from_size(&[4, 4]));
        for sample in band.as_slice() {
            assert!(approx_eq(*sample, 0.0, EPSILON));
        }
    }
}

#[test]
fn test_sub_band_count() {
    shared::init_logger();
    for size in [vec![9], vec![5, 6], vec![4, 3, 5]] {
        let input = noise(&size, 3);
        for family in [WaveletFamily::Haar, WaveletFamily::Spline97] {
            let bank = StationaryFilterBank::new(family, Direction::Forward);
            let bands = bank.compute(&[input.clone()], None).unwrap();
            assert_eq!(bands.len(), 1 << size.len());
            assert!(bands.iter().all(|b| b.region() == input.region()));
        }
    }
}

#[test]
fn test_pyramid_output_count() {
    shared::init_logger();
    let input = noise(&[8, 8, 4], 5);
    for levels in 0..3 {
        let mut transform = WaveletForwardTransform::new(TransformSettings::default());
        transform.set_number_of_decompositions(levels);
        let outputs = transform.compute(&input, None).unwrap();
        assert_eq!(outputs.len(), levels as usize * 7 + 1);
    }
}

#[test]
fn test_pyramid_round_trip() {
    shared::init_logger();
    let inputs = [noise(&[17], 1), noise(&[12, 9], 2), noise(&[6, 5, 4], 3)];
    for input in &inputs {
        for family in [WaveletFamily::Haar, WaveletFamily::Spline97] {
            for levels in 1..3 {
                let settings = TransformSettings::new(family);
                let mut forward = WaveletForwardTransform::new(settings);
                forward.set_number_of_decompositions(levels);
                let outputs = forward.compute(input, None).unwrap();
                let reconstructed = WaveletInverseTransform::new(settings)
                    .compute(&outputs, None)
                    .unwrap();
                let error = relative_error(input, &reconstructed);
                info!(
                    "{} levels {} over {}: relative error {:e}",
                    family,
                    levels,
                    input.region(),
                    error
                );
                assert!(error < EPSILON);
            }
        }
    }
}

#[test]
fn test_tiling_does_not_change_the_result() {
    shared::init_logger();
    let input = noise(&[13, 11], 7);
    for border_mode in [
        BorderMode::Wrap,
        BorderMode::Clamp,
        BorderMode::Reflect,
        BorderMode::Reflect101,
        BorderMode::Zeros,
    ] {
        let settings = TransformSettings::new(WaveletFamily::Spline97)
            .with_border_mode(border_mode)
            .with_number_of_regions(1);
        let mut single = WaveletForwardTransform::new(settings);
        single.set_number_of_decompositions(2);
        let mut tiled = WaveletForwardTransform::new(settings.with_number_of_regions(4));
        tiled.set_number_of_decompositions(2);

        let expected = single.compute(&input, None).unwrap();
        let actual = tiled.compute(&input, None).unwrap();
        assert_eq!(expected, actual, "{} differs when tiled", border_mode);
    }
}

#[test]
fn test_full_packet_tree() {
    shared::init_logger();
    let input = noise(&[8, 6], 11);
    let mut transform = WaveletPacketTransform::new(TransformSettings::default());
    transform.set_cost(FullyDecomposedCost::new(2));
    let leaves = transform.compute(&input, None).unwrap();

    assert_eq!(leaves.len(), 16);
    assert_eq!(transform.filter_list().len(), 5);
    assert!(leaves.iter().all(|leaf| leaf.region() == input.region()));

    let reconstructed = WaveletPacketInverseTransform::new(*transform.settings())
        .compute(&leaves, transform.packet_rule(), None)
        .unwrap();
    assert!(max_difference(&input, &reconstructed) < EPSILON);
}

#[test]
fn test_packet_depth_zero() {
    shared::init_logger();
    let input = noise(&[5, 5], 13);
    let mut transform = WaveletPacketTransform::new(TransformSettings::default());
    transform.set_cost(FullyDecomposedCost::new(0));
    let leaves = transform.compute(&input, None).unwrap();
    assert_eq!(leaves.len(), 1);
    assert_eq!(leaves[0], input);
    assert!(transform.filter_list().is_empty());
}

struct RecordingPolicy {
    calls: AtomicUsize,
}

impl StopPolicy for RecordingPolicy {
    fn evaluate(&self, depth: u32, _subband: &Raster) -> bool {
        self.calls.fetch_add(1, Ordering::Relaxed);
        depth < 1
    }
}

#[test]
fn test_packet_uses_injected_policy() {
    shared::init_logger();
    let input = noise(&[6, 6, 6], 17);
    let policy = std::sync::Arc::new(RecordingPolicy {
        calls: AtomicUsize::new(0),
    });

    struct Shared(std::sync::Arc<RecordingPolicy>);
    impl StopPolicy for Shared {
        fn evaluate(&self, depth: u32, subband: &Raster) -> bool {
            self.0.evaluate(depth, subband)
        }
    }

    let mut transform = WaveletPacketTransform::new(TransformSettings::default());
    transform.set_cost(Shared(policy.clone()));
    let leaves = transform.compute(&input, None).unwrap();
    assert_eq!(leaves.len(), 8);
    // the root and its eight children
    assert_eq!(policy.calls.load(Ordering::Relaxed), 9);
}

#[test]
fn test_packet_without_cost_fails() {
    shared::init_logger();
    let mut transform = WaveletPacketTransform::new(TransformSettings::default());
    let result = transform.compute(&noise(&[4, 4], 19), None);
    match result {
        Err(e) => {
            assert_eq!(e, WaveletError::CostPolicyNotSet);
            assert_eq!(e.to_string(), "cost policy not set");
        }
        Ok(_) => panic!("packet transform ran without a cost policy"),
    }
}

#[test]
fn test_energy_policy_keeps_flat_bands() {
    shared::init_logger();
    // flat along axis 0, so every band filtered high along axis 0 is empty
    let input = Raster::from_fn(Region::from_size(&[8, 8]), |i| (i[1] * 5 % 8) as f64).unwrap();
    let mut transform = WaveletPacketTransform::new(TransformSettings::default());
    transform.set_cost(EnergyThresholdCost::new(2, 1e-6));
    let leaves = transform.compute(&input, None).unwrap();

    let rule = transform.packet_rule();
    assert!(rule[0]);
    // bands 1 and 3 of the root are flat and stay leaves
    let decomposed = rule.iter().filter(|&&r| r).count();
    assert!(decomposed < 5);
    let reconstructed = WaveletPacketInverseTransform::default()
        .compute(&leaves, rule, None)
        .unwrap();
    assert!(max_difference(&input, &reconstructed) < EPSILON);
}

#[test]
fn test_operator_mismatch_is_reported() {
    shared::init_logger();
    let mut transform = WaveletForwardTransform::new(TransformSettings::new(WaveletFamily::Spline97));
    transform.set_number_of_decompositions(2);

    let level_zero = atrous::WaveletOperator::new(
        WaveletFamily::Spline97,
        atrous::Band::Low,
        Direction::Forward,
        0,
    )
    .unwrap();
    let high = atrous::WaveletOperator::new(
        WaveletFamily::Spline97,
        atrous::Band::High,
        Direction::Forward,
        1,
    )
    .unwrap();
    let bank = transform.filter_mut(1).unwrap();
    let result = bank.set_operators(level_zero, high);
    assert_eq!(
        result,
        Err(WaveletError::OperatorRadiusMismatch {
            band: atrous::Band::Low,
            radius: 4,
            expected: 8,
            up_sample_factor: 1
        })
    );
}

#[test]
fn test_decimated_pyramid_sizes() {
    shared::init_logger();
    let input = noise(&[16, 12], 23);
    let settings = TransformSettings::new(WaveletFamily::Haar).with_sub_sample_image_factor(2);
    let mut transform = WaveletForwardTransform::new(settings);
    transform.set_number_of_decompositions(2);
    let outputs = transform.compute(&input, None).unwrap();

    assert_eq!(outputs.len(), 7);
    for output in &outputs[..3] {
        assert_eq!(output.region(), &Region::from_size(&[8, 6]));
    }
    for output in &outputs[3..] {
        assert_eq!(output.region(), &Region::from_size(&[4, 3]));
        assert_eq!(output.spacing(), &[4.0, 4.0]);
    }

    let reconstructed = WaveletInverseTransform::new(settings)
        .compute(&outputs, None)
        .unwrap();
    assert_eq!(reconstructed.region(), input.region());
}

#[test]
fn test_progress_reaches_completion() {
    shared::init_logger();
    let input = noise(&[12, 12], 29);
    let reported = Mutex::new(Vec::new());
    let observer = |p: f32| reported.lock().unwrap().push(p);

    let settings = TransformSettings::default().with_number_of_regions(3);
    let mut forward = WaveletForwardTransform::new(settings);
    forward.set_number_of_decompositions(2);
    forward
        .compute(&input, Some(&observer as &(dyn Fn(f32) + Sync)))
        .unwrap();

    let values = reported.lock().unwrap().clone();
    assert_eq!(values.len(), 6);
    assert!(values.iter().all(|&p| p > 0.0 && p <= 1.0));
    let last = values.iter().cloned().fold(0.0f32, f32::max);
    assert!((last - 1.0).abs() < 1e-6);

    reported.lock().unwrap().clear();
    let mut packet = WaveletPacketTransform::new(settings);
    packet.set_cost(FullyDecomposedCost::new(1));
    packet
        .compute(&input, Some(&observer as &(dyn Fn(f32) + Sync)))
        .unwrap();
    let values = reported.lock().unwrap().clone();
    // three tiles of the root bank, then one per leaf
    assert_eq!(values.len(), 7);
    assert!((values[values.len() - 1] - 1.0).abs() < 1e-6);
}

#[test]
fn test_pyramid_outputs_follow_level_order() {
    shared::init_logger();
    let input = noise(&[10, 7], 31);
    let settings = TransformSettings::new(WaveletFamily::Spline97);
    let mut transform = WaveletForwardTransform::new(settings);
    transform.set_number_of_decompositions(3);
    let outputs = transform.compute(&input, None).unwrap();

    // run the levels by hand: highs of level 0, 1, 2, then the last low
    let mut expected = Vec::new();
    let mut low = input;
    for level in 0..3 {
        let bank = StationaryFilterBank::with_settings(&settings, Direction::Forward, level);
        let mut bands = bank.compute(&[low], None).unwrap();
        low = bands.remove(0);
        expected.extend(bands);
    }
    expected.push(low);

    assert_eq!(outputs.len(), 10);
    assert_eq!(outputs, expected);
}

#[test]
fn test_packet_leaves_are_pre_order() {
    shared::init_logger();
    let input = noise(&[6, 5], 37);
    let settings = TransformSettings::new(WaveletFamily::Haar);
    let mut transform = WaveletPacketTransform::new(settings);
    transform.set_cost(FullyDecomposedCost::new(2));
    let leaves = transform.compute(&input, None).unwrap();

    // children of root band 0 first, then those of root band 1, and so on
    let root = StationaryFilterBank::with_settings(&settings, Direction::Forward, 0);
    let child = StationaryFilterBank::with_settings(&settings, Direction::Forward, 1);
    let mut expected = Vec::new();
    for band in root.compute(&[input], None).unwrap() {
        expected.extend(child.compute(&[band], None).unwrap());
    }

    assert_eq!(leaves.len(), 16);
    assert_eq!(leaves, expected);
}
