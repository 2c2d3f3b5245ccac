use num_complex::Complex;
use rand::{
    Rng,
    SeedableRng,
    rngs::SmallRng,
};
use rsp::{
    Pull,
    Receiver,
    driver::test::RampDriver,
};

fn pull_indices(receiver: &Receiver<RampDriver>, n: usize) -> Vec<u64> {
    let mut output = vec![Complex::default(); n];
    assert_eq!(receiver.pull(&mut output).unwrap(), Pull::Samples(n));
    output.into_iter().map(RampDriver::index_of).collect()
}

#[test]
fn arbitrary_requests_are_lossless() {
    for packet_samples in [1, 7, 252, 336, 504] {
        let receiver = Receiver::new(RampDriver::new(packet_samples));
        let mut rng = SmallRng::seed_from_u64(packet_samples as u64);
        let mut expected = 0;

        for _ in 0..200 {
            let n = rng.gen_range(1..2000);
            let indices = pull_indices(&receiver, n);
            assert_eq!(indices, (expected..expected + n as u64).collect::<Vec<_>>());
            expected += n as u64;
        }

        // everything the driver produced was either delivered or is still
        // carried over
        let buffered = receiver.driver().next_index() - expected;
        assert!(buffered < packet_samples as u64);
    }
}

#[test]
fn whole_packet_requests_consume_one_packet_each() {
    let receiver = Receiver::new(RampDriver::new(252));

    for k in 0..10u64 {
        let indices = pull_indices(&receiver, 252);
        assert_eq!(indices.first(), Some(&(k * 252)));
        assert_eq!(indices.last(), Some(&(k * 252 + 251)));
        assert_eq!(receiver.driver().stats().packets, k as usize + 1);
        assert_eq!(receiver.driver().next_index(), (k + 1) * 252);
    }
}

#[test]
fn split_request_matches_single_packet() {
    let packet_samples = 252;

    let whole = Receiver::new(RampDriver::new(packet_samples));
    let expected = pull_indices(&whole, packet_samples);

    for k in 1..packet_samples {
        let split = Receiver::new(RampDriver::new(packet_samples));
        let mut indices = pull_indices(&split, k);
        indices.extend(pull_indices(&split, packet_samples - k));

        assert_eq!(indices, expected);
        assert_eq!(split.driver().stats().packets, 1);
    }
}

#[test]
fn small_requests_drain_carry_over_gradually() {
    let receiver = Receiver::new(RampDriver::new(10));
    let mut expected = 0;
    for n in [3, 2, 2, 1, 1, 4, 10, 9, 1] {
        let indices = pull_indices(&receiver, n);
        assert_eq!(indices, (expected..expected + n as u64).collect::<Vec<_>>());
        expected += n as u64;
    }
    assert_eq!(receiver.driver().stats().packets, 4);
}

#[test]
fn empty_request() {
    let receiver = Receiver::new(RampDriver::new(252));
    assert_eq!(receiver.pull(&mut []).unwrap(), Pull::Samples(0));
    assert_eq!(receiver.driver().stats().packets, 0);
}

#[test]
fn samples_are_scaled_to_unit_range() {
    let receiver = Receiver::new(RampDriver::new(504));
    let mut output = vec![Complex::default(); 4096];
    receiver.pull(&mut output).unwrap();
    assert!(
        output
            .iter()
            .all(|sample| sample.re.abs() <= 1.0 && sample.im.abs() <= 1.0)
    );
    assert_eq!(output[1], Complex::new(1.0 / 2048.0, 0.0));
}
