//! Reconfiguration while a pull is blocked in the driver's packet read.

use std::{
    sync::Arc,
    thread::{
        self,
        JoinHandle,
    },
};

use num_complex::Complex;
use rsp::{
    Error,
    Pull,
    Receiver,
    StreamState,
    driver::test::RampDriver,
};

fn pull_indices(receiver: &Receiver<RampDriver>, n: usize) -> Vec<u64> {
    let mut output = vec![Complex::default(); n];
    assert_eq!(receiver.pull(&mut output).unwrap(), Pull::Samples(n));
    output.into_iter().map(RampDriver::index_of).collect()
}

/// Starts a pull of `n` samples on another thread and waits until it's
/// blocked in the driver.
fn blocked_pull(
    receiver: &Arc<Receiver<RampDriver>>,
    n: usize,
) -> JoinHandle<(Result<Pull, Error>, Vec<u64>)> {
    receiver.driver().hold_reads();

    let handle = {
        let receiver = receiver.clone();
        thread::spawn(move || {
            let mut output = vec![Complex::default(); n];
            let result = receiver.pull(&mut output);
            let indices = output.into_iter().map(RampDriver::index_of).collect();
            (result, indices)
        })
    };

    receiver.driver().wait_for_blocked_read();
    handle
}

#[test]
fn reinit_during_read_drops_packet_tail() {
    let receiver = Arc::new(Receiver::new(RampDriver::new(10)));
    assert_eq!(pull_indices(&receiver, 4), vec![0, 1, 2, 3]);

    // drains the carry-over 4..10, then blocks reading the next packet
    let pull = blocked_pull(&receiver, 9);

    receiver.set_center_frequency(300e6).unwrap();
    assert_eq!(receiver.driver().stats().inits, 2);
    receiver.driver().release_reads();

    let (result, indices) = pull.join().unwrap();
    assert_eq!(result.unwrap(), Pull::Samples(9));
    assert_eq!(indices, (4..=12).collect::<Vec<u64>>());

    // 13..20 belonged to the packet read across the reinit
    assert_eq!(pull_indices(&receiver, 5), (20..25).collect::<Vec<u64>>());
}

#[test]
fn read_failed_by_reinit_is_retried() {
    let receiver = Arc::new(Receiver::new(RampDriver::new(10)));
    assert_eq!(pull_indices(&receiver, 10), (0..10).collect::<Vec<u64>>());

    let pull = blocked_pull(&receiver, 15);

    // the held read still uses the old packet size, which the driver rejects
    receiver.driver().set_packet_samples(20);
    receiver.set_sample_rate(8e6).unwrap();
    receiver.driver().release_reads();

    let (result, indices) = pull.join().unwrap();
    assert_eq!(result.unwrap(), Pull::Samples(15));
    assert_eq!(indices, (10..25).collect::<Vec<u64>>());

    assert_eq!(receiver.stream_state(), StreamState::Ready);
    assert!(receiver.is_running());
    assert_eq!(receiver.packet_samples(), 20);
    assert_eq!(pull_indices(&receiver, 5), (25..30).collect::<Vec<u64>>());
}

#[test]
fn close_during_read_ends_the_pull() {
    let receiver = Arc::new(Receiver::new(RampDriver::new(10)));
    pull_indices(&receiver, 10);

    let pull = blocked_pull(&receiver, 10);

    receiver.close_stream();
    assert!(!receiver.driver().is_initialized());
    receiver.driver().release_reads();

    let (result, _) = pull.join().unwrap();
    assert_eq!(result.unwrap(), Pull::EndOfStream);
    assert_eq!(receiver.stream_state(), StreamState::Closed);
    assert_eq!(receiver.driver().stats().packets, 1);
}

#[test]
fn reopen_during_read_ends_the_pull() {
    let receiver = Arc::new(Receiver::new(RampDriver::new(10)));
    pull_indices(&receiver, 10);

    let pull = blocked_pull(&receiver, 10);

    receiver.close_stream();
    receiver.open_stream();
    receiver.driver().release_reads();

    let (result, _) = pull.join().unwrap();
    assert_eq!(result.unwrap(), Pull::EndOfStream);

    // the reopened stream starts fresh
    assert_eq!(receiver.stream_state(), StreamState::Ready);
    let next = receiver.driver().next_index();
    assert_eq!(
        pull_indices(&receiver, 3),
        (next..next + 3).collect::<Vec<u64>>()
    );
}

#[test]
fn overlapping_pull_is_busy() {
    let receiver = Arc::new(Receiver::new(RampDriver::new(10)));
    pull_indices(&receiver, 10);

    let pull = blocked_pull(&receiver, 10);

    let mut output = vec![Complex::default(); 10];
    assert!(matches!(receiver.pull(&mut output), Err(Error::Busy)));
    // an empty request doesn't need the buffer
    assert_eq!(receiver.pull(&mut []).unwrap(), Pull::Samples(0));

    receiver.driver().release_reads();

    let (result, indices) = pull.join().unwrap();
    assert_eq!(result.unwrap(), Pull::Samples(10));
    assert_eq!(indices, (10..20).collect::<Vec<u64>>());
    assert_eq!(receiver.stream_state(), StreamState::Ready);
}
