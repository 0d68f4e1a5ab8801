use proptest::prelude::*;

use hostmon::system::counters::{
    ByteCounters, CpuCounters, DiskCounters, MemoryCounters, cpu_usage_rate, disk_usage_rate,
    memory_usage_rate, network_traffic,
};

proptest! {
    #[test]
    fn cpu_rate_stays_within_bounds(
        prev_busy in any::<u64>(),
        prev_total in any::<u64>(),
        curr_busy in any::<u64>(),
        curr_total in any::<u64>(),
    ) {
        let rate = cpu_usage_rate(
            &CpuCounters { busy: prev_busy, total: prev_total },
            &CpuCounters { busy: curr_busy, total: curr_total },
        );
        prop_assert!((0.0..=100.0).contains(&rate), "rate out of bounds: {rate}");
    }

    #[test]
    fn memory_rate_stays_within_bounds(total in any::<u64>(), available in any::<u64>()) {
        let rate = memory_usage_rate(&MemoryCounters { total, available });
        prop_assert!((0.0..=100.0).contains(&rate), "rate out of bounds: {rate}");
    }

    #[test]
    fn disk_rate_stays_within_bounds(total in any::<u64>(), free in any::<u64>()) {
        let rate = disk_usage_rate(&DiskCounters { total, free });
        prop_assert!((0.0..=100.0).contains(&rate), "rate out of bounds: {rate}");
    }

    #[test]
    fn traffic_rates_are_never_negative(
        prev_rx in any::<u64>(),
        prev_tx in any::<u64>(),
        curr_rx in any::<u64>(),
        curr_tx in any::<u64>(),
        elapsed in 0.001f64..10.0,
    ) {
        let prev = vec![("eth0".to_string(), ByteCounters { received: prev_rx, transmitted: prev_tx })];
        let curr = vec![("eth0".to_string(), ByteCounters { received: curr_rx, transmitted: curr_tx })];
        let traffic = network_traffic(&prev, &curr, elapsed);
        prop_assert_eq!(traffic.len(), 1);
        prop_assert!(traffic[0].inbound_bps >= 0.0);
        prop_assert!(traffic[0].outbound_bps >= 0.0);
    }
}
