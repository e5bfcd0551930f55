//! End-to-end talker/listener scenarios.

use commodore_serial_bus::{
    BusStatus, DeviceTiming, Phase, SerialBus, SerialBusConfig, SerialBusError, TalkerDriver,
};

const LISTEN_8: u8 = 0x28;
const SECONDARY_15: u8 = 0x6F;

/// Routes the bus's `tracing` output through the test harness.
/// Set `RUST_LOG=commodore_serial_bus=trace` to see phase changes.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn command_bytes_reach_the_listener() {
    init_tracing();
    let mut bus = SerialBus::default();
    let talker = TalkerDriver::default();

    talker.attention(&mut bus).unwrap();
    talker.send_byte(&mut bus, LISTEN_8).unwrap();
    talker.send_byte(&mut bus, SECONDARY_15).unwrap();
    assert_eq!(bus.phase(), Phase::ListenerReady);

    talker.release(&mut bus);
    assert_eq!(bus.phase(), Phase::Idle);
    assert_eq!(bus.received(), &[LISTEN_8, SECONDARY_15]);
    assert!(bus.atn() && bus.clock() && bus.data());
}

#[test]
fn transfer_takes_the_configured_latencies() {
    let mut bus = SerialBus::default();
    let talker = TalkerDriver::default();
    let device = DeviceTiming::default();

    assert_eq!(talker.attention(&mut bus).unwrap(), device.response_latency);

    let per_bit = talker.setup + device.ack_latency + device.ack_hold;
    let expected = device.ack_latency + 8 * per_bit + device.response_latency;
    assert_eq!(talker.send_byte(&mut bus, 0xA5).unwrap(), expected);
}

#[test]
fn every_bit_is_acknowledged_inside_the_window() {
    let config = SerialBusConfig {
        acknowledge_window: 30,
        device: DeviceTiming {
            present: true,
            response_latency: 25,
            ack_latency: 12,
            ack_hold: 15,
        },
    };
    let mut bus = SerialBus::new(config);

    // Host asserts attention and drops clock.
    bus.set_host_atn(true);
    bus.set_host_clock(true);
    let mut waited = 0;
    while bus.data() {
        bus.advance(1).unwrap();
        waited += 1;
    }
    assert!(waited <= config.acknowledge_window);
    assert_eq!(bus.phase(), Phase::ListenerReady);

    // Ready to send / ready for data.
    bus.set_host_clock(false);
    while !bus.data() {
        bus.advance(1).unwrap();
    }

    let byte = 0b0110_1001u8;
    for bit in 0..8 {
        assert_eq!(bus.phase(), Phase::BitTransfer(bit));
        bus.set_host_clock(true);
        bus.set_host_data(byte & (1 << bit) == 0);
        bus.advance(5).unwrap();
        bus.set_host_clock(false);

        let mut ack = 0;
        while bus.clock() {
            bus.advance(1).unwrap();
            ack += 1;
        }
        assert!(ack <= config.acknowledge_window, "bit {bit} acknowledged after {ack}");

        let mut hold = 0;
        while !bus.clock() {
            bus.advance(1).unwrap();
            hold += 1;
        }
        assert_eq!(hold, config.device.ack_hold, "bit {bit}");
    }

    assert_eq!(bus.phase(), Phase::ByteAcknowledge);
    bus.set_host_clock(true);
    bus.set_host_data(false);
    bus.advance(25).unwrap();
    assert!(!bus.data());
    assert_eq!(bus.received(), &[byte]);
    assert_eq!(bus.status(), BusStatus::Ready);
}

#[test]
fn absent_device_is_a_protocol_timeout() {
    init_tracing();
    let mut config = SerialBusConfig::default();
    config.device.present = false;
    let mut bus = SerialBus::new(config);
    let talker = TalkerDriver::default();

    assert_eq!(
        talker.attention(&mut bus),
        Err(SerialBusError::AcknowledgeTimeout {
            phase: Phase::AttentionAsserted,
            waited: 1001,
        })
    );
    assert_eq!(bus.status(), BusStatus::Timeout);

    talker.release(&mut bus);
    assert_eq!(bus.status(), BusStatus::Ready);
}

#[test]
fn sluggish_listener_times_out_mid_command() {
    init_tracing();
    let mut config = SerialBusConfig::default();
    config.device.ack_latency = 2000;
    let mut bus = SerialBus::new(config);
    let talker = TalkerDriver::default();

    talker.attention(&mut bus).unwrap();
    let err = talker.send_byte(&mut bus, LISTEN_8).unwrap_err();
    assert_eq!(
        err,
        SerialBusError::AcknowledgeTimeout {
            phase: Phase::ListenerReady,
            waited: 1001,
        }
    );
    assert_eq!(err.to_string(), "no device acknowledge after 1001 cycles in listener ready");
}
