//! Klaus Dormann's 6502 functional and decimal test harness.
//!
//! Both binaries are assembled with load address $0000 and end in a
//! branch-to-self: at the success address when everything passed, anywhere
//! else on the first failure.
//!
//! - Functional test: entry $0400, success $3469.
//! - Decimal test: entry $0200, error byte at $000B (0 = pass).

use emu_core::{Cpu, RunOutcome, SimpleBus, TrapOutcome};
use mos_6502::Mos6502;

const FUNCTIONAL_SUCCESS: u32 = 0x3469;

/// Run from `entry` until the program fetches the same opcode address
/// twice in a row, and return that address.
fn run_until_loop(cpu: &mut Mos6502, bus: &mut SimpleBus, entry: u16, budget: u64) -> u32 {
    cpu.regs.pc = entry;

    let mut previous = u32::MAX;
    let mut self_loop = |address: u32| {
        if address == previous {
            TrapOutcome::Trap
        } else {
            previous = address;
            TrapOutcome::Continue
        }
    };

    let summary = cpu.run_for_with(bus, budget, &mut self_loop);
    match summary.outcome {
        RunOutcome::Trapped { address } => {
            eprintln!(
                "Trapped at ${address:04X} after {} cycles",
                cpu.total_cycles().get()
            );
            address
        }
        other => panic!("no trap within {budget} cycles: {other:?}"),
    }
}

#[test]
#[ignore]
fn dormann_functional() {
    let binary = std::fs::read("tests/data/6502_functional_test.bin").expect(
        "tests/data/6502_functional_test.bin not found - download from Klaus Dormann's repository",
    );
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &binary);
    let mut cpu = Mos6502::new();

    let address = run_until_loop(&mut cpu, &mut bus, 0x0400, 200_000_000);
    assert_eq!(
        address, FUNCTIONAL_SUCCESS,
        "Klaus Dormann 6502 functional test failed at ${address:04X}"
    );
}

#[test]
#[ignore]
fn dormann_decimal() {
    let binary = std::fs::read("tests/data/6502_decimal_test.bin")
        .expect("tests/data/6502_decimal_test.bin not found");
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &binary);
    let mut cpu = Mos6502::new();

    run_until_loop(&mut cpu, &mut bus, 0x0200, 200_000_000);

    // $00=N1, $01=N2, $04=DA, $05=DNVZC, $06=AR, $0A=CF, $0B=ERROR
    let error = bus.peek(0x000B);
    assert_eq!(
        error,
        0,
        "decimal test failed: N1=${:02X} N2=${:02X} carry_in={} got A=${:02X} P=${:02X}, want A=${:02X} C=${:02X}",
        bus.peek(0x00),
        bus.peek(0x01),
        cpu.regs.y,
        bus.peek(0x04),
        bus.peek(0x05),
        bus.peek(0x06),
        bus.peek(0x0A),
    );
}
