//! Mode switching, register widths, addressing and block moves.

use emu_core::{BusOpKind, CoreError, Cpu, Observable, SimpleBus, Value};
use wdc_65816::{Register, Wdc65816, flags};

/// 16 MB bus for tests that leave bank 0.
fn long_bus() -> SimpleBus {
    SimpleBus::with_size(0x100_0000)
}

fn cpu_at(pc: u16) -> Wdc65816 {
    let mut cpu = Wdc65816::new();
    cpu.regs.pc = pc;
    cpu
}

fn native(cpu: &mut Wdc65816, p: u8) {
    cpu.regs.set_e(false);
    cpu.regs.set_p(p);
}

#[test]
fn xce_and_width_flags() {
    let mut bus = SimpleBus::new();
    bus.load(
        0x8000,
        &[
            0x18, // CLC
            0xFB, // XCE
            0xC2, 0x30, // REP #$30
            0xA9, 0x34, 0x12, // LDA #$1234
            0xA2, 0x78, 0x56, // LDX #$5678
            0xE2, 0x10, // SEP #$10
            0x38, // SEC
            0xFB, // XCE
        ],
    );
    let mut cpu = cpu_at(0x8000);

    cpu.step_instruction(&mut bus);
    cpu.step_instruction(&mut bus);
    assert!(!cpu.regs.e);
    assert!(cpu.regs.p.is_set(flags::C), "old E lands in carry");

    cpu.step_instruction(&mut bus);
    assert_eq!(cpu.step_instruction(&mut bus).cycles, 3);
    assert_eq!(cpu.regs.c, 0x1234);
    assert_eq!(cpu.step_instruction(&mut bus).cycles, 3);
    assert_eq!(cpu.regs.x, 0x5678);

    cpu.step_instruction(&mut bus);
    assert_eq!(cpu.regs.x, 0x0078, "setting X clears the index high byte");

    cpu.step_instruction(&mut bus);
    cpu.step_instruction(&mut bus);
    assert!(cpu.regs.e);
    assert!(!cpu.regs.p.is_set(flags::C));
    assert!(cpu.regs.p.is_set(flags::M) && cpu.regs.p.is_set(flags::X));
    assert_eq!(cpu.regs.c, 0x1234, "B survives the switch back");
    assert_eq!(cpu.regs.s & 0xFF00, 0x0100);
}

#[test]
fn eight_bit_accumulator_keeps_b() {
    let mut bus = SimpleBus::new();
    // LDA #$FF; XBA; LDA #$01
    bus.load(0x8000, &[0xA9, 0xFF, 0xEB, 0xA9, 0x01]);
    let mut cpu = cpu_at(0x8000);

    cpu.step_instruction(&mut bus);
    cpu.step_instruction(&mut bus);
    assert_eq!(cpu.regs.c, 0xFF00);
    assert!(cpu.regs.p.is_set(flags::Z), "XBA sets Z from the new A");

    cpu.step_instruction(&mut bus);
    assert_eq!(cpu.regs.c, 0xFF01);
    assert_eq!(cpu.query("b"), Some(Value::U8(0xFF)));
}

#[test]
fn sixteen_bit_store_is_little_endian() {
    let mut bus = SimpleBus::new();
    bus.load(0x8000, &[0x8D, 0x00, 0x20]); // STA $2000
    let mut cpu = cpu_at(0x8000);
    native(&mut cpu, 0);
    cpu.regs.c = 0xBEEF;

    assert_eq!(cpu.step_instruction(&mut bus).cycles, 5);
    assert_eq!(bus.peek(0x2000), 0xEF);
    assert_eq!(bus.peek(0x2001), 0xBE);
}

#[test]
fn sixteen_bit_increment_carries_into_high_byte() {
    let mut bus = SimpleBus::new();
    bus.load(0x8000, &[0xEE, 0x00, 0x20]); // INC $2000
    bus.load(0x2000, &[0xFF, 0x00]);
    let mut cpu = cpu_at(0x8000);
    native(&mut cpu, 0);

    cpu.step_instruction(&mut bus);
    assert_eq!((bus.peek(0x2000), bus.peek(0x2001)), (0x00, 0x01));
    assert!(!cpu.regs.p.is_set(flags::Z));
}

#[test]
fn emulation_read_modify_write_writes_twice() {
    let mut bus = SimpleBus::new();
    bus.load(0x8000, &[0x06, 0x10]); // ASL $10
    bus.poke(0x0010, 0x41);
    let mut cpu = cpu_at(0x8000);
    cpu.capture().enable();

    cpu.step_instruction(&mut bus);

    let ops = cpu.capture().take();
    let kinds: Vec<_> = ops.iter().map(|op| op.kind).collect();
    assert_eq!(
        kinds,
        [
            BusOpKind::OpcodeFetch,
            BusOpKind::Read,
            BusOpKind::Read,
            BusOpKind::Write,
            BusOpKind::Write
        ]
    );
    assert_eq!(ops[3].value, 0x41, "old value written back first");
    assert_eq!(ops[4].value, 0x82);
}

#[test]
fn direct_page_indexing_wraps_only_in_emulation() {
    let mut bus = SimpleBus::new();
    bus.load(0x8000, &[0xB5, 0xFF]); // LDA $FF,X
    bus.poke(0x0001, 0x11);
    bus.poke(0x0101, 0x22);

    let mut cpu = cpu_at(0x8000);
    cpu.regs.x = 2;
    cpu.step_instruction(&mut bus);
    assert_eq!(cpu.regs.a(), 0x11);

    let mut cpu = cpu_at(0x8000);
    native(&mut cpu, flags::M | flags::X);
    cpu.regs.x = 2;
    cpu.step_instruction(&mut bus);
    assert_eq!(cpu.regs.a(), 0x22);
}

#[test]
fn absolute_addressing_uses_data_bank() {
    let mut bus = long_bus();
    bus.load(0x8000, &[0xAD, 0x34, 0x12]); // LDA $1234
    bus.poke(0x7E_1234, 0x5A);
    let mut cpu = cpu_at(0x8000);
    cpu.regs.dbr = 0x7E;

    cpu.step_instruction(&mut bus);
    assert_eq!(cpu.regs.a(), 0x5A);
}

#[test]
fn long_indirect_reads_any_bank() {
    let mut bus = long_bus();
    bus.load(0x8000, &[0xB7, 0x10]); // LDA [$10],Y
    bus.load(0x0010, &[0x00, 0x40, 0x05]);
    bus.poke(0x05_4003, 0x99);
    let mut cpu = cpu_at(0x8000);
    cpu.regs.y = 3;

    cpu.step_instruction(&mut bus);
    assert_eq!(cpu.regs.a(), 0x99);
}

#[test]
fn mvn_moves_a_byte_every_seven_cycles() {
    let mut bus = long_bus();
    bus.load(0x8000, &[0x54, 0x7E, 0x01, 0xEA]); // MVN $7E,$01
    bus.load(0x01_1000, &[0xAA, 0xBB, 0xCC]);
    let mut cpu = cpu_at(0x8000);
    native(&mut cpu, 0);
    cpu.regs.c = 2;
    cpu.regs.x = 0x1000;
    cpu.regs.y = 0x2000;

    for _ in 0..2 {
        assert_eq!(cpu.step_instruction(&mut bus).cycles, 7);
        assert_eq!(cpu.regs.pc, 0x8000, "repeats until C wraps");
    }
    assert_eq!(cpu.step_instruction(&mut bus).cycles, 7);
    assert_eq!(cpu.regs.pc, 0x8003);

    assert_eq!(cpu.regs.c, 0xFFFF);
    assert_eq!((cpu.regs.x, cpu.regs.y), (0x1003, 0x2003));
    assert_eq!(cpu.regs.dbr, 0x7E);
    assert_eq!(
        [bus.peek(0x7E_2000), bus.peek(0x7E_2001), bus.peek(0x7E_2002)],
        [0xAA, 0xBB, 0xCC]
    );
}

#[test]
fn mvp_walks_downwards() {
    let mut bus = long_bus();
    bus.load(0x8000, &[0x44, 0x00, 0x00]); // MVP $00,$00
    bus.load(0x1000, &[0x01, 0x02]);
    let mut cpu = cpu_at(0x8000);
    native(&mut cpu, 0);
    cpu.regs.c = 1;
    cpu.regs.x = 0x1001;
    cpu.regs.y = 0x3001;

    cpu.step_instruction(&mut bus);
    cpu.step_instruction(&mut bus);

    assert_eq!(cpu.regs.pc, 0x8003);
    assert_eq!((bus.peek(0x3000), bus.peek(0x3001)), (0x01, 0x02));
    assert_eq!((cpu.regs.x, cpu.regs.y), (0x0FFF, 0x2FFF));
}

#[test]
fn emulation_branch_pays_for_page_cross() {
    let mut bus = SimpleBus::new();
    bus.load(0x80FD, &[0x80, 0x10]); // BRA +$10 → $810F

    let mut cpu = cpu_at(0x80FD);
    assert_eq!(cpu.step_instruction(&mut bus).cycles, 4);
    assert_eq!(cpu.regs.pc, 0x810F);

    let mut cpu = cpu_at(0x80FD);
    native(&mut cpu, 0);
    assert_eq!(cpu.step_instruction(&mut bus).cycles, 3);
    assert_eq!(cpu.regs.pc, 0x810F);
}

#[test]
fn untaken_branch_takes_two_cycles() {
    let mut bus = SimpleBus::new();
    bus.load(0x8000, &[0xF0, 0x10]); // BEQ
    let mut cpu = cpu_at(0x8000);
    cpu.regs.p.clear(flags::Z);

    assert_eq!(cpu.step_instruction(&mut bus).cycles, 2);
    assert_eq!(cpu.regs.pc, 0x8002);
}

#[test]
fn jsl_and_rtl_cross_banks() {
    let mut bus = long_bus();
    bus.load(0x8000, &[0x22, 0x00, 0x90, 0x12]); // JSL $12:9000
    bus.poke(0x12_9000, 0x6B); // RTL
    let mut cpu = cpu_at(0x8000);

    assert_eq!(cpu.step_instruction(&mut bus).cycles, 8);
    assert_eq!(cpu.pc(), 0x12_9000);
    assert_eq!(
        [bus.peek(0x01FF), bus.peek(0x01FE), bus.peek(0x01FD)],
        [0x00, 0x80, 0x03]
    );

    assert_eq!(cpu.step_instruction(&mut bus).cycles, 6);
    assert_eq!(cpu.pc(), 0x00_8004);
    assert_eq!(cpu.regs.s, 0x01FF);
}

#[test]
fn pea_and_pld_move_sixteen_bits() {
    let mut bus = SimpleBus::new();
    // PEA $1234; PLD
    bus.load(0x8000, &[0xF4, 0x34, 0x12, 0x2B]);
    let mut cpu = cpu_at(0x8000);

    cpu.step_instruction(&mut bus);
    cpu.step_instruction(&mut bus);
    assert_eq!(cpu.regs.d, 0x1234);
    assert_eq!(cpu.regs.s, 0x01FF);
}

#[test]
fn emulation_pld_reads_past_page_one() {
    let mut bus = SimpleBus::new();
    bus.poke(0x8000, 0x2B); // PLD
    bus.load(0x0200, &[0xAA, 0xBB]);
    bus.load(0x0100, &[0x11, 0x22]);
    let mut cpu = cpu_at(0x8000);
    cpu.regs.s = 0x01FF;
    cpu.capture().enable();

    assert_eq!(cpu.step_instruction(&mut bus).cycles, 5);
    assert_eq!(cpu.regs.d, 0xBBAA);
    assert_eq!(cpu.regs.s, 0x0101, "S goes back to page one afterwards");

    let reads: Vec<u32> = cpu
        .capture()
        .take()
        .iter()
        .filter(|op| op.kind == BusOpKind::Read)
        .map(|op| op.address)
        .collect();
    assert_eq!(reads, [0x0200, 0x0201]);
}

#[test]
fn emulation_jsl_pushes_below_page_one() {
    let mut bus = long_bus();
    bus.load(0x8000, &[0x22, 0x00, 0x90, 0x12]); // JSL $12:9000
    let mut cpu = cpu_at(0x8000);
    cpu.regs.s = 0x0100;

    cpu.step_instruction(&mut bus);
    assert_eq!(cpu.pc(), 0x12_9000);
    assert_eq!(
        [bus.peek(0x0100), bus.peek(0x00FF), bus.peek(0x00FE)],
        [0x00, 0x80, 0x03]
    );
    assert_eq!(bus.peek(0x01FF), 0x00, "no wrap inside page one");
    assert_eq!(cpu.regs.s, 0x01FD);
}

#[test]
fn emulation_pha_still_wraps_in_page_one() {
    let mut bus = SimpleBus::new();
    bus.load(0x8000, &[0xA9, 0x5A, 0x48]); // LDA #$5A; PHA
    let mut cpu = cpu_at(0x8000);
    cpu.regs.s = 0x0100;

    cpu.step_instruction(&mut bus);
    cpu.step_instruction(&mut bus);
    assert_eq!(bus.peek(0x0100), 0x5A);
    assert_eq!(cpu.regs.s, 0x01FF);
}

#[test]
fn decimal_adc_in_sixteen_bits() {
    let mut bus = SimpleBus::new();
    // SED; ADC #$0001
    bus.load(0x8000, &[0xF8, 0x69, 0x01, 0x00]);
    let mut cpu = cpu_at(0x8000);
    native(&mut cpu, 0);
    cpu.regs.c = 0x0999;

    cpu.step_instruction(&mut bus);
    cpu.step_instruction(&mut bus);
    assert_eq!(cpu.regs.c, 0x1000);
    assert!(!cpu.regs.p.is_set(flags::C));
}

#[test]
fn register_access_checks_values() {
    let mut cpu = Wdc65816::new();

    cpu.set_register(Register::X, 0x1234).unwrap();
    assert_eq!(cpu.register(Register::X).unwrap(), 0x34, "8-bit index");

    cpu.set_register(Register::S, 0x2080).unwrap();
    assert_eq!(cpu.register(Register::S).unwrap(), 0x0180);

    assert!(matches!(
        cpu.set_register(Register::E, 2),
        Err(CoreError::ValueOutOfRange { value: 2, .. })
    ));
    assert!(matches!(
        cpu.set_register(Register::A, 0x1_0000),
        Err(CoreError::ValueOutOfRange { .. })
    ));

    cpu.set_register(Register::E, 0).unwrap();
    cpu.set_register(Register::P, 0).unwrap();
    cpu.set_register(Register::X, 0x1234).unwrap();
    assert_eq!(cpu.register(Register::X).unwrap(), 0x1234);
    assert_eq!(cpu.register(Register::E).unwrap(), 0);
}

#[test]
fn observable_paths_resolve() {
    let cpu = Wdc65816::new();
    for path in cpu.query_paths() {
        assert!(cpu.query(path).is_some(), "{path}");
    }
    assert_eq!(cpu.query("e"), Some(Value::Bool(true)));
    assert_eq!(cpu.query("nonsense"), None);
}
