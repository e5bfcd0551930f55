//! Integration tests using Tom Harte's `SingleStepTests` for the Z80.
//!
//! One file per opcode across the unprefixed, CB, DD, ED, FD, DDCB and
//! FDCB pages. Registers, MEMPTR, Q, the interrupt state, RAM and the
//! T-state count are compared after each instruction.
//!
//! Test data lives in `tests/data/z80/v1/`.

use emu_core::{Cpu, SimpleBus};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use zilog_z80::Z80;

#[derive(Deserialize)]
struct TestCase {
    name: String,
    initial: CpuState,
    #[serde(rename = "final")]
    final_state: CpuState,
    cycles: Vec<serde_json::Value>,
    #[serde(default)]
    ports: Vec<(u16, u8, String)>,
}

#[derive(Deserialize)]
struct CpuState {
    pc: u16,
    sp: u16,
    a: u8,
    b: u8,
    c: u8,
    d: u8,
    e: u8,
    f: u8,
    h: u8,
    l: u8,
    i: u8,
    r: u8,
    ix: u16,
    iy: u16,
    wz: u16,
    #[serde(rename = "af_")]
    af_alt: u16,
    #[serde(rename = "bc_")]
    bc_alt: u16,
    #[serde(rename = "de_")]
    de_alt: u16,
    #[serde(rename = "hl_")]
    hl_alt: u16,
    iff1: u8,
    iff2: u8,
    im: u8,
    ei: u8,
    q: u8,
    ram: Vec<(u16, u8)>,
}

fn setup(cpu: &mut Z80, bus: &mut SimpleBus, test: &TestCase) {
    let state = &test.initial;
    for &(addr, value) in &state.ram {
        bus.poke(addr.into(), value);
    }
    for (port, value, direction) in &test.ports {
        if direction == "r" {
            bus.set_port(*port, *value);
        }
    }

    let regs = &mut cpu.regs;
    regs.a = state.a;
    regs.f = state.f;
    regs.b = state.b;
    regs.c = state.c;
    regs.d = state.d;
    regs.e = state.e;
    regs.h = state.h;
    regs.l = state.l;
    regs.af_alt = state.af_alt;
    regs.bc_alt = state.bc_alt;
    regs.de_alt = state.de_alt;
    regs.hl_alt = state.hl_alt;
    regs.ix = state.ix;
    regs.iy = state.iy;
    regs.sp = state.sp;
    regs.pc = state.pc;
    regs.i = state.i;
    regs.r = state.r;
    regs.wz = state.wz;
    regs.q = state.q;
    regs.iff1 = state.iff1 != 0;
    regs.iff2 = state.iff2 != 0;
    regs.im = state.im;
}

fn compare(cpu: &Z80, bus: &SimpleBus, test: &TestCase, cycles: u64) -> Vec<String> {
    let expected = &test.final_state;
    let regs = &cpu.regs;
    let mut errors = Vec::new();

    let registers: [(&str, u16, u16); 24] = [
        ("A", regs.a.into(), expected.a.into()),
        ("F", regs.f.into(), expected.f.into()),
        ("B", regs.b.into(), expected.b.into()),
        ("C", regs.c.into(), expected.c.into()),
        ("D", regs.d.into(), expected.d.into()),
        ("E", regs.e.into(), expected.e.into()),
        ("H", regs.h.into(), expected.h.into()),
        ("L", regs.l.into(), expected.l.into()),
        ("AF'", regs.af_alt, expected.af_alt),
        ("BC'", regs.bc_alt, expected.bc_alt),
        ("DE'", regs.de_alt, expected.de_alt),
        ("HL'", regs.hl_alt, expected.hl_alt),
        ("IX", regs.ix, expected.ix),
        ("IY", regs.iy, expected.iy),
        ("SP", regs.sp, expected.sp),
        ("PC", regs.pc, expected.pc),
        ("I", regs.i.into(), expected.i.into()),
        ("R", regs.r.into(), expected.r.into()),
        ("WZ", regs.wz, expected.wz),
        ("Q", regs.q.into(), expected.q.into()),
        ("IFF1", regs.iff1.into(), expected.iff1.into()),
        ("IFF2", regs.iff2.into(), expected.iff2.into()),
        ("IM", regs.im.into(), expected.im.into()),
        ("EI", cpu.ei_pending().into(), expected.ei.into()),
    ];
    for (name, got, want) in registers {
        if got != want {
            errors.push(format!("{name}: got ${got:04X}, want ${want:04X}"));
        }
    }

    for &(addr, want) in &expected.ram {
        let got = bus.peek(addr.into());
        if got != want {
            errors.push(format!("RAM[${addr:04X}]: got ${got:02X}, want ${want:02X}"));
        }
    }

    if cycles != test.cycles.len() as u64 {
        errors.push(format!("cycles: got {cycles}, want {}", test.cycles.len()));
    }

    errors
}

fn filenames() -> Vec<String> {
    let mut names = Vec::new();
    for opcode in 0..=0xFF_u8 {
        // HALT never reaches another instruction boundary of its own.
        if !matches!(opcode, 0xCB | 0xDD | 0xED | 0xFD | 0x76) {
            names.push(format!("{opcode:02x}.json"));
        }
    }
    for page in ["cb", "dd", "ed", "fd", "dd cb __", "fd cb __"] {
        for opcode in 0..=0xFF_u8 {
            names.push(format!("{page} {opcode:02x}.json"));
        }
    }
    names
}

#[test]
#[ignore = "requires tests/data/z80 — run with --ignored"]
fn run_all() {
    let test_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/z80/v1");

    if !test_dir.exists() {
        eprintln!("Test data not found at {}", test_dir.display());
        eprintln!("Skipping SingleStepTests.");
        return;
    }

    let mut total_pass = 0u64;
    let mut total_fail = 0u64;

    for filename in filenames() {
        let path = test_dir.join(&filename);
        if !path.exists() {
            continue;
        }

        let data = fs::read_to_string(&path).unwrap_or_else(|e| {
            panic!("Failed to read {}: {e}", path.display());
        });
        let tests: Vec<TestCase> = serde_json::from_str(&data).unwrap_or_else(|e| {
            panic!("Failed to parse {}: {e}", path.display());
        });

        let mut file_pass = 0u32;
        let mut file_fail = 0u32;
        let mut first_failures: Vec<String> = Vec::new();

        for test in &tests {
            let mut cpu = Z80::new();
            let mut bus = SimpleBus::new();
            setup(&mut cpu, &mut bus, test);

            let cycles = cpu.step_instruction(&mut bus).cycles;

            let errors = compare(&cpu, &bus, test, cycles);
            if errors.is_empty() {
                file_pass += 1;
            } else {
                file_fail += 1;
                if first_failures.len() < 5 {
                    first_failures.push(format!("  FAIL [{}]: {}", test.name, errors.join(", ")));
                }
            }
        }

        let status = if file_fail == 0 { "PASS" } else { "FAIL" };
        println!("{filename}: {status} — {file_pass}/{} passed", file_pass + file_fail);
        for msg in &first_failures {
            println!("{msg}");
        }

        total_pass += u64::from(file_pass);
        total_fail += u64::from(file_fail);
    }

    println!();
    println!("=== Z80 SingleStepTests Summary ===");
    println!("Total: {}, Pass: {total_pass}, Fail: {total_fail}", total_pass + total_fail);

    assert_eq!(total_fail, 0, "{total_fail} tests failed");
}
