//! Integration tests using Tom Harte's `SingleStepTests` for the 65816.
//!
//! There are two files per opcode, one starting in emulation mode
//! (`XX.e.json`) and one in native mode (`XX.n.json`). Registers, RAM and
//! the number of bus cycles are compared.
//!
//! Test data lives in `tests/data/65816/v1/`.

use emu_core::{Cpu, SimpleBus};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use wdc_65816::Wdc65816;

#[derive(Deserialize)]
struct TestCase {
    name: String,
    initial: CpuState,
    #[serde(rename = "final")]
    final_state: CpuState,
    cycles: Vec<(u32, Option<u8>, String)>,
}

#[derive(Deserialize)]
struct CpuState {
    pc: u16,
    s: u16,
    p: u8,
    a: u16,
    x: u16,
    y: u16,
    dbr: u8,
    d: u16,
    pbr: u8,
    e: u8,
    ram: Vec<(u32, u8)>,
}

fn setup(cpu: &mut Wdc65816, bus: &mut SimpleBus, state: &CpuState) {
    for &(addr, value) in &state.ram {
        bus.poke(addr, value);
    }
    let regs = &mut cpu.regs;
    regs.e = state.e != 0;
    regs.set_p(state.p);
    regs.pc = state.pc;
    regs.s = state.s;
    regs.c = state.a;
    regs.x = state.x;
    regs.y = state.y;
    regs.dbr = state.dbr;
    regs.d = state.d;
    regs.pbr = state.pbr;
}

fn compare(cpu: &Wdc65816, bus: &SimpleBus, test: &TestCase, cycles: u64) -> Vec<String> {
    let expected = &test.final_state;
    let regs = &cpu.regs;
    let mut errors = Vec::new();

    let registers = [
        ("PC", u32::from(regs.pc), u32::from(expected.pc)),
        ("S", regs.s.into(), expected.s.into()),
        ("P", regs.p.0.into(), expected.p.into()),
        ("C", regs.c.into(), expected.a.into()),
        ("X", regs.x.into(), expected.x.into()),
        ("Y", regs.y.into(), expected.y.into()),
        ("DBR", regs.dbr.into(), expected.dbr.into()),
        ("D", regs.d.into(), expected.d.into()),
        ("PBR", regs.pbr.into(), expected.pbr.into()),
        ("E", regs.e.into(), expected.e.into()),
    ];
    for (name, got, want) in registers {
        if got != want {
            errors.push(format!("{name}: got ${got:04X}, want ${want:04X}"));
        }
    }

    for &(addr, want) in &expected.ram {
        let got = bus.peek(addr);
        if got != want {
            errors.push(format!("RAM[${addr:06X}]: got ${got:02X}, want ${want:02X}"));
        }
    }

    if cycles != test.cycles.len() as u64 {
        errors.push(format!("cycles: got {cycles}, want {}", test.cycles.len()));
    }

    errors
}

#[test]
#[ignore = "requires tests/data/65816 — run with --ignored"]
fn run_all() {
    let test_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/65816/v1");

    if !test_dir.exists() {
        eprintln!("Test data not found at {}", test_dir.display());
        eprintln!("Skipping SingleStepTests.");
        return;
    }

    let mut total_pass = 0u64;
    let mut total_fail = 0u64;

    for opcode in 0..=0xFF_u8 {
        // WAI and STP never finish an instruction.
        if matches!(opcode, 0xCB | 0xDB) {
            continue;
        }
        for mode in ["e", "n"] {
            let filename = format!("{opcode:02x}.{mode}.json");
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
                let mut cpu = Wdc65816::new();
                let mut bus = SimpleBus::with_size(0x100_0000);
                setup(&mut cpu, &mut bus, &test.initial);

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
            println!(
                "Opcode ${opcode:02X} ({filename}): {status} — {file_pass}/{} passed",
                file_pass + file_fail
            );
            for msg in &first_failures {
                println!("{msg}");
            }

            total_pass += u64::from(file_pass);
            total_fail += u64::from(file_fail);
        }
    }

    println!();
    println!("=== SingleStepTests Summary ===");
    println!("Total: {}, Pass: {total_pass}, Fail: {total_fail}", total_pass + total_fail);

    assert_eq!(total_fail, 0, "{total_fail} tests failed");
}
