//! Integration tests for tape mastering.
//!
//! Tapes are decoded with a small TZX reader and then "loaded" the way the
//! 47loader firmware would: each block's sanity byte and checksum are
//! verified, the dynamic table is read back, and the data blocks are placed
//! in memory following the table's directions. The result must match the
//! input byte for byte.

#![allow(clippy::cast_possible_truncation)]

use std::process::Command;

use loader_tzx::{
    Checksum, LoadPattern, Master, OutputMode, PilotTone, Speed, TableReport, Tape, TapeWriter,
    Timing,
};

// ---------------------------------------------------------------------------
// TZX reader
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum TapeBlock {
    Turbo {
        pilot_pulse: u16,
        sync0: u16,
        sync1: u16,
        zero_pulse: u16,
        one_pulse: u16,
        pilot_count: u16,
        used_bits: u8,
        pause_ms: u16,
        data: Vec<u8>,
    },
    PureTone {
        pulse_len: u16,
        count: u16,
    },
}

fn read_u16_le(data: &[u8], pos: usize) -> u16 {
    u16::from(data[pos]) | (u16::from(data[pos + 1]) << 8)
}

fn read_u24_le(data: &[u8], pos: usize) -> usize {
    usize::from(data[pos]) | (usize::from(data[pos + 1]) << 8) | (usize::from(data[pos + 2]) << 16)
}

/// Decode a sequence of blocks (no file header).
fn parse_blocks(data: &[u8]) -> Vec<TapeBlock> {
    let mut blocks = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        let id = data[pos];
        pos += 1;
        match id {
            0x11 => {
                let len = read_u24_le(data, pos + 15);
                blocks.push(TapeBlock::Turbo {
                    pilot_pulse: read_u16_le(data, pos),
                    sync0: read_u16_le(data, pos + 2),
                    sync1: read_u16_le(data, pos + 4),
                    zero_pulse: read_u16_le(data, pos + 6),
                    one_pulse: read_u16_le(data, pos + 8),
                    pilot_count: read_u16_le(data, pos + 10),
                    used_bits: data[pos + 12],
                    pause_ms: read_u16_le(data, pos + 13),
                    data: data[pos + 18..pos + 18 + len].to_vec(),
                });
                pos += 18 + len;
            }
            0x12 => {
                blocks.push(TapeBlock::PureTone {
                    pulse_len: read_u16_le(data, pos),
                    count: read_u16_le(data, pos + 2),
                });
                pos += 4;
            }
            other => panic!("unexpected block ID ${other:02X} at {}", pos - 1),
        }
    }
    blocks
}

/// Decode a whole TZX file.
fn parse_tzx(data: &[u8]) -> Vec<TapeBlock> {
    assert_eq!(&data[..10], b"ZXTape!\x1A\x01\x14", "TZX header");
    parse_blocks(&data[10..])
}

fn tape_blocks(tape: &Tape) -> Vec<TapeBlock> {
    let mut bytes = Vec::new();
    tape.write(&mut bytes).expect("write to vec");
    parse_blocks(&bytes)
}

// ---------------------------------------------------------------------------
// Loader model
// ---------------------------------------------------------------------------

/// Check a block body as the loader does and return the payload.
fn unpack(block: &TapeBlock) -> Vec<u8> {
    let TapeBlock::Turbo { data, .. } = block else {
        panic!("expected a turbo block, got {block:?}");
    };
    assert!(matches!(block, TapeBlock::Turbo { used_bits: 8, .. }));
    assert_eq!(data[0], 0xB2, "sanity byte");
    assert!(
        Checksum::verifies(&data[3..], data[1], data[2]),
        "checksum must verify"
    );
    data[3..].iter().map(|b| b ^ 0x90).collect()
}

/// Read back the table entries as (address, length, change direction).
fn read_table(bytes: &[u8], report: &TableReport) -> Vec<(u16, u16, bool)> {
    let mut entries = Vec::new();
    let mut pos = 0;
    while bytes[pos] != 0 {
        let address = u16::from_be_bytes([bytes[pos], bytes[pos + 1]]);
        pos += 2;
        let (length, change) = if let Some(length) = report.fixed_length {
            (length, false)
        } else if report.one_byte_lengths {
            pos += 1;
            (u16::from(bytes[pos - 1] & 0x7F), bytes[pos - 1] & 0x80 != 0)
        } else {
            pos += 2;
            let raw = u16::from_be_bytes([bytes[pos - 2], bytes[pos - 1]]);
            (raw & 0x7FFF, raw & 0x8000 != 0)
        };
        entries.push((address, length, change));
    }
    assert_eq!(pos + 1, bytes.len());
    entries
}

/// Run a dynamic load into a 64K memory image.
fn load_dynamic(blocks: &[TapeBlock], report: &TableReport) -> Vec<u8> {
    let length = unpack(&blocks[0]);
    assert_eq!(length.len(), 2);
    let table = unpack(&blocks[1]);
    let declared = u16::from_le_bytes([length[0], length[1]]);
    assert_eq!(usize::from(declared), table.len());
    assert_eq!(table.len(), report.table_length);

    let entries = read_table(&table, report);
    assert_eq!(entries.len(), report.entries);
    assert_eq!(entries.len(), blocks.len() - 2);

    let mut memory = vec![0u8; 0x10000];
    let mut backwards = false;
    for (&(address, length, change), block) in entries.iter().zip(&blocks[2..]) {
        if change {
            backwards = !backwards;
        }
        let data = unpack(block);
        assert_eq!(data.len(), usize::from(length));
        for (i, byte) in data.into_iter().enumerate() {
            let target = if backwards {
                usize::from(address) - i
            } else {
                usize::from(address) + i
            };
            memory[target] = byte;
        }
    }
    memory
}

fn screen() -> Vec<u8> {
    (0..6912u32).map(|i| (i * 7 + i / 256) as u8).collect()
}

fn turbo_fields(block: &TapeBlock) -> (u16, u16) {
    match block {
        TapeBlock::Turbo {
            pilot_count,
            pause_ms,
            ..
        } => (*pilot_count, *pause_ms),
        TapeBlock::PureTone { .. } => panic!("expected a turbo block"),
    }
}

// ---------------------------------------------------------------------------
// Fancy screens
// ---------------------------------------------------------------------------

#[test]
fn every_pattern_loads_the_screen() {
    let screen = screen();
    for fixed in [true, false] {
        let mut master = Master::default();
        if !fixed {
            master = master.disable_fixed_length();
        }
        for pattern in LoadPattern::all() {
            let tape = master
                .prepare(OutputMode::FancyScreen(pattern), &screen)
                .expect("fancy tape");
            let report = tape.report().expect("dynamic report");
            if !fixed {
                assert_eq!(report.fixed_length, None, "{pattern}");
            }
            let memory = load_dynamic(&tape_blocks(&tape), report);
            assert_eq!(&memory[0x4000..0x5B00], &screen[..], "{pattern}");
        }
    }
}

#[test]
fn fancy_screen_pilots_and_pauses() {
    let tape = Master::default()
        .prepare(
            OutputMode::FancyScreen("bidi-pac".parse().expect("pattern")),
            &screen(),
        )
        .expect("fancy tape");
    let blocks = tape_blocks(&tape);
    let fields: Vec<(u16, u16)> = blocks.iter().map(turbo_fields).collect();
    let last = fields.len() - 1;

    assert_eq!(fields[0], (2046, 0), "table length block");
    assert_eq!(fields[1], (2, 0), "table block");
    assert_eq!(fields[2], (2046, 0), "first data block");
    for (i, field) in fields.iter().enumerate().take(last).skip(3) {
        assert_eq!(*field, (2, 0), "block {i}");
    }
    assert_eq!(fields[last], (2, 250));
}

#[test]
fn bidirectional_report() {
    let tape = Master::default()
        .prepare(
            OutputMode::FancyScreen("bidi-pa".parse().expect("pattern")),
            &screen(),
        )
        .expect("fancy tape");
    let report = tape.report().expect("report");
    assert_eq!(report.entries, 48);
    assert_eq!(report.table_length, 48 * 4 + 1);
    assert!(!report.forwards_only);
    assert!(!report.one_byte_lengths);
    assert_eq!(report.fixed_length, None);
}

#[test]
fn backward_blocks_hold_reversed_slices() {
    let screen = screen();
    let tape = Master::default()
        .prepare(
            OutputMode::FancyScreen("ra-fp".parse().expect("pattern")),
            &screen,
        )
        .expect("fancy tape");
    let blocks = tape_blocks(&tape);
    let attrs = unpack(&blocks[2]);
    let expected: Vec<u8> = screen[6144..].iter().rev().copied().collect();
    assert_eq!(attrs, expected);
    assert_eq!(unpack(&blocks[3]), &screen[..6144]);
}

#[test]
fn clicking_pilot_tones() {
    let timing = Timing::new(Speed::Fast, PilotTone::Clicking { clicks: 5 }, 100).expect("timing");
    let tape = Master::new(timing)
        .prepare(
            OutputMode::FancyScreen("linear-ttb".parse().expect("pattern")),
            &screen(),
        )
        .expect("fancy tape");
    let blocks = tape_blocks(&tape);
    let tones: Vec<usize> = blocks
        .iter()
        .enumerate()
        .filter(|(_, b)| matches!(b, TapeBlock::PureTone { .. }))
        .map(|(i, _)| i)
        .collect();
    // before the table length block and before the first data block
    assert_eq!(tones, vec![0, 3]);
    assert_eq!(
        blocks[0],
        TapeBlock::PureTone {
            pulse_len: 300,
            count: 5
        }
    );
    let TapeBlock::Turbo {
        pilot_pulse,
        zero_pulse,
        one_pulse,
        sync0,
        sync1,
        ..
    } = blocks[1]
    else {
        panic!("expected a turbo block");
    };
    assert_eq!((pilot_pulse, zero_pulse, one_pulse), (1710, 475, 950));
    assert_eq!((sync0, sync1), (475, 950));
}

// ---------------------------------------------------------------------------
// Other modes
// ---------------------------------------------------------------------------

#[test]
fn progressive_load_reconstructs_payload() {
    let payload: Vec<u8> = (0..3000u32).map(|i| (i % 253) as u8).collect();
    let tape = Master::default()
        .prepare(
            OutputMode::Progressive {
                address: 0x8000,
                chunk: 512,
            },
            &payload,
        )
        .expect("progressive tape");
    let report = tape.report().expect("report");
    assert_eq!(report.entries, 6);
    assert!(report.forwards_only);
    let memory = load_dynamic(&tape_blocks(&tape), report);
    assert_eq!(&memory[0x8000..0x8000 + 3000], &payload[..]);
}

#[test]
fn progressive_load_beyond_one_entry_length() {
    let payload: Vec<u8> = (0..40_000u32).map(|i| (i % 251) as u8).collect();
    let tape = Master::default()
        .prepare(
            OutputMode::Progressive {
                address: 0x6000,
                chunk: 1024,
            },
            &payload,
        )
        .expect("progressive tape");
    let report = tape.report().expect("report");
    assert_eq!(report.entries, 40);
    assert_eq!(report.fixed_length, None);
    let memory = load_dynamic(&tape_blocks(&tape), report);
    assert_eq!(&memory[0x6000..0x6000 + 40_000], &payload[..]);
}

#[test]
fn simple_and_instascreen_blocks() {
    let screen = screen();
    let tape = Master::default()
        .prepare(OutputMode::Instascreen, &screen)
        .expect("instascreen tape");
    let blocks = tape_blocks(&tape);
    assert_eq!(blocks.len(), 1);
    assert_eq!(unpack(&blocks[0]), screen);
    assert_eq!(turbo_fields(&blocks[0]), (2046, 250));

    let timing = Timing::new(Speed::Rom, PilotTone::Short, 1000).expect("timing");
    let tape = Master::new(timing)
        .prepare(OutputMode::Simple { reverse: true }, b"hello")
        .expect("simple tape");
    let blocks = tape_blocks(&tape);
    assert_eq!(unpack(&blocks[0]), b"olleh");
    let TapeBlock::Turbo {
        pilot_pulse,
        pilot_count,
        pause_ms,
        ..
    } = blocks[0]
    else {
        panic!("expected a turbo block");
    };
    assert_eq!((pilot_pulse, pilot_count, pause_ms), (2168, 600, 1000));
}

#[test]
fn writer_appends_to_existing_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("game.tzx");
    let first = Master::default()
        .prepare(OutputMode::default(), b"loader")
        .expect("tape");
    let second = Master::default()
        .prepare(OutputMode::default(), b"game")
        .expect("tape");

    let file = std::fs::File::create(&path).expect("create");
    TapeWriter::new(file).write(&first).expect("write");
    let file = std::fs::OpenOptions::new()
        .append(true)
        .open(&path)
        .expect("open for append");
    TapeWriter::appending(file).write(&second).expect("append");

    let blocks = parse_tzx(&std::fs::read(&path).expect("read back"));
    assert_eq!(blocks.len(), 2);
    assert_eq!(unpack(&blocks[0]), b"loader");
    assert_eq!(unpack(&blocks[1]), b"game");
}

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

fn loader_tzx() -> Command {
    Command::new(env!("CARGO_BIN_EXE_loader-tzx"))
}

#[test]
fn cli_masters_fancy_screen_with_report() {
    let dir = tempfile::tempdir().expect("temp dir");
    let scr = dir.path().join("title.scr");
    let tzx = dir.path().join("title.tzx");
    let json = dir.path().join("table.json");
    std::fs::write(&scr, screen()).expect("write screen");

    let status = loader_tzx()
        .arg("--fancy")
        .arg("linear-ttb")
        .arg("-q")
        .arg("--output")
        .arg(&tzx)
        .arg("--report")
        .arg(&json)
        .arg(&scr)
        .status()
        .expect("run loader-tzx");
    assert!(status.success());

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json).expect("report")).expect("json");
    assert_eq!(report["fixed_length"], 32);
    assert_eq!(report["entries"], 216);
    assert_eq!(report["forwards_only"], true);

    let blocks = parse_tzx(&std::fs::read(&tzx).expect("tzx"));
    assert_eq!(blocks.len(), 218);
}

#[test]
fn cli_appends_and_concatenates_inputs() {
    let dir = tempfile::tempdir().expect("temp dir");
    let a = dir.path().join("a.bin");
    let b = dir.path().join("b.bin");
    let tzx = dir.path().join("out.tzx");
    std::fs::write(&a, b"abc").expect("write a");
    std::fs::write(&b, b"def").expect("write b");

    for _ in 0..2 {
        let status = loader_tzx()
            .args(["-q", "--output"])
            .arg(&tzx)
            .arg(&a)
            .arg(&b)
            .status()
            .expect("run loader-tzx");
        assert!(status.success());
    }

    let blocks = parse_tzx(&std::fs::read(&tzx).expect("tzx"));
    assert_eq!(blocks.len(), 2);
    assert!(blocks.iter().all(|b| unpack(b) == b"abcdef"));
}

#[test]
fn cli_rejects_bad_input_without_output() {
    let dir = tempfile::tempdir().expect("temp dir");
    let scr = dir.path().join("short.scr");
    let tzx = dir.path().join("never.tzx");
    std::fs::write(&scr, [0u8; 100]).expect("write screen");

    let output = loader_tzx()
        .args(["--instascreen", "--output"])
        .arg(&tzx)
        .arg(&scr)
        .output()
        .expect("run loader-tzx");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("6912"));
    assert!(!tzx.exists());

    let output = loader_tzx()
        .args(["--speed", "rom", "--clicks", "--output"])
        .arg(&tzx)
        .arg(&scr)
        .output()
        .expect("run loader-tzx");
    assert!(!output.status.success());
    assert!(!tzx.exists());
}
