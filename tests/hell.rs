//! HeLL source produced for complete sessions.

use std::io::Read;

use malscope::prelude::*;

const BOUNCER: &[u8] = b"ba&`@]";

fn disassemble(optimize: bool) -> Disassembly {
    let image = ProgramImage::from_mem(BOUNCER.to_vec()).unwrap();
    let traces = vec![vec![65, 66]];
    Disassembler::new(DisassemblerConfig::scripted().with_optimize_entry(optimize))
        .analyse(&image, RunDriver::Scripted { traces: &traces })
        .unwrap()
}

#[test]
fn test_bouncer_source() {
    let source = HellWriter::new().render(&disassemble(true)).unwrap();

    let expected = "\
.CODE
CODE_97:
\tNop
CODE_98:
\tInvalid
CODE_99:
\tJmp

CODE_29459:
\tNop

.DATA
ENTRY:
DATA_0:
\tCODE_99
\tCODE_98
\t?-
\tCODE_97
\t?-
\t?-
\tCODE_29459

";
    assert_eq!(source, expected);
}

#[test]
fn test_long_cycles_follow_the_session_threshold() {
    let image = ProgramImage::from_mem(BOUNCER.to_vec()).unwrap();
    let traces = vec![vec![65, 66]];
    let disassembler =
        Disassembler::new(DisassemblerConfig::scripted().with_long_cycle_threshold(68));
    let disassembly = disassembler
        .analyse(&image, RunDriver::Scripted { traces: &traces })
        .unwrap();

    // cell 97 sits on the 68-cycle, which is now short enough to be spelled out
    let source = disassembler.writer().render(&disassembly).unwrap();
    let line = source.lines().skip_while(|line| *line != "CODE_97:").nth(1).unwrap();
    assert!(line.starts_with("\tNop/"));
    assert_eq!(line.matches('/').count(), 67);

    let source = Disassembler::default().writer().render(&disassembly).unwrap();
    assert_eq!(source, HellWriter::new().render(&disassembly).unwrap());
}

#[test]
fn test_entry_label_follows_the_entry_point() {
    let source = HellWriter::new().render(&disassemble(false)).unwrap();

    // without the optimizer the entry Jmp reads its target from cell 3
    let data = &source[source.find(".DATA").unwrap()..];
    let entry = data.find("ENTRY:").unwrap();
    let tail: Vec<&str> = data[entry..].lines().take(3).collect();
    assert_eq!(tail, ["ENTRY:", "DATA_3:", "\tCODE_97"]);
    assert!(!source.contains("INIT_A"));
}

#[test]
fn test_written_to_file() {
    let disassembly = disassemble(true);
    let dir = tempfile::tempdir().unwrap();
    let program = dir.path().join("bouncer.mb");
    let output = default_output_path(&program);
    assert_eq!(output, dir.path().join("bouncer.hell"));

    let mut file = std::fs::File::create(&output).unwrap();
    HellWriter::new().write(&disassembly, &mut file).unwrap();
    drop(file);

    let mut written = String::new();
    std::fs::File::open(&output)
        .unwrap()
        .read_to_string(&mut written)
        .unwrap();
    assert_eq!(written, HellWriter::new().render(&disassembly).unwrap());
}
