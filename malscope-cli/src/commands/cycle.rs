use anyhow::{bail, Context};
use malscope::{
    analysis::{classify_cell, cycle_length},
    vm::{xlat, Opcode, MEMORY_SIZE},
};
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
pub struct CycleMember {
    pub value: u32,
    pub character: char,
    pub instruction: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct CycleInfo {
    pub address: u32,
    pub length: usize,
    pub class: String,
    pub members: Vec<CycleMember>,
}

/// A single character is taken literally, anything else as a decimal cell value.
fn parse_value(value: &str) -> anyhow::Result<u32> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_ascii_digit() => Ok(u32::from(c)),
        _ => value
            .parse()
            .with_context(|| format!("invalid cell value: {value}")),
    }
}

pub fn run(value: &str, address: u32, global: &GlobalOptions) -> anyhow::Result<()> {
    let value = parse_value(value)?;
    if address as usize >= MEMORY_SIZE {
        bail!("address {address} is outside of memory");
    }
    let (Some(length), Some(class)) = (cycle_length(value), classify_cell(value, address)) else {
        bail!("value {value} is not a printable instruction character");
    };

    let mut members = Vec::with_capacity(length);
    let mut current = value;
    for _ in 0..length {
        members.push(CycleMember {
            value: current,
            character: char::from_u32(current).unwrap_or('?'),
            instruction: Opcode::decode(current, address).map(Opcode::mnemonic),
        });
        current = xlat(current);
    }

    let info = CycleInfo {
        address,
        length,
        class: class.to_string(),
        members,
    };

    print_output(&info, global, |info| {
        println!("Address:  {}", info.address);
        println!("Length:   {}", info.length);
        println!("Emitted:  {}", info.class);
        println!();

        let mut tw = TabWriter::new(&[
            ("Value", Align::Right),
            ("Char", Align::Left),
            ("Instruction", Align::Left),
        ])
        .indent("  ");
        for member in &info.members {
            tw.row(vec![
                member.value.to_string(),
                member.character.to_string(),
                member.instruction.unwrap_or("-").to_string(),
            ]);
        }
        tw.print();
    })
}
