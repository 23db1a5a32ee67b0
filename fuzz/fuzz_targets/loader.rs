#![no_main]

use libfuzzer_sys::fuzz_target;
use malscope::{file::ProgramImage, vm::VmState};

fuzz_target!(|data: &[u8]| {
    if let Ok(image) = ProgramImage::from_mem(data.to_vec()) {
        let _ = VmState::load(&image);
    }
});
