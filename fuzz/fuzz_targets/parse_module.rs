#![no_main]

use libfuzzer_sys::fuzz_target;

use wasmload::parser::{self, DumpFormat};

fuzz_target!(|data: &[u8]| {
    // We don't care about the result - we're looking for panics/crashes
    if let Ok(module) = parser::parse(data) {
        let _ = module.to_string(DumpFormat::Details);
    }
});
