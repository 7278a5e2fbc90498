#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Anything that loads must store back to the same bytes
    if let Ok(module) = wasmkit::load(data) {
        assert_eq!(wasmkit::store(&module), data);
        if let Some(code) = module.code_section() {
            for entry in code.iter() {
                let _ = entry.body.instructions();
            }
        }
    }
});
