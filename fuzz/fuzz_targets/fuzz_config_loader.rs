#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing and validation must reject bad input with errors, never panics.
    if let Ok(cfg) = tec_config::load_toml(data) {
        let _ = cfg.validate();
    }
    let _ = tec_config::load_profile_toml(data);
});
