const fn unwrap_or_cargo_version(opt: Option<&'static str>) -> &'static str {
    match opt {
        Some(val) => val,
        None => env!("CARGO_PKG_VERSION"),
    }
}

/// Version reported by the binary and used as the default stack version in telemetry.
pub const VERSION: &str = unwrap_or_cargo_version(option_env!("STACK_VERSION"));
