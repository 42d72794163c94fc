/// Initialize env_logger once. Subsequent calls are no-ops.
///
/// Defaults to `alademux=info` when `RUST_LOG` is unset.
pub fn init_logging() {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "alademux=info,warn");
    }
    let _ = env_logger::Builder::from_default_env()
        .format_timestamp_millis()
        .format_module_path(false)
        .try_init();
}
