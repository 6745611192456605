/// Bootstraps `env_logger` the same way the teacher's own binaries do: force colorized output
/// on before handing off to `RUST_LOG`-driven filtering. A consuming application's own entry
/// point is expected to call this once, near the top of `main`; this crate never calls it
/// itself since it has no binary of its own (spec §1: the RPC/CLI surface is external).
pub fn init() {
    std::env::set_var("RUST_LOG_STYLE", "always");
    env_logger::init();
}
