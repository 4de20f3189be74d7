//! Library surface for `clusterd`'s integration-style tests: the module tree
//! is identical to the binary's, just exposed so `#[cfg(test)]` code and
//! handler tests can reach it without going through `main`.

pub mod config;
pub mod endpoints;
pub mod errors;
pub mod health;
pub mod runtime;
pub mod scheduler;
pub mod store;

#[cfg(test)]
mod test_setup {
    use std::sync::Once;
    static INIT: Once = Once::new();

    #[ctor::ctor]
    fn init_tracing() {
        INIT.call_once(|| {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_test_writer()
                .init();
        });
    }
}
