use std::io::Write;
use std::time::Instant;

/// Timestamped `env_logger` setup. `RUST_LOG` still overrides the default
/// filter.
pub fn init_logging(debug: bool) {
    let filter = if debug { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} [{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        })
        .init();
}

const SLOW_OPERATION_MS: u128 = 5_000;

/// Measures an operation and warns when it was slow.
pub struct Timer {
    name: String,
    start: Instant,
}

impl Timer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.start.elapsed().as_millis()
    }

    pub fn debug(&self, request_id: &str) {
        log::debug!(
            "[{}] {} completed in {}ms",
            request_id,
            self.name,
            self.elapsed_ms()
        );
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let elapsed = self.elapsed_ms();
        if elapsed > SLOW_OPERATION_MS {
            log::warn!("{} took {}ms (slow!)", self.name, elapsed);
        }
    }
}
