/// Version of the software, as recorded in @PG records and the startup log line.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
