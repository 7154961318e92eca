// Library root: the event engine and worker pool, exposed for the binary and
// the integration tests.

pub mod engine;
pub mod pool;
