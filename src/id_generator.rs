// Public booking reference generation

use rand::distributions::Alphanumeric;
use rand::Rng;

// Produces fixed-length opaque tokens. Uniqueness is checked by the storage layer.
pub trait IdGenerator: Send + Sync + 'static {
    fn generate(&self, length: usize) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn generate(&self, length: usize) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(length)
            .map(char::from)
            .collect()
    }
}
