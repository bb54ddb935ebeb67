use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// A live-tunable stage parameter.
///
/// Written by the control side, read by the audio callback once per block.
/// No acknowledgement and no queueing: the last write wins.
#[derive(Debug, Clone)]
pub struct LiveParam(Arc<AtomicU32>);

impl LiveParam {
    pub fn new(value: f32) -> Self {
        Self(Arc::new(AtomicU32::new(value.to_bits())))
    }

    pub fn set(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_value() {
        let param = LiveParam::new(0.8);
        let reader = param.clone();
        param.set(-7.0);
        param.set(3.0);
        assert_eq!(reader.get(), 3.0);
    }
}
