use rustfft::num_complex::Complex;

/// One complex baseband sample
pub type IqSample = Complex<f64>;

/// The raw sample pair as it comes off the receiver's ADC
pub type RawIq = Complex<i16>;

/// A single capture's worth of IQ samples
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IqBlock {
    samples: Vec<IqSample>,
}

impl IqBlock {
    pub fn new(samples: Vec<IqSample>) -> Self {
        Self { samples }
    }

    /// Build a block from raw ADC words, scaling both channels by the block length
    pub fn from_raw(raw: &[RawIq]) -> Self {
        let n = raw.len() as f64;
        let samples = raw
            .iter()
            .map(|s| IqSample::new(s.re as f64 / n, s.im as f64 / n))
            .collect();
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[IqSample] {
        &self.samples
    }
}

impl From<Vec<IqSample>> for IqBlock {
    fn from(samples: Vec<IqSample>) -> Self {
        Self::new(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_scaling() {
        let raw = [RawIq::new(4, -8), RawIq::new(0, 2), RawIq::new(-4, 0), RawIq::new(8, 6)];
        let block = IqBlock::from_raw(&raw);
        assert_eq!(block.len(), 4);
        assert_eq!(block.samples()[0], IqSample::new(1.0, -2.0));
        assert_eq!(block.samples()[3], IqSample::new(2.0, 1.5));
    }
}
