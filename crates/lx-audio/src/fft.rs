use realfft::RealFftPlanner;

/// Pression de référence (Pa) pour les niveaux en dB SPL.
pub const REFERENCE_PRESSURE: f32 = 2e-5;

/// FFT pipeline: windowed real FFT producing a one-sided power spectrum.
///
/// Pre-allocates the FFT plan and scratch buffers for zero-allocation hot path.
/// The spectrum is scaled so that its bin sum equals the mean square of the
/// frame, divided by `REFERENCE_PRESSURE²` (intensity relative to 20 µPa).
///
/// # Example
/// ```
/// use lx_audio::fft::FftPipeline;
/// let fft = FftPipeline::new(2048);
/// assert_eq!(fft.bins(), 1025);
/// ```
pub struct FftPipeline {
    fft_size: usize,
    input_buf: Vec<f32>,
    spectrum_buf: Vec<realfft::num_complex::Complex<f32>>,
    scratch: Vec<realfft::num_complex::Complex<f32>>,
    plan: std::sync::Arc<dyn realfft::RealToComplex<f32>>,
    /// Hann window coefficients.
    window: Vec<f32>,
    /// 1 / (N * Σw² * p_ref²).
    scale: f32,
}

impl FftPipeline {
    /// Create a new FFT pipeline with the given window size.
    ///
    /// # Panics
    /// Panics if `size` is 0.
    #[must_use]
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "FFT size must be > 0");

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(size);

        let input_buf = plan.make_input_vec();
        let spectrum_buf = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();

        // Periodic Hann window
        let window: Vec<f32> = (0..size)
            .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / size as f32).cos()))
            .collect();
        let window_power: f32 = window.iter().map(|w| w * w).sum::<f32>().max(f32::MIN_POSITIVE);
        let scale =
            1.0 / (size as f32 * window_power * REFERENCE_PRESSURE * REFERENCE_PRESSURE);

        Self {
            fft_size: size,
            input_buf,
            spectrum_buf,
            scratch,
            plan,
            window,
            scale,
        }
    }

    /// Process `samples` through windowed FFT and write the power spectrum
    /// (N/2+1 bins) into `out`.
    ///
    /// Missing samples are treated as zeros.
    ///
    /// # Example
    /// ```
    /// use lx_audio::fft::FftPipeline;
    /// let mut fft = FftPipeline::new(256);
    /// let mut power = Vec::new();
    /// fft.power_into(&[0.0f32; 256], &mut power);
    /// assert_eq!(power.len(), 129); // N/2 + 1
    /// assert!(power.iter().all(|&p| p == 0.0));
    /// ```
    pub fn power_into(&mut self, samples: &[f32], out: &mut Vec<f32>) {
        let n = self.fft_size.min(samples.len());

        // Copy and window
        for (i, slot) in self.input_buf.iter_mut().enumerate() {
            *slot = if i < n {
                samples[i] * self.window[i]
            } else {
                0.0
            };
        }

        out.clear();

        // Forward FFT
        if self
            .plan
            .process_with_scratch(&mut self.input_buf, &mut self.spectrum_buf, &mut self.scratch)
            .is_err()
        {
            out.resize(self.spectrum_buf.len(), 0.0);
            return;
        }

        // One-sided power: DC and Nyquist counted once, the rest twice
        let last = self.spectrum_buf.len() - 1;
        let even = self.fft_size % 2 == 0;
        out.extend(self.spectrum_buf.iter().enumerate().map(|(k, c)| {
            let fold = if k == 0 || (even && k == last) { 1.0 } else { 2.0 };
            fold * (c.re * c.re + c.im * c.im) * self.scale
        }));
    }

    /// FFT window size.
    #[must_use]
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of one-sided bins.
    #[must_use]
    pub fn bins(&self) -> usize {
        self.fft_size / 2 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_power_matches_mean_square() {
        let size = 2048;
        let fs = 32000.0f32;
        let amplitude = 0.02f32; // 0.01414 Pa RMS, ~57 dB SPL
        let samples: Vec<f32> = (0..size)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / fs).sin())
            .collect();

        let mut fft = FftPipeline::new(size);
        let mut power = Vec::new();
        fft.power_into(&samples, &mut power);

        let total: f32 = power.iter().sum();
        let expected = amplitude * amplitude / 2.0 / (REFERENCE_PRESSURE * REFERENCE_PRESSURE);
        assert!(
            (total / expected - 1.0).abs() < 0.02,
            "total {total} expected {expected}"
        );

        let peak_bin = power
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map_or(0, |(i, _)| i);
        assert_eq!(peak_bin, 64); // 1000 Hz / (32000 / 2048)
    }

    #[test]
    fn short_input_is_zero_padded() {
        let mut fft = FftPipeline::new(64);
        let mut power = Vec::new();
        fft.power_into(&[1.0; 8], &mut power);
        assert_eq!(power.len(), 33);
        assert!(power[0] > 0.0);
    }
}
