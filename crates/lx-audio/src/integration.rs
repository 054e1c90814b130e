use crate::stage::Stage;

/// Coefficient de lissage d'un intégrateur exponentiel.
///
/// `1 - exp(-dt / tau)`, avec `dt` l'intervalle entre deux frames.
///
/// # Example
/// ```
/// use lx_audio::integration::smoothing_coefficient;
/// let a = smoothing_coefficient(0.001, 0.022);
/// assert!(a > 0.0 && a < 0.05);
/// ```
#[must_use]
pub fn smoothing_coefficient(dt_secs: f32, tau_secs: f32) -> f32 {
    if tau_secs <= 0.0 {
        return 1.0;
    }
    1.0 - (-dt_secs / tau_secs).exp()
}

/// Intégrateur temporel avec asymétrie attaque/relâchement.
///
/// Attaque rapide (suit vite les montées), relâchement lent. L'état part de 0 :
/// un son qui démarre monte progressivement en sonie.
///
/// # Example
/// ```
/// use lx_audio::integration::TemporalIntegrator;
/// use lx_audio::stage::Stage;
/// let mut stl = TemporalIntegrator::new("ShortTermLoudness", 0.001, 0.022, 0.050);
/// let mut out = Vec::new();
/// stl.process(&[1.0], &mut out);
/// assert!(out[0] > 0.0 && out[0] < 1.0);
/// ```
pub struct TemporalIntegrator {
    name: &'static str,
    attack: f32,
    release: f32,
    state: f32,
}

impl TemporalIntegrator {
    /// `dt_secs` : intervalle entre frames ; `attack_secs`/`release_secs` : constantes de temps.
    #[must_use]
    pub fn new(name: &'static str, dt_secs: f32, attack_secs: f32, release_secs: f32) -> Self {
        Self {
            name,
            attack: smoothing_coefficient(dt_secs, attack_secs),
            release: smoothing_coefficient(dt_secs, release_secs),
            state: 0.0,
        }
    }

    /// Attack/release smoothing for a single value.
    #[inline(always)]
    fn ar(&self, current: f32, previous: f32) -> f32 {
        let alpha = if current > previous {
            self.attack
        } else {
            self.release
        };
        alpha * current + (1.0 - alpha) * previous
    }
}

impl Stage for TemporalIntegrator {
    fn name(&self) -> &'static str {
        self.name
    }

    fn output_width(&self) -> usize {
        1
    }

    fn process(&mut self, input: &[f32], output: &mut Vec<f32>) {
        let current = input.first().copied().unwrap_or(0.0);
        self.state = self.ar(current, self.state);
        output.clear();
        output.push(self.state);
    }

    fn reset(&mut self) {
        self.state = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(stage: &mut TemporalIntegrator, value: f32, frames: usize) -> f32 {
        let mut out = Vec::new();
        for _ in 0..frames {
            stage.process(&[value], &mut out);
        }
        out[0]
    }

    #[test]
    fn converges_to_steady_input() {
        let mut stage = TemporalIntegrator::new("STL", 0.001, 0.022, 0.050);
        let v = run(&mut stage, 2.0, 500);
        assert!((v - 2.0).abs() < 1e-3);
    }

    #[test]
    fn release_is_slower_than_attack() {
        let mut stage = TemporalIntegrator::new("LTL", 0.001, 0.1, 2.0);
        // 100 ms: one attack time constant
        let up = run(&mut stage, 1.0, 100);
        assert!((up - (1.0 - (-1.0f32).exp())).abs() < 0.01);

        stage.reset();
        run(&mut stage, 1.0, 2000);
        // 100 ms of silence barely moves a 2 s release
        let down = run(&mut stage, 0.0, 100);
        assert!(down > 0.9, "down {down}");
    }

    #[test]
    fn reset_clears_state() {
        let mut stage = TemporalIntegrator::new("STL", 0.001, 0.022, 0.050);
        run(&mut stage, 1.0, 10);
        stage.reset();
        let mut out = Vec::new();
        stage.process(&[0.0], &mut out);
        assert!(out[0].abs() < f32::EPSILON);
    }
}
