use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Série temporelle d'une sortie nommée : une ligne de `width` valeurs par frame.
///
/// # Example
/// ```
/// use lx_core::timeline::OutputSeries;
/// let mut series = OutputSeries::new("ShortTermLoudness", 1);
/// series.push_frame(&[0.5]).unwrap();
/// assert_eq!(series.len(), 1);
/// assert_eq!(series.frame(0), Some(&[0.5][..]));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputSeries {
    name: String,
    width: usize,
    /// Row-major, `len() * width` valeurs.
    values: Vec<f32>,
}

impl OutputSeries {
    /// Série vide.
    #[must_use]
    pub fn new(name: &str, width: usize) -> Self {
        Self {
            name: name.to_string(),
            width,
            values: Vec::new(),
        }
    }

    /// Ajoute une frame.
    ///
    /// # Errors
    /// Returns [`CoreError::Shape`] if `values.len() != width`.
    pub fn push_frame(&mut self, values: &[f32]) -> Result<(), CoreError> {
        if values.len() != self.width {
            return Err(CoreError::Shape {
                output: self.name.clone(),
                expected: self.width,
                actual: values.len(),
            });
        }
        self.values.extend_from_slice(values);
        Ok(())
    }

    /// Output name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Values per frame.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of frames stored.
    #[must_use]
    pub fn len(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.values.len() / self.width
        }
    }

    /// `true` if no frame was stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Valeurs de la frame `index`.
    #[must_use]
    pub fn frame(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.width)?;
        self.values.get(start..start + self.width)
    }

    /// Toutes les valeurs, row-major.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Une valeur scalaire par frame : la valeur elle-même si `width == 1`,
    /// la somme de la ligne sinon.
    pub fn scalars(&self) -> impl Iterator<Item = f32> + '_ {
        self.values
            .chunks(self.width.max(1))
            .map(|row| row.iter().sum::<f32>())
    }

    /// Vide la série en gardant la capacité.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    fn reserve_frames(&mut self, frames: usize) {
        self.values.reserve(frames * self.width);
    }
}

/// Résumé statistique d'une série (sur ses valeurs scalaires).
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SeriesStats {
    /// Minimum.
    pub min: f32,
    /// Maximum.
    pub max: f32,
    /// Moyenne arithmétique.
    pub mean: f32,
    /// Temps (s, décalage inclus) du maximum.
    pub peak_time: f64,
}

/// Une timeline complète des sorties d'un modèle sur un signal.
///
/// Le temps de la frame `k` vaut `k * hop_size / sample_rate + frame_time_offset`.
/// Le décalage n'intervient que dans les timestamps, jamais dans les valeurs.
///
/// # Example
/// ```
/// use lx_core::timeline::LoudnessTimeline;
/// let timeline = LoudnessTimeline::new(32000.0, 32, -0.064, &[("InstantaneousLoudness", 1)]);
/// assert!((timeline.frame_time(1000) - (1.0 - 0.064)).abs() < 1e-9);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoudnessTimeline {
    /// Une série par sortie demandée, dans l'ordre de la requête.
    pub series: Vec<OutputSeries>,
    /// Sample rate of the analysed signal.
    pub sample_rate: f32,
    /// Avance entre deux frames, en échantillons.
    pub hop_size: usize,
    /// Décalage ajouté à chaque timestamp (s).
    pub frame_time_offset: f64,
}

impl LoudnessTimeline {
    /// Timeline vide pour les sorties `(nom, largeur)`.
    #[must_use]
    pub fn new(
        sample_rate: f32,
        hop_size: usize,
        frame_time_offset: f64,
        outputs: &[(&str, usize)],
    ) -> Self {
        Self {
            series: outputs
                .iter()
                .map(|&(name, width)| OutputSeries::new(name, width))
                .collect(),
            sample_rate,
            hop_size,
            frame_time_offset,
        }
    }

    /// Nombre de frames (identique pour toutes les séries).
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.series.first().map_or(0, OutputSeries::len)
    }

    /// Durée d'une avance en secondes.
    #[must_use]
    pub fn hop_duration(&self) -> f64 {
        self.hop_size as f64 / f64::from(self.sample_rate)
    }

    /// Timestamp de la frame `index`, décalage inclus.
    #[must_use]
    pub fn frame_time(&self, index: usize) -> f64 {
        index as f64 * self.hop_duration() + self.frame_time_offset
    }

    /// Tous les timestamps.
    #[must_use]
    pub fn times(&self) -> Vec<f64> {
        (0..self.frame_count()).map(|i| self.frame_time(i)).collect()
    }

    /// Série par nom.
    ///
    /// # Errors
    /// Returns [`CoreError::UnknownOutput`] if no series has this name.
    pub fn series(&self, name: &str) -> Result<&OutputSeries, CoreError> {
        self.series
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| CoreError::UnknownOutput {
                name: name.to_string(),
                available: self.names(),
            })
    }

    /// Noms des séries.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.series.iter().map(|s| s.name.clone()).collect()
    }

    /// Valeurs de `name` à l'instant `time` (s, même repère que `frame_time`).
    ///
    /// L'index est borné aux frames disponibles, comme une lecture au plus proche.
    ///
    /// # Errors
    /// Returns [`CoreError::UnknownOutput`] if no series has this name.
    pub fn value_at_time(&self, name: &str, time: f64) -> Result<Option<&[f32]>, CoreError> {
        let series = self.series(name)?;
        if series.is_empty() {
            return Ok(None);
        }
        let hop = self.hop_duration();
        let position = ((time - self.frame_time_offset) / hop).round().max(0.0) as usize;
        let index = position.min(series.len() - 1);
        Ok(series.frame(index))
    }

    /// Statistiques d'une série. `None` si elle est vide.
    ///
    /// # Errors
    /// Returns [`CoreError::UnknownOutput`] if no series has this name.
    pub fn stats(&self, name: &str) -> Result<Option<SeriesStats>, CoreError> {
        let series = self.series(name)?;
        if series.is_empty() {
            return Ok(None);
        }

        let mut min = f32::MAX;
        let mut max = f32::MIN;
        let mut sum = 0.0f64;
        let mut peak_index = 0;
        for (i, v) in series.scalars().enumerate() {
            min = min.min(v);
            if v > max {
                max = v;
                peak_index = i;
            }
            sum += f64::from(v);
        }

        Ok(Some(SeriesStats {
            min,
            max,
            mean: (sum / series.len() as f64) as f32,
            peak_time: self.frame_time(peak_index),
        }))
    }

    /// Vide toutes les séries et pré-réserve `frames` lignes.
    pub fn reset(&mut self, frames: usize) {
        for series in &mut self.series {
            series.clear();
            series.reserve_frames(frames);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_timeline(offset: f64) -> LoudnessTimeline {
        let mut timeline =
            LoudnessTimeline::new(1000.0, 10, offset, &[("Level", 1), ("Bands", 2)]);
        for i in 0..5 {
            let v = i as f32;
            timeline.series[0].push_frame(&[v]).expect("width 1");
            timeline.series[1].push_frame(&[v, 1.0]).expect("width 2");
        }
        timeline
    }

    #[test]
    fn push_frame_rejects_wrong_width() {
        let mut series = OutputSeries::new("Bands", 3);
        let err = series.push_frame(&[1.0]).expect_err("width mismatch");
        assert_eq!(
            err,
            CoreError::Shape {
                output: "Bands".into(),
                expected: 3,
                actual: 1
            }
        );
        assert!(series.is_empty());
    }

    #[test]
    fn offset_shifts_times_only() {
        let plain = ramp_timeline(0.0);
        let shifted = ramp_timeline(-0.064);
        assert_eq!(plain.series, shifted.series);
        for (a, b) in plain.times().iter().zip(shifted.times()) {
            assert!((a - b - 0.064).abs() < 1e-12);
        }
    }

    #[test]
    fn value_at_time_clamps() {
        let timeline = ramp_timeline(0.5);
        // frame 2 is at 0.5 + 0.02
        assert_eq!(
            timeline.value_at_time("Level", 0.52).expect("known"),
            Some(&[2.0][..])
        );
        assert_eq!(
            timeline.value_at_time("Level", -10.0).expect("known"),
            Some(&[0.0][..])
        );
        assert_eq!(
            timeline.value_at_time("Level", 10.0).expect("known"),
            Some(&[4.0][..])
        );
    }

    #[test]
    fn stats_use_row_sums() {
        let timeline = ramp_timeline(0.0);
        let stats = timeline.stats("Bands").expect("known").expect("non-empty");
        assert!((stats.min - 1.0).abs() < f32::EPSILON);
        assert!((stats.max - 5.0).abs() < f32::EPSILON);
        assert!((stats.mean - 3.0).abs() < 1e-6);
        assert!((stats.peak_time - 0.04).abs() < 1e-12);
    }

    #[test]
    fn unknown_series_is_an_error() {
        let timeline = ramp_timeline(0.0);
        assert!(matches!(
            timeline.series("Nope"),
            Err(CoreError::UnknownOutput { .. })
        ));
    }

    #[test]
    fn json_export_keeps_series() {
        let timeline = ramp_timeline(-0.064);
        let json = serde_json::to_string(&timeline).expect("serialise");
        let back: LoudnessTimeline = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(back, timeline);
    }
}
