use crate::error::CoreError;

/// Sorties nommées d'une frame, pré-allouées et réutilisées d'une frame à l'autre.
///
/// Les scalaires sont des vecteurs de largeur 1.
///
/// # Example
/// ```
/// use lx_core::traits::FrameOutputs;
/// let mut outputs = FrameOutputs::default();
/// outputs.set("InstantaneousLoudness", &[1.0]);
/// assert_eq!(outputs.get("InstantaneousLoudness"), Some(&[1.0][..]));
/// assert!(outputs.get("Missing").is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct FrameOutputs {
    entries: Vec<(String, Vec<f32>)>,
}

impl FrameOutputs {
    /// Écrit (ou remplace) la valeur d'une sortie. Réutilise le buffer existant.
    pub fn set(&mut self, name: &str, values: &[f32]) {
        if let Some((_, slot)) = self.entries.iter_mut().find(|(n, _)| n == name) {
            slot.clear();
            slot.extend_from_slice(values);
        } else {
            self.entries.push((name.to_string(), values.to_vec()));
        }
    }

    /// Valeurs d'une sortie, si présente.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[f32]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Vide les valeurs sans libérer les buffers.
    pub fn clear(&mut self) {
        for (_, values) in &mut self.entries {
            values.clear();
        }
    }

    /// Itère sur les sorties dans l'ordre d'écriture.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }
}

/// Modèle de sonie à état, piloté frame par frame.
///
/// Implémenté par : `DynamicLoudnessModel`. Toute autre unité capable de
/// traiter une frame et d'écrire des sorties nommées convient.
///
/// # Example
/// ```
/// use lx_core::error::CoreError;
/// use lx_core::traits::{FrameOutputs, LoudnessModel};
///
/// struct Energy { ready: bool }
/// impl LoudnessModel for Energy {
///     fn name(&self) -> &str { "Energy" }
///     fn initialize(&mut self, _sample_rate: f32, _hop_size: usize) -> Result<(), CoreError> {
///         self.ready = true;
///         Ok(())
///     }
///     fn is_initialized(&self) -> bool { self.ready }
///     fn frame_len(&self) -> usize { 4 }
///     fn output_names(&self) -> Vec<String> { vec!["Energy".into()] }
///     fn output_width(&self, name: &str) -> Option<usize> { (name == "Energy").then_some(1) }
///     fn process_frame(&mut self, frame: &[f32], outputs: &mut FrameOutputs) -> Result<(), CoreError> {
///         outputs.set("Energy", &[frame.iter().map(|s| s * s).sum()]);
///         Ok(())
///     }
///     fn reset(&mut self) {}
/// }
/// ```
pub trait LoudnessModel {
    /// Nom lisible du modèle.
    fn name(&self) -> &str;

    /// Prépare le modèle pour `sample_rate` Hz et une avance de `hop_size` échantillons.
    ///
    /// # Errors
    /// Returns [`CoreError::Configuration`] if the model cannot run at this rate.
    fn initialize(&mut self, sample_rate: f32, hop_size: usize) -> Result<(), CoreError>;

    /// `true` après un `initialize()` réussi.
    fn is_initialized(&self) -> bool;

    /// `true` si le modèle intègre dans le temps (état inter-frames).
    fn is_dynamic(&self) -> bool {
        true
    }

    /// Longueur de frame requise, en échantillons. Valide après `initialize()`.
    fn frame_len(&self) -> usize;

    /// Noms des sorties produites, dans l'ordre de la chaîne.
    fn output_names(&self) -> Vec<String>;

    /// Largeur (nombre de valeurs par frame) d'une sortie. Valide après `initialize()`.
    fn output_width(&self, name: &str) -> Option<usize>;

    /// Traite exactement `frame_len()` échantillons et écrit les sorties.
    ///
    /// CONTRAT : ne doit pas allouer une fois les buffers de `outputs` en place.
    ///
    /// # Errors
    /// Returns [`CoreError::NotInitialized`] if called before `initialize()`.
    fn process_frame(&mut self, frame: &[f32], outputs: &mut FrameOutputs)
    -> Result<(), CoreError>;

    /// Remet à zéro tout l'état temporel.
    fn reset(&mut self);
}

impl<M: LoudnessModel + ?Sized> LoudnessModel for Box<M> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn initialize(&mut self, sample_rate: f32, hop_size: usize) -> Result<(), CoreError> {
        (**self).initialize(sample_rate, hop_size)
    }

    fn is_initialized(&self) -> bool {
        (**self).is_initialized()
    }

    fn is_dynamic(&self) -> bool {
        (**self).is_dynamic()
    }

    fn frame_len(&self) -> usize {
        (**self).frame_len()
    }

    fn output_names(&self) -> Vec<String> {
        (**self).output_names()
    }

    fn output_width(&self, name: &str) -> Option<usize> {
        (**self).output_width(name)
    }

    fn process_frame(
        &mut self,
        frame: &[f32],
        outputs: &mut FrameOutputs,
    ) -> Result<(), CoreError> {
        (**self).process_frame(frame, outputs)
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_reuses_slot() {
        let mut outputs = FrameOutputs::default();
        outputs.set("A", &[1.0, 2.0]);
        outputs.set("B", &[3.0]);
        outputs.set("A", &[4.0]);
        assert_eq!(outputs.get("A"), Some(&[4.0][..]));
        let names: Vec<&str> = outputs.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn clear_keeps_names() {
        let mut outputs = FrameOutputs::default();
        outputs.set("A", &[1.0]);
        outputs.clear();
        assert_eq!(outputs.get("A"), Some(&[][..]));
    }
}
