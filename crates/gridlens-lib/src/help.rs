use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HelpKey {
    StlIntro,
    StlInterpretation,
    SpectrogramIntro,
    SpectrogramKeyFrequencies,
}

impl HelpKey {
    pub const ALL: [HelpKey; 4] = [
        HelpKey::StlIntro,
        HelpKey::StlInterpretation,
        HelpKey::SpectrogramIntro,
        HelpKey::SpectrogramKeyFrequencies,
    ];
}

pub fn help_text(key: HelpKey) -> &'static str {
    match key {
        HelpKey::StlIntro => {
            "STL decomposes a time series into three components:\n\
             - Trend: Long-term progression\n\
             - Seasonal: Repeating patterns (daily, weekly, etc.)\n\
             - Residual: Remainder after removing trend and seasonal"
        }
        HelpKey::StlInterpretation => {
            "- Trend: Shows long-term changes in production\n\
             - Seasonal: Reveals daily/weekly patterns\n\
             - Residual: Contains irregular variations and noise"
        }
        HelpKey::SpectrogramIntro => {
            "A spectrogram shows how frequency content changes over time, revealing:\n\
             - Daily cycles: ~1/24 cycles/hour\n\
             - Weekly patterns: ~1/168 cycles/hour\n\
             - Seasonal shifts: Long-term frequency changes"
        }
        HelpKey::SpectrogramKeyFrequencies => {
            "- Daily cycle: 0.042 cycles/hour (1/24)\n\
             - Weekly cycle: 0.006 cycles/hour (1/168)\n\
             - Brighter colors: Higher power at that frequency/time"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_key_has_text() {
        for key in HelpKey::ALL {
            assert!(!help_text(key).is_empty());
        }
        assert!(help_text(HelpKey::StlIntro).starts_with("STL decomposes"));
        // Line continuations strip the leading indentation.
        assert!(help_text(HelpKey::StlInterpretation).contains("\n- Seasonal"));
    }
}
