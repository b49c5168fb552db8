use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Number of classes the classifier distinguishes.
pub const LABEL_COUNT: usize = 5;

/// Diagnostic classes, in model output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Pneumonia,
    Covid,
    #[serde(rename = "Lung_Opacity")]
    LungOpacity,
    Normal,
    Tuberculosis,
}

impl Label {
    /// All labels, indexed by model output position.
    pub const ALL: [Self; LABEL_COUNT] = [
        Self::Pneumonia,
        Self::Covid,
        Self::LungOpacity,
        Self::Normal,
        Self::Tuberculosis,
    ];

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pneumonia => "Pneumonia",
            Self::Covid => "Covid",
            Self::LungOpacity => "Lung_Opacity",
            Self::Normal => "Normal",
            Self::Tuberculosis => "Tuberculosis",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Label {
    type Err = Error;

    /// Case-insensitive; spaces and dashes are accepted in place of `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| Error::UnknownLabel(s.to_string()))
    }
}
