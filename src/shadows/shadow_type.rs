use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// Shadow filtering algorithm the deferred lighting shader should use.
/// The ordinal is published as the `shadowType` integer uniform.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadowType {
    /// Hard lookup in the renderer's own shadow map
    #[default]
    Builtin = 0,
    /// Percentage-closer filtering
    Pcf = 1,
    /// Exponential shadow map
    Esm = 2,
    /// Variance shadow map
    Vsm = 3,
    /// Exponential variance shadow map
    Evsm = 4,
    /// Exponential shadow map reconstructed from the raw depth map
    MyEsm = 5,
}

impl ShadowType {
    pub const ALL: [ShadowType; 6] = [
        ShadowType::Builtin,
        ShadowType::Pcf,
        ShadowType::Esm,
        ShadowType::Vsm,
        ShadowType::Evsm,
        ShadowType::MyEsm,
    ];

    pub fn ordinal(self) -> i32 {
        self as i32
    }

    pub fn from_ordinal(ordinal: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.ordinal() == ordinal)
    }

    pub fn name(self) -> &'static str {
        match self {
            ShadowType::Builtin => "builtin",
            ShadowType::Pcf => "pcf",
            ShadowType::Esm => "esm",
            ShadowType::Vsm => "vsm",
            ShadowType::Evsm => "evsm",
            ShadowType::MyEsm => "my_esm",
        }
    }
}

impl Display for ShadowType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ShadowType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.name() == lower)
            .ok_or_else(|| format!("unknown shadow type '{}'", s))
    }
}
