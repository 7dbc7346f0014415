use serde::{Deserialize, Serialize};

/// The two result layers the indicator workflow writes for every zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    /// Local climate zone classification of each buffer
    LandCover,
    /// Urban canopy indicators of each buffer
    Indicators,
}

impl ResultKind {
    pub const ALL: [ResultKind; 2] = [ResultKind::LandCover, ResultKind::Indicators];

    pub fn label(&self) -> &'static str {
        match self {
            ResultKind::LandCover => "lcz",
            ResultKind::Indicators => "indicators",
        }
    }
}

impl std::fmt::Display for ResultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
