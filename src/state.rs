use std::fmt;

use serde::Serialize;

/// On-screen state of the game, as resolved from a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenState {
    WaitingToStart,
    RaceResults,
    LiveGame,
    GameTypeSelect,
    RaceSelect,
    RaceSelectPlay,
    Unknown,
}

/// Label fragments embedded in reference image file names.
/// `Race_Select_Play` must stay ahead of `Race_Select`, which is its prefix.
const REFERENCE_LABELS: [(&str, ScreenState); 6] = [
    ("Game_Type", ScreenState::GameTypeSelect),
    ("Live_Race_Info", ScreenState::LiveGame),
    ("Race_Results", ScreenState::RaceResults),
    ("Waiting_to_Start", ScreenState::WaitingToStart),
    ("Race_Select_Play", ScreenState::RaceSelectPlay),
    ("Race_Select", ScreenState::RaceSelect),
];

impl ScreenState {
    /// Map a reference image label (its file name) to the state it depicts.
    /// Labels without a known fragment map to `Unknown`.
    pub fn from_reference_label(label: &str) -> Self {
        REFERENCE_LABELS
            .iter()
            .find(|(fragment, _)| label.contains(fragment))
            .map(|&(_, state)| state)
            .unwrap_or(ScreenState::Unknown)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ScreenState::WaitingToStart => "Waiting to Start",
            ScreenState::RaceResults => "Race Results",
            ScreenState::LiveGame => "Live Game",
            ScreenState::GameTypeSelect => "Game Type Select",
            ScreenState::RaceSelect => "Race Select",
            ScreenState::RaceSelectPlay => "Race Select Play",
            ScreenState::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ScreenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
