use crate::state::ScreenState;

/// Keyword rule over OCR text: fires when every `require` keyword is present
/// and no `forbid` keyword is. Matching is case-sensitive substring search.
#[derive(Debug)]
pub struct ClassificationRule {
    pub state: ScreenState,
    pub require: &'static [&'static str],
    pub forbid: &'static [&'static str],
}

impl ClassificationRule {
    pub fn matches(&self, text: &str) -> bool {
        self.require.iter().all(|keyword| text.contains(keyword))
            && !self.forbid.iter().any(|keyword| text.contains(keyword))
    }
}

/// Rules in priority order. Earlier rules win when several fire.
pub static RULES: [ClassificationRule; 6] = [
    ClassificationRule {
        state: ScreenState::WaitingToStart,
        require: &["Waiting To Start"],
        forbid: &[],
    },
    ClassificationRule {
        state: ScreenState::RaceResults,
        require: &["Race", "Results"],
        forbid: &[],
    },
    ClassificationRule {
        state: ScreenState::LiveGame,
        require: &["Alienated"],
        forbid: &["Play Again"],
    },
    ClassificationRule {
        state: ScreenState::GameTypeSelect,
        require: &["Build:"],
        forbid: &[],
    },
    ClassificationRule {
        state: ScreenState::RaceSelect,
        require: &["Race", "Standard"],
        forbid: &["Play"],
    },
    ClassificationRule {
        state: ScreenState::RaceSelectPlay,
        require: &["Race", "Standard", "Play"],
        forbid: &[],
    },
];

/// Evaluate every rule independently against `text`.
/// Returns the states of all firing rules, in rule order.
pub fn classify_text(text: &str) -> Vec<ScreenState> {
    RULES
        .iter()
        .filter(|rule| rule.matches(text))
        .inspect(|rule| tracing::debug!("text matches rule for '{}'", rule.state))
        .map(|rule| rule.state)
        .collect()
}
