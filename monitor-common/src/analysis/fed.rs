// monitor-common/src/analysis/fed.rs
// ====
// Fed communication analysis
// Keyword tone scoring, policy themes and speaker weighting
// ====

use crate::data::types::{CommunicationType, FedCommunication};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use tracing::debug;

const HAWKISH_TERMS: &[(&str, f64)] = &[
    ("inflation risk", 2.0),
    ("price stability", 1.5),
    ("vigilant", 1.5),
    ("restrictive", 2.0),
    ("higher rates", 1.5),
    ("upside risk", 1.0),
];

const DOVISH_TERMS: &[(&str, f64)] = &[
    ("patient", -1.0),
    ("accommodative", -2.0),
    ("gradual", -1.0),
    ("downside risk", -1.0),
    ("carefully", -0.5),
    ("mindful", -0.5),
];

const BIAS_BAND: f64 = 0.3;
const SHIFT_BAND: f64 = 0.1;
const SHIFT_WINDOW: usize = 3;
const MAX_PRIOR: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyBias {
    Hawkish,
    Dovish,
    Neutral,
}

impl PolicyBias {
    pub fn from_score(score: f64) -> Self {
        if score > BIAS_BAND {
            PolicyBias::Hawkish
        } else if score < -BIAS_BAND {
            PolicyBias::Dovish
        } else {
            PolicyBias::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyBias::Hawkish => "hawkish",
            PolicyBias::Dovish => "dovish",
            PolicyBias::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationShift {
    Consistent,
    MoreHawkish,
    MoreDovish,
    InsufficientHistory,
}

impl CommunicationShift {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommunicationShift::Consistent => "consistent",
            CommunicationShift::MoreHawkish => "more_hawkish",
            CommunicationShift::MoreDovish => "more_dovish",
            CommunicationShift::InsufficientHistory => "insufficient_history",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerWeight {
    Low,
    Medium,
    High,
    VeryHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerBias {
    Hawkish,
    Dovish,
    Centrist,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyTheme {
    Inflation,
    Employment,
    FinancialStability,
    Growth,
}

impl PolicyTheme {
    const ALL: [PolicyTheme; 4] = [
        PolicyTheme::Inflation,
        PolicyTheme::Employment,
        PolicyTheme::FinancialStability,
        PolicyTheme::Growth,
    ];

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            PolicyTheme::Inflation => &[
                "price stability",
                "inflation expectations",
                "transitory",
                "persistent",
            ],
            PolicyTheme::Employment => &[
                "maximum employment",
                "labor market",
                "wage growth",
                "job market",
            ],
            PolicyTheme::FinancialStability => &[
                "financial conditions",
                "market functioning",
                "systemic risk",
                "financial stability",
            ],
            PolicyTheme::Growth => &["economic growth", "gdp", "economic activity", "outlook"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyTheme::Inflation => "inflation",
            PolicyTheme::Employment => "employment",
            PolicyTheme::FinancialStability => "financial_stability",
            PolicyTheme::Growth => "growth",
        }
    }
}

// --- FOMC roster ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Seat {
    Board,
    NewYork,
    Regional,
}

#[derive(Debug, Clone, Copy)]
pub struct FomcMember {
    pub id: &'static str,
    pub name: &'static str,
    pub role: &'static str,
    pub weight: SpeakerWeight,
    pub bias: SpeakerBias,
    seat: Seat,
}

macro_rules! member {
    ($id:expr, $name:expr, $role:expr, $weight:ident, $bias:ident, $seat:ident) => {
        FomcMember {
            id: $id,
            name: $name,
            role: $role,
            weight: SpeakerWeight::$weight,
            bias: SpeakerBias::$bias,
            seat: Seat::$seat,
        }
    };
}

const FOMC_MEMBERS: &[FomcMember] = &[
    member!("POWELL", "Jerome Powell", "Chair", VeryHigh, Centrist, Board),
    member!("JEFFERSON", "Philip Jefferson", "Vice Chair", High, Dovish, Board),
    member!("COOK", "Lisa Cook", "Governor", High, Dovish, Board),
    member!("BARR", "Michael Barr", "Vice Chair for Supervision", High, Centrist, Board),
    member!("WALLER", "Christopher Waller", "Governor", High, Hawkish, Board),
    member!("KUGLER", "Adriana Kugler", "Governor", High, Dovish, Board),
    member!("WILLIAMS", "John Williams", "President", High, Centrist, NewYork),
    member!("GOOLSBEE", "Austan Goolsbee", "President", Medium, Dovish, Regional),
    member!("BOSTIC", "Raphael Bostic", "President", Medium, Centrist, Regional),
    member!("MESTER", "Loretta Mester", "President", Medium, Hawkish, Regional),
    member!("BARKIN", "Thomas Barkin", "President", Medium, Centrist, Regional),
    member!("DALY", "Mary Daly", "President", Medium, Dovish, Regional),
    member!("HARKER", "Patrick Harker", "President", Medium, Centrist, Regional),
    member!("LOGAN", "Lorie Logan", "President", Medium, Hawkish, Regional),
    member!("KASHKARI", "Neel Kashkari", "President", Medium, Dovish, Regional),
    member!("MUSALEM", "Alberto Musalem", "President", Medium, Unknown, Regional),
    member!("COLLINS", "Susan Collins", "President", Medium, Centrist, Regional),
    member!("SCHMID", "Jeffrey Schmid", "President", Medium, Centrist, Regional),
];

const ROTATING_VOTERS: &[(i32, &[&str])] = &[
    (2024, &["BOSTIC", "GOOLSBEE", "MESTER", "WILLIAMS"]),
    (2025, &["BARKIN", "DALY", "HARKER", "LOGAN"]),
];

impl FomcMember {
    /// Finds the member named in a speaker string, by full name first, then
    /// by surname.
    pub fn lookup(speaker: &str) -> Option<&'static FomcMember> {
        let speaker = speaker.to_lowercase();
        FOMC_MEMBERS
            .iter()
            .find(|m| speaker.contains(&m.name.to_lowercase()))
            .or_else(|| {
                FOMC_MEMBERS
                    .iter()
                    .find(|m| speaker.split(|c: char| !c.is_alphabetic()).any(|w| w == m.id.to_lowercase()))
            })
    }

    pub fn is_voter(&self, year: i32) -> bool {
        match self.seat {
            Seat::Board | Seat::NewYork => true,
            Seat::Regional => ROTATING_VOTERS
                .iter()
                .find(|(y, _)| *y == year)
                .is_some_and(|(_, voters)| voters.contains(&self.id)),
        }
    }
}

pub fn speaker_weight(speaker: &str) -> SpeakerWeight {
    FomcMember::lookup(speaker)
        .map(|m| m.weight)
        .unwrap_or(SpeakerWeight::Low)
}

// =================================================================
// Analysis
// =================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FedAnalysis {
    pub speaker: String,
    pub title: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub kind: CommunicationType,
    /// -1 very dovish .. 1 very hawkish.
    pub hawkish_score: f64,
    pub confidence: f64,
    pub policy_bias: PolicyBias,
    pub themes: BTreeSet<PolicyTheme>,
    pub shift: CommunicationShift,
    pub speaker_weight: SpeakerWeight,
    pub voter: bool,
}

impl FedAnalysis {
    pub fn is_significant(&self) -> bool {
        self.policy_bias != PolicyBias::Neutral
            || self.speaker_weight >= SpeakerWeight::High
            || matches!(
                self.kind,
                CommunicationType::FomcStatement | CommunicationType::FomcMinutes
            )
    }
}

/// Score and confidence from weighted keyword counts.
pub fn speech_metrics(text: &str) -> (f64, f64) {
    let text = text.to_lowercase();
    let mut total_score = 0.0;
    let mut matches = 0usize;

    for (term, weight) in HAWKISH_TERMS.iter().chain(DOVISH_TERMS) {
        let count = text.matches(term).count();
        total_score += count as f64 * weight;
        matches += count;
    }

    let score = (total_score / matches.max(1) as f64).clamp(-1.0, 1.0);
    let confidence = (matches as f64 / 10.0).min(1.0);
    (score, confidence)
}

pub fn policy_themes(text: &str) -> BTreeSet<PolicyTheme> {
    let text = text.to_lowercase();
    PolicyTheme::ALL
        .into_iter()
        .filter(|theme| theme.keywords().iter().any(|k| text.contains(k)))
        .collect()
}

/// Keeps recent tone scores so each new communication can be compared with
/// the ones before it.
#[derive(Debug, Default)]
pub struct FedAnalyzer {
    prior_scores: VecDeque<f64>,
}

impl FedAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analyze(&mut self, communication: &FedCommunication) -> FedAnalysis {
        let text = match &communication.full_text {
            Some(body) => format!("{} {}", communication.title, body),
            None => communication.title.clone(),
        };

        let (hawkish_score, confidence) = speech_metrics(&text);
        let shift = self.shift_against_prior(hawkish_score);
        let member = FomcMember::lookup(&communication.speaker);

        self.prior_scores.push_back(hawkish_score);
        if self.prior_scores.len() > MAX_PRIOR {
            self.prior_scores.pop_front();
        }

        debug!(
            speaker = %communication.speaker,
            score = hawkish_score,
            "Fed communication scored"
        );

        FedAnalysis {
            speaker: communication.speaker.clone(),
            title: communication.title.clone(),
            url: communication.url.clone(),
            published_at: communication.published_at,
            kind: communication.kind,
            hawkish_score,
            confidence,
            policy_bias: PolicyBias::from_score(hawkish_score),
            themes: policy_themes(&text),
            shift,
            speaker_weight: member.map(|m| m.weight).unwrap_or(SpeakerWeight::Low),
            voter: member.is_some_and(|m| m.is_voter(communication.published_at.year())),
        }
    }

    fn shift_against_prior(&self, score: f64) -> CommunicationShift {
        if self.prior_scores.is_empty() {
            return CommunicationShift::InsufficientHistory;
        }
        let recent: Vec<f64> = self
            .prior_scores
            .iter()
            .rev()
            .take(SHIFT_WINDOW)
            .copied()
            .collect();
        let avg = recent.iter().sum::<f64>() / recent.len() as f64;
        let delta = score - avg;

        if delta.abs() < SHIFT_BAND {
            CommunicationShift::Consistent
        } else if delta > 0.0 {
            CommunicationShift::MoreHawkish
        } else {
            CommunicationShift::MoreDovish
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn communication(speaker: &str, title: &str, text: &str) -> FedCommunication {
        FedCommunication {
            published_at: Utc.with_ymd_and_hms(2025, 3, 4, 15, 0, 0).unwrap(),
            title: title.into(),
            url: format!("https://www.federalreserve.gov/{}", title.len()),
            speaker: speaker.into(),
            source: "speeches".into(),
            kind: CommunicationType::Speech,
            full_text: Some(text.into()),
        }
    }

    #[test]
    fn test_speech_metrics() {
        let (score, confidence) = speech_metrics("We remain vigilant. Policy is restrictive.");
        assert!((score - 1.0).abs() < 1e-9);
        assert!((confidence - 0.2).abs() < 1e-9);

        let (score, _) = speech_metrics("We can be patient and act carefully.");
        // (-1.0 - 0.5) / 2
        assert!((score + 0.75).abs() < 1e-9);
        assert_eq!(PolicyBias::from_score(score), PolicyBias::Dovish);

        assert_eq!(speech_metrics("Nothing to see"), (0.0, 0.0));
    }

    #[test]
    fn test_themes() {
        let themes = policy_themes("The labor market is tight and the outlook for GDP is firm.");
        assert!(themes.contains(&PolicyTheme::Employment));
        assert!(themes.contains(&PolicyTheme::Growth));
        assert!(!themes.contains(&PolicyTheme::Inflation));
    }

    #[test]
    fn test_speaker_lookup() {
        assert_eq!(speaker_weight("Chair Jerome H. Powell"), SpeakerWeight::VeryHigh);
        assert_eq!(speaker_weight("Governor Christopher J. Waller"), SpeakerWeight::High);
        assert_eq!(speaker_weight("Waller"), SpeakerWeight::High);
        assert_eq!(speaker_weight("Someone Else"), SpeakerWeight::Low);

        let logan = FomcMember::lookup("Lorie Logan").unwrap();
        assert!(logan.is_voter(2025));
        assert!(!logan.is_voter(2024));
        assert!(FomcMember::lookup("Powell").unwrap().is_voter(2030));
    }

    #[test]
    fn test_shift_tracking() {
        let mut analyzer = FedAnalyzer::new();
        let first = analyzer.analyze(&communication("Powell", "Outlook", "We remain patient."));
        assert_eq!(first.shift, CommunicationShift::InsufficientHistory);

        let second = analyzer.analyze(&communication(
            "Powell",
            "Outlook again",
            "Policy must stay restrictive given inflation risk.",
        ));
        assert_eq!(second.shift, CommunicationShift::MoreHawkish);
        assert_eq!(second.policy_bias, PolicyBias::Hawkish);
        assert!(second.voter);
        assert!(second.is_significant());

        let third = analyzer.analyze(&communication("Powell", "Same", "Policy is restrictive."));
        // Average of prior (-1, 1) is 0, so +1 is more hawkish.
        assert_eq!(third.shift, CommunicationShift::MoreHawkish);
    }
}
