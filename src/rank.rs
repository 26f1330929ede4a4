use serde::Serialize;

/// Badge shown next to the wallet balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RankTier {
    Potato,
    Carrot,
    EarOfCorn,
    Avocado,
    Broccoli,
    Eggplant,
    Cucumber,
    Mushroom,
    PigFace,
    FoxFace,
    LionFace,
    CatFace,
    DogFace,
}

/// Lower bound of each tier, ascending. Potato covers everything above zero.
const THRESHOLDS: [(f64, RankTier); 12] = [
    (100.0, RankTier::Carrot),
    (250.0, RankTier::EarOfCorn),
    (500.0, RankTier::Avocado),
    (1_000.0, RankTier::Broccoli),
    (2_000.0, RankTier::Eggplant),
    (5_000.0, RankTier::Cucumber),
    (10_000.0, RankTier::Mushroom),
    (15_000.0, RankTier::PigFace),
    (20_000.0, RankTier::FoxFace),
    (30_000.0, RankTier::LionFace),
    (50_000.0, RankTier::CatFace),
    (75_000.0, RankTier::DogFace),
];

impl RankTier {
    /// Tier for a total balance in whole coins. Empty or invalid balances have none.
    pub fn for_balance(balance: f64) -> Option<Self> {
        if !balance.is_finite() || balance <= 0.0 {
            return None;
        }
        let tier = THRESHOLDS
            .iter()
            .rev()
            .find(|(min, _)| balance >= *min)
            .map(|(_, tier)| *tier)
            .unwrap_or(RankTier::Potato);
        Some(tier)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Potato => "potato",
            Self::Carrot => "carrot",
            Self::EarOfCorn => "ear-of-corn",
            Self::Avocado => "avocado",
            Self::Broccoli => "broccoli",
            Self::Eggplant => "eggplant",
            Self::Cucumber => "cucumber",
            Self::Mushroom => "mushroom",
            Self::PigFace => "pig-face",
            Self::FoxFace => "fox-face",
            Self::LionFace => "lion-face",
            Self::CatFace => "cat-face",
            Self::DogFace => "dog-face",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Potato => "🥔",
            Self::Carrot => "🥕",
            Self::EarOfCorn => "🌽",
            Self::Avocado => "🥑",
            Self::Broccoli => "🥦",
            Self::Eggplant => "🍆",
            Self::Cucumber => "🥒",
            Self::Mushroom => "🍄",
            Self::PigFace => "🐷",
            Self::FoxFace => "🦊",
            Self::LionFace => "🦁",
            Self::CatFace => "🐱",
            Self::DogFace => "🐶",
        }
    }
}
