//! Item catalog and rarity tiers.
//!
//! The catalog is fixed for the lifetime of the process. Construction
//! validates the invariants every other module relies on: ids are unique and
//! positive, and every rarity tier owns at least one item.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use crate::error::{GachaError, GachaResult};

pub mod weights;

pub use weights::RarityWeights;

/// Rarity tiers, ordered from most common to rarest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RarityTier {
    #[serde(alias = "Common")]
    Common,
    #[serde(alias = "Rare")]
    Rare,
    #[serde(alias = "SuperRare")]
    SuperRare,
    #[serde(alias = "UltraRare")]
    UltraRare,
}

impl RarityTier {
    /// All tiers, most common first
    pub const ALL: [RarityTier; 4] = [
        RarityTier::Common,
        RarityTier::Rare,
        RarityTier::SuperRare,
        RarityTier::UltraRare,
    ];

    /// Order in which the draw engine walks the weight table
    pub const RAREST_FIRST: [RarityTier; 4] = [
        RarityTier::UltraRare,
        RarityTier::SuperRare,
        RarityTier::Rare,
        RarityTier::Common,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Rare => "rare",
            Self::SuperRare => "super-rare",
            Self::UltraRare => "ultra-rare",
        }
    }

    /// Badge text shown on the result card
    pub fn label(&self) -> &'static str {
        match self {
            Self::Common => "ノーマル",
            Self::Rare => "レア",
            Self::SuperRare => "スーパーレア",
            Self::UltraRare => "ウルトラレア",
        }
    }

    /// Glow colour used by the presentation layer (r, g, b)
    pub fn accent_rgb(&self) -> (u8, u8, u8) {
        match self {
            Self::Common => (0, 0, 255),
            Self::Rare => (147, 112, 219),
            Self::SuperRare => (255, 215, 0),
            Self::UltraRare => (255, 105, 180),
        }
    }

    /// Everything above common gets the sparkle overlay
    pub fn has_sparkle(&self) -> bool {
        *self != Self::Common
    }

    pub fn id(&self) -> u32 {
        match self {
            Self::Common => 0,
            Self::Rare => 1,
            Self::SuperRare => 2,
            Self::UltraRare => 3,
        }
    }

    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(Self::Common),
            1 => Some(Self::Rare),
            2 => Some(Self::SuperRare),
            3 => Some(Self::UltraRare),
            _ => None,
        }
    }
}

impl fmt::Display for RarityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A collectible item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: u32,
    pub name: String,
    pub description: String,
    pub image: String,
    pub rarity: RarityTier,
}

/// The fixed set of obtainable items
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<Item>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate or zero ids and empty tiers
    pub fn new(items: Vec<Item>) -> GachaResult<Self> {
        let mut seen = BTreeSet::new();
        for item in &items {
            if item.id == 0 {
                return Err(GachaError::InvalidItemId {
                    name: item.name.clone(),
                });
            }
            if !seen.insert(item.id) {
                return Err(GachaError::DuplicateItemId(item.id));
            }
        }

        for tier in RarityTier::ALL {
            if !items.iter().any(|i| i.rarity == tier) {
                return Err(GachaError::EmptyTier(tier));
            }
        }

        Ok(Self { items })
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.get(id).is_some()
    }

    /// Items of one tier, in catalog order
    pub fn in_tier(&self, tier: RarityTier) -> Vec<&Item> {
        self.items.iter().filter(|i| i.rarity == tier).collect()
    }

    pub fn ids(&self) -> BTreeSet<u32> {
        self.items.iter().map(|i| i.id).collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            items: default_items(),
        }
    }
}

/// On-disk catalog definition (RON)
///
/// ```ron
/// (
///     weights: (common: 60, rare: 25, super_rare: 10, ultra_rare: 5),
///     items: [
///         (id: 1, name: "Sticker", description: "...", image: "/images/a.png", rarity: Common),
///     ],
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDefinition {
    #[serde(default)]
    pub weights: RarityWeights,
    pub items: Vec<Item>,
}

impl CatalogDefinition {
    pub fn from_ron(source: &str) -> GachaResult<Self> {
        ron::from_str(source).map_err(|e| GachaError::Definition(e.to_string()))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> GachaResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| GachaError::Definition(format!("{}: {}", path.display(), e)))?;
        Self::from_ron(&source)
    }

    /// Validate and split into a catalog and its weight table
    pub fn build(self) -> GachaResult<(Catalog, RarityWeights)> {
        self.weights.validate()?;
        let catalog = Catalog::new(self.items)?;
        Ok((catalog, self.weights))
    }
}

fn item(id: u32, name: &str, description: &str, image: &str, rarity: RarityTier) -> Item {
    Item {
        id,
        name: name.to_string(),
        description: description.to_string(),
        image: image.to_string(),
        rarity,
    }
}

/// The seven items sold on the promo site
pub fn default_items() -> Vec<Item> {
    use RarityTier::*;
    vec![
        item(
            1,
            "きょうへいステッカー",
            "定番のきょうへいステッカー。配信でよく使われるリアクション顔です。",
            "/images/anime-streamer-sticker.png",
            Common,
        ),
        item(
            2,
            "へいへいズバッジ",
            "ファンクラブ公式バッジ。胸に付ければあなたもへいへいズの一員！",
            "/images/placeholder-1uni9.png",
            Common,
        ),
        item(
            3,
            "きょうへいぬいぐるみ",
            "小さくてかわいいきょうへいのぬいぐるみ。デスクに置いて癒されよう。",
            "/images/cute-anime-plushie.png",
            Rare,
        ),
        item(
            4,
            "サイン入りチェキ",
            "きょうへい直筆サイン入りのチェキ写真。貴重なコレクションアイテム！",
            "/images/placeholder-ayh2v.png",
            Rare,
        ),
        item(
            5,
            "限定コスプレフォト",
            "あの伝説の配信で着用した衣装のきょうへい。ファン垂涎のレアショット！",
            "/images/anime-cosplay.png",
            SuperRare,
        ),
        item(
            6,
            "ゴールデンマイク",
            "初の歌配信で使用したマイクのレプリカ。金色に輝く逸品。",
            "/images/golden-microphone.png",
            SuperRare,
        ),
        item(
            7,
            "伝説の配信瞬間",
            "視聴者数10万人を突破した伝説の配信の決定的瞬間。歴史的価値あり！",
            "/images/streamer-celebration.png",
            UltraRare,
        ),
    ]
}
