//! Catalog field table
//!
//! Every attribute of a catalog entry that can be imported, exported or
//! filtered on is a [`CatalogField`] variant with a static name and kind.
//! The table drives the SQLite schema, row decoding, the generic property
//! importer and the query parameters, so adding a field is a one-line change.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lookup tables holding deduplicated labels referenced by catalog entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceTable {
    SharingPriority,
    HarvestingIndicator,
    HarvestingMean,
    SeedHead,
    SeedStorage,
    Lighting,
    SoilHumidity,
    SowingDepth,
    Color,
    Habit,
    GrowthHabit,
    OneCultivar,
    PackagingMeasure,
    Dormancy,
    SeedPreparation,
    ConservationStatus,
    PlantLifespan,
}

impl ReferenceTable {
    pub const ALL: &'static [ReferenceTable] = &[
        ReferenceTable::SharingPriority,
        ReferenceTable::HarvestingIndicator,
        ReferenceTable::HarvestingMean,
        ReferenceTable::SeedHead,
        ReferenceTable::SeedStorage,
        ReferenceTable::Lighting,
        ReferenceTable::SoilHumidity,
        ReferenceTable::SowingDepth,
        ReferenceTable::Color,
        ReferenceTable::Habit,
        ReferenceTable::GrowthHabit,
        ReferenceTable::OneCultivar,
        ReferenceTable::PackagingMeasure,
        ReferenceTable::Dormancy,
        ReferenceTable::SeedPreparation,
        ReferenceTable::ConservationStatus,
        ReferenceTable::PlantLifespan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceTable::SharingPriority => "sharing_priority",
            ReferenceTable::HarvestingIndicator => "harvesting_indicator",
            ReferenceTable::HarvestingMean => "harvesting_mean",
            ReferenceTable::SeedHead => "seed_head",
            ReferenceTable::SeedStorage => "seed_storage",
            ReferenceTable::Lighting => "lighting",
            ReferenceTable::SoilHumidity => "soil_humidity",
            ReferenceTable::SowingDepth => "sowing_depth",
            ReferenceTable::Color => "color",
            ReferenceTable::Habit => "habit",
            ReferenceTable::GrowthHabit => "growth_habit",
            ReferenceTable::OneCultivar => "one_cultivar",
            ReferenceTable::PackagingMeasure => "packaging_measure",
            ReferenceTable::Dormancy => "dormancy",
            ReferenceTable::SeedPreparation => "seed_preparation",
            ReferenceTable::ConservationStatus => "conservation_status",
            ReferenceTable::PlantLifespan => "plant_lifespan",
        }
    }

    /// SQL table holding the labels
    pub fn sql_table(&self) -> String {
        format!("ref_{}", self.as_str())
    }
}

impl fmt::Display for ReferenceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceTable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        ReferenceTable::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "Unknown reference table: '{}'. Known tables: {}",
                    s,
                    ReferenceTable::ALL
                        .iter()
                        .map(|t| t.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

/// Semantic type of a catalog field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Trait flag, stored as 0/1, defaults to false
    Boolean,
    /// Whole number; `default_zero` fields store 0 for "unset" instead of null
    Integer { default_zero: bool },
    /// Measurement such as a height in metres
    Decimal,
    /// Free text
    Text,
    /// Foreign key into a reference table
    Reference(ReferenceTable),
}

impl FieldKind {
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Boolean => "boolean",
            FieldKind::Integer { .. } => "integer",
            FieldKind::Decimal => "decimal",
            FieldKind::Text => "text",
            FieldKind::Reference(_) => "reference",
        }
    }
}

macro_rules! catalog_fields {
    ($( $variant:ident => $name:literal, $kind:expr; )+) => {
        /// An importable attribute of a catalog entry
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum CatalogField {
            $( $variant, )+
        }

        impl CatalogField {
            /// Every field, in schema order
            pub const ALL: &'static [CatalogField] = &[ $( CatalogField::$variant, )+ ];

            /// Column and CSV header name
            pub fn name(&self) -> &'static str {
                match self {
                    $( CatalogField::$variant => $name, )+
                }
            }

            pub fn kind(&self) -> FieldKind {
                match self {
                    $( CatalogField::$variant => $kind, )+
                }
            }
        }
    };
}

use FieldKind::{Boolean, Decimal, Reference, Text};
const MONTH: FieldKind = FieldKind::Integer { default_zero: true };
const COUNT: FieldKind = FieldKind::Integer { default_zero: false };

catalog_fields! {
    EnglishName => "english_name", Text;
    FrenchName => "french_name", Text;
    Notes => "notes", Text;

    SharingPriority => "sharing_priority", Reference(ReferenceTable::SharingPriority);
    HarvestingIndicator => "harvesting_indicator", Reference(ReferenceTable::HarvestingIndicator);
    HarvestingMean => "harvesting_mean", Reference(ReferenceTable::HarvestingMean);
    SeedHead => "seed_head", Reference(ReferenceTable::SeedHead);
    SeedStorage => "seed_storage", Reference(ReferenceTable::SeedStorage);
    Lighting => "lighting", Reference(ReferenceTable::Lighting);
    SoilHumidity => "soil_humidity", Reference(ReferenceTable::SoilHumidity);
    SowingDepth => "sowing_depth", Reference(ReferenceTable::SowingDepth);
    Color => "color", Reference(ReferenceTable::Color);
    Habit => "habit", Reference(ReferenceTable::Habit);
    GrowthHabit => "growth_habit", Reference(ReferenceTable::GrowthHabit);
    OneCultivar => "one_cultivar", Reference(ReferenceTable::OneCultivar);
    PackagingMeasure => "packaging_measure", Reference(ReferenceTable::PackagingMeasure);
    Dormancy => "dormancy", Reference(ReferenceTable::Dormancy);
    SeedPreparation => "seed_preparation", Reference(ReferenceTable::SeedPreparation);
    ConservationStatus => "conservation_status", Reference(ReferenceTable::ConservationStatus);
    Lifespan => "lifespan", Reference(ReferenceTable::PlantLifespan);

    HeightMin => "height_min", Decimal;
    HeightMax => "height_max", Decimal;
    SpreadMin => "spread_min", Decimal;
    SpreadMax => "spread_max", Decimal;
    BloomStart => "bloom_start", MONTH;
    BloomEnd => "bloom_end", MONTH;
    HarvestingStart => "harvesting_start", MONTH;
    StratificationDuration => "stratification_duration", COUNT;
    SeedViability => "seed_viability", COUNT;

    FullSun => "full_sun", Boolean;
    PartialShade => "partial_shade", Boolean;
    FullShade => "full_shade", Boolean;
    DroughtTolerant => "drought_tolerant", Boolean;
    FloodTolerant => "flood_tolerant", Boolean;
    SaltTolerant => "salt_tolerant", Boolean;
    ClayTolerant => "clay_tolerant", Boolean;
    SandTolerant => "sand_tolerant", Boolean;
    BlackWalnutTolerant => "black_walnut_tolerant", Boolean;
    DeerResistant => "deer_resistant", Boolean;
    RabbitResistant => "rabbit_resistant", Boolean;
    RainGarden => "rain_garden", Boolean;
    RockGarden => "rock_garden", Boolean;
    Shoreline => "shoreline", Boolean;
    GroundCover => "ground_cover", Boolean;
    Hedge => "hedge", Boolean;
    Container => "container", Boolean;
    CutFlower => "cut_flower", Boolean;
    Edible => "edible", Boolean;
    Medicinal => "medicinal", Boolean;
    Fragrant => "fragrant", Boolean;
    SelfSeeding => "self_seeding", Boolean;
    Spreading => "spreading", Boolean;
    BeeFriendly => "bee_friendly", Boolean;
    ButterflyHost => "butterfly_host", Boolean;
    HummingbirdFriendly => "hummingbird_friendly", Boolean;
    BirdFriendly => "bird_friendly", Boolean;
    NectarSource => "nectar_source", Boolean;
    KeystoneSpecies => "keystone_species", Boolean;
    NitrogenFixer => "nitrogen_fixer", Boolean;
    WinterInterest => "winter_interest", Boolean;
    EasyToGrow => "easy_to_grow", Boolean;
    NeedsStratification => "needs_stratification", Boolean;
    SeedLibrary => "seed_library", Boolean;
}

impl CatalogField {
    /// Look a field up by its column name (case-insensitive, `-` accepted for `_`)
    pub fn from_name(name: &str) -> Option<CatalogField> {
        let wanted = name.trim().to_lowercase().replace('-', "_");
        CatalogField::ALL.iter().copied().find(|f| f.name() == wanted)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self.kind(), FieldKind::Boolean)
    }

    pub fn reference_table(&self) -> Option<ReferenceTable> {
        match self.kind() {
            FieldKind::Reference(table) => Some(table),
            _ => None,
        }
    }

    /// Fields that reference the given table
    pub fn referencing(table: ReferenceTable) -> impl Iterator<Item = CatalogField> {
        CatalogField::ALL
            .iter()
            .copied()
            .filter(move |f| f.reference_table() == Some(table))
    }
}

impl fmt::Display for CatalogField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CatalogField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CatalogField::from_name(s).ok_or_else(|| {
            format!(
                "Unknown catalog field: '{}'. Run 'seedcat fields' to list them.",
                s
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_field_names_are_unique() {
        let names: HashSet<_> = CatalogField::ALL.iter().map(|f| f.name()).collect();
        assert_eq!(names.len(), CatalogField::ALL.len());
        assert!(!names.contains("latin_name"));
    }

    #[test]
    fn test_from_name_accepts_every_field() {
        for field in CatalogField::ALL {
            assert_eq!(CatalogField::from_name(field.name()), Some(*field));
        }
        assert_eq!(
            CatalogField::from_name(" Drought-Tolerant "),
            Some(CatalogField::DroughtTolerant)
        );
        assert_eq!(CatalogField::from_name("wingspan"), None);
    }

    #[test]
    fn test_every_reference_table_is_used() {
        for table in ReferenceTable::ALL {
            assert_eq!(CatalogField::referencing(*table).count(), 1, "{}", table);
        }
    }

    #[test]
    fn test_month_fields_default_to_zero() {
        for field in [
            CatalogField::BloomStart,
            CatalogField::BloomEnd,
            CatalogField::HarvestingStart,
        ] {
            assert_eq!(field.kind(), FieldKind::Integer { default_zero: true });
        }
    }

    #[test]
    fn test_reference_table_parse() {
        assert_eq!(
            "seed-storage".parse::<ReferenceTable>().unwrap(),
            ReferenceTable::SeedStorage
        );
        assert!("planets".parse::<ReferenceTable>().is_err());
    }
}
