// Player records as loaded from the FPL API or a CSV export.
// Numeric attributes are optional: the API and the CSV exports both leave cells empty
// for players who have not featured yet, so every stat is read through `Stat`.

use crate::error::FplError;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Position {
    Gkp,
    Def,
    Mid,
    Fwd,
}

impl Position {
    /// Squad order: goalkeeper first, forwards last
    pub const ALL: [Position; 4] = [Position::Gkp, Position::Def, Position::Mid, Position::Fwd];

    /// Map the FPL API `element_type` (1..=4) to a position
    pub fn from_element_type(element_type: u64) -> Option<Position> {
        match element_type {
            1 => Some(Position::Gkp),
            2 => Some(Position::Def),
            3 => Some(Position::Mid),
            4 => Some(Position::Fwd),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Gkp => "GKP",
            Position::Def => "DEF",
            Position::Mid => "MID",
            Position::Fwd => "FWD",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = FplError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GKP" | "GK" | "GOALKEEPER" => Ok(Position::Gkp),
            "DEF" | "DEFENDER" => Ok(Position::Def),
            "MID" | "MIDFIELDER" => Ok(Position::Mid),
            "FWD" | "FORWARD" => Ok(Position::Fwd),
            _ => Err(FplError::UnknownPosition(s.to_string())),
        }
    }
}

/// An optional numeric attribute.
///
/// `value()` applies the default-to-zero policy used for rankings and totals;
/// `get()` keeps the distinction for callers that must drop incomplete rows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stat(Option<f64>);

impl Stat {
    pub const MISSING: Stat = Stat(None);

    pub fn present(value: f64) -> Stat {
        Stat(Some(value))
    }

    pub fn get(&self) -> Option<f64> {
        self.0
    }

    pub fn is_missing(&self) -> bool {
        self.0.is_none()
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.0.unwrap_or(0.0)
    }
}

impl From<f64> for Stat {
    fn from(value: f64) -> Self {
        Stat::present(value)
    }
}

impl Hash for Stat {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.map(f64::to_bits).hash(state);
    }
}

impl Serialize for Stat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Some(v) => serializer.serialize_f64(v),
            None => serializer.serialize_none(),
        }
    }
}

struct StatVisitor;

impl<'de> Visitor<'de> for StatVisitor {
    type Value = Stat;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number, a numeric string, an empty string or null")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Stat, E> {
        Ok(if v.is_finite() { Stat::present(v) } else { Stat::MISSING })
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Stat, E> {
        Ok(Stat::present(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Stat, E> {
        Ok(Stat::present(v as f64))
    }

    // Malformed text reads as missing rather than failing the whole load
    fn visit_str<E: de::Error>(self, v: &str) -> Result<Stat, E> {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            return Ok(Stat::MISSING);
        }
        Ok(trimmed
            .parse::<f64>()
            .ok()
            .filter(|x| x.is_finite())
            .map(Stat::present)
            .unwrap_or(Stat::MISSING))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Stat, E> {
        Ok(Stat::present(if v { 1.0 } else { 0.0 }))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Stat, E> {
        Ok(Stat::MISSING)
    }

    fn visit_none<E: de::Error>(self) -> Result<Stat, E> {
        Ok(Stat::MISSING)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Stat, D::Error> {
        deserializer.deserialize_any(StatVisitor)
    }
}

impl<'de> Deserialize<'de> for Stat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Stat, D::Error> {
        deserializer.deserialize_any(StatVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Hash, Serialize, Deserialize)]
pub struct Player {
    #[serde(default)]
    pub id: u32,
    pub web_name: String,
    pub full_name: String,
    #[serde(alias = "team")]
    pub team_name: String,
    pub position: Position,
    /// Price in tenths of a million (55 = £5.5m)
    #[serde(default)]
    pub now_cost: Stat,
    #[serde(default)]
    pub total_points: Stat,
    #[serde(default)]
    pub minutes: Stat,
    #[serde(default)]
    pub goals_scored: Stat,
    #[serde(default)]
    pub goals_conceded: Stat,
    #[serde(default)]
    pub assists: Stat,
    #[serde(default)]
    pub clean_sheets: Stat,
    #[serde(default)]
    pub creativity: Stat,
    #[serde(default)]
    pub influence: Stat,
    #[serde(default)]
    pub threat: Stat,
    #[serde(default)]
    pub ict_index: Stat,
    #[serde(default)]
    pub selected_by_percent: Stat,
    #[serde(default)]
    pub form: Stat,
    #[serde(default)]
    pub photo_url: String,
}

impl Player {
    pub fn new(
        id: u32,
        web_name: &str,
        full_name: &str,
        team_name: &str,
        position: Position,
        now_cost: u32,
        total_points: f64,
    ) -> Player {
        Player {
            id,
            web_name: web_name.to_string(),
            full_name: full_name.to_string(),
            team_name: team_name.to_string(),
            position,
            now_cost: Stat::present(now_cost as f64),
            total_points: Stat::present(total_points),
            minutes: Stat::MISSING,
            goals_scored: Stat::MISSING,
            goals_conceded: Stat::MISSING,
            assists: Stat::MISSING,
            clean_sheets: Stat::MISSING,
            creativity: Stat::MISSING,
            influence: Stat::MISSING,
            threat: Stat::MISSING,
            ict_index: Stat::MISSING,
            selected_by_percent: Stat::MISSING,
            form: Stat::MISSING,
            photo_url: String::new(),
        }
    }

    /// Cost in tenths, never negative
    #[inline]
    pub fn cost(&self) -> u32 {
        self.now_cost.value().max(0.0).round() as u32
    }

    pub fn cost_millions(&self) -> f64 {
        self.cost() as f64 / 10.0
    }

    #[inline]
    pub fn points(&self) -> f64 {
        self.total_points.value()
    }

    /// Points per tenth of cost; free players count as costing one tenth
    pub fn value_ratio(&self) -> f64 {
        self.points() / self.cost().max(1) as f64
    }

    pub fn same_as(&self, other: &Player) -> bool {
        self.id == other.id && self.full_name == other.full_name && self.team_name == other.team_name
    }
}
