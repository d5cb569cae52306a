// Formations: how many players each position gets in the starting eleven

use crate::error::{FplError, Result};
use crate::player::Position;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const SQUAD_SIZE: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Formation {
    #[serde(rename = "GKP")]
    pub gkp: usize,
    #[serde(rename = "DEF")]
    pub def: usize,
    #[serde(rename = "MID")]
    pub mid: usize,
    #[serde(rename = "FWD")]
    pub fwd: usize,
}

impl Formation {
    pub const fn new(def: usize, mid: usize, fwd: usize) -> Formation {
        Formation { gkp: 1, def, mid, fwd }
    }

    pub fn quota(&self, position: Position) -> usize {
        match position {
            Position::Gkp => self.gkp,
            Position::Def => self.def,
            Position::Mid => self.mid,
            Position::Fwd => self.fwd,
        }
    }

    /// `None` when the quotas overflow
    pub fn total(&self) -> Option<usize> {
        self.gkp
            .checked_add(self.def)?
            .checked_add(self.mid)?
            .checked_add(self.fwd)
    }

    /// (position, quota) pairs in squad order
    pub fn quotas(&self) -> impl Iterator<Item = (Position, usize)> + '_ {
        Position::ALL.iter().map(move |&p| (p, self.quota(p)))
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        match self.total() {
            Some(SQUAD_SIZE) => Ok(()),
            total => Err(FplError::InvalidFormation {
                name: name.to_string(),
                total: total.unwrap_or(usize::MAX),
            }),
        }
    }
}

impl fmt::Display for Formation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.def, self.mid, self.fwd)
    }
}

/// Parses the usual "DEF-MID-FWD" notation, the goalkeeper is implied
impl FromStr for Formation {
    type Err = FplError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<usize> = s
            .trim()
            .split('-')
            .map(|p| p.trim().parse::<usize>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| FplError::UnknownFormation(s.to_string()))?;
        if parts.len() != 3 {
            return Err(FplError::UnknownFormation(s.to_string()));
        }
        let formation = Formation::new(parts[0], parts[1], parts[2]);
        formation.validate(s)?;
        Ok(formation)
    }
}

/// The seven formations FPL allows
pub fn default_formations() -> BTreeMap<String, Formation> {
    [(3, 4, 3), (3, 5, 2), (4, 3, 3), (4, 4, 2), (4, 5, 1), (5, 3, 2), (5, 4, 1)]
        .iter()
        .map(|&(d, m, f)| {
            let formation = Formation::new(d, m, f);
            (formation.to_string(), formation)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_formations_sum_to_eleven() {
        let formations = default_formations();
        assert_eq!(formations.len(), 7);
        for (name, formation) in &formations {
            assert_eq!(formation.total(), Some(SQUAD_SIZE), "{}", name);
            assert!(formation.validate(name).is_ok());
            assert_eq!(formation.quota(Position::Gkp), 1);
        }
    }

    #[test]
    fn test_overflowing_quotas_rejected() {
        let huge = Formation {
            gkp: 1,
            def: usize::MAX,
            mid: 4,
            fwd: 2,
        };
        assert_eq!(huge.total(), None);
        assert!(matches!(
            huge.validate("huge"),
            Err(FplError::InvalidFormation { total: usize::MAX, .. })
        ));

        let yaml = format!("{{ GKP: 1, DEF: {}, MID: 4, FWD: 2 }}", usize::MAX);
        let parsed: Formation = serde_yaml::from_str(&yaml).unwrap();
        assert!(parsed.validate("from yaml").is_err());
    }

    #[test]
    fn test_parse_formation() {
        let f: Formation = "4-4-2".parse().unwrap();
        assert_eq!(f.quota(Position::Def), 4);
        assert_eq!(f.quota(Position::Mid), 4);
        assert_eq!(f.quota(Position::Fwd), 2);
        assert_eq!(f.to_string(), "4-4-2");

        assert!(matches!(
            "4-4-3".parse::<Formation>(),
            Err(FplError::InvalidFormation { total: 12, .. })
        ));
        assert!(matches!("4-4".parse::<Formation>(), Err(FplError::UnknownFormation(_))));
        assert!(matches!("a-b-c".parse::<Formation>(), Err(FplError::UnknownFormation(_))));
    }

    #[test]
    fn test_quotas_in_squad_order() {
        let f = Formation::new(3, 5, 2);
        let quotas: Vec<(Position, usize)> = f.quotas().collect();
        assert_eq!(
            quotas,
            vec![(Position::Gkp, 1), (Position::Def, 3), (Position::Mid, 5), (Position::Fwd, 2)]
        );
    }
}
