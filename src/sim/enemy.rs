//! Enemy battle records

use serde::{Deserialize, Serialize};

use super::patterns::PatternCategory;
use crate::error::TuningError;

/// Everything an enemy says during an encounter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyDialogue {
    pub check: String,
    pub talk: String,
    /// Shown when the enemy's turn starts, after a leading `* `
    pub attack: String,
    pub spare: String,
    pub defeat: String,
}

/// One enemy as handed to the battle at encounter start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyRecord {
    pub id: u32,
    pub name: String,
    pub hp: u32,
    pub max_hp: u32,
    /// Damage per arena hit on the player
    pub damage: u32,
    #[serde(rename = "attackPattern")]
    pub pattern: PatternCategory,
    #[serde(default)]
    pub is_boss: bool,
    pub dialogue: EnemyDialogue,
}

impl EnemyRecord {
    /// Parse one record, rejecting a zero max HP
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let record: Self = serde_json::from_str(json)?;
        if record.max_hp == 0 {
            return Err(TuningError::NonPositive { field: "maxHp" });
        }
        Ok(record)
    }

    /// Parse a roster (a JSON array of records)
    pub fn roster_from_json(json: &str) -> Result<Vec<Self>, TuningError> {
        let roster: Vec<Self> = serde_json::from_str(json)?;
        if roster.iter().any(|r| r.max_hp == 0) {
            return Err(TuningError::NonPositive { field: "maxHp" });
        }
        Ok(roster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHADE: &str = r#"{
        "id": 7,
        "name": "Quiet Shade",
        "hp": 3,
        "maxHp": 3,
        "damage": 1,
        "attackPattern": "shadow",
        "dialogue": {
            "check": "* Quiet Shade - LV 1.",
            "talk": "* You hum softly.",
            "attack": "Quiet Shade flickers.",
            "spare": "* The shade fades away.",
            "defeat": "* The shade finds rest."
        }
    }"#;

    #[test]
    fn test_record_from_json() {
        let record = EnemyRecord::from_json(SHADE).unwrap();
        assert_eq!(record.id, 7);
        assert_eq!(record.max_hp, 3);
        assert_eq!(record.pattern, PatternCategory::Shadow);
        assert!(!record.is_boss);
        assert_eq!(record.dialogue.attack, "Quiet Shade flickers.");
    }

    #[test]
    fn test_record_rejects_zero_max_hp() {
        let json = SHADE.replace("\"maxHp\": 3", "\"maxHp\": 0");
        assert!(matches!(
            EnemyRecord::from_json(&json),
            Err(TuningError::NonPositive { field: "maxHp" })
        ));
    }

    #[test]
    fn test_record_rejects_unknown_pattern() {
        let json = SHADE.replace("shadow", "lightning");
        assert!(matches!(
            EnemyRecord::from_json(&json),
            Err(TuningError::Json(_))
        ));
    }

    #[test]
    fn test_roster_from_json() {
        let json = format!("[{SHADE}, {SHADE}]");
        assert_eq!(EnemyRecord::roster_from_json(&json).unwrap().len(), 2);
    }
}
