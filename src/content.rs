//! Built-in enemy roster
//!
//! Six encounters placed through the maze: three timid shadows, two forgotten echoes and
//! the guardian at the end. Every enemy would rather be understood than beaten.

use crate::sim::enemy::{EnemyDialogue, EnemyRecord};
use crate::sim::patterns::PatternCategory;

struct Entry {
    id: u32,
    name: &'static str,
    hp: u32,
    damage: u32,
    pattern: PatternCategory,
    is_boss: bool,
    check: &'static str,
    talk: &'static str,
    attack: &'static str,
    spare: &'static str,
    defeat: &'static str,
}

const TIMID_SHADOW: &str = "Timid Shadow";
const FORGOTTEN_ECHO: &str = "Forgotten Echo";
const KEEPER: &str = "Keeper of Memories";

const ROSTER: [Entry; 6] = [
    Entry {
        id: 1,
        name: TIMID_SHADOW,
        hp: 3,
        damage: 1,
        pattern: PatternCategory::Shadow,
        is_boss: false,
        check: "* Timid Shadow - LV 1, ATK 1, DEF 1.\n* It looks a little scared. It doesn't seem to want to fight.",
        talk: "* You say a few encouraging words. The shadow looks at you with curiosity.",
        attack: "Timid Shadow clumsily throws clots of darkness at you.",
        spare: "* You smile at the shadow. It waves happily and vanishes.",
        defeat: "* The shadow nods gratefully and dissolves into the light. You helped it find peace.",
    },
    Entry {
        id: 2,
        name: FORGOTTEN_ECHO,
        hp: 4,
        damage: 1,
        pattern: PatternCategory::Echo,
        is_boss: false,
        check: "* Forgotten Echo - LV 1, ATK 1, DEF 2.\n* It hums a quiet tune. It seems very lonely.",
        talk: "* You hum along. The echo looks surprised, then happy.",
        attack: "The echo attacks with sound waves that sound like a sad song.",
        spare: "* You share your warmth with the echo. It fades, leaving a gentle nostalgia behind.",
        defeat: "* The echo finds its melody. The memory is in harmony again thanks to you.",
    },
    Entry {
        id: 3,
        name: TIMID_SHADOW,
        hp: 3,
        damage: 1,
        pattern: PatternCategory::Shadow,
        is_boss: false,
        check: "* Timid Shadow - LV 1, ATK 1, DEF 1.\n* Another memory. It shrinks back in fear.",
        talk: "* Your words calm the shadow. It stops trembling.",
        attack: "Timid Shadow tries to defend itself.",
        spare: "* Your kindness helps the shadow find peace. It disappears.",
        defeat: "* You reach out, and the shadow touches your hand before it vanishes. One more fear is gone.",
    },
    Entry {
        id: 4,
        name: KEEPER,
        hp: 10,
        damage: 3,
        pattern: PatternCategory::Guardian,
        is_boss: true,
        check: "* Keeper of Memories - LV ??, ATK ??, DEF ??.\n* The guardian of your dearest moments. It wants to see if you are ready for them.",
        talk: "* You tell the Keeper you are ready to accept your past. It nods, but its gaze stays stern.",
        attack: "The Keeper puts you to the test!",
        spare: "* You show the Keeper your resolve. It sees your kindness and steps aside.",
        defeat: "* The Keeper bows its head. You have proven you are ready for your gift. The way is open.",
    },
    Entry {
        id: 5,
        name: FORGOTTEN_ECHO,
        hp: 4,
        damage: 1,
        pattern: PatternCategory::Echo,
        is_boss: false,
        check: "* Forgotten Echo - LV 1, ATK 1, DEF 2.\n* It looks lost. It needs help.",
        talk: "* You tell the echo it is not alone. It seems to help. The echo looks calmer.",
        attack: "The echo cries tears of light that turn into bullets.",
        spare: "* You hug the echo, and it vanishes with gratitude.",
        defeat: "* The sad melody turns into a joyful one. You helped this memory sing again.",
    },
    Entry {
        id: 6,
        name: TIMID_SHADOW,
        hp: 3,
        damage: 1,
        pattern: PatternCategory::Shadow,
        is_boss: false,
        check: "* Timid Shadow - LV 1, ATK 1, DEF 1.\n* It is afraid to take the first step.",
        talk: "* You say you believe in it. The shadow hesitates. Maybe it will work?",
        attack: "The shadow tries to be brave and attacks.",
        spare: "* Your confidence inspires the shadow. It smiles and vanishes.",
        defeat: "* The shadow squares its shoulders and steps into the light. You gave it courage.",
    },
];

impl Entry {
    fn record(&self) -> EnemyRecord {
        EnemyRecord {
            id: self.id,
            name: self.name.to_string(),
            hp: self.hp,
            max_hp: self.hp,
            damage: self.damage,
            pattern: self.pattern,
            is_boss: self.is_boss,
            dialogue: EnemyDialogue {
                check: self.check.to_string(),
                talk: self.talk.to_string(),
                attack: self.attack.to_string(),
                spare: self.spare.to_string(),
                defeat: self.defeat.to_string(),
            },
        }
    }
}

/// Every built-in enemy, in map order
pub fn roster() -> Vec<EnemyRecord> {
    ROSTER.iter().map(Entry::record).collect()
}

/// Look up a built-in enemy by id
pub fn enemy(id: u32) -> Option<EnemyRecord> {
    ROSTER.iter().find(|e| e.id == id).map(Entry::record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_shape() {
        let roster = roster();
        assert_eq!(roster.len(), 6);
        let count = |p: PatternCategory| roster.iter().filter(|e| e.pattern == p).count();
        assert_eq!(count(PatternCategory::Shadow), 3);
        assert_eq!(count(PatternCategory::Echo), 2);
        assert_eq!(count(PatternCategory::Guardian), 1);
    }

    #[test]
    fn test_only_guardian_is_boss() {
        for e in roster() {
            assert_eq!(e.is_boss, e.pattern == PatternCategory::Guardian, "{}", e.name);
            assert_eq!(e.hp, e.max_hp);
        }
        let keeper = enemy(4).unwrap();
        assert_eq!((keeper.max_hp, keeper.damage), (10, 3));
    }

    #[test]
    fn test_ids_unique() {
        let mut ids: Vec<u32> = roster().iter().map(|e| e.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 6);
        assert!(enemy(99).is_none());
    }

    #[test]
    fn test_roster_round_trips_through_json() {
        let json = serde_json::to_string(&roster()).unwrap();
        let parsed = EnemyRecord::roster_from_json(&json).unwrap();
        assert_eq!(parsed, roster());
    }
}
