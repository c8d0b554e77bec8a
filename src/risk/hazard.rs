//! Catalog of known-ambiguous surface forms.
//!
//! These words have multiple readings with different meanings, so they are
//! always escalated for adjudication regardless of engine agreement. The
//! list is static metadata; scoring logic lives in the parent module.

/// Metadata for one hazard word.
#[derive(Debug, Clone, PartialEq)]
pub struct HazardWord {
    /// Surface form as it appears in text.
    pub surface: &'static str,
    /// Known readings, most common first.
    pub readings: &'static [&'static str],
    /// What distinguishes the readings.
    pub note: &'static str,
}

/// Known-ambiguous words, ordered by surface form.
pub const HAZARD_WORDS: &[HazardWord] = &[
    HazardWord {
        surface: "一日",
        readings: &["イチニチ", "ツイタチ"],
        note: "duration vs. first of the month",
    },
    HazardWord {
        surface: "上手",
        readings: &["ジョウズ", "ウワテ", "カミテ"],
        note: "skillful vs. upper hand vs. stage left",
    },
    HazardWord {
        surface: "人気",
        readings: &["ニンキ", "ヒトケ"],
        note: "popularity vs. sign of people",
    },
    HazardWord {
        surface: "今日",
        readings: &["キョウ", "コンニチ"],
        note: "today vs. these days",
    },
    HazardWord {
        surface: "仮名",
        readings: &["カナ", "カメイ"],
        note: "kana script vs. pseudonym",
    },
    HazardWord {
        surface: "大家",
        readings: &["オオヤ", "タイカ"],
        note: "landlord vs. master",
    },
    HazardWord {
        surface: "大人気",
        readings: &["ダイニンキ", "オトナゲ"],
        note: "very popular vs. mature",
    },
    HazardWord {
        surface: "寒気",
        readings: &["サムケ", "カンキ"],
        note: "chills vs. cold air",
    },
    HazardWord {
        surface: "工夫",
        readings: &["クフウ", "コウフ"],
        note: "ingenuity vs. laborer",
    },
    HazardWord {
        surface: "市場",
        readings: &["シジョウ", "イチバ"],
        note: "market (economic) vs. marketplace",
    },
    HazardWord {
        surface: "明日",
        readings: &["アシタ", "アス", "ミョウニチ"],
        note: "register varies by reading",
    },
    HazardWord {
        surface: "清水",
        readings: &["シミズ", "キヨミズ", "セイスイ"],
        note: "name vs. spring water",
    },
    HazardWord {
        surface: "生物",
        readings: &["セイブツ", "ナマモノ"],
        note: "organism vs. raw food",
    },
    HazardWord {
        surface: "色紙",
        readings: &["シキシ", "イロガミ"],
        note: "autograph board vs. colored paper",
    },
    HazardWord {
        surface: "行った",
        readings: &["イッタ", "オコナッタ"],
        note: "went vs. carried out",
    },
    HazardWord {
        surface: "見物",
        readings: &["ケンブツ", "ミモノ"],
        note: "sightseeing vs. spectacle",
    },
    HazardWord {
        surface: "辛い",
        readings: &["ツライ", "カライ"],
        note: "painful vs. spicy",
    },
    HazardWord {
        surface: "風車",
        readings: &["フウシャ", "カザグルマ"],
        note: "windmill vs. pinwheel",
    },
];

/// Look up a hazard word by surface form.
pub fn find_hazard(surface: &str) -> Option<&'static HazardWord> {
    HAZARD_WORDS.iter().find(|h| h.surface == surface)
}

/// Check whether a surface form is on the hazard list.
pub fn is_hazard(surface: &str) -> bool {
    find_hazard(surface).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_hazard_kyou() {
        let hazard = find_hazard("今日").expect("今日 should be a hazard word");
        assert_eq!(hazard.surface, "今日");
        assert!(hazard.readings.contains(&"キョウ"));
        assert!(hazard.readings.contains(&"コンニチ"));
    }

    #[test]
    fn test_find_hazard_unknown_surface() {
        assert!(find_hazard("東京").is_none());
        assert!(!is_hazard("東京"));
    }

    #[test]
    fn test_every_hazard_has_multiple_readings() {
        for hazard in HAZARD_WORDS {
            assert!(
                hazard.readings.len() >= 2,
                "{} should list at least two readings",
                hazard.surface
            );
        }
    }

    #[test]
    fn test_surfaces_are_unique() {
        for (i, a) in HAZARD_WORDS.iter().enumerate() {
            for b in &HAZARD_WORDS[i + 1..] {
                assert_ne!(a.surface, b.surface);
            }
        }
    }
}
