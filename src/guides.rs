//! First-aid guides and offline bookmarks.
//!
//! The library is built in. Bookmarked guides are copied, as flattened text,
//! into a title-keyed JSON object stored under [`SAVED_GUIDES_KEY`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::observability::{GUIDES_REMOVED, GUIDES_SAVED};
use crate::storage::KeyValueStore;

/// Storage key for the saved-guides mapping.
pub const SAVED_GUIDES_KEY: &str = "offlineGuides";

/// How urgent a guide's closing alert is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Caution,
    Urgent,
}

impl AlertLevel {
    pub fn symbol(self) -> &'static str {
        match self {
            AlertLevel::Caution => "⚠️",
            AlertLevel::Urgent => "🚨",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub text: &'static str,
}

/// A built-in first-aid article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guide {
    pub title: &'static str,
    /// Name of the icon shown next to the title.
    pub icon: &'static str,
    /// A lead-in line shown before the steps.
    pub intro: Option<&'static str>,
    pub steps: &'static [&'static str],
    /// Whether the steps are numbered.
    pub ordered: bool,
    pub alert: Option<Alert>,
}

impl Guide {
    /// The guide as one line of plain text: intro, steps and alert joined
    /// with spaces. This is the content stored for a saved guide.
    pub fn text_content(&self) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(self.steps.len() + 2);
        if let Some(intro) = self.intro {
            parts.push(intro.to_string());
        }
        for (i, step) in self.steps.iter().enumerate() {
            if self.ordered {
                parts.push(format!("{}. {step}", i + 1));
            } else {
                parts.push((*step).to_string());
            }
        }
        if let Some(alert) = &self.alert {
            parts.push(format!("{} {}", alert.level.symbol(), alert.text));
        }
        parts.join(" ")
    }

    /// The guide as markdown, for display.
    pub fn to_markdown(&self) -> String {
        let mut out = format!("## {}\n\n", self.title);
        if let Some(intro) = self.intro {
            out.push_str(intro);
            out.push_str("\n\n");
        }
        for (i, step) in self.steps.iter().enumerate() {
            if self.ordered {
                out.push_str(&format!("{}. {step}\n", i + 1));
            } else {
                out.push_str(&format!("- {step}\n"));
            }
        }
        if let Some(alert) = &self.alert {
            let heading = match alert.level {
                AlertLevel::Caution => "Warning",
                AlertLevel::Urgent => "Important",
            };
            out.push_str(&format!("\n### {heading}: {}\n", alert.text));
        }
        out
    }

    /// Whether every whitespace-separated term of `query` occurs in the
    /// title or the text content, ignoring case.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        let title = self.title.to_lowercase();
        let content = self.text_content().to_lowercase();
        query
            .split_whitespace()
            .all(|term| title.contains(term) || content.contains(term))
    }
}

const fn caution(text: &'static str) -> Option<Alert> {
    Some(Alert {
        level: AlertLevel::Caution,
        text,
    })
}

const fn urgent(text: &'static str) -> Option<Alert> {
    Some(Alert {
        level: AlertLevel::Urgent,
        text,
    })
}

static LIBRARY: [Guide; 14] = [
    Guide {
        title: "Minor Cuts & Scrapes",
        icon: "Scissors",
        intro: None,
        steps: &[
            "Clean the wound with soap and water",
            "Apply antibiotic ointment",
            "Cover with a sterile bandage",
            "Change bandage daily or when wet",
        ],
        ordered: true,
        alert: None,
    },
    Guide {
        title: "Burns",
        icon: "Thermometer",
        intro: None,
        steps: &[
            "Cool the burn under cold running water",
            "Remove any jewelry or tight items",
            "Cover with a sterile gauze bandage",
            "Do not pop blisters",
        ],
        ordered: true,
        alert: caution("Seek medical help if burn is severe"),
    },
    Guide {
        title: "Sprains",
        icon: "Badge",
        intro: Some("Remember RICE:"),
        steps: &[
            "Rest the injured area",
            "Ice for 20 minutes at a time",
            "Compress with an elastic bandage",
            "Elevate above heart level",
        ],
        ordered: false,
        alert: None,
    },
    Guide {
        title: "Choking",
        icon: "Heart",
        intro: Some("For conscious person:"),
        steps: &[
            "Stand behind the person",
            "Lean them forward",
            "Give 5 back blows",
            "Perform abdominal thrusts",
        ],
        ordered: true,
        alert: urgent("Call emergency services if person loses consciousness"),
    },
    Guide {
        title: "Nosebleeds",
        icon: "Droplet",
        intro: None,
        steps: &[
            "Sit up straight and lean forward slightly (do not tilt head back)",
            "Pinch your nostrils together for 10-15 minutes",
            "Breathe through your mouth while applying pressure",
            "Apply a cold compress to the bridge of your nose",
            "Avoid blowing your nose for a few hours after bleeding stops",
        ],
        ordered: true,
        alert: None,
    },
    Guide {
        title: "Fractures",
        icon: "Bone",
        intro: None,
        steps: &[
            "Keep the injured area still and do not try to realign the bone",
            "Cover any open wounds with a clean cloth",
            "Apply a splint if trained to do so",
            "Use ice packs (wrapped in cloth) to reduce swelling",
        ],
        ordered: true,
        alert: urgent("Seek immediate medical attention"),
    },
    Guide {
        title: "Concussions",
        icon: "Brain",
        intro: None,
        steps: &[
            "Remove person from physical activity immediately",
            "Keep them awake and monitor for confusion, dizziness, or vomiting",
            "Apply a cold pack to any bumps or bruises",
            "Avoid bright screens and loud noises during recovery",
        ],
        ordered: true,
        alert: caution("Seek medical attention if symptoms worsen or persist"),
    },
    Guide {
        title: "Insect Bites & Stings",
        icon: "Bug",
        intro: None,
        steps: &[
            "Remove stinger (if present) with tweezers or by scraping with a card",
            "Wash the area with soap and water",
            "Apply a cold compress to reduce swelling",
            "Take an antihistamine if swelling or itching is severe",
        ],
        ordered: true,
        alert: urgent("Seek medical help if signs of allergic reaction appear"),
    },
    Guide {
        title: "Heat Exhaustion",
        icon: "Sun",
        intro: None,
        steps: &[
            "Move person to a cool, shaded area",
            "Have them drink cool water (not ice-cold)",
            "Apply cool, wet cloths to the skin or use a fan",
            "Loosen tight clothing",
        ],
        ordered: true,
        alert: urgent("Call emergency services if person becomes confused or stops sweating"),
    },
    Guide {
        title: "Hypothermia",
        icon: "Snowflake",
        intro: None,
        steps: &[
            "Move person to a warm place and remove wet clothing",
            "Wrap them in blankets or use body heat",
            "Give warm (not hot) drinks if conscious",
            "Do not apply direct heat to the skin",
        ],
        ordered: true,
        alert: urgent("Seek immediate medical help if disoriented or unconscious"),
    },
    Guide {
        title: "Eye Injuries",
        icon: "Eye",
        intro: None,
        steps: &[
            "Do not rub the eye",
            "Rinse the eye with clean water or saline",
            "Blink repeatedly to try to remove object naturally",
        ],
        ordered: true,
        alert: urgent("If object is embedded, do not remove - seek medical attention"),
    },
    Guide {
        title: "Poisoning",
        icon: "Skull",
        intro: None,
        steps: &[
            "Call Poison Control or emergency services immediately",
            "Do not induce vomiting unless directed by professionals",
            "If poison is on skin, wash area with water",
            "If inhaled, move person to fresh air immediately",
        ],
        ordered: true,
        alert: None,
    },
    Guide {
        title: "Electric Shock",
        icon: "Zap",
        intro: None,
        steps: &[
            "Do not touch person while still in contact with electrical source",
            "Turn off power source if possible",
            "Call emergency services immediately",
            "If person is unconscious and not breathing, begin CPR",
            "Look for burns and treat accordingly",
        ],
        ordered: true,
        alert: None,
    },
    Guide {
        title: "Allergic Reactions",
        icon: "AlertCircle",
        intro: None,
        steps: &[
            "If person has an EpiPen, help them use it immediately",
            "Call emergency services even if symptoms improve",
            "Lay person down and elevate legs (if no breathing difficulty)",
            "Loosen tight clothing",
            "If breathing stops, begin CPR",
        ],
        ordered: true,
        alert: None,
    },
];

/// The built-in guides, in display order.
pub fn library() -> &'static [Guide] {
    &LIBRARY
}

/// Look up a built-in guide by title, ignoring case.
pub fn find(title: &str) -> Option<&'static Guide> {
    LIBRARY
        .iter()
        .find(|guide| guide.title.eq_ignore_ascii_case(title.trim()))
}

/// Filter `guides` by `query`, and to saved guides only when `saved_only`.
pub fn search<'a>(
    guides: &'a [Guide],
    query: &str,
    saved_only: bool,
    is_saved: impl Fn(&str) -> bool,
) -> Vec<&'a Guide> {
    guides
        .iter()
        .filter(|guide| guide.matches(query))
        .filter(|guide| !saved_only || is_saved(guide.title))
        .collect()
}

/// A guide bookmarked for offline reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedGuide {
    pub title: String,
    pub content: String,
    pub icon: String,
}

/// The saved-guides feature, backed by a [`KeyValueStore`].
///
/// The mapping is read once by [`SavedGuides::load`] and rewritten in full
/// on every change.
#[derive(Debug)]
pub struct SavedGuides<S: KeyValueStore> {
    store: S,
    guides: BTreeMap<String, SavedGuide>,
}

impl<S: KeyValueStore> SavedGuides<S> {
    /// Read the saved guides from `store`. An absent entry is an empty map.
    pub fn load(store: S) -> Result<Self> {
        let guides = match store.get(SAVED_GUIDES_KEY)? {
            Some(json) => serde_json::from_str(&json).map_err(|e| {
                Error::serialization(
                    format!("invalid {SAVED_GUIDES_KEY} entry: {e}"),
                    Some(Box::new(e)),
                )
            })?,
            None => BTreeMap::new(),
        };
        Ok(Self { store, guides })
    }

    /// Bookmark a guide, replacing any guide with the same title.
    pub fn save_guide(
        &mut self,
        title: impl Into<String>,
        content: impl Into<String>,
        icon: impl Into<String>,
    ) -> Result<()> {
        let title = title.into();
        let mut guides = self.guides.clone();
        guides.insert(
            title.clone(),
            SavedGuide {
                title,
                content: content.into(),
                icon: icon.into(),
            },
        );
        self.commit(guides)?;
        GUIDES_SAVED.click();
        Ok(())
    }

    /// Remove the bookmark for `title`. Returns whether it was saved.
    pub fn remove_guide(&mut self, title: &str) -> Result<bool> {
        if !self.guides.contains_key(title) {
            return Ok(false);
        }
        let mut guides = self.guides.clone();
        guides.remove(title);
        self.commit(guides)?;
        GUIDES_REMOVED.click();
        Ok(true)
    }

    pub fn is_saved(&self, title: &str) -> bool {
        self.guides.contains_key(title)
    }

    /// Save `guide` if it is not saved, otherwise remove it. Returns the new
    /// saved state.
    pub fn toggle(&mut self, guide: &Guide) -> Result<bool> {
        if self.is_saved(guide.title) {
            self.remove_guide(guide.title)?;
            Ok(false)
        } else {
            self.save_guide(guide.title, guide.text_content(), guide.icon)?;
            Ok(true)
        }
    }

    pub fn get(&self, title: &str) -> Option<&SavedGuide> {
        self.guides.get(title)
    }

    /// All saved guides, ordered by title.
    pub fn guides(&self) -> impl Iterator<Item = &SavedGuide> {
        self.guides.values()
    }

    pub fn len(&self) -> usize {
        self.guides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guides.is_empty()
    }

    fn commit(&mut self, guides: BTreeMap<String, SavedGuide>) -> Result<()> {
        let json = serde_json::to_string(&guides)?;
        self.store.set(SAVED_GUIDES_KEY, json)?;
        self.guides = guides;
        Ok(())
    }
}
