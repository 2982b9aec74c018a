//! Emergency contacts.
//!
//! A [`ContactRepository`] owns the call list for one application session.
//! It is seeded with the built-in hotlines and lives in memory only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;

use crate::error::{Error, Result};

/// One entry in the call list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub id: String,
    pub name: String,
    pub number: String,
    #[serde(default)]
    pub description: String,
}

impl EmergencyContact {
    fn seed(id: &str, name: &str, number: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            number: number.to_string(),
            description: description.to_string(),
        }
    }

    /// A `tel:` link for this contact.
    pub fn tel_uri(&self) -> Result<Url> {
        tel_uri(&self.number)
    }
}

/// The fields of a contact that does not have an id yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContact {
    pub name: String,
    pub number: String,
    #[serde(default)]
    pub description: String,
}

/// A partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactUpdate {
    pub name: Option<String>,
    pub number: Option<String>,
    pub description: Option<String>,
}

impl ContactUpdate {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = Some(number.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// The library hotlines.
pub fn default_contacts() -> Vec<EmergencyContact> {
    vec![
        EmergencyContact::seed("1", "American Red Cross Emergency Hotline", "+1-800-733-2767", ""),
        EmergencyContact::seed("2", "Poison Control Center", "+1-800-222-1222", ""),
        EmergencyContact::seed("3", "Suicide/Crisis Prevention Hotline", "# 988", ""),
        EmergencyContact::seed("4", "FEMA Disaster Assistance Hotline", "+1-800-621-3362", ""),
    ]
}

/// The hotlines listed alongside the library defaults.
pub fn additional_contacts() -> Vec<EmergencyContact> {
    vec![
        EmergencyContact::seed(
            "911",
            "United States National Emergency Services",
            "#911",
            "National emergency services",
        ),
        EmergencyContact::seed(
            "gas",
            "National Gas Emergency Hotline",
            "#811",
            "For gas leaks and emergencies",
        ),
        EmergencyContact::seed(
            "roadside",
            "AAA Roadside Assistance",
            "+1-800-222-4357",
            "change in privacy settings",
        ),
        EmergencyContact::seed(
            "disaster",
            "Disaster Distress Helpline",
            "+1-800-985-5990",
            "For emotional distress related to disasters",
        ),
        EmergencyContact::seed(
            "cdc",
            "CDC Information Hotline",
            "+1-800-232-4636",
            "Health information and guidance",
        ),
    ]
}

/// An in-memory call list keyed by contact id.
#[derive(Debug, Clone)]
pub struct ContactRepository {
    seed: Vec<EmergencyContact>,
    contacts: BTreeMap<String, EmergencyContact>,
}

impl Default for ContactRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactRepository {
    /// A repository holding the defaults merged with the additional hotlines.
    pub fn new() -> Self {
        let mut seed = default_contacts();
        seed.extend(additional_contacts());
        Self::with_seed(seed)
    }

    /// A repository seeded with `seed`. Later entries replace earlier ones
    /// that share an id.
    pub fn with_seed(seed: Vec<EmergencyContact>) -> Self {
        let contacts = index(&seed);
        Self { seed, contacts }
    }

    /// All contacts, sorted by id.
    pub fn list(&self) -> Vec<EmergencyContact> {
        self.contacts.values().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<&EmergencyContact> {
        self.contacts.get(id)
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Add a contact under a fresh id derived from the current time.
    pub fn add(&mut self, contact: NewContact) -> EmergencyContact {
        let id = self.fresh_id();
        let created = EmergencyContact {
            id: id.clone(),
            name: contact.name,
            number: contact.number,
            description: contact.description,
        };
        tracing::debug!(id = %created.id, "emergency contact added");
        self.contacts.insert(id, created.clone());
        created
    }

    /// Apply `changes` to the contact with `id`. Returns the updated record,
    /// or `None` when there is no such contact.
    pub fn update(&mut self, id: &str, changes: ContactUpdate) -> Option<EmergencyContact> {
        let contact = self.contacts.get_mut(id)?;
        if let Some(name) = changes.name {
            contact.name = name;
        }
        if let Some(number) = changes.number {
            contact.number = number;
        }
        if let Some(description) = changes.description {
            contact.description = description;
        }
        Some(contact.clone())
    }

    /// Remove the contact with `id`. Returns whether anything was removed.
    pub fn delete(&mut self, id: &str) -> bool {
        self.contacts.remove(id).is_some()
    }

    /// Restore the seed contacts, discarding all changes.
    pub fn reset(&mut self) {
        self.contacts = index(&self.seed);
    }

    fn fresh_id(&self) -> String {
        let mut millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        while self.contacts.contains_key(&millis.to_string()) {
            millis += 1;
        }
        millis.to_string()
    }
}

fn index(contacts: &[EmergencyContact]) -> BTreeMap<String, EmergencyContact> {
    contacts
        .iter()
        .map(|c| (c.id.clone(), c.clone()))
        .collect()
}

/// Reduce a displayed number to something dialable: its digits, plus a `+`
/// if the number starts with one.
pub fn normalize_phone(number: &str) -> String {
    let trimmed = number.trim_start();
    let mut out = String::with_capacity(trimmed.len());
    if trimmed.starts_with('+') {
        out.push('+');
    }
    out.extend(trimmed.chars().filter(|c| c.is_ascii_digit()));
    out
}

/// Build a `tel:` URL for `number`.
pub fn tel_uri(number: &str) -> Result<Url> {
    let normalized = normalize_phone(number);
    if normalized.trim_start_matches('+').is_empty() {
        return Err(Error::validation(
            format!("{number:?} contains no digits to dial"),
            Some("number".to_string()),
        ));
    }
    Ok(Url::parse(&format!("tel:{normalized}"))?)
}
