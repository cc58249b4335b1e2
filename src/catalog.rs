use anyhow::{Context, Result};
use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

/// Closed set of content types the character table and the resolver agree
/// on. Free-form tags from the table collapse into this; anything we do not
/// recognize lands on `Unknown` rather than leaking strings around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Idle,
    Cutscene,
    DatingSim,
    Npc,
    Image,
    Unknown,
}

impl ContentType {
    pub fn from_tag(tag: &str) -> Self {
        let sanitized: String = tag
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match sanitized.as_str() {
            "idle" => ContentType::Idle,
            "cutscene" | "cut" => ContentType::Cutscene,
            "datingsim" | "dating" | "date" => ContentType::DatingSim,
            "npc" => ContentType::Npc,
            "illust" | "illustration" | "image" => ContentType::Image,
            _ => ContentType::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ContentType::Idle => "IDLE",
            ContentType::Cutscene => "CUTSCENE",
            ContentType::DatingSim => "DATING SIM",
            ContentType::Npc => "NPC",
            ContentType::Image => "IMAGE",
            ContentType::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CharacterEntry {
    pub file_id: String,
    pub character: String,
    pub costume: String,
    pub kind: ContentType,
    /// Hashed asset name carried by the table; kept for display/export,
    /// never consulted by the resolver.
    pub hash: String,
}

/// On-disk record shape. The table is maintained externally, so the field
/// names it has shipped under over time are accepted as aliases.
#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(alias = "char_id", alias = "file_id")]
    id: String,
    #[serde(alias = "char", alias = "name")]
    character: String,
    #[serde(default)]
    costume: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default, alias = "hashed_name")]
    hash: String,
}

#[derive(Debug, Default)]
pub struct Catalog {
    entries: Vec<CharacterEntry>,
    index: HashMap<String, Vec<usize>>,
}

impl Catalog {
    pub fn from_entries(entries: Vec<CharacterEntry>) -> Self {
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (position, entry) in entries.iter().enumerate() {
            index
                .entry(entry.file_id.to_lowercase())
                .or_default()
                .push(position);
        }
        Catalog { entries, index }
    }

    /// Reads the cached table from disk. A missing cache is an empty
    /// catalog; a corrupt one is an error the caller downgrades to a
    /// warning.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Catalog::default());
        }
        let raw = fs::read(path).context("read character table")?;
        Ok(Catalog::from_entries(parse_entries(&raw)?))
    }

    /// Case-insensitive exact-key lookup. Multiple entries may share an
    /// identifier (idle vs cutscene variants of one costume).
    pub fn lookup(&self, identifier: &str) -> Vec<&CharacterEntry> {
        let key = identifier.to_lowercase();
        self.index
            .get(&key)
            .map(|positions| positions.iter().map(|&p| &self.entries[p]).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn parse_entries(raw: &[u8]) -> Result<Vec<CharacterEntry>> {
    let records: Vec<RawEntry> = serde_json::from_slice(raw).context("parse character table")?;
    Ok(records
        .into_iter()
        .map(|record| CharacterEntry {
            kind: ContentType::from_tag(&record.kind),
            file_id: record.id,
            character: record.character,
            costume: record.costume,
            hash: record.hash,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Catalog {
        let raw = br#"[
            {"id": "char060403", "character": "Celia", "costume": "Bunny Girl", "type": "idle", "hash": "a1b2"},
            {"id": "Char060403", "character": "Celia", "costume": "Bunny Girl", "type": "cutscene", "hash": "c3d4"},
            {"char_id": "dating0104", "char": "Justia", "costume": "Blue Oath", "type": "dating sim"}
        ]"#;
        Catalog::from_entries(parse_entries(raw).unwrap())
    }

    #[test]
    fn lookup_is_case_insensitive_and_multi_entry() {
        let catalog = sample();
        let entries = catalog.lookup("CHAR060403");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].character, "Celia");
        assert_eq!(entries[0].kind, ContentType::Idle);
        assert_eq!(entries[1].kind, ContentType::Cutscene);
    }

    #[test]
    fn aliased_fields_parse() {
        let catalog = sample();
        let entries = catalog.lookup("dating0104");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].character, "Justia");
        assert_eq!(entries[0].kind, ContentType::DatingSim);
        assert!(entries[0].hash.is_empty());
    }

    #[test]
    fn unknown_identifier_yields_nothing() {
        let catalog = sample();
        assert!(catalog.lookup("char999999").is_empty());
    }

    #[test]
    fn content_type_tags_collapse() {
        assert_eq!(ContentType::from_tag("Idle"), ContentType::Idle);
        assert_eq!(ContentType::from_tag("cut-scene"), ContentType::Cutscene);
        assert_eq!(ContentType::from_tag("Dating Sim"), ContentType::DatingSim);
        assert_eq!(ContentType::from_tag("illustration"), ContentType::Image);
        assert_eq!(ContentType::from_tag("story"), ContentType::Unknown);
        assert_eq!(ContentType::Unknown.label(), "UNKNOWN");
        assert_eq!(ContentType::DatingSim.label(), "DATING SIM");
    }

    #[test]
    fn missing_cache_is_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::load(&dir.path().join("characters.json")).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn corrupt_cache_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("characters.json");
        std::fs::write(&path, b"not json").unwrap();
        assert!(Catalog::load(&path).is_err());
    }
}
