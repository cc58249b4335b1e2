use crate::catalog::{Catalog, CharacterEntry, ContentType};
use crate::scan::{ContentKind, ModFolder};

pub const CUTSCENE_MARKER: &str = "cutscene";
const DATING_MARKER: &str = "dating";
const ILLUST_MARKERS: &[&str] = &["illust", "npc", "special"];
const CHAR_ID_PREFIX: &str = "char";
const CHAR_ID_DIGITS: usize = 6;
const UNDERSCORE_MIN_PREFIX: usize = 6;

/// What the listing shows for one mod folder. Derived per scan, never
/// stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDisplay {
    pub character: String,
    pub costume: String,
    pub kind: ContentType,
}

pub fn resolve_folder(folder: &ModFolder, catalog: &Catalog) -> ResolvedDisplay {
    resolve(&folder.file_names, folder.kind, &folder.name, catalog)
}

/// Pure function of (file names, content kind, subfolder name, table).
/// Priority order:
///   1. no skeleton/json present (kind is image or none): exact table
///      match, else generic illustration;
///   2. dating-sim token in any file name;
///   3. tiered identifier extraction + table lookup with a
///      cutscene-vs-idle preference;
///   4. unknown fallback keyed off the cutscene signal.
pub fn resolve(
    file_names: &[String],
    kind: ContentKind,
    subfolder: &str,
    catalog: &Catalog,
) -> ResolvedDisplay {
    let files: Vec<String> = file_names.iter().map(|name| name.to_lowercase()).collect();
    let cutscene = files.iter().any(|name| name.contains(CUTSCENE_MARKER));

    if kind != ContentKind::Animation {
        if let Some(identifier) = extract_identifier(&files) {
            if let Some(entry) = pick_entry(catalog.lookup(&identifier), cutscene) {
                return entry_display(entry);
            }
        }
        return ResolvedDisplay {
            character: "Illustration".to_string(),
            costume: subfolder.to_string(),
            kind: ContentType::Image,
        };
    }

    if let Some(identifier) = dating_identifier(&files) {
        if let Some(entry) = catalog.lookup(&identifier).first() {
            return ResolvedDisplay {
                character: entry.character.clone(),
                costume: entry.costume.clone(),
                kind: ContentType::DatingSim,
            };
        }
        return ResolvedDisplay {
            character: "Illustration".to_string(),
            costume: subfolder.to_string(),
            kind: ContentType::DatingSim,
        };
    }

    let Some(identifier) = extract_identifier(&files) else {
        return unknown_display(cutscene);
    };
    match pick_entry(catalog.lookup(&identifier), cutscene) {
        Some(entry) => entry_display(entry),
        None => unknown_display(cutscene),
    }
}

fn entry_display(entry: &CharacterEntry) -> ResolvedDisplay {
    ResolvedDisplay {
        character: entry.character.clone(),
        costume: entry.costume.clone(),
        kind: entry.kind,
    }
}

fn unknown_display(cutscene: bool) -> ResolvedDisplay {
    ResolvedDisplay {
        character: "Unknown".to_string(),
        costume: String::new(),
        kind: if cutscene {
            ContentType::Cutscene
        } else {
            ContentType::Idle
        },
    }
}

/// Among entries sharing an identifier, the folder's cutscene signal picks
/// the variant; the first entry is the fallback.
fn pick_entry<'a>(entries: Vec<&'a CharacterEntry>, cutscene: bool) -> Option<&'a CharacterEntry> {
    if entries.is_empty() {
        return None;
    }
    let preferred = if cutscene {
        ContentType::Cutscene
    } else {
        ContentType::Idle
    };
    entries
        .iter()
        .find(|entry| entry.kind == preferred)
        .copied()
        .or_else(|| entries.first().copied())
}

/// Tiered extraction over lowercased, sorted file names:
///   (a) `char` + exactly six digits anywhere in a name;
///   (b) a name carrying an illustration/NPC/special marker: its stem;
///   (c) a name with `_` whose first segment is at least six chars.
/// Within the first tier that produced anything, the longest candidate
/// wins; equal lengths break to the first candidate in sorted name order.
fn extract_identifier(files: &[String]) -> Option<String> {
    let files = sorted(files);
    let char_ids: Vec<String> = files.iter().copied().filter_map(char_token).collect();
    if let Some(best) = longest(&char_ids) {
        return Some(best);
    }

    let stems: Vec<String> = files
        .iter()
        .copied()
        .filter(|name| ILLUST_MARKERS.iter().any(|marker| name.contains(marker)))
        .map(|name| stem(name).to_string())
        .collect();
    if let Some(best) = longest(&stems) {
        return Some(best);
    }

    let prefixes: Vec<String> = files
        .iter()
        .copied()
        .filter_map(|name| {
            let (prefix, _) = name.split_once('_')?;
            (prefix.len() >= UNDERSCORE_MIN_PREFIX).then(|| prefix.to_string())
        })
        .collect();
    longest(&prefixes)
}

/// Finds a `charNNNNNN` token: the prefix followed by exactly six digits.
/// Seven or more digits after the prefix is not a match.
fn char_token(name: &str) -> Option<String> {
    for (offset, _) in name.match_indices(CHAR_ID_PREFIX) {
        let tail = &name[offset + CHAR_ID_PREFIX.len()..];
        let digits = tail.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == CHAR_ID_DIGITS {
            return Some(name[offset..offset + CHAR_ID_PREFIX.len() + CHAR_ID_DIGITS].to_string());
        }
    }
    None
}

/// A dating-sim identifier is the marker token plus every digit that
/// follows it, taken whole.
fn dating_identifier(files: &[String]) -> Option<String> {
    let files = sorted(files);
    let tokens: Vec<String> = files
        .iter()
        .copied()
        .filter_map(|name| {
            for (offset, _) in name.match_indices(DATING_MARKER) {
                let tail = &name[offset + DATING_MARKER.len()..];
                let digits = tail.chars().take_while(|c| c.is_ascii_digit()).count();
                if digits > 0 {
                    return Some(
                        name[offset..offset + DATING_MARKER.len() + digits].to_string(),
                    );
                }
            }
            None
        })
        .collect();
    longest(&tokens)
}

fn sorted(files: &[String]) -> Vec<&str> {
    let mut out: Vec<&str> = files.iter().map(|name| name.as_str()).collect();
    out.sort_unstable();
    out
}

fn longest(candidates: &[String]) -> Option<String> {
    let mut best: Option<&String> = None;
    for candidate in candidates {
        match best {
            Some(current) if candidate.len() <= current.len() => {}
            _ => best = Some(candidate),
        }
    }
    best.cloned()
}

fn stem(name: &str) -> &str {
    name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::parse_entries;

    fn catalog() -> Catalog {
        let raw = br#"[
            {"id": "char060403", "character": "Celia", "costume": "Bunny Girl", "type": "idle", "hash": "a1"},
            {"id": "char060403", "character": "Celia", "costume": "Bunny Girl", "type": "cutscene", "hash": "b2"},
            {"id": "char000101", "character": "Justia", "costume": "Default", "type": "idle", "hash": "c3"},
            {"id": "dating0104", "character": "Justia", "costume": "Blue Oath", "type": "idle", "hash": "d4"},
            {"id": "specialillust_yuria", "character": "Yuria", "costume": "Festival", "type": "illust", "hash": "e5"}
        ]"#;
        Catalog::from_entries(parse_entries(raw).unwrap())
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn char_token_ignores_surrounding_text_and_case() {
        let files = names(&["Cutscene_CHAR060403.skel", "atlas.png"]);
        let display = resolve(&files, ContentKind::Animation, "any", &catalog());
        assert_eq!(display.character, "Celia");
        assert_eq!(display.kind, ContentType::Cutscene);
    }

    #[test]
    fn char_token_requires_exactly_six_digits() {
        assert_eq!(
            char_token("char060403.skel"),
            Some("char060403".to_string())
        );
        assert_eq!(char_token("char0604031.skel"), None);
        assert_eq!(char_token("char06040.skel"), None);
        assert_eq!(char_token("character_sheet.png"), None);
    }

    #[test]
    fn cutscene_signal_selects_the_cutscene_variant() {
        let files = names(&["cutscene_char060403.skel", "char060403.png"]);
        let display = resolve(&files, ContentKind::Animation, "m", &catalog());
        assert_eq!(display.kind, ContentType::Cutscene);

        let files = names(&["char060403.skel", "char060403.png"]);
        let display = resolve(&files, ContentKind::Animation, "m", &catalog());
        assert_eq!(display.kind, ContentType::Idle);
    }

    #[test]
    fn unmatched_identifier_falls_back_to_unknown() {
        let files = names(&["char999999.skel"]);
        let display = resolve(&files, ContentKind::Animation, "m", &catalog());
        assert_eq!(display.character, "Unknown");
        assert_eq!(display.costume, "");
        assert_eq!(display.kind, ContentType::Idle);

        let files = names(&["cutscene_char999999.skel"]);
        let display = resolve(&files, ContentKind::Animation, "m", &catalog());
        assert_eq!(display.kind, ContentType::Cutscene);
    }

    #[test]
    fn no_identifier_falls_back_to_unknown() {
        let files = names(&["anim.skel"]);
        let display = resolve(&files, ContentKind::Animation, "m", &catalog());
        assert_eq!(display.character, "Unknown");
        assert_eq!(display.kind, ContentType::Idle);
    }

    #[test]
    fn dating_token_forces_dating_sim_type() {
        let files = names(&["dating0104.skel", "dating0104.atlas"]);
        let display = resolve(&files, ContentKind::Animation, "m", &catalog());
        assert_eq!(display.character, "Justia");
        assert_eq!(display.costume, "Blue Oath");
        assert_eq!(display.kind, ContentType::DatingSim);
    }

    #[test]
    fn unmatched_dating_token_still_tags_dating_sim() {
        let files = names(&["dating9999.skel"]);
        let display = resolve(&files, ContentKind::Animation, "Date Night", &catalog());
        assert_eq!(display.character, "Illustration");
        assert_eq!(display.costume, "Date Night");
        assert_eq!(display.kind, ContentType::DatingSim);
    }

    #[test]
    fn plain_image_folder_is_an_illustration() {
        let files = names(&["portrait.png"]);
        let display = resolve(&files, ContentKind::Image, "Celia Fanart", &catalog());
        assert_eq!(display.character, "Illustration");
        assert_eq!(display.costume, "Celia Fanart");
        assert_eq!(display.kind, ContentType::Image);
    }

    #[test]
    fn kindless_folder_is_an_illustration_too() {
        let files = names(&["notes.txt"]);
        let display = resolve(&files, ContentKind::None, "Scraps", &catalog());
        assert_eq!(display.character, "Illustration");
        assert_eq!(display.costume, "Scraps");
        assert_eq!(display.kind, ContentType::Image);
    }

    #[test]
    fn image_folder_with_table_hit_uses_the_entry() {
        let files = names(&["specialillust_yuria.png"]);
        let display = resolve(&files, ContentKind::Image, "m", &catalog());
        assert_eq!(display.character, "Yuria");
        assert_eq!(display.costume, "Festival");
        assert_eq!(display.kind, ContentType::Image);
    }

    #[test]
    fn scanned_portrait_folder_resolves_as_illustration() {
        // End to end with the kind the scanner itself assigns.
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("author/Celia Fanart");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join("portrait.png"), b"").unwrap();
        std::fs::write(folder.join("fanart.modfile"), b"").unwrap();

        let scan = crate::scan::scan_mods(dir.path());
        assert_eq!(scan.folders.len(), 1);
        assert_eq!(scan.folders[0].kind, ContentKind::Image);

        let display = resolve_folder(&scan.folders[0], &catalog());
        assert_eq!(display.character, "Illustration");
        assert_eq!(display.costume, "Celia Fanart");
        assert_eq!(display.kind, ContentType::Image);
    }

    #[test]
    fn marker_stem_beats_underscore_prefix() {
        // "npc" tier applies before the underscore tier even though the
        // underscore prefix is longer.
        let files = names(&["npc_vendor.png", "longprefix_rest.png"]);
        assert_eq!(extract_identifier(&files), Some("npc_vendor".to_string()));
    }

    #[test]
    fn underscore_prefix_needs_six_chars() {
        let files = names(&["short_rest.png"]);
        assert_eq!(extract_identifier(&files), None);
        let files = names(&["celia01_idle.png"]);
        assert_eq!(extract_identifier(&files), Some("celia01".to_string()));
    }

    #[test]
    fn longest_candidate_wins_and_ties_break_to_sorted_order() {
        let files = names(&["abcdefgh_y.png", "abcdef_x.png"]);
        assert_eq!(extract_identifier(&files), Some("abcdefgh".to_string()));

        let files = names(&["zzzzzz_b.png", "aaaaaa_a.png"]);
        assert_eq!(extract_identifier(&files), Some("aaaaaa".to_string()));
    }

    #[test]
    fn celia_bunny_cutscene_example() {
        // linr熊/Celia_Bunny_Reverse_Cut with a cutscene skeleton resolves
        // to the cutscene-typed table entry.
        let files = names(&["cutscene_char060403.skel", "cutscene_char060403.png"]);
        let display = resolve(
            &files,
            ContentKind::Animation,
            "Celia_Bunny_Reverse_Cut",
            &catalog(),
        );
        assert_eq!(display.character, "Celia");
        assert_eq!(display.costume, "Bunny Girl");
        assert_eq!(display.kind, ContentType::Cutscene);
    }

    #[test]
    fn resolution_is_deterministic_across_input_order() {
        let forward = names(&["cutscene_char060403.skel", "char000101.png"]);
        let backward = names(&["char000101.png", "cutscene_char060403.skel"]);
        let catalog = catalog();
        assert_eq!(
            resolve(&forward, ContentKind::Animation, "m", &catalog),
            resolve(&backward, ContentKind::Animation, "m", &catalog)
        );
    }
}
