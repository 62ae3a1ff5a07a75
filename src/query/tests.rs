// Author: Dustin Pilgrim
// License: MIT

#[cfg(test)]
use super::*;

const SAVE: &str = r#"version="Test v1"
meta={ date="2250.03.15" version=5 }
country={
	0={
		name="United Nations"
		flag={ colors={ "blue" "white" } }
		capital=12
		traits="trait_a"
		traits="trait_b"
		prethoryn_system=yes
	}
	1={ name="Blorg" capital=40 ai_enabled=yes }
	2=none
}
fleet={
	42={ name="Home Fleet" ships={ 1 2 3 } }
}
player={ { name="me" country=0 } }
flags={ prethoryn_system=yes killed_dragon = 2250.01.01 strength=1.50 }
"#;

fn save() -> ParsedSave {
    ParsedSave::from_bytes(SAVE.as_bytes().to_vec(), None).expect("Failed to parse test save")
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_extract_sections_meta_shape() {
    let save = save();
    let data = extract_sections(&save, &strings(&["meta"])).unwrap();

    let json = serde_json::to_string(&data).unwrap();
    assert_eq!(json, r#"{"meta":{"date":"2250.03.15","version":5}}"#);
}

#[test]
fn test_extract_sections_is_idempotent() {
    let save = save();
    let names = strings(&["country", "player"]);

    let first = serde_json::to_string(&extract_sections(&save, &names).unwrap()).unwrap();
    let second = serde_json::to_string(&extract_sections(&save, &names).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_extract_sections_unknown_name() {
    let save = save();
    let err = extract_sections(&save, &strings(&["meta", "wormholes"])).unwrap_err();
    assert_eq!(err, SaveError::SectionNotFound { section: "wormholes".into() });
}

#[test]
fn test_iter_section_batches_are_bounded() {
    let mut text = String::from("big={\n");
    for i in 0..10_000 {
        text.push_str(&format!("\t{}={{ id={} }}\n", i, i));
    }
    text.push_str("}\n");
    let save = ParsedSave::from_bytes(text.into_bytes(), None).unwrap();

    let mut seen = 0;
    let mut last_key = None;
    for batch in iter_section(&save, "big", 128).unwrap() {
        assert!(!batch.is_empty() && batch.len() <= 128);
        seen += batch.len();
        last_key = batch.last().map(|e| e.key.to_string());
    }
    assert_eq!(seen, 10_000);
    assert_eq!(last_key.as_deref(), Some("9999"));
}

#[test]
fn test_iter_section_keeps_file_order() {
    let save = save();
    let keys: Vec<String> = iter_section(&save, "country", 2)
        .unwrap()
        .flatten()
        .map(|e| e.key.into_owned())
        .collect();
    assert_eq!(keys, vec!["0", "1", "2"]);
}

#[test]
fn test_iter_section_rejects_zero_batch() {
    let save = save();
    let err = iter_section(&save, "country", 0).err().unwrap();
    assert_eq!(err.code(), "InvalidRequest");
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn test_get_entry() {
    let save = save();

    let fleet = get_entry(&save, "fleet", "42").unwrap();
    assert_eq!(
        fleet.as_object().and_then(|f| f.get("name")),
        Some(&Value::from("Home Fleet"))
    );

    let player = get_entry(&save, "player", "0").unwrap();
    assert!(player.as_object().is_some());

    let err = get_entry(&save, "fleet", "7").unwrap_err();
    assert_eq!(err.code(), "EntryNotFound");
    assert_eq!(err.exit_code(), 2);

    let err = get_entry(&save, "version", "0").unwrap_err();
    assert_eq!(err.code(), "InvalidRequest");
}

#[test]
fn test_get_entries_projection() {
    let save = save();
    let keys = strings(&["1", "2", "99", "0"]);
    let fields = strings(&["name", "missing_field"]);

    let result = get_entries(&save, "country", &keys, Some(fields.as_slice())).unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["entries"][0], serde_json::json!({"_key": "1", "name": "Blorg"}));
    assert_eq!(json["entries"][1], serde_json::json!({"_key": "2", "_value": "none"}));
    assert_eq!(json["entries"][2]["_key"], "0");
    assert_eq!(json["missing"], serde_json::json!(["99"]));
}

#[test]
fn test_get_entries_without_fields() {
    let save = save();
    let keys = strings(&["1"]);

    let result = get_entries(&save, "country", &keys, None).unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["entries"][0]["_value"]["capital"], 40);
}

#[test]
fn test_count_keys_single_traversal_semantics() {
    let save = save();
    let counts = count_keys(&save, &strings(&["prethoryn_system", "traits", "name", "nothing", "country"]));

    assert_eq!(counts["prethoryn_system"], 2);
    // Promoted duplicates count once per occurrence
    assert_eq!(counts["traits"], 2);
    assert_eq!(counts["name"], 4);
    assert_eq!(counts["nothing"], 0);
    assert_eq!(counts["country"], 2);

    let order: Vec<&str> = counts.keys().map(String::as_str).collect();
    assert_eq!(order, vec!["prethoryn_system", "traits", "name", "nothing", "country"]);
}

#[test]
fn test_count_keys_contract_example() {
    let save = ParsedSave::from_bytes(b"a={ foo=1 } b={ c={ foo=2 } }".to_vec(), None).unwrap();
    let counts = count_keys(&save, &strings(&["foo", "bar"]));
    assert_eq!(
        serde_json::to_string(&counts).unwrap(),
        r#"{"foo":2,"bar":0}"#
    );
}

#[test]
fn test_contains_tokens() {
    let save = save();
    let found = contains_tokens(
        save.raw_bytes(),
        &strings(&["killed_dragon", "Prethoryn", "trait_b", "no_such_token"]),
        false,
    )
    .unwrap();

    assert!(found["killed_dragon"]);
    assert!(!found["Prethoryn"]);
    assert!(found["trait_b"]);
    assert!(!found["no_such_token"]);
}

#[test]
fn test_contains_tokens_case_insensitive_and_overlapping() {
    let save = save();
    let found = contains_tokens(
        save.raw_bytes(),
        &strings(&["PRETHORYN", "trait_", "trait_a"]),
        true,
    )
    .unwrap();

    assert!(found.values().all(|hit| *hit));
}

#[test]
fn test_contains_tokens_rejects_empty_token() {
    let err = contains_tokens(b"abc", &strings(&["a", ""]), false).unwrap_err();
    assert_eq!(err.code(), "InvalidRequest");

    assert!(contains_tokens(b"abc", &[], false).unwrap().is_empty());
}

#[test]
fn test_contains_kv_formatting_insensitive() {
    let save = save();

    assert!(contains_kv(&save, "killed_dragon", "2250.01.01").unwrap());
    assert!(contains_kv(&save, "capital", "40").unwrap());
    assert!(contains_kv(&save, "name", "\"Blorg\"").unwrap());
    assert!(contains_kv(&save, "name", " United Nations ").unwrap());
    assert!(contains_kv(&save, "strength", "1.5").unwrap());
    assert!(contains_kv(&save, "ai_enabled", "yes").unwrap());
    assert!(contains_kv(&save, "traits", "trait_b").unwrap());

    assert!(!contains_kv(&save, "capital", "41").unwrap());
    assert!(!contains_kv(&save, "ai_enabled", "no").unwrap());
    assert!(!contains_kv(&save, "flag", "blue").unwrap());
}

#[test]
fn test_contains_kv_pairs_labels() {
    let save = save();
    let patterns = vec![
        KvPattern::new("capital", "12"),
        KvPattern::new("capital", "13"),
        KvPattern::new("name", "me"),
    ];

    let found = contains_kv_pairs(&save, &patterns).unwrap();
    let json = serde_json::to_string(&found).unwrap();
    assert_eq!(json, r#"{"capital=12":true,"capital=13":false,"name=me":true}"#);
}

#[test]
fn test_summarize_section() {
    let save = save();
    let fields = strings(&["name", "capital"]);
    let summaries = summarize_section(&save, "country", &fields).unwrap();

    let json = serde_json::to_value(&summaries).unwrap();
    assert_eq!(
        json,
        serde_json::json!([
            {"id": "0", "name": "United Nations", "capital": 12},
            {"id": "1", "name": "Blorg", "capital": 40},
            {"id": "2"}
        ])
    );
}

#[test]
fn test_duplicate_values() {
    let save = save();

    let traits = duplicate_values(&save, "country", "0", "traits").unwrap();
    assert_eq!(traits, Some(strings(&["trait_a", "trait_b"])));

    let single = duplicate_values(&save, "country", "1", "capital").unwrap();
    assert_eq!(single, Some(strings(&["40"])));

    assert_eq!(duplicate_values(&save, "country", "9", "traits").unwrap(), None);
    assert_eq!(
        duplicate_values(&save, "armies", "0", "x").unwrap_err().code(),
        "SectionNotFound"
    );
}

#[test]
fn test_entry_text_block_and_scalar() {
    let save = save();

    let text = entry_text(&save, "fleet", "42").unwrap().unwrap();
    assert_eq!(text, r#"42={ name="Home Fleet" ships={ 1 2 3 } }"#);

    let none = entry_text(&save, "country", "2").unwrap().unwrap();
    assert_eq!(none, "2=none");

    let full = entry_text(&save, "country", "0").unwrap().unwrap();
    assert!(full.starts_with("0={"));
    assert!(full.contains("traits=\"trait_a\""));
    assert!(full.contains("traits=\"trait_b\""));
    assert!(full.ends_with('}'));
}

#[test]
fn test_entry_text_ignores_nested_keys() {
    let save = save();

    // `name` appears inside entries but is not an entry of `country`
    assert_eq!(entry_text(&save, "country", "name").unwrap(), None);
    assert_eq!(entry_text(&save, "country", "77").unwrap(), None);
    assert_eq!(
        entry_text(&save, "armies", "0").unwrap_err().code(),
        "SectionNotFound"
    );
}

#[test]
fn test_entry_text_matches_quoted_keys() {
    let raw = br#"events={ "a\"b"=1 "plain"={ x=2 } }"#;
    let save = ParsedSave::from_bytes(raw.to_vec(), None).expect("Failed to parse");

    let escaped = entry_text(&save, "events", "a\"b").unwrap().unwrap();
    assert!(escaped.ends_with("\"=1"), "got {escaped}");

    let block = entry_text(&save, "events", "plain").unwrap().unwrap();
    assert!(block.ends_with("={ x=2 }"), "got {block}");
    assert_eq!(entry_text(&save, "events", "x").unwrap(), None);
}
