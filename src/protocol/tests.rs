// Author: Dustin Pilgrim
// License: MIT

#[cfg(test)]
use super::*;
use std::io::Cursor;

use serde_json::{json, Value as Json};
use tempfile::tempdir;

use crate::store::ParsedSave;

const SAVE: &[u8] = br#"version="Test v1"
meta={ date="2250.03.15" version=5 }
country={
	0={ name="United Nations" capital=12 traits="a" traits="b" }
	1={ name="Blorg" capital=40 }
}
player={ { name="me" country=0 } }
"#;

/// Run one session over `input` and return every frame written.
fn run(save: &[u8], input: &str) -> (Vec<String>, SessionState) {
    let save = ParsedSave::from_bytes(save.to_vec(), None).expect("Failed to parse save");
    let mut out = Vec::new();
    let mut session = Session::new(&save, &mut out);
    session.run(Cursor::new(input.as_bytes())).expect("session failed");
    let state = session.state();

    let text = String::from_utf8(out).expect("frames must be UTF-8");
    (text.lines().map(str::to_string).collect(), state)
}

fn frames(input: &str) -> Vec<Json> {
    run(SAVE, input)
        .0
        .iter()
        .map(|l| serde_json::from_str(l).expect("frame must be JSON"))
        .collect()
}

#[test]
fn test_request_parsing_defaults() {
    let req = Request::from_line(br#"{"op": "iter_section", "section": "country"}"#).unwrap();
    assert_eq!(
        req,
        Request::IterSection {
            section: "country".into(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    );

    let req = Request::from_line(br#"{"op":"contains_tokens","tokens":["x"]}"#).unwrap();
    assert_eq!(
        req,
        Request::ContainsTokens {
            tokens: vec!["x".into()],
            case_insensitive: false,
        }
    );
}

#[test]
fn test_request_parsing_rejects_garbage() {
    let lines: [&[u8]; 4] = [b"{not json", br#"{"op":"explode"}"#, br#"{"sections":[]}"#, b"\xff\xfe"];
    for line in lines {
        let err = Request::from_line(line).unwrap_err();
        assert_eq!(err.code(), "InvalidRequest");
        assert_eq!(err.exit_code(), 3);
    }
}

#[test]
fn test_extract_sections_contract() {
    let (lines, _) = run(
        br#"meta={date="2250.03.15" version=5}"#,
        "{\"op\":\"extract_sections\",\"sections\":[\"meta\"]}\n",
    );
    assert_eq!(
        lines,
        vec![r#"{"ok":true,"data":{"meta":{"date":"2250.03.15","version":5}}}"#]
    );
}

#[test]
fn test_count_keys_contract() {
    let (lines, _) = run(
        b"a={ foo=1 } b={ foo=2 }",
        "{\"op\":\"count_keys\",\"keys\":[\"foo\",\"bar\"]}\n",
    );
    assert_eq!(lines, vec![r#"{"ok":true,"counts":{"foo":2,"bar":0}}"#]);
}

#[test]
fn test_close_contract() {
    let (lines, state) = run(SAVE, "{\"op\":\"close\"}\n{\"op\":\"count_keys\",\"keys\":[]}\n");
    assert_eq!(lines, vec![r#"{"ok":true,"closed":true}"#]);
    assert_eq!(state, SessionState::Terminated);
}

#[test]
fn test_eof_ends_session() {
    let (lines, state) = run(SAVE, "");
    assert!(lines.is_empty());
    assert_eq!(state, SessionState::Terminated);
}

#[test]
fn test_session_starts_before_reading_input() {
    let save = ParsedSave::from_bytes(SAVE.to_vec(), None).expect("Failed to parse save");
    let mut out = Vec::new();
    let mut session = Session::new(&save, &mut out);
    assert_eq!(session.state(), SessionState::Starting);

    session.run(Cursor::new(&b"{\"op\":\"close\"}\n"[..])).expect("session failed");
    assert_eq!(session.state(), SessionState::Terminated);
}

#[test]
fn test_fault_isolation() {
    let out = frames("{broken\n\n   \n{\"op\":\"get_entry\",\"section\":\"country\",\"key\":\"1\"}\n");

    assert_eq!(out.len(), 2);
    assert_eq!(out[0]["ok"], false);
    assert_eq!(out[0]["error"], "InvalidRequest");
    assert_eq!(out[0]["exit_code"], 3);
    assert_eq!(out[0]["line"], Json::Null);
    assert_eq!(out[0]["col"], Json::Null);
    assert_eq!(out[0]["schema_version"], 1);

    assert_eq!(out[1]["ok"], true);
    assert_eq!(out[1]["entry"]["name"], "Blorg");
}

#[test]
fn test_responses_follow_request_order() {
    let input = [
        r#"{"op":"count_keys","keys":["capital"]}"#,
        r#"{"op":"get_entry","section":"country","key":"0"}"#,
        r#"{"op":"get_entry","section":"country","key":"9"}"#,
        r#"{"op":"extract_sections","sections":["player"]}"#,
        r#"{"op":"contains_tokens","tokens":["Blorg","Zorg"]}"#,
    ]
    .join("\n");
    let out = frames(&input);

    assert_eq!(out.len(), 5);
    assert_eq!(out[0]["counts"]["capital"], 2);
    assert_eq!(out[1]["entry"]["capital"], 12);
    assert_eq!(out[2]["error"], "EntryNotFound");
    assert_eq!(out[2]["exit_code"], 2);
    assert_eq!(out[3]["data"]["player"][0]["name"], "me");
    assert_eq!(out[4]["matches"], json!({"Blorg": true, "Zorg": false}));
}

#[test]
fn test_identical_requests_are_byte_identical() {
    let req = r#"{"op":"extract_sections","sections":["country","meta"]}"#;
    let (lines, _) = run(SAVE, &format!("{}\n{}\n", req, req));
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], lines[1]);
}

#[test]
fn test_iter_section_stream_shape() {
    let out = frames("{\"op\":\"iter_section\",\"section\":\"country\",\"batch_size\":1}\n");

    assert_eq!(out.len(), 4);
    assert_eq!(
        out[0],
        json!({"ok": true, "stream": true, "op": "iter_section", "section": "country"})
    );
    assert_eq!(out[1]["entries"][0]["key"], "0");
    assert_eq!(out[2]["entries"][0]["key"], "1");
    assert_eq!(out[2]["entries"][0]["value"]["name"], "Blorg");
    assert_eq!(
        out[3],
        json!({"ok": true, "done": true, "op": "iter_section", "section": "country"})
    );
}

#[test]
fn test_iter_section_errors_before_header() {
    let out = frames(
        "{\"op\":\"iter_section\",\"section\":\"fleet\"}\n{\"op\":\"iter_section\",\"section\":\"country\",\"batch_size\":0}\n",
    );

    assert_eq!(out.len(), 2);
    assert_eq!(out[0]["error"], "SectionNotFound");
    assert_eq!(out[0]["exit_code"], 2);
    assert_eq!(out[1]["error"], "InvalidRequest");
}

#[test]
fn test_iter_section_bounded_on_large_section() {
    let mut text = String::from("big={\n");
    for i in 0..10_000 {
        text.push_str(&format!("{}={{ v={} }}\n", i, i));
    }
    text.push('}');

    let (lines, _) = run(
        text.as_bytes(),
        "{\"op\":\"iter_section\",\"section\":\"big\",\"batch_size\":100}\n",
    );
    let out: Vec<Json> = lines.iter().map(|l| serde_json::from_str(l).unwrap()).collect();

    assert_eq!(out.len(), 102);
    let mut total = 0;
    for frame in &out[1..101] {
        let n = frame["entries"].as_array().unwrap().len();
        assert!(n <= 100);
        total += n;
    }
    assert_eq!(total, 10_000);
    assert_eq!(out[101]["done"], true);
}

#[test]
fn test_added_ops() {
    let input = [
        r#"{"op":"get_entries","section":"country","keys":["0","7"],"fields":["name"]}"#,
        r#"{"op":"contains_kv","key":"capital","value":" 40 "}"#,
        r#"{"op":"contains_kv","pairs":[["capital","12"],["name","Zorg"]]}"#,
        r#"{"op":"get_country_summaries","fields":["capital"]}"#,
        r#"{"op":"get_duplicate_values","section":"country","key":"0","field":"traits"}"#,
        r#"{"op":"get_entry_text","section":"country","key":"1"}"#,
        r#"{"op":"contains_kv","key":"capital"}"#,
    ]
    .join("\n");
    let out = frames(&input);

    assert_eq!(out[0]["entries"], json!([{"_key": "0", "name": "United Nations"}]));
    assert_eq!(out[0]["missing"], json!(["7"]));
    assert_eq!(out[1]["found"], true);
    assert_eq!(out[2]["matches"], json!({"capital=12": true, "name=Zorg": false}));
    assert_eq!(out[2]["found"], false);
    assert_eq!(out[3]["countries"][1], json!({"id": "1", "capital": 40}));
    assert_eq!(out[4], json!({"ok": true, "values": ["a", "b"], "found": true}));
    assert_eq!(out[5]["text"], r#"1={ name="Blorg" capital=40 }"#);
    assert_eq!(out[6]["error"], "InvalidRequest");
}

#[test]
fn test_multi_collects_results_and_errors() {
    let out = frames(
        r#"{"op":"multi","ops":[{"op":"count_keys","keys":["name"]},{"op":"get_entry","section":"nope","key":"1"},{"op":"close"}]}"#,
    );

    assert_eq!(out.len(), 1);
    let results = out[0]["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0], json!({"ok": true, "counts": {"name": 3}}));
    assert_eq!(results[1]["error"], "SectionNotFound");
    assert_eq!(results[2]["error"], "InvalidRequest");
}

#[test]
fn test_serve_reports_load_failure() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken");
    std::fs::write(&path, b"a={ b=1\n").unwrap();

    let mut out = Vec::new();
    let code = serve(&path, Cursor::new(b"{\"op\":\"close\"}\n".to_vec()), &mut out);
    assert_eq!(code, 2);

    let frame: Json = serde_json::from_slice(out.trim_ascii()).unwrap();
    assert_eq!(frame["error"], "ParseError");
    assert_eq!(frame["line"], 1);
    assert_eq!(frame["col"], 3);
    assert!(frame["context"].as_str().is_some());

    let mut out = Vec::new();
    let code = serve(&dir.path().join("missing.sav"), Cursor::new(Vec::new()), &mut out);
    assert_eq!(code, 1);
    assert!(String::from_utf8(out).unwrap().contains("IoError"));
}

#[test]
fn test_serve_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gamestate");
    std::fs::write(&path, SAVE).unwrap();

    let mut out = Vec::new();
    let input = "{\"op\":\"get_entry\",\"section\":\"country\",\"key\":\"0\"}\n{\"op\":\"close\"}\n";
    let code = serve(&path, Cursor::new(input.as_bytes().to_vec()), &mut out);

    assert_eq!(code, 0);
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(text.ends_with("{\"ok\":true,\"closed\":true}\n"));
}
