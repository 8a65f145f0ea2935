/*!
 * Tests for glossary parsing and retrieval
 */

use subtrans::glossary::{GlossaryItem, parse_glossary, retrieve_glossary_matches};

#[test]
fn test_retrieve_exactTerm_matchesOnce() {
    let glossary = vec![GlossaryItem::new("Frodo", "弗罗多")];
    let matches = retrieve_glossary_matches("Frodo is here", &glossary);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].term, "Frodo");
    assert_eq!(matches[0].translation, "弗罗多");
}

#[test]
fn test_retrieve_isCaseInsensitive() {
    let glossary = vec![GlossaryItem::new("Frodo", "弗罗多")];
    assert_eq!(retrieve_glossary_matches("frodo is here", &glossary).len(), 1);
    assert_eq!(retrieve_glossary_matches("FRODO!", &glossary).len(), 1);
}

#[test]
fn test_retrieve_emptyInputs_returnEmpty() {
    assert!(retrieve_glossary_matches("any text", &[]).is_empty());
    let glossary = vec![GlossaryItem::new("Frodo", "弗罗多")];
    assert!(retrieve_glossary_matches("", &glossary).is_empty());
    assert!(retrieve_glossary_matches("no hobbits here", &glossary).is_empty());
}

#[test]
fn test_retrieve_duplicateTerms_firstOccurrenceWins() {
    let glossary = vec![
        GlossaryItem::new("Shire", "夏尔"),
        GlossaryItem::new("shire", "郡"),
    ];
    let matches = retrieve_glossary_matches("Welcome to the Shire", &glossary);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].translation, "夏尔");
}

#[test]
fn test_retrieve_multipleTerms_preserveGlossaryOrder() {
    let glossary = vec![
        GlossaryItem::new("ring", "戒指"),
        GlossaryItem::new("Mordor", "魔多"),
        GlossaryItem::new("elf", "精灵"),
    ];
    let matches = retrieve_glossary_matches("One ring to rule Mordor", &glossary);
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].term, "ring");
    assert_eq!(matches[1].term, "Mordor");
}

#[test]
fn test_parse_equalsSeparatedLines() {
    let items = parse_glossary("Frodo=弗罗多\nGandalf=甘道夫");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].term, "Frodo");
    assert_eq!(items[1].translation, "甘道夫");
}

#[test]
fn test_parse_skipsCommentsAndBlankLines() {
    let items = parse_glossary("# character names\n\nFrodo=弗罗多\n\n# end\n");
    assert_eq!(items.len(), 1);
}

#[test]
fn test_parse_alternativeSeparators() {
    assert_eq!(parse_glossary("Frodo,弗罗多")[0].translation, "弗罗多");
    assert_eq!(parse_glossary("Frodo:弗罗多")[0].translation, "弗罗多");
    assert_eq!(parse_glossary("Frodo\t弗罗多")[0].translation, "弗罗多");
}

#[test]
fn test_parse_keepsRemainderAfterFirstSeparator() {
    let items = parse_glossary("URL=https://example.com=page");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].term, "URL");
    assert_eq!(items[0].translation, "https://example.com=page");
}

#[test]
fn test_parse_jsonArray() {
    let input = r#"[
        {"term": "Frodo", "translation": "弗罗多", "context": "a hobbit"},
        {"key": "Shire", "value": "夏尔"}
    ]"#;
    let items = parse_glossary(input);
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].context.as_deref(), Some("a hobbit"));
    assert_eq!(items[1].term, "Shire");
    assert_eq!(items[1].translation, "夏尔");
}

#[test]
fn test_parse_jsonEntriesMissingFields_areDropped() {
    let items = parse_glossary(r#"[{"term": "Frodo"}, {"term": "Sam", "translation": "山姆"}]"#);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].term, "Sam");
}

#[test]
fn test_parse_emptyInput_returnsEmpty() {
    assert!(parse_glossary("").is_empty());
    assert!(parse_glossary("   \n  ").is_empty());
}

#[test]
fn test_parse_lineWithoutSeparator_isDropped() {
    let items = parse_glossary("just a term\nFrodo=弗罗多");
    assert_eq!(items.len(), 1);
}
