mod common;

use std::collections::BTreeMap;

use assert_matches::assert_matches;

use kira_pathway_mapper::error::KiraError;
use kira_pathway_mapper::identifiers::CandidateIdentifiers;
use kira_pathway_mapper::mapping::{
    FileFormat, Mapping, MappingStore, MappingTable, MappingView, Schema,
};
use kira_pathway_mapper::pathways::IdentifierPathways;
use kira_pathway_mapper::store::Store;

use common::accession;

fn ids(entries: &[(usize, &str)]) -> CandidateIdentifiers {
    let mut map = CandidateIdentifiers::new();
    for (ordinal, id) in entries {
        map.entry(*ordinal).or_default().push(id.to_string());
    }
    map
}

fn links(entries: Vec<(&str, Vec<&str>)>) -> IdentifierPathways {
    entries
        .into_iter()
        .map(|(id, pathways)| {
            (
                id.to_string(),
                pathways.iter().map(|p| p.to_string()).collect(),
            )
        })
        .collect()
}

fn populated(schema: Schema) -> MappingStore {
    let mut store = MappingStore::new(schema);
    store.record(
        &accession("P05129"),
        ids(&[(0, "hsa:5582")]),
        vec!["PRKCG".to_string()],
        links(vec![("hsa:5582", vec!["path:hsa04010", "path:hsa04020"])]),
    );
    store.record(
        &accession("P17252"),
        ids(&[(0, "hsa:5578"), (2, "hsa:5579")]),
        vec!["PRKCA".to_string()],
        links(vec![
            ("hsa:5578", vec!["path:hsa04020", "path:hsa04150"]),
            ("hsa:5579", vec!["path:hsa04010"]),
        ]),
    );
    store
}

fn dir_entries(path: &std::path::Path) -> usize {
    std::fs::read_dir(path).unwrap().count()
}

#[test]
fn record_never_overwrites() {
    let mut store = populated(Schema::default());
    let changed = store.record(
        &accession("P05129"),
        ids(&[(0, "hsa:9999")]),
        vec!["OTHER".to_string()],
        links(vec![("hsa:9999", vec!["path:hsa00010"])]),
    );

    assert!(!changed);
    let mapping = store.mapping();
    assert_eq!(mapping.kegg_ids[&accession("P05129")], ids(&[(0, "hsa:5582")]));
    assert_eq!(mapping.gene_names[&accession("P05129")], vec!["PRKCG"]);
}

#[test]
fn empty_values_are_not_recorded() {
    let mut store = MappingStore::new(Schema::default());
    let changed = store.record(
        &accession("Q99999"),
        CandidateIdentifiers::new(),
        vec!["ORPHAN".to_string()],
        IdentifierPathways::new(),
    );
    assert!(changed);
    let mapping = store.mapping();
    assert!(!mapping.kegg_ids.contains_key(&accession("Q99999")));
    assert!(!mapping.pathways.contains_key(&accession("Q99999")));
    assert!(store.contains(&accession("Q99999")));
}

#[test]
fn clean_is_sorted_and_deduplicated() {
    let mut store = populated(Schema::default());
    assert_eq!(store.pathways_unique(), None);

    let unique = store.clean().to_vec();
    assert_eq!(
        unique,
        vec!["path:hsa04010", "path:hsa04020", "path:hsa04150"]
    );
    assert_eq!(store.clean().to_vec(), unique);
    assert_eq!(store.pathways_unique(), Some(unique.as_slice()));
}

#[test]
fn clean_ignores_insertion_order() {
    let mut forward = populated(Schema::default());

    let mut reverse = MappingStore::new(Schema::default());
    reverse.record(
        &accession("P17252"),
        ids(&[(0, "hsa:5578")]),
        Vec::new(),
        links(vec![("hsa:5578", vec!["path:hsa04150", "path:hsa04020", "path:hsa04010"])]),
    );

    assert_eq!(forward.clean(), reverse.clean());
}

#[test]
fn recording_after_clean_requires_another_clean() {
    let temp = tempfile::tempdir().unwrap();
    let out = Store::from_path(temp.path()).unwrap();
    let mut store = populated(Schema::default());
    store.clean();
    store.record(
        &accession("Q02156"),
        ids(&[(0, "hsa:5581")]),
        Vec::new(),
        links(vec![("hsa:5581", vec!["path:hsa04370"])]),
    );
    assert_matches!(store.persist(&out), Err(KiraError::MappingNotFinalized));
}

#[test]
fn persist_before_clean_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let out = Store::from_path(temp.path()).unwrap();
    let store = populated(Schema::default());
    assert_matches!(store.persist(&out), Err(KiraError::MappingNotFinalized));
    assert_eq!(dir_entries(temp.path()), 0);
}

#[test]
fn nested_table_as_text_is_a_structure_mismatch() {
    let temp = tempfile::tempdir().unwrap();
    let out = Store::from_path(temp.path()).unwrap();
    let schema = Schema::default().with(MappingTable::Pathways, "pathways.txt");
    let mut store = populated(schema);
    store.clean();

    let err = store.persist(&out).unwrap_err();
    assert_matches!(
        err,
        KiraError::StructureMismatch { ref table, ref filename }
            if table == "PATHWAYS" && filename == "pathways.txt"
    );
    assert_eq!(dir_entries(temp.path()), 0);
}

#[test]
fn unknown_extension_is_rejected() {
    assert_matches!(
        FileFormat::from_filename("pathways.csv"),
        Err(KiraError::InvalidFormat(_))
    );
    assert_matches!(FileFormat::from_filename("pathways"), Err(KiraError::InvalidFormat(_)));
    assert_eq!(FileFormat::from_filename("a.pkl").unwrap(), FileFormat::Blob);
}

#[test]
fn json_round_trip() {
    let temp = tempfile::tempdir().unwrap();
    let out = Store::from_path(temp.path()).unwrap();
    let mut store = populated(Schema::default());
    store.clean();

    let written = store.persist(&out).unwrap();
    assert_eq!(written.len(), 4);
    assert!(written.iter().all(|path| path.as_std_path().exists()));

    let loaded = Mapping::load(&out, &Schema::default()).unwrap();
    assert_eq!(&loaded, store.mapping());
}

#[test]
fn json_tables_are_keyed_by_accession() {
    let temp = tempfile::tempdir().unwrap();
    let out = Store::from_path(temp.path()).unwrap();
    let mut store = populated(Schema::default());
    store.clean();
    store.persist(&out).unwrap();

    let raw: serde_json::Value =
        Store::read_json(&out.file_path("kegg_ids.json")).unwrap();
    assert_eq!(raw["P17252"]["2"][0], "hsa:5579");

    let raw: BTreeMap<String, BTreeMap<String, Vec<String>>> =
        Store::read_json(&out.file_path("pathways.json")).unwrap();
    assert_eq!(raw["P05129"]["hsa:5582"], vec!["path:hsa04010", "path:hsa04020"]);
}

#[test]
fn blob_and_text_round_trip() {
    let temp = tempfile::tempdir().unwrap();
    let out = Store::from_path(temp.path()).unwrap();
    let schema = Schema::default()
        .with(MappingTable::KeggIds, "kegg_ids.bin")
        .with(MappingTable::GeneNames, "gene_names.pkl")
        .with(MappingTable::Pathways, "pathways.bin")
        .with(MappingTable::PathwaysUnique, "pathways_unq.txt");
    let mut store = populated(schema.clone());
    store.clean();
    store.persist(&out).unwrap();

    let text = std::fs::read_to_string(temp.path().join("pathways_unq.txt")).unwrap();
    assert_eq!(text, "path:hsa04010\npath:hsa04020\npath:hsa04150");

    let loaded = MappingStore::load(&out, &schema).unwrap();
    assert_eq!(&loaded, store.mapping());
}

#[test]
fn table_names_parse() {
    assert_eq!("PATHWAYS_UNQ".parse::<MappingTable>().unwrap(), MappingTable::PathwaysUnique);
    assert_matches!("PATHWAY".parse::<MappingTable>(), Err(KiraError::InvalidFormat(_)));
}

#[test]
fn schema_validation() {
    assert!(Schema::default().validate().is_ok());
    assert!(
        Schema::default()
            .with(MappingTable::PathwaysUnique, "pathways_unq.txt")
            .validate()
            .is_ok()
    );
    assert_matches!(
        Schema::default().with(MappingTable::GeneNames, "names.txt").validate(),
        Err(KiraError::StructureMismatch { .. })
    );
    assert_matches!(
        Schema::default().with(MappingTable::KeggIds, "nested/kegg_ids.json").validate(),
        Err(KiraError::InvalidFormat(_))
    );
    assert_matches!(
        Schema::default().with(MappingTable::KeggIds, "..\\kegg_ids.json").validate(),
        Err(KiraError::InvalidFormat(_))
    );
    assert_matches!(
        Schema::default().with(MappingTable::KeggIds, "kegg_ids.csv").validate(),
        Err(KiraError::InvalidFormat(_))
    );
}
