use std::fs;
use std::time::Duration;

use assert_matches::assert_matches;

use kira_pathway_mapper::config::{ConfigLoader, ConfigOverrides, load_accessions};
use kira_pathway_mapper::error::KiraError;
use kira_pathway_mapper::mapping::MappingTable;

#[test]
fn config_file_resolves_relative_paths() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("targets.txt"), "P05129\nq02156 P17252\n\n").unwrap();
    let config_path = temp.path().join("kira-pm.json");
    fs::write(
        &config_path,
        r#"{
            "organism": "rat",
            "accessions": ["P12345"],
            "accessions_file": "targets.txt",
            "greedy": false,
            "name_cutoff": 1,
            "checkpoint_every": 0,
            "kegg_retry": { "max_attempts": 5, "retry_delay": 10 },
            "kegg_min_interval_ms": 500,
            "schema": { "PATHWAYS_UNQ": "pathways_unq.txt" }
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(config_path.to_str()).unwrap();
    assert_eq!(resolved.organism.kegg_code, "rno");
    let accessions: Vec<&str> = resolved.accessions.iter().map(|acc| acc.as_str()).collect();
    assert_eq!(accessions, vec!["P12345", "P05129", "q02156", "P17252"]);
    assert!(!resolved.greedy);
    assert_eq!(resolved.name_cutoff, 1);
    assert_eq!(resolved.checkpoint_every, None);
    assert_eq!(resolved.kegg_retry.max_attempts, 5);
    assert_eq!(resolved.kegg_retry.retry_delay, Duration::from_millis(10));
    assert_eq!(resolved.identity_retry.max_attempts, 3);
    assert_eq!(resolved.kegg_min_interval, Duration::from_millis(500));
    assert_eq!(
        resolved.schema.filename(MappingTable::PathwaysUnique),
        "pathways_unq.txt"
    );
    assert_eq!(resolved.schema.filename(MappingTable::KeggIds), "kegg_ids.json");
}

#[test]
fn detailed_organism_entry() {
    let temp = tempfile::tempdir().unwrap();
    let config_path = temp.path().join("custom.json");
    fs::write(
        &config_path,
        r#"{ "organism": { "name": "pig", "kegg_code": "ssc", "taxonomy_id": 9823 } }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(config_path.to_str()).unwrap();
    assert_eq!(resolved.organism.kegg_code, "ssc");
    assert_eq!(resolved.organism.taxonomy_id, 9823);
}

#[test]
fn overrides_win_over_the_file() {
    let temp = tempfile::tempdir().unwrap();
    let config_path = temp.path().join("kira-pm.json");
    fs::write(
        &config_path,
        r#"{ "organism": "mouse", "accessions": ["P12345"], "output_dir": "from_file" }"#,
    )
    .unwrap();

    let overrides = ConfigOverrides {
        organism: Some("hsa".to_string()),
        accessions: vec!["P05129".to_string()],
        output_dir: Some(temp.path().join("from_cli")),
        exhaustive: true,
        skip_names: true,
        checkpoint_every: Some(25),
        ..ConfigOverrides::default()
    };
    let resolved = ConfigLoader::resolve_with_overrides(config_path.to_str(), overrides).unwrap();
    assert_eq!(resolved.organism.kegg_code, "hsa");
    assert_eq!(resolved.accessions.len(), 1);
    assert_eq!(resolved.accessions[0].as_str(), "P05129");
    assert!(resolved.output_dir.ends_with("from_cli"));
    assert!(!resolved.greedy);
    assert!(!resolved.fetch_names);
    assert_eq!(resolved.checkpoint_every, Some(25));
}

#[test]
fn explicit_missing_config_is_a_read_error() {
    let temp = tempfile::tempdir().unwrap();
    let missing = temp.path().join("nope.json");
    let err = ConfigLoader::resolve(missing.to_str()).unwrap_err();
    assert_matches!(err, KiraError::ConfigRead(_));
}

#[test]
fn malformed_config_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let config_path = temp.path().join("kira-pm.json");
    fs::write(&config_path, "{ organism: ").unwrap();
    let err = ConfigLoader::resolve(config_path.to_str()).unwrap_err();
    assert_matches!(err, KiraError::ConfigParse(_));
}

#[test]
fn unknown_tokens_in_a_list_are_kept() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("targets.txt");
    fs::write(&path, "P05129 Q02156\nnan\nP17252\n").unwrap();

    let accessions = load_accessions(&path).unwrap();
    let tokens: Vec<&str> = accessions.iter().map(|acc| acc.as_str()).collect();
    assert_eq!(tokens, vec!["P05129", "Q02156", "nan", "P17252"]);
    assert!(!accessions[2].is_uniprot_like());
}

#[test]
fn unknown_tokens_in_config_are_kept() {
    let temp = tempfile::tempdir().unwrap();
    let config_path = temp.path().join("kira-pm.json");
    fs::write(&config_path, r#"{ "accessions": ["P05129", "not-an-id"] }"#).unwrap();
    let resolved = ConfigLoader::resolve(config_path.to_str()).unwrap();
    assert_eq!(resolved.accessions.len(), 2);
    assert_eq!(resolved.accessions[1].as_str(), "not-an-id");
}

#[test]
fn unknown_organism_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let config_path = temp.path().join("kira-pm.json");
    fs::write(&config_path, r#"{ "organism": "unicorn" }"#).unwrap();
    let err = ConfigLoader::resolve(config_path.to_str()).unwrap_err();
    assert_matches!(err, KiraError::InvalidOrganism(_));
}

#[test]
fn accessions_from_json_list() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("targets.json");
    fs::write(&path, r#"["P05129", "P17252 Q02156"]"#).unwrap();
    let accessions = load_accessions(&path).unwrap();
    assert_eq!(accessions.len(), 3);
    assert_eq!(accessions[2].as_str(), "Q02156");
}

#[test]
fn accessions_file_must_exist() {
    let temp = tempfile::tempdir().unwrap();
    let err = load_accessions(&temp.path().join("missing.txt")).unwrap_err();
    assert_matches!(err, KiraError::Filesystem(_));
}

#[test]
fn schema_shapes_are_checked_at_load() {
    let temp = tempfile::tempdir().unwrap();
    let config_path = temp.path().join("kira-pm.json");
    fs::write(&config_path, r#"{ "schema": { "KEGGID": "kegg_ids.txt" } }"#).unwrap();
    let err = ConfigLoader::resolve(config_path.to_str()).unwrap_err();
    assert_matches!(
        err,
        KiraError::StructureMismatch { ref table, ref filename }
            if table == "KEGGID" && filename == "kegg_ids.txt"
    );
}

#[test]
fn schema_filenames_stay_inside_the_output_dir() {
    let temp = tempfile::tempdir().unwrap();
    let config_path = temp.path().join("kira-pm.json");
    fs::write(&config_path, r#"{ "schema": { "PATHWAYS": "../pathways.json" } }"#).unwrap();
    let err = ConfigLoader::resolve(config_path.to_str()).unwrap_err();
    assert_matches!(err, KiraError::InvalidFormat(_));
}
