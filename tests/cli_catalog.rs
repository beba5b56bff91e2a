use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use serde_json::Value;

mod util;
use util::CatalogFixture;

fn base_cmd(fx: &CatalogFixture) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("profsearch"));
    cmd.env("HOME", fx.home());
    cmd.env("XDG_CONFIG_HOME", fx.home().join(".config"));
    cmd.env("XDG_DATA_HOME", fx.home().join(".local/share"));
    cmd.env_remove("PROFSEARCH_CONFIG");
    cmd.env_remove("PROFSEARCH_NAME_MATCH");
    cmd.env_remove("RUST_LOG");
    cmd.env("PROFSEARCH_DB", fx.db_path());
    cmd
}

fn seeded() -> CatalogFixture {
    let fx = CatalogFixture::new();
    base_cmd(&fx)
        .arg("seed")
        .arg(fx.seed_path())
        .assert()
        .success()
        .stdout(contains("Imported 3 schools, 3 professors, 1 courses, 1 reviews"));
    fx
}

fn stdout_json(cmd: &mut Command) -> Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).expect("stdout is json")
}

#[test]
fn seed_creates_parent_directories() {
    let fx = seeded();
    assert!(fx.db_path().exists());
}

#[test]
fn seed_rejects_dangling_institution() {
    let fx = CatalogFixture::new();
    let bad = fx.home().join("bad.json");
    std::fs::write(
        &bad,
        r#"{"instructors": [{"id": 1, "first_name": "Ghost", "institution": 99}]}"#,
    )
    .unwrap();
    base_cmd(&fx)
        .args(["seed"])
        .arg(&bad)
        .assert()
        .code(6)
        .stderr(contains("invalid seed data"));
}

#[test]
fn missing_catalog_suggests_seeding() {
    let fx = CatalogFixture::new();
    base_cmd(&fx)
        .args(["schools", "Stan"])
        .assert()
        .code(5)
        .stderr(contains("profsearch seed"));
}

#[test]
fn schools_lists_substring_matches() {
    let fx = seeded();
    base_cmd(&fx)
        .args(["schools", "stan"])
        .assert()
        .success()
        .stdout(contains("Stanford University"))
        .stdout(contains("Stanton College"))
        .stdout(contains("Oxford").not());
}

#[test]
fn schools_json_output() {
    let fx = seeded();
    let v = stdout_json(base_cmd(&fx).args(["schools", "university", "--json"]));
    let names: Vec<&str> = v["schools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Oxford University", "Stanford University"]);
}

#[test]
fn professors_are_scoped_to_one_school() {
    let fx = seeded();
    base_cmd(&fx)
        .args(["professors", "--university", "1", "smi"])
        .assert()
        .success()
        .stdout(contains("Adams, Smith"))
        .stdout(contains("Burns, Smithers"))
        .stdout(contains("University: Stanford University"))
        .stdout(contains("Smithson").not());
}

#[test]
fn name_match_flag_switches_columns() {
    let fx = seeded();
    base_cmd(&fx)
        .args(["professors", "--university", "1", "adam"])
        .assert()
        .success()
        .stdout(contains("No results found."));
    base_cmd(&fx)
        .args(["professors", "--university", "1", "adam", "--name-match", "last"])
        .assert()
        .success()
        .stdout(contains("Adams, Smith"));
}

#[test]
fn professor_detail_page() {
    let fx = seeded();
    base_cmd(&fx)
        .args(["professor", "42"])
        .assert()
        .success()
        .stdout(contains("Smith Adams"))
        .stdout(contains("Physics department at Stanford University"))
        .stdout(contains("1 reviews, averaging 5.0/5"))
        .stdout(contains(r#"- PHYS 101 · Rating 5.0 · Difficulty 2.0 · "Great lectures""#));
}

#[test]
fn unknown_professor_is_not_found() {
    let fx = seeded();
    base_cmd(&fx)
        .args(["professor", "999", "--json"])
        .assert()
        .code(3)
        .stderr(contains(r#""kind":"not-found""#));
}

#[test]
fn resolve_walks_both_stages_to_a_professor() {
    let fx = seeded();
    base_cmd(&fx)
        .args(["resolve", "--school", "Sta", "--professor", "Smi"])
        .assert()
        .success()
        .stdout(contains("/professor/42"));
}

#[test]
fn resolve_second_pick() {
    let fx = seeded();
    let v = stdout_json(base_cmd(&fx).args([
        "resolve",
        "--school",
        "Stanford",
        "--professor",
        "Smi",
        "--pick-professor",
        "2",
        "--json",
    ]));
    assert_eq!(v["route"], "/professor/43");
    assert_eq!(v["institution"]["name"], "Stanford University");
    assert_eq!(v["instructor"]["first_name"], "Smithers");
    assert_eq!(v["stage"], "selecting-instructor");
}

#[test]
fn resolve_short_query_never_looks_up() {
    let fx = seeded();
    base_cmd(&fx)
        .args(["resolve", "--school", "St", "--professor", "Smith"])
        .assert()
        .code(3)
        .stderr(contains("matched 0 schools"))
        .stderr(contains("2 characters or fewer"));
}

#[test]
fn open_parses_app_paths() {
    let fx = seeded();
    base_cmd(&fx)
        .args(["open", "/search-results/professors?university=1&professor=Smithers"])
        .assert()
        .success()
        .stdout(contains("Burns, Smithers"));
    base_cmd(&fx)
        .args(["open", "/nowhere"])
        .assert()
        .code(2);
}

#[test]
fn shell_reads_script_from_stdin() {
    let fx = seeded();
    base_cmd(&fx)
        .arg("shell")
        .write_stdin("Sta\n:pick 1\nSmi\n:pick 1\n:submit\n")
        .assert()
        .success()
        .stdout(contains("[1] Stanford University (Stanford, CA)"))
        .stdout(contains("/professor/42"));
}

#[test]
fn bad_config_is_reported() {
    let fx = seeded();
    let cfg = fx.home().join("broken.toml");
    std::fs::write(&cfg, "search = [").unwrap();
    base_cmd(&fx)
        .arg("--config")
        .arg(&cfg)
        .args(["schools", "Stan"])
        .assert()
        .code(4);
}

#[test]
fn no_subcommand_is_usage_error() {
    let fx = CatalogFixture::new();
    base_cmd(&fx).assert().code(2).stderr(contains("--help"));
}

#[test]
fn schools_list_is_uncapped_without_limit() {
    let fx = CatalogFixture::new();
    let institutions: Vec<_> = (1..=40)
        .map(|id| serde_json::json!({"id": id, "name": format!("State College {id}")}))
        .collect();
    let seed = fx.home().join("many.json");
    std::fs::write(
        &seed,
        serde_json::json!({ "institutions": institutions }).to_string(),
    )
    .unwrap();
    base_cmd(&fx).arg("seed").arg(&seed).assert().success();

    let v = stdout_json(base_cmd(&fx).args(["schools", "state", "--json"]));
    assert_eq!(v["schools"].as_array().unwrap().len(), 40);
    let v = stdout_json(base_cmd(&fx).args(["schools", "state", "--limit", "3", "--json"]));
    assert_eq!(v["schools"].as_array().unwrap().len(), 3);
}
