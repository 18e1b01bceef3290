use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

const ANSWERS_TOML: &str = r#"
Conhecimento_PrEP = "Sim, conheço bem"
Conhecimento_PEP = "Conheço parcialmente"
Acesso_servicos = "Conheço apenas um local"
Fonte_informacao = "Internet/redes sociais"
Uso_PrepPEP = "Não, mas pretendo usar"
Conhece_usuarios = "Sim, algumas pessoas"
Teste_HIV_frequencia = "A cada 6 meses"
Metodos_prevencao = ["PrEP", "Camisinha masculina"]
Genero = "Pessoa não-binária"
Orientacao_sexual = "Queer"
Raca = "Parda"
Faixa_etaria = "25-29"
Renda = "2-3 salários mínimos"
Regiao = "Zona Leste"
"#;

fn tally(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("tally").unwrap();
    cmd.current_dir(dir)
        .env_remove("TALLY_CONFIG")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(dir.join("tally.toml"));
    cmd
}

fn answers_file(dir: &Path) -> PathBuf {
    let path = dir.join("answers.toml");
    std::fs::write(&path, ANSWERS_TOML).unwrap();
    path
}

fn init(dir: &Path, backend: &str) {
    tally(dir)
        .args(["init", "--backend", backend])
        .assert()
        .success();
}

fn submit(dir: &Path) {
    let file = answers_file(dir);
    tally(dir)
        .args(["submit", "--consent", "--file"])
        .arg(file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Response recorded at"));
}

#[test]
fn init_creates_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    tally(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized csv store"));
    assert!(dir.path().join("tally.toml").exists());
    assert!(dir.path().join("respostas_prep.csv").exists());

    tally(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Responses: 0"))
        .stdout(predicate::str::contains("Schema version: 1"));
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path(), "csv");
    tally(dir.path()).arg("init").assert().code(1);
    tally(dir.path())
        .args(["init", "--force", "--backend", "sqlite"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized sqlite store"));
}

#[test]
fn submit_without_consent_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path(), "csv");
    let file = answers_file(dir.path());
    tally(dir.path())
        .args(["submit", "--file"])
        .arg(file)
        .assert()
        .code(3)
        .stdout(predicate::str::contains("Response recorded").not());

    tally(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No responses yet."));
}

#[test]
fn submitted_response_is_listed() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path(), "csv");
    submit(dir.path());

    let output = tally(dir.path()).args(["list", "--json"]).output().unwrap();
    assert!(output.status.success());
    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["Metodos_prevencao"], "PrEP, Camisinha masculina");
    assert_eq!(records[0]["Genero"], "Pessoa não-binária");
    assert!(records[0]["timestamp"].is_string());
}

#[test]
fn unknown_label_is_a_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path(), "csv");
    tally(dir.path())
        .args(["submit", "--consent", "--answer", "Genero=Marciano"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Marciano"));
}

#[test]
fn missing_base_field_is_a_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path(), "sqlite");
    tally(dir.path())
        .args(["submit", "--consent", "--answer", "Genero=Outro"])
        .assert()
        .code(3);
    tally(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Responses: 0"));
}

#[test]
fn chart_counts_submissions() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path(), "csv");
    submit(dir.path());
    submit(dir.path());

    tally(dir.path())
        .arg("chart")
        .assert()
        .success()
        .stdout(predicate::str::contains("Conhecimento_PrEP (2 responses)"))
        .stdout(predicate::str::contains("Conhecimento_PEP (2 responses)"))
        .stdout(predicate::str::contains("Sim, conheço bem"));

    tally(dir.path())
        .args(["chart", "Metodos_prevencao"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PrEP"))
        .stdout(predicate::str::contains("Camisinha masculina"));
}

#[test]
fn chart_width_out_of_range_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path(), "csv");

    for width in ["0", "501"] {
        tally(dir.path())
            .args(["chart", "--width", width])
            .assert()
            .failure()
            .code(2)
            .stderr(predicate::str::contains("--width"));
    }
    tally(dir.path())
        .args(["chart", "--width", "500"])
        .assert()
        .success();
}

#[test]
fn analyze_needs_three_responses() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path(), "sqlite");
    submit(dir.path());

    tally(dir.path())
        .arg("analyze")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not enough data to cluster"));

    submit(dir.path());
    submit(dir.path());
    let output = tally(dir.path())
        .args(["analyze", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let outcome: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(outcome["status"], "clustered");
    assert_eq!(outcome["records"], 3);
}

#[test]
fn questions_lists_labels() {
    let dir = tempfile::tempdir().unwrap();
    tally(dir.path())
        .arg("questions")
        .assert()
        .success()
        .stdout(predicate::str::contains("Metodos_prevencao (any of)"))
        .stdout(predicate::str::contains("- Sim, já usei no pastado"));
}

#[test]
fn corrupt_database_exits_with_corrupt_code() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("tally.toml"),
        "[storage]\nbackend = \"sqlite\"\npath = \"broken.db\"\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("broken.db"), "this is not a database at all").unwrap();

    tally(dir.path()).arg("status").assert().code(5);
    let content = std::fs::read_to_string(dir.path().join("broken.db")).unwrap();
    assert_eq!(content, "this is not a database at all");
}

#[test]
fn invalid_config_exits_with_config_code() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("tally.toml"), "[analysis]\nclusters = 0\n").unwrap();
    tally(dir.path()).arg("status").assert().code(2);
}
