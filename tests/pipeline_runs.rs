//! Whole runs over a real directory store and an on-disk ledger, with the
//! HTTP services replaced by in-process fakes.

use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use cgmes_assembling_lib::pipeline::assembly::*;
use zip::write::SimpleFileOptions;

const ORIGIN: &str = "my_sftp_server";
const SV: &str = "20191106T0930Z_1D_XX_SV_001.zip";
const SSH: &str = "20191106T0930Z_1D_XX_SSH_001.zip";
const TP: &str = "20191106T0930Z_1D_XX_TP_001.zip";
const EQ: &str = "20191106T0930Z__XX_EQ_001.zip";

const SV_ID: &str = "urn:uuid:f1582c44-d9e2-4ea0-afdc-dba189ab4358";
const SSH_ID: &str = "urn:uuid:235f5fd3-6a1d-4b5b-8f0b-5a1b3b0b2f40";
const TP_ID: &str = "urn:uuid:9a2b1c0d-4e5f-4a6b-8c7d-0e1f2a3b4c5d";
const EQ_ID: &str = "urn:uuid:2e0f3b5a-7c8d-4e9f-a0b1-c2d3e4f5a6b7";
const EQ_BD_ID: &str = "urn:uuid:3e3f7738-aab9-4284-a965-71d5cd151f71";
const TP_BD_ID: &str = "urn:uuid:f1582c44-d9e2-4ea0-afdc-dba189ab4359";

// ═══════════════════════════════════════════
// Fixtures
// ═══════════════════════════════════════════

fn write_profile(dir: &Path, name: &str, id: &str, dependencies: &[&str]) {
    let deps: String = dependencies
        .iter()
        .map(|d| format!("<md:Model.DependentOn rdf:resource=\"{d}\"/>"))
        .collect();
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\" \
                  xmlns:md=\"http://iec.ch/TC57/61970-552/ModelDescription/1#\">\
         <md:FullModel rdf:about=\"{id}\">{deps}</md:FullModel>\
         </rdf:RDF>"
    );

    let file = std::fs::File::create(dir.join(name)).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    writer
        .start_file(name.replace(".zip", ".xml"), SimpleFileOptions::default())
        .unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    writer.finish().unwrap();
}

fn write_sv(dir: &Path) {
    write_profile(dir, SV, SV_ID, &[SSH_ID, TP_ID]);
}

fn write_ssh(dir: &Path) {
    write_profile(dir, SSH, SSH_ID, &[EQ_ID]);
}

fn write_tp(dir: &Path) {
    write_profile(dir, TP, TP_ID, &[EQ_ID, TP_BD_ID]);
}

fn write_eq(dir: &Path) {
    write_profile(dir, EQ, EQ_ID, &[EQ_BD_ID]);
}

struct Boundaries {
    referenced: Vec<&'static str>,
    latest: Vec<&'static str>,
}

fn boundary(id: &str) -> BoundaryArtifact {
    BoundaryArtifact {
        id: id.to_string(),
        filename: format!("BD_{}.xml", &id[id.len() - 4..]),
        content: format!("<md:FullModel rdf:about=\"{id}\"/>").into_bytes(),
    }
}

impl BoundaryService for Boundaries {
    fn get_by_id(&self, id: &str) -> Result<Option<BoundaryArtifact>, AssemblyError> {
        Ok(self.referenced.iter().find(|r| **r == id).map(|r| boundary(r)))
    }

    fn get_latest_set(&self) -> Result<Vec<BoundaryArtifact>, AssemblyError> {
        Ok(self.latest.iter().map(|id| boundary(id)).collect())
    }
}

impl AuthorizationSource for Boundaries {
    fn list_authorized_actors(&self) -> Result<Vec<String>, AssemblyError> {
        Ok(vec!["XX".to_string(), "RTEFRANCE".to_string()])
    }

    fn list_authorized_business_processes(&self) -> Result<Vec<String>, AssemblyError> {
        Ok(vec!["1D".to_string(), "2D".to_string()])
    }
}

#[derive(Default)]
struct CaseServer {
    received: Mutex<Vec<(String, Vec<u8>)>>,
}

impl CaseServer {
    fn names(&self) -> Vec<String> {
        self.received.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
    }
}

impl CaseImportService for CaseServer {
    fn submit(&self, archive_name: &str, archive: &[u8]) -> Result<bool, AssemblyError> {
        self.received
            .lock()
            .unwrap()
            .push((archive_name.to_string(), archive.to_vec()));
        Ok(true)
    }
}

struct Env {
    root: tempfile::TempDir,
    ledger_path: std::path::PathBuf,
}

impl Env {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("cases")).unwrap();
        let ledger_path = root.path().join("state").join("ledger.db");
        Self { root, ledger_path }
    }

    fn cases(&self) -> std::path::PathBuf {
        self.root.path().join("cases")
    }

    fn run(&self, boundaries: &Boundaries, server: &CaseServer, strict_mode: bool) -> RunSummary {
        let ledger = SqliteLedger::open(&self.ledger_path).unwrap();
        let store = LocalDirectoryStore::new(self.root.path());
        let parser = FullModelHeaderParser::new();
        let settings = RunSettings {
            origin: ORIGIN.to_string(),
            directory: "cases".to_string(),
            strict_mode,
        };
        PipelineOrchestrator::new(&ledger, &store, &parser, boundaries, boundaries, server)
            .run(&settings)
            .unwrap()
    }

    fn ledger_rows(&self) -> Vec<String> {
        let ledger = SqliteLedger::open(&self.ledger_path).unwrap();
        let conn = ledger.connection();
        let mut rows = Vec::new();
        for query in [
            "SELECT filename || '|' || origin || '|' || document_id || '|' || handled_at FROM handled_files ORDER BY 1",
            "SELECT filename || '|' || origin || '|' || imported_at FROM imported_files ORDER BY 1",
            "SELECT document_id || '|' || position || '|' || dependency_id FROM dependency_edges ORDER BY 1",
        ] {
            let mut stmt = conn.prepare(query).unwrap();
            let values = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .unwrap()
                .collect::<Result<Vec<_>, _>>()
                .unwrap();
            rows.extend(values);
        }
        rows
    }
}

fn referenced() -> Boundaries {
    Boundaries {
        referenced: vec![EQ_BD_ID, TP_BD_ID],
        latest: vec![],
    }
}

// ═══════════════════════════════════════════
// Scenarios
// ═══════════════════════════════════════════

#[test]
fn second_run_leaves_ledger_unchanged() {
    let env = Env::new();
    write_sv(&env.cases());
    write_ssh(&env.cases());
    write_tp(&env.cases());
    write_eq(&env.cases());
    let boundaries = referenced();
    let server = CaseServer::default();

    let first = env.run(&boundaries, &server, true);
    assert_eq!(first.files_handled.len(), 4);
    assert_eq!(first.cases_imported, vec![SV.to_string()]);
    let after_first = env.ledger_rows();
    assert_eq!(after_first.len(), 4 + 1 + 6);

    let second = env.run(&boundaries, &server, true);
    assert!(second.files_handled.is_empty());
    assert!(second.cases_imported.is_empty());
    assert_eq!(second.cases_already_imported, vec![SV.to_string()]);
    assert_eq!(env.ledger_rows(), after_first);
    assert_eq!(server.names(), vec!["20191106T0930Z_1D_XX_001.zip".to_string()]);
}

#[test]
fn imported_archive_holds_profiles_and_boundaries() {
    let env = Env::new();
    write_sv(&env.cases());
    write_ssh(&env.cases());
    write_tp(&env.cases());
    write_eq(&env.cases());
    let server = CaseServer::default();
    env.run(&referenced(), &server, true);

    let received = server.received.lock().unwrap();
    let (_, bytes) = &received[0];
    let archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.clone())).unwrap();
    let mut names: Vec<&str> = archive.file_names().collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "20191106T0930Z_1D_XX_SSH_001.xml",
            "20191106T0930Z_1D_XX_SV_001.xml",
            "20191106T0930Z_1D_XX_TP_001.xml",
            "20191106T0930Z__XX_EQ_001.xml",
            "BD_1f71.xml",
            "BD_4359.xml",
        ]
    );
}

#[test]
fn missing_ssh_then_arriving_later() {
    let env = Env::new();
    write_sv(&env.cases());
    write_tp(&env.cases());
    write_eq(&env.cases());
    let boundaries = referenced();
    let server = CaseServer::default();

    let blocked = env.run(&boundaries, &server, false);
    assert_eq!(blocked.cases_blocked, vec![SV.to_string()]);
    assert!(server.names().is_empty());

    write_ssh(&env.cases());
    let ready = env.run(&boundaries, &server, false);
    assert_eq!(ready.files_handled, vec![SSH.to_string()]);
    assert_eq!(ready.cases_imported, vec![SV.to_string()]);
    assert_eq!(server.names().len(), 1);
}

#[test]
fn strict_mode_blocks_where_lenient_falls_back() {
    let boundaries = Boundaries {
        referenced: vec![EQ_BD_ID],
        latest: vec![
            "urn:uuid:00000000-0000-0000-0000-00000000aaaa",
            "urn:uuid:00000000-0000-0000-0000-00000000bbbb",
        ],
    };

    let strict_env = Env::new();
    for write in [write_sv, write_ssh, write_tp, write_eq] {
        write(&strict_env.cases());
    }
    let strict_server = CaseServer::default();
    let strict = strict_env.run(&boundaries, &strict_server, true);
    assert_eq!(strict.cases_blocked, vec![SV.to_string()]);
    assert!(strict_server.names().is_empty());

    let lenient_env = Env::new();
    for write in [write_sv, write_ssh, write_tp, write_eq] {
        write(&lenient_env.cases());
    }
    let lenient_server = CaseServer::default();
    let lenient = lenient_env.run(&boundaries, &lenient_server, false);
    assert_eq!(lenient.cases_imported, vec![SV.to_string()]);
    assert_eq!(lenient_server.names().len(), 1);
}

#[test]
fn foreign_and_malformed_names_are_ignored() {
    let env = Env::new();
    write_eq(&env.cases());
    write_profile(&env.cases(), "20191106T0930Z_1D_YY_SSH_001.zip", "urn:uuid:yy", &[]);
    write_profile(&env.cases(), "20191106T0930Z_6D_XX_SSH_001.zip", "urn:uuid:6d", &[]);
    std::fs::write(env.cases().join("20191106T0930Z_1D_XX_SSH_001.xml"), b"<x/>").unwrap();

    let summary = env.run(&referenced(), &CaseServer::default(), false);
    assert_eq!(summary.files_listed, 4);
    assert_eq!(summary.files_rejected, 3);
    assert_eq!(summary.files_handled, vec![EQ.to_string()]);
}
