// Copyright 2025 Codevault (https://github.com/codevault)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! End-to-end engine flow over one storage root: edit, diff, fork,
//! merge, archive, restart.

use codevault_core::{ReconcilePolicy, StorageConfig};
use codevault_storage::{DiffKind, Vault};
use std::io::Read;
use tempfile::TempDir;

#[test]
fn test_full_project_lifecycle() {
    let dir = TempDir::new().unwrap();
    let config = StorageConfig::ephemeral(dir.path());
    let vault = Vault::open(&config).unwrap();

    // Build a project with a nested folder tree.
    let project = vault.catalog().create_project("editor", "alice");
    let src = vault.catalog().create_folder("src", project.id, None).unwrap();
    let lib = vault.catalog().create_folder("lib", project.id, Some(src.id)).unwrap();

    let main = vault.versions().ensure_file("main.py", src.id, "alice").unwrap();
    let util = vault.versions().ensure_file("util.py", lib.id, "bob").unwrap();

    let v1 = vault
        .versions()
        .save(&main.id, b"print('hello')\n", "alice", "initial")
        .unwrap();
    let v2 = vault
        .versions()
        .save(&main.id, b"print('hello')\nprint('world')\n", "alice", "add line")
        .unwrap();
    vault.versions().save(&util.id, b"def helper(): pass\n", "bob", "initial").unwrap();

    // History and diff between the two snapshots of main.py.
    let log = vault.versions().list_snapshots(&main.id).unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].timestamp_key, v2.timestamp_key);

    let records = vault
        .differ()
        .diff(&main.id, Some(&v1.timestamp_key), &v2.timestamp_key)
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, DiffKind::Insert);
    assert_eq!(records[0].added_lines, vec!["print('world')".to_string()]);

    let sentinel = vault.differ().diff(&main.id, None, &v1.timestamp_key).unwrap();
    assert_eq!(sentinel[0].kind, DiffKind::Initial);

    // Fork, then diverge the original.
    let fork = vault.replicator().fork(project.id, "carol").unwrap();
    assert_eq!(fork.name, "editor-fork");
    vault
        .versions()
        .save(&main.id, b"print('diverged')\n", "alice", "rewrite")
        .unwrap();

    let fork_src = vault
        .catalog()
        .folders_in_project(fork.id)
        .into_iter()
        .find(|f| f.name == "src")
        .unwrap();
    let fork_main = vault.catalog().files_in_folder(fork_src.id)[0].clone();
    assert_eq!(
        vault.versions().latest(&fork_main.id).unwrap().1,
        b"print('hello')\nprint('world')\n"
    );

    // Merge the original and its fork: colliding names get renamed.
    let merged = vault
        .replicator()
        .merge(project.id, fork.id, "alice", ReconcilePolicy::ByName)
        .unwrap();
    let merged_src = vault
        .catalog()
        .folders_in_project(merged.id)
        .into_iter()
        .find(|f| f.name == "src")
        .unwrap();
    let mut names: Vec<String> = vault
        .catalog()
        .files_in_folder(merged_src.id)
        .into_iter()
        .map(|f| f.filename)
        .collect();
    names.sort();
    assert_eq!(names, vec!["main-v2.py".to_string(), "main.py".to_string()]);

    // Archive the merged project and inspect it.
    let bytes = vault.replicator().archive(merged.id).unwrap();
    let mut zip = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut entry = zip.by_name("src/main.py").unwrap();
    let mut content = Vec::new();
    entry.read_to_end(&mut content).unwrap();
    assert_eq!(content, b"print('diverged')\n");
    drop(entry);

    vault.persist().unwrap();
    drop(vault);

    // A reopened vault sees the same state.
    let vault = Vault::open(&config).unwrap();
    assert_eq!(vault.versions().latest(&main.id).unwrap().1, b"print('diverged')\n");
    assert_eq!(vault.versions().list_snapshots(&main.id).unwrap().len(), 3);
    assert_eq!(vault.catalog().project(merged.id).unwrap().name, "editor + editor-fork");

    // Deleting the fork leaves the other projects untouched.
    vault.delete_project(fork.id).unwrap();
    assert!(vault.catalog().project(fork.id).is_err());
    assert!(vault.catalog().project(project.id).is_ok());
    assert_eq!(vault.versions().latest(&main.id).unwrap().1, b"print('diverged')\n");
}
