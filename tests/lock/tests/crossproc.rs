//! Cross-process determinism: the `search_fixture` binary prints the same
//! digests under different working directories, locales and log filters.

use std::path::Path;
use std::process::Command;

fn workspace_root() -> String {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(Path::parent)
        .expect("workspace root exists")
        .to_string_lossy()
        .to_string()
}

fn run_variant(work_dir: &str, env_overrides: &[(&str, &str)]) -> String {
    let bin = env!("CARGO_BIN_EXE_search_fixture");
    let mut command = Command::new(bin);
    command
        .current_dir(work_dir)
        .env_remove("LC_ALL")
        .env_remove("LC_COLLATE")
        .env_remove("LANG")
        .env_remove("LANGUAGE");
    for &(key, val) in env_overrides {
        command.env(key, val);
    }

    let output = command.output().unwrap_or_else(|e| {
        panic!("failed to spawn {bin} (work_dir={work_dir}, overrides={env_overrides:?}): {e}")
    });
    assert!(
        output.status.success(),
        "search_fixture exited with {}: stderr={}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("stdout is valid UTF-8")
}

#[test]
fn fixture_output_is_identical_across_processes() {
    let root = workspace_root();
    let tmp = tempfile::tempdir().unwrap();
    let tmp_dir = tmp.path().to_string_lossy().to_string();

    let baseline = run_variant(&root, &[]);
    let variants = [
        run_variant(&tmp_dir, &[]),
        run_variant(&root, &[("LC_ALL", "C"), ("LANG", "C")]),
        run_variant(&root, &[("LC_ALL", "en_US.UTF-8"), ("RUST_LOG", "debug")]),
    ];
    for (i, output) in variants.iter().enumerate() {
        assert_eq!(output, &baseline, "variant {i} diverged");
    }

    let keys: Vec<&str> = baseline
        .lines()
        .filter_map(|l| l.split_once('=').map(|(k, _)| k))
        .collect();
    assert_eq!(
        keys,
        [
            "best_first_transcript",
            "best_first_report",
            "best_first_solutions",
            "best_first_expanded",
            "mcts_transcript",
            "mcts_report",
            "mcts_tree_size",
        ]
    );
    assert!(baseline.contains("best_first_solutions=10\n"));
    assert!(baseline.contains("best_first_transcript=sha256:"));
}
