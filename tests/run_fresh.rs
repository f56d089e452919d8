mod common;

use std::fs;

use common::*;

const DOC_JSON: &str = r###"printf '%s' '{"type":"result","result":"## BUSINESS POSTURE\n...doc..."}'"###;

#[test]
fn test_fresh_writes_result_verbatim_and_reports_created() {
    if !have_git() {
        eprintln!("skipping: git not found in PATH");
        return;
    }
    let td = tempfile::tempdir().expect("tmpdir");
    let sandbox = td.path();
    let repo = sandbox.join("repo");
    fs::create_dir_all(&repo).unwrap();
    repo_with_main(&repo);
    let patterns = write_patterns(sandbox);
    let state = sandbox.join("state");
    let stub = write_stub(sandbox, "cursor-agent", &state, DOC_JSON);

    let out = archy(sandbox)
        .args(["--fresh", "--patterns-dir"])
        .arg(&patterns)
        .arg(&repo)
        .env("ARCHY_CURSOR_AGENT_BIN", &stub)
        .output()
        .expect("run archy");
    assert!(out.status.success(), "{}", describe(&out));

    let doc = fs::read_to_string(repo.join("arch.md")).expect("arch.md");
    assert_eq!(doc, "## BUSINESS POSTURE\n...doc...");

    let v = stdout_json(&out);
    assert_eq!(v["success"], true);
    assert_eq!(v["action"], "created");
    assert_eq!(v["fresh_mode"], true);
    assert_eq!(v["changes_processed"], 0);
    assert_eq!(v["file_size"], doc.len() as u64);
    assert!(v["file_path"].as_str().unwrap().ends_with("arch.md"));

    assert_eq!(call_count(&state), 1, "fresh mode makes exactly one call");
    let args = read_state(&state, "args_1");
    assert!(args.starts_with("-p\n--output-format\njson\n"), "{args}");
    assert!(!args.contains("--force"), "{args}");
    let prompt = read_state(&state, "prompt_1");
    assert!(prompt.starts_with("CREATE TEMPLATE"), "{prompt}");
    assert!(prompt.contains("Project Name: repo"), "{prompt}");
    assert!(prompt.contains("- app/service.py"), "{prompt}");
    assert!(prompt.contains("Current Branch: feature"), "{prompt}");

    assert!(leftover_tmp(sandbox).is_empty(), "scratch dir left behind");
}

#[test]
fn test_fresh_strips_reasoning_preamble() {
    if !have_git() {
        eprintln!("skipping: git not found in PATH");
        return;
    }
    let td = tempfile::tempdir().expect("tmpdir");
    let sandbox = td.path();
    let repo = sandbox.join("repo");
    fs::create_dir_all(&repo).unwrap();
    repo_with_main(&repo);
    let patterns = write_patterns(sandbox);
    let state = sandbox.join("state");
    let stub = write_stub(
        sandbox,
        "cursor-agent",
        &state,
        r#"printf '%s' '{"result":"I will look at the repository first.\n\n## BUSINESS POSTURE\nbody"}'"#,
    );

    let out = archy(sandbox)
        .args(["--fresh", "-n", "Shop", "--patterns-dir"])
        .arg(&patterns)
        .arg(&repo)
        .env("ARCHY_CURSOR_AGENT_BIN", &stub)
        .output()
        .expect("run archy");
    assert!(out.status.success(), "{}", describe(&out));
    assert_eq!(
        fs::read_to_string(repo.join("arch.md")).unwrap(),
        "## BUSINESS POSTURE\nbody"
    );
    assert!(read_state(&state, "prompt_1").contains("Project Name: Shop"));
}

#[test]
fn test_fresh_is_idempotent_with_deterministic_backend() {
    if !have_git() {
        eprintln!("skipping: git not found in PATH");
        return;
    }
    let td = tempfile::tempdir().expect("tmpdir");
    let sandbox = td.path();
    let repo = sandbox.join("repo");
    fs::create_dir_all(&repo).unwrap();
    repo_with_main(&repo);
    let patterns = write_patterns(sandbox);
    let state = sandbox.join("state");
    let stub = write_stub(sandbox, "cursor-agent", &state, DOC_JSON);

    let mut docs = Vec::new();
    for _ in 0..2 {
        let out = archy(sandbox)
            .args(["--fresh", "-d", "ARCHITECTURE.md", "--patterns-dir"])
            .arg(&patterns)
            .arg(&repo)
            .env("ARCHY_CURSOR_AGENT_BIN", &stub)
            .output()
            .expect("run archy");
        assert!(out.status.success(), "{}", describe(&out));
        assert_eq!(stdout_json(&out)["action"], "created");
        docs.push(fs::read(repo.join("ARCHITECTURE.md")).unwrap());
    }
    assert_eq!(docs[0], docs[1]);
}

#[test]
fn test_fresh_backend_failure_is_fatal_and_writes_nothing() {
    if !have_git() {
        eprintln!("skipping: git not found in PATH");
        return;
    }
    let td = tempfile::tempdir().expect("tmpdir");
    let sandbox = td.path();
    let repo = sandbox.join("repo");
    fs::create_dir_all(&repo).unwrap();
    repo_with_main(&repo);
    let patterns = write_patterns(sandbox);
    let state = sandbox.join("state");
    let stub = write_stub(
        sandbox,
        "cursor-agent",
        &state,
        "echo 'authentication required' >&2\nexit 3",
    );

    let out = archy(sandbox)
        .args(["--fresh", "--patterns-dir"])
        .arg(&patterns)
        .arg(&repo)
        .env("ARCHY_CURSOR_AGENT_BIN", &stub)
        .output()
        .expect("run archy");
    assert_eq!(out.status.code(), Some(1), "{}", describe(&out));
    assert!(out.stdout.is_empty(), "{}", describe(&out));
    let err = stderr_json(&out);
    assert_eq!(err["success"], false);
    assert_eq!(err["kind"], "backend_failed");
    assert!(err["error"].as_str().unwrap().contains("authentication required"));
    assert!(!repo.join("arch.md").exists());
    assert!(leftover_tmp(sandbox).is_empty(), "scratch dir left behind");
}

#[test]
fn test_fresh_with_fabric_pipes_prompt_on_stdin() {
    if !have_git() {
        eprintln!("skipping: git not found in PATH");
        return;
    }
    let td = tempfile::tempdir().expect("tmpdir");
    let sandbox = td.path();
    let repo = sandbox.join("repo");
    fs::create_dir_all(&repo).unwrap();
    repo_with_main(&repo);
    let patterns = write_patterns(sandbox);
    let state = sandbox.join("state");
    let stub = write_stub(
        sandbox,
        "fabric-ai",
        &state,
        "printf 'Sure.\\n## BUSINESS POSTURE\\nfrom fabric\\n'",
    );

    let out = archy(sandbox)
        .args(["--fresh", "-t", "fabric", "--patterns-dir"])
        .arg(&patterns)
        .arg(&repo)
        .env("ARCHY_FABRIC_BIN", &stub)
        .env("ARCHY_FABRIC_MODEL", "test-model")
        .output()
        .expect("run archy");
    assert!(out.status.success(), "{}", describe(&out));
    assert_eq!(
        fs::read_to_string(repo.join("arch.md")).unwrap(),
        "## BUSINESS POSTURE\nfrom fabric"
    );
    assert_eq!(read_state(&state, "args_1"), "--model\ntest-model\n");
    assert!(read_state(&state, "stdin_1").starts_with("CREATE TEMPLATE"));
}

#[test]
fn test_fresh_subfolder_scopes_listing() {
    if !have_git() {
        eprintln!("skipping: git not found in PATH");
        return;
    }
    let td = tempfile::tempdir().expect("tmpdir");
    let sandbox = td.path();
    let repo = sandbox.join("repo");
    fs::create_dir_all(&repo).unwrap();
    repo_with_main(&repo);
    let patterns = write_patterns(sandbox);
    let state = sandbox.join("state");
    let stub = write_stub(sandbox, "cursor-agent", &state, DOC_JSON);

    let out = archy(sandbox)
        .args(["--fresh", "-f", "app", "--patterns-dir"])
        .arg(&patterns)
        .arg(&repo)
        .env("ARCHY_CURSOR_AGENT_BIN", &stub)
        .output()
        .expect("run archy");
    assert!(out.status.success(), "{}", describe(&out));
    assert!(repo.join("app").join("arch.md").is_file());
    assert!(!repo.join("arch.md").exists());
    let prompt = read_state(&state, "prompt_1");
    assert!(prompt.contains("- app/service.py"), "{prompt}");
    assert!(!prompt.contains("web/index.ts"), "{prompt}");
    assert!(prompt.contains("Project Name: app"), "{prompt}");
}
