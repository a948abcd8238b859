use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, TimeZone};

use super::marker::{clear_marker, read_marker, write_marker};
use super::{
    DriverSearch, JAVA9_OPEN_FLAG, JvmSettings, LaunchRequest, RunStatus, RunStore, WorkerExit,
    WorkerInvocation, derive_run_name, validate_run_name,
};
use crate::error::LaunchError;

fn run_async_test<F>(future: F) -> Result<(), String>
where
    F: std::future::Future<Output = Result<(), String>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to build runtime: {}", err))?;
    runtime.block_on(future)
}

fn request(name: &str) -> LaunchRequest {
    LaunchRequest {
        name: Some(name.to_owned()),
        config: Some(PathBuf::from("conf/lakehouse.properties")),
        sql_files: vec!["q1.sql".to_owned(), "q2.sql".to_owned()],
        repeat: 5,
        concurrency: 2,
        failure_rate: 10,
        prefix: None,
        driver_jar: Some(PathBuf::from("clickzetta-jdbc-1.0.jar")),
        extra_jars: Vec::new(),
    }
}

/// A `/bin/sh` stand-in for the JVM; every worker flag lands in `$@`.
#[cfg(unix)]
fn shell_worker(script: &str) -> JvmSettings {
    JvmSettings {
        program: "/bin/sh".to_owned(),
        jvm_params: vec!["-c".to_owned(), script.to_owned(), "worker".to_owned()],
        ..JvmSettings::default()
    }
}

fn read_text(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|err| format!("read {} failed: {}", path.display(), err))
}

#[test]
fn invocation_orders_classpath_and_flags() -> Result<(), String> {
    let jvm = JvmSettings {
        java9: true,
        ..JvmSettings::default()
    };
    let mut req = request("r1");
    req.extra_jars = vec![PathBuf::from("extra-a.jar"), PathBuf::from("extra-b.jar")];
    req.prefix = Some("bench_".to_owned());
    let invocation = WorkerInvocation::build(&jvm, &req, Path::new("/data/r1/data.csv"))
        .map_err(|err| err.to_string())?;

    let args: Vec<String> = invocation
        .args
        .iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let classpath = std::env::join_paths([
        "jdbc-stress-tool-1.0-jar-with-dependencies.jar",
        "clickzetta-jdbc-1.0.jar",
        "extra-a.jar",
        "extra-b.jar",
    ])
    .map_err(|err| err.to_string())?
    .to_string_lossy()
    .into_owned();
    let expected: Vec<String> = [
        "-Xmx4g",
        JAVA9_OPEN_FLAG,
        "-cp",
        classpath.as_str(),
        "com.clickzetta.jdbc_stress_tool.Main",
        "-c",
        "conf/lakehouse.properties",
        "-q",
        "q1.sql,q2.sql",
        "-r",
        "5",
        "-t",
        "2",
        "-f",
        "10",
        "-o",
        "/data/r1/data.csv",
        "--prefix",
        "bench_",
    ]
    .iter()
    .map(|arg| (*arg).to_owned())
    .collect();
    if invocation.program != "java" || args != expected {
        return Err(format!("Unexpected invocation: {} {:?}", invocation.program, args));
    }
    Ok(())
}

#[test]
fn invocation_without_driver_keeps_tool_jar_first() -> Result<(), String> {
    let mut req = request("r1");
    req.driver_jar = None;
    req.extra_jars = vec![PathBuf::from("mine.jar")];
    let invocation = WorkerInvocation::build(&JvmSettings::default(), &req, Path::new("out.csv"))
        .map_err(|err| err.to_string())?;
    let expected = std::env::join_paths(["jdbc-stress-tool-1.0-jar-with-dependencies.jar", "mine.jar"])
        .map_err(|err| err.to_string())?;
    let position = invocation.args.iter().position(|arg| arg == "-cp");
    let classpath = position.and_then(|idx| invocation.args.get(idx.saturating_add(1)));
    if classpath != Some(&expected) {
        return Err(format!("Unexpected classpath {:?}", classpath));
    }
    if invocation.args.iter().any(|arg| arg == "--prefix") {
        return Err("Prefix flag should be omitted".to_owned());
    }
    Ok(())
}

#[test]
fn launch_requires_config_and_sql() -> Result<(), String> {
    run_async_test(async {
        let dir = tempfile::tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
        let store = RunStore::new(dir.path().join("data"));

        let mut no_config = request("r1");
        no_config.config = None;
        match store.launch(&JvmSettings::default(), &no_config, dir.path()) {
            Err(LaunchError::NoConfigSelected) => {}
            other => return Err(format!("Expected NoConfigSelected, got {:?}", other)),
        }

        let mut no_sql = request("r1");
        no_sql.sql_files = vec!["  ".to_owned()];
        match store.launch(&JvmSettings::default(), &no_sql, dir.path()) {
            Err(LaunchError::NoSqlSelected) => {}
            other => return Err(format!("Expected NoSqlSelected, got {:?}", other)),
        }

        if store.paths("r1").dir.exists() {
            return Err("Rejected launch must not create a run directory".to_owned());
        }
        Ok(())
    })
}

#[cfg(unix)]
#[test]
fn natural_exit_clears_marker_and_keeps_files() -> Result<(), String> {
    run_async_test(async {
        let dir = tempfile::tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
        let store = RunStore::new(dir.path().join("data"));
        let worker = shell_worker("echo started; echo complaint 1>&2; exit 3");

        let handle = store
            .launch(&worker, &request("natural"), dir.path())
            .map_err(|err| err.to_string())?;
        let paths = handle.paths().clone();
        let marker = read_text(&paths.marker)?;
        if marker.trim() != handle.pid().to_string() {
            return Err(format!("Marker {:?} does not match pid {}", marker, handle.pid()));
        }
        if !store.is_active("natural") {
            return Err("Run should be active before wait".to_owned());
        }

        let outcome = handle.wait().await.map_err(|err| err.to_string())?;
        if outcome.status != RunStatus::Finished || !outcome.marker_cleared {
            return Err(format!("Unexpected outcome {:?}", outcome));
        }
        if outcome.exit
            != (WorkerExit::Exited {
                code: Some(3),
                signal: None,
            })
        {
            return Err(format!("Unexpected exit {:?}", outcome.exit));
        }
        if paths.marker.exists() || store.is_active("natural") {
            return Err("Marker should be gone after exit".to_owned());
        }
        let log = read_text(&paths.log)?;
        if !log.contains("started") || !log.contains("complaint") {
            return Err(format!("Log missing output: {:?}", log));
        }
        Ok(())
    })
}

#[cfg(unix)]
#[test]
fn worker_receives_absolute_results_path() -> Result<(), String> {
    run_async_test(async {
        let dir = tempfile::tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
        let store = RunStore::new(dir.path().join("data"));
        let script = r#"while [ $# -gt 0 ]; do if [ "$1" = "-o" ]; then echo "thread_name" > "$2"; fi; shift; done"#;
        let handle = store
            .launch(&shell_worker(script), &request("results"), dir.path())
            .map_err(|err| err.to_string())?;
        let results = handle.paths().results.clone();
        handle.wait().await.map_err(|err| err.to_string())?;
        let text = read_text(&results)?;
        if text.trim() != "thread_name" {
            return Err(format!("Unexpected results file {:?}", text));
        }
        Ok(())
    })
}

#[cfg(unix)]
#[test]
fn terminate_through_attached_handle_stops_run() -> Result<(), String> {
    run_async_test(async {
        let dir = tempfile::tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
        let store = RunStore::new(dir.path().join("data"));
        let handle = store
            .launch(&shell_worker("exec sleep 30"), &request("long"), dir.path())
            .map_err(|err| err.to_string())?;

        let Some(attached) = store.attach("long").await else {
            return Err("Attach should find the marker".to_owned());
        };
        if attached.pid() != handle.pid() {
            return Err(format!("Attached pid {} != {}", attached.pid(), handle.pid()));
        }
        if !attached.terminate().map_err(|err| err.to_string())? {
            return Err("A live worker should receive the signal".to_owned());
        }

        let outcome = handle.wait().await.map_err(|err| err.to_string())?;
        if outcome.status != RunStatus::Stopped || !outcome.marker_cleared {
            return Err(format!("Unexpected outcome {:?}", outcome));
        }

        // The second waiter finds the pid gone and the marker already cleared.
        let late = attached
            .with_poll_interval(Duration::from_millis(10))
            .wait()
            .await
            .map_err(|err| err.to_string())?;
        if late.exit != WorkerExit::Vanished || late.marker_cleared {
            return Err(format!("Unexpected late outcome {:?}", late));
        }
        if store.attach("long").await.is_some() {
            return Err("Marker should be gone after stop".to_owned());
        }
        Ok(())
    })
}

#[cfg(unix)]
#[test]
fn terminate_after_exit_is_noop() -> Result<(), String> {
    run_async_test(async {
        let dir = tempfile::tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
        let store = RunStore::new(dir.path().join("data"));
        let handle = store
            .launch(&shell_worker("exit 0"), &request("quick"), dir.path())
            .map_err(|err| err.to_string())?;
        let stopper = handle.stopper();
        let outcome = handle.wait().await.map_err(|err| err.to_string())?;
        if outcome.status != RunStatus::Finished {
            return Err(format!("Unexpected outcome {:?}", outcome));
        }
        if stopper.terminate().map_err(|err| err.to_string())? {
            return Err("An exited worker should report no delivery".to_owned());
        }
        Ok(())
    })
}

#[test]
fn attach_without_marker_is_none() -> Result<(), String> {
    run_async_test(async {
        let dir = tempfile::tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
        let store = RunStore::new(dir.path());
        std::fs::create_dir(dir.path().join("idle")).map_err(|err| err.to_string())?;
        if store.attach("idle").await.is_some() || store.attach("missing").await.is_some() {
            return Err("Attach should miss without a marker".to_owned());
        }
        if store.attach("../escape").await.is_some() {
            return Err("Attach should reject path-like names".to_owned());
        }
        Ok(())
    })
}

#[cfg(unix)]
#[test]
fn launch_refuses_existing_run() -> Result<(), String> {
    run_async_test(async {
        let dir = tempfile::tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
        let store = RunStore::new(dir.path());
        std::fs::create_dir(dir.path().join("taken")).map_err(|err| err.to_string())?;
        match store.launch(&shell_worker("exit 0"), &request("taken"), dir.path()) {
            Err(LaunchError::RunExists { name }) if name == "taken" => Ok(()),
            other => Err(format!("Expected RunExists, got {:?}", other)),
        }
    })
}

#[test]
fn spawn_failure_leaves_nothing_behind() -> Result<(), String> {
    run_async_test(async {
        let dir = tempfile::tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
        let store = RunStore::new(dir.path());
        let jvm = JvmSettings {
            program: dir
                .path()
                .join("no-such-java")
                .to_string_lossy()
                .into_owned(),
            ..JvmSettings::default()
        };
        match store.launch(&jvm, &request("broken"), dir.path()) {
            Err(LaunchError::Spawn { .. }) => {}
            other => return Err(format!("Expected Spawn error, got {:?}", other)),
        }
        if store.paths("broken").dir.exists() || store.is_active("broken") {
            return Err("Failed launch left files behind".to_owned());
        }
        Ok(())
    })
}

#[cfg(unix)]
#[test]
fn delete_refuses_active_run() -> Result<(), String> {
    run_async_test(async {
        let dir = tempfile::tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
        let store = RunStore::new(dir.path());
        let handle = store
            .launch(&shell_worker("exec sleep 30"), &request("busy"), dir.path())
            .map_err(|err| err.to_string())?;
        match store.delete("busy").await {
            Err(LaunchError::RunActive { pid, .. }) if pid == handle.pid() => {}
            other => return Err(format!("Expected RunActive, got {:?}", other)),
        }
        handle.terminate().map_err(|err| err.to_string())?;
        handle.wait().await.map_err(|err| err.to_string())?;
        store.delete("busy").await.map_err(|err| err.to_string())?;
        if store.paths("busy").dir.exists() {
            return Err("Run directory should be removed".to_owned());
        }
        match store.delete("busy").await {
            Err(LaunchError::RunMissing { .. }) => Ok(()),
            other => Err(format!("Expected RunMissing, got {:?}", other)),
        }
    })
}

#[cfg(unix)]
fn dead_pid() -> Result<u32, String> {
    let mut child = std::process::Command::new("/bin/sh")
        .args(["-c", "exit 0"])
        .spawn()
        .map_err(|err| err.to_string())?;
    let pid = child.id();
    child.wait().map_err(|err| err.to_string())?;
    Ok(pid)
}

#[cfg(unix)]
#[test]
fn list_orders_newest_first_and_infers_status() -> Result<(), String> {
    run_async_test(async {
        let dir = tempfile::tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
        let store = RunStore::new(dir.path());
        let write = |path: PathBuf, text: String| {
            std::fs::write(&path, text).map_err(|err| format!("write {} failed: {}", path.display(), err))
        };

        std::fs::create_dir(dir.path().join("oldest")).map_err(|err| err.to_string())?;
        write(store.paths("oldest").log, "done\n".to_owned())?;
        tokio::time::sleep(Duration::from_millis(50)).await;

        std::fs::create_dir(dir.path().join("stale")).map_err(|err| err.to_string())?;
        write(store.paths("stale").log, "crashed\n".to_owned())?;
        write(store.paths("stale").marker, dead_pid()?.to_string())?;
        tokio::time::sleep(Duration::from_millis(50)).await;

        std::fs::create_dir(dir.path().join("newest")).map_err(|err| err.to_string())?;
        write(dir.path().join("stray.txt"), "not a run".to_owned())?;

        let runs = store.list().await.map_err(|err| err.to_string())?;
        let summary: Vec<(&str, RunStatus)> = runs
            .iter()
            .map(|run| (run.name.as_str(), run.status))
            .collect();
        let expected = vec![
            ("newest", RunStatus::Pending),
            ("stale", RunStatus::Finished),
            ("oldest", RunStatus::Finished),
        ];
        if summary != expected {
            return Err(format!("Unexpected listing {:?}", summary));
        }
        if runs.iter().any(|run| run.has_results) {
            return Err("No run has results".to_owned());
        }
        Ok(())
    })
}

#[test]
fn list_on_missing_root_is_empty() -> Result<(), String> {
    run_async_test(async {
        let dir = tempfile::tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
        let store = RunStore::new(dir.path().join("nothing-here"));
        let runs = store.list().await.map_err(|err| err.to_string())?;
        if !runs.is_empty() {
            return Err(format!("Expected no runs, got {}", runs.len()));
        }
        Ok(())
    })
}

#[test]
fn open_renames_legacy_files() -> Result<(), String> {
    let dir = tempfile::tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let store = RunStore::new(dir.path());
    let run_dir = dir.path().join("legacy");
    std::fs::create_dir(&run_dir).map_err(|err| err.to_string())?;
    std::fs::write(run_dir.join("legacy.log"), "old log\n").map_err(|err| err.to_string())?;
    std::fs::write(run_dir.join("legacy.csv"), "thread_name\n").map_err(|err| err.to_string())?;

    let paths = store.open("legacy").map_err(|err| err.to_string())?;
    if read_text(&paths.log)? != "old log\n" || read_text(&paths.results)? != "thread_name\n" {
        return Err("Legacy files were not renamed".to_owned());
    }
    if run_dir.join("legacy.log").exists() || run_dir.join("legacy.csv").exists() {
        return Err("Legacy names should be gone".to_owned());
    }
    match store.open("absent") {
        Err(LaunchError::RunMissing { .. }) => Ok(()),
        other => Err(format!("Expected RunMissing, got {:?}", other)),
    }
}

#[test]
fn marker_round_trip_and_ownership() -> Result<(), String> {
    run_async_test(async {
        let dir = tempfile::tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
        let marker = dir.path().join("pid");
        if read_marker(&marker).await.is_some() {
            return Err("Missing marker should read as None".to_owned());
        }
        write_marker(&marker, 4242).map_err(|err| err.to_string())?;
        if read_marker(&marker).await != Some(4242) {
            return Err("Marker should hold the written pid".to_owned());
        }
        if clear_marker(&marker, 99).await || !marker.exists() {
            return Err("A different pid must not clear the marker".to_owned());
        }
        if !clear_marker(&marker, 4242).await || marker.exists() {
            return Err("Owner should clear the marker".to_owned());
        }
        if clear_marker(&marker, 4242).await {
            return Err("Clearing twice should be a no-op".to_owned());
        }

        std::fs::write(&marker, "not-a-pid").map_err(|err| err.to_string())?;
        if read_marker(&marker).await.is_some() {
            return Err("Garbage marker should read as None".to_owned());
        }
        Ok(())
    })
}

#[test]
fn driver_search_prefers_override_then_newest_jar() -> Result<(), String> {
    let dir = tempfile::tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let base = std::time::SystemTime::now();
    let jars = [
        ("clickzetta-jdbc-1.0.jar", Duration::from_secs(300)),
        ("clickzetta-java-2.0.jar", Duration::from_secs(10)),
        ("other-driver-9.0.jar", Duration::from_secs(0)),
        ("clickzetta-jdbc-3.0.txt", Duration::from_secs(0)),
    ];
    for (name, age) in jars {
        let path = dir.path().join(name);
        let file = std::fs::File::create(&path).map_err(|err| err.to_string())?;
        let modified = base.checked_sub(age).ok_or("time underflow")?;
        file.set_modified(modified).map_err(|err| err.to_string())?;
    }

    let search = DriverSearch {
        dir: dir.path().to_path_buf(),
        ..DriverSearch::default()
    };
    let found = search.resolve().map_err(|err| err.to_string())?;
    if found != dir.path().join("clickzetta-java-2.0.jar") {
        return Err(format!("Unexpected driver {}", found.display()));
    }

    let configured = DriverSearch {
        configured: Some(PathBuf::from("pinned.jar")),
        ..search.clone()
    };
    if configured.resolve().map_err(|err| err.to_string())? != Path::new("pinned.jar") {
        return Err("Configured driver should win over discovery".to_owned());
    }
    let overridden = DriverSearch {
        env_override: Some(PathBuf::from("env.jar")),
        ..configured
    };
    if overridden.resolve().map_err(|err| err.to_string())? != Path::new("env.jar") {
        return Err("Environment override should win".to_owned());
    }
    Ok(())
}

#[test]
fn driver_search_without_match_fails() -> Result<(), String> {
    let dir = tempfile::tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let search = DriverSearch {
        dir: dir.path().to_path_buf(),
        ..DriverSearch::default()
    };
    match search.resolve() {
        Err(LaunchError::DriverNotFound { .. }) => Ok(()),
        other => Err(format!("Expected DriverNotFound, got {:?}", other)),
    }
}

#[test]
fn run_names_follow_timestamp_pattern() -> Result<(), String> {
    let now = Local
        .with_ymd_and_hms(2024, 3, 9, 7, 5, 1)
        .single()
        .ok_or("ambiguous local time")?;
    let name = derive_run_name(Path::new("conf/lakehouse.properties"), now);
    if name != "2024-03-09_07-05-01_lakehouse" {
        return Err(format!("Unexpected name {}", name));
    }
    for bad in ["", " ", ".", "..", "a/b", "a\\b", " padded"] {
        if validate_run_name(bad).is_ok() {
            return Err(format!("Name {:?} should be rejected", bad));
        }
    }
    validate_run_name("2024-03-09_07-05-01_lakehouse").map_err(|err| err.to_string())
}

#[cfg(not(unix))]
#[test]
fn attached_wait_without_pid_probes_errors() -> Result<(), String> {
    run_async_test(async {
        let dir = tempfile::tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
        let paths = super::RunPaths::new(dir.path(), "remote");
        let handle = super::RunHandle::attached("remote".to_owned(), paths, 4242)
            .with_poll_interval(Duration::from_millis(10));
        match handle.wait().await {
            Err(LaunchError::AttachedWaitUnsupported { pid: 4242 }) => Ok(()),
            other => Err(format!("Expected AttachedWaitUnsupported, got {:?}", other)),
        }
    })
}
