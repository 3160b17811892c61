use std::{
    fs,
    path::PathBuf,
    process::{Command, Output, Stdio},
    thread,
    time::Duration,
};

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_sat-cancel"))
}

// Pigeonhole instance with `holes + 1` pigeons; unsatisfiable and far too hard to finish in a
// second for plain DPLL. Var p * holes + h + 1 means pigeon p sits in hole h.
fn write_pigeonhole(name: &str, holes: usize) -> PathBuf {
    let pigeons = holes + 1;
    let var = |p: usize, h: usize| p * holes + h + 1;
    let mut clauses = vec![];
    for p in 0..pigeons {
        let lits = (0..holes)
            .map(|h| var(p, h).to_string())
            .collect::<Vec<_>>();
        clauses.push(format!("{} 0", lits.join(" ")));
    }
    for h in 0..holes {
        for p in 0..pigeons {
            for q in p + 1..pigeons {
                clauses.push(format!("-{} -{} 0", var(p, h), var(q, h)));
            }
        }
    }

    let path = std::env::temp_dir().join(format!(
        "sat-cancel-{}-{}.cnf",
        std::process::id(),
        name
    ));
    let body = format!(
        "c pigeonhole {}/{}\np cnf {} {}\n{}\n",
        pigeons,
        holes,
        pigeons * holes,
        clauses.len(),
        clauses.join("\n")
    );
    fs::write(&path, body).expect("Failed to write instance");
    path
}

fn run(name: &str, args: &[&str]) -> Output {
    let cnf = write_pigeonhole(name, 10);
    let output = Command::new(binary())
        .arg("--file")
        .arg(&cnf)
        .args(args)
        .output()
        .expect("Failed to execute sat-cancel");
    let _ = fs::remove_file(&cnf);
    output
}

#[test]
fn test_timeout_terminate_exits_with_status_2() {
    let output = run("terminate", &["-t", "1", "-o", "terminate"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(
        output.status.code(),
        Some(2),
        "stderr: {}\nstdout: {}",
        stderr,
        stdout
    );
    assert!(stderr.contains("TIMEOUT EXPIRED: forced exit."));
    assert_eq!(stdout.matches("c statistics of").count(), 1);
    assert!(stdout.contains("c statistics of sat-cancel-"));
    // Terminated before the driver prints its status line
    assert!(!stdout.contains("s UNKNOWN"));
}

#[test]
fn test_timeout_continue_prints_unknown() {
    let output = run("continue", &["-t", "1"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(
        output.status.success(),
        "stderr: {}\nstdout: {}",
        stderr,
        stdout
    );
    assert!(stderr.contains("TIMEOUT EXPIRED: stopping search."));
    assert_eq!(stdout.matches("c statistics of").count(), 1);
    assert!(stdout.lines().any(|l| l == "s UNKNOWN"));
    assert!(stdout.contains("Status: UNKNOWN (timed out)"));
}

#[test]
fn test_sigint_reports_once_and_continues() {
    let cnf = write_pigeonhole("sigint", 10);
    let child = Command::new(binary())
        .arg("--file")
        .arg(&cnf)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute sat-cancel");

    thread::sleep(Duration::from_millis(500));
    // Safety: kill(2) on our own child process.
    unsafe { libc::kill(child.id() as libc::pid_t, libc::SIGINT) };
    let output = child.wait_with_output().expect("Failed to wait on sat-cancel");
    let _ = fs::remove_file(&cnf);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        output.status.success(),
        "stderr: {}\nstdout: {}",
        stderr,
        stdout
    );
    assert!(stderr.contains("CATCHING SIG_INT: stopping search."));
    assert_eq!(stdout.matches("c statistics of").count(), 1);
    assert!(stdout.contains("Status: UNKNOWN (interrupted)"));
}
