use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener};
use std::thread::{self, JoinHandle};

use assert_cmd::Command;
use predicates::prelude::*;

const BIN: &str = "beanjack";

/// One scripted exchange: the prefix the next command line must start with,
/// and the raw reply bytes to send back.
struct Exchange {
    expect: &'static str,
    reply: Vec<u8>,
}

fn ex(expect: &'static str, reply: impl Into<Vec<u8>>) -> Exchange {
    Exchange {
        expect,
        reply: reply.into(),
    }
}

/// Builds an `OK <n>` reply around a YAML payload.
fn ok_reply(data: &str) -> Vec<u8> {
    let mut reply = format!("OK {}\r\n", data.len()).into_bytes();
    reply.extend_from_slice(data.as_bytes());
    reply.extend_from_slice(b"\r\n");
    reply
}

/// Spawns a single-connection server that walks through `script` in order,
/// asserting each received command line and answering with the canned reply.
/// `put` command lines also consume the job body line that follows.
fn spawn_server(script: Vec<Exchange>) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut writer = stream;

        for step in script {
            let mut line = String::new();
            let n = reader.read_line(&mut line).unwrap();
            assert!(n > 0, "connection closed, expected {:?}", step.expect);
            let line = line.trim_end_matches("\r\n");

            assert!(
                line.starts_with(step.expect),
                "got {:?}, expected prefix {:?}",
                line,
                step.expect
            );

            if line.starts_with("put ") {
                let mut body = String::new();
                reader.read_line(&mut body).unwrap();
            }

            writer.write_all(&step.reply).unwrap();
            writer.flush().unwrap();
        }
    });

    (addr, handle)
}

fn beanjack(addr: SocketAddr) -> Command {
    let mut cmd = Command::cargo_bin(BIN).unwrap();
    cmd.arg("--host")
        .arg(addr.ip().to_string())
        .arg("--port")
        .arg(addr.port().to_string());
    cmd
}

#[test]
fn no_mode_is_a_usage_error() {
    Command::cargo_bin(BIN)
        .unwrap()
        .assert()
        .code(64)
        .stderr(predicate::str::contains("required"));
}

#[test]
fn two_modes_is_a_usage_error() {
    Command::cargo_bin(BIN)
        .unwrap()
        .args(["--list", "--ping"])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn connect_failure_names_the_target() {
    // Bind then drop to get a port nothing is listening on.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    beanjack(addr)
        .arg("--list")
        .assert()
        .code(2)
        .stderr(predicate::str::contains(format!(
            "could not connect to {}:{}",
            addr.ip(),
            addr.port()
        )));
}

#[test]
fn list_prints_tubes_in_server_order() {
    let (addr, server) = spawn_server(vec![ex(
        "list-tubes",
        ok_reply("---\n- default\n- alerts\n"),
    )]);

    beanjack(addr)
        .arg("--list")
        .assert()
        .success()
        .stdout("default\nalerts\n");

    server.join().unwrap();
}

#[test]
fn list_of_no_tubes_prints_nothing() {
    let (addr, server) =
        spawn_server(vec![ex("list-tubes", ok_reply("--- []\n"))]);

    beanjack(addr).arg("--list").assert().success().stdout("");

    server.join().unwrap();
}

#[test]
fn stats_prints_key_value_lines() {
    let (addr, server) = spawn_server(vec![ex(
        "stats-tube alerts",
        ok_reply("---\nname: alerts\ncurrent-jobs-ready: 3\n"),
    )]);

    beanjack(addr)
        .args(["--stats", "--tube", "alerts"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Stats for alerts")
                .and(predicate::str::contains("current-jobs-ready: 3"))
                .and(predicate::str::contains("name: alerts")),
        );

    server.join().unwrap();
}

#[test]
fn put_prints_the_new_job_id() {
    let (addr, server) = spawn_server(vec![
        ex("use default", &b"USING default\r\n"[..]),
        ex("put 10 3 120 5", &b"INSERTED 99\r\n"[..]),
    ]);

    beanjack(addr)
        .args(["--put", "--text", "hello", "--pri", "10", "--delay", "3s"])
        .assert()
        .success()
        .stdout("99\n");

    server.join().unwrap();
}

#[test]
fn kick_prints_the_server_count() {
    let (addr, server) = spawn_server(vec![
        ex("use default", &b"USING default\r\n"[..]),
        ex("kick 5", &b"KICKED 2\r\n"[..]),
    ]);

    beanjack(addr)
        .args(["--kick", "--jobs", "5"])
        .assert()
        .success()
        .stdout("Kicked 2 jobs from tube default\n");

    server.join().unwrap();
}

#[test]
fn bury_of_unknown_job_fails() {
    let (addr, server) = spawn_server(vec![
        ex("use default", &b"USING default\r\n"[..]),
        ex("bury 7 0", &b"NOT_FOUND\r\n"[..]),
    ]);

    beanjack(addr)
        .args(["--bury", "--id", "7"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("could not bury job 7"));

    server.join().unwrap();
}

#[test]
fn ping_round_trip_reports_ok() {
    let (addr, server) = spawn_server(vec![
        ex("use default", &b"USING default\r\n"[..]),
        ex("put 1 0 5 20", &b"INSERTED 7\r\n"[..]),
        ex("peek 7", &b"FOUND 7 20\r\ncheck_beanstalk_ping\r\n"[..]),
        ex("delete 7", &b"DELETED\r\n"[..]),
    ]);

    beanjack(addr)
        .arg("--ping")
        .assert()
        .success()
        .stderr(predicate::str::contains("PUT->Peek OK"));

    server.join().unwrap();
}

#[test]
fn ping_with_altered_body_fails() {
    let (addr, server) = spawn_server(vec![
        ex("use default", &b"USING default\r\n"[..]),
        ex("put 1 0 5 20", &b"INSERTED 7\r\n"[..]),
        ex("peek 7", &b"FOUND 7 20\r\ncheck_beanstalk_pong\r\n"[..]),
        ex("delete 7", &b"DELETED\r\n"[..]),
    ]);

    beanjack(addr)
        .arg("--ping")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown jobs in test tube"));

    server.join().unwrap();
}

#[test]
fn clear_drains_and_counts() {
    let (addr, server) = spawn_server(vec![
        ex("watch alerts", &b"WATCHING 2\r\n"[..]),
        ex("ignore default", &b"WATCHING 1\r\n"[..]),
        ex("reserve-with-timeout 0", &b"RESERVED 1 1\r\na\r\n"[..]),
        ex("delete 1", &b"DELETED\r\n"[..]),
        ex("reserve-with-timeout 0", &b"TIMED_OUT\r\n"[..]),
    ]);

    beanjack(addr)
        .args(["--clear", "--tube", "alerts"])
        .assert()
        .success()
        .stdout("Cleared 1 jobs from tube alerts\n");

    server.join().unwrap();
}

#[test]
fn peek_prints_id_and_body() {
    let (addr, server) = spawn_server(vec![
        ex("use default", &b"USING default\r\n"[..]),
        ex("peek-ready", &b"FOUND 12 5\r\nhello\r\n"[..]),
    ]);

    beanjack(addr)
        .arg("--peek")
        .assert()
        .success()
        .stdout("ID: 12\nBody: hello\n");

    server.join().unwrap();
}
