//! `DockerProvider` tests: argument construction, image pulls, the argv
//! transport and concurrent provisioning.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use kindle_cli::application::ports::{ImagePuller, LaunchRequest, Node, NodeLauncher, Provider};
use kindle_cli::application::services::planner::ExecutionPolicy;
use kindle_cli::application::services::retry::LinearBackoff;
use kindle_cli::application::services::storage::ReadinessWait;
use kindle_cli::infra::docker::{DockerProvider, run_args};
use kindle_common::{ClusterConfig, NodeRole, NodeSpec, PortMapping, PortProtocol};

use crate::helpers::{Call, MockCommandRunner, RecordingReporter, err_output, ok_output};

const NO_BACKOFF: LinearBackoff = LinearBackoff::new(0, Duration::ZERO);

fn provider(runner: &MockCommandRunner) -> DockerProvider<MockCommandRunner> {
    DockerProvider::new(runner.clone(), "docker", NO_BACKOFF)
}

fn single_container(call: &Call) -> std::io::Result<std::process::Output> {
    if call.starts_with(&["ps"]) {
        Ok(ok_output(b"kind-control-plane\n"))
    } else {
        Ok(ok_output(b""))
    }
}

/// Every call succeeds; systemd reports a finished boot.
fn booted(call: &Call) -> std::io::Result<std::process::Output> {
    if call.line().ends_with("systemctl is-system-running") {
        Ok(ok_output(b"running\n"))
    } else {
        Ok(ok_output(b""))
    }
}

#[test]
fn nodes_are_created_concurrently() {
    let runner = MockCommandRunner::succeeding();
    assert_eq!(provider(&runner).options().policy, ExecutionPolicy::Concurrent);
}

#[test]
fn run_args_publish_port_mappings() {
    let mut spec = NodeSpec::new(NodeRole::ControlPlane);
    spec.extra_port_mappings.push(PortMapping {
        listen_address: "::1".to_string(),
        host_port: 8443,
        container_port: 6443,
        protocol: PortProtocol::Tcp,
    });
    let request = LaunchRequest {
        name: "kind-control-plane",
        cluster: "kind",
        spec: &spec,
    };
    let args = run_args(&request).join(" ");
    assert!(args.starts_with("run --detach --tty --privileged"), "{args}");
    assert!(args.contains("--hostname kind-control-plane --name kind-control-plane"));
    assert!(args.contains("--label kindle.cluster=kind --label kindle.role=control-plane"));
    assert!(args.contains("--publish [::1]:8443:6443/tcp"), "{args}");
    assert!(args.ends_with(&spec.image));
}

#[tokio::test]
async fn present_image_is_not_pulled() {
    let runner = MockCommandRunner::succeeding();
    provider(&runner).pull_image("kindest/node:v1.29.2").await.unwrap();
    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].args, ["inspect", "--type=image", "kindest/node:v1.29.2"]);
}

#[tokio::test]
async fn missing_image_is_pulled() {
    let runner = MockCommandRunner::new(|call| {
        if call.starts_with(&["inspect"]) {
            Ok(err_output(1, b"No such image"))
        } else {
            Ok(ok_output(b""))
        }
    });
    provider(&runner).pull_image("kindest/node:v1.29.2").await.unwrap();
    assert_eq!(runner.calls_starting_with(&["pull"]).len(), 1);
}

#[tokio::test]
async fn list_clusters_is_sorted_and_deduplicated() {
    let runner = MockCommandRunner::new(|_| Ok(ok_output(b"kind\ndev\nkind\n")));
    assert_eq!(provider(&runner).list_clusters().await.unwrap(), ["dev", "kind"]);
    assert!(runner.calls()[0].line().contains("--filter label=kindle.cluster"));
}

#[tokio::test]
async fn exec_passes_argv_and_env_through() {
    let runner = MockCommandRunner::new(single_container);
    let nodes = provider(&runner).list_nodes("kind").await.unwrap();
    nodes[0]
        .command("kubeadm", &["init", "--skip-phases=preflight"])
        .env("KUBECONFIG", "/etc/kubernetes/admin.conf")
        .run()
        .await
        .unwrap();

    let exec = runner.calls_starting_with(&["exec"]);
    assert_eq!(
        exec[0].args,
        [
            "exec",
            "--privileged",
            "-e",
            "KUBECONFIG=/etc/kubernetes/admin.conf",
            "kind-control-plane",
            "kubeadm",
            "init",
            "--skip-phases=preflight",
        ]
    );
    assert_eq!(exec[0].stdin, None);
}

#[tokio::test]
async fn stdin_is_streamed_with_interactive_flag() {
    let runner = MockCommandRunner::new(single_container);
    let nodes = provider(&runner).list_nodes("kind").await.unwrap();
    nodes[0]
        .command("cp", &["/dev/stdin", "/kind/kubeadm.conf"])
        .stdin(b"kind: Config".to_vec())
        .run()
        .await
        .unwrap();

    let exec = runner.calls_starting_with(&["exec"]);
    assert!(exec[0].starts_with(&["exec", "--privileged", "-i", "kind-control-plane", "cp"]));
    assert_eq!(exec[0].stdin.as_deref(), Some(&b"kind: Config"[..]));
}

#[tokio::test]
async fn started_command_pipes_stdin_with_interactive_flag() {
    let runner = MockCommandRunner::new(single_container);
    let nodes = provider(&runner).list_nodes("kind").await.unwrap();
    let started = nodes[0]
        .command("kubectl", &["apply", "-f", "-"])
        .stdin(b"kind: Pod".to_vec())
        .start();
    // The mock cannot hand back a process; the recorded call is what matters.
    assert!(started.is_err());

    let exec = runner.calls_starting_with(&["exec"]);
    assert_eq!(exec.len(), 1);
    assert_eq!(
        exec[0].args,
        ["exec", "--privileged", "-i", "kind-control-plane", "kubectl", "apply", "-f", "-"]
    );
    assert_eq!(exec[0].stdin.as_deref(), Some(&b"kind: Pod"[..]));
}

#[tokio::test]
async fn started_command_without_stdin_is_not_interactive() {
    let runner = MockCommandRunner::new(single_container);
    let nodes = provider(&runner).list_nodes("kind").await.unwrap();
    let _ = nodes[0].command("journalctl", &["-f"]).start();

    let exec = runner.calls_starting_with(&["exec"]);
    assert_eq!(exec[0].args, ["exec", "--privileged", "kind-control-plane", "journalctl", "-f"]);
    assert_eq!(exec[0].stdin, None);
}

#[tokio::test(start_paused = true)]
async fn failing_exec_is_retried_once() {
    let runner = MockCommandRunner::new(|call| {
        if call.starts_with(&["ps"]) {
            Ok(ok_output(b"kind-control-plane\n"))
        } else {
            Ok(err_output(1, b"connection refused"))
        }
    });
    let nodes = provider(&runner).list_nodes("kind").await.unwrap();
    let err = nodes[0].command("true", &[]).run().await.unwrap_err();
    assert!(err.to_string().contains("connection refused"), "{err}");
    assert_eq!(runner.calls_starting_with(&["exec"]).len(), 2);
}

#[tokio::test]
async fn ip_prefers_ipv4() {
    let runner = MockCommandRunner::new(|call| {
        if call.starts_with(&["ps"]) {
            Ok(ok_output(b"kind-control-plane\n"))
        } else {
            Ok(ok_output(b"172.18.0.2,fc00:f853::2\n"))
        }
    });
    let nodes = provider(&runner).list_nodes("kind").await.unwrap();
    let address = nodes[0].ip().await.unwrap();
    assert_eq!(address.ipv4.as_deref(), Some("172.18.0.2"));
    assert_eq!(address.ipv6.as_deref(), Some("fc00:f853::2"));
}

#[tokio::test]
async fn provision_launches_every_node_and_applies_fixups() {
    let runner = MockCommandRunner::new(booted);
    let reporter = RecordingReporter::default();
    let config = ClusterConfig {
        nodes: vec![
            NodeSpec::new(NodeRole::ControlPlane),
            NodeSpec::new(NodeRole::Worker),
            NodeSpec::new(NodeRole::Worker),
        ],
        ..ClusterConfig::default()
    };
    provider(&runner)
        .provision(&reporter, "kind", &config)
        .await
        .unwrap();

    let mut launched: Vec<String> = runner
        .calls_starting_with(&["run"])
        .iter()
        .map(|call| {
            let pos = call.args.iter().position(|a| a == "--name").unwrap();
            call.args[pos + 1].clone()
        })
        .collect();
    launched.sort();
    assert_eq!(launched, ["kind-control-plane", "kind-worker", "kind-worker2"]);

    let control_plane = runner
        .calls_starting_with(&["run"])
        .into_iter()
        .find(|call| call.line().contains("kind-control-plane"))
        .unwrap();
    assert!(control_plane.line().contains("--publish 127.0.0.1::6443/tcp"));

    let hostnames = runner
        .calls()
        .into_iter()
        .filter(|call| call.starts_with(&["exec"]) && call.line().contains("hostnamectl"))
        .count();
    assert_eq!(hostnames, 3);

    let events = reporter.events();
    assert!(events.contains(&"start:Preparing nodes (3)".to_string()), "{events:?}");
    assert_eq!(events.last().map(String::as_str), Some("end:true"));
}

#[tokio::test]
async fn fixups_wait_for_each_node_to_boot() {
    let runner = MockCommandRunner::new(booted);
    let reporter = RecordingReporter::default();
    let config = ClusterConfig {
        nodes: vec![NodeSpec::new(NodeRole::ControlPlane), NodeSpec::new(NodeRole::Worker)],
        ..ClusterConfig::default()
    };
    provider(&runner)
        .provision(&reporter, "kind", &config)
        .await
        .unwrap();

    let calls = runner.calls();
    for node in ["kind-control-plane", "kind-worker"] {
        let position = |needle: &str| {
            calls
                .iter()
                .position(|call| {
                    call.starts_with(&["exec", "--privileged", node]) && call.line().contains(needle)
                })
                .unwrap()
        };
        let launched = calls
            .iter()
            .position(|call| call.starts_with(&["run"]) && call.line().contains(&format!("--name {node} ")))
            .unwrap();
        let boot_check = position("is-system-running");
        let hostname = position("hostnamectl");
        assert!(launched < boot_check, "{node}: boot checked before run");
        assert!(boot_check < hostname, "{node}: fixups ran before boot finished");
    }
}

#[tokio::test(start_paused = true)]
async fn launch_polls_until_systemd_reports_running() {
    let attempts = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let seen = attempts.clone();
    let runner = MockCommandRunner::new(move |call| {
        if !call.line().ends_with("is-system-running") {
            return Ok(ok_output(b""));
        }
        match seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst) {
            0 => Ok(err_output(1, b"container is not running")),
            1 => Ok(err_output(1, b"")),
            _ => Ok(ok_output(b"degraded\n")),
        }
    });
    let spec = NodeSpec::new(NodeRole::Worker);
    let request = LaunchRequest {
        name: "kind-worker",
        cluster: "kind",
        spec: &spec,
    };
    provider(&runner).launch(&request).await.unwrap();
    assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn launch_fails_when_node_never_boots() {
    let runner = MockCommandRunner::new(|call| {
        if call.line().ends_with("is-system-running") {
            let mut starting = err_output(1, b"");
            starting.stdout = b"starting\n".to_vec();
            Ok(starting)
        } else {
            Ok(ok_output(b""))
        }
    });
    let wait = ReadinessWait {
        timeout: Duration::from_secs(10),
        interval: Duration::from_secs(1),
    };
    let spec = NodeSpec::new(NodeRole::Worker);
    let request = LaunchRequest {
        name: "kind-worker",
        cluster: "kind",
        spec: &spec,
    };
    let err = provider(&runner)
        .with_boot_wait(wait)
        .launch(&request)
        .await
        .unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("kind-worker did not finish booting"), "{message}");
    assert!(runner.calls_starting_with(&["exec"]).len() >= 10);
}

#[tokio::test]
async fn provision_rejects_unknown_roles_before_launching() {
    let runner = MockCommandRunner::succeeding();
    let reporter = RecordingReporter::default();
    let config = ClusterConfig {
        nodes: vec![NodeSpec::new(NodeRole::Other("etcd".to_string()))],
        ..ClusterConfig::default()
    };
    let err = provider(&runner)
        .provision(&reporter, "kind", &config)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("etcd"));
    assert!(runner.calls_starting_with(&["run"]).is_empty());
}
